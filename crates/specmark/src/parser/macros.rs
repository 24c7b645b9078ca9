//! Text macro expansion.
//!
//! `[NAME]` and `[NAME?]` expand from the configured macro table. In node
//! position the replacement is parsed as a sub-stream one level deeper; in
//! attribute values the text is substituted in a bounded rescan loop.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::nodes_from_stream;
use super::tags::{parse_attribute_list, parse_whitespace};
use crate::node::{Attributes, Node};
use crate::shared::{Parsed, Stream};

/// Brackets a substituted value so neighbouring substitutions cannot
/// combine into a new macro invocation.
pub const MACRO_START: char = '\u{EBBB}';
pub const MACRO_END: char = '\u{EBBC}';

const MAX_TEXT_PASSES: usize = 10;

static MACRO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z0-9-]*[A-Z][A-Z0-9-]*)(\??)\]").unwrap());

// A leading `[` or `\` escapes: `[[RFC2119]]` and `\[FOO]` are not macros.
static MACRO_IN_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\[\\]?)\[([A-Z0-9-]*[A-Z][A-Z0-9-]*)(\??)\]").unwrap());

/// Whether `ch` can begin a macro name (what may follow the `[`).
pub(crate) fn is_macro_start(ch: Option<char>) -> bool {
    ch.is_some_and(|c| c.is_alphanumeric() || c == '-')
}

struct MacroCall<'a> {
    name: String,
    optional: bool,
    display: &'a str,
    end: usize,
}

enum Resolved<'a> {
    /// Unknown optional macro.
    Empty,
    /// Already reported; the literal macro text stands in.
    Literal,
    Expanded(Stream<'a>),
}

fn match_call<'a>(s: &Stream<'a>, start: usize) -> Option<MacroCall<'a>> {
    if s.byte_at(start) != Some(b'[') {
        return None;
    }
    let caps = MACRO_RE.captures(s.slice_from(start + 1))?;
    let end = start + 1 + caps.get(0)?.end();
    Some(MacroCall {
        name: caps[1].to_ascii_lowercase(),
        optional: &caps[2] == "?",
        display: s.slice(start, end),
        end,
    })
}

fn resolve<'a>(s: &Stream<'a>, start: usize, call: &MacroCall<'_>) -> Resolved<'a> {
    let config = s.config();
    let Some(text) = config.macros.get(&call.name) else {
        if call.optional {
            return Resolved::Empty;
        }
        s.die(
            call.end,
            format!(
                "Found unmatched text macro {}. Correct the macro, or escape it by replacing the opening [ with &bs[;",
                call.display
            ),
        );
        return Resolved::Literal;
    };
    match s.sub_stream(&format!("macro {}", call.display), text) {
        Ok(sub) => {
            log::trace!(
                target: "specmark.macros",
                "expanding {} at depth {}",
                call.display,
                sub.depth()
            );
            Resolved::Expanded(sub)
        }
        Err(err) => {
            log::debug!(target: "specmark.macros", "{err}");
            let max = match err {
                crate::shared::StreamError::RecursionLimit { max, .. } => max,
            };
            s.die(
                start,
                format!(
                    "Macro replacement for {} recursed more than {max} levels deep; probably your text macros are accidentally recursive.",
                    call.display
                ),
            );
            Resolved::Literal
        }
    }
}

/// Expands a macro in content position into the nodes of its replacement.
pub fn parse_macro_to_nodes(s: &Stream<'_>, start: usize) -> Parsed<Vec<Node>> {
    let Some(call) = match_call(s, start) else {
        return Parsed::Fail(start);
    };
    match resolve(s, start, &call) {
        Resolved::Empty => Parsed::Ok(Vec::new(), call.end),
        Resolved::Literal => Parsed::Ok(
            vec![Node::raw_text(s.span(start, call.end), call.display)],
            call.end,
        ),
        Resolved::Expanded(mut sub) => Parsed::Ok(nodes_from_stream(&mut sub, 0), call.end),
    }
}

/// Expands a macro in attribute-list position; it must produce attributes.
pub fn parse_macro_to_attrs(s: &Stream<'_>, start: usize) -> Parsed<Attributes> {
    let Some(call) = match_call(s, start) else {
        return Parsed::Fail(start);
    };
    let sub = match resolve(s, start, &call) {
        Resolved::Empty | Resolved::Literal => return Parsed::Ok(Attributes::new(), call.end),
        Resolved::Expanded(sub) => sub,
    };
    let (attrs, attrs_end) = match parse_attribute_list(&sub, 0) {
        Parsed::Ok(attrs, end) => (attrs, end),
        Parsed::Fail(end) => (Attributes::new(), end),
    };
    let ws_end = parse_whitespace(&sub, attrs_end).index();
    if !sub.eof(ws_end) {
        sub.die(
            attrs_end,
            format!(
                "While parsing {} (on {}) as an attribute list, found non-attribute content: {}...",
                call.display,
                s.loc(start),
                sub.slice(attrs_end, attrs_end + 10)
            ),
        );
    }
    if attrs.is_empty() {
        Parsed::Fail(start)
    } else {
        Parsed::Ok(attrs, call.end)
    }
}

/// Substitutes macros inside attribute values and raw element text.
///
/// `at` locates diagnostics; `context` names the construct in them.
pub fn replace_macros_in_text(s: &Stream<'_>, text: &str, at: usize, context: &str) -> String {
    let macros = &s.config().macros;
    let replace = |caps: &Captures<'_>| -> String {
        let whole = &caps[0];
        let name = &caps[2];
        // Echoes keep the call as written, `?` included.
        let call = &whole[2..whole.len() - 1];
        match &caps[1] {
            "\\" => format!("{MACRO_START}&#91;{call}&#93;{MACRO_END}"),
            "[" => format!("{MACRO_START}&#91;&#91;{call}&#93;{MACRO_END}"),
            _ => {
                if let Some(value) = macros.get(&name.to_ascii_lowercase()) {
                    return format!("{MACRO_START}{value}{MACRO_END}");
                }
                if &caps[3] == "?" {
                    return format!("{MACRO_START}{MACRO_END}");
                }
                s.die(
                    at,
                    format!(
                        "Found unmatched text macro {whole} in {context}. Correct the macro, or escape it by replacing the opening [ with &bs[;."
                    ),
                );
                format!(
                    "{MACRO_START}&#91;{}&#93;{MACRO_END}",
                    &whole[1..whole.len() - 1]
                )
            }
        }
    };

    if !MACRO_IN_TEXT_RE.is_match(text) {
        return text.to_string();
    }
    let mut text = MACRO_IN_TEXT_RE.replace_all(text, &replace).into_owned();
    let mut passes = 1;
    loop {
        if passes > MAX_TEXT_PASSES {
            s.die(
                at,
                format!(
                    "Macro replacement in {context} recursed more than {MAX_TEXT_PASSES} levels deep; probably your text macros are accidentally recursive."
                ),
            );
            break;
        }
        if !text.contains('[') {
            break;
        }
        let next = MACRO_IN_TEXT_RE.replace_all(&text, &replace).into_owned();
        if next == text {
            break;
        }
        text = next;
        passes += 1;
    }
    text.replace([MACRO_START, MACRO_END], "")
}
