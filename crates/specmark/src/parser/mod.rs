//! The dispatch loop.
//!
//! `parse_anything` either hands a candidate position to `parse_node`, which
//! tries every recognizer in a fixed priority order, or consumes a literal
//! run up to the next possible node start. `nodes_from_stream` massages the
//! result for consumers: safe text is escaped, apostrophes are curlified and
//! adjacent raw text is merged.

pub mod autolink;
pub mod charref;
pub mod macros;
pub mod shorthand;
pub mod tags;


use once_cell::sync::Lazy;
use regex::Regex;

use crate::node::{Node, Text, escape_html};
use crate::node_fmt::node_kind;
use crate::shared::preds::is_word_char;
use crate::shared::{Parsed, Stream};
use autolink::{
    Autolink, LinkSyntax, MAX_LINK_TEXT_LINES, OpenLink, parse_autolink, parse_css_propdesc,
    parse_repository_link, parse_shorthand_variable,
};
use charref::{CharRefContext, numeric_refs, parse_char_ref};
use macros::{is_macro_start, parse_macro_to_nodes};
use shorthand::{
    is_markdown_escape, parse_code_span, parse_css_maybe, parse_css_production,
    parse_em_dash_join, parse_fenced_code_block,
};

/// Characters at which a structured node may begin. Anything else is
/// consumed as literal text without consulting the recognizers.
const NODE_START_CHARS: &[char] = &[
    '&', '<', '`', '\'', '~', '[', '\\', '—', '-', '|', '{', '}', '=', '$', ':', '^',
];

static INNER_APOSTROPHE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w)'(\w)").unwrap());

fn is_node_start(ch: char) -> bool {
    NODE_START_CHARS.contains(&ch)
}

/// Parses the whole stream from `start`, yielding finished nodes.
pub(crate) fn nodes_from_stream(s: &mut Stream<'_>, start: usize) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    // Whether `out.last()` is raw text that later text may be merged into.
    let mut held = false;
    for node in generate_nodes(s, start) {
        let mut text = match node {
            Node::RawText(t) => t,
            Node::SafeText(t) => Text {
                text: escape_html(&t.text),
                span: t.span,
            },
            other => {
                out.push(other);
                held = false;
                continue;
            }
        };
        curlify_apostrophes(&mut text.text, out.last());
        let height = text.span.height();
        if text.text.matches('\n').count() != height {
            out.push(Node::RawText(text));
            held = false;
            continue;
        }
        if held && let Some(Node::RawText(prev)) = out.last_mut() {
            prev.text.push_str(&text.text);
            prev.span.end_line += height;
            continue;
        }
        out.push(Node::RawText(text));
        held = true;
    }
    out
}

fn curlify_apostrophes(text: &mut String, last: Option<&Node>) {
    let mut chars = text.chars();
    let leading = chars.next() == Some('\'');
    let second = chars.next();

    if leading && second.is_some_and(is_word_char) {
        let after_word = match last {
            Some(Node::EndTag(_) | Node::RawElement(_) | Node::SelfClosedTag(_)) => true,
            Some(Node::RawText(prev)) => prev.text.chars().next_back().is_some_and(is_word_char),
            _ => false,
        };
        if after_word {
            text.replace_range(..1, "’");
        }
    }
    if text.contains('\'') {
        *text = INNER_APOSTROPHE_RE
            .replace_all(text, "${1}’${2}")
            .into_owned();
    }
    // <var>T</var>'s
    if leading
        && second.is_some_and(char::is_whitespace)
        && matches!(last, Some(Node::EndTag(end)) if end.name == "var")
    {
        text.replace_range(..1, "’");
    }
}

fn generate_nodes(s: &mut Stream<'_>, start: usize) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut i = start;
    while !s.eof(i) {
        let Parsed::Ok(found, next) = parse_anything(s, i) else {
            break;
        };
        nodes.extend(found);
        i = next;
    }
    nodes
}

/// Structured nodes at `start` if any recognizer accepts it, else the
/// literal text up to the next possible node start. Fails only at EOF.
pub(crate) fn parse_anything(s: &mut Stream<'_>, start: usize) -> Parsed<Vec<Node>> {
    if s.eof(start) {
        return Parsed::Fail(start);
    }
    if s.char_at(start).is_some_and(is_node_start) {
        match parse_node(s, start) {
            Parsed::Ok(Found::Nodes(nodes), i) => return Parsed::Ok(observe(s, nodes), i),
            Parsed::Ok(Found::Link(link), _) => return parse_link_text(s, link),
            Parsed::Fail(_) => {}
        }
    }
    let mut i = s.next_index(start);
    while let Some(ch) = s.char_at(i)
        && !is_node_start(ch)
    {
        i += ch.len_utf8();
    }
    Parsed::Ok(vec![Node::raw_text(s.span(start, i), s.slice(start, i))], i)
}

/// Records `nodes` with the open-element tracker, splicing in any end tags
/// they imply.
fn observe(s: &mut Stream<'_>, nodes: Vec<Node>) -> Vec<Node> {
    let reporter = s.reporter();
    let nodes = s.open_els.observe_all(nodes, reporter);
    for node in &nodes {
        log::trace!(
            target: "specmark.parser",
            "{} at {}",
            node_kind(node),
            node.span().loc
        );
    }
    nodes
}

/// Parses the author-written text of an autolink up to its closer. When the
/// closer doesn't come within a few lines, the link text is reported and
/// reparsed as ordinary content after a plain link.
fn parse_link_text(s: &mut Stream<'_>, link: OpenLink) -> Parsed<Vec<Node>> {
    let syntax = link.syntax;
    let closer = syntax.closer();
    let tracked = s.open_els.clone();
    let first_line = s.line_of(link.text_start);
    let mut nodes = observe(s, link.opening);
    let mut i = link.text_start;
    loop {
        if s.starts_with_at(i, closer) {
            let end = i + closer.len();
            let mut closing = vec![Node::end_tag(s.span(i, end), "a")];
            closing.extend(syntax.wrap_close(s, end));
            nodes.extend(observe(s, closing));
            return Parsed::Ok(nodes, end);
        }
        let Parsed::Ok(found, next) = parse_anything(s, i) else {
            s.die(
                link.text_start,
                format!(
                    "{}...{closer} autolink was opened at {}, and used | to indicate it was providing explicit linktext, but never closed. Either close your autolink, or escape the initial characters that triggered autolink parsing.",
                    syntax.opener(),
                    link.loc
                ),
            );
            break;
        };
        nodes.extend(found);
        i = next;
        if s.line_of(i) > first_line + MAX_LINK_TEXT_LINES {
            s.die(
                link.text_start,
                format!(
                    "{}...{closer} autolink opened at {} wasn't closed within {MAX_LINK_TEXT_LINES} lines. You might have forgotten to close it; if not, switch to the HTML syntax to spread your link across that many lines.",
                    syntax.opener(),
                    link.loc
                ),
            );
            break;
        }
    }
    s.open_els = tracked;
    let end = link.text_start;
    Parsed::Ok(observe(s, link.fallback), end)
}

/// What a recognizer accepted.
pub(crate) enum Found {
    Nodes(Vec<Node>),
    /// An autolink whose link text the dispatch loop still has to parse.
    Link(OpenLink),
}

impl From<Autolink> for Found {
    fn from(link: Autolink) -> Self {
        match link {
            Autolink::Complete(nodes) => Found::Nodes(nodes),
            Autolink::WithText(link) => Found::Link(link),
        }
    }
}

/// Tries each recognizer at `start`; the first to accept wins.
pub(crate) fn parse_node(s: &Stream<'_>, start: usize) -> Parsed<Found> {
    let Some(first) = s.char_at(start) else {
        return Parsed::Fail(start);
    };
    let config = s.config();

    if first == '&'
        && let Parsed::Ok(ch, i) = parse_char_ref(s, start, CharRefContext::Text)
    {
        let text = if s.starts_with_at(start, "&bs") {
            numeric_refs(&ch)
        } else {
            s.slice(start, i).to_string()
        };
        return found(vec![Node::raw_text(s.span(start, i), text)], i);
    }

    if first == '<' {
        // `<org/repo#1>` would otherwise misparse as a self-closing `<org/`.
        if config.repository_links
            && let Parsed::Ok(nodes, i) = parse_repository_link(s, start)
        {
            return found(nodes, i);
        }
        if let Parsed::Ok(nodes, i) = tags::parse_angle_start(s, start) {
            return found(nodes, i);
        }
    }

    if s.in_opaque_element() {
        return Parsed::Fail(start);
    }

    if matches!(first, '`' | '~')
        && let Parsed::Ok(el, i) = parse_fenced_code_block(s, start)
    {
        return found(vec![el], i);
    }

    if config.markdown {
        if s.starts_with_at(start, "\\`") {
            return literal(s, start, 2, "`");
        }
        if first == '`'
            && let Parsed::Ok(nodes, i) = parse_code_span(s, start)
        {
            return found(nodes, i);
        }
    }

    if config.css {
        if let Some(Parsed::Ok(nodes, i)) = parse_css_apostrophes(s, start) {
            return found(nodes, i);
        }
        if s.starts_with_at(start, "\\<<") {
            let i = start + 3;
            return found(vec![Node::safe_text(s.span(start, i), "<<")], i);
        }
        if s.starts_with_at(start, "<<") {
            if s.in_tag_context("a") {
                s.die(
                    start,
                    "Parsed a CSS production autolink (<<foo>>) inside of an <a> or another autolink. Either close the <a> properly, or escape the autolink.".to_string(),
                );
                let i = start + 2;
                return found(vec![Node::safe_text(s.span(start, i), "<<")], i);
            }
            if let Parsed::Ok(nodes, i) = parse_css_production(s, start) {
                return found(nodes, i);
            }
        }
    }

    let bracketed = [
        (config.dfn, LinkSyntax::Dfn),
        (config.dfn, LinkSyntax::AbstractOp),
        (config.header, LinkSyntax::Header),
        (config.idl, LinkSyntax::Idl),
        (config.cddl, LinkSyntax::Cddl),
        (config.markup, LinkSyntax::Markup),
    ];
    for (enabled, syntax) in bracketed {
        if !enabled {
            continue;
        }
        let opener = syntax.opener();
        if s.byte_at(start) == Some(b'\\') && s.starts_with_at(start + 1, opener) {
            return literal(s, start, 1 + opener.len(), opener);
        }
        // `{{Promise}}<{{Foo}}>` is two IDL links, not a markup link.
        if syntax == LinkSyntax::Markup && config.idl && s.starts_with_at(start, "<{{") {
            let i = start + 1;
            return found(vec![Node::safe_text(s.span(start, i), "<")], i);
        }
        if s.starts_with_at(start, opener)
            && let Parsed::Ok(link, i) = parse_autolink(s, start, syntax)
        {
            return Parsed::Ok(Found::from(link), i);
        }
    }

    if config.algorithm {
        if s.starts_with_at(start, "\\|") {
            return literal(s, start, 2, "|");
        }
        if first == '|'
            && let Parsed::Ok(nodes, i) = parse_shorthand_variable(s, start)
        {
            return found(nodes, i);
        }
    }

    if config.biblio {
        if s.starts_with_at(start, "\\[[") {
            return literal(s, start, 3, "&#91;[");
        }
        if s.starts_with_at(start, "[[") && !s.in_tag_context("a") && !s.in_tag_context("dfn") {
            // Biblio refs are linked downstream; keep them away from macros.
            let i = match s.skip_to_same_line(start + 2, "]]") {
                Parsed::Ok(_, close) => close + 2,
                Parsed::Fail(_) => start + 2,
            };
            return found(vec![Node::raw_text(s.span(start, i), s.slice(start, i))], i);
        }
    }

    if config.markdown && s.starts_with_at(start, "\\[") {
        return literal(s, start, 2, "[");
    }
    if s.starts_with_at(start, "\\[") && is_macro_start(s.char_at(start + 2)) {
        return literal(s, start, 2, "[");
    }
    if first == '['
        && s.char_before(start) != Some('[')
        && is_macro_start(s.char_at(start + 1))
        && let Parsed::Ok(nodes, i) = parse_macro_to_nodes(s, start)
    {
        return found(nodes, i);
    }

    if config.markdown_escapes && is_markdown_escape(s, start) {
        let escaped = s.slice(start + 1, start + 2);
        return literal(s, start, 2, &numeric_refs(escaped));
    }

    if matches!(first, '—' | '-')
        && let Parsed::Ok(node, i) = parse_em_dash_join(s, start)
    {
        return found(vec![node], i);
    }

    Parsed::Fail(start)
}

fn found(nodes: Vec<Node>, end: usize) -> Parsed<Found> {
    Parsed::Ok(Found::Nodes(nodes), end)
}

/// `len` bytes of source replaced by `text`.
fn literal(s: &Stream<'_>, start: usize, len: usize, text: &str) -> Parsed<Found> {
    let end = start + len;
    found(vec![Node::raw_text(s.span(start, end), text)], end)
}

/// Apostrophe-led CSS syntax: `\'` escapes, the `'''` typo, `''maybe''` and
/// `'property'`.
fn parse_css_apostrophes(s: &Stream<'_>, start: usize) -> Option<Parsed<Vec<Node>>> {
    let apostrophes_from = |from: usize| {
        let mut i = from;
        while s.byte_at(i) == Some(b'\'') {
            i += 1;
        }
        i
    };

    if s.starts_with_at(start, "\\'") {
        let i = apostrophes_from(start + 2);
        let node = Node::raw_text(s.span(start, i), s.slice(start + 1, i));
        return Some(Parsed::Ok(vec![node], i));
    }
    if s.starts_with_at(start, "'''") {
        let i = apostrophes_from(start + 3);
        s.die(
            start,
            format!(
                "Saw {}. This is probably a typo intended to be a double apostrophe, starting a CSS maybe autolink; if not, please escape some of the apostrophes.",
                s.slice(start, i)
            ),
        );
        let node = Node::raw_text(s.span(start, i), s.slice(start, i));
        return Some(Parsed::Ok(vec![node], i));
    }
    // `<a title=''>` is an empty attribute, not a maybe.
    if s.starts_with_at(start, "''") && s.char_before(start) != Some('=') {
        return match parse_css_maybe(s, start) {
            maybe @ Parsed::Ok(..) => Some(maybe),
            Parsed::Fail(_) => None,
        };
    }
    match parse_css_propdesc(s, start) {
        propdesc @ Parsed::Ok(..) => Some(propdesc),
        Parsed::Fail(_) => None,
    }
}
