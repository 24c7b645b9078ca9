//! Inline shorthands: code spans, fenced code blocks, CSS productions and
//! "maybe" autolinks, escapes and the em-dash line join.

use memchr::memchr;
use once_cell::sync::Lazy;
use regex::Regex;

use super::macros::replace_macros_in_text;
use crate::node::{Node, RawElement, TagBuilder, escape_html};
use crate::shared::{Parsed, Stream};

pub const PRODUCTION_PLACEHOLDER: &str = "fake-production-placeholder";
pub const MAYBE_PLACEHOLDER: &str = "fake-maybe-placeholder";

/// Link types a `''value!!type''` may name.
pub const MAYBE_TYPES: &[&str] = &["value", "type", "at-rule", "function", "selector"];

static PROD_PROPDESC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^'(?:(\S*)/)?([\w*-]+)(?:!!([\w-]+))?'$").unwrap());
static PROD_FUNC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(\S*)/)?([\w*-]+\(\))$").unwrap());
static PROD_ATRULE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(\S*)/)?(@[\w*-]+)$").unwrap());
static PROD_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^(?:(\S*)/)?
        (\S+)
        (?:\s+
            \[\s*
            (-?(?:\d+[\w-]*|∞|[Ii]nfinity|&infin;))\s*
            ,\s*
            (-?(?:\d+[\w-]*|∞|[Ii]nfinity|&infin;))\s*
            \]\s*
        )?$",
    )
    .unwrap()
});
static PROD_TYPE_WITH_ARGS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(\S*)/)?(\S+)\s*\[([^\]]*)\]\s*$").unwrap());
static RANGE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)([\w-]*)").unwrap());
static MAYBE_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(\S*)/)?(\S[^!]*)(?:!!([\w-]+))?$").unwrap());

/// `` `code` `` spans, markdown style: the closing run must have exactly
/// as many backticks as the opening one.
pub fn parse_code_span(s: &Stream<'_>, start: usize) -> Parsed<Vec<Node>> {
    if s.char_before(start) == Some('`') && s.slice(start.saturating_sub(2), start) != "\\`" {
        return Parsed::Fail(start);
    }
    let ticks = tick_run(s, start, b'`');
    if ticks == 0 {
        return Parsed::Fail(start);
    }
    let content_start = start + ticks;

    let bytes = s.as_str().as_bytes();
    let mut i = content_start;
    let (content_end, end) = loop {
        let Some(rel) = bytes.get(i..).and_then(|rest| memchr(b'`', rest)) else {
            // Unmatched ticks are just text.
            return Parsed::Fail(start);
        };
        let run_start = i + rel;
        let run = tick_run(s, run_start, b'`');
        if run == ticks && run_start > content_start {
            break (run_start, run_start + run);
        }
        i = run_start + run;
    };

    let mut text = s.slice(content_start, content_end).replace('\n', " ");
    if text.len() >= 2 && text.starts_with(' ') && text.ends_with(' ') && !text.trim().is_empty() {
        text = text[1..text.len() - 1].to_string();
    }
    let fence = "`".repeat(ticks);
    let tag = TagBuilder::new("code")
        .attr("bs-autolink-syntax", format!("{fence}{text}{fence}"))
        .attr("bs-opaque", "")
        .finish(s.span(start, content_start));
    let nodes = vec![
        Node::StartTag(tag),
        Node::safe_text(s.span(content_start, content_end), text),
        Node::end_tag(s.span(content_end, end), "code"),
    ];
    Parsed::Ok(nodes, end)
}

fn tick_run(s: &Stream<'_>, start: usize, tick: u8) -> usize {
    let mut i = start;
    while s.byte_at(i) == Some(tick) {
        i += 1;
    }
    i - start
}

/// A fenced code block, captured verbatim as an `<xmp>`.
pub fn parse_fenced_code_block(s: &Stream<'_>, start: usize) -> Parsed<Node> {
    if !s.preceding_text_on_line(start).trim().is_empty() {
        return Parsed::Fail(start);
    }
    let fence_char = match s.byte_at(start) {
        Some(b @ (b'`' | b'~')) => b,
        _ => return Parsed::Fail(start),
    };
    let fence_len = tick_run(s, start, fence_char);
    if fence_len < 3 {
        return Parsed::Fail(start);
    }
    let fence = s.slice(start, start + fence_len);

    let Parsed::Ok(info, mut i) = s.skip_to_next_line(start + fence_len) else {
        return Parsed::Fail(start);
    };
    let info = info.trim();
    if info.contains('`') {
        // Would collide with inline code spans.
        return Parsed::Fail(start);
    }

    let mut contents = String::from("\n");
    loop {
        let Parsed::Ok(text, at) = s.skip_to(i, fence) else {
            s.die(start, "Hit EOF while parsing fenced code block.".to_string());
            contents.push_str(s.slice_from(i));
            i = s.len();
            break;
        };
        contents.push_str(text);
        let run_end = at + tick_run(s, at, fence_char);
        let alone_on_line = s.preceding_text_on_line(at).trim().is_empty()
            && s.remaining_text_on_line(run_end).trim().is_empty();
        if alone_on_line {
            i = run_end;
            break;
        }
        // A fence look-alike inside the block.
        contents.push_str(s.slice(at, run_end));
        i = run_end;
    }

    let mut tag = TagBuilder::new("xmp");
    if !info.is_empty() {
        let lang = info.split(' ').next().unwrap_or(info);
        tag = tag
            .attr("bs-infostring", info)
            .class(format!("language-{lang}"));
    }
    let el = RawElement {
        span: s.span(start, i),
        start_tag: tag.finish(s.span(start, start)),
        data: contents,
    };
    Parsed::Ok(Node::RawElement(el), i)
}

/// A CSS production autolink, `<<foo>>`.
///
/// Once `<<` is seen this always succeeds: malformed syntax is reported and
/// kept as text.
pub fn parse_css_production(s: &Stream<'_>, start: usize) -> Parsed<Vec<Node>> {
    if !s.starts_with_at(start, "<<") {
        return Parsed::Fail(start);
    }
    let text_start = start + 2;
    let literal_open = |message: &str| {
        s.die(start, message.to_string());
        Parsed::Ok(vec![Node::safe_text(s.span(start, text_start), "<<")], text_start)
    };

    let Parsed::Ok(mut text, mut text_end) = s.skip_to(text_start, ">>") else {
        return literal_open(
            "Saw the start of a CSS production (like <<foo>>), but couldn't find the end.",
        );
    };
    if text.contains('\n') {
        return literal_open(
            "Saw the start of a CSS production (like <<foo>>), but couldn't find the end on the same line.",
        );
    }
    if text.contains(['<', '>']) {
        if !text.contains('[') {
            return literal_open(
                "It seems like you wrote a CSS production (like <<foo>>), but there's more markup inside of it, or you didn't close it properly.",
            );
        }
        // <<boolean [<<foo>>]>>
        let arg_end = s.skip_to(text_end, "]").ok().map(|(_, at)| at);
        let close = arg_end.and_then(|at| s.skip_to(at, ">>").ok().map(|(_, end)| (at, end)));
        match close {
            Some((at, end)) if at != text_end && end != at => {
                text_end = end;
                text = s.slice(text_start, text_end);
            }
            _ => {
                return literal_open(
                    "It seems like you wrote a CSS production with an argument (like <<foo [<<bar>>]>>), but either included more [] in the argument, or otherwise messed up the syntax.",
                );
            }
        }
    }
    let node_end = text_end + 2;
    let syntax = s.slice(start, node_end);

    let Some((link, display)) = classify_production(s, start, text) else {
        return Parsed::Ok(
            vec![Node::safe_text(s.span(start, node_end), syntax)],
            node_end,
        );
    };

    let mut tag = TagBuilder::new(PRODUCTION_PLACEHOLDER)
        .attr("bs-autolink-syntax", syntax)
        .attr("class", "production")
        .attr("bs-opaque", "")
        .attr("data-link-type", link.link_type)
        .attr("data-lt", link.lt);
    if let Some(link_for) = link.link_for {
        tag = tag.attr("data-link-for", link_for);
    }
    let nodes = vec![
        Node::StartTag(tag.finish(s.span(start, text_start))),
        Node::safe_text(s.span(text_start, text_end), display),
        Node::end_tag(s.span(text_end, node_end), PRODUCTION_PLACEHOLDER),
    ];
    Parsed::Ok(nodes, node_end)
}

#[derive(Debug, PartialEq, Eq)]
struct LinkTarget {
    link_type: String,
    lt: String,
    link_for: Option<String>,
}

/// Works out what a production's text links to, and its display form.
/// Reports and returns `None` when the text fits no production grammar.
fn classify_production(s: &Stream<'_>, start: usize, text: &str) -> Option<(LinkTarget, String)> {
    if let Some(caps) = PROD_PROPDESC_RE.captures(text) {
        let link_for = caps
            .get(1)
            .map(|m| if m.as_str().is_empty() { "/" } else { m.as_str() });
        let lt = &caps[2];
        let link_type = match (caps.get(3).map(|m| m.as_str()), link_for) {
            (None, None) => "property",
            (None, Some(_)) => "propdesc",
            (Some(t @ ("property" | "descriptor")), _) => t,
            (Some(other), _) => {
                s.die(
                    start,
                    format!(
                        "Shorthand <<{text}>> gives type as '{other}', but only 'property' and 'descriptor' are allowed."
                    ),
                );
                return None;
            }
        };
        let link = LinkTarget {
            link_type: link_type.to_string(),
            lt: lt.to_string(),
            link_for: link_for.map(str::to_string),
        };
        return Some((link, format!("<'{lt}'>")));
    }

    if let Some(caps) = PROD_FUNC_RE.captures(text) {
        let link = LinkTarget {
            link_type: "function".to_string(),
            lt: caps[2].to_string(),
            link_for: caps.get(1).map(|m| m.as_str().to_string()),
        };
        return Some((link, format!("<{}>", &caps[2])));
    }

    if let Some(caps) = PROD_ATRULE_RE.captures(text) {
        let link = LinkTarget {
            link_type: "at-rule".to_string(),
            lt: caps[2].to_string(),
            link_for: caps.get(1).map(|m| m.as_str().to_string()),
        };
        return Some((link, format!("<{}>", &caps[2])));
    }

    if let Some(caps) = PROD_TYPE_RE.captures(text) {
        let term = &caps[2];
        let link = LinkTarget {
            link_type: "type".to_string(),
            lt: format!("<{term}>"),
            link_for: caps.get(1).map(|m| m.as_str().to_string()),
        };
        let (Some(range_start), Some(range_end)) = (caps.get(3), caps.get(4)) else {
            return Some((link, format!("<{term}>")));
        };
        let (Some((low, low_num)), Some((high, high_num))) = (
            parse_range_component(range_start.as_str()),
            parse_range_component(range_end.as_str()),
        ) else {
            s.die(start, format!("Shorthand <<{text}>> has an invalid range."));
            return None;
        };
        if low_num >= high_num {
            // Still links; the range is only cosmetic.
            s.die(
                start,
                format!(
                    "Shorthand <<{text}>> has a range whose start is equal or greater than its end."
                ),
            );
        }
        return Some((link, format!("<{term} [{low},{high}]>")));
    }

    if let Some(caps) = PROD_TYPE_WITH_ARGS_RE.captures(text) {
        let term = &caps[2];
        let arg = caps[3].replace("<<", "<").replace(">>", ">");
        let link = LinkTarget {
            link_type: "type".to_string(),
            lt: format!("<{term}>"),
            link_for: caps.get(1).map(|m| m.as_str().to_string()),
        };
        return Some((link, format!("<{term}[{arg}]>")));
    }

    s.die(
        start,
        format!("Shorthand <<{text}>> does not match any recognized shorthand grammar."),
    );
    None
}

/// One end of a `[min,max]` range: its display form and numeric value.
pub fn parse_range_component(val: &str) -> Option<(String, f64)> {
    let mut val = val.trim();
    let mut negative = false;
    if let Some(rest) = val.strip_prefix(['-', '−']) {
        negative = true;
        val = rest;
    }
    let sign = if negative { -1.0 } else { 1.0 };
    if val == "∞" || val.eq_ignore_ascii_case("infinity") || val.eq_ignore_ascii_case("&infin;") {
        let display = if negative { "-∞" } else { "∞" };
        return Some((display.to_string(), sign * f64::INFINITY));
    }

    let caps = RANGE_NUMBER_RE.captures(val)?;
    let digits = caps[1].trim_start_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };
    let unit = &caps[2];
    let num = sign * digits.parse::<f64>().ok()?;
    let display = if negative && digits != "0" {
        format!("-{digits}{unit}")
    } else {
        format!("{digits}{unit}")
    };
    Some((display, num))
}

/// A CSS "maybe" autolink, `''value''`, closed on the same line.
///
/// Emitted as a single placeholder element whose content is never re-parsed.
pub fn parse_css_maybe(s: &Stream<'_>, start: usize) -> Parsed<Vec<Node>> {
    if !s.starts_with_at(start, "''") {
        return Parsed::Fail(start);
    }
    let text_start = start + 2;
    let Parsed::Ok(raw, text_end) = s.skip_to_same_line(text_start, "''") else {
        return Parsed::Fail(start);
    };
    if raw.is_empty() {
        return Parsed::Fail(start);
    }
    let node_end = text_end + 2;

    let text = if s.config().macros_in_autolinks {
        replace_macros_in_text(s, raw, text_start, &format!("''{raw}''"))
    } else {
        raw.to_string()
    };

    let (link_for, value, link_type) = match MAYBE_VALUE_RE.captures(&text) {
        Some(caps) => (
            caps.get(1).map(|m| m.as_str().to_string()),
            caps[2].to_string(),
            caps.get(3).map(|m| m.as_str().to_string()),
        ),
        None => (None, text.clone(), None),
    };
    let link_type = match link_type {
        None => Some("maybe".to_string()),
        Some(t) if MAYBE_TYPES.contains(&t.as_str()) => Some(t),
        Some(t) => {
            s.die(
                start,
                format!(
                    "Shorthand ''{raw}'' gives type as '{t}', but only \u{201c}maybe\u{201d} sub-types are allowed: {}.",
                    MAYBE_TYPES.join(", ")
                ),
            );
            None
        }
    };

    let mut tag = TagBuilder::new(MAYBE_PLACEHOLDER)
        .attr("class", "css")
        .attr("bs-autolink-syntax", s.slice(start, node_end));
    if let Some(link_type) = link_type {
        tag = tag.attr("data-link-type", link_type).attr("data-lt", value.as_str());
        if let Some(link_for) = link_for.filter(|f| !f.is_empty()) {
            tag = tag.attr("data-link-for", link_for);
        }
    }
    let el = RawElement {
        span: s.span(start, node_end),
        start_tag: tag.finish(s.span(start, text_start)),
        data: literal_double_angles(&value),
    };
    Parsed::Ok(vec![Node::RawElement(el)], node_end)
}

/// Markup-safe content for a maybe autolink. `<<` and `>>` inside one are
/// never productions, just single angles.
fn literal_double_angles(text: &str) -> String {
    escape_html(&text.replace("<<", "<").replace(">>", ">"))
}

/// `—` or `--` ending a line: joins the next line on with a zero-width
/// space, so no visible space follows the dash.
pub fn parse_em_dash_join(s: &Stream<'_>, start: usize) -> Parsed<Node> {
    let dash_len = if s.starts_with_at(start, "—\n") {
        "—".len()
    } else if s.starts_with_at(start, "--\n") {
        2
    } else {
        return Parsed::Fail(start);
    };
    if s.char_before(start) == Some('-') {
        return Parsed::Fail(start);
    }
    let mut i = start + dash_len + 1;
    while let Some(ch) = s.char_at(i)
        && ch.is_whitespace()
    {
        i += ch.len_utf8();
    }
    if s.eof(i) {
        return Parsed::Fail(start);
    }
    Parsed::Ok(Node::raw_text(s.span(start, i), "—\u{200b}"), i)
}

/// Whether `\` at `start` escapes the following character.
pub fn is_markdown_escape(s: &Stream<'_>, start: usize) -> bool {
    s.byte_at(start) == Some(b'\\')
        && s
            .byte_at(start + 1)
            .is_some_and(|b| b"\\!\"#$%&'()+,-./:;<=>?@[]^`{|}~".contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{Diagnostics, ParseConfig};

    fn with_stream<R>(src: &str, f: impl FnOnce(&Stream<'_>, &Diagnostics) -> R) -> R {
        let config = ParseConfig::all_shorthands().with_macro("foo", "bar");
        let diags = Diagnostics::new();
        let s = Stream::new(src, &config, &diags, 1);
        f(&s, &diags)
    }

    fn rendered(nodes: &[Node]) -> String {
        nodes.iter().map(Node::to_string).collect()
    }

    #[test]
    fn code_spans() {
        with_stream("`a < b` rest", |s, _| {
            let Parsed::Ok(nodes, end) = parse_code_span(s, 0) else {
                panic!("code span should parse");
            };
            assert_eq!(end, 7);
            assert_eq!(
                rendered(&nodes),
                r#"<code bs-autolink-syntax="`a < b`" bs-opaque>a &lt; b</code>"#
            );
        });
        with_stream("`` a`b ``", |s, _| {
            let Parsed::Ok(nodes, _) = parse_code_span(s, 0) else {
                panic!("double-tick span should parse");
            };
            assert_eq!(nodes[1].text(), Some("a`b"));
        });
        with_stream("``a` only", |s, _| {
            assert!(parse_code_span(s, 0).is_fail());
        });
        with_stream("` `", |s, _| {
            let Parsed::Ok(nodes, _) = parse_code_span(s, 0) else {
                panic!("all-space span should parse");
            };
            assert_eq!(nodes[1].text(), Some(" "));
        });
    }

    #[test]
    fn fenced_block() {
        with_stream("```js\nlet x = 1;\n```", |s, diags| {
            let Parsed::Ok(Node::RawElement(el), end) = parse_fenced_code_block(s, 0) else {
                panic!("fence should parse");
            };
            assert_eq!(end, s.len());
            assert_eq!(el.tag(), "xmp");
            assert!(el.start_tag.has_class("language-js"));
            assert_eq!(el.start_tag.attr("bs-infostring"), Some("js"));
            assert_eq!(el.data, "\nlet x = 1;\n");
            assert!(diags.is_empty());
        });
    }

    #[test]
    fn fence_lookalikes_are_content() {
        let src = "~~~~\na ~~~~ b\n~~~\n~~~~~\nafter";
        with_stream(src, |s, _| {
            let Parsed::Ok(Node::RawElement(el), end) = parse_fenced_code_block(s, 0) else {
                panic!("fence should parse");
            };
            assert_eq!(el.data, "\na ~~~~ b\n~~~\n");
            assert_eq!(s.slice_from(end), "\nafter");
        });
    }

    #[test]
    fn unterminated_fence() {
        with_stream("```\ncode", |s, diags| {
            let Parsed::Ok(Node::RawElement(el), end) = parse_fenced_code_block(s, 0) else {
                panic!("unterminated fence still yields content");
            };
            assert_eq!(end, s.len());
            assert_eq!(el.data, "\ncode");
            assert_eq!(diags.error_count(), 1);
        });
    }

    #[test]
    fn fence_needs_line_start() {
        with_stream("x ```\n", |s, _| assert!(parse_fenced_code_block(s, 2).is_fail()));
        with_stream("``\n", |s, _| assert!(parse_fenced_code_block(s, 0).is_fail()));
    }

    #[test]
    fn production_kinds() {
        let cases = [
            ("<<length>>", "type", "<length>", None, "<length>"),
            ("<<'color'>>", "property", "color", None, "<'color'>"),
            ("<<'@font-face/src'>>", "propdesc", "src", Some("@font-face"), "<'src'>"),
            ("<<calc()>>", "function", "calc()", None, "<calc()>"),
            ("<<@media>>", "at-rule", "@media", None, "<@media>"),
            ("<<integer [0,∞]>>", "type", "<integer>", None, "<integer [0,∞]>"),
        ];
        for (src, link_type, lt, link_for, display) in cases {
            with_stream(src, |s, diags| {
                let Parsed::Ok(nodes, end) = parse_css_production(s, 0) else {
                    panic!("{src} should parse");
                };
                assert_eq!(end, s.len(), "{src}");
                let Node::StartTag(tag) = &nodes[0] else {
                    panic!("{src}: expected a start tag");
                };
                assert_eq!(tag.name(), PRODUCTION_PLACEHOLDER);
                assert_eq!(tag.attr("data-link-type"), Some(link_type), "{src}");
                assert_eq!(tag.attr("data-lt"), Some(lt), "{src}");
                assert_eq!(tag.attr("data-link-for"), link_for, "{src}");
                assert_eq!(tag.attr("bs-autolink-syntax"), Some(src));
                assert!(tag.has_class("production"));
                assert_eq!(nodes[1].text(), Some(display), "{src}");
                assert!(diags.is_empty(), "{src}: {:?}", diags.messages());
            });
        }
    }

    #[test]
    fn production_with_argument() {
        with_stream("<<boolean [<<foo>>]>> x", |s, _| {
            let Parsed::Ok(nodes, end) = parse_css_production(s, 0) else {
                panic!("should parse");
            };
            assert_eq!(s.slice_from(end), " x");
            assert_eq!(nodes[1].text(), Some("<boolean[<foo>]>"));
        });
    }

    #[test]
    fn production_errors_keep_text() {
        with_stream("<<foo", |s, diags| {
            let Parsed::Ok(nodes, 2) = parse_css_production(s, 0) else {
                panic!("unclosed production keeps its opener");
            };
            assert_eq!(nodes[0].text(), Some("<<"));
            assert_eq!(diags.error_count(), 1);
        });
        with_stream("<<foo\n>>", |s, diags| {
            assert!(matches!(parse_css_production(s, 0), Parsed::Ok(_, 2)));
            assert!(diags.messages()[0].contains("same line"));
        });
        with_stream("<<'foo!!bogus'>>", |s, diags| {
            let Parsed::Ok(nodes, end) = parse_css_production(s, 0) else {
                panic!("bad type keeps text");
            };
            assert_eq!(end, s.len());
            assert_eq!(nodes.len(), 1);
            assert_eq!(diags.error_count(), 1);
        });
        with_stream("<<foo [5,1]>>", |s, diags| {
            let Parsed::Ok(nodes, _) = parse_css_production(s, 0) else {
                panic!("backwards range still links");
            };
            assert_eq!(nodes.len(), 3);
            assert_eq!(diags.error_count(), 1);
        });
    }

    #[test]
    fn range_components() {
        assert_eq!(
            parse_range_component("0"),
            Some(("0".to_string(), 0.0))
        );
        assert_eq!(
            parse_range_component("-005px"),
            Some(("-5px".to_string(), -5.0))
        );
        assert_eq!(
            parse_range_component("Infinity"),
            Some(("∞".to_string(), f64::INFINITY))
        );
        assert_eq!(
            parse_range_component("-&infin;"),
            Some(("-∞".to_string(), f64::NEG_INFINITY))
        );
        assert_eq!(parse_range_component("px"), None);
    }

    #[test]
    fn maybe_autolinks() {
        with_stream("''auto'' x", |s, diags| {
            let Parsed::Ok(nodes, end) = parse_css_maybe(s, 0) else {
                panic!("maybe should parse");
            };
            assert_eq!(end, 8);
            let Node::RawElement(el) = &nodes[0] else {
                panic!("expected a placeholder");
            };
            assert_eq!(el.tag(), MAYBE_PLACEHOLDER);
            assert_eq!(el.start_tag.attr("data-link-type"), Some("maybe"));
            assert_eq!(el.start_tag.attr("data-lt"), Some("auto"));
            assert_eq!(el.data, "auto");
            assert!(diags.is_empty());
        });
        with_stream("''width/auto!!value''", |s, _| {
            let Parsed::Ok(nodes, _) = parse_css_maybe(s, 0) else {
                panic!("maybe should parse");
            };
            let Node::RawElement(el) = &nodes[0] else {
                panic!("expected a placeholder");
            };
            assert_eq!(el.start_tag.attr("data-link-type"), Some("value"));
            assert_eq!(el.start_tag.attr("data-link-for"), Some("width"));
            assert_eq!(el.start_tag.attr("data-lt"), Some("auto"));
        });
        with_stream("''a <<b>>''", |s, _| {
            let Parsed::Ok(nodes, _) = parse_css_maybe(s, 0) else {
                panic!("maybe should parse");
            };
            assert!(matches!(&nodes[0], Node::RawElement(el) if el.data == "a &lt;b>"));
        });
        with_stream("''a<b && c''", |s, _| {
            let Parsed::Ok(nodes, _) = parse_css_maybe(s, 0) else {
                panic!("maybe should parse");
            };
            assert!(matches!(&nodes[0], Node::RawElement(el) if el.data == "a&lt;b &amp;&amp; c"));
        });
        with_stream("''x!!bogus''", |s, diags| {
            assert!(parse_css_maybe(s, 0).is_ok());
            assert_eq!(diags.error_count(), 1);
        });
        with_stream("''open\nclose''", |s, _| {
            assert!(parse_css_maybe(s, 0).is_fail());
        });
    }

    #[test]
    fn maybe_with_macros() {
        let config = ParseConfig {
            css: true,
            macros_in_autolinks: true,
            ..ParseConfig::default()
        }
        .with_macro("foo", "bar");
        let diags = Diagnostics::new();
        let s = Stream::new("''[FOO]''", &config, &diags, 1);
        let Parsed::Ok(nodes, _) = parse_css_maybe(&s, 0) else {
            panic!("maybe should parse");
        };
        assert!(matches!(&nodes[0], Node::RawElement(el) if el.data == "bar"));
    }

    #[test]
    fn em_dash_join() {
        with_stream("word—\n   next", |s, _| {
            let start = "word".len();
            let Parsed::Ok(node, end) = parse_em_dash_join(s, start) else {
                panic!("dash should join");
            };
            assert_eq!(s.slice_from(end), "next");
            assert_eq!(node.text(), Some("—\u{200b}"));
            assert_eq!(node.height(), 1);
            assert!(node.needs_lccs());
        });
        with_stream("a--\nb", |s, _| assert!(parse_em_dash_join(s, 1).is_ok()));
        with_stream("a---\nb", |s, _| assert!(parse_em_dash_join(s, 2).is_fail()));
        with_stream("a--\n  ", |s, _| assert!(parse_em_dash_join(s, 1).is_fail()));
    }

    #[test]
    fn markdown_escape_set() {
        with_stream(r"\* \_ \[ \\", |s, _| {
            assert!(!is_markdown_escape(s, 0));
            assert!(!is_markdown_escape(s, 3));
            assert!(is_markdown_escape(s, 6));
            assert!(is_markdown_escape(s, 9));
        });
    }
}
