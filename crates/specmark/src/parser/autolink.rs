//! Definition autolinks.
//!
//! The bracketed forms (`[=term=]`, `[$op$]`, `[:header:]`, `{{Idl}}`,
//! `{^cddl^}` and `<{element}>`) share one link grammar, `for/term!!type`,
//! and may be followed by `|` and author-written link text. The dispatch
//! loop parses that text, since it can hold any markup; see
//! [`OpenLink`]. `'property'` and `|var|` are single-token shorthands.

use once_cell::sync::Lazy;
use regex::Regex;

use super::macros::replace_macros_in_text;
use super::tags::parse_tag_name;
use crate::node::{Node, TagBuilder};
use crate::shared::{Parsed, Stream};

pub const IDL_TYPES: &[&str] = &[
    "event",
    "interface",
    "namespace",
    "extended-attribute",
    "constructor",
    "method",
    "argument",
    "attribute",
    "callback",
    "dictionary",
    "dict-member",
    "enum",
    "enum-value",
    "exception",
    "const",
    "typedef",
    "stringifier",
    "serializer",
    "iterator",
    "maplike",
    "setlike",
    "permission",
];

pub const CDDL_TYPES: &[&str] = &[
    "cddl-module",
    "cddl-type",
    "cddl-parameter",
    "cddl-key",
    "cddl-value",
];

pub const MARKUP_TYPES: &[&str] = &[
    "element",
    "element-sub",
    "element-attr",
    "element-state",
    "attr-value",
];

/// Lines of link text allowed past the line the text starts on.
pub const MAX_LINK_TEXT_LINES: usize = 3;

const MAX_ISSUE_DIGITS: usize = 11;

static HTML_ESCAPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"&[\w#]+;").unwrap());
static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static PROPDESC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(@[\w\[\]-]+|)/)?([\w*\[\]-]+)(?:!!([\w\[\]-]+))?").unwrap()
});
static VARIABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\|(\w(?:[\w\s-]*\w)?)\|").unwrap());

/// The bracketed autolink families.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkSyntax {
    Dfn,
    AbstractOp,
    Header,
    Idl,
    Cddl,
    Markup,
}

impl LinkSyntax {
    pub fn opener(self) -> &'static str {
        match self {
            LinkSyntax::Dfn => "[=",
            LinkSyntax::AbstractOp => "[$",
            LinkSyntax::Header => "[:",
            LinkSyntax::Idl => "{{",
            LinkSyntax::Cddl => "{^",
            LinkSyntax::Markup => "<{",
        }
    }

    pub fn closer(self) -> &'static str {
        match self {
            LinkSyntax::Dfn => "=]",
            LinkSyntax::AbstractOp => "$]",
            LinkSyntax::Header => ":]",
            LinkSyntax::Idl => "}}",
            LinkSyntax::Cddl => "^}",
            LinkSyntax::Markup => "}>",
        }
    }

    fn description(self) -> &'static str {
        match self {
            LinkSyntax::Dfn => "a dfn autolink ([=...=])",
            LinkSyntax::AbstractOp => "an abstract-op autolink ([$...$])",
            LinkSyntax::Header => "an http-header autolink ([:...:])",
            LinkSyntax::Idl => "an IDL autolink ({{...}})",
            LinkSyntax::Cddl => "a CDDL autolink ({^...^})",
            LinkSyntax::Markup => "a markup autolink (<{...}>)",
        }
    }

    /// The link type to emit, reporting an explicit `!!type` the family
    /// doesn't allow.
    fn link_type(self, s: &Stream<'_>, start: usize, inner: &str, data: &LinkData) -> String {
        let (allowed, fallback, permitted): (&[&str], &str, &str) = match self {
            LinkSyntax::Dfn => (&["dfn"], "dfn", "'dfn' is"),
            LinkSyntax::AbstractOp => (&["abstract-op"], "abstract-op", "'abstract-op' is"),
            LinkSyntax::Header => (&["http-header"], "http-header", "'http-header' is"),
            LinkSyntax::Idl => (IDL_TYPES, "idl", "IDL types are"),
            LinkSyntax::Cddl => (CDDL_TYPES, "cddl", "CDDL types are"),
            LinkSyntax::Markup => (MARKUP_TYPES, "element", "markup types are"),
        };
        let Some(explicit) = data.link_type.as_deref() else {
            let implied = match (self, data.link_for.as_deref()) {
                (LinkSyntax::Markup, Some(link_for)) if link_for.contains('/') => "attr-value",
                (LinkSyntax::Markup, Some(_)) => "element-sub",
                _ => fallback,
            };
            return implied.to_string();
        };
        if allowed.contains(&explicit) {
            return explicit.to_string();
        }
        s.die(
            start,
            format!(
                "Autolink {}{inner}{} gave its type as '{explicit}', but only {permitted} allowed.",
                self.opener(),
                self.closer(),
            ),
        );
        fallback.to_string()
    }

    /// Nodes placed before the link's start tag.
    fn wrap_open(self, s: &Stream<'_>, at: usize) -> Vec<Node> {
        let code = |tag: TagBuilder| Node::StartTag(tag.finish(s.span(at, at)));
        match self {
            LinkSyntax::Dfn | LinkSyntax::AbstractOp => Vec::new(),
            LinkSyntax::Header => vec![
                Node::raw_text(s.span(at, at), "`"),
                code(TagBuilder::new("code")),
            ],
            LinkSyntax::Idl => vec![code(
                TagBuilder::new("code")
                    .attr("class", "idl")
                    .attr("nohighlight", ""),
            )],
            LinkSyntax::Cddl => vec![code(
                TagBuilder::new("code")
                    .attr("class", "cddl")
                    .attr("nohighlight", ""),
            )],
            LinkSyntax::Markup => vec![code(TagBuilder::new("code").attr("nohighlight", ""))],
        }
    }

    /// Nodes placed after the link's end tag.
    pub fn wrap_close(self, s: &Stream<'_>, at: usize) -> Vec<Node> {
        let span = s.span(at, at);
        match self {
            LinkSyntax::Dfn | LinkSyntax::AbstractOp => Vec::new(),
            LinkSyntax::Header => vec![
                Node::end_tag(span.clone(), "code"),
                Node::raw_text(span, "`"),
            ],
            LinkSyntax::Idl | LinkSyntax::Cddl | LinkSyntax::Markup => {
                vec![Node::end_tag(span, "code")]
            }
        }
    }
}

/// The `for/term!!type` portion of a bracketed autolink.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkData {
    pub lt: String,
    pub link_for: Option<String>,
    pub link_type: Option<String>,
}

impl LinkData {
    /// Splits link data on its last `/` and first `!!`, collapsing
    /// whitespace in the parts.
    pub fn parse(text: &str) -> LinkData {
        let (link_for, rest) = match text.rsplit_once('/') {
            Some(("", rest)) => (Some("/".to_string()), rest),
            Some((link_for, rest)) => (Some(collapse_whitespace(link_for)), rest),
            None => (None, text),
        };
        let (lt, link_type) = match rest.split_once("!!") {
            Some((lt, link_type)) => (lt, Some(link_type.trim().to_string())),
            None => (rest, None),
        };
        // `\[[slot]]` needs no escape here, but it's tolerated.
        let unescape = |text: String| {
            text.strip_prefix('\\')
                .filter(|rest| rest.starts_with("[["))
                .map(str::to_string)
                .unwrap_or(text)
        };
        LinkData {
            lt: unescape(collapse_whitespace(lt)),
            link_for: link_for.map(unescape),
            link_type,
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN_RE.replace_all(text.trim(), " ").into_owned()
}

/// A bracketed autolink followed by `|`: its opening nodes are ready, and
/// the dispatch loop parses the link text from `text_start` up to the
/// closer.
#[derive(Clone, Debug)]
pub struct OpenLink {
    pub syntax: LinkSyntax,
    /// Wrapper start nodes, then the link's start tag.
    pub opening: Vec<Node>,
    pub text_start: usize,
    /// Location of the link's start tag, for reports.
    pub loc: String,
    /// The plain link, ending just past the `|`, for when the link text
    /// never closes.
    pub fallback: Vec<Node>,
}

/// A recognized bracketed autolink.
#[derive(Clone, Debug)]
pub enum Autolink {
    Complete(Vec<Node>),
    WithText(OpenLink),
}

/// Parses the bracketed autolink of family `syntax` at `start`.
///
/// Fails when the opener isn't followed by a closer or `|` on the same or
/// the next line; that case is reported.
pub fn parse_autolink(s: &Stream<'_>, start: usize, syntax: LinkSyntax) -> Parsed<Autolink> {
    if !s.starts_with_at(start, syntax.opener()) {
        return Parsed::Fail(start);
    }
    let in_link = s.in_tag_context("a");
    let inner_start = start + syntax.opener().len();
    let Some(inner_end) = find_link_data_end(s, inner_start, syntax) else {
        let opener = syntax.opener();
        let first = &opener[..1];
        s.die(
            start,
            format!(
                "{opener}...{} autolink was opened, but couldn't find {} or | on the same or next line. Either close your autolink, or escape the initial {first} as &bs{first};",
                syntax.closer(),
                syntax.closer()
            ),
        );
        return Parsed::Fail(start);
    };
    let inner = s.slice(inner_start, inner_end);
    let data_text = if s.config().macros_in_autolinks {
        let context = format!("{}{inner}{}", syntax.opener(), syntax.closer());
        replace_macros_in_text(s, inner, inner_start, &context)
    } else {
        inner.to_string()
    };
    if HTML_ESCAPE_RE.is_match(&data_text) {
        s.die(
            start,
            "Saw an HTML escape in the link-data portion of an autolink. Use raw characters, or switch to the HTML syntax.".to_string(),
        );
    }
    let data = LinkData::parse(&data_text);
    let link_type = syntax.link_type(s, start, inner, &data);

    let mut tag = TagBuilder::new("a")
        .attr("data-link-type", link_type)
        .attr("data-lt", data.lt.as_str())
        .attr(
            "bs-autolink-syntax",
            format!("{}{inner}{}", syntax.opener(), syntax.closer()),
        );
    if let Some(link_for) = &data.link_for {
        tag = tag.attr("data-link-for", link_for.as_str());
    }
    let start_tag = Node::StartTag(tag.finish(s.span(start, inner_start)));
    let visible = visible_text(syntax, &data);

    if in_link {
        s.die(
            start,
            format!(
                "Parsed {} inside of an <a>. Either close the <a> properly, or escape the autolink.",
                syntax.description()
            ),
        );
    }

    let whole = |node_end: usize| {
        let mut nodes = syntax.wrap_open(s, start);
        nodes.push(start_tag.clone());
        nodes.push(Node::safe_text(s.span(inner_start, inner_end), visible.as_str()));
        nodes.push(Node::end_tag(s.span(inner_end, node_end), "a"));
        nodes.extend(syntax.wrap_close(s, node_end));
        nodes
    };

    if s.byte_at(inner_end) == Some(b'|') {
        let text_start = inner_end + 1;
        let mut opening = syntax.wrap_open(s, start);
        opening.push(start_tag.clone());
        let link = OpenLink {
            syntax,
            opening,
            text_start,
            loc: s.loc(start),
            fallback: whole(text_start),
        };
        return Parsed::Ok(Autolink::WithText(link), text_start);
    }
    let node_end = inner_end + syntax.closer().len();
    Parsed::Ok(Autolink::Complete(whole(node_end)), node_end)
}

/// First `|` or closer at or after `from`, within the current and next line.
fn find_link_data_end(s: &Stream<'_>, from: usize, syntax: LinkSyntax) -> Option<usize> {
    // `[::authority:]`: a header name may itself start with a colon.
    let search_from = match syntax {
        LinkSyntax::Header if s.byte_at(from) == Some(b':') => from + 1,
        _ => from,
    };
    let limit = s.next_line_start(s.next_line_start(search_from));
    let window = s.slice(search_from, limit);
    let closer = syntax.closer();
    window
        .char_indices()
        .find(|&(i, ch)| ch == '|' || window[i..].starts_with(closer))
        .map(|(i, _)| search_from + i)
}

fn visible_text(syntax: LinkSyntax, data: &LinkData) -> String {
    // {{Foo/constructor()}} shows as Foo(), naming what it links to.
    if syntax == LinkSyntax::Idl
        && let Some(args) = data.lt.strip_prefix("constructor")
        && args.starts_with('(')
        && let Some(link_for) = data.link_for.as_deref()
        && link_for != "/"
    {
        let name = link_for.rsplit('/').next().unwrap_or(link_for);
        return format!("{name}{args}");
    }
    data.lt.clone()
}

/// A CSS property or descriptor autolink, `'name'`, `'@rule/name'` or
/// `'name!!descriptor'`.
pub fn parse_css_propdesc(s: &Stream<'_>, start: usize) -> Parsed<Vec<Node>> {
    if s.byte_at(start) != Some(b'\'') || s.starts_with_at(start, "'-'") {
        return Parsed::Fail(start);
    }
    let inner_start = start + 1;
    let Some(found) = PROPDESC_RE.find(s.slice_from(inner_start)) else {
        return Parsed::Fail(start);
    };
    let inner_end = inner_start + found.end();
    let mut inner = found.as_str().to_string();

    if s.config().macros_in_autolinks && inner.contains('[') {
        let replaced = replace_macros_in_text(s, &inner, inner_start, &format!("'{inner}'"));
        match PROPDESC_RE.find(&replaced) {
            Some(m) => inner = m.as_str().to_string(),
            None => {
                s.die(
                    start,
                    format!(
                        "After macro replacement, couldn't parse a CSS property/descriptor autolink.\n  Original: '{inner}'\n  After macros: '{replaced}'"
                    ),
                );
                return Parsed::Fail(start);
            }
        }
    }
    let Some(caps) = PROPDESC_RE.captures(&inner) else {
        return Parsed::Fail(start);
    };
    let link_for = caps.get(1).map(|m| m.as_str());
    let lt = &caps[2];
    let explicit_type = caps.get(3).map(|m| m.as_str());

    if s.byte_at(inner_end) != Some(b'\'') {
        if link_for.is_none() && explicit_type.is_none() {
            // Just an apostrophe.
            return Parsed::Fail(start);
        }
        s.die(
            start,
            format!(
                "It appears that you meant to write a property/descriptor autolink ({}), but didn't finish it. Close it with a final ', or escape the initial ' character.",
                s.slice(start, inner_end)
            ),
        );
        let text = Node::safe_text(s.span(start, inner_end), s.slice(start, inner_end));
        return Parsed::Ok(vec![text], inner_end);
    }

    let link_type = match (explicit_type, link_for) {
        (None, None) => "property",
        (None, Some(_)) => "propdesc",
        (Some(t @ ("property" | "descriptor")), _) => t,
        (Some(other), _) => {
            s.die(
                start,
                format!(
                    "Propdesc link '{inner}' gave its type as '{other}', but only 'property' or 'descriptor' is allowed."
                ),
            );
            "propdesc"
        }
    };

    if s.in_tag_context("a") {
        s.die(
            start,
            "Parsed a CSS property autolink ('foo') inside of an <a>. Either close the <a> properly, or escape the autolink.".to_string(),
        );
    }

    let syntax = format!("'{inner}'");
    // Custom properties and wildcards aren't linkable.
    let tag = if lt.contains('*') || lt.starts_with("--") {
        TagBuilder::new("css").attr("bs-autolink-syntax", syntax)
    } else {
        let mut tag = TagBuilder::new("a")
            .attr("class", "property")
            .attr("data-link-type", link_type)
            .attr("data-lt", lt)
            .attr("bs-autolink-syntax", syntax);
        if let Some(link_for) = link_for {
            tag = tag.attr("data-link-for", link_for);
        }
        tag
    };
    let tag = tag.finish(s.span(start, inner_start));
    let name = tag.name().to_string();
    let node_end = inner_end + 1;
    let nodes = vec![
        Node::StartTag(tag),
        Node::safe_text(s.span(inner_start, inner_end), lt),
        Node::end_tag(s.span(inner_end, node_end), name),
    ];
    Parsed::Ok(nodes, node_end)
}

/// A repository issue link, `<#123>` or `<org/repo#123>`.
pub fn parse_repository_link(s: &Stream<'_>, start: usize) -> Parsed<Vec<Node>> {
    if s.byte_at(start) != Some(b'<') {
        return Parsed::Fail(start);
    }
    let mut i = start + 1;
    let mut repo = None;
    if let Parsed::Ok(org, org_end) = parse_tag_name(s, i)
        && s.byte_at(org_end) == Some(b'/')
        && let Parsed::Ok(name, name_end) = parse_tag_name(s, org_end + 1)
    {
        repo = Some((org, name));
        i = name_end;
    }
    if s.byte_at(i) != Some(b'#') {
        return Parsed::Fail(start);
    }
    let digits_start = i + 1;
    let mut digits_end = digits_start;
    while s.byte_at(digits_end).is_some_and(|b| b.is_ascii_digit()) {
        digits_end += 1;
    }
    let digits = digits_end - digits_start;
    if digits == 0 || digits > MAX_ISSUE_DIGITS || s.byte_at(digits_end) != Some(b'>') {
        return Parsed::Fail(start);
    }
    let num = s.slice(digits_start, digits_end);
    let node_end = digits_end + 1;
    let (text, issue) = match repo {
        Some((org, name)) => (
            format!("{org}/{name} issue #{num}"),
            format!("{org}/{name}#{num}"),
        ),
        None => (format!("issue #{num}"), format!("#{num}")),
    };
    let tag = TagBuilder::new("a")
        .attr("data-remote-issue-id", issue)
        .finish(s.span(start, start + 1));
    let nodes = vec![
        Node::StartTag(tag),
        Node::safe_text(s.span(start + 1, digits_end), text),
        Node::end_tag(s.span(digits_end, node_end), "a"),
    ];
    Parsed::Ok(nodes, node_end)
}

/// An algorithm variable, `|name|`, as a `<var>`.
pub fn parse_shorthand_variable(s: &Stream<'_>, start: usize) -> Parsed<Vec<Node>> {
    let Some(caps) = VARIABLE_RE.captures(s.slice_from(start)) else {
        return Parsed::Fail(start);
    };
    let node_end = start + caps[0].len();
    let tag = TagBuilder::new("var")
        .attr("bs-autolink-syntax", &caps[0])
        .finish(s.span(start, start + 1));
    let nodes = vec![
        Node::StartTag(tag),
        Node::raw_text(s.span(start + 1, node_end - 1), &caps[1]),
        Node::end_tag(s.span(node_end - 1, node_end), "var"),
    ];
    Parsed::Ok(nodes, node_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Tag;
    use crate::shared::{Diagnostics, ParseConfig};

    fn with_stream<R>(src: &str, f: impl FnOnce(&Stream<'_>, &Diagnostics) -> R) -> R {
        let config = ParseConfig::all_shorthands().with_macro("foo", "bar");
        let diags = Diagnostics::new();
        let s = Stream::new(src, &config, &diags, 1);
        f(&s, &diags)
    }

    fn complete(s: &Stream<'_>, syntax: LinkSyntax) -> (Vec<Node>, usize) {
        match parse_autolink(s, 0, syntax) {
            Parsed::Ok(Autolink::Complete(nodes), end) => (nodes, end),
            other => panic!("expected a complete autolink, got {other:?}"),
        }
    }

    fn link_tag(nodes: &[Node]) -> &Tag {
        nodes
            .iter()
            .find_map(|node| match node {
                Node::StartTag(tag) if tag.name() == "a" => Some(tag),
                _ => None,
            })
            .expect("autolink has an <a>")
    }

    #[test]
    fn link_data_grammar() {
        assert_eq!(
            LinkData::parse(" event  loop "),
            LinkData {
                lt: "event loop".to_string(),
                ..LinkData::default()
            }
        );
        assert_eq!(
            LinkData::parse("a/b/term!!dfn"),
            LinkData {
                lt: "term".to_string(),
                link_for: Some("a/b".to_string()),
                link_type: Some("dfn".to_string()),
            }
        );
        assert_eq!(LinkData::parse("/x").link_for.as_deref(), Some("/"));
        assert_eq!(LinkData::parse("\\[[slot]]").lt, "[[slot]]");
    }

    #[test]
    fn dfn_autolink() {
        with_stream("[=event loop=] x", |s, diags| {
            let (nodes, end) = complete(s, LinkSyntax::Dfn);
            assert_eq!(s.slice_from(end), " x");
            assert_eq!(nodes.len(), 3);
            let tag = link_tag(&nodes);
            assert_eq!(tag.attr("data-link-type"), Some("dfn"));
            assert_eq!(tag.attr("data-lt"), Some("event loop"));
            assert_eq!(tag.attr("bs-autolink-syntax"), Some("[=event loop=]"));
            assert_eq!(nodes[1].text(), Some("event loop"));
            assert!(diags.is_empty());
        });
    }

    #[test]
    fn abstract_op_and_header() {
        with_stream("[$Call/arg$]", |s, _| {
            let (nodes, _) = complete(s, LinkSyntax::AbstractOp);
            let tag = link_tag(&nodes);
            assert_eq!(tag.attr("data-link-type"), Some("abstract-op"));
            assert_eq!(tag.attr("data-link-for"), Some("Call"));
            assert_eq!(tag.attr("data-lt"), Some("arg"));
        });
        with_stream("[:Content-Type:]", |s, _| {
            let (nodes, end) = complete(s, LinkSyntax::Header);
            assert_eq!(end, s.len());
            let rendered: String = nodes.iter().map(Node::to_string).collect();
            assert_eq!(
                rendered,
                r#"`<code><a data-link-type="http-header" data-lt="Content-Type" bs-autolink-syntax="[:Content-Type:]">Content-Type</a></code>`"#
            );
        });
        with_stream("[::authority:]", |s, _| {
            let (nodes, _) = complete(s, LinkSyntax::Header);
            assert_eq!(link_tag(&nodes).attr("data-lt"), Some(":authority"));
        });
    }

    #[test]
    fn idl_autolinks() {
        with_stream("{{Window/constructor(x)}}", |s, diags| {
            let (nodes, _) = complete(s, LinkSyntax::Idl);
            let Node::StartTag(code) = &nodes[0] else {
                panic!("IDL links sit in a <code>");
            };
            assert_eq!(code.name(), "code");
            assert!(code.has_class("idl"));
            assert!(code.has_attr("nohighlight"));
            let tag = link_tag(&nodes);
            assert_eq!(tag.attr("data-link-type"), Some("idl"));
            assert_eq!(tag.attr("data-lt"), Some("constructor(x)"));
            assert_eq!(nodes[2].text(), Some("Window(x)"));
            assert_eq!(nodes.last().and_then(Node::tag_name), Some("code"));
            assert!(diags.is_empty());
        });
        with_stream("{{Foo!!attribute}}", |s, _| {
            let (nodes, _) = complete(s, LinkSyntax::Idl);
            assert_eq!(link_tag(&nodes).attr("data-link-type"), Some("attribute"));
        });
        with_stream("{{Foo!!dfn}}", |s, diags| {
            let (nodes, _) = complete(s, LinkSyntax::Idl);
            assert_eq!(link_tag(&nodes).attr("data-link-type"), Some("idl"));
            assert_eq!(diags.error_count(), 1);
            assert!(diags.messages()[0].contains("only IDL types are allowed"));
        });
    }

    #[test]
    fn cddl_and_markup() {
        with_stream("{^tstr^}", |s, _| {
            let (nodes, _) = complete(s, LinkSyntax::Cddl);
            assert_eq!(link_tag(&nodes).attr("data-link-type"), Some("cddl"));
        });
        let cases = [
            ("<{img}>", "element", None),
            ("<{img/src}>", "element-sub", Some("img")),
            ("<{input/type/text}>", "attr-value", Some("input/type")),
            ("<{img/alt!!element-attr}>", "element-attr", Some("img")),
        ];
        for (src, link_type, link_for) in cases {
            with_stream(src, |s, diags| {
                let (nodes, _) = complete(s, LinkSyntax::Markup);
                let tag = link_tag(&nodes);
                assert_eq!(tag.attr("data-link-type"), Some(link_type), "{src}");
                assert_eq!(tag.attr("data-link-for"), link_for, "{src}");
                assert!(diags.is_empty(), "{src}: {:?}", diags.messages());
            });
        }
    }

    #[test]
    fn wrong_type_is_reported() {
        with_stream("[=term!!idl=]", |s, diags| {
            let (nodes, _) = complete(s, LinkSyntax::Dfn);
            assert_eq!(link_tag(&nodes).attr("data-link-type"), Some("dfn"));
            assert!(diags.messages()[0].contains("but only 'dfn' is allowed"));
        });
    }

    #[test]
    fn unclosed_link_data() {
        with_stream("[=a\nb\nc=]", |s, diags| {
            assert!(parse_autolink(s, 0, LinkSyntax::Dfn).is_fail());
            assert_eq!(diags.error_count(), 1);
            assert!(diags.messages()[0].contains("escape the initial [ as &bs[;"));
        });
        with_stream("[=a\nb=]", |s, diags| {
            assert!(parse_autolink(s, 0, LinkSyntax::Dfn).is_ok());
            assert!(diags.is_empty());
        });
    }

    #[test]
    fn html_escape_in_link_data() {
        with_stream("[=a&amp;b=]", |s, diags| {
            assert!(parse_autolink(s, 0, LinkSyntax::Dfn).is_ok());
            assert!(diags.messages()[0].contains("HTML escape"));
        });
    }

    #[test]
    fn link_text_is_left_open() {
        with_stream("[=term|the <b>term</b>=]", |s, _| {
            let Parsed::Ok(Autolink::WithText(link), at) = parse_autolink(s, 0, LinkSyntax::Dfn)
            else {
                panic!("expected an open link");
            };
            assert_eq!(at, link.text_start);
            assert_eq!(s.slice_from(link.text_start), "the <b>term</b>=]");
            assert_eq!(link.opening.len(), 1);
            assert_eq!(link.fallback.len(), 3);
            assert_eq!(link.fallback[1].text(), Some("term"));
        });
    }

    #[test]
    fn macros_in_link_data() {
        let config = ParseConfig {
            dfn: true,
            macros_in_autolinks: true,
            ..ParseConfig::default()
        }
        .with_macro("thing", "widget");
        let diags = Diagnostics::new();
        let s = Stream::new("[=[THING]=]", &config, &diags, 1);
        let (nodes, _) = complete(&s, LinkSyntax::Dfn);
        assert_eq!(link_tag(&nodes).attr("data-lt"), Some("widget"));
        assert_eq!(
            link_tag(&nodes).attr("bs-autolink-syntax"),
            Some("[=[THING]=]")
        );
    }

    #[test]
    fn propdesc_autolinks() {
        with_stream("'color' x", |s, diags| {
            let Parsed::Ok(nodes, end) = parse_css_propdesc(s, 0) else {
                panic!("propdesc should parse");
            };
            assert_eq!(s.slice_from(end), " x");
            let rendered: String = nodes.iter().map(Node::to_string).collect();
            assert_eq!(
                rendered,
                r#"<a class="property" data-link-type="property" data-lt="color" bs-autolink-syntax="'color'">color</a>"#
            );
            assert!(diags.is_empty());
        });
        with_stream("'@font-face/src'", |s, _| {
            let Parsed::Ok(nodes, _) = parse_css_propdesc(s, 0) else {
                panic!("descriptor should parse");
            };
            let Node::StartTag(tag) = &nodes[0] else {
                panic!("expected a start tag");
            };
            assert_eq!(tag.attr("data-link-type"), Some("propdesc"));
            assert_eq!(tag.attr("data-link-for"), Some("@font-face"));
        });
        with_stream("'--custom'", |s, _| {
            let Parsed::Ok(nodes, _) = parse_css_propdesc(s, 0) else {
                panic!("custom property should parse");
            };
            assert_eq!(nodes[0].tag_name(), Some("css"));
            assert_eq!(nodes[2].tag_name(), Some("css"));
        });
    }

    #[test]
    fn propdesc_lookalikes() {
        with_stream("'s fine", |s, diags| {
            assert!(parse_css_propdesc(s, 0).is_fail());
            assert!(diags.is_empty());
        });
        with_stream("'-'", |s, _| assert!(parse_css_propdesc(s, 0).is_fail()));
        with_stream("'width!!property x", |s, diags| {
            let Parsed::Ok(nodes, end) = parse_css_propdesc(s, 0) else {
                panic!("a typed but unclosed propdesc keeps its text");
            };
            assert_eq!(nodes.len(), 1);
            assert_eq!(s.slice_from(end), " x");
            assert_eq!(diags.error_count(), 1);
        });
        with_stream("'width!!value'", |s, diags| {
            let Parsed::Ok(nodes, _) = parse_css_propdesc(s, 0) else {
                panic!("bad type still links");
            };
            let Node::StartTag(tag) = &nodes[0] else {
                panic!("expected a start tag");
            };
            assert_eq!(tag.attr("data-link-type"), Some("propdesc"));
            assert_eq!(diags.error_count(), 1);
        });
    }

    #[test]
    fn repository_links() {
        with_stream("<#42> x", |s, _| {
            let Parsed::Ok(nodes, end) = parse_repository_link(s, 0) else {
                panic!("issue link should parse");
            };
            assert_eq!(end, 5);
            let rendered: String = nodes.iter().map(Node::to_string).collect();
            assert_eq!(rendered, r##"<a data-remote-issue-id="#42">issue #42</a>"##);
        });
        with_stream("<w3c/csswg-drafts#1234>", |s, _| {
            let Parsed::Ok(nodes, end) = parse_repository_link(s, 0) else {
                panic!("repository link should parse");
            };
            assert_eq!(end, s.len());
            assert_eq!(nodes[1].text(), Some("w3c/csswg-drafts issue #1234"));
        });
        for src in ["<#>", "<#12", "<div>", "<a/b#x>", "<#123456789012>"] {
            with_stream(src, |s, _| assert!(parse_repository_link(s, 0).is_fail(), "{src}"));
        }
    }

    #[test]
    fn shorthand_variables() {
        with_stream("|new value| x", |s, _| {
            let Parsed::Ok(nodes, end) = parse_shorthand_variable(s, 0) else {
                panic!("variable should parse");
            };
            assert_eq!(s.slice_from(end), " x");
            let rendered: String = nodes.iter().map(Node::to_string).collect();
            assert_eq!(rendered, r#"<var bs-autolink-syntax="|new value|">new value</var>"#);
        });
        with_stream("| x|", |s, _| assert!(parse_shorthand_variable(s, 0).is_fail()));
        with_stream("||", |s, _| assert!(parse_shorthand_variable(s, 0).is_fail()));
    }
}
