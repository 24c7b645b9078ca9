//! Angle-bracket constructs: tags, attributes, comments, the doctype and
//! raw-text elements.

use super::charref::{CharRefContext, numeric_refs, parse_char_ref};
use super::macros::{parse_macro_to_attrs, replace_macros_in_text};
use crate::node::{
    Attributes, Comment, Doctype, Node, RawElement, Tag, TagBuilder, is_void_element,
};
use crate::shared::preds::{is_attr_name_char, is_tagname_char, is_whitespace, is_xmlish_tagname};
use crate::shared::{Parsed, Stream};

/// `<pre>` classes whose content is a data block rather than markup.
pub const DATABLOCK_CLASSES: &[&str] = &[
    "simpledef",
    "propdef",
    "descdef",
    "elementdef",
    "argumentdef",
    "railroad",
    "biblio",
    "anchors",
    "link-defaults",
    "ignored-specs",
    "info",
    "include",
    "include-code",
    "include-raw",
];

/// Elements whose content is captured verbatim up to their end tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RawKind {
    Script,
    Style,
    Xmp,
    DatablockPre,
}

impl RawKind {
    fn of(tag: &Tag) -> Option<RawKind> {
        match tag.name() {
            "script" => Some(RawKind::Script),
            "style" => Some(RawKind::Style),
            "xmp" => Some(RawKind::Xmp),
            "pre" if is_datablock_pre(tag) => Some(RawKind::DatablockPre),
            _ => None,
        }
    }

    fn end_tag(self) -> &'static str {
        match self {
            RawKind::Script => "</script>",
            RawKind::Style => "</style>",
            RawKind::Xmp => "</xmp>",
            RawKind::DatablockPre => "</pre>",
        }
    }

    fn label(self) -> &'static str {
        match self {
            RawKind::Script => "a <script>",
            RawKind::Style => "a <style>",
            RawKind::Xmp => "an <xmp>",
            RawKind::DatablockPre => "a <pre> datablock",
        }
    }

    fn contents_label(self) -> &'static str {
        match self {
            RawKind::Script => "<script> contents",
            RawKind::Style => "<style> contents",
            RawKind::Xmp => "<xmp> contents",
            RawKind::DatablockPre => "<pre> contents",
        }
    }
}

pub fn is_datablock_pre(tag: &Tag) -> bool {
    DATABLOCK_CLASSES.iter().any(|class| tag.has_class(class))
}

/// Everything that starts with `<`: doctype, comment, start tag (with its
/// raw content where applicable) or end tag.
pub fn parse_angle_start(s: &Stream<'_>, start: usize) -> Parsed<Vec<Node>> {
    if s.byte_at(start + 1) == Some(b'!') {
        return parse_doctype(s, start)
            .or_else(|| parse_comment(s, start))
            .map(|node| vec![node]);
    }

    if let Parsed::Ok(node, i) = parse_start_tag(s, start) {
        let Node::StartTag(tag) = node else {
            return Parsed::Ok(vec![node], i);
        };
        if matches!(tag.name(), "pre" | "xmp")
            && let Parsed::Ok(el, end) = parse_metadata_block(s, start, &tag, i)
        {
            return Parsed::Ok(vec![el], end);
        }
        let Some(kind) = RawKind::of(&tag) else {
            return Parsed::Ok(vec![Node::StartTag(tag)], i);
        };
        let Parsed::Ok(mut text, end) = parse_raw_to_end(s, i, kind) else {
            return Parsed::Fail(start);
        };
        if tag.has_attr("bs-macros") {
            text = replace_macros_in_text(s, &text, start, kind.contents_label());
        }
        let el = RawElement {
            span: s.span(start, end),
            start_tag: tag,
            data: text,
        };
        return Parsed::Ok(vec![Node::RawElement(el)], end);
    }

    parse_end_tag(s, start).map(|node| vec![node])
}

pub fn parse_tag_name<'a>(s: &Stream<'a>, start: usize) -> Parsed<&'a str> {
    if !s.byte_at(start).is_some_and(|b| b.is_ascii_alphabetic()) {
        return Parsed::Fail(start);
    }
    let mut end = s.next_index(start);
    while let Some(ch) = s.char_at(end)
        && is_tagname_char(ch)
    {
        end += ch.len_utf8();
    }
    Parsed::Ok(s.slice(start, end), end)
}

pub fn parse_whitespace(s: &Stream<'_>, start: usize) -> Parsed<()> {
    let mut i = start;
    while let Some(ch) = s.char_at(i)
        && is_whitespace(ch)
    {
        i += 1;
    }
    if i == start {
        Parsed::Fail(start)
    } else {
        Parsed::Ok((), i)
    }
}

/// Parses a start tag, producing a `StartTag` or a `SelfClosedTag`.
///
/// Once `<name` has matched the tag is committed: later problems are
/// reported before failing.
pub fn parse_start_tag(s: &Stream<'_>, start: usize) -> Parsed<Node> {
    if s.byte_at(start) != Some(b'<') {
        return Parsed::Fail(start);
    }
    let Parsed::Ok(name, i) = parse_tag_name(s, start + 1) else {
        return Parsed::Fail(start);
    };
    let Parsed::Ok(attrs, i) = parse_attribute_list(s, i) else {
        return Parsed::Fail(start);
    };
    let mut i = parse_whitespace(s, i).index();
    let builder = TagBuilder::new(name).with_attrs(attrs);

    if s.byte_at(i) == Some(b'/') {
        let closes = s.byte_at(i + 1) == Some(b'>');
        if closes && (matches!(name, "br" | "link" | "meta") || is_xmlish_tagname(name)) {
            let tag = builder.finish(s.span(start, i + 2));
            return Parsed::Ok(Node::SelfClosedTag(tag), i + 2);
        }
        if is_void_element(name) {
            s.warn(
                start,
                format!("Void element (<{name}>) with a spurious trailing /."),
            );
            i += 1;
        } else {
            s.die(
                start,
                format!(
                    "Invalid use of self-closing syntax (trailing / on start tag) on a non-XML element (<{name}>). Remove the spurious /, or close the element with an end tag."
                ),
            );
            return Parsed::Fail(start);
        }
    }

    if s.byte_at(i) == Some(b'>') {
        let tag = builder.finish(s.span(start, i + 1));
        let node = if tag.is_void() {
            Node::SelfClosedTag(tag)
        } else {
            Node::StartTag(tag)
        };
        return Parsed::Ok(node, i + 1);
    }

    if s.eof(i) {
        s.die(start, format!("Tag <{name}> wasn't closed at end of file."));
        return Parsed::Fail(start);
    }

    // Show a little of what went wrong without flooding the output.
    let next20: String = s.slice_from(i).chars().take(20).collect();
    let garbage_end = next20.find(['>', ' ']);
    match garbage_end {
        Some(end) => s.die(
            i,
            format!(
                "While trying to parse a <{name}> start tag, ran into some unparseable stuff ({}).",
                &next20[..end]
            ),
        ),
        None => s.die(
            i,
            format!("While trying to parse a <{name}> start tag, ran into some unparseable stuff."),
        ),
    }
    Parsed::Fail(start)
}

/// Attributes up to (not including) the tag's closing `/` or `>`.
pub fn parse_attribute_list(s: &Stream<'_>, start: usize) -> Parsed<Attributes> {
    let mut i = parse_whitespace(s, start).index();
    let mut attrs = Attributes::new();
    while !s.eof(i) {
        let attr_start = i;
        let ch = s.char_at(i);

        // A macro may stand in for attributes.
        if ch == Some('[') {
            let Parsed::Ok(macro_attrs, end) = parse_macro_to_attrs(s, i) else {
                break;
            };
            i = end;
            let macro_name = s.slice(attr_start, i);
            for (k, v) in macro_attrs.iter() {
                if !attrs.insert(k, v) {
                    s.die(
                        attr_start,
                        format!(
                            "Attribute '{k}', coming from the {macro_name} macro, already exists on the element."
                        ),
                    );
                }
            }
        } else if ch.is_some_and(is_attr_name_char) {
            let Parsed::Ok((name, mut value), end) = parse_attribute(s, i) else {
                break;
            };
            i = end;
            if attrs.contains(&name) {
                s.die(
                    attr_start,
                    format!("Attribute '{name}' appears twice in the tag."),
                );
                return Parsed::Fail(start);
            }
            if value.contains('[') {
                value = replace_macros_in_text(s, &value, i, &format!("attribute {name}='...'"));
            }
            attrs.insert(name, value);
        } else {
            break;
        }

        let Parsed::Ok((), after_ws) = parse_whitespace(s, i) else {
            // Out of attributes; decide whether that's an error.
            if !s.eof(i) && !matches!(s.byte_at(i), Some(b'/' | b'>')) {
                s.die(
                    i,
                    format!(
                        "Expected whitespace between attributes. ({}...)",
                        s.slice(attr_start, i + 5)
                    ),
                );
            }
            break;
        };
        i = after_ws;
    }
    Parsed::Ok(attrs, i)
}

fn parse_attribute(s: &Stream<'_>, start: usize) -> Parsed<(String, String)> {
    let mut i = start;
    while let Some(ch) = s.char_at(i)
        && is_attr_name_char(ch)
    {
        i += ch.len_utf8();
    }
    if i == start {
        return Parsed::Fail(start);
    }
    let name = s.slice(start, i).to_string();
    let end_of_name = i;
    i = parse_whitespace(s, i).index();
    if s.byte_at(i) != Some(b'=') {
        return Parsed::Ok((name, String::new()), end_of_name);
    }
    i = parse_whitespace(s, i + 1).index();

    let value = match s.byte_at(i) {
        Some(b'"' | b'\'') => parse_quoted_attr_value(s, i),
        _ => parse_unquoted_attr_value(s, i),
    };
    match value {
        Parsed::Ok(value, end) => Parsed::Ok((name, value), end),
        Parsed::Fail(_) => {
            s.die(i, format!("Garbage after {name}=."));
            Parsed::Fail(start)
        }
    }
}

fn parse_quoted_attr_value(s: &Stream<'_>, start: usize) -> Parsed<String> {
    let Some(quote) = s.byte_at(start) else {
        return Parsed::Fail(start);
    };
    let mut i = start + 1;
    let mut value = String::new();
    let mut seg_start = i;
    loop {
        match s.byte_at(i) {
            None => {
                s.die(start, "Quoted attribute was never closed".to_string());
                return Parsed::Fail(start);
            }
            Some(b) if b == quote => break,
            Some(b'&') => {
                let ref_start = i;
                match parse_char_ref(s, i, CharRefContext::Attr) {
                    Parsed::Ok(text, end) => {
                        value.push_str(s.slice(seg_start, ref_start));
                        value.push_str(&numeric_refs(&text));
                        i = end;
                        seg_start = i;
                    }
                    Parsed::Fail(_) => i += 1,
                }
            }
            Some(_) => i += 1,
        }
    }
    value.push_str(s.slice(seg_start, i));
    Parsed::Ok(value, i + 1)
}

fn parse_unquoted_attr_value(s: &Stream<'_>, start: usize) -> Parsed<String> {
    let mut i = start;
    let mut value = String::new();
    let mut seg_start = i;
    while let Some(ch) = s.char_at(i) {
        if ch == '>' || is_whitespace(ch) {
            break;
        }
        if matches!(ch, '"' | '\'' | '<' | '`') {
            s.die(
                start,
                format!(
                    "Character {ch} (at {}) is invalid in unquoted attribute values.",
                    s.loc(i)
                ),
            );
            return Parsed::Fail(start);
        }
        if ch == '&' {
            let ref_start = i;
            if let Parsed::Ok(text, end) = parse_char_ref(s, i, CharRefContext::Attr) {
                value.push_str(s.slice(seg_start, ref_start));
                value.push_str(&numeric_refs(&text));
                i = end;
                seg_start = i;
                continue;
            }
        }
        i += ch.len_utf8();
    }
    if i == start {
        s.die(start, "Missing attribute value.".to_string());
        return Parsed::Fail(start);
    }
    value.push_str(s.slice(seg_start, i));
    Parsed::Ok(value, i)
}

pub fn parse_end_tag(s: &Stream<'_>, start: usize) -> Parsed<Node> {
    if !s.starts_with_at(start, "</") {
        return Parsed::Fail(start);
    }
    let i = start + 2;
    if s.byte_at(i) == Some(b'>') {
        s.die(start, "Missing end tag name. (Got </>.)".to_string());
        return Parsed::Fail(start);
    }
    if s.eof(i) {
        s.die(start, "Hit EOF in the middle of an end tag.".to_string());
        return Parsed::Fail(start);
    }
    let Parsed::Ok(name, i) = parse_tag_name(s, i) else {
        s.die(start, "Garbage in an end tag.".to_string());
        return Parsed::Fail(start);
    };
    if s.eof(i) {
        s.die(
            start,
            format!("Hit EOF in the middle of an end tag </{name}>."),
        );
        return Parsed::Fail(start);
    }
    if s.byte_at(i) != Some(b'>') {
        s.die(start, format!("Garbage after the tagname in </{name}>."));
        return Parsed::Fail(start);
    }
    Parsed::Ok(Node::end_tag(s.span(start, i + 1), name), i + 1)
}

pub fn parse_comment(s: &Stream<'_>, start: usize) -> Parsed<Node> {
    if !s.starts_with_at(start, "<!") {
        return Parsed::Fail(start);
    }
    if !s.starts_with_at(start + 2, "--") {
        s.die(
            start,
            format!("Malformed HTML comment '{}'.", s.slice(start, start + 10)),
        );
        return Parsed::Fail(start);
    }
    let data_start = start + 4;
    let mut i = data_start;
    loop {
        let Parsed::Ok(_, dash) = s.skip_to(i, "-") else {
            s.die(start, "Hit EOF in the middle of a comment.".to_string());
            return Parsed::Fail(start);
        };
        if s.starts_with_at(dash, "-->") {
            let node = Node::Comment(Comment {
                span: s.span(start, dash + 3),
                data: s.slice(data_start, dash).to_string(),
            });
            return Parsed::Ok(node, dash + 3);
        }
        if s.starts_with_at(dash, "--!>") {
            s.die(
                start,
                "Malformed comment - don't use a ! at the end.".to_string(),
            );
            return Parsed::Fail(start);
        }
        i = dash + 1;
    }
}

pub fn parse_doctype(s: &Stream<'_>, start: usize) -> Parsed<Node> {
    if !s.starts_with_at(start, "<!") {
        return Parsed::Fail(start);
    }
    if !s.slice(start + 2, start + 9).eq_ignore_ascii_case("doctype") {
        return Parsed::Fail(start);
    }
    if !s.slice(start + 9, start + 15).eq_ignore_ascii_case(" html>") {
        s.die(
            start,
            "Unnecessarily complex doctype - use <!doctype html>.".to_string(),
        );
        return Parsed::Fail(start);
    }
    let node = Node::Doctype(Doctype {
        span: s.span(start, start + 15),
        data: s.slice(start, start + 15).to_string(),
    });
    Parsed::Ok(node, start + 15)
}

/// Captures raw content from `start` (just past the start tag) through the
/// matching end tag.
fn parse_raw_to_end(s: &Stream<'_>, start: usize, kind: RawKind) -> Parsed<String> {
    let end_tag = kind.end_tag();
    match s.skip_to(start, end_tag) {
        Parsed::Ok(text, at) => Parsed::Ok(text.to_string(), at + end_tag.len()),
        Parsed::Fail(_) => {
            s.die(start, format!("Hit EOF in the middle of {}.", kind.label()));
            match kind {
                RawKind::DatablockPre => Parsed::Fail(start),
                RawKind::Script | RawKind::Style | RawKind::Xmp => {
                    Parsed::Ok(s.slice_from(start).to_string(), s.len())
                }
            }
        }
    }
}

/// A line-based metadata block: `<pre class=metadata>` (or `<xmp>`) at the
/// very start of a line, closed by an end tag that starts a line.
///
/// `tag` and `after_tag` come from the already-parsed start tag.
fn parse_metadata_block(
    s: &Stream<'_>,
    start: usize,
    tag: &Tag,
    after_tag: usize,
) -> Parsed<Node> {
    if start != s.current_line_start(start) || !tag.has_class("metadata") {
        return Parsed::Fail(start);
    }
    let end_tag = if tag.name() == "pre" { "</pre>" } else { "</xmp>" };

    let Parsed::Ok(first, mut i) = s.skip_to_next_line(after_tag) else {
        return Parsed::Fail(start);
    };
    if !first.trim().is_empty() {
        s.die(
            start,
            "Significant text on the same line as the metadata start tag isn't allowed.".to_string(),
        );
    }
    let mut contents = first.to_string();
    loop {
        if s.eof(i) {
            s.die(
                start,
                "Hit EOF while trying to parse a metadata block.".to_string(),
            );
            break;
        }
        let Parsed::Ok(line, next) = s.skip_to_next_line(i) else {
            break;
        };
        let Some(rest) = line.strip_prefix(end_tag) else {
            contents.push_str(line);
            i = next;
            continue;
        };
        // End on the closing tag's line, leaving its newline unconsumed.
        i = if line.ends_with('\n') { next - 1 } else { next };
        if !rest.trim().is_empty() {
            s.die(
                i,
                "Significant text on the same line as the metadata end tag isn't allowed.".to_string(),
            );
        }
        break;
    }

    let el = RawElement {
        span: s.span(start, i),
        start_tag: tag.clone().renamed("xmp"),
        data: contents,
    };
    Parsed::Ok(Node::RawElement(el), i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{Diagnostics, ParseConfig};

    fn with_stream<R>(src: &str, f: impl FnOnce(&Stream<'_>, &Diagnostics) -> R) -> R {
        let config = ParseConfig::default()
            .with_macro("attrs", "id=foo title=bar")
            .with_macro("name", "world");
        let diags = Diagnostics::new();
        let s = Stream::new(src, &config, &diags, 1);
        f(&s, &diags)
    }

    fn start_tag(node: &Node) -> &Tag {
        match node {
            Node::StartTag(tag) | Node::SelfClosedTag(tag) => tag,
            other => panic!("expected a tag, got {other:?}"),
        }
    }

    #[test]
    fn attributes_in_order() {
        with_stream(r#"<a href="x" data-a=1 hidden class='b c'>"#, |s, diags| {
            let Parsed::Ok(node, end) = parse_start_tag(s, 0) else {
                panic!("start tag should parse");
            };
            assert_eq!(end, s.len());
            let tag = start_tag(&node);
            let attrs: Vec<_> = tag.attrs().iter().collect();
            assert_eq!(attrs, vec![("href", "x"), ("data-a", "1"), ("hidden", "")]);
            assert!(tag.has_class("b") && tag.has_class("c"));
            assert!(diags.is_empty());
        });
    }

    #[test]
    fn duplicate_attribute_fails() {
        with_stream(r#"<a id=x id=y>"#, |s, diags| {
            assert!(parse_start_tag(s, 0).is_fail());
            assert_eq!(diags.messages(), vec!["Attribute 'id' appears twice in the tag."]);
        });
    }

    #[test]
    fn self_closing_rules() {
        for src in ["<br/>", "<br />", r#"<circle r="1"/>"#] {
            with_stream(src, |s, diags| {
                let res = parse_start_tag(s, 0);
                assert!(
                    matches!(res, Parsed::Ok(Node::SelfClosedTag(_), _)),
                    "{src}"
                );
                assert!(diags.is_empty(), "{src}");
            });
        }
        with_stream("<div/>", |s, diags| {
            assert!(parse_start_tag(s, 0).is_fail());
            assert_eq!(diags.error_count(), 1);
            assert!(diags.messages()[0].contains("self-closing syntax"));
            assert!(diags.messages()[0].contains("spurious /"));
        });
        with_stream("<img/>", |s, diags| {
            let res = parse_start_tag(s, 0);
            assert!(matches!(res, Parsed::Ok(Node::SelfClosedTag(_), 6)));
            assert_eq!(diags.len(), 1);
            assert_eq!(diags.error_count(), 0);
            assert!(diags.messages()[0].contains("spurious trailing /"));
        });
    }

    #[test]
    fn void_elements_self_close() {
        with_stream("<hr>", |s, _| {
            assert!(matches!(
                parse_start_tag(s, 0),
                Parsed::Ok(Node::SelfClosedTag(_), 4)
            ));
        });
    }

    #[test]
    fn char_refs_in_attributes_are_normalized() {
        with_stream(r#"<a title="a &amp; b" href="?x=1&y=2">"#, |s, diags| {
            let Parsed::Ok(node, _) = parse_start_tag(s, 0) else {
                panic!("start tag should parse");
            };
            let tag = start_tag(&node);
            assert_eq!(tag.attr("title"), Some("a &#38; b"));
            assert_eq!(tag.attr("href"), Some("?x=1&y=2"));
            assert!(diags.is_empty());
        });
    }

    #[test]
    fn macros_in_attributes() {
        with_stream(r#"<p [ATTRS] data-x="hello [NAME]">"#, |s, diags| {
            let Parsed::Ok(node, _) = parse_start_tag(s, 0) else {
                panic!("start tag should parse");
            };
            let tag = start_tag(&node);
            assert_eq!(tag.attr("id"), Some("foo"));
            assert_eq!(tag.attr("title"), Some("bar"));
            assert_eq!(tag.attr("data-x"), Some("hello world"));
            assert!(diags.is_empty());
        });
    }

    #[test]
    fn unquoted_value_errors() {
        with_stream("<a title=x\"y>", |s, diags| {
            assert!(parse_start_tag(s, 0).is_fail());
            assert!(diags.messages()[0].contains("invalid in unquoted attribute values"));
        });
        with_stream("<a title=>", |s, diags| {
            assert!(parse_start_tag(s, 0).is_fail());
            assert_eq!(diags.messages()[0], "Missing attribute value.");
        });
        with_stream("<a title=\"open", |s, diags| {
            assert!(parse_start_tag(s, 0).is_fail());
            assert_eq!(diags.messages()[0], "Quoted attribute was never closed");
        });
    }

    #[test]
    fn missing_whitespace_between_attributes() {
        with_stream(r#"<a b="1"c="2">"#, |s, diags| {
            assert!(parse_start_tag(s, 0).is_fail());
            assert!(diags.messages()[0].starts_with("Expected whitespace between attributes."));
        });
    }

    #[test]
    fn not_a_tag() {
        with_stream("< b", |s, diags| {
            assert!(parse_angle_start(s, 0).is_fail());
            assert!(diags.is_empty());
        });
    }

    #[test]
    fn end_tags() {
        with_stream("</div>", |s, _| {
            let Parsed::Ok(nodes, 6) = parse_angle_start(s, 0) else {
                panic!("end tag should parse");
            };
            assert_eq!(nodes[0].tag_name(), Some("div"));
        });
        with_stream("</>", |s, diags| {
            assert!(parse_end_tag(s, 0).is_fail());
            assert_eq!(diags.messages()[0], "Missing end tag name. (Got </>.)");
        });
        with_stream("</div x>", |s, diags| {
            assert!(parse_end_tag(s, 0).is_fail());
            assert_eq!(diags.messages()[0], "Garbage after the tagname in </div>.");
        });
    }

    #[test]
    fn comments_and_doctype() {
        with_stream("<!-- a - b -->", |s, _| {
            let Parsed::Ok(nodes, end) = parse_angle_start(s, 0) else {
                panic!("comment should parse");
            };
            assert_eq!(end, s.len());
            assert!(matches!(&nodes[0], Node::Comment(c) if c.data == " a - b "));
        });
        with_stream("<!-- x --!>", |s, diags| {
            assert!(parse_angle_start(s, 0).is_fail());
            assert_eq!(diags.error_count(), 1);
        });
        with_stream("<!DOCTYPE html>", |s, _| {
            assert!(matches!(
                parse_angle_start(s, 0),
                Parsed::Ok(ref nodes, 15) if matches!(nodes[0], Node::Doctype(_))
            ));
        });
    }

    #[test]
    fn raw_elements() {
        with_stream("<script>if (a < b) {}</script>tail", |s, _| {
            let Parsed::Ok(nodes, end) = parse_angle_start(s, 0) else {
                panic!("script should parse");
            };
            assert_eq!(s.slice_from(end), "tail");
            let Node::RawElement(el) = &nodes[0] else {
                panic!("expected a raw element");
            };
            assert_eq!(el.data, "if (a < b) {}");
            assert_eq!(el.tag(), "script");
        });
        with_stream("<style>a{}", |s, diags| {
            let Parsed::Ok(nodes, end) = parse_angle_start(s, 0) else {
                panic!("unterminated style still yields its content");
            };
            assert_eq!(end, s.len());
            assert!(matches!(&nodes[0], Node::RawElement(el) if el.data == "a{}"));
            assert_eq!(diags.messages()[0], "Hit EOF in the middle of a <style>.");
        });
        with_stream("<pre class=propdef>\nName: foo", |s, diags| {
            assert!(parse_angle_start(s, 0).is_fail());
            assert_eq!(diags.error_count(), 1);
        });
    }

    #[test]
    fn bs_macros_on_raw_content() {
        with_stream("<xmp bs-macros>hi [NAME]</xmp>", |s, _| {
            let Parsed::Ok(nodes, _) = parse_angle_start(s, 0) else {
                panic!("xmp should parse");
            };
            assert!(matches!(&nodes[0], Node::RawElement(el) if el.data == "hi world"));
        });
    }

    #[test]
    fn metadata_blocks() {
        let src = "<pre class=metadata>\nTitle: Foo\nShortname: foo\n</pre>\nafter";
        with_stream(src, |s, diags| {
            let Parsed::Ok(nodes, end) = parse_angle_start(s, 0) else {
                panic!("metadata should parse");
            };
            assert_eq!(s.slice_from(end), "\nafter");
            let Node::RawElement(el) = &nodes[0] else {
                panic!("expected a raw element");
            };
            assert_eq!(el.tag(), "xmp");
            assert_eq!(el.data, "\nTitle: Foo\nShortname: foo\n");
            assert!(diags.is_empty());
        });
    }

    #[test]
    fn indented_metadata_is_an_ordinary_pre() {
        with_stream("  <pre class=metadata>", |s, _| {
            let Parsed::Ok(nodes, _) = parse_angle_start(s, 2) else {
                panic!("pre should parse");
            };
            assert!(matches!(&nodes[0], Node::StartTag(tag) if tag.name() == "pre"));
        });
    }

    #[test]
    fn metadata_reports_trailing_text() {
        let src = "<xmp class=metadata> junk\nA: b\n</xmp> more";
        with_stream(src, |s, diags| {
            assert!(parse_angle_start(s, 0).is_ok());
            assert_eq!(diags.error_count(), 2);
        });
    }
}
