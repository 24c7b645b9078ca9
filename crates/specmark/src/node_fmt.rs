//! Deterministic one-line-per-node formatting for snapshots and logs.

use std::fmt::Write;

use crate::node::{Node, Tag};

pub fn node_kind(node: &Node) -> &'static str {
    match node {
        Node::RawText(_) => "RAW",
        Node::SafeText(_) => "SAFE",
        Node::Doctype(_) => "DOCTYPE",
        Node::StartTag(_) => "START",
        Node::SelfClosedTag(_) => "SELFCLOSED",
        Node::EndTag(_) => "END",
        Node::Comment(_) => "COMMENT",
        Node::RawElement(_) => "RAWELEMENT",
    }
}

/// `KIND Lstart[-end] payload`, with text payloads quoted and escaped.
pub fn format_node(node: &Node) -> String {
    let span = node.span();
    let mut out = String::from(node_kind(node));
    if span.line == span.end_line {
        let _ = write!(&mut out, " L{}", span.line);
    } else {
        let _ = write!(&mut out, " L{}-{}", span.line, span.end_line);
    }
    match node {
        Node::RawText(t) | Node::SafeText(t) => {
            let _ = write!(&mut out, " text=\"{}\"", escape_text(&t.text));
        }
        Node::Doctype(d) => {
            let _ = write!(&mut out, " data=\"{}\"", escape_text(&d.data));
        }
        Node::StartTag(tag) | Node::SelfClosedTag(tag) => push_tag(&mut out, tag),
        Node::EndTag(end) => {
            let _ = write!(&mut out, " name={}", end.name);
            if end.synthetic {
                out.push_str(" synthetic");
            }
        }
        Node::Comment(c) => {
            let _ = write!(&mut out, " text=\"{}\"", escape_text(&c.data));
        }
        Node::RawElement(el) => {
            push_tag(&mut out, &el.start_tag);
            let _ = write!(&mut out, " data=\"{}\"", escape_text(&el.data));
        }
    }
    out
}

pub fn format_nodes(nodes: &[Node]) -> Vec<String> {
    nodes.iter().map(format_node).collect()
}

fn push_tag(out: &mut String, tag: &Tag) {
    out.push_str(" name=");
    out.push_str(tag.name());
    out.push_str(" attrs=[");
    for (i, (name, value)) in tag.attrs().iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        if value.is_empty() {
            out.push_str(name);
        } else {
            let _ = write!(out, "{name}=\"{}\"", escape_text(value));
        }
    }
    out.push(']');
    if !tag.classes().is_empty() {
        let _ = write!(out, " classes=[{}]", tag.classes().joined());
    }
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch < ' ' || ch == '\u{7f}' || ch == '\u{200b}' => {
                let _ = write!(&mut out, "\\u{{{:02X}}}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
    out
}
