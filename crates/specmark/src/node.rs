//! Parser output nodes.
//!
//! The parser emits a flat, ordered sequence of [`Node`]s; tree assembly is
//! left to consumers. Every node records the source lines it spans so that
//! serialization can keep downstream line numbering exact.
//!
//! Determinism contract:
//! - Attributes keep source encounter order; no hash-based storage.
//! - Classes are an ordered set in first-seen order.

use std::fmt;
use std::sync::Arc;

/// Source provenance of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    /// 1-based line where the construct starts.
    pub line: usize,
    /// 1-based line where the construct ends.
    pub end_line: usize,
    pub loc: String,
    pub end_loc: String,
    pub context: Option<Arc<str>>,
}

impl Span {
    pub fn height(&self) -> usize {
        self.end_line.saturating_sub(self.line)
    }

    /// Zero-width span at the start of `self`.
    pub fn collapsed(&self) -> Span {
        Span {
            line: self.line,
            end_line: self.line,
            loc: self.loc.clone(),
            end_loc: self.loc.clone(),
            context: self.context.clone(),
        }
    }
}

/// Ordered attribute map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    /// Adds a new attribute; returns `false` (and changes nothing) if
    /// `name` is already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.push((name, value.into()));
        true
    }

    /// Adds or overwrites in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    fn remove_at(&mut self, name: &str) -> Option<(usize, String)> {
        let pos = self.entries.iter().position(|(k, _)| k == name)?;
        Some((pos, self.entries.remove(pos).1))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

/// Ordered set of class names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classes {
    names: Vec<String>,
}

impl Classes {
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !name.is_empty() && !self.contains(&name) {
            self.names.push(name);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn joined(&self) -> String {
        self.names.join(" ")
    }
}

/// A finalized start or self-closed tag.
///
/// Built through [`TagBuilder`]; once built, `classes` is authoritative and
/// no `class` attribute remains in `attrs`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    span: Span,
    name: String,
    attrs: Attributes,
    classes: Classes,
    // Where the `class` attribute sat among `attrs`, for serialization.
    class_pos: Option<usize>,
}

impl Tag {
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains(name)
    }

    pub fn classes(&self) -> &Classes {
        &self.classes
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains(name)
    }

    pub fn is_void(&self) -> bool {
        is_void_element(&self.name)
    }

    /// Same tag under a different element name.
    pub fn renamed(mut self, name: impl Into<String>) -> Tag {
        self.name = name.into();
        self
    }

    pub(crate) fn write_open(&self, out: &mut String, line_numbers: bool) {
        out.push('<');
        out.push_str(&self.name);
        if line_numbers {
            push_attr(out, "bs-line-number", &escape_attr(&self.span.loc));
            if let Some(context) = &self.span.context {
                push_attr(out, "bs-parse-context", &escape_attr(context));
            }
        }
        let class_pos = match self.class_pos {
            Some(pos) => pos.min(self.attrs.len()),
            None => self.attrs.len(),
        };
        for (i, (k, v)) in self.attrs.iter().enumerate() {
            if i == class_pos {
                self.write_classes(out);
            }
            if line_numbers && k == "bs-line-number" {
                continue;
            }
            push_attr(out, k, v);
        }
        if class_pos == self.attrs.len() {
            self.write_classes(out);
        }
        out.push('>');
    }

    fn write_classes(&self, out: &mut String) {
        if !self.classes.is_empty() {
            push_attr(out, "class", &self.classes.joined());
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    if !value.is_empty() {
        out.push_str("=\"");
        out.push_str(&value.replace('"', "&#34;"));
        out.push('"');
    }
}

/// Builder for [`Tag`]; `finish` performs the one-time class promotion.
#[derive(Clone, Debug)]
pub struct TagBuilder {
    name: String,
    attrs: Attributes,
    extra_classes: Vec<String>,
}

impl TagBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Attributes::new(),
            extra_classes: Vec::new(),
        }
    }

    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.set(name, value);
        self
    }

    pub fn class(mut self, name: impl Into<String>) -> Self {
        self.extra_classes.push(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn finish(mut self, span: Span) -> Tag {
        let mut classes = Classes::default();
        let class_pos = match self.attrs.remove_at("class") {
            Some((pos, value)) => {
                for name in value.split_ascii_whitespace() {
                    classes.insert(name);
                }
                Some(pos)
            }
            None => None,
        };
        for name in self.extra_classes {
            classes.insert(name);
        }
        Tag {
            span,
            name: self.name,
            attrs: self.attrs,
            classes,
            class_pos,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Text {
    pub span: Span,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndTag {
    pub span: Span,
    pub name: String,
    /// Inserted by auto-closing rather than written in the source.
    pub synthetic: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub span: Span,
    pub data: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Doctype {
    pub span: Span,
    pub data: String,
}

/// An element whose content is captured verbatim and never re-parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawElement {
    pub span: Span,
    pub start_tag: Tag,
    pub data: String,
}

impl RawElement {
    pub fn tag(&self) -> &str {
        self.start_tag.name()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// Source text; may contain markup metacharacters.
    RawText(Text),
    /// Text that is escaped on serialization.
    SafeText(Text),
    Doctype(Doctype),
    StartTag(Tag),
    SelfClosedTag(Tag),
    EndTag(EndTag),
    Comment(Comment),
    RawElement(RawElement),
}

impl Node {
    pub fn span(&self) -> &Span {
        match self {
            Node::RawText(t) | Node::SafeText(t) => &t.span,
            Node::Doctype(d) => &d.span,
            Node::StartTag(t) | Node::SelfClosedTag(t) => &t.span,
            Node::EndTag(t) => &t.span,
            Node::Comment(c) => &c.span,
            Node::RawElement(e) => &e.span,
        }
    }

    pub fn line(&self) -> usize {
        self.span().line
    }

    pub fn end_line(&self) -> usize {
        self.span().end_line
    }

    pub fn height(&self) -> usize {
        self.span().height()
    }

    /// Element name for tag-like nodes.
    pub fn tag_name(&self) -> Option<&str> {
        match self {
            Node::StartTag(t) | Node::SelfClosedTag(t) => Some(t.name()),
            Node::EndTag(t) => Some(&t.name),
            Node::RawElement(e) => Some(e.tag()),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::RawText(_) | Node::SafeText(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Node::RawText(t) | Node::SafeText(t) => Some(&t.text),
            _ => None,
        }
    }

    pub fn raw_text(span: Span, text: impl Into<String>) -> Node {
        Node::RawText(Text {
            span,
            text: text.into(),
        })
    }

    pub fn safe_text(span: Span, text: impl Into<String>) -> Node {
        Node::SafeText(Text {
            span,
            text: text.into(),
        })
    }

    pub fn end_tag(span: Span, name: impl Into<String>) -> Node {
        Node::EndTag(EndTag {
            span,
            name: name.into(),
            synthetic: false,
        })
    }

    /// Whether serializing this node needs line-count correction markers.
    pub fn needs_lccs(&self) -> bool {
        let newlines = match self {
            Node::RawText(t) => t.text.matches('\n').count(),
            _ => return false,
        };
        newlines != self.height()
    }

    pub(crate) fn write_to(&self, out: &mut String, line_numbers: bool) {
        match self {
            Node::RawText(t) => out.push_str(&t.text),
            Node::SafeText(t) => out.push_str(&escape_html(&t.text)),
            Node::Doctype(d) => out.push_str(&d.data),
            Node::StartTag(t) => t.write_open(out, line_numbers),
            Node::SelfClosedTag(t) => {
                t.write_open(out, line_numbers);
                if !t.is_void() {
                    push_end_tag(out, t.name());
                }
            }
            Node::EndTag(t) => push_end_tag(out, &t.name),
            Node::Comment(c) => {
                out.push_str("<!--");
                out.push_str(&c.data);
                out.push_str("-->");
            }
            Node::RawElement(e) => {
                e.start_tag.write_open(out, line_numbers);
                out.push_str(&e.data);
                push_end_tag(out, e.tag());
            }
        }
    }
}

fn push_end_tag(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_to(&mut out, false);
        f.write_str(&out)
    }
}

pub fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "command"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "keygen"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;")
}

pub fn escape_attr(text: &str) -> String {
    text.replace('&', "&amp;").replace('"', "&quot;")
}
