//! Open-element tracking.
//!
//! A flat stack of the start tags seen so far, consulted by the dispatch loop
//! (opacity, `<a>`/`<dfn>` context) and by the document finalizer. Implements
//! the small subset of HTML's implied-end-tag rules that valid documents rely
//! on; anything beyond that is a tree builder's job.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::node::{EndTag, Node, Span};
use crate::shared::Reporter;

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct OpenEntry {
    pub(crate) name: String,
    pub(crate) loc: String,
    pub(crate) context: Option<Arc<str>>,
    opaque: bool,
}

impl OpenEntry {
    fn describe(&self) -> String {
        format!("<{}> at {}", self.name, self.loc)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct OpenElements {
    entries: Vec<OpenEntry>,
    opaque_tags: BTreeSet<String>,
    opaque_count: usize,
    tag_counts: HashMap<String, usize>,
    enforcing: bool,
}

impl OpenElements {
    pub(crate) fn new(opaque_tags: BTreeSet<String>) -> Self {
        Self {
            entries: Vec::new(),
            opaque_tags,
            opaque_count: 0,
            tag_counts: HashMap::new(),
            enforcing: true,
        }
    }

    /// Tracks without auto-closing or reporting; used for macro sub-streams,
    /// whose fragments are checked again once spliced into their parent.
    pub(crate) fn set_enforcing(&mut self, enforcing: bool) {
        self.enforcing = enforcing;
    }

    pub(crate) fn in_opaque_element(&self) -> bool {
        self.opaque_count > 0
    }

    pub(crate) fn in_tag_context(&self, tag: &str) -> bool {
        self.tag_counts.get(tag).is_some_and(|&n| n > 0)
    }

    /// Whether `tag` is open without a `stop_tags` element opened inside it.
    fn in_tag_context_within(&self, tag: &str, stop_tags: &[&str]) -> bool {
        if !self.in_tag_context(tag) {
            return false;
        }
        for entry in self.entries.iter().rev() {
            if entry.name == tag {
                return true;
            }
            if stop_tags.contains(&entry.name.as_str()) {
                return false;
            }
        }
        false
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn current(&self) -> Option<&OpenEntry> {
        self.entries.last()
    }

    pub(crate) fn describe_open(&self) -> String {
        self.entries
            .iter()
            .map(OpenEntry::describe)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn push(&mut self, tag: &crate::node::Tag) {
        let opaque = self.opaque_tags.contains(tag.name()) || tag.has_attr("bs-opaque");
        if opaque {
            self.opaque_count += 1;
        }
        *self.tag_counts.entry(tag.name().to_string()).or_default() += 1;
        self.entries.push(OpenEntry {
            name: tag.name().to_string(),
            loc: tag.span().loc.clone(),
            context: tag.span().context.clone(),
            opaque,
        });
    }

    pub(crate) fn pop(&mut self) -> Option<OpenEntry> {
        let entry = self.entries.pop()?;
        if entry.opaque {
            self.opaque_count -= 1;
        }
        if let Some(count) = self.tag_counts.get_mut(&entry.name) {
            *count = count.saturating_sub(1);
        }
        Some(entry)
    }

    /// Records `node` and returns any end tags it implies, to be placed
    /// before it in the output.
    pub(crate) fn observe(&mut self, node: &Node, reporter: &dyn Reporter) -> Vec<Node> {
        let mut implied = Vec::new();
        match node {
            Node::StartTag(tag) => {
                if self.enforcing {
                    self.auto_close_start(tag.name(), node, reporter, &mut implied);
                }
                self.push(tag);
                if self.enforcing {
                    self.verify_context(tag.name(), node, reporter);
                }
            }
            Node::EndTag(end) => {
                if self.enforcing {
                    self.auto_close_end(&end.name, node, reporter, &mut implied);
                }
                self.observe_end(end, node, reporter, &mut implied);
            }
            Node::SelfClosedTag(tag) if self.enforcing => {
                self.auto_close_start(tag.name(), node, reporter, &mut implied);
            }
            Node::RawElement(el) if self.enforcing => {
                self.auto_close_start(el.tag(), node, reporter, &mut implied);
            }
            _ => {}
        }
        implied
    }

    /// Observes a node sequence, splicing in implied end tags.
    pub(crate) fn observe_all(&mut self, nodes: Vec<Node>, reporter: &dyn Reporter) -> Vec<Node> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            let implied = self.observe(&node, reporter);
            out.extend(implied);
            out.push(node);
        }
        out
    }

    fn observe_end(
        &mut self,
        end: &EndTag,
        node: &Node,
        reporter: &dyn Reporter,
        implied: &mut Vec<Node>,
    ) {
        if self.current().is_some_and(|top| top.name == end.name) {
            self.pop();
            return;
        }
        if !self.enforcing {
            return;
        }
        if matches!(end.name.as_str(), "html" | "head" | "body" | "main") {
            return;
        }
        if HEADINGS.contains(&end.name.as_str()) {
            let open_heading = self
                .entries
                .iter()
                .rev()
                .find(|e| HEADINGS.contains(&e.name.as_str()))
                .cloned();
            if let Some(heading) = open_heading
                && heading.name != end.name
            {
                self.close_until(HEADINGS, node, implied);
                reporter.die(
                    format!(
                        "Saw a heading end tag </{}>, but the current open heading is <{}> (at {}).",
                        end.name, heading.name, heading.loc
                    ),
                    end.span.loc.clone(),
                );
                return;
            }
        }
        let buried = self.entries.iter().rev().find(|e| e.name == end.name).cloned();
        match buried {
            Some(entry) => {
                reporter.die(
                    format!(
                        "Saw an end tag </{}>, but there were unclosed elements remaining before the nearest matching start tag (at {}).\nOpen tags: {}",
                        end.name,
                        entry.loc,
                        self.describe_open()
                    ),
                    end.span.loc.clone(),
                );
                while let Some(top) = self.current() {
                    if top.name == end.name {
                        self.pop();
                        break;
                    }
                    if let Some(entry) = self.pop() {
                        implied.push(implied_end(&entry, node.span()));
                    }
                }
            }
            None => {
                let open = if self.entries.is_empty() {
                    String::new()
                } else {
                    format!("\nOpen tags: {}", self.describe_open())
                };
                reporter.die(
                    format!(
                        "Saw an end tag </{}>, but there's no open element corresponding to it.{open}",
                        end.name
                    ),
                    end.span.loc.clone(),
                );
            }
        }
    }

    fn auto_close_start(
        &mut self,
        tag: &str,
        node: &Node,
        reporter: &dyn Reporter,
        implied: &mut Vec<Node>,
    ) {
        if self.entries.is_empty() {
            return;
        }
        if closes_paragraph_on_start(tag) {
            self.virtual_close(node, &["p"], &[], reporter, implied);
        }
        const TABLE: &[&str] = &["table"];
        match tag {
            "li" => {
                self.virtual_close(node, &["p"], &["ol", "ul"], reporter, implied);
                self.virtual_close(node, &["li"], &["ol", "ul"], reporter, implied);
            }
            "dt" | "dd" => {
                self.virtual_close(node, &["p"], &["dl"], reporter, implied);
                self.virtual_close(node, &["dt", "dd"], &["dl"], reporter, implied);
            }
            "option" => self.virtual_close(node, &["option"], &[], reporter, implied),
            "optgroup" => {
                self.virtual_close(node, &["option"], &[], reporter, implied);
                self.virtual_close(node, &["optgroup"], &[], reporter, implied);
            }
            "td" | "th" => {
                self.virtual_close(node, &["p"], TABLE, reporter, implied);
                self.virtual_close(node, &["td", "th"], TABLE, reporter, implied);
            }
            "tr" => {
                self.virtual_close(node, &["p"], TABLE, reporter, implied);
                self.virtual_close(node, &["td", "th"], TABLE, reporter, implied);
                self.virtual_close(node, &["tr"], TABLE, reporter, implied);
                self.virtual_close(node, &["caption", "colgroup"], TABLE, reporter, implied);
            }
            "thead" | "tbody" | "tfoot" | "caption" | "colgroup" => {
                self.virtual_close(node, &["p"], TABLE, reporter, implied);
                self.virtual_close(node, &["td", "th"], TABLE, reporter, implied);
                self.virtual_close(node, &["tr"], TABLE, reporter, implied);
                self.virtual_close(
                    node,
                    &["thead", "tbody", "tfoot", "caption", "colgroup"],
                    TABLE,
                    reporter,
                    implied,
                );
            }
            "col" => {
                self.virtual_close(node, &["p"], TABLE, reporter, implied);
                self.virtual_close(node, &["td", "th"], TABLE, reporter, implied);
                self.virtual_close(node, &["tr"], TABLE, reporter, implied);
                self.virtual_close(
                    node,
                    &["thead", "tbody", "tfoot", "caption"],
                    TABLE,
                    reporter,
                    implied,
                );
            }
            "rb" | "rtc" => {
                self.virtual_close(node, &["rb", "rp", "rt"], &["ruby"], reporter, implied);
                self.virtual_close(node, &["rtc"], &["ruby"], reporter, implied);
            }
            "rp" | "rt" => {
                self.virtual_close(node, &["rb", "rp", "rt"], &["ruby"], reporter, implied);
            }
            _ => {}
        }
    }

    fn auto_close_end(
        &mut self,
        tag: &str,
        node: &Node,
        reporter: &dyn Reporter,
        implied: &mut Vec<Node>,
    ) {
        if closes_paragraph_on_end(tag) {
            self.virtual_close(node, &["p"], &[], reporter, implied);
        }
        const TABLE: &[&str] = &["table"];
        match tag {
            "ol" | "ul" => self.virtual_close(node, &["li"], &["ol", "ul"], reporter, implied),
            "dl" => self.virtual_close(node, &["dt", "dd"], &["dl"], reporter, implied),
            "tr" => self.virtual_close(node, &["td", "th"], TABLE, reporter, implied),
            "thead" | "tbody" | "tfoot" => {
                self.virtual_close(node, &["td", "th"], TABLE, reporter, implied);
                self.virtual_close(node, &["tr"], TABLE, reporter, implied);
            }
            "table" => {
                self.virtual_close(node, &["td", "th"], TABLE, reporter, implied);
                self.virtual_close(node, &["tr"], TABLE, reporter, implied);
                self.virtual_close(
                    node,
                    &["thead", "tbody", "tfoot", "caption", "colgroup"],
                    TABLE,
                    reporter,
                    implied,
                );
            }
            "rtc" => self.virtual_close(node, &["rt"], &["ruby"], reporter, implied),
            "ruby" => {
                self.virtual_close(node, &["rt", "rb", "rp"], &["ruby"], reporter, implied);
                self.virtual_close(node, &["rtc"], &["ruby"], reporter, implied);
            }
            "optgroup" => self.virtual_close(node, &["option"], &[], reporter, implied),
            "select" => {
                self.virtual_close(node, &["option"], &[], reporter, implied);
                self.virtual_close(node, &["optgroup"], &[], reporter, implied);
            }
            _ => {}
        }
    }

    /// Closes the innermost element if it is one of `tags`; closing one
    /// that is buried deeper is reported first.
    fn virtual_close(
        &mut self,
        node: &Node,
        tags: &[&str],
        stop_tags: &[&str],
        reporter: &dyn Reporter,
        implied: &mut Vec<Node>,
    ) {
        let Some(top) = self.current() else {
            return;
        };
        if tags.contains(&top.name.as_str()) {
            if let Some(entry) = self.pop() {
                implied.push(implied_end(&entry, node.span()));
            }
            return;
        }
        for tag in tags {
            if !self.in_tag_context_within(tag, stop_tags) {
                continue;
            }
            let loc = self
                .entries
                .iter()
                .rev()
                .find(|e| e.name == *tag)
                .map(|e| e.loc.clone())
                .unwrap_or_default();
            reporter.die(
                format!(
                    "Tried to auto-close a <{tag}>, but there were unclosed elements remaining before the nearest matching start tag (at {loc}).\nOpen tags: {}",
                    self.describe_open()
                ),
                node.span().loc.clone(),
            );
            self.close_until(&[tag], node, implied);
        }
    }

    fn close_until(&mut self, tags: &[&str], node: &Node, implied: &mut Vec<Node>) {
        while let Some(entry) = self.pop() {
            let done = tags.contains(&entry.name.as_str());
            implied.push(implied_end(&entry, node.span()));
            if done {
                return;
            }
        }
    }

    fn verify_context(&self, tag: &str, node: &Node, reporter: &dyn Reporter) {
        const REQUIREMENTS: &[(&[&str], &str)] = &[
            (&["td", "th"], "tr"),
            (&["col"], "colgroup"),
            (
                &[
                    "td", "th", "tr", "tbody", "thead", "tfoot", "caption", "col", "colgroup",
                ],
                "table",
            ),
            (&["figcaption"], "figure"),
            (&["legend"], "fieldset"),
            (&["dt", "dd"], "dl"),
        ];
        for (tags, parent) in REQUIREMENTS {
            if tags.contains(&tag) && !self.in_tag_context(parent) {
                reporter.die(
                    format!("Saw a <{tag}> that wasn't in a <{parent}>"),
                    node.span().loc.clone(),
                );
            }
        }
        if self.entries.len() >= 2 {
            let parent = self.entries[self.entries.len() - 2].name.as_str();
            if matches!(parent, "ol" | "ul") && tag != "li" {
                reporter.die(
                    format!("Saw a <{tag}> that's a direct child of a <{parent}>"),
                    node.span().loc.clone(),
                );
            }
            if parent == "dl" && !matches!(tag, "dt" | "dd" | "div") {
                reporter.die(
                    format!("Saw a <{tag}> that's a direct child of a <dl>"),
                    node.span().loc.clone(),
                );
            }
        }
    }
}

/// A zero-width end tag placed just before the node that forced it, in the
/// diagnostic context of the element it closes.
pub(crate) fn implied_end(entry: &OpenEntry, at: &Span) -> Node {
    let mut span = at.collapsed();
    span.context = entry.context.clone();
    Node::EndTag(EndTag {
        span,
        name: entry.name.clone(),
        synthetic: true,
    })
}

fn closes_paragraph_on_start(tag: &str) -> bool {
    matches!(
        tag,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "center"
            | "details"
            | "dialog"
            | "dir"
            | "div"
            | "dl"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "header"
            | "hgroup"
            | "main"
            | "menu"
            | "nav"
            | "ol"
            | "p"
            | "search"
            | "section"
            | "summary"
            | "ul"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "pre"
            | "listing"
            | "form"
            | "plaintext"
            | "table"
            | "hr"
            | "xmp"
    )
}

fn closes_paragraph_on_end(tag: &str) -> bool {
    matches!(
        tag,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "body"
            | "center"
            | "details"
            | "dialog"
            | "dir"
            | "div"
            | "dl"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "header"
            | "hgroup"
            | "html"
            | "main"
            | "menu"
            | "nav"
            | "ol"
            | "search"
            | "section"
            | "summary"
            | "ul"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "pre"
            | "listing"
            | "form"
            | "plaintext"
            | "table"
            | "caption"
            | "thead"
            | "tbody"
            | "tfoot"
            | "tr"
            | "td"
            | "th"
            | "li"
            | "dt"
            | "dd"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::TagBuilder;
    use crate::shared::Diagnostics;
    use crate::shared::config::DEFAULT_OPAQUE_TAGS;

    fn span(line: usize) -> Span {
        Span {
            line,
            end_line: line,
            loc: format!("{line}:1"),
            end_loc: format!("{line}:1"),
            context: None,
        }
    }

    fn start(name: &str) -> Node {
        Node::StartTag(TagBuilder::new(name).finish(span(1)))
    }

    fn end(name: &str) -> Node {
        Node::end_tag(span(2), name)
    }

    fn tracker() -> OpenElements {
        OpenElements::new(DEFAULT_OPAQUE_TAGS.iter().map(|t| t.to_string()).collect())
    }

    fn names(nodes: &[Node]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| match n {
                Node::EndTag(e) => format!("/{}", e.name),
                other => other.tag_name().unwrap_or("#text").to_string(),
            })
            .collect()
    }

    #[test]
    fn matching_end_tag_pops() {
        let diags = Diagnostics::new();
        let mut els = tracker();
        let out = els.observe_all(vec![start("div"), start("span"), end("span"), end("div")], &diags);
        assert_eq!(names(&out), vec!["div", "span", "/span", "/div"]);
        assert!(els.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn opacity_follows_stack() {
        let diags = Diagnostics::new();
        let mut els = tracker();
        els.observe(&start("pre"), &diags);
        assert!(els.in_opaque_element());
        els.observe(&end("pre"), &diags);
        assert!(!els.in_opaque_element());

        let code = Node::StartTag(TagBuilder::new("code").attr("bs-opaque", "").finish(span(1)));
        els.observe(&code, &diags);
        assert!(els.in_opaque_element());
    }

    #[test]
    fn block_start_closes_paragraph() {
        let diags = Diagnostics::new();
        let mut els = tracker();
        let out = els.observe_all(vec![start("p"), start("div")], &diags);
        assert_eq!(names(&out), vec!["p", "/p", "div"]);
        assert!(matches!(&out[1], Node::EndTag(e) if e.synthetic));
        assert!(diags.is_empty());
    }

    #[test]
    fn list_items_close_siblings() {
        let diags = Diagnostics::new();
        let mut els = tracker();
        let out = els.observe_all(
            vec![start("ul"), start("li"), start("li"), end("ul")],
            &diags,
        );
        assert_eq!(names(&out), vec!["ul", "li", "/li", "li", "/li", "/ul"]);
        assert!(els.is_empty());
        assert!(diags.is_empty(), "{:?}", diags.messages());
    }

    #[test]
    fn buried_end_tag_is_reported_once() {
        let diags = Diagnostics::new();
        let mut els = tracker();
        let out = els.observe_all(vec![start("div"), start("span"), end("div")], &diags);
        assert_eq!(names(&out), vec!["div", "span", "/span", "/div"]);
        assert_eq!(diags.error_count(), 1);
        assert!(els.is_empty());
    }

    #[test]
    fn stray_end_tag_is_reported() {
        let diags = Diagnostics::new();
        let mut els = tracker();
        els.observe(&end("span"), &diags);
        assert_eq!(diags.error_count(), 1);
        els.observe(&end("body"), &diags);
        assert_eq!(diags.error_count(), 1, "structural end tags are tolerated");
    }

    #[test]
    fn context_queries() {
        let diags = Diagnostics::new();
        let mut els = tracker();
        els.observe(&start("a"), &diags);
        assert!(els.in_tag_context("a"));
        assert!(!els.in_tag_context("dfn"));
        els.observe(&end("a"), &diags);
        assert!(!els.in_tag_context("a"));
    }

    #[test]
    fn quiet_tracker_never_reports() {
        let diags = Diagnostics::new();
        let mut els = tracker();
        els.set_enforcing(false);
        let out = els.observe_all(vec![end("div"), start("td"), start("p"), start("div")], &diags);
        assert_eq!(out.len(), 4);
        assert!(diags.is_empty());
        assert_eq!(els.len(), 3);
    }
}
