//! Node-level entry points and end-of-input finalization.

use crate::node::{Node, Tag};
use crate::open_elements::implied_end;
use crate::parser::nodes_from_stream;
use crate::shared::{ParseConfig, Reporter, Stream};

const STRUCTURAL_TAGS: &[&str] = &["html", "head", "body"];

/// Parses `text` into nodes. With `close_elements`, anything left open at
/// the end is closed (and reported, see [`close_open_elements`]).
pub fn nodes_from_html(
    text: &str,
    config: &ParseConfig,
    reporter: &dyn Reporter,
    start_line: usize,
    close_elements: bool,
) -> Vec<Node> {
    let mut s = Stream::new(text, config, reporter, start_line);
    let mut nodes = nodes_from_stream(&mut s, 0);
    if close_elements {
        nodes.extend(close_open_elements(&mut s));
    }
    nodes
}

/// Whole-document parse: always closes open elements, and pulls
/// `html`/`head`/`body` start tags out into a side list when present.
pub fn initial_document_parse(
    text: &str,
    config: &ParseConfig,
    reporter: &dyn Reporter,
    start_line: usize,
) -> (Vec<Node>, Vec<Tag>) {
    let nodes = nodes_from_html(text, config, reporter, start_line, true);
    let has_structure = nodes
        .iter()
        .any(|node| matches!(node, Node::StartTag(tag) if STRUCTURAL_TAGS.contains(&tag.name())));
    if has_structure {
        extract_structural_nodes(nodes)
    } else {
        (nodes, Vec::new())
    }
}

/// Splits off `html`/`head`/`body` start tags; their end tags are dropped.
pub fn extract_structural_nodes(nodes: Vec<Node>) -> (Vec<Node>, Vec<Tag>) {
    let mut normal = Vec::with_capacity(nodes.len());
    let mut structural = Vec::new();
    for node in nodes {
        match node {
            Node::StartTag(tag) if STRUCTURAL_TAGS.contains(&tag.name()) => structural.push(tag),
            Node::EndTag(end) if STRUCTURAL_TAGS.contains(&end.name.as_str()) => {}
            other => normal.push(other),
        }
    }
    (normal, structural)
}

/// End tags for everything still open, innermost first.
///
/// A lone trailing `<p>` closes silently; any other leftover is reported
/// once for the whole set.
pub(crate) fn close_open_elements(s: &mut Stream<'_>) -> Vec<Node> {
    let end = s.len();
    let at = s.span(end, end);
    let mut closers = Vec::new();

    if s.open_els.current().is_some_and(|entry| entry.name == "p")
        && let Some(entry) = s.open_els.pop()
    {
        closers.push(implied_end(&entry, &at));
    }
    if s.open_els.is_empty() {
        return closers;
    }

    let open = s.open_els.describe_open();
    let message = match s.open_els.len() {
        1 => format!("Saw an unclosed {open} that remained open at the end of the document."),
        n => format!("{n} elements remained open at the end of the document: {open}."),
    };
    s.die(end, message);
    while let Some(entry) = s.open_els.pop() {
        closers.push(implied_end(&entry, &at));
    }
    closers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Diagnostics;

    fn names(nodes: &[Node]) -> Vec<String> {
        nodes
            .iter()
            .filter_map(|n| match n {
                Node::StartTag(t) => Some(t.name().to_string()),
                Node::EndTag(e) => Some(format!("/{}", e.name)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn trailing_paragraph_closes_silently() {
        let diags = Diagnostics::new();
        let nodes = nodes_from_html("<p>text", &ParseConfig::default(), &diags, 1, true);
        assert_eq!(names(&nodes), vec!["p", "/p"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn unclosed_div_is_reported_once() {
        let diags = Diagnostics::new();
        let nodes = nodes_from_html("<div><p>text", &ParseConfig::default(), &diags, 1, true);
        assert_eq!(names(&nodes), vec!["div", "p", "/p", "/div"]);
        assert_eq!(diags.error_count(), 1);
        assert!(diags.messages()[0].contains("<div>"));
        assert!(matches!(nodes.last(), Some(Node::EndTag(e)) if e.synthetic));
    }

    #[test]
    fn many_unclosed_elements_are_listed() {
        let diags = Diagnostics::new();
        let nodes = nodes_from_html(
            "<section><div><span>x",
            &ParseConfig::default(),
            &diags,
            1,
            true,
        );
        assert_eq!(
            names(&nodes),
            vec!["section", "div", "span", "/span", "/div", "/section"]
        );
        assert_eq!(diags.error_count(), 1);
        assert!(diags.messages()[0].starts_with("3 elements remained open"));
    }

    #[test]
    fn leaving_elements_open_is_allowed_without_closing() {
        let diags = Diagnostics::new();
        let nodes = nodes_from_html("<div>", &ParseConfig::default(), &diags, 1, false);
        assert_eq!(names(&nodes), vec!["div"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn structural_tags_are_extracted() {
        let diags = Diagnostics::new();
        let src = "<html><head><title>T</title></head><body><p>x</p></body></html>";
        let (nodes, structural) =
            initial_document_parse(src, &ParseConfig::default(), &diags, 1);
        let extracted: Vec<_> = structural.iter().map(Tag::name).collect();
        assert_eq!(extracted, vec!["html", "head", "body"]);
        assert_eq!(names(&nodes), vec!["title", "/title", "p", "/p"]);
    }

    #[test]
    fn plain_documents_keep_everything() {
        let diags = Diagnostics::new();
        let (nodes, structural) =
            initial_document_parse("<p>x</p>", &ParseConfig::default(), &diags, 1);
        assert!(structural.is_empty());
        assert_eq!(names(&nodes), vec!["p", "/p"]);
    }
}
