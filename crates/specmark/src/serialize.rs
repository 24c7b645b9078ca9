//! Turning nodes back into text, and the text-level entry points built on it.
//!
//! Serialization keeps downstream line numbering exact: with
//! `line_count_markers` on, every node whose output has fewer (or more)
//! newlines than the source lines it spans is followed by private-use
//! marker characters that a later pass turns back into line counts.

use crate::document::nodes_from_html;
use crate::node::Node;
use crate::node_fmt::format_node;
use crate::shared::{ParseConfig, Reporter};

/// Stands in for every comment so later text passes can skip them.
pub const COMMENT_MARKER: &str = "<!--\u{EBBE}-->";
/// One source line that the serialized text is missing.
pub const INCREMENT_LINE_COUNT: char = '\u{EBBD}';
/// One serialized line that has no source line behind it.
pub const DECREMENT_LINE_COUNT: char = '\u{EBBF}';

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    pub line_count_markers: bool,
    /// Emit `bs-line-number`/`bs-parse-context` on start tags.
    pub line_numbers: bool,
}

impl SerializeOptions {
    pub fn with_markers() -> Self {
        Self {
            line_count_markers: true,
            ..Self::default()
        }
    }
}

pub fn str_from_nodes<'n>(
    nodes: impl IntoIterator<Item = &'n Node>,
    options: SerializeOptions,
) -> String {
    let mut out = String::new();
    for node in nodes {
        push_node(&mut out, node, options);
    }
    out
}

fn push_node(out: &mut String, node: &Node, options: SerializeOptions) {
    if let Node::Comment(comment) = node {
        out.push_str(COMMENT_MARKER);
        if options.line_count_markers {
            let newlines = comment.data.matches('\n').count();
            out.extend(std::iter::repeat_n(INCREMENT_LINE_COUNT, newlines));
        }
        return;
    }
    let from = out.len();
    node.write_to(out, options.line_numbers);
    if !options.line_count_markers {
        return;
    }
    let written = out[from..].matches('\n').count();
    let height = node.height();
    if height > written {
        out.extend(std::iter::repeat_n(INCREMENT_LINE_COUNT, height - written));
    } else if written > height {
        out.extend(std::iter::repeat_n(DECREMENT_LINE_COUNT, written - height));
    }
}

pub fn lines_from_nodes(nodes: &[Node]) -> Vec<String> {
    str_from_nodes(nodes, SerializeOptions::default())
        .split('\n')
        .map(str::to_string)
        .collect()
}

/// Parses `text` and serializes the result.
pub fn parse_text(
    text: &str,
    config: &ParseConfig,
    reporter: &dyn Reporter,
    start_line: usize,
    close_elements: bool,
) -> String {
    let nodes = nodes_from_html(text, config, reporter, start_line, close_elements);
    str_from_nodes(&nodes, SerializeOptions::default())
}

/// Runs a list of lines through the parser, giving lines back.
///
/// Lines may carry their own trailing `\n` (judged by the first line); the
/// output then does too. Otherwise they are joined with `\n` and the output
/// lines are bare.
pub fn parse_lines(
    lines: &[String],
    config: &ParseConfig,
    reporter: &dyn Reporter,
    start_line: usize,
    close_elements: bool,
) -> Vec<String> {
    let Some(first) = lines.first() else {
        return Vec::new();
    };
    let ending_with_newline = first.ends_with('\n');
    let text = if ending_with_newline {
        lines.concat()
    } else {
        lines.join("\n")
    };
    let parsed = parse_text(&text, config, reporter, start_line, close_elements);
    if ending_with_newline {
        parsed.split_inclusive('\n').map(str::to_string).collect()
    } else {
        parsed.split('\n').map(str::to_string).collect()
    }
}

/// Parses title text, keeping only the text nodes; tags would show up
/// literally inside `<title>`.
pub fn parse_title(
    text: &str,
    config: &ParseConfig,
    reporter: &dyn Reporter,
    start_line: usize,
) -> String {
    let nodes = nodes_from_html(text, config, reporter, start_line, false);
    str_from_nodes(
        nodes.iter().filter(|node| node.is_text()),
        SerializeOptions::default(),
    )
}

/// Logs each node with its marker-annotated serialization at `debug`.
pub fn debug_nodes(nodes: &[Node]) {
    for node in nodes {
        log::debug!(
            target: "specmark.parser",
            "{} => {:?}",
            format_node(node),
            str_from_nodes([node], SerializeOptions::with_markers())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Comment, Span};
    use crate::shared::Diagnostics;

    fn span(line: usize, end_line: usize) -> Span {
        Span {
            line,
            end_line,
            loc: format!("{line}:1"),
            end_loc: format!("{end_line}:1"),
            context: None,
        }
    }

    #[test]
    fn markers_fix_line_counts() {
        let joined = Node::raw_text(span(1, 2), "—\u{200b}");
        let padded = Node::raw_text(span(3, 3), "a\nb");
        let plain = Node::raw_text(span(4, 5), "c\n");
        let nodes = [joined, padded, plain];

        assert_eq!(
            str_from_nodes(&nodes, SerializeOptions::default()),
            "—\u{200b}a\nbc\n"
        );
        assert_eq!(
            str_from_nodes(&nodes, SerializeOptions::with_markers()),
            "—\u{200b}\u{EBBD}a\nb\u{EBBF}c\n"
        );
    }

    #[test]
    fn comments_become_markers() {
        let comment = Node::Comment(Comment {
            span: span(1, 3),
            data: " a\nb\n".to_string(),
        });
        assert_eq!(
            str_from_nodes([&comment], SerializeOptions::default()),
            COMMENT_MARKER
        );
        assert_eq!(
            str_from_nodes([&comment], SerializeOptions::with_markers()),
            format!("{COMMENT_MARKER}\u{EBBD}\u{EBBD}")
        );
    }

    #[test]
    fn text_round_trips() {
        let diags = Diagnostics::new();
        let src = "<p class=\"a b\" id=x>Hello\n<em>world</em></p>\n";
        let out = parse_text(src, &ParseConfig::default(), &diags, 1, false);
        assert_eq!(out, "<p class=\"a b\" id=\"x\">Hello\n<em>world</em></p>\n");
        assert!(diags.is_empty());
    }

    #[test]
    fn line_numbers_on_start_tags() {
        let diags = Diagnostics::new();
        let nodes = nodes_from_html("\n<b>x</b>", &ParseConfig::default(), &diags, 10, false);
        let options = SerializeOptions {
            line_numbers: true,
            ..SerializeOptions::default()
        };
        assert_eq!(
            str_from_nodes(&nodes, options),
            "\n<b bs-line-number=\"11:1\">x</b>"
        );
    }

    #[test]
    fn lines_keep_their_newline_convention() {
        let diags = Diagnostics::new();
        let config = ParseConfig::default().with_macro("x", "y");
        let with_newlines = vec!["a [X]\n".to_string(), "b\n".to_string()];
        assert_eq!(
            parse_lines(&with_newlines, &config, &diags, 1, false),
            vec!["a y\n".to_string(), "b\n".to_string()]
        );
        let bare = vec!["a [X]".to_string(), "b".to_string()];
        assert_eq!(
            parse_lines(&bare, &config, &diags, 1, false),
            vec!["a y".to_string(), "b".to_string()]
        );
        assert!(parse_lines(&[], &config, &diags, 1, false).is_empty());
    }

    #[test]
    fn titles_drop_tags() {
        let diags = Diagnostics::new();
        let out = parse_title("The <code>foo</code> &amp; bar", &ParseConfig::default(), &diags, 1);
        assert_eq!(out, "The foo &amp; bar");
    }

    #[test]
    fn lines_split_on_newlines() {
        let nodes = [Node::raw_text(span(1, 3), "a\nb\nc")];
        assert_eq!(lines_from_nodes(&nodes), vec!["a", "b", "c"]);
    }
}
