pub mod document;
pub mod entities;
pub mod node;
pub mod node_fmt;
pub mod parser;
pub mod serialize;
pub mod shared;

mod open_elements;

pub use crate::document::{extract_structural_nodes, initial_document_parse, nodes_from_html};
pub use crate::node::{
    Attributes, Classes, Comment, Doctype, EndTag, Node, RawElement, Span, Tag, TagBuilder, Text,
    escape_attr, escape_html, is_void_element,
};
pub use crate::node_fmt::{format_node, format_nodes};
pub use crate::serialize::{
    COMMENT_MARKER, DECREMENT_LINE_COUNT, INCREMENT_LINE_COUNT, SerializeOptions, debug_nodes,
    lines_from_nodes, parse_lines, parse_text, parse_title, str_from_nodes,
};
pub use crate::shared::{
    ConfigError, Diagnostic, Diagnostics, MacroTable, ParseConfig, Parsed, Reporter, Severity,
    Stream, StreamError,
};
