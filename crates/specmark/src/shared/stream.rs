//! Character stream with line/column indexing.
//!
//! Offsets are byte offsets into the source and always sit on `char`
//! boundaries. Lines are 1-based and offset by `start_line`; columns are
//! 1-based and count characters. A newline belongs to the line it ends.

use std::sync::Arc;

use memchr::{memchr, memchr_iter, memmem};

use super::config::ParseConfig;
use super::error::{Reporter, StreamError};
use super::result::Parsed;
use crate::node::Span;
use crate::open_elements::OpenElements;

/// Deepest permitted stream nesting; the top-level stream is depth 1.
pub const MAX_DEPTH: usize = 10;

pub struct Stream<'a> {
    src: &'a str,
    line_breaks: Vec<usize>,
    start_line: usize,
    depth: usize,
    config: &'a ParseConfig,
    context: Option<Arc<str>>,
    reporter: &'a dyn Reporter,
    pub(crate) open_els: OpenElements,
}

impl<'a> Stream<'a> {
    pub fn new(
        src: &'a str,
        config: &'a ParseConfig,
        reporter: &'a dyn Reporter,
        start_line: usize,
    ) -> Self {
        let context = config.context.as_deref().map(Arc::from);
        Self::with_depth(src, config, reporter, start_line, 1, context)
    }

    fn with_depth(
        src: &'a str,
        config: &'a ParseConfig,
        reporter: &'a dyn Reporter,
        start_line: usize,
        depth: usize,
        context: Option<Arc<str>>,
    ) -> Self {
        Self {
            src,
            line_breaks: memchr_iter(b'\n', src.as_bytes()).collect(),
            start_line,
            depth,
            config,
            context,
            reporter,
            open_els: OpenElements::new(config.opaque_tags.clone()),
        }
    }

    /// Opens a stream over macro replacement text, one level deeper.
    ///
    /// The child shares nothing mutable with `self`; it gets a fresh
    /// open-element tracker and its own diagnostic context.
    pub fn sub_stream(&self, context: &str, src: &'a str) -> Result<Stream<'a>, StreamError> {
        let depth = self.depth + 1;
        if depth > MAX_DEPTH {
            return Err(StreamError::RecursionLimit {
                max: MAX_DEPTH,
                context: context.to_string(),
            });
        }
        let mut sub = Self::with_depth(
            src,
            self.config,
            self.reporter,
            1,
            depth,
            Some(Arc::from(context)),
        );
        sub.open_els.set_enforcing(false);
        Ok(sub)
    }

    pub fn config(&self) -> &'a ParseConfig {
        self.config
    }

    pub fn reporter(&self) -> &'a dyn Reporter {
        self.reporter
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn start_line(&self) -> usize {
        self.start_line
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn as_str(&self) -> &'a str {
        self.src
    }

    pub fn len(&self) -> usize {
        self.src.len()
    }

    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    pub fn eof(&self, index: usize) -> bool {
        index >= self.src.len()
    }

    pub fn byte_at(&self, index: usize) -> Option<u8> {
        self.src.as_bytes().get(index).copied()
    }

    pub fn char_at(&self, index: usize) -> Option<char> {
        self.src.get(index..)?.chars().next()
    }

    /// The character ending just before `index`.
    pub fn char_before(&self, index: usize) -> Option<char> {
        self.src.get(..index)?.chars().next_back()
    }

    /// Offset of the character after the one at `index`.
    pub fn next_index(&self, index: usize) -> usize {
        match self.char_at(index) {
            Some(ch) => index + ch.len_utf8(),
            None => index + 1,
        }
    }

    pub fn starts_with_at(&self, index: usize, pat: &str) -> bool {
        self.src
            .as_bytes()
            .get(index..)
            .is_some_and(|rest| rest.starts_with(pat.as_bytes()))
    }

    /// Clamped slice; an out-of-range or misaligned request yields `""`.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        let len = self.src.len();
        let end = end.min(len);
        let start = start.min(end);
        self.src.get(start..end).unwrap_or("")
    }

    pub fn slice_from(&self, start: usize) -> &'a str {
        self.slice(start, self.src.len())
    }

    fn line_index(&self, offset: usize) -> usize {
        self.line_breaks.partition_point(|&b| b < offset)
    }

    pub fn line_of(&self, offset: usize) -> usize {
        self.line_index(offset) + self.start_line
    }

    pub fn col_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.src.len());
        let line_start = self.current_line_start(offset);
        self.slice(line_start, offset).chars().count() + 1
    }

    /// `"line:col"`, plus `" of <context>"` for sub-streams and labelled parses.
    pub fn loc(&self, offset: usize) -> String {
        let rc = format!("{}:{}", self.line_of(offset), self.col_of(offset));
        match &self.context {
            Some(context) => format!("{rc} of {context}"),
            None => rc,
        }
    }

    pub fn span(&self, start: usize, end: usize) -> Span {
        Span {
            line: self.line_of(start),
            end_line: self.line_of(end),
            loc: self.loc(start),
            end_loc: self.loc(end),
            context: self.context.clone(),
        }
    }

    pub fn current_line_start(&self, offset: usize) -> usize {
        match self.line_index(offset) {
            0 => 0,
            idx => self.line_breaks[idx - 1] + 1,
        }
    }

    /// First offset of the following line, or the stream length on the last line.
    pub fn next_line_start(&self, offset: usize) -> usize {
        match self.line_breaks.get(self.line_index(offset)) {
            Some(&nl) => nl + 1,
            None => self.src.len(),
        }
    }

    pub fn preceding_text_on_line(&self, offset: usize) -> &'a str {
        self.slice(self.current_line_start(offset), offset)
    }

    /// Rest of the current line from `offset`, including its newline.
    pub fn remaining_text_on_line(&self, offset: usize) -> &'a str {
        self.slice(offset, self.next_line_start(offset))
    }

    pub fn skip_to_next_line(&self, start: usize) -> Parsed<&'a str> {
        let text = self.remaining_text_on_line(start);
        Parsed::Ok(text, start + text.len())
    }

    /// Text between `start` and the next occurrence of `needle`; the cursor
    /// lands on the needle.
    pub fn skip_to(&self, start: usize, needle: &str) -> Parsed<&'a str> {
        let Some(hay) = self.src.as_bytes().get(start..) else {
            return Parsed::Fail(start);
        };
        match memmem::find(hay, needle.as_bytes()) {
            Some(rel) => Parsed::Ok(self.slice(start, start + rel), start + rel),
            None => Parsed::Fail(start),
        }
    }

    /// Like [`Stream::skip_to`], but fails if a newline comes first.
    pub fn skip_to_same_line(&self, start: usize, needle: &str) -> Parsed<&'a str> {
        let line_end = self.src.as_bytes().get(start..).and_then(|hay| memchr(b'\n', hay));
        match self.skip_to(start, needle) {
            Parsed::Ok(text, end) if line_end.is_none_or(|nl| start + nl >= end) => {
                Parsed::Ok(text, end)
            }
            _ => Parsed::Fail(start),
        }
    }

    pub(crate) fn die(&self, at: usize, message: String) {
        self.reporter.die(message, self.loc(at));
    }

    pub(crate) fn warn(&self, at: usize, message: String) {
        self.reporter.warn(message, self.loc(at));
    }

    pub(crate) fn in_opaque_element(&self) -> bool {
        self.open_els.in_opaque_element()
    }

    pub(crate) fn in_tag_context(&self, tag: &str) -> bool {
        self.open_els.in_tag_context(tag)
    }
}

impl std::fmt::Debug for Stream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("len", &self.src.len())
            .field("lines", &(self.line_breaks.len() + 1))
            .field("start_line", &self.start_line)
            .field("depth", &self.depth)
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::Diagnostics;

    fn with_stream<R>(src: &str, start_line: usize, f: impl FnOnce(&Stream<'_>) -> R) -> R {
        let config = ParseConfig::default();
        let diags = Diagnostics::new();
        let s = Stream::new(src, &config, &diags, start_line);
        f(&s)
    }

    #[test]
    fn line_and_column_lookup() {
        with_stream("ab\ncd\n\nef", 1, |s| {
            assert_eq!(s.line_of(0), 1);
            assert_eq!(s.col_of(0), 1);
            assert_eq!(s.line_of(2), 1, "newline belongs to the line it ends");
            assert_eq!(s.col_of(2), 3);
            assert_eq!(s.line_of(3), 2);
            assert_eq!(s.col_of(4), 2);
            assert_eq!(s.line_of(7), 4);
            assert_eq!(s.loc(8), "4:2");
        });
    }

    #[test]
    fn start_line_offsets_everything() {
        with_stream("x\ny", 40, |s| {
            assert_eq!(s.line_of(0), 40);
            assert_eq!(s.line_of(2), 41);
        });
    }

    #[test]
    fn line_of_is_monotonic() {
        let src = "one\ntwo\n\nthree — four\nfive";
        with_stream(src, 3, |s| {
            let mut last = s.line_of(0);
            assert_eq!(last, 3);
            for (offset, _) in src.char_indices() {
                let line = s.line_of(offset);
                assert!(line >= last, "line_of went backwards at {offset}");
                last = line;
            }
        });
    }

    #[test]
    fn columns_count_chars() {
        with_stream("—x", 1, |s| {
            assert_eq!(s.col_of("—".len()), 2);
        });
    }

    #[test]
    fn line_helpers() {
        with_stream("  <pre>\nbody\n</pre>", 1, |s| {
            assert_eq!(s.current_line_start(4), 0);
            assert_eq!(s.preceding_text_on_line(2), "  ");
            assert_eq!(s.remaining_text_on_line(2), "<pre>\n");
            assert_eq!(s.next_line_start(0), 8);
            assert_eq!(s.current_line_start(10), 8);
            assert_eq!(s.next_line_start(14), s.len());
        });
    }

    #[test]
    fn skip_to_needles() {
        with_stream("<<foo>> and\n>>", 1, |s| {
            assert_eq!(s.skip_to(2, ">>"), Parsed::Ok("foo", 5));
            assert_eq!(s.skip_to(7, ">>"), Parsed::Ok(" and\n", 12));
            assert_eq!(s.skip_to_same_line(7, ">>"), Parsed::Fail(7));
            assert_eq!(s.skip_to(0, "zzz"), Parsed::Fail(0));
        });
    }

    #[test]
    fn context_suffix_in_locations() {
        let config = ParseConfig::default();
        let diags = Diagnostics::new();
        let s = Stream::new("a", &config, &diags, 1);
        let sub = s.sub_stream("macro [FOO]", "b\nc").unwrap();
        assert_eq!(sub.depth(), 2);
        assert_eq!(sub.loc(2), "2:1 of macro [FOO]");
    }

    #[test]
    fn depth_ceiling() {
        let config = ParseConfig::default();
        let diags = Diagnostics::new();
        let root = Stream::new("", &config, &diags, 1);
        let mut streams = vec![root];
        for _ in 1..MAX_DEPTH {
            let next = streams.last().unwrap().sub_stream("macro [X]", "").unwrap();
            streams.push(next);
        }
        assert_eq!(streams.last().unwrap().depth(), MAX_DEPTH);
        let err = streams.last().unwrap().sub_stream("macro [X]", "").unwrap_err();
        assert!(matches!(err, StreamError::RecursionLimit { max: MAX_DEPTH, .. }));
    }
}
