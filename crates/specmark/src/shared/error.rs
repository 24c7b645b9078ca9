//! Diagnostics and hard errors.
//!
//! Malformed input never aborts a parse: recognizers report a [`Diagnostic`]
//! through the caller's [`Reporter`] and fall back to literal text. The only
//! hard error is [`StreamError`], raised when sub-streams nest too deeply.

use std::cell::RefCell;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    /// A fatal-reported error; parsing still continues.
    Error,
    Warning,
}

/// One reported problem, located as `"line:col[ of context]"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub loc: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "FATAL ERROR",
            Severity::Warning => "WARNING",
        };
        match &self.loc {
            Some(loc) => write!(f, "{label}: Line {loc}: {}", self.message),
            None => write!(f, "{label}: {}", self.message),
        }
    }
}

/// The message-reporting collaborator.
///
/// Fire-and-continue: reporting never influences control flow in the parser.
pub trait Reporter {
    fn report(&self, diagnostic: Diagnostic);

    fn die(&self, message: String, loc: String) {
        self.report(Diagnostic {
            severity: Severity::Error,
            message,
            loc: Some(loc),
        });
    }

    fn warn(&self, message: String, loc: String) {
        self.report(Diagnostic {
            severity: Severity::Warning,
            message,
            loc: Some(loc),
        });
    }
}

/// Collects diagnostics in report order and mirrors them to `log`.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: RefCell<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.items
            .borrow()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Snapshot of everything reported so far.
    pub fn to_vec(&self) -> Vec<Diagnostic> {
        self.items.borrow().clone()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.items.borrow_mut())
    }

    pub fn messages(&self) -> Vec<String> {
        self.items
            .borrow()
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }
}

impl Reporter for Diagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => log::error!(target: "specmark.diagnostics", "{diagnostic}"),
            Severity::Warning => log::warn!(target: "specmark.diagnostics", "{diagnostic}"),
        }
        self.items.borrow_mut().push(diagnostic);
    }
}

/// Unrecoverable conditions. Caught by the macro engine and turned into a
/// diagnostic; never surfaced from the public entry points.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("parsing recursed more than {max} levels deep (in {context})")]
    RecursionLimit { max: usize, context: String },
}

/// Problems with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown markup shorthand '{0}'")]
    UnknownShorthand(String),
    #[error("markup shorthand '{name}' needs a yes/no value, got '{value}'")]
    BadSwitch { name: String, value: String },
    #[error("empty markup shorthand entry")]
    EmptyEntry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_in_order() {
        let diags = Diagnostics::new();
        diags.die("first".to_string(), "1:1".to_string());
        diags.warn("second".to_string(), "2:3 of macro [FOO]".to_string());
        assert_eq!(diags.len(), 2);
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.messages(), vec!["first", "second"]);
        let all = diags.take();
        assert_eq!(all[1].loc.as_deref(), Some("2:3 of macro [FOO]"));
        assert!(diags.is_empty());
    }

    #[test]
    fn usable_as_trait_object() {
        let diags = Diagnostics::new();
        let reporter: &dyn Reporter = &diags;
        reporter.die("boom".to_string(), "1:1".to_string());
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn display_includes_location() {
        let d = Diagnostic {
            severity: Severity::Error,
            message: "Hit EOF in the middle of a comment.".to_string(),
            loc: Some("4:2".to_string()),
        };
        assert_eq!(
            d.to_string(),
            "FATAL ERROR: Line 4:2: Hit EOF in the middle of a comment."
        );
    }
}
