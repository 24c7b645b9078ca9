//! Shared plumbing for the parsing path.
//!
//! Consumers import these through the crate root (`specmark::{Stream, Parsed, ...}`).

pub mod config;
mod error;
pub(crate) mod preds;
mod result;
mod stream;

pub use config::{DEFAULT_OPAQUE_TAGS, MacroTable, ParseConfig};
pub use error::{ConfigError, Diagnostic, Diagnostics, Reporter, Severity, StreamError};
pub use result::Parsed;
pub use stream::{MAX_DEPTH, Stream};
