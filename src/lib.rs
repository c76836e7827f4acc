//! Run external command-line formatters against editor documents.
//!
//! Formatter definitions are read from the `josephusCustomFormatters` table of
//! the host's settings file. Each enabled definition registers a provider for
//! its languages; formatting a document pipes its text through the configured
//! shell command and replaces the whole document with the command's output.

pub mod error;
pub mod formatter;
pub mod host;
pub mod model;

#[cfg(test)]
mod testing;

pub use error::{ConfigError, FormatError};
