//! Error handling utilities shared across the crate.

use std::path::PathBuf;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Convenient result type used throughout the crate.
pub type Result<T, E = TextBpeError> = std::result::Result<T, E>;

/// Domain-specific error describing failures during configuration, IO, or training.
#[derive(Debug, Error)]
pub enum TextBpeError {
    /// Training configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// Corpus bytes were not valid UTF-8.
    #[error("input {path:?} is not valid UTF-8: {source}")]
    Utf8 {
        /// Decoding failure reported by the standard library.
        source: FromUtf8Error,
        /// Source file of the offending bytes if available.
        path: Option<PathBuf>,
    },
    /// Pattern compilation or matching failure raised by `fancy_regex`.
    #[error("pre-tokenizer pattern error: {0}")]
    Regex(String),
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Catch-all variant for invariants that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<fancy_regex::Error> for TextBpeError {
    fn from(err: fancy_regex::Error) -> Self {
        Self::Regex(err.to_string())
    }
}

impl From<serde_json::Error> for TextBpeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl TextBpeError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }

    /// Helper constructor that attaches an optional path when wrapping UTF-8 failures.
    pub fn utf8(source: FromUtf8Error, path: Option<PathBuf>) -> Self {
        Self::Utf8 { source, path }
    }
}
