//! Error types for vt-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors that can occur in vt-core
///
/// Irregularities that can be worked around (duplicate keys, ragged rows,
/// skipped blocks) are reported as [`crate::Diagnostic`] values instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The export or text dump could not be opened or read
    #[error("source unavailable '{path}': {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source was readable but its structure is not recognizable
    #[error("malformed source '{source_name}': {message}")]
    MalformedSource { source_name: String, message: String },

    /// CSV error from the csv crate
    #[error("CSV error in '{source_name}': {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    /// Directory traversal error
    #[error("failed to traverse export directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// A page boundary or header pattern failed to compile
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedSource {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}
