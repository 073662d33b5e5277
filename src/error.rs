//! Error types for boteval.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, BotevalError>;

/// Errors that can occur while collecting or aggregating evaluations.
#[derive(Error, Debug)]
pub enum BotevalError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The store has no blob at the requested path.
    #[error("Blob not found at '{0}'")]
    NotFound(String),

    /// The store rejected a request.
    #[error("Store error for '{path}': {message}")]
    Store { path: String, message: String },

    /// An evaluation document whose top-level value is not a JSON object.
    /// The document is skipped; the rest of the pipeline continues.
    #[error("Malformed evaluation document '{name}': {reason}")]
    MalformedDocument { name: String, reason: String },

    /// No score type is shared by every loaded document. Recoverable: the
    /// caller reports it and halts only the comparison step.
    #[error("No common score types across the loaded evaluation documents")]
    NoCommonScoreTypes,

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BotevalError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for BotevalError {
    fn from(err: reqwest::Error) -> Self {
        BotevalError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for BotevalError {
    fn from(err: serde_json::Error) -> Self {
        BotevalError::Serialization(err.to_string())
    }
}
