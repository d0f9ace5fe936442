//! Error types for omnivook.
//!
//! Library crates use [`OmnivookError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all omnivook operations.
#[derive(Debug, thiserror::Error)]
pub enum OmnivookError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the article service.
    #[error("network error: {0}")]
    Network(String),

    /// The article service answered, but with an error payload.
    #[error("article service error in {operation}: {message}")]
    Api { operation: String, message: String },

    /// The number of search results accumulated over all pages does not
    /// match the total the service reported.
    #[error("consistency error: fetched {fetched} articles but the service reported {reported}")]
    Consistency { fetched: usize, reported: usize },

    /// The scaffold target already exists.
    #[error("scaffold target already exists: {path:?}")]
    ScaffoldExists { path: PathBuf },

    /// A builder warning points at a file or line that does not exist.
    #[error("warning target {file:?} has no line {line}")]
    WarningTarget { file: PathBuf, line: usize },

    /// The external document builder could not be run.
    #[error("build error: {0}")]
    Build(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OmnivookError>;

impl OmnivookError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an API error for the named GraphQL operation.
    pub fn api(operation: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
