//! Error types for MindGraph.
//!
//! Library crates use [`MindGraphError`] via `thiserror`.
//! The server binary wraps this with `color-eyre` for startup diagnostics and
//! maps each kind onto a public HTTP status in its API layer.

use std::path::PathBuf;

/// Top-level error type for all MindGraph operations.
#[derive(Debug, thiserror::Error)]
pub enum MindGraphError {
    /// Required configuration or credential missing/invalid at startup.
    #[error("config error: {message}")]
    Config { message: String },

    /// The AI collaborator could not be reached, timed out, or answered with
    /// a transport-level failure.
    #[error("AI transport error: {0}")]
    AiTransport(String),

    /// The AI collaborator answered with nothing but whitespace.
    #[error("AI response was empty")]
    EmptyResponse,

    /// The AI payload did not match the `{answer, keywords}` schema.
    #[error("malformed AI response: {message}")]
    MalformedResponse { message: String },

    /// The graph-store transaction failed and was rolled back.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Caller-supplied input rejected before any collaborator was invoked.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MindGraphError>;

impl MindGraphError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a malformed-response error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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
