//! Error types for the vocabulary induction library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the induction library.
#[derive(Error, Debug)]
pub enum InductionError {
    /// A merge or vocabulary entry would span the separator, or would
    /// reference a token that does not precede it.
    ///
    /// This is an invariant violation, never a user error.
    #[error("Malformed stream: {0}")]
    MalformedStream(String),

    /// A checkpoint file could not be used.
    #[error("Corrupt checkpoint {}: {reason}", path.display())]
    CheckpointCorrupt { path: PathBuf, reason: String },

    /// I/O error with file context
    #[error("I/O error for {}: {err}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed list literal in a checkpoint field
    #[error("Malformed list literal at byte {offset}: {reason}")]
    Literal { offset: usize, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unknown composite token ID
    #[error("Unknown token ID: {0}")]
    UnknownTokenId(u32),

    /// Unknown raw symbol
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
}

impl InductionError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            err,
        }
    }

    /// Build a `CheckpointCorrupt` error.
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CheckpointCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for induction operations.
pub type Result<T> = std::result::Result<T, InductionError>;
