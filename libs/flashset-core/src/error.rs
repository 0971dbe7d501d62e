//! Error types for flashset-core.

use thiserror::Error;

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors surfaced by the pure scheduling and reducer functions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("unknown face type: {0}")]
    UnknownFaceType(String),

    #[error("{what} is not loaded yet")]
    NotReady { what: String },

    #[error("fetching {what} failed: {message}")]
    FetchFailed { what: String, message: String },
}

impl CoreError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }
}
