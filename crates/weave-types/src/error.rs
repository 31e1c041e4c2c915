use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid repository id '{input}': {reason}")]
    InvalidId { input: String, reason: String },

    #[error("invalid base64url string: {0}")]
    InvalidEncoding(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
