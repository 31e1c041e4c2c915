/// Errors from integrity and signing operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid base64url: {0}")]
    InvalidEncoding(String),

    #[error("I/O error while hashing: {0}")]
    Io(#[from] std::io::Error),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
