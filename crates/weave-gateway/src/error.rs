use weave_types::BlobId;

/// Errors from gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The gateway has no record of the blob.
    #[error("blob not found: {0}")]
    NotFound(BlobId),

    /// The blob exists but is not yet confirmed.
    #[error("blob {0} is pending confirmation")]
    Pending(BlobId),

    /// The endpoint refuses to serve a payload this large.
    #[error("payload too large for the {endpoint} endpoint")]
    PayloadTooLarge {
        endpoint: &'static str,
        size: Option<u64>,
    },

    /// No chunk is currently retrievable at this weave offset.
    #[error("chunk at offset {offset} is unavailable")]
    ChunkUnavailable { offset: u64 },

    /// The gateway refused a submitted transaction or chunk.
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// Unexpected HTTP status.
    #[error("gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid gateway config: {0}")]
    InvalidConfig(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<weave_crypto::CryptoError> for GatewayError {
    fn from(e: weave_crypto::CryptoError) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
