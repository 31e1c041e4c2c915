use std::time::Duration;

use thiserror::Error;
use weave_gateway::GatewayError;
use weave_types::BlobId;

#[derive(Debug, Error)]
pub enum TransferError {
    /// The blob exists but is not yet confirmed.
    #[error("blob {blob_id} is not finalized yet")]
    NotFinalized { blob_id: BlobId },

    #[error("blob not found: {blob_id}")]
    NotFound { blob_id: BlobId },

    /// A chunk of a finalized blob could not be read right now.
    #[error("chunk at offset {offset} of blob {blob_id} is unavailable")]
    ChunkUnavailable { blob_id: BlobId, offset: u64 },

    #[error("blob {blob_id}: expected {expected} bytes, received {actual}")]
    SizeMismatch {
        blob_id: BlobId,
        expected: u64,
        actual: u64,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Protocol failure while moving a blob. `target` is a blob id or a
    /// local path.
    #[error("transfer of {target} failed: {reason}")]
    Failure { target: String, reason: String },

    #[error("gateway error: {0}")]
    Gateway(GatewayError),

    #[error("crypto error: {0}")]
    Crypto(#[from] weave_crypto::CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotFinalized { .. } | Self::ChunkUnavailable { .. } | Self::Timeout { .. }
        )
    }
}

impl From<GatewayError> for TransferError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Pending(blob_id) => Self::NotFinalized { blob_id },
            GatewayError::NotFound(blob_id) => Self::NotFound { blob_id },
            other => Self::Gateway(other),
        }
    }
}

pub type TransferResult<T> = Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_lifecycle_errors_are_lifted() {
        let id = BlobId::from_hash([3; 32]);
        assert!(matches!(
            TransferError::from(GatewayError::Pending(id)),
            TransferError::NotFinalized { blob_id } if blob_id == id
        ));
        assert!(matches!(
            TransferError::from(GatewayError::NotFound(id)),
            TransferError::NotFound { .. }
        ));
        assert!(matches!(
            TransferError::from(GatewayError::Rejected("no".into())),
            TransferError::Gateway(_)
        ));
    }

    #[test]
    fn retry_classification() {
        let id = BlobId::from_hash([3; 32]);
        assert!(TransferError::NotFinalized { blob_id: id }.is_retryable());
        assert!(TransferError::ChunkUnavailable { blob_id: id, offset: 0 }.is_retryable());
        assert!(TransferError::Timeout {
            operation: "fetch",
            after: Duration::from_secs(1)
        }
        .is_retryable());
        assert!(!TransferError::NotFound { blob_id: id }.is_retryable());
        assert!(!TransferError::Failure {
            target: "x".into(),
            reason: "y".into()
        }
        .is_retryable());
    }
}
