use thiserror::Error;
use weave_transfer::TransferError;
use weave_types::{BlobId, RepositoryId, TypeError};

#[derive(Debug, Error)]
pub enum RepoError {
    /// The selected manifest or file blob is still pending confirmation.
    #[error("latest publish {blob_id} of {repository} is not finalized yet")]
    NotFinalized {
        repository: RepositoryId,
        blob_id: BlobId,
    },

    /// No manifest, or no file blob when `file` is set, matched the query.
    #[error(
        "nothing found in {repository}{}",
        .file.as_ref().map(|f| format!(" for file '{f}'")).unwrap_or_default()
    )]
    NotFound {
        repository: RepositoryId,
        file: Option<String>,
    },

    #[error("invalid id: {0}")]
    InvalidId(#[from] TypeError),

    /// A repository path is absolute, empty, or escapes its root.
    #[error("invalid repository path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A manifest could not be encoded or decoded.
    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RepoError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotFinalized { .. } => true,
            Self::Transfer(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<weave_crypto::CryptoError> for RepoError {
    fn from(e: weave_crypto::CryptoError) -> Self {
        Self::Transfer(TransferError::Crypto(e))
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use weave_types::Address;

    fn repo() -> RepositoryId {
        RepositoryId::new(Address::from_hash([1; 32]), "models")
    }

    #[test]
    fn not_found_names_the_file() {
        let err = RepoError::NotFound {
            repository: repo(),
            file: Some("weights.bin".into()),
        };
        assert!(err.to_string().ends_with("for file 'weights.bin'"));
        let err = RepoError::NotFound {
            repository: repo(),
            file: None,
        };
        assert!(err.to_string().ends_with("/models"));
    }

    #[test]
    fn retryable_follows_transfer_classification() {
        let blob_id = BlobId::from_hash([2; 32]);
        assert!(RepoError::NotFinalized {
            repository: repo(),
            blob_id
        }
        .is_retryable());
        assert!(RepoError::Transfer(TransferError::NotFinalized { blob_id }).is_retryable());
        assert!(!RepoError::Transfer(TransferError::NotFound { blob_id }).is_retryable());
        assert!(!RepoError::Manifest("bad".into()).is_retryable());
    }
}
