//! Streamed SHA-256 content digests.
//!
//! The digest is written as the `File-SHA256` tag on upload and compared
//! against a local file to decide whether a download can be skipped, so it
//! must be identical on every platform: lowercase hex of the raw SHA-256.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::CryptoResult;

/// Read buffer used when hashing a stream.
const READ_BUFFER: usize = 64 * 1024;

/// A SHA-256 content digest (lowercase hex).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Wrap an existing hex digest, normalising it to lowercase.
    pub fn from_hex(hex: &str) -> Self {
        Self(hex.to_ascii_lowercase())
    }

    fn from_hasher(hasher: Sha256) -> Self {
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a digest as found in a tag value.
    pub fn matches(&self, tag_value: &str) -> bool {
        self.0.eq_ignore_ascii_case(tag_value)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw SHA-256 of a buffer.
pub(crate) fn sha256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

/// Digest an in-memory buffer.
pub fn digest_bytes(data: &[u8]) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    ContentDigest::from_hasher(hasher)
}

/// Digest a stream without holding it in memory.
pub async fn digest_reader<R>(reader: &mut R) -> CryptoResult<ContentDigest>
where
    R: AsyncRead + Unpin,
{
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUFFER];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(ContentDigest::from_hasher(hasher))
}

/// Digest a file on disk, streamed.
pub async fn digest_file(path: &Path) -> CryptoResult<ContentDigest> {
    let mut file = tokio::fs::File::open(path).await?;
    digest_reader(&mut file).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_digest_is_well_known() {
        assert_eq!(
            digest_bytes(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(digest_bytes(b"hello"), digest_bytes(b"hello"));
        assert_ne!(digest_bytes(b"hello"), digest_bytes(b"world"));
    }

    #[tokio::test]
    async fn reader_matches_bytes() {
        let data = vec![0x5au8; READ_BUFFER * 3 + 17];
        let mut slice = &data[..];
        let streamed = digest_reader(&mut slice).await.unwrap();
        assert_eq!(streamed, digest_bytes(&data));
    }

    #[tokio::test]
    async fn file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"file content").unwrap();
        assert_eq!(
            digest_file(&path).await.unwrap(),
            digest_bytes(b"file content")
        );
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = digest_file(&dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, crate::CryptoError::Io(_)));
    }

    #[test]
    fn matches_ignores_case() {
        let d = digest_bytes(b"x");
        assert!(d.matches(&d.as_str().to_ascii_uppercase()));
        assert!(!d.matches("00"));
    }

    #[test]
    fn serializes_as_bare_hex() {
        let d = digest_bytes(b"x");
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", d.as_str()));
        let back: ContentDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
