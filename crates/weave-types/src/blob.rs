use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Identifier of a blob on the network.
///
/// A `BlobId` is the SHA-256 of the transaction signature that created the
/// blob. It is rendered as 43 characters of unpadded base64url, which is the
/// form every gateway endpoint expects.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobId([u8; 32]);

impl BlobId {
    /// Create a `BlobId` from a pre-computed hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short prefix (first 8 characters) for log lines.
    pub fn short(&self) -> String {
        let mut s = self.to_string();
        s.truncate(8);
        s
    }

    /// Parse the base64url rendering.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        decode_b64_32(s).map(Self)
    }
}

impl fmt::Debug for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobId({})", self.short())
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl FromStr for BlobId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; 32]> for BlobId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for BlobId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BlobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Lifecycle state of a blob as reported by the gateway.
///
/// A blob moves `Pending -> Finalized` exactly once and never back.
/// `NotFound` means the gateway has no record of the id at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlobStatus {
    /// Submitted but not yet confirmed in a block.
    Pending,
    /// Confirmed; globally fetchable and queryable.
    Finalized,
    /// Unknown to the gateway.
    NotFound,
}

impl BlobStatus {
    /// Returns `true` if the blob can be downloaded.
    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Finalized)
    }
}

impl fmt::Display for BlobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Finalized => write!(f, "finalized"),
            Self::NotFound => write!(f, "not found"),
        }
    }
}

/// Decode unpadded base64url into exactly 32 bytes.
pub(crate) fn decode_b64_32(s: &str) -> Result<[u8; 32], TypeError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| TypeError::InvalidEncoding(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(TypeError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        });
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}
