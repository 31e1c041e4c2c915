use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::blob::decode_b64_32;
use crate::error::TypeError;

/// Address of a signing identity.
///
/// The address is the SHA-256 of the owner's public key, rendered as unpadded
/// base64url. Deriving it from a key lives in `weave-crypto`; this type only
/// carries and validates the value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    /// Create an address from a pre-computed key hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte key hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse the base64url rendering.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        decode_b64_32(s).map(Self)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Identifier of a repository: `owner/name[/version]`.
///
/// `owner` is the address that published the repository. `version`, when
/// present, pins resolution to manifests published under that version tag.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RepositoryId {
    pub owner: Address,
    pub name: String,
    pub version: Option<String>,
}

impl RepositoryId {
    /// Build an unversioned repository id.
    pub fn new(owner: Address, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
            version: None,
        }
    }

    /// Return a copy pinned to `version`.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Parse the canonical `owner/name[/version]` form.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidId {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = input.split('/').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(invalid(&format!(
                "expected 2 or 3 '/'-separated fields, got {}",
                parts.len()
            )));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("fields must not be empty"));
        }

        let owner = Address::parse(parts[0]).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            owner,
            name: parts[1].to_string(),
            version: parts.get(2).map(|v| v.to_string()),
        })
    }
}

impl fmt::Debug for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepositoryId({self})")
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)?;
        if let Some(ref version) = self.version {
            write!(f, "/{version}")?;
        }
        Ok(())
    }
}

impl FromStr for RepositoryId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for RepositoryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RepositoryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
