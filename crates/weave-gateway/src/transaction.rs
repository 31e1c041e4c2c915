//! Signed transaction headers and data chunks.
//!
//! A blob is created by submitting a [`BlobTransaction`] that commits to the
//! data through `data_root`, then posting each [`UploadChunk`] in order.
//!
//! Ed25519 signatures are deterministic, so every header carries a random
//! salt. Resubmitting the same data and tags therefore yields a new blob id.

use serde::{Deserialize, Serialize};
use weave_crypto::{
    address_from_public_key, blob_id_from_signature, verify_signature, CryptoResult, MerkleProof,
    Signer,
};
use weave_types::{Address, BlobId, Tags};

/// Domain tag prefixed to every signature payload.
const SIGNATURE_DOMAIN: &[u8] = b"weave-tx-v1";

/// Length of the per-transaction salt.
pub const SALT_LEN: usize = 16;

/// A transaction header before signing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub tags: Tags,
    pub data_size: u64,
    pub data_root: [u8; 32],
    /// Recent block anchor from the gateway.
    pub anchor: String,
    /// Storage fee quoted by the gateway, in the network's base unit.
    pub reward: u64,
}

impl UnsignedTransaction {
    /// Sign with `signer` under a fresh random salt.
    pub fn sign(self, signer: &dyn Signer) -> BlobTransaction {
        self.sign_with_salt(signer, rand::random())
    }

    /// Sign with an explicit salt; the blob id is derived from salt and signature.
    pub fn sign_with_salt(self, signer: &dyn Signer, salt: [u8; SALT_LEN]) -> BlobTransaction {
        let owner = signer.public_key();
        let payload = signature_payload(
            &owner,
            &self.tags,
            self.data_size,
            &self.data_root,
            &self.anchor,
            self.reward,
            &salt,
        );
        let signature = signer.sign(&payload);
        let mut tx = BlobTransaction {
            id: BlobId::from_hash([0; 32]),
            owner,
            tags: self.tags,
            data_size: self.data_size,
            data_root: self.data_root,
            anchor: self.anchor,
            reward: self.reward,
            salt,
            signature,
        };
        tx.id = blob_id_from_signature(&tx.wire_signature());
        tx
    }
}

/// A signed transaction header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobTransaction {
    pub id: BlobId,
    /// Owner public key.
    pub owner: Vec<u8>,
    pub tags: Tags,
    pub data_size: u64,
    pub data_root: [u8; 32],
    pub anchor: String,
    pub reward: u64,
    pub salt: [u8; SALT_LEN],
    pub signature: Vec<u8>,
}

impl BlobTransaction {
    pub fn owner_address(&self) -> Address {
        address_from_public_key(&self.owner)
    }

    /// Salt followed by the signature, as sent to the gateway.
    pub fn wire_signature(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SALT_LEN + self.signature.len());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.signature);
        out
    }

    /// Check the signature and that `id` is derived from it.
    pub fn verify(&self) -> CryptoResult<()> {
        let payload = signature_payload(
            &self.owner,
            &self.tags,
            self.data_size,
            &self.data_root,
            &self.anchor,
            self.reward,
            &self.salt,
        );
        verify_signature(&self.owner, &payload, &self.signature)?;
        if blob_id_from_signature(&self.wire_signature()) != self.id {
            return Err(weave_crypto::CryptoError::InvalidSignature);
        }
        Ok(())
    }
}

/// One chunk of blob data with its inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadChunk {
    pub data_root: [u8; 32],
    pub data_size: u64,
    /// Offset of the chunk's first byte within the blob data.
    pub offset: u64,
    pub data: Vec<u8>,
    pub proof: MerkleProof,
}

/// Deterministic byte string covered by the signature.
///
/// Variable-length fields are length-prefixed so no two headers share a payload.
fn signature_payload(
    owner: &[u8],
    tags: &Tags,
    data_size: u64,
    data_root: &[u8; 32],
    anchor: &str,
    reward: u64,
    salt: &[u8; SALT_LEN],
) -> Vec<u8> {
    fn field(out: &mut Vec<u8>, bytes: &[u8]) {
        out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        out.extend_from_slice(bytes);
    }

    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(SIGNATURE_DOMAIN);
    field(&mut out, owner);
    out.extend_from_slice(&(tags.len() as u64).to_le_bytes());
    for tag in tags {
        field(&mut out, tag.name.as_bytes());
        field(&mut out, tag.value.as_bytes());
    }
    out.extend_from_slice(&data_size.to_le_bytes());
    out.extend_from_slice(data_root);
    field(&mut out, anchor.as_bytes());
    out.extend_from_slice(&reward.to_le_bytes());
    out.extend_from_slice(salt);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_crypto::Ed25519Signer;

    fn unsigned() -> UnsignedTransaction {
        UnsignedTransaction {
            tags: Tags::new().with("App-Name", "Ritual"),
            data_size: 5,
            data_root: [9; 32],
            anchor: "anchor".into(),
            reward: 42,
        }
    }

    #[test]
    fn signed_transaction_verifies() {
        let signer = Ed25519Signer::generate();
        let tx = unsigned().sign(&signer);
        assert!(tx.verify().is_ok());
        assert_eq!(tx.owner_address(), signer.address());
    }

    #[test]
    fn tampered_tags_fail_verification() {
        let signer = Ed25519Signer::generate();
        let mut tx = unsigned().sign(&signer);
        tx.tags.push("Extra", "tag");
        assert!(tx.verify().is_err());
    }

    #[test]
    fn forged_id_fails_verification() {
        let signer = Ed25519Signer::generate();
        let mut tx = unsigned().sign(&signer);
        tx.id = BlobId::from_hash([0; 32]);
        assert!(tx.verify().is_err());
    }

    #[test]
    fn resigning_yields_a_new_id() {
        let signer = Ed25519Signer::generate();
        let a = unsigned().sign(&signer);
        let b = unsigned().sign(&signer);
        assert_ne!(a.id, b.id);
        assert!(b.verify().is_ok());
    }

    #[test]
    fn same_salt_is_reproducible() {
        let signer = Ed25519Signer::generate();
        let a = unsigned().sign_with_salt(&signer, [1; SALT_LEN]);
        let b = unsigned().sign_with_salt(&signer, [1; SALT_LEN]);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn tampered_salt_fails_verification() {
        let signer = Ed25519Signer::generate();
        let mut tx = unsigned().sign(&signer);
        tx.salt[0] ^= 1;
        assert!(tx.verify().is_err());
    }

    #[test]
    fn payload_separates_tag_boundaries() {
        let a = Tags::new().with("ab", "c");
        let b = Tags::new().with("a", "bc");
        assert_ne!(
            signature_payload(b"k", &a, 0, &[0; 32], "", 0, &[0; SALT_LEN]),
            signature_payload(b"k", &b, 0, &[0; 32], "", 0, &[0; SALT_LEN])
        );
    }
}
