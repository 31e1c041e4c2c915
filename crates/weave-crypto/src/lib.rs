//! Integrity and signing primitives for the weave client.
//!
//! Provides streamed SHA-256 content digests, tag encoding helpers, the
//! chunk Merkle tree behind a transaction's `data_root`, and the signing
//! identity used to publish blobs.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod digest;
pub mod encoding;
pub mod error;
pub mod merkle;
pub mod signer;
pub mod tags;

pub use digest::{digest_bytes, digest_file, digest_reader, ContentDigest};
pub use encoding::{b64url_decode, b64url_encode};
pub use error::{CryptoError, CryptoResult};
pub use merkle::{chunk_hash, MerkleProof, MerkleTree, Side};
pub use signer::{
    address_from_public_key, blob_id_from_signature, verify_signature, Ed25519Signer, Signer,
};
pub use tags::{decode_tags, encode_tags, tags_to_map, EncodedTag};
