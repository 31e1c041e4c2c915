use weave_types::{Address, BlobId};

use crate::digest::sha256;
use crate::error::{CryptoError, CryptoResult};

/// A signing identity that publishes blobs.
///
/// The identity is read-only for the duration of an operation; key rotation
/// and storage are the caller's concern.
pub trait Signer: Send + Sync {
    /// The owner address blobs signed by this identity are attributed to.
    fn address(&self) -> Address;

    /// Raw public key bytes, embedded in transactions as `owner`.
    fn public_key(&self) -> Vec<u8>;

    /// Sign a message.
    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

/// Owner address for a public key: SHA-256 of the raw key bytes.
pub fn address_from_public_key(public_key: &[u8]) -> Address {
    Address::from_hash(sha256(public_key))
}

/// Blob id for a transaction signature: SHA-256 of the raw signature bytes.
pub fn blob_id_from_signature(signature: &[u8]) -> BlobId {
    BlobId::from_hash(sha256(signature))
}

/// Verify an Ed25519 signature made by `public_key`.
pub fn verify_signature(public_key: &[u8], message: &[u8], signature: &[u8]) -> CryptoResult<()> {
    use ed25519_dalek::Verifier;

    let key_bytes: [u8; 32] = public_key
        .try_into()
        .map_err(|_| CryptoError::InvalidKey(format!("expected 32 bytes, got {}", public_key.len())))?;
    let key = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let sig_bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| CryptoError::InvalidSignature)?;
    key.verify(message, &ed25519_dalek::Signature::from_bytes(&sig_bytes))
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Ed25519 signing identity.
pub struct Ed25519Signer(ed25519_dalek::SigningKey);

impl Ed25519Signer {
    /// Generate a new random identity.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from a raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Raw secret key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl Signer for Ed25519Signer {
    fn address(&self) -> Address {
        address_from_public_key(self.0.verifying_key().as_bytes())
    }

    fn public_key(&self) -> Vec<u8> {
        self.0.verifying_key().to_bytes().to_vec()
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        use ed25519_dalek::Signer as _;
        self.0.sign(message).to_bytes().to_vec()
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signer({}, <redacted>)", self.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let signer = Ed25519Signer::generate();
        let sig = signer.sign(b"hello world");
        assert!(verify_signature(&signer.public_key(), b"hello world", &sig).is_ok());
    }

    #[test]
    fn verify_fails_on_wrong_message() {
        let signer = Ed25519Signer::generate();
        let sig = signer.sign(b"correct message");
        assert!(matches!(
            verify_signature(&signer.public_key(), b"wrong message", &sig),
            Err(CryptoError::InvalidSignature)
        ));
    }

    #[test]
    fn verify_fails_with_wrong_key() {
        let a = Ed25519Signer::generate();
        let b = Ed25519Signer::generate();
        let sig = a.sign(b"message");
        assert!(verify_signature(&b.public_key(), b"message", &sig).is_err());
    }

    #[test]
    fn verify_rejects_short_key() {
        assert!(matches!(
            verify_signature(&[1, 2, 3], b"m", &[0; 64]),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn address_is_deterministic_per_key() {
        let signer = Ed25519Signer::from_bytes([5u8; 32]);
        let again = Ed25519Signer::from_bytes(*signer.as_bytes());
        assert_eq!(signer.address(), again.address());
        assert_eq!(signer.address(), address_from_public_key(&signer.public_key()));
        assert_ne!(signer.address(), Ed25519Signer::generate().address());
    }

    #[test]
    fn blob_id_from_signature_is_stable() {
        let signer = Ed25519Signer::from_bytes([6u8; 32]);
        // Ed25519 signatures are deterministic.
        let a = blob_id_from_signature(&signer.sign(b"tx"));
        let b = blob_id_from_signature(&signer.sign(b"tx"));
        assert_eq!(a, b);
    }

    #[test]
    fn debug_redacts_secret() {
        let signer = Ed25519Signer::generate();
        assert!(format!("{signer:?}").contains("redacted"));
    }
}
