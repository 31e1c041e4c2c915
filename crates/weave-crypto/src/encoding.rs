use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

/// Unpadded URL-safe base64, the encoding used for ids, tags and chunks.
pub fn b64url_encode(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Inverse of [`b64url_encode`]. Trailing `=` padding is tolerated.
pub fn b64url_decode(s: &str) -> CryptoResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(s.trim_end_matches('='))
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))
}
