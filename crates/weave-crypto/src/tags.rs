use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use weave_types::{Tag, Tags};

use crate::encoding::{b64url_decode, b64url_encode};
use crate::error::{CryptoError, CryptoResult};

/// A tag as it appears in a transaction header: name and value base64url-encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedTag {
    pub name: String,
    pub value: String,
}

/// Collapse an ordered tag list into a lookup map. Duplicate names are last-wins.
pub fn tags_to_map<'a>(tags: impl IntoIterator<Item = &'a Tag>) -> BTreeMap<String, String> {
    tags.into_iter()
        .map(|t| (t.name.clone(), t.value.clone()))
        .collect()
}

/// Encode tags for a transaction header.
pub fn encode_tags(tags: &Tags) -> Vec<EncodedTag> {
    tags.iter()
        .map(|t| EncodedTag {
            name: b64url_encode(t.name.as_bytes()),
            value: b64url_encode(t.value.as_bytes()),
        })
        .collect()
}

/// Decode tags from a transaction header.
pub fn decode_tags(encoded: &[EncodedTag]) -> CryptoResult<Tags> {
    encoded
        .iter()
        .map(|t| {
            let name = utf8(b64url_decode(&t.name)?)?;
            let value = utf8(b64url_decode(&t.value)?)?;
            Ok(Tag { name, value })
        })
        .collect()
}

fn utf8(bytes: Vec<u8>) -> CryptoResult<String> {
    String::from_utf8(bytes).map_err(|e| CryptoError::InvalidEncoding(e.to_string()))
}
