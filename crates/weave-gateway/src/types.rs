use serde::{Deserialize, Serialize};
use weave_types::{Address, BlobId, Tag, Tags};

/// Where a finalized blob's data sits in the weave.
///
/// The blob occupies the absolute byte range
/// `end_offset - size + 1 ..= end_offset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobOffset {
    pub size: u64,
    pub end_offset: u64,
}

impl BlobOffset {
    /// Absolute offset of the blob's first byte.
    pub fn start_offset(&self) -> u64 {
        (self.end_offset + 1).saturating_sub(self.size)
    }
}

/// Header-only view of a blob: no body is transferred.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub id: BlobId,
    pub owner: Address,
    pub size: u64,
    pub tags: Tags,
}

/// One search hit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryEdge {
    pub blob_id: BlobId,
    pub owner: Address,
    /// Confirmation block time in unix seconds; `None` while pending.
    pub block_timestamp: Option<u64>,
    pub tags: Tags,
}

impl QueryEdge {
    pub fn is_pending(&self) -> bool {
        self.block_timestamp.is_none()
    }
}

/// Owner- and tag-filtered blob search. All filters must match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagQuery {
    /// Empty means any owner.
    pub owners: Vec<Address>,
    pub tags: Vec<Tag>,
}

impl TagQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(mut self, owner: Address) -> Self {
        self.owners.push(owner);
        self
    }

    pub fn tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    /// Returns `true` if `owner` and `tags` satisfy every filter.
    pub fn matches(&self, owner: &Address, tags: &Tags) -> bool {
        (self.owners.is_empty() || self.owners.contains(owner)) && tags.matches(&self.tags)
    }
}
