use async_trait::async_trait;
use weave_types::{BlobId, BlobStatus};

use crate::error::GatewayResult;
use crate::transaction::{BlobTransaction, UploadChunk};
use crate::types::{BlobMetadata, BlobOffset, QueryEdge, TagQuery};

/// Storage-network gateway.
///
/// All implementations must satisfy these invariants:
/// - A blob id, once finalized, always returns the same bytes.
/// - `blob_status` never reports `Pending` for a blob it has reported `Finalized`.
/// - Reads of a pending blob's data fail with `GatewayError::Pending`, not a
///   generic error.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Tag/owner-filtered search, newest first. Pending blobs sort before
    /// every finalized blob.
    async fn graph_query(&self, query: &TagQuery) -> GatewayResult<Vec<QueryEdge>>;

    /// Whole-blob fetch. May refuse large blobs with `PayloadTooLarge`.
    async fn fetch_blob_data(&self, id: &BlobId) -> GatewayResult<Vec<u8>>;

    /// Size-bounded bulk fetch, usable below `MAX_DIRECT_BYTES`.
    async fn fetch_bulk_data(&self, id: &BlobId) -> GatewayResult<Vec<u8>>;

    /// Location of a finalized blob in the weave.
    async fn fetch_blob_offset(&self, id: &BlobId) -> GatewayResult<BlobOffset>;

    /// Base64url-encoded chunk starting at absolute weave `offset`.
    async fn fetch_chunk(&self, offset: u64) -> GatewayResult<String>;

    /// Size and tags of a blob, without its body.
    async fn fetch_blob_metadata(&self, id: &BlobId) -> GatewayResult<BlobMetadata>;

    /// Lifecycle state of a blob.
    async fn blob_status(&self, id: &BlobId) -> GatewayResult<BlobStatus>;

    /// Recent block anchor to embed in a new transaction.
    async fn tx_anchor(&self) -> GatewayResult<String>;

    /// Storage fee for `data_size` bytes.
    async fn price(&self, data_size: u64) -> GatewayResult<u64>;

    /// Submit a signed header. Returns the blob's state after submission.
    async fn submit_blob(&self, tx: &BlobTransaction) -> GatewayResult<BlobStatus>;

    /// Post one data chunk for a submitted header.
    async fn submit_chunk(&self, chunk: &UploadChunk) -> GatewayResult<()>;
}
