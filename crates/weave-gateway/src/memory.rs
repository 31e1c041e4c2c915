use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;
use weave_crypto::{b64url_encode, chunk_hash};
use weave_types::{Address, BlobId, BlobStatus};

use crate::config::MAX_DIRECT_BYTES;
use crate::error::{GatewayError, GatewayResult};
use crate::traits::Gateway;
use crate::transaction::{BlobTransaction, UploadChunk};
use crate::types::{BlobMetadata, BlobOffset, QueryEdge, TagQuery};

/// Behaviour knobs for [`InMemoryGateway`].
#[derive(Clone, Debug)]
pub struct MemoryGatewayConfig {
    /// Largest blob served by `fetch_blob_data`.
    pub whole_fetch_limit: u64,
    /// Largest blob served by `fetch_bulk_data`.
    pub bulk_fetch_limit: u64,
    /// Mine every submission immediately.
    pub auto_mine: bool,
    /// Block timestamp of the first mined block.
    pub genesis_time: u64,
}

impl Default for MemoryGatewayConfig {
    fn default() -> Self {
        Self {
            whole_fetch_limit: MAX_DIRECT_BYTES,
            bulk_fetch_limit: MAX_DIRECT_BYTES,
            auto_mine: false,
            genesis_time: 1_700_000_000,
        }
    }
}

struct StoredBlob {
    tx: BlobTransaction,
    owner: Address,
    seq: u64,
    block_timestamp: Option<u64>,
    /// Absolute weave offset of the first byte, assigned when mined.
    weave_start: Option<u64>,
}

#[derive(Default)]
struct State {
    blobs: HashMap<BlobId, StoredBlob>,
    /// data_root -> (offset within data -> chunk bytes). Shared by every
    /// transaction committing to the same root.
    chunks: HashMap<[u8; 32], BTreeMap<u64, Vec<u8>>>,
    next_seq: u64,
    weave_size: u64,
    last_block_time: Option<u64>,
    failing_chunk_fetches: u32,
}

impl State {
    fn get(&self, id: &BlobId) -> GatewayResult<&StoredBlob> {
        self.blobs.get(id).ok_or(GatewayError::NotFound(*id))
    }

    fn finalized(&self, id: &BlobId) -> GatewayResult<&StoredBlob> {
        let blob = self.get(id)?;
        if blob.block_timestamp.is_none() {
            return Err(GatewayError::Pending(*id));
        }
        Ok(blob)
    }

    /// Reassemble a blob's data from its chunks.
    fn assemble(&self, blob: &StoredBlob) -> GatewayResult<Vec<u8>> {
        let size = blob.tx.data_size;
        let weave_start = blob.weave_start.unwrap_or(0);
        let empty = BTreeMap::new();
        let chunks = self.chunks.get(&blob.tx.data_root).unwrap_or(&empty);

        let mut out = Vec::with_capacity(size as usize);
        let mut pos = 0u64;
        while pos < size {
            let chunk = chunks
                .get(&pos)
                .ok_or(GatewayError::ChunkUnavailable {
                    offset: weave_start + pos,
                })?;
            out.extend_from_slice(chunk);
            pos += chunk.len() as u64;
        }
        Ok(out)
    }
}

/// Simulated storage network held in memory.
///
/// Submissions stay pending until [`mine`](Self::mine) (or immediately, with
/// `auto_mine`). Mining assigns each blob a block timestamp and a range of
/// absolute weave offsets, after which it can be read whole, in bulk, or by
/// chunk. Intended for tests and embedding.
pub struct InMemoryGateway {
    state: RwLock<State>,
    config: MemoryGatewayConfig,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::with_config(MemoryGatewayConfig::default())
    }

    pub fn with_config(config: MemoryGatewayConfig) -> Self {
        Self {
            state: RwLock::new(State::default()),
            config,
        }
    }

    /// Finalize every pending blob in one new block. Returns how many were mined.
    pub fn mine(&self) -> usize {
        let next = {
            let state = self.state.read().expect("lock poisoned");
            state
                .last_block_time
                .map_or(self.config.genesis_time, |t| t + 1)
        };
        self.mine_at(next)
    }

    /// Like [`mine`](Self::mine) with an explicit block timestamp.
    pub fn mine_at(&self, timestamp: u64) -> usize {
        let mut state = self.state.write().expect("lock poisoned");
        let mut pending: Vec<(u64, BlobId)> = state
            .blobs
            .values()
            .filter(|b| b.block_timestamp.is_none())
            .map(|b| (b.seq, b.tx.id))
            .collect();
        pending.sort();

        for (_, id) in &pending {
            let start = state.weave_size;
            if let Some(blob) = state.blobs.get_mut(id) {
                blob.block_timestamp = Some(timestamp);
                blob.weave_start = Some(start);
                let size = blob.tx.data_size;
                state.weave_size += size;
            }
        }
        state.last_block_time = Some(timestamp);
        debug!(count = pending.len(), timestamp, "mined block");
        pending.len()
    }

    /// Make the next `n` chunk fetches fail as unavailable.
    pub fn fail_next_chunk_fetches(&self, n: u32) {
        self.state.write().expect("lock poisoned").failing_chunk_fetches = n;
    }

    /// Number of blobs submitted, pending or not.
    pub fn len(&self) -> usize {
        self.state.read().expect("lock poisoned").blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_count(&self) -> usize {
        self.state
            .read()
            .expect("lock poisoned")
            .blobs
            .values()
            .filter(|b| b.block_timestamp.is_none())
            .count()
    }

    /// Whether every chunk of a submitted blob has arrived.
    pub fn is_complete(&self, id: &BlobId) -> bool {
        let state = self.state.read().expect("lock poisoned");
        state
            .get(id)
            .and_then(|blob| state.assemble(blob))
            .is_ok()
    }

    fn read_limited(&self, id: &BlobId, limit: u64, endpoint: &'static str) -> GatewayResult<Vec<u8>> {
        let state = self.state.read().expect("lock poisoned");
        let blob = state.finalized(id)?;
        if blob.tx.data_size > limit {
            return Err(GatewayError::PayloadTooLarge {
                endpoint,
                size: Some(blob.tx.data_size),
            });
        }
        state.assemble(blob)
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryGateway")
            .field("blob_count", &self.len())
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[async_trait]
impl Gateway for InMemoryGateway {
    async fn graph_query(&self, query: &TagQuery) -> GatewayResult<Vec<QueryEdge>> {
        let state = self.state.read().expect("lock poisoned");
        let mut hits: Vec<&StoredBlob> = state
            .blobs
            .values()
            .filter(|b| query.matches(&b.owner, &b.tx.tags))
            .collect();
        // Pending first, then newest block, then latest submission.
        hits.sort_by(|a, b| {
            let key = |x: &StoredBlob| x.block_timestamp.unwrap_or(u64::MAX);
            key(b).cmp(&key(a)).then(b.seq.cmp(&a.seq))
        });
        Ok(hits
            .into_iter()
            .map(|b| QueryEdge {
                blob_id: b.tx.id,
                owner: b.owner,
                block_timestamp: b.block_timestamp,
                tags: b.tx.tags.clone(),
            })
            .collect())
    }

    async fn fetch_blob_data(&self, id: &BlobId) -> GatewayResult<Vec<u8>> {
        self.read_limited(id, self.config.whole_fetch_limit, "whole-blob")
    }

    async fn fetch_bulk_data(&self, id: &BlobId) -> GatewayResult<Vec<u8>> {
        self.read_limited(id, self.config.bulk_fetch_limit, "tx-data")
    }

    async fn fetch_blob_offset(&self, id: &BlobId) -> GatewayResult<BlobOffset> {
        let state = self.state.read().expect("lock poisoned");
        let blob = state.finalized(id)?;
        let start = blob.weave_start.unwrap_or(0);
        Ok(BlobOffset {
            size: blob.tx.data_size,
            end_offset: (start + blob.tx.data_size).saturating_sub(1),
        })
    }

    async fn fetch_chunk(&self, offset: u64) -> GatewayResult<String> {
        let mut state = self.state.write().expect("lock poisoned");
        if state.failing_chunk_fetches > 0 {
            state.failing_chunk_fetches -= 1;
            return Err(GatewayError::ChunkUnavailable { offset });
        }

        let blob = state
            .blobs
            .values()
            .find(|b| {
                b.weave_start
                    .is_some_and(|s| s <= offset && offset < s + b.tx.data_size)
            })
            .ok_or(GatewayError::ChunkUnavailable { offset })?;
        let relative = offset - blob.weave_start.unwrap_or(0);

        let chunk = state
            .chunks
            .get(&blob.tx.data_root)
            .and_then(|chunks| chunks.range(..=relative).next_back())
            .filter(|(start, data)| relative < **start + data.len() as u64)
            .map(|(_, data)| b64url_encode(data))
            .ok_or(GatewayError::ChunkUnavailable { offset })?;
        Ok(chunk)
    }

    async fn fetch_blob_metadata(&self, id: &BlobId) -> GatewayResult<BlobMetadata> {
        let state = self.state.read().expect("lock poisoned");
        let blob = state.finalized(id)?;
        Ok(BlobMetadata {
            id: *id,
            owner: blob.owner,
            size: blob.tx.data_size,
            tags: blob.tx.tags.clone(),
        })
    }

    async fn blob_status(&self, id: &BlobId) -> GatewayResult<BlobStatus> {
        let state = self.state.read().expect("lock poisoned");
        Ok(match state.blobs.get(id) {
            None => BlobStatus::NotFound,
            Some(b) if b.block_timestamp.is_none() => BlobStatus::Pending,
            Some(_) => BlobStatus::Finalized,
        })
    }

    async fn tx_anchor(&self) -> GatewayResult<String> {
        let state = self.state.read().expect("lock poisoned");
        Ok(format!("block-{}", state.last_block_time.unwrap_or(0)))
    }

    async fn price(&self, data_size: u64) -> GatewayResult<u64> {
        Ok(data_size)
    }

    async fn submit_blob(&self, tx: &BlobTransaction) -> GatewayResult<BlobStatus> {
        tx.verify()
            .map_err(|e| GatewayError::Rejected(format!("{}: {e}", tx.id)))?;

        {
            let mut state = self.state.write().expect("lock poisoned");
            if let Some(existing) = state.blobs.get(&tx.id) {
                return Ok(if existing.block_timestamp.is_some() {
                    BlobStatus::Finalized
                } else {
                    BlobStatus::Pending
                });
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.blobs.insert(
                tx.id,
                StoredBlob {
                    tx: tx.clone(),
                    owner: tx.owner_address(),
                    seq,
                    block_timestamp: None,
                    weave_start: None,
                },
            );
        }
        debug!(blob_id = %tx.id, size = tx.data_size, "accepted transaction");

        if self.config.auto_mine {
            self.mine();
            return Ok(BlobStatus::Finalized);
        }
        Ok(BlobStatus::Pending)
    }

    async fn submit_chunk(&self, chunk: &UploadChunk) -> GatewayResult<()> {
        if !chunk.proof.verify()
            || chunk.proof.root != chunk.data_root
            || chunk.proof.leaf != chunk_hash(&chunk.data)
        {
            return Err(GatewayError::Rejected(format!(
                "invalid proof for chunk at offset {}",
                chunk.offset
            )));
        }
        if chunk.offset + chunk.data.len() as u64 > chunk.data_size {
            return Err(GatewayError::Rejected(format!(
                "chunk at offset {} overruns data size {}",
                chunk.offset, chunk.data_size
            )));
        }

        let mut state = self.state.write().expect("lock poisoned");
        let known = state
            .blobs
            .values()
            .any(|b| b.tx.data_root == chunk.data_root && b.tx.data_size == chunk.data_size);
        if !known {
            return Err(GatewayError::Rejected(
                "no transaction commits to this data root".into(),
            ));
        }
        state
            .chunks
            .entry(chunk.data_root)
            .or_default()
            .insert(chunk.offset, chunk.data.clone());
        Ok(())
    }
}
