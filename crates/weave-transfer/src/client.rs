use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use weave_crypto::{b64url_decode, chunk_hash, digest_file, MerkleTree, Signer};
use weave_gateway::{
    BlobOffset, BlobTransaction, Gateway, GatewayConfig, GatewayError, GatewayResult, QueryEdge,
    TagQuery, UnsignedTransaction, UploadChunk,
};
use weave_types::{names, Address, BlobId, BlobStatus, Tags};

use crate::error::{TransferError, TransferResult};
use crate::metrics::TransferMetrics;

/// Uploads and downloads single blobs through a [`Gateway`].
///
/// The gateway and signing identity are injected at construction and shared;
/// the client holds no other state beyond its progress counters.
pub struct TransferClient {
    gateway: Arc<dyn Gateway>,
    signer: Arc<dyn Signer>,
    config: GatewayConfig,
    metrics: TransferMetrics,
}

impl TransferClient {
    pub fn new(gateway: Arc<dyn Gateway>, signer: Arc<dyn Signer>, config: GatewayConfig) -> Self {
        Self {
            gateway,
            signer,
            config,
            metrics: TransferMetrics::default(),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn metrics(&self) -> &TransferMetrics {
        &self.metrics
    }

    /// Address blobs uploaded by this client are owned by.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Lifecycle state of a blob.
    pub async fn status(&self, blob_id: &BlobId) -> TransferResult<BlobStatus> {
        self.call("status", self.gateway.blob_status(blob_id)).await
    }

    /// Upload the file at `path` as one new blob carrying `tags`.
    ///
    /// The file is read twice in `chunk_size` pieces: once to compute the
    /// data root that the signed header commits to, once to post the chunks.
    /// It is never held in memory as a whole. Every call creates a new blob,
    /// so a failed upload must be retried from the start.
    pub async fn upload(&self, path: &Path, tags: Tags) -> TransferResult<BlobId> {
        let chunk_size = self.chunk_size();
        let mut buf = vec![0u8; chunk_size];

        let mut leaves = Vec::new();
        let mut data_size = 0u64;
        let mut file = tokio::fs::File::open(path).await?;
        loop {
            let n = read_full(&mut file, &mut buf).await?;
            if n == 0 {
                break;
            }
            leaves.push(chunk_hash(&buf[..n]));
            data_size += n as u64;
            if n < chunk_size {
                break;
            }
        }

        let tree = MerkleTree::from_leaves(leaves);
        let tx = self.submit_header(tags, data_size, tree.root()).await?;

        let mut file = tokio::fs::File::open(path).await?;
        let mut offset = 0u64;
        for index in 0..tree.leaf_count() {
            let n = read_full(&mut file, &mut buf).await?;
            let data = buf[..n].to_vec();
            if n == 0 || tree.leaf(index) != Some(chunk_hash(&data)) {
                return Err(TransferError::Failure {
                    target: path.display().to_string(),
                    reason: "file changed during upload".into(),
                });
            }
            self.post_chunk(&tx, &tree, index, offset, data).await?;
            offset += n as u64;
        }

        info!(blob_id = %tx.id, path = %path.display(), size = data_size, "uploaded file");
        Ok(tx.id)
    }

    /// Upload an in-memory payload as one new blob carrying `tags`.
    pub async fn upload_bytes(&self, data: &[u8], tags: Tags) -> TransferResult<BlobId> {
        let pieces: Vec<&[u8]> = data.chunks(self.chunk_size()).collect();
        let tree = MerkleTree::from_leaves(pieces.iter().map(|p| chunk_hash(p)).collect());
        let tx = self.submit_header(tags, data.len() as u64, tree.root()).await?;

        let mut offset = 0u64;
        for (index, piece) in pieces.into_iter().enumerate() {
            self.post_chunk(&tx, &tree, index, offset, piece.to_vec()).await?;
            offset += piece.len() as u64;
        }

        info!(blob_id = %tx.id, size = data.len(), "uploaded payload");
        Ok(tx.id)
    }

    /// Download a finalized blob to `dest`, creating parent directories.
    ///
    /// Fails with `NotFinalized` for a pending blob and `NotFound` for an
    /// unknown one. Returns `dest` on success.
    pub async fn download(&self, dest: &Path, blob_id: &BlobId) -> TransferResult<PathBuf> {
        let location = self.locate(blob_id).await?;

        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        tokio::fs::create_dir_all(parent).await?;
        // Deleted on drop unless persisted.
        let part = part_file(parent)?;
        self.download_to_part(&part, blob_id, location).await?;
        part.persist(dest).map_err(|e| e.error)?;

        info!(blob_id = %blob_id, path = %dest.display(), size = location.size, "downloaded blob");
        Ok(dest.to_path_buf())
    }

    /// Download a finalized blob into memory, with the same endpoint
    /// selection as [`download`](Self::download).
    pub async fn download_bytes(&self, blob_id: &BlobId) -> TransferResult<Vec<u8>> {
        let location = self.locate(blob_id).await?;
        let mut buf = Vec::new();
        let fetched = self.fetch_into(&mut buf, blob_id, location).await;
        let data = match fetched {
            Ok(_) => buf,
            Err(e) if allows_whole_fetch(&e) => {
                warn!(blob_id = %blob_id, error = %e, "falling back to whole-blob fetch");
                self.fetch_whole(blob_id, e).await?
            }
            Err(e) => return Err(e),
        };
        check_size(blob_id, location, data.len() as u64)?;
        Ok(data)
    }

    /// Tag/owner search, newest first.
    pub async fn query(&self, query: &TagQuery) -> TransferResult<Vec<QueryEdge>> {
        self.call("graph_query", self.gateway.graph_query(query)).await
    }

    /// Whether `local` already holds the content of `blob_id`.
    ///
    /// Checks, stopping at the first failure: the local file exists, its
    /// size equals the remote size, and its SHA-256 equals the remote
    /// `File-SHA256` tag. Only the remote header is fetched. A mismatch is
    /// `Ok(false)`, never an error.
    pub async fn exists(&self, local: &Path, blob_id: &BlobId) -> TransferResult<bool> {
        let local_size = match tokio::fs::metadata(local).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => return Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let remote = self.call("metadata", self.gateway.fetch_blob_metadata(blob_id)).await?;
        if remote.size != local_size {
            debug!(blob_id = %blob_id, local_size, remote_size = remote.size, "size differs");
            return Ok(false);
        }
        let Some(expected) = remote.tags.get(names::FILE_SHA256) else {
            debug!(blob_id = %blob_id, "remote blob has no content digest");
            return Ok(false);
        };

        let matches = digest_file(local).await?.matches(expected);
        if !matches {
            debug!(blob_id = %blob_id, path = %local.display(), "content digest differs");
        }
        Ok(matches)
    }

    fn chunk_size(&self) -> usize {
        usize::try_from(self.config.chunk_size.max(1)).unwrap_or(usize::MAX)
    }

    /// Run one gateway call under the configured request timeout.
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> TransferResult<T>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        let after: Duration = self.config.request_timeout();
        match tokio::time::timeout(after, fut).await {
            Ok(result) => result.map_err(TransferError::from),
            Err(_) => Err(TransferError::Timeout { operation, after }),
        }
    }

    async fn submit_header(
        &self,
        tags: Tags,
        data_size: u64,
        data_root: [u8; 32],
    ) -> TransferResult<BlobTransaction> {
        let reward = self.call("price", self.gateway.price(data_size)).await?;
        let anchor = self.call("tx_anchor", self.gateway.tx_anchor()).await?;
        let tx = UnsignedTransaction {
            tags,
            data_size,
            data_root,
            anchor,
            reward,
        }
        .sign(self.signer.as_ref());

        let status = self.call("submit", self.gateway.submit_blob(&tx)).await?;
        debug!(blob_id = %tx.id, size = data_size, %status, "submitted header");
        Ok(tx)
    }

    async fn post_chunk(
        &self,
        tx: &BlobTransaction,
        tree: &MerkleTree,
        index: usize,
        offset: u64,
        data: Vec<u8>,
    ) -> TransferResult<()> {
        let proof = tree.proof(index).ok_or_else(|| TransferError::Failure {
            target: tx.id.to_string(),
            reason: format!("no proof for chunk {index}"),
        })?;
        let len = data.len() as u64;
        let chunk = UploadChunk {
            data_root: tx.data_root,
            data_size: tx.data_size,
            offset,
            data,
            proof,
        };
        self.call("submit_chunk", self.gateway.submit_chunk(&chunk)).await?;

        self.metrics.record_upload(len);
        debug!(
            blob_id = %tx.id,
            chunk = index + 1,
            chunks = tree.leaf_count(),
            offset,
            size = len,
            "uploaded chunk"
        );
        Ok(())
    }

    /// Status check followed by the blob's weave location.
    async fn locate(&self, blob_id: &BlobId) -> TransferResult<BlobOffset> {
        match self.status(blob_id).await? {
            BlobStatus::Finalized => {}
            BlobStatus::Pending => return Err(TransferError::NotFinalized { blob_id: *blob_id }),
            BlobStatus::NotFound => return Err(TransferError::NotFound { blob_id: *blob_id }),
        }
        self.call("offset", self.gateway.fetch_blob_offset(blob_id)).await
    }

    async fn download_to_part(
        &self,
        part: &Path,
        blob_id: &BlobId,
        location: BlobOffset,
    ) -> TransferResult<()> {
        let mut file = tokio::fs::File::create(part).await?;
        let written = match self.fetch_into(&mut file, blob_id, location).await {
            Ok(n) => {
                file.flush().await?;
                n
            }
            Err(e) if allows_whole_fetch(&e) => {
                drop(file);
                warn!(blob_id = %blob_id, error = %e, "falling back to whole-blob fetch");
                let data = self.fetch_whole(blob_id, e).await?;
                tokio::fs::write(part, &data).await?;
                data.len() as u64
            }
            Err(e) => return Err(e),
        };
        check_size(blob_id, location, written)
    }

    /// Write a finalized blob's bytes to `out`, choosing the endpoint by size.
    /// Returns the number of bytes written.
    async fn fetch_into<W>(
        &self,
        out: &mut W,
        blob_id: &BlobId,
        location: BlobOffset,
    ) -> TransferResult<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        if location.size < self.config.max_direct_bytes {
            let data = self
                .call("bulk_data", self.gateway.fetch_bulk_data(blob_id))
                .await
                .map_err(|e| with_blob_id(e, blob_id))?;
            out.write_all(&data).await?;
            self.metrics.record_download(data.len() as u64);
            return Ok(data.len() as u64);
        }
        self.fetch_chunks(out, blob_id, location).await
    }

    /// Read chunks sequentially from the blob's first weave offset until
    /// `size` bytes are written.
    async fn fetch_chunks<W>(
        &self,
        out: &mut W,
        blob_id: &BlobId,
        location: BlobOffset,
    ) -> TransferResult<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let start = location.start_offset();
        let mut written = 0u64;

        while written < location.size {
            let offset = start + written;
            let encoded = self
                .call("chunk", self.gateway.fetch_chunk(offset))
                .await
                .map_err(|e| with_blob_id(e, blob_id))?;
            let mut bytes = b64url_decode(&encoded)?;
            if bytes.is_empty() {
                return Err(TransferError::Failure {
                    target: blob_id.to_string(),
                    reason: format!("empty chunk at offset {offset}"),
                });
            }
            let remaining = location.size - written;
            if bytes.len() as u64 > remaining {
                bytes.truncate(remaining as usize);
            }

            out.write_all(&bytes).await?;
            written += bytes.len() as u64;
            self.metrics.record_download(bytes.len() as u64);
            debug!(blob_id = %blob_id, offset, written, size = location.size, "downloaded chunk");
        }
        Ok(written)
    }

    /// Last-resort whole-blob fetch. If it fails too, `cause` is returned so
    /// the caller sees the classified transient error.
    async fn fetch_whole(&self, blob_id: &BlobId, cause: TransferError) -> TransferResult<Vec<u8>> {
        match self.call("blob_data", self.gateway.fetch_blob_data(blob_id)).await {
            Ok(data) => {
                self.metrics.record_download(data.len() as u64);
                Ok(data)
            }
            Err(e) => {
                debug!(blob_id = %blob_id, error = %e, "whole-blob fetch failed");
                Err(cause)
            }
        }
    }
}

impl std::fmt::Debug for TransferClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferClient")
            .field("address", &self.signer.address())
            .field("config", &self.config)
            .finish()
    }
}

/// Errors after which a whole-blob fetch is worth trying.
fn allows_whole_fetch(err: &TransferError) -> bool {
    matches!(
        err,
        TransferError::ChunkUnavailable { .. }
            | TransferError::Timeout { .. }
            | TransferError::Gateway(GatewayError::PayloadTooLarge { .. })
    )
}

fn check_size(blob_id: &BlobId, location: BlobOffset, actual: u64) -> TransferResult<()> {
    if actual != location.size {
        return Err(TransferError::SizeMismatch {
            blob_id: *blob_id,
            expected: location.size,
            actual,
        });
    }
    Ok(())
}

fn with_blob_id(err: TransferError, blob_id: &BlobId) -> TransferError {
    match err {
        TransferError::Gateway(GatewayError::ChunkUnavailable { offset }) => {
            TransferError::ChunkUnavailable {
                blob_id: *blob_id,
                offset,
            }
        }
        other => other,
    }
}

/// Fresh, uniquely named scratch file in `dir` for an in-flight download.
fn part_file(dir: &Path) -> io::Result<tempfile::TempPath> {
    tempfile::Builder::new()
        .prefix(".weave-")
        .suffix(".part")
        .tempfile_in(dir)
        .map(tempfile::NamedTempFile::into_temp_path)
}

/// Fill `buf` from `reader`, returning fewer bytes only at end of input.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_crypto::{digest_bytes, Ed25519Signer};
    use weave_gateway::{InMemoryGateway, MemoryGatewayConfig};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn setup(
        memory: MemoryGatewayConfig,
        chunk_size: u64,
        max_direct: u64,
    ) -> (Arc<InMemoryGateway>, TransferClient) {
        init_tracing();
        let gateway = Arc::new(InMemoryGateway::with_config(memory));
        let config = GatewayConfig {
            url: "memory://".into(),
            request_timeout_secs: 1,
            chunk_size,
            max_direct_bytes: max_direct,
            ..Default::default()
        };
        let client =
            TransferClient::new(gateway.clone(), Arc::new(Ed25519Signer::generate()), config);
        (gateway, client)
    }

    /// In-flight download files left in `dir`.
    fn scratch_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                let name = p.file_name().unwrap().to_string_lossy();
                name.starts_with(".weave-") && name.ends_with(".part")
            })
            .collect()
    }

    fn digest_tags(data: &[u8]) -> Tags {
        Tags::new().with(names::FILE_SHA256, digest_bytes(data).as_str())
    }

    #[tokio::test]
    async fn upload_file_then_bulk_download() {
        let (gw, client) = setup(MemoryGatewayConfig::default(), 4, 1024);
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        std::fs::write(&src, b"hello weave").unwrap();

        let id = client.upload(&src, digest_tags(b"hello weave")).await.unwrap();
        assert!(gw.is_complete(&id));
        gw.mine();

        let dest = dir.path().join("out/nested/dest.bin");
        let path = client.download(&dest, &id).await.unwrap();
        assert_eq!(path, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello weave");
        assert!(scratch_files(dest.parent().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn large_blob_downloads_by_chunk() {
        let (gw, client) = setup(MemoryGatewayConfig::default(), 4, 8);
        let data: Vec<u8> = (0u8..=40).collect();
        // Another blob first so this one starts at a non-zero weave offset.
        client.upload_bytes(b"padding", Tags::new()).await.unwrap();
        let id = client.upload_bytes(&data, Tags::new()).await.unwrap();
        gw.mine();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("big.bin");
        client.download(&dest, &id).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), data);

        let m = client.metrics().snapshot();
        assert_eq!(m.chunks_downloaded, 11);
        assert_eq!(m.bytes_downloaded, 41);
    }

    #[tokio::test]
    async fn download_bytes_uses_both_tiers() {
        let (gw, client) = setup(MemoryGatewayConfig::default(), 4, 8);
        let small = client.upload_bytes(b"tiny", Tags::new()).await.unwrap();
        let large = client.upload_bytes(b"a larger payload", Tags::new()).await.unwrap();
        gw.mine();
        gw.fail_next_chunk_fetches(1);

        assert_eq!(client.download_bytes(&small).await.unwrap(), b"tiny");
        assert_eq!(client.download_bytes(&large).await.unwrap(), b"a larger payload");
    }

    #[tokio::test]
    async fn query_lists_uploaded_blobs() {
        let (gw, client) = setup(MemoryGatewayConfig::default(), 4, 8);
        let id = client
            .upload_bytes(b"x", Tags::new().with("Repo-Name", "r"))
            .await
            .unwrap();
        gw.mine();
        let edges = client
            .query(&TagQuery::new().owner(client.address()).tag("Repo-Name", "r"))
            .await
            .unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].blob_id, id);
    }

    #[tokio::test]
    async fn pending_blob_is_not_finalized() {
        let (_gw, client) = setup(MemoryGatewayConfig::default(), 4, 1024);
        let id = client.upload_bytes(b"abc", Tags::new()).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = client.download(&dir.path().join("x"), &id).await.unwrap_err();
        assert!(matches!(err, TransferError::NotFinalized { blob_id } if blob_id == id));
        assert!(err.is_retryable());
        assert_eq!(client.status(&id).await.unwrap(), BlobStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_blob_is_not_found() {
        let (_gw, client) = setup(MemoryGatewayConfig::default(), 4, 1024);
        let dir = tempfile::tempdir().unwrap();
        let id = BlobId::from_hash([5; 32]);
        let err = client.download(&dir.path().join("x"), &id).await.unwrap_err();
        assert!(matches!(err, TransferError::NotFound { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn unavailable_chunk_falls_back_to_whole_fetch() {
        let (gw, client) = setup(MemoryGatewayConfig::default(), 4, 8);
        let id = client.upload_bytes(b"0123456789abcdef", Tags::new()).await.unwrap();
        gw.mine();
        gw.fail_next_chunk_fetches(1);

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("f");
        client.download(&dest, &id).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"0123456789abcdef");
    }

    #[tokio::test]
    async fn unavailable_chunk_without_fallback_is_retryable() {
        let memory = MemoryGatewayConfig {
            whole_fetch_limit: 0,
            ..Default::default()
        };
        let (gw, client) = setup(memory, 4, 8);
        let id = client.upload_bytes(b"0123456789abcdef", Tags::new()).await.unwrap();
        gw.mine();
        gw.fail_next_chunk_fetches(1);

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("f");
        let err = client.download(&dest, &id).await.unwrap_err();
        assert!(matches!(err, TransferError::ChunkUnavailable { blob_id, .. } if blob_id == id));
        assert!(err.is_retryable());
        assert!(!dest.exists());
        assert!(scratch_files(dest.parent().unwrap()).is_empty());

        // The next attempt succeeds once the chunk is readable again.
        client.download(&dest, &id).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"0123456789abcdef");
    }

    #[tokio::test]
    async fn refused_bulk_fetch_falls_back_to_whole_fetch() {
        let memory = MemoryGatewayConfig {
            bulk_fetch_limit: 2,
            ..Default::default()
        };
        let (gw, client) = setup(memory, 4, 1024);
        let id = client.upload_bytes(b"bulk refused", Tags::new()).await.unwrap();
        gw.mine();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("f");
        client.download(&dest, &id).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"bulk refused");
    }

    #[tokio::test]
    async fn empty_file_roundtrip() {
        let (gw, client) = setup(MemoryGatewayConfig::default(), 4, 1024);
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("empty");
        std::fs::write(&src, b"").unwrap();
        let id = client.upload(&src, digest_tags(b"")).await.unwrap();
        gw.mine();

        let dest = dir.path().join("copy");
        client.download(&dest, &id).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"");
        assert!(client.exists(&dest, &id).await.unwrap());
    }

    #[tokio::test]
    async fn exists_checks_size_then_digest() {
        let (gw, client) = setup(MemoryGatewayConfig::default(), 4, 1024);
        let id = client
            .upload_bytes(b"content", digest_tags(b"content"))
            .await
            .unwrap();
        gw.mine();

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local");
        assert!(!client.exists(&local, &id).await.unwrap());

        std::fs::write(&local, b"content").unwrap();
        assert!(client.exists(&local, &id).await.unwrap());

        std::fs::write(&local, b"content!").unwrap();
        assert!(!client.exists(&local, &id).await.unwrap());

        std::fs::write(&local, b"CONTENT").unwrap();
        assert!(!client.exists(&local, &id).await.unwrap());

        assert!(!client.exists(dir.path(), &id).await.unwrap());
    }

    #[tokio::test]
    async fn exists_without_digest_tag_is_false() {
        let (gw, client) = setup(MemoryGatewayConfig::default(), 4, 1024);
        let id = client.upload_bytes(b"content", Tags::new()).await.unwrap();
        gw.mine();
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local");
        std::fs::write(&local, b"content").unwrap();
        assert!(!client.exists(&local, &id).await.unwrap());
    }

    #[tokio::test]
    async fn upload_counts_chunks() {
        let (_gw, client) = setup(MemoryGatewayConfig::default(), 4, 1024);
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::write(&src, b"0123456789").unwrap();
        client.upload(&src, Tags::new()).await.unwrap();
        let m = client.metrics().snapshot();
        assert_eq!(m.chunks_uploaded, 3);
        assert_eq!(m.bytes_uploaded, 10);
    }

    #[tokio::test]
    async fn uploads_are_never_deduplicated() {
        let (gw, client) = setup(MemoryGatewayConfig::default(), 4, 1024);
        let a = client.upload_bytes(b"same", Tags::new()).await.unwrap();
        let b = client.upload_bytes(b"same", Tags::new()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(gw.len(), 2);
    }

    #[tokio::test]
    async fn slow_gateway_call_times_out() {
        let (_gw, client) = setup(MemoryGatewayConfig::default(), 4, 1024);
        let err = client
            .call("stalled", std::future::pending::<GatewayResult<()>>())
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Timeout { operation: "stalled", .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn download_leaves_sibling_part_file_alone() {
        let (gw, client) = setup(MemoryGatewayConfig::default(), 4, 1024);
        let id = client.upload_bytes(b"fresh", Tags::new()).await.unwrap();
        gw.mine();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("w");
        let sibling = dir.path().join("w.part");
        std::fs::write(&dest, b"stale").unwrap();
        std::fs::write(&sibling, b"user data").unwrap();

        client.download(&dest, &id).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"fresh");
        assert_eq!(std::fs::read(&sibling).unwrap(), b"user data");
        assert!(scratch_files(dir.path()).is_empty());
    }

    #[test]
    fn part_files_are_unique_and_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let a = part_file(dir.path()).unwrap();
        let b = part_file(dir.path()).unwrap();
        assert_ne!(a.to_path_buf(), b.to_path_buf());
        assert_eq!(scratch_files(dir.path()).len(), 2);
        drop((a, b));
        assert!(scratch_files(dir.path()).is_empty());
    }
}
