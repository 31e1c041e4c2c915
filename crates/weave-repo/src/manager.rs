use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use weave_crypto::digest_file;
use weave_gateway::{QueryEdge, TagQuery};
use weave_transfer::{TransferClient, TransferError};
use weave_types::{names, values, BlobId, RepositoryId, Tags, TypeError};

use crate::error::{RepoError, RepoResult};
use crate::manifest::{local_path, normalize_path, relative_path, Manifest};
use crate::resolver::{LatestConfirmed, VersionResolver};

/// Per-publish settings. Maps are keyed by normalized relative path.
#[derive(Clone, Debug, Default)]
pub struct PublishOptions {
    /// `File-Version` per file; unlisted files get `0.0.0`.
    pub version_mapping: BTreeMap<String, String>,
    /// Additional tags per file.
    pub extra_tags: BTreeMap<String, Tags>,
    /// Written as `Repo-Version` on every blob of the publish.
    pub repo_version: Option<String>,
}

/// Outcome of a completed publish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadResult {
    pub repository_id: RepositoryId,
    pub manifest_blob_id: BlobId,
    pub manifest_url: String,
}

/// One manifest of a repository, as seen by a tag query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestRecord {
    pub blob_id: BlobId,
    /// `None` while pending.
    pub block_timestamp: Option<u64>,
    /// Publish time from the `Unix-Time` tag.
    pub unix_time: Option<i64>,
}

impl From<&QueryEdge> for ManifestRecord {
    fn from(edge: &QueryEdge) -> Self {
        Self {
            blob_id: edge.blob_id,
            block_timestamp: edge.block_timestamp,
            unix_time: edge.tags.get(names::UNIX_TIME).and_then(|t| t.parse().ok()),
        }
    }
}

/// A single-file fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRequest {
    pub name: String,
    pub version: Option<String>,
    pub force_download: bool,
}

impl FileRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            force_download: false,
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn force_download(mut self, force: bool) -> Self {
        self.force_download = force;
        self
    }
}

/// Publishes directories as repositories and fetches them back.
pub struct RepositoryManager {
    transfer: Arc<TransferClient>,
    resolver: Arc<dyn VersionResolver>,
}

impl RepositoryManager {
    /// Manager resolving with [`LatestConfirmed`].
    pub fn new(transfer: Arc<TransferClient>) -> Self {
        Self {
            transfer,
            resolver: Arc::new(LatestConfirmed),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn VersionResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn transfer(&self) -> &TransferClient {
        &self.transfer
    }

    /// Upload every regular file under `dir`, then a manifest naming them.
    ///
    /// All blobs of one publish share a `Unix-Time` tag. Symlinks are not
    /// followed. If any file upload fails the manifest is not uploaded; blobs
    /// already stored stay behind unreferenced.
    pub async fn publish(
        &self,
        repo_name: &str,
        dir: &Path,
        options: &PublishOptions,
    ) -> RepoResult<UploadResult> {
        let repository_id = self.repository_id(repo_name, options.repo_version.as_deref())?;
        let files = list_files(dir).await?;
        let unix_time = chrono::Utc::now().timestamp().to_string();
        info!(repository = %repository_id, files = files.len(), "publishing");

        let mut manifest = Manifest::new();
        for (rel, path) in &files {
            let version = options
                .version_mapping
                .get(rel)
                .map_or(values::DEFAULT_FILE_VERSION, String::as_str);
            let content_type = mime_guess::from_path(rel)
                .first()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_else(|| values::DEFAULT_CONTENT_TYPE.to_string());

            let mut tags = self
                .common_tags(&repository_id, &unix_time)
                .with(names::FILE_NAME, rel)
                .with(names::FILE_VERSION, version)
                .with(names::CONTENT_TYPE, content_type);
            if let Some(extra) = options.extra_tags.get(rel) {
                tags.extend(extra.iter().cloned());
            }
            let digest = digest_file(path).await?;
            tags.push(names::FILE_SHA256, digest.as_str());

            let blob_id = self.transfer.upload(path, tags).await?;
            debug!(repository = %repository_id, file = %rel, %blob_id, "published file");
            manifest.insert(rel, blob_id)?;
        }

        let tags = self
            .common_tags(&repository_id, &unix_time)
            .with(names::TYPE, values::MANIFEST_TYPE)
            .with(names::CONTENT_TYPE, values::MANIFEST_CONTENT_TYPE);
        let manifest_blob_id = self
            .transfer
            .upload_bytes(&manifest.to_wire_format()?, tags)
            .await?;
        let manifest_url = self.transfer.config().endpoint(&manifest_blob_id.to_string());

        info!(
            repository = %repository_id,
            manifest = %manifest_blob_id,
            files = manifest.len(),
            "published repository"
        );
        Ok(UploadResult {
            repository_id,
            manifest_blob_id,
            manifest_url,
        })
    }

    /// Download and decode the manifest chosen by the resolver.
    ///
    /// Fails with `NotFound` when the repository has no manifest and with
    /// `NotFinalized` when the chosen one is still pending.
    pub async fn resolve_latest_manifest(&self, repository: &RepositoryId) -> RepoResult<Manifest> {
        let edges = self.transfer.query(&manifest_query(repository)).await?;
        let latest = self
            .resolver
            .select(edges)
            .ok_or_else(|| RepoError::NotFound {
                repository: repository.clone(),
                file: None,
            })?;
        ensure_finalized(repository, &latest)?;

        let bytes = self
            .transfer
            .download_bytes(&latest.blob_id)
            .await
            .map_err(|e| lift_pending(repository, e))?;
        let manifest = Manifest::from_wire_format(&bytes)?;
        debug!(repository = %repository, manifest = %latest.blob_id, files = manifest.len(), "resolved manifest");
        Ok(manifest)
    }

    /// Every manifest of `repository`, in resolver order.
    pub async fn list_manifests(&self, repository: &RepositoryId) -> RepoResult<Vec<ManifestRecord>> {
        let edges = self.transfer.query(&manifest_query(repository)).await?;
        Ok(self
            .resolver
            .order(edges)
            .iter()
            .map(ManifestRecord::from)
            .collect())
    }

    /// Download the current manifest's files into `dest`.
    ///
    /// Unless `force_download` is set, files whose local copy already matches
    /// are skipped. Returns only the paths actually downloaded, in manifest
    /// path order.
    pub async fn fetch_repository(
        &self,
        repository: &RepositoryId,
        dest: &Path,
        force_download: bool,
    ) -> RepoResult<Vec<PathBuf>> {
        let manifest = self.resolve_latest_manifest(repository).await?;
        let targets = manifest
            .iter()
            .map(|(path, blob_id)| local_path(dest, path).map(|local| (local, *blob_id)))
            .collect::<RepoResult<Vec<_>>>()?;

        let mut downloaded = Vec::new();
        for (local, blob_id) in targets {
            if self
                .sync_file(&local, &blob_id, force_download)
                .await
                .map_err(|e| lift_transfer(repository, e))?
            {
                downloaded.push(local);
            }
        }

        info!(
            repository = %repository,
            dest = %dest.display(),
            downloaded = downloaded.len(),
            skipped = manifest.len() - downloaded.len(),
            "fetched repository"
        );
        Ok(downloaded)
    }

    /// Download the newest blob of one named file into `dest_dir`.
    ///
    /// Queries file blobs directly rather than through a manifest, optionally
    /// pinned to a `File-Version`. Returns the local path whether or not a
    /// download was needed.
    pub async fn fetch_file(
        &self,
        repository: &RepositoryId,
        request: &FileRequest,
        dest_dir: &Path,
    ) -> RepoResult<PathBuf> {
        let name = normalize_path(&request.name)?;
        let mut query = TagQuery::new()
            .owner(repository.owner)
            .tag(names::APP_NAME, values::APP_NAME)
            .tag(names::REPO_NAME, repository.name.as_str())
            .tag(names::FILE_NAME, name.as_str());
        if let Some(version) = &repository.version {
            query = query.tag(names::REPO_VERSION, version.as_str());
        }
        if let Some(version) = &request.version {
            query = query.tag(names::FILE_VERSION, version.as_str());
        }

        let edges = self.transfer.query(&query).await?;
        let latest = self
            .resolver
            .select(edges)
            .ok_or_else(|| RepoError::NotFound {
                repository: repository.clone(),
                file: Some(name.clone()),
            })?;
        ensure_finalized(repository, &latest)?;

        let local = local_path(dest_dir, &name)?;
        self.sync_file(&local, &latest.blob_id, request.force_download)
            .await
            .map_err(|e| lift_transfer(repository, e))?;
        Ok(local)
    }

    /// Download `blob_id` to `local` unless it already matches. Returns
    /// whether a download happened.
    async fn sync_file(&self, local: &Path, blob_id: &BlobId, force: bool) -> RepoResult<bool> {
        if !force && self.transfer.exists(local, blob_id).await? {
            debug!(path = %local.display(), %blob_id, "local copy matches, skipping");
            return Ok(false);
        }
        self.transfer.download(local, blob_id).await?;
        Ok(true)
    }

    fn repository_id(&self, name: &str, version: Option<&str>) -> RepoResult<RepositoryId> {
        let invalid = |reason: &str| {
            RepoError::InvalidId(TypeError::InvalidId {
                input: name.to_string(),
                reason: reason.to_string(),
            })
        };
        if name.is_empty() || name.contains('/') {
            return Err(invalid("repository name must be non-empty and contain no '/'"));
        }
        let id = RepositoryId::new(self.transfer.address(), name);
        match version {
            Some(v) if v.is_empty() || v.contains('/') => {
                Err(invalid("repository version must be non-empty and contain no '/'"))
            }
            Some(v) => Ok(id.with_version(v)),
            None => Ok(id),
        }
    }

    fn common_tags(&self, repository: &RepositoryId, unix_time: &str) -> Tags {
        let mut tags = Tags::new()
            .with(names::APP_NAME, values::APP_NAME)
            .with(names::APP_VERSION, self.transfer.config().app_version.as_str())
            .with(names::UNIX_TIME, unix_time)
            .with(names::REPO_NAME, repository.name.as_str());
        if let Some(version) = &repository.version {
            tags.push(names::REPO_VERSION, version.as_str());
        }
        tags
    }
}

impl std::fmt::Debug for RepositoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryManager")
            .field("transfer", &self.transfer)
            .finish_non_exhaustive()
    }
}

fn manifest_query(repository: &RepositoryId) -> TagQuery {
    let mut query = TagQuery::new()
        .owner(repository.owner)
        .tag(names::APP_NAME, values::APP_NAME)
        .tag(names::REPO_NAME, repository.name.as_str())
        .tag(names::TYPE, values::MANIFEST_TYPE);
    if let Some(version) = &repository.version {
        query = query.tag(names::REPO_VERSION, version.as_str());
    }
    query
}

fn ensure_finalized(repository: &RepositoryId, edge: &QueryEdge) -> RepoResult<()> {
    if edge.is_pending() {
        return Err(RepoError::NotFinalized {
            repository: repository.clone(),
            blob_id: edge.blob_id,
        });
    }
    Ok(())
}

fn lift_pending(repository: &RepositoryId, err: TransferError) -> RepoError {
    match err {
        TransferError::NotFinalized { blob_id } => RepoError::NotFinalized {
            repository: repository.clone(),
            blob_id,
        },
        other => RepoError::Transfer(other),
    }
}

fn lift_transfer(repository: &RepositoryId, err: RepoError) -> RepoError {
    match err {
        RepoError::Transfer(e) => lift_pending(repository, e),
        other => other,
    }
}

/// Regular files under `dir` as `(relative path, absolute path)`, sorted by
/// relative path.
async fn list_files(dir: &Path) -> RepoResult<Vec<(String, PathBuf)>> {
    let root = dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> RepoResult<Vec<(String, PathBuf)>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&root).follow_links(false) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = relative_path(&root, entry.path())?;
            files.push((rel, entry.into_path()));
        }
        files.sort();
        Ok(files)
    })
    .await
    .map_err(|e| RepoError::Io(std::io::Error::other(e)))?
}
