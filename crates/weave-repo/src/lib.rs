//! Versioned file repositories on a permanent blob store.
//!
//! A repository is published as one blob per file plus a [`Manifest`] blob
//! mapping relative paths to blob ids. Manifests are never edited: every
//! publish adds a new one, and readers pick the current one with a
//! [`VersionResolver`] (by default the most recently confirmed).
//!
//! [`RepositoryManager`] ties this together on top of a
//! [`TransferClient`](weave_transfer::TransferClient):
//!
//! - `publish` uploads a directory and its manifest
//! - `fetch_repository` downloads the current manifest's files, skipping
//!   local files that already match
//! - `fetch_file` downloads one named, optionally versioned file

pub mod error;
pub mod manager;
pub mod manifest;
pub mod resolver;

pub use error::{RepoError, RepoResult};
pub use manager::{FileRequest, ManifestRecord, PublishOptions, RepositoryManager, UploadResult};
pub use manifest::{normalize_path, Manifest, MANIFEST_KIND, MANIFEST_VERSION};
pub use resolver::{LatestConfirmed, VersionResolver};
