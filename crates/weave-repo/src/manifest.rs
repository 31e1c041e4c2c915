//! Path manifests: one published snapshot of a repository.
//!
//! Wire form (`application/x-arweave-manifest+json`):
//!
//! ```json
//! {
//!   "manifest": "arweave/paths",
//!   "version": "0.1.0",
//!   "paths": { "dir/file.bin": { "id": "<blob id>" } }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use weave_types::BlobId;

use crate::error::{RepoError, RepoResult};

/// Value of the `manifest` field.
pub const MANIFEST_KIND: &str = "arweave/paths";
/// Value of the `version` field written by this crate.
pub const MANIFEST_VERSION: &str = "0.1.0";

/// Mapping from normalized relative path to blob id, ordered by path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    paths: BTreeMap<String, BlobId>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry. The path is normalized first.
    pub fn insert(&mut self, path: &str, blob_id: BlobId) -> RepoResult<Option<BlobId>> {
        let path = normalize_path(path)?;
        Ok(self.paths.insert(path, blob_id))
    }

    pub fn get(&self, path: &str) -> Option<&BlobId> {
        self.paths.get(path)
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BlobId)> {
        self.paths.iter().map(|(p, id)| (p.as_str(), id))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn to_wire_format(&self) -> RepoResult<Vec<u8>> {
        let wire = WireManifest {
            manifest: MANIFEST_KIND.into(),
            version: MANIFEST_VERSION.into(),
            paths: self
                .paths
                .iter()
                .map(|(p, id)| (p.clone(), WireEntry { id: *id }))
                .collect(),
        };
        serde_json::to_vec(&wire).map_err(|e| RepoError::Manifest(e.to_string()))
    }

    /// Decode a manifest, rejecting other manifest kinds and unsafe paths.
    pub fn from_wire_format(bytes: &[u8]) -> RepoResult<Self> {
        let wire: WireManifest =
            serde_json::from_slice(bytes).map_err(|e| RepoError::Manifest(e.to_string()))?;
        if wire.manifest != MANIFEST_KIND {
            return Err(RepoError::Manifest(format!(
                "unsupported manifest kind '{}'",
                wire.manifest
            )));
        }

        let mut manifest = Self::new();
        for (path, entry) in wire.paths {
            manifest.insert(&path, entry.id)?;
        }
        Ok(manifest)
    }
}

#[derive(Serialize, Deserialize)]
struct WireManifest {
    #[serde(default = "default_kind")]
    manifest: String,
    #[serde(default = "default_version")]
    version: String,
    paths: BTreeMap<String, WireEntry>,
}

#[derive(Serialize, Deserialize)]
struct WireEntry {
    id: BlobId,
}

fn default_kind() -> String {
    MANIFEST_KIND.into()
}

fn default_version() -> String {
    MANIFEST_VERSION.into()
}

/// Normalize a repository-relative path to `/`-separated form.
///
/// `/` is the only separator; `.` and empty segments are dropped. Absolute
/// paths and `..` segments are rejected. Every other character, `\` and
/// `:` included, is part of a file name.
pub fn normalize_path(path: &str) -> RepoResult<String> {
    if path.starts_with('/') {
        return Err(invalid_path(path, "absolute path"));
    }

    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(invalid_path(path, "escapes the repository root")),
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Err(invalid_path(path, "empty path"));
    }
    Ok(segments.join("/"))
}

/// Relative path of `file` under `root` in normalized form.
pub(crate) fn relative_path(root: &Path, file: &Path) -> RepoResult<String> {
    let shown = file.display().to_string();
    let rel = file
        .strip_prefix(root)
        .map_err(|_| invalid_path(&shown, "outside the published directory"))?;

    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(s) => {
                segments.push(s.to_str().ok_or_else(|| invalid_path(&shown, "not UTF-8"))?)
            }
            _ => return Err(invalid_path(&shown, "unexpected path component")),
        }
    }
    normalize_path(&segments.join("/"))
}

/// Local destination of a normalized manifest path under `dest`.
///
/// Each segment must be a single plain file name on this platform, so a
/// drive prefix or a `\` separator on Windows is rejected rather than
/// written outside the intended location.
pub(crate) fn local_path(dest: &Path, path: &str) -> RepoResult<PathBuf> {
    let mut local = dest.to_path_buf();
    for segment in normalize_path(path)?.split('/') {
        if cfg!(windows) && segment.contains(':') {
            return Err(invalid_path(path, "drive or stream prefix"));
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(s)), None) if s == segment => local.push(s),
            _ => return Err(invalid_path(path, "not a plain file name on this platform")),
        }
    }
    Ok(local)
}

fn invalid_path(path: &str, reason: &str) -> RepoError {
    RepoError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(n: u8) -> BlobId {
        BlobId::from_hash([n; 32])
    }

    #[test]
    fn wire_format_shape() {
        let mut m = Manifest::new();
        m.insert("b/file2", id(2)).unwrap();
        m.insert("file1", id(1)).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&m.to_wire_format().unwrap()).unwrap();
        assert_eq!(value["manifest"], "arweave/paths");
        assert_eq!(value["version"], "0.1.0");
        assert_eq!(value["paths"]["file1"]["id"], id(1).to_string());
        assert_eq!(value["paths"]["b/file2"]["id"], id(2).to_string());
    }

    #[test]
    fn decodes_bare_paths_object() {
        let raw = format!(r#"{{"paths": {{"a.txt": {{"id": "{}"}}}}}}"#, id(7));
        let m = Manifest::from_wire_format(raw.as_bytes()).unwrap();
        assert_eq!(m.get("a.txt"), Some(&id(7)));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            Manifest::from_wire_format(b"not json"),
            Err(RepoError::Manifest(_))
        ));
        assert!(matches!(
            Manifest::from_wire_format(br#"{"paths": {"a": {"id": "short"}}}"#),
            Err(RepoError::Manifest(_))
        ));
        assert!(matches!(
            Manifest::from_wire_format(br#"{"manifest": "other", "paths": {}}"#),
            Err(RepoError::Manifest(_))
        ));
    }

    #[test]
    fn rejects_escaping_paths_on_decode() {
        let raw = format!(r#"{{"paths": {{"../etc/passwd": {{"id": "{}"}}}}}}"#, id(1));
        assert!(matches!(
            Manifest::from_wire_format(raw.as_bytes()),
            Err(RepoError::InvalidPath { .. })
        ));
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_path("a/./b//c").unwrap(), "a/b/c");
        assert_eq!(normalize_path("dir\\file.txt").unwrap(), "dir\\file.txt");
        assert_eq!(normalize_path("run-10:00:00.log").unwrap(), "run-10:00:00.log");
        assert!(normalize_path("/etc/passwd").is_err());
        assert!(normalize_path("a/../b").is_err());
        assert!(normalize_path("./").is_err());
    }

    #[test]
    fn relative_and_local_paths() {
        let root = Path::new("/srv/repo");
        let rel = relative_path(root, Path::new("/srv/repo/sub/f.bin")).unwrap();
        assert_eq!(rel, "sub/f.bin");
        assert_eq!(
            local_path(Path::new("/tmp/out"), &rel).unwrap(),
            PathBuf::from("/tmp/out/sub/f.bin")
        );
        assert!(relative_path(root, Path::new("/elsewhere/f")).is_err());
        assert!(local_path(Path::new("/tmp/out"), "../f").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn unix_file_names_keep_colons_and_backslashes() {
        let root = Path::new("/srv/repo");
        let rel = relative_path(root, Path::new("/srv/repo/logs/a\\b:c.log")).unwrap();
        assert_eq!(rel, "logs/a\\b:c.log");
        let local = local_path(Path::new("/tmp/out"), &rel).unwrap();
        assert_eq!(local, Path::new("/tmp/out/logs").join("a\\b:c.log"));
        assert_eq!(local.components().count(), 5);
    }

    #[cfg(windows)]
    #[test]
    fn windows_rejects_prefixes_and_backslashes() {
        let dest = Path::new("C:\\out");
        assert!(local_path(dest, "D:/x").is_err());
        assert!(local_path(dest, "a\\b.txt").is_err());
        assert!(local_path(dest, "a:b.log").is_err());
    }

    proptest! {
        #[test]
        fn wire_roundtrip(entries in proptest::collection::btree_map("[a-z]{1,6}(/[a-z0-9_-]{1,6}){0,2}", any::<[u8; 32]>(), 0..8)) {
            let mut m = Manifest::new();
            for (path, hash) in &entries {
                m.insert(path, BlobId::from_hash(*hash)).unwrap();
            }
            let decoded = Manifest::from_wire_format(&m.to_wire_format().unwrap()).unwrap();
            prop_assert_eq!(decoded, m);
        }
    }
}
