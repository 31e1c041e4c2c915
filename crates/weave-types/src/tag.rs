use serde::{Deserialize, Serialize};

/// Tag names written and queried by the client.
pub mod names {
    pub const APP_NAME: &str = "App-Name";
    pub const APP_VERSION: &str = "App-Version";
    pub const UNIX_TIME: &str = "Unix-Time";
    pub const REPO_NAME: &str = "Repo-Name";
    pub const REPO_VERSION: &str = "Repo-Version";
    pub const FILE_NAME: &str = "File-Name";
    pub const FILE_VERSION: &str = "File-Version";
    pub const FILE_SHA256: &str = "File-SHA256";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const TYPE: &str = "Type";
}

/// Fixed tag values.
pub mod values {
    pub const APP_NAME: &str = "Ritual";
    pub const MANIFEST_TYPE: &str = "manifest";
    pub const DEFAULT_FILE_VERSION: &str = "0.0.0";
    pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
    pub const MANIFEST_CONTENT_TYPE: &str = "application/x-arweave-manifest+json";
}

/// A single key/value pair attached to a blob.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered tag list as carried on the wire.
///
/// Order is preserved and duplicate names are allowed; lookups resolve
/// duplicates last-wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<Tag>);

impl Tags {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a tag, keeping any earlier tag with the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push(Tag::new(name, value));
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// Append every tag from `other`.
    pub fn extend(&mut self, other: impl IntoIterator<Item = Tag>) {
        self.0.extend(other);
    }

    /// Value of the last tag named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }

    /// Returns `true` if every `(name, value)` filter is satisfied.
    pub fn matches(&self, filters: &[Tag]) -> bool {
        filters
            .iter()
            .all(|f| self.0.iter().any(|t| t.name == f.name && t.value == f.value))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Tag] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Tag>> for Tags {
    fn from(tags: Vec<Tag>) -> Self {
        Self(tags)
    }
}

impl FromIterator<Tag> for Tags {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Tags {
    type Item = Tag;
    type IntoIter = std::vec::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
