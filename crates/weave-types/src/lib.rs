//! Foundation types for the weave client.
//!
//! This crate provides the identifier, tag and lifecycle types shared by every
//! other weave crate. It has no knowledge of the network; it only defines the
//! values that flow over it.
//!
//! # Key Types
//!
//! - [`BlobId`] -- 32-byte blob (transaction) identifier, rendered as unpadded base64url
//! - [`Address`] -- owner address of a signing identity, same rendering as `BlobId`
//! - [`RepositoryId`] -- `owner/name[/version]` repository identifier
//! - [`Tag`] / [`Tags`] -- ordered key/value pairs attached to blobs
//! - [`BlobStatus`] -- `Pending | Finalized | NotFound` lifecycle state

pub mod blob;
pub mod error;
pub mod identity;
pub mod tag;

pub use blob::{BlobId, BlobStatus};
pub use error::TypeError;
pub use identity::{Address, RepositoryId};
pub use tag::{names, values, Tag, Tags};
