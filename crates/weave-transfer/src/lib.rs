//! Moves one blob's bytes to and from the storage network.
//!
//! [`TransferClient`] uploads a file (or an in-memory payload) as a signed,
//! tagged blob and downloads a blob by id. It also answers whether a local
//! file already matches a remote blob, which is how callers skip redundant
//! downloads.
//!
//! # Download strategy
//!
//! 1. Ask the gateway for the blob's status; pending and unknown blobs fail
//!    with [`TransferError::NotFinalized`] / [`TransferError::NotFound`].
//! 2. Look up `{size, end_offset}`. Below `max_direct_bytes` the bulk
//!    endpoint is used in one call.
//! 3. Otherwise chunks are read sequentially from `end_offset - size + 1`.
//! 4. Only after a classified transient failure is a whole-blob fetch tried
//!    as a last resort.
//!
//! Data is written to `<dest>.part` and renamed into place on success.

pub mod client;
pub mod error;
pub mod metrics;

pub use client::TransferClient;
pub use error::{TransferError, TransferResult};
pub use metrics::{MetricsSnapshot, TransferMetrics};
