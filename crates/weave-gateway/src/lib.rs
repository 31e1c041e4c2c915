//! Gateway interface to an Arweave-compatible storage network.
//!
//! The [`Gateway`] trait is the only way the rest of the client talks to the
//! network. Blobs are submitted as a signed [`BlobTransaction`] header
//! followed by its data chunks, and read back whole, in bulk, or chunk by
//! chunk by weave offset.
//!
//! # Backends
//!
//! - [`HttpGateway`] -- reqwest client for a real gateway
//! - [`InMemoryGateway`] -- simulated network with explicit mining, for tests and embedding
//!
//! # Consistency
//!
//! 1. Blobs are immutable once submitted; a new upload always gets a new id.
//! 2. A submitted blob is `Pending` until mined, then `Finalized`, never back.
//! 3. Queries may return pending blobs; they carry no block timestamp.
//! 4. Only finalized blobs have weave offsets, so only they can be read by chunk.

pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod traits;
pub mod transaction;
pub mod types;

pub use config::{GatewayConfig, DATA_CHUNK_SIZE, MAX_DIRECT_BYTES};
pub use error::{GatewayError, GatewayResult};
pub use http::HttpGateway;
pub use memory::{InMemoryGateway, MemoryGatewayConfig};
pub use traits::Gateway;
pub use transaction::{BlobTransaction, UnsignedTransaction, UploadChunk, SALT_LEN};
pub use types::{BlobMetadata, BlobOffset, QueryEdge, TagQuery};
