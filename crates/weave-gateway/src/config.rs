use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

/// Size of one data chunk on the network (256 KiB).
pub const DATA_CHUNK_SIZE: u64 = 256 * 1024;

/// Largest blob fetched through the bulk data endpoint in a single call.
/// Anything larger is read chunk by chunk.
pub const MAX_DIRECT_BYTES: u64 = 12 * 1024 * 1024;

/// Client-side gateway settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Gateway base URL, without a trailing slash.
    pub url: String,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Bulk-fetch threshold; see [`MAX_DIRECT_BYTES`].
    pub max_direct_bytes: u64,
    /// Upload chunk size; see [`DATA_CHUNK_SIZE`].
    pub chunk_size: u64,
    /// Value written to the `App-Version` tag.
    pub app_version: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "https://arweave.net".into(),
            request_timeout_secs: 60,
            max_direct_bytes: MAX_DIRECT_BYTES,
            chunk_size: DATA_CHUNK_SIZE,
            app_version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

impl GatewayConfig {
    /// Parse from TOML. Missing keys take their default.
    pub fn from_toml_str(input: &str) -> GatewayResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> GatewayResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.url.trim().is_empty() {
            return Err(GatewayError::InvalidConfig("url must not be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(GatewayError::InvalidConfig(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(GatewayError::InvalidConfig("chunk_size must be positive".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Join `path` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
