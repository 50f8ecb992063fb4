use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rcpt_image::DEFAULT_JPEG_QUALITY;
use rcpt_store::{PersistPolicy, DEFAULT_STORE_FILE};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Default directory for uploaded originals and generated thumbnails.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub store_path: PathBuf,
    /// Deadline for one resize request, covering every worker it spawns.
    pub resize_timeout_ms: u64,
    /// Upper bound on transforms running at once across all requests.
    pub max_concurrent_resizes: usize,
    pub max_upload_bytes: usize,
    pub jpeg_quality: u8,
    pub persist_policy: PersistPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            store_path: PathBuf::from(DEFAULT_STORE_FILE),
            resize_timeout_ms: 30_000,
            max_concurrent_resizes: 8,
            max_upload_bytes: 32 * 1024 * 1024,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            persist_policy: PersistPolicy::BestEffort,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys take their default values.
    pub fn from_toml_str(raw: &str) -> ServerResult<Self> {
        toml::from_str(raw).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: &Path) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn resize_timeout(&self) -> Duration {
        Duration::from_millis(self.resize_timeout_ms)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.max_concurrent_resizes == 0 {
            return Err(ServerError::Config("max_concurrent_resizes must be at least 1".into()));
        }
        if self.resize_timeout_ms == 0 {
            return Err(ServerError::Config("resize_timeout_ms must be at least 1".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ServerError::Config(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}
