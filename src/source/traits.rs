use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::AsyncRead;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("forbidden path")]
    Forbidden,
    #[error("asset not found")]
    NotFound,
    #[error("asset read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    /// Resolved file on disk.
    pub path: PathBuf,
    pub len: u64,
    pub modified: SystemTime,
}

impl AssetInfo {
    /// Validator derived from size and modification time.
    pub fn etag(&self) -> String {
        let mtime_ms = self
            .modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("W/\"{:x}-{:x}\"", self.len, mtime_ms)
    }
}

#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Resolve a decoded request path to a servable file.
    async fn probe(&self, request_path: &str) -> Result<AssetInfo, AssetError>;

    /// Read the inclusive byte range `[start, end]`.
    async fn read_range(&self, asset: &AssetInfo, start: u64, end: u64)
        -> Result<Bytes, AssetError>;

    /// Reader over the whole file, limited to the probed length.
    async fn open(&self, asset: &AssetInfo)
        -> Result<Box<dyn AsyncRead + Send + Unpin>, AssetError>;

    async fn read_all(&self, asset: &AssetInfo) -> Result<Bytes, AssetError> {
        if asset.len == 0 {
            return Ok(Bytes::new());
        }
        self.read_range(asset, 0, asset.len - 1).await
    }
}
