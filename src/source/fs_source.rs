use std::io::{ErrorKind, SeekFrom};
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use super::traits::{AssetError, AssetInfo, AssetSource};

const INDEX_FILE: &str = "index.html";

/// Serves files below a root directory.
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path onto the root, refusing anything but plain segments.
    fn resolve(&self, request_path: &str) -> Result<PathBuf, AssetError> {
        let relative = Path::new(request_path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(AssetError::Forbidden);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetSource for FsAssetSource {
    async fn probe(&self, request_path: &str) -> Result<AssetInfo, AssetError> {
        if request_path.contains("..") {
            return Err(AssetError::Forbidden);
        }
        let mut path = self.resolve(request_path)?;

        let mut meta = tokio::fs::metadata(&path)
            .await
            .map_err(|_| AssetError::NotFound)?;
        if meta.is_dir() {
            path.push(INDEX_FILE);
            meta = tokio::fs::metadata(&path)
                .await
                .map_err(|_| AssetError::NotFound)?;
        }
        if !meta.is_file() {
            return Err(AssetError::NotFound);
        }

        debug!("asset probe path={} len={}", path.display(), meta.len());

        Ok(AssetInfo {
            len: meta.len(),
            modified: meta.modified().unwrap_or(UNIX_EPOCH),
            path,
        })
    }

    async fn open(
        &self,
        asset: &AssetInfo,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, AssetError> {
        let file = open_file(asset).await?;
        Ok(Box::new(file.take(asset.len)))
    }

    async fn read_range(
        &self,
        asset: &AssetInfo,
        start: u64,
        end: u64,
    ) -> Result<Bytes, AssetError> {
        let mut file = open_file(asset).await?;
        file.seek(SeekFrom::Start(start)).await?;

        let len = end.saturating_sub(start) + 1;
        let mut buf = Vec::with_capacity(len as usize);
        file.take(len).read_to_end(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

async fn open_file(asset: &AssetInfo) -> Result<tokio::fs::File, AssetError> {
    tokio::fs::File::open(&asset.path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => AssetError::NotFound,
            _ => AssetError::Io(e),
        })
}
