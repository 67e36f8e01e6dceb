//! Local storage for generated media.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use super::AssetStore;
use crate::error::MaterializeError;
use crate::media::MediaHandle;

/// Default timeout for a single download (60 seconds).
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Downloads remote handles over HTTP and writes inline payloads as-is.
pub struct HttpAssetStore {
    http_client: reqwest::Client,
}

impl HttpAssetStore {
    pub fn new() -> Result<Self, MaterializeError> {
        Self::with_timeout(DEFAULT_DOWNLOAD_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, MaterializeError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { http_client })
    }

    /// Stream `url` to `dest` without holding the whole body in memory.
    async fn download(&self, url: &str, dest: &Path) -> Result<(), MaterializeError> {
        let response = self.http_client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(MaterializeError::Status {
                status: response.status().as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn materialize(
        &self,
        handle: &MediaHandle,
        dest: &Path,
    ) -> Result<PathBuf, MaterializeError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        match handle {
            MediaHandle::Remote { url } => {
                log::debug!("Downloading {} to {}", url, dest.display());
                if let Err(e) = self.download(url, dest).await {
                    let _ = tokio::fs::remove_file(dest).await;
                    return Err(e);
                }
            }
            MediaHandle::Inline { bytes, .. } => {
                tokio::fs::write(dest, bytes).await?;
            }
        }

        Ok(dest.to_path_buf())
    }
}
