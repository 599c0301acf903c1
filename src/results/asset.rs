use bytes::Bytes;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{PicwishError, Result};
use crate::transport::{HttpRequest, Transport};

/// Remote output of a finished task
///
/// The first [`ResultAsset::bytes`] call downloads the URL; later calls, even
/// concurrent ones, reuse that download until [`ResultAsset::invalidate`].
pub struct ResultAsset {
    url: String,
    transport: Arc<dyn Transport>,
    cache: OnceCell<Bytes>,
}

impl ResultAsset {
    pub fn new(transport: Arc<dyn Transport>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            transport,
            cache: OnceCell::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_cached(&self) -> bool {
        self.cache.initialized()
    }

    /// Output bytes, fetched at most once
    pub async fn bytes(&self) -> Result<Bytes> {
        let bytes = self.cache.get_or_try_init(|| self.fetch()).await?;
        Ok(bytes.clone())
    }

    /// Write the output bytes to `path`
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.bytes().await?;
        tokio::fs::write(path.as_ref(), &bytes).await?;
        debug!(url = %self.url, path = %path.as_ref().display(), size = bytes.len(), "result_saved");
        Ok(())
    }

    /// Drop the cached bytes so the next read downloads again
    pub fn invalidate(&mut self) {
        self.cache.take();
    }

    async fn fetch(&self) -> Result<Bytes> {
        debug!(url = %self.url, "result_download");
        let response = self.transport.send(HttpRequest::get(self.url.as_str())).await?;
        if !response.status.is_success() {
            return Err(PicwishError::Download {
                url: self.url.clone(),
                status: response.status.as_u16(),
            });
        }
        Ok(response.body)
    }
}

impl fmt::Debug for ResultAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultAsset")
            .field("url", &self.url)
            .field("cached", &self.is_cached())
            .finish()
    }
}
