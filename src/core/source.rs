use bytes::Bytes;
use image::ImageFormat;
use std::path::{Path, PathBuf};

use crate::error::{PicwishError, Result};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Input image of an operation: a file on disk or an in-memory buffer
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Bytes),
}

/// Upload-ready source: filename, MIME type and content
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSource {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl ImageSource {
    /// Read the source and work out the filename and MIME type to upload with.
    ///
    /// Buffers are sniffed and named `image.{ext}`; paths keep their file
    /// name and take the MIME type from the extension, then the content.
    pub async fn prepare(&self) -> Result<PreparedSource> {
        match self {
            ImageSource::Path(path) => prepare_path(path).await,
            ImageSource::Bytes(bytes) => prepare_bytes(bytes.clone()),
        }
    }
}

async fn prepare_path(path: &Path) -> Result<PreparedSource> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            PicwishError::MalformedSource(format!("{} has no file name", path.display()))
        })?
        .to_string();
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        PicwishError::MalformedSource(format!("cannot read {}: {}", path.display(), e))
    })?;
    let mime_type = ImageFormat::from_path(path)
        .or_else(|_| image::guess_format(&bytes))
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME);
    Ok(PreparedSource {
        filename,
        mime_type: mime_type.to_string(),
        bytes: Bytes::from(bytes),
    })
}

fn prepare_bytes(bytes: Bytes) -> Result<PreparedSource> {
    let format = image::guess_format(&bytes).map_err(|_| {
        PicwishError::MalformedSource("buffer is not a recognizable image".to_string())
    })?;
    let extension = format.extensions_str().first().copied().unwrap_or("bin");
    Ok(PreparedSource {
        filename: format!("image.{}", extension),
        mime_type: format.to_mime_type().to_string(),
        bytes,
    })
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        ImageSource::Path(PathBuf::from(path))
    }
}

impl From<Bytes> for ImageSource {
    fn from(bytes: Bytes) -> Self {
        ImageSource::Bytes(bytes)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(Bytes::from(bytes))
    }
}
