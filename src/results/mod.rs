//! Typed handles over finished task outputs
//!
//! Every result wraps a [`ResultAsset`] (URL plus lazily fetched bytes) and
//! adds the fields of its operation. [`ProcessedImage`] unifies them.

pub mod asset;

pub use asset::ResultAsset;

use bytes::Bytes;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use crate::core::options::OcrFormat;
use crate::error::Result;

macro_rules! asset_handle {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl Deref for $ty {
                type Target = ResultAsset;

                fn deref(&self) -> &ResultAsset {
                    &self.asset
                }
            }

            impl DerefMut for $ty {
                fn deref_mut(&mut self) -> &mut ResultAsset {
                    &mut self.asset
                }
            }
        )+
    };
}

#[derive(Debug)]
pub struct EnhancedImage {
    pub asset: ResultAsset,
    pub watermark: bool,
    pub face_enhanced: bool,
}

#[derive(Debug)]
pub struct BackgroundRemovedImage {
    pub asset: ResultAsset,
    pub watermark: bool,
    /// URL of the segmentation mask, when the service returned one
    pub mask_url: Option<String>,
}

#[derive(Debug)]
pub struct OcrResult {
    pub asset: ResultAsset,
    pub format: OcrFormat,
}

impl OcrResult {
    /// Recognized text as UTF-8; invalid byte sequences are dropped
    pub async fn text(&self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(decode_text(&bytes))
    }
}

/// One generated image of a text-to-image task
#[derive(Debug)]
pub struct T2iResult {
    pub asset: ResultAsset,
    pub id: String,
}

#[derive(Debug)]
pub struct ColorizeResult {
    pub asset: ResultAsset,
    pub watermark: bool,
}

/// One variant of an expand task, numbered from 1
#[derive(Debug)]
pub struct ExpandedImageResult {
    pub asset: ResultAsset,
    pub watermark: bool,
    pub index: u32,
}

asset_handle!(
    EnhancedImage,
    BackgroundRemovedImage,
    OcrResult,
    T2iResult,
    ColorizeResult,
    ExpandedImageResult,
);

fn decode_text(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Any operation's result
#[derive(Debug)]
pub enum ProcessedImage {
    Enhanced(EnhancedImage),
    BackgroundRemoved(BackgroundRemovedImage),
    Ocr(OcrResult),
    TextToImage(T2iResult),
    Colorized(ColorizeResult),
    Expanded(ExpandedImageResult),
}

impl ProcessedImage {
    pub fn asset(&self) -> &ResultAsset {
        match self {
            ProcessedImage::Enhanced(r) => &r.asset,
            ProcessedImage::BackgroundRemoved(r) => &r.asset,
            ProcessedImage::Ocr(r) => &r.asset,
            ProcessedImage::TextToImage(r) => &r.asset,
            ProcessedImage::Colorized(r) => &r.asset,
            ProcessedImage::Expanded(r) => &r.asset,
        }
    }

    pub fn url(&self) -> &str {
        self.asset().url()
    }

    /// Watermark flag; `None` for outputs that never carry one
    pub fn watermark(&self) -> Option<bool> {
        match self {
            ProcessedImage::Enhanced(r) => Some(r.watermark),
            ProcessedImage::BackgroundRemoved(r) => Some(r.watermark),
            ProcessedImage::Colorized(r) => Some(r.watermark),
            ProcessedImage::Expanded(r) => Some(r.watermark),
            ProcessedImage::Ocr(_) | ProcessedImage::TextToImage(_) => None,
        }
    }

    pub async fn bytes(&self) -> Result<Bytes> {
        self.asset().bytes().await
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.asset().save(path).await
    }
}

macro_rules! processed_from {
    ($($variant:ident($ty:ident)),+ $(,)?) => {
        $(
            impl From<$ty> for ProcessedImage {
                fn from(result: $ty) -> Self {
                    ProcessedImage::$variant(result)
                }
            }
        )+
    };
}

processed_from!(
    Enhanced(EnhancedImage),
    BackgroundRemoved(BackgroundRemovedImage),
    Ocr(OcrResult),
    TextToImage(T2iResult),
    Colorized(ColorizeResult),
    Expanded(ExpandedImageResult),
);
