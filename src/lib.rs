//! picwish - async client for the PicWish image processing service
//!
//! Uploads sources through signed object-storage PUTs, submits tasks, polls
//! them to completion and hands back result handles that download lazily.

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod oss;
pub mod results;
pub mod task;
pub mod transport;

pub use config::Config;
pub use self::core::{ImageSource, PicWish};
pub use error::{PicwishError, Result};
pub use results::{
    BackgroundRemovedImage, ColorizeResult, EnhancedImage, ExpandedImageResult, OcrResult,
    ProcessedImage, ResultAsset, T2iResult,
};
pub use transport::{HttpRequest, HttpResponse, Transport, TransportError};
