//! Object storage upload leg
//!
//! This module provides:
//! - OSS header signing (HMAC-SHA1, base64) for single PUT uploads
//! - Upload authorization payload types
//! - Signed upload request construction and OSS error parsing

pub mod signer;
pub mod types;
pub mod upload;

pub use signer::{OssSigner, SignError, SignRequest};
pub use types::{Credential, OssAuthorization, OssCallback, OssErrorDocument};
pub use upload::{parse_error_document, SignedUpload};
