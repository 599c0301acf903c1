//! Upload authorization payloads returned by `/authorizations/oss`

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Short-lived STS credential, valid for a single upload
#[derive(Clone, Deserialize)]
pub struct Credential {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

/// Server-side callback OSS invokes once the object is stored
#[derive(Debug, Clone, Deserialize)]
pub struct OssCallback {
    pub url: String,
    pub body: String,
    #[serde(rename = "type")]
    pub body_type: String,
}

/// `data` of the upload authorization envelope
#[derive(Debug, Clone, Deserialize)]
pub struct OssAuthorization {
    /// Accelerated endpoint host, e.g. `oss-accelerate.aliyuncs.com`
    pub accelerate: String,
    pub bucket: String,
    pub callback: OssCallback,
    pub credential: Credential,
    /// Requested filename -> object key
    pub objects: HashMap<String, String>,
}

impl OssAuthorization {
    /// Object key assigned to `filename`, falling back to the only key issued
    pub fn object_key(&self, filename: &str) -> Option<&str> {
        self.objects
            .get(filename)
            .or_else(|| self.objects.values().next())
            .map(String::as_str)
    }
}

/// JSON document carried base64-encoded in `X-Oss-Callback`
#[derive(Debug, Clone, Serialize)]
pub struct CallbackSpec<'a> {
    #[serde(rename = "callbackUrl")]
    pub callback_url: &'a str,
    #[serde(rename = "callbackBody")]
    pub callback_body: &'a str,
    #[serde(rename = "callbackBodyType")]
    pub callback_body_type: &'a str,
}

impl<'a> From<&'a OssCallback> for CallbackSpec<'a> {
    fn from(callback: &'a OssCallback) -> Self {
        Self {
            callback_url: &callback.url,
            callback_body: &callback.body,
            callback_body_type: &callback.body_type,
        }
    }
}

/// Error document returned by OSS on a rejected request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OssErrorDocument {
    pub code: Option<String>,
    pub message: Option<String>,
    pub request_id: Option<String>,
}

impl OssErrorDocument {
    pub fn summary(&self) -> Option<String> {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
            (Some(code), None) => Some(code.clone()),
            (None, Some(message)) => Some(message.clone()),
            (None, None) => None,
        }
    }
}
