//! OSS header signature (HMAC-SHA1) for signed uploads
//!
//! String to sign:
//!
//! ```text
//! VERB \n Content-MD5 \n Content-Type \n Date \n CanonicalizedOSSHeaders \n CanonicalizedResource
//! ```
//!
//! `CanonicalizedOSSHeaders` is every `x-oss-*` header, lower-cased and sorted by
//! name. Sub-resources are appended to the resource in the order given, without
//! sorting, to reproduce the signatures the service expects.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::BTreeMap;
use thiserror::Error;

use super::types::Credential;

type HmacSha1 = Hmac<Sha1>;

const OSS_HEADER_PREFIX: &str = "x-oss-";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignError {
    #[error("required header missing from sign request: {0}")]
    MissingHeader(&'static str),
}

/// Input of one signature computation
#[derive(Debug, Clone)]
pub struct SignRequest {
    pub verb: String,
    pub content_md5: String,
    pub headers: Vec<(String, String)>,
    pub bucket: String,
    pub object: String,
    /// Query sub-resources, kept in insertion order
    pub sub_resources: Vec<(String, String)>,
}

impl SignRequest {
    /// A `PUT` of `object` into `bucket` with an empty Content-MD5
    pub fn put(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            verb: "PUT".to_string(),
            content_md5: String::new(),
            headers: Vec::new(),
            bucket: bucket.into(),
            object: object.into(),
            sub_resources: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn sub_resource(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.sub_resources.push((key.into(), value.into()));
        self
    }

    fn required_header(&self, name: &'static str) -> Result<&str, SignError> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .ok_or(SignError::MissingHeader(name))
    }

    /// `x-oss-*` headers as sorted `name:value` lines joined by `\n`
    pub fn canonicalized_headers(&self) -> String {
        let lowered: BTreeMap<String, &str> = self
            .headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.as_str()))
            .filter(|(k, _)| k.starts_with(OSS_HEADER_PREFIX))
            .collect();

        let mut result = String::with_capacity(lowered.len() * 64);
        for (i, (k, v)) in lowered.iter().enumerate() {
            if i > 0 {
                result.push('\n');
            }
            result.push_str(k);
            result.push(':');
            result.push_str(v);
        }
        result
    }

    /// `/bucket/object[?k=v&...]`
    pub fn canonicalized_resource(&self) -> String {
        let mut resource = String::with_capacity(self.bucket.len() + self.object.len() + 2);
        if !self.bucket.is_empty() {
            resource.push('/');
            resource.push_str(&self.bucket);
        }
        if !self.object.is_empty() {
            resource.push('/');
            resource.push_str(&self.object);
        }
        if !self.sub_resources.is_empty() {
            let query = self
                .sub_resources
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            resource.push('?');
            resource.push_str(&query);
        }
        resource
    }

    pub fn string_to_sign(&self) -> Result<String, SignError> {
        let content_type = self.required_header("Content-Type")?;
        let date = self.required_header("X-Oss-Date")?;
        let headers = self.canonicalized_headers();
        let resource = self.canonicalized_resource();
        Ok([
            self.verb.as_str(),
            self.content_md5.as_str(),
            content_type,
            date,
            headers.as_str(),
            resource.as_str(),
        ]
        .join("\n"))
    }
}

/// Signs requests with one short-lived upload credential
#[derive(Clone)]
pub struct OssSigner {
    access_key_id: String,
    access_key_secret: String,
}

impl std::fmt::Debug for OssSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssSigner")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

impl OssSigner {
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
        }
    }

    pub fn from_credential(credential: &Credential) -> Self {
        Self::new(
            credential.access_key_id.clone(),
            credential.access_key_secret.clone(),
        )
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Base64 HMAC-SHA1 of the string to sign
    pub fn signature(&self, request: &SignRequest) -> Result<String, SignError> {
        let string_to_sign = request.string_to_sign()?;
        Ok(STANDARD.encode(self.hmac_sha1(string_to_sign.as_bytes())))
    }

    /// Value of the `Authorization` header: `OSS {access_key_id}:{signature}`
    pub fn authorization(&self, request: &SignRequest) -> Result<String, SignError> {
        Ok(format!(
            "OSS {}:{}",
            self.access_key_id,
            self.signature(request)?
        ))
    }

    fn hmac_sha1(&self, msg: &[u8]) -> [u8; 20] {
        let mut mac = HmacSha1::new_from_slice(self.access_key_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(msg);
        let result = mac.finalize().into_bytes();
        let mut output = [0u8; 20];
        output.copy_from_slice(&result);
        output
    }
}
