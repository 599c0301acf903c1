//! Signed PUT construction for the upload leg

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use super::signer::{OssSigner, SignRequest};
use super::types::{CallbackSpec, OssAuthorization, OssErrorDocument};
use crate::error::{PicwishError, Result};
use crate::transport::{HttpRequest, Method};

/// RFC 1123 date as OSS expects it in `X-Oss-Date`
const GMT_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// A ready-to-send signed upload
#[derive(Debug, Clone)]
pub struct SignedUpload {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl SignedUpload {
    /// Sign a PUT of `filename` using the credential from `auth`.
    ///
    /// The credential is consumed here; nothing about it outlives the request.
    /// `auth` must list an object key, since OSS only accepts the keys it issued.
    pub fn new(
        auth: &OssAuthorization,
        filename: &str,
        mimetype: &str,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let object = auth.object_key(filename).ok_or_else(|| {
            PicwishError::InvalidResponse(format!(
                "upload authorization has no object key for {}",
                filename
            ))
        })?;
        let date = now.format(GMT_FORMAT).to_string();
        let callback = callback_header(auth);

        let headers = vec![
            ("X-Oss-Date".to_string(), date),
            (
                "X-Oss-Security-Token".to_string(),
                auth.credential.security_token.clone(),
            ),
            ("Content-Type".to_string(), mimetype.to_string()),
            ("X-Oss-Callback".to_string(), callback),
        ];

        let sign_request = SignRequest {
            headers,
            ..SignRequest::put(auth.bucket.clone(), object)
        };
        let authorization = OssSigner::from_credential(&auth.credential).authorization(&sign_request)?;

        let mut headers = sign_request.headers;
        headers.push(("Authorization".to_string(), authorization));

        Ok(Self {
            url: format!("https://{}.{}/{}", auth.bucket, auth.accelerate, object),
            headers,
        })
    }

    pub fn into_request(self, body: Bytes) -> HttpRequest {
        HttpRequest {
            method: Method::PUT,
            url: self.url,
            headers: self.headers,
            body,
        }
    }
}

fn callback_header(auth: &OssAuthorization) -> String {
    let spec = CallbackSpec::from(&auth.callback);
    // Serializing three borrowed strings cannot fail
    let json = serde_json::to_vec(&spec).unwrap_or_default();
    STANDARD.encode(json)
}

/// Extract Code/Message/RequestId from an OSS XML error body
pub fn parse_error_document(xml_data: &[u8]) -> Option<OssErrorDocument> {
    let mut reader = Reader::from_reader(xml_data);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut document = OssErrorDocument::default();
    let mut current_text = String::new();
    let mut seen_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"Error" {
                    seen_root = true;
                }
            }
            Ok(Event::Text(e)) => {
                current_text.clear();
                current_text.push_str(&e.unescape().ok()?);
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"Code" => document.code = Some(std::mem::take(&mut current_text)),
                    b"Message" => document.message = Some(std::mem::take(&mut current_text)),
                    b"RequestId" => {
                        document.request_id = Some(std::mem::take(&mut current_text))
                    }
                    _ => {}
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
    }

    seen_root.then_some(document)
}
