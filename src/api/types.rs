//! Response envelopes and per-client session state

use bytes::Bytes;
use rand::Rng;
use serde_json::Value;

use crate::error::{PicwishError, Result};
use crate::oss::parse_error_document;
use crate::transport::StatusCode;

/// Body of an API response: JSON when it parses, raw text or bytes otherwise
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Binary(Bytes),
}

impl ResponseBody {
    pub fn parse(body: Bytes) -> Self {
        if let Ok(value) = serde_json::from_slice::<Value>(&body) {
            return ResponseBody::Json(value);
        }
        match std::str::from_utf8(&body) {
            Ok(text) => ResponseBody::Text(text.to_string()),
            Err(_) => ResponseBody::Binary(body),
        }
    }

    /// Vendor `status` field, when the body is a JSON object carrying one
    pub fn api_status(&self) -> Option<i64> {
        match self {
            ResponseBody::Json(value) => json_status(value),
            _ => None,
        }
    }

    /// Human-readable message: JSON `message`, OSS error document, or nothing
    pub fn message(&self) -> Option<String> {
        match self {
            ResponseBody::Json(value) => json_message(value),
            ResponseBody::Text(text) => parse_error_document(text.as_bytes())?.summary(),
            ResponseBody::Binary(_) => None,
        }
    }
}

fn json_status(value: &Value) -> Option<i64> {
    match value.get("status")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn json_message(value: &Value) -> Option<String> {
    match value.get("message")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// A successful response from [`crate::api::TaskClient::request`]
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl ApiResponse {
    /// The JSON envelope; anything else is an invalid response here
    pub fn envelope(self) -> Result<Envelope> {
        match self.body {
            ResponseBody::Json(value) => Ok(Envelope::from_value(value)),
            ResponseBody::Text(text) => Err(PicwishError::InvalidResponse(format!(
                "expected JSON envelope, got text: {}",
                truncate(&text, 200)
            ))),
            ResponseBody::Binary(bytes) => Err(PicwishError::InvalidResponse(format!(
                "expected JSON envelope, got {} binary bytes",
                bytes.len()
            ))),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// `{status, message, data}` envelope shared by every JSON endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub status: Option<i64>,
    pub message: Option<String>,
    pub data: Value,
}

impl Envelope {
    pub fn from_value(mut value: Value) -> Self {
        let status = json_status(&value);
        let message = json_message(&value);
        let data = value
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null);
        Self {
            status,
            message,
            data,
        }
    }

    /// `data.{field}`, or null when absent
    pub fn field(&self, field: &str) -> &Value {
        self.data.get(field).unwrap_or(&Value::Null)
    }

    /// `data.{field}` as a string; numbers are rendered
    pub fn string(&self, field: &str) -> Option<String> {
        match self.data.get(field)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn require_string(&self, field: &str) -> Result<String> {
        self.string(field).ok_or_else(|| {
            PicwishError::InvalidResponse(format!("response data has no `{}` field", field))
        })
    }
}

/// Bearer token plus the download counter that drives its rotation
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    api_version: String,
    product_id: u32,
    downloads: u32,
    rotate_after: Option<u32>,
}

impl Session {
    pub fn new(api_version: &str, product_id: u32, rotate_after: Option<u32>) -> Self {
        Self {
            token: generate_token(api_version, product_id),
            api_version: api_version.to_string(),
            product_id,
            downloads: 0,
            rotate_after,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn downloads(&self) -> u32 {
        self.downloads
    }

    /// Count one clean-asset download; returns true if the token rotated
    pub fn record_download(&mut self) -> bool {
        self.downloads += 1;
        match self.rotate_after {
            Some(limit) if limit > 0 && self.downloads >= limit => {
                self.token = generate_token(&self.api_version, self.product_id);
                self.downloads = 0;
                true
            }
            _ => false,
        }
    }
}

/// `{api_version},{8 random digits},{product_id},{32 random hex}`
pub fn generate_token(api_version: &str, product_id: u32) -> String {
    let mut rng = rand::thread_rng();
    let serial: u32 = rng.gen_range(10_000_000..=99_999_999);
    let nonce: [u8; 16] = rng.gen();
    format!(
        "{},{},{},{}",
        api_version,
        serial,
        product_id,
        hex::encode(nonce)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_parse_fallbacks() {
        assert_eq!(
            ResponseBody::parse(Bytes::from_static(br#"{"status":200}"#)),
            ResponseBody::Json(json!({"status": 200}))
        );
        assert_eq!(
            ResponseBody::parse(Bytes::from_static(b"Bad Gateway")),
            ResponseBody::Text("Bad Gateway".to_string())
        );
        assert_eq!(
            ResponseBody::parse(Bytes::from_static(b"\xff\xfe")),
            ResponseBody::Binary(Bytes::from_static(b"\xff\xfe"))
        );
    }

    #[test]
    fn test_status_and_message() {
        let body = ResponseBody::Json(json!({"status": "4003", "message": "blocked"}));
        assert_eq!(body.api_status(), Some(4003));
        assert_eq!(body.message().as_deref(), Some("blocked"));

        let body = ResponseBody::Text(
            "<Error><Code>AccessDenied</Code><Message>denied</Message></Error>".to_string(),
        );
        assert_eq!(body.api_status(), None);
        assert_eq!(body.message().as_deref(), Some("AccessDenied: denied"));
    }

    #[test]
    fn test_envelope_fields() {
        let envelope = Envelope::from_value(json!({
            "status": 200,
            "message": "success",
            "data": {"task_id": "abc", "progress": 100, "id": 42, "image": ""}
        }));
        assert_eq!(envelope.status, Some(200));
        assert_eq!(envelope.string("task_id").as_deref(), Some("abc"));
        assert_eq!(envelope.string("id").as_deref(), Some("42"));
        assert_eq!(envelope.string("image"), None);
        assert!(envelope.require_string("missing").is_err());
        assert_eq!(envelope.field("progress"), &json!(100));
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token("v2", 482);
        let parts: Vec<&str> = token.split(',').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "v2");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2], "482");
        assert_eq!(parts[3].len(), 32);
        assert!(parts[3].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_session_rotation() {
        let mut session = Session::new("v2", 482, Some(2));
        let first = session.token().to_string();
        assert!(!session.record_download());
        assert_eq!(session.token(), first);
        assert!(session.record_download());
        assert_ne!(session.token(), first);
        assert_eq!(session.downloads(), 0);

        let mut session = Session::new("v2", 482, None);
        let token = session.token().to_string();
        for _ in 0..10 {
            assert!(!session.record_download());
        }
        assert_eq!(session.token(), token);
    }
}
