//! HTTP transport used by every PicWish call
//!
//! The protocol layers above only see [`Transport`]: a request goes in, a
//! status plus the fully collected body comes out. Connection pooling, TLS and
//! timeouts live in the implementation ([`HyperTransport`] in production).

pub mod hyper_client;
#[cfg(test)]
pub(crate) mod mock;

pub use hyper::{Method, StatusCode};
pub use hyper_client::HyperTransport;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Network-level failures. Never retried by the API layer.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::http::Error),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Body error: {0}")]
    Body(String),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("Request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("Invalid HTTP settings: {0}")]
    Config(#[from] crate::config::InvalidDuration),
}

impl From<hyper_util::client::legacy::Error> for TransportError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        TransportError::Request(format!("Client error: {}", err))
    }
}

/// An outbound HTTP request with a fully buffered body
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL including the query string
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the JSON body and set the content type
    pub fn json<T: serde::Serialize>(self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .header("content-type", "application/json")
            .body(body))
    }

    /// Case-insensitive header lookup
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A collected HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Reason phrase of the status line, used when the body carries no message
    pub fn reason(&self) -> &str {
        self.status.canonical_reason().unwrap_or("Unknown")
    }
}

/// Sends one HTTP request. Implementations must be safe to share between
/// concurrent operations.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
