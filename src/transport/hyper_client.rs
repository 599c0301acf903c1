//! Production transport on top of the hyper legacy pooled client
//!
//! - HTTP/1.1 over native-tls
//! - Pooled idle connections shared by every clone
//! - TCP_NODELAY and keepalive on the connector
//! - Per-request timeout covering send and body collection

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::Request;
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use native_tls::TlsConnector;
use std::time::Duration;

use super::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::config::HttpConfig;

/// Pooled HTTPS transport
///
/// Clone is cheap - the underlying HTTP client uses Arc internally.
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    timeout: Duration,
}

impl HyperTransport {
    /// Build the connector and pool from the HTTP settings
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let timeout = config.timeout()?;
        let connect_timeout = config.connect_timeout()?;
        let pool_idle_timeout = config.pool_idle_timeout()?;

        let mut http = HttpConnector::new();
        http.set_nodelay(true);
        http.enforce_http(false);
        http.set_connect_timeout(Some(connect_timeout));
        http.set_keepalive(Some(Duration::from_secs(90)));

        let tls = if config.insecure_tls {
            tracing::warn!("INSECURE TLS MODE ENABLED: Certificate verification is disabled!");
            TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()?
        } else {
            TlsConnector::new()?
        };

        let https = HttpsConnector::from((http, tls.into()));

        let client = HyperClient::builder(TokioExecutor::new())
            .pool_idle_timeout(pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .set_host(true)
            .build(https);

        Ok(Self { client, timeout })
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut req = Request::builder()
            .method(request.method)
            .uri(request.url.as_str());
        for (key, value) in request.headers.iter() {
            req = req.header(key.as_str(), value.as_str());
        }
        let req = req.body(Full::new(request.body))?;

        let response = self.client.request(req).await?;
        let status = response.status();
        let body = response
            .collect()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?
            .to_bytes();

        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        tracing::debug!(method = %request.method, url = %url, "http_request");
        match tokio::time::timeout(self.timeout, self.execute(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                url,
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}
