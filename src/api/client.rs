//! Task API client
//!
//! Every call shares one convention:
//! - `Authorization: Bearer {token}` with a per-client session token
//! - `product_id` and `language` query parameters
//! - `{status, message, data}` JSON envelopes, vendor status 0 or 200 on success
//! - Fixed-delay retry while the service answers 429

use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use super::routes::{Route, OSS_AUTHORIZATION_PATH};
use super::types::{ApiResponse, Envelope, ResponseBody, Session};
use crate::config::ClientConfig;
use crate::error::{PicwishError, Result};
use crate::oss::OssAuthorization;
use crate::transport::{HttpRequest, Method, Transport};

/// Tier requested from the image-url endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PicQuality {
    #[default]
    Free,
    Paid,
}

impl PicQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            PicQuality::Free => "free",
            PicQuality::Paid => "paid",
        }
    }
}

/// Backoff behaviour for rate-limited calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before retrying a 429; `None` surfaces it immediately
    pub retry_after: Option<Duration>,
    /// Cap on retries of a single request; `None` retries while throttled
    pub max_retries: Option<u32>,
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Option<Duration> {
        let delay = self.retry_after?;
        match self.max_retries {
            Some(max) if attempt >= max => None,
            _ => Some(delay),
        }
    }
}

/// Bearer session shared by every client built over it
pub type SharedSession = Arc<Mutex<Session>>;

/// Fresh session for the token settings in `config`
pub fn new_session(config: &ClientConfig) -> SharedSession {
    Arc::new(Mutex::new(Session::new(
        &config.api_version,
        config.product_id,
        config.token_rotate_after,
    )))
}

/// Client for one operation's task endpoints
///
/// Built per operation call. The bearer session is either its own or one
/// shared with other clients (see [`TaskClient::with_session`]).
pub struct TaskClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    product_id: u32,
    language: String,
    website: String,
    retry: RetryPolicy,
    route: Route,
    session: SharedSession,
}

impl TaskClient {
    /// Client with a fresh session of its own
    pub fn new(transport: Arc<dyn Transport>, config: &ClientConfig, route: Route) -> Result<Self> {
        Self::with_session(transport, config, route, new_session(config))
    }

    /// Client over an existing session; downloads made through it count
    /// toward that session's token rotation
    pub fn with_session(
        transport: Arc<dyn Transport>,
        config: &ClientConfig,
        route: Route,
        session: SharedSession,
    ) -> Result<Self> {
        Ok(Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            product_id: config.product_id,
            language: config.language.clone(),
            website: config.website.clone(),
            retry: RetryPolicy {
                retry_after: config.retry_after_duration()?,
                max_retries: config.max_rate_limit_retries,
            },
            route,
            session,
        })
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Current bearer token
    pub fn token(&self) -> String {
        self.session().token().to_string()
    }

    fn session(&self) -> std::sync::MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Absolute URL for `path` with the fixed query parameters plus `extra`
    fn url(&self, path: &str, extra: &[(&str, &str)]) -> String {
        let product_id = self.product_id.to_string();
        let mut url = String::with_capacity(self.base_url.len() + path.len() + 64);
        url.push_str(&self.base_url);
        url.push_str(path);
        url.push('?');
        let params = [
            ("product_id", product_id.as_str()),
            ("language", self.language.as_str()),
        ];
        for (i, (k, v)) in params.iter().chain(extra.iter()).enumerate() {
            if i > 0 {
                url.push('&');
            }
            url.push_str(&urlencoding::encode(k));
            url.push('=');
            url.push_str(&urlencoding::encode(v));
        }
        url
    }

    fn authorized(&self, request: HttpRequest) -> HttpRequest {
        request.header("Authorization", format!("Bearer {}", self.token()))
    }

    /// Send `request`, classify the response, and retry while rate limited.
    ///
    /// Success is HTTP 2xx/3xx with a vendor status that is absent, 0 or 200.
    pub async fn request(&self, request: HttpRequest) -> Result<ApiResponse> {
        let mut attempt = 0u32;
        loop {
            debug!(method = %request.method, url = %request.url, attempt, "api_request");
            let response = self.transport.send(request.clone()).await?;
            let http_status = response.status.as_u16();
            let reason = response.reason().to_string();
            let body = ResponseBody::parse(response.body);
            let api_status = body.api_status();

            let http_ok = (200..400).contains(&http_status);
            let api_ok = matches!(api_status, None | Some(0) | Some(200));
            if http_ok && api_ok {
                return Ok(ApiResponse {
                    status: response.status,
                    body,
                });
            }

            let rate_limited = http_status == 429 || api_status == Some(429);
            if rate_limited {
                if let Some(delay) = self.retry.delay_for(attempt) {
                    warn!(
                        url = %request.url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "rate_limited_retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }

            return Err(PicwishError::Api {
                http_status,
                api_status,
                message: body.message().unwrap_or(reason),
                token: self.token(),
            });
        }
    }

    async fn get_envelope(&self, url: String) -> Result<Envelope> {
        let request = self.authorized(HttpRequest::get(url));
        self.request(request).await?.envelope()
    }

    async fn post_envelope(&self, url: String, body: &Value) -> Result<Envelope> {
        let request = self.authorized(HttpRequest::new(Method::POST, url).json(body)?);
        self.request(request).await?.envelope()
    }

    /// Upload credential, bucket and object key for `filename`
    pub async fn oss_authorization(&self, filename: &str) -> Result<OssAuthorization> {
        let url = self.url(OSS_AUTHORIZATION_PATH, &[]);
        let body = serde_json::json!({ "filenames": [filename] });
        let envelope = self.post_envelope(url, &body).await?;
        Ok(serde_json::from_value(envelope.data)?)
    }

    /// Create a task on this client's route.
    ///
    /// `extra` is merged over the base body and wins on key collisions.
    pub async fn create_task(
        &self,
        resource_id: Option<&str>,
        extra: Map<String, Value>,
    ) -> Result<Envelope> {
        let mut body = Map::new();
        body.insert("website".to_string(), Value::from(self.website.as_str()));
        if let Some(resource_id) = resource_id {
            body.insert("source_resource_id".to_string(), Value::from(resource_id));
        }
        body.extend(extra);

        let url = self.url(self.route.task, &[]);
        self.post_envelope(url, &Value::Object(body)).await
    }

    /// Current state of `task_id`
    pub async fn task_result(&self, task_id: &str) -> Result<Envelope> {
        let url = self.url(&self.route.status_path(task_id), &[]);
        self.get_envelope(url).await
    }

    /// Asset URL for `task_id` at the requested tier.
    ///
    /// Counts as one download for token rotation.
    pub async fn image_url(&self, task_id: &str, quality: PicQuality) -> Result<Envelope> {
        let path = self.route.image_url_path(task_id).ok_or_else(|| {
            PicwishError::Unsupported(format!(
                "route {} has no image-url endpoint",
                self.route.task
            ))
        })?;
        let url = self.url(&path, &[("pic_quality", quality.as_str())]);
        let envelope = self.get_envelope(url).await?;
        if self.session().record_download() {
            debug!(route = self.route.task, "session_token_rotated");
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{json, raw, ScriptedTransport};
    use serde_json::json;
    use tokio::time::Instant;

    fn config() -> ClientConfig {
        ClientConfig {
            base_url: "https://api.test/app/picwish".to_string(),
            ..ClientConfig::default()
        }
    }

    fn client(transport: Arc<ScriptedTransport>, config: &ClientConfig) -> TaskClient {
        TaskClient::new(transport, config, Route::ENHANCE).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retries_once_then_succeeds() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::GET,
            "/tasks/login/scale/t1",
            vec![
                json(429, json!({"status": 429, "message": "slow down"})),
                json(200, json!({"status": 200, "data": {"progress": 10}})),
            ],
        ));
        let client = client(transport.clone(), &config());

        let start = Instant::now();
        let envelope = client.task_result("t1").await.unwrap();

        assert_eq!(envelope.field("progress"), &json!(10));
        assert_eq!(transport.calls(Method::GET, "/tasks/login/scale/t1"), 2);
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_rate_limit_without_retry_after_surfaces() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::GET,
            "/tasks/login/scale/t1",
            vec![
                raw(429, b"Too Many Requests"),
                json(200, json!({"status": 200})),
            ],
        ));
        let config = ClientConfig {
            retry_after: None,
            ..config()
        };
        let client = client(transport.clone(), &config);

        let err = client.task_result("t1").await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.http_status(), Some(429));
        assert_eq!(transport.calls(Method::GET, "/tasks"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vendor_429_retries_up_to_cap() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::GET,
            "/tasks/login/scale/t1",
            vec![json(200, json!({"status": 429, "message": "busy"}))],
        ));
        let config = ClientConfig {
            max_rate_limit_retries: Some(3),
            ..config()
        };
        let client = client(transport.clone(), &config);

        let err = client.task_result("t1").await.unwrap_err();
        assert_eq!(err.api_status(), Some(429));
        assert_eq!(transport.calls(Method::GET, "/tasks"), 4);
    }

    #[tokio::test]
    async fn test_vendor_error_carries_statuses() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/tasks/login/scale",
            vec![json(200, json!({"status": 401, "message": "invalid token"}))],
        ));
        let client = client(transport, &config());

        let err = client.create_task(Some("r1"), Map::new()).await.unwrap_err();
        match err {
            PicwishError::Api {
                http_status,
                api_status,
                message,
                token,
            } => {
                assert_eq!(http_status, 200);
                assert_eq!(api_status, Some(401));
                assert_eq!(message, "invalid token");
                assert!(token.starts_with("v2,"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_http_error_without_json_uses_reason() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::GET,
            "/tasks",
            vec![raw(502, b"<html>bad gateway</html>")],
        ));
        let client = client(transport, &config());

        let err = client.task_result("t1").await.unwrap_err();
        assert_eq!(err.to_string(), "status: 502, message: Bad Gateway");
    }

    #[tokio::test]
    async fn test_vendor_status_zero_is_success() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::GET,
            "/tasks",
            vec![json(200, json!({"status": 0, "data": {"progress": 100}}))],
        ));
        let client = client(transport, &config());
        assert!(client.task_result("t1").await.is_ok());
    }

    #[tokio::test]
    async fn test_create_task_body_and_headers() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/tasks/login/scale",
            vec![json(200, json!({"status": 200, "data": {"task_id": "t9"}}))],
        ));
        let client = client(transport.clone(), &config());

        let mut extra = Map::new();
        extra.insert("type".to_string(), json!(2));
        let envelope = client.create_task(Some("res-1"), extra).await.unwrap();
        assert_eq!(envelope.string("task_id").as_deref(), Some("t9"));

        let request = &transport.requests()[0];
        assert_eq!(
            request.url,
            "https://api.test/app/picwish/tasks/login/scale?product_id=482&language=en"
        );
        assert_eq!(
            request.header_value("Authorization"),
            Some(format!("Bearer {}", client.token()).as_str())
        );
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(
            body,
            json!({"website": "en", "source_resource_id": "res-1", "type": 2})
        );
    }

    #[tokio::test]
    async fn test_create_task_without_resource() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/tasks",
            vec![json(200, json!({"status": 200, "data": {"task_id": "t1"}}))],
        ));
        let client = client(transport.clone(), &config());
        client.create_task(None, Map::new()).await.unwrap();

        let body: Value = serde_json::from_slice(&transport.requests()[0].body).unwrap();
        assert_eq!(body, json!({"website": "en"}));
    }

    #[tokio::test]
    async fn test_image_url_query_and_rotation() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::GET,
            "/image-url/scale/t1",
            vec![json(200, json!({"status": 200, "data": {"image": "https://cdn/x.jpg"}}))],
        ));
        let config = ClientConfig {
            token_rotate_after: Some(1),
            ..config()
        };
        let client = client(transport.clone(), &config);
        let before = client.token();

        let envelope = client.image_url("t1", PicQuality::Free).await.unwrap();
        assert_eq!(envelope.string("image").as_deref(), Some("https://cdn/x.jpg"));
        assert!(transport.requests()[0].url.ends_with("&pic_quality=free"));
        assert_ne!(client.token(), before);
    }

    #[tokio::test]
    async fn test_shared_session_counts_downloads_across_clients() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::GET,
            "/image-url/",
            vec![json(200, json!({"status": 200, "data": {"image": "https://cdn/x.jpg"}}))],
        ));
        let config = ClientConfig {
            token_rotate_after: Some(2),
            ..config()
        };
        let session = new_session(&config);
        let first =
            TaskClient::with_session(transport.clone(), &config, Route::ENHANCE, session.clone())
                .unwrap();
        let second =
            TaskClient::with_session(transport.clone(), &config, Route::COLORIZE, session)
                .unwrap();
        let before = first.token();
        assert_eq!(second.token(), before);

        first.image_url("t1", PicQuality::Free).await.unwrap();
        assert_eq!(second.token(), before);
        second.image_url("t2", PicQuality::Free).await.unwrap();
        assert_ne!(first.token(), before);
        assert_eq!(first.token(), second.token());
    }

    #[test]
    fn test_invalid_retry_after_is_error() {
        let config = ClientConfig {
            retry_after: Some(-1.0),
            ..config()
        };
        let result = TaskClient::new(Arc::new(ScriptedTransport::new()), &config, Route::ENHANCE);
        assert!(matches!(result, Err(PicwishError::Config(_))));
    }

    #[tokio::test]
    async fn test_image_url_unsupported_route() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = TaskClient::new(transport, &config(), Route::OCR).unwrap();
        let err = client.image_url("t1", PicQuality::Free).await.unwrap_err();
        assert!(matches!(err, PicwishError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_transport_error_not_retried() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = client(transport.clone(), &config());
        let err = client.task_result("t1").await.unwrap_err();
        assert!(matches!(err, PicwishError::Transport(_)));
        assert_eq!(transport.requests().len(), 1);
    }
}
