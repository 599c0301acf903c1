//! High-level operations
//!
//! Every operation runs the same template:
//! 1. Upload the source image (when there is one) and get its resource id
//! 2. Create a task on the operation's route
//! 3. Poll it until the route's completion predicate holds
//! 4. Swap in the watermark-free asset if requested and build the result
//!
//! Each call gets its own [`TaskClient`]. Concurrent operations over one
//! [`PicWish`] share the transport, plus the bearer session when token
//! rotation is configured.

pub mod options;
pub mod source;

pub use options::{
    ColorizeOptions, EnhanceOptions, ExpandOptions, OcrFormat, OcrLanguage, OcrOptions,
    RemoveBackgroundOptions, T2iQuality, T2iSize, T2iTheme, TextToImageRequest,
    PROMPT_BLOCKED_STATUS,
};
pub use source::{ImageSource, PreparedSource};

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{new_session, Envelope, PicQuality, Route, SharedSession, TaskClient};
use crate::config::{ClientConfig, Config};
use crate::error::{PicwishError, Result};
use crate::oss::SignedUpload;
use crate::results::{
    BackgroundRemovedImage, ColorizeResult, EnhancedImage, ExpandedImageResult, OcrResult,
    ResultAsset, T2iResult,
};
use crate::task::Task;
use crate::transport::{HyperTransport, Transport};

/// Entry point of the library
///
/// Cheap to clone; clones share the HTTP connection pool and, with
/// `token_rotate_after` set, the bearer session whose downloads are counted.
#[derive(Clone)]
pub struct PicWish {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
    session: Option<SharedSession>,
}

impl PicWish {
    /// Build a client over a pooled HTTPS transport
    pub fn new(config: Config) -> Result<Self> {
        let transport = HyperTransport::new(&config.http)?;
        Ok(Self::with_transport(Arc::new(transport), config.client))
    }

    /// Build a client over any [`Transport`]
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        let session = config.token_rotate_after.map(|_| new_session(&config));
        Self {
            transport,
            config: Arc::new(config),
            session,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn task_client(&self, route: Route) -> Result<TaskClient> {
        match &self.session {
            Some(session) => TaskClient::with_session(
                self.transport.clone(),
                &self.config,
                route,
                session.clone(),
            ),
            None => TaskClient::new(self.transport.clone(), &self.config, route),
        }
    }

    fn asset(&self, url: String) -> ResultAsset {
        ResultAsset::new(self.transport.clone(), url)
    }

    /// Upload `source` to object storage and return the resource id the
    /// service assigned to it
    pub async fn upload(&self, client: &TaskClient, source: &ImageSource) -> Result<String> {
        let prepared = source.prepare().await?;
        let auth = client.oss_authorization(&prepared.filename).await?;
        let upload = SignedUpload::new(
            &auth,
            &prepared.filename,
            &prepared.mime_type,
            chrono::Utc::now(),
        )?;
        debug!(
            filename = %prepared.filename,
            mime_type = %prepared.mime_type,
            size = prepared.bytes.len(),
            url = %upload.url,
            "source_upload"
        );
        let response = client.request(upload.into_request(prepared.bytes)).await?;
        response.envelope()?.require_string("resource_id")
    }

    /// Create a task and return its id
    async fn submit(
        &self,
        client: &TaskClient,
        resource_id: Option<&str>,
        params: Map<String, Value>,
    ) -> Result<String> {
        let envelope = client.create_task(resource_id, params).await?;
        let task_id = envelope.require_string("task_id")?;
        info!(route = client.route().task, task_id = %task_id, "task_created");
        Ok(task_id)
    }

    async fn wait(&self, task: &Task<'_>) -> Result<Envelope> {
        let interval = self.config.sleep_interval()?;
        task.wait_with_limit(interval, self.config.max_poll_attempts).await
    }

    /// Upload, create and poll: the shared front half of image operations
    async fn run_image_task(
        &self,
        client: &TaskClient,
        source: &ImageSource,
        params: Map<String, Value>,
    ) -> Result<(String, Envelope)> {
        let resource_id = self.upload(client, source).await?;
        let task_id = self.submit(client, Some(&resource_id), params).await?;
        let envelope = self.wait(&Task::new(client, &task_id)).await?;
        Ok((task_id, envelope))
    }

    /// Completion envelope, or the image-url envelope when the watermark is
    /// to be removed. The flag is the resulting watermark state.
    async fn final_envelope(
        &self,
        client: &TaskClient,
        task_id: &str,
        completed: Envelope,
        no_watermark: bool,
    ) -> Result<(Envelope, bool)> {
        if !no_watermark {
            return Ok((completed, true));
        }
        let clean = Task::new(client, task_id).image_url(PicQuality::Free).await?;
        Ok((clean, false))
    }

    pub async fn enhance(
        &self,
        source: impl Into<ImageSource>,
        options: &EnhanceOptions,
    ) -> Result<EnhancedImage> {
        let client = self.task_client(Route::ENHANCE)?;
        let (task_id, completed) = self
            .run_image_task(&client, &source.into(), options.params())
            .await?;
        let (envelope, watermark) = self
            .final_envelope(&client, &task_id, completed, options.no_watermark)
            .await?;
        Ok(EnhancedImage {
            asset: self.asset(envelope.require_string("image")?),
            watermark,
            face_enhanced: options.enhance_face,
        })
    }

    pub async fn remove_background(
        &self,
        source: impl Into<ImageSource>,
        options: &RemoveBackgroundOptions,
    ) -> Result<BackgroundRemovedImage> {
        let client = self.task_client(Route::REMOVE_BACKGROUND)?;
        let (task_id, completed) = self
            .run_image_task(&client, &source.into(), options.params())
            .await?;
        let completed_mask = completed.string("mask");
        let (envelope, watermark) = self
            .final_envelope(&client, &task_id, completed, options.no_watermark)
            .await?;
        Ok(BackgroundRemovedImage {
            asset: self.asset(envelope.require_string("image")?),
            watermark,
            mask_url: envelope.string("mask").or(completed_mask),
        })
    }

    pub async fn ocr(&self, source: impl Into<ImageSource>, options: &OcrOptions) -> Result<OcrResult> {
        let client = self.task_client(Route::OCR)?;
        let (_, envelope) = self
            .run_image_task(&client, &source.into(), options.params())
            .await?;
        Ok(OcrResult {
            asset: self.asset(envelope.require_string("image")?),
            format: options.format,
        })
    }

    pub async fn colorize(
        &self,
        source: impl Into<ImageSource>,
        options: &ColorizeOptions,
    ) -> Result<ColorizeResult> {
        let client = self.task_client(Route::COLORIZE)?;
        let (task_id, completed) = self
            .run_image_task(&client, &source.into(), Map::new())
            .await?;
        let (envelope, watermark) = self
            .final_envelope(&client, &task_id, completed, options.no_watermark)
            .await?;
        Ok(ColorizeResult {
            asset: self.asset(envelope.require_string("image")?),
            watermark,
        })
    }

    /// Generate images from a prompt.
    ///
    /// A prompt reported as blocked restarts the whole create+poll cycle, up
    /// to `request.max_attempts` cycles; the last error is returned after
    /// that. Any other error is returned at once.
    pub async fn text_to_image(&self, request: &TextToImageRequest) -> Result<Vec<T2iResult>> {
        let client = self.task_client(Route::TEXT_TO_IMAGE)?;
        let max_attempts = request.max_attempts.max(1);
        let mut attempt = 1;
        let envelope = loop {
            match self.generate(&client, request).await {
                Ok(envelope) => break envelope,
                Err(err)
                    if err.api_status() == Some(PROMPT_BLOCKED_STATUS)
                        && attempt < max_attempts =>
                {
                    warn!(attempt, max_attempts, error = %err, "prompt_blocked_retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        };
        self.generated_images(&envelope)
    }

    async fn generate(&self, client: &TaskClient, request: &TextToImageRequest) -> Result<Envelope> {
        let task_id = self.submit(client, None, request.params()).await?;
        self.wait(&Task::new(client, &task_id)).await
    }

    fn generated_images(&self, envelope: &Envelope) -> Result<Vec<T2iResult>> {
        let images = envelope.field("images").as_array().ok_or_else(|| {
            PicwishError::InvalidResponse("text-to-image result has no `images` list".to_string())
        })?;
        images
            .iter()
            .map(|image| -> Result<T2iResult> {
                let url = value_string(image, "url")
                    .or_else(|| value_string(image, "image"))
                    .ok_or_else(|| {
                        PicwishError::InvalidResponse("generated image has no url".to_string())
                    })?;
                Ok(T2iResult {
                    asset: self.asset(url),
                    id: value_string(image, "id").unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Outpaint the source; returns `image_count` variants in order
    pub async fn expand(
        &self,
        source: impl Into<ImageSource>,
        options: &ExpandOptions,
    ) -> Result<Vec<ExpandedImageResult>> {
        if options.image_count == 0 {
            return Err(PicwishError::Unsupported(
                "expand needs an image_count of at least 1".to_string(),
            ));
        }
        let client = self.task_client(Route::EXPAND)?;
        let (task_id, completed) = self
            .run_image_task(&client, &source.into(), options.params())
            .await?;
        let (envelope, watermark) = self
            .final_envelope(&client, &task_id, completed, options.no_watermark)
            .await?;
        (1..=options.image_count)
            .map(|index| -> Result<ExpandedImageResult> {
                Ok(ExpandedImageResult {
                    asset: self.asset(envelope.require_string(&format!("image{}", index))?),
                    watermark,
                    index,
                })
            })
            .collect()
    }
}

fn value_string(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{json, raw, ScriptedTransport};
    use crate::transport::Method;
    use serde_json::json;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR-body";

    fn config() -> ClientConfig {
        ClientConfig {
            base_url: "https://api.test/app/picwish".to_string(),
            ..ClientConfig::default()
        }
    }

    fn authorization() -> Vec<crate::transport::HttpResponse> {
        vec![json(
            200,
            json!({
                "status": 200,
                "data": {
                    "accelerate": "oss-accelerate.aliyuncs.com",
                    "bucket": "picwish-bucket",
                    "callback": {"url": "https://cb.test/oss", "body": "x={x}", "type": "application/json"},
                    "credential": {"access_key_id": "AK", "access_key_secret": "SK", "security_token": "ST"},
                    "objects": {"image.png": "tmp/2026/image.png"}
                }
            }),
        )]
    }

    /// Authorization and upload legs for a sniffed `image.png`
    fn with_upload(transport: ScriptedTransport) -> ScriptedTransport {
        transport
            .on(Method::POST, "/authorizations/oss", authorization())
            .on(
                Method::PUT,
                "picwish-bucket.oss-accelerate.aliyuncs.com",
                vec![json(200, json!({"status": 200, "data": {"resource_id": "res-1"}}))],
            )
    }

    fn created(task_id: &str) -> Vec<crate::transport::HttpResponse> {
        vec![json(200, json!({"status": 200, "data": {"task_id": task_id}}))]
    }

    fn picwish(transport: &Arc<ScriptedTransport>) -> PicWish {
        PicWish::with_transport(transport.clone(), config())
    }

    fn body(request: &crate::transport::HttpRequest) -> Value {
        serde_json::from_slice(&request.body).unwrap()
    }

    #[tokio::test]
    async fn test_enhance_full_flow_without_watermark() {
        let transport = Arc::new(
            with_upload(ScriptedTransport::new())
                .on(Method::POST, "/tasks/login/scale", created("t1"))
                .on(
                    Method::GET,
                    "/tasks/login/scale/t1",
                    vec![json(200, json!({"status": 200, "data": {"progress": 100, "image": "https://cdn.test/wm.jpg"}}))],
                )
                .on(
                    Method::GET,
                    "/image-url/scale/t1",
                    vec![json(200, json!({"status": 200, "data": {"image": "https://cdn.test/clean.jpg"}}))],
                ),
        );

        let image = picwish(&transport)
            .enhance(PNG.to_vec(), &EnhanceOptions::default())
            .await
            .unwrap();
        assert_eq!(image.url(), "https://cdn.test/clean.jpg");
        assert!(!image.watermark);
        assert!(image.face_enhanced);

        let requests = transport.requests();
        let auth = requests.iter().find(|r| r.url.contains("/authorizations/oss")).unwrap();
        assert_eq!(body(auth), json!({"filenames": ["image.png"]}));

        let put = requests.iter().find(|r| r.method == Method::PUT).unwrap();
        assert_eq!(
            put.url,
            "https://picwish-bucket.oss-accelerate.aliyuncs.com/tmp/2026/image.png"
        );
        assert_eq!(put.body.as_ref(), PNG);
        assert_eq!(put.header_value("Content-Type"), Some("image/png"));
        assert_eq!(put.header_value("X-Oss-Security-Token"), Some("ST"));
        assert!(put.header_value("Authorization").unwrap().starts_with("OSS AK:"));

        let create = requests
            .iter()
            .find(|r| r.method == Method::POST && r.url.contains("/tasks/login/scale"))
            .unwrap();
        assert_eq!(
            body(create),
            json!({"website": "en", "source_resource_id": "res-1", "type": 2})
        );
        assert!(requests.last().unwrap().url.ends_with("pic_quality=free"));
    }

    #[tokio::test]
    async fn test_enhance_keeping_watermark_skips_image_url() {
        let transport = Arc::new(
            with_upload(ScriptedTransport::new())
                .on(Method::POST, "/tasks/login/scale", created("t1"))
                .on(
                    Method::GET,
                    "/tasks/login/scale/t1",
                    vec![json(200, json!({"status": 200, "data": {"progress": 100, "image": "https://cdn.test/wm.jpg"}}))],
                ),
        );
        let options = EnhanceOptions {
            no_watermark: false,
            enhance_face: false,
        };
        let image = picwish(&transport).enhance(PNG.to_vec(), &options).await.unwrap();
        assert_eq!(image.url(), "https://cdn.test/wm.jpg");
        assert!(image.watermark);
        assert!(!image.face_enhanced);
        assert_eq!(transport.calls(Method::GET, "/image-url/"), 0);
    }

    #[tokio::test]
    async fn test_remove_background_reads_mask() {
        let transport = Arc::new(
            with_upload(ScriptedTransport::new())
                .on(Method::POST, "/tasks/login/segmentation", created("t2"))
                .on(
                    Method::GET,
                    "/tasks/login/segmentation/t2",
                    vec![json(200, json!({"status": 200, "data": {"progress": 100, "image": "https://cdn.test/wm.png"}}))],
                )
                .on(
                    Method::GET,
                    "/image-url/segmentation/t2",
                    vec![json(200, json!({"status": 200, "data": {"image": "https://cdn.test/cut.png", "mask": "https://cdn.test/mask.png"}}))],
                ),
        );
        let image = picwish(&transport)
            .remove_background(PNG.to_vec(), &RemoveBackgroundOptions::default())
            .await
            .unwrap();
        assert_eq!(image.url(), "https://cdn.test/cut.png");
        assert_eq!(image.mask_url.as_deref(), Some("https://cdn.test/mask.png"));

        let create = &transport.requests()[2];
        assert_eq!(body(create)["output_type"], json!(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ocr_waits_for_image_field() {
        let transport = Arc::new(
            with_upload(ScriptedTransport::new())
                .on(Method::POST, "/tasks/login/document/ocr", created("t3"))
                .on(
                    Method::GET,
                    "/document/ocr/t3",
                    vec![
                        json(200, json!({"status": 200, "data": {"progress": 100, "image": ""}})),
                        json(200, json!({"status": 200, "data": {"image": "https://cdn.test/text.txt"}})),
                    ],
                )
                .on(Method::GET, "cdn.test/text.txt", vec![raw(200, b"hello\xff world")]),
        );
        let result = picwish(&transport)
            .ocr(PNG.to_vec(), &OcrOptions::default())
            .await
            .unwrap();
        assert_eq!(result.format, OcrFormat::Txt);
        assert_eq!(result.text().await.unwrap(), "hello world");
        assert_eq!(transport.calls(Method::GET, "/document/ocr/t3"), 2);

        let create = &transport.requests()[2];
        assert_eq!(
            body(create)["task_language"],
            json!("ChinesePRC,English,Digits")
        );
    }

    fn t2i_done() -> Vec<crate::transport::HttpResponse> {
        vec![json(
            200,
            json!({"status": 200, "data": {"images": [
                {"id": "g1", "url": "https://cdn.test/g1.jpg"},
                {"id": 7, "url": "https://cdn.test/g2.jpg"}
            ]}}),
        )]
    }

    fn blocked() -> crate::transport::HttpResponse {
        json(200, json!({"status": PROMPT_BLOCKED_STATUS, "message": "prompt blocked"}))
    }

    #[tokio::test]
    async fn test_text_to_image_retries_blocked_prompt() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(
                    Method::POST,
                    "/tasks/login/text-to-image",
                    vec![
                        blocked(),
                        blocked(),
                        json(200, json!({"status": 200, "data": {"task_id": "t4"}})),
                    ],
                )
                .on(Method::GET, "/text-to-image/t4", t2i_done()),
        );
        let request = TextToImageRequest::new("A cat");
        let results = picwish(&transport).text_to_image(&request).await.unwrap();

        assert_eq!(transport.calls(Method::POST, "/text-to-image"), 3);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "g1");
        assert_eq!(results[1].id, "7");
        assert_eq!(results[1].url(), "https://cdn.test/g2.jpg");
        assert_eq!(transport.calls(Method::POST, "/authorizations/oss"), 0);

        let create = body(&transport.requests()[0]);
        assert_eq!(create["prompt"], json!("A cat"));
        assert!(create.get("source_resource_id").is_none());
    }

    #[tokio::test]
    async fn test_text_to_image_retries_prompt_blocked_while_polling() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(Method::POST, "/tasks/login/text-to-image", created("t7"))
                .on(
                    Method::GET,
                    "/text-to-image/t7",
                    vec![blocked(), t2i_done().remove(0)],
                ),
        );
        let results = picwish(&transport)
            .text_to_image(&TextToImageRequest::new("A cat"))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(transport.calls(Method::POST, "/text-to-image"), 2);
        assert_eq!(transport.calls(Method::GET, "/text-to-image/t7"), 2);
    }

    #[tokio::test]
    async fn test_text_to_image_gives_up_after_max_attempts() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/tasks/login/text-to-image",
            vec![blocked()],
        ));
        let mut request = TextToImageRequest::new("A cat");
        request.max_attempts = 2;
        let err = picwish(&transport).text_to_image(&request).await.unwrap_err();

        assert_eq!(err.api_status(), Some(PROMPT_BLOCKED_STATUS));
        assert_eq!(transport.calls(Method::POST, "/text-to-image"), 2);
    }

    #[tokio::test]
    async fn test_text_to_image_other_errors_surface_immediately() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/tasks/login/text-to-image",
            vec![json(200, json!({"status": 500, "message": "internal"}))],
        ));
        let err = picwish(&transport)
            .text_to_image(&TextToImageRequest::new("A cat"))
            .await
            .unwrap_err();
        assert_eq!(err.api_status(), Some(500));
        assert_eq!(transport.calls(Method::POST, "/text-to-image"), 1);
    }

    #[tokio::test]
    async fn test_expand_reads_numbered_fields() {
        let transport = Arc::new(
            with_upload(ScriptedTransport::new())
                .on(Method::POST, "/tasks/login/image-expand", created("t5"))
                .on(
                    Method::GET,
                    "/tasks/login/image-expand/t5",
                    vec![json(200, json!({"status": 200, "data": {"image1": "https://cdn.test/a.jpg"}}))],
                )
                .on(
                    Method::GET,
                    "/image-url/image-expand/t5",
                    vec![json(200, json!({"status": 200, "data": {
                        "image1": "https://cdn.test/clean1.jpg",
                        "image2": "https://cdn.test/clean2.jpg"
                    }}))],
                ),
        );
        let options = ExpandOptions {
            image_count: 2,
            ..ExpandOptions::default()
        };
        let results = picwish(&transport).expand(PNG.to_vec(), &options).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 1);
        assert_eq!(results[1].url(), "https://cdn.test/clean2.jpg");
        assert!(results.iter().all(|r| !r.watermark));
    }

    #[tokio::test]
    async fn test_expand_rejects_zero_images_before_upload() {
        let transport = Arc::new(with_upload(ScriptedTransport::new()));
        let options = ExpandOptions {
            image_count: 0,
            ..ExpandOptions::default()
        };
        let err = picwish(&transport)
            .expand(PNG.to_vec(), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, PicwishError::Unsupported(_)));
        assert!(transport.requests().is_empty());
    }

    fn enhance_script() -> ScriptedTransport {
        with_upload(ScriptedTransport::new())
            .on(Method::POST, "/tasks/login/scale", created("t1"))
            .on(
                Method::GET,
                "/tasks/login/scale/t1",
                vec![json(200, json!({"status": 200, "data": {"progress": 100, "image": "https://cdn.test/wm.jpg"}}))],
            )
            .on(
                Method::GET,
                "/image-url/scale/t1",
                vec![json(200, json!({"status": 200, "data": {"image": "https://cdn.test/clean.jpg"}}))],
            )
    }

    /// Bearer sent with each task creation, in order
    fn create_bearers(transport: &ScriptedTransport) -> Vec<String> {
        transport
            .requests()
            .iter()
            .filter(|r| r.method == Method::POST && r.url.contains("/tasks/login/scale"))
            .map(|r| r.header_value("Authorization").unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_token_rotates_across_operations() {
        let transport = Arc::new(enhance_script());
        let config = ClientConfig {
            token_rotate_after: Some(2),
            ..config()
        };
        let picwish = PicWish::with_transport(transport.clone(), config);
        for _ in 0..3 {
            picwish
                .enhance(PNG.to_vec(), &EnhanceOptions::default())
                .await
                .unwrap();
        }

        let bearers = create_bearers(&transport);
        assert_eq!(bearers.len(), 3);
        assert_eq!(bearers[0], bearers[1]);
        assert_ne!(bearers[2], bearers[1]);
    }

    #[tokio::test]
    async fn test_session_per_operation_without_rotation() {
        let transport = Arc::new(enhance_script());
        let picwish = picwish(&transport);
        for _ in 0..2 {
            picwish
                .enhance(PNG.to_vec(), &EnhanceOptions::default())
                .await
                .unwrap();
        }

        let bearers = create_bearers(&transport);
        assert_ne!(bearers[0], bearers[1]);
    }

    #[tokio::test]
    async fn test_invalid_sleep_duration_is_error() {
        let transport = Arc::new(
            with_upload(ScriptedTransport::new())
                .on(Method::POST, "/tasks/login/scale", created("t1")),
        );
        let config = ClientConfig {
            sleep_duration: f64::INFINITY,
            ..config()
        };
        let err = PicWish::with_transport(transport, config)
            .enhance(PNG.to_vec(), &EnhanceOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PicwishError::Config(_)));
    }

    #[tokio::test]
    async fn test_colorize_sends_no_extra_params() {
        let transport = Arc::new(
            with_upload(ScriptedTransport::new())
                .on(Method::POST, "/tasks/login/colorization", created("t6"))
                .on(
                    Method::GET,
                    "/tasks/login/colorization/t6",
                    vec![json(200, json!({"status": 200, "data": {"image": "https://cdn.test/c.jpg"}}))],
                ),
        );
        let options = ColorizeOptions { no_watermark: false };
        let result = picwish(&transport)
            .colorize(PNG.to_vec(), &options)
            .await
            .unwrap();
        assert_eq!(result.url(), "https://cdn.test/c.jpg");
        assert!(result.watermark);
        assert_eq!(
            body(&transport.requests()[2]),
            json!({"website": "en", "source_resource_id": "res-1"})
        );
    }

    #[tokio::test]
    async fn test_malformed_source_fails_before_network() {
        let transport = Arc::new(ScriptedTransport::new());
        let err = picwish(&transport)
            .enhance(b"not an image".to_vec(), &EnhanceOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PicwishError::MalformedSource(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_oss_rejection_carries_xml_message() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(Method::POST, "/authorizations/oss", authorization())
                .on(
                    Method::PUT,
                    "picwish-bucket",
                    vec![raw(
                        403,
                        b"<?xml version=\"1.0\"?><Error><Code>SignatureDoesNotMatch</Code><Message>bad signature</Message></Error>",
                    )],
                ),
        );
        let err = picwish(&transport)
            .enhance(PNG.to_vec(), &EnhanceOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), Some(403));
        assert!(err.to_string().contains("SignatureDoesNotMatch: bad signature"));
    }
}
