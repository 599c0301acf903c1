use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// A seconds setting that cannot be turned into a [`Duration`]
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{field} must be a finite, non-negative number of seconds (got {value})")]
pub struct InvalidDuration {
    pub field: &'static str,
    pub value: f64,
}

/// Convert a seconds setting, rejecting negative, NaN and infinite values
pub fn seconds(field: &'static str, value: f64) -> Result<Duration, InvalidDuration> {
    Duration::try_from_secs_f64(value).map_err(|_| InvalidDuration { field, value })
}

/// Service endpoint and task-protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API base URL (default: https://gw.aoscdn.com/app/picwish)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API version embedded in the bearer token
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Product id sent with every call
    #[serde(default = "default_product_id")]
    pub product_id: u32,

    /// Response language sent with every call
    #[serde(default = "default_language")]
    pub language: String,

    /// `website` field of task creation bodies
    #[serde(default = "default_language")]
    pub website: String,

    /// Seconds between task polls
    #[serde(default = "default_sleep_duration")]
    pub sleep_duration: f64,

    /// Seconds to wait before retrying a 429; `null` surfaces 429 immediately
    #[serde(default = "default_retry_after")]
    pub retry_after: Option<f64>,

    /// Cap on consecutive 429 retries of one request (unbounded when unset)
    #[serde(default)]
    pub max_rate_limit_retries: Option<u32>,

    /// Cap on polls of one task (unbounded when unset)
    #[serde(default)]
    pub max_poll_attempts: Option<u32>,

    /// Regenerate the bearer token after this many image-url downloads
    #[serde(default)]
    pub token_rotate_after: Option<u32>,
}

fn default_base_url() -> String {
    "https://gw.aoscdn.com/app/picwish".to_string()
}

fn default_api_version() -> String {
    "v2".to_string()
}

fn default_product_id() -> u32 {
    482
}

fn default_language() -> String {
    "en".to_string()
}

fn default_sleep_duration() -> f64 {
    0.5
}

fn default_retry_after() -> Option<f64> {
    Some(0.5)
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            product_id: default_product_id(),
            language: default_language(),
            website: default_language(),
            sleep_duration: default_sleep_duration(),
            retry_after: default_retry_after(),
            max_rate_limit_retries: None,
            max_poll_attempts: None,
            token_rotate_after: None,
        }
    }
}

impl ClientConfig {
    pub fn sleep_interval(&self) -> Result<Duration, InvalidDuration> {
        seconds("client.sleep_duration", self.sleep_duration)
    }

    pub fn retry_after_duration(&self) -> Result<Option<Duration>, InvalidDuration> {
        self.retry_after
            .map(|s| seconds("client.retry_after", s))
            .transpose()
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds, including body collection
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: f64,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure_tls: bool,

    /// Idle pooled connection timeout in seconds
    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_timeout: f64,

    /// Idle connections kept per host
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,
}

fn default_timeout() -> f64 {
    60.0
}

fn default_connect_timeout() -> f64 {
    10.0
}

fn default_pool_idle_timeout() -> f64 {
    90.0
}

fn default_pool_max_idle_per_host() -> usize {
    32
}

impl HttpConfig {
    pub fn timeout(&self) -> Result<Duration, InvalidDuration> {
        seconds("http.timeout", self.timeout)
    }

    pub fn connect_timeout(&self) -> Result<Duration, InvalidDuration> {
        seconds("http.connect_timeout", self.connect_timeout)
    }

    pub fn pool_idle_timeout(&self) -> Result<Duration, InvalidDuration> {
        seconds("http.pool_idle_timeout", self.pool_idle_timeout)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            insecure_tls: false,
            pool_idle_timeout: default_pool_idle_timeout(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check every seconds setting converts to a [`Duration`]
    pub fn validate(&self) -> Result<(), InvalidDuration> {
        self.client.sleep_interval()?;
        self.client.retry_after_duration()?;
        self.http.connect_timeout()?;
        self.http.pool_idle_timeout()?;
        self.http.timeout()?;
        Ok(())
    }
}

/// Load configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

    let config: Config =
        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;
    config.validate().context("Invalid configuration")?;

    Ok(config)
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {} ({})", name, raw, e)),
        Err(_) => Ok(None),
    }
}

fn is_disabled(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "off" | "none" | "null" | "false" | ""
    )
}

/// Load configuration from environment variables
///
/// Every variable is optional; unset ones keep their defaults:
/// - PICWISH_BASE_URL
/// - PICWISH_SLEEP_DURATION (seconds)
/// - PICWISH_RETRY_AFTER (seconds, or `off` to disable 429 retries)
/// - PICWISH_MAX_RATE_LIMIT_RETRIES
/// - PICWISH_MAX_POLL_ATTEMPTS
/// - PICWISH_TOKEN_ROTATE_AFTER
/// - PICWISH_TIMEOUT (seconds)
/// - PICWISH_INSECURE_TLS (`true`/`1`)
pub fn load_from_env() -> Result<Config> {
    // Try to load .env file if it exists (don't fail if it doesn't)
    let _ = dotenvy::dotenv();

    let mut config = Config::new();

    if let Ok(base_url) = std::env::var("PICWISH_BASE_URL") {
        config.client.base_url = base_url.trim_end_matches('/').to_string();
    }

    if let Some(sleep) = parse_env("PICWISH_SLEEP_DURATION")? {
        config.client.sleep_duration = sleep;
    }

    if let Ok(retry_after) = std::env::var("PICWISH_RETRY_AFTER") {
        config.client.retry_after = if is_disabled(&retry_after) {
            None
        } else {
            Some(retry_after.trim().parse().context("Invalid PICWISH_RETRY_AFTER")?)
        };
    }

    if let Some(max) = parse_env("PICWISH_MAX_RATE_LIMIT_RETRIES")? {
        config.client.max_rate_limit_retries = Some(max);
    }

    if let Some(max) = parse_env("PICWISH_MAX_POLL_ATTEMPTS")? {
        config.client.max_poll_attempts = Some(max);
    }

    if let Some(n) = parse_env("PICWISH_TOKEN_ROTATE_AFTER")? {
        config.client.token_rotate_after = Some(n);
    }

    if let Some(timeout) = parse_env("PICWISH_TIMEOUT")? {
        config.http.timeout = timeout;
    }

    if let Ok(insecure) = std::env::var("PICWISH_INSECURE_TLS") {
        config.http.insecure_tls = insecure == "true" || insecure == "1";
    }

    config
        .validate()
        .context("Invalid configuration from environment")?;

    Ok(config)
}

/// Load configuration from file or environment
///
/// Reads the YAML file when a path is given, environment variables otherwise.
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    match config_path {
        Some(path) => load_from_yaml(path),
        None => load_from_env(),
    }
}
