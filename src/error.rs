use thiserror::Error;

use crate::config::InvalidDuration;
use crate::oss::SignError;
use crate::transport::TransportError;

/// Errors surfaced by every PicWish operation
#[derive(Error, Debug)]
pub enum PicwishError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Non-success HTTP status or vendor status in the response envelope
    #[error("{}", api_message(.http_status, .api_status, .message))]
    Api {
        http_status: u16,
        api_status: Option<i64>,
        message: String,
        /// Bearer token of the session that issued the failing call
        token: String,
    },

    #[error("Malformed source: {0}")]
    MalformedSource(String),

    #[error("Configuration error: {0}")]
    Config(#[from] InvalidDuration),

    #[error("Signing error: {0}")]
    Sign(#[from] SignError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Download of {url} failed with status {status}")]
    Download { url: String, status: u16 },

    #[error("Task {task_id} not ready after {attempts} polls")]
    PollLimit { task_id: String, attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PicwishError>;

impl From<serde_json::Error> for PicwishError {
    fn from(err: serde_json::Error) -> Self {
        PicwishError::InvalidResponse(err.to_string())
    }
}

fn api_message(http_status: &u16, api_status: &Option<i64>, message: &str) -> String {
    match api_status {
        Some(api_status) => format!(
            "status: {}, APIStatus: {}, message: {}",
            http_status, api_status, message
        ),
        None => format!("status: {}, message: {}", http_status, message),
    }
}

impl PicwishError {
    /// Vendor status carried by an API error, if any
    pub fn api_status(&self) -> Option<i64> {
        match self {
            PicwishError::Api { api_status, .. } => *api_status,
            _ => None,
        }
    }

    /// HTTP status carried by an API or download error, if any
    pub fn http_status(&self) -> Option<u16> {
        match self {
            PicwishError::Api { http_status, .. } => Some(*http_status),
            PicwishError::Download { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the service asked us to slow down (HTTP or vendor 429)
    pub fn is_rate_limited(&self) -> bool {
        match self {
            PicwishError::Api {
                http_status,
                api_status,
                ..
            } => *http_status == 429 || *api_status == Some(429),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = PicwishError::Api {
            http_status: 400,
            api_status: Some(4003),
            message: "prompt blocked".to_string(),
            token: "v2,1,482,ab".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "status: 400, APIStatus: 4003, message: prompt blocked"
        );
        assert_eq!(err.api_status(), Some(4003));
        assert_eq!(err.http_status(), Some(400));
        assert!(!err.is_rate_limited());

        let err = PicwishError::Api {
            http_status: 429,
            api_status: None,
            message: "Too Many Requests".to_string(),
            token: String::new(),
        };
        assert_eq!(err.to_string(), "status: 429, message: Too Many Requests");
        assert!(err.is_rate_limited());
    }
}
