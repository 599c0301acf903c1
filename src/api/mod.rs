//! PicWish task API
//!
//! This module provides:
//! - The JSON request convention (auth header, envelopes, 429 retry)
//! - Task creation, status and image-url calls for one route
//! - Route descriptors per operation kind

pub mod client;
pub mod routes;
pub mod types;

pub use client::{new_session, PicQuality, RetryPolicy, SharedSession, TaskClient};
pub use routes::Route;
pub use types::{ApiResponse, Envelope, ResponseBody, Session};
