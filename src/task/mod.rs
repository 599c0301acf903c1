//! Server-side task handle and polling
//!
//! A task moves `created -> polling -> ready`; failures surface from the
//! underlying [`TaskClient`] call and end the wait. Polling sleeps between
//! attempts and is unbounded unless a cap is given; dropping the future is
//! the cancellation path.

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::api::{Envelope, PicQuality, TaskClient};
use crate::error::{PicwishError, Result};

/// When a status envelope counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// `data.progress` reached 100
    Progress,
    /// `data.{field}` is present and non-empty
    Field(&'static str),
}

impl Completion {
    pub fn is_complete(&self, envelope: &Envelope) -> bool {
        match self {
            Completion::Progress => envelope
                .field("progress")
                .as_f64()
                .is_some_and(|p| p >= 100.0),
            Completion::Field(name) => is_present(envelope.field(name)),
        }
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => true,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// One remote job, bound to the client that created it
#[derive(Clone, Copy)]
pub struct Task<'a> {
    client: &'a TaskClient,
    id: &'a str,
}

impl<'a> Task<'a> {
    pub fn new(client: &'a TaskClient, id: &'a str) -> Self {
        Self { client, id }
    }

    pub fn id(&self) -> &str {
        self.id
    }

    /// Single status poll
    pub async fn result(&self) -> Result<Envelope> {
        self.client.task_result(self.id).await
    }

    /// Poll until the route's completion predicate holds, sleeping `interval`
    /// between polls.
    pub async fn wait(&self, interval: Duration) -> Result<Envelope> {
        self.wait_with_limit(interval, None).await
    }

    /// Like [`Task::wait`], giving up with [`PicwishError::PollLimit`] after
    /// `max_attempts` polls.
    pub async fn wait_with_limit(
        &self,
        interval: Duration,
        max_attempts: Option<u32>,
    ) -> Result<Envelope> {
        let completion = self.client.route().completion;
        let mut attempts = 0u32;
        loop {
            let envelope = self.result().await?;
            attempts += 1;
            if completion.is_complete(&envelope) {
                info!(task_id = %self.id, attempts, "task_ready");
                return Ok(envelope);
            }
            debug!(
                task_id = %self.id,
                attempts,
                progress = %envelope.field("progress"),
                "task_pending"
            );
            if max_attempts.is_some_and(|max| attempts >= max) {
                return Err(PicwishError::PollLimit {
                    task_id: self.id.to_string(),
                    attempts,
                });
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Clean asset URL for this task
    pub async fn image_url(&self, quality: PicQuality) -> Result<Envelope> {
        self.client.image_url(self.id, quality).await
    }
}
