//! Scripted in-memory transport for protocol tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{HttpRequest, HttpResponse, Method, StatusCode, Transport, TransportError};

struct Route {
    method: Method,
    fragment: String,
    responses: VecDeque<HttpResponse>,
}

/// Answers requests from per-route response queues. The last queued response
/// of a route is repeated once the others are consumed.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register responses for requests whose URL contains `fragment`.
    /// Routes are matched in registration order.
    pub(crate) fn on(self, method: Method, fragment: &str, responses: Vec<HttpResponse>) -> Self {
        self.routes.lock().unwrap().push(Route {
            method,
            fragment: fragment.to_string(),
            responses: responses.into(),
        });
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests sent to URLs containing `fragment`
    pub(crate) fn calls(&self, method: Method, fragment: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.url.contains(fragment))
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| r.method == request.method && request.url.contains(&r.fragment))
            .ok_or_else(|| {
                TransportError::Request(format!("no scripted route for {}", request.url))
            })?;
        let response = if route.responses.len() > 1 {
            route.responses.pop_front()
        } else {
            route.responses.front().cloned()
        };
        response.ok_or_else(|| TransportError::Request("empty script".to_string()))
    }
}

pub(crate) fn json(status: u16, value: serde_json::Value) -> HttpResponse {
    HttpResponse::new(
        StatusCode::from_u16(status).unwrap(),
        serde_json::to_vec(&value).unwrap(),
    )
}

pub(crate) fn raw(status: u16, body: &'static [u8]) -> HttpResponse {
    HttpResponse::new(StatusCode::from_u16(status).unwrap(), body)
}
