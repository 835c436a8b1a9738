//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::routes::Routes;

/// Replays queued responses in order and records every request.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: HttpResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push(HttpResponse::new(status, body.to_string()));
    }

    /// Shorthand for a 200 `{"item": ...}` response.
    pub fn push_item(&self, item: Value) {
        self.push_json(200, serde_json::json!({ "item": item }));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// `(method, path)` pairs with the base URL stripped.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.requests()
            .into_iter()
            .map(|r| {
                let path = r.url.trim_start_matches(BASE_URL).to_string();
                (r.method.to_string(), path)
            })
            .collect()
    }

    pub fn routes(self: &Arc<Self>) -> Routes {
        Routes::new(BASE_URL, self.clone(), Some("Bearer test-token".into()))
    }
}

pub const BASE_URL: &str = "http://planka.test";

impl Transport for MockTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::Transport(format!("no queued response for {} {}", request.method, request.url)))
    }
}

/// Parse a recorded request body as JSON.
pub fn body_json(request: &HttpRequest) -> Value {
    serde_json::from_slice(request.body.as_deref().unwrap_or(b"null")).unwrap()
}
