//! In-memory [`PlatformApi`] serving canned responses.
//!
//! Routes are keyed by method + path (query strings are recorded but not
//! matched). Several responses queued on one route are served in order; the
//! last one keeps being served once the queue is down to it. Unknown routes
//! answer 404 so a missing stub shows up as an upstream failure, not a panic.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use serde_json::Value;

use crate::error::ApiError;
use crate::request::{ApiRequest, ApiResponse, Method, PlatformApi};

#[derive(Default)]
pub struct StubApi {
    routes: RefCell<HashMap<(Method, String), VecDeque<ApiResponse>>>,
    requests: RefCell<Vec<ApiRequest>>,
}

impl StubApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `response` for `method path`.
    pub fn on(self, method: Method, path: &str, response: ApiResponse) -> Self {
        self.routes
            .borrow_mut()
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(response);
        self
    }

    /// Queue a 200 JSON response for `GET path`.
    pub fn on_get(self, path: &str, body: Value) -> Self {
        self.on(Method::Get, path, ApiResponse::ok_json(&body))
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }

    /// Requests matching `method`, in order.
    pub fn requests_for(&self, method: Method) -> Vec<ApiRequest> {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }
}

impl PlatformApi for StubApi {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let key = (request.method, request.path.clone());
        self.requests.borrow_mut().push(request);

        let mut routes = self.routes.borrow_mut();
        let response = match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(response.unwrap_or_else(|| ApiResponse::new(404, format!("no stub for {} {}", key.0, key.1))))
    }
}
