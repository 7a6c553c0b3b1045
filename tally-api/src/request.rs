//! Request/response values and the [`PlatformApi`] port.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// HTTP verbs the sync engine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single platform request, relative to the environment's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status code and raw body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A 200 response carrying `value` as its body.
    pub fn ok_json(value: &Value) -> Self {
        Self::new(200, value.to_string())
    }

    /// Exactly 200 counts as success; the platform reports soft failures with other 2xx codes.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Port to the billing platform's REST API.
pub trait PlatformApi {
    /// Send one request. Non-200 statuses come back as `Ok` responses.
    ///
    /// # Errors
    ///
    /// Returns an error only when no response could be obtained.
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;

    fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::new(Method::Get, path))
    }

    fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<ApiResponse, ApiError> {
        let request = query
            .iter()
            .fold(ApiRequest::new(Method::Get, path), |req, (k, v)| {
                req.query(*k, *v)
            });
        self.send(request)
    }

    fn post(&self, path: &str, body: Value) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::new(Method::Post, path).body(body))
    }

    fn put(&self, path: &str, body: Value) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::new(Method::Put, path).body(body))
    }
}

impl<T: PlatformApi + ?Sized> PlatformApi for &T {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        (**self).send(request)
    }
}
