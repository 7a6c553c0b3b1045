//! Error types for tally-api.

use thiserror::Error;

use tally_core::ConfigError;

/// Failures that prevent a request from producing a response at all.
///
/// Non-200 responses are NOT errors at this layer; callers inspect
/// [`ApiResponse::status`](crate::ApiResponse).
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS, DNS or body-read failure.
    #[error("{method} {url} failed: {reason}")]
    Transport {
        method: &'static str,
        url: String,
        reason: String,
    },

    /// The token endpoint refused the client credentials.
    #[error("authentication failed with status {status}: {body}")]
    Auth { status: u16, body: String },

    /// Secret store lookup or persistence failure.
    #[error("secret store error: {0}")]
    Secrets(#[from] ConfigError),

    /// Response body was not the JSON the caller expected.
    #[error("response JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
