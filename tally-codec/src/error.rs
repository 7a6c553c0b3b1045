//! Error types for tally-codec.

use thiserror::Error;

/// Failures while decomposing or recomposing an artifact.
///
/// Codec operations are all-or-nothing: an error means no part of the
/// artifact was produced.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A task or file name contains a character no file system accepts.
    #[error("name '{name}' contains forbidden character '{character}'")]
    InvalidName { name: String, character: char },

    /// Input did not have the shape the codec needs.
    #[error("malformed {what}: {reason}")]
    Malformed { what: String, reason: String },

    /// A template fragment could not be located in the full HTML document.
    #[error("fragment '{html_id}' not found in template HTML content")]
    FragmentNotFound { html_id: String },

    /// Recompose was not given the side file for a fragment.
    #[error("no source for template fragment '{html_id}'")]
    MissingFragment { html_id: String },

    #[error("not a numeric dotted version: '{0}'")]
    InvalidVersion(String),

    #[error("no versions to derive a new version from")]
    NoVersions,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("template content is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub(crate) fn malformed(what: impl Into<String>, reason: impl Into<String>) -> CodecError {
    CodecError::Malformed {
        what: what.into(),
        reason: reason.into(),
    }
}
