//! Error types for tally-sync.

use std::path::PathBuf;

use thiserror::Error;

use tally_api::{ApiError, Method};
use tally_codec::CodecError;
use tally_core::types::ArtifactKind;

/// All errors that can arise from extract, plan and deploy steps.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No response could be obtained from the platform.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The platform answered with something other than 200.
    #[error("{method} {path} returned {status}: {body}")]
    Upstream {
        method: Method,
        path: String,
        status: u16,
        body: String,
    },

    /// An expected repository or plan-output file does not exist.
    #[error("not found: {path}")]
    NotFound { path: PathBuf },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A repository file holds JSON of the wrong shape.
    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested workflow version does not exist in the source environment.
    #[error("workflow '{workflow}' has no version '{version}'")]
    UnknownVersion { workflow: String, version: String },

    /// The workflow does not exist in the target environment, so there is no
    /// definition to import a new version into.
    #[error("workflow '{0}' not found in target environment")]
    WorkflowNotInTarget(String),

    /// A fatal step failed; the rest of the phase was not run.
    #[error("{kind} step failed: {source}")]
    StepFailed {
        kind: ArtifactKind,
        #[source]
        source: Box<SyncError>,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
