//! Error types for tally-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from configuration, form and secret-store operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error (secret store save path).
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parse error on load — includes file path and the parser's line context.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// `dirs::home_dir()` returned `None` — cannot locate `~/.tally/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The configuration file did not exist at the expected path.
    #[error("configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// The environment name is not one of the supported environments.
    #[error("not a valid environment: '{0}'; expected one of dev, qa, uat, prod")]
    InvalidEnvironment(String),

    /// The secret store has no section for the requested environment.
    #[error("no secrets configured for environment '{environment}'")]
    MissingSecrets { environment: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
