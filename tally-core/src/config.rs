//! Explicit run configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.tally/
//!   config.yaml     (mode 0600)
//!   secrets.json    (see [`crate::secrets`])
//! ```
//!
//! # API pattern
//!
//! Every function touching the filesystem has two forms:
//! - `fn_at(path: &Path, …)` — explicit location; used in tests with `TempDir`
//! - `fn(…)` — derives the location from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::layout::RepoLayout;
use crate::types::{MatchCriteria, ObjectName};

/// Document types whose HTML templates are versioned when none are configured.
pub const DEFAULT_BILLING_DOCUMENT_TYPES: [&str; 3] = ["invoice", "credit-memo", "debit-memo"];

fn default_billing_document_types() -> Vec<String> {
    DEFAULT_BILLING_DOCUMENT_TYPES
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

/// Everything a run needs to know besides the request form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the source-of-truth repository.
    pub repository_dir: PathBuf,
    /// Standard objects whose custom fields are versioned.
    #[serde(default)]
    pub zuora_objects: Vec<ObjectName>,
    /// Custom object types whose definitions and records are versioned.
    #[serde(default)]
    pub custom_object_names: Vec<ObjectName>,
    /// Business key per custom object type, used by the record diff.
    #[serde(default)]
    pub custom_objects_map: BTreeMap<String, MatchCriteria>,
    /// Known workflows.
    #[serde(default)]
    pub workflow_names: Vec<String>,
    #[serde(default = "default_billing_document_types")]
    pub billing_document_types: Vec<String>,
}

impl Config {
    /// A configuration with no objects selected, rooted at `repository_dir`.
    pub fn new(repository_dir: impl Into<PathBuf>) -> Self {
        Self {
            repository_dir: repository_dir.into(),
            zuora_objects: Vec::new(),
            custom_object_names: Vec::new(),
            custom_objects_map: BTreeMap::new(),
            workflow_names: Vec::new(),
            billing_document_types: default_billing_document_types(),
        }
    }

    pub fn layout(&self) -> RepoLayout {
        RepoLayout::new(&self.repository_dir)
    }

    pub fn criteria_for(&self, object_type: &str) -> Option<&MatchCriteria> {
        self.custom_objects_map.get(object_type)
    }
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.tally/` — pure, no I/O.
pub fn tally_dir_at(home: &Path) -> PathBuf {
    home.join(".tally")
}

/// `<home>/.tally/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    tally_dir_at(home).join("config.yaml")
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load the configuration stored at `path`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// `load_at(~/.tally/config.yaml)` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&config_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `config` to `path`.
///
/// Write flow: serialize → `.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp_path = path.with_extension("yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

pub(crate) fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
pub(crate) fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
pub(crate) fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
