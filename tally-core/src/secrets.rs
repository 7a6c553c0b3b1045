//! Local per-environment secret store.
//!
//! A single JSON document at `~/.tally/secrets.json`:
//!
//! ```json
//! { "dev": { "base_url": "https://rest.apisandbox.example.com", "client_id": "…" } }
//! ```
//!
//! Values are stored as JSON so cached token expiries can stay numeric.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{home, set_file_permissions, tally_dir_at};
use crate::error::{io_err, ConfigError};
use crate::types::Environment;

pub const BASE_URL: &str = "base_url";
pub const CLIENT_ID: &str = "client_id";
pub const CLIENT_SECRET: &str = "client_secret";
pub const GRANT_TYPE: &str = "grant_type";
pub const BEARER_TOKEN: &str = "bearer_token";
pub const TOKEN_EXPIRES_AT: &str = "token_expires_at";

/// In-memory view of the secret store file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretStore {
    sections: BTreeMap<String, BTreeMap<String, Value>>,
}

/// `<home>/.tally/secrets.json` — pure, no I/O.
pub fn store_path_at(home: &Path) -> PathBuf {
    tally_dir_at(home).join("secrets.json")
}

/// `~/.tally/secrets.json`, resolved through `dirs::home_dir()`.
pub fn default_store_path() -> Result<PathBuf, ConfigError> {
    Ok(store_path_at(&home()?))
}

impl SecretStore {
    /// Load the store at `path`; an absent file is an empty store.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// `load_at(~/.tally/secrets.json)` convenience wrapper.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_at(&default_store_path()?)
    }

    /// Save atomically (`.tmp` sibling, mode 0600, rename).
    pub fn save_at(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
        set_file_permissions(&tmp)?;
        std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))
    }

    pub fn has_environment(&self, env: Environment) -> bool {
        self.sections.contains_key(env.as_str())
    }

    pub fn get(&self, env: Environment, key: &str) -> Option<&Value> {
        self.sections.get(env.as_str()).and_then(|s| s.get(key))
    }

    /// String value for `key`; non-string values read as absent.
    pub fn get_str(&self, env: Environment, key: &str) -> Option<&str> {
        self.get(env, key).and_then(Value::as_str)
    }

    /// Like [`get_str`](Self::get_str) but a missing value is an error.
    pub fn require_str(&self, env: Environment, key: &str) -> Result<&str, ConfigError> {
        self.get_str(env, key)
            .ok_or_else(|| ConfigError::MissingSecrets {
                environment: format!("{env} ({key})"),
            })
    }

    pub fn set(&mut self, env: Environment, key: &str, value: impl Into<Value>) {
        self.sections
            .entry(env.as_str().to_owned())
            .or_default()
            .insert(key.to_owned(), value.into());
    }
}
