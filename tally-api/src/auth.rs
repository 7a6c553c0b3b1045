//! Bearer-token session backed by the local secret store.
//!
//! Tokens come from the client-credentials endpoint (`oauth/token`) and are
//! cached in the secret store together with their expiry, so consecutive
//! runs reuse a live token.

use std::cell::RefCell;
use std::path::PathBuf;

use chrono::Utc;
use serde::Deserialize;

use tally_core::secrets::{
    self, SecretStore, BASE_URL, BEARER_TOKEN, CLIENT_ID, CLIENT_SECRET, GRANT_TYPE,
    TOKEN_EXPIRES_AT,
};
use tally_core::types::Environment;

use crate::error::ApiError;

/// An access token and the unix second it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub expires_at: i64,
}

impl Token {
    pub fn is_expired(&self, now: i64) -> bool {
        self.access_token.is_empty() || now >= self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Per-environment credentials plus the cached token.
pub struct BearerSession {
    environment: Environment,
    base_url: String,
    store_path: PathBuf,
    store: RefCell<SecretStore>,
}

impl BearerSession {
    /// Open a session for `environment` using the store at `store_path`.
    pub fn open_at(environment: Environment, store_path: PathBuf) -> Result<Self, ApiError> {
        let store = SecretStore::load_at(&store_path)?;
        if !store.has_environment(environment) {
            return Err(ApiError::Secrets(tally_core::ConfigError::MissingSecrets {
                environment: environment.to_string(),
            }));
        }
        let base_url = store.require_str(environment, BASE_URL)?.to_owned();
        Ok(Self {
            environment,
            base_url,
            store_path,
            store: RefCell::new(store),
        })
    }

    /// `open_at(~/.tally/secrets.json)` convenience wrapper.
    pub fn open(environment: Environment) -> Result<Self, ApiError> {
        Self::open_at(environment, secrets::default_store_path()?)
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn cached_token(&self) -> Option<Token> {
        let store = self.store.borrow();
        let access_token = store.get_str(self.environment, BEARER_TOKEN)?.to_owned();
        let expires_at = store
            .get(self.environment, TOKEN_EXPIRES_AT)
            .and_then(serde_json::Value::as_i64)?;
        Some(Token {
            access_token,
            expires_at,
        })
    }

    /// Return a valid token, fetching and caching a new one when needed.
    pub fn token(&self, agent: &ureq::Agent) -> Result<Token, ApiError> {
        let now = Utc::now().timestamp();
        if let Some(token) = self.cached_token() {
            if !token.is_expired(now) {
                tracing::debug!("bearer token still valid for {}", self.environment);
                return Ok(token);
            }
        }

        tracing::info!("generating bearer token for {}", self.environment);
        let token = self.fetch_token(agent, now)?;

        let mut store = self.store.borrow_mut();
        store.set(self.environment, BEARER_TOKEN, token.access_token.clone());
        store.set(self.environment, TOKEN_EXPIRES_AT, token.expires_at);
        store.save_at(&self.store_path)?;
        Ok(token)
    }

    fn fetch_token(&self, agent: &ureq::Agent, now: i64) -> Result<Token, ApiError> {
        let (client_id, client_secret, grant_type) = {
            let store = self.store.borrow();
            (
                store.require_str(self.environment, CLIENT_ID)?.to_owned(),
                store.require_str(self.environment, CLIENT_SECRET)?.to_owned(),
                store
                    .get_str(self.environment, GRANT_TYPE)
                    .unwrap_or("client_credentials")
                    .to_owned(),
            )
        };

        let url = crate::client::join_url(&self.base_url, "oauth/token");
        let result = agent.post(&url).send_form(&[
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("grant_type", grant_type.as_str()),
        ]);

        match result {
            Ok(resp) => {
                let body: TokenResponse = resp.into_json().map_err(|e| ApiError::Transport {
                    method: "POST",
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
                Ok(Token {
                    access_token: body.access_token,
                    expires_at: now + body.expires_in,
                })
            }
            Err(ureq::Error::Status(status, resp)) => Err(ApiError::Auth {
                status,
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(t)) => Err(ApiError::Transport {
                method: "POST",
                url,
                reason: t.to_string(),
            }),
        }
    }
}
