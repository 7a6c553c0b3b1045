//! What every step needs: the platform port, the configuration and the
//! repository layout.

use serde::de::DeserializeOwned;

use tally_api::{ApiRequest, ApiResponse, Method, PlatformApi};
use tally_core::{Config, RepoLayout};

use crate::error::SyncError;

pub struct Context<'a> {
    pub api: &'a dyn PlatformApi,
    pub config: &'a Config,
    pub layout: RepoLayout,
}

impl<'a> Context<'a> {
    pub fn new(api: &'a dyn PlatformApi, config: &'a Config) -> Self {
        Self {
            api,
            config,
            layout: config.layout(),
        }
    }

    /// `GET path` and parse the body; anything but 200 is [`SyncError::Upstream`].
    pub fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        self.fetch_json_with_query(path, &[])
    }

    pub fn fetch_json_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SyncError> {
        let response = self.api.get_with_query(path, query)?;
        let response = ensure_success(Method::Get, path, response)?;
        Ok(response.json()?)
    }

    /// Send `request`; anything but 200 is [`SyncError::Upstream`].
    pub fn send(&self, request: ApiRequest) -> Result<ApiResponse, SyncError> {
        let method = request.method;
        let path = request.path.clone();
        let response = self.api.send(request)?;
        ensure_success(method, &path, response)
    }
}

pub fn ensure_success(
    method: Method,
    path: &str,
    response: ApiResponse,
) -> Result<ApiResponse, SyncError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(SyncError::Upstream {
            method,
            path: path.to_owned(),
            status: response.status,
            body: response.body,
        })
    }
}
