//! Blocking live client over `ureq`.

use std::time::Duration;

use crate::auth::BearerSession;
use crate::error::ApiError;
use crate::request::{ApiRequest, ApiResponse, PlatformApi};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Live [`PlatformApi`] for one environment. No retries.
pub struct HttpClient {
    agent: ureq::Agent,
    session: BearerSession,
}

impl HttpClient {
    pub fn new(session: BearerSession) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self { agent, session }
    }

    pub fn session(&self) -> &BearerSession {
        &self.session
    }
}

impl PlatformApi for HttpClient {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = self.session.token(&self.agent)?;
        let url = join_url(self.session.base_url(), &request.path);
        let method = request.method.as_str();
        tracing::info!("{method} {url}");

        let mut req = self
            .agent
            .request(method, &url)
            .set("Accept", "application/json")
            .set("Authorization", &format!("Bearer {}", token.access_token));
        for (key, value) in &request.query {
            req = req.query(key, value);
        }

        let result = match request.body {
            Some(body) => {
                tracing::debug!("payload == {body}");
                req.send_json(body)
            }
            None => req.call(),
        };

        let response = match result {
            Ok(resp) => resp,
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(ureq::Error::Transport(t)) => {
                return Err(ApiError::Transport {
                    method,
                    url,
                    reason: t.to_string(),
                })
            }
        };

        let status = response.status();
        let body = response.into_string().map_err(|e| ApiError::Transport {
            method,
            url: url.clone(),
            reason: e.to_string(),
        })?;
        if status != 200 {
            tracing::warn!("{method} {url} returned {status}");
        }
        Ok(ApiResponse { status, body })
    }
}

/// Join a base URL and a relative API path with exactly one slash between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
