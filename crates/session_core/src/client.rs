//! HTTP access to the remote simulation engine.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::protocol::{CreatedSimulation, SessionHandle, SimulationConfig, SimulationState};
use tracing::debug;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSession {
    pub handle: SessionHandle,
    pub state: SimulationState,
}

/// The two engine operations the controller depends on. Implementations never retry.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn create_session(
        &self,
        config: &SimulationConfig,
    ) -> Result<CreatedSession, ClientError>;
    async fn fetch_state(&self, handle: &SessionHandle) -> Result<SimulationState, ClientError>;
}

pub struct HttpSessionClient {
    http: Client,
    server_url: String,
}

impl HttpSessionClient {
    pub fn new(server_url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        let parsed = Url::parse(server_url).map_err(|err| {
            ClientError::InvalidConfig(format!(
                "server url '{server_url}' is not a valid url: {err}"
            ))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidConfig(format!(
                "server url must start with http:// or https://, got '{server_url}'"
            )));
        }
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| {
                ClientError::Unreachable(format!("failed to build http client: {err}"))
            })?;
        Ok(Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    /// `Location` is used verbatim: appended to the server url, or as-is when absolute.
    fn state_url(&self, handle: &SessionHandle) -> String {
        let location = handle.as_str();
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else if location.starts_with('/') {
            format!("{}{location}", self.server_url)
        } else {
            format!("{}/{location}", self.server_url)
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Unreachable(format!(
            "engine answered with status {status}"
        )));
    }
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|err| ClientError::Malformed(err.to_string()))
}

#[async_trait]
impl SessionApi for HttpSessionClient {
    async fn create_session(
        &self,
        config: &SimulationConfig,
    ) -> Result<CreatedSession, ClientError> {
        let url = format!("{}/simulations", self.server_url);
        debug!(%url, variant = %config.variant, "creating simulation session");
        let response = self.http.post(&url).json(&config.to_request()).send().await?;
        let created: CreatedSimulation = read_json(response).await?;
        let (handle, state) = created.into_parts()?;
        Ok(CreatedSession { handle, state })
    }

    async fn fetch_state(&self, handle: &SessionHandle) -> Result<SimulationState, ClientError> {
        let response = self.http.get(self.state_url(handle)).send().await?;
        let state: SimulationState = read_json(response).await?;
        state.validate()?;
        Ok(state)
    }
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
