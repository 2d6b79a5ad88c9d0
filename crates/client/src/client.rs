//! HTTP client for the control plane.

use probe_protocol::{ActuateRequest, ActuateResponse, ResetResponse, StatusResponse};
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(
        "probe endpoint unreachable at {url}: {source}. The probe agent is likely not running \
         there, or the port is wrong."
    )]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("probe returned HTTP {status}: {body}")]
    Endpoint { status: u16, body: String },
    #[error("invalid probe response: {0}")]
    InvalidResponse(#[source] reqwest::Error),
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Thin client over the three control-plane endpoints. Every call
/// carries an upper-bounded timeout and is never retried silently.
#[derive(Debug, Clone)]
pub struct ProbeClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProbeClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn status(&self, key: &str) -> Result<StatusResponse, ClientError> {
        let url = format!("{}/__probe/status", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("key", key)])
            .send()
            .await
            .map_err(|source| ClientError::Unreachable {
                url: url.clone(),
                source,
            })?;
        Self::parse(response).await
    }

    pub async fn reset(&self, key: &str) -> Result<ResetResponse, ClientError> {
        let url = format!("{}/__probe/reset", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "key": key }))
            .send()
            .await
            .map_err(|source| ClientError::Unreachable {
                url: url.clone(),
                source,
            })?;
        Self::parse(response).await
    }

    pub async fn actuate(&self, overrides: &ActuateRequest) -> Result<ActuateResponse, ClientError> {
        let url = format!("{}/__probe/actuate", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(overrides)
            .send()
            .await
            .map_err(|source| ClientError::Unreachable {
                url: url.clone(),
                source,
            })?;
        Self::parse(response).await
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }
        response.json().await.map_err(ClientError::InvalidResponse)
    }
}
