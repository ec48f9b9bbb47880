// src/upstream/client.rs
use super::{JsonObject, UpstreamIdentifier};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream base URL '{0}' cannot take path segments")]
    InvalidUrl(Url),

    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(StatusCode),

    #[error("upstream body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("upstream body is JSON but not an object")]
    NotAnObject,

    #[error("branch deadline exceeded")]
    DeadlineExceeded,
}

impl UpstreamError {
    /// Short, stable name used as a log field and metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::InvalidUrl(_) => "invalid_url",
            UpstreamError::Transport(e) if e.is_timeout() => "timeout",
            UpstreamError::Transport(e) if e.is_connect() => "connect",
            UpstreamError::Transport(_) => "transport",
            UpstreamError::Status(_) => "status",
            UpstreamError::Decode(_) => "decode",
            UpstreamError::NotAnObject => "not_an_object",
            UpstreamError::DeadlineExceeded => "deadline",
        }
    }
}

/// Anything that can resolve one branch of an aggregation.
#[async_trait]
pub trait BranchSource: Send + Sync {
    async fn fetch(&self, identifier: &UpstreamIdentifier) -> Result<JsonObject, UpstreamError>;
}

/// Issues `GET <base_url>/<identifier>` and expects a JSON object back.
///
/// The `reqwest::Client` handle shares its connection pool with every other
/// clone, so one client built at startup serves all requests.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: Url,
}

impl UpstreamClient {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append the identifier as exactly one path segment under the base.
    /// Reserved characters in the identifier are percent-encoded, never
    /// interpreted.
    pub fn url_for(&self, identifier: &UpstreamIdentifier) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push(identifier.as_str());
        Ok(url)
    }

    pub async fn fetch(&self, identifier: &UpstreamIdentifier) -> Result<JsonObject, UpstreamError> {
        let url = self.url_for(identifier)?;
        debug!(%url, "fetching upstream");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        let body = response.bytes().await?;
        match serde_json::from_slice::<Value>(&body)? {
            Value::Object(payload) => Ok(payload),
            _ => Err(UpstreamError::NotAnObject),
        }
    }
}

#[async_trait]
impl BranchSource for UpstreamClient {
    async fn fetch(&self, identifier: &UpstreamIdentifier) -> Result<JsonObject, UpstreamError> {
        UpstreamClient::fetch(self, identifier).await
    }
}
