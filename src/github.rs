use crate::error::{GitHubStarsError, Result};
use crate::models::RateLimitState;
use crate::types::{RepositoryIdentifier, RepositoryStats};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const API_BASE_URL: &str = "https://api.github.com";

/// Performs a single GET and returns the decoded JSON body.
///
/// Implementations map non-success responses to errors; retrying and
/// caching happen above this layer.
#[async_trait]
pub trait StatsTransport: Send + Sync {
    async fn get_json(&self, url: &Url) -> Result<Value>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("repo-stars/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(ReqwestTransport { client })
    }
}

#[async_trait]
impl StatsTransport for ReqwestTransport {
    async fn get_json(&self, url: &Url) -> Result<Value> {
        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await?;

        let rate_limit = RateLimitState::from_headers(response.headers());
        if let Some(state) = &rate_limit {
            debug!(
                remaining = state.remaining,
                limit = state.limit,
                reset = %state.reset_time,
                "GitHub rate limit"
            );
        }

        match response.status() {
            status if status.is_success() => {
                let body = response.text().await?;
                Ok(serde_json::from_str(&body)?)
            }
            StatusCode::NOT_FOUND => Err(GitHubStarsError::NotFound(url.to_string())),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
                if rate_limit.as_ref().is_some_and(|state| state.is_limited) =>
            {
                let reset = rate_limit
                    .map(|state| state.reset_time.to_rfc3339())
                    .unwrap_or_default();
                warn!(%url, %reset, "GitHub API rate limit exhausted");
                Err(GitHubStarsError::RateLimitExceeded(format!(
                    "API rate limit exceeded. Reset at: {}",
                    reset
                )))
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                Err(GitHubStarsError::ApiError(format!(
                    "API request failed with status {}: {}",
                    status, error_text
                )))
            }
        }
    }
}

#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn StatsTransport>,
    base_url: Url,
}

impl GitHubClient {
    /// Client against the public API using reqwest.
    pub fn new(timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(API_BASE_URL)
            .map_err(|e| GitHubStarsError::ApiError(format!("Invalid API base URL: {}", e)))?;
        Ok(Self::with_transport(Arc::new(ReqwestTransport::new(timeout)?), base_url))
    }

    pub fn with_transport(transport: Arc<dyn StatsTransport>, base_url: Url) -> Self {
        GitHubClient {
            transport,
            base_url,
        }
    }

    /// `{base}/repos/{owner}/{name}`, keeping any path prefix of the base
    /// (GitHub Enterprise serves the API under `/api/v3`).
    pub fn repository_url(&self, repo: &RepositoryIdentifier) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                GitHubStarsError::ApiError(format!("API base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["repos", repo.owner(), repo.name()]);
        Ok(url)
    }

    /// One GET against the repository endpoint, no retries.
    pub async fn get_repository_stats(&self, repo: &RepositoryIdentifier) -> Result<RepositoryStats> {
        let url = self.repository_url(repo)?;
        debug!(%repo, %url, "Fetching repository stats");

        match self.transport.get_json(&url).await? {
            Value::Object(stats) => Ok(stats),
            other => Err(GitHubStarsError::MalformedResponse(format!(
                "expected a JSON object for {}, got {}",
                repo,
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
