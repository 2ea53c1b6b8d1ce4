use crate::actors::RateLimits;
use crate::cache::ResultCache;
use crate::error::{GitHubStarsError, Result};
use crate::github::GitHubClient;
use crate::retry::RetryPolicy;
use crate::types::{RepositoryIdentifier, RepositoryStats, StarCount};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const STARS_FIELD: &str = "stargazers_count";

/// Fetch step: one repository's stats, cached by identifier, retried, and
/// gated by a named rate limit before every request.
#[derive(Clone)]
pub struct StatsFetcher {
    client: GitHubClient,
    cache: Option<ResultCache<RepositoryStats>>,
    rate_limits: RateLimits,
    rate_limit_name: String,
    retry: RetryPolicy,
    /// One lock per cache key, held while that key is being fetched
    in_flight: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl StatsFetcher {
    pub fn new(
        client: GitHubClient,
        cache: Option<ResultCache<RepositoryStats>>,
        rate_limits: RateLimits,
        rate_limit_name: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            cache,
            rate_limits,
            rate_limit_name: rate_limit_name.into(),
            retry,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn rate_limits(&self) -> &RateLimits {
        &self.rate_limits
    }

    pub async fn fetch_stats(&self, repo: &RepositoryIdentifier) -> Result<RepositoryStats> {
        let Some(cache) = &self.cache else {
            return self.fetch_uncached(repo).await;
        };
        let cache_key = repo.full_name();

        if let Some(stats) = cache.get(&cache_key).await {
            info!(task = "fetch_stats", %repo, "Using cached result");
            return Ok(stats);
        }

        // Duplicate keys wait here for the first fetch, then read its result
        let key_lock = self.key_lock(&cache_key);
        let _guard = key_lock.lock().await;

        if let Some(stats) = cache.get(&cache_key).await {
            info!(task = "fetch_stats", %repo, "Using cached result");
            return Ok(stats);
        }

        let stats = self.fetch_uncached(repo).await?;
        cache.insert(&cache_key, stats.clone()).await;
        Ok(stats)
    }

    fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.entry(key.to_string()).or_default().clone()
    }

    async fn fetch_uncached(&self, repo: &RepositoryIdentifier) -> Result<RepositoryStats> {
        let stats = self
            .retry
            .run("fetch_stats", move |attempt| async move {
                self.rate_limits.acquire(&self.rate_limit_name).await?;
                debug!(task = "fetch_stats", %repo, attempt, "Requesting repository stats");
                self.client.get_repository_stats(repo).await
            })
            .await?;

        info!(task = "fetch_stats", %repo, "Fetched repository stats");
        Ok(stats)
    }

    /// Drops every cached result, in memory and on disk.
    pub async fn clear_cache(&self) -> Result<()> {
        match &self.cache {
            Some(cache) => cache.clear().await,
            None => Ok(()),
        }
    }
}

/// Extraction step: the star count of one repository.
///
/// An API error payload (for example `{"message": "Not Found"}`) has no
/// `stargazers_count`; the API's message is carried in the error.
pub fn get_stars(stats: &RepositoryStats) -> Result<StarCount> {
    let Some(value) = stats.get(STARS_FIELD) else {
        let field = match stats.get("message").and_then(|m| m.as_str()) {
            Some(message) => format!("{} (API message: {})", STARS_FIELD, message),
            None => STARS_FIELD.to_string(),
        };
        return Err(GitHubStarsError::MissingField(field));
    };

    value.as_u64().ok_or_else(|| {
        GitHubStarsError::MalformedResponse(format!(
            "{} is not a non-negative integer: {}",
            STARS_FIELD, value
        ))
    })
}
