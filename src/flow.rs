use crate::actors::{RateLimitConfig, RateLimits, GITHUB_API_LIMIT};
use crate::cache::{ResultCache, DEFAULT_TTL};
use crate::error::Result;
use crate::github::GitHubClient;
use crate::models::RepoStars;
use crate::retry::RetryPolicy;
use crate::tasks::{get_stars, StatsFetcher};
use crate::types::{RepositoryIdentifier, RepositoryStats};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Repositories reported when none are given on the command line.
pub const DEFAULT_REPOS: [&str; 3] = [
    "PrefectHQ/prefect",
    "pydantic/pydantic",
    "huggingface/transformers",
];

/// Settings for one `show_stars` run
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub retry: RetryPolicy,
    /// `None` disables result caching
    pub cache_ttl: Option<Duration>,
    pub cache_dir: Option<PathBuf>,
    pub rate_limit_name: String,
    pub rate_limit: RateLimitConfig,
    /// Fetches in flight at once
    pub concurrency: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            cache_ttl: Some(DEFAULT_TTL),
            cache_dir: None,
            rate_limit_name: GITHUB_API_LIMIT.to_string(),
            rate_limit: RateLimitConfig::default(),
            concurrency: 8,
        }
    }
}

pub struct Flow {
    fetcher: StatsFetcher,
    concurrency: usize,
}

impl Flow {
    /// Starts the rate limiter for `config.rate_limit_name` and opens the cache.
    pub async fn new(client: GitHubClient, config: FlowConfig) -> Result<Self> {
        let rate_limits =
            RateLimits::spawn([(config.rate_limit_name.clone(), config.rate_limit.clone())]).await?;

        let cache = config.cache_ttl.map(|ttl| match &config.cache_dir {
            Some(dir) => ResultCache::<RepositoryStats>::with_file_cache(ttl, dir.clone()),
            None => ResultCache::new(ttl),
        });

        let fetcher = StatsFetcher::new(
            client,
            cache,
            rate_limits,
            config.rate_limit_name,
            config.retry,
        );

        Ok(Self {
            fetcher,
            concurrency: config.concurrency.max(1),
        })
    }

    pub fn fetcher(&self) -> &StatsFetcher {
        &self.fetcher
    }

    pub async fn clear_cache(&self) -> Result<()> {
        self.fetcher.clear_cache().await
    }

    pub fn shutdown(&self) {
        self.fetcher.rate_limits().shutdown();
    }
}

/// Applies `task` to every item with at most `concurrency` in flight.
///
/// Results come back in input order once all have finished. The first error
/// is returned and the remaining tasks are dropped.
pub async fn map_ordered<I, T, F, Fut>(items: I, concurrency: usize, task: F) -> Result<Vec<T>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    stream::iter(items)
        .map(task)
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// Fetches stats for every repository, extracts the star counts and pairs
/// them with their repositories in input order.
pub async fn show_stars(flow: &Flow, repos: &[RepositoryIdentifier]) -> Result<Vec<RepoStars>> {
    info!(repos = repos.len(), concurrency = flow.concurrency, "Starting show_stars");

    let fetcher = flow.fetcher();
    let repo_stats = map_ordered(repos, flow.concurrency, move |repo| fetcher.fetch_stats(repo)).await?;

    let stars = repo_stats.iter().map(get_stars).collect::<Result<Vec<_>>>()?;

    let report: Vec<RepoStars> = repos
        .iter()
        .cloned()
        .zip(stars)
        .map(|(repo, stars)| RepoStars { repo, stars })
        .collect();

    for line in &report {
        info!("{}", line.report_line());
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GitHubStarsError;

    #[tokio::test]
    async fn map_ordered_keeps_input_order() {
        // Earlier items sleep longer, so they finish last
        let delays = [30u64, 20, 10, 0];
        let results = map_ordered(delays, 4, |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(ms)
        })
        .await
        .unwrap();

        assert_eq!(results, vec![30, 20, 10, 0]);
    }

    #[tokio::test]
    async fn map_ordered_stops_at_first_error() {
        let result = map_ordered(1..=5u32, 2, |n| async move {
            if n == 3 {
                Err(GitHubStarsError::NotFound(format!("item {}", n)))
            } else {
                Ok(n)
            }
        })
        .await;

        assert!(matches!(result, Err(GitHubStarsError::NotFound(_))));
    }

    #[tokio::test]
    async fn map_ordered_on_empty_input() {
        let results: Vec<u32> = map_ordered(Vec::<u32>::new(), 3, |n| async move { Ok(n) })
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn default_repos_are_valid_identifiers() {
        for repo in DEFAULT_REPOS {
            assert!(RepositoryIdentifier::parse(repo).is_ok());
        }
    }
}
