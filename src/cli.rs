use crate::actors::{RateLimitConfig, GITHUB_API_LIMIT};
use crate::error::Result;
use crate::flow::{FlowConfig, DEFAULT_REPOS};
use crate::github::API_BASE_URL;
use crate::retry::RetryPolicy;
use crate::types::RepositoryIdentifier;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "repo-stars")]
#[command(about = "Show the number of stars that GitHub repositories have")]
#[command(version)]
pub struct Cli {
    /// Repositories as owner/name
    #[arg(value_name = "REPOS", value_parser = parse_repo)]
    pub repos: Vec<RepositoryIdentifier>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = API_BASE_URL)]
    pub api_url: url::Url,

    /// Retries after a failed fetch
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Seconds to wait before each retry
    #[arg(long, default_value_t = 0)]
    pub retry_delay_secs: u64,

    /// How long a fetched result stays cached
    #[arg(long, default_value_t = 86_400)]
    pub cache_ttl_secs: u64,

    /// Persist cached results in this directory
    #[arg(long, env = "STARS_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Always fetch, never read or write the cache
    #[arg(long)]
    pub no_cache: bool,

    /// Delete cached results before fetching
    #[arg(long, conflicts_with = "no_cache")]
    pub clear_cache: bool,

    /// Name of the rate limit acquired before each request
    #[arg(long, default_value = GITHUB_API_LIMIT)]
    pub rate_limit_name: String,

    /// Requests allowed in a burst
    #[arg(long, default_value_t = 10)]
    pub rate_limit: u32,

    /// Slots regained per second
    #[arg(long, default_value_t = 1.0)]
    pub rate_limit_per_second: f64,

    /// Fetches in flight at once
    #[arg(long, default_value_t = 8)]
    pub concurrency: usize,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

fn parse_repo(value: &str) -> Result<RepositoryIdentifier> {
    RepositoryIdentifier::parse(value)
}

impl Cli {
    /// Repositories from the command line, or the built-in list.
    pub fn repositories(&self) -> Result<Vec<RepositoryIdentifier>> {
        if !self.repos.is_empty() {
            return Ok(self.repos.clone());
        }
        DEFAULT_REPOS
            .iter()
            .map(|repo| RepositoryIdentifier::parse(repo))
            .collect()
    }

    pub fn flow_config(&self) -> FlowConfig {
        FlowConfig {
            retry: RetryPolicy {
                retries: self.retries,
                delay: Duration::from_secs(self.retry_delay_secs),
            },
            cache_ttl: (!self.no_cache).then(|| Duration::from_secs(self.cache_ttl_secs)),
            cache_dir: self.cache_dir.clone(),
            rate_limit_name: self.rate_limit_name.clone(),
            rate_limit: RateLimitConfig {
                capacity: self.rate_limit,
                refill_per_second: self.rate_limit_per_second,
            },
            concurrency: self.concurrency,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
