use crate::types::{RepositoryIdentifier, StarCount};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Star count paired with the repository it was fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStars {
    pub repo: RepositoryIdentifier,
    pub stars: StarCount,
}

impl RepoStars {
    pub fn report_line(&self) -> String {
        format!("{}: {} stars", self.repo, self.stars)
    }
}

/// GitHub quota as reported by the `X-RateLimit-*` response headers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitState {
    pub remaining: u32,
    pub limit: u32,
    pub reset_time: DateTime<Utc>,
    pub is_limited: bool,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self {
            remaining: 60,
            limit: 60,
            reset_time: Utc::now() + chrono::Duration::hours(1),
            is_limited: false,
        }
    }
}

impl RateLimitState {
    /// Returns `None` when the response carries no rate limit headers.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        fn header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
            headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<T>().ok())
        }

        let remaining = header::<u32>(headers, "X-RateLimit-Remaining")?;
        let limit = header::<u32>(headers, "X-RateLimit-Limit").unwrap_or(60);
        let reset_time = header::<i64>(headers, "X-RateLimit-Reset")
            .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0))
            .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(1));

        Some(Self {
            remaining,
            limit,
            reset_time,
            is_limited: remaining == 0,
        })
    }
}
