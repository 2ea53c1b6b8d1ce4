pub mod rate_limiter;

pub use rate_limiter::{RateLimitConfig, RateLimits, RateLimiterStats, GITHUB_API_LIMIT};
