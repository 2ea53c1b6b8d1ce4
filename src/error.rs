use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitHubStarsError {
    #[error("GitHub API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid repository identifier: {0}")]
    InvalidRepoUrl(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Missing field in repository stats: {0}")]
    MissingField(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Rate limiter unavailable: {0}")]
    RateLimiterUnavailable(String),
}

impl GitHubStarsError {
    /// Whether another attempt of the fetch step could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GitHubStarsError::ApiError(_)
                | GitHubStarsError::RateLimitExceeded(_)
                | GitHubStarsError::NetworkError(_)
                | GitHubStarsError::JsonError(_)
                | GitHubStarsError::MalformedResponse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GitHubStarsError>;
