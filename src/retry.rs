//! Bounded retries for fallible async steps.

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts after the first one. `0` disables retrying.
    pub retries: u32,
    /// Pause before each retry.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the retry budget is spent. The last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        task = label,
                        attempt,
                        retries = self.retries,
                        delay_ms = self.delay.as_millis() as u64,
                        "Task failed, retrying: {}",
                        e
                    );
                    if !self.delay.is_zero() {
                        sleep(self.delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GitHubStarsError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let calls = &AtomicU32::new(0);
        let result = RetryPolicy::default()
            .run("flaky", move |_| async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(GitHubStarsError::ApiError("502".to_string()))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy {
            retries: 2,
            delay: Duration::from_millis(1),
        };
        let result: Result<()> = policy
            .run("always-fails", move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GitHubStarsError::ApiError("500".to_string()))
            })
            .await;

        assert!(matches!(result, Err(GitHubStarsError::ApiError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = RetryPolicy::default()
            .run("missing", move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GitHubStarsError::NotFound("a/b".to_string()))
            })
            .await;

        assert!(matches!(result, Err(GitHubStarsError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
