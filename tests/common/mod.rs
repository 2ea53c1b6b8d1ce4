#![allow(dead_code)]

use async_trait::async_trait;
use repo_stars::error::{GitHubStarsError, Result};
use repo_stars::flow::{Flow, FlowConfig};
use repo_stars::github::{GitHubClient, StatsTransport, API_BASE_URL};
use repo_stars::types::RepositoryIdentifier;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Canned response for one request
pub enum Reply {
    Json(Value),
    /// Retryable server-side failure
    ServerError,
    NotFound,
    Delayed(Duration, Value),
}

/// Transport that answers from per-path queues and counts every call.
#[derive(Default)]
pub struct StubTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues `reply` for `repo`; the last queued reply repeats.
    pub fn reply(&self, repo: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(format!("/repos/{}", repo))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls_for(&self, repo: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&format!("/repos/{}", repo))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatsTransport for StubTransport {
    async fn get_json(&self, url: &Url) -> Result<Value> {
        let path = url.path().to_string();
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(path.clone()).or_default() += 1;

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            let queue = replies
                .get_mut(&path)
                .ok_or_else(|| GitHubStarsError::NotFound(url.to_string()))?;
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().map(|reply| match reply {
                    Reply::Json(value) => Reply::Json(value.clone()),
                    Reply::ServerError => Reply::ServerError,
                    Reply::NotFound => Reply::NotFound,
                    Reply::Delayed(delay, value) => Reply::Delayed(*delay, value.clone()),
                })
            }
        };

        match reply {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Delayed(delay, value)) => {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
            Some(Reply::ServerError) => Err(GitHubStarsError::ApiError(
                "API request failed with status 502 Bad Gateway: ".to_string(),
            )),
            Some(Reply::NotFound) | None => Err(GitHubStarsError::NotFound(url.to_string())),
        }
    }
}

pub fn client(transport: Arc<StubTransport>) -> GitHubClient {
    GitHubClient::with_transport(transport, Url::parse(API_BASE_URL).unwrap())
}

/// Config with a generous rate limit so tests never wait on it
pub fn test_config() -> FlowConfig {
    let mut config = FlowConfig::default();
    config.rate_limit.capacity = 100;
    config.rate_limit.refill_per_second = 100.0;
    config
}

pub async fn flow(transport: Arc<StubTransport>, config: FlowConfig) -> Flow {
    Flow::new(client(transport), config)
        .await
        .expect("Failed to start flow")
}

pub fn repos(names: &[&str]) -> Vec<RepositoryIdentifier> {
    names
        .iter()
        .map(|name| name.parse().expect("valid identifier"))
        .collect()
}
