use crate::error::{GitHubStarsError, Result};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use ractor::rpc::CallResult;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

pub const GITHUB_API_LIMIT: &str = "github-api";

/// Shape of one named limit: a bucket of `capacity` slots that refills at
/// `refill_per_second`.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub capacity: u32,
    pub refill_per_second: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            refill_per_second: 1.0,
        }
    }
}

/// Token bucket that hands out reservations. A caller that gets a non-zero
/// delay owns the slot once the delay has elapsed, so tokens may go negative.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_second: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(config: &RateLimitConfig, now: Instant) -> Self {
        Self {
            capacity: config.capacity as f64,
            refill_per_second: config.refill_per_second,
            tokens: config.capacity as f64,
            last_refill: now,
        }
    }

    pub fn reserve(&mut self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_second).min(self.capacity);
        self.last_refill = now;

        self.tokens -= 1.0;
        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            // Tiny refill rates overflow Duration; tokio treats MAX as "never"
            Duration::try_from_secs_f64(-self.tokens / self.refill_per_second)
                .unwrap_or(Duration::MAX)
        }
    }
}

pub struct RateLimiter;

pub struct RateLimiterArgs {
    pub name: String,
    pub config: RateLimitConfig,
}

pub struct RateLimiterState {
    name: String,
    bucket: TokenBucket,
    granted: u64,
    delayed: u64,
}

#[derive(Debug)]
pub enum RateLimiterMessage {
    /// Reserve one slot; the reply is how long to wait before using it
    Acquire(RpcReplyPort<Duration>),
    GetStats(RpcReplyPort<RateLimiterStats>),
}

#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    pub name: String,
    pub granted: u64,
    pub delayed: u64,
}

#[ractor::async_trait]
impl Actor for RateLimiter {
    type Msg = RateLimiterMessage;
    type State = RateLimiterState;
    type Arguments = RateLimiterArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> std::result::Result<Self::State, ActorProcessingErr> {
        debug!(
            limit = %args.name,
            capacity = args.config.capacity,
            refill_per_second = args.config.refill_per_second,
            "Rate limiter starting"
        );

        Ok(RateLimiterState {
            bucket: TokenBucket::new(&args.config, Instant::now()),
            name: args.name,
            granted: 0,
            delayed: 0,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> std::result::Result<(), ActorProcessingErr> {
        match message {
            RateLimiterMessage::Acquire(reply) => {
                let wait = state.bucket.reserve(Instant::now());
                state.granted += 1;
                if !wait.is_zero() {
                    state.delayed += 1;
                }
                if reply.send(wait).is_err() {
                    debug!(limit = %state.name, "Acquire caller went away");
                }
            }
            RateLimiterMessage::GetStats(reply) => {
                let stats = RateLimiterStats {
                    name: state.name.clone(),
                    granted: state.granted,
                    delayed: state.delayed,
                };
                if reply.send(stats).is_err() {
                    debug!(limit = %state.name, "Stats caller went away");
                }
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> std::result::Result<(), ActorProcessingErr> {
        info!(
            limit = %state.name,
            granted = state.granted,
            delayed = state.delayed,
            "Rate limiter stopped"
        );
        Ok(())
    }
}

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Named rate limits shared by every task in a run.
#[derive(Clone, Default)]
pub struct RateLimits {
    limiters: HashMap<String, ActorRef<RateLimiterMessage>>,
}

impl RateLimits {
    pub async fn spawn(limits: impl IntoIterator<Item = (String, RateLimitConfig)>) -> Result<Self> {
        let mut limiters = HashMap::new();

        for (name, config) in limits {
            if config.capacity == 0 || !(config.refill_per_second > 0.0) {
                return Err(GitHubStarsError::RateLimiterUnavailable(format!(
                    "limit {} needs a capacity of at least 1 and a positive refill rate",
                    name
                )));
            }

            let args = RateLimiterArgs {
                name: name.clone(),
                config,
            };
            let (actor_ref, _handle) = Actor::spawn(None, RateLimiter, args)
                .await
                .map_err(|e| {
                    GitHubStarsError::RateLimiterUnavailable(format!("Failed to spawn {}: {}", name, e))
                })?;
            limiters.insert(name, actor_ref);
        }

        Ok(Self { limiters })
    }

    /// Reserves a slot and returns the wait before it may be used, or `None`
    /// when no limit with this name exists.
    pub async fn reserve(&self, name: &str) -> Result<Option<Duration>> {
        let Some(limiter) = self.limiters.get(name) else {
            return Ok(None);
        };

        match limiter
            .call(RateLimiterMessage::Acquire, Some(CALL_TIMEOUT))
            .await
            .map_err(|e| GitHubStarsError::RateLimiterUnavailable(format!("{}: {}", name, e)))?
        {
            CallResult::Success(wait) => Ok(Some(wait)),
            CallResult::Timeout => Err(GitHubStarsError::RateLimiterUnavailable(format!(
                "{}: timed out waiting for a slot",
                name
            ))),
            CallResult::SenderError => Err(GitHubStarsError::RateLimiterUnavailable(format!(
                "{}: limiter dropped the request",
                name
            ))),
        }
    }

    /// Blocks until a slot of the named limit is available. Unknown names
    /// do not block.
    pub async fn acquire(&self, name: &str) -> Result<()> {
        match self.reserve(name).await? {
            None => {
                warn!(limit = name, "Rate limit not configured, proceeding without it");
            }
            Some(wait) if !wait.is_zero() => {
                debug!(limit = name, wait_ms = wait.as_millis() as u64, "Waiting for rate limit slot");
                sleep(wait).await;
            }
            Some(_) => {}
        }
        Ok(())
    }

    pub async fn stats(&self, name: &str) -> Result<Option<RateLimiterStats>> {
        let Some(limiter) = self.limiters.get(name) else {
            return Ok(None);
        };

        match limiter
            .call(RateLimiterMessage::GetStats, Some(CALL_TIMEOUT))
            .await
            .map_err(|e| GitHubStarsError::RateLimiterUnavailable(format!("{}: {}", name, e)))?
        {
            CallResult::Success(stats) => Ok(Some(stats)),
            _ => Err(GitHubStarsError::RateLimiterUnavailable(format!(
                "{}: no stats reply",
                name
            ))),
        }
    }

    pub fn shutdown(&self) {
        for limiter in self.limiters.values() {
            limiter.stop(None);
        }
    }
}
