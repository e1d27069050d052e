use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(test)]
use mock_instant::Instant;
#[cfg(not(test))]
use std::time::Instant;

#[derive(Error, Debug)]
pub enum RateLimitError {
    #[error("Counter store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Fixed-window budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u64,
    pub window: Duration,
}

impl RateLimitPolicy {
    /// Appointment and doctor-management endpoints, keyed by user id.
    pub const API: Self = Self {
        max_requests: 30,
        window: Duration::from_secs(60),
    };

    /// Credential checks, keyed by normalized email.
    pub const SIGN_IN: Self = Self {
        max_requests: 5,
        window: Duration::from_secs(15 * 60),
    };
}

/// Backing store for fixed-window counters.
///
/// `increment` bumps the counter for `key` and returns the count within the
/// current window; the window starts at the first hit and lasts `window`.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, RateLimitError>;
}

struct WindowEntry {
    count: u64,
    reset_at: Instant,
}

/// Process-local counters. Only correct for a single running instance.
#[derive(Default)]
pub struct InMemoryCounterStore {
    entries: Mutex<HashMap<String, WindowEntry>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, RateLimitError> {
        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| RateLimitError::StoreUnavailable("counter map poisoned".to_string()))?;

        entries.retain(|_, entry| entry.reset_at > now);

        let entry = entries.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            reset_at: now + window,
        });
        entry.count += 1;

        Ok(entry.count)
    }
}

/// Counters shared by every instance through Redis.
pub struct RedisCounterStore {
    pool: Pool,
}

impl RedisCounterStore {
    pub fn new(redis_url: &str) -> Result<Self, RateLimitError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| RateLimitError::StoreUnavailable(format!("Pool creation error: {}", e)))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, RateLimitError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| RateLimitError::StoreUnavailable(format!("Connection error: {}", e)))?;

        let (count, ttl): (u64, i64) = redis::pipe()
            .atomic()
            .incr(key, 1u64)
            .pttl(key)
            .query_async(&mut conn)
            .await?;

        // Also re-arms a key whose earlier PEXPIRE never landed.
        if missing_expiry(ttl) {
            let _: () = conn.pexpire(key, window_millis(window)).await?;
        }

        Ok(count)
    }
}

/// `PTTL` answers -1 for a key that exists without an expiry.
fn missing_expiry(pttl: i64) -> bool {
    pttl == -1
}

fn window_millis(window: Duration) -> i64 {
    i64::try_from(window.as_millis()).unwrap_or(i64::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u64,
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    policy: RateLimitPolicy,
    prefix: String,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, policy: RateLimitPolicy, prefix: &str) -> Self {
        Self {
            store,
            policy,
            prefix: prefix.to_string(),
        }
    }

    /// Counts one hit for `identity`. A failing store lets the request through.
    pub async fn check(&self, identity: &str) -> RateLimitDecision {
        let key = format!("{}:{}", self.prefix, identity);

        match self.store.increment(&key, self.policy.window).await {
            Ok(count) => {
                let decision = RateLimitDecision {
                    allowed: count <= self.policy.max_requests,
                    remaining: self.policy.max_requests.saturating_sub(count),
                };
                if !decision.allowed {
                    debug!("Rate limit exceeded for {}", key);
                }
                decision
            }
            Err(e) => {
                warn!("Rate limit store failed for {}: {}", key, e);
                RateLimitDecision {
                    allowed: true,
                    remaining: self.policy.max_requests,
                }
            }
        }
    }
}
