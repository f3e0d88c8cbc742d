//! Endpoint-scoped request rate limiting
//!
//! Opt-in token bucket: each endpoint key gets its own bucket replenished
//! at a fixed rate. Acquiring waits until the request may proceed; it never
//! rejects and never retries anything.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Token bucket over a monotonic clock
#[derive(Debug)]
struct TokenBucket {
    rate: f64,
    capacity: f64,
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(rate: f64, capacity: f64) -> Self {
        Self {
            rate,
            capacity,
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    /// Take `tokens` from the bucket, returning how long the caller must
    /// wait before proceeding. Zero means the request may go immediately.
    fn acquire(&mut self, tokens: f64) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_update = now;

        if tokens <= self.tokens {
            self.tokens -= tokens;
            return Duration::ZERO;
        }
        Duration::from_secs_f64((tokens - self.tokens) / self.rate)
    }
}

/// Per-endpoint rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    pub fn new(rate: f64, capacity: f64) -> Self {
        Self {
            rate,
            capacity,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Wait until a request to `key` is allowed.
    pub async fn acquire(&self, key: &str) {
        let wait = {
            let mut buckets = self.buckets.lock().await;
            let bucket = buckets
                .entry(key.to_string())
                .or_insert_with(|| TokenBucket::new(self.rate, self.capacity));
            bucket.acquire(1.0)
        };

        if !wait.is_zero() {
            tracing::debug!(endpoint = %key, wait_ms = wait.as_millis() as u64, "rate limit backoff");
            tokio::time::sleep(wait).await;
        }
    }
}
