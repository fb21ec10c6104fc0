//! Concurrency utilities for domain lookups.
//!
//! WHOIS servers throttle aggressively and per source address, so every
//! lookup takes a token from its destination host's bucket before
//! connecting. Buckets are shared by all in-flight lookups.

use crate::types::RateLimit;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Longest single sleep; the bucket is re-checked after each one.
const MAX_PACING_WAIT: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refreshed: Instant,
}

/// Per-host token bucket limiter.
#[derive(Debug)]
pub struct HostRateLimiter {
    limit: Option<RateLimit>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl HostRateLimiter {
    /// Create a limiter; `None` (or a non-positive rate) never waits.
    pub fn new(limit: Option<RateLimit>) -> Self {
        let limit = limit.filter(|l| l.per_second.is_finite() && l.per_second > 0.0);
        Self {
            limit,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn limit(&self) -> Option<RateLimit> {
        self.limit
    }

    /// Wait until a request to `host` is allowed, then consume one token.
    pub async fn acquire(&self, host: &str) {
        let Some(limit) = self.limit else {
            return;
        };
        let capacity = f64::from(limit.burst.max(1));

        loop {
            let wait = {
                let mut buckets = self.buckets.lock().await;
                let now = Instant::now();
                let bucket = buckets.entry(host.to_string()).or_insert_with(|| Bucket {
                    tokens: capacity,
                    refreshed: now,
                });

                let elapsed = now.duration_since(bucket.refreshed).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * limit.per_second).min(capacity);
                bucket.refreshed = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }

                pacing_wait(1.0 - bucket.tokens, limit.per_second)
            };

            tracing::debug!(host, wait_ms = wait.as_millis() as u64, "pacing request");
            tokio::time::sleep(wait).await;
        }
    }
}

/// Time until `missing` tokens have refilled, capped at [`MAX_PACING_WAIT`].
fn pacing_wait(missing: f64, per_second: f64) -> Duration {
    Duration::try_from_secs_f64(missing / per_second)
        .unwrap_or(MAX_PACING_WAIT)
        .min(MAX_PACING_WAIT)
}

impl Default for HostRateLimiter {
    fn default() -> Self {
        Self::new(Some(RateLimit::default()))
    }
}
