//! Admission Limiter
//!
//! Per-caller token buckets guarding the dispatch endpoint.
//!
//! Each bucket stores a theoretical arrival time instead of a fractional token
//! count: a request is admitted once `now` is within `tolerance` of it, and
//! every admission pushes it one emission interval further. All arithmetic is
//! on `Duration`, so no drift accumulates across refills.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::Instant;

/// A request could not be admitted within the allowed wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttled {
    /// How long the caller would have had to wait
    pub retry_after: Duration,
}

impl std::fmt::Display for Throttled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rate limit exceeded, retry after {}ms",
            self.retry_after.as_millis()
        )
    }
}

struct Bucket {
    /// Instant at which the bucket would be completely refilled
    theoretical_arrival: Instant,
}

pub struct AdmissionLimiter {
    /// Time for one token to refill
    interval: Duration,
    /// How far ahead of `now` the arrival time may run; `burst - 1` intervals
    tolerance: Duration,
    buckets: DashMap<String, Arc<Mutex<Bucket>>>,
}

impl AdmissionLimiter {
    /// Zero `per_second` or `burst` is clamped to one.
    pub fn new(per_second: u32, burst: u32) -> Self {
        let interval = Duration::from_secs(1) / per_second.max(1);
        let tolerance = interval * (burst.max(1) - 1);

        Self {
            interval,
            tolerance,
            buckets: DashMap::new(),
        }
    }

    fn bucket(&self, key: &str) -> Arc<Mutex<Bucket>> {
        if let Some(bucket) = self.buckets.get(key) {
            return bucket.clone();
        }

        self.buckets
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(Bucket {
                    theoretical_arrival: Instant::now(),
                }))
            })
            .clone()
    }

    /// Claim the next slot for `key` if it opens within `max_wait`
    ///
    /// Returns how long the caller must wait before its slot opens. A claimed
    /// slot is never returned, so callers that wait are served in claim order.
    fn reserve(&self, key: &str, max_wait: Duration) -> Result<Duration, Throttled> {
        let bucket = self.bucket(key);
        let mut bucket = bucket.lock();

        let now = Instant::now();
        let arrival = bucket.theoretical_arrival.max(now);
        let wait = arrival.duration_since(now).saturating_sub(self.tolerance);

        if wait > max_wait {
            return Err(Throttled { retry_after: wait });
        }

        bucket.theoretical_arrival = arrival + self.interval;
        Ok(wait)
    }

    /// Take a token for `key` only if one is available right now
    pub fn allow(&self, key: &str) -> bool {
        self.reserve(key, Duration::ZERO).is_ok()
    }

    /// Wait for a token for `key`, giving up if that takes longer than `max_wait`
    ///
    /// Returns the time spent waiting.
    pub async fn acquire(&self, key: &str, max_wait: Duration) -> Result<Duration, Throttled> {
        let wait = self.reserve(key, max_wait)?;

        if !wait.is_zero() {
            tracing::debug!(key, wait_ms = wait.as_millis() as u64, "Pacing admission");
            tokio::time::sleep(wait).await;
        }

        Ok(wait)
    }
}
