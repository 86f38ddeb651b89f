//! Process-local token buckets.
//!
//! Buckets refill by elapsed-time arithmetic on access, so there is no
//! background task. State is per-replica: running more than one server
//! multiplies every budget by the replica count, a known limitation of the
//! single-replica design.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;

/// Entry count that triggers a prune of idle buckets.
const PRUNE_THRESHOLD: usize = 10_000;

/// A bucket idle this long is forgotten (it would be full anyway).
const IDLE_SECS: f64 = 600.0;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refreshed: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    rate_per_sec: f64,
    burst: f64,
}

impl RateLimiter {
    /// `per_minute` requests sustained, with the same value as burst
    /// headroom.
    pub fn per_minute(per_minute: u32) -> Self {
        let per_minute = per_minute.max(1) as f64;

        Self {
            buckets: Mutex::new(HashMap::new()),
            rate_per_sec: per_minute / 60.0,
            burst: per_minute,
        }
    }

    /// Takes one token for `key`, refilling first. Returns false when the
    /// bucket is dry.
    pub fn try_acquire(&self, key: &str) -> bool {
        self.try_acquire_at(key, Instant::now())
    }

    fn try_acquire_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock();

        if buckets.len() >= PRUNE_THRESHOLD {
            buckets.retain(|_, bucket| {
                now.duration_since(bucket.refreshed).as_secs_f64() < IDLE_SECS
            });
        }

        let bucket = buckets.entry(key.to_owned()).or_insert(Bucket {
            tokens: self.burst,
            refreshed: now,
        });

        let elapsed = now.duration_since(bucket.refreshed).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate_per_sec).min(self.burst);
        bucket.refreshed = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn burst_then_dry() {
        let limiter = RateLimiter::per_minute(3);
        let now = Instant::now();

        assert!(limiter.try_acquire_at("u", now));
        assert!(limiter.try_acquire_at("u", now));
        assert!(limiter.try_acquire_at("u", now));
        assert!(!limiter.try_acquire_at("u", now));
    }

    #[test]
    fn refills_over_time() {
        let limiter = RateLimiter::per_minute(60);
        let start = Instant::now();

        for _ in 0..60 {
            assert!(limiter.try_acquire_at("u", start));
        }
        assert!(!limiter.try_acquire_at("u", start));

        // one token per second at 60/min
        assert!(limiter.try_acquire_at("u", start + Duration::from_millis(1_100)));
        assert!(!limiter.try_acquire_at("u", start + Duration::from_millis(1_150)));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::per_minute(1);
        let now = Instant::now();

        assert!(limiter.try_acquire_at("a", now));
        assert!(limiter.try_acquire_at("b", now));
        assert!(!limiter.try_acquire_at("a", now));
    }
}
