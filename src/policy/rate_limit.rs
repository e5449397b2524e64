//! Token-bucket rate limiting, one bucket per route path.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use crate::routing::route::RateLimitPolicy;

/// A single token bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Per-path rate limiter. Buckets are created lazily on first use and
/// survive route-table replacements.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether one request may pass for the given route path.
    pub fn allow(&self, path: &str, policy: &RateLimitPolicy) -> bool {
        let capacity = policy.burst as f64;
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let bucket = buckets
            .entry(path.to_string())
            .or_insert_with(|| TokenBucket::new(capacity));

        bucket.try_acquire(capacity, policy.requests_per_second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn policy(rps: f64, burst: u32) -> RateLimitPolicy {
        RateLimitPolicy {
            requests_per_second: rps,
            burst,
        }
    }

    #[test]
    fn test_burst_then_denial() {
        let limiter = RateLimiter::new();
        let p = policy(1.0, 2);

        assert!(limiter.allow("/api", &p));
        assert!(limiter.allow("/api", &p));
        assert!(!limiter.allow("/api", &p));
    }

    #[test]
    fn test_refill_after_wait() {
        let limiter = RateLimiter::new();
        let p = policy(10.0, 1);

        assert!(limiter.allow("/fast", &p));
        assert!(!limiter.allow("/fast", &p));

        // 10 rps refills one token in ~100ms.
        thread::sleep(Duration::from_millis(150));
        assert!(limiter.allow("/fast", &p));
    }

    #[test]
    fn test_tokens_capped_at_burst() {
        let limiter = RateLimiter::new();
        let p = policy(100.0, 2);

        assert!(limiter.allow("/cap", &p));
        // Plenty of time to refill far beyond the burst cap.
        thread::sleep(Duration::from_millis(100));

        assert!(limiter.allow("/cap", &p));
        assert!(limiter.allow("/cap", &p));
        assert!(!limiter.allow("/cap", &p));
    }

    #[test]
    fn test_paths_are_independent() {
        let limiter = RateLimiter::new();
        let p = policy(1.0, 1);

        assert!(limiter.allow("/a", &p));
        assert!(!limiter.allow("/a", &p));
        assert!(limiter.allow("/b", &p));
    }
}
