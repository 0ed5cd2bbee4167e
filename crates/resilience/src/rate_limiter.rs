//! Per-endpoint token-bucket rate limiting.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Rate limit parameters for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per window.
    pub max_requests: u32,
    /// Window length in milliseconds.
    pub window_size_ms: u64,
    /// Whether the whole window budget may be consumed at once. When
    /// false, tokens drip in at the average rate and the bucket holds
    /// one.
    pub burst_allowed: bool,
}

impl RateLimitConfig {
    fn capacity(&self) -> f64 {
        if self.burst_allowed {
            f64::from(self.max_requests.max(1))
        } else {
            1.0
        }
    }

    fn refill_per_ms(&self) -> f64 {
        f64::from(self.max_requests.max(1)) / self.window_size_ms.max(1) as f64
    }
}

/// The outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The request may proceed.
    Allowed {
        /// Whole requests still available in the bucket.
        remaining_requests: u32,
        /// Milliseconds until the bucket is full again.
        reset_time_ms: u64,
    },
    /// The request must wait.
    RateLimited {
        /// Milliseconds until the bucket is full again.
        reset_time_ms: u64,
        /// Milliseconds until one request's worth of budget is back.
        retry_after_ms: u64,
    },
}

impl RateLimitDecision {
    /// Returns `true` when the request may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

#[derive(Debug)]
struct Bucket {
    config: RateLimitConfig,
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            tokens: config.capacity(),
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed_ms = now.duration_since(self.last_refill).as_secs_f64() * 1_000.0;
        self.tokens =
            (self.tokens + elapsed_ms * self.config.refill_per_ms()).min(self.config.capacity());
        self.last_refill = now;
    }

    fn try_acquire(&mut self, now: Instant) -> RateLimitDecision {
        self.refill(now);

        let refill = self.config.refill_per_ms();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            let missing = self.config.capacity() - self.tokens;
            RateLimitDecision::Allowed {
                remaining_requests: self.tokens as u32,
                reset_time_ms: (missing / refill).ceil() as u64,
            }
        } else {
            let missing = self.config.capacity() - self.tokens;
            RateLimitDecision::RateLimited {
                reset_time_ms: (missing / refill).ceil() as u64,
                retry_after_ms: ((1.0 - self.tokens) / refill).ceil() as u64,
            }
        }
    }
}

/// Token buckets keyed by endpoint name.
///
/// Endpoints must be registered before use; checking an unregistered
/// endpoint allows the request, on the grounds that an unlimited
/// endpoint is not an error.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    /// Create a limiter with no endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an endpoint's limit.
    pub fn register(&self, endpoint: impl Into<String>, config: RateLimitConfig) {
        self.buckets
            .lock()
            .insert(endpoint.into(), Bucket::new(config));
    }

    /// Check whether a request to the endpoint may proceed, consuming
    /// budget if so.
    pub fn try_acquire(&self, endpoint: &str) -> RateLimitDecision {
        let mut buckets = self.buckets.lock();
        match buckets.get_mut(endpoint) {
            Some(bucket) => bucket.try_acquire(Instant::now()),
            None => RateLimitDecision::Allowed {
                remaining_requests: u32::MAX,
                reset_time_ms: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bursty(max: u32, window_ms: u64) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: max,
            window_size_ms: window_ms,
            burst_allowed: true,
        }
    }

    #[test]
    fn burst_budget_is_consumable_at_once() {
        let limiter = RateLimiter::new();
        limiter.register("api", bursty(3, 1_000));

        assert!(limiter.try_acquire("api").is_allowed());
        assert!(limiter.try_acquire("api").is_allowed());
        assert!(limiter.try_acquire("api").is_allowed());

        match limiter.try_acquire("api") {
            RateLimitDecision::RateLimited { retry_after_ms, .. } => {
                assert!(retry_after_ms > 0);
            }
            other => panic!("expected rate limited, got {other:?}"),
        }
    }

    #[test]
    fn remaining_counts_down() {
        let limiter = RateLimiter::new();
        limiter.register("api", bursty(3, 60_000));

        let first = limiter.try_acquire("api");
        let RateLimitDecision::Allowed {
            remaining_requests, ..
        } = first
        else {
            panic!("expected allowed")
        };
        assert_eq!(remaining_requests, 2);
    }

    #[test]
    fn no_burst_holds_a_single_token() {
        let limiter = RateLimiter::new();
        limiter.register(
            "drip",
            RateLimitConfig {
                max_requests: 100,
                window_size_ms: 60_000,
                burst_allowed: false,
            },
        );

        assert!(limiter.try_acquire("drip").is_allowed());
        assert!(!limiter.try_acquire("drip").is_allowed());
    }

    #[test]
    fn tokens_refill_over_time() {
        let config = bursty(10, 100);
        let mut bucket = Bucket::new(config);
        let start = Instant::now();

        for _ in 0..10 {
            assert!(bucket.try_acquire(start).is_allowed());
        }
        assert!(!bucket.try_acquire(start).is_allowed());

        // One window later the whole budget is back.
        let later = start + Duration::from_millis(100);
        bucket.refill(later);
        assert!((bucket.tokens - 10.0).abs() < 1e-6);
    }

    #[test]
    fn unregistered_endpoint_is_unlimited() {
        let limiter = RateLimiter::new();
        assert!(limiter.try_acquire("anything").is_allowed());
    }

    #[test]
    fn reset_time_reflects_missing_budget() {
        let config = bursty(10, 1_000);
        let mut bucket = Bucket::new(config);
        let start = Instant::now();

        let decision = bucket.try_acquire(start);
        let RateLimitDecision::Allowed { reset_time_ms, .. } = decision else {
            panic!("expected allowed")
        };
        // One token of ten missing at 10 tokens/second: 100ms to full.
        assert_eq!(reset_time_ms, 100);
    }
}
