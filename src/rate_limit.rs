use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Token-bucket rate limiter keyed by client identifier.
///
/// Buckets allow bursts up to `burst_limit` and refill `refill_rate` tokens
/// per elapsed `refill_interval` (coarse-grained: whole intervals only).
/// Buckets are created lazily on first request per key and never evicted, so
/// memory grows with the number of distinct client keys.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    burst_limit: f64,
    refill_rate: f64,
    refill_interval: Duration,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(burst_limit: u32, refill_rate: u32, refill_interval: Duration) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            burst_limit: burst_limit as f64,
            refill_rate: refill_rate as f64,
            refill_interval,
        }
    }

    /// Consumes one token for `key`, or returns `Error::RateLimited` with a
    /// retry hint. No token is consumed on rejection.
    pub fn check(&self, key: &str) -> Result<()> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<()> {
        // One lock per call keeps the refill + consume read-modify-write
        // atomic with respect to concurrent requests for the same key.
        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.burst_limit,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill);
        let intervals = (elapsed.as_millis() / self.refill_interval.as_millis().max(1)) as f64;
        bucket.tokens = (bucket.tokens + intervals * self.refill_rate).min(self.burst_limit);
        bucket.last_refill = now;

        if bucket.tokens < 1.0 {
            let interval_ms = self.refill_interval.as_millis() as u64;
            let remainder_ms = interval_ms - (elapsed.as_millis() as u64 % interval_ms);
            return Err(Error::RateLimited {
                retry_after_secs: remainder_ms.div_ceil(1000),
            });
        }

        bucket.tokens -= 1.0;
        Ok(())
    }
}
