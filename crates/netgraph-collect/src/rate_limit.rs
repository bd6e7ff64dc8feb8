use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use netgraph_core::{ProviderError, RateLimitConfig};
use std::num::NonZeroU32;
use std::time::Duration;

type LimiterKey = (String, String);
type KeyedLimiter = RateLimiter<LimiterKey, DefaultKeyedStateStore<LimiterKey>, DefaultClock>;

/// Process-local token bucket per (service, region) key. Every key shares
/// the same refill rate and burst capacity; buckets are created lazily on
/// first acquire. Safe under concurrent acquire calls.
pub struct ApiRateLimiter {
    limiter: KeyedLimiter,
    acquire_timeout: Duration,
}

impl ApiRateLimiter {
    pub fn new(config: &RateLimitConfig, acquire_timeout: Duration) -> Self {
        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(rate).allow_burst(burst);
        Self {
            limiter: RateLimiter::keyed(quota),
            acquire_timeout,
        }
    }

    /// Wait for a token for the given key, up to the configured deadline.
    /// A deadline miss surfaces as a retryable throttle error rather than
    /// blocking indefinitely.
    pub async fn acquire(&self, service: &str, region: &str) -> Result<(), ProviderError> {
        let key = (service.to_string(), region.to_string());
        match tokio::time::timeout(self.acquire_timeout, self.limiter.until_key_ready(&key)).await {
            Ok(()) => Ok(()),
            Err(_) => Err(ProviderError::Throttled(format!(
                "rate limit token for {}/{} not available within {:?}",
                service, region, self.acquire_timeout
            ))),
        }
    }

    /// Non-blocking probe, mainly for tests and health checks.
    pub fn try_acquire(&self, service: &str, region: &str) -> bool {
        let key = (service.to_string(), region.to_string());
        self.limiter.check_key(&key).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rate: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second: rate,
            burst,
        }
    }

    #[tokio::test]
    async fn burst_is_honored_then_exhausted() {
        // 1 token/sec refill, burst of 3: three immediate acquires pass,
        // the fourth cannot be served within a 10ms deadline.
        let limiter = ApiRateLimiter::new(&config(1, 3), Duration::from_millis(10));
        for _ in 0..3 {
            limiter.acquire("ec2", "us-east-1").await.unwrap();
        }
        let err = limiter.acquire("ec2", "us-east-1").await.unwrap_err();
        assert!(err.is_retryable(), "deadline miss must be retryable: {err}");
    }

    #[tokio::test]
    async fn keys_have_independent_buckets() {
        let limiter = ApiRateLimiter::new(&config(1, 1), Duration::from_millis(10));
        limiter.acquire("ec2", "us-east-1").await.unwrap();
        // Same service, different region: fresh bucket.
        limiter.acquire("ec2", "eu-west-1").await.unwrap();
        // Different service, same region: fresh bucket.
        limiter.acquire("rds", "us-east-1").await.unwrap();
        assert!(!limiter.try_acquire("ec2", "us-east-1"));
    }
}
