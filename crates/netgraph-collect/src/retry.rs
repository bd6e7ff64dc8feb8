use netgraph_core::{CollectionError, ProviderError, RetryConfig};
use rand::Rng;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

/// Exponential backoff with jitter: attempt n waits min(base * 2^n, max)
/// plus a uniform draw from [0, base).
fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt)).min(max);
    let base_ms = base.as_millis() as u64;
    if base_ms == 0 {
        return exp;
    }
    let jitter = rand::rng().random_range(0..base_ms);
    exp + Duration::from_millis(jitter)
}

/// Wraps a single remote call with bounded retries. Retryable failures
/// (throttle, timeout, 5xx class) are re-attempted up to the budget; fatal
/// failures (auth, validation) terminate the call immediately. Exhausting
/// the budget surfaces the last error for that call only, never for the
/// whole pipeline.
pub struct RetryPolicy {
    config: RetryConfig,
    retries: Mutex<BTreeMap<String, u64>>,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            retries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Retries performed by one call site since this policy was built.
    pub fn retry_count(&self, op_name: &str) -> u64 {
        self.retries
            .lock()
            .map(|counts| counts.get(op_name).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Per-call-site retry counters, keyed by operation name.
    pub fn retry_counts(&self) -> BTreeMap<String, u64> {
        self.retries
            .lock()
            .map(|counts| counts.clone())
            .unwrap_or_default()
    }

    fn note_retry(&self, op_name: &str) {
        if let Ok(mut counts) = self.retries.lock() {
            *counts.entry(op_name.to_string()).or_insert(0) += 1;
        }
    }

    pub async fn execute<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T, CollectionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let attempts = self.config.max_attempts.max(1);
        let mut last: Option<ProviderError> = None;

        for attempt in 0..attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => {
                    warn!(op = op_name, error = %e, "non-retryable provider error");
                    return Err(CollectionError::Fatal(e));
                }
                Err(e) => {
                    last = Some(e);
                    if attempt + 1 < attempts {
                        self.note_retry(op_name);
                        let delay =
                            backoff_delay(attempt, self.config.base_delay(), self.config.max_delay());
                        warn!(
                            op = op_name,
                            attempt = attempt + 1,
                            max_attempts = attempts,
                            delay_ms = delay.as_millis() as u64,
                            "retryable provider error, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(CollectionError::Exhausted {
            attempts,
            source: last.unwrap_or_else(|| ProviderError::Unavailable("no attempt executed".into())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 4,
        }
    }

    #[tokio::test]
    async fn always_retryable_makes_exactly_max_attempts_calls() {
        let policy = RetryPolicy::new(fast_config(4));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute("list_page", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::Throttled("slow down".into())) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(policy.retry_count("list_page"), 3);
        match result {
            Err(CollectionError::Exhausted { attempts, .. }) => assert_eq!(attempts, 4),
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn retries_are_counted_per_call_site() {
        let policy = RetryPolicy::new(fast_config(2));

        let _: Result<(), _> = policy
            .execute("network:list_vpc", || async {
                Err(ProviderError::Throttled("slow down".into()))
            })
            .await;
        let _: Result<(), _> = policy
            .execute("compute:list_compute_instance", || async {
                Err(ProviderError::Timeout("30s".into()))
            })
            .await;

        assert_eq!(policy.retry_count("network:list_vpc"), 1);
        assert_eq!(policy.retry_count("compute:list_compute_instance"), 1);
        assert_eq!(policy.retry_count("never_called"), 0);
        assert_eq!(policy.retry_counts().len(), 2);
    }

    #[tokio::test]
    async fn fatal_error_short_circuits() {
        let policy = RetryPolicy::new(fast_config(5));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute("list_page", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::Auth("bad key".into())) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(CollectionError::Fatal(_))));
    }

    #[tokio::test]
    async fn success_after_transient_failures() {
        let policy = RetryPolicy::new(fast_config(3));
        let calls = AtomicU32::new(0);

        let result = policy
            .execute("list_page", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ProviderError::Unavailable("503".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn backoff_is_capped_and_jittered() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(300);
        for attempt in 0..8 {
            let delay = backoff_delay(attempt, base, max);
            assert!(delay >= base.min(max));
            // capped exponent plus at most one base of jitter
            assert!(delay < max + base);
        }
    }
}
