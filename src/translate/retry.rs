//! Bounded retry with exponential backoff around a single external call.
//! Transient errors are retried up to `max_retries` times (so at most
//! `max_retries + 1` attempts); fatal errors return immediately.
//! The wait before retry n (1-based) is `base_delay * 2^(n-1)`.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// No waiting between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO)
    }

    /// Backoff before the given retry (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Run `call` until it succeeds, fails fatally, or the retry budget is spent.
    /// The last observed error is returned as-is.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut retries: u32 = 0;

        loop {
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                warn!(operation, status = ?err.status(), error = %err, "fatal service error, not retrying");
                return Err(err);
            }
            if retries >= self.max_retries {
                warn!(
                    operation,
                    attempts = retries + 1,
                    status = ?err.status(),
                    error = %err,
                    "retry budget exhausted"
                );
                return Err(err);
            }

            retries += 1;
            let wait = self.delay_for(retries);
            warn!(
                operation,
                retry = retries,
                status = ?err.status(),
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "transient service error, retrying"
            );
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn status_error(status: u16, attempt: u32) -> ServiceError {
        ServiceError::from_status(status, format!("attempt {attempt}"), true)
    }

    #[tokio::test]
    async fn succeeds_after_two_server_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::immediate(2);

        let result = policy
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(status_error(500, n))
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::immediate(2);

        let result: Result<(), _> = policy
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(status_error(503, n))
            })
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(result, Err(status_error(503, 3)));
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::immediate(3);

        let result: Result<(), _> = policy
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(status_error(400, n))
            })
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().status(), Some(400));
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::immediate(0);

        let result: Result<(), _> = policy
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::timeout("slow"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(RetryPolicy::immediate(4).delay_for(3), Duration::ZERO);
    }
}
