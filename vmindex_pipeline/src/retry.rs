use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::warn;
use vmindex_core::{Error, Result};

/// Backoff schedule for per-record calls.
///
/// One attempt is made per delay plus a final attempt, so an empty
/// schedule means a single try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delays: Vec<Duration>,
}

impl RetryPolicy {
    #[must_use]
    pub const fn none() -> Self {
        Self { delays: Vec::new() }
    }

    #[must_use]
    pub fn from_millis(delays: &[u64]) -> Self {
        Self {
            delays: delays.iter().copied().map(Duration::from_millis).collect(),
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(&[250, 1000])
    }
}

/// Retry an async operation with backoff.
///
/// Only transient errors are retried; anything else returns immediately.
///
/// # Returns
/// The result of the first successful attempt, or the last error.
pub async fn retry_with_backoff<F, Fut, T>(
    mut operation: F,
    policy: &RetryPolicy,
    label: &str,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts();

    for (i, delay) in policy.delays.iter().enumerate() {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                warn!(
                    "{label} failed (attempt {}/{attempts}): {e}. Retrying after {}ms...",
                    i + 1,
                    delay.as_millis()
                );
                sleep(*delay).await;
            }
            Err(e) => return Err(e),
        }
    }

    operation().await
}

/// Bound a call by `limit`; on expiry the call fails with the error built
/// by `on_timeout`. The underlying future is dropped, not left running.
pub async fn bounded<T, Fut, E>(limit: Duration, call: Fut, on_timeout: E) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
    E: FnOnce(String) -> Error,
{
    timeout(limit, call).await.unwrap_or_else(|_| {
        Err(on_timeout(format!(
            "timed out after {}ms",
            limit.as_millis()
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy::from_millis(&[1, 2])
    }

    #[tokio::test]
    async fn retry_succeeds_on_first_attempt() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), Error>(())
                }
            },
            &fast(),
            "test",
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_succeeds_after_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if count < 3 {
                        Err(Error::EmbeddingUnavailable("fail".to_string()))
                    } else {
                        Ok(())
                    }
                }
            },
            &fast(),
            "test",
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_fails_after_all_attempts() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result: Result<()> = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(Error::StoreUnavailable("fail".to_string()))
                }
            },
            &fast(),
            "test",
        )
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3); // 2 delays + final
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result: Result<()> = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(Error::EmbeddingMalformed("empty".to_string()))
                }
            },
            &fast(),
            "test",
        )
        .await;
        assert!(matches!(result, Err(Error::EmbeddingMalformed(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bounded_times_out() {
        let result: Result<()> = bounded(
            Duration::from_millis(10),
            async {
                sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            Error::StoreUnavailable,
        )
        .await;
        assert_eq!(
            result,
            Err(Error::StoreUnavailable("timed out after 10ms".to_string()))
        );
    }

    #[test]
    fn default_policy_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts(), 3);
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
    }
}
