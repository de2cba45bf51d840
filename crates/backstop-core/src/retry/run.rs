//! Retry loop: run an async operation until success or policy says stop.

use std::fmt::Display;
use std::future::Future;

use super::policy::{RetryDecision, RetryPolicy};

/// Runs `operation` until it succeeds or the retry policy says to stop.
///
/// On retryable failure, notifies the policy's observer, sleeps for the
/// backoff duration, then tries again. The last error is returned exactly as
/// the operation produced it.
pub async fn run_with_retry<T, E, F, Fut>(policy: &RetryPolicy<E>, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => match policy.decide(attempt, &e) {
                RetryDecision::NoRetry => {
                    tracing::debug!(attempt, max_attempts = policy.max_attempts, error = %e, "giving up");
                    return Err(e);
                }
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "attempt failed, retrying"
                    );
                    if let Some(observer) = policy.observer() {
                        observer.on_retry(attempt, &e, delay);
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            },
        }
    }
}
