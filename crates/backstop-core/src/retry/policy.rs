use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::classify::{ai_retry_condition, default_retry_condition, RetryClass};
use super::observer::RetryObserver;
use crate::config::RetryConfig;

/// Shared retry predicate: `true` means the failure is worth another attempt.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffMode {
    /// `base * attempt`
    Linear,
    /// `base * 2^(attempt - 1)`
    #[default]
    Exponential,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Retry policy for one call-site.
///
/// Immutable once built; the same policy can drive any number of
/// [`run_with_retry`](super::run_with_retry) calls.
pub struct RetryPolicy<E> {
    /// Maximum number of attempts (including the first). Never below 1.
    pub max_attempts: u32,
    /// Delay unit the backoff multiplies.
    pub base_delay: Duration,
    pub backoff: BackoffMode,
    /// Upper bound on the delay before jitter. `None` = uncapped.
    pub max_delay: Option<Duration>,
    predicate: RetryPredicate<E>,
    observer: Option<Arc<dyn RetryObserver<E>>>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            backoff: self.backoff,
            max_delay: self.max_delay,
            predicate: Arc::clone(&self.predicate),
            observer: self.observer.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("backoff", &self.backoff)
            .field("max_delay", &self.max_delay)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl<E: RetryClass + 'static> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<E: RetryClass + 'static> RetryPolicy<E> {
    /// 3 attempts, 1s base, exponential, standard predicate.
    pub fn standard() -> Self {
        Self::new(default_retry_condition::<E>)
    }

    /// Policy for AI-backed calls: 3 attempts, 2s base, exponential, AI predicate.
    pub fn ai() -> Self {
        Self::new(ai_retry_condition::<E>).with_base_delay(Duration::from_millis(2000))
    }
}

impl<E> RetryPolicy<E> {
    /// Default timing (3 attempts, 1s base, exponential) with a custom predicate.
    pub fn new<P>(predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            backoff: BackoffMode::Exponential,
            max_delay: None,
            predicate: Arc::new(predicate),
            observer: None,
        }
    }

    /// Timing from config with the given predicate.
    pub fn from_config<P>(cfg: &RetryConfig, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let mut policy = Self::new(predicate)
            .with_max_attempts(cfg.max_attempts)
            .with_base_delay(Duration::from_millis(cfg.base_delay_ms))
            .with_backoff(cfg.backoff);
        policy.max_delay = cfg.max_delay_ms.map(Duration::from_millis);
        policy
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffMode) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: RetryObserver<E> + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn should_retry(&self, err: &E) -> bool {
        (self.predicate)(err)
    }

    pub(super) fn observer(&self) -> Option<&dyn RetryObserver<E>> {
        self.observer.as_deref()
    }

    /// Delay after the given failed attempt, before jitter.
    ///
    /// `attempt` is 1-based. Saturates instead of overflowing on huge attempts.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let raw = match self.backoff {
            BackoffMode::Linear => self.base_delay.saturating_mul(attempt),
            BackoffMode::Exponential => {
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        };
        match self.max_delay {
            Some(cap) => raw.min(cap),
            None => raw,
        }
    }

    /// Decide what to do after `attempt` failed with `err`.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when this was the last attempt or the predicate rejects the error.
    pub fn decide(&self, attempt: u32, err: &E) -> RetryDecision {
        if attempt >= self.max_attempts || !self.should_retry(err) {
            return RetryDecision::NoRetry;
        }
        let delay = self.backoff_delay(attempt);
        RetryDecision::RetryAfter(apply_jitter(delay, rand::thread_rng().gen::<f64>()))
    }
}

/// Add up to 10% on top of `delay`. `unit` is clamped to `[0, 1]`.
pub fn apply_jitter(delay: Duration, unit: f64) -> Duration {
    let unit = if unit.is_finite() { unit.clamp(0.0, 1.0) } else { 0.0 };
    delay.saturating_add(delay.mul_f64(unit * 0.1))
}
