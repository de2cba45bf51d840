//! Circuit breaker for backend dependencies.
//!
//! One breaker per logical dependency (e.g. the description-generation
//! endpoint), created by whoever owns that dependency and handed by
//! reference to every call-site. It counts consecutive failures across all
//! calls routed through it and fails fast once `threshold` is reached.
//!
//! ```text
//! Closed   --(failure_count >= threshold)--> Open
//! Open     --(cooldown elapsed, next call)-> HalfOpen
//! HalfOpen --(trial succeeds)--------------> Closed
//! HalfOpen --(trial fails)-----------------> Open (cooldown restarts)
//! any      --(success)---------------------> Closed
//! ```
//!
//! The breaker does not retry. Wrap it inside [`crate::retry::run_with_retry`]
//! so every attempt re-checks the breaker:
//!
//! ```no_run
//! use backstop_core::breaker::CircuitBreaker;
//! use backstop_core::retry::{run_with_retry, RequestError, RetryPolicy};
//!
//! # async fn generate() -> Result<String, RequestError> { Ok(String::new()) }
//! # async fn example() -> Result<(), RequestError> {
//! let breaker = CircuitBreaker::with_defaults("ai-descriptions");
//! let policy = RetryPolicy::ai();
//! let text = run_with_retry(&policy, || breaker.execute(generate)).await?;
//! # let _ = text;
//! # Ok(())
//! # }
//! ```

mod guard;
mod snapshot;
mod state;

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::retry::BreakerOpen;
use guard::TrialGuard;
use state::{Admission, BreakerState, Transition};

pub use snapshot::BreakerSnapshot;
pub use state::CircuitState;

/// Failure-count circuit breaker shared by every call-site of one dependency.
///
/// State sits behind a mutex that is only held between suspension points,
/// never across the wrapped operation.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    threshold: u32,
    cooldown: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a closed breaker. `threshold` is clamped to at least 1.
    pub fn new(name: impl Into<String>, threshold: u32, cooldown: Duration) -> Self {
        Self {
            name: name.into(),
            threshold: threshold.max(1),
            cooldown,
            state: Mutex::new(BreakerState::new()),
        }
    }

    /// Threshold 5, cooldown 60s.
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::from_config(name, &BreakerConfig::default())
    }

    pub fn from_config(name: impl Into<String>, cfg: &BreakerConfig) -> Self {
        Self::new(name, cfg.threshold, Duration::from_millis(cfg.cooldown_ms))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stored state. An open breaker only moves to half-open when a call
    /// arrives after the cooldown.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// True when the breaker is open and the next call would be a trial.
    pub fn cooldown_elapsed(&self) -> bool {
        let s = self.lock();
        s.state == CircuitState::Open && s.cooldown_elapsed(self.cooldown, Instant::now())
    }

    /// Operator reset: back to closed with no recorded failures.
    pub fn reset(&self) {
        self.lock().reset();
        tracing::info!(breaker = %self.name, "circuit breaker reset");
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let s = self.lock();
        let now = Instant::now();
        BreakerSnapshot {
            name: self.name.clone(),
            state: s.state,
            failure_count: s.failure_count,
            threshold: self.threshold,
            cooldown_ms: u64::try_from(self.cooldown.as_millis()).unwrap_or(u64::MAX),
            since_last_failure_ms: s.last_failure.map(|at| {
                u64::try_from(now.saturating_duration_since(at).as_millis()).unwrap_or(u64::MAX)
            }),
        }
    }

    /// Run `operation` through the breaker.
    ///
    /// While open (cooldown not yet elapsed) the operation is not invoked and
    /// `E::from(BreakerOpen)` is returned; rejected calls leave the failure
    /// count alone. Operation errors are returned unchanged.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<BreakerOpen>,
    {
        let admission = self.lock().admit(self.cooldown, Instant::now());
        let mut trial = match admission {
            Admission::Rejected => {
                tracing::debug!(breaker = %self.name, "circuit open, rejecting call");
                return Err(E::from(BreakerOpen));
            }
            Admission::Trial(epoch) => {
                tracing::info!(breaker = %self.name, "circuit half-open, running trial call");
                Some(TrialGuard {
                    breaker: self,
                    epoch,
                    armed: true,
                })
            }
            Admission::Pass => None,
        };

        let result = operation().await;

        let trial_epoch = trial.as_mut().map(|guard| guard.disarm());
        let (transition, failure_count) = {
            let mut s = self.lock();
            let t = match &result {
                Ok(_) => s.record_success(trial_epoch),
                Err(_) => s.record_failure(trial_epoch, self.threshold, Instant::now()),
            };
            (t, s.failure_count)
        };
        self.log_transition(transition, failure_count);

        result
    }

    fn log_transition(&self, transition: Transition, failure_count: u32) {
        match transition {
            Transition::None => {}
            Transition::Tripped => tracing::warn!(
                breaker = %self.name,
                failure_count,
                threshold = self.threshold,
                cooldown_ms = u64::try_from(self.cooldown.as_millis()).unwrap_or(u64::MAX),
                "circuit breaker opened"
            ),
            Transition::Reopened => tracing::warn!(
                breaker = %self.name,
                failure_count,
                "half-open trial failed, circuit reopened"
            ),
            Transition::Recovered => {
                tracing::info!(breaker = %self.name, "circuit breaker closed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{ErrorKind, RequestError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn fail(breaker: &CircuitBreaker, calls: &AtomicU32) -> Result<(), RequestError> {
        breaker
            .execute(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RequestError::status(500, "Internal Server Error"))
            })
            .await
    }

    async fn succeed(breaker: &CircuitBreaker, calls: &AtomicU32) -> Result<u32, RequestError> {
        breaker
            .execute(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await
    }

    #[test]
    fn defaults() {
        let breaker = CircuitBreaker::with_defaults("menu");
        assert_eq!(breaker.threshold(), 5);
        assert_eq!(breaker.cooldown(), Duration::from_secs(60));
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn opens_after_threshold_and_rejects_without_invoking() {
        let breaker = CircuitBreaker::new("orders", 3, Duration::from_secs(1));
        let calls = AtomicU32::new(0);
        for _ in 0..3 {
            let err = fail(&breaker, &calls).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Status(500));
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.failure_count(), 3);

        let err = fail(&breaker, &calls).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BreakerOpen);
        assert_eq!(err.to_string(), "circuit breaker is open");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(breaker.failure_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_count() {
        let breaker = CircuitBreaker::new("tables", 3, Duration::from_secs(1));
        let calls = AtomicU32::new(0);
        fail(&breaker, &calls).await.unwrap_err();
        fail(&breaker, &calls).await.unwrap_err();
        assert_eq!(breaker.failure_count(), 2);
        assert_eq!(succeed(&breaker, &calls).await.unwrap(), 7);
        assert_eq!(breaker.failure_count(), 0);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_trial_failure_reopens() {
        let breaker = CircuitBreaker::new("analytics", 2, Duration::from_secs(1));
        let calls = AtomicU32::new(0);
        fail(&breaker, &calls).await.unwrap_err();
        fail(&breaker, &calls).await.unwrap_err();
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(breaker.cooldown_elapsed());

        let err = fail(&breaker, &calls).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Status(500));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.cooldown_elapsed());

        let err = succeed(&breaker, &calls).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BreakerOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_admits_one_trial_at_a_time() {
        let breaker = Arc::new(CircuitBreaker::new("ai", 1, Duration::from_secs(1)));
        let calls = Arc::new(AtomicU32::new(0));
        fail(&breaker, &calls).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(2)).await;

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let b = Arc::clone(&breaker);
        let trial = tokio::spawn(async move {
            b.execute(|| async move {
                let _ = release_rx.await;
                Ok::<_, RequestError>("recovered")
            })
            .await
        });
        for _ in 0..5 {
            if breaker.state() == CircuitState::HalfOpen {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let err = succeed(&breaker, &calls).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BreakerOpen);

        release_tx.send(()).unwrap();
        assert_eq!(trial.await.unwrap().unwrap(), "recovered");
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_trial_frees_the_slot() {
        let breaker = CircuitBreaker::new("qr", 1, Duration::from_secs(1));
        let calls = AtomicU32::new(0);
        fail(&breaker, &calls).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(2)).await;

        let pending = breaker.execute(|| std::future::pending::<Result<(), RequestError>>());
        let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;
        assert!(timed_out.is_err());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        assert_eq!(succeed(&breaker, &calls).await.unwrap(), 7);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_closes_open_breaker() {
        let breaker = CircuitBreaker::new("menu", 1, Duration::from_secs(60));
        let calls = AtomicU32::new(0);
        fail(&breaker, &calls).await.unwrap_err();
        assert_eq!(breaker.state(), CircuitState::Open);
        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
        assert_eq!(succeed(&breaker, &calls).await.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_during_trial_keeps_breaker_closed() {
        let breaker = Arc::new(CircuitBreaker::new("menu", 5, Duration::from_secs(1)));
        let calls = Arc::new(AtomicU32::new(0));
        for _ in 0..5 {
            fail(&breaker, &calls).await.unwrap_err();
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        tokio::time::advance(Duration::from_secs(2)).await;

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let b = Arc::clone(&breaker);
        let trial = tokio::spawn(async move {
            b.execute(|| async move {
                let _ = release_rx.await;
                Err::<(), _>(RequestError::status(500, "Internal Server Error"))
            })
            .await
        });
        for _ in 0..5 {
            if breaker.state() == CircuitState::HalfOpen {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.reset();
        release_tx.send(()).unwrap();
        let err = trial.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Status(500));

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 1);
        assert_eq!(succeed(&breaker, &calls).await.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_reports_state() {
        let breaker = CircuitBreaker::new("orders", 2, Duration::from_millis(1500));
        let calls = AtomicU32::new(0);
        fail(&breaker, &calls).await.unwrap_err();
        tokio::time::advance(Duration::from_millis(250)).await;

        let snap = breaker.snapshot();
        assert_eq!(snap.name, "orders");
        assert_eq!(snap.state, CircuitState::Closed);
        assert_eq!(snap.failure_count, 1);
        assert_eq!(snap.threshold, 2);
        assert_eq!(snap.cooldown_ms, 1500);
        assert_eq!(snap.since_last_failure_ms, Some(250));

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["state"], "closed");
    }
}
