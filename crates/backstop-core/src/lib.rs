//! Retry and circuit-breaker control logic for dashboard backend calls.
//!
//! - [`retry`]: async retry loop with backoff, jitter, predicates and observers.
//! - [`breaker`]: per-dependency circuit breaker that fails fast while open.

pub mod config;
pub mod logging;

pub mod breaker;
pub mod retry;

pub use breaker::{BreakerSnapshot, CircuitBreaker, CircuitState};
pub use retry::{run_with_retry, RequestError, RetryPolicy};
