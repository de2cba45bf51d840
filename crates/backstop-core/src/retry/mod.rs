//! Retry and backoff policy.
//!
//! This module encapsulates error classification (network failures, 5xx,
//! explicit retryable markers) and backoff decisions so that every call-site
//! hitting the dashboard backend shares a consistent policy.

mod classify;
mod error;
mod observer;
mod policy;
mod run;

pub use classify::{ai_retry_condition, default_retry_condition, RetryClass};
pub use error::{BreakerOpen, ErrorKind, RequestError, ResponseBody};
pub use observer::{ChannelObserver, RetryEvent, RetryObserver};
pub use policy::{apply_jitter, BackoffMode, RetryDecision, RetryPolicy, RetryPredicate};
pub use run::run_with_retry;
