//! Classify request errors into retry decisions.
//!
//! Two named predicates are kept apart on purpose: the standard one used by
//! most dashboard calls, and the AI one used for description generation,
//! which tolerates a different set of failures.

use super::error::{ErrorKind, RequestError};

/// What a retry predicate needs to know about an error.
pub trait RetryClass {
    fn kind(&self) -> ErrorKind;

    /// Upstream explicitly flagged the failure as retryable.
    fn marked_retryable(&self) -> bool {
        false
    }

    fn message(&self) -> &str;
}

impl RetryClass for RequestError {
    fn kind(&self) -> ErrorKind {
        RequestError::kind(self)
    }

    fn marked_retryable(&self) -> bool {
        self.is_retryable()
    }

    fn message(&self) -> &str {
        RequestError::message(self)
    }
}

/// Message heuristic: backends that only report outages in prose.
/// Fallback only; kinds and the retryable marker are the real contract.
fn message_contains(message: &str, needle: &str) -> bool {
    message.to_ascii_lowercase().contains(needle)
}

/// Standard retry predicate.
///
/// Retries when no response is attached, on any 5xx (503 included), when the
/// error is marked retryable, or when the message says "temporarily unavailable".
pub fn default_retry_condition<E: RetryClass + ?Sized>(err: &E) -> bool {
    match err.kind() {
        ErrorKind::Status(code) if code >= 500 => return true,
        ErrorKind::Status(_) => {}
        ErrorKind::Network | ErrorKind::Timeout | ErrorKind::BreakerOpen | ErrorKind::Local => {
            return true
        }
    }
    err.marked_retryable() || message_contains(err.message(), "temporarily unavailable")
}

/// Retry predicate for AI-backed calls.
///
/// Retries when no response is attached, on 503, or when the message mentions
/// the circuit breaker, a timeout or a connection problem. Does not consult the
/// retryable marker.
pub fn ai_retry_condition<E: RetryClass + ?Sized>(err: &E) -> bool {
    match err.kind() {
        ErrorKind::Status(503) => return true,
        ErrorKind::Status(_) => {}
        _ => return true,
    }
    let message = err.message();
    ["circuit breaker", "timeout", "connection"]
        .iter()
        .any(|needle| message_contains(message, needle))
}
