//! Request error type for retry classification.

use std::fmt;
use std::time::Duration;

/// What went wrong with a backend call, as far as retry decisions care.
///
/// Produced at the boundary where the HTTP layer turns failures into values,
/// so predicates match on a closed set instead of poking at message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport failure (DNS, reset, refused); no response received.
    Network,
    /// Request timed out before a response arrived.
    Timeout,
    /// Server answered with this HTTP status.
    Status(u16),
    /// A circuit breaker rejected the call without running it.
    BreakerOpen,
    /// Failure on the caller side (bad input, decoding). No response attached.
    Local,
}

impl ErrorKind {
    /// HTTP status, if a response was attached.
    pub fn status(self) -> Option<u16> {
        match self {
            ErrorKind::Status(code) => Some(code),
            _ => None,
        }
    }

    /// True when a server response is attached to the error.
    pub fn has_response(self) -> bool {
        self.status().is_some()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Status(code) => write!(f, "HTTP {}", code),
            ErrorKind::BreakerOpen => write!(f, "breaker open"),
            ErrorKind::Local => write!(f, "local"),
        }
    }
}

/// Human-readable text the backend put in the response body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseBody {
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Rejection raised by a circuit breaker that is open.
///
/// Error types routed through [`crate::breaker::CircuitBreaker`] implement
/// `From<BreakerOpen>` so the rejection surfaces as their own value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, thiserror::Error)]
#[error("circuit breaker is open")]
pub struct BreakerOpen;

/// Error surfaced to call-sites of the dashboard backend.
///
/// The retry and breaker layers read `kind`, the retryable marker and the
/// message; body text and `retry_after` pass through for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    kind: ErrorKind,
    message: String,
    body: Option<ResponseBody>,
    retryable: bool,
    retry_after: Option<Duration>,
}

impl RequestError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            body: None,
            retryable: false,
            retry_after: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Status(code), message)
    }

    pub fn local(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Local, message)
    }

    /// Attach the response body text.
    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Mark the error as explicitly retryable (e.g. rate limited with a backoff hint).
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    /// Cooldown hint the UI can display before offering a manual retry.
    pub fn with_retry_after(mut self, after: Duration) -> Self {
        self.retry_after = Some(after);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn body(&self) -> Option<&ResponseBody> {
        self.body.as_ref()
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Text to show the user: body `error`, then body `message`, then our own message.
    pub fn display_message(&self) -> &str {
        self.body
            .as_ref()
            .and_then(|b| b.error.as_deref().or(b.message.as_deref()))
            .unwrap_or(&self.message)
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Status(code) => write!(f, "HTTP {}: {}", code, self.display_message()),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for RequestError {}

impl From<BreakerOpen> for RequestError {
    fn from(open: BreakerOpen) -> Self {
        Self::new(ErrorKind::BreakerOpen, open.to_string())
    }
}
