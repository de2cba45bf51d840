//! Retry observers: how call-sites learn that an attempt failed and another is coming.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

/// Notified before each backoff sleep.
///
/// `attempt` is the 1-based attempt that just failed; `delay` is the sleep
/// about to happen before attempt `attempt + 1`.
pub trait RetryObserver<E>: Send + Sync {
    fn on_retry(&self, attempt: u32, error: &E, delay: Duration);
}

impl<E, F> RetryObserver<E> for F
where
    F: Fn(u32, &E, Duration) + Send + Sync,
{
    fn on_retry(&self, attempt: u32, error: &E, delay: Duration) {
        self(attempt, error, delay)
    }
}

/// Owned record of a retry, for observers that hand events to another task.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RetryEvent {
    pub attempt: u32,
    #[serde(rename = "delay_ms", serialize_with = "serialize_millis")]
    pub delay: Duration,
    pub message: String,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Forwards retry events into a channel, e.g. to drive a "Retrying… attempt N" banner.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: UnboundedSender<RetryEvent>,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<RetryEvent>) -> Self {
        Self { tx }
    }
}

impl<E: std::fmt::Display> RetryObserver<E> for ChannelObserver {
    fn on_retry(&self, attempt: u32, error: &E, delay: Duration) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(RetryEvent {
            attempt,
            delay,
            message: error.to_string(),
        });
    }
}
