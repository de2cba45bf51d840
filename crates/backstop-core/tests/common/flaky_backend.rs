//! Scripted stand-in for a dashboard backend endpoint.
//!
//! Each call pops the next scripted outcome; once the script runs out, the
//! fallback outcome repeats. Counts invocations so tests can assert whether
//! the breaker let a call through.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use backstop_core::RequestError;

#[derive(Debug)]
pub struct FlakyBackend {
    script: Mutex<VecDeque<Result<&'static str, RequestError>>>,
    fallback: Result<&'static str, RequestError>,
    calls: AtomicU32,
}

impl FlakyBackend {
    pub fn new(fallback: Result<&'static str, RequestError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicU32::new(0),
        }
    }

    /// Always fails with `err`.
    pub fn failing(err: RequestError) -> Self {
        Self::new(Err(err))
    }

    /// Fails `n` times with `err`, then answers `ok`.
    pub fn failing_then(n: usize, err: RequestError, ok: &'static str) -> Self {
        let backend = Self::new(Ok(ok));
        backend
            .script
            .lock()
            .unwrap()
            .extend(std::iter::repeat(Err(err)).take(n));
        backend
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn call(&self) -> Result<&'static str, RequestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
