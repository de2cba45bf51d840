//! RAII guard that frees the half-open trial slot if the trial is dropped.

use super::CircuitBreaker;

/// Releases the trial slot when dropped while still armed.
pub(super) struct TrialGuard<'a> {
    pub(super) breaker: &'a CircuitBreaker,
    pub(super) epoch: u64,
    pub(super) armed: bool,
}

impl TrialGuard<'_> {
    /// The trial produced an outcome; recording it clears the slot instead.
    pub(super) fn disarm(&mut self) -> u64 {
        self.armed = false;
        self.epoch
    }
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(breaker = %self.breaker.name(), "half-open trial abandoned");
            self.breaker.lock().release_trial(self.epoch);
        }
    }
}
