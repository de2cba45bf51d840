//! Breaker state machine. Pure transitions; the caller supplies `now`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Breaker position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls fail fast until the cooldown elapses.
    Open,
    /// One trial call decides between Closed and Open.
    HalfOpen,
}

/// Whether a call may run, and in what role. A trial carries the epoch it
/// was admitted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Admission {
    Pass,
    Trial(u64),
    Rejected,
}

/// What the breaker did with an outcome, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Transition {
    None,
    Tripped,
    Reopened,
    Recovered,
}

#[derive(Debug)]
pub(super) struct BreakerState {
    pub(super) state: CircuitState,
    pub(super) failure_count: u32,
    pub(super) last_failure: Option<Instant>,
    pub(super) trial_in_flight: bool,
    /// Bumped whenever a trial slot is handed out or invalidated. Outcomes of
    /// trials from an older epoch no longer own the slot.
    trial_epoch: u64,
}

impl BreakerState {
    pub(super) fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure: None,
            trial_in_flight: false,
            trial_epoch: 0,
        }
    }

    /// Time since the last failure exceeded the cooldown. No failure yet counts as elapsed.
    pub(super) fn cooldown_elapsed(&self, cooldown: Duration, now: Instant) -> bool {
        self.last_failure
            .map_or(true, |at| now.saturating_duration_since(at) > cooldown)
    }

    pub(super) fn admit(&mut self, cooldown: Duration, now: Instant) -> Admission {
        match self.state {
            CircuitState::Closed => Admission::Pass,
            CircuitState::Open => {
                if !self.cooldown_elapsed(cooldown, now) || self.trial_in_flight {
                    return Admission::Rejected;
                }
                self.state = CircuitState::HalfOpen;
                self.claim_trial()
            }
            CircuitState::HalfOpen => {
                if self.trial_in_flight {
                    return Admission::Rejected;
                }
                self.claim_trial()
            }
        }
    }

    fn claim_trial(&mut self) -> Admission {
        self.trial_epoch = self.trial_epoch.wrapping_add(1);
        self.trial_in_flight = true;
        Admission::Trial(self.trial_epoch)
    }

    /// Clear the slot if `trial` still owns it.
    fn finish_trial(&mut self, trial: Option<u64>) {
        if trial == Some(self.trial_epoch) {
            self.trial_in_flight = false;
        }
    }

    /// Drop any in-flight trial; its outcome will be treated as an ordinary call.
    fn invalidate_trial(&mut self) {
        self.trial_epoch = self.trial_epoch.wrapping_add(1);
        self.trial_in_flight = false;
    }

    pub(super) fn record_success(&mut self, trial: Option<u64>) -> Transition {
        self.finish_trial(trial);
        let was = self.state;
        self.failure_count = 0;
        self.state = CircuitState::Closed;
        if was == CircuitState::Closed {
            return Transition::None;
        }
        self.invalidate_trial();
        Transition::Recovered
    }

    /// Count a failure. Open exactly when the count reaches `threshold`.
    pub(super) fn record_failure(
        &mut self,
        trial: Option<u64>,
        threshold: u32,
        now: Instant,
    ) -> Transition {
        self.finish_trial(trial);
        let was = self.state;
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure = Some(now);
        if self.failure_count >= threshold {
            self.state = CircuitState::Open;
        }
        match (was, self.state) {
            (CircuitState::Closed, CircuitState::Open) => Transition::Tripped,
            (CircuitState::HalfOpen, CircuitState::Open) => Transition::Reopened,
            _ => Transition::None,
        }
    }

    /// Trial abandoned without an outcome (caller dropped the future).
    pub(super) fn release_trial(&mut self, trial: u64) {
        self.finish_trial(Some(trial));
    }

    pub(super) fn reset(&mut self) {
        let epoch = self.trial_epoch;
        *self = Self::new();
        self.trial_epoch = epoch;
        self.invalidate_trial();
    }
}
