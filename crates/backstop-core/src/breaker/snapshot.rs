//! Serializable view of a breaker, for status output.

use serde::Serialize;

use super::state::CircuitState;

/// Point-in-time breaker state. No `Instant` fields; ages are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub threshold: u32,
    pub cooldown_ms: u64,
    /// Milliseconds since the most recent failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since_last_failure_ms: Option<u64>,
}
