//! CLI command handlers. Each command is in its own file.

mod classify;
mod completions;
mod config;
mod simulate;

pub use classify::run_classify;
pub use completions::{run_completions, run_man};
pub use config::run_config;
pub use simulate::{run_simulate, SimulateArgs};

#[cfg(test)]
pub(crate) use classify::build_error;
#[cfg(test)]
pub(crate) use simulate::{build_breaker, build_policy, simulate};
