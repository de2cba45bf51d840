//! CLI for inspecting and exercising backstop retry and breaker policies.

mod commands;

use anyhow::Result;
use backstop_core::config::{self, BackstopConfig};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use commands::{run_classify, run_completions, run_config, run_man, run_simulate, SimulateArgs};

/// Top-level CLI for backstop.
#[derive(Debug, Parser)]
#[command(name = "backstop")]
#[command(about = "backstop: retry and circuit-breaker policies for dashboard backend calls", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of ~/.config/backstop/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Named retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyKind {
    /// Standard dashboard calls.
    Standard,
    /// AI-backed calls (description generation).
    Ai,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Print the effective configuration.
    Config,

    /// Show whether the standard and AI predicates would retry an error.
    Classify {
        /// HTTP status the server answered with.
        #[arg(long, conflicts_with_all = ["network", "timeout"])]
        status: Option<u16>,
        /// Transport failure with no response.
        #[arg(long, conflicts_with = "timeout")]
        network: bool,
        /// Request timed out with no response.
        #[arg(long)]
        timeout: bool,
        /// Error message text.
        #[arg(long, default_value = "")]
        message: String,
        /// Upstream flagged the error as retryable.
        #[arg(long)]
        retryable: bool,
    },

    /// Drive a simulated flaky dependency through a breaker and retry policy.
    Simulate {
        /// Number of initial backend invocations that fail.
        #[arg(long, default_value = "2", value_name = "N")]
        fail: u32,
        /// Number of top-level calls to make.
        #[arg(long, default_value = "1", value_name = "K")]
        calls: u32,
        /// Retry policy to use.
        #[arg(long, value_enum, default_value_t = PolicyKind::Standard)]
        policy: PolicyKind,
        /// HTTP status the failing invocations return.
        #[arg(long, default_value = "503")]
        error_status: u16,
        /// Override breaker threshold.
        #[arg(long)]
        threshold: Option<u32>,
        /// Override breaker cooldown in milliseconds.
        #[arg(long, value_name = "MS")]
        cooldown_ms: Option<u64>,
        /// Override retry base delay in milliseconds.
        #[arg(long, value_name = "MS")]
        base_delay_ms: Option<u64>,
    },

    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Render the man page to stdout.
    Man,
}

fn load_config(path: Option<&PathBuf>) -> Result<BackstopConfig> {
    let cfg = match path {
        Some(p) => config::load_from(p)?,
        None => config::load_or_init()?,
    };
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Config => run_config(&load_config(cli.config.as_ref())?)?,
            CliCommand::Classify {
                status,
                network,
                timeout,
                message,
                retryable,
            } => run_classify(status, network, timeout, &message, retryable),
            CliCommand::Simulate {
                fail,
                calls,
                policy,
                error_status,
                threshold,
                cooldown_ms,
                base_delay_ms,
            } => {
                let cfg = load_config(cli.config.as_ref())?;
                let args = SimulateArgs {
                    fail,
                    calls,
                    policy,
                    error_status,
                    threshold,
                    cooldown_ms,
                    base_delay_ms,
                };
                run_simulate(&cfg, &args).await?;
            }
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Man => run_man()?,
        }

        Ok(())
    }
}
