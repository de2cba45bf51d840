use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::retry::BackoffMode;

/// Retry timing for one class of calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per call (including the first).
    pub max_attempts: u32,
    /// Base delay in milliseconds the backoff multiplies.
    pub base_delay_ms: u64,
    /// "exponential" (default) or "linear".
    pub backoff: BackoffMode,
    /// Optional cap on the delay before jitter, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            backoff: BackoffMode::Exponential,
            max_delay_ms: None,
        }
    }
}

impl RetryConfig {
    /// Timing used for AI-backed calls (description generation).
    pub fn ai() -> Self {
        Self {
            base_delay_ms: 2000,
            ..Self::default()
        }
    }
}

fn default_ai_retry() -> RetryConfig {
    RetryConfig::ai()
}

/// Circuit breaker parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures that open the breaker.
    pub threshold: u32,
    /// Milliseconds an open breaker waits before allowing a trial call.
    pub cooldown_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            cooldown_ms: 60_000,
        }
    }
}

/// Global configuration loaded from `~/.config/backstop/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackstopConfig {
    /// Standard dashboard calls.
    #[serde(default)]
    pub retry: RetryConfig,
    /// AI-backed calls; longer base delay when the section is absent.
    /// Fields missing from a present section take the standard defaults.
    #[serde(default = "default_ai_retry")]
    pub ai_retry: RetryConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
}

impl Default for BackstopConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            ai_retry: RetryConfig::ai(),
            breaker: BreakerConfig::default(),
        }
    }
}

impl BackstopConfig {
    /// Reject values the retry and breaker layers cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.ai_retry.max_attempts == 0 {
            bail!("ai_retry.max_attempts must be at least 1");
        }
        if self.breaker.threshold == 0 {
            bail!("breaker.threshold must be at least 1");
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("backstop")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BackstopConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BackstopConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from(&path)
}

/// Load and validate configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<BackstopConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: BackstopConfig = toml::from_str(&data)?;
    cfg.validate()?;
    Ok(cfg)
}
