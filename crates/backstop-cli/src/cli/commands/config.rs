//! `backstop config` – print the effective configuration.

use anyhow::Result;
use backstop_core::config::BackstopConfig;

pub fn run_config(cfg: &BackstopConfig) -> Result<()> {
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
