//! CLI configuration via environment variables
//!
//! Toolchain programs come from `plld.toml` and `PLLD_CC` and friends (see
//! `plld-config`); this covers the switches that only affect the driver
//! itself.

use std::env;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Always echo commands (PLLD_VERBOSE=1)
    pub verbose: bool,
    /// Log filter directive (PLLD_LOG=debug)
    pub log_filter: Option<String>,
    /// Disable colored output (PLLD_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            verbose: env::var("PLLD_VERBOSE")
                .map(|v| is_enabled(&v))
                .unwrap_or(false),
            log_filter: env::var("PLLD_LOG").ok().filter(|v| !v.trim().is_empty()),
            no_color: env::var("PLLD_NO_COLOR").is_ok() || env::var("NO_COLOR").is_ok(),
        }
    }
}

fn is_enabled(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    !(lower.is_empty() || lower == "0" || lower == "false" || lower == "off")
}
