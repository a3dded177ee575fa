//! plld Configuration System
//!
//! Provides configuration management for the plld build driver:
//! - Toolchain files (`plld.toml` in the project, `~/.plld/config.toml` per user)
//! - Runtime variables reported by `<runtime> -dump-runtime-variables`
//! - Environment overrides (`PLLD_*`)
//!
//! # Configuration Hierarchy
//!
//! Every setting is "fill only if unset", applied from highest priority down:
//! 1. CLI flags
//! 2. Environment variables (PLLD_CC, PLLD_CXX, PLLD_LD, PLLD_PL)
//! 3. Project file (./plld.toml, searched upwards)
//! 4. Global file (~/.plld/config.toml)
//! 5. Runtime variables
//! 6. Built-in defaults
//!
//! # Example
//!
//! ```no_run
//! use plld_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("{:?}", config.file.compiler());
//! ```

pub mod loader;
pub mod runtime_vars;
pub mod toolchain_file;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader};
pub use runtime_vars::RuntimeVariables;
pub use toolchain_file::{EmbedSection, OptionsSection, ToolSection, ToolchainFile};
