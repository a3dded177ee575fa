//! Configuration Loader
//!
//! Handles loading and merging toolchain files with proper precedence.

use crate::toolchain_file::ToolchainFile;
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project-level toolchain file name
pub const PROJECT_FILE: &str = "plld.toml";

/// Configuration loader
///
/// Loads toolchain files and merges them with proper precedence:
/// 1. Global file (~/.plld/config.toml) - lowest priority
/// 2. Project file (./plld.toml) - overrides global
/// 3. Environment variables (PLLD_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Merged toolchain settings
    pub file: ToolchainFile,

    /// Directory where plld.toml was found
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Whether a project file was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use an explicit global config path instead of ~/.plld/config.toml
    pub fn with_global_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find plld.toml, then fills the gaps
    /// from the global file and applies environment overrides.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, mut file) = self.find_project_file(start_dir)?;
        file.fill_from(&self.global_layer()?);

        apply_env_overrides(&mut file)?;

        Ok(Config { file, project_root })
    }

    /// Load configuration from a specific toolchain file
    pub fn load_from_file(&mut self, path: &Path) -> ConfigResult<Config> {
        let mut file = ToolchainFile::load_from_file(path)?;
        file.fill_from(&self.global_layer()?);
        apply_env_overrides(&mut file)?;

        Ok(Config {
            file,
            project_root: path.parent().map(|p| p.to_path_buf()),
        })
    }

    /// Find the project file by walking up the directory tree
    fn find_project_file(&self, start_dir: &Path) -> ConfigResult<(Option<PathBuf>, ToolchainFile)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let candidate = current.join(PROJECT_FILE);

            if candidate.exists() {
                debug!(path = %candidate.display(), "loading project toolchain file");
                let file = ToolchainFile::load_from_file(&candidate)?;
                return Ok((Some(current), file));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ToolchainFile::default())),
            }
        }
    }

    /// Load ~/.plld/config.toml (absent file is an empty config)
    /// The global file; a missing home directory only disables this layer
    fn global_layer(&mut self) -> ConfigResult<ToolchainFile> {
        match self.load_global_file() {
            Err(ConfigError::HomeNotFound) => Ok(ToolchainFile::default()),
            other => other,
        }
    }

    fn load_global_file(&mut self) -> ConfigResult<ToolchainFile> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => {
                let path = global_config_path()?;
                self.global_config_path = Some(path.clone());
                path
            }
        };

        if !path.exists() {
            return Ok(ToolchainFile::default());
        }

        debug!(path = %path.display(), "loading global toolchain file");
        ToolchainFile::load_from_file(&path)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the global config file path (~/.plld/config.toml)
pub fn global_config_path() -> ConfigResult<PathBuf> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    Ok(home.join(".plld").join("config.toml"))
}

/// Apply PLLD_CC, PLLD_CXX, PLLD_LD and PLLD_PL
fn apply_env_overrides(file: &mut ToolchainFile) -> ConfigResult<()> {
    for (var, field) in [
        ("PLLD_CC", "cc"),
        ("PLLD_CXX", "cxx"),
        ("PLLD_LD", "ld"),
        ("PLLD_PL", "pl"),
    ] {
        let Ok(value) = env::var(var) else {
            continue;
        };
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: var.to_string(),
                reason: "program name cannot be empty".to_string(),
            });
        }

        let tools = file.toolchain_mut();
        let slot = match field {
            "cc" => &mut tools.cc,
            "cxx" => &mut tools.cxx,
            "ld" => &mut tools.ld,
            _ => &mut tools.pl,
        };
        *slot = Some(value);
    }

    Ok(())
}
