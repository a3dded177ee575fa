//! Registry of intermediate artifacts
//!
//! Every file a stage creates only for a later stage is registered here and
//! removed before the process exits. Cleanup drains the registry, so it runs
//! at most once per registered path no matter how many exit routes reach it;
//! `Drop` covers early returns. Release builds abort on panic, so nothing
//! is removed on that path.
//!
//! In dry-run mode nothing was created, so cleanup only echoes the `rm -f`
//! lines and leaves any same-named file of the user alone.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Paths slated for deletion, in registration order
#[derive(Debug, Default)]
pub struct TempFiles {
    paths: Vec<PathBuf>,
    verbose: bool,
    dry_run: bool,
}

impl TempFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Echo `rm -f` lines while cleaning up
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Echo the removals without touching the file system
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Register `path` for deletion
    pub fn register(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(path = %path.display(), "registered temporary file");
        self.paths.push(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Delete every registered path and empty the registry.
    ///
    /// Missing files are not an error. Returns the number of files removed.
    pub fn cleanup(&mut self) -> usize {
        let mut removed = 0;

        for path in std::mem::take(&mut self.paths) {
            if self.verbose {
                println!("\trm -f {}", path.display());
            }
            if self.dry_run {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temporary file"),
            }
        }

        removed
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        self.cleanup();
    }
}
