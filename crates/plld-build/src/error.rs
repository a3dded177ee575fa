/// Build pipeline error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unrecognized input file '{path}' (unknown extension)")]
    UnrecognizedInput { path: String },

    #[error("{program} returned code {code}")]
    ToolFailed { program: String, code: i32 },

    #[error("failed to run {program}: {error}")]
    Spawn {
        program: String,
        error: std::io::Error,
    },

    #[error("{operation} {path}: {error}")]
    IoError {
        operation: &'static str,
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("no value for {setting}; pass it explicitly or check the runtime query")]
    MissingSetting { setting: &'static str },

    #[error("interrupted by signal {signal}")]
    Interrupted { signal: i32 },

    #[error("cannot run {stage} stage from state {state}")]
    StageOrder {
        stage: &'static str,
        state: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] plld_config::ConfigError),
}

impl BuildError {
    /// Create an I/O error naming the failed operation and path
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            operation,
            path: path.into(),
            error,
        }
    }

    /// Create a tool failure error
    pub fn tool_failed(program: impl Into<String>, code: i32) -> Self {
        Self::ToolFailed {
            program: program.into(),
            code,
        }
    }

    /// Create an unrecognized input error
    pub fn unrecognized(path: impl Into<String>) -> Self {
        Self::UnrecognizedInput { path: path.into() }
    }

    /// Process exit status for this error: the signal number for an
    /// interruption, 1 for everything else
    pub fn exit_status(&self) -> i32 {
        match self {
            Self::Interrupted { signal } => *signal,
            _ => 1,
        }
    }
}
