// workbench-core/src/errors.rs
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that stop a tool invocation before or outside of a command result.
///
/// A command that runs and exits non-zero is *not* an error here; it comes back
/// as a [`crate::runner::CommandOutput`] and the caller classifies it.
#[derive(Error, Debug)]
pub enum WorkbenchError {
    /// The program could not be started at all (missing binary, permissions).
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran longer than the configured limit and was killed.
    #[error("'{program}' timed out after {timeout:?} and was killed")]
    Timeout { program: String, timeout: Duration },

    /// A caller-supplied path is outside the workspace or of the wrong kind.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Required configuration is missing, blank or malformed.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// A tool argument is empty or out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The patch text could not be used.
    #[error("Invalid patch: {0}")]
    InvalidPatch(String),

    /// A search pattern did not compile.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Filesystem failure while touching the workspace.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkbenchError {
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        WorkbenchError::InvalidPath(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        WorkbenchError::Config(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        WorkbenchError::InvalidArgument(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WorkbenchError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkbenchError>;
