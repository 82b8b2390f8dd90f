use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the installer actions themselves. Configuration
/// shape errors come from `waypoint_core` and are passed through as-is.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Failed to start '{program}': {source}")]
    CommandNotStarted {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{program}' failed ({status})")]
    CommandFailed { program: String, status: String },

    #[error("Unexpected output from '{program}': {output}")]
    UnexpectedOutput { program: String, output: String },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Expected a file: '{0}'")]
    NotAFile(PathBuf),

    #[error("Invalid value for configuration key '{key}': {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("The installation medium is not booted in UEFI mode.")]
    NotUefi,

    #[error("System does not have internet connectivity.")]
    NoInternet,

    #[error("Prepare the target drives manually, then re-run waypoint to continue.")]
    ManualPartitioning,

    #[error("{0}")]
    Declined(String),
}

impl InstallError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstallError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_config(key: &str, reason: impl Into<String>) -> Self {
        InstallError::InvalidConfig {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
