//! # Waypoint Core Errors
//!
//! Defines [`Error`], the crate-wide error enum. Each subsystem keeps its own
//! typed error in its `error` module; this type only unifies them so callers
//! can use a single `Result` alias and `?` across subsystem boundaries.
use std::path::PathBuf;
use std::result::Result as StdResult;

use crate::stage_manager::error::StageSystemError;
use crate::storage::error::{CheckpointFileError, StorageSystemError};
use thiserror::Error as ThisError;

/// Custom error type for the waypoint engine
#[derive(Debug, ThisError)]
pub enum Error {
    /// Staged-execution error (re-run, execution failure, construction)
    #[error(transparent)]
    StageSystem(#[from] StageSystemError),

    /// File access or configuration error
    #[error(transparent)]
    StorageSystem(#[from] StorageSystemError),

    /// Checkpoint file does not match the live pipeline
    #[error(transparent)]
    CheckpointFile(#[from] CheckpointFileError),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl Error {
    /// Wrap an I/O error with the operation and path it happened on
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        Error::StorageSystem(StorageSystemError::io(source, operation, path))
    }

    /// Whether this error reports a failed step or stage (as opposed to a
    /// usage, construction or persistence error)
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, Error::StageSystem(StageSystemError::ExecutionFailed { .. }))
    }
}
