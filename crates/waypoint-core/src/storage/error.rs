//! # Waypoint Core Storage System Errors
//!
//! Defines [`StorageSystemError`] for file access and configuration
//! problems, and [`CheckpointFileError`] for checkpoint files whose contents
//! do not fit the live pipeline.
use std::path::PathBuf;
use thiserror::Error;

use crate::stage_manager::error::StageSystemError;

#[derive(Debug, Error)]
pub enum StorageSystemError {
    #[error("I/O error during operation '{operation}' on path '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No such file: '{0}'")]
    FileNotFound(PathBuf),

    #[error("No such directory: '{0}'")]
    DirectoryNotFound(PathBuf),

    #[error("Serialization to '{format}' failed: {source}")]
    SerializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Deserialization from '{format}' failed: {source}")]
    DeserializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Unsupported configuration format: {0}")]
    UnsupportedConfigFormat(String),

    #[error("Key '{key}' is missing from the configuration")]
    MissingConfigKey { key: String },

    #[error("Invalid value for configuration key '{key}': {reason}")]
    InvalidConfigValue { key: String, reason: String },
}

// Helper for creating Io errors, ensuring path is always included.
impl StorageSystemError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        StorageSystemError::Io {
            source,
            operation: operation.into(),
            path,
        }
    }
}

/// A checkpoint file that cannot be applied to the live pipeline.
///
/// One variant per check; loading stops at the first failed check and
/// leaves the pipeline unchanged.
#[derive(Debug, Error)]
pub enum CheckpointFileError {
    #[error("Checkpoint file is not a valid document: {source}")]
    MalformedDocument {
        #[source]
        source: serde_json::Error,
    },

    #[error("Inconsistent number of stages in checkpoint file: expected {expected} but got {actual}")]
    StageCountMismatch { expected: usize, actual: usize },

    #[error("Unexpected stage name in checkpoint file: '{0}'")]
    UnknownStage(String),

    #[error("Pipeline declares more than one stage named '{0}'")]
    DuplicateStageName(String),

    #[error("Entry for stage '{stage}' is not an object")]
    StageNotAnObject { stage: String },

    #[error("Steps of stage '{stage}' are not an object")]
    StepsNotAnObject { stage: String },

    #[error("Invalid number of keys in entry for stage '{stage}': expected 2 but got {count}")]
    InvalidKeyCount { stage: String, count: usize },

    #[error("Missing key in entry for stage '{stage}': '{key}'")]
    MissingKey { stage: String, key: String },

    #[error("Invalid status for stage '{stage}' in checkpoint file: {value}")]
    InvalidStatus { stage: String, value: String },

    #[error("Invalid step states for stage '{stage}'")]
    InvalidSteps {
        stage: String,
        #[source]
        source: StageSystemError,
    },
}
