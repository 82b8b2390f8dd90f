//! # Waypoint Core
//!
//! Resumable staged execution: named [`Step`]s grouped into [`Stage`]s, each
//! carrying a [`Checkpoint`] that survives process restarts through the
//! [`CheckpointStore`].
pub mod kernel;
pub mod stage_manager;
pub mod storage;
pub mod utils;

// Re-export key public types for the binary and the installer stages
pub use kernel::error::{Error, Result};
pub use stage_manager::{
    BoxError, Checkpoint, CheckpointState, Executable, Operation, OperationResult, Pipeline,
    Stage, StageSystemError, Step,
};
pub use storage::{CheckpointStore, ConfigData, LocalStorageProvider, StorageProvider};

#[cfg(test)]
mod tests;
