//! # Waypoint Core Stage Manager Errors
//!
//! Defines [`StageSystemError`], covering the whole life of a step or stage:
//! construction (empty or ambiguous names), execution (re-runs of a
//! succeeded unit, failed operations) and bulk restoration of step states.
use thiserror::Error;

/// Failure type returned by step operations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum StageSystemError {
    #[error("'{name}' has already succeeded and must not be executed again")]
    AlreadySuccessful { name: String },

    #[error("Execution of {kind} '{name}' failed")]
    ExecutionFailed {
        kind: UnitKind,
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("Stage '{stage}' was given more than one step named '{step}'")]
    AmbiguousStepName { stage: String, step: String },

    #[error("Names of stages and steps cannot be empty")]
    EmptyName,

    #[error("Unexpected number of step states for stage '{stage}': expected {expected} but got {actual}")]
    StepCountMismatch { stage: String, expected: usize, actual: usize },

    #[error("Stage '{stage}' has no step named '{step}'")]
    UnknownStep { stage: String, step: String },

    #[error("Invalid checkpoint state: '{value}'")]
    InvalidCheckpointState { value: String },
}

/// Which level of the hierarchy an [`StageSystemError::ExecutionFailed`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Step,
    Stage,
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitKind::Step => write!(f, "step"),
            UnitKind::Stage => write!(f, "stage"),
        }
    }
}

impl StageSystemError {
    /// Whether this is one of the value errors raised while restoring step
    /// states from a persisted snapshot.
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            StageSystemError::StepCountMismatch { .. }
                | StageSystemError::UnknownStep { .. }
                | StageSystemError::InvalidCheckpointState { .. }
        )
    }
}

/// Cause recorded when an operation panics instead of returning an error.
#[derive(Debug, Error)]
#[error("operation panicked: {message}")]
pub struct OperationPanicked {
    pub message: String,
}
