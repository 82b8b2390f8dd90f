use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::stage_manager::error::StageSystemError;

/// The completion state of a checkpoint.
///
/// - `NotStarted`: the unit has never been attempted
/// - `Failed`: the most recent attempt failed
/// - `Succeeded`: the unit ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckpointState {
    #[default]
    NotStarted,
    Failed,
    Succeeded,
}

impl CheckpointState {
    /// Every state, in declaration order
    pub const ALL: [CheckpointState; 3] = [
        CheckpointState::NotStarted,
        CheckpointState::Failed,
        CheckpointState::Succeeded,
    ];

    /// The name used for this state in the checkpoint file
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointState::NotStarted => "NOT_STARTED",
            CheckpointState::Failed => "FAILED",
            CheckpointState::Succeeded => "SUCCEEDED",
        }
    }
}

impl fmt::Display for CheckpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckpointState {
    type Err = StageSystemError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == value)
            .ok_or_else(|| StageSystemError::InvalidCheckpointState { value: value.to_string() })
    }
}

/// Last known outcome of a step or stage.
///
/// Owned by exactly one step or stage. Callers outside the owner can only
/// read it; the owner moves it with [`set_failed`](Self::set_failed) and
/// [`set_succeeded`](Self::set_succeeded).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    state: CheckpointState,
}

impl Checkpoint {
    /// Create a checkpoint in the given state
    pub fn new(state: CheckpointState) -> Self {
        Self { state }
    }

    /// Current state
    pub fn state(&self) -> CheckpointState {
        self.state
    }

    pub fn is_succeeded(&self) -> bool {
        self.state == CheckpointState::Succeeded
    }

    pub fn set_failed(&mut self) {
        self.state = CheckpointState::Failed;
    }

    pub fn set_succeeded(&mut self) {
        self.state = CheckpointState::Succeeded;
    }

    /// Overwrite the state from a persisted snapshot.
    pub(crate) fn restore(&mut self, state: CheckpointState) {
        self.state = state;
    }
}
