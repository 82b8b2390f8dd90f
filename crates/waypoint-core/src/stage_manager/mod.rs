//! # Waypoint Core Stage Manager
//!
//! The staged-execution engine. A [`Step`] binds a name to an [`Operation`];
//! a [`Stage`] runs its steps in declared order; a [`Pipeline`] runs its
//! stages in order and persists progress after each one. Every step and
//! stage owns a [`Checkpoint`], and a unit whose checkpoint is
//! `Succeeded` is never run again, which is what makes a re-invocation
//! resume where the previous one stopped.
pub mod checkpoint;
pub mod error;
pub mod pipeline;
pub mod stage;
pub mod step;

pub use checkpoint::{Checkpoint, CheckpointState};
pub use error::{BoxError, OperationPanicked, StageSystemError, UnitKind};
pub use pipeline::Pipeline;
pub use stage::Stage;
pub use step::{Operation, OperationResult, Step};

/// Behaviour shared by steps and stages: a named unit of work with a
/// checkpoint that refuses to run again once it has succeeded.
pub trait Executable {
    /// Value handed back by a successful execution
    type Output;

    /// The unit's name, unique among its siblings
    fn name(&self) -> &str;

    /// The unit's checkpoint
    fn checkpoint(&self) -> &Checkpoint;

    /// Run the unit, recording the outcome in its checkpoint.
    fn execute(&mut self) -> Result<Self::Output, StageSystemError>;

    /// Current checkpoint state
    fn state(&self) -> CheckpointState {
        self.checkpoint().state()
    }

    /// Fails with `AlreadySuccessful` if the unit has already succeeded.
    fn ensure_not_succeeded(&self) -> Result<(), StageSystemError> {
        if self.checkpoint().is_succeeded() {
            return Err(StageSystemError::AlreadySuccessful { name: self.name().to_string() });
        }
        Ok(())
    }
}

// Test module declaration
#[cfg(test)]
mod tests;
