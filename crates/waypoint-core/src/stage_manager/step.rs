use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use log::debug;

use crate::stage_manager::error::{BoxError, OperationPanicked, StageSystemError, UnitKind};
use crate::stage_manager::{Checkpoint, Executable};

/// Outcome of a single operation run
pub type OperationResult<T = ()> = Result<T, BoxError>;

/// A zero-argument unit of work that either produces a value or fails.
///
/// Implemented for every `FnMut() -> OperationResult<T>`, so a closure
/// capturing its arguments is the usual way to build one. Types that carry
/// their own arguments can implement it directly.
pub trait Operation<T = ()> {
    fn run(&mut self) -> OperationResult<T>;
}

impl<T, F> Operation<T> for F
where
    F: FnMut() -> OperationResult<T>,
{
    fn run(&mut self) -> OperationResult<T> {
        self()
    }
}

/// Leaf unit of work: a name, an operation and a checkpoint.
pub struct Step<T = ()> {
    name: String,
    operation: Box<dyn Operation<T>>,
    checkpoint: Checkpoint,
}

impl<T> Step<T> {
    /// Create a `NotStarted` step. The name must not be empty.
    pub fn new<O>(name: impl Into<String>, operation: O) -> Result<Self, StageSystemError>
    where
        O: Operation<T> + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(StageSystemError::EmptyName);
        }
        Ok(Self {
            name,
            operation: Box::new(operation),
            checkpoint: Checkpoint::default(),
        })
    }

    pub(crate) fn checkpoint_mut(&mut self) -> &mut Checkpoint {
        &mut self.checkpoint
    }

    fn fail(&mut self, source: BoxError) -> StageSystemError {
        self.checkpoint.set_failed();
        debug!("Step failed: {} - {}", self.name, source);
        StageSystemError::ExecutionFailed {
            kind: UnitKind::Step,
            name: self.name.clone(),
            source,
        }
    }
}

impl<T> Executable for Step<T> {
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// Runs the operation once. Errors and panics both leave the checkpoint
    /// `Failed` and surface as `ExecutionFailed` carrying the cause.
    fn execute(&mut self) -> Result<T, StageSystemError> {
        self.ensure_not_succeeded()?;
        debug!("Executing step: {}", self.name);

        let operation = &mut self.operation;
        match panic::catch_unwind(AssertUnwindSafe(|| operation.run())) {
            Ok(Ok(value)) => {
                self.checkpoint.set_succeeded();
                debug!("Step completed successfully: {}", self.name);
                Ok(value)
            }
            Ok(Err(source)) => Err(self.fail(source)),
            Err(panic_obj) => {
                let message = panic_message(panic_obj.as_ref());
                Err(self.fail(Box::new(OperationPanicked { message })))
            }
        }
    }
}

fn panic_message(panic_obj: &(dyn Any + Send)) -> String {
    if let Some(s_ref) = panic_obj.downcast_ref::<&'static str>() {
        (*s_ref).to_string()
    } else if let Some(s_obj) = panic_obj.downcast_ref::<String>() {
        s_obj.clone()
    } else {
        "Unknown panic reason".to_string()
    }
}

impl<T> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("checkpoint", &self.checkpoint)
            .finish_non_exhaustive()
    }
}
