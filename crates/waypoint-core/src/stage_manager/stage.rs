use std::fmt;

use indexmap::IndexMap;
use log::debug;

use crate::stage_manager::error::{StageSystemError, UnitKind};
use crate::stage_manager::{Checkpoint, CheckpointState, Executable, Step};

/// An ordered group of uniquely named steps executed as one unit.
///
/// Steps run in the order they were supplied; the map keeps insertion
/// order so the sequence never depends on hashing.
pub struct Stage {
    name: String,
    steps: IndexMap<String, Step>,
    checkpoint: Checkpoint,
}

/// Validated step states, as `(step index, state)` pairs
pub(crate) type StepStatePlan = Vec<(usize, CheckpointState)>;

impl Stage {
    /// Create a `NotStarted` stage from steps in execution order.
    ///
    /// Fails with `AmbiguousStepName` if two steps share a name.
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Result<Self, StageSystemError> {
        let name = name.into();
        if name.is_empty() {
            return Err(StageSystemError::EmptyName);
        }

        let mut by_name = IndexMap::with_capacity(steps.len());
        for step in steps {
            if by_name.contains_key(step.name()) {
                return Err(StageSystemError::AmbiguousStepName {
                    stage: name,
                    step: step.name().to_string(),
                });
            }
            by_name.insert(step.name().to_string(), step);
        }

        Ok(Self {
            name,
            steps: by_name,
            checkpoint: Checkpoint::default(),
        })
    }

    /// Steps in execution order
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.values()
    }

    /// Look up a step by name
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.get(name)
    }

    /// Number of steps in this stage
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Snapshot of every step's state, in execution order
    pub fn step_states(&self) -> IndexMap<String, CheckpointState> {
        self.steps
            .iter()
            .map(|(name, step)| (name.clone(), step.state()))
            .collect()
    }

    /// Bulk-assign step states from a persisted snapshot of state names.
    ///
    /// The snapshot must name every step exactly once with a valid state
    /// name. Nothing is changed unless the whole snapshot is valid.
    pub fn set_step_states<V: AsRef<str>>(
        &mut self,
        states: &IndexMap<String, V>,
    ) -> Result<(), StageSystemError> {
        let plan = self.validate_step_states(states)?;
        self.apply_step_states(&plan);
        Ok(())
    }

    /// Check a snapshot against this stage without touching any state.
    pub(crate) fn validate_step_states<V: AsRef<str>>(
        &self,
        states: &IndexMap<String, V>,
    ) -> Result<StepStatePlan, StageSystemError> {
        if states.len() != self.steps.len() {
            return Err(StageSystemError::StepCountMismatch {
                stage: self.name.clone(),
                expected: self.steps.len(),
                actual: states.len(),
            });
        }

        states
            .iter()
            .map(|(step_name, state_name)| -> Result<(usize, CheckpointState), StageSystemError> {
                let index = self.steps.get_index_of(step_name).ok_or_else(|| {
                    StageSystemError::UnknownStep {
                        stage: self.name.clone(),
                        step: step_name.clone(),
                    }
                })?;
                let state = state_name.as_ref().parse::<CheckpointState>()?;
                Ok((index, state))
            })
            .collect()
    }

    pub(crate) fn apply_step_states(&mut self, plan: &[(usize, CheckpointState)]) {
        for &(index, state) in plan {
            if let Some((_, step)) = self.steps.get_index_mut(index) {
                step.checkpoint_mut().restore(state);
            }
        }
    }

    /// Overwrite the stage's own state from a persisted snapshot.
    pub(crate) fn restore_state(&mut self, state: CheckpointState) {
        self.checkpoint.restore(state);
    }
}

impl Executable for Stage {
    type Output = ();

    fn name(&self) -> &str {
        &self.name
    }

    fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// Runs every step that has not succeeded yet, in order. The first
    /// failing step stops the stage and marks it `Failed`; later steps are
    /// left untouched.
    fn execute(&mut self) -> Result<(), StageSystemError> {
        self.ensure_not_succeeded()?;
        debug!("Executing stage: {}", self.name);

        for step in self.steps.values_mut() {
            if step.checkpoint().is_succeeded() {
                debug!("Skipping step '{}': already succeeded", step.name());
                continue;
            }
            if let Err(source) = step.execute() {
                self.checkpoint.set_failed();
                return Err(StageSystemError::ExecutionFailed {
                    kind: UnitKind::Stage,
                    name: self.name.clone(),
                    source: Box::new(source),
                });
            }
        }

        self.checkpoint.set_succeeded();
        debug!("Stage completed successfully: {}", self.name);
        Ok(())
    }
}

// Manual Debug implementation, steps hold boxed operations
impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("checkpoint", &self.checkpoint)
            .field("steps", &self.step_states())
            .finish()
    }
}
