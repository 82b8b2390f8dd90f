use indexmap::IndexMap;
use log::{debug, error, info};

use crate::kernel::error::Result;
use crate::stage_manager::{CheckpointState, Executable, Stage};
use crate::storage::CheckpointStore;

/// Ordered list of stages making up one run of the tool.
///
/// The pipeline itself is never persisted; only the state of its stages
/// and steps is, through a [`CheckpointStore`].
#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Create a pipeline from stages in execution order
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Stages in execution order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub(crate) fn stages_mut(&mut self) -> &mut [Stage] {
        &mut self.stages
    }

    /// Look up a stage by name
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.name() == name)
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Whether every stage has succeeded
    pub fn is_complete(&self) -> bool {
        self.stages.iter().all(|stage| stage.checkpoint().is_succeeded())
    }

    /// Snapshot of every stage's own state, in execution order
    pub fn states(&self) -> IndexMap<String, CheckpointState> {
        self.stages
            .iter()
            .map(|stage| (stage.name().to_string(), stage.state()))
            .collect()
    }

    /// Run every stage that has not succeeded yet, saving to `store` after
    /// each one.
    ///
    /// Stops at the first failing stage and returns its `ExecutionFailed`
    /// after the failure has been saved.
    pub fn run(&mut self, store: &CheckpointStore) -> Result<()> {
        for index in 0..self.stages.len() {
            if self.stages[index].checkpoint().is_succeeded() {
                debug!("Skipping stage '{}': already succeeded", self.stages[index].name());
                continue;
            }

            let outcome = self.stages[index].execute();
            let saved = store.save(self);

            if let Err(e) = outcome {
                if let Err(save_err) = saved {
                    error!("Failed to save checkpoints after stage failure: {}", save_err);
                }
                return Err(e.into());
            }
            saved?;
        }

        info!("All {} stages completed", self.stages.len());
        Ok(())
    }
}
