//! Durable pipeline progress.
//!
//! The checkpoint file is a single JSON object keyed by stage name:
//!
//! ```json
//! {
//!   "<stage-name>": {
//!     "status": "NOT_STARTED" | "FAILED" | "SUCCEEDED",
//!     "steps": { "<step-name>": "NOT_STARTED" | "FAILED" | "SUCCEEDED" }
//!   }
//! }
//! ```
//!
//! Its shape must match the live pipeline exactly. Loading validates the
//! whole document before changing any checkpoint.
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, info};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::kernel::constants::{STATUS_KEY, STEPS_KEY};
use crate::kernel::error::Result;
use crate::stage_manager::error::StageSystemError;
use crate::stage_manager::stage::StepStatePlan;
use crate::stage_manager::{CheckpointState, Executable, Pipeline};
use crate::storage::error::{CheckpointFileError, StorageSystemError};
use crate::storage::local::LocalStorageProvider;
use crate::storage::provider::StorageProvider;

/// Persisted form of one stage
#[derive(Debug, Serialize)]
struct StageRecord<'a> {
    status: CheckpointState,
    steps: IndexMap<&'a str, CheckpointState>,
}

/// Reads and writes the checkpoint file of a pipeline.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    provider: Arc<dyn StorageProvider>,
    path: PathBuf,
}

impl CheckpointStore {
    /// Create a store for the checkpoint file at `path`
    pub fn new(provider: Arc<dyn StorageProvider>, path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            path: path.into(),
        }
    }

    /// Create a store backed by the local filesystem
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(LocalStorageProvider::default()), path)
    }

    /// Location of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a checkpoint file is present
    pub fn exists(&self) -> bool {
        self.provider.is_file(&self.path)
    }

    /// Render the checkpoint document for `pipeline`, in pipeline order.
    pub fn render(pipeline: &Pipeline) -> Result<String> {
        ensure_unique_stage_names(pipeline)?;

        let document: IndexMap<&str, StageRecord<'_>> = pipeline
            .stages()
            .iter()
            .map(|stage| {
                let steps = stage.steps().map(|step| (step.name(), step.state())).collect();
                (stage.name(), StageRecord { status: stage.state(), steps })
            })
            .collect();

        serde_json::to_string_pretty(&document).map_err(|e| {
            StorageSystemError::SerializationError {
                format: "JSON".to_string(),
                source: Box::new(e),
            }
            .into()
        })
    }

    /// Replace the checkpoint file with the current state of `pipeline`.
    ///
    /// The containing directory must already exist.
    pub fn save(&self, pipeline: &Pipeline) -> Result<()> {
        let contents = Self::render(pipeline)?;
        self.provider.write_string(&self.path, &contents)?;
        debug!("Saved checkpoints to {}", self.path.display());
        Ok(())
    }

    /// Read the checkpoint file without interpreting it
    pub fn read_document(&self) -> Result<Value> {
        let contents = self.read_contents()?;
        serde_json::from_str(&contents)
            .map_err(|source| CheckpointFileError::MalformedDocument { source }.into())
    }

    /// Overwrite every checkpoint of `pipeline` from the checkpoint file.
    ///
    /// The document must describe exactly the stages and steps of
    /// `pipeline`. On any mismatch an error is returned and no checkpoint is
    /// modified.
    pub fn load(&self, pipeline: &mut Pipeline) -> Result<()> {
        ensure_unique_stage_names(pipeline)?;

        let contents = self.read_contents()?;
        let document: IndexMap<String, Value> = serde_json::from_str(&contents)
            .map_err(|source| CheckpointFileError::MalformedDocument { source })?;

        let plan = validate_document(pipeline, &document)?;

        let stages = pipeline.stages_mut();
        for (index, status, step_plan) in plan {
            stages[index].restore_state(status);
            stages[index].apply_step_states(&step_plan);
        }

        info!("Loaded checkpoints from {}", self.path.display());
        Ok(())
    }

    fn read_contents(&self) -> Result<String> {
        if !self.provider.is_file(&self.path) {
            return Err(StorageSystemError::FileNotFound(self.path.clone()).into());
        }
        self.provider.read_to_string(&self.path)
    }
}

/// Validated stage entry: stage index, stage status and step states
type StagePlan = (usize, CheckpointState, StepStatePlan);

fn ensure_unique_stage_names(pipeline: &Pipeline) -> std::result::Result<(), CheckpointFileError> {
    let mut seen = HashSet::new();
    for stage in pipeline.stages() {
        if !seen.insert(stage.name()) {
            return Err(CheckpointFileError::DuplicateStageName(stage.name().to_string()));
        }
    }
    Ok(())
}

fn validate_document(
    pipeline: &Pipeline,
    document: &IndexMap<String, Value>,
) -> std::result::Result<Vec<StagePlan>, CheckpointFileError> {
    if document.len() != pipeline.len() {
        return Err(CheckpointFileError::StageCountMismatch {
            expected: pipeline.len(),
            actual: document.len(),
        });
    }

    let mut plan = Vec::with_capacity(document.len());
    for (stage_name, entry) in document {
        let index = pipeline
            .stages()
            .iter()
            .position(|stage| stage.name() == stage_name.as_str())
            .ok_or_else(|| CheckpointFileError::UnknownStage(stage_name.clone()))?;

        let entry = entry.as_object().ok_or_else(|| CheckpointFileError::StageNotAnObject {
            stage: stage_name.clone(),
        })?;
        if entry.len() != 2 {
            return Err(CheckpointFileError::InvalidKeyCount {
                stage: stage_name.clone(),
                count: entry.len(),
            });
        }
        let field = |key: &str| {
            entry.get(key).ok_or_else(|| CheckpointFileError::MissingKey {
                stage: stage_name.clone(),
                key: key.to_string(),
            })
        };
        let status_value = field(STATUS_KEY)?;
        let steps_value = field(STEPS_KEY)?;

        let status = status_value
            .as_str()
            .and_then(|name| name.parse::<CheckpointState>().ok())
            .ok_or_else(|| CheckpointFileError::InvalidStatus {
                stage: stage_name.clone(),
                value: status_value.to_string(),
            })?;

        let invalid_steps = |source: StageSystemError| CheckpointFileError::InvalidSteps {
            stage: stage_name.clone(),
            source,
        };
        let steps = steps_value.as_object().ok_or_else(|| CheckpointFileError::StepsNotAnObject {
            stage: stage_name.clone(),
        })?;
        let step_names = step_state_names(steps).map_err(invalid_steps)?;
        let step_plan = pipeline.stages()[index]
            .validate_step_states(&step_names)
            .map_err(invalid_steps)?;

        plan.push((index, status, step_plan));
    }
    Ok(plan)
}

/// Read the `steps` object as step name -> state name
fn step_state_names(
    steps: &Map<String, Value>,
) -> std::result::Result<IndexMap<String, String>, StageSystemError> {
    steps
        .iter()
        .map(|(name, state)| match state.as_str() {
            Some(state) => Ok((name.clone(), state.to_string())),
            None => Err(StageSystemError::InvalidCheckpointState { value: state.to_string() }),
        })
        .collect()
}
