#![cfg(test)]

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use tempfile::TempDir;

use crate::stage_manager::{OperationResult, Pipeline, Stage, Step};
use crate::storage::CheckpointStore;

/// Scratch directory holding a checkpoint file
pub struct TestEnvironment {
    // Keeps the directory alive for the duration of the test
    temp_dir: TempDir,
    pub checkpoint_path: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let checkpoint_path = dir.path().join("checkpoints.json");
        Self { temp_dir: dir, checkpoint_path }
    }

    pub fn store(&self) -> CheckpointStore {
        CheckpointStore::local(&self.checkpoint_path)
    }

    pub fn dir(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }
}

/// Shared record of which steps ran, plus a switch that breaks step `b`
#[derive(Clone, Default)]
pub struct Recorder {
    runs: Rc<RefCell<Vec<String>>>,
    broken: Rc<Cell<bool>>,
}

impl Recorder {
    pub fn broken() -> Self {
        let recorder = Self::default();
        recorder.broken.set(true);
        recorder
    }

    pub fn repair(&self) {
        self.broken.set(false);
    }

    pub fn runs(&self) -> Vec<String> {
        self.runs.borrow().clone()
    }

    pub fn clear(&self) {
        self.runs.borrow_mut().clear();
    }

    fn step(&self, name: &str, may_break: bool) -> Step {
        let runs = Rc::clone(&self.runs);
        let broken = Rc::clone(&self.broken);
        let step_name = name.to_string();
        Step::new(name, move || -> OperationResult {
            runs.borrow_mut().push(step_name.clone());
            if may_break && broken.get() {
                return Err(format!("{} is broken", step_name).into());
            }
            Ok(())
        })
        .expect("valid step name")
    }

    /// `init` = [a, b], `finish` = [c]; `b` fails while the recorder is broken.
    ///
    /// Every call builds a fresh pipeline, the way each run of the installer
    /// does.
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(vec![
            Stage::new("init", vec![self.step("a", false), self.step("b", true)])
                .expect("valid stage"),
            Stage::new("finish", vec![self.step("c", false)]).expect("valid stage"),
        ])
    }
}
