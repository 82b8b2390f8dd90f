#![cfg(test)]

use std::error::Error as _;
use std::fs;

use serde_json::json;

use super::common::{Recorder, TestEnvironment};
use crate::kernel::error::{Error, Result};
use crate::stage_manager::{CheckpointState, Executable, StageSystemError};
use crate::storage::CheckpointFileError;

#[test]
fn test_failed_run_then_resume() -> Result<()> {
    let env = TestEnvironment::new();
    let store = env.store();
    let recorder = Recorder::broken();

    // First run: the pipeline is created fresh and its initial state saved
    let mut pipeline = recorder.pipeline();
    store.save(&pipeline)?;
    let err = pipeline.run(&store).unwrap_err();
    assert!(err.is_execution_failure());
    assert_eq!(recorder.runs(), vec!["a", "b"]);

    let document = store.read_document()?;
    assert_eq!(
        document["init"],
        json!({ "status": "FAILED", "steps": { "a": "SUCCEEDED", "b": "FAILED" } })
    );
    assert_eq!(
        document["finish"],
        json!({ "status": "NOT_STARTED", "steps": { "c": "NOT_STARTED" } })
    );

    // Second run after the problem is fixed: only the unfinished work runs
    recorder.repair();
    recorder.clear();
    let mut pipeline = recorder.pipeline();
    store.load(&mut pipeline)?;
    pipeline.run(&store)?;

    assert_eq!(recorder.runs(), vec!["b", "c"]);
    assert!(pipeline.is_complete());
    assert_eq!(
        store.read_document()?,
        json!({
            "init": { "status": "SUCCEEDED", "steps": { "a": "SUCCEEDED", "b": "SUCCEEDED" } },
            "finish": { "status": "SUCCEEDED", "steps": { "c": "SUCCEEDED" } }
        })
    );
    Ok(())
}

#[test]
fn test_completed_pipeline_runs_nothing() -> Result<()> {
    let env = TestEnvironment::new();
    let store = env.store();
    let recorder = Recorder::default();

    recorder.pipeline().run(&store)?;
    recorder.clear();

    let mut pipeline = recorder.pipeline();
    store.load(&mut pipeline)?;
    assert!(pipeline.is_complete());
    pipeline.run(&store)?;

    assert!(recorder.runs().is_empty());
    Ok(())
}

#[test]
fn test_repeated_failures_keep_earlier_progress() -> Result<()> {
    let env = TestEnvironment::new();
    let store = env.store();
    let recorder = Recorder::broken();

    for _ in 0..3 {
        recorder.clear();
        let mut pipeline = recorder.pipeline();
        if store.exists() {
            store.load(&mut pipeline)?;
        }
        assert!(pipeline.run(&store).is_err());
    }

    // `a` ran once in the first attempt only
    assert_eq!(recorder.runs(), vec!["b"]);
    let mut pipeline = recorder.pipeline();
    store.load(&mut pipeline)?;
    let init = pipeline.stage("init").unwrap();
    assert_eq!(init.step("a").unwrap().state(), CheckpointState::Succeeded);
    assert_eq!(init.step("b").unwrap().state(), CheckpointState::Failed);
    Ok(())
}

#[test]
fn test_failure_chain_names_stage_then_step() -> Result<()> {
    let env = TestEnvironment::new();
    let recorder = Recorder::broken();

    let err = recorder.pipeline().run(&env.store()).unwrap_err();

    assert_eq!(err.to_string(), "Execution of stage 'init' failed");
    let step_err = err.source().expect("stage failure has a cause");
    assert_eq!(step_err.to_string(), "Execution of step 'b' failed");
    let cause = step_err.source().expect("step failure has a cause");
    assert_eq!(cause.to_string(), "b is broken");
    Ok(())
}

#[test]
fn test_edited_pipeline_rejects_old_checkpoints() -> Result<()> {
    let env = TestEnvironment::new();
    let store = env.store();
    store.save(&Recorder::default().pipeline())?;

    // A checkpoint file written by a pipeline with a different shape
    let stale = json!({
        "init": { "status": "SUCCEEDED", "steps": { "a": "SUCCEEDED", "b": "SUCCEEDED" } }
    });
    fs::write(&env.checkpoint_path, stale.to_string()).unwrap();

    let mut pipeline = Recorder::default().pipeline();
    let err = store.load(&mut pipeline).unwrap_err();

    assert!(matches!(
        err,
        Error::CheckpointFile(CheckpointFileError::StageCountMismatch { expected: 2, actual: 1 })
    ));
    assert!(pipeline.states().values().all(|s| *s == CheckpointState::NotStarted));
    Ok(())
}

#[test]
fn test_missing_checkpoint_directory_is_fatal() {
    let env = TestEnvironment::new();
    let store = crate::storage::CheckpointStore::local(env.dir().join("nope").join("cp.json"));
    let recorder = Recorder::default();

    let err = recorder.pipeline().run(&store).unwrap_err();

    assert!(!err.is_execution_failure());
    assert!(!matches!(err, Error::StageSystem(StageSystemError::ExecutionFailed { .. })));
    // The stage itself still ran before the save failed
    assert_eq!(recorder.runs(), vec!["a", "b"]);
}
