use indexmap::IndexMap;

use super::{CallCounter, CountingOperation, ExecutionLog};
use crate::stage_manager::{
    CheckpointState, Executable, Stage, StageSystemError, Step, UnitKind,
};

fn states(stage: &Stage) -> Vec<(String, CheckpointState)> {
    stage.step_states().into_iter().collect()
}

fn snapshot(entries: &[(&str, &str)]) -> IndexMap<String, String> {
    entries
        .iter()
        .map(|(name, state)| (name.to_string(), state.to_string()))
        .collect()
}

#[test]
fn test_stage_rejects_duplicate_step_names() {
    let log = ExecutionLog::default();
    let result = Stage::new("init", vec![log.step("a"), log.step("b"), log.step("a")]);

    match result {
        Err(StageSystemError::AmbiguousStepName { stage, step }) => {
            assert_eq!(stage, "init");
            assert_eq!(step, "a");
        }
        other => panic!("Expected AmbiguousStepName, got {:?}", other),
    }
}

#[test]
fn test_stage_requires_a_name() {
    assert!(matches!(Stage::new("", vec![]), Err(StageSystemError::EmptyName)));
}

#[test]
fn test_stage_preserves_declared_order() {
    let log = ExecutionLog::default();
    let names = ["zeta", "alpha", "mu", "beta", "omega", "gamma"];
    let mut stage = Stage::new("ordered", names.iter().map(|n| log.step(n)).collect()).unwrap();

    let listed: Vec<&str> = stage.steps().map(|step| step.name()).collect();
    assert_eq!(listed, names);

    stage.execute().unwrap();

    assert_eq!(log.entries(), names);
    assert_eq!(stage.state(), CheckpointState::Succeeded);
}

#[test]
fn test_failing_step_stops_the_stage() {
    let log = ExecutionLog::default();
    let mut stage = Stage::new(
        "partitioning",
        vec![log.step("a"), log.failing_step("b"), log.step("c"), log.step("d")],
    )
    .unwrap();

    let err = stage.execute().unwrap_err();

    assert_eq!(log.entries(), vec!["a", "b"], "Steps after the failure must not run");
    assert_eq!(stage.state(), CheckpointState::Failed);
    assert_eq!(
        states(&stage),
        vec![
            ("a".to_string(), CheckpointState::Succeeded),
            ("b".to_string(), CheckpointState::Failed),
            ("c".to_string(), CheckpointState::NotStarted),
            ("d".to_string(), CheckpointState::NotStarted),
        ]
    );

    // Stage wraps the step's ExecutionFailed exactly once
    match err {
        StageSystemError::ExecutionFailed { kind, name, source } => {
            assert_eq!(kind, UnitKind::Stage);
            assert_eq!(name, "partitioning");
            let step_err = source
                .downcast_ref::<StageSystemError>()
                .expect("cause should be the step's error");
            assert!(matches!(
                step_err,
                StageSystemError::ExecutionFailed { kind: UnitKind::Step, name, .. } if name == "b"
            ));
        }
        other => panic!("Expected ExecutionFailed, got {:?}", other),
    }
}

#[test]
fn test_succeeded_stage_is_never_rerun() {
    let calls = CallCounter::default();
    let step: Step = Step::new("only", CountingOperation::new(&calls)).unwrap();
    let mut stage = Stage::new("once", vec![step]).unwrap();
    stage.execute().unwrap();

    let err = stage.execute().unwrap_err();

    assert!(matches!(err, StageSystemError::AlreadySuccessful { ref name } if name == "once"));
    assert_eq!(calls.count(), 1);
}

#[test]
fn test_resume_runs_only_unfinished_steps() {
    let calls_a = CallCounter::default();
    let calls_b = CallCounter::default();
    let calls_c = CallCounter::default();
    let (op_b, fail_b) = CountingOperation::failing(&calls_b);
    let mut stage = Stage::new(
        "resume",
        vec![
            Step::new("A", CountingOperation::new(&calls_a)).unwrap(),
            Step::new("B", op_b).unwrap(),
            Step::new("C", CountingOperation::new(&calls_c)).unwrap(),
        ],
    )
    .unwrap();
    stage
        .set_step_states(&snapshot(&[("A", "SUCCEEDED"), ("B", "FAILED"), ("C", "NOT_STARTED")]))
        .unwrap();

    fail_b.set(false);
    stage.execute().unwrap();

    assert_eq!(calls_a.count(), 0, "A already succeeded and must be skipped");
    assert_eq!(calls_b.count(), 1);
    assert_eq!(calls_c.count(), 1);
    assert_eq!(stage.state(), CheckpointState::Succeeded);
    assert!(states(&stage).iter().all(|(_, state)| *state == CheckpointState::Succeeded));
}

#[test]
fn test_failed_stage_can_be_retried() {
    let calls = CallCounter::default();
    let (operation, fail) = CountingOperation::failing(&calls);
    let log = ExecutionLog::default();
    let mut stage = Stage::new(
        "retry",
        vec![log.step("first"), Step::new("second", operation).unwrap()],
    )
    .unwrap();

    assert!(stage.execute().is_err());
    assert_eq!(stage.state(), CheckpointState::Failed);

    fail.set(false);
    stage.execute().unwrap();

    assert_eq!(stage.state(), CheckpointState::Succeeded);
    assert_eq!(log.entries(), vec!["first"], "First step ran only once");
    assert_eq!(calls.count(), 2);
}

#[test]
fn test_get_and_set_step_states() {
    let log = ExecutionLog::default();
    let mut stage = Stage::new("snap", vec![log.step("x"), log.step("y")]).unwrap();

    // Order in the snapshot does not matter
    stage
        .set_step_states(&snapshot(&[("y", "FAILED"), ("x", "SUCCEEDED")]))
        .unwrap();

    assert_eq!(
        states(&stage),
        vec![
            ("x".to_string(), CheckpointState::Succeeded),
            ("y".to_string(), CheckpointState::Failed),
        ]
    );
    // The stage's own checkpoint is untouched
    assert_eq!(stage.state(), CheckpointState::NotStarted);
}

#[test]
fn test_set_step_states_rejects_wrong_count() {
    let log = ExecutionLog::default();
    let mut stage = Stage::new("snap", vec![log.step("x"), log.step("y")]).unwrap();

    let err = stage.set_step_states(&snapshot(&[("x", "SUCCEEDED")])).unwrap_err();

    assert!(matches!(
        err,
        StageSystemError::StepCountMismatch { expected: 2, actual: 1, .. }
    ));
    assert!(err.is_value_error());
}

#[test]
fn test_set_step_states_rejects_unknown_step() {
    let log = ExecutionLog::default();
    let mut stage = Stage::new("snap", vec![log.step("x"), log.step("y")]).unwrap();

    let err = stage
        .set_step_states(&snapshot(&[("x", "SUCCEEDED"), ("z", "SUCCEEDED")]))
        .unwrap_err();

    assert!(matches!(err, StageSystemError::UnknownStep { ref step, .. } if step == "z"));
}

#[test]
fn test_set_step_states_is_all_or_nothing() {
    let log = ExecutionLog::default();
    let mut stage = Stage::new("snap", vec![log.step("x"), log.step("y")]).unwrap();

    // First entry is valid, second is not: nothing may be applied
    let err = stage
        .set_step_states(&snapshot(&[("x", "SUCCEEDED"), ("y", "BOGUS")]))
        .unwrap_err();

    assert!(matches!(err, StageSystemError::InvalidCheckpointState { ref value } if value == "BOGUS"));
    assert!(states(&stage).iter().all(|(_, state)| *state == CheckpointState::NotStarted));
}
