#![cfg(test)]

use std::error::Error as _;
use std::fs;

use super::common::TestEnvironment;
use crate::kernel::error::Result;
use crate::stage_manager::{OperationResult, Pipeline, Stage, Step};
use crate::storage::{load_config, ConfigData, LocalStorageProvider};

#[test]
fn test_config_problem_becomes_resumable_step_failure() -> Result<()> {
    let env = TestEnvironment::new();
    let config_path = env.dir().join("target.yml");
    fs::write(&config_path, "hostname: archbox\n").unwrap();
    let store = env.store();

    let build = |config: ConfigData| -> Result<Pipeline> {
        let step = Step::new("write hostname", move || -> OperationResult {
            let _timezone: String = config.require("timezone")?;
            Ok(())
        })?;
        Ok(Pipeline::new(vec![Stage::new("system", vec![step])?]))
    };

    let config = load_config(&LocalStorageProvider::default(), &config_path)?;
    let err = build(config)?.run(&store).unwrap_err();
    let cause = err
        .source()
        .and_then(|step_err| step_err.source())
        .expect("missing key is the root cause");
    assert!(cause.to_string().contains("timezone"));

    // Fix the configuration and re-run
    fs::write(&config_path, "hostname: archbox\ntimezone: Europe/Berlin\n").unwrap();
    let config = load_config(&LocalStorageProvider::default(), &config_path)?;
    let mut pipeline = build(config)?;
    store.load(&mut pipeline)?;
    pipeline.run(&store)?;

    assert!(pipeline.is_complete());
    Ok(())
}
