//! # Arch Linux installer stages
//!
//! The three stages that turn a booted Arch Linux live medium into an
//! installed system, for execution by a `waypoint_core::Pipeline`:
//!
//! 1. [`environment`]: verify and prepare the live medium.
//! 2. [`partitioning`]: partition, format and mount the target drive.
//! 3. [`system`]: install packages and configure the target system.
//!
//! Every step reads the configuration when it runs, so a configuration
//! mistake fails only that step and can be fixed before resuming.
use waypoint_core::{OperationResult, Stage, StageSystemError, Step};

pub mod command;
pub mod context;
pub mod environment;
pub mod error;
pub mod files;
pub mod partitioning;
pub mod system;

pub use command::{Command, CommandRunner, SystemRunner};
pub use context::{InstallContext, Prompter, StdinPrompter};
pub use error::InstallError;

/// Body of an installer step
pub(crate) type Action = fn(&InstallContext) -> OperationResult;

/// All installer stages in execution order.
pub fn stages(ctx: &InstallContext) -> waypoint_core::Result<Vec<Stage>> {
    Ok(vec![
        environment::stage(ctx)?,
        partitioning::stage(ctx)?,
        system::stage(ctx)?,
    ])
}

pub(crate) fn build_stage(
    ctx: &InstallContext,
    name: &str,
    actions: &[(&str, Action)],
) -> Result<Stage, StageSystemError> {
    let steps = actions
        .iter()
        .map(|&(step_name, action)| {
            let ctx = ctx.clone();
            Step::new(step_name, move || action(&ctx))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Stage::new(name, steps)
}

#[cfg(test)]
mod tests;
