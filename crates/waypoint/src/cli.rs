use std::path::Path;

use arch_install::InstallContext;
use log::{error, info};
use waypoint_core::kernel::constants::APP_NAME;
use waypoint_core::storage::load_config;
use waypoint_core::{CheckpointStore, Error, LocalStorageProvider, Pipeline, Result};

/// The installer pipeline, synchronised with its checkpoint file.
pub struct Session {
    ctx: InstallContext,
    pipeline: Pipeline,
    store: CheckpointStore,
}

impl Session {
    /// Load the configuration, build the installer pipeline and restore its
    /// progress. Without a checkpoint file a fresh one is written.
    pub fn open(config_path: &Path, checkpoint_path: &Path) -> Result<Self> {
        let config = load_config(&LocalStorageProvider::default(), config_path)?;
        let ctx = InstallContext::new(config);
        let mut pipeline = Pipeline::new(arch_install::stages(&ctx)?);

        let store = CheckpointStore::local(checkpoint_path);
        if store.exists() {
            store.load(&mut pipeline)?;
        } else {
            info!("Creating checkpoint file {}", checkpoint_path.display());
            store.save(&pipeline)?;
        }

        Ok(Self { ctx, pipeline, store })
    }

    /// Run every stage that has not succeeded yet.
    pub fn run(&mut self) -> Result<()> {
        if self.pipeline.is_complete() {
            info!("All stages have already succeeded.");
        }
        self.pipeline.run(&self.store)?;
        info!("Finished.");
        Ok(())
    }

    pub fn checkpoints_json(&self) -> Result<String> {
        CheckpointStore::render(&self.pipeline)
    }

    pub fn config_json(&self) -> Result<String> {
        self.ctx.config.to_json_pretty()
    }
}

/// Log a fatal error with its full chain of causes.
pub fn report_failure(error: &Error) {
    error!("Aborting: {}", error);
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        error!("Caused by: {}", cause);
        source = std::error::Error::source(cause);
    }
    error!("You can try to fix the problem and re-run {} to continue.", APP_NAME);
}
