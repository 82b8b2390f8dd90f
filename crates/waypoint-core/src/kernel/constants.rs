/// Application name
pub const APP_NAME: &str = "waypoint";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default location of the installer configuration file
pub const DEFAULT_CONFIG_FILE: &str = "/etc/waypoint/target.yml";

/// Default location of the checkpoint file
pub const DEFAULT_CHECKPOINT_FILE: &str = "/var/cache/waypoint/checkpoints.json";

/// Key holding a stage's own checkpoint state in the checkpoint file
pub const STATUS_KEY: &str = "status";

/// Key holding a stage's step states in the checkpoint file
pub const STEPS_KEY: &str = "steps";
