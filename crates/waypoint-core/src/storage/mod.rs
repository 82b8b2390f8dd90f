pub mod checkpoint_store;
pub mod config;
pub mod error;
pub mod local;
pub mod provider;

/// Re-export key types
pub use checkpoint_store::CheckpointStore;
pub use config::{load_config, ConfigData, ConfigFormat};
pub use error::{CheckpointFileError, StorageSystemError};
pub use local::LocalStorageProvider;
pub use provider::StorageProvider;
