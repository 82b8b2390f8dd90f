use std::fmt::Debug;
use std::path::Path;

use crate::kernel::error::Result;

/// Trait for storage backends that hold whole-file documents
pub trait StorageProvider: Send + Sync + Debug {
    /// Check if a path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Check if a path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Read a file to a string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Replace the file at `path` with `contents` in a single step. The
    /// parent directory must already exist.
    fn write_string(&self, path: &Path, contents: &str) -> Result<()>;
}
