use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::kernel::error::{Error, Result};
use crate::storage::error::StorageSystemError;
use crate::storage::provider::StorageProvider;

/// Local filesystem storage provider
#[derive(Clone, Default)]
pub struct LocalStorageProvider {
    base_path: PathBuf,
}

impl LocalStorageProvider {
    /// Create a provider that resolves relative paths against `base_path`.
    /// Absolute paths are used as given.
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Resolve a relative path against the base path. An empty result
    /// means the current directory.
    fn resolve_path<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let full_path = self.base_path.join(path);
        if full_path.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            full_path
        }
    }
}

impl StorageProvider for LocalStorageProvider {
    fn is_file(&self, path: &Path) -> bool {
        self.resolve_path(path).is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.resolve_path(path).is_dir()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let full_path = self.resolve_path(path);
        if !full_path.is_file() {
            return Err(StorageSystemError::FileNotFound(full_path).into());
        }
        fs::read_to_string(&full_path).map_err(|e| Error::io(e, "read_to_string", full_path))
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<()> {
        let full_path = self.resolve_path(path);

        // A bare file name lives in the base directory
        let relative_parent = path.parent().unwrap_or_else(|| Path::new(""));
        let parent = self.resolve_path(relative_parent);
        if !self.is_dir(relative_parent) {
            return Err(StorageSystemError::DirectoryNotFound(parent).into());
        }

        // Create a named temporary file in the same directory as the target file
        let mut temp_file = NamedTempFile::new_in(&parent)
            .map_err(|e| Error::io(e, "create_temp_file", parent.clone()))?;

        temp_file
            .write_all(contents.as_bytes())
            .and_then(|()| temp_file.as_file().sync_all())
            .map_err(|e| Error::io(e, "write_to_temp_file", temp_file.path().to_path_buf()))?;

        // Persist the temporary file, atomically replacing the target file
        temp_file
            .persist(&full_path)
            .map_err(|e| Error::io(e.error, "persist_temp_file", full_path.clone()))?;

        Ok(())
    }
}

impl fmt::Debug for LocalStorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStorageProvider")
            .field("base_path", &self.base_path)
            .finish()
    }
}
