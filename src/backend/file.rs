use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::error::{Result, StoreError};

use super::{ChangeEmitter, StorageBackend};

/// File-system backend storing one file per key under a root directory.
///
/// The key is used as the file name, so it must be a plain name: keys
/// containing path separators, or equal to `.` or `..`, are rejected with a
/// backend error so no key can address a file outside the root. Writes are
/// plain file writes; durability beyond that (fsync policy, atomic rename)
/// is out of scope.
pub struct FileBackend {
    root: PathBuf,
    changes: ChangeEmitter,
}

impl FileBackend {
    /// Creates a backend rooted at the given directory.
    ///
    /// The directory is created on first write if it does not exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            changes: ChangeEmitter::new(),
        }
    }

    /// The directory this backend stores files under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
            return Err(StoreError::backend(key, "key is not usable as a file name"));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)?).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(StoreError::backend(key, error)),
        }
    }

    async fn set_bytes(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)
            .await
            .map_err(|error| StoreError::backend(key, error))?;
        fs::write(path, &bytes)
            .await
            .map_err(|error| StoreError::backend(key, error))?;
        debug!(key, len = bytes.len(), "wrote key file");
        self.changes.emit(key, &bytes);
        Ok(())
    }

    fn changes(&self) -> &ChangeEmitter {
        &self.changes
    }
}
