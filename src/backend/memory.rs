use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;

use crate::error::Result;

use super::{ChangeEmitter, StorageBackend};

/// In-memory byte-level backend.
///
/// Holds raw encoded bytes in a process-local map and emits a change event on
/// every write. No durability; useful as a test double for persistent stores
/// and as a process-local backend where persistence is not required.
#[derive(Default)]
pub struct MemoryBackend {
    bytes: RwLock<HashMap<String, Vec<u8>>>,
    changes: ChangeEmitter,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<u8>>> {
        match self.bytes.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<u8>>> {
        match self.bytes.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.read_map().get(key).cloned())
    }

    async fn set_bytes(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        {
            let mut map = self.write_map();
            map.insert(key.to_string(), bytes.clone());
        }
        self.changes.emit(key, &bytes);
        Ok(())
    }

    fn changes(&self) -> &ChangeEmitter {
        &self.changes
    }
}
