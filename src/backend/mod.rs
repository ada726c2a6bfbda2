//! Storage backends: the byte-level media underneath persistent stores.
//!
//! A backend holds a key to bytes mapping and pushes a raw change event for
//! every write, from the point an observer registers forward. Backends shared
//! with other writers are expected to be internally thread-safe for
//! concurrent byte-level access; the core adds no locking beyond the change
//! emitter's own bookkeeping.

mod emitter;
mod file;
mod memory;

pub use emitter::{ChangeEmitter, ObserverId};
pub use file::FileBackend;
pub use memory::MemoryBackend;

use async_trait::async_trait;

use crate::error::Result;

/// Capability set a durable collaborator must expose to the core.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Returns the raw bytes stored under `key`, or `None` if the key was
    /// never written.
    ///
    /// # Errors
    /// Returns a backend error if the storage medium fails. An absent key is
    /// not an error.
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores raw bytes under `key`, fully replacing any prior value, and
    /// emits a raw change event to registered observers.
    ///
    /// # Errors
    /// Returns a backend error if the storage medium fails.
    async fn set_bytes(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// The backend's raw change-event source.
    fn changes(&self) -> &ChangeEmitter;
}
