use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::broadcast;
use tracing::trace;

/// Identifier for a registered raw-change observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Observer {
    key: String,
    sender: broadcast::Sender<Vec<u8>>,
}

/// Per-key raw change-event source.
///
/// Any backend embeds one of these and calls [`ChangeEmitter::emit`] after
/// each successful write. Observers register a broadcast sender for one key
/// and are removed by id; deregistration takes effect before `deregister`
/// returns, so no event reaches a deregistered observer afterwards.
#[derive(Default)]
pub struct ChangeEmitter {
    observers: Mutex<HashMap<ObserverId, Observer>>,
    next_id: AtomicU64,
}

impl ChangeEmitter {
    /// Creates an emitter with no registered observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sender to receive raw bytes for every write to `key`.
    pub fn register(&self, key: &str, sender: broadcast::Sender<Vec<u8>>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers().insert(
            id,
            Observer {
                key: key.to_string(),
                sender,
            },
        );
        trace!(key, observer = id.0, "registered raw-change observer");
        id
    }

    /// Removes an observer. Unknown ids are ignored.
    pub fn deregister(&self, id: ObserverId) {
        if self.observers().remove(&id).is_some() {
            trace!(observer = id.0, "deregistered raw-change observer");
        }
    }

    /// Pushes a raw change event to every observer registered for `key`.
    ///
    /// Observers for other keys never see the event. Send failures (all
    /// receivers gone) are ignored; observer lifetime is managed by
    /// register/deregister, not by receiver liveness.
    pub fn emit(&self, key: &str, bytes: &[u8]) {
        for observer in self.observers().values() {
            if observer.key == key {
                let _ = observer.sender.send(bytes.to_vec());
            }
        }
    }

    /// Number of currently registered observers, across all keys.
    pub fn observer_count(&self) -> usize {
        self.observers().len()
    }

    fn observers(&self) -> MutexGuard<'_, HashMap<ObserverId, Observer>> {
        match self.observers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
