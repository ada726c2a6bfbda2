use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use tokio::sync::broadcast;
use tracing::debug;

use crate::backend::{ObserverId, StorageBackend};

use super::subscription::Teardown;

/// Raw events buffered per key before subscribers fall behind. A subscriber
/// that lags past this simply misses the overwritten events; the stream
/// stays alive.
const RAW_CHANNEL_CAPACITY: usize = 64;

struct KeyEntry {
    observer: ObserverId,
    raw_tx: broadcast::Sender<Vec<u8>>,
    subscribers: usize,
}

/// Adapts a backend's raw per-key change events into shared, cancellable
/// fan-out points.
///
/// The first subscription for a key registers exactly one observer with the
/// backend and attaches a broadcast sender; further subscriptions for the
/// same key share it. When the last subscription for a key is torn down the
/// backend observer is deregistered, so register/deregister calls stay
/// symmetric and nothing outlives its subscribers. Distinct keys are fully
/// independent.
pub struct ChangeBridge<B> {
    backend: Arc<B>,
    entries: Arc<Mutex<HashMap<String, KeyEntry>>>,
}

impl<B> Clone for ChangeBridge<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<B: StorageBackend> ChangeBridge<B> {
    /// Creates a bridge over the given backend. No backend observer is
    /// registered until the first subscription is requested.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribes to the raw byte events for `key`.
    ///
    /// Returns the receiver plus the teardown that releases this subscriber's
    /// share of the key entry. The teardown runs at most once; when it drops
    /// the subscriber count to zero it deregisters the backend observer
    /// before returning.
    pub(crate) fn subscribe_raw(&self, key: &str) -> (broadcast::Receiver<Vec<u8>>, Teardown) {
        let receiver = {
            let mut entries = lock_entries(&self.entries);
            let entry = entries.entry(key.to_string()).or_insert_with(|| {
                let (raw_tx, _) = broadcast::channel(RAW_CHANNEL_CAPACITY);
                let observer = self.backend.changes().register(key, raw_tx.clone());
                debug!(key, "registered backend observer for first subscriber");
                KeyEntry {
                    observer,
                    raw_tx,
                    subscribers: 0,
                }
            });
            entry.subscribers += 1;
            entry.raw_tx.subscribe()
        };

        let key = key.to_string();
        let entries = Arc::clone(&self.entries);
        let backend = Arc::clone(&self.backend);
        let teardown: Teardown = Box::new(move || {
            let mut entries = lock_entries(&entries);
            let Some(entry) = entries.get_mut(&key) else {
                return;
            };
            entry.subscribers -= 1;
            if entry.subscribers == 0 {
                backend.changes().deregister(entry.observer);
                entries.remove(&key);
                debug!(key = %key, "deregistered backend observer after last cancel");
            }
        });

        (receiver, teardown)
    }

    /// Number of keys with at least one live subscription.
    pub fn active_keys(&self) -> usize {
        lock_entries(&self.entries).len()
    }
}

fn lock_entries(
    entries: &Mutex<HashMap<String, KeyEntry>>,
) -> MutexGuard<'_, HashMap<String, KeyEntry>> {
    match entries.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
