use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::error::{Result, StoreError};

use super::{KeyValueStore, ObservableStore, StoredValue, Subscription};

const COMMAND_CHANNEL_CAPACITY: usize = 100;

/// Change events buffered per key before a subscriber falls behind. A
/// subscriber that lags past this misses the overwritten events for its own
/// key only; writes to other keys never consume its buffer.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A stored value with its concrete type erased. The `TypeId` witness lives
/// inside the `dyn Any`; reads recover the type with an explicit downcast.
type ErasedValue = Arc<dyn Any + Send + Sync>;

/// One broadcast sender per observed key. Shared between `observe` (which
/// creates entries synchronously) and the worker task (which publishes into
/// them and prunes entries whose receivers are all gone).
type WatcherTable = Arc<Mutex<HashMap<String, broadcast::Sender<ErasedValue>>>>;

enum StoreCommand {
    Read {
        key: String,
        reply: oneshot::Sender<Option<ErasedValue>>,
    },
    Store {
        key: String,
        value: ErasedValue,
        reply: oneshot::Sender<()>,
    },
}

/// In-process, single-owner typed store.
///
/// A dedicated task exclusively owns the key to value map and processes one
/// command at a time, so no two operations ever interleave and no caller
/// needs a lock. A `store` followed by a `read` issued after it completes
/// always observes that value or a later one.
///
/// Reading a missing key, or a key holding a value of a different type than
/// requested, returns `Ok(None)`: a type mismatch is a cache miss, not
/// corruption.
#[derive(Clone)]
pub struct MemoryStore {
    command_tx: mpsc::Sender<StoreCommand>,
    watchers: WatcherTable,
    _handle: Arc<JoinHandle<()>>,
}

impl MemoryStore {
    /// Creates a store with its own dedicated worker task.
    ///
    /// Must be called from within a tokio runtime. The worker runs until
    /// every clone of the store is dropped.
    pub fn new() -> Self {
        let (command_tx, mut command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let watchers: WatcherTable = Arc::new(Mutex::new(HashMap::new()));
        let actor_watchers = Arc::clone(&watchers);

        let handle = tokio::spawn(async move {
            store_actor_loop(&mut command_rx, &actor_watchers).await;
        });

        Self {
            command_tx,
            watchers,
            _handle: Arc::new(handle),
        }
    }

    async fn send(&self, command: StoreCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| store_unavailable())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn read<T: StoredValue>(&self, key: &str) -> Result<Option<T>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(StoreCommand::Read {
            key: key.to_string(),
            reply: reply_tx,
        })
        .await?;
        let stored = reply_rx.await.map_err(|_| store_unavailable())?;

        // type mismatch reads as a miss, never as an error
        Ok(stored.and_then(|value| value.downcast_ref::<T>().cloned()))
    }

    async fn store<T: StoredValue>(&self, key: &str, value: T) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let erased: ErasedValue = Arc::new(value.clone());
        self.send(StoreCommand::Store {
            key: key.to_string(),
            value: erased,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| store_unavailable())?;
        Ok(value)
    }
}

impl ObservableStore for MemoryStore {
    fn observe<T: StoredValue>(&self, key: &str) -> Subscription<T> {
        // each key gets its own channel, so writes to one key can never lag
        // another key's subscribers out of their buffered events
        let receiver = {
            let mut watchers = lock_watchers(&self.watchers);
            watchers
                .entry(key.to_string())
                .or_insert_with(|| broadcast::channel(CHANGE_CHANNEL_CAPACITY).0)
                .subscribe()
        };
        let observed_key = key.to_string();

        let values = stream! {
            let mut events = BroadcastStream::new(receiver);
            while let Some(event) = events.next().await {
                // a lagged receiver skips overwritten events and stays live
                let Ok(value) = event else { continue };
                match value.downcast_ref::<T>() {
                    Some(value) => yield value.clone(),
                    None => {
                        debug!(key = %observed_key, "dropping change event of unexpected type");
                    }
                }
            }
        };

        // nothing to detach on the store side: dropping the stream releases
        // the broadcast receiver, and the worker prunes receiverless senders
        Subscription::new(key, Box::pin(values), Box::new(|| {}))
    }
}

async fn store_actor_loop(
    command_rx: &mut mpsc::Receiver<StoreCommand>,
    watchers: &Mutex<HashMap<String, broadcast::Sender<ErasedValue>>>,
) {
    let mut values: HashMap<String, ErasedValue> = HashMap::new();

    while let Some(command) = command_rx.recv().await {
        match command {
            StoreCommand::Read { key, reply } => {
                let _ = reply.send(values.get(&key).cloned());
            }

            StoreCommand::Store { key, value, reply } => {
                values.insert(key.clone(), Arc::clone(&value));
                notify_watchers(watchers, &key, value);
                let _ = reply.send(());
            }
        }
    }
}

fn notify_watchers(
    watchers: &Mutex<HashMap<String, broadcast::Sender<ErasedValue>>>,
    key: &str,
    value: ErasedValue,
) {
    let mut watchers = lock_watchers(watchers);
    if let Some(sender) = watchers.get(key) {
        if sender.send(value).is_err() {
            // all receivers are gone; the next observe recreates the entry
            watchers.remove(key);
        }
    }
}

fn lock_watchers(
    watchers: &Mutex<HashMap<String, broadcast::Sender<ErasedValue>>>,
) -> MutexGuard<'_, HashMap<String, broadcast::Sender<ErasedValue>>> {
    match watchers.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn store_unavailable() -> StoreError {
    StoreError::StoreUnavailable {
        details: "store worker task is not running".to_string(),
    }
}
