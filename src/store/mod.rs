//! Typed key-value stores and change subscriptions.
//!
//! Two store implementations share one contract: [`MemoryStore`], an
//! actor-owned in-process store, and [`PersistentStore`], which reads and
//! writes encoded bytes through a [`StorageBackend`](crate::backend::StorageBackend).
//! Both serve any number of concurrent callers and hand out cancellable
//! per-key [`Subscription`] streams.

mod bridge;
mod memory;
mod persistent;
mod subscription;

#[cfg(test)]
mod tests;

pub use bridge::ChangeBridge;
pub use memory::MemoryStore;
pub use persistent::PersistentStore;
pub use subscription::{Subscription, SubscriptionHandle};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;

/// Marker trait for types a store can hold.
///
/// Blanket-implemented for every type meeting the bounds; callers never
/// implement it by hand.
pub trait StoredValue: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> StoredValue for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Read/write access to a named value under a string key.
///
/// The store is type-erased: it holds values as stored, and the caller
/// supplies or expects a concrete type on each call.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` for a key that was never written. Whether a stored
    /// value of a different shape reads as `None` or as a decode error is
    /// implementation-defined; see the implementors.
    ///
    /// # Errors
    /// Store-specific; see the implementors.
    async fn read<T: StoredValue>(&self, key: &str) -> Result<Option<T>>;

    /// Stores `value` under `key`, fully replacing any prior value.
    ///
    /// Returns the stored value, enabling builder-style chaining.
    ///
    /// # Errors
    /// Store-specific; see the implementors.
    async fn store<T: StoredValue>(&self, key: &str, value: T) -> Result<T>;
}

/// A store that can additionally notify about changes to a key.
pub trait ObservableStore: KeyValueStore {
    /// Subscribes to every subsequent change of the value under `key`.
    ///
    /// The stream is infinite, delivers no history to late subscribers, and
    /// silently drops change events that do not match `T`. It ends only when
    /// the subscription is cancelled or the store goes away.
    fn observe<T: StoredValue>(&self, key: &str) -> Subscription<T>;
}
