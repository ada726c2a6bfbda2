use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::{
    backend::StorageBackend,
    codec::{Codec, JsonCodec},
    error::Result,
};

use super::{KeyValueStore, ObservableStore, StoredValue, Subscription, bridge::ChangeBridge};

/// Typed store over a durable byte-level backend.
///
/// Reads decode the backend's bytes through the codec; bytes that exist but
/// do not match the requested type surface as a decode error (unlike
/// [`MemoryStore`](super::MemoryStore), where a mismatch is a miss; a
/// one-shot read has a synchronous failure channel, so corruption is
/// reportable). Absent bytes are `Ok(None)`. Writes encode, hand the bytes
/// to the backend, and return the value.
///
/// Change observation goes through a [`ChangeBridge`]: one backend observer
/// per key with live subscribers, fanned out to any number of subscriptions.
pub struct PersistentStore<B, C = JsonCodec> {
    backend: Arc<B>,
    codec: Arc<C>,
    bridge: ChangeBridge<B>,
}

impl<B: StorageBackend> PersistentStore<B> {
    /// Creates a store over `backend` using the JSON codec.
    pub fn new(backend: B) -> Self {
        Self::with_codec(backend, JsonCodec)
    }
}

impl<B: StorageBackend, C: Codec> PersistentStore<B, C> {
    /// Creates a store over `backend` with an explicit codec.
    pub fn with_codec(backend: B, codec: C) -> Self {
        let backend = Arc::new(backend);
        Self {
            bridge: ChangeBridge::new(Arc::clone(&backend)),
            backend,
            codec: Arc::new(codec),
        }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The bridge managing this store's subscriptions.
    pub fn bridge(&self) -> &ChangeBridge<B> {
        &self.bridge
    }
}

#[async_trait]
impl<B: StorageBackend, C: Codec> KeyValueStore for PersistentStore<B, C> {
    async fn read<T: StoredValue>(&self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.backend.get_bytes(key).await? else {
            return Ok(None);
        };
        self.codec.decode(key, &bytes).map(Some)
    }

    async fn store<T: StoredValue>(&self, key: &str, value: T) -> Result<T> {
        let bytes = self.codec.encode(key, &value)?;
        self.backend.set_bytes(key, bytes).await?;
        Ok(value)
    }
}

impl<B: StorageBackend, C: Codec> ObservableStore for PersistentStore<B, C> {
    fn observe<T: StoredValue>(&self, key: &str) -> Subscription<T> {
        let (receiver, teardown) = self.bridge.subscribe_raw(key);
        let codec = Arc::clone(&self.codec);
        let observed_key = key.to_string();

        let values = stream! {
            let mut raw = BroadcastStream::new(receiver);
            while let Some(event) = raw.next().await {
                // a lagged receiver skips overwritten events and stays live
                let Ok(bytes) = event else { continue };
                match codec.decode::<T>(&observed_key, &bytes) {
                    Ok(value) => yield value,
                    Err(error) => {
                        // a subscription has no synchronous failure channel;
                        // a write of an unrelated shape must not kill it
                        debug!(key = %observed_key, %error, "dropping undecodable change event");
                    }
                }
            }
        };

        Subscription::new(key, Box::pin(values), teardown)
    }
}
