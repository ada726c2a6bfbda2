//! Unit tests for the store layer.
//! In-memory only; no filesystem or external dependencies.

#![allow(clippy::unwrap_used, clippy::panic)]


use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::time::timeout;

use crate::{
    backend::{MemoryBackend, StorageBackend},
    codec::Codec,
    error::{Result, StoreError},
    store::{KeyValueStore, MemoryStore, ObservableStore, PersistentStore},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Document {
    title: String,
}

#[tokio::test]
async fn memory_store_read_of_missing_key_is_absent_not_error() {
    let store = MemoryStore::new();

    let value: Option<String> = store.read("never-written").await.unwrap();

    assert_eq!(value, None);
}

#[tokio::test]
async fn memory_store_round_trips_values() {
    let store = MemoryStore::new();

    let stored = store
        .store(
            "doc",
            Document {
                title: "A".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(stored.title, "A");

    let value: Option<Document> = store.read("doc").await.unwrap();
    assert_eq!(value, Some(stored));
}

#[tokio::test]
async fn memory_store_type_mismatch_reads_as_miss() {
    let store = MemoryStore::new();
    store.store("key", 42u64).await.unwrap();

    let as_string: Option<String> = store.read("key").await.unwrap();
    assert_eq!(as_string, None);

    // the original value is still there under its own type
    let as_number: Option<u64> = store.read("key").await.unwrap();
    assert_eq!(as_number, Some(42));
}

#[tokio::test]
async fn memory_store_write_fully_replaces_prior_value() {
    let store = MemoryStore::new();

    store
        .store(
            "doc",
            Document {
                title: "A".to_string(),
            },
        )
        .await
        .unwrap();
    store
        .store(
            "doc",
            Document {
                title: "B".to_string(),
            },
        )
        .await
        .unwrap();

    let value: Option<Document> = store.read("doc").await.unwrap();
    assert_eq!(
        value,
        Some(Document {
            title: "B".to_string()
        })
    );
}

#[tokio::test]
async fn memory_store_observe_delivers_writes_after_subscription() {
    let store = MemoryStore::new();
    let mut sub = store.observe::<u64>("counter");

    store.store("counter", 1u64).await.unwrap();
    store.store("counter", 2u64).await.unwrap();

    assert_eq!(timeout(Duration::from_secs(1), sub.next()).await.unwrap(), Some(1));
    assert_eq!(timeout(Duration::from_secs(1), sub.next()).await.unwrap(), Some(2));
}

#[tokio::test]
async fn memory_store_observe_drops_events_of_unexpected_type() {
    let store = MemoryStore::new();
    let mut sub = store.observe::<String>("key");

    store.store("key", 7u64).await.unwrap();
    store.store("key", "hello".to_string()).await.unwrap();

    // the mismatched event is dropped and the subscription stays live
    assert_eq!(
        timeout(Duration::from_secs(1), sub.next()).await.unwrap(),
        Some("hello".to_string())
    );
}

#[tokio::test]
async fn memory_store_observe_isolates_keys() {
    let store = MemoryStore::new();
    let mut sub = store.observe::<u64>("left");

    store.store("right", 99u64).await.unwrap();
    assert!(
        timeout(Duration::from_millis(100), sub.next()).await.is_err(),
        "update to another key must not be observed"
    );

    store.store("left", 1u64).await.unwrap();
    assert_eq!(timeout(Duration::from_secs(1), sub.next()).await.unwrap(), Some(1));
}

#[tokio::test]
async fn memory_store_observe_keeps_events_through_bursts_on_other_keys() {
    let store = MemoryStore::new();
    let mut sub = store.observe::<u64>("watched");

    store.store("watched", 1u64).await.unwrap();
    // far more writes than any channel buffers; they must not evict the
    // watched key's pending event
    for n in 0..200u64 {
        store.store("noisy", n).await.unwrap();
    }

    assert_eq!(timeout(Duration::from_secs(1), sub.next()).await.unwrap(), Some(1));
}

#[tokio::test]
async fn persistent_store_read_of_missing_key_is_absent_not_error() {
    let store = PersistentStore::new(MemoryBackend::new());

    let value: Option<Document> = store.read("never-written").await.unwrap();

    assert_eq!(value, None);
}

#[tokio::test]
async fn persistent_store_round_trips_through_backend_bytes() {
    let store = PersistentStore::new(MemoryBackend::new());

    store
        .store(
            "doc",
            Document {
                title: "A".to_string(),
            },
        )
        .await
        .unwrap();

    let raw = store.backend().get_bytes("doc").await.unwrap().unwrap();
    assert_eq!(raw, br#"{"title":"A"}"#);

    let value: Option<Document> = store.read("doc").await.unwrap();
    assert_eq!(value.unwrap().title, "A");
}

#[tokio::test]
async fn persistent_store_surfaces_decode_error_on_read() {
    let store = PersistentStore::new(MemoryBackend::new());
    store
        .backend()
        .set_bytes("doc", b"not json at all".to_vec())
        .await
        .unwrap();

    let result: Result<Option<Document>> = store.read("doc").await;

    assert!(matches!(result, Err(StoreError::Decode { .. })));
}

#[tokio::test]
async fn persistent_store_stays_usable_after_failed_read() {
    let store = PersistentStore::new(MemoryBackend::new());
    store
        .backend()
        .set_bytes("doc", b"garbage".to_vec())
        .await
        .unwrap();

    let failed: Result<Option<Document>> = store.read("doc").await;
    assert!(failed.is_err());

    store
        .store(
            "doc",
            Document {
                title: "fresh".to_string(),
            },
        )
        .await
        .unwrap();
    let value: Option<Document> = store.read("doc").await.unwrap();
    assert_eq!(value.unwrap().title, "fresh");
}

struct RefusingCodec;

impl Codec for RefusingCodec {
    fn encode<T: Serialize>(&self, key: &str, _value: &T) -> Result<Vec<u8>> {
        Err(StoreError::encode(key, "refused"))
    }

    fn decode<T: DeserializeOwned>(&self, key: &str, _bytes: &[u8]) -> Result<T> {
        Err(StoreError::decode(key, "refused"))
    }
}

#[tokio::test]
async fn persistent_store_surfaces_encode_error_on_store() {
    let store = PersistentStore::with_codec(MemoryBackend::new(), RefusingCodec);

    let result = store.store("doc", 42u64).await;

    assert!(matches!(result, Err(StoreError::Encode { .. })));
    // nothing reached the backend
    assert_eq!(store.backend().get_bytes("doc").await.unwrap(), None);
}

#[tokio::test]
async fn persistent_store_drops_undecodable_change_events() {
    let store = PersistentStore::new(MemoryBackend::new());
    let mut sub = store.observe::<u64>("counter");

    store
        .backend()
        .set_bytes("counter", b"not a number".to_vec())
        .await
        .unwrap();
    store.store("counter", 5u64).await.unwrap();

    // the malformed event was swallowed; the next good one arrives
    assert_eq!(timeout(Duration::from_secs(1), sub.next()).await.unwrap(), Some(5));
}
