//! Stowage - typed key-value storage with per-key change streams.
//!
//! Stowage abstracts over key-addressed, typed value storage: read and write
//! a named value under a string key, and observe subsequent changes to that
//! key as a cancellable stream, regardless of which backend holds the data.
//! The main pieces are:
//!
//! - An in-memory store whose operations are serialized through a single
//!   owning task
//! - A persistent store generic over a byte-level backend and a codec
//! - A change bridge turning backend-native change events into
//!   multi-subscriber typed streams with leak-free teardown
//! - A typed-storage facade adding lazy initial-value seeding per key
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use stowage::storage::TypedStorage;
//! use stowage::store::{KeyValueStore, MemoryStore};
//!
//! # async fn demo() -> stowage::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//!
//! // Direct typed access by key
//! store.store("greeting", "hello".to_string()).await?;
//! let greeting: Option<String> = store.read("greeting").await?;
//!
//! // Or through a per-key facade with a seed value
//! let counter = TypedStorage::with_initial("counter", 0u64, Arc::clone(&store));
//! let current = counter.read().await?;
//! # let _ = (greeting, current);
//! # Ok(())
//! # }
//! ```

/// Byte-level storage backends and the raw change-event source.
pub mod backend;

/// Encoding and decoding of stored values.
pub mod codec;

/// Crate error types and result alias.
pub mod error;

/// Per-key typed storage facades with initial-value seeding.
pub mod storage;

/// Typed stores and change subscriptions.
pub mod store;

/// Re-exported core types for convenience.
pub use error::{Result, StoreError};
