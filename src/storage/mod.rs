//! Per-key, per-type storage facades with lazy initial seeding.
//!
//! A [`TypedStorage`] binds one key and one value type to a store and adds
//! an initial-value supplier invoked on the first read of an empty key. The
//! supplier may be a constant or a decode of a bundled seed resource.

mod resource;

pub use resource::{DirResourceLoader, ResourceLoader};

use std::{future::Future, sync::Arc};

use futures::future::BoxFuture;
use tracing::debug;

use crate::{
    error::{Result, StoreError},
    store::{KeyValueStore, ObservableStore, StoredValue, Subscription},
};

type InitialValueSupplier<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// A facade binding one key, one value type, and an initial-value supplier
/// to a store.
///
/// `read` falls back to the supplier when the key is empty and writes the
/// supplied value through before returning it. The supplier is not globally
/// deduplicated: concurrent first reads may each invoke it and each write
/// the result, with the store's last-write-wins semantics resolving the
/// race, so suppliers should be safe to call more than once.
pub struct TypedStorage<T, S> {
    key: String,
    store: Arc<S>,
    initial_value: InitialValueSupplier<T>,
}

impl<T, S> Clone for TypedStorage<T, S> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            store: Arc::clone(&self.store),
            initial_value: Arc::clone(&self.initial_value),
        }
    }
}

impl<T: StoredValue, S: KeyValueStore> TypedStorage<T, S> {
    /// Creates a storage with an arbitrary deferred initial-value supplier.
    pub fn new<F, Fut>(key: impl Into<String>, store: Arc<S>, initial_value: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            key: key.into(),
            store,
            initial_value: Arc::new(move || Box::pin(initial_value())),
        }
    }

    /// Creates a storage whose initial value is a constant.
    pub fn with_initial(key: impl Into<String>, value: T, store: Arc<S>) -> Self {
        Self::new(key, store, move || {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    /// Creates a storage seeded from a named resource on first read.
    ///
    /// The resource is located, read, and decoded lazily; the three stages
    /// fail with [`StoreError::ResourceNotFound`],
    /// [`StoreError::ResourceUnreadable`], and
    /// [`StoreError::ResourceUndecodable`] respectively.
    pub fn with_resource_initial<L: ResourceLoader>(
        key: impl Into<String>,
        resource: impl Into<String>,
        loader: Arc<L>,
        store: Arc<S>,
    ) -> Self {
        let resource = resource.into();
        Self::new(key, store, move || {
            let loader = Arc::clone(&loader);
            let resource = resource.clone();
            async move { load_seed(loader.as_ref(), &resource).await }
        })
    }

    /// The key this storage is bound to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the stored value, seeding it on first access.
    ///
    /// If the store holds a value for the key it is returned as is.
    /// Otherwise the initial-value supplier runs, its result is written to
    /// the store, and the stored value is returned.
    ///
    /// # Errors
    /// Propagates store read/write failures and supplier failures.
    pub async fn read(&self) -> Result<T> {
        if let Some(value) = self.store.read(&self.key).await? {
            return Ok(value);
        }
        debug!(key = %self.key, "seeding initial value");
        let value = (self.initial_value)().await?;
        self.store.store(&self.key, value).await
    }

    /// Writes a value through to the store and returns it.
    ///
    /// # Errors
    /// Propagates store write failures.
    pub async fn store(&self, value: T) -> Result<T> {
        self.store.store(&self.key, value).await
    }
}

impl<T: StoredValue, S: ObservableStore> TypedStorage<T, S> {
    /// Subscribes to subsequent changes of this storage's value.
    pub fn watch(&self) -> Subscription<T> {
        self.store.observe(&self.key)
    }
}

async fn load_seed<T: StoredValue, L: ResourceLoader>(loader: &L, name: &str) -> Result<T> {
    let Some(handle) = loader.locate(name) else {
        return Err(StoreError::ResourceNotFound {
            name: name.to_string(),
        });
    };
    let bytes =
        loader
            .read_bytes(&handle)
            .await
            .map_err(|error| StoreError::ResourceUnreadable {
                name: name.to_string(),
                details: error.to_string(),
            })?;
    serde_json::from_slice(&bytes).map_err(|error| StoreError::ResourceUndecodable {
        name: name.to_string(),
        details: error.to_string(),
    })
}
