//! Encoding and decoding of stored values.
//!
//! Persistent stores hold raw bytes; a [`Codec`] sits at that boundary and
//! converts typed values to bytes and back. The persistence format is owned
//! entirely by the codec, not by the store.

use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Result, StoreError};

/// Converts typed values to bytes and back.
///
/// Encoding failures surface as [`StoreError::Encode`] and decoding failures
/// as [`StoreError::Decode`], both carrying the key for context.
pub trait Codec: Send + Sync + 'static {
    /// Encodes a value into bytes.
    ///
    /// # Errors
    /// Returns [`StoreError::Encode`] if the value cannot be encoded.
    fn encode<T: Serialize>(&self, key: &str, value: &T) -> Result<Vec<u8>>;

    /// Decodes a value from bytes.
    ///
    /// # Errors
    /// Returns [`StoreError::Decode`] if the bytes do not match the expected
    /// shape of `T`.
    fn decode<T: DeserializeOwned>(&self, key: &str, bytes: &[u8]) -> Result<T>;
}

/// JSON codec backed by serde_json.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, key: &str, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|error| StoreError::encode(key, error))
    }

    fn decode<T: DeserializeOwned>(&self, key: &str, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|error| StoreError::decode(key, error))
    }
}
