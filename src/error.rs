use thiserror::Error;

/// Error types for the stowage crate.
///
/// Covers the encode/decode boundary of persistent stores, seed-resource
/// loading, backend I/O, and loss of a store's worker task. Subscription
/// decode failures are deliberately not represented here: a malformed change
/// event is dropped, never surfaced to the subscriber.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A value could not be encoded for storage.
    #[error("failed to encode value for key '{key}': {details}")]
    Encode {
        /// Key the value was being stored under.
        key: String,
        /// Encoder error details.
        details: String,
    },

    /// Stored bytes exist but do not decode as the requested type.
    #[error("failed to decode value at key '{key}': {details}")]
    Decode {
        /// Key the bytes were read from.
        key: String,
        /// Decoder error details.
        details: String,
    },

    /// No seed resource with the given name could be located.
    #[error("seed resource '{name}' not found")]
    ResourceNotFound {
        /// Name of the missing resource.
        name: String,
    },

    /// A seed resource was located but its contents could not be read.
    #[error("seed resource '{name}' is unreadable: {details}")]
    ResourceUnreadable {
        /// Name of the resource.
        name: String,
        /// I/O error details.
        details: String,
    },

    /// A seed resource was read but its contents do not decode as the
    /// expected type.
    #[error("seed resource '{name}' is undecodable: {details}")]
    ResourceUndecodable {
        /// Name of the resource.
        name: String,
        /// Decoder error details.
        details: String,
    },

    /// The storage medium failed while reading or writing bytes.
    #[error("backend error for key '{key}': {details}")]
    Backend {
        /// Key being accessed when the backend failed.
        key: String,
        /// Backend error details.
        details: String,
    },

    /// The store's worker task is no longer running.
    #[error("store unavailable: {details}")]
    StoreUnavailable {
        /// Details about why the store is unavailable.
        details: String,
    },
}

/// A specialized `Result` type for stowage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Creates an encode error with key context.
    pub fn encode(key: &str, error: impl std::fmt::Display) -> Self {
        StoreError::Encode {
            key: key.to_string(),
            details: error.to_string(),
        }
    }

    /// Creates a decode error with key context.
    pub fn decode(key: &str, error: impl std::fmt::Display) -> Self {
        StoreError::Decode {
            key: key.to_string(),
            details: error.to_string(),
        }
    }

    /// Creates a backend error with key context.
    pub fn backend(key: &str, error: impl std::fmt::Display) -> Self {
        StoreError::Backend {
            key: key.to_string(),
            details: error.to_string(),
        }
    }
}
