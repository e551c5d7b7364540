//! Durable client-local key/value storage.
//!
//! The session layer persists its state through the [`LocalStorage`] trait so
//! the backing store (an in-memory map, a JSON file, a browser bridge) can be
//! swapped without touching the logic. Values are JSON documents stored as
//! strings under the keys in [`keys`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised by a [`LocalStorage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be read or written.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend is unavailable (e.g., poisoned or closed).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable string key/value store, modeled on browser local storage.
///
/// Implementations must be cheap to call repeatedly: callers read lazily and
/// write eagerly, one key at a time.
pub trait LocalStorage: Send + Sync {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

impl dyn LocalStorage {
    /// Read and decode the JSON value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the value is not valid
    /// JSON for `T`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        self.get_item(key)?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(StorageError::from)
    }

    /// Encode `value` as JSON and store it under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or writing fails.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.set_item(key, &raw)
    }
}

/// Storage keys owned by the session layer.
pub mod keys {
    /// Key for the JSON-encoded `SessionRecord`.
    pub const USER_INFO: &str = "userInfo";

    /// Key for the JSON map of product ID to freshness timestamp.
    pub const PRODUCT_IMAGE_TIMESTAMPS: &str = "productImageTimestamps";

    /// Key for the locally cached cart.
    pub const CART: &str = "cart";

    /// Key for the locally cached favorites list.
    pub const FAVORITES: &str = "favorites";

    /// Keys removed when an authorization failure tears the session down.
    pub const AUTH_TEARDOWN: &[&str] = &[USER_INFO, CART, FAVORITES];
}
