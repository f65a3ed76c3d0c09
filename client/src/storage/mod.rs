//! Durable key-value storage for session state.
//!
//! The session mirrors its durable fields into a [`KeyValueStore`]: tokens are
//! stored as raw strings, `is_owner` as `"true"`/`"false"`, everything else as
//! JSON.

pub mod cache;
pub mod file;
pub mod memory;

pub use cache::ExpiringCache;
pub use file::FileStore;
pub use memory::MemoryStore;

use crate::errors::StorageError;
use serde::{Serialize, de::DeserializeOwned};

/// Result type for store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable keys owned by the session manager.
pub mod keys {
    pub const USER: &str = "user";
    pub const AUTH_TOKEN: &str = "auth_token";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const SELECTED_COMPANY: &str = "selected_company";
    pub const PENDING_REQUESTS: &str = "pending_requests";
    pub const ACCESS_REQUESTS: &str = "access_requests";
    pub const IS_OWNER: &str = "is_owner";
    pub const RESOURCE_OWNER: &str = "resource_owner";

    /// Every key cleared on logout.
    pub const ALL: [&str; 9] = [
        USER,
        AUTH_TOKEN,
        ACCESS_TOKEN,
        REFRESH_TOKEN,
        SELECTED_COMPANY,
        PENDING_REQUESTS,
        ACCESS_REQUESTS,
        IS_OWNER,
        RESOURCE_OWNER,
    ];
}

/// String key-value store surviving process restarts.
///
/// Writes are synchronous: once `set` or `remove` returns, the value is
/// durable.
pub trait KeyValueStore: Send + Sync {
    /// Get the raw value stored under `key`
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// List all stored keys
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// Serializes `value` as JSON and stores it under `key`.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json)
}

/// Loads and decodes the JSON value under `key`; a missing key is `Ok(None)`.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> StorageResult<Option<T>> {
    match store.get(key)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}
