//! Time-limited values kept in a [`KeyValueStore`].
//!
//! Entries are stored as `{"value": ..., "expiration": <epoch ms>}` and are
//! dropped on the first read after they expire.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::{KeyValueStore, StorageResult};

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    value: Value,
    expiration: i64,
}

pub struct ExpiringCache<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
}

impl<S: KeyValueStore + ?Sized> ExpiringCache<S> {
    pub const DEFAULT_TTL_MINUTES: i64 = 10;

    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Stores `value` for the default lifetime.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        self.set_with_ttl(key, value, Self::DEFAULT_TTL_MINUTES)
    }

    pub fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_minutes: i64,
    ) -> StorageResult<()> {
        self.set_at(key, value, ttl_minutes, Utc::now())
    }

    fn set_at<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_minutes: i64,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        let entry = CacheEntry {
            value: serde_json::to_value(value)?,
            expiration: (now + Duration::minutes(ttl_minutes)).timestamp_millis(),
        };
        self.store.set(key, &serde_json::to_string(&entry)?)
    }

    /// Returns the cached value, or `None` when it is missing, expired or
    /// unreadable. Expired and unreadable entries are removed.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        self.get_at(key, Utc::now())
    }

    fn get_at<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> StorageResult<Option<T>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Dropping unreadable cache entry {}: {}", key, e);
                self.store.remove(key)?;
                return Ok(None);
            }
        };

        if now.timestamp_millis() > entry.expiration {
            self.store.remove(key)?;
            return Ok(None);
        }

        match serde_json::from_value(entry.value) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!("Cache entry {} has an unexpected shape: {}", key, e);
                self.store.remove(key)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_fresh_entry_is_returned() {
        let store = Arc::new(MemoryStore::new());
        let cache = ExpiringCache::new(store.clone());

        cache.set("parts", &vec!["bolt", "nut"]).unwrap();
        let parts: Option<Vec<String>> = cache.get("parts").unwrap();
        assert_eq!(parts, Some(vec!["bolt".to_string(), "nut".to_string()]));
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let store = Arc::new(MemoryStore::new());
        let cache = ExpiringCache::new(store.clone());
        let written_at = Utc::now() - Duration::minutes(11);

        cache.set_at("parts", &"stale", 10, written_at).unwrap();
        let parts: Option<String> = cache.get("parts").unwrap();
        assert!(parts.is_none());
        assert!(store.get("parts").unwrap().is_none());
    }

    #[test]
    fn test_entry_expires_at_boundary() {
        let store = Arc::new(MemoryStore::new());
        let cache = ExpiringCache::new(store);
        let now = Utc::now();

        cache.set_at("suppliers", &3, 5, now).unwrap();
        let at_expiry: Option<i32> = cache.get_at("suppliers", now + Duration::minutes(5)).unwrap();
        assert_eq!(at_expiry, Some(3));

        let after: Option<i32> = cache
            .get_at("suppliers", now + Duration::minutes(5) + Duration::milliseconds(1))
            .unwrap();
        assert!(after.is_none());
    }

    #[test]
    fn test_unreadable_entry_is_a_miss() {
        let store = Arc::new(MemoryStore::with_entries([("clients", "garbage")]));
        let cache = ExpiringCache::new(store.clone());

        let clients: Option<Vec<String>> = cache.get("clients").unwrap();
        assert!(clients.is_none());
        assert!(store.is_empty());
    }
}
