//! In-memory key-value store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{KeyValueStore, StoreError};

/// In-memory implementation of [`KeyValueStore`].
///
/// Holds the journal for the life of the process. Suitable for tests and
/// for running without a data directory configured.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get() {
        let store = InMemoryKeyValueStore::new();
        store.put("users", "[]".to_string()).await.unwrap();

        assert_eq!(store.get("users").await.unwrap(), Some("[]".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn get_missing_key_is_none() {
        let store = InMemoryKeyValueStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_replaces_prior_value() {
        let store = InMemoryKeyValueStore::new();
        store.put("k", "old".to_string()).await.unwrap();
        store.put("k", "new".to_string()).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some("new".to_string()));
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let store = InMemoryKeyValueStore::new();
        store.put("k", "v".to_string()).await.unwrap();

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);

        // Deleting a missing key is a no-op.
        store.delete("k").await.unwrap();
        assert!(store.is_empty());
    }
}
