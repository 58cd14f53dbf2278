//! In-memory key-value backend.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::value::Value;

/// Key-value store held in process memory.
///
/// Keys are indexed by [`Value::to_key_bytes`], so any value, including
/// JSON, can serve as a key. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<Vec<u8>, Value>>,
}

impl MemoryKv {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with text entries.
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into().to_key_bytes(), v.into()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Fetch the value stored under `key`.
    pub async fn get(&self, key: &Value) -> Option<Value> {
        self.entries.read().await.get(&key.to_key_bytes()).cloned()
    }

    /// Store `value` under `key`, replacing any previous value.
    pub async fn put(&self, key: Value, value: Value) {
        self.entries.write().await.insert(key.to_key_bytes(), value);
    }

    /// Remove `key`. Returns true if it was present; removing a missing
    /// key is not an error.
    pub async fn delete(&self, key: &Value) -> bool {
        self.entries
            .write()
            .await
            .remove(&key.to_key_bytes())
            .is_some()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
