//! Key-value document persistence.
//!
//! Provides the [`DocumentStore`] trait the engine persists through, plus a
//! SQLite-backed implementation and an in-memory one. The store is created
//! via [`create_store`] from configuration.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use serde_json::Value;

/// Logical key holding the bounded identity-snapshot history (JSON array, newest first).
pub const HISTORY_KEY: &str = "identity_history";
/// Logical key holding unlocked milestone records (JSON array, unordered).
pub const MILESTONES_KEY: &str = "unlocked_milestones";

/// Generic document store: one JSON value per key.
///
/// Every `set` replaces the stored value wholesale, so readers never observe
/// a partially-written document.
pub trait DocumentStore: Send + Sync {
    /// Fetch the value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &Value) -> Result<()>;

    /// Delete `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Push `item` onto the JSON array under `key`, creating it if needed.
    /// A non-array value is replaced by a fresh array.
    fn append(&self, key: &str, item: Value) -> Result<()> {
        let mut items = match self.get(key)? {
            Some(Value::Array(items)) => items,
            Some(_) => {
                tracing::warn!(key, "replacing non-array document on append");
                Vec::new()
            }
            None => Vec::new(),
        };
        items.push(item);
        self.set(key, &Value::Array(items))
    }
}

/// Create a document store from config.
///
/// Supported backends: `"sqlite"` (file at `db_path`) and `"memory"`.
pub fn create_store(config: &crate::config::PlaysonaConfig) -> Result<Box<dyn DocumentStore>> {
    match config.storage.backend.as_str() {
        "sqlite" => {
            let store = sqlite::SqliteDocumentStore::open(config.resolved_db_path())?;
            Ok(Box::new(store))
        }
        "memory" => Ok(Box::new(memory::MemoryDocumentStore::default())),
        other => anyhow::bail!("unknown storage backend: {other}. Supported: sqlite, memory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaysonaConfig;
    use serde_json::json;

    #[test]
    fn append_creates_and_extends_array() {
        let store = memory::MemoryDocumentStore::default();
        store.append("k", json!(1)).unwrap();
        store.append("k", json!(2)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!([1, 2])));
    }

    #[test]
    fn append_replaces_non_array_value() {
        let store = memory::MemoryDocumentStore::default();
        store.set("k", &json!({"not": "an array"})).unwrap();
        store.append("k", json!("x")).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!(["x"])));
    }

    #[test]
    fn create_store_rejects_unknown_backend() {
        let mut config = PlaysonaConfig::default();
        config.storage.backend = "redis".into();
        let err = create_store(&config).err().unwrap();
        assert!(err.to_string().contains("unknown storage backend"));
    }

    #[test]
    fn create_store_memory_backend() {
        let mut config = PlaysonaConfig::default();
        config.storage.backend = "memory".into();
        let store = create_store(&config).unwrap();
        assert!(store.get(HISTORY_KEY).unwrap().is_none());
    }
}
