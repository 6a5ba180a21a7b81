use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use super::DocumentStore;

/// Process-local store, used by tests and the `memory` backend.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, Value>>,
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let documents = self
            .documents
            .lock()
            .map_err(|e| anyhow!("store lock poisoned: {e}"))?;
        Ok(documents.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let mut documents = self
            .documents
            .lock()
            .map_err(|e| anyhow!("store lock poisoned: {e}"))?;
        documents.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut documents = self
            .documents
            .lock()
            .map_err(|e| anyhow!("store lock poisoned: {e}"))?;
        documents.remove(key);
        Ok(())
    }
}
