//! In-process store for tests and dry runs.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use super::DocumentStore;
use crate::error::{AppError, Result};

/// Documents held in memory. Writes to selected keys can be made to fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Value>>,
    failing_keys: HashSet<String>,
    write_log: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every write to `key`.
    pub fn with_failing_key(mut self, key: impl Into<String>) -> Self {
        self.failing_keys.insert(key.into());
        self
    }

    /// Keys successfully written, in order.
    pub async fn write_log(&self) -> Vec<String> {
        self.write_log.lock().await.clone()
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.documents.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, document: Value) -> Result<()> {
        if self.failing_keys.contains(key) {
            return Err(AppError::store(format!("write to '{key}' rejected")));
        }
        self.documents.write().await.insert(key.to_string(), document);
        self.write_log.lock().await.push(key.to_string());
        Ok(())
    }
}
