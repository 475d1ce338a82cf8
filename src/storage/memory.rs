//! In-process backup store
//!
//! Holds entries in a map for the lifetime of the process. Suitable when no
//! durable backend is available, and as the default in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::BackupStore;
use crate::error::CapsuleResult;

/// Map-backed store that never fails
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store for the given namespace name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries currently held
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl BackupStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> CapsuleResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> CapsuleResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> CapsuleResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> CapsuleResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn keys(&self) -> CapsuleResult<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}
