//! Store double with switchable failures, for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BackupStore, MemoryStore};
use crate::error::{CapsuleError, CapsuleResult};

/// Memory store that fails selected operations on demand
pub struct FailingStore {
    inner: MemoryStore,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_clear: AtomicBool,
    fail_keys: AtomicBool,
    fail_delete_keys: Mutex<HashSet<String>>,
    set_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl FailingStore {
    pub fn new(name: &str) -> Self {
        Self {
            inner: MemoryStore::new(name),
            fail_get: AtomicBool::new(false),
            fail_set: AtomicBool::new(false),
            fail_clear: AtomicBool::new(false),
            fail_keys: AtomicBool::new(false),
            fail_delete_keys: Mutex::new(HashSet::new()),
            set_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_set(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_clear(&self, fail: bool) {
        self.fail_clear.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_keys(&self, fail: bool) {
        self.fail_keys.store(fail, Ordering::SeqCst);
    }

    /// Make deletes of this key fail until cleared
    pub fn fail_delete_of(&self, key: &str) {
        self.fail_delete_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn clear_delete_failures(&self) {
        self.fail_delete_keys.lock().unwrap().clear();
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    fn failure(&self, op: &str) -> CapsuleError {
        CapsuleError::storage(self.inner.name(), format!("mock: {} failed", op))
    }
}

#[async_trait]
impl BackupStore for FailingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, key: &str) -> CapsuleResult<Option<String>> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(self.failure("get"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> CapsuleResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(self.failure("set"));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> CapsuleResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete_keys.lock().unwrap().contains(key) {
            return Err(self.failure("delete"));
        }
        self.inner.delete(key).await
    }

    async fn clear(&self) -> CapsuleResult<()> {
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(self.failure("clear"));
        }
        self.inner.clear().await
    }

    async fn keys(&self) -> CapsuleResult<Vec<String>> {
        if self.fail_keys.load(Ordering::SeqCst) {
            return Err(self.failure("keys"));
        }
        self.inner.keys().await
    }
}
