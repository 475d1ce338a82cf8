//! File-backed backup store
//!
//! A namespace is a single JSON object (`key -> snapshot`) on disk. Every
//! mutation is a read-modify-write of that document under an async mutex,
//! finished with an atomic rename. File access runs on the blocking pool.
//!
//! Writes go to a sibling temp file that is synced and renamed over the
//! target, so a crash leaves either the old document or the new one.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::BackupStore;
use crate::config::paths::CapsulePaths;
use crate::error::{CapsuleError, CapsuleResult};

type Entries = BTreeMap<String, String>;

/// Read a namespace document; a missing file is an empty namespace
fn read_entries(path: &Path) -> CapsuleResult<Entries> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
        Err(e) => {
            return Err(CapsuleError::Io(format!(
                "Failed to open {}: {}",
                path.display(),
                e
            )));
        }
    };

    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| CapsuleError::Json(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Replace a namespace document via temp file and rename
fn write_entries(path: &Path, entries: &Entries) -> CapsuleResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            CapsuleError::Io(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = path.with_extension("json.tmp");

    let file = File::create(&temp_path)
        .map_err(|e| CapsuleError::Io(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, entries)
        .map_err(|e| CapsuleError::Json(format!("Failed to serialize entries: {}", e)))?;
    writer
        .flush()
        .map_err(|e| CapsuleError::Io(format!("Failed to flush entries: {}", e)))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| CapsuleError::Io(format!("Failed to sync entries: {}", e)))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        CapsuleError::Io(format!("Failed to rename temp file: {}", e))
    })
}

/// Delete a namespace document; a missing file is already clear
fn remove_document(path: &Path) -> CapsuleResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CapsuleError::Io(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Durable store keeping one JSON document per namespace
#[derive(Debug)]
pub struct JsonFileStore {
    name: String,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store backed by an explicit file
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Create the store for a namespace under the resolved store directory
    pub fn open(paths: &CapsulePaths, name: &str) -> Self {
        Self::new(name, paths.store_file(name))
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn blocking<T, F>(&self, op: F) -> CapsuleResult<T>
    where
        F: FnOnce() -> CapsuleResult<T> + Send + 'static,
        T: Send + 'static,
    {
        match tokio::task::spawn_blocking(op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CapsuleError::storage(&self.name, e.to_string())),
            Err(e) => Err(CapsuleError::storage(
                &self.name,
                format!("blocking task failed: {}", e),
            )),
        }
    }

    async fn load(&self) -> CapsuleResult<Entries> {
        let path = self.path.clone();
        self.blocking(move || read_entries(&path)).await
    }

    async fn update<F>(&self, mutate: F) -> CapsuleResult<()>
    where
        F: FnOnce(&mut Entries) + Send + 'static,
    {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        self.blocking(move || {
            let mut entries = read_entries(&path)?;
            mutate(&mut entries);
            write_entries(&path, &entries)
        })
        .await
    }
}

#[async_trait]
impl BackupStore for JsonFileStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> CapsuleResult<Option<String>> {
        let mut entries = self.load().await?;
        Ok(entries.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> CapsuleResult<()> {
        debug!(store = %self.name, key, bytes = value.len(), "writing entry");
        let key = key.to_string();
        let value = value.to_string();
        self.update(move |entries| {
            entries.insert(key, value);
        })
        .await
    }

    async fn delete(&self, key: &str) -> CapsuleResult<()> {
        debug!(store = %self.name, key, "deleting entry");
        let key = key.to_string();
        self.update(move |entries| {
            entries.remove(&key);
        })
        .await
    }

    async fn clear(&self) -> CapsuleResult<()> {
        debug!(store = %self.name, "clearing store");
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        self.blocking(move || remove_document(&path)).await
    }

    async fn keys(&self) -> CapsuleResult<Vec<String>> {
        Ok(self.load().await?.into_keys().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_store() -> (JsonFileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let paths = CapsulePaths::with_base_dir(temp_dir.path().to_path_buf());
        let store = JsonFileStore::open(&paths, "TimeCapsule-Manual");
        (store, temp_dir)
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("store.json");

        let mut entries = Entries::new();
        entries.insert("backup-1".to_string(), "{\"zoom\":1.0}".to_string());

        write_entries(&path, &entries).unwrap();
        assert!(!temp_dir.path().join("nested").join("store.json.tmp").exists());
        assert_eq!(read_entries(&path).unwrap(), entries);
    }

    #[test]
    fn test_corrupt_document_is_json_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        fs::write(&path, "not json at all").unwrap();

        assert!(matches!(read_entries(&path), Err(CapsuleError::Json(_))));
    }

    #[test]
    fn test_remove_missing_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        remove_document(&path).unwrap();
        fs::write(&path, "{}").unwrap();
        remove_document(&path).unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let (store, _temp) = create_test_store();

        assert_eq!(store.get("anything").await.unwrap(), None);
        assert!(store.keys().await.unwrap().is_empty());
        store.delete("anything").await.unwrap();
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let (store, temp) = create_test_store();
        store.set("MyLabel (1700000000000)", "snapshot-A").await.unwrap();
        drop(store);

        let paths = CapsulePaths::with_base_dir(temp.path().to_path_buf());
        let reopened = JsonFileStore::open(&paths, "TimeCapsule-Manual");
        assert_eq!(
            reopened.get("MyLabel (1700000000000)").await.unwrap().as_deref(),
            Some("snapshot-A")
        );
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let (store, _temp) = create_test_store();
        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();

        store.delete("a").await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec!["b"]);

        store.clear().await.unwrap();
        assert!(!store.path().exists());
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_writes_are_not_lost() {
        let (store, _temp) = create_test_store();
        let store = std::sync::Arc::new(store);

        let writes = (0..8).map(|i| {
            let store = store.clone();
            async move { store.set(&format!("backup-{}", i), "x").await }
        });
        for result in futures::future::join_all(writes).await {
            result.unwrap();
        }

        assert_eq!(store.keys().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_storage_failure() {
        let (store, _temp) = create_test_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "not json").unwrap();

        let err = store.get("a").await.unwrap_err();
        assert!(err.is_storage());
        assert!(store.set("a", "1").await.unwrap_err().is_storage());
    }
}
