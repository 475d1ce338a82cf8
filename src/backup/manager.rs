//! Backup rotation engine
//!
//! [`TimeCapsule`] counts modifications, captures a session snapshot every
//! `modification_count_backup_threshold` of them, and keeps the automatic
//! namespace at or under `max_backup_count` entries. Manual backups live in
//! their own namespace and are never evicted.
//!
//! A capture cycle runs Idle -> Capturing -> Writing -> Evicting -> Idle.
//! `busy` reports whether a cycle is in flight; it does not block re-entry.
//! Unless `exclusive_capture` is set, two callers that cross the threshold
//! together will both capture.
//!
//! Keys embed a millisecond timestamp. Two writes to the same namespace in
//! the same millisecond (and with the same label) share a key, and the later
//! one replaces the earlier.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::clock::{Clock, SystemClock};
use super::key::{newest_first, BackupKey};
use crate::config::paths::CapsulePaths;
use crate::config::settings::CapsuleSettings;
use crate::error::CapsuleResult;
use crate::session::SnapshotSource;
use crate::storage::{BackupStore, JsonFileStore, MemoryStore, Namespace};

/// Metadata about a stored backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    /// Key under which the snapshot is stored
    pub key: String,
    /// Namespace holding the backup
    pub namespace: Namespace,
    /// User label (manual backups only)
    pub label: Option<String>,
    /// Creation time in milliseconds since the epoch
    pub timestamp: i64,
    /// Creation time, when representable
    pub created_at: Option<DateTime<Utc>>,
}

impl BackupInfo {
    fn from_key(key: &BackupKey, stored: &str) -> Self {
        Self {
            key: stored.to_string(),
            namespace: key.namespace(),
            label: key.label().map(str::to_string),
            timestamp: key.timestamp(),
            created_at: Utc.timestamp_millis_opt(key.timestamp()).single(),
        }
    }
}

/// Result of an eviction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionOutcome {
    /// Keys removed from the automatic namespace
    pub removed: Vec<String>,
    /// Keys whose removal failed on the last pass
    pub failed: Vec<String>,
}

impl EvictionOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Rolling session backups over two key-value namespaces
pub struct TimeCapsule {
    auto_store: Arc<dyn BackupStore>,
    manual_store: Arc<dyn BackupStore>,
    source: Arc<dyn SnapshotSource>,
    clock: Arc<dyn Clock>,
    settings: CapsuleSettings,
    modification_count: AtomicU32,
    busy: AtomicBool,
    capture_lock: Mutex<()>,
}

impl TimeCapsule {
    /// Create the engine for one application session
    ///
    /// The automatic namespace is wiped; manual backups are left alone. A
    /// failure to wipe is logged and does not prevent startup.
    pub async fn new(
        settings: CapsuleSettings,
        auto_store: Arc<dyn BackupStore>,
        manual_store: Arc<dyn BackupStore>,
        source: Arc<dyn SnapshotSource>,
    ) -> CapsuleResult<Self> {
        settings.validate()?;

        info!(
            auto = auto_store.name(),
            manual = manual_store.name(),
            "creating time capsule"
        );
        if let Err(e) = auto_store.clear().await {
            warn!(store = auto_store.name(), error = %e, "failed to clear automatic backups");
        }

        Ok(Self {
            auto_store,
            manual_store,
            source,
            clock: Arc::new(SystemClock),
            settings,
            modification_count: AtomicU32::new(0),
            busy: AtomicBool::new(false),
            capture_lock: Mutex::new(()),
        })
    }

    /// Engine over two in-process stores
    pub async fn in_memory(
        settings: CapsuleSettings,
        source: Arc<dyn SnapshotSource>,
    ) -> CapsuleResult<Self> {
        let auto_store = Arc::new(MemoryStore::new(settings.auto_namespace.clone()));
        let manual_store = Arc::new(MemoryStore::new(settings.manual_namespace.clone()));
        Self::new(settings, auto_store, manual_store, source).await
    }

    /// Engine over file-backed stores under the resolved store directory
    pub async fn open(
        paths: &CapsulePaths,
        settings: CapsuleSettings,
        source: Arc<dyn SnapshotSource>,
    ) -> CapsuleResult<Self> {
        paths.ensure_directories()?;
        let auto_store = Arc::new(JsonFileStore::open(paths, &settings.auto_namespace));
        let manual_store = Arc::new(JsonFileStore::open(paths, &settings.manual_namespace));
        Self::new(settings, auto_store, manual_store, source).await
    }

    /// Replace the timestamp source used for new keys
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &CapsuleSettings {
        &self.settings
    }

    /// Whether a capture cycle is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Modifications recorded since the last capture
    pub fn modification_count(&self) -> u32 {
        self.modification_count.load(Ordering::SeqCst)
    }

    /// The store behind a namespace
    pub fn store(&self, namespace: Namespace) -> &dyn BackupStore {
        match namespace {
            Namespace::Auto => self.auto_store.as_ref(),
            Namespace::Manual => self.manual_store.as_ref(),
        }
    }

    /// Count one modification, capturing when the threshold is reached
    ///
    /// Returns the key of the automatic backup if this call captured one.
    pub async fn record_modification(&self) -> Option<String> {
        if !self.bump_modification_count() {
            return None;
        }
        self.capture().await
    }

    fn bump_modification_count(&self) -> bool {
        let threshold = self.settings.modification_count_backup_threshold;

        if self.settings.exclusive_capture {
            let previous = match self.modification_count.fetch_update(
                Ordering::SeqCst,
                Ordering::SeqCst,
                |count| Some(if count + 1 >= threshold { 0 } else { count + 1 }),
            ) {
                Ok(previous) | Err(previous) => previous,
            };
            previous + 1 >= threshold
        } else {
            let count = self.count_modification();
            self.claim_capture(count)
        }
    }

    fn count_modification(&self) -> u32 {
        self.modification_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Reset the counter if `count` reached the threshold
    ///
    /// A caller whose increment overtook another's before either reset also
    /// sees a count past the threshold, so both capture.
    fn claim_capture(&self, count: u32) -> bool {
        if count >= self.settings.modification_count_backup_threshold {
            self.modification_count.store(0, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    async fn capture(&self) -> Option<String> {
        let _guard = if self.settings.exclusive_capture {
            Some(self.capture_lock.lock().await)
        } else {
            None
        };

        self.busy.store(true, Ordering::SeqCst);
        debug!("capture: serializing session");

        let key = match self.source.snapshot().await {
            Ok(snapshot) => {
                debug!(bytes = snapshot.len(), "capture: writing snapshot");
                let key = self.create_backup(&snapshot, None).await;
                debug!("capture: evicting");
                self.cleanup_if_full().await;
                key
            }
            Err(e) => {
                warn!(error = %e, "capture skipped: session could not be serialized");
                None
            }
        };

        self.busy.store(false, Ordering::SeqCst);
        debug!("capture: idle");
        key
    }

    /// Store a snapshot directly, bypassing the modification counter
    ///
    /// With a label the snapshot goes to the manual namespace and an
    /// eviction pass over the automatic namespace follows. Without one it
    /// goes to the automatic namespace and no eviction runs here. An empty
    /// label writes an automatic key but still runs the eviction pass.
    ///
    /// Returns `None` if the write failed; the failure is logged.
    pub async fn create_backup(&self, value: &str, label: Option<&str>) -> Option<String> {
        match self.try_create_backup(value, label).await {
            Ok(key) => Some(key),
            Err(e) => {
                error!(error = %e, "failed to create backup");
                None
            }
        }
    }

    /// [`create_backup`](Self::create_backup) with the failure returned
    pub async fn try_create_backup(
        &self,
        value: &str,
        label: Option<&str>,
    ) -> CapsuleResult<String> {
        let timestamp = self.clock.now_millis();
        let key = match label.filter(|label| !label.is_empty()) {
            Some(label) => BackupKey::manual(label, timestamp),
            None => BackupKey::auto(timestamp),
        };
        let namespace = key.namespace();
        let key = key.to_string();

        info!(key = %key, %namespace, "creating backup");
        self.store(namespace).set(&key, value).await?;
        info!(key = %key, %namespace, "created backup");

        if label.is_some() {
            self.cleanup_if_full().await;
        }

        Ok(key)
    }

    /// Evict the oldest automatic backups beyond `max_backup_count`
    ///
    /// Removals run concurrently. A failed removal is logged and leaves its
    /// entry in place for a later pass; with `eviction_retries` set, extra
    /// passes follow after the configured backoff.
    pub async fn cleanup_if_full(&self) -> EvictionOutcome {
        let mut outcome = self.eviction_pass().await;

        let mut attempt = 0;
        while !outcome.is_clean() && attempt < self.settings.eviction_retries {
            attempt += 1;
            warn!(attempt, failed = outcome.failed.len(), "retrying eviction");
            tokio::time::sleep(self.settings.eviction_retry_backoff()).await;

            let retry = self.eviction_pass().await;
            outcome.removed.extend(retry.removed);
            outcome.failed = retry.failed;
        }

        outcome
    }

    async fn eviction_pass(&self) -> EvictionOutcome {
        let keys = match self.auto_store.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                error!(error = %e, "eviction skipped: could not list automatic backups");
                return EvictionOutcome::default();
            }
        };

        let sorted = newest_first(Namespace::Auto, keys);
        let max = self.settings.max_backup_count;
        if sorted.len() <= max {
            return EvictionOutcome::default();
        }

        let excess = &sorted[max..];
        debug!(count = sorted.len(), max, excess = excess.len(), "evicting old backups");

        let removals = excess.iter().map(|(_, stored)| async move {
            let key = stored.clone();
            let result = self.try_remove_backup(&key, Namespace::Auto).await;
            (key, result)
        });

        let mut outcome = EvictionOutcome::default();
        for (key, result) in join_all(removals).await {
            match result {
                Ok(()) => outcome.removed.push(key),
                Err(e) => {
                    error!(key = %key, error = %e, "failed to evict backup");
                    outcome.failed.push(key);
                }
            }
        }
        outcome
    }

    /// Read a backup; failures are logged and read as absent
    pub async fn retrieve_backup(&self, key: &str, namespace: Namespace) -> Option<String> {
        match self.try_retrieve_backup(key, namespace).await {
            Ok(value) => value,
            Err(e) => {
                error!(key, %namespace, error = %e, "failed to fetch backup");
                None
            }
        }
    }

    /// [`retrieve_backup`](Self::retrieve_backup) distinguishing absence from failure
    pub async fn try_retrieve_backup(
        &self,
        key: &str,
        namespace: Namespace,
    ) -> CapsuleResult<Option<String>> {
        debug!(key, %namespace, "fetching backup");
        self.store(namespace).get(key).await
    }

    /// Delete one backup; failures are logged
    pub async fn remove_backup(&self, key: &str, namespace: Namespace) {
        if let Err(e) = self.try_remove_backup(key, namespace).await {
            error!(key, %namespace, error = %e, "failed to remove backup");
        }
    }

    pub async fn try_remove_backup(&self, key: &str, namespace: Namespace) -> CapsuleResult<()> {
        debug!(key, %namespace, "removing backup");
        self.store(namespace).delete(key).await?;
        info!(key, %namespace, "removed backup");
        Ok(())
    }

    /// Delete every backup in a namespace; failures are logged
    pub async fn drop_all_backups(&self, namespace: Namespace) {
        if let Err(e) = self.try_drop_all_backups(namespace).await {
            error!(%namespace, error = %e, "failed to remove all backups");
        }
    }

    pub async fn try_drop_all_backups(&self, namespace: Namespace) -> CapsuleResult<()> {
        self.store(namespace).clear().await?;
        info!(%namespace, "removed all backups");
        Ok(())
    }

    /// List backups in a namespace, newest first
    pub async fn list_backups(&self, namespace: Namespace) -> CapsuleResult<Vec<BackupInfo>> {
        let keys = self.store(namespace).keys().await?;
        Ok(newest_first(namespace, keys)
            .iter()
            .map(|(key, stored)| BackupInfo::from_key(key, stored))
            .collect())
    }

    /// The most recent backup in a namespace
    pub async fn latest_backup(&self, namespace: Namespace) -> CapsuleResult<Option<BackupInfo>> {
        Ok(self.list_backups(namespace).await?.into_iter().next())
    }
}
