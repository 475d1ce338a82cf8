//! Settings for the time capsule
//!
//! Capture threshold, retention ceiling, namespace names and the optional
//! hardening knobs for capture exclusivity and eviction retries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::CapsulePaths;
use crate::error::CapsuleError;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapsuleSettings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Number of recorded modifications that triggers an automatic capture
    #[serde(default = "default_threshold")]
    pub modification_count_backup_threshold: u32,

    /// Retention ceiling for the automatic namespace
    #[serde(default = "default_max_backup_count")]
    pub max_backup_count: usize,

    /// Name of the automatic backup namespace (wiped on engine creation)
    #[serde(default = "default_auto_namespace")]
    pub auto_namespace: String,

    /// Name of the manual backup namespace (kept across sessions)
    #[serde(default = "default_manual_namespace")]
    pub manual_namespace: String,

    /// Serialize captures and reset the counter atomically
    #[serde(default)]
    pub exclusive_capture: bool,

    /// Extra eviction passes when removals fail
    #[serde(default)]
    pub eviction_retries: u32,

    /// Delay before each extra eviction pass, in milliseconds
    #[serde(default = "default_eviction_retry_backoff_ms")]
    pub eviction_retry_backoff_ms: u64,
}

fn default_schema_version() -> u32 {
    1
}

fn default_threshold() -> u32 {
    5
}

fn default_max_backup_count() -> usize {
    10
}

fn default_auto_namespace() -> String {
    "TimeCapsule-Auto".to_string()
}

fn default_manual_namespace() -> String {
    "TimeCapsule-Manual".to_string()
}

fn default_eviction_retry_backoff_ms() -> u64 {
    50
}

impl Default for CapsuleSettings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            modification_count_backup_threshold: default_threshold(),
            max_backup_count: default_max_backup_count(),
            auto_namespace: default_auto_namespace(),
            manual_namespace: default_manual_namespace(),
            exclusive_capture: false,
            eviction_retries: 0,
            eviction_retry_backoff_ms: default_eviction_retry_backoff_ms(),
        }
    }
}

impl CapsuleSettings {
    /// Settings with a custom threshold and retention ceiling
    pub fn with_limits(threshold: u32, max_backup_count: usize) -> Self {
        Self {
            modification_count_backup_threshold: threshold,
            max_backup_count,
            ..Self::default()
        }
    }

    /// Backoff between eviction retries
    pub fn eviction_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.eviction_retry_backoff_ms)
    }

    /// Check the settings can drive an engine
    pub fn validate(&self) -> Result<(), CapsuleError> {
        if self.modification_count_backup_threshold == 0 {
            return Err(CapsuleError::Config(
                "modification_count_backup_threshold must be positive".into(),
            ));
        }
        if self.max_backup_count == 0 {
            return Err(CapsuleError::Config(
                "max_backup_count must be positive".into(),
            ));
        }
        if self.auto_namespace.is_empty() || self.manual_namespace.is_empty() {
            return Err(CapsuleError::Config("namespace names must not be empty".into()));
        }
        if self.auto_namespace == self.manual_namespace {
            return Err(CapsuleError::Config(format!(
                "auto and manual namespaces must differ (both '{}')",
                self.auto_namespace
            )));
        }
        Ok(())
    }

    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &CapsulePaths) -> Result<Self, CapsuleError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                CapsuleError::Io(format!("Failed to read settings file: {}", e))
            })?;

            let settings: CapsuleSettings = serde_json::from_str(&contents).map_err(|e| {
                CapsuleError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            settings.validate()?;
            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(CapsuleSettings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &CapsulePaths) -> Result<(), CapsuleError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            CapsuleError::Config(format!("Failed to serialize settings: {}", e))
        })?;

        std::fs::write(paths.settings_file(), contents).map_err(|e| {
            CapsuleError::Io(format!("Failed to write settings file: {}", e))
        })?;

        Ok(())
    }
}
