//! Path management for the time capsule
//!
//! Resolves where the persistent backup stores and the settings file live.
//!
//! ## Path Resolution Order
//!
//! 1. `TIME_CAPSULE_DATA_DIR` environment variable (if set)
//! 2. The platform config directory reported by `directories`
//!    (`~/.config/time-capsule` on Linux)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::CapsuleError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "TIME_CAPSULE_DATA_DIR";

/// Manages all paths used by the time capsule
#[derive(Debug, Clone)]
pub struct CapsulePaths {
    /// Base directory for all time capsule data
    base_dir: PathBuf,
}

impl CapsulePaths {
    /// Create a new CapsulePaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined and no
    /// override is set.
    pub fn new() -> Result<Self, CapsuleError> {
        let base_dir = if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create CapsulePaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the directory holding one JSON document per namespace
    pub fn store_dir(&self) -> PathBuf {
        self.base_dir.join("stores")
    }

    /// Get the file backing a namespace
    pub fn store_file(&self, namespace: &str) -> PathBuf {
        self.store_dir().join(format!("{}.json", namespace))
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Ensure the base and store directories exist
    pub fn ensure_directories(&self) -> Result<(), CapsuleError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| CapsuleError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.store_dir())
            .map_err(|e| CapsuleError::Io(format!("Failed to create store directory: {}", e)))?;

        Ok(())
    }
}

fn resolve_default_path() -> Result<PathBuf, CapsuleError> {
    ProjectDirs::from("", "", "time-capsule")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| CapsuleError::Config("Could not determine home directory".into()))
}
