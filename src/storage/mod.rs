//! Storage layer for the time capsule
//!
//! A [`BackupStore`] is one namespaced, asynchronous key-value store. The
//! engine owns two of them: one for automatic backups and one for manual
//! backups. Which backend sits behind each handle is the host's choice.
//!
//! Contract for every backend:
//! - `get` returns `Ok(None)` for a missing key, never an error
//! - `set` overwrites silently
//! - `delete` of an absent key succeeds
//! - `keys` returns keys in no particular order
//! - any backend I/O problem surfaces as [`CapsuleError::Storage`]
//!
//! [`CapsuleError::Storage`]: crate::error::CapsuleError::Storage

pub mod json_file;
pub mod memory;

#[cfg(test)]
pub mod mock;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CapsuleResult;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Which of the two disjoint stores an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Threshold-driven backups, bounded by the retention ceiling
    Auto,
    /// Labelled backups, unbounded and kept across sessions
    Manual,
}

impl Namespace {
    /// Map the `is_auto` flag used by host UIs
    pub fn from_is_auto(is_auto: bool) -> Self {
        if is_auto {
            Self::Auto
        } else {
            Self::Manual
        }
    }

    pub fn is_auto(self) -> bool {
        self == Self::Auto
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// One namespaced asynchronous key-value store
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Namespace name, used in logs and errors
    fn name(&self) -> &str;

    /// Read a value, `None` when the key is absent
    async fn get(&self, key: &str) -> CapsuleResult<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> CapsuleResult<()>;

    /// Remove a key; absent keys are not an error
    async fn delete(&self, key: &str) -> CapsuleResult<()>;

    /// Remove every entry
    async fn clear(&self) -> CapsuleResult<()>;

    /// All keys currently present, unordered
    async fn keys(&self) -> CapsuleResult<Vec<String>>;
}
