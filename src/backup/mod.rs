//! Backup rotation for the time capsule
//!
//! # Architecture
//!
//! - `TimeCapsule`: counts modifications, captures snapshots, evicts old
//!   automatic backups and serves retrieve/remove/drop requests
//! - `BackupKey`: timestamped keys, ordered by their numeric timestamp
//! - `restore`: decodes and validates stored snapshots
//!
//! # Namespaces
//!
//! - automatic: `backup-<millis>`, wiped when the engine starts, capped at
//!   `max_backup_count` after every capture
//! - manual: `<label> (<millis>)`, kept across sessions, never evicted
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use time_capsule::backup::TimeCapsule;
//! use time_capsule::config::CapsuleSettings;
//! use time_capsule::session::SessionSerializer;
//! use time_capsule::storage::Namespace;
//!
//! let serializer = Arc::new(SessionSerializer::new(scene, preferences));
//! let capsule = TimeCapsule::in_memory(CapsuleSettings::default(), serializer).await?;
//!
//! // After every edit
//! capsule.record_modification().await;
//!
//! // User-requested save and restore
//! let key = capsule.create_backup(&snapshot, Some("Before refinement")).await;
//! let session = capsule.restore_session(&key.unwrap(), Namespace::Manual).await?;
//! ```

pub mod clock;
pub mod key;
mod manager;
pub mod restore;

pub use clock::{Clock, SystemClock};
pub use key::{BackupKey, AUTO_KEY_PREFIX};
pub use manager::{BackupInfo, EvictionOutcome, TimeCapsule};
pub use restore::{decode_session, validate_snapshot, ValidationResult};
