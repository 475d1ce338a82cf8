//! Time Capsule - rolling session backups for interactive applications
//!
//! This library periodically captures the full working state of a session
//! and keeps it in a local key-value store, so a crash or a bad edit can be
//! undone without any server.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Settings and path management
//! - `error`: Custom error types
//! - `storage`: Namespaced async key-value stores (memory, JSON file)
//! - `session`: Session record and serializer over the live scene
//! - `backup`: Rotation engine, backup keys and restore
//!
//! # Example
//!
//! ```rust,ignore
//! use time_capsule::backup::TimeCapsule;
//! use time_capsule::config::{CapsulePaths, CapsuleSettings};
//!
//! let paths = CapsulePaths::new()?;
//! let settings = CapsuleSettings::load_or_create(&paths)?;
//! let capsule = TimeCapsule::open(&paths, settings, serializer).await?;
//! ```

pub mod backup;
pub mod config;
pub mod error;
pub mod session;
pub mod storage;

pub use backup::TimeCapsule;
pub use error::{CapsuleError, CapsuleResult};
pub use storage::Namespace;
