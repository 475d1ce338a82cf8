//! Configuration module for the time capsule
//!
//! This module provides:
//! - Path resolution for the persistent stores and settings file
//! - Engine settings (capture threshold, retention ceiling, namespaces)

pub mod paths;
pub mod settings;

pub use paths::CapsulePaths;
pub use settings::CapsuleSettings;
