//! Custom error types for the time capsule
//!
//! This module defines the error hierarchy for the crate using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for time capsule operations
#[derive(Error, Debug)]
pub enum CapsuleError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Backend failure reported by a backup store (quota, unavailable, conflict)
    #[error("Storage error in '{namespace}': {reason}")]
    Storage { namespace: String, reason: String },

    /// The scene state collaborator could not deliver session data
    #[error("Session error: {0}")]
    Session(String),

    /// A key did not match the backup key scheme
    #[error("Invalid backup key: {0}")]
    InvalidKey(String),
}

impl CapsuleError {
    /// Create a storage failure for the given namespace
    pub fn storage(namespace: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Storage {
            namespace: namespace.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a storage backend failure
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<std::io::Error> for CapsuleError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CapsuleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for time capsule operations
pub type CapsuleResult<T> = Result<T, CapsuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CapsuleError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
        assert!(err.is_config());
    }

    #[test]
    fn test_storage_error() {
        let err = CapsuleError::storage("TimeCapsule-Auto", "quota exceeded");
        assert_eq!(
            err.to_string(),
            "Storage error in 'TimeCapsule-Auto': quota exceeded"
        );
        assert!(err.is_storage());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let capsule_err: CapsuleError = io_err.into();
        assert!(matches!(capsule_err, CapsuleError::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let capsule_err: CapsuleError = json_err.into();
        assert!(matches!(capsule_err, CapsuleError::Json(_)));
    }
}
