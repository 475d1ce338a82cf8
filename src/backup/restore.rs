//! Backup restoration
//!
//! Turns stored snapshot strings back into [`Session`] records and checks
//! them before a host applies them to the live scene.

use tracing::{info, warn};

use super::manager::TimeCapsule;
use crate::error::{CapsuleError, CapsuleResult};
use crate::session::{Session, SESSION_SCHEMA_VERSION};
use crate::storage::Namespace;

/// Parse a snapshot, rejecting formats newer than this crate understands
pub fn decode_session(snapshot: &str) -> CapsuleResult<Session> {
    let session = Session::from_snapshot(snapshot)
        .map_err(|e| CapsuleError::Json(format!("Failed to parse snapshot: {}", e)))?;

    if session.schema_version > SESSION_SCHEMA_VERSION {
        return Err(CapsuleError::Session(format!(
            "snapshot schema v{} is newer than supported v{}",
            session.schema_version, SESSION_SCHEMA_VERSION
        )));
    }

    if session.molecules_pdb_data.len() != session.molecules_names.len() {
        return Err(CapsuleError::Session(format!(
            "snapshot lists {} molecules but carries {} coordinate sets",
            session.molecules_names.len(),
            session.molecules_pdb_data.len()
        )));
    }

    Ok(session)
}

/// Validate a snapshot without restoring it
pub fn validate_snapshot(snapshot: &str) -> ValidationResult {
    match decode_session(snapshot) {
        Ok(session) => ValidationResult {
            is_valid: true,
            schema_version: session.schema_version,
            molecule_count: session.molecule_count(),
            has_display_state: session.molecules_display_objects_keys.len()
                == session.molecule_count(),
            error: None,
        },
        Err(e) => ValidationResult {
            is_valid: false,
            schema_version: 0,
            molecule_count: 0,
            has_display_state: false,
            error: Some(e.to_string()),
        },
    }
}

impl TimeCapsule {
    /// Fetch and decode a backup
    ///
    /// `Ok(None)` when the key is absent; storage and decoding failures are
    /// returned as errors.
    pub async fn restore_session(
        &self,
        key: &str,
        namespace: Namespace,
    ) -> CapsuleResult<Option<Session>> {
        let Some(snapshot) = self.try_retrieve_backup(key, namespace).await? else {
            warn!(key, %namespace, "backup to restore not found");
            return Ok(None);
        };

        let session = decode_session(&snapshot)?;
        info!(
            key,
            %namespace,
            molecules = session.molecule_count(),
            "restored session from backup"
        );
        Ok(Some(session))
    }
}

/// Result of validating a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the snapshot decoded cleanly
    pub is_valid: bool,
    /// Schema version of the snapshot (0 for unversioned)
    pub schema_version: u32,
    /// Number of molecules in the snapshot
    pub molecule_count: usize,
    /// Whether every molecule has display state
    pub has_display_state: bool,
    /// Decoding failure, if any
    pub error: Option<String>,
}

impl ValidationResult {
    /// Check if the snapshot can be restored in full
    pub fn is_complete(&self) -> bool {
        self.is_valid && self.has_display_state
    }

    /// Get a summary of the snapshot
    pub fn summary(&self) -> String {
        if !self.is_valid {
            return format!(
                "Invalid snapshot: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        let version = if self.schema_version == 0 {
            "unversioned".to_string()
        } else {
            format!("v{}", self.schema_version)
        };

        if self.has_display_state {
            format!("Complete snapshot ({}): {} molecules", version, self.molecule_count)
        } else {
            format!(
                "Partial snapshot ({}): {} molecules, display state missing",
                version, self.molecule_count
            )
        }
    }
}
