//! Session serializer
//!
//! Pulls state from the live scene through the collaborator traits and
//! produces one snapshot string. Molecule coordinates are fetched
//! concurrently and the snapshot is only produced once every fetch has
//! succeeded.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use super::model::{MoleculeState, Preferences, Session, ViewState};
use crate::error::CapsuleResult;

/// A live molecule owned by the scene
#[async_trait]
pub trait MoleculeHandle: Send + Sync {
    fn name(&self) -> String;

    /// Fetch the coordinate payload (PDB text)
    async fn fetch_coordinates(&self) -> CapsuleResult<String>;

    /// Display object name -> number of buffers currently drawn
    fn display_objects(&self) -> BTreeMap<String, usize>;

    /// Bond drawing options, persisted verbatim
    fn bonds_options(&self) -> serde_json::Value;
}

/// The scene and viewport the session is captured from
pub trait SceneState: Send + Sync {
    fn molecules(&self) -> Vec<Arc<dyn MoleculeHandle>>;

    fn view_state(&self) -> ViewState;
}

/// Source of rendering preferences
pub trait PreferenceSource: Send + Sync {
    fn preferences(&self) -> Preferences;
}

impl PreferenceSource for Preferences {
    fn preferences(&self) -> Preferences {
        *self
    }
}

/// Anything that can produce a snapshot string for the engine
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self) -> CapsuleResult<String>;
}

/// Serializes the live scene into session snapshots
pub struct SessionSerializer {
    scene: Arc<dyn SceneState>,
    preferences: Arc<dyn PreferenceSource>,
}

impl SessionSerializer {
    pub fn new(scene: Arc<dyn SceneState>, preferences: Arc<dyn PreferenceSource>) -> Self {
        Self { scene, preferences }
    }

    /// Gather the current session
    pub async fn fetch_session(&self) -> CapsuleResult<Session> {
        let molecules = self.scene.molecules();
        debug!(molecules = molecules.len(), "gathering session state");

        let pdb_data =
            try_join_all(molecules.iter().map(|molecule| molecule.fetch_coordinates())).await?;

        let states = molecules
            .iter()
            .zip(pdb_data)
            .map(|(molecule, pdb_data)| MoleculeState {
                name: molecule.name(),
                pdb_data,
                display_object_keys: visible_display_objects(molecule.as_ref()),
                bonds_options: molecule.bonds_options(),
            })
            .collect();

        Ok(Session::assemble(
            states,
            &self.scene.view_state(),
            self.preferences.preferences(),
        ))
    }
}

/// Display objects that currently hold at least one buffer
fn visible_display_objects(molecule: &dyn MoleculeHandle) -> Vec<String> {
    molecule
        .display_objects()
        .into_iter()
        .filter(|(_, buffers)| *buffers > 0)
        .map(|(key, _)| key)
        .collect()
}

#[async_trait]
impl SnapshotSource for SessionSerializer {
    async fn snapshot(&self) -> CapsuleResult<String> {
        let session = self.fetch_session().await?;
        Ok(session.to_snapshot()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapsuleError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct TestMolecule {
        name: String,
        delay_ms: u64,
        fail: bool,
        fetches: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MoleculeHandle for TestMolecule {
        fn name(&self) -> String {
            self.name.clone()
        }

        async fn fetch_coordinates(&self) -> CapsuleResult<String> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CapsuleError::Session(format!("no atoms for {}", self.name)));
            }
            Ok(format!("ATOM {}\n", self.name))
        }

        fn display_objects(&self) -> BTreeMap<String, usize> {
            let mut objects = BTreeMap::new();
            objects.insert("CBs".to_string(), 2);
            objects.insert("ribbons".to_string(), 0);
            objects
        }

        fn bonds_options(&self) -> serde_json::Value {
            serde_json::json!({ "smoothness": 1 })
        }
    }

    struct TestScene {
        molecules: Vec<Arc<dyn MoleculeHandle>>,
        view: ViewState,
    }

    impl SceneState for TestScene {
        fn molecules(&self) -> Vec<Arc<dyn MoleculeHandle>> {
            self.molecules.clone()
        }

        fn view_state(&self) -> ViewState {
            self.view.clone()
        }
    }

    fn molecule(
        name: &str,
        delay_ms: u64,
        fail: bool,
        fetches: &Arc<AtomicUsize>,
    ) -> Arc<dyn MoleculeHandle> {
        Arc::new(TestMolecule {
            name: name.to_string(),
            delay_ms,
            fail,
            fetches: fetches.clone(),
        })
    }

    fn serializer(molecules: Vec<Arc<dyn MoleculeHandle>>) -> SessionSerializer {
        let mut view = ViewState::default();
        view.zoom = 2.5;
        SessionSerializer::new(
            Arc::new(TestScene { molecules, view }),
            Arc::new(Preferences {
                atom_label_depth_mode: true,
            }),
        )
    }

    #[tokio::test]
    async fn test_fetch_session_preserves_molecule_order() {
        let fetches = Arc::new(AtomicUsize::new(0));
        // The slow molecule finishes last but must stay first
        let serializer = serializer(vec![
            molecule("slow", 30, false, &fetches),
            molecule("fast", 0, false, &fetches),
        ]);

        let session = serializer.fetch_session().await.unwrap();
        assert_eq!(session.molecules_names, vec!["slow", "fast"]);
        assert_eq!(session.molecules_pdb_data, vec!["ATOM slow\n", "ATOM fast\n"]);
        assert_eq!(session.molecules_display_objects_keys[0], vec!["CBs"]);
        assert_eq!(session.zoom, 2.5);
        assert!(session.atom_label_depth_mode);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_yields_no_snapshot() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let serializer = serializer(vec![
            molecule("good", 0, false, &fetches),
            molecule("bad", 0, true, &fetches),
        ]);

        let err = serializer.snapshot().await.unwrap_err();
        assert!(matches!(err, CapsuleError::Session(_)));
    }

    #[tokio::test]
    async fn test_empty_scene_snapshot() {
        let serializer = serializer(Vec::new());

        let snapshot = serializer.snapshot().await.unwrap();
        let session = Session::from_snapshot(&snapshot).unwrap();
        assert_eq!(session.molecule_count(), 0);
        assert_eq!(session.zoom, 2.5);
    }
}
