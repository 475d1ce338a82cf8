//! Session capture
//!
//! [`SessionSerializer`] turns the live scene into a snapshot string. The
//! rotation engine only sees the [`SnapshotSource`] trait and treats the
//! string as opaque; [`Session`] is the versioned record behind it.

mod model;
mod serializer;

pub use model::{MoleculeState, Preferences, Session, ViewState, SESSION_SCHEMA_VERSION};
pub use serializer::{
    MoleculeHandle, PreferenceSource, SceneState, SessionSerializer, SnapshotSource,
};
