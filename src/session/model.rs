//! Session snapshot record
//!
//! The field set mirrors what the viewer persists: per-molecule coordinates
//! and display state, camera, lighting and clip planes. Map fields are part
//! of the format but are always written empty.

use serde::{Deserialize, Serialize};

/// Current snapshot schema version
pub const SESSION_SCHEMA_VERSION: u32 = 1;

/// Offset between stored clip distances and the clip-plane constants
const CLIP_PLANE_OFFSET: f64 = 500.0;

/// Full session state at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Snapshot format version; unversioned snapshots read as 0
    #[serde(default)]
    pub schema_version: u32,
    pub molecules_names: Vec<String>,
    pub maps_names: Vec<String>,
    pub molecules_pdb_data: Vec<String>,
    pub maps_map_data: Vec<serde_json::Value>,
    pub active_map_mol_no: Option<i64>,
    pub molecules_display_objects_keys: Vec<Vec<String>>,
    pub molecules_coot_bonds_options: Vec<serde_json::Value>,
    pub maps_coot_contours: Vec<bool>,
    pub maps_contour_levels: Vec<f64>,
    pub maps_colours: Vec<[f64; 3]>,
    pub maps_lit_lines: Vec<bool>,
    pub maps_radius: Vec<f64>,
    pub maps_is_difference: Vec<bool>,
    pub origin: [f64; 3],
    pub background_color: [f64; 4],
    pub atom_label_depth_mode: bool,
    pub ambient_light: [f64; 4],
    pub diffuse_light: [f64; 4],
    pub light_position: [f64; 4],
    pub specular_light: [f64; 4],
    pub fog_start: f64,
    pub fog_end: f64,
    pub zoom: f64,
    pub do_draw_clicked_atom_lines: bool,
    pub clip_start: f64,
    pub clip_end: f64,
    pub quat4: [f64; 4],
}

/// Per-molecule data gathered before a session is assembled
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeState {
    pub name: String,
    pub pdb_data: String,
    pub display_object_keys: Vec<String>,
    pub bonds_options: serde_json::Value,
}

/// Camera, lighting and clipping state of the viewport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub origin: [f64; 3],
    pub background_colour: [f64; 4],
    pub light_colours_ambient: [f64; 4],
    pub light_colours_diffuse: [f64; 4],
    pub light_colours_specular: [f64; 4],
    pub light_positions: [f64; 4],
    pub fog_start: f64,
    pub fog_end: f64,
    pub zoom: f64,
    pub do_draw_clicked_atom_lines: bool,
    /// Front clip plane; only the constant term (index 3) is persisted
    pub clip_plane0: [f64; 4],
    /// Back clip plane; only the constant term (index 3) is persisted
    pub clip_plane1: [f64; 4],
    /// Orientation quaternion
    pub quat: [f64; 4],
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            origin: [0.0; 3],
            background_colour: [1.0, 1.0, 1.0, 1.0],
            light_colours_ambient: [0.25, 0.25, 0.25, 1.0],
            light_colours_diffuse: [1.0, 1.0, 1.0, 1.0],
            light_colours_specular: [1.0, 1.0, 1.0, 1.0],
            light_positions: [0.0, 0.0, 60.0, 1.0],
            fog_start: 250.0,
            fog_end: 1250.0,
            zoom: 1.0,
            do_draw_clicked_atom_lines: false,
            clip_plane0: [0.0, 0.0, -1.0, -500.0],
            clip_plane1: [0.0, 0.0, 1.0, 500.0],
            quat: [0.0, 0.0, 0.0, -1.0],
        }
    }
}

/// Rendering preferences captured alongside the view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub atom_label_depth_mode: bool,
}

impl Session {
    /// Assemble a session from gathered molecule data and the current view
    pub fn assemble(molecules: Vec<MoleculeState>, view: &ViewState, prefs: Preferences) -> Self {
        let mut molecules_names = Vec::with_capacity(molecules.len());
        let mut molecules_pdb_data = Vec::with_capacity(molecules.len());
        let mut molecules_display_objects_keys = Vec::with_capacity(molecules.len());
        let mut molecules_coot_bonds_options = Vec::with_capacity(molecules.len());

        for molecule in molecules {
            molecules_names.push(molecule.name);
            molecules_pdb_data.push(molecule.pdb_data);
            molecules_display_objects_keys.push(molecule.display_object_keys);
            molecules_coot_bonds_options.push(molecule.bonds_options);
        }

        Self {
            schema_version: SESSION_SCHEMA_VERSION,
            molecules_names,
            maps_names: Vec::new(),
            molecules_pdb_data,
            maps_map_data: Vec::new(),
            active_map_mol_no: None,
            molecules_display_objects_keys,
            molecules_coot_bonds_options,
            maps_coot_contours: Vec::new(),
            maps_contour_levels: Vec::new(),
            maps_colours: Vec::new(),
            maps_lit_lines: Vec::new(),
            maps_radius: Vec::new(),
            maps_is_difference: Vec::new(),
            origin: view.origin,
            background_color: view.background_colour,
            atom_label_depth_mode: prefs.atom_label_depth_mode,
            ambient_light: view.light_colours_ambient,
            diffuse_light: view.light_colours_diffuse,
            light_position: view.light_positions,
            specular_light: view.light_colours_specular,
            fog_start: view.fog_start,
            fog_end: view.fog_end,
            zoom: view.zoom,
            do_draw_clicked_atom_lines: view.do_draw_clicked_atom_lines,
            clip_start: -(view.clip_plane0[3] + CLIP_PLANE_OFFSET),
            clip_end: view.clip_plane1[3] - CLIP_PLANE_OFFSET,
            quat4: view.quat,
        }
    }

    /// Rebuild the view state this session was captured from
    ///
    /// Clip plane normals are not persisted; the defaults are used.
    pub fn view_state(&self) -> ViewState {
        let defaults = ViewState::default();
        let mut clip_plane0 = defaults.clip_plane0;
        let mut clip_plane1 = defaults.clip_plane1;
        clip_plane0[3] = -self.clip_start - CLIP_PLANE_OFFSET;
        clip_plane1[3] = self.clip_end + CLIP_PLANE_OFFSET;

        ViewState {
            origin: self.origin,
            background_colour: self.background_color,
            light_colours_ambient: self.ambient_light,
            light_colours_diffuse: self.diffuse_light,
            light_colours_specular: self.specular_light,
            light_positions: self.light_position,
            fog_start: self.fog_start,
            fog_end: self.fog_end,
            zoom: self.zoom,
            do_draw_clicked_atom_lines: self.do_draw_clicked_atom_lines,
            clip_plane0,
            clip_plane1,
            quat: self.quat4,
        }
    }

    pub fn molecule_count(&self) -> usize {
        self.molecules_names.len()
    }

    /// Serialize to the stored snapshot string
    pub fn to_snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a stored snapshot string
    pub fn from_snapshot(snapshot: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(snapshot)
    }
}
