//! Resolved components and the placement instructions emitted to the scene

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::library::LibraryEntry;
use crate::core::transform::Transform;
use crate::entities::placement::Side;

/// Whether an instance belongs with regular components or mechanical parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Normal,
    Mechanical,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Normal => write!(f, "normal"),
            Visibility::Mechanical => write!(f, "mechanical"),
        }
    }
}

/// A placement resolved to a concrete library asset with its absolute transform
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedComponent {
    /// Scene object name (`R1:10k`, `J1:USB_C_1_submodel`, ...)
    pub name: String,

    /// Designator of the top-level component this instance belongs to
    pub reference: String,

    /// Footprint key the asset was found under
    pub footprint: String,

    pub entry: LibraryEntry,

    pub transform: Transform,

    /// Designator of the enclosing main model for sub-model instances
    pub parent: Option<String>,

    pub visibility: Visibility,

    pub side: Side,
}

impl ResolvedComponent {
    pub fn to_instruction(&self) -> PlacementInstruction {
        PlacementInstruction {
            name: self.name.clone(),
            reference: self.reference.clone(),
            asset: self.entry.asset_key(),
            asset_path: self.entry.path.clone(),
            library: self.entry.library.clone(),
            position: self.transform.position,
            rotation: self.transform.rotation,
            parent: self.parent.clone(),
            visibility: self.visibility,
            side: self.side,
        }
    }
}

/// What the scene store receives for every object to place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementInstruction {
    pub name: String,

    pub reference: String,

    /// Asset identity: the file stem the model was resolved to
    pub asset: String,

    pub asset_path: PathBuf,

    pub library: PathBuf,

    pub position: [f64; 3],

    /// XYZ Euler angles in degrees
    pub rotation: [f64; 3],

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(default)]
    pub visibility: Visibility,

    pub side: Side,
}

impl PlacementInstruction {
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}
