//! Placement record - one component instance from a pick-and-place table

use serde::{Deserialize, Serialize};

/// Board face a component is mounted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
}

impl Side {
    /// Map a raw table cell through the fixed side vocabulary.
    ///
    /// Only the spellings exported by the supported EDA tools are accepted;
    /// anything else is rejected rather than guessed.
    pub fn from_vocabulary(value: &str) -> Option<Self> {
        match value.trim() {
            "T" | "top" | "Top" | "TopLayer" => Some(Side::Top),
            "B" | "bottom" | "Bottom" | "BottomLayer" => Some(Side::Bottom),
            _ => None,
        }
    }

    /// The opposite board face
    pub fn flipped(self) -> Self {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Top => write!(f, "top"),
            Side::Bottom => write!(f, "bottom"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Side::from_vocabulary(s).ok_or_else(|| {
            format!(
                "Unknown side: {}. Use T, top, Top, TopLayer, B, bottom, Bottom or BottomLayer",
                s
            )
        })
    }
}

/// A normalized pick-and-place row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    /// Reference designator (e.g. "R1")
    pub reference: String,

    /// Symbol value (e.g. "10k")
    #[serde(default)]
    pub value: String,

    /// Footprint name, the primary model lookup key
    pub footprint: String,

    /// Position on the board plane
    pub x: f64,
    pub y: f64,

    /// Rotation about the board normal, in degrees
    pub rotation: f64,

    pub side: Side,
}

impl PlacementRecord {
    /// Instance name used in the scene: `<reference>:<value>`
    pub fn instance_name(&self) -> String {
        format!("{}:{}", self.reference, self.value)
    }

    /// Designator prefix with leading and trailing digits stripped ("A12" -> "A")
    pub fn designator_prefix(&self) -> &str {
        self.reference.trim_matches(|c: char| c.is_ascii_digit())
    }

    /// Designators with the `A` prefix denote mechanical parts
    pub fn is_mechanical_designator(&self) -> bool {
        self.designator_prefix() == "A"
    }

    /// Move the component to the opposite face.
    ///
    /// The X coordinate is negated along with the side so the component keeps
    /// its physical location once the bottom-side mirror is applied.
    pub fn flipped(&self) -> Self {
        Self {
            side: self.side.flipped(),
            x: -self.x,
            ..self.clone()
        }
    }
}
