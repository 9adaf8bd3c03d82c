//! Override record - user corrections applied on top of placement data

use serde::{Deserialize, Serialize};

use crate::entities::placement::{PlacementRecord, Side};

/// Requested change of board face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideOverride {
    /// Invert whatever side the placement currently has
    Flip,
    /// Replace the side outright
    Set(Side),
}

/// A normalized override row
///
/// Every optional field left as `None` means "no change" for that field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRecord {
    /// Source row number, used for reporting and declaration order
    pub row: usize,

    /// Designators this row is scoped to; empty means footprint-wide
    #[serde(default)]
    pub references: Vec<String>,

    /// Footprint the row targets when it is footprint-wide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint: Option<String>,

    /// Replacement footprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dx: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dy: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drotation: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<SideOverride>,
}

impl OverrideRecord {
    /// True when the row names explicit designators
    pub fn is_scoped(&self) -> bool {
        !self.references.is_empty()
    }

    /// Human-readable description of what the row targets
    pub fn target(&self) -> String {
        if self.is_scoped() {
            self.references.join(" ")
        } else {
            self.footprint.clone().unwrap_or_default()
        }
    }

    /// Produce the overridden placement.
    ///
    /// Offsets are added to the placement values, the footprint is replaced,
    /// and the side change is applied last so a flip mirrors the shifted
    /// position.
    pub fn apply(&self, record: &PlacementRecord) -> PlacementRecord {
        let mut out = record.clone();

        if let Some(ref footprint) = self.replacement {
            out.footprint = footprint.clone();
        }
        if let Some(dx) = self.dx {
            out.x += dx;
        }
        if let Some(dy) = self.dy {
            out.y += dy;
        }
        if let Some(drot) = self.drotation {
            out.rotation += drot;
        }

        match self.side {
            Some(SideOverride::Flip) => out.flipped(),
            Some(SideOverride::Set(side)) => {
                out.side = side;
                out
            }
            None => out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement() -> PlacementRecord {
        PlacementRecord {
            reference: "R1".to_string(),
            value: "10k".to_string(),
            footprint: "0603".to_string(),
            x: 10.0,
            y: 5.0,
            rotation: 90.0,
            side: Side::Top,
        }
    }

    fn empty_override() -> OverrideRecord {
        OverrideRecord {
            row: 2,
            references: vec![],
            footprint: Some("0603".to_string()),
            replacement: None,
            dx: None,
            dy: None,
            drotation: None,
            side: None,
        }
    }

    #[test]
    fn test_empty_override_changes_nothing() {
        assert_eq!(empty_override().apply(&placement()), placement());
    }

    #[test]
    fn test_offsets_and_replacement() {
        let rule = OverrideRecord {
            replacement: Some("0603_alt".to_string()),
            dx: Some(1.5),
            drotation: Some(-90.0),
            ..empty_override()
        };
        let out = rule.apply(&placement());
        assert_eq!(out.footprint, "0603_alt");
        assert_eq!(out.x, 11.5);
        assert_eq!(out.y, 5.0);
        assert_eq!(out.rotation, 0.0);
        assert_eq!(out.side, Side::Top);
    }

    #[test]
    fn test_flip_and_explicit_side() {
        let flip = OverrideRecord {
            side: Some(SideOverride::Flip),
            ..empty_override()
        };
        let out = flip.apply(&placement());
        assert_eq!(out.side, Side::Bottom);
        assert_eq!(out.x, -10.0);

        let set = OverrideRecord {
            side: Some(SideOverride::Set(Side::Bottom)),
            ..empty_override()
        };
        let out = set.apply(&placement());
        assert_eq!(out.side, Side::Bottom);
        assert_eq!(out.x, 10.0);
    }
}
