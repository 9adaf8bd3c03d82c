//! Override resolver
//!
//! Picks at most one override row per placement and applies it:
//!
//! 1. a row whose designator set contains the placement's reference
//! 2. a footprint-wide row whose footprint equals the placement's footprint
//! 3. none
//!
//! Rows are never merged. When several rows compete at the same precedence
//! level the last declared one wins and the others are reported as shadowed.

use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::core::error::ResolutionWarning;
use crate::entities::{OverrideRecord, PlacementRecord};

/// Placements after override application
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverrideOutcome {
    pub placements: Vec<PlacementRecord>,
    pub warnings: Vec<ResolutionWarning>,
    /// Number of placements an override row was applied to
    pub applied: usize,
}

/// Lookup tables built once from the override rows
struct OverrideIndex<'a> {
    by_reference: HashMap<&'a str, &'a OverrideRecord>,
    by_footprint: HashMap<&'a str, &'a OverrideRecord>,
    shadowed: Vec<ResolutionWarning>,
}

impl<'a> OverrideIndex<'a> {
    fn build(rows: &'a [OverrideRecord]) -> Self {
        let mut by_reference: HashMap<&str, &OverrideRecord> = HashMap::new();
        let mut by_footprint: HashMap<&str, &OverrideRecord> = HashMap::new();
        let mut shadowed = Vec::new();

        for row in rows {
            if row.is_scoped() {
                for reference in &row.references {
                    if let Some(prev) = by_reference.insert(reference.as_str(), row) {
                        shadowed.push(ResolutionWarning::ShadowedOverride {
                            target: reference.clone(),
                            shadowed_row: prev.row,
                            winner_row: row.row,
                        });
                    }
                }
            } else if let Some(footprint) = row.footprint.as_deref() {
                if let Some(prev) = by_footprint.insert(footprint, row) {
                    shadowed.push(ResolutionWarning::ShadowedOverride {
                        target: footprint.to_string(),
                        shadowed_row: prev.row,
                        winner_row: row.row,
                    });
                }
            }
        }

        Self {
            by_reference,
            by_footprint,
            shadowed,
        }
    }

    fn lookup(&self, record: &PlacementRecord) -> Option<&'a OverrideRecord> {
        self.by_reference
            .get(record.reference.as_str())
            .or_else(|| self.by_footprint.get(record.footprint.as_str()))
            .copied()
    }
}

/// Apply the override rows to every placement, in input order
pub fn apply_overrides(
    placements: Vec<PlacementRecord>,
    overrides: &[OverrideRecord],
) -> OverrideOutcome {
    if overrides.is_empty() {
        return OverrideOutcome {
            placements,
            ..Default::default()
        };
    }

    let index = OverrideIndex::build(overrides);
    let mut used: BTreeSet<usize> = BTreeSet::new();
    let mut applied = 0;

    let placements = placements
        .into_iter()
        .map(|record| match index.lookup(&record) {
            Some(rule) => {
                debug!(
                    reference = %record.reference,
                    row = rule.row,
                    scoped = rule.is_scoped(),
                    "applying override"
                );
                used.insert(rule.row);
                applied += 1;
                rule.apply(&record)
            }
            None => record,
        })
        .collect();

    let mut warnings = index.shadowed;
    for row in overrides {
        if !used.contains(&row.row) && !is_fully_shadowed(row, &warnings) {
            warnings.push(ResolutionWarning::UnmatchedOverride {
                row: row.row,
                target: row.target(),
            });
        }
    }

    OverrideOutcome {
        placements,
        warnings,
        applied,
    }
}

/// A row that lost every one of its targets is already reported as shadowed
fn is_fully_shadowed(row: &OverrideRecord, warnings: &[ResolutionWarning]) -> bool {
    let shadowed_targets: Vec<&str> = warnings
        .iter()
        .filter_map(|w| match w {
            ResolutionWarning::ShadowedOverride {
                target,
                shadowed_row,
                ..
            } if *shadowed_row == row.row => Some(target.as_str()),
            _ => None,
        })
        .collect();

    if row.is_scoped() {
        row.references
            .iter()
            .all(|r| shadowed_targets.contains(&r.as_str()))
    } else {
        !shadowed_targets.is_empty()
    }
}
