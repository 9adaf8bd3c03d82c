//! End-of-run report

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::error::ResolutionWarning;

/// Why a designator was not placed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `A`-prefixed designator with mechanical parts hidden
    Mechanical,
    /// Asset is a standalone mechanical part and mechanical parts are hidden
    MechanicalAsset,
    NotFound,
    /// Already placed with the same asset (re-import)
    Unchanged,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Mechanical => write!(f, "mechanical designator"),
            SkipReason::MechanicalAsset => write!(f, "mechanical asset"),
            SkipReason::NotFound => write!(f, "model not found"),
            SkipReason::Unchanged => write!(f, "unchanged"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedDesignator {
    pub designator: String,
    pub reason: SkipReason,
}

/// Counters and diagnostics collected during one run
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RunReport {
    /// Placement rows read (accepted and rejected)
    pub rows_processed: usize,
    /// Top-level components emitted
    pub placed: usize,
    /// Sub-model instances emitted
    pub submodels: usize,
    pub overrides_applied: usize,
    /// Models used per library root
    pub per_library: BTreeMap<PathBuf, usize>,
    /// Rejected input rows, rendered
    pub rejected_rows: Vec<String>,
    pub warnings: Vec<ResolutionWarning>,
    pub skipped: Vec<SkippedDesignator>,
}

impl RunReport {
    pub fn skip(&mut self, designator: impl Into<String>, reason: SkipReason) {
        self.skipped.push(SkippedDesignator {
            designator: designator.into(),
            reason,
        });
    }

    pub fn count(&self, reason: &SkipReason) -> usize {
        self.skipped.iter().filter(|s| &s.reason == reason).count()
    }

    pub fn not_found(&self) -> usize {
        self.count(&SkipReason::NotFound)
    }

    pub fn unchanged(&self) -> usize {
        self.count(&SkipReason::Unchanged)
    }

    pub fn has_problems(&self) -> bool {
        !self.warnings.is_empty() || !self.rejected_rows.is_empty()
    }
}
