//! Orchestrator: runs the population pipeline end to end
//!
//! Stage order is fixed:
//!
//! 1. configuration checks (markings need a BOM)
//! 2. normalize placement, BOM and override tables
//! 3. apply overrides
//! 4. drop mechanical designators when mechanical parts are hidden
//! 5. annotate markings
//! 6. resolve each placement to a library asset
//! 7. skip designators already placed with the same asset (re-import)
//! 8. compute transforms and expand sub-models
//! 9. gate emission on visibility and hand the instructions to the scene

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::core::csvtable::RawTable;
use crate::core::error::{ConfigError, PopulateError, ResolutionWarning, SchemaError};
use crate::core::library::LibraryIndex;
use crate::core::marking::annotate;
use crate::core::metadata::MetadataSource;
use crate::core::normalize::{
    normalize_bom, normalize_overrides, normalize_placements, AliasTable, Normalized,
};
use crate::core::overrides::apply_overrides;
use crate::core::report::{RunReport, SkipReason};
use crate::core::scene::SceneStore;
use crate::core::submodel::{Expander, SubModelCache};
use crate::core::transform::placement_transform;
use crate::entities::{PlacementInstruction, ResolvedComponent, Visibility};

/// How a run treats components already in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Place everything; refuse to touch an already populated scene
    #[default]
    Fresh,
    /// Place only designators that are new or whose asset changed
    Reimport,
    /// Remove every placed component, then place everything
    Regenerate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub marking: bool,
    pub show_mechanical: bool,
    pub mode: ImportMode,
}

/// Raw tables feeding one run
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    /// Placement tables, concatenated in order
    pub placements: Vec<RawTable>,
    pub bom: Option<RawTable>,
    pub overrides: Option<RawTable>,
}

/// Resolved output of a run
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Instructions in input order, each top-level component followed by
    /// its sub-model instances
    pub instructions: Vec<PlacementInstruction>,
    pub report: RunReport,
    /// The scene already held components and the mode was [`ImportMode::Fresh`]
    pub already_populated: bool,
}

/// Pipeline state for one run; owns the sub-model cache
pub struct Populator<'a> {
    libraries: &'a LibraryIndex,
    metadata: &'a dyn MetadataSource,
    aliases: &'a AliasTable,
    options: RunOptions,
    cache: SubModelCache,
}

impl<'a> Populator<'a> {
    pub fn new(
        libraries: &'a LibraryIndex,
        metadata: &'a dyn MetadataSource,
        aliases: &'a AliasTable,
        options: RunOptions,
    ) -> Self {
        Self {
            libraries,
            metadata,
            aliases,
            options,
            cache: SubModelCache::new(),
        }
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Resolve every placement without touching the scene
    pub fn plan(&mut self, inputs: &Inputs, scene: &dyn SceneStore) -> Result<Plan, PopulateError> {
        if self.options.marking && inputs.bom.is_none() {
            return Err(ConfigError::MarkingWithoutBom.into());
        }

        if self.options.mode == ImportMode::Fresh && !scene.placed().is_empty() {
            info!(placed = scene.placed().len(), "components already imported");
            return Ok(Plan {
                already_populated: true,
                ..Default::default()
            });
        }

        let mut report = RunReport::default();

        // Normalize
        let mut placements = Normalized::default();
        for table in &inputs.placements {
            placements.extend(normalize_placements(table, self.aliases)?);
        }
        report.rows_processed = placements.records.len() + placements.rejected.len();
        let mut rejected = placements.rejected;

        let bom = match (&inputs.bom, self.options.marking) {
            (Some(table), true) => {
                let bom = normalize_bom(table, self.aliases)?;
                rejected.extend(bom.rejected);
                Some(bom.records)
            }
            _ => None,
        };

        let overrides = match &inputs.overrides {
            Some(table) => {
                let rows = normalize_overrides(table, self.aliases)?;
                rejected.extend(rows.rejected);
                rows.records
            }
            None => Vec::new(),
        };

        for error in &rejected {
            warn!("{error}");
        }
        report.rejected_rows = rejected.iter().map(SchemaError::to_string).collect();
        info!(
            placements = placements.records.len(),
            overrides = overrides.len(),
            rejected = rejected.len(),
            "normalized input tables"
        );

        // Overrides
        let outcome = apply_overrides(placements.records, &overrides);
        report.overrides_applied = outcome.applied;
        report.warnings.extend(outcome.warnings);

        // Mechanical designators
        let mut kept = Vec::with_capacity(outcome.placements.len());
        for record in outcome.placements {
            if record.is_mechanical_designator() && !self.options.show_mechanical {
                debug!(reference = %record.reference, "skipping mechanical designator");
                report.skip(&record.reference, SkipReason::Mechanical);
            } else {
                kept.push(record);
            }
        }

        // Markings
        let marked = annotate(kept, bom.as_deref(), self.options.marking)?;

        // Assets already in the scene, by designator
        let existing: HashMap<&str, &PlacementInstruction> = match self.options.mode {
            ImportMode::Reimport => scene
                .placed()
                .iter()
                .filter(|p| p.is_top_level())
                .map(|p| (p.reference.as_str(), p))
                .collect(),
            _ => HashMap::new(),
        };

        let board = scene.board().geometry();
        let mut instructions = Vec::new();

        for item in marked {
            let record = item.record;
            let name = record.instance_name();

            let Some(entry) = self.libraries.resolve(&record.footprint, item.marking.as_deref())
            else {
                report.warnings.push(ResolutionWarning::ModelNotFound {
                    name,
                    footprint: record.footprint.clone(),
                });
                report.skip(&record.reference, SkipReason::NotFound);
                continue;
            };

            if let Some(placed) = existing.get(record.reference.as_str()) {
                if placed.asset == entry.asset_key() && placed.asset_path == entry.path {
                    debug!(reference = %record.reference, "unchanged, skipping");
                    report.skip(&record.reference, SkipReason::Unchanged);
                    continue;
                }
            }

            let spec = self
                .cache
                .get_or_load(&entry, self.metadata, &mut report.warnings);

            let visibility = if record.is_mechanical_designator() || spec.is_mechanical() {
                Visibility::Mechanical
            } else {
                Visibility::Normal
            };
            if !self.is_visible(visibility) {
                debug!(reference = %record.reference, asset = %entry.asset_key(), "skipping mechanical asset");
                report.skip(&record.reference, SkipReason::MechanicalAsset);
                continue;
            }

            debug!(
                reference = %record.reference,
                asset = %entry.asset_key(),
                library = %entry.library.display(),
                "resolved"
            );
            *report.per_library.entry(entry.library.clone()).or_default() += 1;

            let top = ResolvedComponent {
                name,
                reference: record.reference.clone(),
                footprint: record.footprint.clone(),
                transform: placement_transform(&record, &board),
                parent: None,
                visibility,
                side: record.side,
                entry,
            };

            let mut children = Vec::new();
            if spec.is_main_model() {
                Expander {
                    libraries: self.libraries,
                    metadata: self.metadata,
                    cache: &mut self.cache,
                }
                .expand(&top, &spec, &mut children, &mut report.warnings);
            }

            instructions.push(top.to_instruction());
            report.placed += 1;
            for child in children.iter().filter(|c| self.is_visible(c.visibility)) {
                instructions.push(child.to_instruction());
                report.submodels += 1;
            }
        }

        for warning in &report.warnings {
            warn!("{warning}");
        }
        info!(
            placed = report.placed,
            submodels = report.submodels,
            not_found = report.not_found(),
            unchanged = report.unchanged(),
            "resolved placements"
        );

        Ok(Plan {
            instructions,
            report,
            already_populated: false,
        })
    }

    /// Plan, then write the result to the scene in one step.
    ///
    /// Nothing is written on a dry run, when the scene is already populated,
    /// or when a re-import finds nothing to change.
    pub fn run(
        &mut self,
        inputs: &Inputs,
        scene: &mut dyn SceneStore,
        dry_run: bool,
    ) -> Result<Plan, PopulateError> {
        let plan = self.plan(inputs, scene)?;
        if dry_run || plan.already_populated {
            return Ok(plan);
        }

        match self.options.mode {
            ImportMode::Regenerate => scene.clear(),
            ImportMode::Reimport if plan.instructions.is_empty() => {
                info!("scene is up to date");
                return Ok(plan);
            }
            _ => {}
        }

        scene.apply(&plan.instructions);
        scene.commit()?;
        Ok(plan)
    }

    fn is_visible(&self, visibility: Visibility) -> bool {
        self.options.show_mechanical || visibility == Visibility::Normal
    }
}
