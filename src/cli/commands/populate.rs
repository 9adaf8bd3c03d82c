//! `pcbpop populate` command - place component models on the board scene

use console::style;
use miette::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::helpers::{open_project, print_structured};
use crate::cli::table::{CellValue, TableFormatter};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::library::LibraryIndex;
use crate::core::metadata::SidecarMetadata;
use crate::core::populate::{ImportMode, Plan, Populator, RunOptions};
use crate::core::report::{RunReport, SkipReason};
use crate::core::scene::ManifestStore;
use crate::entities::PlacementInstruction;

#[derive(clap::Args, Debug)]
pub struct PopulateArgs {
    /// Scene manifest to populate (default: <fab dir>/<pcb>.scene.yaml)
    #[arg(long)]
    pub scene: Option<PathBuf>,

    /// Update an already populated scene, replacing only changed components
    #[arg(long, conflicts_with = "regenerate")]
    pub reimport: bool,

    /// Remove every placed component and populate from scratch
    #[arg(long)]
    pub regenerate: bool,

    /// Resolve and report without writing the scene
    #[arg(long)]
    pub dry_run: bool,

    /// Show mechanical parts (overrides SHOW_MECHANICAL)
    #[arg(long, value_name = "BOOL")]
    pub mechanical: Option<bool>,

    /// Use marking-specific models from the BOM (overrides SHOW_MARKINGS)
    #[arg(long, value_name = "BOOL")]
    pub markings: Option<bool>,
}

impl PopulateArgs {
    fn mode(&self) -> ImportMode {
        if self.regenerate {
            ImportMode::Regenerate
        } else if self.reimport {
            ImportMode::Reimport
        } else {
            ImportMode::Fresh
        }
    }
}

#[derive(Serialize)]
struct PopulateOutput<'a> {
    dry_run: bool,
    already_populated: bool,
    instructions: &'a [PlacementInstruction],
    report: &'a RunReport,
}

pub fn run(args: PopulateArgs, global: &GlobalOpts) -> Result<()> {
    let mut project = open_project(global)?;
    {
        let effects = &mut project.config_mut().effects;
        if let Some(show) = args.mechanical {
            effects.show_mechanical = show;
        }
        if let Some(show) = args.markings {
            effects.show_markings = show;
        }
    }
    let config = project.config();

    let inputs = project.discover_inputs()?.load()?;
    let libraries = LibraryIndex::scan(
        &config.library_dirs(project.root()),
        &config.settings.model_extension,
    );

    let scene_path = args.scene.clone().unwrap_or_else(|| project.scene_path());
    let mut scene = ManifestStore::open(&scene_path)?;

    let aliases = config.alias_table();
    let options = RunOptions {
        marking: config.effects.show_markings,
        show_mechanical: config.effects.show_mechanical,
        mode: args.mode(),
    };
    info!(scene = %scene_path.display(), mode = ?options.mode, "populating");

    let mut populator = Populator::new(&libraries, &SidecarMetadata, &aliases, options);
    let plan = populator.run(&inputs, &mut scene, args.dry_run)?;

    let output = PopulateOutput {
        dry_run: args.dry_run,
        already_populated: plan.already_populated,
        instructions: &plan.instructions,
        report: &plan.report,
    };
    if print_structured(&output, global.format)? {
        return Ok(());
    }

    if plan.already_populated {
        println!(
            "{} Components already imported into {}",
            style("•").dim(),
            scene_path.display()
        );
        println!(
            "  {}",
            style("use --reimport to update changed parts or --regenerate to start over").dim()
        );
        return Ok(());
    }

    if matches!(global.format, OutputFormat::Table | OutputFormat::Csv) {
        print!("{}", instruction_table(&plan.instructions).render(global.format));
        return Ok(());
    }

    if !global.quiet {
        print_summary(&plan, &scene_path, args.dry_run);
    }
    Ok(())
}

fn instruction_table(instructions: &[PlacementInstruction]) -> TableFormatter {
    let mut table = TableFormatter::new(
        vec!["Name", "Asset", "Position", "Rotation", "Side", "Visibility", "Parent"],
        "instance",
    );
    for inst in instructions {
        table.push_row(vec![
            CellValue::Text(inst.name.clone()),
            CellValue::Text(inst.asset.clone()),
            CellValue::Vector(inst.position),
            CellValue::Vector(inst.rotation),
            CellValue::Side(inst.side),
            CellValue::Visibility(inst.visibility),
            match &inst.parent {
                Some(parent) => CellValue::Text(parent.clone()),
                None => CellValue::Empty,
            },
        ]);
    }
    table
}

fn print_summary(plan: &Plan, scene_path: &Path, dry_run: bool) {
    let report = &plan.report;

    if !report.per_library.is_empty() {
        println!("{}", style("Models per library:").bold());
        for (library, count) in &report.per_library {
            println!("  {:>5}  {}", count, library.display());
        }
        println!();
    }

    println!("{}", style("Summary:").bold());
    println!("  {:<20}{}", "Rows processed:", report.rows_processed);
    println!("  {:<20}{}", "Components placed:", report.placed);
    if report.submodels > 0 {
        println!("  {:<20}{}", "Sub-models placed:", report.submodels);
    }
    if report.overrides_applied > 0 {
        println!("  {:<20}{}", "Overrides applied:", report.overrides_applied);
    }
    if report.unchanged() > 0 {
        println!("  {:<20}{}", "Unchanged:", report.unchanged());
    }
    let not_found = report.not_found();
    let label = format!("{:<20}", "Not found:");
    if not_found > 0 {
        println!("  {}{}", label, style(not_found).yellow());
    } else {
        println!("  {}{}", label, not_found);
    }

    let skipped: Vec<_> = report
        .skipped
        .iter()
        .filter(|s| s.reason != SkipReason::Unchanged)
        .collect();
    if !skipped.is_empty() {
        println!();
        println!("{}", style("Skipped:").bold());
        for item in skipped {
            println!("  {:<12}{}", item.designator, style(&item.reason).dim());
        }
    }

    if !report.rejected_rows.is_empty() {
        println!();
        println!("{}", style("Rejected rows:").bold());
        for row in &report.rejected_rows {
            println!("  {} {}", style("✗").red(), row);
        }
    }

    if !report.warnings.is_empty() {
        println!();
        println!("{}", style("Warnings:").bold());
        for warning in &report.warnings {
            println!("  {} {}", style("!").yellow(), warning);
        }
    }

    println!();
    if dry_run {
        println!(
            "{} Dry run: {} instance(s) resolved, scene not written",
            style("•").dim(),
            plan.instructions.len()
        );
    } else if plan.instructions.is_empty() {
        println!("{} Scene is up to date", style("✓").green());
    } else {
        println!(
            "{} Placed {} instance(s) in {}",
            style("✓").green(),
            plan.instructions.len(),
            scene_path.display()
        );
    }
}
