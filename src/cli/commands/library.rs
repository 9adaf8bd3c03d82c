//! `pcbpop library` command - inspect the configured model libraries

use clap::Subcommand;
use console::style;
use miette::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::cli::helpers::{open_project, print_structured};
use crate::cli::table::{CellValue, TableFormatter};
use crate::cli::GlobalOpts;
use crate::core::library::{LibraryEntry, LibraryIndex};
use crate::core::metadata::{MetadataSource, SidecarMetadata};
use crate::core::project::Project;
use crate::core::submodel::SubModelSpec;
use crate::core::ResolutionWarning;

#[derive(Subcommand, Debug)]
pub enum LibraryCommands {
    /// List indexed models in search order
    List(ListArgs),

    /// Show which model a footprint resolves to
    Find(FindArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only models whose name contains this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct FindArgs {
    /// Footprint name
    pub footprint: String,

    /// Marking slug to prefer (`<footprint>-<marking>`)
    #[arg(long)]
    pub marking: Option<String>,
}

pub fn run(cmd: LibraryCommands, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let index = scan(&project);

    match cmd {
        LibraryCommands::List(args) => run_list(args, &index, global),
        LibraryCommands::Find(args) => run_find(args, &index, global),
    }
}

fn scan(project: &Project) -> LibraryIndex {
    let settings = &project.config().settings;
    LibraryIndex::scan(
        &project.config().library_dirs(project.root()),
        &settings.model_extension,
    )
}

#[derive(Serialize)]
struct ListedModel {
    #[serde(flatten)]
    entry: LibraryEntry,
    /// An earlier library holds a model with the same name
    shadowed: bool,
}

fn run_list(args: ListArgs, index: &LibraryIndex, global: &GlobalOpts) -> Result<()> {
    let filter = args.filter.map(|f| f.to_lowercase());

    let mut seen = HashSet::new();
    let mut models = Vec::new();
    for entry in index.entries() {
        let shadowed = !seen.insert(entry.footprint.clone());
        let wanted = filter
            .as_deref()
            .map_or(true, |f| entry.footprint.to_lowercase().contains(f));
        if wanted {
            models.push(ListedModel { entry, shadowed });
        }
    }

    if print_structured(&models, global.format)? {
        return Ok(());
    }

    let mut table = TableFormatter::new(vec!["Model", "Priority", "Library", "Note"], "model");
    for model in &models {
        table.push_row(vec![
            CellValue::Text(model.entry.footprint.clone()),
            CellValue::Number(model.entry.priority),
            CellValue::Path(model.entry.library.clone()),
            if model.shadowed {
                CellValue::Text("shadowed".to_string())
            } else {
                CellValue::Empty
            },
        ]);
    }
    print!("{}", table.render(global.format));
    Ok(())
}

#[derive(Serialize)]
struct SubModelRow {
    index: u32,
    model: String,
    position: [f64; 3],
    rotation: [f64; 3],
    /// Resolved asset path; `None` when no library holds the model
    resolved: Option<PathBuf>,
}

#[derive(Serialize)]
struct FoundModel {
    #[serde(flatten)]
    entry: LibraryEntry,
    asset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prio: Option<i64>,
    submodels: Vec<SubModelRow>,
    warnings: Vec<ResolutionWarning>,
}

fn run_find(args: FindArgs, index: &LibraryIndex, global: &GlobalOpts) -> Result<()> {
    let entry = index.require(&args.footprint, args.marking.as_deref())?;
    let asset = entry.asset_key();

    let (spec, mut warnings) = match SidecarMetadata.load(&entry.path) {
        Ok(meta) => SubModelSpec::parse(&asset, &meta),
        Err(e) => (
            SubModelSpec::default(),
            vec![ResolutionWarning::MetadataUnreadable {
                asset: asset.clone(),
                message: e.to_string(),
            }],
        ),
    };

    let submodels: Vec<SubModelRow> = spec
        .children()
        .map(|decl| SubModelRow {
            index: decl.index,
            model: decl.model.clone(),
            position: decl.relative.position,
            rotation: decl.relative.rotation,
            resolved: index.resolve(&decl.model, None).map(|e| e.path),
        })
        .collect();
    for row in submodels.iter().filter(|r| r.resolved.is_none()) {
        warnings.push(ResolutionWarning::SubModelMissing {
            parent: asset.clone(),
            model: row.model.clone(),
        });
    }

    let found = FoundModel {
        entry,
        asset,
        prio: spec.prio,
        submodels,
        warnings,
    };
    if print_structured(&found, global.format)? {
        return Ok(());
    }

    println!("{} {}", style("Model:").bold(), style(&found.asset).cyan());
    println!("  {:<10}{}", "Path:", found.entry.path.display());
    println!(
        "  {:<10}{} (priority {})",
        "Library:",
        found.entry.library.display(),
        found.entry.priority
    );
    let kind = match found.prio {
        Some(0) => "main model",
        Some(p) if p > 0 => "mechanical part",
        _ => "plain model",
    };
    println!("  {:<10}{}", "Kind:", kind);

    if !found.submodels.is_empty() {
        println!();
        let mut table = TableFormatter::new(
            vec!["#", "Sub-model", "Position", "Rotation", "Resolved"],
            "sub-model",
        );
        for row in &found.submodels {
            table.push_row(vec![
                CellValue::Number(row.index as usize),
                CellValue::Text(row.model.clone()),
                CellValue::Vector(row.position),
                CellValue::Vector(row.rotation),
                match &row.resolved {
                    Some(path) => CellValue::Path(path.clone()),
                    None => CellValue::Empty,
                },
            ]);
        }
        print!("{}", table.render(global.format));
    }

    for warning in &found.warnings {
        println!("{} {}", style("!").yellow(), warning);
    }
    Ok(())
}
