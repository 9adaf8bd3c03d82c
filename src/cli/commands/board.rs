//! `pcbpop board` command - create the board scene manifest

use console::style;
use miette::Result;
use std::path::PathBuf;
use tracing::info;

use crate::cli::helpers::{format_number, open_project};
use crate::cli::GlobalOpts;
use crate::core::scene::{ManifestStore, SceneBoard};
use crate::core::SceneStore;

#[derive(clap::Args, Debug)]
pub struct BoardArgs {
    /// Board outline width (mm)
    #[arg(long)]
    pub width: f64,

    /// Board outline height (mm)
    #[arg(long)]
    pub height: f64,

    /// Board thickness (mm)
    #[arg(long, default_value_t = 1.6)]
    pub thickness: f64,

    /// Board name (default: project file name)
    #[arg(long)]
    pub name: Option<String>,

    /// Scene manifest to write (default: <fab dir>/<pcb>.scene.yaml)
    #[arg(long)]
    pub scene: Option<PathBuf>,

    /// Replace an existing scene, dropping its components
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: BoardArgs, global: &GlobalOpts) -> Result<()> {
    for (what, value) in [
        ("width", args.width),
        ("height", args.height),
        ("thickness", args.thickness),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(miette::miette!("board {what} must be positive, got {value}"));
        }
    }

    let project = open_project(global)?;
    let path = args.scene.unwrap_or_else(|| project.scene_path());
    if path.exists() && !args.force {
        return Err(miette::miette!(
            "Scene already exists: {} (use --force to start over)",
            path.display()
        ));
    }

    let board = SceneBoard {
        name: args.name.unwrap_or_else(|| project.pcb_name()),
        width: args.width,
        height: args.height,
        thickness: args.thickness,
    };
    let mut store = ManifestStore::create(&path, board);
    store.commit()?;
    info!(scene = %store.path().display(), "created board scene");

    if !global.quiet {
        let board = store.board();
        println!(
            "{} Created board {} ({} x {} x {} mm) at {}",
            style("✓").green(),
            style(&board.name).cyan(),
            format_number(board.width, 3),
            format_number(board.height, 3),
            format_number(board.thickness, 3),
            style(store.path().display()).dim()
        );
    }
    Ok(())
}
