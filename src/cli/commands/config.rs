//! `pcbpop config` command - manage `pcbpop.yaml`

use clap::Subcommand;
use console::style;
use miette::Result;
use std::path::Path;

use crate::cli::helpers::{open_project, print_structured};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::{self, FileAction, CONFIG_FILENAME};
use crate::core::{Config, ConfigError};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write the default pcbpop.yaml unless one exists
    Init,

    /// Overwrite pcbpop.yaml with the defaults
    Reset,

    /// Add settings introduced since pcbpop.yaml was written
    Update,

    /// Show the resolved settings of the selected preset
    Show,

    /// Show paths to configuration files
    Path,
}

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Init => run_file_action(global, config::init_file),
        ConfigCommands::Reset => run_file_action(global, config::reset_file),
        ConfigCommands::Update => run_file_action(global, config::update_file),
        ConfigCommands::Show => run_show(global),
        ConfigCommands::Path => run_path(global),
    }
}

fn run_file_action(
    global: &GlobalOpts,
    action: fn(&Path) -> std::result::Result<FileAction, ConfigError>,
) -> Result<()> {
    let root = match &global.project {
        Some(root) => root.clone(),
        None => std::env::current_dir().map_err(|e| miette::miette!("{e}"))?,
    };
    let path = root.join(CONFIG_FILENAME);

    let outcome = action(&root)?;
    if global.quiet {
        return Ok(());
    }
    match outcome {
        FileAction::Created => println!("{} Created {}", style("✓").green(), path.display()),
        FileAction::Overwritten => {
            println!("{} Reset {} to defaults", style("✓").green(), path.display())
        }
        FileAction::Updated => println!(
            "{} Added missing settings to {}",
            style("✓").green(),
            path.display()
        ),
        FileAction::Unchanged => println!(
            "{} {} is already up to date",
            style("•").dim(),
            path.display()
        ),
    }
    Ok(())
}

fn run_show(global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = project.config();

    let format = match global.format {
        OutputFormat::Json => OutputFormat::Json,
        _ => OutputFormat::Yaml,
    };

    if format == OutputFormat::Yaml && !global.quiet {
        println!(
            "{} {}",
            style("# preset:").dim(),
            style(&global.preset).cyan()
        );
    }
    print_structured(config, format)?;

    if matches!(global.format, OutputFormat::Auto) {
        print_library_dirs(config, project.root());
    }
    Ok(())
}

fn print_library_dirs(config: &Config, root: &Path) {
    let dirs = config.library_dirs(root);
    println!();
    println!("{}", style("# library search order:").dim());
    for (i, dir) in dirs.iter().enumerate() {
        let state = if dir.is_dir() {
            style("").dim()
        } else {
            style(" (missing)").yellow()
        };
        println!("{}{}", style(format!("#   {}. {}", i + 1, dir.display())).dim(), state);
    }
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    println!("{}", style("Configuration file paths:").bold());
    println!();

    match Config::global_config_path() {
        Some(path) => print_path("Global:", &path),
        None => println!(
            "  {} {}",
            style("Global:").cyan(),
            style("(no home directory)").dim()
        ),
    }

    let project = open_project(global)?;
    print_path("Project:", &project.root().join(CONFIG_FILENAME));
    Ok(())
}

fn print_path(label: &str, path: &Path) {
    println!("  {:<9}{}", style(label).cyan(), path.display());
    if path.exists() {
        println!("           {}", style("(exists)").green());
    } else {
        println!("           {}", style("(not created)").dim());
    }
}
