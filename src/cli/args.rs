//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    board::BoardArgs, completions::CompletionsArgs, config::ConfigCommands,
    library::LibraryCommands, populate::PopulateArgs, template::TemplateArgs,
};

#[derive(Parser)]
#[command(name = "pcbpop")]
#[command(author, version, about = "Populate PCB models with 3D component models")]
#[command(long_about = "Resolves which 3D model to place at each component location of a board, \
and with what transform, from pick-and-place, BOM and override tables and a prioritized list \
of model libraries.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Project root (default: nearest directory with pcbpop.yaml, else the
    /// current directory)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Configuration preset from pcbpop.yaml
    #[arg(
        long = "config",
        short = 'c',
        global = true,
        env = "PCBPOP_PRESET",
        default_value = "default"
    )]
    pub preset: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Place component models on the board scene
    Populate(PopulateArgs),

    /// Inspect the configured model libraries
    #[command(subcommand)]
    Library(LibraryCommands),

    /// Create the board scene manifest
    Board(BoardArgs),

    /// Manage pcbpop.yaml
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Print a CSV header template for an input table
    Template(TemplateArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables and summaries
    #[default]
    Auto,
    /// Bordered tables only, no summary
    Table,
    /// YAML format (full fidelity)
    Yaml,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
}
