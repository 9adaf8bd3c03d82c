//! Shared helper functions for CLI commands

use miette::Result;
use serde::Serialize;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::project::Project;

/// Open the project selected by `--project`, or discover it from the
/// current directory
pub fn open_project(global: &GlobalOpts) -> Result<Project> {
    let project = match &global.project {
        Some(root) => Project::discover_from(root, &global.preset)?,
        None => Project::discover(&global.preset)?,
    };
    Ok(project)
}

/// Print `value` as YAML or JSON when that format was requested.
///
/// Returns `false` for the human-readable formats so the caller renders
/// its own output.
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Yaml => {
            let text = serde_yml::to_string(value).map_err(|e| miette::miette!("{e}"))?;
            print!("{text}");
            Ok(true)
        }
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(value).map_err(|e| miette::miette!("{e}"))?;
            println!("{text}");
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Truncate a string to max_len, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Format a number with up to `precision` decimals, trimming trailing zeros
pub fn format_number(value: f64, precision: usize) -> String {
    let s = format!("{value:.precision$}");
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    };
    if s == "-0" {
        "0".to_string()
    } else {
        s
    }
}
