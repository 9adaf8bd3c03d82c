//! Table formatting for CLI list output
//!
//! Commands collect typed cells and render them once, in whichever
//! human-readable format was requested. YAML and JSON output go through
//! serde instead (see [`crate::cli::helpers::print_structured`]).

use console::style;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, format_number, truncate_str};
use crate::cli::OutputFormat;
use crate::entities::{Side, Visibility};

/// Longest text shown in a table column before truncation
const MAX_TEXT_WIDTH: usize = 48;

/// A typed cell value
#[derive(Debug, Clone)]
pub enum CellValue {
    Text(String),
    Path(PathBuf),
    Number(usize),
    /// Coordinate triple
    Vector([f64; 3]),
    Side(Side),
    Visibility(Visibility),
    Empty,
}

impl CellValue {
    /// Text for tables, truncated to keep columns readable
    pub fn display(&self) -> String {
        match self {
            CellValue::Text(s) => truncate_str(s, MAX_TEXT_WIDTH),
            CellValue::Path(p) => p.display().to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Vector(v) => v
                .iter()
                .map(|c| format_number(*c, 3))
                .collect::<Vec<_>>()
                .join(", "),
            CellValue::Side(s) => s.to_string(),
            CellValue::Visibility(v) => v.to_string(),
            CellValue::Empty => "-".to_string(),
        }
    }

    /// Full-fidelity text for CSV output
    pub fn raw(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Vector(v) => v
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" "),
            CellValue::Empty => String::new(),
            other => other.display(),
        }
    }
}

/// Rows of typed cells under a fixed header
#[derive(Debug, Clone)]
pub struct TableFormatter {
    headers: Vec<&'static str>,
    rows: Vec<Vec<CellValue>>,
    /// Singular noun for the summary line ("model", "component")
    noun: &'static str,
}

impl TableFormatter {
    pub fn new(headers: Vec<&'static str>, noun: &'static str) -> Self {
        Self {
            headers,
            rows: Vec::new(),
            noun,
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render for the given format. `Auto` adds a summary line.
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Csv => self.render_csv(),
            OutputFormat::Table => self.render_table(),
            _ => {
                let mut out = String::new();
                if !self.rows.is_empty() {
                    out.push_str(&self.render_table());
                    out.push('\n');
                }
                out.push_str(&format!(
                    "{}\n",
                    style(format!("{} {}(s)", self.rows.len(), self.noun)).dim()
                ));
                out
            }
        }
    }

    fn render_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.headers.iter().map(|h| h.to_string()));
        for row in &self.rows {
            builder.push_record(row.iter().map(CellValue::display));
        }
        let mut table = builder.build();
        table.with(Style::sharp());
        table.to_string()
    }

    fn render_csv(&self) -> String {
        let mut out = self.headers.join(",");
        out.push('\n');
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|c| escape_csv(&c.raw())).collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }
        out
    }
}
