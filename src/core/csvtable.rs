//! Raw CSV tables: ordered rows of string cells keyed by a header row

use csv::ReaderBuilder;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::core::error::{PopulateError, SchemaError};

/// One data row of a raw table
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line in the source file (the header is line 1)
    pub line: usize,
    pub cells: Vec<String>,
}

/// A CSV table as read from disk, before any schema is applied
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    /// Name used in diagnostics (usually the file name)
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Rows the CSV reader itself could not decode
    pub malformed: Vec<SchemaError>,
}

impl RawTable {
    /// Read a table from a CSV file.
    ///
    /// Files that are not valid UTF-8 are decoded lossily; offending bytes
    /// become U+FFFD and a warning is logged.
    pub fn from_path(path: &Path) -> Result<Self, PopulateError> {
        let bytes = fs::read(path).map_err(|e| PopulateError::Table {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    file = %path.display(),
                    "CSV file is not valid UTF-8; problematic characters replaced with U+FFFD"
                );
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        Self::from_text(&name, &text).map_err(|e| PopulateError::Table {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse CSV text; the first record is the header row
    pub fn from_text(name: &str, text: &str) -> Result<Self, csv::Error> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();

        let mut table = RawTable {
            name: name.to_string(),
            headers,
            rows: Vec::new(),
            malformed: Vec::new(),
        };

        for (idx, result) in rdr.records().enumerate() {
            let line = idx + 2;
            match result {
                Ok(record) => {
                    let line = record.position().map(|p| p.line() as usize).unwrap_or(line);
                    let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();

                    // Extra non-empty cells shift every later column
                    let width = table.headers.len();
                    if cells.iter().skip(width).any(|c| !c.is_empty()) {
                        table.malformed.push(SchemaError::Malformed {
                            table: name.to_string(),
                            row: line,
                            message: format!(
                                "{} cells but the header has {} (unquoted comma in a cell?)",
                                cells.len(),
                                width
                            ),
                        });
                        continue;
                    }
                    table.rows.push(RawRow { line, cells });
                }
                Err(e) => table.malformed.push(SchemaError::Malformed {
                    table: name.to_string(),
                    row: line,
                    message: e.to_string(),
                }),
            }
        }

        debug!(table = name, rows = table.rows.len(), "read CSV table");
        Ok(table)
    }

    /// Index of the first header equal to `name`, ignoring case and
    /// surrounding whitespace
    pub fn column(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.headers
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
    }
}

impl RawRow {
    /// Trimmed cell text; `None` when the row is shorter than the header
    pub fn cell(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).map(|c| c.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_from_text_reads_headers_and_rows() {
        let table = RawTable::from_text("t.csv", "Ref,Val\nR1, 10k\nR2,1k\n").unwrap();
        assert_eq!(table.headers, vec!["Ref", "Val"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].cell(1), Some("10k"));
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[1].line, 3);
    }

    #[test]
    fn test_short_rows_are_kept() {
        let table = RawTable::from_text("t.csv", "Ref,Val,Package\nR1,10k\n").unwrap();
        assert_eq!(table.rows[0].cell(2), None);
    }

    #[test]
    fn test_long_rows_are_malformed() {
        let table = RawTable::from_text("t.csv", "Ref,Val\nR1,R2,10k\nR3,1k,\n").unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].cell(0), Some("R3"));
        assert!(matches!(
            table.malformed[0],
            SchemaError::Malformed { row: 2, .. }
        ));
    }

    #[test]
    fn test_column_lookup_ignores_case() {
        let table = RawTable::from_text("t.csv", "Ref, PosX ,Side\n").unwrap();
        assert_eq!(table.column("posx"), Some(1));
        assert_eq!(table.column("Rot"), None);
    }

    #[test]
    fn test_from_path_replaces_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board-top-pos.csv");
        let mut bytes = b"Ref,Val\nR1,".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b"\n");
        std::fs::write(&path, bytes).unwrap();

        let table = RawTable::from_path(&path).unwrap();
        assert_eq!(table.name, "board-top-pos.csv");
        assert!(table.rows[0].cells[1].contains('\u{FFFD}'));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = RawTable::from_path(Path::new("/nonexistent/pos.csv")).unwrap_err();
        assert!(matches!(err, PopulateError::Table { .. }));
    }
}
