//! YAML error diagnostics pointing at the offending line of a config,
//! scene manifest or model metadata file

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// YAML syntax error with source location
#[derive(Debug, Error, Diagnostic)]
#[error("YAML syntax error in {filename}: {message}")]
#[diagnostic(code(pcbpop::yaml::syntax))]
pub struct YamlSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    filename: String,

    message: String,
}

impl YamlSyntaxError {
    /// Build a diagnostic from a serde_yml error and the text it came from
    pub fn from_serde_error(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));

        let offset = line_col_to_offset(source, line, column);
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            filename: filename.to_string(),
            message,
        }
    }
}

/// Parse YAML text, turning syntax errors into a located diagnostic
pub fn parse_value(source: &str, filename: &str) -> Result<serde_yml::Value, YamlSyntaxError> {
    serde_yml::from_str(source).map_err(|e| YamlSyntaxError::from_serde_error(&e, source, filename))
}

/// Convert a 1-based line/column to a byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut current_line = 1;
    let mut line_start = 0;

    for (i, ch) in source.char_indices() {
        if current_line == line {
            break;
        }
        if ch == '\n' {
            current_line += 1;
            line_start = i + 1;
        }
    }

    if current_line < line {
        return source.len().saturating_sub(1);
    }

    let line_len = source[line_start..]
        .find('\n')
        .unwrap_or(source.len() - line_start);
    (line_start + column.saturating_sub(1).min(line_len)).min(source.len().saturating_sub(1))
}

/// Message fragment -> hint, checked in order
const HINTS: &[(&str, &str)] = &[
    ("tab", "indent with spaces; YAML does not allow tabs"),
    ("duplicate key", "a preset or property is defined twice; keep one"),
    ("expected block end", "indentation is inconsistent around this line"),
    (
        "mapping values are not allowed",
        "add a space after ':' or fix the indentation",
    ),
    ("found unexpected ':'", "quote values containing ':'"),
    (
        "did not find expected ',' or ']'",
        "close the list; vectors are written as [x, y, z]",
    ),
];

/// Suggest a fix for the most common mistakes in hand-edited files
fn generate_help(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    HINTS
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map(|(_, hint)| hint.to_string())
}
