//! Error taxonomy for the population pipeline
//!
//! - [`SchemaError`]: malformed tabular input. Row-scoped errors are
//!   non-fatal (the row is skipped and reported); a missing required column
//!   aborts the run.
//! - [`ConfigError`]: contradictory or unreadable configuration. Fatal and
//!   reported once, before resolution starts.
//! - [`ResolutionWarning`]: something could not be resolved. Never fatal;
//!   collected into the end-of-run report.

use miette::Diagnostic;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::normalize::{Field, TableKind};
use crate::core::scene::SceneError;
use crate::yaml::YamlSyntaxError;

/// Malformed or ambiguous tabular input
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum SchemaError {
    #[error("{kind} table '{table}' has no column for required field '{field}' (tried: {tried})")]
    #[diagnostic(
        code(pcbpop::schema::missing_column),
        help("rename the column or add its header to the ALIASES section of pcbpop.yaml")
    )]
    MissingColumn {
        kind: TableKind,
        table: String,
        field: Field,
        tried: String,
    },

    #[error("{table} row {row}: unrecognized side '{value}'")]
    #[diagnostic(
        code(pcbpop::schema::side),
        help("accepted values: T, top, Top, TopLayer, B, bottom, Bottom, BottomLayer")
    )]
    InvalidSide {
        table: String,
        row: usize,
        value: String,
    },

    #[error("{table} row {row}: field '{field}' is not a number: '{value}'")]
    #[diagnostic(code(pcbpop::schema::number))]
    InvalidNumber {
        table: String,
        row: usize,
        field: Field,
        value: String,
    },

    #[error("{table} row {row}: designator list '{value}' contains a comma")]
    #[diagnostic(
        code(pcbpop::schema::designators),
        help("separate designators with spaces, e.g. \"R1 R2 R3\"")
    )]
    CommaInReferences {
        table: String,
        row: usize,
        value: String,
    },

    #[error("{table} row {row}: required field '{field}' is empty")]
    #[diagnostic(code(pcbpop::schema::empty))]
    EmptyField {
        table: String,
        row: usize,
        field: Field,
    },

    #[error("{table} row {row}: {message}")]
    #[diagnostic(code(pcbpop::schema::malformed))]
    Malformed {
        table: String,
        row: usize,
        message: String,
    },
}

impl SchemaError {
    /// True when the error only invalidates a single row
    pub fn is_row_scoped(&self) -> bool {
        !matches!(self, SchemaError::MissingColumn { .. })
    }
}

/// Contradictory or unreadable configuration
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("markings are enabled but no BOM table was supplied")]
    #[diagnostic(
        code(pcbpop::config::marking_without_bom),
        help("provide a *BOM-populated.csv file in the BOM directory or set EFFECTS.SHOW_MARKINGS to false")
    )]
    MarkingWithoutBom,

    #[error("{what} directory not found: {path}")]
    #[diagnostic(code(pcbpop::config::missing_dir))]
    MissingDirectory { what: &'static str, path: PathBuf },

    #[error("unknown configuration preset '{preset}' (available: {available})")]
    #[diagnostic(code(pcbpop::config::preset))]
    UnknownPreset { preset: String, available: String },

    #[error("invalid configuration in {path}: {message}")]
    #[diagnostic(code(pcbpop::config::invalid))]
    Invalid { path: PathBuf, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("cannot read {path}: {message}")]
    #[diagnostic(code(pcbpop::config::io))]
    Io { path: PathBuf, message: String },
}

/// A non-fatal resolution problem, aggregated into the run report
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionWarning {
    #[error("{name}: no model for footprint '{footprint}' in any library")]
    ModelNotFound { name: String, footprint: String },

    #[error("{parent}: sub-model '{model}' not found in any library")]
    SubModelMissing { parent: String, model: String },

    #[error("{parent}: sub-model '{model}' closes a cycle ({chain}); not expanded")]
    SubModelCycle {
        parent: String,
        model: String,
        chain: String,
    },

    #[error("{asset}: invalid sub-model declaration {index}: {message}")]
    InvalidSubModel {
        asset: String,
        index: u32,
        message: String,
    },

    #[error("{asset}: unreadable model metadata: {message}")]
    MetadataUnreadable { asset: String, message: String },

    #[error("override row {row} for '{target}' matched no placement")]
    UnmatchedOverride { row: usize, target: String },

    #[error("override row {shadowed_row} for '{target}' is shadowed by row {winner_row}")]
    ShadowedOverride {
        target: String,
        shadowed_row: usize,
        winner_row: usize,
    },
}

/// Fatal errors of a population run
#[derive(Debug, Error, Diagnostic)]
pub enum PopulateError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scene(#[from] SceneError),

    #[error("cannot read table {path}: {message}")]
    #[diagnostic(code(pcbpop::io))]
    Table { path: PathBuf, message: String },
}
