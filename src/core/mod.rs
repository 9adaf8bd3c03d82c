//! Core module - the population pipeline and its collaborators

pub mod config;
pub mod csvtable;
pub mod error;
pub mod library;
pub mod marking;
pub mod metadata;
pub mod normalize;
pub mod overrides;
pub mod populate;
pub mod project;
pub mod report;
pub mod scene;
pub mod submodel;
pub mod transform;

pub use config::Config;
pub use csvtable::RawTable;
pub use error::{ConfigError, PopulateError, ResolutionWarning, SchemaError};
pub use library::{LibraryEntry, LibraryIndex};
pub use metadata::{MetadataSource, SidecarMetadata};
pub use normalize::{AliasTable, Field, TableKind};
pub use populate::{ImportMode, Inputs, Plan, Populator, RunOptions};
pub use project::Project;
pub use report::RunReport;
pub use scene::{ManifestStore, SceneStore};
pub use transform::{BoardGeometry, Transform};
