//! Custom properties attached to model assets
//!
//! Model files are opaque to this crate. Their properties (`PRIO`,
//! sub-model declarations) are read from a sidecar YAML file next to the
//! asset: `models/USB_C.blend` -> `models/USB_C.props.yaml`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::yaml::{parse_value, YamlSyntaxError};

/// Property map of one asset
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssetMetadata {
    properties: BTreeMap<String, serde_yml::Value>,
}

impl AssetMetadata {
    pub fn new(properties: BTreeMap<String, serde_yml::Value>) -> Self {
        Self { properties }
    }

    pub fn get(&self, key: &str) -> Option<&serde_yml::Value> {
        self.properties.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(|k| k.as_str())
    }

    /// `PRIO` property; `None` when absent or not an integer
    pub fn prio(&self) -> Option<i64> {
        self.get("PRIO").and_then(|v| v.as_i64())
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("{path}: expected a mapping of property names to values")]
    NotMapping { path: PathBuf },
}

/// Where asset properties come from
pub trait MetadataSource {
    /// Properties of the asset at `asset`. An asset without properties
    /// yields empty metadata, not an error.
    fn load(&self, asset: &Path) -> Result<AssetMetadata, MetadataError>;
}

/// Reads `<asset stem>.props.yaml` next to each asset
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarMetadata;

impl SidecarMetadata {
    pub fn sidecar_path(asset: &Path) -> PathBuf {
        asset.with_extension("props.yaml")
    }
}

impl MetadataSource for SidecarMetadata {
    fn load(&self, asset: &Path) -> Result<AssetMetadata, MetadataError> {
        let path = Self::sidecar_path(asset);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(AssetMetadata::default()),
            Err(source) => return Err(MetadataError::Io { path, source }),
        };

        let filename = path.display().to_string();
        match parse_value(&text, &filename)? {
            serde_yml::Value::Null => Ok(AssetMetadata::default()),
            serde_yml::Value::Mapping(map) => {
                let properties = map
                    .into_iter()
                    .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v)))
                    .collect();
                Ok(AssetMetadata::new(properties))
            }
            _ => Err(MetadataError::NotMapping { path }),
        }
    }
}

/// In-memory metadata keyed by asset path
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadata {
    assets: HashMap<PathBuf, AssetMetadata>,
}

impl MemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register properties given as a YAML mapping
    pub fn insert_yaml(&mut self, asset: impl Into<PathBuf>, yaml: &str) -> Result<(), MetadataError> {
        let asset = asset.into();
        let properties: BTreeMap<String, serde_yml::Value> = match parse_value(yaml, "<memory>")? {
            serde_yml::Value::Mapping(map) => map
                .into_iter()
                .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v)))
                .collect(),
            _ => return Err(MetadataError::NotMapping { path: asset }),
        };
        self.assets.insert(asset, AssetMetadata::new(properties));
        Ok(())
    }
}

impl MetadataSource for MemoryMetadata {
    fn load(&self, asset: &Path) -> Result<AssetMetadata, MetadataError> {
        Ok(self.assets.get(asset).cloned().unwrap_or_default())
    }
}
