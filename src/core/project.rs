//! Project discovery and structure
//!
//! A project is a directory holding the EDA project file, a fab directory
//! with placement and override tables, optionally a BOM directory, and
//! optionally a `pcbpop.yaml`.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::config::{Config, CONFIG_FILENAME};
use crate::core::csvtable::RawTable;
use crate::core::error::{ConfigError, PopulateError};
use crate::core::populate::Inputs;

/// Board name used when no single project file identifies it
pub const DEFAULT_PCB_NAME: &str = "unknownpcb";

const PLACEMENT_SUFFIX: &str = "pos.csv";
const OVERRIDE_SUFFIX: &str = "override.csv";
const BOM_SUFFIX: &str = "BOM-populated.csv";

/// Input table files found in a project
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputFiles {
    pub placements: Vec<PathBuf>,
    pub bom: Option<PathBuf>,
    pub overrides: Option<PathBuf>,
}

impl InputFiles {
    /// Read every table
    pub fn load(&self) -> Result<Inputs, PopulateError> {
        Ok(Inputs {
            placements: self
                .placements
                .iter()
                .map(|p| RawTable::from_path(p))
                .collect::<Result<_, _>>()?,
            bom: self.bom.as_deref().map(RawTable::from_path).transpose()?,
            overrides: self.overrides.as_deref().map(RawTable::from_path).transpose()?,
        })
    }
}

/// Represents a board project
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover(preset: &str) -> Result<Self, ConfigError> {
        let current = std::env::current_dir().map_err(|e| ConfigError::Io {
            path: PathBuf::from("."),
            message: e.to_string(),
        })?;
        Self::discover_from(&current, preset)
    }

    /// Find the nearest ancestor of `start` holding a `pcbpop.yaml`; without
    /// one, `start` itself is the project root
    pub fn discover_from(start: &Path, preset: &str) -> Result<Self, ConfigError> {
        let start = start.canonicalize().map_err(|e| ConfigError::Io {
            path: start.to_path_buf(),
            message: e.to_string(),
        })?;

        let root = start
            .ancestors()
            .find(|dir| dir.join(CONFIG_FILENAME).is_file())
            .unwrap_or(&start)
            .to_path_buf();
        debug!(root = %root.display(), "project root");

        Self::open(&root, preset)
    }

    /// Open the project rooted exactly at `root`
    pub fn open(root: &Path, preset: &str) -> Result<Self, ConfigError> {
        let config = Config::load(root, preset)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn fab_dir(&self) -> PathBuf {
        self.root.join(&self.config.settings.fab_dir)
    }

    pub fn bom_dir(&self) -> PathBuf {
        self.root.join(&self.config.settings.bom_dir)
    }

    /// Stem of the single project file in the root, or [`DEFAULT_PCB_NAME`]
    pub fn pcb_name(&self) -> String {
        let extension = &self.config.settings.prj_extension;
        if extension.is_empty() {
            return DEFAULT_PCB_NAME.to_string();
        }

        let matches = files_with_suffix(&self.root, extension);
        match matches.as_slice() {
            [single] => single
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| DEFAULT_PCB_NAME.to_string()),
            found => {
                warn!(
                    extension = %extension,
                    found = found.len(),
                    "expected a single project file; using default PCB name"
                );
                DEFAULT_PCB_NAME.to_string()
            }
        }
    }

    /// Scene manifest for the board: `<fab dir>/<pcb name>.scene.yaml`
    pub fn scene_path(&self) -> PathBuf {
        self.fab_dir().join(format!("{}.scene.yaml", self.pcb_name()))
    }

    /// Locate the input tables.
    ///
    /// Every `*pos.csv` in the fab directory is a placement table, the first
    /// `*override.csv` the override table. With markings on, the first
    /// `*BOM-populated.csv` in the BOM directory is the BOM.
    pub fn discover_inputs(&self) -> Result<InputFiles, ConfigError> {
        let fab = self.fab_dir();
        if !fab.is_dir() {
            return Err(ConfigError::MissingDirectory {
                what: "fab",
                path: fab,
            });
        }

        let placements: Vec<PathBuf> = files_with_suffix(&fab, PLACEMENT_SUFFIX);
        if placements.is_empty() {
            warn!(dir = %fab.display(), "no *{PLACEMENT_SUFFIX} files found");
        }
        let overrides = files_with_suffix(&fab, OVERRIDE_SUFFIX).into_iter().next();

        let bom = if self.config.effects.show_markings {
            let dir = self.bom_dir();
            if !dir.is_dir() {
                return Err(ConfigError::MissingDirectory { what: "BOM", path: dir });
            }
            files_with_suffix(&dir, BOM_SUFFIX).into_iter().next()
        } else {
            None
        };

        debug!(placements = ?placements, overrides = ?overrides, bom = ?bom, "discovered inputs");
        Ok(InputFiles {
            placements,
            bom,
            overrides,
        })
    }
}

/// Files (not directories) directly in `dir` whose name ends with `suffix`,
/// sorted by name
fn files_with_suffix(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().ends_with(suffix))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}
