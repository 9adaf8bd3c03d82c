//! Scene store: the board model components are placed onto
//!
//! The store is read once at the start of a run (board geometry and the
//! components already placed), modified in memory, and written back once.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::core::transform::BoardGeometry;
use crate::entities::PlacementInstruction;
use crate::yaml::{parse_value, YamlSyntaxError};

#[derive(Debug, Error, Diagnostic)]
pub enum SceneError {
    #[error("scene not found: {path}")]
    #[diagnostic(
        code(pcbpop::scene::missing),
        help("create the board first with `pcbpop board --width W --height H`")
    )]
    Missing { path: PathBuf },

    #[error("cannot read scene {path}: {message}")]
    #[diagnostic(code(pcbpop::scene::read))]
    Read { path: PathBuf, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("invalid scene {path}: {message}")]
    #[diagnostic(code(pcbpop::scene::invalid))]
    Invalid { path: PathBuf, message: String },

    #[error("cannot write scene {path}: {message}")]
    #[diagnostic(code(pcbpop::scene::write))]
    Write { path: PathBuf, message: String },
}

/// Board object of the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneBoard {
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub thickness: f64,
}

impl SceneBoard {
    pub fn geometry(&self) -> BoardGeometry {
        BoardGeometry {
            width: self.width,
            height: self.height,
            thickness: self.thickness,
        }
    }
}

/// Serialized scene: the board and every object placed on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneManifest {
    pub board: SceneBoard,
    #[serde(default)]
    pub components: Vec<PlacementInstruction>,
}

impl SceneManifest {
    pub fn new(board: SceneBoard) -> Self {
        Self {
            board,
            components: Vec::new(),
        }
    }

    /// Replace every object belonging to an incoming designator, then
    /// append the incoming objects
    fn apply(&mut self, instructions: &[PlacementInstruction]) {
        let replaced: HashSet<&str> = instructions.iter().map(|i| i.reference.as_str()).collect();
        self.components
            .retain(|c| !replaced.contains(c.reference.as_str()));
        self.components.extend_from_slice(instructions);
    }
}

/// Where placement instructions end up
pub trait SceneStore {
    fn board(&self) -> &SceneBoard;

    /// Objects already in the scene, top-level and sub-model instances
    fn placed(&self) -> &[PlacementInstruction];

    /// Remove every placed object, keeping the board
    fn clear(&mut self);

    fn apply(&mut self, instructions: &[PlacementInstruction]);

    /// Persist the scene
    fn commit(&mut self) -> Result<(), SceneError>;
}

/// Scene persisted as a YAML manifest on disk
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
    manifest: SceneManifest,
}

impl ManifestStore {
    /// Open an existing scene manifest
    pub fn open(path: &Path) -> Result<Self, SceneError> {
        if !path.exists() {
            return Err(SceneError::Missing {
                path: path.to_path_buf(),
            });
        }

        let text = fs::read_to_string(path).map_err(|e| SceneError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let value = parse_value(&text, &path.display().to_string())?;
        let manifest: SceneManifest =
            serde_yml::from_value(value).map_err(|e| SceneError::Invalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        debug!(scene = %path.display(), components = manifest.components.len(), "opened scene");
        Ok(Self {
            path: path.to_path_buf(),
            manifest,
        })
    }

    /// Start a new, empty scene for `board`; nothing is written until commit
    pub fn create(path: &Path, board: SceneBoard) -> Self {
        Self {
            path: path.to_path_buf(),
            manifest: SceneManifest::new(board),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SceneStore for ManifestStore {
    fn board(&self) -> &SceneBoard {
        &self.manifest.board
    }

    fn placed(&self) -> &[PlacementInstruction] {
        &self.manifest.components
    }

    fn clear(&mut self) {
        self.manifest.components.clear();
    }

    fn apply(&mut self, instructions: &[PlacementInstruction]) {
        self.manifest.apply(instructions);
    }

    fn commit(&mut self) -> Result<(), SceneError> {
        let write_err = |e: &dyn std::fmt::Display| SceneError::Write {
            path: self.path.clone(),
            message: e.to_string(),
        };

        let yaml = serde_yml::to_string(&self.manifest).map_err(|e| write_err(&e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| write_err(&e))?;
        }

        // Write next to the target, then swap it in
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, yaml).map_err(|e| write_err(&e))?;
        fs::rename(&tmp, &self.path).map_err(|e| write_err(&e))?;

        debug!(scene = %self.path.display(), components = self.manifest.components.len(), "wrote scene");
        Ok(())
    }
}

/// Scene held in memory only
#[derive(Debug, Clone)]
pub struct MemoryStore {
    pub manifest: SceneManifest,
    /// Number of successful commits
    pub commits: usize,
}

impl MemoryStore {
    pub fn new(board: SceneBoard) -> Self {
        Self {
            manifest: SceneManifest::new(board),
            commits: 0,
        }
    }
}

impl SceneStore for MemoryStore {
    fn board(&self) -> &SceneBoard {
        &self.manifest.board
    }

    fn placed(&self) -> &[PlacementInstruction] {
        &self.manifest.components
    }

    fn clear(&mut self) {
        self.manifest.components.clear();
    }

    fn apply(&mut self, instructions: &[PlacementInstruction]) {
        self.manifest.apply(instructions);
    }

    fn commit(&mut self) -> Result<(), SceneError> {
        self.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Side, Visibility};
    use tempfile::tempdir;

    fn board() -> SceneBoard {
        SceneBoard {
            name: "demo".to_string(),
            width: 50.0,
            height: 30.0,
            thickness: 1.6,
        }
    }

    fn instruction(name: &str, reference: &str, asset: &str, parent: Option<&str>) -> PlacementInstruction {
        PlacementInstruction {
            name: name.to_string(),
            reference: reference.to_string(),
            asset: asset.to_string(),
            asset_path: PathBuf::from(format!("/lib/{asset}.blend")),
            library: PathBuf::from("/lib"),
            position: [1.0, 2.0, 1.6],
            rotation: [0.0, 0.0, 90.0],
            parent: parent.map(|p| p.to_string()),
            visibility: Visibility::Normal,
            side: Side::Top,
        }
    }

    #[test]
    fn test_apply_replaces_designator_and_children() {
        let mut store = MemoryStore::new(board());
        store.apply(&[
            instruction("J1:USB", "J1", "USB", None),
            instruction("J1:USB_1_submodel", "J1", "SHIELD", Some("J1")),
            instruction("R1:10k", "R1", "0603", None),
        ]);
        store.apply(&[instruction("J1:USB", "J1", "USB_ALT", None)]);

        let names: Vec<&str> = store.placed().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["R1:10k", "J1:USB"]);
        assert_eq!(store.placed()[1].asset, "USB_ALT");
    }

    #[test]
    fn test_manifest_roundtrip_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fab/demo.scene.yaml");

        let mut store = ManifestStore::create(&path, board());
        store.apply(&[instruction("R1:10k", "R1", "0603", None)]);
        store.commit().unwrap();
        assert!(!dir.path().join("fab/demo.scene.yaml.tmp").exists());

        let reopened = ManifestStore::open(&path).unwrap();
        assert_eq!(reopened.board(), &board());
        assert_eq!(reopened.placed().len(), 1);
        assert_eq!(reopened.placed()[0].asset, "0603");
    }

    #[test]
    fn test_open_missing_scene() {
        let dir = tempdir().unwrap();
        let err = ManifestStore::open(&dir.path().join("none.scene.yaml")).unwrap_err();
        assert!(matches!(err, SceneError::Missing { .. }));
    }

    #[test]
    fn test_open_invalid_scene() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.scene.yaml");
        fs::write(&path, "board: {name: x}\n").unwrap();
        let err = ManifestStore::open(&path).unwrap_err();
        assert!(matches!(err, SceneError::Invalid { .. }));
    }
}
