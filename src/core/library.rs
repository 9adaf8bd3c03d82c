//! Model library index and priority-ordered lookup
//!
//! A library is a directory tree of model assets named `<footprint>.<ext>`
//! (generic) or `<footprint>-<marking>.<ext>` (marked). Libraries are
//! searched in configuration order; the first library holding either the
//! marked or the generic asset wins and later libraries are never consulted.

use miette::Diagnostic;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Lookup failure for a single footprint
#[derive(Debug, Error, Diagnostic)]
pub enum LibraryError {
    #[error("no model for '{key}' in any library (searched: {searched})")]
    #[diagnostic(
        code(pcbpop::library::not_found),
        help("add MODEL_LIBRARY_PATHS entries to pcbpop.yaml or the environment")
    )]
    NotFound { key: String, searched: String },
}

/// One asset chosen for a footprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryEntry {
    /// Footprint key the asset was looked up with
    pub footprint: String,

    /// Marking slug when the marked variant was chosen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marking: Option<String>,

    /// Root directory of the owning library
    pub library: PathBuf,

    /// Position of the library in the search order (0 = highest)
    pub priority: usize,

    pub path: PathBuf,
}

impl LibraryEntry {
    /// Asset identity: the file stem, `footprint` or `footprint-marking`
    pub fn asset_key(&self) -> String {
        match &self.marking {
            Some(marking) => format!("{}-{}", self.footprint, marking),
            None => self.footprint.clone(),
        }
    }
}

/// Assets of one library, keyed by file stem
#[derive(Debug, Clone, Default)]
struct Library {
    root: PathBuf,
    assets: BTreeMap<String, PathBuf>,
}

/// Read-only index over all configured libraries
#[derive(Debug, Clone, Default)]
pub struct LibraryIndex {
    libraries: Vec<Library>,
}

impl LibraryIndex {
    /// Walk every library directory once and record its assets.
    ///
    /// Missing directories are skipped. Directory symlinks are not followed
    /// (they can loop); symlinked files are indexed. Within one library the
    /// first asset with a given stem in sorted walk order wins.
    pub fn scan(dirs: &[PathBuf], extension: &str) -> Self {
        let extension = extension.trim_start_matches('.');
        let mut libraries = Vec::with_capacity(dirs.len());

        for dir in dirs {
            let mut library = Library {
                root: dir.clone(),
                assets: BTreeMap::new(),
            };

            if !dir.is_dir() {
                info!(library = %dir.display(), "model library does not exist, skipping");
                libraries.push(library);
                continue;
            }

            for entry in walkdir::WalkDir::new(dir)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| {
                    e.file_type().is_file() || (e.path_is_symlink() && e.path().is_file())
                })
            {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(extension) {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };

                if let Some(existing) = library.assets.get(stem) {
                    debug!(
                        model = stem,
                        ignored = %path.display(),
                        kept = %existing.display(),
                        "ignoring duplicated model"
                    );
                    continue;
                }
                library.assets.insert(stem.to_string(), path.to_path_buf());
            }

            info!(library = %dir.display(), models = library.assets.len(), "indexed model library");
            libraries.push(library);
        }

        let index = Self { libraries };
        if index.is_empty() {
            warn!(
                searched = %index.searched(),
                "no models found in the configured library paths; no components will be placed"
            );
        }
        index
    }

    /// Build an index from in-memory `(library root, asset paths)` pairs
    pub fn from_assets(libraries: Vec<(PathBuf, Vec<PathBuf>)>) -> Self {
        let libraries = libraries
            .into_iter()
            .map(|(root, paths)| {
                let mut assets = BTreeMap::new();
                for path in paths {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        assets.entry(stem.to_string()).or_insert(path);
                    }
                }
                Library { root, assets }
            })
            .collect();
        Self { libraries }
    }

    /// Find the asset for a footprint, preferring the marked variant within
    /// each library
    pub fn resolve(&self, footprint: &str, marking: Option<&str>) -> Option<LibraryEntry> {
        let marked_key = marking.map(|m| format!("{footprint}-{m}"));

        for (priority, library) in self.libraries.iter().enumerate() {
            if let (Some(key), Some(m)) = (&marked_key, marking) {
                if let Some(path) = library.assets.get(key) {
                    return Some(LibraryEntry {
                        footprint: footprint.to_string(),
                        marking: Some(m.to_string()),
                        library: library.root.clone(),
                        priority,
                        path: path.clone(),
                    });
                }
            }
            if let Some(path) = library.assets.get(footprint) {
                return Some(LibraryEntry {
                    footprint: footprint.to_string(),
                    marking: None,
                    library: library.root.clone(),
                    priority,
                    path: path.clone(),
                });
            }
        }

        None
    }

    /// Like [`resolve`](Self::resolve) but explains a miss
    pub fn require(&self, footprint: &str, marking: Option<&str>) -> Result<LibraryEntry, LibraryError> {
        self.resolve(footprint, marking)
            .ok_or_else(|| LibraryError::NotFound {
                key: match marking {
                    Some(m) => format!("{footprint} (marking {m})"),
                    None => footprint.to_string(),
                },
                searched: self.searched(),
            })
    }

    /// Every indexed asset, in search order, keyed by its file stem
    pub fn entries(&self) -> Vec<LibraryEntry> {
        self.libraries
            .iter()
            .enumerate()
            .flat_map(|(priority, library)| {
                library.assets.iter().map(move |(stem, path)| LibraryEntry {
                    footprint: stem.clone(),
                    marking: None,
                    library: library.root.clone(),
                    priority,
                    path: path.clone(),
                })
            })
            .collect()
    }

    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.libraries.iter().map(|l| l.root.as_path())
    }

    /// Total number of indexed assets
    pub fn len(&self) -> usize {
        self.libraries.iter().map(|l| l.assets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn searched(&self) -> String {
        self.roots()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_generic_in_higher_priority_beats_marked_in_lower() {
        let index = LibraryIndex::from_assets(vec![
            (PathBuf::from("/l1"), vec![PathBuf::from("/l1/F.blend")]),
            (PathBuf::from("/l2"), vec![PathBuf::from("/l2/F-acme-x1.blend")]),
        ]);
        let entry = index.resolve("F", Some("acme-x1")).unwrap();
        assert_eq!(entry.priority, 0);
        assert_eq!(entry.marking, None);
        assert_eq!(entry.path, PathBuf::from("/l1/F.blend"));
    }

    #[test]
    fn test_marked_preferred_within_library() {
        let index = LibraryIndex::from_assets(vec![(
            PathBuf::from("/l1"),
            vec![PathBuf::from("/l1/F.blend"), PathBuf::from("/l1/F-acme-x1.blend")],
        )]);
        let entry = index.resolve("F", Some("acme-x1")).unwrap();
        assert_eq!(entry.asset_key(), "F-acme-x1");

        // No marking requested: generic asset
        let entry = index.resolve("F", None).unwrap();
        assert_eq!(entry.asset_key(), "F");
    }

    #[test]
    fn test_not_found() {
        let index = LibraryIndex::from_assets(vec![(PathBuf::from("/l1"), vec![])]);
        assert!(index.resolve("F", None).is_none());
        let err = index.require("F", None).unwrap_err();
        assert!(err.to_string().contains("'F'"));
    }

    #[test]
    fn test_scan_walks_nested_dirs_and_filters_extension() {
        let dir = tempdir().unwrap();
        let lib = dir.path().join("lib");
        touch(&lib.join("passives/0603.blend"));
        touch(&lib.join("connectors/usb/USB_C.blend"));
        touch(&lib.join("README.md"));
        touch(&lib.join("0603.blend1"));

        let index = LibraryIndex::scan(&[lib.clone(), dir.path().join("missing")], "blend");
        assert_eq!(index.len(), 2);
        assert_eq!(index.roots().count(), 2);
        assert!(index.resolve("USB_C", None).is_some());
        assert_eq!(
            index.resolve("0603", None).unwrap().path,
            lib.join("passives/0603.blend")
        );
    }

    #[test]
    fn test_scan_first_duplicate_wins() {
        let dir = tempdir().unwrap();
        let lib = dir.path().join("lib");
        touch(&lib.join("a/0603.blend"));
        touch(&lib.join("b/0603.blend"));

        let index = LibraryIndex::scan(&[lib.clone()], ".blend");
        assert_eq!(index.len(), 1);
        assert_eq!(index.resolve("0603", None).unwrap().path, lib.join("a/0603.blend"));
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_does_not_follow_directory_symlinks() {
        let dir = tempdir().unwrap();
        let lib = dir.path().join("lib");
        let outside = dir.path().join("outside");
        touch(&outside.join("hidden.blend"));
        touch(&lib.join("real.blend"));
        std::os::unix::fs::symlink(&outside, lib.join("link")).unwrap();
        std::os::unix::fs::symlink(lib.join("real.blend"), lib.join("alias.blend")).unwrap();

        let index = LibraryIndex::scan(&[lib], "blend");
        assert!(index.resolve("hidden", None).is_none());
        assert!(index.resolve("alias", None).is_some());
        assert!(index.resolve("real", None).is_some());
    }
}
