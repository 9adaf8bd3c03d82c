//! Configuration management with layered hierarchy
//!
//! Layers, lowest precedence first:
//!
//! 1. the template embedded in the binary (`templates/pcbpop.yaml`)
//! 2. the global user config (`~/.config/pcbpop/pcbpop.yaml`)
//! 3. the project's `pcbpop.yaml`
//! 4. `MODEL_LIBRARY_PATHS` from the environment (prepended to the list)
//!
//! Mappings merge key by key; scalars and lists from a later layer replace
//! earlier ones. A preset other than `default` inherits from `default`.

use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::error::ConfigError;
use crate::core::normalize::{AliasOverrides, AliasTable};
use crate::yaml::parse_value;

/// Name of the project configuration file
pub const CONFIG_FILENAME: &str = "pcbpop.yaml";

/// Preset used when none is requested
pub const DEFAULT_PRESET: &str = "default";

/// Environment variable with extra library paths, `:`-separated
pub const LIBRARY_PATH_ENV: &str = "MODEL_LIBRARY_PATHS";

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Settings {
    /// Extension of the EDA project file naming the board
    pub prj_extension: String,
    pub fab_dir: String,
    pub bom_dir: String,
    #[serde(default)]
    pub model_library_paths: Vec<String>,
    pub model_extension: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Effects {
    pub show_mechanical: bool,
    pub show_markings: bool,
}

/// One named configuration preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    pub settings: Settings,
    pub effects: Effects,
    #[serde(default)]
    pub aliases: AliasOverrides,
}

impl Config {
    /// Load `preset` for the project at `root`, merging every layer
    pub fn load(root: &Path, preset: &str) -> Result<Self, ConfigError> {
        let mut merged = template_value()?;

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                debug!(path = %global_path.display(), "merging global config");
                merge_values(&mut merged, read_value(&global_path)?);
            }
        }

        let local_path = root.join(CONFIG_FILENAME);
        if local_path.exists() {
            debug!(path = %local_path.display(), "merging project config");
            merge_values(&mut merged, read_value(&local_path)?);
        }

        Self::from_value(merged, preset, &local_path)
    }

    /// Select and validate one preset from a merged config document
    fn from_value(
        document: serde_yml::Value,
        preset: &str,
        path: &Path,
    ) -> Result<Self, ConfigError> {
        let serde_yml::Value::Mapping(presets) = document else {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                message: "expected a mapping of preset names".to_string(),
            });
        };

        let Some(selected) = presets.get(preset).cloned() else {
            let available: Vec<&str> = presets.keys().filter_map(|k| k.as_str()).collect();
            return Err(ConfigError::UnknownPreset {
                preset: preset.to_string(),
                available: available.join(", "),
            });
        };

        let value = match presets.get(DEFAULT_PRESET) {
            Some(base) if preset != DEFAULT_PRESET => {
                let mut value = base.clone();
                merge_values(&mut value, selected);
                value
            }
            _ => selected,
        };

        serde_yml::from_value(value).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            message: format!("preset '{preset}': {e}"),
        })
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "pcbpop")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
    }

    /// Alias table with this preset's overrides applied
    pub fn alias_table(&self) -> AliasTable {
        AliasTable::builtin().with_overrides(&self.aliases)
    }

    /// Library directories in search order, using the process environment
    pub fn library_dirs(&self, root: &Path) -> Vec<PathBuf> {
        self.library_dirs_with(root, |name| std::env::var(name).ok())
    }

    /// Library directories in search order.
    ///
    /// Entries from `MODEL_LIBRARY_PATHS` come first, then the configured
    /// list. Variables are expanded through `lookup`; relative paths are
    /// taken relative to `root`.
    pub fn library_dirs_with(
        &self,
        root: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Vec<PathBuf> {
        let from_env = lookup(LIBRARY_PATH_ENV).unwrap_or_default();

        from_env
            .split(':')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .chain(self.settings.model_library_paths.iter().cloned())
            .map(|raw| {
                let expanded = PathBuf::from(expand_vars(&raw, &lookup));
                if expanded.is_absolute() {
                    expanded
                } else {
                    root.join(expanded)
                }
            })
            .collect()
    }
}

/// Expand `$VAR` and `${VAR}`; unknown variables are left as written
pub fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match (name.is_empty(), lookup(name)) {
            (false, Some(value)) => out.push_str(&value),
            _ => out.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}

/// Raw text of the embedded configuration template
pub fn template_text() -> Result<String, ConfigError> {
    let file = EmbeddedTemplates::get(CONFIG_FILENAME).ok_or_else(|| ConfigError::Io {
        path: PathBuf::from(CONFIG_FILENAME),
        message: "embedded template missing".to_string(),
    })?;
    Ok(String::from_utf8_lossy(&file.data).into_owned())
}

fn template_value() -> Result<serde_yml::Value, ConfigError> {
    Ok(parse_value(&template_text()?, CONFIG_FILENAME)?)
}

fn read_value(path: &Path) -> Result<serde_yml::Value, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let value = parse_value(&text, &path.display().to_string())?;
    // An empty file is an empty layer
    Ok(match value {
        serde_yml::Value::Null => serde_yml::Value::Mapping(Default::default()),
        v => v,
    })
}

/// Merge `overlay` into `base`: mappings recursively, everything else replaced
pub fn merge_values(base: &mut serde_yml::Value, overlay: serde_yml::Value) {
    match (base, overlay) {
        (serde_yml::Value::Mapping(base_map), serde_yml::Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// What a config file operation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Created,
    Overwritten,
    Updated,
    Unchanged,
}

/// Copy the template into the project unless a config already exists
pub fn init_file(root: &Path) -> Result<FileAction, ConfigError> {
    let path = root.join(CONFIG_FILENAME);
    if path.exists() {
        return Ok(FileAction::Unchanged);
    }
    write_file(&path, &template_text()?)?;
    Ok(FileAction::Created)
}

/// Replace the project config with the template
pub fn reset_file(root: &Path) -> Result<FileAction, ConfigError> {
    let path = root.join(CONFIG_FILENAME);
    let existed = path.exists();
    write_file(&path, &template_text()?)?;
    Ok(if existed {
        FileAction::Overwritten
    } else {
        FileAction::Created
    })
}

/// Add keys present in the template but missing from the project config,
/// keeping every value the project already sets
pub fn update_file(root: &Path) -> Result<FileAction, ConfigError> {
    let path = root.join(CONFIG_FILENAME);
    if !path.exists() {
        return init_file(root);
    }

    let local = read_value(&path)?;
    let mut merged = template_value()?;
    merge_values(&mut merged, local.clone());
    if merged == local {
        return Ok(FileAction::Unchanged);
    }

    let text = serde_yml::to_string(&merged).map_err(|e| ConfigError::Invalid {
        path: path.clone(),
        message: e.to_string(),
    })?;
    write_file(&path, &text)?;
    Ok(FileAction::Updated)
}

fn write_file(path: &Path, text: &str) -> Result<(), ConfigError> {
    fs::write(path, text).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
