//! Sub-model declarations and their recursive expansion
//!
//! An asset declares sub-models through indexed properties:
//!
//! ```yaml
//! PRIO: 0
//! 1_MODEL_NAME: USB_C_SHIELD
//! 1_USB_C_SHIELD_POS: [0.0, 0.0, 0.2]
//! 1_USB_C_SHIELD_ROTATE: [0, 0, 90]
//! ```
//!
//! `PRIO = 0` marks a main model; `PRIO > 0` a standalone mechanical part.
//! Index 0 refers to the main model itself and is never instantiated.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;

use crate::core::error::ResolutionWarning;
use crate::core::library::{LibraryEntry, LibraryIndex};
use crate::core::metadata::{AssetMetadata, MetadataSource};
use crate::core::transform::Transform;
use crate::entities::{ResolvedComponent, Visibility};

/// One declared sub-model
#[derive(Debug, Clone, PartialEq)]
pub struct SubModelDecl {
    pub index: u32,
    pub model: String,
    /// Placement relative to the declaring asset
    pub relative: Transform,
}

/// Parsed sub-model properties of one asset
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubModelSpec {
    pub prio: Option<i64>,
    /// Declarations ordered by index
    pub entries: Vec<SubModelDecl>,
}

impl SubModelSpec {
    /// Parse the sub-model properties of `asset`.
    ///
    /// Invalid declarations are dropped and reported; valid ones are kept.
    pub fn parse(asset: &str, meta: &AssetMetadata) -> (Self, Vec<ResolutionWarning>) {
        let mut entries = Vec::new();
        let mut warnings = Vec::new();

        for key in meta.keys() {
            let Some(index) = key
                .strip_suffix("_MODEL_NAME")
                .and_then(|i| i.parse::<u32>().ok())
            else {
                continue;
            };

            let invalid = |message: String| ResolutionWarning::InvalidSubModel {
                asset: asset.to_string(),
                index,
                message,
            };

            let Some(model) = meta.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty()) else {
                warnings.push(invalid(format!("{key} is not a model name")));
                continue;
            };

            let position = match vector(meta, &format!("{index}_{model}_POS")) {
                Ok(v) => v,
                Err(e) => {
                    warnings.push(invalid(e));
                    continue;
                }
            };
            let rotation = match vector(meta, &format!("{index}_{model}_ROTATE")) {
                Ok(v) => v,
                Err(e) => {
                    warnings.push(invalid(e));
                    continue;
                }
            };

            entries.push(SubModelDecl {
                index,
                model: model.to_string(),
                relative: Transform::new(position, rotation),
            });
        }

        entries.sort_by_key(|d| d.index);
        (
            Self {
                prio: meta.prio(),
                entries,
            },
            warnings,
        )
    }

    /// `PRIO = 0`: a main model that may carry sub-models
    pub fn is_main_model(&self) -> bool {
        self.prio == Some(0)
    }

    /// `PRIO > 0`: a standalone mechanical part
    pub fn is_mechanical(&self) -> bool {
        self.prio.is_some_and(|p| p > 0)
    }

    /// Declarations to instantiate (index 0 is the asset itself)
    pub fn children(&self) -> impl Iterator<Item = &SubModelDecl> {
        self.entries.iter().filter(|d| d.index > 0)
    }
}

/// Three-number property; absent means zero
fn vector(meta: &AssetMetadata, key: &str) -> Result<[f64; 3], String> {
    let Some(value) = meta.get(key) else {
        return Ok([0.0; 3]);
    };

    let items = value
        .as_sequence()
        .filter(|s| s.len() == 3)
        .ok_or_else(|| format!("{key} must be a list of three numbers"))?;

    let mut out = [0.0; 3];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item
            .as_f64()
            .ok_or_else(|| format!("{key} must be a list of three numbers"))?;
    }
    Ok(out)
}

/// Sub-model specs parsed so far in this run, keyed by asset path
#[derive(Debug, Default)]
pub struct SubModelCache {
    specs: HashMap<PathBuf, Rc<SubModelSpec>>,
}

impl SubModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spec for `entry`, reading its metadata on first use only. Parse
    /// warnings are reported once per asset.
    pub fn get_or_load(
        &mut self,
        entry: &LibraryEntry,
        source: &dyn MetadataSource,
        warnings: &mut Vec<ResolutionWarning>,
    ) -> Rc<SubModelSpec> {
        if let Some(spec) = self.specs.get(&entry.path) {
            return Rc::clone(spec);
        }

        let asset = entry.asset_key();
        let spec = match source.load(&entry.path) {
            Ok(meta) => {
                let (spec, parse_warnings) = SubModelSpec::parse(&asset, &meta);
                warnings.extend(parse_warnings);
                spec
            }
            Err(e) => {
                warnings.push(ResolutionWarning::MetadataUnreadable {
                    asset: asset.clone(),
                    message: e.to_string(),
                });
                SubModelSpec::default()
            }
        };

        debug!(asset = %asset, prio = ?spec.prio, submodels = spec.entries.len(), "loaded sub-model spec");
        let spec = Rc::new(spec);
        self.specs.insert(entry.path.clone(), Rc::clone(&spec));
        spec
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Expands sub-model trees below resolved main models
pub struct Expander<'a> {
    pub libraries: &'a LibraryIndex,
    pub metadata: &'a dyn MetadataSource,
    pub cache: &'a mut SubModelCache,
}

impl Expander<'_> {
    /// Append every sub-model instance below `parent` to `out`, depth first.
    ///
    /// `parent` must be a main model with spec `spec`. Each child is
    /// parented to the top-level designator and placed at
    /// `parent.transform ∘ relative`. A missing sub-model asset skips that
    /// sub-model only; a sub-model that closes a cycle is reported and not
    /// expanded.
    pub fn expand(
        &mut self,
        parent: &ResolvedComponent,
        spec: &SubModelSpec,
        out: &mut Vec<ResolvedComponent>,
        warnings: &mut Vec<ResolutionWarning>,
    ) {
        let mut chain = vec![parent.entry.path.clone()];
        self.expand_level(parent, spec, &mut chain, out, warnings);
    }

    fn expand_level(
        &mut self,
        parent: &ResolvedComponent,
        spec: &SubModelSpec,
        chain: &mut Vec<PathBuf>,
        out: &mut Vec<ResolvedComponent>,
        warnings: &mut Vec<ResolutionWarning>,
    ) {
        for decl in spec.children() {
            let Some(entry) = self.libraries.resolve(&decl.model, None) else {
                warnings.push(ResolutionWarning::SubModelMissing {
                    parent: parent.name.clone(),
                    model: decl.model.clone(),
                });
                continue;
            };

            if chain.contains(&entry.path) {
                let names: Vec<String> = chain
                    .iter()
                    .chain(std::iter::once(&entry.path))
                    .map(|p| {
                        p.file_stem()
                            .map(|s| s.to_string_lossy().to_string())
                            .unwrap_or_default()
                    })
                    .collect();
                warnings.push(ResolutionWarning::SubModelCycle {
                    parent: parent.name.clone(),
                    model: decl.model.clone(),
                    chain: names.join(" -> "),
                });
                continue;
            }

            let child_spec = self.cache.get_or_load(&entry, self.metadata, warnings);
            let visibility = if child_spec.is_mechanical() {
                Visibility::Mechanical
            } else {
                parent.visibility
            };

            let child = ResolvedComponent {
                name: format!("{}_{}_submodel", parent.name, decl.index),
                reference: parent.reference.clone(),
                footprint: decl.model.clone(),
                transform: parent.transform.compose(&decl.relative),
                parent: Some(parent.reference.clone()),
                visibility,
                side: parent.side,
                entry,
            };
            debug!(name = %child.name, asset = %child.entry.asset_key(), "expanded sub-model");
            out.push(child.clone());

            if child_spec.is_main_model() && child_spec.children().next().is_some() {
                chain.push(child.entry.path.clone());
                self.expand_level(&child, &child_spec, chain, out, warnings);
                chain.pop();
            }
        }
    }
}
