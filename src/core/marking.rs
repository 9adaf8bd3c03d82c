//! Marking resolver: joins placements with BOM rows by designator

use std::collections::HashMap;
use tracing::debug;

use crate::core::error::ConfigError;
use crate::entities::{BomRecord, PlacementRecord};

/// Turn free text into a marking slug.
///
/// Non-ASCII text is transliterated first (`ü` -> `u`). Then lower case,
/// every run of characters outside `[a-z0-9]` collapsed to a single `-`,
/// no leading or trailing `-`.
pub fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for ch in ascii.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Designator -> marking slug, built from the BOM
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkingIndex {
    slugs: HashMap<String, String>,
}

impl MarkingIndex {
    /// Index every designator of every BOM row. A designator listed on
    /// several rows takes the slug of the last one.
    pub fn from_bom(rows: &[BomRecord]) -> Self {
        let mut slugs = HashMap::new();
        for row in rows {
            let slug = slugify(&row.marking_source());
            for reference in &row.references {
                slugs.insert(reference.clone(), slug.clone());
            }
        }
        Self { slugs }
    }

    pub fn get(&self, reference: &str) -> Option<&str> {
        self.slugs
            .get(reference)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }
}

/// A placement together with the marking it should be looked up with
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedPlacement {
    pub record: PlacementRecord,
    pub marking: Option<String>,
}

/// Annotate placements with marking slugs.
///
/// With markings disabled every placement is returned unmarked and the BOM
/// is ignored. With markings enabled a BOM table is mandatory; a placement
/// without a matching BOM row is simply left unmarked.
pub fn annotate(
    placements: Vec<PlacementRecord>,
    bom: Option<&[BomRecord]>,
    enabled: bool,
) -> Result<Vec<MarkedPlacement>, ConfigError> {
    if !enabled {
        return Ok(placements
            .into_iter()
            .map(|record| MarkedPlacement {
                record,
                marking: None,
            })
            .collect());
    }

    let bom = bom.ok_or(ConfigError::MarkingWithoutBom)?;
    let index = MarkingIndex::from_bom(bom);
    debug!(designators = index.len(), "built marking index");

    Ok(placements
        .into_iter()
        .map(|record| {
            let marking = index.get(&record.reference).map(|s| s.to_string());
            MarkedPlacement { record, marking }
        })
        .collect())
}
