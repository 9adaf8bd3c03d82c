//! BOM record - manufacturer data shared by one or more placements

use serde::{Deserialize, Serialize};

/// A normalized bill-of-materials row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomRecord {
    pub manufacturer: String,

    /// Manufacturer part number
    pub part_number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint: Option<String>,

    /// Reference designators covered by this row
    pub references: Vec<String>,
}

impl BomRecord {
    /// Raw text the marking slug is derived from: `<manufacturer>-<part number>`
    pub fn marking_source(&self) -> String {
        format!("{}-{}", self.manufacturer, self.part_number)
    }
}
