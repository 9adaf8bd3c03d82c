//! Tabular normalizer
//!
//! Maps arbitrary input column names onto the canonical fields of the three
//! record kinds (placement, BOM, override). Header names are data, not code:
//! every canonical field has an ordered alias list, and the first alias found
//! in the header row wins. The built-in aliases cover the common EDA exports
//! and can be extended per project through the `ALIASES` config section.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::csvtable::{RawRow, RawTable};
use crate::core::error::SchemaError;
use crate::entities::{BomRecord, OverrideRecord, PlacementRecord, Side, SideOverride};

/// The three kinds of input table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Placement,
    Bom,
    Override,
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableKind::Placement => write!(f, "placement"),
            TableKind::Bom => write!(f, "bom"),
            TableKind::Override => write!(f, "override"),
        }
    }
}

/// Canonical field names shared by all record kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Reference,
    Value,
    Footprint,
    PosX,
    PosY,
    Rotation,
    Side,
    Manufacturer,
    PartNumber,
    Override,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Reference => "reference",
            Field::Value => "value",
            Field::Footprint => "footprint",
            Field::PosX => "pos_x",
            Field::PosY => "pos_y",
            Field::Rotation => "rotation",
            Field::Side => "side",
            Field::Manufacturer => "manufacturer",
            Field::PartNumber => "part_number",
            Field::Override => "override",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields a table of the given kind must provide a column for
pub fn required_fields(kind: TableKind) -> &'static [Field] {
    match kind {
        TableKind::Placement => &[
            Field::Reference,
            Field::Footprint,
            Field::PosX,
            Field::PosY,
            Field::Rotation,
            Field::Side,
        ],
        TableKind::Bom => &[Field::Reference, Field::Manufacturer, Field::PartNumber],
        TableKind::Override => &[Field::Footprint],
    }
}

/// Fields read when present but allowed to be missing from the header
pub fn optional_fields(kind: TableKind) -> &'static [Field] {
    match kind {
        TableKind::Placement => &[Field::Value],
        TableKind::Bom => &[Field::Footprint],
        TableKind::Override => &[
            Field::Reference,
            Field::Value,
            Field::PosX,
            Field::PosY,
            Field::Rotation,
            Field::Side,
            Field::Override,
        ],
    }
}

/// Per-kind, per-field alias overrides as written in the config file
pub type AliasOverrides = BTreeMap<TableKind, BTreeMap<Field, Vec<String>>>;

/// Ordered header aliases for every canonical field of every table kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasTable {
    kinds: BTreeMap<TableKind, BTreeMap<Field, Vec<String>>>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AliasTable {
    /// Aliases matching KiCad, Altium and generic pick-and-place exports
    pub fn builtin() -> Self {
        fn list(names: &[&str]) -> Vec<String> {
            names.iter().map(|n| n.to_string()).collect()
        }

        let placement = BTreeMap::from([
            (Field::Reference, list(&["Ref", "Designator", "Reference"])),
            (Field::Value, list(&["Val", "Value", "Comment"])),
            (Field::Footprint, list(&["Package", "Footprint"])),
            (Field::PosX, list(&["PosX", "X", "Mid X", "Center-X(mm)"])),
            (Field::PosY, list(&["PosY", "Y", "Mid Y", "Center-Y(mm)"])),
            (Field::Rotation, list(&["Rot", "Rotation"])),
            (Field::Side, list(&["Side", "Layer"])),
        ]);

        let bom = BTreeMap::from([
            (
                Field::Reference,
                list(&["Reference", "References", "Designator", "Ref"]),
            ),
            (Field::Manufacturer, list(&["Manufacturer", "Mfr"])),
            (
                Field::PartNumber,
                list(&["MPN", "Manufacturer Part Number", "Part Number", "Mfr. #"]),
            ),
            (Field::Footprint, list(&["Footprint", "Package"])),
        ]);

        let mut overrides = placement.clone();
        overrides.insert(Field::Override, list(&["Override"]));

        Self {
            kinds: BTreeMap::from([
                (TableKind::Placement, placement),
                (TableKind::Bom, bom),
                (TableKind::Override, overrides),
            ]),
        }
    }

    /// Replace the alias lists named in `overrides`, keeping every other
    /// field at its current aliases
    pub fn with_overrides(mut self, overrides: &AliasOverrides) -> Self {
        for (kind, fields) in overrides {
            let entry = self.kinds.entry(*kind).or_default();
            for (field, aliases) in fields {
                entry.insert(*field, aliases.clone());
            }
        }
        self
    }

    pub fn aliases(&self, kind: TableKind, field: Field) -> &[String] {
        self.kinds
            .get(&kind)
            .and_then(|fields| fields.get(&field))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Header names to put in a CSV template for the given kind
    pub fn template_headers(&self, kind: TableKind) -> Vec<String> {
        required_fields(kind)
            .iter()
            .chain(optional_fields(kind))
            .filter_map(|f| self.aliases(kind, *f).first().cloned())
            .collect()
    }
}

/// Canonical field -> column index for one concrete table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnMap {
    columns: BTreeMap<Field, usize>,
}

impl ColumnMap {
    /// Resolve every known field of `kind` against the table's header row.
    ///
    /// Fails if a required field matches none of its aliases.
    pub fn resolve(
        table: &RawTable,
        kind: TableKind,
        aliases: &AliasTable,
    ) -> Result<Self, SchemaError> {
        let mut columns = BTreeMap::new();

        for field in required_fields(kind) {
            let names = aliases.aliases(kind, *field);
            match names.iter().find_map(|n| table.column(n)) {
                Some(idx) => {
                    columns.insert(*field, idx);
                }
                None => {
                    return Err(SchemaError::MissingColumn {
                        kind,
                        table: table.name.clone(),
                        field: *field,
                        tried: names.join(", "),
                    });
                }
            }
        }

        for field in optional_fields(kind) {
            if let Some(idx) = aliases
                .aliases(kind, *field)
                .iter()
                .find_map(|n| table.column(n))
            {
                columns.insert(*field, idx);
            }
        }

        debug!(table = %table.name, %kind, ?columns, "resolved columns");
        Ok(Self { columns })
    }

    /// Trimmed cell for `field`, or `None` when the column or cell is absent
    pub fn cell<'a>(&self, row: &'a RawRow, field: Field) -> Option<&'a str> {
        self.columns.get(&field).and_then(|&idx| row.cell(idx))
    }
}

/// Result of normalizing one table: accepted records plus rejected rows
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub rejected: Vec<SchemaError>,
}

impl<T> Default for Normalized<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> Normalized<T> {
    /// Append another table's results
    pub fn extend(&mut self, other: Normalized<T>) {
        self.records.extend(other.records);
        self.rejected.extend(other.rejected);
    }
}

/// Cell accessors for one row, producing row-scoped schema errors
struct RowReader<'a> {
    table: &'a str,
    row: &'a RawRow,
    columns: &'a ColumnMap,
}

impl<'a> RowReader<'a> {
    /// Non-empty cell text
    fn text(&self, field: Field) -> Option<&'a str> {
        self.columns.cell(self.row, field).filter(|s| !s.is_empty())
    }

    fn required_text(&self, field: Field) -> Result<&'a str, SchemaError> {
        self.text(field).ok_or_else(|| SchemaError::EmptyField {
            table: self.table.to_string(),
            row: self.row.line,
            field,
        })
    }

    /// Numeric cell; `None` when the cell is empty or the column absent
    fn number(&self, field: Field) -> Result<Option<f64>, SchemaError> {
        match self.text(field) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| SchemaError::InvalidNumber {
                    table: self.table.to_string(),
                    row: self.row.line,
                    field,
                    value: raw.to_string(),
                }),
        }
    }

    fn side(&self, raw: &str) -> Result<Side, SchemaError> {
        Side::from_vocabulary(raw).ok_or_else(|| SchemaError::InvalidSide {
            table: self.table.to_string(),
            row: self.row.line,
            value: raw.to_string(),
        })
    }

    /// Whitespace-separated designator list; commas reject the row
    fn references(&self) -> Result<Vec<String>, SchemaError> {
        let raw = self.text(Field::Reference).unwrap_or("");
        if raw.contains(',') {
            return Err(SchemaError::CommaInReferences {
                table: self.table.to_string(),
                row: self.row.line,
                value: raw.to_string(),
            });
        }
        Ok(raw.split_whitespace().map(|s| s.to_string()).collect())
    }
}

fn normalize_rows<T>(
    table: &RawTable,
    kind: TableKind,
    aliases: &AliasTable,
    parse: impl Fn(&RowReader<'_>) -> Result<T, SchemaError>,
) -> Result<Normalized<T>, SchemaError> {
    let columns = ColumnMap::resolve(table, kind, aliases)?;
    let mut out = Normalized {
        records: Vec::with_capacity(table.rows.len()),
        rejected: table.malformed.clone(),
    };

    for row in &table.rows {
        // Blank lines carry no data
        if row.cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let reader = RowReader {
            table: &table.name,
            row,
            columns: &columns,
        };
        match parse(&reader) {
            Ok(record) => out.records.push(record),
            Err(e) if !e.is_row_scoped() => return Err(e),
            Err(e) => {
                debug!(error = %e, "rejected row");
                out.rejected.push(e);
            }
        }
    }

    Ok(out)
}

/// Normalize a pick-and-place table.
///
/// Empty numeric cells read as `0.0`, matching what EDA tools write for
/// components at the origin.
pub fn normalize_placements(
    table: &RawTable,
    aliases: &AliasTable,
) -> Result<Normalized<PlacementRecord>, SchemaError> {
    normalize_rows(table, TableKind::Placement, aliases, |r| {
        let reference = r.required_text(Field::Reference)?.to_string();
        let footprint = r.required_text(Field::Footprint)?.to_string();
        let x = r.number(Field::PosX)?.unwrap_or(0.0);
        let y = r.number(Field::PosY)?.unwrap_or(0.0);
        let rotation = r.number(Field::Rotation)?.unwrap_or(0.0);
        let side = r.side(r.columns.cell(r.row, Field::Side).unwrap_or(""))?;

        Ok(PlacementRecord {
            reference,
            value: r.text(Field::Value).unwrap_or("").to_string(),
            footprint,
            x,
            y,
            rotation,
            side,
        })
    })
}

/// Normalize a BOM table; each row may cover several designators
pub fn normalize_bom(
    table: &RawTable,
    aliases: &AliasTable,
) -> Result<Normalized<BomRecord>, SchemaError> {
    normalize_rows(table, TableKind::Bom, aliases, |r| {
        let references = r.references()?;
        if references.is_empty() {
            return Err(SchemaError::EmptyField {
                table: r.table.to_string(),
                row: r.row.line,
                field: Field::Reference,
            });
        }

        Ok(BomRecord {
            manufacturer: r.text(Field::Manufacturer).unwrap_or("").to_string(),
            part_number: r.text(Field::PartNumber).unwrap_or("").to_string(),
            footprint: r.text(Field::Footprint).map(|s| s.to_string()),
            references,
        })
    })
}

/// Normalize an override table.
///
/// Every empty cell means "no change". A row must name designators, a
/// footprint, or both.
pub fn normalize_overrides(
    table: &RawTable,
    aliases: &AliasTable,
) -> Result<Normalized<OverrideRecord>, SchemaError> {
    normalize_rows(table, TableKind::Override, aliases, |r| {
        let references = r.references()?;
        let footprint = r.text(Field::Footprint).map(|s| s.to_string());
        if references.is_empty() && footprint.is_none() {
            return Err(SchemaError::EmptyField {
                table: r.table.to_string(),
                row: r.row.line,
                field: Field::Footprint,
            });
        }

        let side = match r.text(Field::Side) {
            None => None,
            Some(raw) if raw.eq_ignore_ascii_case("flip") => Some(SideOverride::Flip),
            Some(raw) => Some(SideOverride::Set(r.side(raw)?)),
        };

        Ok(OverrideRecord {
            row: r.row.line,
            references,
            footprint,
            replacement: r.text(Field::Override).map(|s| s.to_string()),
            dx: r.number(Field::PosX)?,
            dy: r.number(Field::PosY)?,
            drotation: r.number(Field::Rotation)?,
            side,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> RawTable {
        RawTable::from_text("test.csv", text).unwrap()
    }

    #[test]
    fn test_placement_kicad_headers() {
        let t = table(
            "Ref,Val,Package,PosX,PosY,Rot,Side\n\
             R1,10k,0603,10.0,5.0,90,top\n\
             C1,100n,0402,-3.5,2,0,bottom\n",
        );
        let out = normalize_placements(&t, &AliasTable::builtin()).unwrap();
        assert!(out.rejected.is_empty());
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].reference, "R1");
        assert_eq!(out.records[0].footprint, "0603");
        assert_eq!(out.records[0].rotation, 90.0);
        assert_eq!(out.records[1].side, Side::Bottom);
        assert_eq!(out.records[1].x, -3.5);
    }

    #[test]
    fn test_first_alias_in_order_wins() {
        // Both PosX and X present: PosX is listed first
        let t = table("Ref,Package,X,PosX,PosY,Rot,Side\nR1,0603,1.0,2.0,3,0,T\n");
        let out = normalize_placements(&t, &AliasTable::builtin()).unwrap();
        assert_eq!(out.records[0].x, 2.0);
    }

    #[test]
    fn test_missing_required_column_aborts_table() {
        let t = table("Ref,Package,PosX,PosY,Side\nR1,0603,1,2,top\n");
        let err = normalize_placements(&t, &AliasTable::builtin()).unwrap_err();
        match err {
            SchemaError::MissingColumn { field, kind, .. } => {
                assert_eq!(field, Field::Rotation);
                assert_eq!(kind, TableKind::Placement);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_side_vocabulary_accepts_and_rejects() {
        let accepted = ["T", "top", "Top", "TopLayer", "B", "bottom", "Bottom", "BottomLayer"];
        for side in accepted {
            let t = table(&format!("Ref,Package,PosX,PosY,Rot,Side\nR1,0603,1,2,0,{side}\n"));
            let out = normalize_placements(&t, &AliasTable::builtin()).unwrap();
            assert_eq!(out.records.len(), 1, "side {side} should be accepted");
        }

        for side in ["front", "TOP", "1", ""] {
            let t = table(&format!("Ref,Package,PosX,PosY,Rot,Side\nR1,0603,1,2,0,{side}\n"));
            let out = normalize_placements(&t, &AliasTable::builtin()).unwrap();
            assert!(out.records.is_empty(), "side {side:?} should be rejected");
            assert!(matches!(out.rejected[0], SchemaError::InvalidSide { .. }));
        }
    }

    #[test]
    fn test_bad_number_skips_only_that_row() {
        let t = table(
            "Ref,Package,PosX,PosY,Rot,Side\n\
             R1,0603,abc,2,0,top\n\
             R2,0603,1,2,0,top\n",
        );
        let out = normalize_placements(&t, &AliasTable::builtin()).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].reference, "R2");
        match &out.rejected[0] {
            SchemaError::InvalidNumber { row, field, value, .. } => {
                assert_eq!(*row, 2);
                assert_eq!(*field, Field::PosX);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_numeric_reads_as_zero() {
        let t = table("Ref,Package,PosX,PosY,Rot,Side\nR1,0603,,2,,top\n");
        let out = normalize_placements(&t, &AliasTable::builtin()).unwrap();
        assert_eq!(out.records[0].x, 0.0);
        assert_eq!(out.records[0].rotation, 0.0);
    }

    #[test]
    fn test_bom_splits_on_whitespace_and_rejects_commas() {
        let t = table(
            "Reference,Manufacturer,MPN\n\
             \"R1 R2  R3\",Yageo,RC0603FR-0710KL\n\
             \"C1,C2\",Murata,GRM155\n",
        );
        let out = normalize_bom(&t, &AliasTable::builtin()).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].references, vec!["R1", "R2", "R3"]);
        assert!(matches!(
            out.rejected[0],
            SchemaError::CommaInReferences { row: 3, .. }
        ));
    }

    #[test]
    fn test_bom_unquoted_comma_rejects_row() {
        let t = table(
            "Reference,Manufacturer,MPN\n\
             R1,R2,Yageo,RC0603\n\
             C1,Murata,GRM155\n",
        );
        let out = normalize_bom(&t, &AliasTable::builtin()).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].references, vec!["C1"]);
        assert_eq!(out.rejected.len(), 1);
        assert!(matches!(out.rejected[0], SchemaError::Malformed { row: 2, .. }));
    }

    #[test]
    fn test_override_empty_cells_mean_no_change() {
        let t = table(
            "Ref,Package,PosX,PosY,Rot,Side,Override\n\
             ,0603,,,,flip,\n\
             R5,,1.5,,-90,,0603_alt\n",
        );
        let out = normalize_overrides(&t, &AliasTable::builtin()).unwrap();
        assert!(out.rejected.is_empty());

        let wide = &out.records[0];
        assert!(!wide.is_scoped());
        assert_eq!(wide.footprint.as_deref(), Some("0603"));
        assert_eq!(wide.side, Some(SideOverride::Flip));
        assert_eq!(wide.dx, None);

        let scoped = &out.records[1];
        assert_eq!(scoped.references, vec!["R5"]);
        assert_eq!(scoped.dx, Some(1.5));
        assert_eq!(scoped.dy, None);
        assert_eq!(scoped.drotation, Some(-90.0));
        assert_eq!(scoped.replacement.as_deref(), Some("0603_alt"));
    }

    #[test]
    fn test_override_row_needs_a_target() {
        let t = table("Ref,Package,PosX\n,,1.0\n");
        let out = normalize_overrides(&t, &AliasTable::builtin()).unwrap();
        assert!(out.records.is_empty());
        assert!(matches!(out.rejected[0], SchemaError::EmptyField { .. }));
    }

    #[test]
    fn test_alias_overrides_from_config() {
        let overrides: AliasOverrides = BTreeMap::from([(
            TableKind::Placement,
            BTreeMap::from([(Field::PosX, vec!["Center X".to_string()])]),
        )]);
        let aliases = AliasTable::builtin().with_overrides(&overrides);
        assert_eq!(aliases.aliases(TableKind::Placement, Field::PosX), ["Center X"]);
        // Untouched fields keep the built-in aliases
        assert_eq!(aliases.aliases(TableKind::Placement, Field::PosY)[0], "PosY");

        let t = table("Ref,Package,Center X,PosY,Rot,Side\nR1,0603,4.5,2,0,top\n");
        let out = normalize_placements(&t, &aliases).unwrap();
        assert_eq!(out.records[0].x, 4.5);
    }

    #[test]
    fn test_template_headers() {
        let headers = AliasTable::builtin().template_headers(TableKind::Placement);
        assert_eq!(headers, vec!["Ref", "Package", "PosX", "PosY", "Rot", "Side", "Val"]);
    }
}
