use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::address::CellAddress;

// ---------------------------------------------------------------------------
// Cell values
// ---------------------------------------------------------------------------

/// A single cell as the store hands it back. Identity is positional; the
/// value carries no row or column information.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum CellValue {
    Text(String),
    Number(f64),
    #[default]
    Empty,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Empty cells and whitespace-only text are both blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            // Whole numbers print without a trailing ".0" so that 42 and "42" compare equal.
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Empty => Ok(()),
        }
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Empty,
            serde_json::Value::String(s) if s.is_empty() => Self::Empty,
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number).unwrap_or(Self::Empty),
            serde_json::Value::Bool(b) => Self::Text(if b { "TRUE" } else { "FALSE" }.into()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s)
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Empty => serializer.serialize_none(),
        }
    }
}

/// Cell at `col` in a sparse row; missing trailing cells are empty.
pub fn cell_at(row: &[CellValue], col: usize) -> &CellValue {
    const EMPTY: &CellValue = &CellValue::Empty;
    row.get(col).unwrap_or(EMPTY)
}

// ---------------------------------------------------------------------------
// Column semantics
// ---------------------------------------------------------------------------

/// Semantic column type reported by the settings provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Number,
    /// One-time milestone date: writable only while empty.
    Date,
    Other(String),
}

impl ColumnType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "text" | "string" => Self::Text,
            "number" | "numeric" => Self::Number,
            "date" | "protected_date" | "milestone" => Self::Date,
            other => Self::Other(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One external edit to one cell, addressed by business identifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleCellEdit {
    pub sheet: String,
    pub identifier: String,
    pub column: String,
    pub value: CellValue,
    /// Overrides the configured identifier column for this call.
    #[serde(default)]
    pub identifier_column: Option<String>,
}

/// One external record: column name → value, in source order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "serde_json::Map<String, serde_json::Value>")]
pub struct ImportRecord {
    pub fields: Vec<(String, CellValue)>,
}

impl ImportRecord {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<CellValue>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for ImportRecord {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            fields: map.into_iter().map(|(k, v)| (k, CellValue::from(v))).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkImport {
    pub sheet: String,
    pub records: Vec<ImportRecord>,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a candidate cell was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    IdentifierProtected,
    #[serde(alias = "dateColumnsProtected")]
    DateProtected,
    InvalidDateFormat,
    NoChange,
    UnknownColumn,
    UnknownRow,
    ConcurrentChange,
}

impl SkipReason {
    pub const ALL: [SkipReason; 7] = [
        Self::IdentifierProtected,
        Self::DateProtected,
        Self::InvalidDateFormat,
        Self::NoChange,
        Self::UnknownColumn,
        Self::UnknownRow,
        Self::ConcurrentChange,
    ];
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdentifierProtected => write!(f, "identifier_protected"),
            Self::DateProtected => write!(f, "date_protected"),
            Self::InvalidDateFormat => write!(f, "invalid_date_format"),
            Self::NoChange => write!(f, "no_change"),
            Self::UnknownColumn => write!(f, "unknown_column"),
            Self::UnknownRow => write!(f, "unknown_row"),
            Self::ConcurrentChange => write!(f, "concurrent_change"),
        }
    }
}

/// Per-reason skip counters. Part of the API contract: callers use the
/// breakdown to tell "nothing changed" from "blocked" from "malformed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipReasons {
    pub identifier_protected: usize,
    #[serde(alias = "dateColumnsProtected")]
    pub date_protected: usize,
    pub invalid_date_format: usize,
    pub no_change: usize,
    pub unknown_column: usize,
    pub unknown_row: usize,
    pub concurrent_change: usize,
}

impl SkipReasons {
    pub fn record(&mut self, reason: SkipReason) {
        self.add(reason, 1);
    }

    pub fn add(&mut self, reason: SkipReason, n: usize) {
        let slot = match reason {
            SkipReason::IdentifierProtected => &mut self.identifier_protected,
            SkipReason::DateProtected => &mut self.date_protected,
            SkipReason::InvalidDateFormat => &mut self.invalid_date_format,
            SkipReason::NoChange => &mut self.no_change,
            SkipReason::UnknownColumn => &mut self.unknown_column,
            SkipReason::UnknownRow => &mut self.unknown_row,
            SkipReason::ConcurrentChange => &mut self.concurrent_change,
        };
        *slot += n;
    }

    pub fn get(&self, reason: SkipReason) -> usize {
        match reason {
            SkipReason::IdentifierProtected => self.identifier_protected,
            SkipReason::DateProtected => self.date_protected,
            SkipReason::InvalidDateFormat => self.invalid_date_format,
            SkipReason::NoChange => self.no_change,
            SkipReason::UnknownColumn => self.unknown_column,
            SkipReason::UnknownRow => self.unknown_row,
            SkipReason::ConcurrentChange => self.concurrent_change,
        }
    }

    /// Non-zero counters in declaration order.
    pub fn breakdown(&self) -> Vec<(SkipReason, usize)> {
        SkipReason::ALL
            .iter()
            .map(|&r| (r, self.get(r)))
            .filter(|(_, n)| *n > 0)
            .collect()
    }

    pub fn total(&self) -> usize {
        self.identifier_protected
            + self.date_protected
            + self.invalid_date_format
            + self.no_change
            + self.unknown_column
            + self.unknown_row
            + self.concurrent_change
    }
}

/// A queued write: one value for one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellWrite {
    pub address: CellAddress,
    pub value: CellValue,
}

/// A cell the call actually wrote, for caller-side highlighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenCell {
    pub identifier: String,
    pub column: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationOutcome {
    pub sheet: String,
    pub updated_count: usize,
    pub skipped_count: usize,
    pub skip_reasons: SkipReasons,
    pub written_cells: Vec<WrittenCell>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved_identifiers: Vec<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleCellOutcome {
    pub sheet: String,
    pub updated_count: usize,
    pub cell_address: String,
    pub old_value: CellValue,
    pub new_value: CellValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_display_without_fraction() {
        assert_eq!(CellValue::Number(45292.0).to_string(), "45292");
        assert_eq!(CellValue::Number(1.5).to_string(), "1.5");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn blank_detection() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::text("   ").is_blank());
        assert!(!CellValue::text(" x ").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }

    #[test]
    fn json_values_map_to_cells() {
        let v: CellValue = serde_json::from_str("null").unwrap();
        assert_eq!(v, CellValue::Empty);
        let v: CellValue = serde_json::from_str("\"\"").unwrap();
        assert_eq!(v, CellValue::Empty);
        let v: CellValue = serde_json::from_str("45292").unwrap();
        assert_eq!(v, CellValue::Number(45292.0));
        let v: CellValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, CellValue::text("TRUE"));
    }

    #[test]
    fn sparse_rows_read_as_empty() {
        let row = vec![CellValue::text("r1")];
        assert_eq!(cell_at(&row, 0), &CellValue::text("r1"));
        assert_eq!(cell_at(&row, 5), &CellValue::Empty);
    }

    #[test]
    fn column_type_parse() {
        assert_eq!(ColumnType::parse("Date"), ColumnType::Date);
        assert_eq!(ColumnType::parse(" milestone "), ColumnType::Date);
        assert_eq!(ColumnType::parse(""), ColumnType::Text);
        assert_eq!(ColumnType::parse("Number"), ColumnType::Number);
        assert_eq!(ColumnType::parse("dropdown"), ColumnType::Other("dropdown".into()));
    }

    #[test]
    fn skip_reasons_accept_legacy_date_key() {
        let parsed: SkipReasons =
            serde_json::from_str(r#"{"identifierProtected":0,"dateColumnsProtected":2,
            "invalidDateFormat":0,"noChange":0,"unknownColumn":0,"unknownRow":0,
            "concurrentChange":0}"#)
                .unwrap();
        assert_eq!(parsed.date_protected, 2);
        assert_eq!(parsed.total(), 2);
        assert_eq!(parsed.breakdown(), vec![(SkipReason::DateProtected, 2)]);
    }

    #[test]
    fn outcome_json_is_camel_case() {
        let outcome = ReconciliationOutcome {
            sheet: "Projects".into(),
            updated_count: 1,
            skipped_count: 0,
            skip_reasons: SkipReasons::default(),
            written_cells: vec![],
            unresolved_identifiers: vec![],
            dry_run: false,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["updatedCount"], 1);
        assert!(json["skipReasons"]["dateProtected"].is_number());
        assert!(json.get("unresolvedIdentifiers").is_none());
    }

    #[test]
    fn import_record_from_json_object() {
        let rec: ImportRecord =
            serde_json::from_str(r#"{"RowId": "r1", "Survey": "05-Jan-2024"}"#).unwrap();
        assert_eq!(rec.len(), 2);
        assert!(rec.fields.iter().any(|(k, v)| k == "Survey" && v == &CellValue::text("05-Jan-2024")));
    }
}
