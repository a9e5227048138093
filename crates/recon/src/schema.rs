//! Header-row schema discovery.

use std::collections::HashMap;

use crate::error::ReconError;
use crate::matcher::find_first;
use crate::model::CellValue;

/// Column layout derived from a sheet's header row. Rebuilt on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Header text per position (trimmed). Blank headers keep their slot.
    pub columns: Vec<String>,
    /// Exact header name → first position holding it.
    pub index: HashMap<String, usize>,
}

impl Schema {
    /// Build the schema from a full sheet read (header at row 0).
    pub fn discover(rows: &[Vec<CellValue>]) -> Result<Self, ReconError> {
        let header = rows
            .first()
            .ok_or_else(|| ReconError::Schema("sheet has no rows".into()))?;
        Self::from_header(header)
    }

    pub fn from_header(header: &[CellValue]) -> Result<Self, ReconError> {
        let columns: Vec<String> = header.iter().map(|c| c.to_string().trim().to_string()).collect();
        if columns.iter().all(|c| c.is_empty()) {
            return Err(ReconError::Schema("header row is empty".into()));
        }

        let mut index = HashMap::new();
        for (i, name) in columns.iter().enumerate() {
            if !name.is_empty() {
                index.entry(name.clone()).or_insert(i);
            }
        }

        Ok(Self { columns, index })
    }

    /// Resolve a column name through the match tiers.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        if let Some(&i) = self.index.get(name) {
            return Some(i);
        }
        find_first(&self.columns, name).map(|m| m.index)
    }

    pub fn column_name(&self, idx: usize) -> Option<&str> {
        self.columns.get(idx).map(String::as_str)
    }

    /// Non-blank header names, for diagnostics.
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().filter(|c| !c.is_empty()).cloned().collect()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    #[test]
    fn builds_index() {
        let schema = Schema::from_header(&header(&["RowId", "Name", "Survey"])).unwrap();
        assert_eq!(schema.columns, vec!["RowId", "Name", "Survey"]);
        assert_eq!(schema.index["Survey"], 2);
        assert_eq!(schema.width(), 3);
    }

    #[test]
    fn first_duplicate_wins() {
        let schema = Schema::from_header(&header(&["RowId", "Notes", "Notes"])).unwrap();
        assert_eq!(schema.index["Notes"], 1);
        assert_eq!(schema.resolve("notes"), Some(1));
    }

    #[test]
    fn blank_headers_keep_position() {
        let schema = Schema::from_header(&header(&["RowId", "", "Survey"])).unwrap();
        assert_eq!(schema.resolve("Survey"), Some(2));
        assert_eq!(schema.column_name(1), Some(""));
        assert_eq!(schema.names(), vec!["RowId", "Survey"]);
    }

    #[test]
    fn header_names_are_trimmed() {
        let schema = Schema::from_header(&header(&[" RowId ", "Survey Date"])).unwrap();
        assert_eq!(schema.resolve("RowId"), Some(0));
        assert_eq!(schema.resolve("survey  date"), Some(1));
    }

    #[test]
    fn unknown_column() {
        let schema = Schema::from_header(&header(&["RowId", "Name"])).unwrap();
        assert_eq!(schema.resolve("Install Date"), None);
    }

    #[test]
    fn empty_sheet_is_schema_error() {
        let err = Schema::discover(&[]).unwrap_err();
        assert!(matches!(err, ReconError::Schema(_)));
        assert!(err.to_string().contains("no rows"));
    }

    #[test]
    fn blank_header_is_schema_error() {
        let err = Schema::discover(&[header(&["", " "]), header(&["r1"])]).unwrap_err();
        assert!(err.to_string().contains("header row is empty"));
        let err = Schema::discover(&[vec![]]).unwrap_err();
        assert!(matches!(err, ReconError::Schema(_)));
    }
}
