//! Column settings read from a sheet in the same spreadsheet.
//!
//! Layout: a header row naming `Sheet`, `Column` and `Type` (any order,
//! tiered matching), then one row per configured column. Rows for other
//! sheets are ignored; rows with a blank column name are skipped.

use std::collections::HashMap;

use crate::address::full_read_range;
use crate::error::StoreError;
use crate::matcher::MatchTier;
use crate::model::{cell_at, ColumnType};
use crate::schema::Schema;
use crate::store::{SettingsProvider, TabularStore};

pub struct SheetSettingsProvider<S> {
    store: S,
    settings_sheet: String,
}

impl<S: TabularStore> SheetSettingsProvider<S> {
    pub fn new(store: S, settings_sheet: impl Into<String>) -> Self {
        Self {
            store,
            settings_sheet: settings_sheet.into(),
        }
    }
}

impl<S: TabularStore> SettingsProvider for SheetSettingsProvider<S> {
    fn column_types(&self, sheet: &str) -> Result<HashMap<String, ColumnType>, StoreError> {
        let rows = self.store.read_range(&self.settings_sheet, &full_read_range("C"))?;
        let schema = match Schema::discover(&rows) {
            Ok(schema) => schema,
            Err(e) => {
                log::warn!(
                    "settings sheet '{}' has no usable header ({e}); ignoring it",
                    self.settings_sheet
                );
                return Ok(HashMap::new());
            }
        };
        let (Some(sheet_col), Some(column_col), Some(type_col)) = (
            schema.resolve("Sheet"),
            schema.resolve("Column"),
            schema.resolve("Type"),
        ) else {
            log::warn!(
                "settings sheet '{}' lacks Sheet/Column/Type headers; ignoring it",
                self.settings_sheet
            );
            return Ok(HashMap::new());
        };

        let mut types = HashMap::new();
        for row in rows.iter().skip(1) {
            let row_sheet = cell_at(row, sheet_col).to_string();
            if !MatchTier::Normalized.matches(&row_sheet, sheet) {
                continue;
            }
            let column = cell_at(row, column_col).to_string().trim().to_string();
            if column.is_empty() {
                continue;
            }
            let kind = ColumnType::parse(&cell_at(row, type_col).to_string());
            types.entry(column).or_insert(kind);
        }
        Ok(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;
    use crate::store::MemoryStore;

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    #[test]
    fn reads_types_for_one_sheet() {
        let store = MemoryStore::new().with_sheet(
            "Settings",
            vec![
                row(&["Sheet", "Column", "Type"]),
                row(&["Projects", "Survey", "date"]),
                row(&["projects ", "Name", "text"]),
                row(&["Inventory", "Received", "date"]),
                row(&["Projects", "", "date"]),
                row(&["Projects", "Survey", "text"]),
            ],
        );
        let provider = SheetSettingsProvider::new(&store, "Settings");
        let types = provider.column_types("Projects").unwrap();
        assert_eq!(types.len(), 2);
        assert_eq!(types["Survey"], ColumnType::Date);
        assert_eq!(types["Name"], ColumnType::Text);
    }

    #[test]
    fn header_order_is_free() {
        let store = MemoryStore::new().with_sheet(
            "Settings",
            vec![row(&["type", "sheet", "column"]), row(&["Date", "Projects", "Install"])],
        );
        let types = SheetSettingsProvider::new(&store, "Settings")
            .column_types("Projects")
            .unwrap();
        assert_eq!(types["Install"], ColumnType::Date);
    }

    #[test]
    fn missing_headers_degrade_to_empty() {
        let store = MemoryStore::new().with_sheet("Settings", vec![row(&["Foo", "Bar"])]);
        let types = SheetSettingsProvider::new(&store, "Settings")
            .column_types("Projects")
            .unwrap();
        assert!(types.is_empty());
    }

    #[test]
    fn blank_settings_sheet_degrades_to_empty() {
        for rows in [vec![], vec![row(&["", " "])]] {
            let store = MemoryStore::new().with_sheet("Settings", rows);
            let types = SheetSettingsProvider::new(&store, "Settings")
                .column_types("Projects")
                .unwrap();
            assert!(types.is_empty());
        }
    }

    #[test]
    fn missing_settings_sheet_is_an_error() {
        let store = MemoryStore::new();
        let err = SheetSettingsProvider::new(&store, "Settings")
            .column_types("Projects")
            .unwrap_err();
        assert!(matches!(err, StoreError::SheetNotFound(_)));
    }
}
