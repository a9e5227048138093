//! Collaborator seams: the tabular store and the column-settings provider.
//!
//! The engine receives both per call and never caches what they return.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::address::{CellAddress, RangeSpec};
use crate::error::StoreError;
use crate::model::{CellValue, CellWrite, ColumnType};

/// Row-major cell storage addressed by sheet name and A1 ranges.
pub trait TabularStore {
    /// Read a range of `sheet` (unqualified, e.g. `A1:ZZ`). Rows are sparse.
    fn read_range(&self, sheet: &str, range: &str) -> Result<Vec<Vec<CellValue>>, StoreError>;

    fn write_cell(&self, sheet: &str, address: &CellAddress, value: &CellValue) -> Result<(), StoreError>;

    /// Submit all writes together. Returns the number of cells committed.
    fn write_batch(&self, sheet: &str, writes: &[CellWrite]) -> Result<usize, StoreError>;
}

impl<T: TabularStore + ?Sized> TabularStore for &T {
    fn read_range(&self, sheet: &str, range: &str) -> Result<Vec<Vec<CellValue>>, StoreError> {
        (**self).read_range(sheet, range)
    }

    fn write_cell(&self, sheet: &str, address: &CellAddress, value: &CellValue) -> Result<(), StoreError> {
        (**self).write_cell(sheet, address, value)
    }

    fn write_batch(&self, sheet: &str, writes: &[CellWrite]) -> Result<usize, StoreError> {
        (**self).write_batch(sheet, writes)
    }
}

/// Column name → semantic type for one sheet.
pub trait SettingsProvider {
    fn column_types(&self, sheet: &str) -> Result<HashMap<String, ColumnType>, StoreError>;
}

/// No settings at all: nothing is a protected date.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSettings;

impl SettingsProvider for NoSettings {
    fn column_types(&self, _sheet: &str) -> Result<HashMap<String, ColumnType>, StoreError> {
        Ok(HashMap::new())
    }
}

/// Fixed per-sheet column types.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    sheets: HashMap<String, HashMap<String, ColumnType>>,
}

impl StaticSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, sheet: &str, column: &str, kind: ColumnType) -> Self {
        self.sheets
            .entry(sheet.to_string())
            .or_default()
            .insert(column.to_string(), kind);
        self
    }
}

impl SettingsProvider for StaticSettings {
    fn column_types(&self, sheet: &str) -> Result<HashMap<String, ColumnType>, StoreError> {
        Ok(self.sheets.get(sheet).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    sheets: HashMap<String, Vec<Vec<CellValue>>>,
    batches: usize,
    cell_writes: usize,
    write_failure: Option<String>,
}

/// In-process store with the same sparse-read behaviour as the Sheets API:
/// trailing empty cells and trailing empty rows are not returned.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(self, name: &str, rows: Vec<Vec<CellValue>>) -> Self {
        self.insert_sheet(name, rows);
        self
    }

    pub fn insert_sheet(&self, name: &str, rows: Vec<Vec<CellValue>>) {
        self.state.lock().sheets.insert(name.to_string(), rows);
    }

    /// Full contents of a sheet, as stored.
    pub fn sheet(&self, name: &str) -> Option<Vec<Vec<CellValue>>> {
        self.state.lock().sheets.get(name).cloned()
    }

    pub fn cell(&self, sheet: &str, address: &CellAddress) -> CellValue {
        let state = self.state.lock();
        state
            .sheets
            .get(sheet)
            .and_then(|rows| rows.get(address.sheet_row_index()))
            .and_then(|row| row.get(address.col))
            .cloned()
            .unwrap_or_default()
    }

    /// Overwrite a cell directly, bypassing counters. Stands in for another writer.
    pub fn set_cell(&self, sheet: &str, address: &CellAddress, value: CellValue) {
        let mut state = self.state.lock();
        if let Some(rows) = state.sheets.get_mut(sheet) {
            put(rows, address, value);
        }
    }

    /// Make every subsequent write fail with `StoreError::Network(message)`.
    pub fn fail_writes(&self, message: impl Into<String>) {
        self.state.lock().write_failure = Some(message.into());
    }

    pub fn batch_count(&self) -> usize {
        self.state.lock().batches
    }

    pub fn cell_write_count(&self) -> usize {
        self.state.lock().cell_writes
    }
}

fn put(rows: &mut Vec<Vec<CellValue>>, address: &CellAddress, value: CellValue) {
    let r = address.sheet_row_index();
    if rows.len() <= r {
        rows.resize_with(r + 1, Vec::new);
    }
    let row = &mut rows[r];
    if row.len() <= address.col {
        row.resize_with(address.col + 1, CellValue::default);
    }
    row[address.col] = value;
}

impl TabularStore for MemoryStore {
    fn read_range(&self, sheet: &str, range: &str) -> Result<Vec<Vec<CellValue>>, StoreError> {
        let spec = RangeSpec::parse(range)
            .ok_or_else(|| StoreError::Rejected(format!("unable to parse range: {range}")))?;
        let state = self.state.lock();
        let rows = state
            .sheets
            .get(sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;

        let first = spec.start_row - 1;
        let last = spec.end_row.map(|r| r.min(rows.len())).unwrap_or(rows.len());
        let mut out: Vec<Vec<CellValue>> = rows
            .get(first..last.max(first))
            .unwrap_or(&[])
            .iter()
            .map(|row| {
                let mut cells: Vec<CellValue> = (spec.start_col..=spec.end_col)
                    .map(|c| row.get(c).cloned().unwrap_or_default())
                    .collect();
                while cells.last().is_some_and(|c| *c == CellValue::Empty) {
                    cells.pop();
                }
                cells
            })
            .collect();
        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    fn write_cell(&self, sheet: &str, address: &CellAddress, value: &CellValue) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if let Some(msg) = &state.write_failure {
            return Err(StoreError::Network(msg.clone()));
        }
        let rows = state
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        put(rows, address, value.clone());
        state.cell_writes += 1;
        Ok(())
    }

    fn write_batch(&self, sheet: &str, writes: &[CellWrite]) -> Result<usize, StoreError> {
        let mut state = self.state.lock();
        if let Some(msg) = &state.write_failure {
            return Err(StoreError::Network(msg.clone()));
        }
        let rows = state
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        for w in writes {
            put(rows, &w.address, w.value.clone());
        }
        state.batches += 1;
        state.cell_writes += writes.len();
        Ok(writes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    fn store() -> MemoryStore {
        MemoryStore::new().with_sheet(
            "Projects",
            vec![row(&["RowId", "Name", "Survey"]), row(&["r1", "Alice", ""]), row(&["", "", ""])],
        )
    }

    #[test]
    fn read_trims_trailing_empties() {
        let rows = store().read_range("Projects", "A1:ZZ").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], row(&["r1", "Alice"]));
    }

    #[test]
    fn read_sub_range() {
        let rows = store().read_range("Projects", "B1:C2").unwrap();
        assert_eq!(rows, vec![row(&["Name", "Survey"]), row(&["Alice"])]);
    }

    #[test]
    fn read_missing_sheet() {
        let err = store().read_range("Nope", "A1:ZZ").unwrap_err();
        assert!(matches!(err, StoreError::SheetNotFound(_)));
    }

    #[test]
    fn batch_write_grows_rows() {
        let s = store();
        let n = s
            .write_batch(
                "Projects",
                &[
                    CellWrite { address: CellAddress { row: 2, col: 2 }, value: CellValue::text("05-Jan-2024") },
                    CellWrite { address: CellAddress { row: 5, col: 30 }, value: CellValue::text("x") },
                ],
            )
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(s.batch_count(), 1);
        assert_eq!(s.cell("Projects", &CellAddress { row: 2, col: 2 }), CellValue::text("05-Jan-2024"));
        assert_eq!(s.cell("Projects", &CellAddress { row: 5, col: 30 }), CellValue::text("x"));
    }

    #[test]
    fn injected_failure() {
        let s = store();
        s.fail_writes("connection reset");
        let err = s.write_batch("Projects", &[]).unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert!(s
            .write_cell("Projects", &CellAddress { row: 2, col: 1 }, &CellValue::text("x"))
            .is_err());
        assert_eq!(s.cell("Projects", &CellAddress { row: 2, col: 1 }), CellValue::text("Alice"));
    }

    #[test]
    fn static_settings() {
        let settings = StaticSettings::new().with_column("Projects", "Survey", ColumnType::Date);
        assert_eq!(settings.column_types("Projects").unwrap()["Survey"], ColumnType::Date);
        assert!(settings.column_types("Other").unwrap().is_empty());
        assert!(NoSettings.column_types("Projects").unwrap().is_empty());
    }
}
