//! Reconciliation calls: read the sheet, diff, write, report.
//!
//! Every call re-reads the whole sheet and re-derives schema and protection;
//! nothing survives between calls. A call is consistent with the snapshot it
//! read, not isolated from concurrent writers (see `ConcurrencyMode`).

use std::collections::HashMap;

use serde::Serialize;

use crate::address::{column_letters, full_read_range, qualified_range, CellAddress};
use crate::config::{ConcurrencyMode, EngineConfig};
use crate::diff::{decide_cell, Decision};
use crate::error::ReconError;
use crate::locator::{identifier_values, locate_row};
use crate::matcher::find_first;
use crate::model::{
    cell_at, BulkImport, CellValue, CellWrite, ReconciliationOutcome, SingleCellEdit,
    SingleCellOutcome, SkipReason, SkipReasons, WrittenCell,
};
use crate::protection::{ColumnKind, ProtectionPolicy};
use crate::schema::Schema;
use crate::store::{SettingsProvider, TabularStore};

/// One full read of a sheet.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub schema: Schema,
    /// Data rows only; index 0 is store row 2.
    pub rows: Vec<Vec<CellValue>>,
}

pub fn load_snapshot(
    store: &dyn TabularStore,
    sheet: &str,
    config: &EngineConfig,
) -> Result<Snapshot, ReconError> {
    let mut rows = store.read_range(sheet, &full_read_range(&config.read_through_column))?;
    let schema = Schema::discover(&rows)
        .map_err(|e| ReconError::Schema(format!("sheet '{sheet}': {}", schema_detail(&e))))?;
    rows.remove(0);
    log::debug!("read '{sheet}': {} columns, {} data rows", schema.width(), rows.len());
    Ok(Snapshot { schema, rows })
}

fn schema_detail(err: &ReconError) -> String {
    match err {
        ReconError::Schema(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn resolve_identifier(schema: &Schema, sheet: &str, name: &str) -> Result<usize, ReconError> {
    schema.resolve(name).ok_or_else(|| {
        ReconError::Schema(format!(
            "sheet '{sheet}': identifier column '{name}' not in header ({})",
            schema.names().join(", ")
        ))
    })
}

/// Protection for `sheet`, with settings fetched now. A settings failure
/// degrades to "no protected dates from settings".
fn build_policy(
    settings: &dyn SettingsProvider,
    config: &EngineConfig,
    sheet: &str,
    identifier: &str,
) -> ProtectionPolicy {
    let types = settings.column_types(sheet).unwrap_or_else(|e| {
        log::warn!("column settings unavailable for '{sheet}': {e}");
        HashMap::new()
    });
    ProtectionPolicy::from_column_types(identifier, &types, config.protected_date_columns_for(sheet))
}

// ---------------------------------------------------------------------------
// Single cell edit
// ---------------------------------------------------------------------------

pub fn single_cell_edit(
    store: &dyn TabularStore,
    settings: &dyn SettingsProvider,
    config: &EngineConfig,
    edit: &SingleCellEdit,
) -> Result<SingleCellOutcome, ReconError> {
    let sheet = edit.sheet.as_str();
    let snapshot = load_snapshot(store, sheet, config)?;
    let schema = &snapshot.schema;

    let id_name = edit
        .identifier_column
        .as_deref()
        .unwrap_or_else(|| config.identifier_column_for(sheet));
    let id_col = resolve_identifier(schema, sheet, id_name)?;

    let col = schema.resolve(&edit.column).ok_or_else(|| ReconError::UnknownColumn {
        sheet: sheet.to_string(),
        column: edit.column.clone(),
        candidates: schema.names(),
    })?;

    let index = locate_row(id_col, &edit.identifier, &snapshot.rows)
        .index()
        .ok_or_else(|| ReconError::RowNotFound {
            sheet: sheet.to_string(),
            identifier: edit.identifier.clone(),
            candidates: identifier_values(id_col, &snapshot.rows),
        })?;

    let id_header = schema.column_name(id_col).unwrap_or(id_name);
    let column = schema.column_name(col).unwrap_or(&edit.column);
    let policy = build_policy(settings, config, sheet, id_header);

    let current = cell_at(&snapshot.rows[index], col).clone();
    let address = CellAddress::for_data_cell(index, col);
    let cell_address = qualified_range(sheet, &address.a1());

    match decide_cell(&policy, &config.dates, column, &current, &edit.value) {
        Decision::Skip(reason) => {
            log::info!("edit {cell_address} ({}={}) skipped: {reason}", id_header, edit.identifier);
            Ok(SingleCellOutcome {
                sheet: sheet.to_string(),
                updated_count: 0,
                cell_address,
                old_value: current,
                new_value: edit.value.clone(),
                skip_reason: Some(reason),
                dry_run: config.dry_run,
            })
        }
        Decision::Write(value) => {
            if !config.dry_run {
                store.write_cell(sheet, &address, &value)?;
            }
            log::info!("edit {cell_address}: '{current}' → '{value}'");
            Ok(SingleCellOutcome {
                sheet: sheet.to_string(),
                updated_count: 1,
                cell_address,
                old_value: current,
                new_value: value,
                skip_reason: None,
                dry_run: config.dry_run,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Bulk import
// ---------------------------------------------------------------------------

/// A write queued by the diff, with what it was computed against.
struct PlannedWrite {
    address: CellAddress,
    value: CellValue,
    /// Row identifier at read time.
    identifier: String,
    column: String,
    /// Cell value at read time.
    basis: CellValue,
}

pub fn bulk_import(
    store: &dyn TabularStore,
    settings: &dyn SettingsProvider,
    config: &EngineConfig,
    import: &BulkImport,
) -> Result<ReconciliationOutcome, ReconError> {
    let sheet = import.sheet.as_str();
    let snapshot = load_snapshot(store, sheet, config)?;
    let schema = &snapshot.schema;

    let id_name = config.identifier_column_for(sheet);
    let id_col = resolve_identifier(schema, sheet, id_name)?;
    let id_header = schema.column_name(id_col).unwrap_or(id_name).to_string();
    let policy = build_policy(settings, config, sheet, &id_header);

    // Later records see earlier records' writes.
    let mut working = snapshot.rows.clone();
    let mut skips = SkipReasons::default();
    let mut planned: Vec<PlannedWrite> = Vec::new();
    let mut planned_at: HashMap<CellAddress, usize> = HashMap::new();
    let mut unresolved = Vec::new();

    for (n, record) in import.records.iter().enumerate() {
        let id_field = find_first(record.fields.iter().map(|(k, _)| k), &id_header).map(|m| m.index);
        let id_value = id_field.map(|i| record.fields[i].1.to_string());

        let row_index = id_value
            .as_deref()
            .and_then(|v| locate_row(id_col, v, &working).index());
        let Some(row_index) = row_index else {
            skips.add(SkipReason::UnknownRow, record.len());
            match id_value {
                Some(v) if !v.trim().is_empty() => {
                    log::debug!("record {}: no row for {id_header}='{v}'", n + 1);
                    unresolved.push(v);
                }
                _ => log::warn!("record {}: no {id_header} value", n + 1),
            }
            continue;
        };

        let row_identifier = cell_at(&working[row_index], id_col).to_string();

        for (i, (name, candidate)) in record.fields.iter().enumerate() {
            if Some(i) == id_field {
                continue;
            }
            let Some(col) = schema.resolve(name) else {
                skips.record(SkipReason::UnknownColumn);
                continue;
            };
            let column = schema.column_name(col).unwrap_or(name);
            let current = cell_at(&working[row_index], col);

            match decide_cell(&policy, &config.dates, column, current, candidate) {
                Decision::Skip(reason) => {
                    log::debug!("{row_identifier}/{column}: skip {reason}");
                    skips.record(reason);
                }
                Decision::Write(value) => {
                    let address = CellAddress::for_data_cell(row_index, col);
                    set_working(&mut working[row_index], col, value.clone());
                    match planned_at.get(&address) {
                        Some(&slot) => planned[slot].value = value,
                        None => {
                            planned_at.insert(address, planned.len());
                            planned.push(PlannedWrite {
                                address,
                                value,
                                identifier: row_identifier.clone(),
                                column: column.to_string(),
                                basis: cell_at(&snapshot.rows[row_index], col).clone(),
                            });
                        }
                    }
                }
            }
        }
    }

    if config.concurrency == ConcurrencyMode::VerifyBeforeWrite && !config.dry_run && !planned.is_empty() {
        let fresh = load_snapshot(store, sheet, config)?;
        planned.retain(|w| {
            let intact = basis_intact(&fresh, id_col, w);
            if !intact {
                log::warn!("{}/{}: changed since read, not written", w.identifier, w.column);
                skips.record(SkipReason::ConcurrentChange);
            }
            intact
        });
    }

    if !planned.is_empty() && !config.dry_run {
        let writes: Vec<CellWrite> = planned
            .iter()
            .map(|w| CellWrite { address: w.address, value: w.value.clone() })
            .collect();
        let committed = store.write_batch(sheet, &writes)?;
        if committed != writes.len() {
            log::warn!("'{sheet}': queued {} cells, store reports {committed}", writes.len());
        }
    }

    let written_cells: Vec<WrittenCell> = planned
        .iter()
        .map(|w| WrittenCell {
            identifier: w.identifier.clone(),
            column: w.column.clone(),
            address: qualified_range(sheet, &w.address.a1()),
        })
        .collect();

    log::info!(
        "import '{sheet}': {} records, {} updated, {} skipped{}",
        import.records.len(),
        written_cells.len(),
        skips.total(),
        if config.dry_run { " (dry run)" } else { "" }
    );

    Ok(ReconciliationOutcome {
        sheet: sheet.to_string(),
        updated_count: written_cells.len(),
        skipped_count: skips.total(),
        skip_reasons: skips,
        written_cells,
        unresolved_identifiers: unresolved,
        dry_run: config.dry_run,
    })
}

fn set_working(row: &mut Vec<CellValue>, col: usize, value: CellValue) {
    if row.len() <= col {
        row.resize_with(col + 1, CellValue::default);
    }
    row[col] = value;
}

/// The row still carries the same identifier and the cell still holds the
/// value the diff was computed against.
fn basis_intact(fresh: &Snapshot, id_col: usize, w: &PlannedWrite) -> bool {
    let Some(row) = fresh.rows.get(w.address.sheet_row_index() - 1) else {
        return false;
    };
    cell_at(row, id_col).to_string() == w.identifier
        && cell_at(row, w.address.col).to_string() == w.basis.to_string()
}

// ---------------------------------------------------------------------------
// Schema inspection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescription {
    pub name: String,
    pub letter: String,
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetDescription {
    pub sheet: String,
    pub identifier_column: String,
    pub data_rows: usize,
    pub columns: Vec<ColumnDescription>,
}

/// Header layout and per-column protection, as the engine would see it now.
pub fn describe_sheet(
    store: &dyn TabularStore,
    settings: &dyn SettingsProvider,
    config: &EngineConfig,
    sheet: &str,
) -> Result<SheetDescription, ReconError> {
    let snapshot = load_snapshot(store, sheet, config)?;
    let schema = &snapshot.schema;
    let id_name = config.identifier_column_for(sheet);
    let id_col = resolve_identifier(schema, sheet, id_name)?;
    let id_header = schema.column_name(id_col).unwrap_or(id_name).to_string();
    let policy = build_policy(settings, config, sheet, &id_header);

    let columns = schema
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| !name.is_empty())
        .map(|(i, name)| ColumnDescription {
            name: name.clone(),
            letter: column_letters(i),
            kind: match policy.kind(name) {
                ColumnKind::Identifier => "identifier",
                ColumnKind::ProtectedDate => "protected_date",
                ColumnKind::Ordinary => "ordinary",
            },
        })
        .collect();

    Ok(SheetDescription {
        sheet: sheet.to_string(),
        identifier_column: id_header,
        data_rows: snapshot.rows.len(),
        columns,
    })
}
