//! File formats the CLI reads and writes: local sheet CSVs and import records.

use std::path::Path;

use sheetdesk_recon::{CellValue, ImportRecord};

use crate::exit_codes::EXIT_INPUT;
use crate::CliError;

fn input_err(path: &Path, e: impl std::fmt::Display) -> CliError {
    CliError {
        code: EXIT_INPUT,
        message: format!("cannot read {}: {e}", path.display()),
        hint: None,
    }
}

// ── Local sheets ────────────────────────────────────────────────────

/// Parse a whole sheet from CSV text. Row 0 is the header; ragged rows are kept.
pub fn parse_sheet_csv(data: &str) -> Result<Vec<Vec<CellValue>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(CellValue::from).collect());
    }
    Ok(rows)
}

pub fn read_sheet_csv(path: &Path) -> Result<Vec<Vec<CellValue>>, CliError> {
    let data = std::fs::read_to_string(path).map_err(|e| input_err(path, e))?;
    let data = data.trim_start_matches('\u{feff}');
    parse_sheet_csv(data).map_err(|e| input_err(path, e))
}

/// Rectangular CSV: every row padded to the widest row.
pub fn render_sheet_csv(rows: &[Vec<CellValue>]) -> Result<String, CliError> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        let mut fields: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        fields.resize(width, String::new());
        writer.write_record(&fields).map_err(|e| CliError::io(e.to_string()))?;
    }
    let bytes = writer.into_inner().map_err(|e| CliError::io(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CliError::io(e.to_string()))
}

pub fn write_sheet_csv(path: &Path, rows: &[Vec<CellValue>]) -> Result<(), CliError> {
    let text = render_sheet_csv(rows)?;
    std::fs::write(path, text)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))
}

// ── Import records ──────────────────────────────────────────────────

/// CSV with a header row; each data row becomes one record. Blank fields
/// are omitted, so they never reach the skip counters.
pub fn parse_records_csv(data: &str) -> Result<Vec<ImportRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data.as_bytes());
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(ImportRecord::from_pairs(
            headers
                .iter()
                .zip(row.iter())
                .filter(|(_, v)| !v.trim().is_empty())
                .map(|(k, v)| (k.trim(), v)),
        ));
    }
    Ok(records)
}

/// JSON array of flat objects, keys in file order.
pub fn parse_records_json(data: &str) -> Result<Vec<ImportRecord>, serde_json::Error> {
    let objects: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(data)?;
    Ok(objects.into_iter().map(ImportRecord::from).collect())
}

/// Records from `.json` or CSV (anything else).
pub fn read_records(path: &Path) -> Result<Vec<ImportRecord>, CliError> {
    let data = std::fs::read_to_string(path).map_err(|e| input_err(path, e))?;
    let data = data.trim_start_matches('\u{feff}');
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        parse_records_json(data).map_err(|e| input_err(path, e))
    } else {
        parse_records_csv(data).map_err(|e| input_err(path, e))
    }
}
