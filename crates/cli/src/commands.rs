//! `sdesk edit | import | schema | config`: one reconciliation call each.

use std::path::{Path, PathBuf};

use serde::Serialize;

use sheetdesk_config::Settings;
use sheetdesk_recon::{
    bulk_import, describe_sheet, single_cell_edit, BulkImport, CellValue, ConcurrencyMode,
    EngineConfig, ReconciliationOutcome, SingleCellEdit, SingleCellOutcome,
};

use crate::backend::Backend;
use crate::input::read_records;
use crate::{CliError, ConfigCommands, GlobalArgs};

pub struct Context {
    pub global: GlobalArgs,
    pub settings: Settings,
    pub settings_path: PathBuf,
}

// ── Engine config ───────────────────────────────────────────────────

fn read_engine_config(path: &Path) -> Result<EngineConfig, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::config(format!("cannot read config {}: {e}", path.display())))?;
    EngineConfig::from_toml(&text).map_err(CliError::recon)
}

/// `--config`, else the settings file's engine config, else defaults; then
/// command-line overrides.
fn engine_config(ctx: &Context) -> Result<EngineConfig, CliError> {
    let path = ctx
        .global
        .config
        .clone()
        .or_else(|| ctx.settings.engine_config_path(&ctx.settings_path));

    let mut config = match path {
        Some(path) => {
            log::debug!("engine config from {}", path.display());
            read_engine_config(&path)?
        }
        None => EngineConfig::default(),
    };
    config.dry_run |= ctx.global.dry_run;
    if ctx.global.verify_before_write {
        config.concurrency = ConcurrencyMode::VerifyBeforeWrite;
    }
    Ok(config)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::io(format!("JSON serialization error: {e}")))
}

fn dry_run_suffix(dry_run: bool) -> &'static str {
    if dry_run {
        " (dry run, nothing written)"
    } else {
        ""
    }
}

// ── edit ────────────────────────────────────────────────────────────

pub fn cmd_edit(
    ctx: &Context,
    sheet: String,
    id: String,
    column: String,
    value: String,
    number: bool,
    id_column: Option<String>,
) -> Result<(), CliError> {
    let value = if number {
        let n: f64 = value
            .trim()
            .parse()
            .map_err(|_| CliError::usage(format!("--number given but '{value}' is not a number")))?;
        CellValue::Number(n)
    } else {
        CellValue::from(value)
    };

    let config = engine_config(ctx)?;
    let backend = Backend::open(&ctx.global, &ctx.settings, &config, &sheet)?;
    let edit = SingleCellEdit { sheet, identifier: id, column, value, identifier_column: id_column };

    let settings = backend.settings(&config);
    let outcome = single_cell_edit(backend.store(), settings.as_ref(), &config, &edit)?;

    if outcome.updated_count > 0 && !outcome.dry_run {
        backend.persist()?;
    }

    if ctx.global.json {
        println!("{}", to_json(&outcome)?);
    } else if !ctx.global.quiet {
        eprintln!("{}", edit_summary(&outcome));
    }
    Ok(())
}

fn edit_summary(outcome: &SingleCellOutcome) -> String {
    match outcome.skip_reason {
        Some(reason) => format!(
            "skipped {} ({reason}): keeps '{}'",
            outcome.cell_address, outcome.old_value
        ),
        None => format!(
            "updated {}: '{}' -> '{}'{}",
            outcome.cell_address,
            outcome.old_value,
            outcome.new_value,
            dry_run_suffix(outcome.dry_run)
        ),
    }
}

// ── import ──────────────────────────────────────────────────────────

pub fn cmd_import(
    ctx: &Context,
    sheet: String,
    records_path: PathBuf,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let records = read_records(&records_path)?;
    log::info!("{} records from {}", records.len(), records_path.display());

    let config = engine_config(ctx)?;
    let backend = Backend::open(&ctx.global, &ctx.settings, &config, &sheet)?;
    let import = BulkImport { sheet, records };

    let settings = backend.settings(&config);
    let outcome = bulk_import(backend.store(), settings.as_ref(), &config, &import)?;

    if outcome.updated_count > 0 && !outcome.dry_run {
        backend.persist()?;
    }

    if ctx.global.json || output.is_some() {
        let json = to_json(&outcome)?;
        if let Some(path) = &output {
            std::fs::write(path, &json)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            if !ctx.global.quiet {
                eprintln!("wrote {}", path.display());
            }
        }
        if ctx.global.json {
            println!("{json}");
        }
    }
    if !ctx.global.json && !ctx.global.quiet {
        eprint!("{}", import_summary(&outcome, import.records.len()));
    }
    Ok(())
}

fn import_summary(outcome: &ReconciliationOutcome, records: usize) -> String {
    let mut out = format!(
        "import '{}': {records} records, {} cells updated, {} skipped{}\n",
        outcome.sheet,
        outcome.updated_count,
        outcome.skipped_count,
        dry_run_suffix(outcome.dry_run)
    );
    for (reason, n) in outcome.skip_reasons.breakdown() {
        out.push_str(&format!("  {reason}: {n}\n"));
    }
    if !outcome.unresolved_identifiers.is_empty() {
        out.push_str(&format!(
            "  unresolved identifiers: {}\n",
            outcome.unresolved_identifiers.join(", ")
        ));
    }
    out
}

// ── schema ──────────────────────────────────────────────────────────

pub fn cmd_schema(ctx: &Context, sheet: String) -> Result<(), CliError> {
    let config = engine_config(ctx)?;
    let backend = Backend::open(&ctx.global, &ctx.settings, &config, &sheet)?;
    let settings = backend.settings(&config);
    let desc = describe_sheet(backend.store(), settings.as_ref(), &config, &sheet)?;

    if ctx.global.json {
        println!("{}", to_json(&desc)?);
        return Ok(());
    }

    println!(
        "{}  (identifier: {}, {} data rows)",
        desc.sheet, desc.identifier_column, desc.data_rows
    );
    let width = desc.columns.iter().map(|c| c.name.chars().count()).max().unwrap_or(0);
    for col in &desc.columns {
        let kind = match col.kind {
            "identifier" => "identifier, never written",
            "protected_date" => "date, written once",
            _ => "",
        };
        println!("  {:<3} {:<width$}  {kind}", col.letter, col.name, width = width);
    }
    Ok(())
}

// ── config ──────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigReport<'a> {
    valid: bool,
    path: String,
    identifier_column: &'a str,
    read_through_column: &'a str,
    settings_sheet: &'a str,
    sheet_overrides: Vec<&'a str>,
}

pub fn cmd_config(ctx: &Context, cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Validate { path } => cmd_config_validate(ctx, &path),
        ConfigCommands::Show => cmd_config_show(ctx),
        ConfigCommands::Bind { spreadsheet_id } => cmd_config_bind(ctx, spreadsheet_id),
    }
}

fn cmd_config_validate(ctx: &Context, path: &Path) -> Result<(), CliError> {
    let config = read_engine_config(path)?;

    let mut sheet_overrides: Vec<&str> = config.sheets.keys().map(String::as_str).collect();
    sheet_overrides.sort_unstable();
    let report = ConfigReport {
        valid: true,
        path: path.display().to_string(),
        identifier_column: &config.identifier_column,
        read_through_column: &config.read_through_column,
        settings_sheet: &config.settings_sheet,
        sheet_overrides,
    };

    if ctx.global.json {
        println!("{}", to_json(&report)?);
    } else if !ctx.global.quiet {
        eprintln!(
            "ok: {} (identifier '{}', {} sheet overrides)",
            report.path,
            report.identifier_column,
            report.sheet_overrides.len()
        );
    }
    Ok(())
}

fn cmd_config_show(ctx: &Context) -> Result<(), CliError> {
    let value = serde_json::json!({
        "path": ctx.settings_path.display().to_string(),
        "settings": ctx.settings,
    });
    println!("{}", to_json(&value)?);
    Ok(())
}

fn cmd_config_bind(ctx: &Context, spreadsheet_id: String) -> Result<(), CliError> {
    let id = spreadsheet_id.trim();
    if id.is_empty() {
        return Err(CliError::usage("spreadsheet ID is empty"));
    }
    let mut settings = ctx.settings.clone();
    settings.spreadsheet_id = Some(id.to_string());
    settings.save_to(&ctx.settings_path).map_err(|e| {
        CliError::io(format!("cannot write {}: {e}", ctx.settings_path.display()))
    })?;
    if !ctx.global.quiet {
        eprintln!("bound {id} in {}", ctx.settings_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetdesk_recon::{SkipReason, SkipReasons};

    #[test]
    fn import_summary_lists_nonzero_reasons() {
        let mut skips = SkipReasons::default();
        skips.add(SkipReason::DateProtected, 2);
        skips.record(SkipReason::UnknownColumn);
        let outcome = ReconciliationOutcome {
            sheet: "Projects".into(),
            updated_count: 1,
            skipped_count: 3,
            skip_reasons: skips,
            written_cells: vec![],
            unresolved_identifiers: vec!["r9".into()],
            dry_run: true,
        };
        let text = import_summary(&outcome, 2);
        assert!(text.starts_with("import 'Projects': 2 records, 1 cells updated, 3 skipped (dry run"));
        assert!(text.contains("  date_protected: 2\n"));
        assert!(text.contains("  unknown_column: 1\n"));
        assert!(!text.contains("no_change"));
        assert!(text.contains("unresolved identifiers: r9"));
    }

    #[test]
    fn edit_summary_for_skip() {
        let outcome = SingleCellOutcome {
            sheet: "Projects".into(),
            updated_count: 0,
            cell_address: "Projects!C2".into(),
            old_value: CellValue::text("01-Jan-2024"),
            new_value: CellValue::text("09-Feb-2024"),
            skip_reason: Some(SkipReason::DateProtected),
            dry_run: false,
        };
        assert_eq!(edit_summary(&outcome), "skipped Projects!C2 (date_protected): keeps '01-Jan-2024'");
    }
}
