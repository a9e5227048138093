use std::collections::HashMap;

use serde::Deserialize;

use crate::address::column_index;
use crate::error::ReconError;
use crate::matcher::find_first;

pub const DEFAULT_IDENTIFIER_COLUMN: &str = "RowId";
pub const DEFAULT_READ_THROUGH_COLUMN: &str = "ZZ";
pub const DEFAULT_SETTINGS_SHEET: &str = "Settings";
/// Serial of 31-Dec-9999, the last date a spreadsheet can hold.
pub const MAX_DATE_SERIAL: i64 = 2_958_465;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "default_identifier_column")]
    pub identifier_column: String,
    /// Last column of the full-sheet read (`A1:<col>`).
    #[serde(default = "default_read_through_column")]
    pub read_through_column: String,
    /// Compute the outcome without writing anything.
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub concurrency: ConcurrencyMode,
    /// Sheet holding `Sheet | Column | Type` rows for the settings provider.
    #[serde(default = "default_settings_sheet")]
    pub settings_sheet: String,
    #[serde(default)]
    pub dates: DateConfig,
    #[serde(default)]
    pub sheets: HashMap<String, SheetConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            identifier_column: default_identifier_column(),
            read_through_column: default_read_through_column(),
            dry_run: false,
            concurrency: ConcurrencyMode::default(),
            settings_sheet: default_settings_sheet(),
            dates: DateConfig::default(),
            sheets: HashMap::new(),
        }
    }
}

fn default_identifier_column() -> String {
    DEFAULT_IDENTIFIER_COLUMN.into()
}

fn default_read_through_column() -> String {
    DEFAULT_READ_THROUGH_COLUMN.into()
}

fn default_settings_sheet() -> String {
    DEFAULT_SETTINGS_SHEET.into()
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

/// How a bulk import guards against writers that raced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// Read, diff, write. Last writer wins on ordinary columns.
    #[default]
    BestEffort,
    /// Re-read just before the batch and drop writes whose basis changed.
    VerifyBeforeWrite,
}

// ---------------------------------------------------------------------------
// Dates + per-sheet overrides
// ---------------------------------------------------------------------------

/// Plausible spreadsheet-serial range for numeric dates.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateConfig {
    #[serde(default = "default_min_serial")]
    pub min_serial: i64,
    #[serde(default = "default_max_serial")]
    pub max_serial: i64,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            min_serial: default_min_serial(),
            max_serial: default_max_serial(),
        }
    }
}

fn default_min_serial() -> i64 {
    1
}

fn default_max_serial() -> i64 {
    MAX_DATE_SERIAL
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetConfig {
    #[serde(default)]
    pub identifier_column: Option<String>,
    /// Protected-date columns in addition to those typed `date` in settings.
    #[serde(default)]
    pub protected_date_columns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl EngineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: EngineConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.identifier_column.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "identifier_column must not be blank".into(),
            ));
        }

        if column_index(&self.read_through_column).is_none() {
            return Err(ReconError::ConfigValidation(format!(
                "read_through_column must be column letters, got '{}'",
                self.read_through_column
            )));
        }

        if self.dates.min_serial > self.dates.max_serial {
            return Err(ReconError::ConfigValidation(format!(
                "dates.min_serial ({}) is greater than dates.max_serial ({})",
                self.dates.min_serial, self.dates.max_serial
            )));
        }

        if self.dates.max_serial > MAX_DATE_SERIAL {
            return Err(ReconError::ConfigValidation(format!(
                "dates.max_serial ({}) is past 31-Dec-9999 ({MAX_DATE_SERIAL})",
                self.dates.max_serial
            )));
        }

        for (name, sheet) in &self.sheets {
            if let Some(id) = &sheet.identifier_column {
                if id.trim().is_empty() {
                    return Err(ReconError::ConfigValidation(format!(
                        "sheet '{name}': identifier_column must not be blank"
                    )));
                }
                if find_first(&sheet.protected_date_columns, id).is_some() {
                    return Err(ReconError::ConfigValidation(format!(
                        "sheet '{name}': identifier column '{id}' cannot also be a protected date"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Per-sheet block, matched through the usual name tiers.
    pub fn sheet(&self, sheet: &str) -> Option<&SheetConfig> {
        if let Some(s) = self.sheets.get(sheet) {
            return Some(s);
        }
        let names: Vec<&String> = self.sheets.keys().collect();
        find_first(&names, sheet).map(|m| &self.sheets[names[m.index]])
    }

    pub fn identifier_column_for(&self, sheet: &str) -> &str {
        self.sheet(sheet)
            .and_then(|s| s.identifier_column.as_deref())
            .unwrap_or(&self.identifier_column)
    }

    pub fn protected_date_columns_for(&self, sheet: &str) -> &[String] {
        self.sheet(sheet)
            .map(|s| s.protected_date_columns.as_slice())
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
