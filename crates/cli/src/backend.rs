//! Where a command's sheet lives: a local CSV or a Google spreadsheet.

use std::path::PathBuf;

use sheetdesk_config::Settings;
use sheetdesk_recon::{
    EngineConfig, MemoryStore, NoSettings, SettingsProvider, SheetSettingsProvider, TabularStore,
};
use sheetdesk_sheets::{resolve_token, SheetsClient, DEFAULT_API_BASE};

use crate::exit_codes::{EXIT_STORE, EXIT_USAGE};
use crate::input::{read_sheet_csv, write_sheet_csv};
use crate::{CliError, GlobalArgs};

pub const SPREADSHEET_ENV: &str = "SHEETDESK_SPREADSHEET_ID";

pub enum Backend {
    /// One CSV loaded as `sheet`, optionally with a settings CSV beside it.
    Local {
        path: PathBuf,
        sheet: String,
        store: MemoryStore,
        has_settings: bool,
    },
    Remote(SheetsClient),
}

impl Backend {
    pub fn open(
        global: &GlobalArgs,
        settings: &Settings,
        config: &EngineConfig,
        sheet: &str,
    ) -> Result<Self, CliError> {
        if let Some(path) = &global.local {
            let store = MemoryStore::new().with_sheet(sheet, read_sheet_csv(path)?);
            let has_settings = match &global.local_settings {
                Some(settings_path) => {
                    store.insert_sheet(&config.settings_sheet, read_sheet_csv(settings_path)?);
                    true
                }
                None => false,
            };
            log::debug!("local sheet '{sheet}' from {}", path.display());
            return Ok(Self::Local {
                path: path.clone(),
                sheet: sheet.to_string(),
                store,
                has_settings,
            });
        }

        let spreadsheet_id = global
            .spreadsheet
            .clone()
            .or_else(|| settings.spreadsheet_id.clone())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| CliError {
                code: EXIT_USAGE,
                message: "no spreadsheet given".into(),
                hint: Some(format!(
                    "pass --spreadsheet <ID>, set {SPREADSHEET_ENV}, or set \"sheets.spreadsheetId\" in {}; use --local <CSV> to work offline",
                    Settings::config_path_display()
                )),
            })?;

        let (token, source) = resolve_token(global.token.as_deref()).map_err(|e| CliError {
            code: EXIT_STORE,
            message: e.to_string(),
            hint: None,
        })?;
        log::debug!("access token from {}", source.label());

        let api_base = api_base(global, settings);
        let client = SheetsClient::with_base_url(spreadsheet_id, token, api_base)
            .map_err(|e| CliError::usage(e.to_string()))?;
        Ok(Self::Remote(client))
    }

    pub fn store(&self) -> &dyn TabularStore {
        match self {
            Self::Local { store, .. } => store,
            Self::Remote(client) => client,
        }
    }

    /// Column settings for this call. A local sheet without a settings CSV
    /// has none.
    pub fn settings<'a>(&'a self, config: &EngineConfig) -> Box<dyn SettingsProvider + 'a> {
        match self {
            Self::Local { has_settings: false, .. } => Box::new(NoSettings),
            Self::Local { store, .. } => {
                Box::new(SheetSettingsProvider::new(store, config.settings_sheet.clone()))
            }
            Self::Remote(client) => {
                Box::new(SheetSettingsProvider::new(client, config.settings_sheet.clone()))
            }
        }
    }

    /// Write a local sheet back to its CSV. Remote writes are already committed.
    pub fn persist(&self) -> Result<(), CliError> {
        if let Self::Local { path, sheet, store, .. } = self {
            if let Some(rows) = store.sheet(sheet) {
                write_sheet_csv(path, &rows)?;
                log::debug!("wrote {}", path.display());
            }
        }
        Ok(())
    }
}

/// `--api-base`, else the settings file, else the public Sheets endpoint.
fn api_base<'a>(global: &'a GlobalArgs, settings: &'a Settings) -> &'a str {
    global
        .api_base
        .as_deref()
        .or(settings.api_base.as_deref())
        .unwrap_or(DEFAULT_API_BASE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_precedence() {
        let mut global = GlobalArgs::default();
        let mut settings = Settings::default();
        assert_eq!(api_base(&global, &settings), DEFAULT_API_BASE);

        settings.api_base = Some("http://127.0.0.1:9000".into());
        assert_eq!(api_base(&global, &settings), "http://127.0.0.1:9000");

        global.api_base = Some("http://127.0.0.1:9001".into());
        assert_eq!(api_base(&global, &settings), "http://127.0.0.1:9001");
    }
}
