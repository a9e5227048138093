// User settings
// Loaded from ~/.config/sheetdesk/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Spreadsheet binding
    #[serde(rename = "sheets.spreadsheetId")]
    pub spreadsheet_id: Option<String>,

    /// Unset means the transport's own default endpoint.
    #[serde(rename = "sheets.apiBase")]
    pub api_base: Option<String>,

    // Engine
    #[serde(rename = "engine.configPath")]
    pub engine_config: Option<PathBuf>,

    // Logging
    #[serde(rename = "log.level")]
    pub log_level: Option<String>,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetdesk");
        config_dir.join("settings.json")
    }

    /// Get the config file path for display
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("error parsing {}: {e}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("error reading {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save current settings to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Engine config path, resolved against the settings file's directory
    /// when relative.
    pub fn engine_config_path(&self, settings_path: &Path) -> Option<PathBuf> {
        let path = self.engine_config.as_ref()?;
        if path.is_absolute() {
            return Some(path.clone());
        }
        Some(
            settings_path
                .parent()
                .map(|dir| dir.join(path))
                .unwrap_or_else(|| path.clone()),
        )
    }
}
