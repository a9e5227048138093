// sheetdesk CLI - safe field edits and bulk imports into a spreadsheet

mod backend;
mod commands;
mod exit_codes;
mod input;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use exit_codes::{recon_exit_code, EXIT_CONFIG, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use sheetdesk_recon::{ReconError, StoreError};

#[derive(Parser)]
#[command(name = "sdesk")]
#[command(about = "Reconcile field edits and bulk imports into a spreadsheet without clobbering it")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Work on a local CSV instead of a spreadsheet (written back on success)
    #[arg(long, global = true, value_name = "CSV")]
    pub local: Option<PathBuf>,

    /// Settings sheet for --local mode, as CSV with Sheet/Column/Type headers
    #[arg(long, global = true, value_name = "CSV", requires = "local")]
    pub local_settings: Option<PathBuf>,

    /// Spreadsheet ID (overrides settings)
    #[arg(long, global = true, env = "SHEETDESK_SPREADSHEET_ID", value_name = "ID")]
    pub spreadsheet: Option<String>,

    /// Bearer token (overrides SHEETDESK_ACCESS_TOKEN and the credentials file)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Sheets API base URL (overrides settings)
    #[arg(long, global = true, env = "SHEETDESK_API_BASE", value_name = "URL")]
    pub api_base: Option<String>,

    /// Engine config TOML (overrides settings)
    #[arg(long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Settings file (default: ~/.config/sheetdesk/settings.json)
    #[arg(long, global = true, env = "SHEETDESK_SETTINGS", value_name = "JSON")]
    pub settings: Option<PathBuf>,

    /// Compute and report, but write nothing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Re-read before writing and skip cells changed since the first read
    #[arg(long, global = true)]
    pub verify_before_write: bool,

    /// Output JSON to stdout instead of a human summary
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress the human summary on stderr
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Set one cell, addressed by row identifier and column name
    #[command(after_help = "\
Examples:
  sdesk edit --sheet Projects --id r1 --column Survey --value 05-Jan-2024
  sdesk edit --sheet Sites --id-column DUID --id D-100 --column Status --value closed
  sdesk edit --sheet Projects --id r1 --column Survey --value 45292 --number --dry-run")]
    Edit {
        /// Sheet (tab) name
        #[arg(long)]
        sheet: String,

        /// Row identifier value
        #[arg(long)]
        id: String,

        /// Column header name
        #[arg(long)]
        column: String,

        /// New value
        #[arg(long, allow_hyphen_values = true)]
        value: String,

        /// Treat --value as a number (date columns read numbers as day serials)
        #[arg(long)]
        number: bool,

        /// Identifier column for this edit (default from engine config)
        #[arg(long)]
        id_column: Option<String>,
    },

    /// Apply a file of records to matching rows
    #[command(after_help = "\
Examples:
  sdesk import --sheet Projects updates.csv
  sdesk import --sheet Projects updates.json --json
  sdesk import --sheet Projects updates.csv --local projects.csv --dry-run
  sdesk import --sheet Projects updates.csv --output report.json")]
    Import {
        /// Sheet (tab) name
        #[arg(long)]
        sheet: String,

        /// Records: CSV with a header row, or a JSON array of objects (.json)
        records: PathBuf,

        /// Write the JSON report to a file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show a sheet's columns and how each is protected
    Schema {
        /// Sheet (tab) name
        #[arg(long)]
        sheet: String,
    },

    /// Engine config and user settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Parse and validate an engine config without touching any sheet
    Validate {
        /// Path to the engine TOML
        path: PathBuf,
    },

    /// Print the effective user settings
    Show,

    /// Bind a spreadsheet ID in the settings file
    Bind {
        /// Spreadsheet ID (from its URL)
        spreadsheet_id: String,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  sheetdesk-recon ", env!("CARGO_PKG_VERSION"),
        "\nbuild:   ", env!("BUILD_PROFILE"),
        "\ntarget:  ", env!("TARGET"),
    )
}

/// Route `log` records through a stderr subscriber. `RUST_LOG` wins over
/// the settings file; default is warnings only.
fn init_logging(level: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.unwrap_or("warn").into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings_path = cli
        .global
        .settings
        .clone()
        .unwrap_or_else(sheetdesk_config::Settings::config_path);
    let settings = sheetdesk_config::Settings::load_from(&settings_path);
    init_logging(settings.log_level.as_deref());

    let ctx = commands::Context { global: cli.global, settings, settings_path };

    let result = match cli.command {
        Commands::Edit { sheet, id, column, value, number, id_column } => {
            commands::cmd_edit(&ctx, sheet, id, column, value, number, id_column)
        }
        Commands::Import { sheet, records, output } => commands::cmd_import(&ctx, sheet, records, output),
        Commands::Schema { sheet } => commands::cmd_schema(&ctx, sheet),
        Commands::Config(cmd) => commands::cmd_config(&ctx, cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with proper exit code and hint.
    pub fn recon(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::Schema(msg) if msg.contains("identifier column") => {
                Some("set identifier_column (globally or under [sheets.<name>]) in the engine config".to_string())
            }
            ReconError::Store(StoreError::Auth(_)) => {
                Some("token expired or lacks the spreadsheets scope; pass a fresh --token".to_string())
            }
            ReconError::Store(StoreError::SheetNotFound(_)) => {
                Some("check --sheet against the tab names (case matters for tabs)".to_string())
            }
            ReconError::Store(StoreError::Network(_)) | ReconError::Store(StoreError::Http { .. }) => {
                Some("nothing may be assumed written; re-running is safe".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        Self::recon(err)
    }
}
