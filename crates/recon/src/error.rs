use thiserror::Error;

/// Diagnostic candidate lists are capped so a 10k-row sheet doesn't end up
/// in one error message.
pub const MAX_CANDIDATES: usize = 20;

/// Failure of the tabular store itself. Nothing may be assumed committed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport failure (connect, timeout, reset).
    #[error("network error: {0}")]
    Network(String),
    /// Non-success HTTP status that isn't covered below.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// Credentials missing, expired, or lacking access.
    #[error("store auth failed: {0}")]
    Auth(String),
    /// Response body could not be understood.
    #[error("parse error: {0}")]
    Parse(String),
    /// The sheet (tab) does not exist.
    #[error("sheet not found: {0}")]
    SheetNotFound(String),
    /// The store refused the request (bad range, bad value).
    #[error("store rejected request: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum ReconError {
    /// Sheet has no rows, or the header row is blank, or a required header is missing.
    #[error("schema error: {0}")]
    Schema(String),
    /// Identifier value matched no data row.
    #[error("sheet '{sheet}': no row with identifier '{identifier}' (considered: {})", preview(.candidates))]
    RowNotFound {
        sheet: String,
        identifier: String,
        candidates: Vec<String>,
    },
    /// Column name matched no header.
    #[error("sheet '{sheet}': unknown column '{column}' (header: {})", preview(.candidates))]
    UnknownColumn {
        sheet: String,
        column: String,
        candidates: Vec<String>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (blank identifier column, bad range, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
}

/// First `MAX_CANDIDATES` values, comma separated, with an overflow marker.
fn preview(candidates: &[String]) -> String {
    if candidates.is_empty() {
        return "none".into();
    }
    let mut out = candidates
        .iter()
        .take(MAX_CANDIDATES)
        .map(|c| format!("'{c}'"))
        .collect::<Vec<_>>()
        .join(", ");
    if candidates.len() > MAX_CANDIDATES {
        out.push_str(&format!(", … {} more", candidates.len() - MAX_CANDIDATES));
    }
    out
}
