//! Access-token resolution.
//!
//! Order: explicit flag, then `SHEETDESK_ACCESS_TOKEN`, then
//! ~/.config/sheetdesk/credentials.json. Obtaining a token (OAuth consent,
//! service-account exchange) happens elsewhere; this only finds one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sheetdesk_recon::StoreError;

pub const TOKEN_ENV: &str = "SHEETDESK_ACCESS_TOKEN";

/// Credentials file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// OAuth bearer token with the spreadsheets scope
    pub access_token: String,
    /// Account the token belongs to (for display)
    #[serde(default)]
    pub account: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Flag,
    Env,
    File,
}

impl TokenSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Flag => "--token",
            Self::Env => TOKEN_ENV,
            Self::File => "credentials file",
        }
    }
}

/// Returns the path to the credentials file.
pub fn credentials_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("sheetdesk/credentials.json"))
}

/// Load credentials from `path`. None if missing or unreadable.
pub fn load_credentials(path: &Path) -> Option<Credentials> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Credentials>(&contents) {
        Ok(creds) => Some(creds),
        Err(e) => {
            log::warn!("ignoring {}: {e}", path.display());
            None
        }
    }
}

/// Resolve a token from the standard sources.
pub fn resolve_token(flag: Option<&str>) -> Result<(String, TokenSource), StoreError> {
    let env = std::env::var(TOKEN_ENV).ok();
    resolve_token_from(flag, env.as_deref(), credentials_path().as_deref())
}

/// Same as [`resolve_token`] with every source passed in.
pub fn resolve_token_from(
    flag: Option<&str>,
    env: Option<&str>,
    file: Option<&Path>,
) -> Result<(String, TokenSource), StoreError> {
    let present = |s: &&str| !s.trim().is_empty();

    if let Some(token) = flag.filter(present) {
        return Ok((token.trim().to_string(), TokenSource::Flag));
    }
    if let Some(token) = env.filter(present) {
        return Ok((token.trim().to_string(), TokenSource::Env));
    }
    if let Some(creds) = file.and_then(load_credentials) {
        if !creds.access_token.trim().is_empty() {
            return Ok((creds.access_token.trim().to_string(), TokenSource::File));
        }
    }
    Err(StoreError::Auth(format!(
        "no access token: pass --token, set {TOKEN_ENV}, or write {}",
        file.map(|p| p.display().to_string())
            .unwrap_or_else(|| "credentials.json".into())
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_env_and_file() {
        let (token, source) = resolve_token_from(Some("from-flag"), Some("from-env"), None).unwrap();
        assert_eq!(token, "from-flag");
        assert_eq!(source, TokenSource::Flag);
    }

    #[test]
    fn blank_flag_falls_through() {
        let (token, source) = resolve_token_from(Some("  "), Some("from-env"), None).unwrap();
        assert_eq!(token, "from-env");
        assert_eq!(source, TokenSource::Env);
    }

    #[test]
    fn file_is_last_resort() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"access_token":"ya29.file"}"#).unwrap();

        let (token, source) = resolve_token_from(None, None, Some(&path)).unwrap();
        assert_eq!(token, "ya29.file");
        assert_eq!(source, TokenSource::File);
    }

    #[test]
    fn malformed_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = resolve_token_from(None, None, Some(&path)).unwrap_err();
        assert!(matches!(err, StoreError::Auth(_)));
        assert!(err.to_string().contains(TOKEN_ENV));
    }

    #[test]
    fn credentials_path_is_namespaced() {
        if let Some(path) = credentials_path() {
            assert!(path.to_string_lossy().contains("sheetdesk"));
            assert!(path.to_string_lossy().ends_with("credentials.json"));
        }
    }
}
