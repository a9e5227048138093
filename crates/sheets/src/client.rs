//! Google Sheets values API client.
//!
//! Blocking reqwest client (no Tokio runtime required). Reads use formatted
//! values so the engine compares what a person sees in the sheet; writes use
//! `USER_ENTERED` so canonical date text is parsed the way typed text is.

use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use url::Url;

use sheetdesk_recon::address::{qualified_range, CellAddress};
use sheetdesk_recon::model::CellWrite;
use sheetdesk_recon::{CellValue, StoreError, TabularStore};

// ── Constants ───────────────────────────────────────────────────────

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";
pub const MAX_RETRIES: u32 = 3;
const USER_AGENT: &str = concat!("sdesk/", env!("CARGO_PKG_VERSION"));

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_cells: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateValuesResponse {
    #[serde(default)]
    total_updated_cells: usize,
}

// ── SheetsClient ────────────────────────────────────────────────────

/// One spreadsheet, addressed through the v4 values endpoints.
#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::blocking::Client,
    api_base: Url,
    spreadsheet_id: String,
    token: String,
    initial_backoff: Duration,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: impl Into<String>, token: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_base_url(spreadsheet_id, token, DEFAULT_API_BASE)
    }

    /// Client against a non-default API base (proxies, tests).
    pub fn with_base_url(
        spreadsheet_id: impl Into<String>,
        token: impl Into<String>,
        api_base: &str,
    ) -> Result<Self, StoreError> {
        let api_base = Url::parse(api_base)
            .map_err(|e| StoreError::Rejected(format!("invalid API base '{api_base}': {e}")))?;
        if api_base.cannot_be_a_base() {
            return Err(StoreError::Rejected(format!("invalid API base '{api_base}'")));
        }
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base,
            spreadsheet_id: spreadsheet_id.into(),
            token: token.into(),
            initial_backoff: Duration::from_secs(1),
        })
    }

    /// First retry delay; doubles per attempt.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// `{base}/v4/spreadsheets/{id}/{tail...}` with every segment encoded.
    fn endpoint(&self, tail: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()])
                .extend(tail);
        }
        url
    }

    /// Send with retry + exponential backoff and classify the failure.
    ///
    /// `build_request` is called once per attempt. 429, 5xx and transport
    /// errors are retried; every other non-success status fails at once.
    fn send_with_retry(
        &self,
        what: &str,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<String, StoreError> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0;

        loop {
            let result = build_request(&self.http).bearer_auth(&self.token).send();

            let wait = match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if resp.status().is_success() {
                        return resp
                            .text()
                            .map_err(|e| StoreError::Network(format!("{what}: reading body: {e}")));
                    }

                    let retry_after = resp
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.trim().parse::<u64>().ok())
                        .map(Duration::from_secs);
                    let body = resp.text().unwrap_or_default();
                    let message = error_message(&body);

                    let retryable = status == 429 || status >= 500;
                    if !retryable || attempt == MAX_RETRIES {
                        return Err(classify(status, message, body, attempt));
                    }
                    log::warn!(
                        "{what}: retry {}/{} (HTTP {status}: {message})",
                        attempt + 1,
                        MAX_RETRIES
                    );
                    retry_after.unwrap_or(backoff)
                }
                Err(e) => {
                    if attempt == MAX_RETRIES {
                        return Err(StoreError::Network(format!(
                            "{what} failed after {} attempts: {e}",
                            attempt + 1
                        )));
                    }
                    log::warn!("{what}: retry {}/{} ({e})", attempt + 1, MAX_RETRIES);
                    backoff
                }
            };

            thread::sleep(wait);
            backoff *= 2;
            attempt += 1;
        }
    }

    fn parse<T: for<'de> Deserialize<'de>>(what: &str, body: &str) -> Result<T, StoreError> {
        serde_json::from_str(body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            StoreError::Parse(format!("{what}: {e} (body: {preview})"))
        })
    }
}

/// Google error envelope: `{"error": {"code", "message", "status"}}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}

fn classify(status: u16, message: String, body: String, attempt: u32) -> StoreError {
    match status {
        401 | 403 => StoreError::Auth(format!("HTTP {status}: {message}")),
        404 => StoreError::SheetNotFound(message),
        400 if message.contains("Unable to parse range") => StoreError::SheetNotFound(message),
        400 => StoreError::Rejected(message),
        s if s == 429 || s >= 500 => StoreError::Http {
            status,
            body: format!("{message} (after {} attempts)", attempt + 1),
        },
        _ => StoreError::Http { status, body },
    }
}

/// Sheets wants `""` to clear a cell; JSON null means "leave unchanged".
fn wire_value(value: &CellValue) -> serde_json::Value {
    match value {
        CellValue::Text(s) => json!(s),
        CellValue::Number(n) => json!(n),
        CellValue::Empty => json!(""),
    }
}

impl TabularStore for SheetsClient {
    fn read_range(&self, sheet: &str, range: &str) -> Result<Vec<Vec<CellValue>>, StoreError> {
        let target = qualified_range(sheet, range);
        let url = self.endpoint(&["values", &target]);
        let what = format!("read {target}");

        let body = self.send_with_retry(&what, |http| {
            http.get(url.clone()).query(&[
                ("valueRenderOption", "FORMATTED_VALUE"),
                ("majorDimension", "ROWS"),
            ])
        })?;
        let parsed: ValueRange = Self::parse(&what, &body)?;

        log::debug!("{what}: {} rows", parsed.values.len());
        Ok(parsed
            .values
            .into_iter()
            .map(|row| row.into_iter().map(CellValue::from).collect())
            .collect())
    }

    fn write_cell(&self, sheet: &str, address: &CellAddress, value: &CellValue) -> Result<(), StoreError> {
        let target = qualified_range(sheet, &address.a1());
        let url = self.endpoint(&["values", &target]);
        let what = format!("write {target}");
        let payload = json!({
            "range": target,
            "majorDimension": "ROWS",
            "values": [[wire_value(value)]],
        });

        let body = self.send_with_retry(&what, |http| {
            http.put(url.clone())
                .query(&[("valueInputOption", "USER_ENTERED")])
                .json(&payload)
        })?;
        let parsed: UpdateValuesResponse = Self::parse(&what, &body)?;
        if parsed.updated_cells != 1 {
            log::warn!("{what}: store reports {} cells updated", parsed.updated_cells);
        }
        Ok(())
    }

    fn write_batch(&self, sheet: &str, writes: &[CellWrite]) -> Result<usize, StoreError> {
        if writes.is_empty() {
            return Ok(0);
        }
        let url = self.endpoint(&["values:batchUpdate"]);
        let what = format!("batch write {} cells to '{sheet}'", writes.len());
        let data: Vec<serde_json::Value> = writes
            .iter()
            .map(|w| {
                json!({
                    "range": qualified_range(sheet, &w.address.a1()),
                    "majorDimension": "ROWS",
                    "values": [[wire_value(&w.value)]],
                })
            })
            .collect();
        let payload = json!({ "valueInputOption": "USER_ENTERED", "data": data });

        let body = self.send_with_retry(&what, |http| http.post(url.clone()).json(&payload))?;
        let parsed: BatchUpdateValuesResponse = Self::parse(&what, &body)?;
        Ok(parsed.total_updated_cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SheetsClient {
        SheetsClient::with_base_url("sheet-123", "tok", "https://sheets.example.test/").unwrap()
    }

    #[test]
    fn endpoint_encodes_sheet_names() {
        let url = client().endpoint(&["values", "'Site Visits'!A1:ZZ"]);
        assert_eq!(
            url.as_str(),
            "https://sheets.example.test/v4/spreadsheets/sheet-123/values/'Site%20Visits'!A1:ZZ"
        );
    }

    #[test]
    fn endpoint_escapes_slashes_in_sheet_names() {
        let url = client().endpoint(&["values", "'Q1/Q2'!A1"]);
        assert!(url.path().ends_with("/values/'Q1%2FQ2'!A1"), "{}", url.path());
    }

    #[test]
    fn batch_endpoint() {
        let url = client().endpoint(&["values:batchUpdate"]);
        assert_eq!(url.path(), "/v4/spreadsheets/sheet-123/values:batchUpdate");
    }

    #[test]
    fn rejects_unusable_base() {
        assert!(SheetsClient::with_base_url("id", "tok", "not a url").is_err());
        assert!(SheetsClient::with_base_url("id", "tok", "mailto:x@example.com").is_err());
    }

    #[test]
    fn classify_statuses() {
        assert!(matches!(classify(401, "x".into(), String::new(), 0), StoreError::Auth(_)));
        assert!(matches!(classify(403, "x".into(), String::new(), 0), StoreError::Auth(_)));
        assert!(matches!(classify(404, "x".into(), String::new(), 0), StoreError::SheetNotFound(_)));
        assert!(matches!(
            classify(400, "Unable to parse range: Nope!A1:ZZ".into(), String::new(), 0),
            StoreError::SheetNotFound(_)
        ));
        assert!(matches!(classify(400, "bad".into(), String::new(), 0), StoreError::Rejected(_)));
        assert!(matches!(
            classify(503, "down".into(), String::new(), 3),
            StoreError::Http { status: 503, .. }
        ));
    }

    #[test]
    fn error_message_prefers_google_envelope() {
        let body = r#"{"error":{"code":400,"message":"Unable to parse range: X","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "Unable to parse range: X");
        assert_eq!(error_message("  plain text  "), "plain text");
    }

    #[test]
    fn empty_cells_clear() {
        assert_eq!(wire_value(&CellValue::Empty), json!(""));
        assert_eq!(wire_value(&CellValue::Number(3.5)), json!(3.5));
    }
}
