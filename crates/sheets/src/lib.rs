//! Google Sheets transport for the reconciliation engine.
//!
//! This crate is the single source of truth for the Sheets wire contract:
//! token lookup, values read, single-cell update, batch update.
//!
//! No engine logic. Retries cover 429 / 5xx / transport errors only.

mod auth;
mod client;

pub use auth::{
    credentials_path, load_credentials, resolve_token, resolve_token_from, Credentials,
    TokenSource, TOKEN_ENV,
};
pub use client::{SheetsClient, DEFAULT_API_BASE, MAX_RETRIES};
