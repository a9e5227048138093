//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success (skips are not failures)                          |
//! | 1    | General error (unspecified)                               |
//! | 2    | CLI usage error (bad args, no spreadsheet bound)          |
//! | 3    | Sheet schema unusable (no header, no identifier column)   |
//! | 4    | Row, column or sheet not found                            |
//! | 5    | Store failure (network, auth, rejected write)             |
//! | 6    | Engine config invalid                                     |
//! | 7    | Input unreadable (records file, local sheet CSV)          |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `CliError::recon` or the command that raises it

use sheetdesk_recon::{ReconError, StoreError};

/// Success - command completed; individual cells may still have been skipped.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Sheet has no header row, or the identifier column is missing.
pub const EXIT_SCHEMA: u8 = 3;

/// Identifier matched no row, column matched no header, or the tab is missing.
pub const EXIT_NOT_FOUND: u8 = 4;

/// Store read/write failed. Nothing may be assumed committed.
pub const EXIT_STORE: u8 = 5;

/// Engine config could not be parsed or failed validation.
pub const EXIT_CONFIG: u8 = 6;

/// Records file or local sheet could not be read or parsed.
pub const EXIT_INPUT: u8 = 7;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Schema(_) => EXIT_SCHEMA,
        ReconError::RowNotFound { .. } | ReconError::UnknownColumn { .. } => EXIT_NOT_FOUND,
        ReconError::Store(StoreError::SheetNotFound(_)) => EXIT_NOT_FOUND,
        ReconError::Store(_) => EXIT_STORE,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_CONFIG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_SCHEMA,
            EXIT_NOT_FOUND,
            EXIT_STORE,
            EXIT_CONFIG,
            EXIT_INPUT,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn recon_errors_map() {
        assert_eq!(recon_exit_code(&ReconError::Schema("x".into())), EXIT_SCHEMA);
        assert_eq!(
            recon_exit_code(&ReconError::Store(StoreError::SheetNotFound("Nope".into()))),
            EXIT_NOT_FOUND
        );
        assert_eq!(
            recon_exit_code(&ReconError::Store(StoreError::Auth("401".into()))),
            EXIT_STORE
        );
        assert_eq!(recon_exit_code(&ReconError::ConfigParse("x".into())), EXIT_CONFIG);
    }
}
