//! Per-cell queue-or-skip decision.
//!
//! | protected | date invalid | empty | unchanged | outcome                  |
//! |-----------|--------------|-------|-----------|--------------------------|
//! | yes       | –            | –     | –         | skip (identifier / date) |
//! | no        | yes          | –     | –         | skip invalid date format |
//! | no        | no           | yes   | –         | skip no change           |
//! | no        | no           | no    | yes       | skip no change           |
//! | no        | no           | no    | no        | write                    |

use crate::config::DateConfig;
use crate::dates::{normalize_date, DateCheck};
use crate::model::{CellValue, SkipReason};
use crate::protection::ProtectionPolicy;

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Write this (possibly canonicalized) value.
    Write(CellValue),
    Skip(SkipReason),
}

pub fn decide_cell(
    policy: &ProtectionPolicy,
    dates: &DateConfig,
    column: &str,
    current: &CellValue,
    candidate: &CellValue,
) -> Decision {
    if let Some(reason) = policy.check(column, current).skip_reason() {
        return Decision::Skip(reason);
    }

    let value = if policy.is_date_column(column) && !candidate.is_blank() {
        match normalize_date(candidate, dates) {
            DateCheck::Canonical(s) => CellValue::Text(s),
            DateCheck::Rejected => return Decision::Skip(SkipReason::InvalidDateFormat),
        }
    } else {
        candidate.clone()
    };

    if value.is_blank() || value.to_string() == current.to_string() {
        return Decision::Skip(SkipReason::NoChange);
    }

    Decision::Write(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ProtectionPolicy {
        ProtectionPolicy::new("RowId", ["Survey"])
    }

    fn decide(column: &str, current: CellValue, candidate: CellValue) -> Decision {
        decide_cell(&policy(), &DateConfig::default(), column, &current, &candidate)
    }

    #[test]
    fn identifier_never_written() {
        assert_eq!(
            decide("RowId", CellValue::text("r1"), CellValue::text("r999")),
            Decision::Skip(SkipReason::IdentifierProtected)
        );
    }

    #[test]
    fn filled_date_protected_before_validation() {
        // Invalid candidate on a filled date column still reports protection.
        assert_eq!(
            decide("Survey", CellValue::text("01-Jan-2024"), CellValue::text("garbage")),
            Decision::Skip(SkipReason::DateProtected)
        );
    }

    #[test]
    fn empty_date_gets_canonical_value() {
        assert_eq!(
            decide("Survey", CellValue::Empty, CellValue::text("05/jan/2024")),
            Decision::Write(CellValue::text("05-Jan-2024"))
        );
        assert_eq!(
            decide("Survey", CellValue::Empty, CellValue::Number(45292.0)),
            Decision::Write(CellValue::text("01-Jan-2024"))
        );
    }

    #[test]
    fn invalid_date_skipped() {
        assert_eq!(
            decide("Survey", CellValue::Empty, CellValue::text("2024-01-05")),
            Decision::Skip(SkipReason::InvalidDateFormat)
        );
    }

    #[test]
    fn empty_candidate_is_no_change() {
        assert_eq!(
            decide("Name", CellValue::text("Alice"), CellValue::Empty),
            Decision::Skip(SkipReason::NoChange)
        );
        assert_eq!(
            decide("Survey", CellValue::Empty, CellValue::text("   ")),
            Decision::Skip(SkipReason::NoChange)
        );
    }

    #[test]
    fn unchanged_is_no_change() {
        assert_eq!(
            decide("Name", CellValue::text("Alice"), CellValue::text("Alice")),
            Decision::Skip(SkipReason::NoChange)
        );
        assert_eq!(
            decide("Qty", CellValue::text("42"), CellValue::Number(42.0)),
            Decision::Skip(SkipReason::NoChange)
        );
    }

    #[test]
    fn changed_ordinary_value_written() {
        assert_eq!(
            decide("Name", CellValue::text("Alice"), CellValue::text("Alicia")),
            Decision::Write(CellValue::text("Alicia"))
        );
        assert_eq!(
            decide("Notes", CellValue::Empty, CellValue::text("first visit")),
            Decision::Write(CellValue::text("first visit"))
        );
    }

    #[test]
    fn ordinary_columns_keep_raw_dates() {
        // Only protected-date columns are normalized.
        assert_eq!(
            decide("Comment", CellValue::Empty, CellValue::text("2024-01-05")),
            Decision::Write(CellValue::text("2024-01-05"))
        );
    }
}
