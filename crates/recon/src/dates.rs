//! Date normalization for protected-date columns.
//!
//! The only accepted textual form is `DD-MMM-YYYY` (`05-Jan-2024`).
//! `DD/MMM/YYYY` is accepted and rewritten with `-`. Numbers in the
//! configured serial range are day counts from the spreadsheet epoch.
//! Anything else (`01/05/24`, `2024-01-05`, "next week") is rejected:
//! day/month order can't be recovered without a locale, and a skipped
//! cell is better than a misread one.

use chrono::{NaiveDate, TimeDelta};

use crate::config::{DateConfig, MAX_DATE_SERIAL};
use crate::model::CellValue;

/// Canonical output format.
pub const CANONICAL_FORMAT: &str = "%d-%b-%Y";

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateCheck {
    Canonical(String),
    Rejected,
}

/// Day zero of spreadsheet serial numbers.
pub fn spreadsheet_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

pub fn normalize_date(value: &CellValue, config: &DateConfig) -> DateCheck {
    match value {
        CellValue::Number(n) => from_serial(*n, config),
        CellValue::Text(s) => parse_text(s.trim()),
        CellValue::Empty => DateCheck::Rejected,
    }
}

pub fn format_canonical(date: NaiveDate) -> String {
    date.format(CANONICAL_FORMAT).to_string()
}

fn from_serial(serial: f64, config: &DateConfig) -> DateCheck {
    if !serial.is_finite() {
        return DateCheck::Rejected;
    }
    // Fractional part is time of day.
    let days = serial.floor();
    // Canonical form has a four-digit year, whatever the configured range.
    let max = config.max_serial.min(MAX_DATE_SERIAL);
    if days < config.min_serial as f64 || days > max as f64 {
        return DateCheck::Rejected;
    }
    TimeDelta::try_days(days as i64)
        .and_then(|delta| spreadsheet_epoch().checked_add_signed(delta))
        .map(|d| DateCheck::Canonical(format_canonical(d)))
        .unwrap_or(DateCheck::Rejected)
}

fn parse_text(s: &str) -> DateCheck {
    // DD?MMM?YYYY, exactly 11 ASCII bytes.
    let b = s.as_bytes();
    if b.len() != 11 || !s.is_ascii() {
        return DateCheck::Rejected;
    }
    let sep = b[2];
    if (sep != b'-' && sep != b'/') || b[6] != sep {
        return DateCheck::Rejected;
    }
    let (day, month, year) = (&s[0..2], &s[3..6], &s[7..11]);
    if !day.bytes().all(|c| c.is_ascii_digit()) || !year.bytes().all(|c| c.is_ascii_digit()) {
        return DateCheck::Rejected;
    }
    let Some(month_idx) = MONTHS.iter().position(|m| m.eq_ignore_ascii_case(month)) else {
        return DateCheck::Rejected;
    };
    let (Ok(day), Ok(year)) = (day.parse::<u32>(), year.parse::<i32>()) else {
        return DateCheck::Rejected;
    };
    match NaiveDate::from_ymd_opt(year, month_idx as u32 + 1, day) {
        Some(date) => DateCheck::Canonical(format_canonical(date)),
        None => DateCheck::Rejected,
    }
}
