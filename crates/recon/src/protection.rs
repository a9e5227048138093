//! Field-level write protection.
//!
//! Rules, in priority order:
//! 1. The identifier column is never written. It anchors every future lookup.
//! 2. A protected-date column is writable only while its current value is blank.
//! 3. Everything else is writable.

use std::collections::HashMap;

use crate::matcher::{contains, MatchTier};
use crate::model::{CellValue, ColumnType, SkipReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Identifier,
    ProtectedDate,
    Ordinary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    Writable,
    IdentifierProtected,
    DateProtected,
}

impl Protection {
    pub fn skip_reason(self) -> Option<SkipReason> {
        match self {
            Self::Writable => None,
            Self::IdentifierProtected => Some(SkipReason::IdentifierProtected),
            Self::DateProtected => Some(SkipReason::DateProtected),
        }
    }
}

/// Column classification for one sheet, built fresh per call.
#[derive(Debug, Clone)]
pub struct ProtectionPolicy {
    identifier: String,
    protected_dates: Vec<String>,
}

impl ProtectionPolicy {
    pub fn new<I, S>(identifier: impl Into<String>, protected_dates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifier: identifier.into(),
            protected_dates: protected_dates.into_iter().map(Into::into).collect(),
        }
    }

    /// Policy from settings-provider column types plus statically configured names.
    pub fn from_column_types(
        identifier: impl Into<String>,
        types: &HashMap<String, ColumnType>,
        extra_dates: &[String],
    ) -> Self {
        let mut dates: Vec<String> = types
            .iter()
            .filter(|(_, t)| **t == ColumnType::Date)
            .map(|(name, _)| name.clone())
            .collect();
        dates.sort();
        for name in extra_dates {
            if !contains(&dates, name) {
                dates.push(name.clone());
            }
        }
        Self::new(identifier, dates)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn protected_dates(&self) -> &[String] {
        &self.protected_dates
    }

    pub fn kind(&self, column: &str) -> ColumnKind {
        if is_same_column(&self.identifier, column) {
            ColumnKind::Identifier
        } else if contains(&self.protected_dates, column) {
            ColumnKind::ProtectedDate
        } else {
            ColumnKind::Ordinary
        }
    }

    /// Date-shaped columns get their candidates normalized and validated.
    pub fn is_date_column(&self, column: &str) -> bool {
        self.kind(column) == ColumnKind::ProtectedDate
    }

    pub fn check(&self, column: &str, current: &CellValue) -> Protection {
        match self.kind(column) {
            ColumnKind::Identifier => Protection::IdentifierProtected,
            ColumnKind::ProtectedDate if !current.is_blank() => Protection::DateProtected,
            ColumnKind::ProtectedDate | ColumnKind::Ordinary => Protection::Writable,
        }
    }
}

fn is_same_column(a: &str, b: &str) -> bool {
    !a.trim().is_empty() && (MatchTier::Exact.matches(a, b) || MatchTier::Normalized.matches(a, b))
}
