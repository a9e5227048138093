//! Business identifier → data-row index.

use crate::matcher::{MatchTier, MATCH_TIERS};
use crate::model::{cell_at, CellValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMatch {
    Found { index: usize, tier: MatchTier },
    NotFound,
}

impl RowMatch {
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Found { index, .. } => Some(*index),
            Self::NotFound => None,
        }
    }
}

/// Find the first data row whose identifier cell matches `value`.
///
/// `rows` are data rows only (header excluded). Duplicate identifiers are not
/// deduplicated: the first in document order wins.
pub fn locate_row(id_col: usize, value: &str, rows: &[Vec<CellValue>]) -> RowMatch {
    if value.trim().is_empty() {
        return RowMatch::NotFound;
    }
    for &tier in MATCH_TIERS {
        for (index, row) in rows.iter().enumerate() {
            let id = cell_at(row, id_col);
            if id.is_blank() {
                continue;
            }
            if tier.matches(&id.to_string(), value) {
                log::debug!("identifier '{value}' → data row {index} ({tier:?})");
                return RowMatch::Found { index, tier };
            }
        }
    }
    RowMatch::NotFound
}

/// Identifier values scanned during a lookup, for error diagnostics.
pub fn identifier_values(id_col: usize, rows: &[Vec<CellValue>]) -> Vec<String> {
    rows.iter()
        .map(|row| cell_at(row, id_col))
        .filter(|c| !c.is_blank())
        .map(|c| c.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(ids: &[&str]) -> Vec<Vec<CellValue>> {
        ids.iter()
            .map(|id| vec![CellValue::from(*id), CellValue::text("x")])
            .collect()
    }

    #[test]
    fn exact_match() {
        let data = rows(&["r1", "r2", "r3"]);
        assert_eq!(
            locate_row(0, "r2", &data),
            RowMatch::Found { index: 1, tier: MatchTier::Exact }
        );
    }

    #[test]
    fn normalized_match_trailing_space_and_case() {
        let data = rows(&["r0", "r1"]);
        assert_eq!(
            locate_row(0, "R1 ", &data),
            RowMatch::Found { index: 1, tier: MatchTier::Normalized }
        );
    }

    #[test]
    fn exact_beats_earlier_normalized() {
        let data = rows(&["R1", "r1"]);
        assert_eq!(locate_row(0, "r1", &data).index(), Some(1));
    }

    #[test]
    fn duplicates_first_wins() {
        let data = rows(&["a", "dup", "dup"]);
        assert_eq!(locate_row(0, "dup", &data).index(), Some(1));
    }

    #[test]
    fn numeric_identifiers_stringify() {
        let data = vec![vec![CellValue::Number(1001.0)], vec![CellValue::Number(1002.0)]];
        assert_eq!(locate_row(0, "1002", &data).index(), Some(1));
    }

    #[test]
    fn sparse_rows_and_blank_ids() {
        let data = vec![vec![], vec![CellValue::Empty, CellValue::text("r1")], vec![CellValue::text("r1")]];
        // Identifier column 1: row 1 holds "r1"; row 2 is too short.
        assert_eq!(locate_row(1, "r1", &data).index(), Some(1));
        assert_eq!(locate_row(0, "", &data), RowMatch::NotFound);
    }

    #[test]
    fn not_found_is_sentinel() {
        let data = rows(&["r1"]);
        assert_eq!(locate_row(0, "r999", &data), RowMatch::NotFound);
        assert_eq!(locate_row(0, "r999", &data).index(), None);
    }

    #[test]
    fn candidate_values() {
        let data = rows(&["r1", "", "r3"]);
        assert_eq!(identifier_values(0, &data), vec!["r1", "r3"]);
    }
}
