//! Tiered name matching shared by every lookup in the engine.
//!
//! Row identifiers, header names, record keys, protected-date column names
//! and settings-sheet names all drift between import sources and the sheet
//! ("RowId" vs "rowid ", "R1 " vs "r1"). Every comparison goes through the
//! same ordered tier list: an exact hit anywhere beats a normalized hit.

use serde::Serialize;

/// One matching strategy. Tiers are tried in `MATCH_TIERS` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Byte-for-byte equality.
    Exact,
    /// Trimmed, upper-cased, internal whitespace collapsed.
    Normalized,
}

pub const MATCH_TIERS: &[MatchTier] = &[MatchTier::Exact, MatchTier::Normalized];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMatch {
    pub index: usize,
    pub tier: MatchTier,
}

/// Canonical comparison key: trim, collapse whitespace runs, upper-case.
pub fn normalize_key(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

impl MatchTier {
    pub fn matches(self, candidate: &str, needle: &str) -> bool {
        match self {
            Self::Exact => candidate == needle,
            Self::Normalized => normalize_key(candidate) == normalize_key(needle),
        }
    }
}

/// First candidate matching `needle`, trying each tier over the whole list
/// before moving to the next. Blank needles and blank candidates never match.
pub fn find_first<I, S>(candidates: I, needle: &str) -> Option<KeyMatch>
where
    I: IntoIterator<Item = S>,
    I::IntoIter: Clone,
    S: AsRef<str>,
{
    if needle.trim().is_empty() {
        return None;
    }
    let iter = candidates.into_iter();
    for &tier in MATCH_TIERS {
        let hit = iter
            .clone()
            .enumerate()
            .find(|(_, c)| !c.as_ref().trim().is_empty() && tier.matches(c.as_ref(), needle));
        if let Some((index, _)) = hit {
            return Some(KeyMatch { index, tier });
        }
    }
    None
}

/// True when `needle` matches any candidate under some tier.
pub fn contains<I, S>(candidates: I, needle: &str) -> bool
where
    I: IntoIterator<Item = S>,
    I::IntoIter: Clone,
    S: AsRef<str>,
{
    find_first(candidates, needle).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_uppercases() {
        assert_eq!(normalize_key("  survey   date "), "SURVEY DATE");
        assert_eq!(normalize_key("R1 "), "R1");
        assert_eq!(normalize_key("a\tb"), "A B");
    }

    #[test]
    fn exact_tier_wins_over_earlier_normalized_hit() {
        // "rowid" normalizes to the needle first, but the exact hit is later.
        let cols = ["rowid", "RowId"];
        let m = find_first(cols, "RowId").unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.tier, MatchTier::Exact);
    }

    #[test]
    fn normalized_tier_used_when_no_exact() {
        let ids = ["r0", "r1", "r2"];
        let m = find_first(ids, "R1 ").unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.tier, MatchTier::Normalized);
    }

    #[test]
    fn duplicates_resolve_to_first_in_document_order() {
        let ids = ["a", "dup", "b", "dup"];
        assert_eq!(find_first(ids, "dup").unwrap().index, 1);
    }

    #[test]
    fn blanks_never_match() {
        assert!(find_first(["", "  "], "").is_none());
        assert!(find_first(["", "x"], "   ").is_none());
        assert!(!contains(["", "  "], " "));
    }

    #[test]
    fn no_match() {
        assert!(find_first(["Name", "Survey"], "Install").is_none());
    }
}
