//! Logical (data-row, column) positions to A1 addresses and back.

use std::fmt;

use serde::Serialize;

/// Rows above the first data row (the header).
pub const HEADER_ROWS: usize = 1;

/// 0-based column index to spreadsheet letters (0 → A, 25 → Z, 26 → AA).
pub fn column_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Spreadsheet letters to 0-based column index. Case-insensitive.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    Some(n - 1)
}

/// 0-based data-row index to the store's 1-based row number.
pub fn row_number(data_index: usize) -> usize {
    data_index + HEADER_ROWS + 1
}

/// A cell position in store-native terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// 1-based store row number.
    pub row: usize,
    /// 0-based column index.
    pub col: usize,
}

impl CellAddress {
    pub fn for_data_cell(data_index: usize, col: usize) -> Self {
        Self { row: row_number(data_index), col }
    }

    pub fn a1(&self) -> String {
        self.to_string()
    }

    /// Index into a full-sheet row list (header at 0).
    pub fn sheet_row_index(&self) -> usize {
        self.row - 1
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

impl Serialize for CellAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Sheet-qualified range (`Projects!B3`, `'Site Survey'!B3`).
pub fn qualified_range(sheet: &str, a1: &str) -> String {
    let plain = !sheet.is_empty()
        && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !sheet.starts_with(|c: char| c.is_ascii_digit());
    if plain {
        format!("{sheet}!{a1}")
    } else {
        format!("'{}'!{a1}", sheet.replace('\'', "''"))
    }
}

/// Range covering every row from A1 through `last_column`.
pub fn full_read_range(last_column: &str) -> String {
    format!("A1:{}", last_column.to_ascii_uppercase())
}

/// A parsed `A1:ZZ` / `B2:D10` range. `end_row` is `None` for open-ended ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: Option<usize>,
    pub end_col: usize,
}

impl RangeSpec {
    pub fn parse(spec: &str) -> Option<Self> {
        let (start, end) = spec.split_once(':')?;
        let (start_col, start_row) = split_ref(start)?;
        let (end_col, end_row) = split_ref(end)?;
        let start_row = start_row.unwrap_or(1);
        if start_row == 0 || end_col < start_col {
            return None;
        }
        if let Some(end_row) = end_row {
            if end_row < start_row {
                return None;
            }
        }
        Some(Self { start_row, start_col, end_row, end_col })
    }
}

fn split_ref(s: &str) -> Option<(usize, Option<usize>)> {
    let s = s.trim();
    let split = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
    let (letters, digits) = s.split_at(split);
    let col = column_index(letters)?;
    let row = if digits.is_empty() {
        None
    } else {
        Some(digits.parse().ok()?)
    };
    Some((col, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn col_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(51), "AZ");
        assert_eq!(column_letters(52), "BA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn letters_round_trip_past_z() {
        for col in [0, 25, 26, 27, 51, 52, 701, 702, 18277] {
            assert_eq!(column_index(&column_letters(col)), Some(col));
        }
        assert_eq!(column_index("zz"), Some(701));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn data_rows_skip_header_and_are_one_based() {
        assert_eq!(row_number(0), 2);
        assert_eq!(row_number(9), 11);
        assert_eq!(CellAddress::for_data_cell(0, 2).a1(), "C2");
        assert_eq!(CellAddress::for_data_cell(3, 28).a1(), "AC5");
        assert_eq!(CellAddress::for_data_cell(0, 2).sheet_row_index(), 1);
    }

    #[test]
    fn qualified_ranges_quote_when_needed() {
        assert_eq!(qualified_range("Projects", "B3"), "Projects!B3");
        assert_eq!(qualified_range("Site Survey", "B3"), "'Site Survey'!B3");
        assert_eq!(qualified_range("Bob's", "A1:ZZ"), "'Bob''s'!A1:ZZ");
        assert_eq!(qualified_range("2024", "A1"), "'2024'!A1");
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(
            RangeSpec::parse("A1:ZZ"),
            Some(RangeSpec { start_row: 1, start_col: 0, end_row: None, end_col: 701 })
        );
        assert_eq!(
            RangeSpec::parse("b2:d10"),
            Some(RangeSpec { start_row: 2, start_col: 1, end_row: Some(10), end_col: 3 })
        );
        assert_eq!(RangeSpec::parse("D1:A5"), None);
        assert_eq!(RangeSpec::parse("A5:B2"), None);
        assert_eq!(RangeSpec::parse("A1"), None);
        assert_eq!(full_read_range("zz"), "A1:ZZ");
    }
}
