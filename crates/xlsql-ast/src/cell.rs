//! A1-style cell keys and column letter arithmetic

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellRefError {
    #[error("Cell key '{0}' has no column letters")]
    MissingColumn(String),

    #[error("Cell key '{0}' has no row number")]
    MissingRow(String),

    #[error("Cell key '{0}' has unexpected trailing characters")]
    TrailingCharacters(String),

    #[error("Cell key '{0}' is out of range")]
    OutOfRange(String),
}

/// A parsed cell key with its `$` anchors stripped
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRef {
    /// Upper-case column letters, e.g. `"BC"`
    pub column: String,
    /// 1-based column index (`A` = 1)
    pub column_index: u32,
    /// 1-based row number
    pub row: u32,
}

impl FromStr for CellRef {
    type Err = CellRefError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let mut chars = key.chars().peekable();

        if matches!(chars.peek(), Some('$')) {
            chars.next();
        }

        let mut column = String::new();
        while let Some(ch) = chars.peek().copied() {
            if ch.is_ascii_alphabetic() {
                column.push(ch.to_ascii_uppercase());
                chars.next();
            } else {
                break;
            }
        }
        if column.is_empty() {
            return Err(CellRefError::MissingColumn(key.to_string()));
        }

        if matches!(chars.peek(), Some('$')) {
            chars.next();
        }

        let mut digits = String::new();
        while let Some(ch) = chars.peek().copied() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                chars.next();
            } else {
                break;
            }
        }
        if digits.is_empty() {
            return Err(CellRefError::MissingRow(key.to_string()));
        }
        if chars.peek().is_some() {
            return Err(CellRefError::TrailingCharacters(key.to_string()));
        }

        let column_index =
            column_to_index(&column).ok_or_else(|| CellRefError::OutOfRange(key.to_string()))?;
        let row = digits
            .parse::<u32>()
            .ok()
            .filter(|row| *row > 0)
            .ok_or_else(|| CellRefError::OutOfRange(key.to_string()))?;

        Ok(CellRef {
            column,
            column_index,
            row,
        })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

/// Convert column letters to a 1-based index (`A` = 1, `Z` = 26, `AA` = 27).
///
/// Letters are case-insensitive. Returns `None` for empty input, non-letters
/// or overflow.
pub fn column_to_index(column: &str) -> Option<u32> {
    if column.is_empty() {
        return None;
    }
    let mut result: u32 = 0;
    for ch in column.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let value = (ch.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        result = result.checked_mul(26)?.checked_add(value)?;
    }
    Some(result)
}

/// Convert a 1-based index back to column letters. Index 0 yields an empty string.
pub fn index_to_column(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        index -= 1;
        letters.push((b'A' + (index % 26) as u8) as char);
        index /= 26;
    }
    letters.iter().rev().collect()
}

/// Column letters between two indexes, inclusive and in ascending order
/// whichever way round the bounds are given. Letters are produced on demand,
/// so callers can stop at the first one they cannot use.
pub fn column_span(start: u32, end: u32) -> impl Iterator<Item = String> {
    let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
    (lo..=hi).map(index_to_column)
}
