//! Cell reference parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style cell references
//! (e.g., "A1", "$B$2", "Sheet1!AA100", "'Q1 Sales'!C3") and zero-indexed
//! column/row coordinates. Formula references may also carry a default value
//! (`A1||0`) used when the referenced cell disappears during rendering.
//!
//! # Examples
//!
//! ```ignore
//! let cell = CellRef::from_str("B3").unwrap();
//! assert_eq!(cell.col, 1);  // 0-indexed
//! assert_eq!(cell.row, 2);
//! assert_eq!(cell.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// Separator between a reference and its default value.
const DEFAULT_VALUE_SEPARATOR: &str = "||";

/// A reference to a cell by column and row indices (0-indexed).
///
/// Equality and hashing ignore `default_value`: two references to the same
/// cell with different defaults are the same reference.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CellRef {
    pub sheet: Option<String>,
    pub row: usize,
    pub col: usize,
    pub row_absolute: bool,
    pub col_absolute: bool,
    pub default_value: Option<String>,
}

impl CellRef {
    pub fn new(col: usize, row: usize) -> CellRef {
        CellRef {
            sheet: None,
            row,
            col,
            row_absolute: false,
            col_absolute: false,
            default_value: None,
        }
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> CellRef {
        self.sheet = Some(sheet.into());
        self
    }

    /// Parse a cell reference from spreadsheet notation (e.g., "A1", "$B2", "AA10||0").
    /// The sheet qualifier is not part of this grammar; see [`CellRef::with_sheet`].
    /// Returns None if the input is invalid.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<CellRef> {
        Self::parse_a1(name)
    }

    fn parse_a1(name: &str) -> Option<CellRef> {
        let caps = a1_re().captures(name)?;
        let letters = &caps["letters"];
        let numbers = &caps["numbers"];

        let mut col_acc = 0usize;
        for c in letters.to_ascii_uppercase().bytes() {
            let digit = (c - b'A') as usize + 1;
            col_acc = col_acc.checked_mul(26)?.checked_add(digit)?;
        }
        let col = col_acc.checked_sub(1)?;

        let row = numbers.parse::<usize>().ok()?.checked_sub(1)?;

        Some(CellRef {
            sheet: None,
            row,
            col,
            row_absolute: caps.name("row_abs").is_some(),
            col_absolute: caps.name("col_abs").is_some(),
            default_value: caps.name("default").map(|m| m.as_str().to_string()),
        })
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u128 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }

    /// Format this reference's column/row (with `$` markers) at another position.
    pub fn format_at(&self, col: usize, row: usize) -> String {
        format!(
            "{}{}{}{}",
            if self.col_absolute { "$" } else { "" },
            CellRef::col_to_letters(col),
            if self.row_absolute { "$" } else { "" },
            row + 1
        )
    }

    /// Sheet prefix as it appears in formula text, including the `!`.
    pub fn sheet_prefix(&self) -> String {
        match &self.sheet {
            Some(sheet) => format!("{}!", quote_sheet_name(sheet)),
            None => String::new(),
        }
    }
}

/// Quote a sheet name when it contains anything besides ASCII alphanumerics and `_`.
pub fn quote_sheet_name(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

fn a1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r"^(?<col_abs>\$)?(?<letters>[A-Za-z]+)(?<row_abs>\$)?(?<numbers>[0-9]+)(?:{}(?<default>.*))?$",
            regex::escape(DEFAULT_VALUE_SEPARATOR)
        );
        Regex::new(&pattern).expect("A1 reference regex must compile")
    })
}

impl PartialEq for CellRef {
    fn eq(&self, other: &Self) -> bool {
        self.sheet == other.sheet
            && self.row == other.row
            && self.col == other.col
            && self.row_absolute == other.row_absolute
            && self.col_absolute == other.col_absolute
    }
}

impl Eq for CellRef {}

impl Hash for CellRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sheet.hash(state);
        self.row.hash(state);
        self.col.hash(state);
        self.row_absolute.hash(state);
        self.col_absolute.hash(state);
    }
}

impl std::str::FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.sheet_prefix(), self.format_at(self.col, self.row))
    }
}

#[cfg(test)]
mod tests {
    use super::CellRef;

    #[test]
    fn test_from_str_single_and_multi_letter_columns() {
        let a1 = CellRef::from_str("A1").unwrap();
        assert_eq!((a1.col, a1.row), (0, 0));
        let z1 = CellRef::from_str("Z1").unwrap();
        assert_eq!(z1.col, 25);
        let aa10 = CellRef::from_str("aa10").unwrap();
        assert_eq!((aa10.col, aa10.row), (26, 9));
    }

    #[test]
    fn test_from_str_invalid_inputs() {
        assert!(CellRef::from_str("").is_none());
        assert!(CellRef::from_str("123").is_none());
        assert!(CellRef::from_str("ABC").is_none());
        assert!(CellRef::from_str("A0").is_none());
        assert!(CellRef::from_str("1A").is_none());
        assert!(CellRef::from_str("A 1").is_none());
        assert!(CellRef::from_str("$$A1").is_none());
    }

    #[test]
    fn test_absolute_markers_round_trip() {
        let r = CellRef::from_str("$C$7").unwrap();
        assert!(r.col_absolute && r.row_absolute);
        assert_eq!(r.to_string(), "$C$7");
        let mixed = CellRef::from_str("C$7").unwrap();
        assert!(!mixed.col_absolute && mixed.row_absolute);
        assert_eq!(mixed.format_at(3, 9), "D$10");
    }

    #[test]
    fn test_default_value() {
        let r = CellRef::from_str("B2||0").unwrap();
        assert_eq!(r.default_value.as_deref(), Some("0"));
        assert_eq!(r, CellRef::from_str("B2").unwrap());
        assert_eq!(r.to_string(), "B2");
        let piped = CellRef::from_str("B2||a|b").unwrap();
        assert_eq!(piped.default_value.as_deref(), Some("a|b"));
        assert!(CellRef::from_str("B2|0").is_none());
    }

    #[test]
    fn test_sheet_prefix_quotes_when_needed() {
        let plain = CellRef::new(0, 0).with_sheet("Sheet1");
        assert_eq!(plain.to_string(), "Sheet1!A1");
        let spaced = CellRef::new(1, 1).with_sheet("Q1 Sales");
        assert_eq!(spaced.to_string(), "'Q1 Sales'!B2");
        assert_ne!(plain, CellRef::new(0, 0));
    }

    #[test]
    fn test_parse_a1_overflow_returns_none() {
        let huge = format!("{}1", "Z".repeat(40));
        assert!(CellRef::from_str(&huge).is_none());
    }

    #[test]
    fn test_col_to_letters_handles_max_usize() {
        let letters = CellRef::col_to_letters(usize::MAX);
        assert!(!letters.is_empty());
        assert!(letters.chars().all(|c| c.is_ascii_uppercase()));
    }
}
