//! A1-style addressing for the spreadsheet collaborator.

use crate::utils::error::{EnrichError, Result};
use std::fmt;

/// A single cell, e.g. `Sheet1!C3`. Rows are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub sheet: String,
    pub column: String,
    pub row: u32,
}

impl CellRef {
    pub fn new(sheet: impl Into<String>, column: impl Into<String>, row: u32) -> Self {
        Self {
            sheet: sheet.into(),
            column: column.into(),
            row,
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}{}", self.sheet, self.column, self.row)
    }
}

/// A rectangular range such as `Sheet1!B2:B`; a missing end row means "to the last row".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRef {
    pub sheet: String,
    pub start_column: String,
    pub start_row: u32,
    pub end_column: String,
    pub end_row: Option<u32>,
}

impl RangeRef {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| EnrichError::InvalidConfigValueError {
            field: "range".to_string(),
            value: input.to_string(),
            reason: reason.to_string(),
        };

        let (sheet, cells) = input
            .split_once('!')
            .ok_or_else(|| invalid("expected <sheet>!<start>:<end>"))?;
        if sheet.trim().is_empty() {
            return Err(invalid("sheet name is empty"));
        }

        let (start, end) = cells.split_once(':').unwrap_or((cells, cells));
        let (start_column, start_row) = split_cell(start).ok_or_else(|| invalid("bad start cell"))?;
        let (end_column, end_row) = split_cell(end).ok_or_else(|| invalid("bad end cell"))?;
        let start_row = start_row.unwrap_or(1);

        let first = column_index(&start_column).ok_or_else(|| invalid("start column is out of range"))?;
        let last = column_index(&end_column).ok_or_else(|| invalid("end column is out of range"))?;
        if last < first {
            return Err(invalid("end column precedes start column"));
        }
        if matches!(end_row, Some(end) if end < start_row) {
            return Err(invalid("end row precedes start row"));
        }

        Ok(Self {
            sheet: sheet.to_string(),
            start_column,
            start_row,
            end_column,
            end_row,
        })
    }

    /// Parsed ranges always carry valid labels; a hand-built one with a bad label
    /// yields an empty span.
    pub fn column_span(&self) -> std::ops::RangeInclusive<usize> {
        match (column_index(&self.start_column), column_index(&self.end_column)) {
            (Some(first), Some(last)) => first..=last,
            #[allow(clippy::reversed_empty_ranges)]
            _ => 1..=0,
        }
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}{}:{}", self.sheet, self.start_column, self.start_row, self.end_column)?;
        if let Some(end_row) = self.end_row {
            write!(f, "{}", end_row)?;
        }
        Ok(())
    }
}

fn split_cell(cell: &str) -> Option<(String, Option<u32>)> {
    let cell = cell.trim();
    let digits_at = cell.find(|c: char| c.is_ascii_digit()).unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(digits_at);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let row = if digits.is_empty() {
        None
    } else {
        Some(digits.parse::<u32>().ok().filter(|r| *r > 0)?)
    };
    Some((letters.to_ascii_uppercase(), row))
}

/// 0-based index of a column label: `A` -> 0, `Z` -> 25, `AA` -> 26. `None` for
/// anything that is not a plain letter label or would not fit in `usize`.
pub fn column_index(label: &str) -> Option<usize> {
    if label.is_empty() {
        return None;
    }
    label
        .bytes()
        .try_fold(0usize, |acc, b| {
            if !b.is_ascii_alphabetic() {
                return None;
            }
            let digit = (b.to_ascii_uppercase() - b'A') as usize + 1;
            acc.checked_mul(26)?.checked_add(digit)
        })
        .map(|n| n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_ref_display() {
        assert_eq!(CellRef::new("Sheet1", "AF", 3).to_string(), "Sheet1!AF3");
    }

    #[test]
    fn test_parse_open_ended_range() {
        let range = RangeRef::parse("Sheet1!B2:B").unwrap();
        assert_eq!(range.sheet, "Sheet1");
        assert_eq!(range.start_column, "B");
        assert_eq!(range.start_row, 2);
        assert_eq!(range.end_row, None);
        assert_eq!(range.column_span(), 1..=1);
        assert_eq!(range.to_string(), "Sheet1!B2:B");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(RangeRef::parse("B2:B").is_err());
        assert!(RangeRef::parse("Sheet1!2:B").is_err());
        assert!(RangeRef::parse("Sheet1!C2:B").is_err());
        assert!(RangeRef::parse("Sheet1!B5:B2").is_err());
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("C"), Some(2));
        assert_eq!(column_index("z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("AJ"), Some(35));
    }

    #[test]
    fn test_column_index_rejects_bad_labels() {
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_index("@"), None);
        assert_eq!(column_index(&"Z".repeat(40)), None);
        assert!(RangeRef::parse(&format!("Sheet1!{}2:B", "Z".repeat(40))).is_err());
    }
}
