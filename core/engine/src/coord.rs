//! FILENAME: core/engine/src/coord.rs
//! PURPOSE: Utilities for converting between spreadsheet coordinate formats.
//! CONTEXT: Converts between A1-style notation (e.g., "A1", "AA100", "B2:D4")
//! and the 0-based (row, col) indices used internally, and defines the merged
//! region rectangle. Column "A" = 0, "B" = 1, ..., "Z" = 25, "AA" = 26, etc.
//! Row 1 in A1 notation = row 0 internally.

use serde::{Deserialize, Serialize};

/// A cell coordinate as (row, col) with 0-based indices.
pub type CellCoord = (u32, u32);

/// Last addressable row of a worksheet (row 1,048,576).
pub const MAX_ROW: u32 = 1_048_575;
/// Last addressable column of a worksheet (column XFD).
pub const MAX_COL: u32 = 16_383;

/// Converts a column string (e.g., "A", "AA", "ABC") to a 0-based column index.
/// Returns None for empty input or non-alphabetic characters.
pub fn col_to_index(col_str: &str) -> Option<u32> {
    if col_str.is_empty() {
        return None;
    }
    let mut result: u32 = 0;
    for c in col_str.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        result = result.checked_mul(26)?.checked_add(digit)?;
    }
    Some(result - 1)
}

/// Converts a 0-based column index to a column string.
/// 0 -> "A", 1 -> "B", ..., 25 -> "Z", 26 -> "AA", 27 -> "AB", etc.
pub fn index_to_col(mut col_index: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = col_index % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col_index < 26 {
            break;
        }
        col_index = col_index / 26 - 1;
    }
    result
}

/// Parses an A1-style reference ("B12", "$B$12") into a 0-based coordinate.
pub fn parse_a1(reference: &str) -> Option<CellCoord> {
    let reference = reference.trim().replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (col_part, row_part) = reference.split_at(split);
    let col = col_to_index(col_part)?;
    let row: u32 = row_part.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col))
}

/// Converts a 0-based (row, col) coordinate to an A1-style reference string.
/// (0, 0) -> "A1", (1, 1) -> "B2", (99, 26) -> "AA100"
pub fn coord_to_a1(coord: CellCoord) -> String {
    let (row, col) = coord;
    format!("{}{}", index_to_col(col), row + 1)
}

// ============================================================================
// MERGED REGIONS
// ============================================================================

/// A rectangular block of cells presented as one logical cell.
/// Bounds are 0-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MergedRegion {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl MergedRegion {
    /// Build a region from two corners in any order.
    pub fn new(a: CellCoord, b: CellCoord) -> Self {
        MergedRegion {
            start_row: a.0.min(b.0),
            start_col: a.1.min(b.1),
            end_row: a.0.max(b.0),
            end_col: a.1.max(b.1),
        }
    }

    /// Parses a range reference such as "A1:C3".
    pub fn from_a1(range: &str) -> Option<Self> {
        let (first, last) = range.split_once(':')?;
        Some(MergedRegion::new(parse_a1(first)?, parse_a1(last)?))
    }

    pub fn to_a1(&self) -> String {
        format!(
            "{}:{}",
            coord_to_a1((self.start_row, self.start_col)),
            coord_to_a1((self.end_row, self.end_col))
        )
    }

    pub fn is_single_cell(&self) -> bool {
        self.start_row == self.end_row && self.start_col == self.end_col
    }

    /// True for the top-left cell, which carries the region's value.
    pub fn is_anchor(&self, row: u32, col: u32) -> bool {
        row == self.start_row && col == self.start_col
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.start_row && row <= self.end_row && col >= self.start_col && col <= self.end_col
    }

    /// Restrict the region to rows `first..=last`. None if nothing remains.
    pub fn clip_rows(&self, first: u32, last: u32) -> Option<Self> {
        let start_row = self.start_row.max(first);
        let end_row = self.end_row.min(last);
        if start_row > end_row {
            return None;
        }
        Some(MergedRegion {
            start_row,
            end_row,
            ..*self
        })
    }

    /// Cut the region off at column `last`. None if it starts beyond it.
    pub fn clip_cols(&self, last: u32) -> Option<Self> {
        if self.start_col > last {
            return None;
        }
        Some(MergedRegion {
            end_col: self.end_col.min(last),
            ..*self
        })
    }

    /// Move the region so that `from_row` lands on `to_row`, and shift columns right.
    pub fn rebase(&self, from_row: u32, to_row: u32, col_shift: u32) -> Self {
        MergedRegion {
            start_row: self.start_row - from_row + to_row,
            start_col: self.start_col + col_shift,
            end_row: self.end_row - from_row + to_row,
            end_col: self.end_col + col_shift,
        }
    }
}
