//! FILENAME: core/engine/src/grid.rs
//! PURPOSE: Manages the collection of cells (The Spreadsheet Grid).
//! CONTEXT: Sparse storage keyed by (row, col). The map is ordered so a sheet
//! can be streamed row by row, in ascending column order, without sorting.

use crate::cell::Cell;
use std::collections::BTreeMap;
use std::ops::Range;

/// Row and Col are 0-based indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    cells: BTreeMap<(u32, u32), Cell>,

    /// Tracks the highest column index currently in use.
    max_col: Option<u32>,
}

impl Grid {
    /// Creates a new, empty Grid.
    pub fn new() -> Self {
        Grid {
            cells: BTreeMap::new(),
            max_col: None,
        }
    }

    /// Sets a cell at the specified coordinates, replacing any previous cell.
    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) {
        self.max_col = Some(self.max_col.map_or(col, |m| m.max(col)));
        self.cells.insert((row, col), cell);
    }

    /// Returns None if the cell is not stored.
    pub fn get_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Number of stored cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of rows up to and including the last populated one.
    pub fn row_count(&self) -> u32 {
        self.cells
            .keys()
            .next_back()
            .map_or(0, |&(row, _)| row + 1)
    }

    /// Number of columns up to and including the widest populated one.
    pub fn column_count(&self) -> u32 {
        self.max_col.map_or(0, |c| c + 1)
    }

    /// Cells of one row in ascending column order.
    pub fn row(&self, row: u32) -> impl Iterator<Item = (u32, &Cell)> {
        self.cells
            .range((row, 0)..=(row, u32::MAX))
            .map(|(&(_, col), cell)| (col, cell))
    }

    /// All cells whose row falls in `rows`, in (row, col) order.
    pub fn rows(&self, rows: Range<u32>) -> impl Iterator<Item = (u32, u32, &Cell)> {
        let start = (rows.start, 0);
        // BTreeMap::range panics on inverted bounds
        let end = if rows.start < rows.end { (rows.end, 0) } else { start };
        self.cells
            .range(start..end)
            .map(|(&(row, col), cell)| (row, col, cell))
    }

    /// All cells in (row, col) order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, &Cell)> {
        self.cells.iter().map(|(&(row, col), cell)| (row, col, cell))
    }
}
