//! FILENAME: core/persistence/src/lib.rs
//! CombineXL Persistence Module
//!
//! Loads worksheets from XLSX containers (values and formulas through calamine,
//! styles, merges and dimensions straight from the package XML) and saves
//! worksheets back to XLSX through rust_xlsxwriter.

mod error;
mod xlsx_layout;
mod xlsx_reader;
mod xlsx_styles;
mod xlsx_writer;

pub use error::PersistenceError;
pub use xlsx_reader::{load_sheet, load_xlsx};
pub use xlsx_writer::save_xlsx;

use engine::annotation::{Hyperlink, Note};
use engine::coord::MergedRegion;
use engine::grid::Grid;
use engine::style::{CellStyle, StyleTable};
use std::collections::{HashMap, HashSet};

// ============================================================================
// WORKBOOK
// ============================================================================

/// Represents a complete workbook that can be saved/loaded
#[derive(Debug, Clone)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
    pub active_sheet: usize,
}

impl Workbook {
    pub fn new() -> Self {
        Self {
            sheets: vec![Sheet::new("Sheet1".to_string())],
            active_sheet: 0,
        }
    }

    pub fn from_sheet(sheet: Sheet) -> Self {
        Self {
            sheets: vec![sheet],
            active_sheet: 0,
        }
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// COLUMN WIDTHS
// ============================================================================

/// A width applied to the inclusive, 0-based column range `first..=last`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpan {
    pub first: u32,
    pub last: u32,
    /// Width in the container's character units.
    pub width: f64,
}

impl ColumnSpan {
    pub fn new(first: u32, last: u32, width: f64) -> Self {
        ColumnSpan {
            first: first.min(last),
            last: first.max(last),
            width,
        }
    }

    pub fn contains(&self, col: u32) -> bool {
        col >= self.first && col <= self.last
    }
}

// ============================================================================
// SHEET
// ============================================================================

/// Represents a single worksheet
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub grid: Grid,
    /// Column widths as non-overlapping ranges.
    pub column_widths: Vec<ColumnSpan>,
    /// Row heights in points.
    pub row_heights: HashMap<u32, f64>,
    pub styles: StyleTable,
    pub merged_regions: Vec<MergedRegion>,
    /// Style indices the reader could not turn into a descriptor.
    pub unsupported_styles: HashSet<usize>,
    pub hyperlinks: Vec<Hyperlink>,
    pub notes: Vec<Note>,
}

impl Sheet {
    pub fn new(name: String) -> Self {
        Self {
            name,
            grid: Grid::new(),
            column_widths: Vec::new(),
            row_heights: HashMap::new(),
            styles: StyleTable::new(),
            merged_regions: Vec::new(),
            unsupported_styles: HashSet::new(),
            hyperlinks: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Number of rows up to and including the last populated cell.
    pub fn row_count(&self) -> u32 {
        self.grid.row_count()
    }

    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.column_widths
            .iter()
            .find(|span| span.contains(col))
            .map(|span| span.width)
    }

    /// Set the width of `first..=last`, replacing whatever covered those columns.
    pub fn set_column_widths(&mut self, first: u32, last: u32, width: f64) {
        let span = ColumnSpan::new(first, last, width);
        let mut kept = Vec::with_capacity(self.column_widths.len() + 1);
        for existing in self.column_widths.drain(..) {
            if existing.last < span.first || existing.first > span.last {
                kept.push(existing);
                continue;
            }
            if existing.first < span.first {
                kept.push(ColumnSpan::new(existing.first, span.first - 1, existing.width));
            }
            if existing.last > span.last {
                kept.push(ColumnSpan::new(span.last + 1, existing.last, existing.width));
            }
        }
        kept.push(span);
        self.column_widths = kept;
    }

    pub fn set_column_width(&mut self, col: u32, width: f64) {
        self.set_column_widths(col, col, width);
    }

    /// Give `width` to the columns of `first..=last` that have no width yet.
    /// Returns the number of spans added.
    pub fn fill_column_widths(&mut self, first: u32, last: u32, width: f64) -> usize {
        let mut covered: Vec<(u32, u32)> = self
            .column_widths
            .iter()
            .filter(|span| span.last >= first && span.first <= last)
            .map(|span| (span.first, span.last))
            .collect();
        covered.sort_unstable();

        let mut gaps = Vec::new();
        let mut next = first;
        let mut done = false;
        for (start, end) in covered {
            if start > next {
                gaps.push(ColumnSpan::new(next, start - 1, width));
            }
            if end >= last {
                done = true;
                break;
            }
            next = next.max(end + 1);
        }
        if !done && next <= last {
            gaps.push(ColumnSpan::new(next, last, width));
        }

        let added = gaps.len();
        self.column_widths.extend(gaps);
        added
    }

    /// Look up a usable style descriptor. None when the index is outside the
    /// style table or the reader could not resolve it.
    pub fn resolve_style(&self, index: usize) -> Option<&CellStyle> {
        if self.unsupported_styles.contains(&index) {
            return None;
        }
        self.styles.get(index)
    }
}
