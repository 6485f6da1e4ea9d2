//! FILENAME: core/combiner/src/sheet_copier.rs
//! PURPOSE: Copies a row range of one worksheet into the combined worksheet.
//! CONTEXT: Called once per source file by the engine with the next free
//! output row. Styles are re-homed into the destination style table: one new
//! entry per styled cell in Standard mode, one entry per distinct descriptor
//! in Optimized mode (through the run's StyleRegistry). Anything pushed past
//! column XFD by the filename column is dropped with a warning.

use crate::config::{CombinationConfig, CopyMode};
use crate::result::{CopyWarning, ErrorKind};
use engine::cell::{Cell, CellContent, CellValue};
use engine::coord::MAX_COL;
use engine::style::StyleRegistry;
use log::warn;
use persistence::Sheet;
use std::ops::Range;
use std::path::PathBuf;

/// A loaded source worksheet together with the name it is reported under.
#[derive(Debug, Clone)]
pub struct SourceSheet {
    pub display_name: String,
    pub path: PathBuf,
    pub sheet: Sheet,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CopyStats {
    pub rows_copied: u32,
    pub cells_copied: usize,
    pub merges_copied: usize,
    pub hyperlinks_copied: usize,
    pub notes_copied: usize,
    pub warnings: Vec<CopyWarning>,
}

#[derive(Debug)]
pub struct SheetCopier {
    mode: CopyMode,
    preserve_formulas: bool,
    add_filename_column: bool,
    registry: StyleRegistry,
}

impl SheetCopier {
    pub fn new(config: &CombinationConfig) -> Self {
        SheetCopier {
            mode: config.mode,
            preserve_formulas: config.preserve_formulas,
            add_filename_column: config.add_source_filename_column,
            registry: StyleRegistry::with_default(),
        }
    }

    pub fn registry(&self) -> &StyleRegistry {
        &self.registry
    }

    fn col_shift(&self) -> u32 {
        u32::from(self.add_filename_column)
    }

    /// Copy `rows` of `source` so that `rows.start` lands on `dest_row_offset`.
    pub fn copy_rows(
        &mut self,
        source: &SourceSheet,
        rows: Range<u32>,
        destination: &mut Sheet,
        dest_row_offset: u32,
    ) -> CopyStats {
        let mut stats = CopyStats::default();
        if rows.is_empty() {
            return stats;
        }
        let col_shift = self.col_shift();
        let to_dest_row = |row: u32| dest_row_offset + (row - rows.start);

        if self.add_filename_column {
            for row in rows.clone() {
                destination.grid.set_cell(
                    to_dest_row(row),
                    0,
                    Cell::new_text(source.display_name.clone()),
                );
            }
        }

        let mut dropped_cells = 0usize;
        for (row, col, cell) in source.sheet.grid.rows(rows.clone()) {
            let dest_col = col + col_shift;
            if dest_col > MAX_COL {
                dropped_cells += 1;
                continue;
            }
            let content = match self.apply_formula_policy(cell) {
                Ok(content) => content,
                Err(warning) => {
                    stats.warnings.push(CopyWarning {
                        file: source.display_name.clone(),
                        row,
                        col,
                        ..warning
                    });
                    CellContent::Value(CellValue::Empty)
                }
            };

            let style_index = if cell.style_index == 0 {
                0
            } else {
                match source.sheet.resolve_style(cell.style_index) {
                    Some(style) => match self.mode {
                        CopyMode::Standard => destination.styles.push(style.clone()),
                        CopyMode::Optimized => self.registry.intern(style, &mut destination.styles),
                    },
                    None => {
                        stats.warnings.push(CopyWarning {
                            kind: ErrorKind::UnsupportedStyleDescriptor,
                            file: source.display_name.clone(),
                            row,
                            col,
                            message: format!(
                                "style {} cannot be reproduced, default style used",
                                cell.style_index
                            ),
                        });
                        0
                    }
                }
            };

            destination.grid.set_cell(
                to_dest_row(row),
                dest_col,
                Cell {
                    content,
                    style_index,
                },
            );
            stats.cells_copied += 1;
        }

        let last_row = rows.end - 1;
        for region in &source.sheet.merged_regions {
            let Some(clipped) = region.clip_rows(rows.start, last_row) else {
                continue;
            };
            let Some(moved) = clipped
                .rebase(rows.start, dest_row_offset, col_shift)
                .clip_cols(MAX_COL)
            else {
                continue;
            };
            if moved.is_single_cell() {
                continue;
            }
            destination.merged_regions.push(moved);
            stats.merges_copied += 1;
        }

        for link in &source.sheet.hyperlinks {
            if !rows.contains(&link.row) {
                continue;
            }
            let dest_col = link.col + col_shift;
            if dest_col > MAX_COL {
                dropped_cells += 1;
                continue;
            }
            destination
                .hyperlinks
                .push(link.moved_to(to_dest_row(link.row), dest_col));
            stats.hyperlinks_copied += 1;
        }
        for note in &source.sheet.notes {
            if !rows.contains(&note.row) {
                continue;
            }
            let dest_col = note.col + col_shift;
            if dest_col > MAX_COL {
                dropped_cells += 1;
                continue;
            }
            destination
                .notes
                .push(note.moved_to(to_dest_row(note.row), dest_col));
            stats.notes_copied += 1;
        }

        if dropped_cells > 0 {
            warn!(
                "{}: {} cell entries beyond column XFD dropped after the filename column shift",
                source.display_name, dropped_cells
            );
        }

        for span in &source.sheet.column_widths {
            let first = span.first + col_shift;
            if first > MAX_COL {
                warn!(
                    "{}: column width beyond column XFD dropped",
                    source.display_name
                );
                continue;
            }
            let last = span.last + col_shift;
            if last > MAX_COL {
                warn!(
                    "{}: column width range clipped at column XFD",
                    source.display_name
                );
            }
            destination.fill_column_widths(first, last.min(MAX_COL), span.width);
        }
        for row in rows.clone() {
            if let Some(&height) = source.sheet.row_heights.get(&row) {
                destination
                    .row_heights
                    .entry(to_dest_row(row))
                    .or_insert(height);
            }
        }

        for warning in &stats.warnings {
            warn!("{}", warning);
        }

        stats.rows_copied = rows.end - rows.start;
        stats
    }

    /// The content to write for `cell`. Err carries a warning template when a
    /// formula has to become a value but has no cached result.
    fn apply_formula_policy(&self, cell: &Cell) -> Result<CellContent, CopyWarning> {
        match &cell.content {
            CellContent::Formula { cached, text } if !self.preserve_formulas => match cached {
                Some(value) => Ok(CellContent::Value(value.clone())),
                None => Err(CopyWarning {
                    kind: ErrorKind::MissingCachedFormulaValue,
                    file: String::new(),
                    row: 0,
                    col: 0,
                    message: format!("formula {} has no cached value, left empty", text),
                }),
            },
            content => Ok(content.clone()),
        }
    }
}
