//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Spreadsheet data model shared by the persistence and combiner crates.
//! CONTEXT: Re-exports public types and modules for use by other crates.

pub mod annotation;
pub mod cell;
pub mod coord;
pub mod grid;
pub mod style;

// Re-export commonly used types at the crate root
pub use annotation::{Hyperlink, LinkTarget, Note};
pub use cell::{Cell, CellContent, CellError, CellValue};
pub use coord::{
    coord_to_a1, col_to_index, index_to_col, parse_a1, CellCoord, MergedRegion, MAX_COL,
    MAX_ROW,
};
pub use grid::Grid;
pub use style::{
    is_date_format_code, Alignment, BorderLineStyle, BorderStyle, Borders, CellStyle, Color,
    ColorRef, FillPattern, FillStyle, FontScript, FontSize, FontStyle, Protection, StyleRegistry,
    StyleTable, TextAlign, TextRotation, Underline, VerticalAlign,
};
