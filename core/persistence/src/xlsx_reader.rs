//! FILENAME: core/persistence/src/xlsx_reader.rs
//! PURPOSE: Loads worksheets from XLSX files into the engine's model.
//! CONTEXT: calamine supplies cell values and formulas; styles, dimensions and
//! merged ranges come from `xlsx_layout`. A cell exists in the loaded grid if
//! it has a value, a formula, or a non-default style. Date serials are always
//! returned in the 1900 date system.

use crate::xlsx_layout::{read_package, read_sheet_layout, PackageLayout, SheetEntry};
use crate::{PersistenceError, Sheet, Workbook};
use calamine::{open_workbook, CellErrorType, Data, Reader, Xlsx};
use engine::cell::{Cell, CellError, CellValue};
use engine::style::StyleTable;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use zip::ZipArchive;

type XlsxFile = Xlsx<BufReader<File>>;

/// Days between the 1900 and 1904 date system epochs.
pub const DATE1904_OFFSET: f64 = 1462.0;

/// Load every worksheet of the workbook at `path`.
pub fn load_xlsx(path: &Path) -> Result<Workbook, PersistenceError> {
    let mut source = SourceWorkbook::open(path)?;
    let entries = source.layout.sheets.clone();

    let mut sheets = Vec::with_capacity(entries.len());
    for entry in &entries {
        sheets.push(source.load(entry)?);
    }

    let active_sheet = source.layout.active_tab.min(sheets.len() - 1);
    Ok(Workbook {
        sheets,
        active_sheet,
    })
}

/// Load a single worksheet. `None` selects the sheet that was active when the
/// file was saved, falling back to the first sheet.
pub fn load_sheet(path: &Path, sheet_name: Option<&str>) -> Result<Sheet, PersistenceError> {
    let mut source = SourceWorkbook::open(path)?;
    let entry = match sheet_name {
        Some(name) => source
            .layout
            .sheets
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| PersistenceError::SheetNotFound(name.to_string()))?,
        None => source
            .layout
            .sheets
            .get(source.layout.active_tab)
            .or_else(|| source.layout.sheets.first())
            .cloned()
            .ok_or_else(|| {
                PersistenceError::InvalidFormat("Workbook contains no sheets".to_string())
            })?,
    };
    source.load(&entry)
}

// ============================================================================
// SOURCE WORKBOOK
// ============================================================================

struct SourceWorkbook {
    values: XlsxFile,
    archive: ZipArchive<BufReader<File>>,
    layout: PackageLayout,
    styles: StyleTable,
    unsupported_styles: HashSet<usize>,
}

impl SourceWorkbook {
    fn open(path: &Path) -> Result<Self, PersistenceError> {
        let values: XlsxFile = open_workbook(path)?;
        let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;
        let layout = read_package(&mut archive)?;

        if layout.sheets.is_empty() {
            return Err(PersistenceError::InvalidFormat(
                "Workbook contains no sheets".to_string(),
            ));
        }

        let unsupported_styles = layout
            .styles
            .iter()
            .enumerate()
            .filter(|(_, style)| style.is_none())
            .map(|(index, _)| index)
            .collect();
        let styles = StyleTable::from_styles(
            layout
                .styles
                .iter()
                .map(|style| style.clone().unwrap_or_default())
                .collect(),
        );

        Ok(SourceWorkbook {
            values,
            archive,
            layout,
            styles,
            unsupported_styles,
        })
    }

    fn load(&mut self, entry: &SheetEntry) -> Result<Sheet, PersistenceError> {
        let range = self.values.worksheet_range(&entry.name)?;
        let formulas = self.values.worksheet_formula(&entry.name)?;
        let layout = read_sheet_layout(&mut self.archive, &entry.path)?;

        let mut sheet = Sheet::new(entry.name.clone());
        sheet.styles = self.styles.clone();
        sheet.unsupported_styles = self.unsupported_styles.clone();
        sheet.column_widths = layout.column_widths;
        sheet.row_heights = layout.row_heights;
        sheet.merged_regions = layout.merged_regions;
        sheet.hyperlinks = layout.hyperlinks;
        sheet.notes = layout.notes;

        let style_of = |row: u32, col: u32| layout.cell_styles.get(&(row, col)).copied().unwrap_or(0);
        let date_shift = if self.layout.date1904 {
            DATE1904_OFFSET
        } else {
            0.0
        };

        if let Some((start_row, start_col)) = range.start() {
            for (r, c, data) in range.used_cells() {
                let (row, col) = (start_row + r as u32, start_col + c as u32);
                let style = style_of(row, col);
                let mut value = convert_data(data);
                if date_shift != 0.0 {
                    let date_styled = self.styles.get(style).map_or(false, |s| s.is_date_format());
                    value = shift_date(value, date_shift, date_styled);
                }
                sheet.grid.set_cell(row, col, Cell::new_value(value).with_style(style));
            }
        }

        if let Some((start_row, start_col)) = formulas.start() {
            for (r, c, text) in formulas.used_cells() {
                if text.is_empty() {
                    continue;
                }
                let (row, col) = (start_row + r as u32, start_col + c as u32);
                let cached = sheet
                    .grid
                    .get_cell(row, col)
                    .map(|cell| cell.value().clone())
                    .filter(|value| !value.is_empty());
                let cell = Cell::new_formula(text.clone(), cached).with_style(style_of(row, col));
                sheet.grid.set_cell(row, col, cell);
            }
        }

        // Styled cells without content (borders, fills on blanks).
        for (&(row, col), &style) in &layout.cell_styles {
            if sheet.grid.get_cell(row, col).is_none() {
                sheet.grid.set_cell(row, col, Cell::new().with_style(style));
            }
        }

        Ok(sheet)
    }
}

/// Move a serial onto the 1900 epoch. Plain numbers count as dates when
/// their style formats them as one.
fn shift_date(value: CellValue, shift: f64, date_styled: bool) -> CellValue {
    match value {
        CellValue::DateTime(serial) => CellValue::DateTime(serial + shift),
        CellValue::Number(n) if date_styled => CellValue::Number(n + shift),
        other => other,
    }
}

fn convert_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => CellValue::Error(convert_error(e)),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn convert_error(error: &CellErrorType) -> CellError {
    match error {
        CellErrorType::Div0 => CellError::Div0,
        CellErrorType::NA => CellError::NA,
        CellErrorType::Name => CellError::Name,
        CellErrorType::Null => CellError::Null,
        CellErrorType::Num => CellError::Num,
        CellErrorType::Ref => CellError::Ref,
        CellErrorType::Value => CellError::Value,
        CellErrorType::GettingData => CellError::GettingData,
    }
}
