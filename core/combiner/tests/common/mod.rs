//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for combiner integration tests.
//! Source workbooks are real XLSX files written into a temporary directory.

#![allow(dead_code)]

use combiner::ProgressSink;
use engine::{Cell, CellStyle, CellValue, Color, FillStyle};
use persistence::{load_sheet, save_xlsx, Sheet, Workbook};
use std::cell::{Cell as Flag, RefCell};
use std::path::PathBuf;
use tempfile::TempDir;

/// Install a test logger once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Owns a temporary directory holding source and output workbooks.
pub struct TestHarness {
    pub dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        init_logging();
        TestHarness {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn output_path(&self) -> PathBuf {
        self.path("combined.xlsx")
    }

    pub fn write_sheet(&self, name: &str, sheet: Sheet) -> PathBuf {
        self.write_workbook(name, Workbook::from_sheet(sheet))
    }

    pub fn write_workbook(&self, name: &str, workbook: Workbook) -> PathBuf {
        let path = self.path(name);
        save_xlsx(&workbook, &path).expect("write fixture workbook");
        path
    }

    /// A header row plus `data_rows` rows of sales data tagged with `region`.
    pub fn write_sales(&self, name: &str, region: &str, data_rows: usize) -> PathBuf {
        self.write_sheet(name, SalesFixture::sheet(region, data_rows))
    }

    pub fn load(&self, path: &PathBuf) -> Sheet {
        load_sheet(path, None).expect("load workbook")
    }
}

/// Region / product / units sales table with a bold, filled header row.
pub struct SalesFixture;

impl SalesFixture {
    pub fn headers() -> Vec<&'static str> {
        vec!["Region", "Product", "Units"]
    }

    pub fn products() -> Vec<&'static str> {
        vec!["Widget", "Gadget", "Gizmo", "Doohickey"]
    }

    pub fn header_style() -> CellStyle {
        CellStyle::new()
            .with_bold(true)
            .with_fill(FillStyle::solid(Color::new(221, 235, 247)))
    }

    pub fn sheet(region: &str, data_rows: usize) -> Sheet {
        let mut sheet = Sheet::new("Sales".to_string());
        let header = sheet.styles.push(Self::header_style());
        for (col, title) in Self::headers().iter().enumerate() {
            sheet
                .grid
                .set_cell(0, col as u32, Cell::new_text(title.to_string()).with_style(header));
        }
        let products = Self::products();
        for i in 0..data_rows {
            let row = (i + 1) as u32;
            sheet.grid.set_cell(row, 0, Cell::new_text(region.to_string()));
            sheet
                .grid
                .set_cell(row, 1, Cell::new_text(products[i % products.len()].to_string()));
            sheet.grid.set_cell(row, 2, Cell::new_number((i * 10) as f64));
        }
        sheet
    }
}

/// Text form of every cell value, for comparing whole sheets.
pub fn snapshot(sheet: &Sheet) -> Vec<(u32, u32, CellValue)> {
    sheet
        .grid
        .iter()
        .map(|(row, col, cell)| (row, col, cell.value().clone()))
        .collect()
}

/// Records everything the engine reports and cancels once `cancel_after`
/// files have completed.
pub struct RecordingSink {
    cancel_after: Option<usize>,
    cancelled: Flag<bool>,
    pub statuses: RefCell<Vec<String>>,
    pub progress: RefCell<Vec<(usize, usize, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink {
            cancel_after: None,
            cancelled: Flag::new(false),
            statuses: RefCell::new(Vec::new()),
            progress: RefCell::new(Vec::new()),
        }
    }

    pub fn cancelling_after(files: usize) -> Self {
        RecordingSink {
            cancel_after: Some(files),
            ..Self::new()
        }
    }
}

impl ProgressSink for RecordingSink {
    fn on_progress(&self, file_index: usize, total_files: usize, file_name: &str) {
        self.progress
            .borrow_mut()
            .push((file_index, total_files, file_name.to_string()));
        if self.cancel_after == Some(file_index) {
            self.cancelled.set(true);
        }
    }

    fn on_status(&self, text: &str) {
        self.statuses.borrow_mut().push(text.to_string());
    }

    fn is_cancellation_requested(&self) -> bool {
        self.cancelled.get()
    }
}
