//! FILENAME: tests/test_combine.rs
//! Integration tests for end-to-end combination runs.

mod common;

use combiner::{
    combine, CombinationConfig, ErrorKind, NoProgress, RunResult, SourceFile,
};
use common::{snapshot, RecordingSink, SalesFixture, TestHarness};
use engine::{Cell, CellValue};
use persistence::{Sheet, Workbook};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn sources(paths: &[std::path::PathBuf]) -> Vec<SourceFile> {
    paths.iter().map(SourceFile::new).collect()
}

fn expect_success(result: &RunResult) -> (u32, usize) {
    match result {
        RunResult::Success {
            rows_written,
            files_processed,
            ..
        } => (*rows_written, *files_processed),
        other => panic!("expected success, got {:?}", other),
    }
}

// ============================================================================
// ROW ACCOUNTING
// ============================================================================

#[test]
fn test_rows_from_all_files_are_stacked() {
    let harness = TestHarness::new();
    let paths = vec![
        harness.write_sales("north.xlsx", "North", 4),
        harness.write_sales("south.xlsx", "South", 6),
        harness.write_sales("east.xlsx", "East", 3),
    ];
    let output = harness.output_path();

    let result = combine(&sources(&paths), &CombinationConfig::default(), &output, &NoProgress);
    let (rows_written, files_processed) = expect_success(&result);

    // 5 rows from the first file, later files lose their header
    assert_eq!(rows_written, 5 + 6 + 3);
    assert_eq!(files_processed, 3);

    let combined = harness.load(&output);
    assert_eq!(combined.name, "Combined Data");
    assert_eq!(combined.row_count(), rows_written);
    assert_eq!(
        combined.grid.get_cell(0, 0).unwrap().value(),
        &CellValue::Text("Region".to_string())
    );
    assert_eq!(
        combined.grid.get_cell(5, 0).unwrap().value(),
        &CellValue::Text("South".to_string())
    );
    assert_eq!(
        combined.grid.get_cell(11, 0).unwrap().value(),
        &CellValue::Text("East".to_string())
    );
}

#[test]
fn test_per_file_rows_sum_to_total() {
    let harness = TestHarness::new();
    let paths = vec![
        harness.write_sales("a.xlsx", "A", 9),
        harness.write_sales("b.xlsx", "B", 2),
        harness.write_sales("c.xlsx", "C", 7),
    ];
    let config = CombinationConfig::default().with_header_rows(1, 2);
    let result = combine(&sources(&paths), &config, &harness.output_path(), &NoProgress);

    match result {
        RunResult::Success {
            rows_written,
            files,
            ..
        } => {
            let per_file: Vec<u32> = files.iter().map(|f| f.rows_copied).collect();
            assert_eq!(per_file, vec![10, 1, 6]);
            assert_eq!(per_file.iter().sum::<u32>(), rows_written);
            let offsets: Vec<u32> = files.iter().map(|f| f.first_output_row).collect();
            assert_eq!(offsets, vec![0, 10, 11]);
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[test]
fn test_discard_at_least_row_count_contributes_nothing() {
    let harness = TestHarness::new();
    let paths = vec![
        harness.write_sales("full.xlsx", "Full", 3),
        harness.write_sales("short.xlsx", "Short", 1),
    ];
    let config = CombinationConfig::default().with_header_rows(1, 2);
    let result = combine(&sources(&paths), &config, &harness.output_path(), &NoProgress);

    match result {
        RunResult::Success {
            rows_written,
            files,
            ..
        } => {
            assert_eq!(rows_written, 4);
            assert_eq!(files[1].rows_copied, 0);
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[test]
fn test_combination_is_idempotent() {
    let harness = TestHarness::new();
    let paths = vec![
        harness.write_sales("a.xlsx", "A", 5),
        harness.write_sales("b.xlsx", "B", 5),
    ];
    let first = harness.path("first.xlsx");
    let second = harness.path("second.xlsx");
    let config = CombinationConfig::default().with_filename_column(true);

    expect_success(&combine(&sources(&paths), &config, &first, &NoProgress));
    expect_success(&combine(&sources(&paths), &config, &second, &NoProgress));

    let first = harness.load(&first);
    let second = harness.load(&second);
    assert_eq!(snapshot(&first), snapshot(&second));
    for (row, col, cell) in first.grid.iter() {
        let other = second.grid.get_cell(row, col).unwrap();
        assert_eq!(
            first.resolve_style(cell.style_index),
            second.resolve_style(other.style_index)
        );
    }
}

// ============================================================================
// VALUES AND FORMULAS
// ============================================================================

#[test]
fn test_static_values_round_trip() {
    let harness = TestHarness::new();
    let mut sheet = Sheet::new("Values".to_string());
    let date_style = sheet
        .styles
        .push(engine::CellStyle::new().with_number_format("yyyy-mm-dd"));
    sheet.grid.set_cell(0, 0, Cell::new_text("Header".to_string()));
    sheet.grid.set_cell(1, 0, Cell::new_number(-12.75));
    sheet.grid.set_cell(1, 1, Cell::new_text("héllo, wörld".to_string()));
    sheet.grid.set_cell(1, 2, Cell::new_boolean(false));
    sheet.grid.set_cell(
        1,
        3,
        Cell::new_value(CellValue::DateTime(45292.0)).with_style(date_style),
    );
    let path = harness.write_sheet("values.xlsx", sheet);
    let output = harness.output_path();

    expect_success(&combine(
        &[SourceFile::new(&path)],
        &CombinationConfig::default(),
        &output,
        &NoProgress,
    ));

    let combined = harness.load(&output);
    let value = |r, c| combined.grid.get_cell(r, c).unwrap().value().clone();
    assert_eq!(value(1, 0), CellValue::Number(-12.75));
    assert_eq!(value(1, 1), CellValue::Text("héllo, wörld".to_string()));
    assert_eq!(value(1, 2), CellValue::Boolean(false));
    assert_eq!(value(1, 3), CellValue::DateTime(45292.0));
}

fn formula_source(harness: &TestHarness) -> std::path::PathBuf {
    let mut sheet = Sheet::new("Calc".to_string());
    sheet.grid.set_cell(0, 0, Cell::new_number(3.0));
    sheet.grid.set_cell(0, 1, Cell::new_number(4.0));
    sheet.grid.set_cell(
        0,
        2,
        Cell::new_formula("=A1+B1".to_string(), Some(CellValue::Number(7.0))),
    );
    harness.write_sheet("calc.xlsx", sheet)
}

#[test]
fn test_formulas_become_cached_values() {
    let harness = TestHarness::new();
    let path = formula_source(&harness);
    let output = harness.output_path();
    let config = CombinationConfig::default().with_preserve_formulas(false);

    let result = combine(&[SourceFile::new(&path)], &config, &output, &NoProgress);
    match &result {
        RunResult::Success { warnings, .. } => assert!(warnings.is_empty()),
        other => panic!("expected success, got {:?}", other),
    }

    let combined = harness.load(&output);
    let cell = combined.grid.get_cell(0, 2).unwrap();
    assert_eq!(cell.formula(), None);
    assert_eq!(cell.value(), &CellValue::Number(7.0));
}

#[test]
fn test_formulas_are_preserved() {
    let harness = TestHarness::new();
    let path = formula_source(&harness);
    let output = harness.output_path();

    expect_success(&combine(
        &[SourceFile::new(&path)],
        &CombinationConfig::default(),
        &output,
        &NoProgress,
    ));

    let combined = harness.load(&output);
    let cell = combined.grid.get_cell(0, 2).unwrap();
    assert_eq!(cell.formula(), Some("=A1+B1"));
    assert_eq!(cell.value(), &CellValue::Number(7.0));
}

// ============================================================================
// FILENAME COLUMN
// ============================================================================

#[test]
fn test_filename_column_tags_every_row() {
    let harness = TestHarness::new();
    let paths = vec![
        harness.write_sales("north.xlsx", "North", 2),
        harness.write_sales("south.xlsx", "South", 3),
    ];
    let output = harness.output_path();
    let config = CombinationConfig::default().with_filename_column(true);

    expect_success(&combine(&sources(&paths), &config, &output, &NoProgress));

    let combined = harness.load(&output);
    assert_eq!(combined.grid.column_count(), SalesFixture::headers().len() as u32 + 1);
    let names: Vec<CellValue> = (0..combined.row_count())
        .map(|row| combined.grid.get_cell(row, 0).unwrap().value().clone())
        .collect();
    let expected: Vec<CellValue> = ["north.xlsx"; 3]
        .iter()
        .chain(["south.xlsx"; 3].iter())
        .map(|name| CellValue::Text(name.to_string()))
        .collect();
    assert_eq!(names, expected);
    assert_eq!(
        combined.grid.get_cell(0, 1).unwrap().value(),
        &CellValue::Text("Region".to_string())
    );
}

// ============================================================================
// SHEET SELECTION
// ============================================================================

#[test]
fn test_active_sheet_is_read_by_default() {
    let harness = TestHarness::new();
    let mut notes = Sheet::new("Notes".to_string());
    notes.grid.set_cell(0, 0, Cell::new_text("ignore me".to_string()));
    let workbook = Workbook {
        sheets: vec![notes, SalesFixture::sheet("West", 2)],
        active_sheet: 1,
    };
    let path = harness.write_workbook("west.xlsx", workbook);
    let output = harness.output_path();

    expect_success(&combine(
        &[SourceFile::new(&path)],
        &CombinationConfig::default(),
        &output,
        &NoProgress,
    ));
    let combined = harness.load(&output);
    assert_eq!(
        combined.grid.get_cell(1, 0).unwrap().value(),
        &CellValue::Text("West".to_string())
    );

    let notes_output = harness.path("notes_only.xlsx");
    expect_success(&combine(
        &[SourceFile::new(&path).with_sheet("Notes")],
        &CombinationConfig::default(),
        &notes_output,
        &NoProgress,
    ));
    let combined = harness.load(&notes_output);
    assert_eq!(
        combined.grid.get_cell(0, 0).unwrap().value(),
        &CellValue::Text("ignore me".to_string())
    );
}

#[test]
fn test_unknown_sheet_is_unreadable_source() {
    let harness = TestHarness::new();
    let path = harness.write_sales("a.xlsx", "A", 1);
    let result = combine(
        &[SourceFile::new(&path).with_sheet("Missing")],
        &CombinationConfig::default(),
        &harness.output_path(),
        &NoProgress,
    );
    assert!(matches!(
        result,
        RunResult::Failed {
            kind: ErrorKind::UnreadableSource,
            ..
        }
    ));
}

// ============================================================================
// FAILURES AND PROGRESS
// ============================================================================

#[test]
fn test_missing_source_fails_without_output() {
    let harness = TestHarness::new();
    let present = harness.write_sales("present.xlsx", "P", 2);
    let missing = harness.path("missing.xlsx");
    let output = harness.output_path();

    let result = combine(
        &sources(&[present, missing.clone()]),
        &CombinationConfig::default(),
        &output,
        &NoProgress,
    );

    match &result {
        RunResult::Failed { kind, file, .. } => {
            assert_eq!(*kind, ErrorKind::UnreadableSource);
            assert_eq!(file.as_ref(), Some(&missing));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(result.summary().starts_with("An error occurred: "));
    assert!(!output.exists());
}

#[test]
fn test_status_and_progress_messages() {
    let harness = TestHarness::new();
    let paths = vec![
        harness.write_sales("one.xlsx", "One", 1),
        harness.write_sales("two.xlsx", "Two", 1),
    ];
    let sink = RecordingSink::new();

    let result = combine(
        &sources(&paths),
        &CombinationConfig::default(),
        &harness.output_path(),
        &sink,
    );
    assert_eq!(result.summary(), "Successfully combined 2 files.");

    assert_eq!(
        *sink.statuses.borrow(),
        vec![
            "Processing file 1/2: one.xlsx".to_string(),
            "Processing file 2/2: two.xlsx".to_string(),
            "Saving combined file...".to_string(),
        ]
    );
    assert_eq!(
        *sink.progress.borrow(),
        vec![
            (1, 2, "one.xlsx".to_string()),
            (2, 2, "two.xlsx".to_string()),
        ]
    );
}
