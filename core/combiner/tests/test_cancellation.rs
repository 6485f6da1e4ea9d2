//! FILENAME: tests/test_cancellation.rs
//! Integration tests for cooperative cancellation and the background worker.

mod common;

use combiner::{
    spawn_combine, CancellationToken, CombinationConfig, CombinationEngine, EngineState,
    ProgressEvent, RunResult, SourceFile,
};
use common::{RecordingSink, TestHarness};

fn three_sources(harness: &TestHarness) -> Vec<SourceFile> {
    vec![
        SourceFile::new(harness.write_sales("one.xlsx", "One", 9)),
        SourceFile::new(harness.write_sales("two.xlsx", "Two", 9)),
        SourceFile::new(harness.write_sales("three.xlsx", "Three", 9)),
    ]
}

#[test]
fn test_cancel_after_first_file_discards_output() {
    let harness = TestHarness::new();
    let sources = three_sources(&harness);
    let output = harness.output_path();
    let sink = RecordingSink::cancelling_after(1);

    let mut engine = CombinationEngine::new(CombinationConfig::default());
    let result = engine.run(&sources, &output, &sink);

    assert_eq!(result, RunResult::Cancelled { rows_written: 10 });
    assert_eq!(result.summary(), "Operation cancelled by user.");
    assert_eq!(engine.state(), EngineState::Cancelled);
    assert!(!output.exists());
    // the second file was never started
    assert_eq!(sink.progress.borrow().len(), 1);
    assert_eq!(
        *sink.statuses.borrow(),
        vec!["Processing file 1/3: one.xlsx".to_string()]
    );
}

#[test]
fn test_cancel_after_last_file_still_saves() {
    let harness = TestHarness::new();
    let sources = three_sources(&harness);
    let output = harness.output_path();
    let sink = RecordingSink::cancelling_after(3);

    let mut engine = CombinationEngine::new(CombinationConfig::default());
    let result = engine.run(&sources, &output, &sink);

    assert!(result.is_success());
    assert_eq!(result.rows_written(), 10 + 9 + 9);
    assert!(output.exists());
}

#[test]
fn test_worker_reports_progress_and_result() {
    let harness = TestHarness::new();
    let sources = three_sources(&harness);
    let output = harness.output_path();

    let handle = spawn_combine(
        sources,
        CombinationConfig::default(),
        output.clone(),
        CancellationToken::new(),
    );
    let events: Vec<ProgressEvent> = handle.events().iter().collect();
    let result = handle.join();

    assert!(result.is_success());
    let completed: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::FileCompleted { file_index, .. } => Some(*file_index),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![1, 2, 3]);
    assert_eq!(events.last(), Some(&ProgressEvent::Finished(result)));
    assert!(output.exists());
}

#[test]
fn test_worker_cancel_from_caller() {
    let harness = TestHarness::new();
    let sources = three_sources(&harness);
    let output = harness.output_path();
    let token = CancellationToken::new();

    let handle = spawn_combine(
        sources,
        CombinationConfig::default(),
        output.clone(),
        token.clone(),
    );
    // Cancel as soon as the first file is reported.
    let mut finished = None;
    for event in handle.events().iter() {
        match event {
            ProgressEvent::FileCompleted { .. } => handle.cancel(),
            ProgressEvent::Finished(result) => finished = Some(result),
            ProgressEvent::Status(_) => {}
        }
    }
    let result = handle.join();

    assert_eq!(finished, Some(result.clone()));
    assert!(token.is_cancelled());
    // The worker may have started the next file before seeing the flag.
    match result {
        RunResult::Cancelled { rows_written } => {
            assert!(rows_written == 10 || rows_written == 19);
            assert!(!output.exists());
        }
        RunResult::Success { .. } => assert!(output.exists()),
        other => panic!("unexpected result {:?}", other),
    }
}
