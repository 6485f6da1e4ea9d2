//! FILENAME: core/combiner/src/worker.rs
//! PURPOSE: Runs a combination on a background thread.
//! CONTEXT: Progress arrives on an mpsc channel; the last event of every run
//! is `ProgressEvent::Finished`. The caller keeps a clone of the cancellation
//! token to stop the run between files.

use crate::config::CombinationConfig;
use crate::engine::{combine, SourceFile};
use crate::progress::{CancellationToken, ChannelProgress, ProgressEvent};
use crate::result::{ErrorKind, RunResult};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

pub struct RunHandle {
    events: Receiver<ProgressEvent>,
    cancel: CancellationToken,
    join: JoinHandle<RunResult>,
}

impl RunHandle {
    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run to end.
    pub fn join(self) -> RunResult {
        self.join.join().unwrap_or_else(|_| RunResult::Failed {
            kind: ErrorKind::InternalInvariantViolation,
            message: "combination worker panicked".to_string(),
            file: None,
        })
    }
}

pub fn spawn_combine(
    sources: Vec<SourceFile>,
    config: CombinationConfig,
    output_path: PathBuf,
    cancel: CancellationToken,
) -> RunHandle {
    let (tx, rx) = mpsc::channel();
    let sink = ChannelProgress::new(tx.clone(), cancel.clone());

    let join = thread::spawn(move || {
        let result = combine(&sources, &config, &output_path, &sink);
        let _ = tx.send(ProgressEvent::Finished(result.clone()));
        result
    });

    RunHandle {
        events: rx,
        cancel,
        join,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_cancelled_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.xlsx");
        let token = CancellationToken::new();
        token.cancel();

        let handle = spawn_combine(
            vec![SourceFile::new(dir.path().join("a.xlsx"))],
            CombinationConfig::default(),
            output.clone(),
            token,
        );
        let events: Vec<ProgressEvent> = handle.events().iter().collect();
        let result = handle.join();

        assert_eq!(result, RunResult::Cancelled { rows_written: 0 });
        assert_eq!(events, vec![ProgressEvent::Finished(result)]);
        assert!(!output.exists());
    }

    #[test]
    fn test_failure_is_reported_as_final_event() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.xlsx");
        let handle = spawn_combine(
            vec![SourceFile::new(&missing)],
            CombinationConfig::default(),
            dir.path().join("out.xlsx"),
            CancellationToken::new(),
        );
        let last = handle.events().iter().last();
        let result = handle.join();

        assert!(matches!(
            result,
            RunResult::Failed {
                kind: ErrorKind::UnreadableSource,
                ..
            }
        ));
        assert_eq!(last, Some(ProgressEvent::Finished(result)));
    }
}
