//! FILENAME: core/combiner/src/progress.rs
//! PURPOSE: Progress reporting and cooperative cancellation for a run.
//! CONTEXT: The engine calls the sink between files only. Implementations
//! must be cheap; a UI would forward to its own event loop.

use crate::result::RunResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

pub trait ProgressSink {
    /// `file_index` counts completed files (1-based).
    fn on_progress(&self, file_index: usize, total_files: usize, file_name: &str);

    fn on_status(&self, _text: &str) {}

    fn is_cancellation_requested(&self) -> bool;
}

/// Sink that reports nothing and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _file_index: usize, _total_files: usize, _file_name: &str) {}

    fn is_cancellation_requested(&self) -> bool {
        false
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Messages sent by a background run.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Status(String),
    FileCompleted {
        file_index: usize,
        total_files: usize,
        file_name: String,
    },
    Finished(RunResult),
}

/// Forwards progress over a channel and reads cancellation from a token.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: Sender<ProgressEvent>,
    cancel: CancellationToken,
}

impl ChannelProgress {
    pub fn new(tx: Sender<ProgressEvent>, cancel: CancellationToken) -> Self {
        ChannelProgress { tx, cancel }
    }
}

impl ProgressSink for ChannelProgress {
    fn on_progress(&self, file_index: usize, total_files: usize, file_name: &str) {
        // A dropped receiver only means nobody is listening.
        let _ = self.tx.send(ProgressEvent::FileCompleted {
            file_index,
            total_files,
            file_name: file_name.to_string(),
        });
    }

    fn on_status(&self, text: &str) {
        let _ = self.tx.send(ProgressEvent::Status(text.to_string()));
    }

    fn is_cancellation_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
