//! FILENAME: core/combiner/src/result.rs
//! PURPOSE: Outcome types returned by a combination run.
//! CONTEXT: Cancellation is an outcome, not an error. Cell- and row-level
//! problems are collected as warnings on a successful run; file- and
//! destination-level problems end the run as `Failed`.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Classification of everything that can go wrong during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// A source could not be opened or parsed.
    UnreadableSource,
    /// The output could not be written.
    UnwritableDestination,
    /// A source style could not be reproduced; the cell keeps its value
    /// with the default style.
    UnsupportedStyleDescriptor,
    /// A formula without a cached result was asked to be materialized as a value.
    MissingCachedFormulaValue,
    InternalInvariantViolation,
}

impl ErrorKind {
    /// Recoverable kinds are reported as warnings and never end a run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorKind::UnsupportedStyleDescriptor | ErrorKind::MissingCachedFormulaValue
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::UnreadableSource => "unreadable source",
            ErrorKind::UnwritableDestination => "unwritable destination",
            ErrorKind::UnsupportedStyleDescriptor => "unsupported style",
            ErrorKind::MissingCachedFormulaValue => "missing cached formula value",
            ErrorKind::InternalInvariantViolation => "internal invariant violation",
        };
        f.write_str(text)
    }
}

/// A recoverable issue found while copying one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyWarning {
    pub kind: ErrorKind,
    /// Display name of the source file.
    pub file: String,
    /// Position in the source sheet (0-based).
    pub row: u32,
    pub col: u32,
    pub message: String,
}

impl fmt::Display for CopyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.file,
            engine::coord_to_a1((self.row, self.col)),
            self.message
        )
    }
}

/// Per-file statistics of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub display_name: String,
    pub path: PathBuf,
    pub rows_copied: u32,
    pub cells_copied: usize,
    pub merges_copied: usize,
    /// First output row this file's rows were written to.
    pub first_output_row: u32,
}

/// Final outcome of a combination run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RunResult {
    #[serde(rename_all = "camelCase")]
    Success {
        output_path: PathBuf,
        rows_written: u32,
        files_processed: usize,
        files: Vec<FileReport>,
        warnings: Vec<CopyWarning>,
    },
    #[serde(rename_all = "camelCase")]
    Cancelled { rows_written: u32 },
    #[serde(rename_all = "camelCase")]
    Failed {
        kind: ErrorKind,
        message: String,
        file: Option<PathBuf>,
    },
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Success { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunResult::Cancelled { .. })
    }

    /// Rows emitted before the run ended. Zero for failed runs.
    pub fn rows_written(&self) -> u32 {
        match self {
            RunResult::Success { rows_written, .. } | RunResult::Cancelled { rows_written } => {
                *rows_written
            }
            RunResult::Failed { .. } => 0,
        }
    }

    /// Completion text suitable for showing to a user as-is.
    pub fn summary(&self) -> String {
        match self {
            RunResult::Success {
                files_processed, ..
            } => format!("Successfully combined {} files.", files_processed),
            RunResult::Cancelled { .. } => "Operation cancelled by user.".to_string(),
            RunResult::Failed { message, .. } => format!("An error occurred: {}", message),
        }
    }
}
