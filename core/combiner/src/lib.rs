//! FILENAME: core/combiner/src/lib.rs
//! CombineXL Combination Engine
//!
//! Merges the worksheets of many XLSX files, in caller-defined order, into a
//! single worksheet. Values, formulas, styles, merged ranges, column widths
//! and row heights are carried over; header rows of later files can be
//! dropped and each row can be tagged with its source file name.

pub mod config;
pub mod engine;
mod error;
pub mod header_policy;
pub mod progress;
pub mod result;
pub mod sheet_copier;
pub mod worker;

pub use config::{CombinationConfig, CopyMode, DEFAULT_OUTPUT_SHEET_NAME};
pub use engine::{
    combine, default_output_path, default_output_path_at, CombinationEngine, EngineState,
    SourceFile,
};
pub use error::CombineError;
pub use header_policy::HeaderPolicy;
pub use progress::{CancellationToken, ChannelProgress, NoProgress, ProgressEvent, ProgressSink};
pub use result::{CopyWarning, ErrorKind, FileReport, RunResult};
pub use sheet_copier::{CopyStats, SheetCopier, SourceSheet};
pub use worker::{spawn_combine, RunHandle};
