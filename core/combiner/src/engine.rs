//! FILENAME: core/combiner/src/engine.rs
//! PURPOSE: Orchestrates a combination run over an ordered list of sources.
//! CONTEXT: The combined worksheet is built in memory and written once at the
//! end, so a cancelled or failed run leaves nothing at the output path.
//! Cancellation is polled before each file; a file is copied entirely or not
//! at all.

use crate::config::CombinationConfig;
use crate::header_policy::HeaderPolicy;
use crate::progress::ProgressSink;
use crate::result::{ErrorKind, FileReport, RunResult};
use crate::sheet_copier::{SheetCopier, SourceSheet};
use crate::CombineError;
use chrono::{Local, NaiveDateTime};
use log::{debug, error, info};
use persistence::{load_sheet, save_xlsx, Sheet, Workbook};
use std::path::{Path, PathBuf};

/// One input workbook, in combination order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Name used for progress, warnings and the filename column.
    pub display_name: String,
    /// Worksheet to read. None selects the workbook's active sheet.
    pub sheet: Option<String>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        SourceFile {
            path,
            display_name,
            sheet: None,
        }
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = name.to_string();
        self
    }

    pub fn with_sheet(mut self, sheet: &str) -> Self {
        self.sheet = Some(sheet.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Runs a single combination. An engine instance is spent after one run.
#[derive(Debug)]
pub struct CombinationEngine {
    config: CombinationConfig,
    state: EngineState,
}

impl CombinationEngine {
    pub fn new(config: CombinationConfig) -> Self {
        CombinationEngine {
            config,
            state: EngineState::Idle,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &CombinationConfig {
        &self.config
    }

    pub fn run(
        &mut self,
        sources: &[SourceFile],
        output_path: &Path,
        sink: &dyn ProgressSink,
    ) -> RunResult {
        if self.state != EngineState::Idle {
            return RunResult::Failed {
                kind: ErrorKind::InternalInvariantViolation,
                message: format!("engine already ran (state {:?})", self.state),
                file: None,
            };
        }
        self.state = EngineState::Running;

        let result = match self.execute(sources, output_path, sink) {
            Ok(result) => result,
            Err(e) => {
                error!("Combination failed: {}", e);
                RunResult::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                    file: e.file(),
                }
            }
        };

        self.state = match result {
            RunResult::Success { .. } => EngineState::Completed,
            RunResult::Cancelled { .. } => EngineState::Cancelled,
            RunResult::Failed { .. } => EngineState::Failed,
        };
        result
    }

    fn execute(
        &self,
        sources: &[SourceFile],
        output_path: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, CombineError> {
        self.config.validate()?;
        if sources.is_empty() {
            return Err(CombineError::InvalidState(
                "no source files to combine".to_string(),
            ));
        }
        let output_dir = match output_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        if !output_dir.is_dir() {
            return Err(CombineError::UnwritableDestination {
                path: output_path.to_path_buf(),
                message: format!("directory {} does not exist", output_dir.display()),
            });
        }

        let total = sources.len();
        let policy = HeaderPolicy::from_config(&self.config);
        let mut copier = SheetCopier::new(&self.config);
        let mut output = Sheet::new(self.config.output_sheet_name.clone());
        let mut row_offset: u32 = 0;
        let mut files = Vec::with_capacity(total);
        let mut warnings = Vec::new();

        info!(
            "Combining {} files into {} ({:?} mode)",
            total,
            output_path.display(),
            self.config.mode
        );

        for (index, source) in sources.iter().enumerate() {
            if sink.is_cancellation_requested() {
                info!("Cancelled before file {}/{}", index + 1, total);
                return Ok(RunResult::Cancelled {
                    rows_written: row_offset,
                });
            }

            sink.on_status(&format!(
                "Processing file {}/{}: {}",
                index + 1,
                total,
                source.display_name
            ));
            info!("Processing file {}/{}: {}", index + 1, total, source.path.display());

            let sheet = load_sheet(&source.path, source.sheet.as_deref()).map_err(|e| {
                CombineError::UnreadableSource {
                    path: source.path.clone(),
                    source: e,
                }
            })?;
            let source_sheet = SourceSheet {
                display_name: source.display_name.clone(),
                path: source.path.clone(),
                sheet,
            };

            let rows = policy.emitted_rows(index, source_sheet.sheet.row_count());
            let stats = copier.copy_rows(&source_sheet, rows, &mut output, row_offset);
            debug!(
                "{}: {} rows, {} cells, {} merges, {} links, {} notes, {} warnings",
                source.display_name,
                stats.rows_copied,
                stats.cells_copied,
                stats.merges_copied,
                stats.hyperlinks_copied,
                stats.notes_copied,
                stats.warnings.len()
            );

            files.push(FileReport {
                display_name: source.display_name.clone(),
                path: source.path.clone(),
                rows_copied: stats.rows_copied,
                cells_copied: stats.cells_copied,
                merges_copied: stats.merges_copied,
                first_output_row: row_offset,
            });
            row_offset = row_offset.checked_add(stats.rows_copied).ok_or_else(|| {
                CombineError::InvalidState("output row offset overflowed".to_string())
            })?;
            warnings.extend(stats.warnings);

            sink.on_progress(index + 1, total, &source.display_name);
        }

        sink.on_status("Saving combined file...");
        debug!(
            "Output uses {} styles ({} distinct descriptors registered)",
            output.styles.len(),
            copier.registry().len()
        );
        save_xlsx(&Workbook::from_sheet(output), output_path).map_err(|e| {
            CombineError::UnwritableDestination {
                path: output_path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        info!(
            "Wrote {} rows from {} files to {}",
            row_offset,
            total,
            output_path.display()
        );

        Ok(RunResult::Success {
            output_path: output_path.to_path_buf(),
            rows_written: row_offset,
            files_processed: files.len(),
            files,
            warnings,
        })
    }
}

/// Combine `sources` in order into a single worksheet saved at `output_path`.
pub fn combine(
    sources: &[SourceFile],
    config: &CombinationConfig,
    output_path: &Path,
    sink: &dyn ProgressSink,
) -> RunResult {
    CombinationEngine::new(config.clone()).run(sources, output_path, sink)
}

/// `<dir>/<stem>_combined_<YYYYmmdd_HHMMSS>.xlsx` next to the first source.
pub fn default_output_path(first_source: &Path) -> PathBuf {
    default_output_path_at(first_source, Local::now().naive_local())
}

pub fn default_output_path_at(first_source: &Path, timestamp: NaiveDateTime) -> PathBuf {
    let stem = first_source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = format!("{}_combined_{}.xlsx", stem, timestamp.format("%Y%m%d_%H%M%S"));
    match first_source.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}
