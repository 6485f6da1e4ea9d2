//! FILENAME: core/combiner/src/config.rs
//! PURPOSE: Options controlling a combination run.
//! CONTEXT: Header counts arrive signed from callers and JSON files; they are
//! checked once here so the rest of the crate can work with `u32`.

use crate::CombineError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_OUTPUT_SHEET_NAME: &str = "Combined Data";

/// Characters a worksheet name may not contain.
const INVALID_SHEET_NAME_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];
const MAX_SHEET_NAME_LEN: usize = 31;

/// How styles are carried into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum CopyMode {
    /// Every styled cell gets its own style entry.
    Standard,
    /// Identical styles share one entry.
    #[default]
    Optimized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinationConfig {
    /// Leading rows of the first file that are headers. They are always kept.
    pub header_rows_keep_first: u32,
    /// Leading rows skipped in every file after the first.
    pub header_rows_discard_others: u32,
    /// Prepend a column holding each row's source file name.
    pub add_source_filename_column: bool,
    /// Keep formula text; otherwise write the cached result.
    pub preserve_formulas: bool,
    pub mode: CopyMode,
    pub output_sheet_name: String,
}

impl Default for CombinationConfig {
    fn default() -> Self {
        CombinationConfig {
            header_rows_keep_first: 1,
            header_rows_discard_others: 1,
            add_source_filename_column: false,
            preserve_formulas: true,
            mode: CopyMode::Optimized,
            output_sheet_name: DEFAULT_OUTPUT_SHEET_NAME.to_string(),
        }
    }
}

/// Wire form with signed counts, so negative values can be reported instead
/// of failing deep inside serde.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawConfig {
    header_rows_keep_first: i64,
    header_rows_discard_others: i64,
    add_source_filename_column: bool,
    preserve_formulas: bool,
    mode: CopyMode,
    output_sheet_name: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        let config = CombinationConfig::default();
        RawConfig {
            header_rows_keep_first: config.header_rows_keep_first as i64,
            header_rows_discard_others: config.header_rows_discard_others as i64,
            add_source_filename_column: config.add_source_filename_column,
            preserve_formulas: config.preserve_formulas,
            mode: config.mode,
            output_sheet_name: config.output_sheet_name,
        }
    }
}

fn checked_count(name: &str, value: i64) -> Result<u32, CombineError> {
    u32::try_from(value).map_err(|_| {
        CombineError::Config(format!(
            "{} must be between 0 and {}, got {}",
            name,
            u32::MAX,
            value
        ))
    })
}

impl CombinationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from signed header counts.
    pub fn from_counts(keep_first: i64, discard_others: i64) -> Result<Self, CombineError> {
        Ok(CombinationConfig {
            header_rows_keep_first: checked_count("headerRowsKeepFirst", keep_first)?,
            header_rows_discard_others: checked_count("headerRowsDiscardOthers", discard_others)?,
            ..Self::default()
        })
    }

    pub fn from_json(json: &str) -> Result<Self, CombineError> {
        let raw: RawConfig = serde_json::from_str(json)
            .map_err(|e| CombineError::Config(format!("malformed configuration: {}", e)))?;
        let config = CombinationConfig {
            header_rows_keep_first: checked_count("headerRowsKeepFirst", raw.header_rows_keep_first)?,
            header_rows_discard_others: checked_count(
                "headerRowsDiscardOthers",
                raw.header_rows_discard_others,
            )?,
            add_source_filename_column: raw.add_source_filename_column,
            preserve_formulas: raw.preserve_formulas,
            mode: raw.mode,
            output_sheet_name: raw.output_sheet_name,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, CombineError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CombineError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, CombineError> {
        serde_json::to_string_pretty(self).map_err(|e| CombineError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), CombineError> {
        let name = &self.output_sheet_name;
        let len = name.chars().count();
        if len == 0 || len > MAX_SHEET_NAME_LEN {
            return Err(CombineError::Config(format!(
                "output sheet name must be 1 to {} characters, got {}",
                MAX_SHEET_NAME_LEN, len
            )));
        }
        if let Some(bad) = name.chars().find(|c| INVALID_SHEET_NAME_CHARS.contains(c)) {
            return Err(CombineError::Config(format!(
                "output sheet name may not contain '{}'",
                bad
            )));
        }
        Ok(())
    }

    // Builder-style setters

    pub fn with_header_rows(mut self, keep_first: u32, discard_others: u32) -> Self {
        self.header_rows_keep_first = keep_first;
        self.header_rows_discard_others = discard_others;
        self
    }

    pub fn with_filename_column(mut self, enabled: bool) -> Self {
        self.add_source_filename_column = enabled;
        self
    }

    pub fn with_preserve_formulas(mut self, preserve: bool) -> Self {
        self.preserve_formulas = preserve;
        self
    }

    pub fn with_mode(mut self, mode: CopyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_output_sheet_name(mut self, name: &str) -> Self {
        self.output_sheet_name = name.to_string();
        self
    }
}
