//! FILENAME: core/combiner/src/error.rs

use crate::result::ErrorKind;
use persistence::PersistenceError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CombineError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cannot read {}: {source}", .path.display())]
    UnreadableSource {
        path: PathBuf,
        #[source]
        source: PersistenceError,
    },

    #[error("Cannot write {}: {message}", .path.display())]
    UnwritableDestination { path: PathBuf, message: String },

    #[error("Invalid engine state: {0}")]
    InvalidState(String),
}

impl CombineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CombineError::UnreadableSource { .. } => ErrorKind::UnreadableSource,
            CombineError::UnwritableDestination { .. } => ErrorKind::UnwritableDestination,
            CombineError::Config(_) | CombineError::InvalidState(_) => {
                ErrorKind::InternalInvariantViolation
            }
        }
    }

    /// The file the error is about, if any.
    pub fn file(&self) -> Option<PathBuf> {
        match self {
            CombineError::UnreadableSource { path, .. }
            | CombineError::UnwritableDestination { path, .. } => Some(path.clone()),
            CombineError::Config(_) | CombineError::InvalidState(_) => None,
        }
    }
}
