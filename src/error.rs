//! Top-level error type for the taxonomy service

use crate::coordinate::CoordinateError;
use crate::logic::LogicError;
use crate::record::RecordError;
use crate::storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Logic(#[from] LogicError),

    #[error(transparent)]
    Coordinate(#[from] CoordinateError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Invalid configuration {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("Identifier does not resolve to a sequence: {0}")]
    UnresolvedIdentifier(i32),
}

impl From<tokio::task::JoinError> for TaxonomyError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::TaskFailed(err.to_string())
        }
    }
}

/// Result type for taxonomy operations
pub type TaxonomyResult<T> = Result<T, TaxonomyError>;
