//! Storage trait definitions

use crate::record::{PackedRecord, RecordError, Sequence};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupted segment {path}: {reason}")]
    CorruptSegment { path: PathBuf, reason: String },

    #[error("Corrupted record: {0}")]
    Record(#[from] RecordError),

    #[error("Incompatible store layout: {0}")]
    IncompatibleLayout(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Concurrent origin sequence → packed record map
///
/// Implementations must be thread-safe (Send + Sync). Single-record reads
/// and writes are atomic per key; operations spanning several records are
/// coordinated by the caller.
pub trait OriginStore: Send + Sync {
    /// Load persisted records; returns true when existing data was recovered
    fn initialize(&self) -> StorageResult<bool>;

    /// Flush records to persistent storage
    fn write(&self) -> StorageResult<()>;

    /// Non-blocking read of one record
    fn get(&self, origin: Sequence) -> Option<PackedRecord>;

    /// Read a record together with its write sequence
    fn get_versioned(&self, origin: Sequence) -> Option<(u64, PackedRecord)>;

    /// Replace a record; returns the new write sequence
    fn put(&self, origin: Sequence, record: PackedRecord) -> u64;

    /// Replace a record only if its write sequence is still `expected`
    ///
    /// An `expected` of 0 means the record must not exist yet. Returns the
    /// new write sequence, or `None` when another writer got there first.
    fn put_if_unchanged(&self, origin: Sequence, expected: u64, record: PackedRecord) -> Option<u64>;

    /// All origins holding a record, ascending
    fn origins(&self) -> Vec<Sequence>;

    /// Number of stored records
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
