//! Taxonomy records: TypeStamp triples, adjacency records and their packed form

mod adjacency;
mod flags;
pub mod layout;
mod packed;
mod type_stamp;


pub use adjacency::AdjacencyRecord;
pub use flags::{FlagFilter, TaxonomyFlags};
pub use layout::{MAX_DESTINATION, MAX_STAMP};
pub use packed::{pack, split_header, unpack, PackedRecord, SubRecords};
pub use type_stamp::{TypeSelector, TypeStamp, TypeStampSet, CONCEPT_STATUS_TYPE};

use thiserror::Error;

/// Dense concept sequence id
pub type Sequence = u32;

/// Stamp sequence id
pub type StampSequence = u32;

/// Errors raised while building or decoding records
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Corrupted packed record: {0}")]
    Corrupted(String),

    #[error("Destination sequence {0} does not fit a sub-record header")]
    DestinationOutOfRange(Sequence),

    #[error("Stamp sequence {0} does not fit a stamp word")]
    StampOutOfRange(StampSequence),

    #[error("Identifier {0} has no sequence")]
    UnresolvedIdentifier(i32),
}

/// Result type for record operations
pub type RecordResult<T> = Result<T, RecordError>;
