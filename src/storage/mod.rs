//! Storage for the taxonomy
//!
//! The forward side is an [`OriginStore`] mapping origin concept sequences
//! to packed adjacency records; [`SegmentedOriginStore`] persists it as
//! segment files. The [`ReverseIndex`] mirrors recorded edges as
//! (destination, origin) pairs. Operations that span many records are
//! coordinated through an [`OptimisticLock`].

mod lock;
mod manifest;
mod reverse;
mod segment;
mod traits;

pub use lock::{OptimisticLock, WriteGuard};
pub use manifest::{StoreManifest, FORMAT_VERSION, MANIFEST_FILE};
pub use reverse::{DestinationOriginRecord, ReverseIndex};
pub use segment::SegmentedOriginStore;
pub use traits::{OriginStore, StorageError, StorageResult};

/// File name of the persisted reverse index inside a store directory
pub const REVERSE_INDEX_FILE: &str = "reverse.idx";
