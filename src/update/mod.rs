//! Incremental taxonomy maintenance
//!
//! The [`TaxonomyUpdater`] turns concept status and logic graph changes into
//! additions to the forward store and the reverse index. Nothing is ever
//! removed: a retracted relationship gains a triple carrying the retired
//! counterpart of the stamp that retracted it.

mod engine;


pub use engine::TaxonomyUpdater;

use crate::record::{AdjacencyRecord, RecordResult, Sequence, TaxonomyFlags, CONCEPT_STATUS_TYPE};
use crate::storage::{DestinationOriginRecord, OriginStore};
use std::collections::BTreeSet;

/// Additions for one origin concept, applied as a unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyDelta {
    pub origin: Sequence,
    pub record: AdjacencyRecord,
    pub pairs: BTreeSet<DestinationOriginRecord>,
}

impl TaxonomyDelta {
    pub fn new(origin: Sequence) -> Self {
        Self {
            origin,
            record: AdjacencyRecord::new(),
            pairs: BTreeSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }
}

/// Every (destination, origin) pair the forward store implies
///
/// Concept status self-records are not relationships and contribute nothing.
pub fn derive_reverse_pairs(store: &dyn OriginStore) -> RecordResult<BTreeSet<DestinationOriginRecord>> {
    let mut pairs = BTreeSet::new();
    for origin in store.origins() {
        let Some(packed) = store.get(origin) else {
            continue;
        };
        let record = AdjacencyRecord::unpack(&packed)?;
        for (destination, set) in record.iter() {
            let is_relationship = set.iter().any(|ts| {
                ts.type_sequence != CONCEPT_STATUS_TYPE && !ts.flags.contains(TaxonomyFlags::CONCEPT_STATUS)
            });
            if is_relationship {
                pairs.insert(DestinationOriginRecord::new(destination, origin));
            }
        }
    }
    Ok(pairs)
}
