//! In-memory nid → sequence resolution

use super::IdentifierService;
use crate::record::Sequence;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Assigns dense sequences to raw (negative) nids on first sight
#[derive(Debug)]
pub struct SequenceIdentifiers {
    by_nid: DashMap<i32, Sequence>,
    next: AtomicU32,
}

impl SequenceIdentifiers {
    /// Sequences handed out for nids start at `first`
    pub fn starting_at(first: Sequence) -> Self {
        Self {
            by_nid: DashMap::new(),
            next: AtomicU32::new(first),
        }
    }

    /// Sequence for a nid, assigning the next free one if unseen
    pub fn sequence_for_nid(&self, nid: i32) -> Sequence {
        *self
            .by_nid
            .entry(nid)
            .or_insert_with(|| self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Sequence already assigned to a nid
    pub fn lookup(&self, nid: i32) -> Option<Sequence> {
        self.by_nid.get(&nid).map(|s| *s)
    }
}

impl Default for SequenceIdentifiers {
    fn default() -> Self {
        Self::starting_at(1 << 20)
    }
}

impl IdentifierService for SequenceIdentifiers {
    fn resolve_to_sequence(&self, nid_or_sequence: i32) -> Option<Sequence> {
        if nid_or_sequence >= 0 {
            Some(nid_or_sequence as Sequence)
        } else {
            self.lookup(nid_or_sequence)
        }
    }
}
