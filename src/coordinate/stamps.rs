//! In-memory stamp table

use super::{CoordinateError, Stamp, StampService, Status};
use crate::record::{StampSequence, MAX_STAMP};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Concurrent stamp sequence → [`Stamp`] table
///
/// Retired counterparts are allocated once and reused, so retracting the
/// same edge twice records the same stamp.
#[derive(Debug)]
pub struct StampTable {
    stamps: DashMap<StampSequence, Stamp>,
    retired: DashMap<StampSequence, StampSequence>,
    next: AtomicU32,
}

impl StampTable {
    pub fn new() -> Self {
        Self {
            stamps: DashMap::new(),
            retired: DashMap::new(),
            next: AtomicU32::new(1),
        }
    }

    /// Allocate a sequence for a stamp
    pub fn register(&self, stamp: Stamp) -> Result<StampSequence, CoordinateError> {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        if seq > MAX_STAMP {
            return Err(CoordinateError::StampsExhausted);
        }
        self.stamps.insert(seq, stamp);
        Ok(seq)
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}

impl Default for StampTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StampService for StampTable {
    fn stamp(&self, stamp: StampSequence) -> Option<Stamp> {
        self.stamps.get(&stamp).map(|s| *s)
    }

    fn retired(&self, stamp: StampSequence) -> Result<StampSequence, CoordinateError> {
        let resolved = self.stamp(stamp).ok_or(CoordinateError::UnknownStamp(stamp))?;
        if resolved.status == Status::Inactive {
            return Ok(stamp);
        }
        match self.retired.entry(stamp) {
            Entry::Occupied(o) => Ok(*o.get()),
            Entry::Vacant(v) => {
                let seq = self.register(resolved.retired())?;
                v.insert(seq);
                Ok(seq)
            }
        }
    }
}
