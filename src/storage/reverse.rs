//! Destination → origin reverse index
//!
//! A sorted set of (destination, origin) pairs. All origins pointing at a
//! destination form one contiguous range, bounded by the pairs
//! `(destination, 0)` and `(destination, Sequence::MAX)`.
//!
//! Persisted as a flat little-endian file: `count u32` followed by `count`
//! pairs of `destination u32, origin u32`.

use super::traits::{StorageError, StorageResult};
use crate::coordinate::IdentifierService;
use crate::record::{RecordError, RecordResult, Sequence};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Immutable (destination, origin) pair ordered by destination, then origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationOriginRecord {
    pub destination: Sequence,
    pub origin: Sequence,
}

impl DestinationOriginRecord {
    pub fn new(destination: Sequence, origin: Sequence) -> Self {
        Self { destination, origin }
    }

    /// Build from raw identifiers, resolving negative nids to sequences
    pub fn resolve(ids: &dyn IdentifierService, destination: i32, origin: i32) -> RecordResult<Self> {
        let resolve = |raw: i32| {
            ids.resolve_to_sequence(raw)
                .ok_or(RecordError::UnresolvedIdentifier(raw))
        };
        Ok(Self::new(resolve(destination)?, resolve(origin)?))
    }

    /// Lower sentinel of the range holding every origin of `destination`
    pub fn range_start(destination: Sequence) -> Self {
        Self::new(destination, Sequence::MIN)
    }

    /// Upper sentinel of the range holding every origin of `destination`
    pub fn range_end(destination: Sequence) -> Self {
        Self::new(destination, Sequence::MAX)
    }
}

/// Sorted, thread-safe set of [`DestinationOriginRecord`]s
#[derive(Debug, Default)]
pub struct ReverseIndex {
    pairs: RwLock<BTreeSet<DestinationOriginRecord>>,
}

impl ReverseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the pair was already present
    pub fn insert(&self, pair: DestinationOriginRecord) -> bool {
        self.pairs.write().insert(pair)
    }

    pub fn extend(&self, pairs: impl IntoIterator<Item = DestinationOriginRecord>) {
        self.pairs.write().extend(pairs);
    }

    pub fn contains(&self, pair: &DestinationOriginRecord) -> bool {
        self.pairs.read().contains(pair)
    }

    /// Origins with a recorded edge to `destination`, ascending
    pub fn origins_of(&self, destination: Sequence) -> Vec<Sequence> {
        self.pairs
            .read()
            .range(
                DestinationOriginRecord::range_start(destination)
                    ..=DestinationOriginRecord::range_end(destination),
            )
            .map(|pair| pair.origin)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.read().is_empty()
    }

    /// Copy of every pair, in order
    pub fn pairs(&self) -> BTreeSet<DestinationOriginRecord> {
        self.pairs.read().clone()
    }

    /// Replace the whole index, as a rebuild does
    pub fn replace_all(&self, pairs: BTreeSet<DestinationOriginRecord>) {
        *self.pairs.write() = pairs;
    }

    /// Load pairs from `path`; returns false when the file does not exist
    pub fn load_from(&self, path: &Path) -> StorageResult<bool> {
        if !path.exists() {
            return Ok(false);
        }
        let bytes = fs::read(path)?;
        let corrupt = |reason: String| StorageError::CorruptSegment {
            path: path.to_path_buf(),
            reason,
        };
        if bytes.len() < 4 {
            return Err(corrupt("missing pair count".to_string()));
        }
        let word = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let count = word(0) as usize;
        let expected = count
            .checked_mul(8)
            .and_then(|n| n.checked_add(4))
            .ok_or_else(|| corrupt(format!("pair count {} overflows", count)))?;
        if bytes.len() != expected {
            return Err(corrupt(format!(
                "{} pairs need {} bytes, found {}",
                count,
                expected,
                bytes.len()
            )));
        }

        let pairs: BTreeSet<_> = (0..count)
            .map(|i| {
                let at = 4 + i * 8;
                DestinationOriginRecord::new(word(at), word(at + 4))
            })
            .collect();
        info!(pairs = pairs.len(), path = %path.display(), "Loaded reverse index");
        self.replace_all(pairs);
        Ok(true)
    }

    /// Write every pair to `path`, replacing any previous file
    pub fn write_to(&self, path: &Path) -> StorageResult<()> {
        let pairs = self.pairs();
        let tmp = path.with_extension("tmp");
        {
            let mut out = BufWriter::new(fs::File::create(&tmp)?);
            out.write_all(&(pairs.len() as u32).to_le_bytes())?;
            for pair in &pairs {
                out.write_all(&pair.destination.to_le_bytes())?;
                out.write_all(&pair.origin.to_le_bytes())?;
            }
            out.flush()?;
        }
        fs::rename(&tmp, path)?;
        info!(pairs = pairs.len(), path = %path.display(), "Wrote reverse index");
        Ok(())
    }
}
