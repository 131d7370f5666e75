//! Segment-file backed origin store
//!
//! Records live in a [`DashMap`] keyed by origin sequence. On disk they are
//! grouped into segment files by sequence range, one file per
//! `segment_size` consecutive origins:
//!
//! ```text
//! segment-000003.bin
//!   "TXSG" | version u32 | segment u32 | count u32
//!   count × ( origin u32 | word_count u32 | word_count × u32 )
//! ```
//!
//! All integers are little-endian. Only segments touched since the last
//! flush are rewritten.

use super::traits::{OriginStore, StorageError, StorageResult};
use crate::record::{PackedRecord, Sequence};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SEGMENT_MAGIC: &[u8; 4] = b"TXSG";
const SEGMENT_VERSION: u32 = 1;
const SEGMENT_PREFIX: &str = "segment-";
const SEGMENT_SUFFIX: &str = ".bin";

#[derive(Debug, Clone)]
struct Slot {
    write_sequence: u64,
    record: PackedRecord,
}

/// Origin store persisted as segment files
#[derive(Debug)]
pub struct SegmentedOriginStore {
    dir: Option<PathBuf>,
    segment_size: u32,
    records: DashMap<Sequence, Slot>,
    dirty: DashSet<u32>,
}

impl SegmentedOriginStore {
    /// Store persisted under `dir`
    pub fn open(dir: impl Into<PathBuf>, segment_size: u32) -> Self {
        Self::with_dir(Some(dir.into()), segment_size)
    }

    /// Store with no backing files (useful for testing)
    pub fn in_memory(segment_size: u32) -> Self {
        Self::with_dir(None, segment_size)
    }

    fn with_dir(dir: Option<PathBuf>, segment_size: u32) -> Self {
        Self {
            dir,
            segment_size: segment_size.max(1),
            records: DashMap::new(),
            dirty: DashSet::new(),
        }
    }

    pub fn segment_size(&self) -> u32 {
        self.segment_size
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn segment_of(&self, origin: Sequence) -> u32 {
        origin / self.segment_size
    }

    /// Segments with unflushed changes
    pub fn dirty_segments(&self) -> Vec<u32> {
        let mut segments: Vec<u32> = self.dirty.iter().map(|s| *s).collect();
        segments.sort_unstable();
        segments
    }

    fn segment_path(dir: &Path, segment: u32) -> PathBuf {
        dir.join(format!("{}{:06}{}", SEGMENT_PREFIX, segment, SEGMENT_SUFFIX))
    }

    fn parse_segment_index(path: &Path) -> Option<u32> {
        let name = path.file_name()?.to_str()?;
        name.strip_prefix(SEGMENT_PREFIX)?
            .strip_suffix(SEGMENT_SUFFIX)?
            .parse()
            .ok()
    }

    fn load_segment(&self, path: &Path, segment: u32) -> StorageResult<usize> {
        let bytes = fs::read(path)?;
        let corrupt = |reason: String| StorageError::CorruptSegment {
            path: path.to_path_buf(),
            reason,
        };

        if bytes.len() < 4 || &bytes[..4] != SEGMENT_MAGIC {
            return Err(corrupt("missing segment magic".to_string()));
        }
        let mut reader = WordReader::new(&bytes[4..]);
        let version = reader.next().ok_or_else(|| corrupt("truncated header".into()))?;
        if version != SEGMENT_VERSION {
            return Err(corrupt(format!("unsupported version {}", version)));
        }
        let stored_segment = reader.next().ok_or_else(|| corrupt("truncated header".into()))?;
        if stored_segment != segment {
            return Err(corrupt(format!(
                "file names segment {} but header says {}",
                segment, stored_segment
            )));
        }
        let count = reader.next().ok_or_else(|| corrupt("truncated header".into()))?;

        for i in 0..count {
            let origin = reader
                .next()
                .ok_or_else(|| corrupt(format!("truncated at record {}", i)))?;
            if self.segment_of(origin) != segment {
                return Err(corrupt(format!(
                    "origin {} does not belong in segment {}",
                    origin, segment
                )));
            }
            let word_count = reader
                .next()
                .ok_or_else(|| corrupt(format!("truncated at record {}", i)))?
                as usize;
            let words = reader
                .take(word_count)
                .ok_or_else(|| corrupt(format!("record {} for origin {} is truncated", i, origin)))?;
            let record = PackedRecord::from_words(words);
            if let Some(Err(e)) = record.sub_records().find(|sub| sub.is_err()) {
                return Err(corrupt(format!("record {} for origin {}: {}", i, origin, e)));
            }
            self.records.insert(
                origin,
                Slot {
                    write_sequence: 1,
                    record,
                },
            );
        }
        if !reader.is_exhausted() {
            return Err(corrupt("trailing bytes after last record".to_string()));
        }
        Ok(count as usize)
    }

    fn write_segment(dir: &Path, segment: u32, records: &[(Sequence, PackedRecord)]) -> StorageResult<()> {
        let path = Self::segment_path(dir, segment);
        let tmp = path.with_extension("bin.tmp");
        {
            let mut out = BufWriter::new(fs::File::create(&tmp)?);
            out.write_all(SEGMENT_MAGIC)?;
            out.write_all(&SEGMENT_VERSION.to_le_bytes())?;
            out.write_all(&segment.to_le_bytes())?;
            out.write_all(&(records.len() as u32).to_le_bytes())?;
            for (origin, record) in records {
                out.write_all(&origin.to_le_bytes())?;
                out.write_all(&(record.len() as u32).to_le_bytes())?;
                for word in record.words() {
                    out.write_all(&word.to_le_bytes())?;
                }
            }
            out.flush()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl OriginStore for SegmentedOriginStore {
    fn initialize(&self) -> StorageResult<bool> {
        let Some(dir) = self.dir.as_deref() else {
            return Ok(false);
        };
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            info!(dir = %dir.display(), "Created empty taxonomy store");
            return Ok(false);
        }

        let mut segments = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if let Some(segment) = Self::parse_segment_index(&path) {
                segments.push((segment, path));
            }
        }
        segments.sort();

        let mut loaded = 0;
        for (segment, path) in &segments {
            let count = self.load_segment(path, *segment)?;
            debug!(segment = *segment, records = count, "Loaded segment");
            loaded += count;
        }
        self.dirty.clear();

        info!(
            dir = %dir.display(),
            segments = segments.len(),
            records = loaded,
            "Loaded taxonomy store"
        );
        Ok(!segments.is_empty())
    }

    fn write(&self) -> StorageResult<()> {
        let Some(dir) = self.dir.as_deref() else {
            return Ok(());
        };
        fs::create_dir_all(dir)?;

        let dirty = self.dirty_segments();
        if dirty.is_empty() {
            debug!("No dirty segments to flush");
            return Ok(());
        }

        // Clear marks before collecting so a concurrent put re-marks its segment.
        for segment in &dirty {
            self.dirty.remove(segment);
        }
        let mut by_segment: BTreeMap<u32, Vec<(Sequence, PackedRecord)>> =
            dirty.iter().map(|s| (*s, Vec::new())).collect();
        for entry in self.records.iter() {
            if let Some(records) = by_segment.get_mut(&self.segment_of(*entry.key())) {
                records.push((*entry.key(), entry.value().record.clone()));
            }
        }

        for (segment, records) in by_segment.iter_mut() {
            records.sort_unstable_by_key(|(origin, _)| *origin);
            if let Err(e) = Self::write_segment(dir, *segment, records) {
                for s in &dirty {
                    self.dirty.insert(*s);
                }
                return Err(e);
            }
        }

        info!(segments = dirty.len(), "Flushed taxonomy store");
        Ok(())
    }

    fn get(&self, origin: Sequence) -> Option<PackedRecord> {
        self.records.get(&origin).map(|slot| slot.record.clone())
    }

    fn get_versioned(&self, origin: Sequence) -> Option<(u64, PackedRecord)> {
        self.records
            .get(&origin)
            .map(|slot| (slot.write_sequence, slot.record.clone()))
    }

    fn put(&self, origin: Sequence, record: PackedRecord) -> u64 {
        let write_sequence = match self.records.entry(origin) {
            Entry::Occupied(mut e) => {
                let slot = e.get_mut();
                slot.write_sequence += 1;
                slot.record = record;
                slot.write_sequence
            }
            Entry::Vacant(e) => {
                e.insert(Slot {
                    write_sequence: 1,
                    record,
                });
                1
            }
        };
        self.dirty.insert(self.segment_of(origin));
        write_sequence
    }

    fn put_if_unchanged(&self, origin: Sequence, expected: u64, record: PackedRecord) -> Option<u64> {
        let write_sequence = match self.records.entry(origin) {
            Entry::Occupied(mut e) => {
                let slot = e.get_mut();
                if slot.write_sequence != expected {
                    return None;
                }
                slot.write_sequence += 1;
                slot.record = record;
                slot.write_sequence
            }
            Entry::Vacant(e) => {
                if expected != 0 {
                    return None;
                }
                e.insert(Slot {
                    write_sequence: 1,
                    record,
                });
                1
            }
        };
        self.dirty.insert(self.segment_of(origin));
        Some(write_sequence)
    }

    fn origins(&self) -> Vec<Sequence> {
        let mut origins: Vec<Sequence> = self.records.iter().map(|e| *e.key()).collect();
        origins.sort_unstable();
        origins
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// Little-endian u32 cursor over a byte slice
struct WordReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> WordReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn next(&mut self) -> Option<u32> {
        let end = self.offset.checked_add(4)?;
        let chunk = self.bytes.get(self.offset..end)?;
        self.offset = end;
        Some(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    fn take(&mut self, count: usize) -> Option<Vec<u32>> {
        let end = self.offset.checked_add(count.checked_mul(4)?)?;
        let chunk = self.bytes.get(self.offset..end)?;
        self.offset = end;
        Some(
            chunk
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }

    fn is_exhausted(&self) -> bool {
        self.offset == self.bytes.len()
    }
}
