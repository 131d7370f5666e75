//! TypeStamp triples and the per-destination set that holds them

use super::flags::{FlagFilter, TaxonomyFlags};
use super::layout::{FLAGS_MASK, FLAGS_SHIFT, MAX_STAMP, STAMP_MASK, TYPE_WORD_BITS, WORDS_PER_TYPE_STAMP};
use super::{RecordError, RecordResult, Sequence, StampSequence};
use std::collections::{BTreeMap, BTreeSet};

/// Type sequence used by concept status self records.
///
/// Status records are only ever matched through [`TypeSelector::Any`].
pub const CONCEPT_STATUS_TYPE: Sequence = i32::MAX as Sequence;

/// A (relationship type, stamp, flags) triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeStamp {
    pub type_sequence: Sequence,
    pub stamp: StampSequence,
    pub flags: TaxonomyFlags,
}

impl TypeStamp {
    /// Create a triple, rejecting stamps that do not fit the stamp word
    pub fn new(type_sequence: Sequence, stamp: StampSequence, flags: TaxonomyFlags) -> RecordResult<Self> {
        if stamp > MAX_STAMP {
            return Err(RecordError::StampOutOfRange(stamp));
        }
        Ok(Self {
            type_sequence,
            stamp,
            flags,
        })
    }

    /// Pack into a single 64-bit value
    pub fn encode(&self) -> u64 {
        let [type_word, stamp_word] = self.words();
        ((stamp_word as u64) << TYPE_WORD_BITS) | type_word as u64
    }

    /// Unpack a value produced by [`TypeStamp::encode`]
    pub fn decode(encoded: u64) -> RecordResult<Self> {
        let type_word = (encoded & u32::MAX as u64) as u32;
        let stamp_word = (encoded >> TYPE_WORD_BITS) as u32;
        Self::from_words(type_word, stamp_word)
    }

    pub(crate) fn words(&self) -> [u32; WORDS_PER_TYPE_STAMP] {
        let stamp_word = (self.stamp & STAMP_MASK) | ((self.flags.bits() & FLAGS_MASK) << FLAGS_SHIFT);
        [self.type_sequence, stamp_word]
    }

    pub(crate) fn from_words(type_word: u32, stamp_word: u32) -> RecordResult<Self> {
        if stamp_word & 0x8000_0000 != 0 {
            return Err(RecordError::Corrupted(format!(
                "stamp word {:#010x} has the sign bit set",
                stamp_word
            )));
        }
        let flags = TaxonomyFlags::from_bits_truncate((stamp_word >> FLAGS_SHIFT) & FLAGS_MASK);
        Ok(Self {
            type_sequence: type_word,
            stamp: stamp_word & STAMP_MASK,
            flags,
        })
    }
}

/// Which relationship types a query accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSelector<'a> {
    /// Wildcard, matches concept status records too
    Any,
    Only(Sequence),
    Among(&'a [Sequence]),
}

impl TypeSelector<'_> {
    pub fn matches(&self, type_sequence: Sequence) -> bool {
        match self {
            Self::Any => true,
            Self::Only(t) => *t == type_sequence,
            Self::Among(types) => types.contains(&type_sequence),
        }
    }
}

/// Set of TypeStamp triples recorded against one destination
///
/// Stored as encoded values so duplicates collapse and iteration order is
/// stable, which keeps packed output deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeStampSet {
    encoded: BTreeSet<u64>,
}

impl TypeStampSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a triple; returns false when it was already present
    pub fn add(&mut self, type_sequence: Sequence, stamp: StampSequence, flags: TaxonomyFlags) -> RecordResult<bool> {
        Ok(self.insert(TypeStamp::new(type_sequence, stamp, flags)?))
    }

    pub fn insert(&mut self, type_stamp: TypeStamp) -> bool {
        self.encoded.insert(type_stamp.encode())
    }

    pub fn contains(&self, type_stamp: &TypeStamp) -> bool {
        self.encoded.contains(&type_stamp.encode())
    }

    /// Union `other` into this set
    pub fn merge(&mut self, other: &TypeStampSet) {
        self.encoded.extend(other.encoded.iter().copied());
    }

    pub fn len(&self) -> usize {
        self.encoded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoded.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TypeStamp> + '_ {
        // Every value in the set went through TypeStamp::encode.
        self.encoded.iter().filter_map(|e| TypeStamp::decode(*e).ok())
    }

    /// Stamps of the triples matching the type and flags
    pub fn stamps_matching(&self, types: TypeSelector<'_>, flags: FlagFilter) -> Vec<StampSequence> {
        self.iter()
            .filter(|ts| types.matches(ts.type_sequence) && flags.matches(ts.flags))
            .map(|ts| ts.stamp)
            .collect()
    }

    /// Matching stamps grouped by relationship type
    pub fn stamps_by_type(&self, types: TypeSelector<'_>, flags: FlagFilter) -> BTreeMap<Sequence, Vec<StampSequence>> {
        let mut groups: BTreeMap<Sequence, Vec<StampSequence>> = BTreeMap::new();
        for ts in self.iter() {
            if types.matches(ts.type_sequence) && flags.matches(ts.flags) {
                groups.entry(ts.type_sequence).or_default().push(ts.stamp);
            }
        }
        groups
    }

    /// Words needed to pack this set as one sub-record
    pub fn packed_length(&self) -> usize {
        1 + WORDS_PER_TYPE_STAMP * self.len()
    }
}

impl FromIterator<TypeStamp> for TypeStampSet {
    fn from_iter<I: IntoIterator<Item = TypeStamp>>(iter: I) -> Self {
        Self {
            encoded: iter.into_iter().map(|ts| ts.encode()).collect(),
        }
    }
}
