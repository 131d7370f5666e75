//! Packed integer-array form of an adjacency record
//!
//! A packed record is a concatenation of sub-records, one or more per
//! destination:
//!
//! ```text
//! [header][type][stamp|flags][type][stamp|flags]...
//!  header = destination | (length << 24), length counts the header
//! ```
//!
//! Destinations with more triples than one length byte can describe are
//! split into consecutive sub-records; unpacking merges them back.

use super::adjacency::AdjacencyRecord;
use super::layout::{
    DESTINATION_MASK, LENGTH_SHIFT, MAX_SUB_RECORD_WORDS, MAX_TYPE_STAMPS_PER_SUB_RECORD, WORDS_PER_TYPE_STAMP,
};
use super::type_stamp::{TypeStamp, TypeStampSet};
use super::{RecordError, RecordResult, Sequence};
use std::sync::Arc;

/// Immutable packed record, cheap to clone and share between readers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRecord {
    words: Arc<[u32]>,
}

impl PackedRecord {
    pub fn from_words(words: Vec<u32>) -> Self {
        Self { words: words.into() }
    }

    pub fn empty() -> Self {
        Self::from_words(Vec::new())
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Length in words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Walk the sub-records without building an [`AdjacencyRecord`]
    pub fn sub_records(&self) -> SubRecords<'_> {
        SubRecords {
            words: &self.words,
            offset: 0,
        }
    }
}

/// Compose a sub-record header
///
/// Callers guarantee both fields fit; `pack` checks destinations on insert
/// and splits long triple sets.
pub(crate) fn header(destination: Sequence, length: usize) -> u32 {
    debug_assert!(destination <= DESTINATION_MASK, "destination {} overflows header", destination);
    debug_assert!(length <= MAX_SUB_RECORD_WORDS, "length {} overflows header", length);
    (destination & DESTINATION_MASK) | ((length as u32) << LENGTH_SHIFT)
}

/// Split a sub-record header into (destination, length)
pub fn split_header(word: u32) -> (Sequence, usize) {
    (word & DESTINATION_MASK, (word >> LENGTH_SHIFT) as usize)
}

/// Iterator over `(destination, body)` pairs of a packed record
///
/// Yields an error and stops at the first malformed header.
pub struct SubRecords<'a> {
    words: &'a [u32],
    offset: usize,
}

impl<'a> Iterator for SubRecords<'a> {
    type Item = RecordResult<(Sequence, &'a [u32])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.words.len() {
            return None;
        }
        let at = self.offset;
        let (destination, length) = split_header(self.words[at]);

        let malformed = if length == 0 {
            Some(format!("zero length header at word {}", at))
        } else if (length - 1) % WORDS_PER_TYPE_STAMP != 0 {
            Some(format!("length {} at word {} is not a whole number of triples", length, at))
        } else if at + length > self.words.len() {
            Some(format!(
                "length {} at word {} overruns record of {} words",
                length,
                at,
                self.words.len()
            ))
        } else {
            None
        };
        if let Some(reason) = malformed {
            // Stop after reporting; nothing past a bad header can be trusted.
            self.offset = self.words.len();
            return Some(Err(RecordError::Corrupted(reason)));
        }

        self.offset = at + length;
        Some(Ok((destination, &self.words[at + 1..at + length])))
    }
}

/// Pack an adjacency record
pub fn pack(record: &AdjacencyRecord) -> PackedRecord {
    let total: usize = record
        .iter()
        .map(|(_, set)| {
            let chunks = set.len().div_ceil(MAX_TYPE_STAMPS_PER_SUB_RECORD).max(1);
            chunks + WORDS_PER_TYPE_STAMP * set.len()
        })
        .sum();
    let mut words = Vec::with_capacity(total);

    for (destination, set) in record.iter() {
        let triples: Vec<TypeStamp> = set.iter().collect();
        if triples.is_empty() {
            words.push(header(destination, 1));
            continue;
        }
        for chunk in triples.chunks(MAX_TYPE_STAMPS_PER_SUB_RECORD) {
            words.push(header(destination, 1 + WORDS_PER_TYPE_STAMP * chunk.len()));
            for ts in chunk {
                words.extend_from_slice(&ts.words());
            }
        }
    }
    PackedRecord::from_words(words)
}

/// Unpack a packed record, failing fast on any malformed header
pub fn unpack(packed: &PackedRecord) -> RecordResult<AdjacencyRecord> {
    let mut record = AdjacencyRecord::new();
    for sub_record in packed.sub_records() {
        let (destination, body) = sub_record?;
        let set = body
            .chunks_exact(WORDS_PER_TYPE_STAMP)
            .map(|pair| TypeStamp::from_words(pair[0], pair[1]))
            .collect::<RecordResult<TypeStampSet>>()?;
        record.insert_set(destination, set);
    }
    Ok(record)
}
