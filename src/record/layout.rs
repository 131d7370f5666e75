//! Bit layout of packed taxonomy words
//!
//! Every shift and mask used by the record codecs lives in this table.
//! Widening ids for a larger ontology is a change to this file only.
//!
//! ```text
//! TypeStamp (u64)
//!   bits  0..32  relationship type sequence
//!   bits 32..56  stamp sequence
//!   bits 56..63  taxonomy flags
//!   bit  63      unused (sign bit of the stamp word)
//!
//! Sub-record header (u32)
//!   bits  0..24  destination sequence
//!   bits 24..32  sub-record length in words, header included
//! ```

/// Width of the type half of a packed TypeStamp.
pub const TYPE_WORD_BITS: u32 = 32;

/// Mask for the stamp sequence inside the stamp word.
pub const STAMP_MASK: u32 = 0x00FF_FFFF;

/// Shift of the flags inside the stamp word.
pub const FLAGS_SHIFT: u32 = 24;

/// Flags are seven bits; bit 31 of the stamp word is never set.
pub const FLAGS_MASK: u32 = 0x7F;

/// Mask for the destination sequence inside a sub-record header.
pub const DESTINATION_MASK: u32 = 0x00FF_FFFF;

/// Shift of the length byte inside a sub-record header.
pub const LENGTH_SHIFT: u32 = 24;

/// Largest value the length byte can hold.
pub const MAX_SUB_RECORD_WORDS: usize = 0xFF;

/// Words written per TypeStamp inside a sub-record (type word, stamp word).
pub const WORDS_PER_TYPE_STAMP: usize = 2;

/// Triples that fit in one sub-record before the destination must be split.
pub const MAX_TYPE_STAMPS_PER_SUB_RECORD: usize = (MAX_SUB_RECORD_WORDS - 1) / WORDS_PER_TYPE_STAMP;

/// Largest concept sequence a destination header can carry.
pub const MAX_DESTINATION: u32 = DESTINATION_MASK;

/// Largest stamp sequence a stamp word can carry.
pub const MAX_STAMP: u32 = STAMP_MASK;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_never_reach_the_sign_bit() {
        assert_eq!((FLAGS_MASK << FLAGS_SHIFT) & 0x8000_0000, 0);
    }

    #[test]
    fn stamp_and_flags_do_not_overlap() {
        assert_eq!((FLAGS_MASK << FLAGS_SHIFT) & STAMP_MASK, 0);
    }

    #[test]
    fn sub_record_capacity_fits_length_byte() {
        let words = 1 + MAX_TYPE_STAMPS_PER_SUB_RECORD * WORDS_PER_TYPE_STAMP;
        assert!(words <= MAX_SUB_RECORD_WORDS);
        assert_eq!(MAX_TYPE_STAMPS_PER_SUB_RECORD, 127);
    }
}
