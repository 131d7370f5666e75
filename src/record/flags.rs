//! Taxonomy flag bits carried alongside every TypeStamp

use bitflags::bitflags;

bitflags! {
    /// Facets OR'd into the top byte of a stamp word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct TaxonomyFlags: u32 {
        /// Edge came from the stated logic graph
        const STATED = 1;
        /// Edge came from the inferred logic graph
        const INFERRED = 1 << 1;
        /// Origin is a member of an assemblage
        const SEMANTIC = 1 << 2;
        /// Non description-logic relationship
        const NON_DL_REL = 1 << 3;
        /// Self record carrying the concept's own status history
        const CONCEPT_STATUS = 1 << 4;
        const RESERVED_1 = 1 << 5;
        const RESERVED_2 = 1 << 6;
    }
}

/// How a query matches the flags of stored triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagFilter {
    /// Any flags, including concept status records
    Any,
    /// The triple's flags must equal these exactly
    Exactly(TaxonomyFlags),
}

impl FlagFilter {
    pub fn matches(&self, flags: TaxonomyFlags) -> bool {
        match self {
            Self::Any => true,
            Self::Exactly(wanted) => flags == *wanted,
        }
    }
}
