//! Unpacked per-origin adjacency record

use super::flags::{FlagFilter, TaxonomyFlags};
use super::packed::{self, PackedRecord};
use super::type_stamp::{TypeSelector, TypeStamp, TypeStampSet, CONCEPT_STATUS_TYPE};
use super::{RecordError, RecordResult, Sequence, StampSequence, MAX_DESTINATION};
use crate::coordinate::{IdentifierService, Visibility};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Destination sequence → TypeStamp triples recorded by one origin concept
///
/// Records only grow: a retraction is a new triple carrying a retired stamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyRecord {
    destinations: BTreeMap<Sequence, TypeStampSet>,
}

impl AdjacencyRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edge given raw identifiers, resolving nids first
    pub fn add_stamp_record(
        &mut self,
        ids: &dyn IdentifierService,
        destination: i32,
        type_id: i32,
        stamp: StampSequence,
        flags: TaxonomyFlags,
    ) -> RecordResult<bool> {
        let destination = ids
            .resolve_to_sequence(destination)
            .ok_or(RecordError::UnresolvedIdentifier(destination))?;
        let type_sequence = ids
            .resolve_to_sequence(type_id)
            .ok_or(RecordError::UnresolvedIdentifier(type_id))?;
        self.add(destination, type_sequence, stamp, flags)
    }

    /// Record an edge between resolved sequences
    pub fn add(
        &mut self,
        destination: Sequence,
        type_sequence: Sequence,
        stamp: StampSequence,
        flags: TaxonomyFlags,
    ) -> RecordResult<bool> {
        if destination > MAX_DESTINATION {
            return Err(RecordError::DestinationOutOfRange(destination));
        }
        let type_stamp = TypeStamp::new(type_sequence, stamp, flags)?;
        Ok(self.destinations.entry(destination).or_default().insert(type_stamp))
    }

    /// Record a concept status stamp on the self record of `concept`
    pub fn add_concept_status(&mut self, concept: Sequence, stamp: StampSequence) -> RecordResult<bool> {
        self.add(concept, CONCEPT_STATUS_TYPE, stamp, TaxonomyFlags::CONCEPT_STATUS)
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    /// Number of distinct destinations
    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn get(&self, destination: Sequence) -> Option<&TypeStampSet> {
        self.destinations.get(&destination)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Sequence, &TypeStampSet)> + '_ {
        self.destinations.iter().map(|(d, set)| (*d, set))
    }

    /// Every (destination, triple) pair in destination order
    pub fn edges(&self) -> impl Iterator<Item = (Sequence, TypeStamp)> + '_ {
        self.destinations
            .iter()
            .flat_map(|(d, set)| set.iter().map(move |ts| (*d, ts)))
    }

    /// Total number of triples across all destinations
    pub fn type_stamp_count(&self) -> usize {
        self.destinations.values().map(TypeStampSet::len).sum()
    }

    /// True when an edge of the given type and flags to `destination` exists,
    /// and, when a view is given, is visible under it
    pub fn contains_via(
        &self,
        destination: Sequence,
        types: TypeSelector<'_>,
        flags: FlagFilter,
        view: Option<&Visibility<'_>>,
    ) -> bool {
        self.destinations
            .get(&destination)
            .map_or(false, |set| set_satisfies(set, types, flags, view))
    }

    /// True when the concept's own status is active under the view
    pub fn concept_satisfies_stamp(&self, concept: Sequence, view: &Visibility<'_>) -> bool {
        self.contains_via(
            concept,
            TypeSelector::Any,
            FlagFilter::Exactly(TaxonomyFlags::CONCEPT_STATUS),
            Some(view),
        )
    }

    /// True when the record carries any concept status history for `concept`
    pub fn has_concept_status(&self, concept: Sequence) -> bool {
        self.contains_via(
            concept,
            TypeSelector::Any,
            FlagFilter::Exactly(TaxonomyFlags::CONCEPT_STATUS),
            None,
        )
    }

    /// Destinations reachable through the given types, lazily filtered
    pub fn destinations_of_type<'a>(
        &'a self,
        types: TypeSelector<'a>,
        flags: FlagFilter,
        view: Option<&'a Visibility<'a>>,
    ) -> impl Iterator<Item = Sequence> + 'a {
        self.destinations
            .iter()
            .filter(move |(_, set)| set_satisfies(set, types, flags, view))
            .map(|(d, _)| *d)
    }

    /// Relationship types connecting this origin to `destination` under the view
    pub fn types_for_destination(
        &self,
        destination: Sequence,
        flags: FlagFilter,
        view: &Visibility<'_>,
    ) -> Vec<Sequence> {
        let Some(set) = self.destinations.get(&destination) else {
            return Vec::new();
        };
        set.stamps_by_type(TypeSelector::Any, flags)
            .into_iter()
            .filter(|(type_sequence, _)| *type_sequence != CONCEPT_STATUS_TYPE)
            .filter(|(_, stamps)| view.is_latest_active(stamps))
            .map(|(type_sequence, _)| type_sequence)
            .collect()
    }

    /// Union `other` into this record, destination by destination
    pub fn merge(&mut self, other: &AdjacencyRecord) {
        for (destination, set) in &other.destinations {
            match self.destinations.entry(*destination) {
                Entry::Occupied(mut e) => e.get_mut().merge(set),
                Entry::Vacant(e) => {
                    e.insert(set.clone());
                }
            }
        }
    }

    /// A new record holding the union of both
    pub fn merged(&self, other: &AdjacencyRecord) -> AdjacencyRecord {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    pub fn pack(&self) -> PackedRecord {
        packed::pack(self)
    }

    pub fn unpack(record: &PackedRecord) -> RecordResult<Self> {
        packed::unpack(record)
    }

    pub(crate) fn insert_set(&mut self, destination: Sequence, set: TypeStampSet) {
        match self.destinations.entry(destination) {
            Entry::Occupied(mut e) => e.get_mut().merge(&set),
            Entry::Vacant(e) => {
                e.insert(set);
            }
        }
    }
}

/// Without a view any matching triple counts; with one, some type group's
/// latest on-route stamp must be active.
fn set_satisfies(
    set: &TypeStampSet,
    types: TypeSelector<'_>,
    flags: FlagFilter,
    view: Option<&Visibility<'_>>,
) -> bool {
    match view {
        None => set
            .iter()
            .any(|ts| types.matches(ts.type_sequence) && flags.matches(ts.flags)),
        Some(view) => set
            .stamps_by_type(types, flags)
            .values()
            .any(|stamps| view.is_latest_active(stamps)),
    }
}
