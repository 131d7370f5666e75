//! Versioning collaborators: stamps, view coordinates and identifier resolution
//!
//! The taxonomy never interprets a stamp beyond asking a [`StampService`]
//! whether it is on route for a view and which of a set is latest. The
//! in-memory implementations here back the CLI and the test suite.

mod identifiers;
mod stamps;

pub use identifiers::SequenceIdentifiers;
pub use stamps::StampTable;

use crate::record::{Sequence, StampSequence, TaxonomyFlags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors raised by the versioning collaborators
#[derive(Debug, Error)]
pub enum CoordinateError {
    #[error("Unknown stamp: {0}")]
    UnknownStamp(StampSequence),

    #[error("Stamp sequence space exhausted")]
    StampsExhausted,
}

/// Status half of a STAMP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Inactive,
}

/// A resolved STAMP: status, time, author, module, path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stamp {
    pub status: Status,
    pub time: i64,
    pub author: Sequence,
    pub module: Sequence,
    pub path: Sequence,
}

impl Stamp {
    pub fn active(time: i64, author: Sequence, module: Sequence, path: Sequence) -> Self {
        Self {
            status: Status::Active,
            time,
            author,
            module,
            path,
        }
    }

    /// Same author, time, module and path with the status flipped to inactive
    pub fn retired(&self) -> Self {
        Self {
            status: Status::Inactive,
            ..*self
        }
    }
}

/// Position and module policy deciding which stamps a query can see
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StampCoordinate {
    /// Stamps later than this are not visible
    pub time: i64,
    pub path: Sequence,
    /// `None` admits every module
    #[serde(default)]
    pub modules: Option<BTreeSet<Sequence>>,
}

impl StampCoordinate {
    /// Latest position on a path
    pub fn latest(path: Sequence) -> Self {
        Self::at(i64::MAX, path)
    }

    /// Position pinned to `time` on a path
    pub fn at(time: i64, path: Sequence) -> Self {
        Self {
            time,
            path,
            modules: None,
        }
    }

    pub fn with_modules(mut self, modules: impl IntoIterator<Item = Sequence>) -> Self {
        self.modules = Some(modules.into_iter().collect());
        self
    }

    /// True when a stamp is on route for this coordinate
    pub fn admits(&self, stamp: &Stamp) -> bool {
        stamp.path == self.path
            && stamp.time <= self.time
            && self.modules.as_ref().map_or(true, |m| m.contains(&stamp.module))
    }
}

/// Which logic graph assemblage a view reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Premise {
    Stated,
    Inferred,
}

impl Premise {
    pub fn taxonomy_flags(&self) -> TaxonomyFlags {
        match self {
            Self::Stated => TaxonomyFlags::STATED,
            Self::Inferred => TaxonomyFlags::INFERRED,
        }
    }
}

/// A stamp coordinate plus the premise whose edges are followed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewCoordinate {
    pub stamp: StampCoordinate,
    pub premise: Premise,
}

impl ViewCoordinate {
    pub fn new(stamp: StampCoordinate, premise: Premise) -> Self {
        Self { stamp, premise }
    }

    pub fn stated(stamp: StampCoordinate) -> Self {
        Self::new(stamp, Premise::Stated)
    }

    pub fn inferred(stamp: StampCoordinate) -> Self {
        Self::new(stamp, Premise::Inferred)
    }
}

/// Stamp resolution and the relative position calculator
pub trait StampService: Send + Sync {
    /// Resolve a stamp sequence
    fn stamp(&self, stamp: StampSequence) -> Option<Stamp>;

    /// Sequence of the inactive counterpart of `stamp`, creating it if needed
    fn retired(&self, stamp: StampSequence) -> Result<StampSequence, CoordinateError>;

    /// True when the stamp is on route under the coordinate
    fn on_route(&self, stamp: StampSequence, coordinate: &StampCoordinate) -> bool {
        self.stamp(stamp).map_or(false, |s| coordinate.admits(&s))
    }

    /// Latest on-route stamp among `stamps`, if any is on route
    fn latest_on_route(&self, stamps: &[StampSequence], coordinate: &StampCoordinate) -> Option<StampSequence> {
        stamps
            .iter()
            .filter_map(|seq| self.stamp(*seq).map(|s| (*seq, s)))
            .filter(|(_, s)| coordinate.admits(s))
            .max_by_key(|(seq, s)| (s.time, *seq))
            .map(|(seq, _)| seq)
    }
}

/// Translation from platform identifiers to dense sequences
pub trait IdentifierService: Send + Sync {
    /// Negative values are raw nids; non-negative values pass through
    fn resolve_to_sequence(&self, nid_or_sequence: i32) -> Option<Sequence>;
}

/// A stamp service bound to one coordinate
#[derive(Clone, Copy)]
pub struct Visibility<'a> {
    service: &'a dyn StampService,
    coordinate: &'a StampCoordinate,
}

impl<'a> Visibility<'a> {
    pub fn new(service: &'a dyn StampService, coordinate: &'a StampCoordinate) -> Self {
        Self { service, coordinate }
    }

    pub fn coordinate(&self) -> &StampCoordinate {
        self.coordinate
    }

    /// True when the latest on-route stamp of the group is active
    pub fn is_latest_active(&self, stamps: &[StampSequence]) -> bool {
        self.service
            .latest_on_route(stamps, self.coordinate)
            .and_then(|latest| self.service.stamp(latest))
            .map_or(false, |s| s.status == Status::Active)
    }
}

impl std::fmt::Debug for Visibility<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Visibility")
            .field("coordinate", self.coordinate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_admits_by_path_time_and_module() {
        let stamp = Stamp::active(100, 1, 5, 9);
        assert!(StampCoordinate::at(100, 9).admits(&stamp));
        assert!(!StampCoordinate::at(99, 9).admits(&stamp));
        assert!(!StampCoordinate::latest(8).admits(&stamp));
        assert!(StampCoordinate::latest(9).with_modules([5, 6]).admits(&stamp));
        assert!(!StampCoordinate::latest(9).with_modules([6]).admits(&stamp));
    }

    #[test]
    fn retired_keeps_everything_but_status() {
        let stamp = Stamp::active(100, 1, 5, 9);
        let retired = stamp.retired();
        assert_eq!(retired.status, Status::Inactive);
        assert_eq!(retired.time, 100);
        assert_eq!(retired.path, 9);
    }

    #[test]
    fn premise_maps_to_flags() {
        assert_eq!(Premise::Stated.taxonomy_flags(), TaxonomyFlags::STATED);
        assert_eq!(Premise::Inferred.taxonomy_flags(), TaxonomyFlags::INFERRED);
    }

    #[test]
    fn latest_active_follows_retraction() {
        let table = StampTable::new();
        let added = table.register(Stamp::active(100, 1, 1, 1)).unwrap();
        let retracted = table.register(Stamp::active(200, 1, 1, 1).retired()).unwrap();

        let now = StampCoordinate::latest(1);
        let before = StampCoordinate::at(150, 1);
        let too_early = StampCoordinate::at(50, 1);

        assert!(!Visibility::new(&table, &now).is_latest_active(&[added, retracted]));
        assert!(Visibility::new(&table, &before).is_latest_active(&[added, retracted]));
        assert!(!Visibility::new(&table, &too_early).is_latest_active(&[added, retracted]));
    }

    #[test]
    fn view_coordinate_round_trips_through_json() {
        let view = ViewCoordinate::stated(StampCoordinate::at(10, 2).with_modules([3]));
        let json = serde_json::to_string(&view).unwrap();
        let back: ViewCoordinate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, view);
    }
}
