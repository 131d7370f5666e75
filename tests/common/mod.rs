//! Shared harness for taxonomy integration tests
//!
//! Wraps a service with an in-memory stamp table and helpers to commit
//! stated is-a graphs at given times.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use taxon::{
    CommitOutcome, CommitRecord, ConceptChronicle, LogicGraphChronicle, LogicalExpression, Premise, Sequence,
    SequenceIdentifiers, Stamp, StampCoordinate, StampSequence, StampService, StampTable, TaxonomyConfig,
    TaxonomyService, ViewCoordinate,
};

pub const IS_A: Sequence = 1;
pub const ROLE_GROUP: Sequence = 2;
pub const PATH: Sequence = 9;
pub const AUTHOR: Sequence = 3;
pub const MODULE: Sequence = 4;

pub struct Harness {
    pub service: Arc<TaxonomyService>,
    pub stamps: Arc<StampTable>,
    pub ids: Arc<SequenceIdentifiers>,
}

impl Harness {
    pub fn in_memory() -> Self {
        Self::with_config(TaxonomyConfig::in_memory(IS_A, ROLE_GROUP), Arc::new(StampTable::new()))
    }

    /// Service over `dir`; pass the same stamp table to reopen
    pub fn persistent(dir: &Path, segment_size: u32, stamps: Arc<StampTable>) -> Self {
        let mut config = TaxonomyConfig::in_memory(IS_A, ROLE_GROUP).with_data_dir(dir);
        config.segment_size = segment_size;
        Self::with_config(config, stamps)
    }

    pub fn with_config(config: TaxonomyConfig, stamps: Arc<StampTable>) -> Self {
        let ids = Arc::new(SequenceIdentifiers::default());
        let service = TaxonomyService::open(config, stamps.clone(), ids.clone()).expect("open taxonomy service");
        Self { service, stamps, ids }
    }

    pub fn stamp(&self, time: i64) -> StampSequence {
        self.stamps
            .register(Stamp::active(time, AUTHOR, MODULE, PATH))
            .expect("register stamp")
    }

    pub fn retired(&self, stamp: StampSequence) -> StampSequence {
        self.stamps.retired(stamp).expect("retire stamp")
    }

    /// Stated graph whose versions chain in order, one per (stamp, parents)
    pub fn is_a_graph(concept: i32, versions: &[(StampSequence, Vec<Sequence>)]) -> LogicGraphChronicle {
        let mut graph = LogicGraphChronicle::new(concept, Premise::Stated);
        for (stamp, parents) in versions {
            graph.add_version(*stamp, LogicalExpression::is_a(parents));
        }
        graph
    }

    pub fn commit_is_a(&self, concept: i32, versions: &[(StampSequence, Vec<Sequence>)]) -> CommitOutcome {
        let outcome = self
            .service
            .process_commit(&CommitRecord::new().with_logic_graph(Self::is_a_graph(concept, versions)));
        assert!(outcome.is_success(), "commit failed: {:?}", outcome.failed);
        outcome
    }

    pub fn commit_status(&self, concept: i32, stamps: &[StampSequence]) -> CommitOutcome {
        self.service.process_commit(
            &CommitRecord::new().with_concept(ConceptChronicle::new(concept, stamps.iter().copied())),
        )
    }

    pub fn view_at(time: i64) -> ViewCoordinate {
        ViewCoordinate::stated(StampCoordinate::at(time, PATH))
    }
}
