//! Taxon: Versioned Taxonomy Store
//!
//! Maintains, for every concept of a large terminology, the is-a and role
//! relationships that held at every point in time, and answers taxonomy
//! questions under any historical view.
//!
//! # Core Concepts
//!
//! - **Records**: per-origin adjacency records of (type, stamp, flags)
//!   triples, bit-packed for storage
//! - **Stamps**: versioning records deciding which triples a view can see;
//!   retractions are recorded with retired stamps, never by deletion
//! - **Logic graphs**: versioned axiom trees whose changes drive incremental
//!   updates of the forward store and the reverse index
//! - **Snapshots**: immutable trees materialized per view for bulk traversal
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use taxon::{
//!     CommitRecord, LogicGraphChronicle, LogicalExpression, Premise, SequenceIdentifiers, Stamp,
//!     StampTable, TaxonomyConfig, TaxonomyService,
//! };
//!
//! let stamps = Arc::new(StampTable::new());
//! let service = TaxonomyService::open(
//!     TaxonomyConfig::in_memory(1, 2),
//!     stamps.clone(),
//!     Arc::new(SequenceIdentifiers::default()),
//! )
//! .unwrap();
//!
//! let stamp = stamps.register(Stamp::active(100, 1, 1, 9)).unwrap();
//! let mut graph = LogicGraphChronicle::new(10, Premise::Stated);
//! graph.add_version(stamp, LogicalExpression::is_a(&[20]));
//! service.process_commit(&CommitRecord::new().with_logic_graph(graph));
//!
//! assert_eq!(service.taxonomy_parent_sequences(10).unwrap(), vec![20]);
//! ```

pub mod cancel;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod logic;
pub mod record;
pub mod service;
pub mod snapshot;
pub mod storage;
pub mod update;

pub use cancel::{BuildProgress, CancellationToken};
pub use config::TaxonomyConfig;
pub use coordinate::{
    IdentifierService, Premise, SequenceIdentifiers, Stamp, StampCoordinate, StampService, StampTable, Status,
    ViewCoordinate,
};
pub use error::{TaxonomyError, TaxonomyResult};
pub use logic::{CommitRecord, ConceptChronicle, ExpressionBuilder, LogicGraphChronicle, LogicalExpression};
pub use record::{AdjacencyRecord, PackedRecord, Sequence, StampSequence, TaxonomyFlags, TypeSelector};
pub use service::{CommitOutcome, ReverseIndexReport, TaxonomyService, TaxonomyStats};
pub use snapshot::{SnapshotTask, TaxonomySnapshot};
pub use storage::{OriginStore, SegmentedOriginStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
