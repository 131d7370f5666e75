//! The taxonomy service
//!
//! Owns the forward store, the reverse index and the snapshot cache, applies
//! committed chronicles through the [`TaxonomyUpdater`], and answers
//! taxonomy queries. Queries that fan out across several records run under
//! the optimistic lock; commit processing holds its write side end to end.

mod commit;


pub use commit::{CommitOutcome, UpdateFailure};

use crate::cancel::{BuildProgress, CancellationToken};
use crate::config::TaxonomyConfig;
use crate::coordinate::{IdentifierService, StampCoordinate, StampService, ViewCoordinate, Visibility};
use crate::error::TaxonomyResult;
use crate::record::{AdjacencyRecord, FlagFilter, Sequence, TypeSelector};
use crate::snapshot::{SnapshotCache, SnapshotTask, TaxonomySnapshot, TreeBuilder};
use crate::storage::{
    DestinationOriginRecord, OptimisticLock, OriginStore, ReverseIndex, SegmentedOriginStore, StoreManifest,
    REVERSE_INDEX_FILE,
};
use crate::update::{derive_reverse_pairs, TaxonomyUpdater};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Capacity of the commit outcome broadcast channel
const OUTCOME_CHANNEL_CAPACITY: usize = 64;

/// Differences between the reverse index and the pairs the forward store implies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseIndexReport {
    /// Implied by the forward store but absent from the index
    pub missing: Vec<DestinationOriginRecord>,
    /// Present in the index with no forward edge behind them
    pub orphans: Vec<DestinationOriginRecord>,
}

impl ReverseIndexReport {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.orphans.is_empty()
    }
}

/// Counts describing the current state of the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyStats {
    pub origins: usize,
    pub type_stamps: usize,
    pub reverse_pairs: usize,
    pub cached_snapshots: usize,
    pub recovered: bool,
}

pub struct TaxonomyService {
    config: TaxonomyConfig,
    store: Arc<SegmentedOriginStore>,
    reverse: Arc<ReverseIndex>,
    stamps: Arc<dyn StampService>,
    updater: TaxonomyUpdater,
    lock: OptimisticLock,
    cache: SnapshotCache,
    outcomes: broadcast::Sender<CommitOutcome>,
    recovered: bool,
}

impl TaxonomyService {
    /// Load the store and reverse index and start serving
    ///
    /// A store written with a different layout is refused. When records were
    /// recovered but the reverse index file is missing, the index is rebuilt
    /// from the forward store.
    pub fn open(
        config: TaxonomyConfig,
        stamps: Arc<dyn StampService>,
        ids: Arc<dyn IdentifierService>,
    ) -> TaxonomyResult<Arc<Self>> {
        let store = match config.data_dir.as_deref() {
            Some(dir) => {
                if let Some(manifest) = StoreManifest::load(dir)? {
                    manifest.check_compatible(config.segment_size)?;
                }
                SegmentedOriginStore::open(dir, config.segment_size)
            }
            None => SegmentedOriginStore::in_memory(config.segment_size),
        };
        let store = Arc::new(store);
        let recovered = store.initialize()?;

        let reverse = Arc::new(ReverseIndex::new());
        if let Some(dir) = config.data_dir.as_deref() {
            let loaded = reverse.load_from(&dir.join(REVERSE_INDEX_FILE))?;
            if recovered && !loaded {
                warn!(dir = %dir.display(), "Reverse index missing for recovered store, rebuilding");
                reverse.replace_all(derive_reverse_pairs(store.as_ref())?);
            }
        }

        let updater = TaxonomyUpdater::new(
            store.clone(),
            reverse.clone(),
            stamps.clone(),
            ids,
            config.is_a,
            config.role_group,
        );
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);

        info!(
            origins = store.len(),
            reverse_pairs = reverse.len(),
            recovered,
            "Taxonomy service started"
        );
        Ok(Arc::new(Self {
            cache: SnapshotCache::new(config.snapshot_cache_capacity),
            config,
            store,
            reverse,
            stamps,
            updater,
            lock: OptimisticLock::new(),
            outcomes,
            recovered,
        }))
    }

    /// Flush the store, the reverse index and the manifest
    pub fn stop(&self) -> TaxonomyResult<()> {
        let _guard = self.lock.write();
        self.store.write()?;
        if let Some(dir) = self.config.data_dir.as_deref() {
            self.reverse.write_to(&dir.join(REVERSE_INDEX_FILE))?;
            StoreManifest::new(self.config.segment_size, self.store.len(), self.reverse.len()).save(dir)?;
        }
        info!(origins = self.store.len(), reverse_pairs = self.reverse.len(), "Taxonomy service stopped");
        Ok(())
    }

    pub fn config(&self) -> &TaxonomyConfig {
        &self.config
    }

    /// True when `open` found existing records
    pub fn is_recovered(&self) -> bool {
        self.recovered
    }

    pub fn store(&self) -> &dyn OriginStore {
        self.store.as_ref()
    }

    pub fn reverse_index(&self) -> &ReverseIndex {
        &self.reverse
    }

    fn record(&self, origin: Sequence) -> TaxonomyResult<Option<AdjacencyRecord>> {
        match self.store.get(origin) {
            Some(packed) => Ok(Some(AdjacencyRecord::unpack(&packed)?)),
            None => Ok(None),
        }
    }

    /// Every is-a parent ever recorded, regardless of view
    pub fn taxonomy_parent_sequences(&self, child: Sequence) -> TaxonomyResult<Vec<Sequence>> {
        self.relationship_destinations(child, TypeSelector::Only(self.config.is_a), None)
    }

    /// Every concept ever recorded as an is-a child, regardless of view
    pub fn taxonomy_child_sequences(&self, parent: Sequence) -> TaxonomyResult<Vec<Sequence>> {
        self.relationship_origins(parent, TypeSelector::Only(self.config.is_a), None)
    }

    /// Destinations of relationships of the given types from `origin`
    ///
    /// With a view, only edges of its premise that are visible under it.
    pub fn relationship_destinations(
        &self,
        origin: Sequence,
        types: TypeSelector<'_>,
        view: Option<&ViewCoordinate>,
    ) -> TaxonomyResult<Vec<Sequence>> {
        let Some(record) = self.record(origin)? else {
            return Ok(Vec::new());
        };
        let visibility = view.map(|v| Visibility::new(self.stamps.as_ref(), &v.stamp));
        let flags = view.map_or(FlagFilter::Any, |v| FlagFilter::Exactly(v.premise.taxonomy_flags()));
        let destinations = record
            .destinations_of_type(types, flags, visibility.as_ref())
            .collect();
        Ok(destinations)
    }

    /// Origins with relationships of the given types to `destination`
    ///
    /// Candidates come from the reverse index and are confirmed against each
    /// origin's forward record.
    pub fn relationship_origins(
        &self,
        destination: Sequence,
        types: TypeSelector<'_>,
        view: Option<&ViewCoordinate>,
    ) -> TaxonomyResult<Vec<Sequence>> {
        let visibility = view.map(|v| Visibility::new(self.stamps.as_ref(), &v.stamp));
        let flags = view.map_or(FlagFilter::Any, |v| FlagFilter::Exactly(v.premise.taxonomy_flags()));
        self.lock.read_with(|| -> TaxonomyResult<Vec<Sequence>> {
            let mut origins = Vec::new();
            for origin in self.reverse.origins_of(destination) {
                if let Some(record) = self.record(origin)? {
                    if record.contains_via(destination, types, flags, visibility.as_ref()) {
                        origins.push(origin);
                    }
                }
            }
            Ok(origins)
        })
    }

    /// Relationship types from `origin` to `destination` visible under the view
    pub fn types_for_destination(
        &self,
        origin: Sequence,
        destination: Sequence,
        view: &ViewCoordinate,
    ) -> TaxonomyResult<Vec<Sequence>> {
        let Some(record) = self.record(origin)? else {
            return Ok(Vec::new());
        };
        let visibility = Visibility::new(self.stamps.as_ref(), &view.stamp);
        Ok(record.types_for_destination(
            destination,
            FlagFilter::Exactly(view.premise.taxonomy_flags()),
            &visibility,
        ))
    }

    /// True when any recorded history makes `child` a kind of `parent`
    ///
    /// Ignores views and status entirely. Cycles in the data terminate the
    /// search instead of looping.
    pub fn was_ever_kind_of(&self, child: Sequence, parent: Sequence) -> TaxonomyResult<bool> {
        if child == parent {
            return Ok(true);
        }
        self.lock.read_with(|| -> TaxonomyResult<bool> {
            let mut visited = HashSet::new();
            let mut pending = vec![child];
            while let Some(next) = pending.pop() {
                if !visited.insert(next) {
                    continue;
                }
                let Some(record) = self.record(next)? else {
                    continue;
                };
                for ancestor in record.destinations_of_type(TypeSelector::Only(self.config.is_a), FlagFilter::Any, None) {
                    if ancestor == parent {
                        return Ok(true);
                    }
                    if !visited.contains(&ancestor) {
                        pending.push(ancestor);
                    }
                }
            }
            Ok(false)
        })
    }

    /// True when the concept's latest status under the coordinate is active
    pub fn is_concept_active(&self, concept: Sequence, coordinate: &StampCoordinate) -> TaxonomyResult<bool> {
        Ok(self.record(concept)?.map_or(false, |record| {
            record.concept_satisfies_stamp(concept, &Visibility::new(self.stamps.as_ref(), coordinate))
        }))
    }

    /// Snapshot for a view, from the cache or built on the blocking pool
    ///
    /// Must be called from within a tokio runtime.
    pub fn snapshot(self: &Arc<Self>, view: ViewCoordinate) -> SnapshotTask {
        if let Some(tree) = self.cache.get(&view) {
            debug!(premise = ?view.premise, time = view.stamp.time, "Snapshot cache hit");
            return SnapshotTask::ready(TaxonomySnapshot::new(tree));
        }
        let token = CancellationToken::new();
        let progress = BuildProgress::new();
        let service = Arc::clone(self);
        let (task_token, task_progress) = (token.clone(), progress.clone());
        SnapshotTask::spawn(token, progress, move || {
            service.build_uncached(view, &task_token, &task_progress)
        })
    }

    /// Snapshot for a view, built on the calling thread on a cache miss
    pub fn build_snapshot(&self, view: &ViewCoordinate) -> TaxonomyResult<TaxonomySnapshot> {
        if let Some(tree) = self.cache.get(view) {
            return Ok(TaxonomySnapshot::new(tree));
        }
        self.build_uncached(view.clone(), &CancellationToken::new(), &BuildProgress::new())
    }

    fn build_uncached(
        &self,
        view: ViewCoordinate,
        token: &CancellationToken,
        progress: &BuildProgress,
    ) -> TaxonomyResult<TaxonomySnapshot> {
        let generation = self.cache.generation();
        let tree = self.lock.read_with(|| {
            TreeBuilder::new(self.store.as_ref(), self.stamps.as_ref(), self.config.is_a, token, progress)
                .check_every(self.config.build_check_interval)
                .build(&view)
        })?;
        let tree = Arc::new(tree);
        self.cache.insert(view, Arc::clone(&tree), generation);
        Ok(TaxonomySnapshot::new(tree))
    }

    /// Replace the reverse index with the pairs the forward store implies
    pub fn rebuild_reverse_index(&self) -> TaxonomyResult<usize> {
        let _guard = self.lock.write();
        let pairs = derive_reverse_pairs(self.store.as_ref())?;
        let count = pairs.len();
        self.reverse.replace_all(pairs);
        info!(pairs = count, "Rebuilt reverse index");
        Ok(count)
    }

    /// Compare the reverse index against the forward store
    pub fn verify_reverse_index(&self) -> TaxonomyResult<ReverseIndexReport> {
        let report = self.lock.read_with(|| -> TaxonomyResult<ReverseIndexReport> {
            let expected = derive_reverse_pairs(self.store.as_ref())?;
            let actual = self.reverse.pairs();
            Ok(ReverseIndexReport {
                missing: expected.difference(&actual).copied().collect(),
                orphans: actual.difference(&expected).copied().collect(),
            })
        })?;
        if !report.is_consistent() {
            warn!(
                missing = report.missing.len(),
                orphans = report.orphans.len(),
                "Reverse index drift detected"
            );
        }
        Ok(report)
    }

    pub fn stats(&self) -> TaxonomyResult<TaxonomyStats> {
        self.lock.read_with(|| -> TaxonomyResult<TaxonomyStats> {
            let mut type_stamps = 0;
            for origin in self.store.origins() {
                if let Some(record) = self.record(origin)? {
                    type_stamps += record.type_stamp_count();
                }
            }
            Ok(TaxonomyStats {
                origins: self.store.len(),
                type_stamps,
                reverse_pairs: self.reverse.len(),
                cached_snapshots: self.cache.len(),
                recovered: self.recovered,
            })
        })
    }
}
