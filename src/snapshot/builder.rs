//! Tree construction over the forward store and its background task

use super::service::TaxonomySnapshot;
use super::tree::Tree;
use crate::cancel::{BuildProgress, CancellationToken};
use crate::coordinate::{StampService, ViewCoordinate, Visibility};
use crate::error::{TaxonomyError, TaxonomyResult};
use crate::record::{AdjacencyRecord, FlagFilter, Sequence, TypeSelector};
use crate::storage::OriginStore;
use std::collections::BTreeSet;
use tokio::task::JoinHandle;
use tracing::debug;

/// Walks every origin record and keeps the is-a edges visible under a view
///
/// Concepts whose status history is inactive (or not yet on route) under the
/// view are left out together with their edges. Concepts without status
/// history are members when a visible edge mentions them.
pub struct TreeBuilder<'a> {
    store: &'a dyn OriginStore,
    stamps: &'a dyn StampService,
    is_a: Sequence,
    check_interval: usize,
    token: &'a CancellationToken,
    progress: &'a BuildProgress,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        store: &'a dyn OriginStore,
        stamps: &'a dyn StampService,
        is_a: Sequence,
        token: &'a CancellationToken,
        progress: &'a BuildProgress,
    ) -> Self {
        Self {
            store,
            stamps,
            is_a,
            check_interval: 1024,
            token,
            progress,
        }
    }

    /// Origins visited between cancellation checks
    pub fn check_every(mut self, interval: usize) -> Self {
        self.check_interval = interval.max(1);
        self
    }

    pub fn build(&self, view: &ViewCoordinate) -> TaxonomyResult<Tree> {
        let visibility = Visibility::new(self.stamps, &view.stamp);
        let flags = FlagFilter::Exactly(view.premise.taxonomy_flags());
        let origins = self.store.origins();
        self.progress.reset(origins.len());
        debug!(origins = origins.len(), premise = ?view.premise, "Building taxonomy tree");

        let mut active = BTreeSet::new();
        let mut inactive = BTreeSet::new();
        let mut edges = Vec::new();

        for (visited, origin) in origins.iter().enumerate() {
            if visited % self.check_interval == 0 && self.token.is_cancelled() {
                debug!(visited, "Tree build cancelled");
                return Err(TaxonomyError::Cancelled);
            }
            let Some(packed) = self.store.get(*origin) else {
                continue;
            };
            let record = AdjacencyRecord::unpack(&packed)?;
            if record.has_concept_status(*origin) {
                if record.concept_satisfies_stamp(*origin, &visibility) {
                    active.insert(*origin);
                } else {
                    inactive.insert(*origin);
                }
            }
            edges.extend(
                record
                    .destinations_of_type(TypeSelector::Only(self.is_a), flags, Some(&visibility))
                    .map(|parent| (*origin, parent)),
            );
            self.progress.advance(1);
        }

        edges.retain(|(child, parent)| !inactive.contains(child) && !inactive.contains(parent));
        let tree = Tree::from_edges(view.clone(), active, edges);
        debug!(
            members = tree.len(),
            edges = tree.edge_count(),
            excluded = inactive.len(),
            "Built taxonomy tree"
        );
        Ok(tree)
    }
}

enum TaskState {
    Ready(TaxonomySnapshot),
    Running(JoinHandle<TaxonomyResult<TaxonomySnapshot>>),
}

/// Handle to a snapshot that is cached or still being built
pub struct SnapshotTask {
    state: TaskState,
    token: CancellationToken,
    progress: BuildProgress,
}

impl SnapshotTask {
    pub(crate) fn ready(snapshot: TaxonomySnapshot) -> Self {
        Self {
            state: TaskState::Ready(snapshot),
            token: CancellationToken::new(),
            progress: BuildProgress::new(),
        }
    }

    /// Run `build` on the blocking pool
    pub(crate) fn spawn<F>(token: CancellationToken, progress: BuildProgress, build: F) -> Self
    where
        F: FnOnce() -> TaxonomyResult<TaxonomySnapshot> + Send + 'static,
    {
        Self {
            state: TaskState::Running(tokio::task::spawn_blocking(build)),
            token,
            progress,
        }
    }

    /// Request cooperative cancellation; `wait` then yields `Cancelled`
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn progress(&self) -> &BuildProgress {
        &self.progress
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            TaskState::Ready(_) => true,
            TaskState::Running(handle) => handle.is_finished(),
        }
    }

    pub async fn wait(self) -> TaxonomyResult<TaxonomySnapshot> {
        match self.state {
            TaskState::Ready(snapshot) => Ok(snapshot),
            TaskState::Running(handle) => handle.await?,
        }
    }
}
