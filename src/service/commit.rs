//! Commit processing and the asynchronous commit listener

use super::TaxonomyService;
use crate::error::TaxonomyResult;
use crate::logic::CommitRecord;
use crate::record::StampSequence;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

/// A chronicle whose taxonomy update did not apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFailure {
    pub concept: i32,
    /// Latest stamp of the failed chronicle, when it had one
    pub stamp: Option<StampSequence>,
    pub error: String,
}

/// Result of processing one commit
///
/// Concepts are applied independently; a failure leaves the others intact
/// and is reported here so the chronicle can be resubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub commit_id: Uuid,
    pub updated: Vec<i32>,
    pub failed: Vec<UpdateFailure>,
}

impl CommitOutcome {
    fn new(commit_id: Uuid) -> Self {
        Self {
            commit_id,
            updated: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, concept: i32, stamp: Option<StampSequence>, result: TaxonomyResult<()>) {
        match result {
            Ok(()) => self.updated.push(concept),
            Err(e) => {
                error!(
                    commit = %self.commit_id,
                    concept,
                    stamp = ?stamp,
                    error = %e,
                    "Taxonomy update failed"
                );
                self.failed.push(UpdateFailure {
                    concept,
                    stamp,
                    error: e.to_string(),
                });
            }
        }
    }
}

impl TaxonomyService {
    /// Apply every chronicle in the commit under the write lock
    ///
    /// Concept status chronicles are applied before logic graphs. The
    /// snapshot cache is invalidated before the lock is released.
    pub fn process_commit(&self, commit: &CommitRecord) -> CommitOutcome {
        let mut outcome = CommitOutcome::new(commit.id);
        {
            let _guard = self.lock.write();
            for chronicle in &commit.concepts {
                let result = self
                    .updater
                    .concept_status_delta(chronicle)
                    .and_then(|delta| self.updater.apply(&delta));
                outcome.record(chronicle.concept, chronicle.stamps.last().copied(), result);
            }
            for chronicle in &commit.logic_graphs {
                let result = self
                    .updater
                    .logic_graph_delta(chronicle)
                    .and_then(|delta| self.updater.apply(&delta));
                let stamp = chronicle.versions.last().map(|v| v.stamp);
                outcome.record(chronicle.concept, stamp, result);
            }
            self.cache.invalidate();
        }

        info!(
            commit = %commit.id,
            updated = outcome.updated.len(),
            failed = outcome.failed.len(),
            "Processed commit"
        );
        // No subscribers is not an error.
        let _ = self.outcomes.send(outcome.clone());
        outcome
    }

    /// Receive outcomes of commits processed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<CommitOutcome> {
        self.outcomes.subscribe()
    }

    /// Process commits from `commits` in arrival order on the blocking pool
    ///
    /// The listener stops once every sender is dropped.
    pub fn spawn_commit_listener(self: &Arc<Self>, mut commits: mpsc::Receiver<CommitRecord>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(commit) = commits.recv().await {
                let worker = Arc::clone(&service);
                let id = commit.id;
                match tokio::task::spawn_blocking(move || worker.process_commit(&commit)).await {
                    Ok(outcome) => debug!(commit = %id, success = outcome.is_success(), "Commit listener applied commit"),
                    Err(e) => error!(commit = %id, error = %e, "Commit processing task failed"),
                }
            }
            info!("Commit channel closed, listener stopping");
        })
    }

    /// Open a commit channel served by a new listener
    pub fn commit_channel(self: &Arc<Self>, capacity: usize) -> (mpsc::Sender<CommitRecord>, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (sender, self.spawn_commit_listener(receiver))
    }
}
