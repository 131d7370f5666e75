//! Bounded cache of built trees, one per view coordinate

use super::tree::Tree;
use crate::coordinate::ViewCoordinate;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct CacheState {
    /// Bumped by every processed commit
    generation: u64,
    tick: u64,
    entries: HashMap<ViewCoordinate, (u64, Arc<Tree>)>,
}

/// Trees keyed by view, evicting the least recently used beyond capacity
///
/// A build records the generation it started under; its tree is only
/// admitted if no commit was processed in the meantime.
#[derive(Debug)]
pub struct SnapshotCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl SnapshotCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn get(&self, view: &ViewCoordinate) -> Option<Arc<Tree>> {
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;
        let (used, tree) = state.entries.get_mut(view)?;
        *used = tick;
        Some(Arc::clone(tree))
    }

    /// Admit a tree built under `generation`; false when it is stale
    pub fn insert(&self, view: ViewCoordinate, tree: Arc<Tree>, generation: u64) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(built = generation, current = state.generation, "Discarding stale tree");
            return false;
        }
        state.tick += 1;
        let tick = state.tick;
        state.entries.insert(view, (tick, tree));
        while state.entries.len() > self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, (used, _))| *used)
                .map(|(view, _)| view.clone());
            match oldest {
                Some(view) => {
                    state.entries.remove(&view);
                }
                None => break,
            }
        }
        true
    }

    /// Drop every entry and start a new generation
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        let dropped = state.entries.len();
        state.entries.clear();
        debug!(generation = state.generation, dropped, "Invalidated snapshot cache");
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
