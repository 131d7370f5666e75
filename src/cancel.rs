//! Cooperative cancellation and progress for background tree builds
//!
//! The caller holds the token; the builder checks it between batches of
//! origins. A cancelled build returns an error and never reaches the cache.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// A cooperative cancellation token.
///
/// Cancellation between two checks has no effect until the next check.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared processed/total counters of a running build
#[derive(Debug, Clone, Default)]
pub struct BuildProgress {
    processed: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl BuildProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over with a new amount of work
    pub fn reset(&self, total: usize) {
        self.processed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn advance(&self, by: usize) {
        self.processed.fetch_add(by, Ordering::Relaxed);
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Completed share of the work, 1.0 when there is none
    pub fn fraction(&self) -> f64 {
        match self.total() {
            0 => 1.0,
            total => (self.processed() as f64 / total as f64).min(1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cloned_token_shares_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn progress_tracks_fraction() {
        let progress = BuildProgress::new();
        assert_eq!(progress.fraction(), 1.0);

        progress.reset(4);
        progress.advance(1);
        let observer = progress.clone();
        assert_eq!(observer.processed(), 1);
        assert_eq!(observer.fraction(), 0.25);

        progress.reset(2);
        assert_eq!(observer.processed(), 0);
        assert_eq!(observer.total(), 2);
    }
}
