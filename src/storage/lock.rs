//! Optimistic read / exclusive write lock
//!
//! A version counter is bumped to an odd value when a writer enters and to
//! the next even value when it leaves. Readers capture an even version, read
//! without blocking, and accept the result only if the version is unchanged
//! afterwards; otherwise they retry under a shared lock that excludes writers.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{fence, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct OptimisticLock {
    version: AtomicU64,
    inner: RwLock<()>,
}

/// Held by the single writer; publishes the new version on drop
pub struct WriteGuard<'a> {
    lock: &'a OptimisticLock,
    _guard: RwLockWriteGuard<'a, ()>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.version.fetch_add(1, Ordering::Release);
    }
}

impl OptimisticLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the exclusive write lock
    pub fn write(&self) -> WriteGuard<'_> {
        let guard = self.inner.write();
        self.version.fetch_add(1, Ordering::AcqRel);
        fence(Ordering::Release);
        WriteGuard {
            lock: self,
            _guard: guard,
        }
    }

    /// Take the shared, writer-excluding read lock
    pub fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.inner.read()
    }

    /// Version to validate against later, or `None` while a writer is active
    pub fn try_optimistic_read(&self) -> Option<u64> {
        let version = self.version.load(Ordering::Acquire);
        (version & 1 == 0).then_some(version)
    }

    /// True when no writer has entered since `version` was captured
    pub fn validate(&self, version: u64) -> bool {
        fence(Ordering::Acquire);
        self.version.load(Ordering::Relaxed) == version
    }

    /// Current version; even when no writer holds the lock
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Run `read` optimistically, falling back to the shared lock when a
    /// writer interfered
    pub fn read_with<T>(&self, mut read: impl FnMut() -> T) -> T {
        if let Some(version) = self.try_optimistic_read() {
            let result = read();
            if self.validate(version) {
                return result;
            }
        }
        let _guard = self.read();
        read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn write_invalidates_optimistic_read() {
        let lock = OptimisticLock::new();
        let version = lock.try_optimistic_read().unwrap();
        assert!(lock.validate(version));
        drop(lock.write());
        assert!(!lock.validate(version));
        assert_eq!(lock.version(), 2);
    }

    #[test]
    fn no_optimistic_read_while_writing() {
        let lock = OptimisticLock::new();
        let guard = lock.write();
        assert!(lock.try_optimistic_read().is_none());
        drop(guard);
        assert!(lock.try_optimistic_read().is_some());
    }

    #[test]
    fn read_with_runs_once_when_uncontended() {
        let lock = OptimisticLock::new();
        let calls = AtomicUsize::new(0);
        let value = lock.read_with(|| {
            calls.fetch_add(1, Ordering::Relaxed);
            7
        });
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn read_with_retries_after_interleaved_write() {
        let lock = OptimisticLock::new();
        let calls = AtomicUsize::new(0);
        let value = lock.read_with(|| {
            if calls.fetch_add(1, Ordering::Relaxed) == 0 {
                // A writer slips in during the first, optimistic attempt.
                drop(lock.write());
            }
            calls.load(Ordering::Relaxed)
        });
        assert_eq!(value, 2);
    }

    #[test]
    fn readers_never_observe_a_torn_pair() {
        let lock = Arc::new(OptimisticLock::new());
        let pair = Arc::new((AtomicU64::new(0), AtomicU64::new(0)));

        let writer = {
            let lock = Arc::clone(&lock);
            let pair = Arc::clone(&pair);
            thread::spawn(move || {
                for i in 1..=2000u64 {
                    let _guard = lock.write();
                    pair.0.store(i, Ordering::Relaxed);
                    thread::yield_now();
                    pair.1.store(i, Ordering::Relaxed);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let pair = Arc::clone(&pair);
                thread::spawn(move || {
                    for _ in 0..2000 {
                        let (a, b) = lock.read_with(|| {
                            (pair.0.load(Ordering::Relaxed), pair.1.load(Ordering::Relaxed))
                        });
                        assert_eq!(a, b);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
