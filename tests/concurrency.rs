//! Commits and queries racing on one service
//!
//! Run with: `cargo test --test concurrency`

mod common;

use common::Harness;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

const WRITERS: usize = 4;
const CONCEPTS_PER_WRITER: i32 = 50;

#[test]
fn shuffled_parallel_commits_stay_consistent() {
    let h = Harness::in_memory();
    let first = h.stamp(100);
    let second = h.stamp(200);

    let mut concepts: Vec<i32> = (10..10 + WRITERS as i32 * CONCEPTS_PER_WRITER).collect();
    concepts.shuffle(&mut StdRng::seed_from_u64(7));
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        let writers: Vec<_> = concepts
            .chunks(CONCEPTS_PER_WRITER as usize)
            .map(|chunk| {
                let h = &h;
                scope.spawn(move || {
                    for concept in chunk {
                        h.commit_is_a(*concept, &[(first, vec![1000]), (second, vec![1000, 1001])]);
                    }
                })
            })
            .collect();
        let (h, done) = (&h, &done);
        scope.spawn(move || {
            while !done.load(Ordering::Acquire) {
                // Readers never see a half-applied record.
                for child in h.service.taxonomy_child_sequences(1001).unwrap() {
                    assert_eq!(h.service.taxonomy_parent_sequences(child).unwrap(), vec![1000, 1001]);
                }
                thread::yield_now();
            }
        });
        let joined: Vec<_> = writers.into_iter().map(|w| w.join()).collect();
        done.store(true, Ordering::Release);
        assert!(joined.iter().all(|r| r.is_ok()), "a writer panicked");
    });

    let report = h.service.verify_reverse_index().unwrap();
    assert!(report.is_consistent(), "drift: {:?}", report);
    assert_eq!(h.service.taxonomy_child_sequences(1000).unwrap().len(), concepts.len());

    let snapshot = h.service.build_snapshot(&Harness::view_at(250)).unwrap();
    assert_eq!(snapshot.roots(), vec![1000, 1001]);
}
