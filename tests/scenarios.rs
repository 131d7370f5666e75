//! End-to-end taxonomy scenarios
//!
//! Run with: `cargo test --test scenarios`

mod common;

use common::{Harness, IS_A, PATH};
use taxon::record::{FlagFilter, TypeSelector};
use taxon::{AdjacencyRecord, StampCoordinate, TaxonomyFlags};

const C1: u32 = 100;
const P: u32 = 200;
const Q: u32 = 300;

#[test]
fn scenario_a_new_concept_with_stated_parent() {
    let h = Harness::in_memory();
    let t100 = h.stamp(100);
    h.commit_status(C1 as i32, &[t100]);
    h.commit_is_a(C1 as i32, &[(t100, vec![P])]);

    assert_eq!(h.service.taxonomy_parent_sequences(C1).unwrap(), vec![P]);
    assert!(h
        .service
        .is_concept_active(C1, &StampCoordinate::at(150, PATH))
        .unwrap());
}

#[tokio::test]
async fn scenario_b_parent_replaced_over_time() {
    let h = Harness::in_memory();
    let t100 = h.stamp(100);
    let t200 = h.stamp(200);
    h.commit_is_a(C1 as i32, &[(t100, vec![P])]);
    h.commit_is_a(C1 as i32, &[(t100, vec![P]), (t200, vec![Q])]);

    assert!(h.service.was_ever_kind_of(C1, P).unwrap());

    let later = h.service.snapshot(Harness::view_at(250)).wait().await.unwrap();
    assert!(later.is_kind_of(C1, Q));
    assert!(!later.is_kind_of(C1, P));

    let earlier = h.service.snapshot(Harness::view_at(150)).wait().await.unwrap();
    assert!(earlier.is_kind_of(C1, P));
    assert!(!earlier.is_kind_of(C1, Q));
}

#[test]
fn scenario_c_pack_three_destinations() {
    let mut record = AdjacencyRecord::new();
    for destination in [11, 12, 13] {
        record.add(destination, IS_A, 1, TaxonomyFlags::STATED).unwrap();
        record.add(destination, IS_A, 2, TaxonomyFlags::INFERRED).unwrap();
    }

    let unpacked = AdjacencyRecord::unpack(&record.pack()).unwrap();
    assert_eq!(unpacked.len(), 3);
    for (destination, set) in unpacked.iter() {
        assert_eq!(set.len(), 2, "destination {}", destination);
        assert_eq!(Some(set), record.get(destination));
    }
    assert_eq!(unpacked, record);
}

#[test]
fn diff_keeps_history_and_filters_current_parents() {
    let h = Harness::in_memory();
    let first = h.stamp(100);
    let second = h.stamp(200);
    h.commit_is_a(C1 as i32, &[(first, vec![P]), (second, vec![Q])]);

    assert!(h.service.was_ever_kind_of(C1, P).unwrap());
    assert!(h.service.was_ever_kind_of(C1, Q).unwrap());
    assert_eq!(h.service.taxonomy_parent_sequences(C1).unwrap(), vec![P, Q]);

    let current = h
        .service
        .relationship_destinations(C1, TypeSelector::Only(IS_A), Some(&Harness::view_at(i64::MAX)))
        .unwrap();
    assert_eq!(current, vec![Q]);
    let pinned = h
        .service
        .relationship_destinations(C1, TypeSelector::Only(IS_A), Some(&Harness::view_at(150)))
        .unwrap();
    assert_eq!(pinned, vec![P]);

    // The retraction is an extra triple on P carrying the retired stamp.
    let record = AdjacencyRecord::unpack(&h.service.store().get(C1).unwrap()).unwrap();
    let stamps = record
        .get(P)
        .unwrap()
        .stamps_matching(TypeSelector::Only(IS_A), FlagFilter::Any);
    assert_eq!(stamps, vec![first, h.retired(second)]);
}

#[test]
fn retracted_then_restored_parent_is_visible_again() {
    let h = Harness::in_memory();
    let t100 = h.stamp(100);
    let t200 = h.stamp(200);
    let t300 = h.stamp(300);
    h.commit_is_a(C1 as i32, &[(t100, vec![P]), (t200, vec![Q]), (t300, vec![P])]);

    let parents_at = |time| {
        h.service
            .build_snapshot(&Harness::view_at(time))
            .unwrap()
            .taxonomy_parent_sequences(C1)
    };
    assert_eq!(parents_at(150), vec![P]);
    assert_eq!(parents_at(250), vec![Q]);
    assert_eq!(parents_at(350), vec![P]);
}

#[test]
fn ancestor_search_survives_cycles() {
    let h = Harness::in_memory();
    let s = h.stamp(100);
    h.commit_is_a(10, &[(s, vec![11])]);
    h.commit_is_a(11, &[(s, vec![12])]);
    h.commit_is_a(12, &[(s, vec![10])]);

    assert!(h.service.was_ever_kind_of(10, 12).unwrap());
    assert!(h.service.was_ever_kind_of(12, 11).unwrap());
    assert!(!h.service.was_ever_kind_of(10, 99).unwrap());

    let snapshot = h.service.build_snapshot(&Harness::view_at(150)).unwrap();
    assert!(snapshot.is_kind_of(10, 12));
    assert!(snapshot.roots().is_empty());
}

#[test]
fn snapshot_roots_and_kind_of_sets() {
    let h = Harness::in_memory();
    let s = h.stamp(100);
    h.commit_is_a(20, &[(s, vec![10])]);
    h.commit_is_a(30, &[(s, vec![10])]);
    h.commit_is_a(40, &[(s, vec![20, 30])]);

    let snapshot = h.service.build_snapshot(&Harness::view_at(150)).unwrap();
    assert_eq!(snapshot.roots(), vec![10]);
    assert_eq!(snapshot.taxonomy_child_sequences(10), vec![20, 30]);
    assert_eq!(snapshot.taxonomy_parent_sequences(40), vec![20, 30]);
    assert_eq!(
        snapshot.kind_of_sequence_set(20).into_iter().collect::<Vec<_>>(),
        vec![20, 40]
    );
    assert!(snapshot.is_child_of(40, 30));
    assert!(!snapshot.is_child_of(40, 10));
    assert!(snapshot.is_kind_of(40, 10));
}

#[tokio::test]
async fn cancelled_snapshot_does_not_populate_cache() {
    let h = Harness::in_memory();
    let s = h.stamp(100);
    for concept in 10..2000 {
        h.commit_is_a(concept, &[(s, vec![5])]);
    }

    let task = h.service.snapshot(Harness::view_at(150));
    task.cancel();
    match task.wait().await {
        // Finished before the first cancellation check could see the token.
        Ok(snapshot) => assert_eq!(snapshot.taxonomy_child_sequences(5).len(), 1990),
        Err(e) => {
            assert!(matches!(e, taxon::TaxonomyError::Cancelled));
            assert_eq!(h.service.stats().unwrap().cached_snapshots, 0);
        }
    }
}
