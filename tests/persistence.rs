//! Restart behaviour of file-backed taxonomy stores
//!
//! Run with: `cargo test --test persistence`

mod common;

use common::{Harness, IS_A};
use std::sync::Arc;
use taxon::record::TypeSelector;
use taxon::{StampTable, StorageError, TaxonomyError};
use tempfile::TempDir;

const SEGMENT_SIZE: u32 = 4;

#[test]
fn records_spanning_segments_survive_restart() {
    let dir = TempDir::new().unwrap();
    let stamps = Arc::new(StampTable::new());
    let (first, second) = {
        let h = Harness::persistent(dir.path(), SEGMENT_SIZE, stamps.clone());
        assert!(!h.service.is_recovered());
        let first = h.stamp(100);
        let second = h.stamp(200);
        for concept in 10..30 {
            h.commit_is_a(concept, &[(first, vec![5]), (second, vec![6])]);
        }
        h.service.stop().unwrap();
        (first, second)
    };

    let h = Harness::persistent(dir.path(), SEGMENT_SIZE, stamps);
    assert!(h.service.is_recovered());
    assert_eq!(h.service.stats().unwrap().origins, 20);
    assert!(h.service.verify_reverse_index().unwrap().is_consistent());
    assert_eq!(h.service.taxonomy_child_sequences(5).unwrap(), (10..30).collect::<Vec<u32>>());
    assert_eq!(h.service.taxonomy_parent_sequences(17).unwrap(), vec![5, 6]);

    let current = h
        .service
        .relationship_destinations(17, TypeSelector::Only(IS_A), Some(&Harness::view_at(250)))
        .unwrap();
    assert_eq!(current, vec![6]);
    assert_ne!(first, second);
}

#[test]
fn commits_after_restart_extend_recovered_records() {
    let dir = TempDir::new().unwrap();
    let stamps = Arc::new(StampTable::new());
    let first = {
        let h = Harness::persistent(dir.path(), SEGMENT_SIZE, stamps.clone());
        let first = h.stamp(100);
        h.commit_is_a(10, &[(first, vec![5])]);
        h.service.stop().unwrap();
        first
    };

    let h = Harness::persistent(dir.path(), SEGMENT_SIZE, stamps);
    let second = h.stamp(200);
    h.commit_is_a(10, &[(first, vec![5]), (second, vec![5, 7])]);

    assert_eq!(h.service.taxonomy_parent_sequences(10).unwrap(), vec![5, 7]);
    let snapshot = h.service.build_snapshot(&Harness::view_at(250)).unwrap();
    assert_eq!(snapshot.taxonomy_parent_sequences(10), vec![5, 7]);
    assert!(h.service.verify_reverse_index().unwrap().is_consistent());
}

#[test]
fn truncated_segment_refuses_to_open() {
    let dir = TempDir::new().unwrap();
    let stamps = Arc::new(StampTable::new());
    {
        let h = Harness::persistent(dir.path(), SEGMENT_SIZE, stamps.clone());
        let s = h.stamp(100);
        h.commit_is_a(1, &[(s, vec![2])]);
        h.service.stop().unwrap();
    }

    let segment = dir.path().join("segment-000000.bin");
    let bytes = std::fs::read(&segment).unwrap();
    std::fs::write(&segment, &bytes[..bytes.len() - 3]).unwrap();

    let mut config = taxon::TaxonomyConfig::in_memory(IS_A, common::ROLE_GROUP).with_data_dir(dir.path());
    config.segment_size = SEGMENT_SIZE;
    let result = taxon::TaxonomyService::open(config, stamps, Arc::new(taxon::SequenceIdentifiers::default()));
    assert!(matches!(
        result,
        Err(TaxonomyError::Storage(StorageError::CorruptSegment { .. }))
    ));
}

#[test]
fn malformed_record_refuses_to_open() {
    let dir = TempDir::new().unwrap();
    let stamps = Arc::new(StampTable::new());
    {
        let h = Harness::persistent(dir.path(), SEGMENT_SIZE, stamps.clone());
        let s = h.stamp(100);
        h.commit_is_a(1, &[(s, vec![2])]);
        h.service
            .store()
            .put(3, taxon::PackedRecord::from_words(vec![0x0000_0005]));
        h.service.stop().unwrap();
    }

    let mut config = taxon::TaxonomyConfig::in_memory(IS_A, common::ROLE_GROUP).with_data_dir(dir.path());
    config.segment_size = SEGMENT_SIZE;
    let result = taxon::TaxonomyService::open(config, stamps, Arc::new(taxon::SequenceIdentifiers::default()));
    assert!(matches!(
        result,
        Err(TaxonomyError::Storage(StorageError::CorruptSegment { .. }))
    ));
}
