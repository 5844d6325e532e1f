//! Tests for the populator lifecycle
//!
//! These tests verify:
//! - Scan batches and concurrent updates converge to the entity state
//! - Lifecycle calls out of order are rejected
//! - Failures are persisted and reported after reopening
//! - Files of a previous attempt are archived or deleted
//! - A live population owns its files and hands its store to accessors

use std::sync::Arc;

use rangeidx::provider::IndexProvider;
use rangeidx::store::IndexState;
use rangeidx::{
    IndexEntryUpdate, IndexError, IndexOrder, IndexQuery, IndexUpdateMode, PopulatorState, Value,
};

use crate::common::*;

// =============================================================================
// Helper Functions
// =============================================================================

fn adds(entries: &[(u64, Vec<Value>)]) -> Vec<IndexEntryUpdate> {
    entries
        .iter()
        .map(|(id, values)| IndexEntryUpdate::add(*id, values.clone()))
        .collect()
}

fn all_entries(host: &TestHost, prototype: &rangeidx::IndexDescriptor) -> Vec<(u64, Vec<Value>)> {
    let accessor = host.provider.online_accessor(prototype).unwrap();
    let reader = accessor.new_reader();
    let queries: Vec<IndexQuery> = prototype
        .schema
        .property_ids
        .iter()
        .map(|p| IndexQuery::exists(*p))
        .collect();
    let mut entries: Vec<(u64, Vec<Value>)> = reader
        .query(IndexOrder::None, &queries)
        .unwrap()
        .map(|hit| {
            let hit = hit.unwrap();
            (hit.entity_id, hit.values)
        })
        .collect();
    entries.sort_by_key(|(id, _)| *id);
    entries
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_populate_and_come_online() {
    let host = TestHost::new();
    let index = name_index(1);
    let populator = host.provider.populator(&index).unwrap();
    assert_eq!(populator.state(), PopulatorState::Created);

    populator.create().unwrap();
    assert_eq!(populator.state(), PopulatorState::Populating);
    assert_eq!(
        host.provider.initial_state(&index).unwrap(),
        IndexState::Populating
    );

    populator
        .add(&adds(&[(1, text("a")), (2, text("b")), (3, text("a"))]))
        .unwrap();
    populator.scan_completed().unwrap();
    assert_eq!(populator.state(), PopulatorState::Online);

    let sample = populator.sample_result().unwrap();
    assert_eq!(sample.index_size, 3);
    assert_eq!(sample.unique_values, 2);

    populator.close(true).unwrap();
    assert_eq!(host.provider.initial_state(&index).unwrap(), IndexState::Online);
    assert_eq!(
        all_entries(&host, &index),
        vec![(1, text("a")), (2, text("b")), (3, text("a"))]
    );
}

#[test]
fn test_add_before_create_rejected() {
    let host = TestHost::new();
    let populator = host.provider.populator(&name_index(1)).unwrap();
    assert!(matches!(
        populator.add(&adds(&[(1, text("a"))])),
        Err(IndexError::IllegalState(_))
    ));
}

#[test]
fn test_create_twice_rejected() {
    let host = TestHost::new();
    let populator = host.provider.populator(&name_index(1)).unwrap();
    populator.create().unwrap();
    assert!(matches!(populator.create(), Err(IndexError::IllegalState(_))));
}

#[test]
fn test_successful_close_requires_completed_scan() {
    let host = TestHost::new();
    let index = name_index(1);
    let populator = host.provider.populator(&index).unwrap();
    populator.create().unwrap();

    assert!(matches!(populator.close(true), Err(IndexError::IllegalState(_))));

    // The store is still usable after the refused close
    populator.add(&adds(&[(1, text("a"))])).unwrap();
    populator.scan_completed().unwrap();
    populator.close(true).unwrap();
}

#[test]
fn test_close_unsuccessful_persists_failure() {
    let host = TestHost::new();
    let index = name_index(1);
    let populator = host.provider.populator(&index).unwrap();
    populator.create().unwrap();
    populator.close(false).unwrap();

    assert_eq!(host.provider.initial_state(&index).unwrap(), IndexState::Failed);
    assert_eq!(
        host.provider.population_failure(&index).unwrap().as_deref(),
        Some("Index population was not completed")
    );
    assert!(matches!(
        host.provider.online_accessor(&index),
        Err(IndexError::IllegalState(_))
    ));
}

#[test]
fn test_mark_as_failed_message_survives_close() {
    let host = TestHost::new();
    let index = name_index(1);
    let populator = host.provider.populator(&index).unwrap();
    populator.create().unwrap();
    populator.mark_as_failed("disk on fire").unwrap();
    assert_eq!(populator.state(), PopulatorState::Failed);
    populator.close(false).unwrap();

    assert_eq!(populator.failure_message().as_deref(), Some("disk on fire"));
    assert_eq!(
        host.provider.population_failure(&index).unwrap().as_deref(),
        Some("disk on fire")
    );
}

// =============================================================================
// Previous Attempt Tests
// =============================================================================

#[test]
fn test_recreate_deletes_previous_files() {
    let host = TestHost::new();
    let index = name_index(1);
    {
        let populator = host.provider.populator(&index).unwrap();
        populator.create().unwrap();
        populator.add(&adds(&[(1, text("old"))])).unwrap();
        populator.close(false).unwrap();
    }

    let populator = host.provider.populator(&index).unwrap();
    populator.create().unwrap();
    populator.add(&adds(&[(2, text("new"))])).unwrap();
    populator.scan_completed().unwrap();
    populator.close(true).unwrap();

    assert_eq!(all_entries(&host, &index), vec![(2, text("new"))]);
    let archives = std::fs::read_dir(host.provider.root_dir())
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .starts_with("archive-")
        })
        .count();
    assert_eq!(archives, 0);
}

#[test]
fn test_recreate_archives_previous_files() {
    let host = TestHost::with_config(|b| b.archive_failed_index(true));
    let index = name_index(5);
    {
        let populator = host.provider.populator(&index).unwrap();
        populator.create().unwrap();
        populator.mark_as_failed("first attempt").unwrap();
        populator.close(false).unwrap();
    }

    let populator = host.provider.populator(&index).unwrap();
    populator.create().unwrap();

    let archives: Vec<_> = std::fs::read_dir(host.provider.root_dir())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("archive-5-")
        })
        .collect();
    assert_eq!(archives.len(), 1);

    let archived = rangeidx::store::Store::read_header(&archives[0]).unwrap();
    assert_eq!(archived.state, IndexState::Failed);
    assert_eq!(archived.failure.as_deref(), Some("first attempt"));
}

#[test]
fn test_second_population_of_live_index_rejected() {
    let host = TestHost::new();
    let index = name_index(1);
    let populator = host.provider.populator(&index).unwrap();
    populator.create().unwrap();
    populator.add(&adds(&[(1, text("a"))])).unwrap();

    let rival = host.provider.populator(&index).unwrap();
    assert!(matches!(rival.create(), Err(IndexError::IllegalState(_))));
    assert_eq!(rival.state(), PopulatorState::Created);

    // The first population keeps its files and finishes normally
    populator.add(&adds(&[(2, text("b"))])).unwrap();
    populator.scan_completed().unwrap();
    populator.close(true).unwrap();
    assert_eq!(all_entries(&host, &index), vec![(1, text("a")), (2, text("b"))]);
}

#[test]
fn test_accessor_shares_store_with_closed_populator() {
    let host = TestHost::new();
    let index = name_index(1);
    let populator = host.provider.populator(&index).unwrap();
    populator.create().unwrap();
    populator.add(&adds(&[(1, text("a"))])).unwrap();
    populator.scan_completed().unwrap();
    populator.close(true).unwrap();

    let accessor = host.provider.online_accessor(&index).unwrap();
    let other = host.provider.online_accessor(&index).unwrap();
    let mut updater = accessor.new_updater(IndexUpdateMode::Online);
    updater.process(IndexEntryUpdate::add(2, text("b")));
    updater.close().unwrap();

    assert_eq!(populator.sample_result().unwrap().index_size, 2);
    assert_eq!(other.sample().index_size, 2);
}

// =============================================================================
// Populating Updater Tests
// =============================================================================

#[test]
fn test_populating_updater_before_create_rejected() {
    let host = TestHost::new();
    let populator = host.provider.populator(&name_index(1)).unwrap();
    let mut updater = populator.new_populating_updater();
    updater.process(IndexEntryUpdate::add(1, text("a")));
    assert!(matches!(updater.close(), Err(IndexError::IllegalState(_))));
}

#[test]
fn test_updates_during_population_converge() {
    let host = TestHost::new();
    let index = name_index(1);
    let populator = host.provider.populator(&index).unwrap();
    populator.create().unwrap();

    // Scan saw entities 1..=3; transactions then changed, removed and added
    populator
        .add(&adds(&[(1, text("a")), (2, text("b")), (3, text("c"))]))
        .unwrap();
    let mut tx = populator.new_populating_updater();
    tx.process(IndexEntryUpdate::change(1, text("a"), text("z")));
    tx.process(IndexEntryUpdate::remove(2, text("b")));
    tx.process(IndexEntryUpdate::add(4, text("d")));
    tx.close().unwrap();

    // A late scan batch re-reading entity 3 is idempotent
    populator.add(&adds(&[(3, text("c"))])).unwrap();
    populator.scan_completed().unwrap();
    populator.close(true).unwrap();

    assert_eq!(
        all_entries(&host, &index),
        vec![(1, text("z")), (3, text("c")), (4, text("d"))]
    );
}

#[test]
fn test_full_queue_applies_in_order() {
    let host = TestHost::with_config(|b| b.population_queue_capacity(1));
    let index = name_index(1);
    let populator = host.provider.populator(&index).unwrap();
    populator.create().unwrap();

    // Each batch depends on the one before it
    let mut value = "v0".to_string();
    populator.add(&adds(&[(1, text(&value))])).unwrap();
    for i in 1..10 {
        let next = format!("v{}", i);
        let mut tx = populator.new_populating_updater();
        tx.process(IndexEntryUpdate::change(1, text(&value), text(&next)));
        tx.close().unwrap();
        value = next;
    }
    populator.scan_completed().unwrap();
    populator.close(true).unwrap();

    assert_eq!(all_entries(&host, &index), vec![(1, text("v9"))]);
}

#[test]
fn test_numeric_kind_change_replaces_entry() {
    let host = TestHost::new();
    let index = name_index(1);
    let populator = host.provider.populator(&index).unwrap();
    populator.create().unwrap();
    populator.add(&adds(&[(1, int(1))])).unwrap();

    let mut tx = populator.new_populating_updater();
    tx.process(IndexEntryUpdate::change(
        1,
        int(1),
        vec![Value::Float(1.0)],
    ));
    tx.close().unwrap();
    populator.scan_completed().unwrap();
    populator.close(true).unwrap();

    assert_eq!(all_entries(&host, &index), vec![(1, vec![Value::Float(1.0)])]);
}

#[test]
fn test_updates_after_completion_apply_online() {
    let host = TestHost::new();
    let index = name_index(1);
    let populator = Arc::new(host.provider.populator(&index).unwrap());
    populator.create().unwrap();
    populator.add(&adds(&[(1, text("a"))])).unwrap();

    // Opened while populating, closed after the scan completed
    let mut tx = populator.new_populating_updater();
    tx.process(IndexEntryUpdate::add(2, text("b")));
    populator.scan_completed().unwrap();
    tx.close().unwrap();
    populator.close(true).unwrap();

    assert_eq!(all_entries(&host, &index), vec![(1, text("a")), (2, text("b"))]);
}

#[test]
fn test_transaction_closing_after_population_closed_applies() {
    let host = TestHost::new();
    let index = name_index(1);
    let populator = host.provider.populator(&index).unwrap();
    populator.create().unwrap();
    populator.add(&adds(&[(1, text("a"))])).unwrap();

    // Opened while populating, closed after the populator itself
    let mut tx = populator.new_populating_updater();
    tx.process(IndexEntryUpdate::add(2, text("b")));
    populator.scan_completed().unwrap();
    populator.close(true).unwrap();
    tx.close().unwrap();

    assert_eq!(all_entries(&host, &index), vec![(1, text("a")), (2, text("b"))]);
    assert_eq!(populator.sample_result().unwrap().index_size, 2);
}

#[test]
fn test_successful_close_is_idempotent() {
    let host = TestHost::new();
    let index = name_index(1);
    let populator = host.provider.populator(&index).unwrap();
    populator.create().unwrap();
    populator.scan_completed().unwrap();
    populator.close(true).unwrap();
    populator.close(true).unwrap();

    assert_eq!(populator.state(), PopulatorState::Online);
    assert!(matches!(
        populator.mark_as_failed("too late"),
        Err(IndexError::IllegalState(_))
    ));
    assert_eq!(host.provider.initial_state(&index).unwrap(), IndexState::Online);
}

#[test]
fn test_updates_to_failed_population_dropped() {
    let host = TestHost::new();
    let populator = host.provider.populator(&name_index(1)).unwrap();
    populator.create().unwrap();
    populator.mark_as_failed("gave up").unwrap();

    let mut tx = populator.new_populating_updater();
    tx.process(IndexEntryUpdate::add(1, text("a")));
    tx.close().unwrap();
    assert_eq!(populator.sample_result().unwrap().index_size, 0);
}

#[test]
fn test_online_index_accepts_updates() {
    let host = TestHost::new();
    let index = name_index(1);
    let populator = host.provider.populator(&index).unwrap();
    populator.create().unwrap();
    populator.scan_completed().unwrap();
    populator.close(true).unwrap();

    let accessor = host.provider.online_accessor(&index).unwrap();
    let mut updater = accessor.new_updater(IndexUpdateMode::Online);
    updater.process(IndexEntryUpdate::add(7, text("x")));
    updater.close().unwrap();
    accessor.close().unwrap();

    assert_eq!(all_entries(&host, &index), vec![(7, text("x"))]);
}
