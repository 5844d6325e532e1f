//! Tests for reading an online index
//!
//! These tests verify:
//! - Exact, range, prefix and exists predicates return the right entities
//! - Composite predicates filter on every slot
//! - Results come back in value order, in either direction
//! - Predicates that do not fit the index are rejected

use rangeidx::provider::IndexProvider;
use rangeidx::{
    ArrayValue, IndexAccessor, IndexDescriptor, IndexEntryUpdate, IndexError, IndexOrder,
    IndexQuery, IndexUpdateMode, Value, ValueGroup,
};

use crate::common::*;

// =============================================================================
// Helper Functions
// =============================================================================

fn online(host: &TestHost, index: &IndexDescriptor, entries: Vec<(u64, Vec<Value>)>) -> IndexAccessor {
    let populator = host.provider.populator(index).unwrap();
    populator.create().unwrap();
    let batch: Vec<IndexEntryUpdate> = entries
        .into_iter()
        .map(|(id, v)| IndexEntryUpdate::add(id, v))
        .collect();
    populator.add(&batch).unwrap();
    populator.scan_completed().unwrap();
    populator.close(true).unwrap();
    host.provider.online_accessor(index).unwrap()
}

fn ids(accessor: &IndexAccessor, order: IndexOrder, queries: &[IndexQuery]) -> Vec<u64> {
    accessor
        .new_reader()
        .query(order, queries)
        .unwrap()
        .map(|hit| hit.unwrap().entity_id)
        .collect()
}

fn sorted(mut v: Vec<u64>) -> Vec<u64> {
    v.sort_unstable();
    v
}

fn mixed_names() -> Vec<(u64, Vec<Value>)> {
    vec![
        (1, text("alice")),
        (2, text("bob")),
        (3, text("alfred")),
        (4, int(42)),
        (5, vec![Value::Float(2.5)]),
        (6, vec![Value::Bool(true)]),
        (7, text("al")),
        (8, int(-7)),
    ]
}

// =============================================================================
// Single Slot Tests
// =============================================================================

#[test]
fn test_exact_lookup() {
    let host = TestHost::new();
    let accessor = online(&host, &name_index(1), mixed_names());

    assert_eq!(
        ids(&accessor, IndexOrder::None, &[IndexQuery::exact(NAME, Value::text("bob"))]),
        vec![2]
    );
    assert_eq!(
        ids(&accessor, IndexOrder::None, &[IndexQuery::exact(NAME, Value::Float(42.0))]),
        vec![4]
    );
    assert!(ids(&accessor, IndexOrder::None, &[IndexQuery::exact(NAME, Value::text("zed"))]).is_empty());
}

#[test]
fn test_numeric_range_spans_kinds() {
    let host = TestHost::new();
    let accessor = online(&host, &name_index(1), mixed_names());

    let query = IndexQuery::range(NAME, Some(Value::Int(0)), true, Some(Value::Int(100)), false).unwrap();
    assert_eq!(ids(&accessor, IndexOrder::Ascending, &[query]), vec![5, 4]);

    let whole_group = IndexQuery::range_of_group(NAME, ValueGroup::Number);
    assert_eq!(ids(&accessor, IndexOrder::Ascending, &[whole_group]), vec![8, 5, 4]);
}

#[test]
fn test_text_range_and_order() {
    let host = TestHost::new();
    let accessor = online(&host, &name_index(1), mixed_names());

    let query =
        IndexQuery::range(NAME, Some(Value::text("alfred")), false, None, true).unwrap();
    assert_eq!(ids(&accessor, IndexOrder::Ascending, &[query.clone()]), vec![1, 2]);
    assert_eq!(ids(&accessor, IndexOrder::Descending, &[query]), vec![2, 1]);
}

#[test]
fn test_string_prefix() {
    let host = TestHost::new();
    let accessor = online(&host, &name_index(1), mixed_names());

    assert_eq!(
        ids(&accessor, IndexOrder::Ascending, &[IndexQuery::string_prefix(NAME, "al")]),
        vec![7, 3, 1]
    );
    assert_eq!(
        ids(&accessor, IndexOrder::Ascending, &[IndexQuery::string_prefix(NAME, "")]),
        vec![7, 3, 1, 2]
    );
}

#[test]
fn test_exists_returns_all_groups_in_order() {
    let host = TestHost::new();
    let accessor = online(&host, &name_index(1), mixed_names());

    let hits: Vec<u64> = ids(&accessor, IndexOrder::Ascending, &[IndexQuery::exists(NAME)]);
    // Text, then booleans, then numbers
    assert_eq!(hits, vec![7, 3, 1, 2, 6, 8, 5, 4]);

    let reversed = ids(&accessor, IndexOrder::Descending, &[IndexQuery::exists(NAME)]);
    assert_eq!(reversed, hits.into_iter().rev().collect::<Vec<_>>());
}

#[test]
fn test_hits_carry_values() {
    let host = TestHost::new();
    let accessor = online(&host, &name_index(1), vec![(9, vec![Value::Float(-0.0)])]);

    let hit = accessor
        .new_reader()
        .query(IndexOrder::None, &[IndexQuery::exact(NAME, Value::Int(0))])
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    assert_eq!(hit.entity_id, 9);
    match hit.values[0] {
        Value::Float(z) => assert!(z == 0.0 && z.is_sign_negative()),
        ref other => panic!("Expected -0.0, got {}", other),
    }
}

#[test]
fn test_array_values() {
    let host = TestHost::new();
    let array = |items: &[i64]| {
        vec![Value::Array(
            ArrayValue::new(ValueGroup::Number, items.iter().map(|n| Value::Int(*n)).collect())
                .unwrap(),
        )]
    };
    let accessor = online(
        &host,
        &name_index(1),
        vec![(1, array(&[1, 2])), (2, array(&[1])), (3, array(&[2]))],
    );

    let query = IndexQuery::exact(NAME, array(&[1, 2]).remove(0));
    assert_eq!(ids(&accessor, IndexOrder::None, &[query]), vec![1]);

    let all = IndexQuery::range_of_group(NAME, ValueGroup::NumberArray);
    assert_eq!(ids(&accessor, IndexOrder::Ascending, &[all]), vec![2, 1, 3]);
}

// =============================================================================
// Composite Tests
// =============================================================================

fn people() -> Vec<(u64, Vec<Value>)> {
    vec![
        (1, vec![Value::text("ann"), Value::Int(30)]),
        (2, vec![Value::text("ann"), Value::Int(40)]),
        (3, vec![Value::text("ben"), Value::Int(30)]),
        (4, vec![Value::text("ann"), Value::Float(35.5)]),
        (5, vec![Value::text("cat"), Value::text("unknown")]),
    ]
}

#[test]
fn test_composite_exact() {
    let host = TestHost::new();
    let accessor = online(&host, &name_age_index(1), people());

    let hits = ids(
        &accessor,
        IndexOrder::None,
        &[
            IndexQuery::exact(NAME, Value::text("ann")),
            IndexQuery::exact(AGE, Value::Float(30.0)),
        ],
    );
    assert_eq!(hits, vec![1]);
}

#[test]
fn test_composite_exact_then_range() {
    let host = TestHost::new();
    let accessor = online(&host, &name_age_index(1), people());

    let hits = ids(
        &accessor,
        IndexOrder::Descending,
        &[
            IndexQuery::exact(NAME, Value::text("ann")),
            IndexQuery::range(AGE, Some(Value::Int(31)), true, None, true).unwrap(),
        ],
    );
    assert_eq!(hits, vec![2, 4]);
}

#[test]
fn test_composite_open_first_slot_filters_second() {
    let host = TestHost::new();
    let accessor = online(&host, &name_age_index(1), people());

    // Not a contiguous range, but the reader still filters correctly
    let hits = ids(
        &accessor,
        IndexOrder::None,
        &[
            IndexQuery::exists(NAME),
            IndexQuery::exact(AGE, Value::Int(30)),
        ],
    );
    assert_eq!(sorted(hits), vec![1, 3]);
}

#[test]
fn test_count_entities() {
    let host = TestHost::new();
    let accessor = online(&host, &name_age_index(1), people());
    let reader = accessor.new_reader();

    assert_eq!(
        reader
            .count_entities(1, &[Value::text("ann"), Value::Int(30)])
            .unwrap(),
        1
    );
    assert_eq!(
        reader
            .count_entities(1, &[Value::text("ann"), Value::Float(30.0)])
            .unwrap(),
        1
    );
    assert_eq!(
        reader
            .count_entities(2, &[Value::text("ann"), Value::Int(30)])
            .unwrap(),
        0
    );
    assert!(reader.count_entities(1, &[Value::text("ann")]).is_err());
}

// =============================================================================
// Snapshot Tests
// =============================================================================

#[test]
fn test_reader_sees_snapshot() {
    let host = TestHost::new();
    let accessor = online(&host, &name_index(1), vec![(1, text("a"))]);
    let reader = accessor.new_reader();

    let mut updater = accessor.new_updater(IndexUpdateMode::Online);
    updater.process(IndexEntryUpdate::add(2, text("a")));
    updater.close().unwrap();

    let query = [IndexQuery::exact(NAME, Value::text("a"))];
    let old: Vec<u64> = reader
        .query(IndexOrder::None, &query)
        .unwrap()
        .map(|h| h.unwrap().entity_id)
        .collect();
    assert_eq!(old, vec![1]);
    assert_eq!(ids(&accessor, IndexOrder::None, &query), vec![1, 2]);
}

// =============================================================================
// Rejection Tests
// =============================================================================

#[test]
fn test_rejects_wrong_predicates() {
    let host = TestHost::new();
    let accessor = online(&host, &name_age_index(1), people());
    let reader = accessor.new_reader();

    // Too few predicates
    assert!(matches!(
        reader.query(IndexOrder::None, &[IndexQuery::exists(NAME)]),
        Err(IndexError::InvalidArgument(_))
    ));
    // Slots out of order
    assert!(matches!(
        reader.query(
            IndexOrder::None,
            &[IndexQuery::exists(AGE), IndexQuery::exists(NAME)]
        ),
        Err(IndexError::InvalidArgument(_))
    ));
    // Unsupported predicate type
    assert!(matches!(
        reader.query(
            IndexOrder::None,
            &[IndexQuery::string_suffix(NAME, "n"), IndexQuery::exists(AGE)]
        ),
        Err(IndexError::InvalidArgument(_))
    ));
}
