//! Tests for partitioned scan validation
//!
//! These tests verify:
//! - Exact prefixes followed by at most one open slot are accepted
//! - Restrictive predicates after an open slot are rejected
//! - Predicates without a range form are rejected in any position
//! - Empty input is an error

use rangeidx::capability::{IndexCapability, NoCapability, RangeIndexCapability};
use rangeidx::{IndexError, IndexQuery, Point, Value, ValueGroup};

// =============================================================================
// Helper Functions
// =============================================================================

/// One predicate per slot from a shape string: `x` exact, `-` exists,
/// `>` range, `p` string prefix, `c` string contains
fn shape(pattern: &str) -> Vec<IndexQuery> {
    pattern
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let property = i as u32 + 1;
            match c {
                'x' => IndexQuery::exact(property, Value::Int(i as i64)),
                '-' => IndexQuery::exists(property),
                '>' => IndexQuery::range(property, Some(Value::Int(0)), true, None, true).unwrap(),
                'p' => IndexQuery::string_prefix(property, "ab"),
                'c' => IndexQuery::string_contains(property, "ab"),
                other => panic!("Unknown shape character {:?}", other),
            }
        })
        .collect()
}

fn supported(pattern: &str) -> bool {
    RangeIndexCapability
        .supports_partitioned_scan(&shape(pattern))
        .unwrap()
}

// =============================================================================
// Basic Combination Tests
// =============================================================================

#[test]
fn test_exact_exact_supported() {
    assert!(supported("xx"));
}

#[test]
fn test_exists_range_unsupported() {
    assert!(!supported("->"));
}

#[test]
fn test_exact_range_exists_supported() {
    assert!(supported("x>-"));
}

#[test]
fn test_range_exact_unsupported() {
    assert!(!supported(">x"));
}

#[test]
fn test_string_contains_unsupported_in_any_position() {
    assert!(!supported("c"));
    assert!(!supported("xc"));
    assert!(!supported("c-"));
    assert!(!supported("xxc--"));
}

// =============================================================================
// Five Slot Shape Tests
// =============================================================================

#[test]
fn test_five_slot_shapes() {
    let accepted = ["xxxxx", "-----", "x----", "xxxx-", ">----", "x>---", "xxxx>"];
    for pattern in accepted {
        assert!(supported(pattern), "{} should be supported", pattern);
    }

    let rejected = [">x---", ">>---", "-x---", "->---"];
    for pattern in rejected {
        assert!(!supported(pattern), "{} should be rejected", pattern);
    }
}

#[test]
fn test_prefix_behaves_like_range() {
    assert!(supported("p"));
    assert!(supported("xp-"));
    assert!(!supported("px"));
    assert!(!supported("p>"));
}

#[test]
fn test_single_predicates() {
    assert!(supported("x"));
    assert!(supported("-"));
    assert!(supported(">"));
}

// =============================================================================
// Unsupported Predicate Tests
// =============================================================================

#[test]
fn test_suffix_geometry_and_token_unsupported() {
    let cap = RangeIndexCapability;
    assert!(!cap
        .supports_partitioned_scan(&[IndexQuery::string_suffix(1, "z")])
        .unwrap());
    assert!(!cap
        .supports_partitioned_scan(&[IndexQuery::geometry_range(
            1,
            Point::new(7203, vec![0.0, 0.0]),
            Point::new(7203, vec![1.0, 1.0]),
        )])
        .unwrap());
    assert!(!cap.supports_partitioned_scan(&[IndexQuery::token(4)]).unwrap());
}

#[test]
fn test_geometry_array_range_unsupported() {
    let query = IndexQuery::range_of_group(1, ValueGroup::GeometryArray);
    assert!(!RangeIndexCapability
        .supports_partitioned_scan(&[query])
        .unwrap());

    let text_arrays = IndexQuery::range_of_group(1, ValueGroup::TextArray);
    assert!(RangeIndexCapability
        .supports_partitioned_scan(&[text_arrays])
        .unwrap());
}

#[test]
fn test_empty_input_is_error() {
    assert!(matches!(
        RangeIndexCapability.supports_partitioned_scan(&[]),
        Err(IndexError::InvalidArgument(_))
    ));
    assert!(matches!(
        NoCapability.supports_partitioned_scan(&[]),
        Err(IndexError::InvalidArgument(_))
    ));
}

#[test]
fn test_no_capability_never_scans() {
    assert!(!NoCapability.supports_partitioned_scan(&shape("xx")).unwrap());
}
