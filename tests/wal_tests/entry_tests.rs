//! Tests for WAL entry framing
//!
//! These tests verify:
//! - Insert, remove and commit entries survive serialization
//! - CRC32 corruption detection in payload and header
//! - Truncated and undersized buffers are rejected

use rangeidx::key::encode_key;
use rangeidx::wal::{Operation, WalEntry, HEADER_SIZE};
use rangeidx::{IndexError, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn index_key(name: &str, entity_id: u64) -> Vec<u8> {
    encode_key(&[Value::text(name)], entity_id).unwrap()
}

fn round_trip(entry: &WalEntry) -> WalEntry {
    let bytes = entry.serialize().unwrap();
    WalEntry::deserialize(&bytes).unwrap()
}

// =============================================================================
// Serialization Tests
// =============================================================================

#[test]
fn test_insert_entry_survives_serialization() {
    let entry = WalEntry::new(
        1,
        Operation::Insert {
            key: index_key("alice", 7),
        },
    );
    let recovered = round_trip(&entry);

    assert_eq!(entry.lsn, recovered.lsn);
    assert_eq!(entry.operation, recovered.operation);
    assert_eq!(entry.timestamp, recovered.timestamp);
}

#[test]
fn test_remove_entry_survives_serialization() {
    let entry = WalEntry::new(
        42,
        Operation::Remove {
            key: index_key("bob", 3),
        },
    );
    assert_eq!(round_trip(&entry), entry);
}

#[test]
fn test_commit_marker_keeps_operation_count() {
    let entry = WalEntry::new(9, Operation::Commit { operations: 1234 });
    match round_trip(&entry).operation {
        Operation::Commit { operations } => assert_eq!(operations, 1234),
        other => panic!("Expected commit marker, got {:?}", other),
    }
}

#[test]
fn test_large_key() {
    let long_name = "x".repeat(64 * 1024);
    let key = index_key(&long_name, 1);
    let entry = WalEntry::new(999, Operation::Insert { key: key.clone() });

    match round_trip(&entry).operation {
        Operation::Insert { key: recovered } => assert_eq!(recovered, key),
        other => panic!("Expected insert, got {:?}", other),
    }
}

// =============================================================================
// CRC Corruption Detection Tests
// =============================================================================

#[test]
fn test_payload_corruption_detected() {
    let entry = WalEntry::new(
        1,
        Operation::Insert {
            key: index_key("carol", 11),
        },
    );
    let mut bytes = entry.serialize().unwrap();
    if let Some(byte) = bytes.last_mut() {
        *byte ^= 0xFF;
    }

    let result = WalEntry::deserialize(&bytes);
    assert!(matches!(result, Err(IndexError::WalCorruption(_))));
}

#[test]
fn test_crc_field_corruption_detected() {
    let entry = WalEntry::new(1, Operation::Commit { operations: 2 });
    let mut bytes = entry.serialize().unwrap();

    // CRC sits right after the 8-byte LSN
    bytes[8] ^= 0xFF;

    assert!(WalEntry::deserialize(&bytes).is_err());
}

#[test]
fn test_lsn_corruption_detected() {
    let entry = WalEntry::new(5, Operation::Commit { operations: 2 });
    let mut bytes = entry.serialize().unwrap();
    bytes[7] ^= 0x01;

    assert!(matches!(
        WalEntry::deserialize(&bytes),
        Err(IndexError::WalCorruption(_))
    ));
}

// =============================================================================
// Edge Case Tests
// =============================================================================

#[test]
fn test_truncated_entry() {
    let entry = WalEntry::new(
        1,
        Operation::Remove {
            key: index_key("dave", 1),
        },
    );
    let bytes = entry.serialize().unwrap();

    assert!(WalEntry::deserialize(&bytes[..HEADER_SIZE + 2]).is_err());
}

#[test]
fn test_buffer_smaller_than_header() {
    assert!(WalEntry::deserialize(&[0u8; HEADER_SIZE - 1]).is_err());
    assert!(WalEntry::deserialize(&[]).is_err());
}

#[test]
fn test_lsn_preserved_across_range() {
    for lsn in [0, 1, u64::MAX, 12345678901234] {
        let entry = WalEntry::new(lsn, Operation::Commit { operations: 0 });
        assert_eq!(round_trip(&entry).lsn, lsn);
    }
}

#[test]
fn test_serialized_size_matches() {
    let entry = WalEntry::new(
        1,
        Operation::Insert {
            key: index_key("erin", 99),
        },
    );
    assert_eq!(
        entry.serialize().unwrap().len(),
        entry.serialized_size().unwrap()
    );
    assert_eq!(entry.compute_crc().unwrap(), entry.compute_crc().unwrap());
}
