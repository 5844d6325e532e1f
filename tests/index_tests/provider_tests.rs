//! Tests for the range provider and the provider registry

use std::sync::Arc;

use rangeidx::provider::{IndexProvider, RANGE_PROVIDER_KEY, RANGE_PROVIDER_VERSION};
use rangeidx::schema::{CapabilityTag, EntityType, ProviderDescriptor, SchemaEntity};
use rangeidx::store::{IndexState, DB_FILE};
use rangeidx::{
    Config, IndexDescriptor, IndexError, IndexProviders, IndexType, RangeIndexProvider,
    SchemaDescriptor,
};

use crate::common::*;

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_complete_configuration() {
    let host = TestHost::new();
    let completed = host.completed(&name_index(1));

    assert_eq!(
        completed.provider,
        Some(ProviderDescriptor::new(RANGE_PROVIDER_KEY, RANGE_PROVIDER_VERSION))
    );
    assert_eq!(completed.capability, CapabilityTag::Range);
    assert_eq!(completed.schema, name_index(1).schema);
    assert_eq!(host.provider.provider_descriptor().name(), "range-1.0");
}

#[test]
fn test_invalid_config_rejected() {
    let config = Config::builder().page_size(1000).build();
    assert!(matches!(
        RangeIndexProvider::new(config, tokens()),
        Err(IndexError::Config(_))
    ));
}

// =============================================================================
// Prototype Validation Tests
// =============================================================================

#[test]
fn test_accepts_label_and_relationship_schemas() {
    let host = TestHost::new();
    host.provider.validate_prototype(&name_index(1)).unwrap();

    let rel = IndexDescriptor::prototype(
        2,
        "knows_since",
        SchemaDescriptor::for_relationship_type(KNOWS, &[SINCE]),
        IndexType::Range,
    );
    host.provider.validate_prototype(&rel).unwrap();
}

#[test]
fn test_rejects_other_index_types() {
    let host = TestHost::new();
    let text_index = IndexDescriptor::prototype(
        3,
        "name_text",
        SchemaDescriptor::for_label(PERSON, &[NAME]),
        IndexType::Text,
    );

    match host.provider.validate_prototype(&text_index) {
        Err(IndexError::InvalidArgument(message)) => {
            assert!(message.starts_with(
                "The 'range-1.0' index provider does not support Text indexes:"
            ));
            assert!(message.contains("name='name_text'"));
        }
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
}

#[test]
fn test_rejects_non_range_schemas() {
    let host = TestHost::new();
    let lookup = IndexDescriptor::prototype(
        4,
        "node_labels",
        SchemaDescriptor {
            entity: SchemaEntity::AnyToken(EntityType::Node),
            property_ids: vec![],
        },
        IndexType::Range,
    );

    match host.provider.validate_prototype(&lookup) {
        Err(IndexError::InvalidArgument(message)) => assert_eq!(
            message,
            "The (any node {}) index schema is not a range index schema, which it is required to be for the 'range-1.0' index provider to be able to create an index."
        ),
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }

    let multi = IndexDescriptor::prototype(
        5,
        "fulltext_like",
        SchemaDescriptor {
            entity: SchemaEntity::MultiToken(EntityType::Node, vec![PERSON]),
            property_ids: vec![NAME],
        },
        IndexType::Range,
    );
    assert!(host.provider.validate_prototype(&multi).is_err());
    assert!(host.provider.populator(&multi).is_err());
}

// =============================================================================
// Stored State Tests
// =============================================================================

#[test]
fn test_initial_state_without_files() {
    let host = TestHost::new();
    let index = name_index(1);
    assert_eq!(
        host.provider.initial_state(&index).unwrap(),
        IndexState::Populating
    );
    assert!(host.provider.population_failure(&index).unwrap().is_none());
}

#[test]
fn test_unreadable_header_means_rebuild() {
    let host = TestHost::new();
    let index = name_index(1);
    let dir = host.provider.index_dir(&index);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(DB_FILE), vec![0u8; 2048]).unwrap();

    assert_eq!(
        host.provider.initial_state(&index).unwrap(),
        IndexState::Populating
    );
}

#[test]
fn test_layout_mismatch_means_rebuild() {
    let host = TestHost::new();
    let index = name_index(1);
    {
        let populator = host.provider.populator(&index).unwrap();
        populator.create().unwrap();
        populator.scan_completed().unwrap();
        populator.close(true).unwrap();
    }
    assert_eq!(host.provider.initial_state(&index).unwrap(), IndexState::Online);

    // Same id, now declared over two properties
    let reshaped = IndexDescriptor::prototype(
        1,
        "person_name",
        SchemaDescriptor::for_label(PERSON, &[NAME, AGE]),
        IndexType::Range,
    );
    assert_eq!(
        host.provider.initial_state(&reshaped).unwrap(),
        IndexState::Populating
    );
}

#[test]
fn test_drop_index_removes_files() {
    let host = TestHost::new();
    let index = name_index(1);
    {
        let populator = host.provider.populator(&index).unwrap();
        populator.create().unwrap();
        populator.scan_completed().unwrap();
        populator.close(true).unwrap();
    }
    let dir = host.provider.index_dir(&index);
    assert!(dir.exists());

    host.provider.drop_index(&index).unwrap();
    assert!(!dir.exists());
    host.provider.drop_index(&index).unwrap();
}

#[test]
fn test_accessor_drop_removes_files() {
    let host = TestHost::new();
    let index = name_index(1);
    {
        let populator = host.provider.populator(&index).unwrap();
        populator.create().unwrap();
        populator.scan_completed().unwrap();
        populator.close(true).unwrap();
    }
    let accessor = host.provider.online_accessor(&index).unwrap();
    accessor.drop().unwrap();
    assert!(!host.provider.index_dir(&index).exists());
}

#[test]
fn test_accessor_consistency_and_force() {
    let host = TestHost::new();
    let index = name_index(1);
    {
        let populator = host.provider.populator(&index).unwrap();
        populator.create().unwrap();
        let batch: Vec<_> = (0..200)
            .map(|i| rangeidx::IndexEntryUpdate::add(i, text(&format!("name-{:03}", i))))
            .collect();
        populator.add(&batch).unwrap();
        populator.scan_completed().unwrap();
        populator.close(true).unwrap();
    }
    let accessor = host.provider.online_accessor(&index).unwrap();
    accessor.force().unwrap();
    let report = accessor.consistency_check().unwrap();
    assert_eq!(report.entries, 200);
    assert_eq!(accessor.descriptor().capability, CapabilityTag::Range);
}

// =============================================================================
// Registry Tests
// =============================================================================

#[test]
fn test_registry_default_provider() {
    let host = TestHost::new();
    let providers = IndexProviders::with_range_provider(host.config.clone(), tokens()).unwrap();

    assert_eq!(providers.names(), vec!["range-1.0".to_string()]);
    let provider = providers.default_provider().unwrap();
    assert_eq!(provider.provider_descriptor().key, RANGE_PROVIDER_KEY);

    let completed = host.completed(&name_index(1));
    assert!(providers.provider_for(&completed).is_ok());
    assert!(providers.provider_for(&name_index(1)).is_ok());
}

#[test]
fn test_registry_rejects_duplicates_and_unknown_names() {
    let host = TestHost::new();
    let mut providers =
        IndexProviders::with_range_provider(host.config.clone(), tokens()).unwrap();

    let again = RangeIndexProvider::new(host.config.clone(), tokens()).unwrap();
    assert!(matches!(
        providers.register(Arc::new(again)),
        Err(IndexError::InvalidArgument(_))
    ));
    assert!(providers.lookup("text-2.0").is_err());

    let foreign = name_index(1).with_provider(ProviderDescriptor::new("text", "2.0"));
    assert!(providers.provider_for(&foreign).is_err());
}

#[test]
fn test_registry_unknown_default() {
    let providers = IndexProviders::new("native-btree-1.0");
    assert!(matches!(
        providers.default_provider(),
        Err(IndexError::InvalidArgument(_))
    ));
}
