//! Index schema descriptors
//!
//! Identity of an index: what it covers, which properties form its slots,
//! whether it is unique, and which provider and capability serve it.

use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Schema
// =============================================================================

/// Kind of graph entity an index covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Node,
    Relationship,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Node => write!(f, "node"),
            EntityType::Relationship => write!(f, "relationship"),
        }
    }
}

/// Entities selected by a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaEntity {
    /// Nodes carrying one label
    Label(u32),
    /// Relationships of one type
    RelationshipType(u32),
    /// Every entity of a kind (token lookup indexes)
    AnyToken(EntityType),
    /// Entities carrying any of several tokens (fulltext indexes)
    MultiToken(EntityType, Vec<u32>),
}

impl SchemaEntity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            SchemaEntity::Label(_) => EntityType::Node,
            SchemaEntity::RelationshipType(_) => EntityType::Relationship,
            SchemaEntity::AnyToken(t) | SchemaEntity::MultiToken(t, _) => *t,
        }
    }
}

/// Entities plus the ordered property keys that form the index slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub entity: SchemaEntity,
    pub property_ids: Vec<u32>,
}

impl SchemaDescriptor {
    pub fn for_label(label: u32, property_ids: &[u32]) -> Self {
        Self {
            entity: SchemaEntity::Label(label),
            property_ids: property_ids.to_vec(),
        }
    }

    pub fn for_relationship_type(rel_type: u32, property_ids: &[u32]) -> Self {
        Self {
            entity: SchemaEntity::RelationshipType(rel_type),
            property_ids: property_ids.to_vec(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.property_ids.len()
    }

    /// Human readable form, e.g. `(:Person {name, age})`
    pub fn user_description(&self, tokens: &dyn TokenNameLookup) -> String {
        let props: Vec<String> = self
            .property_ids
            .iter()
            .map(|p| tokens.property_key_name(*p))
            .collect();
        let props = props.join(", ");
        match &self.entity {
            SchemaEntity::Label(l) => format!("(:{} {{{}}})", tokens.label_name(*l), props),
            SchemaEntity::RelationshipType(t) => format!(
                "()-[:{} {{{}}}]-()",
                tokens.relationship_type_name(*t),
                props
            ),
            SchemaEntity::AnyToken(t) => format!("(any {} {{{}}})", t, props),
            SchemaEntity::MultiToken(t, ids) => format!("(any {} of {:?} {{{}}})", t, ids, props),
        }
    }
}

// =============================================================================
// Descriptor
// =============================================================================

/// Index type tag as declared by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    Range,
    Text,
    Point,
    Lookup,
    Fulltext,
}

/// Provider identity, e.g. `range-1.0`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderDescriptor {
    pub key: String,
    pub version: String,
}

impl ProviderDescriptor {
    pub fn new(key: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version: version.into(),
        }
    }

    /// Combined name used in configuration and directory names
    pub fn name(&self) -> String {
        format!("{}-{}", self.key, self.version)
    }
}

/// Which capability implementation a completed descriptor carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityTag {
    NoCapability,
    Range,
}

/// Identity of one index. Immutable once created; use the `with_*` methods
/// to derive completed copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub id: u64,
    pub name: String,
    pub schema: SchemaDescriptor,
    pub unique: bool,
    pub index_type: IndexType,
    pub provider: Option<ProviderDescriptor>,
    pub capability: CapabilityTag,
}

impl IndexDescriptor {
    /// A prototype as written at schema-definition time
    pub fn prototype(
        id: u64,
        name: impl Into<String>,
        schema: SchemaDescriptor,
        index_type: IndexType,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            schema,
            unique: false,
            index_type,
            provider: None,
            capability: CapabilityTag::NoCapability,
        }
    }

    /// Prototype of a uniqueness constraint's backing index
    pub fn unique_prototype(
        id: u64,
        name: impl Into<String>,
        schema: SchemaDescriptor,
        index_type: IndexType,
    ) -> Self {
        Self {
            unique: true,
            ..Self::prototype(id, name, schema, index_type)
        }
    }

    pub fn with_provider(&self, provider: ProviderDescriptor) -> Self {
        Self {
            provider: Some(provider),
            ..self.clone()
        }
    }

    pub fn with_capability(&self, capability: CapabilityTag) -> Self {
        Self {
            capability,
            ..self.clone()
        }
    }

    pub fn slot_count(&self) -> usize {
        self.schema.slot_count()
    }

    pub fn entity_type(&self) -> EntityType {
        self.schema.entity.entity_type()
    }
}

impl fmt::Display for IndexDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Index( id={}, name='{}', type='{:?}', unique={}, slots={:?}, provider='{}' )",
            self.id,
            self.name,
            self.index_type,
            self.unique,
            self.schema.property_ids,
            self.provider
                .as_ref()
                .map(|p| p.name())
                .unwrap_or_else(|| "none".to_string())
        )
    }
}

// =============================================================================
// Token Names
// =============================================================================

/// Resolves token ids to display names for messages
pub trait TokenNameLookup: Send + Sync {
    fn label_name(&self, id: u32) -> String;
    fn relationship_type_name(&self, id: u32) -> String;
    fn property_key_name(&self, id: u32) -> String;
}

/// In-memory token names. Unknown ids render as `label[7]` and so on.
#[derive(Debug, Clone, Default)]
pub struct TokenNames {
    labels: HashMap<u32, String>,
    relationship_types: HashMap<u32, String>,
    property_keys: HashMap<u32, String>,
}

impl TokenNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, id: u32, name: impl Into<String>) -> Self {
        self.labels.insert(id, name.into());
        self
    }

    pub fn relationship_type(mut self, id: u32, name: impl Into<String>) -> Self {
        self.relationship_types.insert(id, name.into());
        self
    }

    pub fn property_key(mut self, id: u32, name: impl Into<String>) -> Self {
        self.property_keys.insert(id, name.into());
        self
    }
}

impl TokenNameLookup for TokenNames {
    fn label_name(&self, id: u32) -> String {
        self.labels
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("label[{}]", id))
    }

    fn relationship_type_name(&self, id: u32) -> String {
        self.relationship_types
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("relType[{}]", id))
    }

    fn property_key_name(&self, id: u32) -> String {
        self.property_keys
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("property[{}]", id))
    }
}
