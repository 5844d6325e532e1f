//! Conflict-detecting merge policy
//!
//! The store consults a [`ValueMerger`] when a merge-insert finds an entry
//! that compares equal to the new key. Merging never mutates anything; the
//! decision comes back as a value and the caller decides whether to roll
//! back.
//!
//! ## Responsibilities
//! - Detect equal value tuples owned by different entities
//! - Track the last conflict of a batch until it is reported
//! - Turn a conflict into a user-facing `ConstraintViolation`

use std::sync::Arc;

use crate::error::{IndexError, Result};
use crate::key::{self, KeyComparison};
use crate::schema::{IndexDescriptor, SchemaEntity, TokenNameLookup};
use crate::value::{display_tuple, Value};

/// What the store should do with the existing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Keep the existing entry, drop the new key
    Unchanged,
    /// Replace the existing entry with the new key
    Replaced,
    /// Remove the existing entry, drop the new key
    Removed,
}

/// Two entities holding the same value tuple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRecord {
    pub existing_entity_id: u64,
    pub added_entity_id: u64,
    /// The key that was being added
    pub key: Vec<u8>,
}

/// Result of one merge call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeDecision {
    pub outcome: MergeOutcome,
    pub conflict: Option<ConflictRecord>,
}

/// Merge policy consulted on a merge-insert collision
pub trait ValueMerger: Send + Sync {
    /// Decide what happens to `existing` when `new` compares equal to it
    fn merge(&self, existing: &[u8], new: &[u8]) -> Result<MergeDecision>;

    /// Comparison the store uses to find the colliding entry
    fn comparison(&self) -> KeyComparison;
}

/// Keeps existing entries and reports a conflict when the colliding entry
/// belongs to a different entity
#[derive(Debug, Clone, Copy)]
pub struct ConflictDetectingMerger {
    compare_entity_ids: bool,
}

impl ConflictDetectingMerger {
    /// `compare_entity_ids` makes keys of different entities distinct, so only
    /// an identical key collides. Populators use that mode and check
    /// uniqueness once the scan is done; online updaters compare values only.
    pub fn new(compare_entity_ids: bool) -> Self {
        Self { compare_entity_ids }
    }
}

impl ValueMerger for ConflictDetectingMerger {
    fn merge(&self, existing: &[u8], new: &[u8]) -> Result<MergeDecision> {
        let existing_entity_id = key::entity_id(existing)?;
        let added_entity_id = key::entity_id(new)?;
        let conflict = (existing_entity_id != added_entity_id).then(|| ConflictRecord {
            existing_entity_id,
            added_entity_id,
            key: new.to_vec(),
        });
        Ok(MergeDecision {
            outcome: MergeOutcome::Unchanged,
            conflict,
        })
    }

    fn comparison(&self) -> KeyComparison {
        if self.compare_entity_ids {
            KeyComparison::Full
        } else {
            KeyComparison::ValueOnly
        }
    }
}

// =============================================================================
// Conflict Reporting
// =============================================================================

/// Builds constraint violation errors for one index
#[derive(Clone)]
pub struct ConflictReporter {
    descriptor: Arc<IndexDescriptor>,
    tokens: Arc<dyn TokenNameLookup>,
}

impl ConflictReporter {
    pub fn new(descriptor: Arc<IndexDescriptor>, tokens: Arc<dyn TokenNameLookup>) -> Self {
        Self { descriptor, tokens }
    }

    pub fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    /// Violation for `added` colliding with `existing` on `values`
    pub fn violation(&self, existing: u64, added: u64, values: Vec<Value>) -> IndexError {
        let message = self.message(existing, added, &values);
        tracing::debug!("Uniqueness conflict on index {}: {}", self.descriptor.name, message);
        IndexError::ConstraintViolation {
            existing_entity_id: existing,
            added_entity_id: added,
            values,
            message,
        }
    }

    /// Violation described by a conflict record, values decoded from its key
    pub fn violation_for(&self, record: &ConflictRecord) -> Result<IndexError> {
        let (values, _) = key::decode_key(&record.key, self.descriptor.slot_count())?;
        Ok(self.violation(record.existing_entity_id, record.added_entity_id, values))
    }

    fn message(&self, existing: u64, added: u64, values: &[Value]) -> String {
        let schema = &self.descriptor.schema;
        let entity = self.descriptor.entity_type();
        let token = match &schema.entity {
            SchemaEntity::Label(l) => format!("label `{}`", self.tokens.label_name(*l)),
            SchemaEntity::RelationshipType(t) => {
                format!("type `{}`", self.tokens.relationship_type_name(*t))
            }
            SchemaEntity::AnyToken(_) | SchemaEntity::MultiToken(..) => {
                format!("schema {}", schema.user_description(self.tokens.as_ref()))
            }
        };
        let properties = if schema.property_ids.len() == 1 {
            format!(
                "property `{}` = {}",
                self.tokens.property_key_name(schema.property_ids[0]),
                display_tuple(values)
            )
        } else {
            let pairs: Vec<String> = schema
                .property_ids
                .iter()
                .zip(values)
                .map(|(p, v)| format!("`{}` = {}", self.tokens.property_key_name(*p), v))
                .collect();
            format!("properties {}", pairs.join(", "))
        };
        format!(
            "Both {} {} and {} {} have the {} and {}",
            entity, existing, entity, added, token, properties
        )
    }
}

/// Remembers the last conflict seen in a batch until it is reported
pub struct ConflictTracker {
    reporter: ConflictReporter,
    conflict: Option<ConflictRecord>,
}

impl ConflictTracker {
    pub fn new(reporter: ConflictReporter) -> Self {
        Self {
            reporter,
            conflict: None,
        }
    }

    /// Take note of a merge decision's conflict, if any
    pub fn record(&mut self, conflict: Option<ConflictRecord>) {
        if conflict.is_some() {
            self.conflict = conflict;
        }
    }

    pub fn was_conflicting(&self) -> bool {
        self.conflict.is_some()
    }

    /// Fail with the recorded conflict, if there is one
    pub fn check_conflict(&mut self, values: &[Value]) -> Result<()> {
        if self.was_conflicting() {
            return self.report_conflict(values);
        }
        Ok(())
    }

    /// Fail with the recorded conflict and clear it
    pub fn report_conflict(&mut self, values: &[Value]) -> Result<()> {
        match self.conflict.take() {
            Some(c) => Err(self
                .reporter
                .violation(c.existing_entity_id, c.added_entity_id, values.to_vec())),
            None => Err(IndexError::IllegalState(
                "No conflict has been recorded".to_string(),
            )),
        }
    }
}

/// Walk keys in index order and fail on the first pair of neighbours that
/// hold the same value tuple for different entities
pub fn verify_unique<I>(keys: I, reporter: &ConflictReporter) -> Result<()>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    let merger = ConflictDetectingMerger::new(false);
    let mut previous: Option<Vec<u8>> = None;
    for current in keys {
        if let Some(prev) = &previous {
            if key::compare_keys(prev, &current, KeyComparison::ValueOnly)?.is_eq() {
                if let Some(conflict) = merger.merge(prev, &current)?.conflict {
                    return Err(reporter.violation_for(&conflict)?);
                }
            }
        }
        previous = Some(current);
    }
    Ok(())
}
