//! Online Index Access
//!
//! Reads and transactional writes against an index that finished population.
//!
//! ## Responsibilities
//! - Readers over a consistent snapshot, answering composite queries
//! - Updaters applying one transaction's changes as a single batch
//! - Rejecting uniqueness violations, rolling the whole batch back
//! - Checkpoint, sampling, consistency checks and drop

use std::fs;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use crate::capability::{capability_for, IndexCapability, IndexOrderCapability};
use crate::config::Config;
use crate::error::{IndexError, Result};
use crate::key::{self, ScanRange};
use crate::merger::{self, ConflictDetectingMerger, ConflictReporter};
use crate::query::IndexQuery;
use crate::schema::{IndexDescriptor, TokenNameLookup};
use crate::store::{
    ConsistencyReport, Direction, IndexSample, IndexState, OpenStores, Seek, Snapshot, Store,
    StoreOptions,
};
use crate::update::{self, IndexEntryUpdate};
use crate::value::Value;

/// How an updater treats its batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexUpdateMode {
    /// Live transactions; unique indexes reject conflicting additions
    Online,
    /// Replay of already validated changes after a crash; idempotent and
    /// never rejects
    Recovery,
}

/// Requested result order of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrder {
    None,
    Ascending,
    Descending,
}

// =============================================================================
// Accessor
// =============================================================================

/// Access to one online index
pub struct IndexAccessor {
    descriptor: Arc<IndexDescriptor>,
    store: Arc<Store>,
    stores: Arc<OpenStores>,
    reporter: ConflictReporter,
}

impl IndexAccessor {
    /// Access the index stored in `dir`. Reuses the store a populator or
    /// another accessor already holds; only an `Online` index can be opened.
    pub fn open(
        descriptor: Arc<IndexDescriptor>,
        dir: &Path,
        config: &Config,
        tokens: Arc<dyn TokenNameLookup>,
        stores: Arc<OpenStores>,
    ) -> Result<Self> {
        let options = StoreOptions::from_config(config, descriptor.slot_count());
        let store = stores.get_or_open(dir, &options)?;
        if store.slot_count() != descriptor.slot_count() {
            return Err(IndexError::InvalidArgument(format!(
                "Index {} has {} slots but its store holds {}",
                descriptor.name,
                descriptor.slot_count(),
                store.slot_count()
            )));
        }
        if store.state() != IndexState::Online {
            return Err(IndexError::IllegalState(format!(
                "Index {} is {:?}, not online",
                descriptor.name,
                store.state()
            )));
        }
        tracing::debug!("Opened online accessor for index {}", descriptor.name);
        Ok(Self {
            reporter: ConflictReporter::new(descriptor.clone(), tokens),
            descriptor,
            store,
            stores,
        })
    }

    pub fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    /// Reader over the index as of now
    pub fn new_reader(&self) -> IndexReader {
        IndexReader {
            descriptor: self.descriptor.clone(),
            snapshot: self.store.snapshot(),
        }
    }

    /// Updater for one transaction's changes
    pub fn new_updater(&self, mode: IndexUpdateMode) -> IndexUpdater<'_> {
        IndexUpdater {
            accessor: self,
            mode,
            updates: Vec::new(),
        }
    }

    /// Make every applied change durable in the page file
    pub fn force(&self) -> Result<()> {
        self.store.checkpoint()
    }

    /// Close the index and delete its files
    pub fn drop(self) -> Result<()> {
        let dir = self.store.dir().to_path_buf();
        self.stores.remove(&dir);
        drop(self.store);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        tracing::info!("Dropped index {} at {:?}", self.descriptor.name, dir);
        Ok(())
    }

    /// Checkpoint and close
    pub fn close(self) -> Result<()> {
        self.store.checkpoint()?;
        tracing::debug!("Closed index {}", self.descriptor.name);
        Ok(())
    }

    pub fn sample(&self) -> IndexSample {
        self.store.sample()
    }

    /// Fail if two entities share a value tuple on a unique index
    pub fn verify_deferred_constraints(&self) -> Result<()> {
        if !self.descriptor.unique {
            return Ok(());
        }
        merger::verify_unique(self.store.snapshot().iter(), &self.reporter)
    }

    pub fn consistency_check(&self) -> Result<ConsistencyReport> {
        self.store.consistency_check()
    }
}

// =============================================================================
// Updater
// =============================================================================

/// Collects one transaction's updates and applies them as one batch
pub struct IndexUpdater<'a> {
    accessor: &'a IndexAccessor,
    mode: IndexUpdateMode,
    updates: Vec<IndexEntryUpdate>,
}

impl IndexUpdater<'_> {
    pub fn process(&mut self, update: IndexEntryUpdate) {
        self.updates.push(update);
    }

    /// Apply the batch. A uniqueness violation rolls back every change of
    /// the batch and is returned as `ConstraintViolation`.
    pub fn close(self) -> Result<()> {
        if self.updates.is_empty() {
            return Ok(());
        }
        let accessor = self.accessor;
        let check_unique = accessor.descriptor.unique && self.mode == IndexUpdateMode::Online;
        let merger = ConflictDetectingMerger::new(!check_unique);
        let reporter = check_unique.then_some(&accessor.reporter);

        let mut writer = accessor.store.writer();
        match update::apply_updates(&mut writer, &self.updates, &merger, reporter) {
            Ok(()) => writer.commit(),
            Err(e) => {
                writer.rollback();
                tracing::debug!(
                    "Rolled back {} updates on index {}: {}",
                    self.updates.len(),
                    accessor.descriptor.name,
                    e
                );
                Err(e)
            }
        }
    }
}

// =============================================================================
// Reader
// =============================================================================

/// One matching index entry
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub entity_id: u64,
    pub values: Vec<Value>,
}

/// Queries against a fixed snapshot of an index
pub struct IndexReader {
    descriptor: Arc<IndexDescriptor>,
    snapshot: Snapshot,
}

impl IndexReader {
    /// Entries matching one predicate per slot, lazily
    pub fn query(&self, order: IndexOrder, queries: &[IndexQuery]) -> Result<IndexHits> {
        let capability = capability_for(self.descriptor.capability);
        self.validate(capability, order, queries)?;

        let range = ScanRange::for_queries(queries)?;
        let direction = match order {
            IndexOrder::Descending => Direction::Descending,
            IndexOrder::None | IndexOrder::Ascending => Direction::Ascending,
        };
        Ok(IndexHits {
            seek: self.snapshot.seek_range(&range, direction),
            range,
            slots: self.descriptor.slot_count(),
        })
    }

    /// Number of entries `entity_id` has for `values`, normally 0 or 1
    pub fn count_entities(&self, entity_id: u64, values: &[Value]) -> Result<u64> {
        if values.len() != self.descriptor.slot_count() {
            return Err(IndexError::InvalidArgument(format!(
                "Index {} has {} slots, got {} values",
                self.descriptor.name,
                self.descriptor.slot_count(),
                values.len()
            )));
        }
        let encoded = key::encode_key(values, entity_id)?;
        let prefix = key::entity_prefix(&encoded)?.to_vec();
        let upper = match key::successor(&prefix) {
            Some(next) => Bound::Excluded(next),
            None => Bound::Unbounded,
        };
        let count = self
            .snapshot
            .seek(Bound::Included(prefix), upper, Direction::Ascending)
            .count();
        Ok(count as u64)
    }

    fn validate(
        &self,
        capability: &dyn IndexCapability,
        order: IndexOrder,
        queries: &[IndexQuery],
    ) -> Result<()> {
        let properties = &self.descriptor.schema.property_ids;
        if queries.len() != properties.len() {
            return Err(IndexError::InvalidArgument(format!(
                "Index {} has {} slots, got {} predicates",
                self.descriptor.name,
                properties.len(),
                queries.len()
            )));
        }

        let mut categories = Vec::with_capacity(queries.len());
        for (query, property) in queries.iter().zip(properties) {
            if query.property() != Some(*property) {
                return Err(IndexError::InvalidArgument(format!(
                    "Predicate {:?} does not match slot property {}",
                    query, property
                )));
            }
            let category = query.value_category();
            if !capability.is_query_supported(query.query_type(), category) {
                return Err(IndexError::InvalidArgument(format!(
                    "Index {} does not support {:?} queries on {:?} values",
                    self.descriptor.name,
                    query.query_type(),
                    category
                )));
            }
            categories.push(category);
        }

        if order != IndexOrder::None {
            let supported = match capability.order_capability(&categories) {
                IndexOrderCapability::BothFullySorted => true,
                IndexOrderCapability::AscendingOnly => order == IndexOrder::Ascending,
                IndexOrderCapability::None => false,
            };
            if !supported {
                return Err(IndexError::InvalidArgument(format!(
                    "Index {} cannot return {:?} results",
                    self.descriptor.name, order
                )));
            }
        }
        Ok(())
    }
}

/// Lazy query results in key order
pub struct IndexHits {
    seek: Seek,
    range: ScanRange,
    slots: usize,
}

impl Iterator for IndexHits {
    type Item = Result<IndexHit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let key = self.seek.next()?;
            match self.range.accepts(&key) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => return Some(Err(e)),
            }
            return Some(
                key::decode_key(&key, self.slots)
                    .map(|(values, entity_id)| IndexHit { entity_id, values }),
            );
        }
    }
}
