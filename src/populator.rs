//! Index Populator Module
//!
//! Builds a new index from a bulk scan of existing entities while
//! transactions keep changing those entities.
//!
//! ## Responsibilities
//! - Replace (archive or delete) the files of a previous attempt
//! - Absorb bulk scan batches and concurrent transactional updates
//! - Verify uniqueness once the scan is done
//! - Persist the outcome: `Online` or `Failed` with a message
//!
//! ## Update Flow
//! ```text
//!   scan batches ──add()─────────────────────────┐
//!                                                ▼
//!   tx updaters ──close()──► bounded queue ──► apply lock ──► Store
//!                     │ (queue full)              ▲
//!                     └──── drain, then apply ────┘
//! ```
//!
//! A successful `close` hands the store over to online access: it stays
//! registered in the provider's open stores, and transactions that were
//! still in flight apply to it the way an online updater would.
//!
//! Both streams insert with full key comparison, so adding a key that is
//! already present is a no-op and the order in which the streams reach the
//! store does not matter. Uniqueness is checked once, by `scan_completed`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{IndexError, Result};
use crate::merger::{self, ConflictDetectingMerger, ConflictReporter};
use crate::schema::{IndexDescriptor, TokenNameLookup};
use crate::store::{IndexSample, IndexState, OpenStores, Store, StoreOptions, DB_FILE};
use crate::update::{self, IndexEntryUpdate};

/// Failure message used when a population is closed without success
const NOT_COMPLETED: &str = "Index population was not completed";

/// Lifecycle of one populator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PopulatorState {
    Created,
    Populating,
    Online,
    Failed,
}

/// State shared between the populator and its updaters
struct Shared {
    descriptor: Arc<IndexDescriptor>,
    dir: PathBuf,
    archive_failed_index: bool,
    store_options: StoreOptions,
    reporter: ConflictReporter,
    stores: Arc<OpenStores>,

    /// Present from `create` on; an unsuccessful `close` releases it
    store: RwLock<Option<Arc<Store>>>,
    closed: AtomicBool,
    state: Mutex<PopulatorState>,
    failure: Mutex<Option<String>>,

    /// Transaction batches waiting to be applied
    queue_tx: Sender<Vec<IndexEntryUpdate>>,
    queue_rx: Receiver<Vec<IndexEntryUpdate>>,

    /// Serializes every write into the store
    apply_lock: Mutex<()>,

    /// Held shared while an updater hands over a batch and exclusively while
    /// the population completes, so no batch is queued after the last drain
    completion: RwLock<()>,
}

/// Populates one index
pub struct IndexPopulator {
    shared: Arc<Shared>,
}

impl IndexPopulator {
    /// A populator for `descriptor` writing to `dir`. Nothing touches the
    /// file system until `create`.
    pub fn new(
        descriptor: Arc<IndexDescriptor>,
        dir: PathBuf,
        config: &Config,
        tokens: Arc<dyn TokenNameLookup>,
        stores: Arc<OpenStores>,
    ) -> Self {
        let (queue_tx, queue_rx) = channel::bounded(config.population_queue_capacity);
        let store_options = StoreOptions::from_config(config, descriptor.slot_count());
        Self {
            shared: Arc::new(Shared {
                reporter: ConflictReporter::new(descriptor.clone(), tokens),
                descriptor,
                dir,
                archive_failed_index: config.archive_failed_index,
                store_options,
                stores,
                store: RwLock::new(None),
                closed: AtomicBool::new(false),
                state: Mutex::new(PopulatorState::Created),
                failure: Mutex::new(None),
                queue_tx,
                queue_rx,
                apply_lock: Mutex::new(()),
                completion: RwLock::new(()),
            }),
        }
    }

    pub fn descriptor(&self) -> &IndexDescriptor {
        &self.shared.descriptor
    }

    pub fn state(&self) -> PopulatorState {
        *self.shared.state.lock()
    }

    pub fn dir(&self) -> &Path {
        &self.shared.dir
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Set aside files of a previous attempt and start an empty store
    pub fn create(&self) -> Result<()> {
        let shared = &self.shared;
        let mut state = shared.state.lock();
        if *state != PopulatorState::Created {
            return Err(IndexError::IllegalState(format!(
                "Populator for {} was already created (state {:?})",
                shared.descriptor.name, *state
            )));
        }

        if shared.dir.exists() {
            Store::ensure_not_open(&shared.dir)?;
            if shared.archive_failed_index && shared.dir.join(DB_FILE).exists() {
                let archive = archive_path(&shared.dir, shared.descriptor.id)?;
                fs::rename(&shared.dir, &archive)?;
                tracing::info!(
                    "Archived previous files of index {} to {:?}",
                    shared.descriptor.name,
                    archive
                );
            } else {
                fs::remove_dir_all(&shared.dir)?;
            }
        }

        let store = Arc::new(Store::create(&shared.dir, &shared.store_options)?);
        shared.stores.register(&store);
        *shared.store.write() = Some(store);
        *state = PopulatorState::Populating;

        tracing::info!(
            "Started population of index {} in {:?}",
            shared.descriptor.name,
            shared.dir
        );
        Ok(())
    }

    /// Add a batch of scanned entities
    pub fn add(&self, batch: &[IndexEntryUpdate]) -> Result<()> {
        self.shared.require_state(PopulatorState::Populating, "add")?;
        let store = self.shared.store()?;
        let _apply = self.shared.apply_lock.lock();
        self.shared.apply_populating(&store, batch)
    }

    /// Updater feeding one transaction's changes into the population
    pub fn new_populating_updater(&self) -> PopulatingUpdater {
        PopulatingUpdater {
            shared: self.shared.clone(),
            updates: Vec::new(),
        }
    }

    /// Apply queued transaction batches, then check uniqueness. A clean
    /// index becomes `Online`; a conflict fails the population.
    pub fn scan_completed(&self) -> Result<()> {
        let shared = &self.shared;
        shared.require_state(PopulatorState::Populating, "scan_completed")?;
        let store = shared.store()?;

        let _completion = shared.completion.write();
        let _apply = shared.apply_lock.lock();
        let drained = shared.drain_queue(&store)?;

        if shared.descriptor.unique {
            if let Err(violation) = merger::verify_unique(store.snapshot().iter(), &shared.reporter) {
                if violation.is_constraint_violation() {
                    shared.fail(&store, violation.to_string())?;
                }
                return Err(violation);
            }
        }

        store.set_state(IndexState::Online, None)?;
        *shared.state.lock() = PopulatorState::Online;
        tracing::info!(
            "Index {} is online ({} entries, {} queued batches applied at completion)",
            shared.descriptor.name,
            store.entry_count(),
            drained
        );
        Ok(())
    }

    /// Record why the population failed. Persisted right away and again on
    /// `close(false)`.
    pub fn mark_as_failed(&self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        let shared = &self.shared;
        if shared.closed.load(Ordering::Acquire) && self.state() == PopulatorState::Online {
            return Err(IndexError::IllegalState(format!(
                "Index {} is already online",
                shared.descriptor.name
            )));
        }
        let store = shared.store.read().clone();
        match store {
            Some(store) => shared.fail(&store, message),
            None => {
                *shared.failure.lock() = Some(message);
                *shared.state.lock() = PopulatorState::Failed;
                Ok(())
            }
        }
    }

    /// Finish the population. A successful close needs `scan_completed` to
    /// have brought the index online and hands the store over to online
    /// access; an unsuccessful one persists the failure and releases it.
    pub fn close(&self, successful: bool) -> Result<()> {
        let shared = &self.shared;
        if shared.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        let state = *shared.state.lock();

        if successful {
            if state != PopulatorState::Online {
                return Err(IndexError::IllegalState(format!(
                    "Index {} cannot close successfully in state {:?}",
                    shared.descriptor.name, state
                )));
            }
            shared.store()?.checkpoint()?;
            tracing::info!("Closed populator of index {}", shared.descriptor.name);
        } else {
            let store = match shared.store.write().take() {
                Some(store) => store,
                None => return Ok(()),
            };
            let message = shared
                .failure
                .lock()
                .clone()
                .unwrap_or_else(|| NOT_COMPLETED.to_string());
            shared.fail(&store, message)?;
        }
        shared.closed.store(true, Ordering::Release);
        Ok(())
    }

    /// Size statistics of what has been populated so far
    pub fn sample_result(&self) -> Result<IndexSample> {
        Ok(self.shared.store()?.sample())
    }

    /// Failure message, once the population failed
    pub fn failure_message(&self) -> Option<String> {
        self.shared.failure.lock().clone()
    }
}

impl Shared {
    fn store(&self) -> Result<Arc<Store>> {
        self.store.read().clone().ok_or_else(|| {
            IndexError::IllegalState(format!(
                "Populator of index {} has no open store",
                self.descriptor.name
            ))
        })
    }

    fn require_state(&self, expected: PopulatorState, operation: &str) -> Result<()> {
        let state = *self.state.lock();
        if state != expected {
            return Err(IndexError::IllegalState(format!(
                "Cannot {} on index {} in state {:?}",
                operation, self.descriptor.name, state
            )));
        }
        Ok(())
    }

    /// Apply one batch with idempotent inserts. Caller holds the apply lock.
    fn apply_populating(&self, store: &Store, batch: &[IndexEntryUpdate]) -> Result<()> {
        let mut writer = store.writer();
        let merger = ConflictDetectingMerger::new(true);
        match update::apply_updates(&mut writer, batch, &merger, None) {
            Ok(()) => writer.commit(),
            Err(e) => {
                writer.rollback();
                Err(e)
            }
        }
    }

    /// Apply a batch the way an online updater would. Used for transactions
    /// that close after the population already completed.
    fn apply_online(&self, store: &Store, batch: &[IndexEntryUpdate]) -> Result<()> {
        let mut writer = store.writer();
        let unique = self.descriptor.unique;
        let merger = ConflictDetectingMerger::new(!unique);
        let reporter = unique.then_some(&self.reporter);
        match update::apply_updates(&mut writer, batch, &merger, reporter) {
            Ok(()) => writer.commit(),
            Err(e) => {
                writer.rollback();
                Err(e)
            }
        }
    }

    /// Apply every queued batch in arrival order. Caller holds the apply lock.
    fn drain_queue(&self, store: &Store) -> Result<usize> {
        let mut drained = 0;
        while let Ok(batch) = self.queue_rx.try_recv() {
            self.apply_populating(store, &batch)?;
            drained += 1;
        }
        Ok(drained)
    }

    fn fail(&self, store: &Store, message: String) -> Result<()> {
        tracing::warn!("Population of index {} failed: {}", self.descriptor.name, message);
        *self.failure.lock() = Some(message.clone());
        *self.state.lock() = PopulatorState::Failed;
        store.set_state(IndexState::Failed, Some(message))
    }
}

// =============================================================================
// Populating Updater
// =============================================================================

/// Collects one transaction's updates to an index under population
pub struct PopulatingUpdater {
    shared: Arc<Shared>,
    updates: Vec<IndexEntryUpdate>,
}

impl PopulatingUpdater {
    pub fn process(&mut self, update: IndexEntryUpdate) {
        self.updates.push(update);
    }

    /// Hand the batch to the population. Applied right away when the queue
    /// is full, after everything queued before it.
    pub fn close(mut self) -> Result<()> {
        let batch = std::mem::take(&mut self.updates);
        if batch.is_empty() {
            return Ok(());
        }
        let shared = &self.shared;
        let _completion = shared.completion.read();
        let state = *shared.state.lock();
        match state {
            PopulatorState::Created => Err(IndexError::IllegalState(format!(
                "Index {} received updates before population started",
                shared.descriptor.name
            ))),
            PopulatorState::Failed => {
                tracing::debug!(
                    "Dropped {} updates for failed index {}",
                    batch.len(),
                    shared.descriptor.name
                );
                Ok(())
            }
            PopulatorState::Online => {
                let store = shared.store()?;
                let _apply = shared.apply_lock.lock();
                shared.apply_online(&store, &batch)
            }
            PopulatorState::Populating => match shared.queue_tx.try_send(batch) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(batch)) | Err(TrySendError::Disconnected(batch)) => {
                    let store = shared.store()?;
                    let _apply = shared.apply_lock.lock();
                    shared.drain_queue(&store)?;
                    shared.apply_populating(&store, &batch)
                }
            },
        }
    }
}

/// Free archive location next to an index directory
fn archive_path(dir: &Path, index_id: u64) -> Result<PathBuf> {
    let parent = dir.parent().ok_or_else(|| {
        IndexError::InvalidArgument(format!("Index directory {:?} has no parent", dir))
    })?;
    let mut millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    loop {
        let candidate = parent.join(format!("archive-{}-{}", index_id, millis));
        if !candidate.exists() {
            return Ok(candidate);
        }
        millis += 1;
    }
}
