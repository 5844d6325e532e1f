//! Index Population Job
//!
//! Background thread that builds one index from a scan of the existing
//! entities.
//!
//! ## Flow
//! ```text
//!   start() ── populator.create() ── spawn ──┐
//!                                            ▼
//!        ┌──► next ids ──► lock ids (shared) ──► read values ──► add ──┐
//!        └────────────────────────────────────────────────────────────┘
//!                                            │ scan exhausted
//!                                            ▼
//!                          scan_completed() ──► close(true)
//! ```
//!
//! Any error or a cancellation closes the populator as failed; a cancelled
//! population never comes online.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::error::{IndexError, Result};
use crate::locks::{LockMode, LockResource, LockService};
use crate::populator::IndexPopulator;
use crate::schema::EntityType;
use crate::update::IndexEntryUpdate;
use crate::value::Value;

const CANCELLED: &str = "Index population was cancelled";

/// Source of the entities an index is populated from
pub trait EntityScan: Send {
    /// Next ids of the scan, at most `max`. Empty once the scan is done.
    fn next_ids(&mut self, max: usize) -> Result<Vec<u64>>;

    /// Current indexed values of `ids`. Entities that do not belong in the
    /// index are left out.
    fn read_values(&mut self, ids: &[u64]) -> Result<Vec<(u64, Vec<Value>)>>;
}

/// Population of one index, ready to start
pub struct IndexPopulationJob {
    populator: Arc<IndexPopulator>,
    scan: Box<dyn EntityScan>,
    locks: Arc<dyn LockService>,
    batch_size: usize,
}

impl IndexPopulationJob {
    pub fn new(
        populator: Arc<IndexPopulator>,
        scan: Box<dyn EntityScan>,
        locks: Arc<dyn LockService>,
        batch_size: usize,
    ) -> Self {
        Self {
            populator,
            scan,
            locks,
            batch_size: batch_size.max(1),
        }
    }

    /// Create the populator's store, then scan on a background thread.
    /// Transactions may attach populating updaters as soon as this returns.
    pub fn start(self) -> Result<PopulationJobHandle> {
        self.populator.create()?;

        let cancelled = Arc::new(AtomicBool::new(false));
        let name = format!("index-population-{}", self.populator.descriptor().id);
        let flag = cancelled.clone();
        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || self.run(&flag))?;

        Ok(PopulationJobHandle {
            cancelled,
            thread: Some(thread),
        })
    }

    fn run(mut self, cancelled: &AtomicBool) -> Result<()> {
        let started = Instant::now();
        let index = self.populator.descriptor().name.clone();
        tracing::info!("Population of index {} started", index);

        match self.scan_all(cancelled) {
            Ok(scanned) => {
                // scan_completed marks the index failed itself on a conflict
                if let Err(e) = self.populator.scan_completed() {
                    self.fail(&e)?;
                    return Err(e);
                }
                self.populator.close(true)?;
                tracing::info!(
                    "Population of index {} finished: {} entities in {:?}",
                    index,
                    scanned,
                    started.elapsed()
                );
                Ok(())
            }
            Err(e) => {
                self.fail(&e)?;
                Err(e)
            }
        }
    }

    fn scan_all(&mut self, cancelled: &AtomicBool) -> Result<u64> {
        let entity_type = self.populator.descriptor().entity_type();
        let mut scanned = 0u64;
        loop {
            if cancelled.load(Ordering::Acquire) {
                return Err(IndexError::PopulationAborted(CANCELLED.to_string()));
            }
            let ids = self.scan.next_ids(self.batch_size)?;
            if ids.is_empty() {
                return Ok(scanned);
            }

            let requests: Vec<(LockResource, LockMode)> = ids
                .iter()
                .map(|id| (entity_resource(entity_type, *id), LockMode::Shared))
                .collect();
            let _guard = self.locks.acquire_all(&requests);

            let batch: Vec<IndexEntryUpdate> = self
                .scan
                .read_values(&ids)?
                .into_iter()
                .map(|(id, values)| IndexEntryUpdate::add(id, values))
                .collect();
            self.populator.add(&batch)?;
            scanned += ids.len() as u64;
        }
    }

    fn fail(&self, error: &IndexError) -> Result<()> {
        if !error.is_constraint_violation() {
            self.populator.mark_as_failed(error.to_string())?;
        }
        self.populator.close(false)
    }
}

fn entity_resource(entity_type: EntityType, id: u64) -> LockResource {
    match entity_type {
        EntityType::Node => LockResource::Node(id),
        EntityType::Relationship => LockResource::Relationship(id),
    }
}

/// Handle on a running population
pub struct PopulationJobHandle {
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl PopulationJobHandle {
    /// Ask the job to stop after the batch in progress
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the job and return its outcome
    pub fn join(mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| {
                IndexError::IllegalState("Index population thread panicked".to_string())
            })?,
            None => Ok(()),
        }
    }
}
