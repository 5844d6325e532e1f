//! Sorted Key Store Module
//!
//! Page-organized sorted set of encoded index keys backing one index.
//!
//! ## Responsibilities
//! - Point lookup and lazy range seek in both directions
//! - Insert, remove and merge-insert through a single writer
//! - Consistent snapshots for readers while a writer mutates
//! - WAL logging of committed batches, checkpoints and crash recovery
//! - Persisted index state and failure message
//! - Exclusive ownership of the index files while open
//!
//! ## Architecture
//! ```text
//!   readers ──► Snapshot (Arc root) ──► Seek
//!                    ▲
//!                    │ publish on commit
//!   StoreWriter ─────┴──► WAL (ops + commit marker)
//!        │
//!        ▼ checkpoint
//!   ┌─────────┬─────────┬──────────────────────────────┐
//!   │ Hdr 0   │ Hdr 1   │ pages (copy-on-write)        │
//!   └─────────┴─────────┴──────────────────────────────┘
//! ```
//!
//! Nodes live in memory as an `Arc`-shared tree. A checkpoint writes every
//! node changed since the previous one to pages the previous checkpoint does
//! not use, then flips the header slot. Until the flip, the previous header
//! and its pages stay intact, and the WAL holds everything committed since.

mod check;
mod cursor;
mod header;
mod node;
mod page;
mod registry;

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek as IoSeek, SeekFrom, Write};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::config::{Config, WalSyncStrategy, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::error::{IndexError, Result};
use crate::key::{self, KeyComparison, ScanRange};
use crate::merger::{ConflictRecord, MergeOutcome, ValueMerger};
use crate::wal::{Operation, WalRecovery, WalWriter};

pub use check::{ConsistencyReport, IndexSample};
pub use cursor::{Direction, Seek};
pub use header::{Header, IndexState, LAYOUT_VERSION, MAX_FAILURE_MESSAGE};
pub use node::PageId;
pub use page::PAGE_HEADER_SIZE;
pub use registry::OpenStores;

use header::{DATA_OFFSET, HEADER_SLOT_SIZE};
use node::{MutationContext, Node, NodeBody};

/// Store file inside an index directory
pub const DB_FILE: &str = "index.db";

/// WAL file inside an index directory
pub const WAL_FILE: &str = "index.wal";

// =============================================================================
// Options
// =============================================================================

/// Settings a store is opened with
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Value slots per key; must match the header of an existing store
    pub slot_count: usize,
    /// Page size for new stores; existing stores keep theirs
    pub page_size: usize,
    pub checkpoint_threshold: u64,
    pub wal_sync_strategy: WalSyncStrategy,
}

impl StoreOptions {
    pub fn from_config(config: &Config, slot_count: usize) -> Self {
        Self {
            slot_count,
            page_size: config.page_size,
            checkpoint_threshold: config.checkpoint_threshold,
            wal_sync_strategy: config.wal_sync_strategy,
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable view of the tree as of one commit
#[derive(Clone)]
pub struct Snapshot {
    root: Arc<Node>,
    entry_count: u64,
}

impl Snapshot {
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        node::contains(&self.root, key)
    }

    /// Keys between two bounds, lazily, in `direction` order
    pub fn seek(&self, lower: Bound<Vec<u8>>, upper: Bound<Vec<u8>>, direction: Direction) -> Seek {
        Seek::new(self.root.clone(), lower, upper, direction)
    }

    /// Keys inside the contiguous part of a query range. Slot filters are
    /// not applied here.
    pub fn seek_range(&self, range: &ScanRange, direction: Direction) -> Seek {
        self.seek(range.lower.clone(), range.upper.clone(), direction)
    }

    /// Every key in ascending order
    pub fn iter(&self) -> Seek {
        self.seek(Bound::Unbounded, Bound::Unbounded, Direction::Ascending)
    }
}

// =============================================================================
// Store
// =============================================================================

/// Lifecycle state plus failure message, as in the header
#[derive(Debug, Clone)]
struct StateRecord {
    state: IndexState,
    failure: Option<String>,
}

/// Everything only the single writer touches
struct WriterState {
    file: File,
    wal: WalWriter,
    /// Pages no checkpoint refers to
    free: Vec<PageId>,
    /// Pages of the last checkpoint that the current tree no longer uses
    pending_free: Vec<PageId>,
    page_count: u64,
    generation: u64,
}

/// One index's sorted key store
pub struct Store {
    dir: PathBuf,
    slot_count: usize,
    page_size: usize,
    checkpoint_threshold: u64,
    published: RwLock<Snapshot>,
    state: RwLock<StateRecord>,
    writer: Mutex<WriterState>,
}

impl Store {
    /// Create an empty store in `dir`, replacing any previous one.
    /// The new store starts out `Populating`.
    pub fn create(dir: &Path, options: &StoreOptions) -> Result<Self> {
        check_page_size(options.page_size)?;
        if options.slot_count == 0 {
            return Err(IndexError::InvalidArgument(
                "A store needs at least one value slot".to_string(),
            ));
        }
        fs::create_dir_all(dir)?;
        Self::ensure_not_open(dir)?;
        for name in [DB_FILE, WAL_FILE] {
            match fs::remove_file(dir.join(name)) {
                Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(dir.join(DB_FILE))?;
        lock_exclusively(&file, dir)?;
        let wal = WalWriter::open(&dir.join(WAL_FILE), options.wal_sync_strategy)?;

        let store = Self {
            dir: dir.to_path_buf(),
            slot_count: options.slot_count,
            page_size: options.page_size,
            checkpoint_threshold: options.checkpoint_threshold,
            published: RwLock::new(Snapshot {
                root: Arc::new(Node::empty_leaf()),
                entry_count: 0,
            }),
            state: RwLock::new(StateRecord {
                state: IndexState::Populating,
                failure: None,
            }),
            writer: Mutex::new(WriterState {
                file,
                wal,
                free: Vec::new(),
                pending_free: Vec::new(),
                page_count: 0,
                generation: 0,
            }),
        };
        store.checkpoint()?;

        tracing::info!(
            "Created index store at {:?} ({} slots, {} byte pages)",
            dir,
            options.slot_count,
            options.page_size
        );
        Ok(store)
    }

    /// Open an existing store, recovering committed WAL batches
    pub fn open(dir: &Path, options: &StoreOptions) -> Result<Self> {
        let db_path = dir.join(DB_FILE);
        let mut file = OpenOptions::new().read(true).write(true).open(&db_path)?;
        lock_exclusively(&file, dir)?;

        let header = read_header(&mut file)?;
        header.validate(options.slot_count)?;
        let page_size = header.page_size as usize;
        check_page_size(page_size)
            .map_err(|_| IndexError::Corruption(format!("Header page size {} is invalid", page_size)))?;

        let mut reachable = HashSet::new();
        let root = load_tree(&mut file, page_size, header.root, header.page_count, &mut reachable)?;
        let mut counted = 0u64;
        node::for_each_key(&root, &mut |_| counted += 1);
        if counted != header.entry_count {
            return Err(IndexError::Corruption(format!(
                "Header records {} entries but the tree holds {}",
                header.entry_count, counted
            )));
        }
        let free: Vec<PageId> = (0..header.page_count)
            .filter(|p| !reachable.contains(p))
            .collect();

        let wal_path = dir.join(WAL_FILE);
        let batches = if wal_path.exists() {
            let (entries, result) = WalRecovery::recover(&wal_path)?;
            if result.entries_corrupted > 0 || result.was_truncated {
                tracing::warn!(
                    "Index WAL {:?} had a damaged tail ({} corrupted entries)",
                    wal_path,
                    result.entries_corrupted
                );
            }
            WalRecovery::committed_batches(entries)
        } else {
            Vec::new()
        };
        let wal = WalWriter::open(&wal_path, options.wal_sync_strategy)?;

        tracing::info!(
            "Opened index store at {:?} (generation {}, {} entries, state {:?})",
            dir,
            header.generation,
            header.entry_count,
            header.state
        );

        let store = Self {
            dir: dir.to_path_buf(),
            slot_count: options.slot_count,
            page_size,
            checkpoint_threshold: options.checkpoint_threshold,
            published: RwLock::new(Snapshot {
                root: Arc::new(root),
                entry_count: header.entry_count,
            }),
            state: RwLock::new(StateRecord {
                state: header.state,
                failure: header.failure.clone(),
            }),
            writer: Mutex::new(WriterState {
                file,
                wal,
                free,
                pending_free: Vec::new(),
                page_count: header.page_count,
                generation: header.generation,
            }),
        };

        if !batches.is_empty() {
            let replayed = batches.len();
            let mut writer = store.writer_inner(false);
            for batch in batches {
                for op in batch {
                    match op {
                        Operation::Insert { key } => {
                            writer.insert(&key)?;
                        }
                        Operation::Remove { key } => {
                            writer.remove(&key)?;
                        }
                        Operation::Commit { .. } => {}
                    }
                }
            }
            writer.commit()?;
            store.checkpoint()?;
            tracing::info!("Replayed {} committed WAL batches into {:?}", replayed, dir);
        }

        Ok(store)
    }

    /// Fail with `IllegalState` while a live store owns the files in `dir`
    pub fn ensure_not_open(dir: &Path) -> Result<()> {
        match File::open(dir.join(DB_FILE)) {
            // Released when `file` drops
            Ok(file) => lock_exclusively(&file, dir),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the current header without opening the store
    pub fn read_header(dir: &Path) -> Result<Header> {
        let mut file = File::open(dir.join(DB_FILE))?;
        read_header(&mut file)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Largest key the store accepts
    pub fn max_key_size(&self) -> usize {
        (self.page_size - PAGE_HEADER_SIZE) / 4
    }

    /// Consistent view of the last commit
    pub fn snapshot(&self) -> Snapshot {
        self.published.read().clone()
    }

    pub fn entry_count(&self) -> u64 {
        self.published.read().entry_count
    }

    /// Start a write batch. Blocks while another writer is active.
    pub fn writer(&self) -> StoreWriter<'_> {
        self.writer_inner(true)
    }

    fn writer_inner(&self, log_to_wal: bool) -> StoreWriter<'_> {
        let state = self.writer.lock();
        let snapshot = self.snapshot();
        StoreWriter {
            store: self,
            state,
            root: snapshot.root,
            entry_count: snapshot.entry_count,
            ops: Vec::new(),
            freed: Vec::new(),
            log_to_wal,
        }
    }

    // -------------------------------------------------------------------------
    // Index state
    // -------------------------------------------------------------------------

    pub fn state(&self) -> IndexState {
        self.state.read().state
    }

    pub fn failure_message(&self) -> Option<String> {
        self.state.read().failure.clone()
    }

    /// Persist a new lifecycle state. Checkpoints so the header records it.
    pub fn set_state(&self, state: IndexState, failure: Option<String>) -> Result<()> {
        let mut writer = self.writer.lock();
        *self.state.write() = StateRecord { state, failure };
        self.checkpoint_locked(&mut writer)
    }

    // -------------------------------------------------------------------------
    // Checkpoint
    // -------------------------------------------------------------------------

    /// Make everything committed so far durable in the page file and empty the WAL
    pub fn checkpoint(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        self.checkpoint_locked(&mut writer)
    }

    /// Make committed WAL entries durable without a full checkpoint
    pub fn sync_wal(&self) -> Result<()> {
        self.writer.lock().wal.sync()
    }

    fn checkpoint_locked(&self, writer: &mut WriterState) -> Result<()> {
        let snapshot = self.snapshot();
        let mut root = snapshot.root;

        let WriterState {
            file,
            wal,
            free,
            pending_free,
            page_count,
            generation,
        } = writer;

        let mut pages = PageWriter {
            file: &mut *file,
            page_size: self.page_size,
            free: &mut *free,
            page_count: &mut *page_count,
            written: 0,
        };
        let root_page = flush_node(&mut root, &mut pages)?;
        let written = pages.written;
        file.sync_data()?;

        let record = self.state.read().clone();
        let header = Header {
            layout_version: LAYOUT_VERSION,
            slot_count: self.slot_count as u32,
            page_size: self.page_size as u32,
            generation: *generation + 1,
            root: root_page,
            page_count: *page_count,
            entry_count: snapshot.entry_count,
            state: record.state,
            failure: record.failure,
        };
        file.seek(SeekFrom::Start((header.slot() * HEADER_SLOT_SIZE) as u64))?;
        file.write_all(&header.encode())?;
        file.sync_data()?;
        *generation = header.generation;

        wal.truncate()?;
        free.append(pending_free);

        *self.published.write() = Snapshot {
            root,
            entry_count: snapshot.entry_count,
        };

        tracing::debug!(
            "Checkpoint {} of {:?}: {} pages written, root page {}, {} pages total",
            header.generation,
            self.dir,
            written,
            root_page,
            header.page_count
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Verification
    // -------------------------------------------------------------------------

    /// Check tree structure and key encoding in memory, and re-read the
    /// last checkpoint from disk verifying every page checksum
    pub fn consistency_check(&self) -> Result<ConsistencyReport> {
        let snapshot = self.snapshot();
        let report = check::check_tree(&snapshot.root, self.slot_count, snapshot.entry_count)?;

        let mut writer = self.writer.lock();
        let header = read_header(&mut writer.file)?;
        let mut reachable = HashSet::new();
        load_tree(
            &mut writer.file,
            self.page_size,
            header.root,
            header.page_count,
            &mut reachable,
        )?;
        Ok(report)
    }

    /// Size and distinct value statistics of the current tree
    pub fn sample(&self) -> IndexSample {
        check::sample(&self.snapshot())
    }
}

/// Lock held for as long as the store keeps `file` open
fn lock_exclusively(file: &File, dir: &Path) -> Result<()> {
    file.try_lock_exclusive().map_err(|e| {
        if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
            IndexError::IllegalState(format!(
                "Index files in {:?} are already owned by an open store",
                dir
            ))
        } else {
            IndexError::Io(e)
        }
    })
}

fn check_page_size(page_size: usize) -> Result<()> {
    if !page_size.is_power_of_two() || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(IndexError::Config(format!(
            "page_size must be a power of two between {} and {}, got {}",
            MIN_PAGE_SIZE, MAX_PAGE_SIZE, page_size
        )));
    }
    Ok(())
}

// =============================================================================
// Writer
// =============================================================================

/// What a merge-insert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No colliding entry; the key was inserted
    Inserted,
    /// A colliding entry existed and the merger decided
    Merged(MergeOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub outcome: WriteOutcome,
    pub conflict: Option<ConflictRecord>,
}

/// Exclusive write batch.
///
/// Changes are visible through this writer only. `commit` logs them and
/// publishes the new tree; dropping the writer without committing discards
/// them and leaves the store as it was.
pub struct StoreWriter<'a> {
    store: &'a Store,
    state: MutexGuard<'a, WriterState>,
    root: Arc<Node>,
    entry_count: u64,
    ops: Vec<Operation>,
    freed: Vec<PageId>,
    log_to_wal: bool,
}

impl StoreWriter<'_> {
    fn check_key(&self, key: &[u8]) -> Result<()> {
        let max = self.store.max_key_size();
        if key.len() > max {
            return Err(IndexError::InvalidArgument(format!(
                "Index key of {} bytes exceeds the maximum of {} bytes",
                key.len(),
                max
            )));
        }
        Ok(())
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        node::contains(&self.root, key)
    }

    /// Entries including this batch's uncommitted changes
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Keys between two bounds, including this batch's uncommitted changes
    pub fn seek(&self, lower: Bound<Vec<u8>>, upper: Bound<Vec<u8>>, direction: Direction) -> Seek {
        Seek::new(self.root.clone(), lower, upper, direction)
    }

    /// Insert a key. `false` if it was already present.
    pub fn insert(&mut self, key: &[u8]) -> Result<bool> {
        self.check_key(key)?;
        if self.contains(key) {
            return Ok(false);
        }
        let mut ctx = MutationContext {
            capacity: self.store.page_size - PAGE_HEADER_SIZE,
            freed: &mut self.freed,
        };
        node::insert(&mut self.root, key.to_vec(), &mut ctx);
        self.entry_count += 1;
        self.ops.push(Operation::Insert { key: key.to_vec() });
        Ok(true)
    }

    /// Remove a key. `false` if it was not present.
    pub fn remove(&mut self, key: &[u8]) -> Result<bool> {
        if !self.contains(key) {
            return Ok(false);
        }
        let mut ctx = MutationContext {
            capacity: self.store.page_size - PAGE_HEADER_SIZE,
            freed: &mut self.freed,
        };
        node::remove(&mut self.root, key, &mut ctx);
        self.entry_count -= 1;
        self.ops.push(Operation::Remove { key: key.to_vec() });
        Ok(true)
    }

    /// Remove every key starting with `prefix`, returning how many went
    pub fn remove_prefix(&mut self, prefix: &[u8]) -> Result<usize> {
        let upper = match key::successor(prefix) {
            Some(next) => Bound::Excluded(next),
            None => Bound::Unbounded,
        };
        let doomed: Vec<Vec<u8>> = self
            .seek(Bound::Included(prefix.to_vec()), upper, Direction::Ascending)
            .collect();
        for key in &doomed {
            self.remove(key)?;
        }
        Ok(doomed.len())
    }

    /// Insert unless an entry collides under the merger's comparison, in
    /// which case the merger decides. Conflicts are reported, never raised.
    pub fn merge_insert(&mut self, key: &[u8], merger: &dyn ValueMerger) -> Result<MergeReport> {
        self.check_key(key)?;
        let existing = match merger.comparison() {
            KeyComparison::Full => self.contains(key).then(|| key.to_vec()),
            KeyComparison::ValueOnly => {
                let prefix = key::value_prefix(key)?;
                let upper = match key::successor(prefix) {
                    Some(next) => Bound::Excluded(next),
                    None => Bound::Unbounded,
                };
                self.seek(Bound::Included(prefix.to_vec()), upper, Direction::Ascending)
                    .next()
            }
        };

        let existing = match existing {
            Some(existing) => existing,
            None => {
                self.insert(key)?;
                return Ok(MergeReport {
                    outcome: WriteOutcome::Inserted,
                    conflict: None,
                });
            }
        };

        let decision = merger.merge(&existing, key)?;
        match decision.outcome {
            MergeOutcome::Unchanged => {}
            MergeOutcome::Replaced => {
                self.remove(&existing)?;
                self.insert(key)?;
            }
            MergeOutcome::Removed => {
                self.remove(&existing)?;
            }
        }
        Ok(MergeReport {
            outcome: WriteOutcome::Merged(decision.outcome),
            conflict: decision.conflict,
        })
    }

    /// Log the batch and publish it to readers
    pub fn commit(mut self) -> Result<()> {
        if self.ops.is_empty() {
            return Ok(());
        }
        let ops = std::mem::take(&mut self.ops);
        if self.log_to_wal {
            let count = ops.len() as u32;
            for op in ops {
                self.state.wal.append(op)?;
            }
            self.state.wal.append(Operation::Commit { operations: count })?;
        }

        *self.store.published.write() = Snapshot {
            root: self.root.clone(),
            entry_count: self.entry_count,
        };
        self.state.pending_free.append(&mut self.freed);

        if self.state.wal.size() > self.store.checkpoint_threshold {
            self.store.checkpoint_locked(&mut self.state)?;
        }
        Ok(())
    }

    /// Discard the batch
    pub fn rollback(self) {
        if !self.ops.is_empty() {
            tracing::debug!(
                "Rolled back {} uncommitted operations on {:?}",
                self.ops.len(),
                self.store.dir
            );
        }
    }
}

// =============================================================================
// Page I/O
// =============================================================================

struct PageWriter<'a> {
    file: &'a mut File,
    page_size: usize,
    free: &'a mut Vec<PageId>,
    page_count: &'a mut u64,
    written: usize,
}

impl PageWriter<'_> {
    fn allocate(&mut self) -> PageId {
        match self.free.pop() {
            Some(page) => page,
            None => {
                let page = *self.page_count;
                *self.page_count += 1;
                page
            }
        }
    }

    fn write(&mut self, page: PageId, bytes: &[u8]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(DATA_OFFSET + page * self.page_size as u64))?;
        self.file.write_all(bytes)?;
        self.written += 1;
        Ok(())
    }
}

/// Write a node and its dirty descendants, children first
fn flush_node(node: &mut Arc<Node>, pages: &mut PageWriter<'_>) -> Result<PageId> {
    if let Some(page) = node.page {
        return Ok(page);
    }
    let node = Arc::make_mut(node);
    if let NodeBody::Internal { children, .. } = &mut node.body {
        for child in children.iter_mut() {
            flush_node(child, pages)?;
        }
    }
    let bytes = page::encode_node(node, pages.page_size)?;
    let page = pages.allocate();
    pages.write(page, &bytes)?;
    node.page = Some(page);
    Ok(page)
}

fn read_header(file: &mut File) -> Result<Header> {
    let mut best: Option<Header> = None;
    for slot in 0..2 {
        let mut buf = vec![0u8; HEADER_SLOT_SIZE];
        file.seek(SeekFrom::Start((slot * HEADER_SLOT_SIZE) as u64))?;
        match file.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => continue,
            Err(e) => return Err(e.into()),
        }
        if let Some(header) = Header::decode(&buf) {
            if best.as_ref().map_or(true, |b| header.generation > b.generation) {
                best = Some(header);
            }
        }
    }
    best.ok_or_else(|| IndexError::Corruption("No valid store header".to_string()))
}

fn read_page(file: &mut File, page_size: usize, page: PageId) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; page_size];
    file.seek(SeekFrom::Start(DATA_OFFSET + page * page_size as u64))?;
    file.read_exact(&mut buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => {
            IndexError::Corruption(format!("Page {} lies past the end of the file", page))
        }
        _ => e.into(),
    })?;
    Ok(buf)
}

/// Load the subtree rooted at `page`, recording every page visited
fn load_tree(
    file: &mut File,
    page_size: usize,
    page: PageId,
    page_count: u64,
    reachable: &mut HashSet<PageId>,
) -> Result<Node> {
    if page >= page_count {
        return Err(IndexError::Corruption(format!(
            "Page {} is outside the {} allocated pages",
            page, page_count
        )));
    }
    if !reachable.insert(page) {
        return Err(IndexError::Corruption(format!(
            "Page {} is referenced more than once",
            page
        )));
    }
    let bytes = read_page(file, page_size, page)?;
    match page::decode_page(page, &bytes)? {
        page::PageContent::Leaf(keys) => Ok(Node::leaf(keys, Some(page))),
        page::PageContent::Internal {
            separators,
            children,
        } => {
            let mut nodes = Vec::with_capacity(children.len());
            for child in children {
                nodes.push(Arc::new(load_tree(file, page_size, child, page_count, reachable)?));
            }
            Ok(Node::internal(separators, nodes, Some(page)))
        }
    }
}
