//! Configuration for rangeidx
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{IndexError, Result};

/// Smallest page size a store may be created with
pub const MIN_PAGE_SIZE: usize = 512;

/// Largest page size a store may be created with
pub const MAX_PAGE_SIZE: usize = 64 * 1024;

/// Main configuration for the index engine
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all index files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── {provider}/
    ///         └── {index_id}/
    ///             ├── index.db     (paged B+tree)
    ///             └── index.wal    (write-ahead log)
    pub data_dir: PathBuf,

    /// Page size of newly created stores (in bytes)
    pub page_size: usize,

    /// WAL size that triggers a checkpoint after commit (in bytes)
    pub checkpoint_threshold: u64,

    /// Rename a failed index directory to `archive-{id}-{millis}` instead of
    /// deleting it when the index is recreated
    pub archive_failed_index: bool,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Provider Configuration
    // -------------------------------------------------------------------------
    /// Provider name used when a prototype does not name one
    pub default_schema_provider: String,

    // -------------------------------------------------------------------------
    // Population Configuration
    // -------------------------------------------------------------------------
    /// Entities read per batch by a population job
    pub population_batch_size: usize,

    /// Concurrent update batches queued while a scan is running
    pub population_queue_capacity: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./rangeidx_data"),
            page_size: 8192,
            checkpoint_threshold: 4 * 1024 * 1024, // 4 MB
            archive_failed_index: false,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            default_schema_provider: "range-1.0".to_string(),
            population_batch_size: 1000,
            population_queue_capacity: 64,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the store cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.page_size.is_power_of_two()
            || self.page_size < MIN_PAGE_SIZE
            || self.page_size > MAX_PAGE_SIZE
        {
            return Err(IndexError::Config(format!(
                "page_size must be a power of two between {} and {}, got {}",
                MIN_PAGE_SIZE, MAX_PAGE_SIZE, self.page_size
            )));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(IndexError::Config(
                "EveryNEntries sync count must be at least 1".to_string(),
            ));
        }
        if self.population_batch_size == 0 {
            return Err(IndexError::Config(
                "population_batch_size must be at least 1".to_string(),
            ));
        }
        if self.population_queue_capacity == 0 {
            return Err(IndexError::Config(
                "population_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.default_schema_provider.is_empty() {
            return Err(IndexError::Config(
                "default_schema_provider must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all index files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the page size of new stores (in bytes)
    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    /// Set the WAL size that triggers a checkpoint (in bytes)
    pub fn checkpoint_threshold(mut self, bytes: u64) -> Self {
        self.config.checkpoint_threshold = bytes;
        self
    }

    /// Archive failed index directories instead of deleting them
    pub fn archive_failed_index(mut self, archive: bool) -> Self {
        self.config.archive_failed_index = archive;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the provider used when none is named
    pub fn default_schema_provider(mut self, name: impl Into<String>) -> Self {
        self.config.default_schema_provider = name.into();
        self
    }

    /// Set the number of entities read per population batch
    pub fn population_batch_size(mut self, size: usize) -> Self {
        self.config.population_batch_size = size;
        self
    }

    /// Set how many concurrent update batches may queue during population
    pub fn population_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.population_queue_capacity = capacity;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
