//! # rangeidx
//!
//! Native composite-key range index engine for an embedded graph database:
//! - Order-preserving encoding of property value tuples into byte keys
//! - Copy-on-write paged B+tree store with WAL and checkpoints
//! - Uniqueness enforcement during population and live updates
//! - Populate-to-online lifecycle absorbing concurrent writes
//! - Capability negotiation for composite query shapes
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 IndexProviders / Provider                   │
//! │        (layout, prototype validation, initial state)        │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │                              │
//!                ▼                              ▼
//!   ┌─────────────────────────┐    ┌─────────────────────────┐
//!   │ PopulationJob/Populator │    │ Accessor                │
//!   │ (scan + queued updates) │    │ (Reader / Updater)      │
//!   └────────────┬────────────┘    └────────────┬────────────┘
//!                │     Key Codec + Merger       │
//!                └──────────────┬───────────────┘
//!                               ▼
//!                      ┌─────────────────┐
//!                      │      Store      │
//!                      │ (COW B+tree)    │
//!                      └───┬─────────┬───┘
//!                          ▼         ▼
//!                       ┌─────┐  ┌───────┐
//!                       │ WAL │  │ Pages │
//!                       └─────┘  └───────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod query;
pub mod schema;
pub mod value;

pub mod key;
pub mod store;
pub mod wal;

pub mod capability;
pub mod merger;
pub mod update;

pub mod accessor;
pub mod job;
pub mod locks;
pub mod populator;
pub mod provider;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use accessor::{IndexAccessor, IndexHit, IndexOrder, IndexReader, IndexUpdateMode, IndexUpdater};
pub use capability::{IndexCapability, RangeIndexCapability};
pub use config::{Config, WalSyncStrategy};
pub use error::{IndexError, Result};
pub use job::{EntityScan, IndexPopulationJob, PopulationJobHandle};
pub use locks::{LockGuard, LockMode, LockResource, LockService, StripedLockService};
pub use populator::{IndexPopulator, PopulatingUpdater, PopulatorState};
pub use provider::{IndexProvider, IndexProviders, RangeIndexProvider};
pub use query::{IndexQuery, IndexQueryType};
pub use schema::{IndexDescriptor, IndexType, SchemaDescriptor, TokenNameLookup, TokenNames};
pub use store::{IndexSample, IndexState};
pub use update::{IndexEntryUpdate, UpdateMode};
pub use value::{ArrayValue, Point, Value, ValueCategory, ValueGroup};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of rangeidx
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
