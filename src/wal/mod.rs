//! Index Write-Ahead Log
//!
//! Every committed store batch is logged here before its new root is
//! published. The log is emptied by each checkpoint, so it only ever holds
//! the batches a crash would otherwise lose.
//!
//! ## Responsibilities
//! - Log key insertions and removals of one store batch
//! - Close each batch with a commit marker naming its size
//! - Detect torn or damaged entries by CRC32
//! - Hand recovery the batches that reached their marker, in order
//!
//! ## Log Layout
//! ```text
//!   │ Insert │ Remove │ Commit 2 │ Insert │ Commit 1 │ Insert │
//!   └────────── batch 1 ─────────┘└───── batch 2 ────┘└ unfinished
//!
//!   entry: │ LSN u64 │ CRC32 u32 │ len u32 │ bincode(operation, timestamp) │
//! ```
//!
//! Entries after the last commit marker are ignored on replay.

mod entry;
mod reader;
mod recovery;
mod writer;

pub use entry::{Operation, WalEntry, HEADER_SIZE};
pub use reader::{WalIterator, WalReader};
pub use recovery::{RecoveryResult, WalRecovery};
pub use writer::WalWriter;
