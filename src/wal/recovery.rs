//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use super::{Operation, WalEntry, WalReader};
use crate::error::{IndexError, Result};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Stop at the first corrupted entry
    /// 3. Truncate everything after the last valid entry
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, result, valid_len) = Self::scan(path)?;

        if result.was_truncated {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
            tracing::warn!(
                "WAL {:?} truncated to {} bytes ({} corrupted entries dropped)",
                path,
                valid_len,
                result.entries_corrupted
            );
        }

        tracing::info!(
            "WAL recovery: {} entries, last LSN {}",
            result.entries_recovered,
            result.last_lsn
        );
        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result, _) = Self::scan(path)?;
        Ok(result)
    }

    /// Operations of every batch that reached its `Commit` marker, in log order
    pub fn committed_batches(entries: Vec<WalEntry>) -> Vec<Vec<Operation>> {
        let mut batches = Vec::new();
        let mut pending = Vec::new();
        for entry in entries {
            match entry.operation {
                Operation::Commit { operations } => {
                    let operations = operations as usize;
                    if pending.len() > operations {
                        // Leftovers of a batch whose commit never made it
                        let stale = pending.len() - operations;
                        tracing::warn!("Discarding {} WAL operations without a commit", stale);
                        pending.drain(..stale);
                    }
                    batches.push(std::mem::take(&mut pending));
                }
                op => pending.push(op),
            }
        }
        if !pending.is_empty() {
            tracing::warn!("Discarding {} WAL operations without a commit", pending.len());
        }
        batches
    }

    fn scan(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult, u64)> {
        let file_len = std::fs::metadata(path)?.len();
        let mut reader = WalReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    entries.push(entry);
                }
                Ok(None) => break,
                Err(IndexError::WalCorruption(msg)) => {
                    tracing::warn!("WAL corruption in {:?}: {}", path, msg);
                    result.entries_corrupted += 1;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let valid_len = reader.position();
        result.was_truncated = valid_len < file_len;
        Ok((entries, result, valid_len))
    }
}
