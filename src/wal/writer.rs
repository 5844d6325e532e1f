//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{Operation, WalEntry, WalReader};
use crate::config::WalSyncStrategy;
use crate::error::Result;

/// Writes entries to the WAL file
pub struct WalWriter {
    path: PathBuf,
    file: BufWriter<File>,
    /// LSN the next append will get
    current_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Entries appended since the last fsync
    uncommitted: usize,
    /// Bytes in the log
    size: u64,
}

impl WalWriter {
    /// Open or create a WAL file. Appends continue after the last readable entry.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();

        let mut last_lsn = 0;
        if size > 0 {
            let mut reader = WalReader::open(path)?;
            while let Ok(Some(entry)) = reader.next_entry() {
                last_lsn = entry.lsn;
            }
        }

        tracing::debug!("WAL opened at {:?} ({} bytes, next LSN {})", path, size, last_lsn + 1);

        Ok(Self {
            path: path.to_path_buf(),
            file: BufWriter::new(file),
            current_lsn: last_lsn + 1,
            sync_strategy,
            uncommitted: 0,
            size,
        })
    }

    /// Append an operation to the WAL, returning its LSN
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let lsn = self.current_lsn;
        let bytes = WalEntry::new(lsn, operation).serialize()?;
        self.file.write_all(&bytes)?;

        self.current_lsn += 1;
        self.uncommitted += 1;
        self.size += bytes.len() as u64;

        match self.sync_strategy {
            WalSyncStrategy::EveryWrite => self.sync()?,
            WalSyncStrategy::EveryNEntries { count } => {
                if self.uncommitted >= count {
                    self.sync()?;
                }
            }
        }

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.get_ref().sync_data()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Discard every entry. Called once a checkpoint made them redundant.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.flush()?;
        let file = self.file.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.sync_all()?;

        self.current_lsn = 1;
        self.uncommitted = 0;
        self.size = 0;
        tracing::debug!("WAL truncated at {:?}", self.path);
        Ok(())
    }

    /// Get the current LSN (the one the next append will use)
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    /// Entries appended but not yet fsynced
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    /// Size of the log in bytes, including unsynced appends
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WalWriter {
    fn drop(&mut self) {
        if let Err(e) = self.sync() {
            tracing::warn!("Failed to sync WAL {:?} on close: {}", self.path, e);
        }
    }
}
