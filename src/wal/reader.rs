//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use super::entry::{parse_header, HEADER_SIZE};
use super::WalEntry;
use crate::error::{IndexError, Result};

/// Largest payload a single entry may declare
const MAX_PAYLOAD_SIZE: usize = 256 * 1024 * 1024;

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,
    /// Byte offset just past the last complete, valid entry
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry from the WAL.
    ///
    /// Returns `Ok(None)` at end of file and at a partially written tail.
    /// A complete entry whose checksum does not match is a `WalCorruption` error.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let mut header_buf = [0u8; HEADER_SIZE];
        if !self.read_full(&mut header_buf)? {
            return Ok(None);
        }
        let header = match parse_header(&header_buf) {
            Some(header) => header,
            None => return Ok(None),
        };
        if header.len > MAX_PAYLOAD_SIZE {
            return Err(IndexError::WalCorruption(format!(
                "entry at LSN {} declares {} payload bytes",
                header.lsn, header.len
            )));
        }

        let mut data = vec![0u8; header.len];
        if !self.read_full(&mut data)? {
            return Ok(None);
        }

        let entry = WalEntry::from_parts(header, &data)?;
        self.position += (HEADER_SIZE + header.len) as u64;
        Ok(Some(entry))
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    /// Offset just past the last entry returned
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Fill `buf` completely. `false` if the file ended first.
    fn read_full(&mut self, buf: &mut [u8]) -> Result<bool> {
        match self.reader.read_exact(buf) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
