//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Bytes in front of every entry: LSN (8) + CRC (4) + payload length (4)
pub const HEADER_SIZE: usize = 16;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
///
/// A write batch is logged as its `Insert`/`Remove` entries followed by a
/// single `Commit` naming how many entries it closes. Replay applies a batch
/// only once its `Commit` is seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Insert an encoded index key
    Insert { key: Vec<u8> },

    /// Remove an encoded index key
    Remove { key: Vec<u8> },

    /// End of a committed batch of `operations` entries
    Commit { operations: u32 },
}

/// Serialized body of an entry (everything but the LSN)
#[derive(Serialize, Deserialize)]
struct Payload {
    operation: Operation,
    timestamp: u64,
}

impl WalEntry {
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    fn payload(&self) -> Result<Vec<u8>> {
        let payload = Payload {
            operation: self.operation.clone(),
            timestamp: self.timestamp,
        };
        Ok(bincode::serialize(&payload)?)
    }

    fn checksum(lsn: u64, data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_be_bytes());
        hasher.update(&(data.len() as u32).to_be_bytes());
        hasher.update(data);
        hasher.finalize()
    }

    /// CRC32 over the LSN, payload length and payload
    pub fn compute_crc(&self) -> Result<u32> {
        let data = self.payload()?;
        Ok(Self::checksum(self.lsn, &data))
    }

    /// Encode as `[lsn][crc][len][payload]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let data = self.payload()?;
        let len = u32::try_from(data.len()).map_err(|_| {
            IndexError::Serialization(format!("WAL payload of {} bytes is too large", data.len()))
        })?;
        let crc = Self::checksum(self.lsn, &data);

        let mut buf = Vec::with_capacity(HEADER_SIZE + data.len());
        buf.extend_from_slice(&self.lsn.to_be_bytes());
        buf.extend_from_slice(&crc.to_be_bytes());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&data);
        Ok(buf)
    }

    /// Decode one entry from the front of `bytes`
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let header = parse_header(bytes).ok_or_else(|| {
            IndexError::WalCorruption(format!(
                "entry needs {} header bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            ))
        })?;
        let end = HEADER_SIZE + header.len;
        if bytes.len() < end {
            return Err(IndexError::WalCorruption(format!(
                "entry {} truncated: need {} bytes, got {}",
                header.lsn,
                end,
                bytes.len()
            )));
        }
        Self::from_parts(header, &bytes[HEADER_SIZE..end])
    }

    pub(crate) fn from_parts(header: EntryHeader, data: &[u8]) -> Result<Self> {
        let actual = Self::checksum(header.lsn, data);
        if actual != header.crc {
            return Err(IndexError::WalCorruption(format!(
                "CRC mismatch at LSN {}: expected {:08x}, got {:08x}",
                header.lsn, header.crc, actual
            )));
        }
        let payload: Payload = bincode::deserialize(data)
            .map_err(|e| IndexError::WalCorruption(format!("LSN {}: {}", header.lsn, e)))?;
        Ok(Self {
            lsn: header.lsn,
            operation: payload.operation,
            timestamp: payload.timestamp,
        })
    }

    /// Total bytes `serialize()` produces
    pub fn serialized_size(&self) -> Result<usize> {
        let payload = Payload {
            operation: self.operation.clone(),
            timestamp: self.timestamp,
        };
        Ok(HEADER_SIZE + bincode::serialized_size(&payload)? as usize)
    }
}

/// Fixed-size entry header
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntryHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: usize,
}

pub(crate) fn parse_header(bytes: &[u8]) -> Option<EntryHeader> {
    if bytes.len() < HEADER_SIZE {
        return None;
    }
    let lsn = u64::from_be_bytes(bytes[0..8].try_into().ok()?);
    let crc = u32::from_be_bytes(bytes[8..12].try_into().ok()?);
    let len = u32::from_be_bytes(bytes[12..16].try_into().ok()?) as usize;
    Some(EntryHeader { lsn, crc, len })
}
