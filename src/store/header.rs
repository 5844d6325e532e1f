//! Store header
//!
//! Two fixed-size header slots sit at the front of the store file. A
//! checkpoint writes the slot not holding the current header, so a torn
//! header write leaves the previous one intact. Opening picks the valid slot
//! with the highest generation.
//!
//! ```text
//! ┌───────────┬───────────┬────────────────────────────────────────┐
//! │ Slot 0    │ Slot 1    │ Data pages (page_size each)            │
//! │ 512 bytes │ 512 bytes │ page 0, page 1, ...                    │
//! └───────────┴───────────┴────────────────────────────────────────┘
//! ```

use bytes::{Buf, BufMut};

use super::node::PageId;
use crate::error::{IndexError, Result};

pub const MAGIC: &[u8; 4] = b"RIDX";

/// Bumped on any change to key, page or header encoding
pub const LAYOUT_VERSION: u32 = 1;

/// Size of one header slot
pub const HEADER_SLOT_SIZE: usize = 512;

/// Offset of data page 0
pub const DATA_OFFSET: u64 = 2 * HEADER_SLOT_SIZE as u64;

/// Fixed fields: magic, version, slots, page size, generation, root,
/// page count, entry count, state, message length
const FIXED_SIZE: usize = 4 + 4 + 4 + 4 + 8 + 8 + 8 + 8 + 1 + 2;
const CRC_SIZE: usize = 4;

/// Longest failure message a header keeps
pub const MAX_FAILURE_MESSAGE: usize = HEADER_SLOT_SIZE - FIXED_SIZE - CRC_SIZE;

/// Persisted lifecycle state of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexState {
    Populating,
    Online,
    Failed,
}

impl IndexState {
    fn to_byte(self) -> u8 {
        match self {
            IndexState::Populating => 0,
            IndexState::Online => 1,
            IndexState::Failed => 2,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(IndexState::Populating),
            1 => Some(IndexState::Online),
            2 => Some(IndexState::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub layout_version: u32,
    pub slot_count: u32,
    pub page_size: u32,
    pub generation: u64,
    pub root: PageId,
    pub page_count: u64,
    pub entry_count: u64,
    pub state: IndexState,
    pub failure: Option<String>,
}

impl Header {
    /// Slot this header is written to
    pub fn slot(&self) -> usize {
        (self.generation % 2) as usize
    }

    pub fn encode(&self) -> Vec<u8> {
        let message = self.failure.as_deref().map(truncate_message).unwrap_or("");

        let mut buf = Vec::with_capacity(HEADER_SLOT_SIZE);
        buf.put_slice(MAGIC);
        buf.put_u32(self.layout_version);
        buf.put_u32(self.slot_count);
        buf.put_u32(self.page_size);
        buf.put_u64(self.generation);
        buf.put_u64(self.root);
        buf.put_u64(self.page_count);
        buf.put_u64(self.entry_count);
        buf.put_u8(self.state.to_byte());
        buf.put_u16(message.len() as u16);
        buf.put_slice(message.as_bytes());
        let crc = crc32fast::hash(&buf);
        buf.put_u32(crc);
        buf.resize(HEADER_SLOT_SIZE, 0);
        buf
    }

    /// Decode a slot. `None` if it does not hold a valid header.
    pub fn decode(slot: &[u8]) -> Option<Self> {
        if slot.len() < FIXED_SIZE + CRC_SIZE || &slot[..4] != MAGIC {
            return None;
        }
        let mut buf = &slot[4..];
        let layout_version = buf.get_u32();
        let slot_count = buf.get_u32();
        let page_size = buf.get_u32();
        let generation = buf.get_u64();
        let root = buf.get_u64();
        let page_count = buf.get_u64();
        let entry_count = buf.get_u64();
        let state = IndexState::from_byte(buf.get_u8())?;
        let message_len = buf.get_u16() as usize;

        let body_len = FIXED_SIZE + message_len;
        if body_len + CRC_SIZE > slot.len() {
            return None;
        }
        let stored = u32::from_be_bytes(slot[body_len..body_len + CRC_SIZE].try_into().ok()?);
        if stored != crc32fast::hash(&slot[..body_len]) {
            return None;
        }
        let failure = if message_len > 0 {
            Some(String::from_utf8_lossy(&slot[FIXED_SIZE..body_len]).into_owned())
        } else {
            None
        };

        Some(Self {
            layout_version,
            slot_count,
            page_size,
            generation,
            root,
            page_count,
            entry_count,
            state,
            failure,
        })
    }

    /// Check the header against what the caller expects to open
    pub fn validate(&self, expected_slots: usize) -> Result<()> {
        if self.layout_version != LAYOUT_VERSION {
            return Err(IndexError::Corruption(format!(
                "Index layout version {} is not supported (expected {}); rebuild the index",
                self.layout_version, LAYOUT_VERSION
            )));
        }
        if self.slot_count as usize != expected_slots {
            return Err(IndexError::InvalidArgument(format!(
                "Index has {} slots but {} were expected",
                self.slot_count, expected_slots
            )));
        }
        Ok(())
    }
}

/// Cut a message to fit the header without splitting a character
fn truncate_message(message: &str) -> &str {
    if message.len() <= MAX_FAILURE_MESSAGE {
        return message;
    }
    let mut end = MAX_FAILURE_MESSAGE;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    &message[..end]
}
