//! On-disk node pages
//!
//! ```text
//! ┌──────────┬──────────┬───────────┬──────────┬──────────────────────┐
//! │ Kind (1) │ Rsvd (1) │ Count (2) │ CRC (4)  │ Body (page - 8)      │
//! └──────────┴──────────┴───────────┴──────────┴──────────────────────┘
//!
//! Leaf body:     [len u16][key] * count
//! Internal body: [child0 u64] ([len u16][separator][child u64]) * count
//! ```
//!
//! The CRC covers the whole page except the CRC field itself, padding included.

use bytes::{Buf, BufMut};

use super::node::{Node, NodeBody, PageId};
use crate::error::{IndexError, Result};

/// Bytes in front of every page body
pub const PAGE_HEADER_SIZE: usize = 8;

const KIND_LEAF: u8 = 1;
const KIND_INTERNAL: u8 = 2;

/// A page as read from disk, children not yet resolved
pub(crate) enum PageContent {
    Leaf(Vec<Vec<u8>>),
    Internal {
        separators: Vec<Vec<u8>>,
        children: Vec<PageId>,
    },
}

fn page_crc(page: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&page[..4]);
    hasher.update(&page[PAGE_HEADER_SIZE..]);
    hasher.finalize()
}

fn count_u16(count: usize) -> Result<u16> {
    u16::try_from(count)
        .map_err(|_| IndexError::ResourceExhausted(format!("{} entries do not fit a page", count)))
}

/// Serialize a node whose children (if any) already have pages
pub(crate) fn encode_node(node: &Node, page_size: usize) -> Result<Vec<u8>> {
    let needed = PAGE_HEADER_SIZE + node.encoded_size();
    if needed > page_size {
        return Err(IndexError::ResourceExhausted(format!(
            "Node needs {} bytes but pages hold {}",
            needed, page_size
        )));
    }

    let mut buf = Vec::with_capacity(page_size);
    match &node.body {
        NodeBody::Leaf(keys) => {
            buf.put_u8(KIND_LEAF);
            buf.put_u8(0);
            buf.put_u16(count_u16(keys.len())?);
            buf.put_u32(0);
            for key in keys {
                buf.put_u16(key.len() as u16);
                buf.put_slice(key);
            }
        }
        NodeBody::Internal {
            separators,
            children,
        } => {
            buf.put_u8(KIND_INTERNAL);
            buf.put_u8(0);
            buf.put_u16(count_u16(separators.len())?);
            buf.put_u32(0);
            let mut pages = children.iter().map(|c| {
                c.page.ok_or_else(|| {
                    IndexError::IllegalState("Child node written before it has a page".to_string())
                })
            });
            let first = pages.next().ok_or_else(|| {
                IndexError::IllegalState("Internal node without children".to_string())
            })??;
            buf.put_u64(first);
            for (separator, child) in separators.iter().zip(pages) {
                buf.put_u16(separator.len() as u16);
                buf.put_slice(separator);
                buf.put_u64(child?);
            }
        }
    }
    buf.resize(page_size, 0);
    let crc = page_crc(&buf);
    buf[4..8].copy_from_slice(&crc.to_be_bytes());
    Ok(buf)
}

/// Parse and verify a page read from disk
pub(crate) fn decode_page(page_id: PageId, page: &[u8]) -> Result<PageContent> {
    let corrupt = |what: &str| IndexError::Corruption(format!("Page {}: {}", page_id, what));

    if page.len() < PAGE_HEADER_SIZE {
        return Err(corrupt("shorter than its header"));
    }
    let stored = u32::from_be_bytes([page[4], page[5], page[6], page[7]]);
    if stored != page_crc(page) {
        return Err(corrupt("checksum mismatch"));
    }

    let mut buf = &page[..];
    let kind = buf.get_u8();
    buf.advance(1);
    let count = buf.get_u16() as usize;
    buf.advance(4);

    let take_bytes = |buf: &mut &[u8]| -> Result<Vec<u8>> {
        if buf.remaining() < 2 {
            return Err(corrupt("entry length past end of page"));
        }
        let len = buf.get_u16() as usize;
        if buf.remaining() < len {
            return Err(corrupt("entry past end of page"));
        }
        let bytes = buf[..len].to_vec();
        buf.advance(len);
        Ok(bytes)
    };

    match kind {
        KIND_LEAF => {
            let mut keys = Vec::with_capacity(count);
            for _ in 0..count {
                keys.push(take_bytes(&mut buf)?);
            }
            Ok(PageContent::Leaf(keys))
        }
        KIND_INTERNAL => {
            if buf.remaining() < 8 {
                return Err(corrupt("missing leftmost child"));
            }
            let mut children = vec![buf.get_u64()];
            let mut separators = Vec::with_capacity(count);
            for _ in 0..count {
                separators.push(take_bytes(&mut buf)?);
                if buf.remaining() < 8 {
                    return Err(corrupt("missing child pointer"));
                }
                children.push(buf.get_u64());
            }
            Ok(PageContent::Internal {
                separators,
                children,
            })
        }
        other => Err(corrupt(&format!("unknown page kind {}", other))),
    }
}
