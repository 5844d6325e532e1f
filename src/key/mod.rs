//! Index Key Module
//!
//! Order-preserving byte encoding of composite index keys.
//!
//! ## Responsibilities
//! - Encode value tuples so byte order equals value order
//! - Keep entity ids and exact number kinds out of the value comparison
//! - Decode keys back into values for index-backed reads
//! - Turn composite queries into contiguous key ranges
//!
//! ## Key Layout
//! ```text
//! ┌──────────────────────────────┬──────────────┬─────────────┬──────────┐
//! │ Slot 1 .. Slot N             │ Entity (8)   │ Kinds (K)   │ K (2)    │
//! │ [tag][payload] per slot      │ big endian   │ 1 per num   │ u16 BE   │
//! └──────────────────────────────┴──────────────┴─────────────┴──────────┘
//!  └──── value prefix ─────────┘
//! ```
//!
//! Two keys with equal value prefixes hold equal value tuples, so uniqueness
//! checks compare only the prefix while the full key still orders entries
//! of equal values by entity id.

mod codec;
mod range;

pub use codec::{
    compare_keys, decode_key, encode_key, encode_slot, encode_text_prefix, entity_id,
    entity_prefix, slot_spans, value_prefix, KeyComparison, ENTITY_ID_SIZE,
};
pub use range::{successor, ScanRange};
