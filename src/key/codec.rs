//! Key encoding
//!
//! Turns a value tuple plus entity id into bytes whose lexicographic order
//! is the index order, and back.

use std::cmp::Ordering;

use bytes::{Buf, BufMut};

use crate::error::{IndexError, Result};
use crate::value::{ArrayValue, Point, Value, ValueGroup};

/// Bytes used by the entity id that follows the value slots
pub const ENTITY_ID_SIZE: usize = 8;

/// Bytes used by the trailing kind-count field
const TRAILER_LEN_SIZE: usize = 2;

const SIGN_BIT: u64 = 1 << 63;
const I32_BIAS: u32 = 1 << 31;

// Number kinds, one per encoded number in traversal order
const KIND_FLOAT: u8 = 0;
const KIND_INT: u8 = 1;
const KIND_NEGATIVE_ZERO: u8 = 2;

// Array element framing
const ARRAY_ITEM: u8 = 0x01;
const ARRAY_END: u8 = 0x00;

// Text framing
const TEXT_ESCAPE: u8 = 0x00;
const TEXT_ESCAPED_ZERO: u8 = 0xFF;
const TEXT_END: u8 = 0x00;

/// How two keys are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyComparison {
    /// Value tuple only; keys of different entities with equal values are equal
    ValueOnly,
    /// Value tuple, then entity id
    Full,
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a full index key: `[slots][entity id][number kinds][kind count]`
pub fn encode_key(values: &[Value], entity_id: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(16 * values.len() + 16);
    let mut kinds = Vec::new();
    for value in values {
        encode_slot_into(&mut buf, value, &mut kinds)?;
    }
    let kind_count = u16::try_from(kinds.len()).map_err(|_| {
        IndexError::InvalidArgument(format!("Key holds too many numbers ({})", kinds.len()))
    })?;
    buf.put_u64(entity_id);
    buf.put_slice(&kinds);
    buf.put_u16(kind_count);
    Ok(buf)
}

/// Encode a single slot (group tag + payload), as it appears inside a key
pub fn encode_slot(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut kinds = Vec::new();
    encode_slot_into(&mut buf, value, &mut kinds)?;
    Ok(buf)
}

/// Encoding shared by every text slot starting with `prefix`
pub fn encode_text_prefix(prefix: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(prefix.len() + 1);
    buf.put_u8(ValueGroup::Text.tag());
    put_escaped_text(&mut buf, prefix);
    buf
}

fn encode_slot_into(buf: &mut Vec<u8>, value: &Value, kinds: &mut Vec<u8>) -> Result<()> {
    buf.put_u8(value.group().tag());
    match value {
        Value::Array(array) => encode_array(buf, array, kinds),
        scalar => encode_scalar(buf, scalar, kinds),
    }
}

fn encode_array(buf: &mut Vec<u8>, array: &ArrayValue, kinds: &mut Vec<u8>) -> Result<()> {
    for item in array.items() {
        buf.put_u8(ARRAY_ITEM);
        encode_scalar(buf, item, kinds)?;
    }
    buf.put_u8(ARRAY_END);
    Ok(())
}

fn encode_scalar(buf: &mut Vec<u8>, value: &Value, kinds: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Bool(b) => buf.put_u8(u8::from(*b)),
        Value::Int(i) => {
            let approx = *i as f64;
            let residual = (*i as i128 - approx as i128) as i32;
            buf.put_u64(ordered_f64_bits(approx));
            buf.put_u32(bias_i32(residual));
            kinds.push(KIND_INT);
        }
        Value::Float(x) => {
            let kind = if *x == 0.0 && x.is_sign_negative() {
                KIND_NEGATIVE_ZERO
            } else {
                KIND_FLOAT
            };
            buf.put_u64(ordered_f64_bits(*x));
            buf.put_u32(bias_i32(0));
            kinds.push(kind);
        }
        Value::Text(s) => {
            put_escaped_text(buf, s);
            buf.put_u8(TEXT_ESCAPE);
            buf.put_u8(TEXT_END);
        }
        Value::Date(days) => buf.put_u64(bias_i64(*days)),
        Value::LocalTime(nanos) => buf.put_u64(bias_i64(*nanos)),
        Value::LocalDateTime { seconds, nanos } => {
            buf.put_u64(bias_i64(*seconds));
            buf.put_u32(*nanos);
        }
        Value::DateTime {
            seconds,
            nanos,
            offset_seconds,
        } => {
            buf.put_u64(bias_i64(*seconds));
            buf.put_u32(*nanos);
            buf.put_u32(bias_i32(*offset_seconds));
        }
        Value::Duration {
            months,
            days,
            seconds,
            nanos,
        } => {
            buf.put_u64(bias_i64(*months));
            buf.put_u64(bias_i64(*days));
            buf.put_u64(bias_i64(*seconds));
            buf.put_u32(bias_i32(*nanos));
        }
        Value::Point(point) => encode_point(buf, point)?,
        Value::Array(_) => {
            return Err(IndexError::InvalidArgument(
                "Nested arrays are not indexable".to_string(),
            ))
        }
    }
    Ok(())
}

fn encode_point(buf: &mut Vec<u8>, point: &Point) -> Result<()> {
    let dims = u8::try_from(point.coordinates.len())
        .ok()
        .filter(|d| (2..=3).contains(d))
        .ok_or_else(|| {
            IndexError::InvalidArgument(format!(
                "Points need 2 or 3 coordinates, got {}",
                point.coordinates.len()
            ))
        })?;
    buf.put_u32(point.crs);
    buf.put_u8(dims);
    for c in &point.coordinates {
        // -0.0 and 0.0 name the same position
        let c = if *c == 0.0 { 0.0 } else { *c };
        buf.put_u64(ordered_f64_bits(c));
    }
    Ok(())
}

fn put_escaped_text(buf: &mut Vec<u8>, s: &str) {
    for &b in s.as_bytes() {
        if b == TEXT_ESCAPE {
            buf.put_u8(TEXT_ESCAPE);
            buf.put_u8(TEXT_ESCAPED_ZERO);
        } else {
            buf.put_u8(b);
        }
    }
}

/// Float bits whose unsigned order matches numeric order. Zeros collapse
/// to +0.0 and every NaN to the canonical NaN, which sorts last.
fn ordered_f64_bits(x: f64) -> u64 {
    let x = if x.is_nan() {
        f64::NAN
    } else if x == 0.0 {
        0.0
    } else {
        x
    };
    let bits = x.to_bits();
    if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits | SIGN_BIT
    }
}

fn f64_from_ordered(bits: u64) -> f64 {
    if bits & SIGN_BIT != 0 {
        f64::from_bits(bits & !SIGN_BIT)
    } else {
        f64::from_bits(!bits)
    }
}

fn bias_i64(v: i64) -> u64 {
    (v as u64) ^ SIGN_BIT
}

fn unbias_i64(v: u64) -> i64 {
    (v ^ SIGN_BIT) as i64
}

fn bias_i32(v: i32) -> u32 {
    (v as u32) ^ I32_BIAS
}

fn unbias_i32(v: u32) -> i32 {
    (v ^ I32_BIAS) as i32
}

// =============================================================================
// Layout
// =============================================================================

/// Key split into its three regions
struct KeyParts<'a> {
    values: &'a [u8],
    entity_id: u64,
    kinds: &'a [u8],
}

fn split_key(key: &[u8]) -> Result<KeyParts<'_>> {
    let min = ENTITY_ID_SIZE + TRAILER_LEN_SIZE;
    if key.len() < min {
        return Err(IndexError::Corruption(format!(
            "Index key of {} bytes is shorter than its fixed trailer",
            key.len()
        )));
    }
    let kind_count = u16::from_be_bytes([key[key.len() - 2], key[key.len() - 1]]) as usize;
    if key.len() < min + kind_count {
        return Err(IndexError::Corruption(format!(
            "Index key of {} bytes cannot hold {} number kinds",
            key.len(),
            kind_count
        )));
    }
    let values_end = key.len() - TRAILER_LEN_SIZE - kind_count - ENTITY_ID_SIZE;
    let mut id_bytes = &key[values_end..values_end + ENTITY_ID_SIZE];
    Ok(KeyParts {
        values: &key[..values_end],
        entity_id: id_bytes.get_u64(),
        kinds: &key[values_end + ENTITY_ID_SIZE..key.len() - TRAILER_LEN_SIZE],
    })
}

/// Bytes of the value tuple, without entity id and trailer
pub fn value_prefix(key: &[u8]) -> Result<&[u8]> {
    split_key(key).map(|parts| parts.values)
}

/// Bytes of the value tuple and entity id, without the number kind trailer.
/// Every key of one entity with one value tuple starts with these.
pub fn entity_prefix(key: &[u8]) -> Result<&[u8]> {
    split_key(key).map(|parts| &key[..parts.values.len() + ENTITY_ID_SIZE])
}

/// Entity id stored in a key
pub fn entity_id(key: &[u8]) -> Result<u64> {
    split_key(key).map(|parts| parts.entity_id)
}

/// Compare two encoded keys. A malformed key fails value-only comparison
/// with `Corruption`.
pub fn compare_keys(a: &[u8], b: &[u8], comparison: KeyComparison) -> Result<Ordering> {
    match comparison {
        KeyComparison::Full => Ok(a.cmp(b)),
        KeyComparison::ValueOnly => Ok(value_prefix(a)?.cmp(value_prefix(b)?)),
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a key of `slots` values back into its tuple and entity id
pub fn decode_key(key: &[u8], slots: usize) -> Result<(Vec<Value>, u64)> {
    let parts = split_key(key)?;
    let mut decoder = Decoder::new(parts.values, parts.kinds);
    let mut values = Vec::with_capacity(slots);
    for _ in 0..slots {
        values.push(decoder.slot()?);
    }
    decoder.finish()?;
    Ok((values, parts.entity_id))
}

/// Byte span of each slot inside the key's value prefix
pub fn slot_spans(key: &[u8], slots: usize) -> Result<Vec<&[u8]>> {
    let parts = split_key(key)?;
    let mut decoder = Decoder::new(parts.values, parts.kinds);
    let mut spans = Vec::with_capacity(slots);
    for _ in 0..slots {
        let start = decoder.offset();
        decoder.slot()?;
        spans.push(&parts.values[start..decoder.offset()]);
    }
    decoder.finish()?;
    Ok(spans)
}

struct Decoder<'a> {
    all: &'a [u8],
    buf: &'a [u8],
    kinds: &'a [u8],
}

impl<'a> Decoder<'a> {
    fn new(values: &'a [u8], kinds: &'a [u8]) -> Self {
        Self {
            all: values,
            buf: values,
            kinds,
        }
    }

    fn offset(&self) -> usize {
        self.all.len() - self.buf.len()
    }

    fn finish(&self) -> Result<()> {
        if !self.buf.is_empty() || !self.kinds.is_empty() {
            return Err(IndexError::Corruption(format!(
                "Index key has {} unread value bytes and {} unread number kinds",
                self.buf.len(),
                self.kinds.len()
            )));
        }
        Ok(())
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(IndexError::Corruption(format!(
                "Index key ends {} bytes early at offset {}",
                n - self.buf.remaining(),
                self.offset()
            )));
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    fn u64(&mut self) -> Result<u64> {
        self.need(8)?;
        Ok(self.buf.get_u64())
    }

    fn kind(&mut self) -> Result<u8> {
        let (&kind, rest) = self.kinds.split_first().ok_or_else(|| {
            IndexError::Corruption("Index key is missing a number kind".to_string())
        })?;
        self.kinds = rest;
        Ok(kind)
    }

    fn slot(&mut self) -> Result<Value> {
        let tag = self.u8()?;
        let group = ValueGroup::from_tag(tag)
            .ok_or_else(|| IndexError::Corruption(format!("Unknown value group tag {:#04x}", tag)))?;
        match group.element() {
            Some(element) => self.array(element),
            None => self.scalar(group),
        }
    }

    fn array(&mut self, element: ValueGroup) -> Result<Value> {
        let mut items = Vec::new();
        loop {
            match self.u8()? {
                ARRAY_END => break,
                ARRAY_ITEM => items.push(self.scalar(element)?),
                other => {
                    return Err(IndexError::Corruption(format!(
                        "Bad array marker {:#04x}",
                        other
                    )))
                }
            }
        }
        let array = ArrayValue::new(element, items)
            .map_err(|e| IndexError::Corruption(e.to_string()))?;
        Ok(Value::Array(array))
    }

    fn scalar(&mut self, group: ValueGroup) -> Result<Value> {
        Ok(match group {
            ValueGroup::Boolean => match self.u8()? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => {
                    return Err(IndexError::Corruption(format!("Bad boolean byte {}", other)))
                }
            },
            ValueGroup::Number => self.number()?,
            ValueGroup::Text => self.text()?,
            ValueGroup::Date => Value::Date(unbias_i64(self.u64()?)),
            ValueGroup::LocalTime => Value::LocalTime(unbias_i64(self.u64()?)),
            ValueGroup::LocalDateTime => Value::LocalDateTime {
                seconds: unbias_i64(self.u64()?),
                nanos: self.u32()?,
            },
            ValueGroup::ZonedDateTime => Value::DateTime {
                seconds: unbias_i64(self.u64()?),
                nanos: self.u32()?,
                offset_seconds: unbias_i32(self.u32()?),
            },
            ValueGroup::Duration => Value::Duration {
                months: unbias_i64(self.u64()?),
                days: unbias_i64(self.u64()?),
                seconds: unbias_i64(self.u64()?),
                nanos: unbias_i32(self.u32()?),
            },
            ValueGroup::Geometry => {
                let crs = self.u32()?;
                let dims = self.u8()?;
                let mut coordinates = Vec::with_capacity(dims as usize);
                for _ in 0..dims {
                    coordinates.push(f64_from_ordered(self.u64()?));
                }
                Value::Point(Point::new(crs, coordinates))
            }
            array => {
                return Err(IndexError::Corruption(format!(
                    "Array group {:?} nested inside an array",
                    array
                )))
            }
        })
    }

    fn number(&mut self) -> Result<Value> {
        let approx = f64_from_ordered(self.u64()?);
        let residual = unbias_i32(self.u32()?);
        match self.kind()? {
            KIND_INT if approx.is_finite() => {
                Ok(Value::Int((approx as i128 + residual as i128) as i64))
            }
            KIND_FLOAT => Ok(Value::Float(approx)),
            KIND_NEGATIVE_ZERO => Ok(Value::Float(-0.0)),
            other => Err(IndexError::Corruption(format!(
                "Bad number kind {} for {}",
                other, approx
            ))),
        }
    }

    fn text(&mut self) -> Result<Value> {
        let mut bytes = Vec::new();
        loop {
            let b = self.u8()?;
            if b != TEXT_ESCAPE {
                bytes.push(b);
                continue;
            }
            match self.u8()? {
                TEXT_END => break,
                TEXT_ESCAPED_ZERO => bytes.push(0),
                other => {
                    return Err(IndexError::Corruption(format!(
                        "Bad text escape {:#04x}",
                        other
                    )))
                }
            }
        }
        String::from_utf8(bytes)
            .map(Value::Text)
            .map_err(|e| IndexError::Corruption(format!("Text slot is not UTF-8: {}", e)))
    }
}
