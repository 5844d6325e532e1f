//! Query to key-range translation
//!
//! A composite query becomes one contiguous key range (the exact-match
//! prefix plus the bounds of the first non-exact slot) and a per-slot
//! filter applied to every key inside that range.

use std::ops::Bound;

use super::codec::{encode_slot, encode_text_prefix, slot_spans};
use crate::error::{IndexError, Result};
use crate::query::IndexQuery;
use crate::value::Value;

/// Smallest byte string greater than every string starting with `bytes`.
/// `None` if `bytes` is all `0xFF` (no such string exists).
pub fn successor(bytes: &[u8]) -> Option<Vec<u8>> {
    let last = bytes.iter().rposition(|&b| b != 0xFF)?;
    let mut next = bytes[..=last].to_vec();
    next[last] += 1;
    Some(next)
}

/// Bounds on the encoding of one slot
#[derive(Debug, Clone)]
struct SlotFilter {
    lower: Bound<Vec<u8>>,
    upper: Bound<Vec<u8>>,
}

impl SlotFilter {
    fn for_query(query: &IndexQuery) -> Result<Self> {
        Ok(match query {
            IndexQuery::Exists { .. } => SlotFilter {
                lower: Bound::Unbounded,
                upper: Bound::Unbounded,
            },
            IndexQuery::Exact { value, .. } => {
                let enc = encode_slot(value)?;
                SlotFilter {
                    lower: Bound::Included(enc.clone()),
                    upper: Bound::Included(enc),
                }
            }
            IndexQuery::Range {
                group,
                from,
                from_inclusive,
                to,
                to_inclusive,
                ..
            } => {
                let tag = vec![group.tag()];
                let lower = match from {
                    Some(v) => bound(checked_slot(v, *group)?, *from_inclusive),
                    None => Bound::Included(tag.clone()),
                };
                let upper = match to {
                    Some(v) => bound(checked_slot(v, *group)?, *to_inclusive),
                    None => excluded_successor(&tag),
                };
                SlotFilter { lower, upper }
            }
            IndexQuery::StringPrefix { prefix, .. } => {
                let enc = encode_text_prefix(prefix);
                let upper = excluded_successor(&enc);
                SlotFilter {
                    lower: Bound::Included(enc),
                    upper,
                }
            }
            other => {
                return Err(IndexError::InvalidArgument(format!(
                    "{:?} predicates cannot be answered by a key range",
                    other.query_type()
                )))
            }
        })
    }

    fn accepts(&self, span: &[u8]) -> bool {
        let above = match &self.lower {
            Bound::Included(lo) => span >= lo.as_slice(),
            Bound::Excluded(lo) => span > lo.as_slice(),
            Bound::Unbounded => true,
        };
        let below = match &self.upper {
            Bound::Included(hi) => span <= hi.as_slice(),
            Bound::Excluded(hi) => span < hi.as_slice(),
            Bound::Unbounded => true,
        };
        above && below
    }

    fn is_exact(&self) -> bool {
        matches!((&self.lower, &self.upper), (Bound::Included(lo), Bound::Included(hi)) if lo == hi)
    }
}

fn checked_slot(value: &Value, group: crate::value::ValueGroup) -> Result<Vec<u8>> {
    if value.group() != group {
        return Err(IndexError::InvalidArgument(format!(
            "Range bound {} is not in group {:?}",
            value, group
        )));
    }
    encode_slot(value)
}

fn bound(enc: Vec<u8>, inclusive: bool) -> Bound<Vec<u8>> {
    if inclusive {
        Bound::Included(enc)
    } else {
        Bound::Excluded(enc)
    }
}

fn excluded_successor(bytes: &[u8]) -> Bound<Vec<u8>> {
    match successor(bytes) {
        Some(next) => Bound::Excluded(next),
        None => Bound::Unbounded,
    }
}

/// Contiguous key range plus per-slot filters for one composite query
#[derive(Debug, Clone)]
pub struct ScanRange {
    pub lower: Bound<Vec<u8>>,
    pub upper: Bound<Vec<u8>>,
    filters: Vec<SlotFilter>,
}

impl ScanRange {
    /// Range covering every key of an index
    pub fn all(slots: usize) -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
            filters: vec![
                SlotFilter {
                    lower: Bound::Unbounded,
                    upper: Bound::Unbounded,
                };
                slots
            ],
        }
    }

    /// Translate one predicate per slot into a key range
    pub fn for_queries(queries: &[IndexQuery]) -> Result<Self> {
        if queries.is_empty() {
            return Err(IndexError::InvalidArgument(
                "A query needs at least one predicate".to_string(),
            ));
        }
        let filters = queries
            .iter()
            .map(SlotFilter::for_query)
            .collect::<Result<Vec<_>>>()?;

        let mut prefix = Vec::new();
        let mut first_open = None;
        for filter in &filters {
            match (&filter.lower, filter.is_exact()) {
                (Bound::Included(enc), true) => prefix.extend_from_slice(enc),
                _ => {
                    first_open = Some(filter);
                    break;
                }
            }
        }

        let (lower, upper) = match first_open {
            None => (included_or_unbounded(prefix.clone()), excluded_successor_of(&prefix)),
            Some(filter) => {
                let lower = match &filter.lower {
                    Bound::Included(enc) => Bound::Included(concat(&prefix, enc)),
                    Bound::Excluded(enc) => match successor(&concat(&prefix, enc)) {
                        Some(next) => Bound::Included(next),
                        None => Bound::Unbounded,
                    },
                    Bound::Unbounded => included_or_unbounded(prefix.clone()),
                };
                let upper = match &filter.upper {
                    Bound::Included(enc) => excluded_successor(&concat(&prefix, enc)),
                    Bound::Excluded(enc) => Bound::Excluded(concat(&prefix, enc)),
                    Bound::Unbounded => excluded_successor_of(&prefix),
                };
                (lower, upper)
            }
        };

        Ok(Self {
            lower,
            upper,
            filters,
        })
    }

    /// Number of slots this range was built for
    pub fn slots(&self) -> usize {
        self.filters.len()
    }

    /// Whether every slot of `key` satisfies its predicate
    pub fn accepts(&self, key: &[u8]) -> Result<bool> {
        let spans = slot_spans(key, self.filters.len())?;
        Ok(self
            .filters
            .iter()
            .zip(spans)
            .all(|(filter, span)| filter.accepts(span)))
    }
}

fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

fn included_or_unbounded(prefix: Vec<u8>) -> Bound<Vec<u8>> {
    if prefix.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Included(prefix)
    }
}

fn excluded_successor_of(prefix: &[u8]) -> Bound<Vec<u8>> {
    if prefix.is_empty() {
        Bound::Unbounded
    } else {
        excluded_successor(prefix)
    }
}
