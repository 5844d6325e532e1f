//! Index capabilities
//!
//! What a composite range index can answer, and in which shapes.
//!
//! A composite query has one predicate per slot. Written as
//! `x` exact, `-` exists and `>` range, an index on five slots serves:
//!
//! ```text
//!      p1 p2 p3 p4 p5
//!  1:  x  x  x  x  x
//!  2:  -  -  -  -  -
//!  3:  x  -  -  -  -
//!  4:  x  x  x  x  -
//!  5:  >  -  -  -  -
//!  6:  x  >  -  -  -
//!  7:  x  x  x  x  >
//!  8:  >  x  -  -  -   rejected
//!  9:  >  >  -  -  -   rejected
//! 10:  -  x  -  -  -   rejected
//! 11:  -  >  -  -  -   rejected
//! ```
//!
//! Keys sort by the first slot, then the second and so on. Once a slot is
//! not an exact match, a restrictive predicate on a later slot cannot narrow
//! the contiguous range that has to be scanned, so only exists may follow.

use crate::error::{IndexError, Result};
use crate::query::{IndexQuery, IndexQueryType};
use crate::schema::CapabilityTag;
use crate::value::{ValueCategory, ValueGroup};

/// Orderings an index can return results in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrderCapability {
    None,
    AscendingOnly,
    BothFullySorted,
}

/// Whether an index can return the indexed values themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexValueCapability {
    No,
    Partial,
    Yes,
}

/// Query support advertised by an index
pub trait IndexCapability: Send + Sync {
    fn order_capability(&self, categories: &[ValueCategory]) -> IndexOrderCapability;

    fn value_capability(&self, categories: &[ValueCategory]) -> IndexValueCapability;

    fn is_query_supported(&self, query_type: IndexQueryType, category: ValueCategory) -> bool;

    fn cost_multiplier(&self, query_types: &[IndexQueryType]) -> f64;

    /// Whether the predicates, one per slot, can be served as one contiguous
    /// range scan. Empty input is an error, not a negative answer.
    fn supports_partitioned_scan(&self, queries: &[IndexQuery]) -> Result<bool>;
}

/// Capability of the native range index
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeIndexCapability;

impl IndexCapability for RangeIndexCapability {
    fn order_capability(&self, _categories: &[ValueCategory]) -> IndexOrderCapability {
        IndexOrderCapability::BothFullySorted
    }

    fn value_capability(&self, _categories: &[ValueCategory]) -> IndexValueCapability {
        IndexValueCapability::Yes
    }

    fn is_query_supported(&self, query_type: IndexQueryType, category: ValueCategory) -> bool {
        match query_type {
            IndexQueryType::Exists | IndexQueryType::Exact | IndexQueryType::StringPrefix => true,
            IndexQueryType::Range => {
                category != ValueCategory::Unknown && category != ValueCategory::Geometry
            }
            _ => false,
        }
    }

    fn cost_multiplier(&self, _query_types: &[IndexQueryType]) -> f64 {
        1.0
    }

    fn supports_partitioned_scan(&self, queries: &[IndexQuery]) -> Result<bool> {
        if queries.is_empty() {
            return Err(IndexError::InvalidArgument(
                "Partitioned scan needs at least one predicate".to_string(),
            ));
        }

        let unsupported = queries.iter().any(|q| match q {
            IndexQuery::Token { .. }
            | IndexQuery::StringSuffix { .. }
            | IndexQuery::StringContains { .. }
            | IndexQuery::GeometryRange { .. } => true,
            IndexQuery::Range { group, .. } => *group == ValueGroup::GeometryArray,
            _ => false,
        });
        if unsupported {
            return Ok(false);
        }

        for pair in queries.windows(2) {
            let (prev, query) = (&pair[0], &pair[1]);
            if matches!(prev, IndexQuery::Exact { .. }) {
                continue;
            }
            let restricts_range = matches!(
                prev,
                IndexQuery::Exists { .. } | IndexQuery::Range { .. } | IndexQuery::StringPrefix { .. }
            );
            if restricts_range && !matches!(query, IndexQuery::Exists { .. }) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Capability of a descriptor that has not been completed by a provider
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapability;

impl IndexCapability for NoCapability {
    fn order_capability(&self, _categories: &[ValueCategory]) -> IndexOrderCapability {
        IndexOrderCapability::None
    }

    fn value_capability(&self, _categories: &[ValueCategory]) -> IndexValueCapability {
        IndexValueCapability::No
    }

    fn is_query_supported(&self, _query_type: IndexQueryType, _category: ValueCategory) -> bool {
        false
    }

    fn cost_multiplier(&self, _query_types: &[IndexQueryType]) -> f64 {
        1.0
    }

    fn supports_partitioned_scan(&self, queries: &[IndexQuery]) -> Result<bool> {
        if queries.is_empty() {
            return Err(IndexError::InvalidArgument(
                "Partitioned scan needs at least one predicate".to_string(),
            ));
        }
        Ok(false)
    }
}

/// Capability implementation selected by a descriptor's tag
pub fn capability_for(tag: CapabilityTag) -> &'static dyn IndexCapability {
    static RANGE: RangeIndexCapability = RangeIndexCapability;
    static NONE: NoCapability = NoCapability;
    match tag {
        CapabilityTag::Range => &RANGE,
        CapabilityTag::NoCapability => &NONE,
    }
}
