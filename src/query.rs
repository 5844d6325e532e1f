//! Index queries
//!
//! One predicate per index slot. A composite query is an ordered slice of
//! these, in the same order as the index's property slots.

use crate::error::{IndexError, Result};
use crate::value::{Point, Value, ValueCategory, ValueGroup};

/// Kind of predicate, used for capability questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexQueryType {
    Exists,
    Exact,
    Range,
    StringPrefix,
    StringSuffix,
    StringContains,
    BoundingBox,
    TokenLookup,
}

/// A predicate on one slot of an index
#[derive(Debug, Clone, PartialEq)]
pub enum IndexQuery {
    /// Any value present
    Exists { property: u32 },

    /// Value equal to `value`
    Exact { property: u32, value: Value },

    /// Values of one group between optional bounds
    Range {
        property: u32,
        group: ValueGroup,
        from: Option<Value>,
        from_inclusive: bool,
        to: Option<Value>,
        to_inclusive: bool,
    },

    StringPrefix { property: u32, prefix: String },

    StringSuffix { property: u32, suffix: String },

    StringContains { property: u32, contains: String },

    /// Points inside a bounding box
    GeometryRange { property: u32, from: Point, to: Point },

    /// Entities carrying a label or relationship type
    Token { token: u32 },
}

impl IndexQuery {
    pub fn exists(property: u32) -> Self {
        IndexQuery::Exists { property }
    }

    pub fn exact(property: u32, value: Value) -> Self {
        IndexQuery::Exact { property, value }
    }

    /// Build a range predicate. At least one bound must be given and both
    /// bounds must belong to the same value group.
    pub fn range(
        property: u32,
        from: Option<Value>,
        from_inclusive: bool,
        to: Option<Value>,
        to_inclusive: bool,
    ) -> Result<Self> {
        let group = match (&from, &to) {
            (Some(f), Some(t)) if f.group() != t.group() => {
                return Err(IndexError::InvalidArgument(format!(
                    "Range bounds {} and {} belong to different value groups",
                    f, t
                )))
            }
            (Some(f), _) => f.group(),
            (None, Some(t)) => t.group(),
            (None, None) => {
                return Err(IndexError::InvalidArgument(
                    "Range predicate needs at least one bound".to_string(),
                ))
            }
        };
        Ok(IndexQuery::Range {
            property,
            group,
            from,
            from_inclusive,
            to,
            to_inclusive,
        })
    }

    /// Range over a whole value group, e.g. every string
    pub fn range_of_group(property: u32, group: ValueGroup) -> Self {
        IndexQuery::Range {
            property,
            group,
            from: None,
            from_inclusive: true,
            to: None,
            to_inclusive: true,
        }
    }

    pub fn string_prefix(property: u32, prefix: impl Into<String>) -> Self {
        IndexQuery::StringPrefix {
            property,
            prefix: prefix.into(),
        }
    }

    pub fn string_suffix(property: u32, suffix: impl Into<String>) -> Self {
        IndexQuery::StringSuffix {
            property,
            suffix: suffix.into(),
        }
    }

    pub fn string_contains(property: u32, contains: impl Into<String>) -> Self {
        IndexQuery::StringContains {
            property,
            contains: contains.into(),
        }
    }

    pub fn geometry_range(property: u32, from: Point, to: Point) -> Self {
        IndexQuery::GeometryRange { property, from, to }
    }

    pub fn token(token: u32) -> Self {
        IndexQuery::Token { token }
    }

    pub fn query_type(&self) -> IndexQueryType {
        match self {
            IndexQuery::Exists { .. } => IndexQueryType::Exists,
            IndexQuery::Exact { .. } => IndexQueryType::Exact,
            IndexQuery::Range { .. } => IndexQueryType::Range,
            IndexQuery::StringPrefix { .. } => IndexQueryType::StringPrefix,
            IndexQuery::StringSuffix { .. } => IndexQueryType::StringSuffix,
            IndexQuery::StringContains { .. } => IndexQueryType::StringContains,
            IndexQuery::GeometryRange { .. } => IndexQueryType::BoundingBox,
            IndexQuery::Token { .. } => IndexQueryType::TokenLookup,
        }
    }

    /// Property key the predicate applies to; token predicates have none
    pub fn property(&self) -> Option<u32> {
        match self {
            IndexQuery::Exists { property }
            | IndexQuery::Exact { property, .. }
            | IndexQuery::Range { property, .. }
            | IndexQuery::StringPrefix { property, .. }
            | IndexQuery::StringSuffix { property, .. }
            | IndexQuery::StringContains { property, .. }
            | IndexQuery::GeometryRange { property, .. } => Some(*property),
            IndexQuery::Token { .. } => None,
        }
    }

    pub fn value_group(&self) -> Option<ValueGroup> {
        match self {
            IndexQuery::Exact { value, .. } => Some(value.group()),
            IndexQuery::Range { group, .. } => Some(*group),
            IndexQuery::StringPrefix { .. }
            | IndexQuery::StringSuffix { .. }
            | IndexQuery::StringContains { .. } => Some(ValueGroup::Text),
            IndexQuery::GeometryRange { .. } => Some(ValueGroup::Geometry),
            IndexQuery::Exists { .. } | IndexQuery::Token { .. } => None,
        }
    }

    pub fn value_category(&self) -> ValueCategory {
        self.value_group()
            .map(ValueGroup::category)
            .unwrap_or(ValueCategory::Unknown)
    }
}
