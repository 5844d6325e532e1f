//! Property values
//!
//! The values an index stores per slot, the ordering groups they fall into,
//! and the coarse categories used when negotiating query support.

use std::fmt;

use crate::error::{IndexError, Result};

// =============================================================================
// Value Groups
// =============================================================================

/// Ordering group of a value.
///
/// Values of different groups never compare equal. The discriminant is the
/// leading byte of every encoded slot, so declaration order is sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ValueGroup {
    GeometryArray = 0x01,
    ZonedDateTimeArray = 0x02,
    LocalDateTimeArray = 0x03,
    DateArray = 0x04,
    LocalTimeArray = 0x05,
    DurationArray = 0x06,
    TextArray = 0x07,
    BooleanArray = 0x08,
    NumberArray = 0x09,
    Geometry = 0x0A,
    ZonedDateTime = 0x0B,
    LocalDateTime = 0x0C,
    Date = 0x0D,
    LocalTime = 0x0E,
    Duration = 0x0F,
    Text = 0x10,
    Boolean = 0x11,
    Number = 0x12,
}

impl ValueGroup {
    /// Decode a group from its tag byte
    pub fn from_tag(tag: u8) -> Option<Self> {
        use ValueGroup::*;
        Some(match tag {
            0x01 => GeometryArray,
            0x02 => ZonedDateTimeArray,
            0x03 => LocalDateTimeArray,
            0x04 => DateArray,
            0x05 => LocalTimeArray,
            0x06 => DurationArray,
            0x07 => TextArray,
            0x08 => BooleanArray,
            0x09 => NumberArray,
            0x0A => Geometry,
            0x0B => ZonedDateTime,
            0x0C => LocalDateTime,
            0x0D => Date,
            0x0E => LocalTime,
            0x0F => Duration,
            0x10 => Text,
            0x11 => Boolean,
            0x12 => Number,
            _ => return None,
        })
    }

    /// Tag byte written in front of every encoded slot
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn is_array(self) -> bool {
        self.tag() <= ValueGroup::NumberArray.tag()
    }

    /// Array group holding elements of this group
    pub fn array_of(self) -> Option<ValueGroup> {
        use ValueGroup::*;
        Some(match self {
            Geometry => GeometryArray,
            ZonedDateTime => ZonedDateTimeArray,
            LocalDateTime => LocalDateTimeArray,
            Date => DateArray,
            LocalTime => LocalTimeArray,
            Duration => DurationArray,
            Text => TextArray,
            Boolean => BooleanArray,
            Number => NumberArray,
            _ => return None,
        })
    }

    /// Element group of an array group
    pub fn element(self) -> Option<ValueGroup> {
        use ValueGroup::*;
        Some(match self {
            GeometryArray => Geometry,
            ZonedDateTimeArray => ZonedDateTime,
            LocalDateTimeArray => LocalDateTime,
            DateArray => Date,
            LocalTimeArray => LocalTime,
            DurationArray => Duration,
            TextArray => Text,
            BooleanArray => Boolean,
            NumberArray => Number,
            _ => return None,
        })
    }

    pub fn category(self) -> ValueCategory {
        use ValueGroup::*;
        match self {
            Number => ValueCategory::Number,
            NumberArray => ValueCategory::NumberArray,
            Text => ValueCategory::Text,
            TextArray => ValueCategory::TextArray,
            Boolean => ValueCategory::Boolean,
            BooleanArray => ValueCategory::BooleanArray,
            Geometry => ValueCategory::Geometry,
            GeometryArray => ValueCategory::GeometryArray,
            ZonedDateTime | LocalDateTime | Date | LocalTime | Duration => ValueCategory::Temporal,
            ZonedDateTimeArray | LocalDateTimeArray | DateArray | LocalTimeArray
            | DurationArray => ValueCategory::TemporalArray,
        }
    }
}

/// Coarse value grouping used to decide predicate and type support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueCategory {
    Number,
    NumberArray,
    Text,
    TextArray,
    Boolean,
    BooleanArray,
    Temporal,
    TemporalArray,
    Geometry,
    GeometryArray,
    Unknown,
}

// =============================================================================
// Values
// =============================================================================

/// A spatial point in a coordinate reference system
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Coordinate reference system code (e.g. 4326, 7203)
    pub crs: u32,
    pub coordinates: Vec<f64>,
}

impl Point {
    pub fn new(crs: u32, coordinates: Vec<f64>) -> Self {
        Self { crs, coordinates }
    }
}

/// Homogeneous array value. The element group is explicit so empty
/// arrays still belong to a single ordering group.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    element: ValueGroup,
    items: Vec<Value>,
}

impl ArrayValue {
    /// Create an array, checking that every item belongs to `element`
    pub fn new(element: ValueGroup, items: Vec<Value>) -> Result<Self> {
        if element.is_array() {
            return Err(IndexError::InvalidArgument(
                "Nested arrays are not indexable".to_string(),
            ));
        }
        if let Some(bad) = items.iter().find(|v| v.group() != element) {
            return Err(IndexError::InvalidArgument(format!(
                "Array of {:?} cannot hold {}",
                element, bad
            )));
        }
        Ok(Self { element, items })
    }

    pub fn element(&self) -> ValueGroup {
        self.element
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A property value that can be stored in a range index
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Days since 1970-01-01
    Date(i64),
    /// Nanoseconds since midnight
    LocalTime(i64),
    LocalDateTime { seconds: i64, nanos: u32 },
    /// Zoned date-time: UTC epoch seconds plus the zone offset it was written in
    DateTime { seconds: i64, nanos: u32, offset_seconds: i32 },
    Duration { months: i64, days: i64, seconds: i64, nanos: i32 },
    Point(Point),
    Array(ArrayValue),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn group(&self) -> ValueGroup {
        match self {
            Value::Bool(_) => ValueGroup::Boolean,
            Value::Int(_) | Value::Float(_) => ValueGroup::Number,
            Value::Text(_) => ValueGroup::Text,
            Value::Date(_) => ValueGroup::Date,
            Value::LocalTime(_) => ValueGroup::LocalTime,
            Value::LocalDateTime { .. } => ValueGroup::LocalDateTime,
            Value::DateTime { .. } => ValueGroup::ZonedDateTime,
            Value::Duration { .. } => ValueGroup::Duration,
            Value::Point(_) => ValueGroup::Geometry,
            Value::Array(array) => array
                .element()
                .array_of()
                .unwrap_or(ValueGroup::NumberArray),
        }
    }

    pub fn category(&self) -> ValueCategory {
        self.group().category()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Date(d) => write!(f, "date({})", d),
            Value::LocalTime(n) => write!(f, "localtime({})", n),
            Value::LocalDateTime { seconds, nanos } => {
                write!(f, "localdatetime({}.{:09})", seconds, nanos)
            }
            Value::DateTime {
                seconds,
                nanos,
                offset_seconds,
            } => write!(f, "datetime({}.{:09}{:+}s)", seconds, nanos, offset_seconds),
            Value::Duration {
                months,
                days,
                seconds,
                nanos,
            } => write!(f, "duration(P{}M{}DT{}.{:09}S)", months, days, seconds, nanos),
            Value::Point(p) => {
                write!(f, "point(crs={}, [", p.crs)?;
                for (i, c) in p.coordinates.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, "])")
            }
            Value::Array(array) => {
                write!(f, "[")?;
                for (i, v) in array.items().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Render a value tuple the way error messages show it: `( 'a', 1 )`
pub fn display_tuple(values: &[Value]) -> String {
    if values.len() == 1 {
        return values[0].to_string();
    }
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("( {} )", parts.join(", "))
}
