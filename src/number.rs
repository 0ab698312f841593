//! Number Algebra - Single Numbers and Ranges
//!
//! Every uniqueness and overlap check in the crate reduces to
//! [`FieldNumber::intersects`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// An inclusive range `start..=end` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct NumberRange {
    start: u32,
    end: u32,
}

#[derive(Deserialize)]
struct RangeBounds {
    start: u32,
    end: u32,
}

impl TryFrom<RangeBounds> for NumberRange {
    type Error = SchemaError;

    fn try_from(bounds: RangeBounds) -> Result<Self, Self::Error> {
        NumberRange::new(bounds.start, bounds.end)
    }
}

impl NumberRange {
    pub fn new(start: u32, end: u32) -> Result<Self, SchemaError> {
        if start >= end {
            return Err(SchemaError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn contains(&self, number: u32) -> bool {
        self.start <= number && number <= self.end
    }
}

/// Anything that occupies field numbers: a single number or a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum FieldNumber {
    Single(u32),
    Range(NumberRange),
}

impl FieldNumber {
    /// Symmetric: `a.intersects(&b) == b.intersects(&a)` for all operands.
    pub fn intersects(&self, other: &FieldNumber) -> bool {
        match (self, other) {
            (FieldNumber::Single(a), FieldNumber::Single(b)) => a == b,
            (FieldNumber::Single(n), FieldNumber::Range(r))
            | (FieldNumber::Range(r), FieldNumber::Single(n)) => r.contains(*n),
            (FieldNumber::Range(a), FieldNumber::Range(b)) => {
                a.contains(b.start)
                    || a.contains(b.end)
                    || b.contains(a.start)
                    || b.contains(a.end)
            }
        }
    }

    pub fn lowest(&self) -> u32 {
        match self {
            FieldNumber::Single(n) => *n,
            FieldNumber::Range(r) => r.start,
        }
    }

    pub fn highest(&self) -> u32 {
        match self {
            FieldNumber::Single(n) => *n,
            FieldNumber::Range(r) => r.end,
        }
    }
}

impl From<u32> for FieldNumber {
    fn from(number: u32) -> Self {
        FieldNumber::Single(number)
    }
}

impl From<NumberRange> for FieldNumber {
    fn from(range: NumberRange) -> Self {
        FieldNumber::Range(range)
    }
}

impl fmt::Display for FieldNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldNumber::Single(n) => write!(f, "field number {n}"),
            FieldNumber::Range(r) => write!(f, "range {} to {}", r.start, r.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u32, end: u32) -> FieldNumber {
        NumberRange::new(start, end).unwrap().into()
    }

    #[test]
    fn test_range_requires_ordered_endpoints() {
        assert!(NumberRange::new(1, 2).is_ok());
        assert_eq!(
            NumberRange::new(5, 5),
            Err(SchemaError::InvalidRange { start: 5, end: 5 })
        );
        assert!(NumberRange::new(6, 5).is_err());
    }

    #[test]
    fn test_single_against_single() {
        assert!(FieldNumber::from(3).intersects(&3.into()));
        assert!(!FieldNumber::from(3).intersects(&4.into()));
    }

    #[test]
    fn test_single_against_range() {
        let r = range(11, 20);
        for n in [11, 15, 20] {
            assert!(FieldNumber::from(n).intersects(&r));
            assert!(r.intersects(&n.into()));
        }
        assert!(!FieldNumber::from(10).intersects(&r));
        assert!(!r.intersects(&21.into()));
    }

    #[test]
    fn test_range_against_range() {
        assert!(range(1, 10).intersects(&range(10, 20)));
        assert!(!range(1, 10).intersects(&range(11, 20)));
        // containment without shared endpoints
        assert!(range(1, 100).intersects(&range(40, 50)));
        assert!(range(40, 50).intersects(&range(1, 100)));
    }

    #[test]
    fn test_range_deserialization_validates() {
        let ok: NumberRange = serde_json::from_str(r#"{"start": 1, "end": 2}"#).unwrap();
        assert_eq!((ok.start(), ok.end()), (1, 2));
        assert!(serde_json::from_str::<NumberRange>(r#"{"start": 2, "end": 1}"#).is_err());
    }
}
