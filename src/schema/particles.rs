//! Occurrence bounds for particles
//!
//! Every grouping node and element reference in a content model carries a
//! `minOccurs`/`maxOccurs` pair.

use std::fmt;

use crate::error::{Error, Result, StructuralError};

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// One or more (1, unbounded)
    pub fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Parse `minOccurs`/`maxOccurs` attribute values; absent means 1
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Result<Self> {
        let min = match min.map(str::trim) {
            None | Some("") => 1,
            Some(v) => v.parse::<u32>().map_err(|_| {
                Error::Structural(StructuralError::new(format!("invalid minOccurs '{}'", v)))
            })?,
        };
        let max = match max.map(str::trim) {
            None | Some("") => Some(1),
            Some("unbounded") => None,
            Some(v) => Some(v.parse::<u32>().map_err(|_| {
                Error::Structural(StructuralError::new(format!("invalid maxOccurs '{}'", v)))
            })?),
        };
        let occurs = Self { min, max };
        if occurs.max.map_or(false, |m| m < min) {
            return Err(Error::structural(format!(
                "minOccurs {} exceeds maxOccurs {}",
                min,
                occurs.max_str()
            )));
        }
        Ok(occurs)
    }

    /// Check if this particle can be empty (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if particle has maxOccurs == 1
    pub fn is_single(&self) -> bool {
        self.max == Some(1)
    }

    /// Check if particle can have multiple occurrences
    pub fn is_multiple(&self) -> bool {
        self.max != Some(0) && !self.is_single()
    }

    /// Check if occurrence count is under the minimum
    pub fn is_missing(&self, count: u32) -> bool {
        count < self.min
    }

    /// Check if occurrence count exceeds the maximum
    pub fn is_exceeded(&self, count: u32) -> bool {
        match self.max {
            Some(max) => count > max,
            None => false,
        }
    }

    /// Bounds across an enclosing group that occurs up to `times` times
    /// (`None` for unbounded). The maximum scales; the minimum is kept.
    pub fn repeated(self, times: Option<u32>) -> Occurs {
        let max = match (self.max, times) {
            (Some(max), Some(times)) => Some(max.saturating_mul(times)),
            _ => None,
        };
        Occurs { min: self.min, max }
    }

    /// Lexical form of `maxOccurs`
    pub fn max_str(&self) -> String {
        match self.max {
            Some(max) => max.to_string(),
            None => "unbounded".to_string(),
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.min, self.max_str())
    }
}
