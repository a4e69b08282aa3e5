//! Constraining facets of simple types
//!
//! Facets restrict the value space of a derived simple type. They are
//! checked when a lexical value is parsed and when a value is offered for
//! encoding.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::value::Value;

/// White space handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhiteSpace {
    /// Preserve all white space
    #[default]
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl WhiteSpace {
    /// Parse from string value
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "preserve" => Ok(WhiteSpace::Preserve),
            "replace" => Ok(WhiteSpace::Replace),
            "collapse" => Ok(WhiteSpace::Collapse),
            _ => Err(Error::structural(format!(
                "Invalid whiteSpace value: '{}'. Must be 'preserve', 'replace', or 'collapse'",
                s
            ))),
        }
    }

    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => s.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

/// Facet kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetKind {
    /// `enumeration`
    Enumeration,
    /// `fractionDigits`
    FractionDigits,
    /// `length`
    Length,
    /// `maxExclusive`
    MaxExclusive,
    /// `maxInclusive`
    MaxInclusive,
    /// `maxLength`
    MaxLength,
    /// `minExclusive`
    MinExclusive,
    /// `minInclusive`
    MinInclusive,
    /// `minLength`
    MinLength,
    /// `pattern`
    Pattern,
    /// `totalDigits`
    TotalDigits,
    /// `whiteSpace`
    WhiteSpace,
}

impl FacetKind {
    const ALL: [FacetKind; 12] = [
        FacetKind::Enumeration,
        FacetKind::FractionDigits,
        FacetKind::Length,
        FacetKind::MaxExclusive,
        FacetKind::MaxInclusive,
        FacetKind::MaxLength,
        FacetKind::MinExclusive,
        FacetKind::MinInclusive,
        FacetKind::MinLength,
        FacetKind::Pattern,
        FacetKind::TotalDigits,
        FacetKind::WhiteSpace,
    ];

    /// Schema element local name
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetKind::Enumeration => "enumeration",
            FacetKind::FractionDigits => "fractionDigits",
            FacetKind::Length => "length",
            FacetKind::MaxExclusive => "maxExclusive",
            FacetKind::MaxInclusive => "maxInclusive",
            FacetKind::MaxLength => "maxLength",
            FacetKind::MinExclusive => "minExclusive",
            FacetKind::MinInclusive => "minInclusive",
            FacetKind::MinLength => "minLength",
            FacetKind::Pattern => "pattern",
            FacetKind::TotalDigits => "totalDigits",
            FacetKind::WhiteSpace => "whiteSpace",
        }
    }

    /// Look up a facet by schema element local name
    pub fn from_local_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A facet with its lexical value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facet {
    /// Which facet
    pub kind: FacetKind,
    /// `value` attribute
    pub value: String,
    /// `fixed` attribute
    pub fixed: bool,
}

impl Facet {
    /// Create a non-fixed facet
    pub fn new(kind: FacetKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            fixed: false,
        }
    }
}

/// The `whiteSpace` facet among `facets`, if present
pub fn white_space_of(facets: &[Facet]) -> Option<WhiteSpace> {
    facets
        .iter()
        .rev()
        .find(|f| f.kind == FacetKind::WhiteSpace)
        .and_then(|f| WhiteSpace::parse(&f.value).ok())
}

/// Check a value (and its lexical form) against a facet list
///
/// Enumeration and pattern facets are alternatives: the value must match
/// at least one of each kind present. All other facets must all hold.
pub fn check_facets(facets: &[Facet], lexical: &str, value: &Value) -> Result<()> {
    let enumerations: Vec<&Facet> = facets
        .iter()
        .filter(|f| f.kind == FacetKind::Enumeration)
        .collect();
    if !enumerations.is_empty()
        && !enumerations
            .iter()
            .any(|f| enumeration_matches(&f.value, lexical, value))
    {
        return Err(violation(FacetKind::Enumeration, lexical, "not an enumerated value"));
    }

    let patterns: Vec<&Facet> = facets
        .iter()
        .filter(|f| f.kind == FacetKind::Pattern)
        .collect();
    if !patterns.is_empty() {
        let mut matched = false;
        for facet in &patterns {
            if compile_pattern(&facet.value)?.is_match(lexical) {
                matched = true;
                break;
            }
        }
        if !matched {
            return Err(violation(FacetKind::Pattern, lexical, "does not match pattern"));
        }
    }

    for facet in facets {
        match facet.kind {
            FacetKind::Length | FacetKind::MinLength | FacetKind::MaxLength => {
                let bound = parse_bound(facet)?;
                let length = value_length(lexical, value);
                let ok = match facet.kind {
                    FacetKind::Length => length == bound,
                    FacetKind::MinLength => length >= bound,
                    _ => length <= bound,
                };
                if !ok {
                    return Err(violation(facet.kind, lexical, &format!("length {}", length)));
                }
            }
            FacetKind::MinInclusive
            | FacetKind::MinExclusive
            | FacetKind::MaxInclusive
            | FacetKind::MaxExclusive => {
                let ordering = match compare(value, &facet.value) {
                    Some(ordering) => ordering,
                    None => continue,
                };
                let ok = match facet.kind {
                    FacetKind::MinInclusive => ordering != Ordering::Less,
                    FacetKind::MinExclusive => ordering == Ordering::Greater,
                    FacetKind::MaxInclusive => ordering != Ordering::Greater,
                    _ => ordering == Ordering::Less,
                };
                if !ok {
                    return Err(violation(facet.kind, lexical, &format!("bound {}", facet.value)));
                }
            }
            FacetKind::TotalDigits | FacetKind::FractionDigits => {
                let bound = parse_bound(facet)?;
                if let Some((total, fraction)) = digits(value) {
                    let count = if facet.kind == FacetKind::TotalDigits {
                        total
                    } else {
                        fraction
                    };
                    if count > bound {
                        return Err(violation(facet.kind, lexical, &format!("{} digits", count)));
                    }
                }
            }
            FacetKind::Enumeration | FacetKind::Pattern | FacetKind::WhiteSpace => {}
        }
    }

    Ok(())
}

fn violation(kind: FacetKind, lexical: &str, detail: &str) -> Error {
    Error::Value(format!("'{}' violates {} facet: {}", lexical, kind, detail))
}

fn parse_bound(facet: &Facet) -> Result<usize> {
    facet.value.trim().parse::<usize>().map_err(|_| {
        Error::structural(format!("invalid {} facet value '{}'", facet.kind, facet.value))
    })
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| Error::structural(format!("invalid pattern '{}': {}", pattern, e)))
}

fn enumeration_matches(candidate: &str, lexical: &str, value: &Value) -> bool {
    if candidate == lexical {
        return true;
    }
    matches!(compare(value, candidate), Some(Ordering::Equal))
}

fn value_length(lexical: &str, value: &Value) -> usize {
    match value {
        Value::List(items) => items.len(),
        Value::Binary(bytes) => bytes.len(),
        _ => lexical.chars().count(),
    }
}

/// Order a value against the lexical value of a bound facet
fn compare(value: &Value, bound: &str) -> Option<Ordering> {
    let bound = bound.trim();
    match value {
        Value::Integer(i) => bound.parse::<Decimal>().ok().map(|b| Decimal::from(*i).cmp(&b)),
        Value::Decimal(d) => bound.parse::<Decimal>().ok().map(|b| d.cmp(&b)),
        Value::Double(v) => bound.parse::<f64>().ok().and_then(|b| v.partial_cmp(&b)),
        Value::Date(d) => NaiveDate::parse_from_str(bound, "%Y-%m-%d")
            .ok()
            .map(|b| d.cmp(&b)),
        Value::Time(t) => NaiveTime::parse_from_str(bound, "%H:%M:%S%.f")
            .ok()
            .map(|b| t.cmp(&b)),
        Value::DateTime(dt) => DateTime::parse_from_rfc3339(bound).ok().map(|b| dt.cmp(&b)),
        _ => None,
    }
}

/// Total and fraction digit counts of a numeric value
fn digits(value: &Value) -> Option<(usize, usize)> {
    let decimal = match value {
        Value::Integer(i) => Decimal::from(*i),
        Value::Decimal(d) => *d,
        _ => return None,
    };
    let normalized = decimal.normalize();
    let fraction = normalized.scale() as usize;
    let digits: String = normalized
        .abs()
        .to_string()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let significant = digits.trim_start_matches('0');
    let total = significant.len().max(1);
    Some((total.max(fraction), fraction))
}
