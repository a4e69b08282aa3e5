//! XSD built-in types
//!
//! Built-in simple types of the XML Schema namespace. Each one knows how to
//! turn lexical text into a [`Value`], whether it can encode a given value,
//! and how to render a value back to text.
//!
//! Encoding capability is deliberately narrow: a type accepts only the value
//! variant it produces when parsing, so the encoder's element search picks
//! the declaration whose type matches the value exactly.

use std::fmt;

use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use super::facets::WhiteSpace;
use crate::error::{Error, Result};
use crate::names::{is_valid_ncname, is_valid_qname};
use crate::namespaces::{QName, XSD_NAMESPACE};
use crate::value::Value;

static NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_:\u{C0}-\u{FFFF}][A-Za-z0-9_:.\-\u{B7}\u{C0}-\u{FFFF}]*$")
        .expect("valid Name regex")
});

static NMTOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_:.\-\u{B7}\u{C0}-\u{FFFF}]+$").expect("valid NMTOKEN regex")
});

static LANGUAGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").expect("valid language regex")
});

static DURATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?P(?:\d+Y)?(?:\d+M)?(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+(?:\.\d+)?S)?)?$")
        .expect("valid duration regex")
});

const TZ: &str = r"(?:Z|[+-]\d{2}:\d{2})?";

static GYEAR_MONTH_REGEX: Lazy<Regex> =
    Lazy::new(|| {
        Regex::new(&format!(r"^-?\d{{4,}}-\d{{2}}{}$", TZ)).expect("valid gYearMonth regex")
    });
static GYEAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^-?\d{{4,}}{}$", TZ)).expect("valid gYear regex"));
static GMONTH_DAY_REGEX: Lazy<Regex> =
    Lazy::new(|| {
        Regex::new(&format!(r"^--\d{{2}}-\d{{2}}{}$", TZ)).expect("valid gMonthDay regex")
    });
static GDAY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^---\d{{2}}{}$", TZ)).expect("valid gDay regex"));
static GMONTH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^--\d{{2}}{}$", TZ)).expect("valid gMonth regex"));

/// A built-in simple type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    /// xs:anyType
    AnyType,
    /// xs:anySimpleType
    AnySimpleType,
    /// xs:string
    String,
    /// xs:normalizedString
    NormalizedString,
    /// xs:token
    Token,
    /// xs:language
    Language,
    /// xs:Name
    Name,
    /// xs:NCName
    NCName,
    /// xs:ID
    Id,
    /// xs:IDREF
    IdRef,
    /// xs:IDREFS
    IdRefs,
    /// xs:ENTITY
    Entity,
    /// xs:ENTITIES
    Entities,
    /// xs:NMTOKEN
    NmToken,
    /// xs:NMTOKENS
    NmTokens,
    /// xs:boolean
    Boolean,
    /// xs:decimal
    Decimal,
    /// xs:integer
    Integer,
    /// xs:long
    Long,
    /// xs:int
    Int,
    /// xs:short
    Short,
    /// xs:byte
    Byte,
    /// xs:nonNegativeInteger
    NonNegativeInteger,
    /// xs:positiveInteger
    PositiveInteger,
    /// xs:unsignedLong
    UnsignedLong,
    /// xs:unsignedInt
    UnsignedInt,
    /// xs:unsignedShort
    UnsignedShort,
    /// xs:unsignedByte
    UnsignedByte,
    /// xs:nonPositiveInteger
    NonPositiveInteger,
    /// xs:negativeInteger
    NegativeInteger,
    /// xs:float
    Float,
    /// xs:double
    Double,
    /// xs:duration
    Duration,
    /// xs:dateTime
    DateTime,
    /// xs:time
    Time,
    /// xs:date
    Date,
    /// xs:gYearMonth
    GYearMonth,
    /// xs:gYear
    GYear,
    /// xs:gMonthDay
    GMonthDay,
    /// xs:gDay
    GDay,
    /// xs:gMonth
    GMonth,
    /// xs:hexBinary
    HexBinary,
    /// xs:base64Binary
    Base64Binary,
    /// xs:anyURI
    AnyUri,
    /// xs:QName
    QName,
    /// xs:NOTATION
    Notation,
}

impl BuiltinType {
    /// Every built-in type, in XSD hierarchy order
    pub const ALL: [BuiltinType; 46] = [
        BuiltinType::AnyType,
        BuiltinType::AnySimpleType,
        BuiltinType::String,
        BuiltinType::NormalizedString,
        BuiltinType::Token,
        BuiltinType::Language,
        BuiltinType::Name,
        BuiltinType::NCName,
        BuiltinType::Id,
        BuiltinType::IdRef,
        BuiltinType::IdRefs,
        BuiltinType::Entity,
        BuiltinType::Entities,
        BuiltinType::NmToken,
        BuiltinType::NmTokens,
        BuiltinType::Boolean,
        BuiltinType::Decimal,
        BuiltinType::Integer,
        BuiltinType::Long,
        BuiltinType::Int,
        BuiltinType::Short,
        BuiltinType::Byte,
        BuiltinType::NonNegativeInteger,
        BuiltinType::PositiveInteger,
        BuiltinType::UnsignedLong,
        BuiltinType::UnsignedInt,
        BuiltinType::UnsignedShort,
        BuiltinType::UnsignedByte,
        BuiltinType::NonPositiveInteger,
        BuiltinType::NegativeInteger,
        BuiltinType::Float,
        BuiltinType::Double,
        BuiltinType::Duration,
        BuiltinType::DateTime,
        BuiltinType::Time,
        BuiltinType::Date,
        BuiltinType::GYearMonth,
        BuiltinType::GYear,
        BuiltinType::GMonthDay,
        BuiltinType::GDay,
        BuiltinType::GMonth,
        BuiltinType::HexBinary,
        BuiltinType::Base64Binary,
        BuiltinType::AnyUri,
        BuiltinType::QName,
        BuiltinType::Notation,
    ];

    /// Local name in the XML Schema namespace
    pub fn local_name(&self) -> &'static str {
        match self {
            BuiltinType::AnyType => "anyType",
            BuiltinType::AnySimpleType => "anySimpleType",
            BuiltinType::String => "string",
            BuiltinType::NormalizedString => "normalizedString",
            BuiltinType::Token => "token",
            BuiltinType::Language => "language",
            BuiltinType::Name => "Name",
            BuiltinType::NCName => "NCName",
            BuiltinType::Id => "ID",
            BuiltinType::IdRef => "IDREF",
            BuiltinType::IdRefs => "IDREFS",
            BuiltinType::Entity => "ENTITY",
            BuiltinType::Entities => "ENTITIES",
            BuiltinType::NmToken => "NMTOKEN",
            BuiltinType::NmTokens => "NMTOKENS",
            BuiltinType::Boolean => "boolean",
            BuiltinType::Decimal => "decimal",
            BuiltinType::Integer => "integer",
            BuiltinType::Long => "long",
            BuiltinType::Int => "int",
            BuiltinType::Short => "short",
            BuiltinType::Byte => "byte",
            BuiltinType::NonNegativeInteger => "nonNegativeInteger",
            BuiltinType::PositiveInteger => "positiveInteger",
            BuiltinType::UnsignedLong => "unsignedLong",
            BuiltinType::UnsignedInt => "unsignedInt",
            BuiltinType::UnsignedShort => "unsignedShort",
            BuiltinType::UnsignedByte => "unsignedByte",
            BuiltinType::NonPositiveInteger => "nonPositiveInteger",
            BuiltinType::NegativeInteger => "negativeInteger",
            BuiltinType::Float => "float",
            BuiltinType::Double => "double",
            BuiltinType::Duration => "duration",
            BuiltinType::DateTime => "dateTime",
            BuiltinType::Time => "time",
            BuiltinType::Date => "date",
            BuiltinType::GYearMonth => "gYearMonth",
            BuiltinType::GYear => "gYear",
            BuiltinType::GMonthDay => "gMonthDay",
            BuiltinType::GDay => "gDay",
            BuiltinType::GMonth => "gMonth",
            BuiltinType::HexBinary => "hexBinary",
            BuiltinType::Base64Binary => "base64Binary",
            BuiltinType::AnyUri => "anyURI",
            BuiltinType::QName => "QName",
            BuiltinType::Notation => "NOTATION",
        }
    }

    /// Look up a built-in by local name
    pub fn from_local_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.local_name() == name)
    }

    /// Look up a built-in by qualified name (must be in the XSD namespace)
    pub fn from_qname(qname: &QName) -> Option<Self> {
        if qname.is_in(XSD_NAMESPACE) {
            Self::from_local_name(&qname.local_name)
        } else {
            None
        }
    }

    /// Qualified name of this type
    pub fn qname(&self) -> QName {
        QName::namespaced(XSD_NAMESPACE, self.local_name())
    }

    /// White space facet applied before parsing
    pub fn white_space(&self) -> WhiteSpace {
        match self {
            BuiltinType::String | BuiltinType::AnySimpleType | BuiltinType::AnyType => {
                WhiteSpace::Preserve
            }
            BuiltinType::NormalizedString => WhiteSpace::Replace,
            _ => WhiteSpace::Collapse,
        }
    }

    /// True for the built-in list types
    pub fn is_list(&self) -> bool {
        self.item_type().is_some()
    }

    /// Item type of a built-in list type
    pub fn item_type(&self) -> Option<BuiltinType> {
        match self {
            BuiltinType::IdRefs => Some(BuiltinType::IdRef),
            BuiltinType::Entities => Some(BuiltinType::Entity),
            BuiltinType::NmTokens => Some(BuiltinType::NmToken),
            _ => None,
        }
    }

    /// True for the integer family
    pub fn is_integer(&self) -> bool {
        self.integer_range().is_some()
    }

    fn integer_range(&self) -> Option<(i64, i64)> {
        let range = match self {
            BuiltinType::Integer | BuiltinType::Long => (i64::MIN, i64::MAX),
            BuiltinType::Int => (i32::MIN as i64, i32::MAX as i64),
            BuiltinType::Short => (i16::MIN as i64, i16::MAX as i64),
            BuiltinType::Byte => (i8::MIN as i64, i8::MAX as i64),
            BuiltinType::NonNegativeInteger | BuiltinType::UnsignedLong => (0, i64::MAX),
            BuiltinType::PositiveInteger => (1, i64::MAX),
            BuiltinType::UnsignedInt => (0, u32::MAX as i64),
            BuiltinType::UnsignedShort => (0, u16::MAX as i64),
            BuiltinType::UnsignedByte => (0, u8::MAX as i64),
            BuiltinType::NonPositiveInteger => (i64::MIN, 0),
            BuiltinType::NegativeInteger => (i64::MIN, -1),
            _ => return None,
        };
        Some(range)
    }

    /// Integers past the i64 range, for the types whose value space
    /// reaches beyond it. They are carried as [`Value::Decimal`] with no
    /// fractional digits.
    fn parse_wide_integer(&self, text: &str) -> Option<Value> {
        let digits = text.strip_prefix('-').unwrap_or(text);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value = Decimal::from_str_exact(text).ok()?;
        self.accepts_wide_integer(&value).then_some(Value::Decimal(value))
    }

    fn accepts_wide_integer(&self, value: &Decimal) -> bool {
        if !value.fract().is_zero() {
            return false;
        }
        let above = *value > Decimal::from(i64::MAX);
        let below = *value < Decimal::from(i64::MIN);
        match self {
            BuiltinType::Integer => above || below,
            BuiltinType::NonNegativeInteger | BuiltinType::PositiveInteger => above,
            BuiltinType::UnsignedLong => above && *value <= Decimal::from(u64::MAX),
            BuiltinType::NonPositiveInteger | BuiltinType::NegativeInteger => below,
            _ => false,
        }
    }

    /// Parse lexical text into a value
    pub fn parse(&self, text: &str) -> Result<Value> {
        let text = self.white_space().normalize(text);
        let text = text.as_str();

        if let Some(item) = self.item_type() {
            let items = text
                .split_whitespace()
                .map(|token| item.parse(token))
                .collect::<Result<Vec<_>>>()?;
            if items.is_empty() {
                return Err(self.invalid(text));
            }
            return Ok(Value::List(items));
        }

        if let Some((min, max)) = self.integer_range() {
            let unsigned = text.strip_prefix('+').unwrap_or(text);
            let value = match unsigned.parse::<i64>() {
                Ok(value) => value,
                Err(_) => {
                    return self
                        .parse_wide_integer(unsigned)
                        .ok_or_else(|| self.invalid(text))
                }
            };
            if value < min || value > max {
                return Err(Error::Value(format!(
                    "value must be {} <= x <= {} for xs:{}, got {}",
                    min,
                    max,
                    self.local_name(),
                    value
                )));
            }
            return Ok(Value::Integer(value));
        }

        let value = match self {
            BuiltinType::Boolean => match text {
                "true" | "1" => Value::Boolean(true),
                "false" | "0" => Value::Boolean(false),
                _ => return Err(self.invalid(text)),
            },
            BuiltinType::Decimal => {
                if text.contains(['e', 'E']) {
                    return Err(self.invalid(text));
                }
                Value::Decimal(text.parse::<Decimal>().map_err(|_| self.invalid(text))?)
            }
            BuiltinType::Float | BuiltinType::Double => Value::Double(parse_double(text)
                .ok_or_else(|| self.invalid(text))?),
            BuiltinType::DateTime => {
                Value::DateTime(parse_date_time(text).ok_or_else(|| self.invalid(text))?)
            }
            BuiltinType::Date => Value::Date(
                NaiveDate::parse_from_str(strip_timezone(text), "%Y-%m-%d")
                    .map_err(|_| self.invalid(text))?,
            ),
            BuiltinType::Time => Value::Time(
                NaiveTime::parse_from_str(strip_timezone(text), "%H:%M:%S%.f")
                    .map_err(|_| self.invalid(text))?,
            ),
            BuiltinType::Base64Binary => {
                let compact: String = text.split_whitespace().collect();
                Value::Binary(
                    base64::engine::general_purpose::STANDARD
                        .decode(compact)
                        .map_err(|_| self.invalid(text))?,
                )
            }
            BuiltinType::HexBinary => {
                Value::Binary(decode_hex(text).ok_or_else(|| self.invalid(text))?)
            }
            _ => {
                if !self.is_lexically_valid(text) {
                    return Err(self.invalid(text));
                }
                Value::String(text.to_string())
            }
        };
        Ok(value)
    }

    fn is_lexically_valid(&self, text: &str) -> bool {
        match self {
            BuiltinType::Language => LANGUAGE_REGEX.is_match(text),
            BuiltinType::Name => NAME_REGEX.is_match(text),
            BuiltinType::NCName
            | BuiltinType::Id
            | BuiltinType::IdRef
            | BuiltinType::Entity => is_valid_ncname(text),
            BuiltinType::NmToken => NMTOKEN_REGEX.is_match(text),
            BuiltinType::QName | BuiltinType::Notation => is_valid_qname(text),
            BuiltinType::Duration => text != "P" && text != "-P" && DURATION_REGEX.is_match(text),
            BuiltinType::GYearMonth => GYEAR_MONTH_REGEX.is_match(text),
            BuiltinType::GYear => GYEAR_REGEX.is_match(text),
            BuiltinType::GMonthDay => GMONTH_DAY_REGEX.is_match(text),
            BuiltinType::GDay => GDAY_REGEX.is_match(text),
            BuiltinType::GMonth => GMONTH_REGEX.is_match(text),
            _ => true,
        }
    }

    /// True if this type can encode the value
    pub fn accepts(&self, value: &Value) -> bool {
        if let Some(item) = self.item_type() {
            return match value {
                Value::List(items) => !items.is_empty() && items.iter().all(|v| item.accepts(v)),
                _ => false,
            };
        }
        if let Some((min, max)) = self.integer_range() {
            return match value {
                Value::Integer(i) => *i >= min && *i <= max,
                Value::Decimal(d) => self.accepts_wide_integer(d),
                _ => false,
            };
        }
        match self {
            BuiltinType::AnyType => !value.is_null(),
            BuiltinType::AnySimpleType => !matches!(value, Value::Null | Value::Record(_)),
            BuiltinType::Boolean => matches!(value, Value::Boolean(_)),
            BuiltinType::Decimal => matches!(value, Value::Decimal(_)),
            BuiltinType::Float | BuiltinType::Double => matches!(value, Value::Double(_)),
            BuiltinType::DateTime => matches!(value, Value::DateTime(_)),
            BuiltinType::Date => matches!(value, Value::Date(_)),
            BuiltinType::Time => matches!(value, Value::Time(_)),
            BuiltinType::Base64Binary | BuiltinType::HexBinary => matches!(value, Value::Binary(_)),
            _ => match value {
                Value::String(s) => self.is_lexically_valid(&self.white_space().normalize(s)),
                _ => false,
            },
        }
    }

    /// Render a value as lexical text
    pub fn to_lexical(&self, value: &Value) -> Result<String> {
        if !self.accepts(value) {
            return Err(Error::Value(format!(
                "xs:{} cannot encode a {} value",
                self.local_name(),
                value.kind()
            )));
        }
        let text = match value {
            Value::Boolean(b) => b.to_string(),
            Value::Double(v) => format_double(*v),
            Value::Binary(bytes) => match self {
                BuiltinType::Base64Binary => {
                    base64::engine::general_purpose::STANDARD.encode(bytes)
                }
                _ => value.to_string(),
            },
            Value::List(items) => {
                let item = self.item_type().unwrap_or(BuiltinType::AnySimpleType);
                items
                    .iter()
                    .map(|v| item.to_lexical(v))
                    .collect::<Result<Vec<_>>>()?
                    .join(" ")
            }
            other => other.to_string(),
        };
        Ok(text)
    }

    fn invalid(&self, text: &str) -> Error {
        Error::Value(format!("'{}' is not a valid xs:{}", text, self.local_name()))
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.local_name())
    }
}

fn parse_double(text: &str) -> Option<f64> {
    match text {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ if text.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => None,
        _ => text.parse::<f64>().ok(),
    }
}

fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        value.to_string()
    }
}

fn parse_date_time(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    FixedOffset::east_opt(0).map(|utc| utc.from_utc_datetime(&naive))
}

fn strip_timezone(text: &str) -> &str {
    if let Some(stripped) = text.strip_suffix('Z') {
        return stripped;
    }
    let split = text.len().saturating_sub(6);
    match (text.get(..split), text.get(split..)) {
        (Some(rest), Some(tz)) if !rest.is_empty() => {
            let tz = tz.as_bytes();
            if (tz[0] == b'+' || tz[0] == b'-') && tz[3] == b':' {
                rest
            } else {
                text
            }
        }
        _ => text,
    }
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 || !text.is_ascii() {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(BuiltinType::from_local_name("int"), Some(BuiltinType::Int));
        assert_eq!(BuiltinType::from_local_name("Integer"), None);
        let q = QName::namespaced(XSD_NAMESPACE, "string");
        assert_eq!(BuiltinType::from_qname(&q), Some(BuiltinType::String));
        assert_eq!(BuiltinType::from_qname(&QName::local("string")), None);
        assert_eq!(BuiltinType::Byte.to_string(), "xs:byte");
    }

    #[test]
    fn test_integer_ranges() {
        assert_eq!(BuiltinType::Byte.parse(" 127 ").unwrap(), Value::Integer(127));
        assert!(BuiltinType::Byte.parse("128").is_err());
        assert!(BuiltinType::PositiveInteger.parse("0").is_err());
        assert!(BuiltinType::NegativeInteger.accepts(&Value::Integer(-1)));
        assert!(!BuiltinType::UnsignedShort.accepts(&Value::Integer(70000)));
        assert!(BuiltinType::Integer.parse("x").is_err());
    }

    #[test]
    fn test_strict_acceptance() {
        assert!(BuiltinType::Integer.accepts(&Value::Integer(42)));
        assert!(!BuiltinType::Integer.accepts(&Value::from("42")));
        assert!(!BuiltinType::Decimal.accepts(&Value::Integer(1)));
        assert!(BuiltinType::String.accepts(&Value::from("x")));
        assert!(!BuiltinType::String.accepts(&Value::Integer(1)));
        assert!(!BuiltinType::NCName.accepts(&Value::from("a:b")));
    }

    #[test]
    fn test_boolean_and_double() {
        assert_eq!(BuiltinType::Boolean.parse("1").unwrap(), Value::Boolean(true));
        assert!(BuiltinType::Boolean.parse("yes").is_err());
        assert_eq!(BuiltinType::Double.to_lexical(&Value::Double(f64::INFINITY)).unwrap(), "INF");
        match BuiltinType::Double.parse("NaN").unwrap() {
            Value::Double(v) => assert!(v.is_nan()),
            other => panic!("unexpected {:?}", other),
        }
        assert!(BuiltinType::Double.parse("inf").is_err());
    }

    #[test]
    fn test_date_time() {
        let dt = BuiltinType::DateTime.parse("2024-01-02T03:04:05Z").unwrap();
        assert!(matches!(dt, Value::DateTime(_)));
        let naive = BuiltinType::DateTime.parse("2024-01-02T03:04:05").unwrap();
        assert!(matches!(naive, Value::DateTime(_)));
        let date = BuiltinType::Date.parse("2024-01-02+01:00").unwrap();
        assert_eq!(BuiltinType::Date.to_lexical(&date).unwrap(), "2024-01-02");
        assert!(BuiltinType::GYear.parse("2024").is_ok());
        assert!(BuiltinType::GMonthDay.parse("--12-25").is_ok());
        assert!(BuiltinType::Duration.parse("P1Y2M").is_ok());
        assert!(BuiltinType::Duration.parse("P").is_err());
    }

    #[test]
    fn test_date_with_multibyte_text() {
        for text in ["a\u{e9}\u{e9}123", "\u{e9}\u{e9}\u{e9}\u{e9}", "2024-01-0\u{e9}"] {
            let err = BuiltinType::Date.parse(text).unwrap_err();
            assert!(err.to_string().contains("xs:date"), "{}", err);
            assert!(BuiltinType::Time.parse(text).is_err());
        }
        assert_eq!(strip_timezone("x\u{e9}\u{e9}+01:00"), "x\u{e9}\u{e9}");
    }

    #[test]
    fn test_integers_past_i64() {
        let big = BuiltinType::Integer.parse("123456789012345678901234").unwrap();
        assert_eq!(big, Value::Decimal("123456789012345678901234".parse().unwrap()));
        assert_eq!(BuiltinType::Integer.to_lexical(&big).unwrap(), "123456789012345678901234");

        let max = BuiltinType::UnsignedLong.parse("+18446744073709551615").unwrap();
        assert!(BuiltinType::UnsignedLong.accepts(&max));
        assert!(BuiltinType::UnsignedLong.parse("18446744073709551616").is_err());
        assert!(BuiltinType::NonNegativeInteger.parse("-9223372036854775809").is_err());
        assert!(BuiltinType::NegativeInteger.parse("-9223372036854775809").is_ok());
        assert!(BuiltinType::Long.parse("9223372036854775808").is_err());
        assert!(BuiltinType::Integer.parse("99999999999999999999.5").is_err());

        assert!(!BuiltinType::Integer.accepts(&Value::Decimal(Decimal::from(5))));
        assert!(!BuiltinType::Int.accepts(&big));
    }

    #[test]
    fn test_binary() {
        let hex = BuiltinType::HexBinary.parse("0FA1").unwrap();
        assert_eq!(hex, Value::Binary(vec![0x0F, 0xA1]));
        assert_eq!(BuiltinType::HexBinary.to_lexical(&hex).unwrap(), "0FA1");
        assert!(BuiltinType::HexBinary.parse("0G").is_err());

        let b64 = BuiltinType::Base64Binary.parse("aGVs bG8=").unwrap();
        assert_eq!(b64, Value::Binary(b"hello".to_vec()));
        assert_eq!(BuiltinType::Base64Binary.to_lexical(&b64).unwrap(), "aGVsbG8=");
    }

    #[test]
    fn test_list_types() {
        let tokens = BuiltinType::NmTokens.parse(" a  b\tc ").unwrap();
        assert_eq!(tokens, Value::List(vec!["a".into(), "b".into(), "c".into()]));
        assert_eq!(BuiltinType::NmTokens.to_lexical(&tokens).unwrap(), "a b c");
        assert!(BuiltinType::IdRefs.parse("   ").is_err());
    }

    #[test]
    fn test_to_lexical_rejects_mismatch() {
        let err = BuiltinType::Int.to_lexical(&Value::from("x")).unwrap_err();
        assert!(err.to_string().contains("xs:int"));
    }
}
