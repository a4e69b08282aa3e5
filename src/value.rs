//! Application values
//!
//! The instance parser produces [`Value`]s and the document encoder consumes
//! them. Complex content becomes a [`Record`]: attributes and child fields
//! keyed by local name, with repeated children collected into a list.
//!
//! Values serialize with serde using the `@attribute` / `$` (text) naming of
//! the BadgerFish convention.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::namespaces::QName;

/// An application value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / nil
    Null,
    /// xs:boolean
    Boolean(bool),
    /// The integer family
    Integer(i64),
    /// xs:decimal
    Decimal(Decimal),
    /// xs:float / xs:double
    Double(f64),
    /// String-like types
    String(String),
    /// xs:dateTime
    DateTime(DateTime<FixedOffset>),
    /// xs:date
    Date(NaiveDate),
    /// xs:time
    Time(NaiveTime),
    /// xs:base64Binary / xs:hexBinary
    Binary(Vec<u8>),
    /// List types and repeated elements
    List(Vec<Value>),
    /// Complex content
    Record(Record),
}

impl Value {
    /// True for [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// String content, for string values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Record content
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// List content
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::DateTime(_) => "dateTime",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Binary(_) => "binary",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Value::Binary(b) => {
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Record(r) => write!(f, "{}", r),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

/// Complex content: attributes, child fields and optional simple content
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Element name this record must be encoded as, if restricted
    pub name: Option<QName>,
    /// Type name this record must be encoded with, if restricted
    pub type_name: Option<QName>,
    /// Attributes by local name
    pub attributes: IndexMap<String, Value>,
    /// Child elements by local name; repeated children are a [`Value::List`]
    pub fields: IndexMap<String, Value>,
    /// Simple content or mixed text
    pub content: Option<Box<Value>>,
}

impl Record {
    /// Create an empty, unrestricted record
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record bound to an element name
    pub fn named(name: QName) -> Self {
        Self {
            name: Some(name),
            ..Default::default()
        }
    }

    /// Restrict the record to a type
    pub fn with_type(mut self, type_name: QName) -> Self {
        self.type_name = Some(type_name);
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Add a child field (see [`Record::push_field`])
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_field(name, value);
        self
    }

    /// Set the simple content
    pub fn with_content(mut self, value: impl Into<Value>) -> Self {
        self.content = Some(Box::new(value.into()));
        self
    }

    /// Add a child field; a second value under the same name turns the
    /// field into a list, later values are appended to it
    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.get_mut(&name) {
            None => {
                self.fields.insert(name, value);
            }
            Some(Value::List(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::replace(existing, Value::Null);
                *existing = Value::List(vec![first, value]);
            }
        }
    }

    /// Child field by name
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// True if the record is bound to an element name compatible with
    /// (namespace, local name); unbound records match anything
    pub fn matches_name(&self, namespace: &str, local_name: &str) -> bool {
        match &self.name {
            None => true,
            Some(q) => {
                q.local_name == local_name && (q.namespace.is_none() || q.is_in(namespace))
            }
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for (k, v) in &self.attributes {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "@{}: {}", k, v)?;
        }
        for (k, v) in &self.fields {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}: {}", k, v)?;
        }
        if let Some(content) = &self.content {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "$: {}", content)?;
        }
        write!(f, "}}")
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::String(s) => serializer.serialize_str(s),
            Value::Decimal(_)
            | Value::DateTime(_)
            | Value::Date(_)
            | Value::Time(_)
            | Value::Binary(_) => serializer.serialize_str(&self.to_string()),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Record(r) => r.serialize(serializer),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.attributes.len() + self.fields.len() + usize::from(self.content.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (k, v) in &self.attributes {
            map.serialize_entry(&format!("@{}", k), v)?;
        }
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        if let Some(content) = &self.content {
            map.serialize_entry("$", content.as_ref())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_field_collects_repeats() {
        let mut record = Record::new();
        record.push_field("item", 1);
        record.push_field("item", 2);
        record.push_field("item", 3);
        assert_eq!(
            record.field("item"),
            Some(&Value::List(vec![1.into(), 2.into(), 3.into()]))
        );
    }

    #[test]
    fn test_matches_name() {
        let unbound = Record::new();
        assert!(unbound.matches_name("urn:a", "Foo"));

        let local = Record::named(QName::local("Foo"));
        assert!(local.matches_name("urn:a", "Foo"));
        assert!(!local.matches_name("urn:a", "Bar"));

        let qualified = Record::named(QName::namespaced("urn:b", "Foo"));
        assert!(!qualified.matches_name("urn:a", "Foo"));
    }

    #[test]
    fn test_json_serialization() {
        let record = Record::new()
            .with_attribute("id", "x1")
            .with_field("count", 3)
            .with_field("price", Decimal::new(1250, 2));
        let json = Value::Record(record).to_json();
        assert_eq!(json, json!({"@id": "x1", "count": 3, "price": "12.50"}));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::List(vec![1.into(), 2.into()]).to_string(), "1 2");
        assert_eq!(Value::Binary(vec![0xAB, 0x01]).to_string(), "AB01");
    }
}
