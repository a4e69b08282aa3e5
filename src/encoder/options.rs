//! Encoder options

use std::sync::Arc;

use indexmap::IndexMap;

use crate::limits::Limits;
use crate::schema::elements::Element;
use crate::schema::schemas::Schema;

/// One entry of an explicit schema search order
#[derive(Debug, Clone)]
pub enum SchemaRef {
    /// A schema instance
    Schema(Arc<Schema>),
    /// A namespace, resolved through the registry
    Namespace(String),
}

impl From<Arc<Schema>> for SchemaRef {
    fn from(schema: Arc<Schema>) -> Self {
        SchemaRef::Schema(schema)
    }
}

impl From<&str> for SchemaRef {
    fn from(namespace: &str) -> Self {
        SchemaRef::Namespace(namespace.to_string())
    }
}

impl From<String> for SchemaRef {
    fn from(namespace: String) -> Self {
        SchemaRef::Namespace(namespace)
    }
}

/// Options of a document encoder
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Element to try first for the document value
    pub base_element: Option<Element>,
    /// Schemas searched before the primary schema and its imports
    pub schema_order: Vec<SchemaRef>,
    /// Encoding named in the XML declaration
    pub encoding: String,
    /// Namespace to location hints for `xsi:schemaLocation`; hints are
    /// written even when the schema was not loaded from that location
    pub schema_locations: IndexMap<String, String>,
    /// Spaces per indentation level, None for no indentation
    pub indent: Option<usize>,
    /// Resource limits
    pub limits: Limits,
}

impl EncodeOptions {
    /// Default options: UTF-8, no indentation
    pub fn new() -> Self {
        Self {
            base_element: None,
            schema_order: Vec::new(),
            encoding: "UTF-8".to_string(),
            schema_locations: IndexMap::new(),
            indent: None,
            limits: Limits::default(),
        }
    }

    /// Try this element first
    pub fn with_base_element(mut self, element: Element) -> Self {
        self.base_element = Some(element);
        self
    }

    /// Append an entry to the search order
    pub fn with_schema(mut self, schema: impl Into<SchemaRef>) -> Self {
        self.schema_order.push(schema.into());
        self
    }

    /// Replace the search order
    pub fn with_schema_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SchemaRef>,
    {
        self.schema_order = order.into_iter().map(Into::into).collect();
        self
    }

    /// Set the character encoding
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Add a schema location hint
    pub fn with_schema_location(
        mut self,
        namespace: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        self.schema_locations.insert(namespace.into(), location.into());
        self
    }

    /// Set indentation
    pub fn with_indent(mut self, indent: Option<usize>) -> Self {
        self.indent = indent;
        self
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::new()
    }
}
