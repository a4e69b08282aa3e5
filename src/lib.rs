//! # xsdbind
//!
//! Schema-driven XML binding.
//!
//! XML Schema documents are parsed into a [`Schema`] model and cached per
//! target namespace in a [`SchemaRegistry`]. Instance documents are decoded
//! into [`Value`]s guided by those schemas, and values are encoded back into
//! documents by choosing the global element whose type can represent them.
//!
//! ## Features
//!
//! - XSD parsing: elements, attributes, simple and complex types, groups,
//!   wildcards, imports and includes
//! - Per-namespace schema cache with merging of partial schemas
//! - Streaming instance parsing with configurable strictness and
//!   cancellation
//! - Value encoding with namespace and `xsi:schemaLocation` handling
//! - Re-emitting a schema model as an XSD document
//! - Protection against oversized or deeply nested input
//!
//! ## Example
//!
//! ```rust,ignore
//! use xsdbind::{DocumentWriter, InstanceParser, SchemaRegistry, SchemaSource, Value};
//!
//! let registry = SchemaRegistry::new();
//! let schema = registry.resolve("urn:orders", SchemaSource::from_path("orders.xsd")?)?;
//!
//! let doc = InstanceParser::new(&registry).parse(xml.as_bytes())?;
//! let xml = DocumentWriter::new(&registry, schema).write_string(&doc.value)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Names and locations
pub mod namespaces;
pub mod names;
pub mod locations;

// Resource loading
pub mod loaders;
pub mod events;

// Data model
pub mod value;
pub mod schema;
pub mod registry;

// Instance documents
pub mod instance;
pub mod encoder;

// Re-exports for convenience
pub use encoder::{DocumentWriter, EncodeOptions};
pub use error::{Error, Result};
pub use instance::{FilterStrictness, InstanceParser, ParsedDocument, ParserConfig};
pub use limits::Limits;
pub use namespaces::QName;
pub use registry::{SchemaRegistry, SchemaSource};
pub use schema::{Resolver, Schema, SchemaWriter};
pub use value::{Record, Value};

/// Version of the xsdbind library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
