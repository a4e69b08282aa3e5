//! Instance document parsing
//!
//! [`InstanceParser`] reads an instance document and uses the schemas in a
//! [`SchemaRegistry`](crate::registry::SchemaRegistry) to turn it into a
//! [`Value`](crate::value::Value). Which handler reads an element is decided
//! by the handler of its parent; the document element's handler comes from
//! the configured [`HandlerFactory`].

pub mod config;
pub mod handlers;
pub mod parser;

pub use config::{FilterStrictness, ParserConfig, StopCheck};
pub use handlers::{
    AnyHandler, ElementHandler, HandlerContext, HandlerFactory, IgnoreHandler, SchemaElementHandler,
    SchemaHandlerFactory,
};
pub use parser::{InstanceParser, ParsedDocument};
