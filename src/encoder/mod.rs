//! Encoding values as instance documents
//!
//! [`DocumentWriter`] picks the global element that can represent a value
//! and writes it through a [`Printer`], declaring namespaces on the way.

pub mod options;
pub mod printer;
pub mod writer;

pub use options::{EncodeOptions, SchemaRef};
pub use printer::Printer;
pub use writer::DocumentWriter;
