//! The schema model
//!
//! A [`Schema`] is built from an XSD document by [`SchemaParser`], merged
//! with other documents of the same namespace by [`merge`], written back out
//! by [`SchemaWriter`] and interpreted through a [`Resolver`].

pub mod attributes;
pub mod builtins;
pub mod complex_types;
pub mod elements;
pub mod facets;
pub mod groups;
pub mod merge;
pub mod parsing;
pub mod particles;
pub mod resolve;
pub mod schemas;
pub mod simple_types;
pub mod types;
pub mod wildcards;
pub mod writing;

pub use attributes::{Attribute, AttributeGroup, AttributeParticle, AttributeUse};
pub use builtins::BuiltinType;
pub use complex_types::{ComplexType, ContentKind, Derivation, DerivationMethod};
pub use elements::{Element, ValueConstraint};
pub use facets::{Facet, FacetKind, WhiteSpace};
pub use groups::{
    Compositor, ElementGrouping, ElementParticle, ElementTerm, Group, GroupRef, ModelType,
};
pub use merge::merge;
pub use parsing::SchemaParser;
pub use particles::Occurs;
pub use resolve::{AttributeSet, ResolvedType, Resolver};
pub use schemas::{DerivationSet, Import, Schema};
pub use simple_types::{SimpleType, SimpleVariety};
pub use types::{TypeDefinition, TypeRef};
pub use wildcards::{AnyAttribute, AnyWildcard, NamespaceConstraint, ProcessContents};
pub use writing::{schema_to_string, SchemaWriter};
