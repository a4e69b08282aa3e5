//! Type references and definitions

use super::complex_types::ComplexType;
use super::simple_types::SimpleType;
use crate::namespaces::QName;

/// A type definition of either kind
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    /// Simple type
    Simple(SimpleType),
    /// Complex type
    Complex(ComplexType),
}

impl TypeDefinition {
    /// Name of a named definition
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeDefinition::Simple(st) => st.name.as_deref(),
            TypeDefinition::Complex(ct) => ct.name.as_deref(),
        }
    }

    /// True for simple types
    pub fn is_simple(&self) -> bool {
        matches!(self, TypeDefinition::Simple(_))
    }
}

/// How a declaration refers to its type
///
/// Named references are (namespace, name) keys resolved at use time, never
/// pointers, so schemas that import each other do not form cycles.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// Reference to a named type (possibly in another namespace)
    Named(QName),
    /// Anonymous type declared inline
    Inline(Box<TypeDefinition>),
}

impl TypeRef {
    /// Named reference
    pub fn named(qname: QName) -> Self {
        TypeRef::Named(qname)
    }

    /// Inline simple type
    pub fn inline_simple(simple_type: SimpleType) -> Self {
        TypeRef::Inline(Box::new(TypeDefinition::Simple(simple_type)))
    }

    /// Inline complex type
    pub fn inline_complex(complex_type: ComplexType) -> Self {
        TypeRef::Inline(Box::new(TypeDefinition::Complex(complex_type)))
    }

    /// The referenced name, for named references
    pub fn qname(&self) -> Option<&QName> {
        match self {
            TypeRef::Named(q) => Some(q),
            TypeRef::Inline(_) => None,
        }
    }
}
