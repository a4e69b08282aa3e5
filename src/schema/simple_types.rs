//! Simple type definitions
//!
//! A user-defined simple type is a restriction, list or union over other
//! simple types. Base types are held as [`TypeRef`]s and resolved through
//! the registry when a value is checked.

use super::facets::{white_space_of, Facet, WhiteSpace};
use super::schemas::DerivationSet;
use super::types::TypeRef;
use crate::namespaces::QName;

/// Variety of a simple type
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleVariety {
    /// `restriction base=...` (or an inline base type)
    Restriction(TypeRef),
    /// `list itemType=...`
    List(TypeRef),
    /// `union memberTypes=...` plus inline members
    Union(Vec<TypeRef>),
}

impl SimpleVariety {
    /// Local name of the derivation element
    pub fn as_str(&self) -> &'static str {
        match self {
            SimpleVariety::Restriction(_) => "restriction",
            SimpleVariety::List(_) => "list",
            SimpleVariety::Union(_) => "union",
        }
    }
}

/// A simple type definition
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleType {
    /// Name; None for anonymous types
    pub name: Option<String>,
    /// Namespace of a named type
    pub namespace: Option<String>,
    /// `id`
    pub id: Option<String>,
    /// `final`
    pub final_set: DerivationSet,
    /// Restriction, list or union
    pub variety: SimpleVariety,
    /// Facets of a restriction
    pub facets: Vec<Facet>,
}

impl SimpleType {
    /// Named restriction of a base type
    pub fn restriction(name: Option<&str>, namespace: Option<&str>, base: TypeRef) -> Self {
        Self {
            name: name.map(str::to_string),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            id: None,
            final_set: DerivationSet::EMPTY,
            variety: SimpleVariety::Restriction(base),
            facets: Vec::new(),
        }
    }

    /// Add a facet
    pub fn with_facet(mut self, facet: Facet) -> Self {
        self.facets.push(facet);
        self
    }

    /// Qualified name of a named type
    pub fn qname(&self) -> Option<QName> {
        self.name
            .as_ref()
            .map(|n| QName::new(self.namespace.clone(), n.clone()))
    }

    /// White space handling declared by this type, if any
    pub fn white_space(&self) -> Option<WhiteSpace> {
        white_space_of(&self.facets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::XSD_NAMESPACE;
    use crate::schema::facets::FacetKind;

    #[test]
    fn test_restriction_builder() {
        let st = SimpleType::restriction(
            Some("Code"),
            Some("urn:a"),
            TypeRef::named(QName::namespaced(XSD_NAMESPACE, "string")),
        )
        .with_facet(Facet::new(FacetKind::WhiteSpace, "collapse"));

        assert_eq!(st.qname(), Some(QName::namespaced("urn:a", "Code")));
        assert_eq!(st.variety.as_str(), "restriction");
        assert_eq!(st.white_space(), Some(WhiteSpace::Collapse));
    }
}
