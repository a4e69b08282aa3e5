//! Complex type definitions

use super::attributes::AttributeParticle;
use super::facets::Facet;
use super::groups::ElementGrouping;
use super::schemas::DerivationSet;
use super::wildcards::AnyAttribute;
use crate::namespaces::QName;

/// Derivation method of complex or simple content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationMethod {
    /// `extension`
    Extension,
    /// `restriction`
    Restriction,
}

impl DerivationMethod {
    /// Local name of the schema element
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivationMethod::Extension => "extension",
            DerivationMethod::Restriction => "restriction",
        }
    }
}

/// Whether a derivation is `complexContent` or `simpleContent`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `complexContent`
    Complex,
    /// `simpleContent`
    Simple,
}

impl ContentKind {
    /// Local name of the schema element
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Complex => "complexContent",
            ContentKind::Simple => "simpleContent",
        }
    }
}

/// Derivation of a complex type from a named base
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    /// `complexContent` or `simpleContent`
    pub content: ContentKind,
    /// `extension` or `restriction`
    pub method: DerivationMethod,
    /// Base type name
    pub base: QName,
    /// Facets of a `simpleContent` restriction
    pub facets: Vec<Facet>,
    /// `mixed` on `complexContent`
    pub mixed: Option<bool>,
}

/// A complex type definition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComplexType {
    /// Name; None for anonymous types
    pub name: Option<String>,
    /// Namespace of a named type
    pub namespace: Option<String>,
    /// The type's own content model (for derived types, the part declared
    /// in the derivation)
    pub content: Option<ElementGrouping>,
    /// The type's own attributes
    pub attributes: Vec<AttributeParticle>,
    /// `anyAttribute`
    pub any_attribute: Option<AnyAttribute>,
    /// `mixed`
    pub mixed: bool,
    /// `abstract`
    pub is_abstract: bool,
    /// `block`
    pub block: DerivationSet,
    /// `final`
    pub final_set: DerivationSet,
    /// `complexContent`/`simpleContent` derivation, if any
    pub derivation: Option<Derivation>,
    /// `id`
    pub id: Option<String>,
}

impl ComplexType {
    /// Create a named, empty complex type
    pub fn named(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: Some(name.into()),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            ..Default::default()
        }
    }

    /// Create an anonymous, empty complex type
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Set the content model
    pub fn with_content(mut self, content: ElementGrouping) -> Self {
        self.content = Some(content);
        self
    }

    /// Add an attribute particle
    pub fn with_attribute(mut self, attribute: AttributeParticle) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Qualified name of a named type
    pub fn qname(&self) -> Option<QName> {
        self.name
            .as_ref()
            .map(|n| QName::new(self.namespace.clone(), n.clone()))
    }

    /// True if the type has simple content
    pub fn has_simple_content(&self) -> bool {
        matches!(
            self.derivation,
            Some(Derivation {
                content: ContentKind::Simple,
                ..
            })
        )
    }
}
