//! The Schema aggregate
//!
//! A [`Schema`] holds every top-level declaration of one target namespace.
//! Declarations are kept in insertion order and keyed by name, so names are
//! unique per kind. Imports are recorded as (namespace, location, prefix)
//! and resolved lazily through the registry.

use std::fmt;
use std::ops::BitOr;

use indexmap::IndexMap;
use url::Url;

use super::attributes::{Attribute, AttributeGroup};
use super::complex_types::ComplexType;
use super::elements::Element;
use super::groups::Group;
use super::simple_types::SimpleType;
use super::types::TypeDefinition;
use crate::error::{Error, Result};
use crate::namespaces::QName;

/// Derivation-control set for `block`, `final`, `blockDefault` and
/// `finalDefault`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct DerivationSet(u8);

impl DerivationSet {
    /// No derivation is blocked
    pub const EMPTY: DerivationSet = DerivationSet(0);
    /// `extension`
    pub const EXTENSION: DerivationSet = DerivationSet(1);
    /// `restriction`
    pub const RESTRICTION: DerivationSet = DerivationSet(2);
    /// `substitution`
    pub const SUBSTITUTION: DerivationSet = DerivationSet(4);
    /// `list`
    pub const LIST: DerivationSet = DerivationSet(8);
    /// `union`
    pub const UNION: DerivationSet = DerivationSet(16);
    /// `#all`
    pub const ALL: DerivationSet = DerivationSet(128);

    const TOKENS: [(&'static str, DerivationSet); 5] = [
        ("extension", Self::EXTENSION),
        ("restriction", Self::RESTRICTION),
        ("substitution", Self::SUBSTITUTION),
        ("list", Self::LIST),
        ("union", Self::UNION),
    ];

    /// Parse an attribute value; absent or empty yields the empty set
    pub fn parse(value: Option<&str>) -> Result<Self> {
        let value = match value.map(str::trim) {
            None | Some("") => return Ok(Self::EMPTY),
            Some(v) => v,
        };
        let mut set = Self::EMPTY;
        for token in value.split_whitespace() {
            if token.eq_ignore_ascii_case("#all") {
                set = set | Self::ALL;
                continue;
            }
            let bit = Self::TOKENS
                .iter()
                .find(|(name, _)| token.eq_ignore_ascii_case(name))
                .map(|(_, bit)| *bit)
                .ok_or_else(|| {
                    Error::structural(format!("unknown derivation control '{}'", token))
                })?;
            set = set | bit;
        }
        Ok(set)
    }

    /// Raw bit value
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// True if every bit of `other` is set
    pub fn contains(&self, other: DerivationSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if nothing is set
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for DerivationSet {
    type Output = DerivationSet;

    fn bitor(self, rhs: DerivationSet) -> DerivationSet {
        DerivationSet(self.0 | rhs.0)
    }
}

impl fmt::Display for DerivationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(Self::ALL) {
            return write!(f, "#all");
        }
        let tokens: Vec<&str> = Self::TOKENS
            .iter()
            .filter(|(_, bit)| self.contains(*bit))
            .map(|(name, _)| *name)
            .collect();
        write!(f, "{}", tokens.join(" "))
    }
}

/// An `import` of another namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Imported namespace
    pub namespace: String,
    /// Resolved schema location, if one was given
    pub location: Option<String>,
    /// Prefix bound to the namespace in the importing document
    pub prefix: Option<String>,
}

/// A parsed schema for one target namespace
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Target namespace, empty for none
    pub target_namespace: String,
    /// `id` attribute
    pub id: Option<String>,
    /// `version` attribute
    pub version: Option<String>,
    /// Prefix bound to the target namespace in the schema document
    pub prefix: Option<String>,
    /// Location of the document this schema was parsed from
    pub uri: Option<Url>,
    /// Every location merged into this schema (includes `uri`)
    pub sources: Vec<Url>,
    /// `elementFormDefault="qualified"`
    pub element_form_default: bool,
    /// `attributeFormDefault="qualified"`
    pub attribute_form_default: bool,
    /// `blockDefault`
    pub block_default: DerivationSet,
    /// `finalDefault`
    pub final_default: DerivationSet,
    /// Global element declarations
    pub elements: IndexMap<String, Element>,
    /// Named complex types
    pub complex_types: IndexMap<String, ComplexType>,
    /// Named simple types
    pub simple_types: IndexMap<String, SimpleType>,
    /// Named model groups
    pub groups: IndexMap<String, Group>,
    /// Global attribute declarations
    pub attributes: IndexMap<String, Attribute>,
    /// Named attribute groups
    pub attribute_groups: IndexMap<String, AttributeGroup>,
    /// Imports keyed by namespace
    pub imports: IndexMap<String, Import>,
    /// Included (same-namespace) document locations
    pub includes: Vec<String>,
}

impl Schema {
    /// Create an empty schema for a target namespace
    pub fn new(target_namespace: impl Into<String>) -> Self {
        Self {
            target_namespace: target_namespace.into(),
            ..Default::default()
        }
    }

    /// Set the preferred prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the backing URI
    pub fn with_uri(mut self, uri: Url) -> Self {
        self.sources.retain(|s| s != &uri);
        self.sources.insert(0, uri.clone());
        self.uri = Some(uri);
        self
    }

    /// QName of a declaration in this schema's target namespace
    pub fn qname(&self, local_name: &str) -> QName {
        QName::namespaced(self.target_namespace.clone(), local_name)
    }

    /// True if this schema was built from (or merged with) the given URI
    pub fn includes_uri(&self, uri: &Url) -> bool {
        self.uri.as_ref() == Some(uri) || self.sources.iter().any(|s| s == uri)
    }

    /// Global element by name
    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements.get(name)
    }

    /// Named complex type
    pub fn complex_type(&self, name: &str) -> Option<&ComplexType> {
        self.complex_types.get(name)
    }

    /// Named simple type
    pub fn simple_type(&self, name: &str) -> Option<&SimpleType> {
        self.simple_types.get(name)
    }

    /// Named model group
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Global attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Named attribute group
    pub fn attribute_group(&self, name: &str) -> Option<&AttributeGroup> {
        self.attribute_groups.get(name)
    }

    /// Named type of either kind; complex types take precedence
    pub fn find_type(&self, name: &str) -> Option<TypeDefinition> {
        if let Some(ct) = self.complex_types.get(name) {
            return Some(TypeDefinition::Complex(ct.clone()));
        }
        self.simple_types
            .get(name)
            .map(|st| TypeDefinition::Simple(st.clone()))
    }

    /// True if a named type (of either kind) is declared here
    pub fn declares_type(&self, name: &str) -> bool {
        self.complex_types.contains_key(name) || self.simple_types.contains_key(name)
    }

    /// Import record for a namespace
    pub fn import(&self, namespace: &str) -> Option<&Import> {
        self.imports.get(namespace)
    }

    /// Total number of top-level declarations
    pub fn declaration_count(&self) -> usize {
        self.elements.len()
            + self.complex_types.len()
            + self.simple_types.len()
            + self.groups.len()
            + self.attributes.len()
            + self.attribute_groups.len()
    }

    /// Add a global element; returns false if the name is already taken
    pub fn add_element(&mut self, element: Element) -> bool {
        insert_new(&mut self.elements, element.name.clone(), element)
    }

    /// Add a named complex type; returns false if the name is already taken
    pub fn add_complex_type(&mut self, complex_type: ComplexType) -> bool {
        match complex_type.name.clone() {
            Some(name) => insert_new(&mut self.complex_types, name, complex_type),
            None => false,
        }
    }

    /// Add a named simple type; returns false if the name is already taken
    pub fn add_simple_type(&mut self, simple_type: SimpleType) -> bool {
        match simple_type.name.clone() {
            Some(name) => insert_new(&mut self.simple_types, name, simple_type),
            None => false,
        }
    }

    /// Add a named group; returns false if the name is already taken
    pub fn add_group(&mut self, group: Group) -> bool {
        insert_new(&mut self.groups, group.name.clone(), group)
    }

    /// Add a global attribute; returns false if the name is already taken
    pub fn add_attribute(&mut self, attribute: Attribute) -> bool {
        insert_new(&mut self.attributes, attribute.name.clone(), attribute)
    }

    /// Add a named attribute group; returns false if the name is already taken
    pub fn add_attribute_group(&mut self, group: AttributeGroup) -> bool {
        insert_new(&mut self.attribute_groups, group.name.clone(), group)
    }

    /// Record an import; returns false if the namespace is already imported
    pub fn add_import(&mut self, import: Import) -> bool {
        insert_new(&mut self.imports, import.namespace.clone(), import)
    }
}

fn insert_new<V>(map: &mut IndexMap<String, V>, key: String, value: V) -> bool {
    if map.contains_key(&key) {
        return false;
    }
    map.insert(key, value);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_set_parse() {
        assert_eq!(DerivationSet::parse(None).unwrap(), DerivationSet::EMPTY);
        assert_eq!(DerivationSet::parse(Some("")).unwrap(), DerivationSet::EMPTY);
        assert_eq!(
            DerivationSet::parse(Some("extension")).unwrap(),
            DerivationSet::EXTENSION
        );
        assert_eq!(DerivationSet::parse(Some("#all")).unwrap(), DerivationSet::ALL);
        assert_eq!(DerivationSet::ALL.bits(), 128);

        let both = DerivationSet::parse(Some("extension restriction")).unwrap();
        assert!(both.contains(DerivationSet::EXTENSION));
        assert!(both.contains(DerivationSet::RESTRICTION));

        assert!(DerivationSet::parse(Some("sideways")).is_err());
    }

    #[test]
    fn test_derivation_set_display() {
        assert_eq!(DerivationSet::ALL.to_string(), "#all");
        assert_eq!(DerivationSet::RESTRICTION.to_string(), "restriction");
        assert_eq!(
            (DerivationSet::EXTENSION | DerivationSet::RESTRICTION).to_string(),
            "extension restriction"
        );
        assert_eq!(DerivationSet::EMPTY.to_string(), "");
    }

    #[test]
    fn test_unique_names_per_kind() {
        let mut schema = Schema::new("urn:a");
        assert!(schema.add_element(Element::new("Foo", Some("urn:a"))));
        assert!(!schema.add_element(Element::new("Foo", Some("urn:a"))));
        assert_eq!(schema.elements.len(), 1);
    }

    #[test]
    fn test_includes_uri() {
        let uri = Url::parse("file:///tmp/a.xsd").unwrap();
        let schema = Schema::new("urn:a").with_uri(uri.clone());
        assert!(schema.includes_uri(&uri));
        assert!(!schema.includes_uri(&Url::parse("file:///tmp/b.xsd").unwrap()));
    }
}
