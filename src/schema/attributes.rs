//! Attribute declarations and attribute groups

use super::elements::ValueConstraint;
use super::types::TypeRef;
use super::wildcards::AnyAttribute;
use crate::error::{Error, Result};
use crate::namespaces::QName;

/// Attribute `use` policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeUse {
    /// May be absent (default)
    #[default]
    Optional,
    /// Must be present
    Required,
    /// Must be absent
    Prohibited,
}

impl AttributeUse {
    /// Parse the `use` attribute
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            None | Some("") | Some("optional") => Ok(Self::Optional),
            Some("required") => Ok(Self::Required),
            Some("prohibited") => Ok(Self::Prohibited),
            Some(other) => Err(Error::structural(format!("invalid attribute use '{}'", other))),
        }
    }

    /// Lexical form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Optional => "optional",
            Self::Required => "required",
            Self::Prohibited => "prohibited",
        }
    }
}

/// An attribute declaration or reference
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Local name (the referenced name for `ref` attributes)
    pub name: String,
    /// Namespace (None for unqualified)
    pub namespace: Option<String>,
    /// Declared simple type; None means `anySimpleType`
    pub type_ref: Option<TypeRef>,
    /// `use`
    pub use_: AttributeUse,
    /// `default` / `fixed`
    pub value_constraint: Option<ValueConstraint>,
    /// Whether the attribute is namespace-qualified in instances
    pub qualified: bool,
    /// Set when declared with `ref`
    pub reference: Option<QName>,
    /// `id`
    pub id: Option<String>,
}

impl Attribute {
    /// Create an optional, untyped attribute
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        let namespace = namespace.filter(|ns| !ns.is_empty()).map(str::to_string);
        Self {
            name: name.into(),
            qualified: namespace.is_some(),
            namespace,
            type_ref: None,
            use_: AttributeUse::Optional,
            value_constraint: None,
            reference: None,
            id: None,
        }
    }

    /// Set the type
    pub fn with_type(mut self, type_ref: TypeRef) -> Self {
        self.type_ref = Some(type_ref);
        self
    }

    /// Set the use policy
    pub fn with_use(mut self, use_: AttributeUse) -> Self {
        self.use_ = use_;
        self
    }

    /// Qualified name
    pub fn qname(&self) -> QName {
        QName::new(self.namespace.clone(), self.name.clone())
    }
}

/// Member of an attribute list: a declaration or an attribute-group reference
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeParticle {
    /// Inline declaration or `ref` to a global attribute
    Attribute(Attribute),
    /// `attributeGroup ref=...`
    GroupRef(QName),
}

/// A named attribute group
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeGroup {
    /// Name
    pub name: String,
    /// Namespace
    pub namespace: Option<String>,
    /// Members
    pub attributes: Vec<AttributeParticle>,
    /// `anyAttribute`
    pub any_attribute: Option<AnyAttribute>,
    /// `id`
    pub id: Option<String>,
}

impl AttributeGroup {
    /// Create an empty group
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            attributes: Vec::new(),
            any_attribute: None,
            id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_use() {
        assert_eq!(AttributeUse::parse(None).unwrap(), AttributeUse::Optional);
        assert_eq!(
            AttributeUse::parse(Some("required")).unwrap(),
            AttributeUse::Required
        );
        assert_eq!(AttributeUse::Prohibited.as_str(), "prohibited");
        assert!(AttributeUse::parse(Some("sometimes")).is_err());
    }
}
