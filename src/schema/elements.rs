//! Element declarations

use super::schemas::DerivationSet;
use super::types::TypeRef;
use crate::namespaces::QName;

/// `default` or `fixed` value of an element or attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueConstraint {
    /// Value used when the content is absent
    Default(String),
    /// The only admissible value
    Fixed(String),
}

impl ValueConstraint {
    /// Build from the `default`/`fixed` attribute pair; both at once is an
    /// error reported by the caller
    pub fn from_attributes(default: Option<&str>, fixed: Option<&str>) -> Option<Self> {
        match (default, fixed) {
            (Some(d), None) => Some(ValueConstraint::Default(d.to_string())),
            (None, Some(f)) => Some(ValueConstraint::Fixed(f.to_string())),
            _ => None,
        }
    }

    /// The constrained value
    pub fn value(&self) -> &str {
        match self {
            ValueConstraint::Default(v) | ValueConstraint::Fixed(v) => v,
        }
    }
}

/// An element declaration (global or local)
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Local name
    pub name: String,
    /// Namespace the element lives in (None for unqualified locals)
    pub namespace: Option<String>,
    /// Declared type; None means `anyType`
    pub type_ref: Option<TypeRef>,
    /// `nillable`
    pub nillable: bool,
    /// `abstract`
    pub is_abstract: bool,
    /// Whether the element is namespace-qualified in instances
    pub qualified: bool,
    /// `default` / `fixed`
    pub value_constraint: Option<ValueConstraint>,
    /// `substitutionGroup` head
    pub substitution_group: Option<QName>,
    /// `block`
    pub block: DerivationSet,
    /// `final`
    pub final_set: DerivationSet,
    /// `id`
    pub id: Option<String>,
}

impl Element {
    /// Create an element with no type (anyType)
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        let namespace = namespace.filter(|ns| !ns.is_empty()).map(str::to_string);
        Self {
            name: name.into(),
            qualified: namespace.is_some(),
            namespace,
            type_ref: None,
            nillable: false,
            is_abstract: false,
            value_constraint: None,
            substitution_group: None,
            block: DerivationSet::EMPTY,
            final_set: DerivationSet::EMPTY,
            id: None,
        }
    }

    /// Set the type
    pub fn with_type(mut self, type_ref: TypeRef) -> Self {
        self.type_ref = Some(type_ref);
        self
    }

    /// Set nillable
    pub fn with_nillable(mut self, nillable: bool) -> Self {
        self.nillable = nillable;
        self
    }

    /// Qualified name of the element
    pub fn qname(&self) -> QName {
        QName::new(self.namespace.clone(), self.name.clone())
    }

    /// Namespace as a string, empty when unqualified
    pub fn namespace_str(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }

    /// The `fixed` value, if any
    pub fn fixed_value(&self) -> Option<&str> {
        match &self.value_constraint {
            Some(ValueConstraint::Fixed(v)) => Some(v),
            _ => None,
        }
    }

    /// The `default` value, if any
    pub fn default_value(&self) -> Option<&str> {
        match &self.value_constraint {
            Some(ValueConstraint::Default(v)) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_constraint() {
        assert_eq!(
            ValueConstraint::from_attributes(Some("1"), None),
            Some(ValueConstraint::Default("1".into()))
        );
        assert_eq!(
            ValueConstraint::from_attributes(None, Some("x")).map(|v| v.value().to_string()),
            Some("x".to_string())
        );
        assert_eq!(ValueConstraint::from_attributes(None, None), None);
    }

    #[test]
    fn test_element_qname() {
        let element = Element::new("Foo", Some("urn:a"));
        assert_eq!(element.qname(), QName::namespaced("urn:a", "Foo"));
        assert!(element.qualified);

        let local = Element::new("bar", None);
        assert_eq!(local.namespace_str(), "");
        assert!(!local.qualified);
    }
}
