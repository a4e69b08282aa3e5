//! Wildcards: `any` and `anyAttribute`

use std::fmt;

use super::particles::Occurs;
use crate::error::{Error, Result};

/// Process contents mode for wildcards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    /// Element/attribute must be declared
    #[default]
    Strict,
    /// Use the declaration if found, otherwise accept
    Lax,
    /// Accept anything
    Skip,
}

impl ProcessContents {
    /// Parse the `processContents` attribute
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            None | Some("") | Some("strict") => Ok(Self::Strict),
            Some("lax") => Ok(Self::Lax),
            Some("skip") => Ok(Self::Skip),
            Some(other) => Err(Error::structural(format!(
                "invalid processContents '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Namespace constraint for wildcards
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceConstraint {
    /// `##any`
    #[default]
    Any,
    /// `##other`: anything but the target namespace and no namespace
    Other {
        /// Target namespace to exclude
        target_namespace: String,
    },
    /// Listed namespaces; the empty string stands for `##local`
    Enumeration(Vec<String>),
}

impl NamespaceConstraint {
    /// Parse the `namespace` attribute
    pub fn parse(value: Option<&str>, target_namespace: &str) -> Result<Self> {
        let value = match value.map(str::trim) {
            None => return Ok(Self::Any),
            Some(v) => v,
        };

        match value {
            "##any" => Ok(Self::Any),
            "##other" => Ok(Self::Other {
                target_namespace: target_namespace.to_string(),
            }),
            _ => {
                let mut namespaces = Vec::new();
                for ns in value.split_whitespace() {
                    let ns = match ns {
                        "##local" => String::new(),
                        "##targetNamespace" => target_namespace.to_string(),
                        s if s.starts_with("##") => {
                            return Err(Error::structural(format!(
                                "wrong value '{}' in 'namespace' attribute",
                                s
                            )));
                        }
                        uri => uri.to_string(),
                    };
                    if !namespaces.contains(&ns) {
                        namespaces.push(ns);
                    }
                }
                Ok(Self::Enumeration(namespaces))
            }
        }
    }

    /// True if an element or attribute in `namespace` is admitted
    pub fn admits(&self, namespace: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Other { target_namespace } => {
                !namespace.is_empty() && namespace != target_namespace
            }
            Self::Enumeration(list) => list.iter().any(|ns| ns == namespace),
        }
    }

    /// Lexical form for the `namespace` attribute; None for the default
    pub fn to_attribute(&self, target_namespace: &str) -> Option<String> {
        match self {
            Self::Any => None,
            Self::Other { .. } => Some("##other".to_string()),
            Self::Enumeration(list) => Some(
                list.iter()
                    .map(|ns| {
                        if ns.is_empty() {
                            "##local".to_string()
                        } else if ns == target_namespace {
                            "##targetNamespace".to_string()
                        } else {
                            ns.clone()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        }
    }
}

/// An `any` element wildcard inside a content model
#[derive(Debug, Clone, PartialEq)]
pub struct AnyWildcard {
    /// Admitted namespaces
    pub namespace: NamespaceConstraint,
    /// `processContents`
    pub process_contents: ProcessContents,
    /// Occurrence bounds
    pub occurs: Occurs,
    /// `id`
    pub id: Option<String>,
}

impl AnyWildcard {
    /// `##any`, strict, once
    pub fn new() -> Self {
        Self {
            namespace: NamespaceConstraint::Any,
            process_contents: ProcessContents::Strict,
            occurs: Occurs::once(),
            id: None,
        }
    }
}

impl Default for AnyWildcard {
    fn default() -> Self {
        Self::new()
    }
}

/// An `anyAttribute` wildcard
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnyAttribute {
    /// Admitted namespaces
    pub namespace: NamespaceConstraint,
    /// `processContents`
    pub process_contents: ProcessContents,
    /// `id`
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_constraint_parse() {
        assert_eq!(NamespaceConstraint::parse(None, "urn:t").unwrap(), NamespaceConstraint::Any);

        let other = NamespaceConstraint::parse(Some("##other"), "urn:t").unwrap();
        assert!(other.admits("urn:x"));
        assert!(!other.admits("urn:t"));
        assert!(!other.admits(""));

        let list =
            NamespaceConstraint::parse(Some("##local ##targetNamespace urn:z"), "urn:t").unwrap();
        assert!(list.admits(""));
        assert!(list.admits("urn:t"));
        assert!(list.admits("urn:z"));
        assert!(!list.admits("urn:q"));

        assert!(NamespaceConstraint::parse(Some("##bogus"), "urn:t").is_err());
    }

    #[test]
    fn test_namespace_constraint_to_attribute() {
        let list =
            NamespaceConstraint::parse(Some("##local ##targetNamespace urn:z"), "urn:t").unwrap();
        assert_eq!(
            list.to_attribute("urn:t").as_deref(),
            Some("##local ##targetNamespace urn:z")
        );
        assert_eq!(NamespaceConstraint::Any.to_attribute("urn:t"), None);
    }

    #[test]
    fn test_process_contents() {
        assert_eq!(ProcessContents::parse(None).unwrap(), ProcessContents::Strict);
        assert_eq!(ProcessContents::parse(Some("lax")).unwrap(), ProcessContents::Lax);
        assert!(ProcessContents::parse(Some("maybe")).is_err());
    }
}
