//! XML namespace handling
//!
//! This module provides qualified names (QNames) and a scoped namespace
//! context that follows prefix-mapping start/end events.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Qualified name (QName) - combination of namespace and local name
///
/// An empty namespace string is normalised to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()).filter(|s| !s.is_empty()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: if namespace.is_empty() { None } else { Some(namespace) },
            local_name: local_name.into(),
        }
    }

    /// Namespace as a string, empty when absent
    pub fn namespace_str(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }

    /// True if this name lives in the given namespace (empty = none)
    pub fn is_in(&self, namespace: &str) -> bool {
        self.namespace_str() == namespace
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// Namespace context for resolving prefixes
///
/// Bindings live in scopes; a scope is opened for every element and closed
/// when the element ends, so inner declarations shadow outer ones.
#[derive(Debug, Clone)]
pub struct NamespaceContext {
    scopes: Vec<HashMap<Prefix, NamespaceUri>>,
}

impl NamespaceContext {
    /// Create a new namespace context with one empty scope
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    /// Open a new innermost scope
    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Close the innermost scope; the outermost scope is never removed
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Add a namespace prefix mapping to the innermost scope
    ///
    /// The empty prefix binds the default namespace.
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(prefix.into(), namespace.into());
        }
    }

    /// Get the namespace bound to a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(prefix))
            .map(|s| s.as_str())
    }

    /// Get the default namespace, if one is bound and non-empty
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.get_namespace("").filter(|ns| !ns.is_empty())
    }

    /// Find a prefix currently bound to the namespace
    ///
    /// Named prefixes are preferred over the default binding.
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        let mut fallback = None;
        for scope in self.scopes.iter().rev() {
            for (prefix, ns) in scope {
                if ns == namespace && self.get_namespace(prefix) == Some(namespace) {
                    if !prefix.is_empty() {
                        return Some(prefix.as_str());
                    }
                    fallback = Some(prefix.as_str());
                }
            }
        }
        fallback
    }

    /// Number of bindings across all scopes
    pub fn len(&self) -> usize {
        self.scopes.iter().map(|s| s.len()).sum()
    }

    /// True if no bindings are present
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a prefixed name to a QName
    ///
    /// Unprefixed names take the default namespace, or `fallback` when no
    /// default namespace is bound.
    pub fn resolve(&self, prefixed_name: &str, fallback: Option<&str>) -> Result<QName> {
        if let Some((prefix, local)) = prefixed_name.split_once(':') {
            let namespace = self
                .get_namespace(prefix)
                .ok_or_else(|| Error::Namespace(format!("Unknown prefix: {}", prefix)))?;
            Ok(QName::namespaced(namespace, local))
        } else {
            let namespace = self.get_default_namespace().or(fallback);
            Ok(QName::new(namespace, prefixed_name))
        }
    }
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_creation() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.namespace, Some("http://example.com".to_string()));
        assert_eq!(qname.local_name, "element");
        assert_eq!(QName::namespaced("", "x").namespace, None);
    }

    #[test]
    fn test_qname_display() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");

        let qname_local = QName::local("element");
        assert_eq!(qname_local.to_string(), "element");
    }

    #[test]
    fn test_scoped_bindings() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("a", "urn:outer");
        ctx.push_scope();
        ctx.add_prefix("a", "urn:inner");
        assert_eq!(ctx.get_namespace("a"), Some("urn:inner"));
        ctx.pop_scope();
        assert_eq!(ctx.get_namespace("a"), Some("urn:outer"));
    }

    #[test]
    fn test_resolve_prefixed_name() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", XSD_NAMESPACE);

        let qname = ctx.resolve("xs:element", None).unwrap();
        assert_eq!(qname.namespace.as_deref(), Some(XSD_NAMESPACE));
        assert_eq!(qname.local_name, "element");

        assert!(ctx.resolve("nope:element", None).is_err());
    }

    #[test]
    fn test_resolve_unprefixed_uses_default_then_fallback() {
        let mut ctx = NamespaceContext::new();
        let q = ctx.resolve("Foo", Some("urn:tns")).unwrap();
        assert_eq!(q.namespace.as_deref(), Some("urn:tns"));

        ctx.add_prefix("", XSD_NAMESPACE);
        let q = ctx.resolve("string", Some("urn:tns")).unwrap();
        assert_eq!(q.namespace.as_deref(), Some(XSD_NAMESPACE));
    }

    #[test]
    fn test_prefix_for_prefers_named() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("", "urn:a");
        ctx.add_prefix("a", "urn:a");
        assert_eq!(ctx.prefix_for("urn:a"), Some("a"));
        assert_eq!(ctx.prefix_for("urn:missing"), None);
    }
}
