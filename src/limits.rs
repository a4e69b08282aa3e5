//! Resource limits
//!
//! Both parsers, the loader and the reference resolver consult one
//! [`Limits`] value so that hostile or cyclic input fails with
//! [`Error::LimitExceeded`] instead of exhausting the stack or memory.

use std::fmt;

use crate::error::{Error, Result};

/// Quantity a limit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    /// Element nesting in a document
    XmlDepth,
    /// Size of a loaded document in bytes
    XmlSize,
    /// Attributes on one element
    Attributes,
    /// Namespace declarations in scope
    Namespaces,
    /// Chained type derivations, group references and includes
    SchemaDepth,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LimitKind::XmlDepth => "element depth",
            LimitKind::XmlSize => "document size",
            LimitKind::Attributes => "attribute count",
            LimitKind::Namespaces => "namespace declarations",
            LimitKind::SchemaDepth => "schema reference depth",
        })
    }
}

/// Limits applied while loading, parsing, resolving and encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum element nesting depth
    pub max_xml_depth: usize,
    /// Maximum document size in bytes
    pub max_xml_size: usize,
    /// Maximum attributes per element
    pub max_attributes: usize,
    /// Maximum namespace declarations in scope
    pub max_namespaces: usize,
    /// Maximum chain of derivations, group references or includes
    pub max_schema_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 1000,
            max_xml_size: 100 << 20,
            max_attributes: 1000,
            max_namespaces: 1000,
            max_schema_depth: 100,
        }
    }
}

impl Limits {
    /// Default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Tighter limits for untrusted input
    pub fn strict() -> Self {
        Self {
            max_xml_depth: 100,
            max_xml_size: 10 << 20,
            max_attributes: 100,
            max_namespaces: 100,
            max_schema_depth: 20,
        }
    }

    /// Looser limits for large trusted documents
    pub fn permissive() -> Self {
        Self {
            max_xml_depth: 10_000,
            max_xml_size: 1 << 30,
            max_attributes: 10_000,
            max_namespaces: 10_000,
            max_schema_depth: 1000,
        }
    }

    /// Set the maximum element depth
    pub fn with_max_xml_depth(mut self, depth: usize) -> Self {
        self.max_xml_depth = depth;
        self
    }

    /// Set the maximum schema reference depth
    pub fn with_max_schema_depth(mut self, depth: usize) -> Self {
        self.max_schema_depth = depth;
        self
    }

    /// Configured maximum for a kind of limit
    pub fn max(&self, kind: LimitKind) -> usize {
        match kind {
            LimitKind::XmlDepth => self.max_xml_depth,
            LimitKind::XmlSize => self.max_xml_size,
            LimitKind::Attributes => self.max_attributes,
            LimitKind::Namespaces => self.max_namespaces,
            LimitKind::SchemaDepth => self.max_schema_depth,
        }
    }

    /// Fail if `value` is above the maximum for `kind`
    pub fn check(&self, kind: LimitKind, value: usize) -> Result<()> {
        let max = self.max(kind);
        if value > max {
            return Err(Error::LimitExceeded(format!("{} {} exceeds maximum {}", kind, value, max)));
        }
        Ok(())
    }

    /// Element nesting depth
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        self.check(LimitKind::XmlDepth, depth)
    }

    /// Document size in bytes
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        self.check(LimitKind::XmlSize, size)
    }

    /// Attributes on one element
    pub fn check_attributes(&self, count: usize) -> Result<()> {
        self.check(LimitKind::Attributes, count)
    }

    /// Namespace declarations in scope
    pub fn check_namespaces(&self, count: usize) -> Result<()> {
        self.check(LimitKind::Namespaces, count)
    }

    /// Reference chain depth
    pub fn check_schema_depth(&self, depth: usize) -> Result<()> {
        self.check(LimitKind::SchemaDepth, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_ordered() {
        let (strict, default, permissive) =
            (Limits::strict(), Limits::default(), Limits::permissive());
        for kind in [
            LimitKind::XmlDepth,
            LimitKind::XmlSize,
            LimitKind::Attributes,
            LimitKind::Namespaces,
            LimitKind::SchemaDepth,
        ] {
            assert!(strict.max(kind) < default.max(kind));
            assert!(default.max(kind) < permissive.max(kind));
        }
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let limits = Limits::new().with_max_xml_depth(3);
        assert!(limits.check_xml_depth(3).is_ok());
        assert!(limits.check_xml_depth(4).is_err());
    }

    #[test]
    fn test_error_names_the_limit() {
        let err = Limits::strict().check_schema_depth(21).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
        assert!(err.to_string().contains("schema reference depth 21"));
    }

    #[test]
    fn test_check_xml_size() {
        let limits = Limits::default();
        assert!(limits.check_xml_size(1024).is_ok());
        assert!(limits.check_xml_size(200 << 20).is_err());
    }
}
