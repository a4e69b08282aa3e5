//! Content-model groupings
//!
//! [`ElementGrouping`] is the tagged union describing element ordering:
//! `sequence`, `choice`, `all`, a named-group reference, an `any` wildcard or
//! a leaf element particle.

use std::fmt;

use super::elements::Element;
use super::particles::Occurs;
use super::wildcards::AnyWildcard;
use crate::error::{Error, Result};
use crate::namespaces::QName;

/// Kind of compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    /// Ordered children
    Sequence,
    /// Exactly one child
    Choice,
    /// Unordered children, each at most once
    All,
}

impl ModelType {
    /// Local name of the schema element
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Sequence => "sequence",
            ModelType::Choice => "choice",
            ModelType::All => "all",
        }
    }

    /// Parse from a schema element local name
    pub fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "sequence" => Some(ModelType::Sequence),
            "choice" => Some(ModelType::Choice),
            "all" => Some(ModelType::All),
            _ => None,
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `sequence`, `choice` or `all` node
#[derive(Debug, Clone, PartialEq)]
pub struct Compositor {
    /// Which compositor
    pub model: ModelType,
    /// Occurrence bounds
    pub occurs: Occurs,
    /// Children, in declaration order
    pub children: Vec<ElementGrouping>,
    /// `id`
    pub id: Option<String>,
}

impl Compositor {
    /// Create an empty compositor occurring once
    pub fn new(model: ModelType) -> Self {
        Self {
            model,
            occurs: Occurs::once(),
            children: Vec::new(),
            id: None,
        }
    }

    /// Add a child
    pub fn with_child(mut self, child: ElementGrouping) -> Self {
        self.children.push(child);
        self
    }
}

/// The element term of a leaf particle
#[derive(Debug, Clone, PartialEq)]
pub enum ElementTerm {
    /// Declared inline (local element)
    Declared(Element),
    /// `ref` to a global element, possibly in another namespace
    Reference(QName),
}

/// A leaf element particle
#[derive(Debug, Clone, PartialEq)]
pub struct ElementParticle {
    /// The element or reference
    pub term: ElementTerm,
    /// Occurrence bounds
    pub occurs: Occurs,
}

impl ElementParticle {
    /// Inline element occurring once
    pub fn declared(element: Element) -> Self {
        Self {
            term: ElementTerm::Declared(element),
            occurs: Occurs::once(),
        }
    }

    /// Reference to a global element occurring once
    pub fn reference(name: QName) -> Self {
        Self {
            term: ElementTerm::Reference(name),
            occurs: Occurs::once(),
        }
    }

    /// Set occurrence bounds
    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// Name and namespace the particle matches in instances
    pub fn qname(&self) -> QName {
        match &self.term {
            ElementTerm::Declared(e) => e.qname(),
            ElementTerm::Reference(q) => q.clone(),
        }
    }

    /// Local name the particle matches
    pub fn local_name(&self) -> &str {
        match &self.term {
            ElementTerm::Declared(e) => &e.name,
            ElementTerm::Reference(q) => &q.local_name,
        }
    }
}

/// Reference to a named model group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRef {
    /// Referenced group
    pub name: QName,
    /// Occurrence bounds
    pub occurs: Occurs,
}

/// Grouping node of a content model
#[derive(Debug, Clone, PartialEq)]
pub enum ElementGrouping {
    /// `sequence`, `choice` or `all`
    Compositor(Compositor),
    /// `group ref=...`
    Group(GroupRef),
    /// `any`
    Any(AnyWildcard),
    /// `element`
    Element(ElementParticle),
}

impl ElementGrouping {
    /// Occurrence bounds of this node
    pub fn occurs(&self) -> Occurs {
        match self {
            ElementGrouping::Compositor(c) => c.occurs,
            ElementGrouping::Group(g) => g.occurs,
            ElementGrouping::Any(a) => a.occurs,
            ElementGrouping::Element(e) => e.occurs,
        }
    }

    /// Short kind name, used in messages and by the schema writer
    pub fn kind(&self) -> &'static str {
        match self {
            ElementGrouping::Compositor(c) => c.model.as_str(),
            ElementGrouping::Group(_) => "group",
            ElementGrouping::Any(_) => "any",
            ElementGrouping::Element(_) => "element",
        }
    }

    /// Check structural invariants of a fully parsed node
    ///
    /// Compositors must have at least one child; `all` may only hold element
    /// particles that occur at most once.
    pub fn check(&self) -> Result<()> {
        if let ElementGrouping::Compositor(c) = self {
            if c.children.is_empty() {
                return Err(Error::structural(format!("empty {}", c.model)));
            }
            if c.model == ModelType::All {
                for child in &c.children {
                    match child {
                        ElementGrouping::Element(p) if p.occurs.max.map_or(false, |m| m <= 1) => {}
                        other => {
                            return Err(Error::structural(format!(
                                "'all' may only contain elements occurring at most once, found {}",
                                other.kind()
                            )))
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Visit every leaf element particle reachable without following group
    /// references
    pub fn element_particles(&self) -> Vec<&ElementParticle> {
        let mut out = Vec::new();
        self.collect_particles(&mut out);
        out
    }

    fn collect_particles<'a>(&'a self, out: &mut Vec<&'a ElementParticle>) {
        match self {
            ElementGrouping::Compositor(c) => {
                for child in &c.children {
                    child.collect_particles(out);
                }
            }
            ElementGrouping::Element(p) => out.push(p),
            ElementGrouping::Group(_) | ElementGrouping::Any(_) => {}
        }
    }

    /// True if a wildcard appears anywhere in this node (not following
    /// group references)
    pub fn has_wildcard(&self) -> bool {
        match self {
            ElementGrouping::Compositor(c) => c.children.iter().any(|c| c.has_wildcard()),
            ElementGrouping::Any(_) => true,
            _ => false,
        }
    }
}

/// A named model group (`group name=...`)
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Name
    pub name: String,
    /// Namespace
    pub namespace: Option<String>,
    /// The single compositor of the group
    pub grouping: Option<ElementGrouping>,
    /// `id`
    pub id: Option<String>,
}

impl Group {
    /// Create an empty group
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            grouping: None,
            id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> ElementGrouping {
        ElementGrouping::Element(ElementParticle::declared(Element::new(name, Some("urn:a"))))
    }

    #[test]
    fn test_empty_compositor_rejected() {
        let seq = ElementGrouping::Compositor(Compositor::new(ModelType::Sequence));
        assert!(seq.check().is_err());
    }

    #[test]
    fn test_all_rejects_repeating_children() {
        let ok = ElementGrouping::Compositor(Compositor::new(ModelType::All).with_child(leaf("a")));
        assert!(ok.check().is_ok());

        let repeating = ElementGrouping::Element(
            ElementParticle::declared(Element::new("b", None)).with_occurs(Occurs::zero_or_more()),
        );
        let bad =
            ElementGrouping::Compositor(Compositor::new(ModelType::All).with_child(repeating));
        assert!(bad.check().is_err());
    }

    #[test]
    fn test_element_particles_walks_nested_compositors() {
        let inner = Compositor::new(ModelType::Choice)
            .with_child(leaf("b"))
            .with_child(leaf("c"));
        let outer = ElementGrouping::Compositor(
            Compositor::new(ModelType::Sequence)
                .with_child(leaf("a"))
                .with_child(ElementGrouping::Compositor(inner))
                .with_child(ElementGrouping::Any(AnyWildcard::new())),
        );
        let names: Vec<_> = outer.element_particles().iter().map(|p| p.local_name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(outer.has_wildcard());
    }
}
