//! Lazy resolution of cross-references
//!
//! Declarations refer to each other by [`QName`]. A [`Resolver`] looks those
//! names up at use time: first in the schema it was created for, then among
//! the schemas cached in the registry, loading an imported schema on first
//! use. The same resolver answers the type-compatibility questions asked by
//! the encoder and the value questions asked by the instance parser.

use std::sync::Arc;

use url::Url;

use super::attributes::{Attribute, AttributeGroup, AttributeParticle, AttributeUse};
use super::builtins::BuiltinType;
use super::complex_types::{ComplexType, ContentKind, DerivationMethod};
use super::elements::Element;
use super::facets::check_facets;
use super::groups::{
    Compositor, ElementGrouping, ElementParticle, ElementTerm, Group, GroupRef, ModelType,
};
use super::schemas::Schema;
use super::simple_types::{SimpleType, SimpleVariety};
use super::types::{TypeDefinition, TypeRef};
use super::wildcards::AnyAttribute;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::namespaces::QName;
use crate::registry::{SchemaRegistry, SchemaSource};
use crate::value::{Record, Value};

/// A type after reference resolution
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedType {
    /// A built-in of the XML Schema namespace
    Builtin(BuiltinType),
    /// A user-defined simple type
    Simple(SimpleType),
    /// A complex type
    Complex(ComplexType),
}

impl ResolvedType {
    /// Qualified name, None for anonymous types
    pub fn qname(&self) -> Option<QName> {
        match self {
            ResolvedType::Builtin(b) => Some(b.qname()),
            ResolvedType::Simple(st) => st.qname(),
            ResolvedType::Complex(ct) => ct.qname(),
        }
    }

    /// True for complex types
    pub fn is_complex(&self) -> bool {
        matches!(self, ResolvedType::Complex(_))
    }

    fn into_type_ref(self) -> TypeRef {
        match self {
            ResolvedType::Builtin(b) => TypeRef::Named(b.qname()),
            ResolvedType::Simple(st) => TypeRef::inline_simple(st),
            ResolvedType::Complex(ct) => TypeRef::inline_complex(ct),
        }
    }
}

/// Effective attributes of a complex type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    /// Attribute declarations, references already resolved
    pub attributes: Vec<Attribute>,
    /// Attribute wildcard, if any
    pub any_attribute: Option<AnyAttribute>,
}

impl AttributeSet {
    /// Attribute by local name
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    fn insert(&mut self, attribute: Attribute) {
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }
}

/// Resolves names relative to one schema
pub struct Resolver<'a> {
    registry: &'a SchemaRegistry,
    schema: Arc<Schema>,
    limits: Limits,
}

impl<'a> Resolver<'a> {
    /// Create a resolver for a schema
    pub fn new(registry: &'a SchemaRegistry, schema: Arc<Schema>) -> Self {
        Self {
            registry,
            schema,
            limits: registry.limits(),
        }
    }

    /// Set the limits used to bound reference chains
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// The schema names are resolved relative to
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The backing registry
    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    /// Find the schema for a namespace, loading an import on first use
    pub fn find_schema(&self, namespace: &str) -> Option<Arc<Schema>> {
        if self.schema.target_namespace == namespace {
            return Some(self.schema.clone());
        }
        if let Some(schema) = self.registry.get(namespace) {
            return Some(schema);
        }

        let import = self
            .schema
            .import(namespace)
            .filter(|i| i.location.is_some())
            .cloned()
            .or_else(|| self.registry.find_import(namespace))?;
        let location = import.location?;
        let url = match Url::parse(&location) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(
                    namespace,
                    location = %location,
                    error = %e,
                    "invalid import location"
                );
                return None;
            }
        };
        match self.registry.resolve(namespace, SchemaSource::Uri(url)) {
            Ok(schema) => Some(schema),
            Err(e) => {
                tracing::warn!(
                    namespace,
                    location = %location,
                    error = %e,
                    "failed to load imported schema"
                );
                None
            }
        }
    }

    fn lookup<T>(
        &self,
        kind: &str,
        qname: &QName,
        get: impl Fn(&Schema, &str) -> Option<T>,
    ) -> Result<T> {
        self.find_schema(qname.namespace_str())
            .and_then(|schema| get(&schema, &qname.local_name))
            .ok_or_else(|| unresolved(kind, qname))
    }

    /// Global element by name
    pub fn global_element(&self, qname: &QName) -> Result<Element> {
        self.lookup("element", qname, |s, n| s.element(n).cloned())
    }

    /// Named model group by name
    pub fn group(&self, qname: &QName) -> Result<Group> {
        self.lookup("group", qname, |s, n| s.group(n).cloned())
    }

    /// Global attribute by name
    pub fn attribute(&self, qname: &QName) -> Result<Attribute> {
        self.lookup("attribute", qname, |s, n| s.attribute(n).cloned())
    }

    /// Named attribute group by name
    pub fn attribute_group(&self, qname: &QName) -> Result<AttributeGroup> {
        self.lookup("attributeGroup", qname, |s, n| s.attribute_group(n).cloned())
    }

    /// The content of a referenced model group
    pub fn group_content(&self, group_ref: &GroupRef) -> Result<Option<ElementGrouping>> {
        Ok(self.group(&group_ref.name)?.grouping)
    }

    /// The element a particle stands for
    pub fn particle_element(&self, particle: &ElementParticle) -> Result<Element> {
        match &particle.term {
            ElementTerm::Declared(element) => Ok(element.clone()),
            ElementTerm::Reference(qname) => self.global_element(qname),
        }
    }

    /// Resolve a type reference
    pub fn resolve_type(&self, type_ref: &TypeRef) -> Result<ResolvedType> {
        match type_ref {
            TypeRef::Named(qname) => self.named_type(qname),
            TypeRef::Inline(definition) => Ok(match definition.as_ref() {
                TypeDefinition::Simple(st) => ResolvedType::Simple(st.clone()),
                TypeDefinition::Complex(ct) => ResolvedType::Complex(ct.clone()),
            }),
        }
    }

    /// Resolve a type by name
    pub fn named_type(&self, qname: &QName) -> Result<ResolvedType> {
        if let Some(builtin) = BuiltinType::from_qname(qname) {
            return Ok(ResolvedType::Builtin(builtin));
        }
        match self.lookup("type", qname, |s, n| s.find_type(n))? {
            TypeDefinition::Simple(st) => Ok(ResolvedType::Simple(st)),
            TypeDefinition::Complex(ct) => Ok(ResolvedType::Complex(ct)),
        }
    }

    /// Type of an element; untyped elements take the type of their
    /// substitution group head, or `xs:anyType`
    pub fn element_type(&self, element: &Element) -> Result<ResolvedType> {
        self.element_type_at(element, 0)
    }

    fn element_type_at(&self, element: &Element, depth: usize) -> Result<ResolvedType> {
        self.limits.check_schema_depth(depth)?;
        match (&element.type_ref, &element.substitution_group) {
            (Some(type_ref), _) => self.resolve_type(type_ref),
            (None, Some(head)) => {
                let head = self.global_element(head)?;
                self.element_type_at(&head, depth + 1)
            }
            (None, None) => Ok(ResolvedType::Builtin(BuiltinType::AnyType)),
        }
    }

    /// Content model of a complex type including inherited content
    ///
    /// An extension's content is the base content followed by its own.
    pub fn effective_content(&self, complex_type: &ComplexType) -> Result<Option<ElementGrouping>> {
        self.content_at(complex_type, 0)
    }

    fn content_at(
        &self,
        complex_type: &ComplexType,
        depth: usize,
    ) -> Result<Option<ElementGrouping>> {
        self.limits.check_schema_depth(depth)?;
        let derivation = match &complex_type.derivation {
            Some(d)
                if d.content == ContentKind::Complex
                    && d.method == DerivationMethod::Extension =>
            {
                d
            }
            _ => return Ok(complex_type.content.clone()),
        };
        let inherited = match self.named_type(&derivation.base)? {
            ResolvedType::Complex(base) => self.content_at(&base, depth + 1)?,
            _ => None,
        };
        Ok(match (inherited, complex_type.content.clone()) {
            (Some(base), Some(own)) => Some(ElementGrouping::Compositor(
                Compositor::new(ModelType::Sequence)
                    .with_child(base)
                    .with_child(own),
            )),
            (base, own) => base.or(own),
        })
    }

    /// Attributes of a complex type including inherited ones; the type's
    /// own declarations replace inherited ones of the same name
    pub fn effective_attributes(&self, complex_type: &ComplexType) -> Result<AttributeSet> {
        self.attributes_at(complex_type, 0)
    }

    fn attributes_at(&self, complex_type: &ComplexType, depth: usize) -> Result<AttributeSet> {
        self.limits.check_schema_depth(depth)?;
        let mut set = AttributeSet::default();
        if let Some(derivation) = &complex_type.derivation {
            if let ResolvedType::Complex(base) = self.named_type(&derivation.base)? {
                set = self.attributes_at(&base, depth + 1)?;
            }
        }
        self.collect_attributes(&complex_type.attributes, &mut set, depth)?;
        if complex_type.any_attribute.is_some() {
            set.any_attribute = complex_type.any_attribute.clone();
        }
        Ok(set)
    }

    fn collect_attributes(
        &self,
        particles: &[AttributeParticle],
        set: &mut AttributeSet,
        depth: usize,
    ) -> Result<()> {
        for particle in particles {
            match particle {
                AttributeParticle::Attribute(attribute) => {
                    set.insert(self.use_attribute(attribute)?)
                }
                AttributeParticle::GroupRef(qname) => {
                    self.limits.check_schema_depth(depth + 1)?;
                    let group = self.attribute_group(qname)?;
                    self.collect_attributes(&group.attributes, set, depth + 1)?;
                    if set.any_attribute.is_none() {
                        set.any_attribute = group.any_attribute;
                    }
                }
            }
        }
        Ok(())
    }

    fn use_attribute(&self, attribute: &Attribute) -> Result<Attribute> {
        let qname = match &attribute.reference {
            Some(qname) => qname,
            None => return Ok(attribute.clone()),
        };
        let mut global = self.attribute(qname)?;
        global.use_ = attribute.use_;
        if attribute.value_constraint.is_some() {
            global.value_constraint = attribute.value_constraint.clone();
        }
        Ok(global)
    }

    /// Value type of a complex type with simple content
    pub fn simple_content_type(&self, complex_type: &ComplexType) -> Result<Option<ResolvedType>> {
        self.simple_content_at(complex_type, 0)
    }

    fn simple_content_at(
        &self,
        complex_type: &ComplexType,
        depth: usize,
    ) -> Result<Option<ResolvedType>> {
        self.limits.check_schema_depth(depth)?;
        let derivation = match &complex_type.derivation {
            Some(d) if d.content == ContentKind::Simple => d,
            _ => return Ok(None),
        };
        let base = match self.named_type(&derivation.base)? {
            ResolvedType::Complex(base) => match self.simple_content_at(&base, depth + 1)? {
                Some(t) => t,
                None => return Ok(None),
            },
            other => other,
        };
        if derivation.facets.is_empty() {
            return Ok(Some(base));
        }
        let mut restricted = SimpleType::restriction(None, None, base.into_type_ref());
        restricted.facets = derivation.facets.clone();
        Ok(Some(ResolvedType::Simple(restricted)))
    }

    /// Parse lexical text as a value of a simple type
    pub fn parse_simple(&self, simple_type: &ResolvedType, text: &str) -> Result<Value> {
        self.parse_at(simple_type, text, 0)
    }

    fn parse_at(&self, resolved: &ResolvedType, text: &str, depth: usize) -> Result<Value> {
        self.limits.check_schema_depth(depth)?;
        let st = match resolved {
            ResolvedType::Builtin(builtin) => return builtin.parse(text),
            ResolvedType::Simple(st) => st,
            ResolvedType::Complex(ct) => {
                return match self.simple_content_at(ct, depth + 1)? {
                    Some(content) => self.parse_at(&content, text, depth + 1),
                    None => Err(Error::Value(format!(
                        "complex type '{}' has no simple content",
                        display_name(resolved)
                    ))),
                }
            }
        };

        let normalized = match st.white_space() {
            Some(ws) => ws.normalize(text),
            None => text.to_string(),
        };
        let value = match &st.variety {
            SimpleVariety::Restriction(base) => {
                self.parse_at(&self.resolve_type(base)?, &normalized, depth + 1)?
            }
            SimpleVariety::List(item) => {
                let item = self.resolve_type(item)?;
                Value::List(
                    normalized
                        .split_whitespace()
                        .map(|token| self.parse_at(&item, token, depth + 1))
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            SimpleVariety::Union(members) => {
                let mut parsed = None;
                for member in members {
                    let member = self.resolve_type(member)?;
                    if let Ok(value) = self.parse_at(&member, &normalized, depth + 1) {
                        parsed = Some(value);
                        break;
                    }
                }
                parsed.ok_or_else(|| {
                    Error::Value(format!(
                        "'{}' matches no member of union '{}'",
                        normalized,
                        display_name(resolved)
                    ))
                })?
            }
        };

        if !st.facets.is_empty() {
            let lexical = self.variety_lexical(st, &value, depth)?;
            check_facets(&st.facets, &lexical, &value)?;
        }
        Ok(value)
    }

    /// True if a simple type can encode the value
    pub fn accepts_simple(&self, simple_type: &ResolvedType, value: &Value) -> Result<bool> {
        self.accepts_at(simple_type, value, 0)
    }

    fn accepts_at(&self, resolved: &ResolvedType, value: &Value, depth: usize) -> Result<bool> {
        self.limits.check_schema_depth(depth)?;
        let st = match resolved {
            ResolvedType::Builtin(builtin) => return Ok(builtin.accepts(value)),
            ResolvedType::Simple(st) => st,
            ResolvedType::Complex(_) => return Ok(false),
        };

        let accepted = match &st.variety {
            SimpleVariety::Restriction(base) => {
                self.accepts_at(&self.resolve_type(base)?, value, depth + 1)?
            }
            SimpleVariety::List(item) => match value {
                Value::List(items) => {
                    let item = self.resolve_type(item)?;
                    let mut all = true;
                    for v in items {
                        if !self.accepts_at(&item, v, depth + 1)? {
                            all = false;
                            break;
                        }
                    }
                    all
                }
                _ => false,
            },
            SimpleVariety::Union(members) => {
                let mut any = false;
                for member in members {
                    if self.accepts_at(&self.resolve_type(member)?, value, depth + 1)? {
                        any = true;
                        break;
                    }
                }
                any
            }
        };
        if !accepted || st.facets.is_empty() {
            return Ok(accepted);
        }
        let lexical = self.variety_lexical(st, value, depth)?;
        Ok(check_facets(&st.facets, &lexical, value).is_ok())
    }

    /// Render a value as lexical text of a simple type
    pub fn to_lexical(&self, simple_type: &ResolvedType, value: &Value) -> Result<String> {
        self.lexical_at(simple_type, value, 0)
    }

    fn lexical_at(&self, resolved: &ResolvedType, value: &Value, depth: usize) -> Result<String> {
        self.limits.check_schema_depth(depth)?;
        match resolved {
            ResolvedType::Builtin(builtin) => builtin.to_lexical(value),
            ResolvedType::Simple(st) => self.variety_lexical(st, value, depth),
            ResolvedType::Complex(ct) => match self.simple_content_at(ct, depth + 1)? {
                Some(content) => self.lexical_at(&content, value, depth + 1),
                None => Err(Error::Value(format!(
                    "complex type '{}' has no lexical form",
                    display_name(resolved)
                ))),
            },
        }
    }

    fn variety_lexical(&self, st: &SimpleType, value: &Value, depth: usize) -> Result<String> {
        match &st.variety {
            SimpleVariety::Restriction(base) => {
                self.lexical_at(&self.resolve_type(base)?, value, depth + 1)
            }
            SimpleVariety::List(item) => {
                let item = self.resolve_type(item)?;
                let items = match value {
                    Value::List(items) => items,
                    other => {
                        return Err(Error::Value(format!(
                            "list type cannot encode a {} value",
                            other.kind()
                        )))
                    }
                };
                Ok(items
                    .iter()
                    .map(|v| self.lexical_at(&item, v, depth + 1))
                    .collect::<Result<Vec<_>>>()?
                    .join(" "))
            }
            SimpleVariety::Union(members) => {
                for member in members {
                    let member = self.resolve_type(member)?;
                    if self.accepts_at(&member, value, depth + 1)? {
                        return self.lexical_at(&member, value, depth + 1);
                    }
                }
                Err(Error::Value(format!(
                    "no union member can encode a {} value",
                    value.kind()
                )))
            }
        }
    }

    /// True if the element can represent the value for encoding
    ///
    /// Resolution failures are logged and count as "cannot encode".
    pub fn element_accepts(&self, element: &Element, value: &Value) -> bool {
        match self.try_element_accepts(element, value) {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(element = %element.qname(), error = %e, "cannot check element type");
                false
            }
        }
    }

    /// Fallible form of [`Resolver::element_accepts`]
    pub fn try_element_accepts(&self, element: &Element, value: &Value) -> Result<bool> {
        if element.is_abstract {
            return Ok(false);
        }
        if value.is_null() {
            return Ok(element.nillable);
        }

        let resolved = self.element_type(element)?;
        let accepted = match (&resolved, value) {
            (ResolvedType::Complex(ct), Value::Record(record)) => {
                record.matches_name(element.namespace_str(), &element.name)
                    && record
                        .type_name
                        .as_ref()
                        .map_or(true, |t| ct.qname().as_ref() == Some(t))
                    && self.complex_accepts(ct, record)?
            }
            (ResolvedType::Builtin(BuiltinType::AnyType), Value::Record(record)) => {
                record.matches_name(element.namespace_str(), &element.name)
            }
            (ResolvedType::Complex(_), _) | (_, Value::Record(_)) => false,
            (simple, value) => self.accepts_simple(simple, value)?,
        };
        if !accepted {
            return Ok(false);
        }

        let fixed = match element.fixed_value() {
            Some(fixed) => fixed,
            None => return Ok(true),
        };
        match value {
            Value::Record(record) => Ok(match record.content.as_deref() {
                Some(content) => self
                    .to_lexical(&resolved, content)
                    .map_or(true, |lexical| lexical == fixed),
                None => true,
            }),
            other => Ok(self.to_lexical(&resolved, other)? == fixed),
        }
    }

    /// True if a complex type can encode the record
    ///
    /// Every attribute and field must be declared (unless a wildcard admits
    /// it), required attributes and required top-level children must be
    /// present and prohibited attributes absent.
    pub fn complex_accepts(&self, complex_type: &ComplexType, record: &Record) -> Result<bool> {
        let attributes = self.effective_attributes(complex_type)?;
        for (name, value) in &record.attributes {
            match attributes.get(name) {
                Some(a) if a.use_ == AttributeUse::Prohibited => return Ok(false),
                Some(a) => {
                    if let (Some(type_ref), false) = (&a.type_ref, value.is_null()) {
                        if !self.accepts_simple(&self.resolve_type(type_ref)?, value)? {
                            return Ok(false);
                        }
                    }
                }
                None if attributes.any_attribute.is_some() => {}
                None => return Ok(false),
            }
        }
        for a in &attributes.attributes {
            if a.use_ == AttributeUse::Required && !record.attributes.contains_key(&a.name) {
                return Ok(false);
            }
        }

        if let Some(content_type) = self.simple_content_type(complex_type)? {
            if !record.fields.is_empty() {
                return Ok(false);
            }
            return match record.content.as_deref() {
                Some(value) => self.accepts_simple(&content_type, value),
                None => Ok(false),
            };
        }

        let mixed = complex_type.mixed
            || complex_type
                .derivation
                .as_ref()
                .and_then(|d| d.mixed)
                .unwrap_or(false);
        if record.content.is_some() && !mixed {
            return Ok(false);
        }

        let content = match self.effective_content(complex_type)? {
            Some(content) => content,
            None => return Ok(record.fields.is_empty()),
        };
        let mut names = Vec::new();
        let wildcard = self.content_names(&content, &mut names, 0)?;
        if !wildcard && record.fields.keys().any(|k| !names.iter().any(|n| n == k)) {
            return Ok(false);
        }
        let mut required = Vec::new();
        self.required_names(&content, &mut required, 0)?;
        Ok(required.iter().all(|name| record.fields.contains_key(name)))
    }

    /// Collect local names of every element particle, following group
    /// references; returns true if a wildcard was seen
    pub fn content_names(
        &self,
        grouping: &ElementGrouping,
        names: &mut Vec<String>,
        depth: usize,
    ) -> Result<bool> {
        self.limits.check_schema_depth(depth)?;
        match grouping {
            ElementGrouping::Element(p) => {
                names.push(p.local_name().to_string());
                Ok(false)
            }
            ElementGrouping::Any(_) => Ok(true),
            ElementGrouping::Compositor(c) => {
                let mut wildcard = false;
                for child in &c.children {
                    wildcard |= self.content_names(child, names, depth + 1)?;
                }
                Ok(wildcard)
            }
            ElementGrouping::Group(r) => match self.group_content(r)? {
                Some(content) => self.content_names(&content, names, depth + 1),
                None => Ok(false),
            },
        }
    }

    fn required_names(
        &self,
        grouping: &ElementGrouping,
        names: &mut Vec<String>,
        depth: usize,
    ) -> Result<()> {
        self.limits.check_schema_depth(depth)?;
        match grouping {
            ElementGrouping::Element(p) if p.occurs.min > 0 => {
                names.push(p.local_name().to_string());
            }
            ElementGrouping::Compositor(c) if c.occurs.min > 0 && c.model != ModelType::Choice => {
                for child in &c.children {
                    self.required_names(child, names, depth + 1)?;
                }
            }
            ElementGrouping::Group(r) if r.occurs.min > 0 => {
                if let Some(content) = self.group_content(r)? {
                    self.required_names(&content, names, depth + 1)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn unresolved(kind: &str, qname: &QName) -> Error {
    Error::structural(format!("unresolved {} reference '{}'", kind, qname))
}

fn display_name(resolved: &ResolvedType) -> String {
    resolved
        .qname()
        .map(|q| q.to_string())
        .unwrap_or_else(|| "(anonymous)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::XSD_NAMESPACE;
    use crate::schema::complex_types::Derivation;
    use crate::schema::facets::{Facet, FacetKind};
    use crate::schema::particles::Occurs;

    fn xs(name: &str) -> QName {
        QName::namespaced(XSD_NAMESPACE, name)
    }

    fn sample_schema() -> Schema {
        let mut schema = Schema::new("urn:a");

        let small = SimpleType::restriction(Some("Small"), Some("urn:a"), TypeRef::named(xs("int")))
            .with_facet(Facet::new(FacetKind::MaxInclusive, "10"));
        schema.add_simple_type(small);

        let base = ComplexType::named("Base", Some("urn:a"))
            .with_content(ElementGrouping::Compositor(
                Compositor::new(ModelType::Sequence).with_child(ElementGrouping::Element(
                    ElementParticle::declared(
                        Element::new("id", None).with_type(TypeRef::named(xs("string"))),
                    ),
                )),
            ))
            .with_attribute(AttributeParticle::Attribute(
                Attribute::new("lang", None)
                    .with_type(TypeRef::named(xs("language")))
                    .with_use(AttributeUse::Required),
            ));
        schema.add_complex_type(base);

        let mut derived = ComplexType::named("Derived", Some("urn:a")).with_content(
            ElementGrouping::Compositor(
                Compositor::new(ModelType::Sequence).with_child(ElementGrouping::Element(
                    ElementParticle::declared(
                        Element::new("size", None)
                            .with_type(TypeRef::named(QName::namespaced("urn:a", "Small"))),
                    )
                    .with_occurs(Occurs::optional()),
                )),
            ),
        );
        derived.derivation = Some(Derivation {
            content: ContentKind::Complex,
            method: DerivationMethod::Extension,
            base: QName::namespaced("urn:a", "Base"),
            facets: Vec::new(),
            mixed: None,
        });
        schema.add_complex_type(derived);

        schema.add_element(
            Element::new("Item", Some("urn:a"))
                .with_type(TypeRef::named(QName::namespaced("urn:a", "Derived"))),
        );
        schema
    }

    #[test]
    fn test_restriction_facets_apply() {
        let registry = SchemaRegistry::new();
        let schema = registry.register("urn:a", sample_schema());
        let resolver = Resolver::new(&registry, schema);

        let small = resolver
            .named_type(&QName::namespaced("urn:a", "Small"))
            .unwrap();
        assert_eq!(resolver.parse_simple(&small, " 7 ").unwrap(), Value::Integer(7));
        assert!(resolver.parse_simple(&small, "11").is_err());
        assert!(resolver.accepts_simple(&small, &Value::Integer(10)).unwrap());
        assert!(!resolver.accepts_simple(&small, &Value::Integer(11)).unwrap());
    }

    #[test]
    fn test_extension_content_and_attributes() {
        let registry = SchemaRegistry::new();
        let schema = registry.register("urn:a", sample_schema());
        let resolver = Resolver::new(&registry, schema.clone());

        let derived = schema.complex_type("Derived").unwrap();
        let content = resolver.effective_content(derived).unwrap().unwrap();
        let names: Vec<_> = content
            .element_particles()
            .iter()
            .map(|p| p.local_name().to_string())
            .collect();
        assert_eq!(names, vec!["id", "size"]);

        let attributes = resolver.effective_attributes(derived).unwrap();
        assert!(attributes.get("lang").is_some());
    }

    #[test]
    fn test_element_accepts_records() {
        let registry = SchemaRegistry::new();
        let schema = registry.register("urn:a", sample_schema());
        let resolver = Resolver::new(&registry, schema.clone());
        let item = schema.element("Item").unwrap();

        let ok = Record::new().with_attribute("lang", "en").with_field("id", "x");
        assert!(resolver.element_accepts(item, &Value::Record(ok)));

        let missing_attribute = Record::new().with_field("id", "x");
        assert!(!resolver.element_accepts(item, &Value::Record(missing_attribute)));

        let unknown_field = Record::new()
            .with_attribute("lang", "en")
            .with_field("id", "x")
            .with_field("colour", "red");
        assert!(!resolver.element_accepts(item, &Value::Record(unknown_field)));

        let wrong_name = Record::named(QName::namespaced("urn:a", "Other"))
            .with_attribute("lang", "en")
            .with_field("id", "x");
        assert!(!resolver.element_accepts(item, &Value::Record(wrong_name)));

        assert!(!resolver.element_accepts(item, &Value::Null));
    }

    #[test]
    fn test_unresolved_reference_is_structural() {
        let registry = SchemaRegistry::new();
        let schema = registry.register("urn:a", Schema::new("urn:a"));
        let resolver = Resolver::new(&registry, schema);
        let err = resolver
            .named_type(&QName::namespaced("urn:missing", "T"))
            .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_fixed_value_must_match() {
        let registry = SchemaRegistry::new();
        let schema = registry.register("urn:a", Schema::new("urn:a"));
        let resolver = Resolver::new(&registry, schema);
        let mut element =
            Element::new("Version", Some("urn:a")).with_type(TypeRef::named(xs("string")));
        let fixed = crate::schema::elements::ValueConstraint::Fixed("1.0".into());
        element.value_constraint = Some(fixed);

        assert!(resolver.element_accepts(&element, &Value::from("1.0")));
        assert!(!resolver.element_accepts(&element, &Value::from("2.0")));
    }
}
