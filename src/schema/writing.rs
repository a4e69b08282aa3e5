//! Re-emitting a schema model as an XSD document
//!
//! The XML Schema namespace is the default namespace of the output and the
//! target namespace gets the schema's own prefix. A schema without a target
//! namespace keeps its unprefixed names for its own declarations, so the
//! XML Schema namespace is bound to `xs` instead.

use std::io::Write;

use indexmap::{IndexMap, IndexSet};

use super::attributes::{Attribute, AttributeGroup, AttributeParticle, AttributeUse};
use super::complex_types::{ComplexType, ContentKind, DerivationMethod};
use super::elements::{Element, ValueConstraint};
use super::facets::Facet;
use super::groups::{ElementGrouping, ElementParticle, ElementTerm, Group};
use super::parsing::{xsd_attrs as attr, xsd_elements as elem};
use super::particles::Occurs;
use super::schemas::{DerivationSet, Schema};
use super::simple_types::{SimpleType, SimpleVariety};
use super::types::{TypeDefinition, TypeRef};
use super::wildcards::{AnyAttribute, AnyWildcard, ProcessContents};
use crate::encoder::printer::Printer;
use crate::error::Result;
use crate::namespaces::{QName, XML_NAMESPACE, XSD_NAMESPACE};

/// Writes one [`Schema`] as an XSD document
pub struct SchemaWriter<'a> {
    schema: &'a Schema,
    encoding: String,
    indent: Option<usize>,
    prefixes: IndexMap<String, String>,
}

impl<'a> SchemaWriter<'a> {
    /// Create a writer for a schema
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            encoding: "UTF-8".to_string(),
            indent: Some(2),
            prefixes: assign_prefixes(schema),
        }
    }

    /// Character encoding named in the XML declaration
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Indentation width; None writes everything on one line
    pub fn with_indent(mut self, indent: Option<usize>) -> Self {
        self.indent = indent;
        self
    }

    /// Prefix bound to each namespace in the output (empty for default)
    pub fn prefixes(&self) -> &IndexMap<String, String> {
        &self.prefixes
    }

    /// Write the document to a sink and return it
    pub fn write<W: Write>(&self, out: W) -> Result<W> {
        let mut p = Printer::new(out, self.indent);
        p.declaration(&self.encoding)?;
        self.write_to(&mut p)?;
        p.finish()
    }

    /// Write the document into a string
    pub fn write_string(&self) -> Result<String> {
        let bytes = self.write(Vec::new())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Write the `schema` element and everything inside it
    pub fn write_to<W: Write>(&self, p: &mut Printer<W>) -> Result<()> {
        let schema = self.schema;
        p.start(&self.xs(elem::SCHEMA))?;
        for (namespace, prefix) in &self.prefixes {
            if prefix.is_empty() {
                p.attribute("xmlns", namespace)?;
            } else {
                p.attribute(&format!("xmlns:{}", prefix), namespace)?;
            }
        }
        if !schema.target_namespace.is_empty() {
            p.attribute(attr::TARGET_NAMESPACE, &schema.target_namespace)?;
        }
        if schema.element_form_default {
            p.attribute(attr::ELEMENT_FORM_DEFAULT, "qualified")?;
        }
        if schema.attribute_form_default {
            p.attribute(attr::ATTRIBUTE_FORM_DEFAULT, "qualified")?;
        }
        derivation_attribute(p, attr::BLOCK_DEFAULT, schema.block_default, DerivationSet::EMPTY)?;
        derivation_attribute(p, attr::FINAL_DEFAULT, schema.final_default, DerivationSet::EMPTY)?;
        optional_attribute(p, attr::VERSION, schema.version.as_deref())?;
        optional_attribute(p, attr::ID, schema.id.as_deref())?;

        for import in schema.imports.values() {
            p.start(&self.xs(elem::IMPORT))?;
            if !import.namespace.is_empty() {
                p.attribute(attr::NAMESPACE, &import.namespace)?;
            }
            optional_attribute(p, attr::SCHEMA_LOCATION, import.location.as_deref())?;
            p.end()?;
        }
        for element in schema.elements.values() {
            self.write_element(p, element, None, true)?;
        }
        for complex_type in schema.complex_types.values() {
            self.write_complex_type(p, complex_type)?;
        }
        for simple_type in schema.simple_types.values() {
            self.write_simple_type(p, simple_type)?;
        }
        for group in schema.groups.values() {
            self.write_group(p, group)?;
        }
        for attribute in schema.attributes.values() {
            self.write_attribute(p, attribute, true)?;
        }
        for group in schema.attribute_groups.values() {
            self.write_attribute_group(p, group)?;
        }
        p.end()
    }

    fn xs(&self, local_name: &str) -> String {
        self.prefixed(XSD_NAMESPACE, local_name)
    }

    fn prefixed(&self, namespace: &str, local_name: &str) -> String {
        match self.prefixes.get(namespace).map(String::as_str) {
            None | Some("") => local_name.to_string(),
            Some(prefix) => format!("{}:{}", prefix, local_name),
        }
    }

    fn qname(&self, name: &QName) -> String {
        self.prefixed(name.namespace_str(), &name.local_name)
    }

    /// True if a local declaration is identical to a global one of this schema
    fn is_global_element(&self, element: &Element) -> bool {
        element.namespace_str() == self.schema.target_namespace
            && self.schema.element(&element.name) == Some(element)
    }

    fn write_element<W: Write>(
        &self,
        p: &mut Printer<W>,
        element: &Element,
        occurs: Option<Occurs>,
        top_level: bool,
    ) -> Result<()> {
        p.start(&self.xs(elem::ELEMENT))?;
        if !top_level && self.is_global_element(element) {
            p.attribute(attr::REF, &self.qname(&element.qname()))?;
            occurs_attributes(p, occurs)?;
            return p.end();
        }

        p.attribute(attr::NAME, &element.name)?;
        if !top_level {
            let qualified = element.namespace.is_some();
            if qualified != self.schema.element_form_default {
                p.attribute(attr::FORM, if qualified { "qualified" } else { "unqualified" })?;
            }
        }
        if let Some(TypeRef::Named(name)) = &element.type_ref {
            p.attribute(attr::TYPE, &self.qname(name))?;
        }
        occurs_attributes(p, occurs)?;
        if element.nillable {
            p.attribute(attr::NILLABLE, "true")?;
        }
        if element.is_abstract {
            p.attribute(attr::ABSTRACT, "true")?;
        }
        value_constraint_attribute(p, element.value_constraint.as_ref())?;
        if let Some(ref head) = element.substitution_group {
            p.attribute(attr::SUBSTITUTION_GROUP, &self.qname(head))?;
        }
        derivation_attribute(p, attr::BLOCK, element.block, self.schema.block_default)?;
        derivation_attribute(p, attr::FINAL, element.final_set, self.schema.final_default)?;
        optional_attribute(p, attr::ID, element.id.as_deref())?;

        if let Some(TypeRef::Inline(definition)) = &element.type_ref {
            self.write_inline_type(p, definition)?;
        }
        p.end()
    }

    fn write_inline_type<W: Write>(
        &self,
        p: &mut Printer<W>,
        definition: &TypeDefinition,
    ) -> Result<()> {
        match definition {
            TypeDefinition::Complex(ct) => self.write_complex_type(p, ct),
            TypeDefinition::Simple(st) => self.write_simple_type(p, st),
        }
    }

    fn write_complex_type<W: Write>(&self, p: &mut Printer<W>, ct: &ComplexType) -> Result<()> {
        p.start(&self.xs(elem::COMPLEX_TYPE))?;
        optional_attribute(p, attr::NAME, ct.name.as_deref())?;
        let content_mixed = ct.derivation.as_ref().and_then(|d| d.mixed);
        if ct.mixed && content_mixed.is_none() {
            p.attribute(attr::MIXED, "true")?;
        }
        if ct.is_abstract {
            p.attribute(attr::ABSTRACT, "true")?;
        }
        derivation_attribute(p, attr::BLOCK, ct.block, self.schema.block_default)?;
        derivation_attribute(p, attr::FINAL, ct.final_set, self.schema.final_default)?;
        optional_attribute(p, attr::ID, ct.id.as_deref())?;

        match &ct.derivation {
            Some(derivation) => {
                let content = match derivation.content {
                    ContentKind::Simple => elem::SIMPLE_CONTENT,
                    ContentKind::Complex => elem::COMPLEX_CONTENT,
                };
                p.start(&self.xs(content))?;
                if let Some(mixed) = content_mixed {
                    p.attribute(attr::MIXED, if mixed { "true" } else { "false" })?;
                }
                let method = match derivation.method {
                    DerivationMethod::Extension => elem::EXTENSION,
                    DerivationMethod::Restriction => elem::RESTRICTION,
                };
                p.start(&self.xs(method))?;
                p.attribute(attr::BASE, &self.qname(&derivation.base))?;
                if let Some(ref grouping) = ct.content {
                    self.write_grouping(p, grouping)?;
                }
                for facet in &derivation.facets {
                    self.write_facet(p, facet)?;
                }
                self.write_attribute_uses(p, &ct.attributes, ct.any_attribute.as_ref())?;
                p.end()?;
                p.end()?;
            }
            None => {
                if let Some(ref grouping) = ct.content {
                    self.write_grouping(p, grouping)?;
                }
                self.write_attribute_uses(p, &ct.attributes, ct.any_attribute.as_ref())?;
            }
        }
        p.end()
    }

    fn write_grouping<W: Write>(
        &self,
        p: &mut Printer<W>,
        grouping: &ElementGrouping,
    ) -> Result<()> {
        match grouping {
            ElementGrouping::Compositor(c) => {
                p.start(&self.xs(c.model.as_str()))?;
                occurs_attributes(p, Some(c.occurs))?;
                optional_attribute(p, attr::ID, c.id.as_deref())?;
                for child in &c.children {
                    self.write_grouping(p, child)?;
                }
                p.end()
            }
            ElementGrouping::Group(reference) => {
                p.start(&self.xs(elem::GROUP))?;
                p.attribute(attr::REF, &self.qname(&reference.name))?;
                occurs_attributes(p, Some(reference.occurs))?;
                p.end()
            }
            ElementGrouping::Any(any) => self.write_any(p, any),
            ElementGrouping::Element(particle) => self.write_particle(p, particle),
        }
    }

    fn write_particle<W: Write>(
        &self,
        p: &mut Printer<W>,
        particle: &ElementParticle,
    ) -> Result<()> {
        match &particle.term {
            ElementTerm::Declared(element) => {
                self.write_element(p, element, Some(particle.occurs), false)
            }
            ElementTerm::Reference(name) => {
                p.start(&self.xs(elem::ELEMENT))?;
                p.attribute(attr::REF, &self.qname(name))?;
                occurs_attributes(p, Some(particle.occurs))?;
                p.end()
            }
        }
    }

    fn write_any<W: Write>(&self, p: &mut Printer<W>, any: &AnyWildcard) -> Result<()> {
        p.start(&self.xs(elem::ANY))?;
        let namespace = any.namespace.to_attribute(&self.schema.target_namespace);
        optional_attribute(p, attr::NAMESPACE, namespace.as_deref())?;
        if any.process_contents != ProcessContents::Strict {
            p.attribute(attr::PROCESS_CONTENTS, &any.process_contents.to_string())?;
        }
        occurs_attributes(p, Some(any.occurs))?;
        optional_attribute(p, attr::ID, any.id.as_deref())?;
        p.end()
    }

    fn write_any_attribute<W: Write>(&self, p: &mut Printer<W>, any: &AnyAttribute) -> Result<()> {
        p.start(&self.xs(elem::ANY_ATTRIBUTE))?;
        let namespace = any.namespace.to_attribute(&self.schema.target_namespace);
        optional_attribute(p, attr::NAMESPACE, namespace.as_deref())?;
        if any.process_contents != ProcessContents::Strict {
            p.attribute(attr::PROCESS_CONTENTS, &any.process_contents.to_string())?;
        }
        optional_attribute(p, attr::ID, any.id.as_deref())?;
        p.end()
    }

    fn write_attribute_uses<W: Write>(
        &self,
        p: &mut Printer<W>,
        particles: &[AttributeParticle],
        any_attribute: Option<&AnyAttribute>,
    ) -> Result<()> {
        for particle in particles {
            match particle {
                AttributeParticle::Attribute(a) => self.write_attribute(p, a, false)?,
                AttributeParticle::GroupRef(name) => {
                    p.start(&self.xs(elem::ATTRIBUTE_GROUP))?;
                    p.attribute(attr::REF, &self.qname(name))?;
                    p.end()?;
                }
            }
        }
        if let Some(any) = any_attribute {
            self.write_any_attribute(p, any)?;
        }
        Ok(())
    }

    fn write_attribute<W: Write>(
        &self,
        p: &mut Printer<W>,
        a: &Attribute,
        top_level: bool,
    ) -> Result<()> {
        p.start(&self.xs(elem::ATTRIBUTE))?;
        match &a.reference {
            Some(reference) => p.attribute(attr::REF, &self.qname(reference))?,
            None => {
                p.attribute(attr::NAME, &a.name)?;
                if !top_level {
                    let qualified = a.namespace.is_some();
                    if qualified != self.schema.attribute_form_default {
                        let form = if qualified { "qualified" } else { "unqualified" };
                        p.attribute(attr::FORM, form)?;
                    }
                }
                if let Some(TypeRef::Named(name)) = &a.type_ref {
                    p.attribute(attr::TYPE, &self.qname(name))?;
                }
            }
        }
        if a.use_ != AttributeUse::Optional {
            p.attribute(attr::USE, a.use_.as_str())?;
        }
        value_constraint_attribute(p, a.value_constraint.as_ref())?;
        optional_attribute(p, attr::ID, a.id.as_deref())?;
        if a.reference.is_none() {
            if let Some(TypeRef::Inline(definition)) = &a.type_ref {
                self.write_inline_type(p, definition)?;
            }
        }
        p.end()
    }

    fn write_attribute_group<W: Write>(
        &self,
        p: &mut Printer<W>,
        group: &AttributeGroup,
    ) -> Result<()> {
        p.start(&self.xs(elem::ATTRIBUTE_GROUP))?;
        p.attribute(attr::NAME, &group.name)?;
        optional_attribute(p, attr::ID, group.id.as_deref())?;
        self.write_attribute_uses(p, &group.attributes, group.any_attribute.as_ref())?;
        p.end()
    }

    fn write_group<W: Write>(&self, p: &mut Printer<W>, group: &Group) -> Result<()> {
        p.start(&self.xs(elem::GROUP))?;
        p.attribute(attr::NAME, &group.name)?;
        optional_attribute(p, attr::ID, group.id.as_deref())?;
        if let Some(ref grouping) = group.grouping {
            self.write_grouping(p, grouping)?;
        }
        p.end()
    }

    fn write_simple_type<W: Write>(&self, p: &mut Printer<W>, st: &SimpleType) -> Result<()> {
        p.start(&self.xs(elem::SIMPLE_TYPE))?;
        optional_attribute(p, attr::NAME, st.name.as_deref())?;
        derivation_attribute(p, attr::FINAL, st.final_set, self.schema.final_default)?;
        optional_attribute(p, attr::ID, st.id.as_deref())?;

        match &st.variety {
            SimpleVariety::Restriction(base) => {
                p.start(&self.xs(elem::RESTRICTION))?;
                match base {
                    TypeRef::Named(name) => p.attribute(attr::BASE, &self.qname(name))?,
                    TypeRef::Inline(definition) => self.write_inline_type(p, definition)?,
                }
                for facet in &st.facets {
                    self.write_facet(p, facet)?;
                }
                p.end()?;
            }
            SimpleVariety::List(item) => {
                p.start(&self.xs(elem::LIST))?;
                match item {
                    TypeRef::Named(name) => p.attribute(attr::ITEM_TYPE, &self.qname(name))?,
                    TypeRef::Inline(definition) => self.write_inline_type(p, definition)?,
                }
                p.end()?;
            }
            SimpleVariety::Union(members) => {
                p.start(&self.xs(elem::UNION))?;
                let named: Vec<String> = members
                    .iter()
                    .filter_map(|m| m.qname())
                    .map(|q| self.qname(q))
                    .collect();
                if !named.is_empty() {
                    p.attribute(attr::MEMBER_TYPES, &named.join(" "))?;
                }
                for member in members {
                    if let TypeRef::Inline(definition) = member {
                        self.write_inline_type(p, definition)?;
                    }
                }
                p.end()?;
            }
        }
        p.end()
    }

    fn write_facet<W: Write>(&self, p: &mut Printer<W>, facet: &Facet) -> Result<()> {
        p.start(&self.xs(facet.kind.as_str()))?;
        p.attribute(attr::VALUE, &facet.value)?;
        if facet.fixed {
            p.attribute(attr::FIXED, "true")?;
        }
        p.end()
    }
}

/// Write a schema into a string with default settings
pub fn schema_to_string(schema: &Schema) -> Result<String> {
    SchemaWriter::new(schema).write_string()
}

fn optional_attribute<W: Write>(p: &mut Printer<W>, name: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(v) => p.attribute(name, v),
        None => Ok(()),
    }
}

/// Write `set` unless parsing would fold the same value in from `default`
fn derivation_attribute<W: Write>(
    p: &mut Printer<W>,
    name: &str,
    set: DerivationSet,
    default: DerivationSet,
) -> Result<()> {
    if set == default {
        return Ok(());
    }
    p.attribute(name, &set.to_string())
}

fn value_constraint_attribute<W: Write>(
    p: &mut Printer<W>,
    constraint: Option<&ValueConstraint>,
) -> Result<()> {
    match constraint {
        Some(ValueConstraint::Default(v)) => p.attribute(attr::DEFAULT, v),
        Some(ValueConstraint::Fixed(v)) => p.attribute(attr::FIXED, v),
        None => Ok(()),
    }
}

fn occurs_attributes<W: Write>(p: &mut Printer<W>, occurs: Option<Occurs>) -> Result<()> {
    let occurs = match occurs {
        Some(o) => o,
        None => return Ok(()),
    };
    if occurs.min != 1 {
        p.attribute(attr::MIN_OCCURS, &occurs.min.to_string())?;
    }
    if occurs.max != Some(1) {
        p.attribute(attr::MAX_OCCURS, &occurs.max_str())?;
    }
    Ok(())
}

/// Bind a prefix to every namespace the schema refers to
fn assign_prefixes(schema: &Schema) -> IndexMap<String, String> {
    let tns = schema.target_namespace.as_str();
    let mut prefixes = IndexMap::new();

    if tns.is_empty() {
        prefixes.insert(XSD_NAMESPACE.to_string(), "xs".to_string());
    } else {
        prefixes.insert(XSD_NAMESPACE.to_string(), String::new());
        let own = schema
            .prefix
            .clone()
            .filter(|p| !p.is_empty() && p != "xs")
            .unwrap_or_else(|| "tns".to_string());
        prefixes.insert(tns.to_string(), own);
    }

    for import in schema.imports.values() {
        if let Some(ref prefix) = import.prefix {
            if !import.namespace.is_empty()
                && !prefixes.contains_key(&import.namespace)
                && !prefixes.values().any(|p| p == prefix)
            {
                prefixes.insert(import.namespace.clone(), prefix.clone());
            }
        }
    }

    let mut referenced = IndexSet::new();
    for import in schema.imports.values() {
        referenced.insert(import.namespace.clone());
    }
    collect_schema(schema, &mut referenced);

    let mut counter = 0;
    for namespace in referenced {
        if namespace.is_empty() || namespace == XML_NAMESPACE || prefixes.contains_key(&namespace) {
            continue;
        }
        let prefix = loop {
            counter += 1;
            let candidate = format!("ns{}", counter);
            if !prefixes.values().any(|p| p == &candidate) {
                break candidate;
            }
        };
        prefixes.insert(namespace, prefix);
    }
    prefixes
}

fn collect_schema(schema: &Schema, out: &mut IndexSet<String>) {
    for element in schema.elements.values() {
        collect_element(element, out);
    }
    for ct in schema.complex_types.values() {
        collect_complex_type(ct, out);
    }
    for st in schema.simple_types.values() {
        collect_simple_type(st, out);
    }
    for group in schema.groups.values() {
        if let Some(ref grouping) = group.grouping {
            collect_grouping(grouping, out);
        }
    }
    for attribute in schema.attributes.values() {
        collect_attribute(attribute, out);
    }
    for group in schema.attribute_groups.values() {
        collect_attribute_particles(&group.attributes, out);
    }
}

fn collect_name(name: &QName, out: &mut IndexSet<String>) {
    out.insert(name.namespace_str().to_string());
}

fn collect_type_ref(type_ref: &TypeRef, out: &mut IndexSet<String>) {
    match type_ref {
        TypeRef::Named(name) => collect_name(name, out),
        TypeRef::Inline(definition) => match definition.as_ref() {
            TypeDefinition::Complex(ct) => collect_complex_type(ct, out),
            TypeDefinition::Simple(st) => collect_simple_type(st, out),
        },
    }
}

fn collect_element(element: &Element, out: &mut IndexSet<String>) {
    if let Some(ref type_ref) = element.type_ref {
        collect_type_ref(type_ref, out);
    }
    if let Some(ref head) = element.substitution_group {
        collect_name(head, out);
    }
}

fn collect_complex_type(ct: &ComplexType, out: &mut IndexSet<String>) {
    if let Some(ref derivation) = ct.derivation {
        collect_name(&derivation.base, out);
    }
    if let Some(ref grouping) = ct.content {
        collect_grouping(grouping, out);
    }
    collect_attribute_particles(&ct.attributes, out);
}

fn collect_simple_type(st: &SimpleType, out: &mut IndexSet<String>) {
    match &st.variety {
        SimpleVariety::Restriction(t) | SimpleVariety::List(t) => collect_type_ref(t, out),
        SimpleVariety::Union(members) => {
            for member in members {
                collect_type_ref(member, out);
            }
        }
    }
}

fn collect_grouping(grouping: &ElementGrouping, out: &mut IndexSet<String>) {
    match grouping {
        ElementGrouping::Compositor(c) => {
            for child in &c.children {
                collect_grouping(child, out);
            }
        }
        ElementGrouping::Group(reference) => collect_name(&reference.name, out),
        ElementGrouping::Any(_) => {}
        ElementGrouping::Element(particle) => match &particle.term {
            ElementTerm::Declared(element) => collect_element(element, out),
            ElementTerm::Reference(name) => collect_name(name, out),
        },
    }
}

fn collect_attribute(attribute: &Attribute, out: &mut IndexSet<String>) {
    if let Some(ref reference) = attribute.reference {
        collect_name(reference, out);
    }
    if let Some(ref type_ref) = attribute.type_ref {
        collect_type_ref(type_ref, out);
    }
}

fn collect_attribute_particles(particles: &[AttributeParticle], out: &mut IndexSet<String>) {
    for particle in particles {
        match particle {
            AttributeParticle::Attribute(a) => collect_attribute(a, out),
            AttributeParticle::GroupRef(name) => collect_name(name, out),
        }
    }
}
