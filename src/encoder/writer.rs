//! Encoding values as instance documents
//!
//! [`DocumentWriter`] finds the element that can represent a value, then
//! walks the element's content model and the value together. Namespaces of
//! the search order are declared on the document element; anything else is
//! declared where it is first needed.

use std::io::Write;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use super::options::{EncodeOptions, SchemaRef};
use super::printer::Printer;
use crate::error::{Error, Result, StructuralError};
use crate::locations::is_absolute_uri;
use crate::namespaces::{QName, XML_NAMESPACE, XSI_NAMESPACE};
use crate::registry::SchemaRegistry;
use crate::schema::attributes::AttributeUse;
use crate::schema::builtins::BuiltinType;
use crate::schema::complex_types::ComplexType;
use crate::schema::elements::Element;
use crate::schema::groups::{Compositor, ElementGrouping, ElementParticle, ElementTerm, ModelType};
use crate::schema::resolve::{ResolvedType, Resolver};
use crate::schema::schemas::Schema;
use crate::schema::wildcards::{AnyWildcard, ProcessContents};
use crate::schema::writing::SchemaWriter;
use crate::value::{Record, Value};

/// Writes values as documents of a schema
pub struct DocumentWriter<'r> {
    registry: &'r SchemaRegistry,
    schema: Arc<Schema>,
    options: EncodeOptions,
    order: Vec<Arc<Schema>>,
    prefixes: IndexMap<String, String>,
}

impl<'r> DocumentWriter<'r> {
    /// Create a writer for a primary schema with default options
    pub fn new(registry: &'r SchemaRegistry, schema: impl Into<Arc<Schema>>) -> Self {
        Self::with_options(registry, schema, EncodeOptions::default())
    }

    /// Create a writer with explicit options
    pub fn with_options(
        registry: &'r SchemaRegistry,
        schema: impl Into<Arc<Schema>>,
        options: EncodeOptions,
    ) -> Self {
        let schema = schema.into();
        let order = search_order(registry, &schema, &options);
        let prefixes = assign_prefixes(registry, &schema, &order);
        Self {
            registry,
            schema,
            options,
            order,
            prefixes,
        }
    }

    /// The primary schema
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The options in use
    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Schemas searched for an element, in order
    pub fn search_order(&self) -> &[Arc<Schema>] {
        &self.order
    }

    /// Prefix of each namespace declared on the document element; the
    /// primary namespace has the empty prefix
    pub fn prefixes(&self) -> &IndexMap<String, String> {
        &self.prefixes
    }

    fn resolver(&self, schema: &Arc<Schema>) -> Resolver<'r> {
        Resolver::new(self.registry, schema.clone()).with_limits(self.options.limits.clone())
    }

    fn schema_for(&self, namespace: &str) -> Arc<Schema> {
        self.order
            .iter()
            .find(|s| s.target_namespace == namespace)
            .cloned()
            .or_else(|| self.registry.get(namespace))
            .unwrap_or_else(|| self.schema.clone())
    }

    /// Element that can represent a value
    ///
    /// The base element is tried first; then the global elements of each
    /// schema in search order, in declaration order.
    pub fn find_element(&self, value: &Value) -> Option<(Arc<Schema>, Element)> {
        if let Some(base) = &self.options.base_element {
            let schema = self.schema_for(base.namespace_str());
            if self.resolver(&schema).element_accepts(base, value) {
                return Some((schema, base.clone()));
            }
            debug!(element = %base.qname(), "base element cannot encode the value");
        }
        for schema in &self.order {
            let resolver = self.resolver(schema);
            for element in schema.elements.values() {
                if resolver.element_accepts(element, value) {
                    return Some((schema.clone(), element.clone()));
                }
            }
        }
        None
    }

    /// Global element with a given local name that can represent a value
    pub fn find_named_element(
        &self,
        local_name: &str,
        value: &Value,
    ) -> Option<(Arc<Schema>, Element)> {
        let named_schema = match value {
            Value::Record(Record { name: Some(name), .. }) => {
                self.registry
                    .get(name.namespace_str())
                    .filter(|s| !self.order.iter().any(|o| Arc::ptr_eq(o, s)))
            }
            _ => None,
        };
        for schema in self.order.iter().chain(named_schema.iter()) {
            if let Some(element) = schema.element(local_name) {
                if self.resolver(schema).element_accepts(element, value) {
                    return Some((schema.clone(), element.clone()));
                }
            }
        }
        None
    }

    /// Write a complete document
    pub fn write_document<W: Write>(&self, value: &Value, out: W) -> Result<W> {
        self.write(value, out, true)
    }

    /// Write the primary schema to `schema_out`, then the document to `out`
    pub fn write_document_with_schema<W: Write, S: Write>(
        &self,
        value: &Value,
        out: W,
        schema_out: S,
    ) -> Result<(W, S)> {
        let schema_out = self.write_schema(schema_out)?;
        let out = self.write_document(value, out)?;
        Ok((out, schema_out))
    }

    /// Write a value without the XML declaration
    pub fn write_fragment<W: Write>(&self, value: &Value, out: W) -> Result<W> {
        self.write(value, out, false)
    }

    /// Write only the primary schema
    pub fn write_schema<W: Write>(&self, out: W) -> Result<W> {
        SchemaWriter::new(&self.schema)
            .with_encoding(self.options.encoding.clone())
            .write(out)
    }

    /// Write a complete document into a string
    pub fn write_string(&self, value: &Value) -> Result<String> {
        let bytes = self.write_document(value, Vec::new())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn write<W: Write>(&self, value: &Value, out: W, declaration: bool) -> Result<W> {
        let (schema, element) = self.find_element(value).ok_or_else(|| {
            Error::structural(format!("no element can encode a {} value", value.kind()))
        })?;
        debug!(element = %element.qname(), "encoding value");

        let mut printer = Printer::new(out, self.options.indent);
        if declaration {
            printer.declaration(&self.options.encoding)?;
        }
        let mut emitter = Emitter {
            writer: self,
            printer,
            first: true,
            bound: IndexMap::new(),
            scopes: Vec::new(),
        };
        emitter.element(&schema, &element, value, 1)?;
        emitter.printer.finish()
    }

    /// `xsi:schemaLocation` pairs and the no-namespace location
    fn schema_locations(&self) -> (Vec<(String, String)>, Option<String>) {
        let mut pairs = Vec::new();
        let mut no_namespace = None;
        for schema in &self.order {
            let namespace = &schema.target_namespace;
            let location = match self.options.schema_locations.get(namespace) {
                Some(hint) => hint.clone(),
                None => match &schema.uri {
                    Some(uri) => uri.to_string(),
                    None => continue,
                },
            };
            if !is_absolute_uri(&location) || &location == namespace {
                continue;
            }
            if namespace.is_empty() {
                no_namespace = Some(location);
            } else {
                pairs.push((namespace.clone(), location));
            }
        }
        (pairs, no_namespace)
    }
}

/// Primary schema, explicit entries first; then the primary schema and its
/// imports when not already listed
fn search_order(
    registry: &SchemaRegistry,
    schema: &Arc<Schema>,
    options: &EncodeOptions,
) -> Vec<Arc<Schema>> {
    let resolver = Resolver::new(registry, schema.clone()).with_limits(options.limits.clone());
    let mut order: Vec<Arc<Schema>> = Vec::new();
    let mut push = |candidate: Arc<Schema>| {
        if !order.iter().any(|s| s.target_namespace == candidate.target_namespace) {
            order.push(candidate);
        }
    };

    for entry in &options.schema_order {
        match entry {
            SchemaRef::Schema(s) => push(s.clone()),
            SchemaRef::Namespace(namespace) => match resolver.find_schema(namespace) {
                Some(s) => push(s),
                None => warn!(namespace = %namespace, "no schema for namespace in search order"),
            },
        }
    }
    push(schema.clone());
    for import in schema.imports.values() {
        match resolver.find_schema(&import.namespace) {
            Some(s) => push(s),
            None => debug!(namespace = %import.namespace, "imported schema not available"),
        }
    }
    order
}

fn assign_prefixes(
    registry: &SchemaRegistry,
    primary: &Schema,
    order: &[Arc<Schema>],
) -> IndexMap<String, String> {
    let mut prefixes = IndexMap::new();
    prefixes.insert(primary.target_namespace.clone(), String::new());
    for schema in order {
        let namespace = &schema.target_namespace;
        if namespace.is_empty() || prefixes.contains_key(namespace) {
            continue;
        }
        let preferred = primary
            .import(namespace)
            .and_then(|i| i.prefix.clone())
            .or_else(|| schema.prefix.clone());
        let prefix = pick_prefix(registry, namespace, preferred, |p| {
            prefixes.values().any(|v| v == p)
        });
        prefixes.insert(namespace.clone(), prefix);
    }
    prefixes
}

/// Choose a prefix for a namespace: the preferred one, the prefix of the
/// cached schema, or a generated `nsN`
fn pick_prefix(
    registry: &SchemaRegistry,
    namespace: &str,
    preferred: Option<String>,
    used: impl Fn(&str) -> bool,
) -> String {
    let cached = registry.get(namespace).and_then(|s| s.prefix.clone());
    for candidate in preferred.into_iter().chain(cached) {
        if !candidate.is_empty() && candidate != "xml" && !used(&candidate) {
            return candidate;
        }
    }
    (1..)
        .map(|n| format!("ns{}", n))
        .find(|p| !used(p))
        .unwrap_or_default()
}

fn invalid(element: &Element, message: impl Into<String>) -> Error {
    Error::Structural(StructuralError::new(message).with_element(element.name.clone()))
}

fn value_error(element: &Element, error: Error) -> Error {
    match error {
        Error::Value(reason) => Error::Structural(
            StructuralError::new("value cannot be encoded")
                .with_element(element.name.clone())
                .with_reason(reason),
        ),
        other => other,
    }
}

fn lexical(value: &Value) -> Result<String> {
    BuiltinType::AnySimpleType.to_lexical(value)
}

/// Repetitions of a field value
fn occurrences(value: &Value) -> Vec<&Value> {
    match value {
        Value::List(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Namespace state of one open element
struct Scope {
    default: String,
    declared: Vec<String>,
}

/// State of one encoding run
struct Emitter<'w, 'r, W: Write> {
    writer: &'w DocumentWriter<'r>,
    printer: Printer<W>,
    first: bool,
    bound: IndexMap<String, String>,
    scopes: Vec<Scope>,
}

impl<W: Write> Emitter<'_, '_, W> {
    fn open(&mut self, namespace: Option<&str>, local_name: &str) -> Result<()> {
        let namespace = namespace.unwrap_or("");
        let mut scope = Scope {
            default: self.scopes.last().map(|s| s.default.clone()).unwrap_or_default(),
            declared: Vec::new(),
        };
        let mut declarations: Vec<(String, String)> = Vec::new();

        if self.first {
            for (ns, prefix) in &self.writer.prefixes {
                if ns.is_empty() {
                    continue;
                }
                if prefix.is_empty() {
                    declarations.push(("xmlns".to_string(), ns.clone()));
                    scope.default = ns.clone();
                } else {
                    declarations.push((format!("xmlns:{}", prefix), ns.clone()));
                    self.bound.insert(ns.clone(), prefix.clone());
                }
            }
        }

        let name = if namespace.is_empty() {
            if !scope.default.is_empty() {
                declarations.push(("xmlns".to_string(), String::new()));
                scope.default = String::new();
            }
            local_name.to_string()
        } else if scope.default == namespace {
            local_name.to_string()
        } else if let Some(prefix) = self.bound.get(namespace) {
            format!("{}:{}", prefix, local_name)
        } else if self.writer.prefixes.get(namespace).map_or(false, |p| p.is_empty()) {
            declarations.push(("xmlns".to_string(), namespace.to_string()));
            scope.default = namespace.to_string();
            local_name.to_string()
        } else {
            let prefix = self.new_prefix(namespace, None);
            declarations.push((format!("xmlns:{}", prefix), namespace.to_string()));
            scope.declared.push(namespace.to_string());
            format!("{}:{}", prefix, local_name)
        };

        self.printer.start(&name)?;
        for (attribute, value) in &declarations {
            self.printer.attribute(attribute, value)?;
        }
        self.scopes.push(scope);

        if self.first {
            self.first = false;
            let (pairs, no_namespace) = self.writer.schema_locations();
            if !pairs.is_empty() {
                let value = pairs
                    .iter()
                    .map(|(ns, location)| format!("{} {}", ns, location))
                    .collect::<Vec<_>>()
                    .join(" ");
                let attribute = self.attribute_name(Some(XSI_NAMESPACE), "schemaLocation")?;
                self.printer.attribute(&attribute, &value)?;
            }
            if let Some(location) = no_namespace {
                let attribute =
                    self.attribute_name(Some(XSI_NAMESPACE), "noNamespaceSchemaLocation")?;
                self.printer.attribute(&attribute, &location)?;
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.printer.end()?;
        if let Some(scope) = self.scopes.pop() {
            for namespace in scope.declared {
                self.bound.shift_remove(&namespace);
            }
        }
        Ok(())
    }

    /// Bind a fresh prefix on the element being written
    fn new_prefix(&mut self, namespace: &str, preferred: Option<&str>) -> String {
        let bound = &self.bound;
        let preferred = preferred.map(str::to_string);
        let prefix = pick_prefix(self.writer.registry, namespace, preferred, |p| {
            bound.values().any(|v| v == p)
        });
        self.bound.insert(namespace.to_string(), prefix.clone());
        prefix
    }

    /// Qualified name of an attribute (or QName value), declaring the
    /// namespace on the open start tag when needed
    fn attribute_name(&mut self, namespace: Option<&str>, local_name: &str) -> Result<String> {
        let namespace = match namespace {
            Some(ns) if !ns.is_empty() => ns,
            _ => return Ok(local_name.to_string()),
        };
        if namespace == XML_NAMESPACE {
            return Ok(format!("xml:{}", local_name));
        }
        if let Some(prefix) = self.bound.get(namespace) {
            return Ok(format!("{}:{}", prefix, local_name));
        }
        let preferred = (namespace == XSI_NAMESPACE).then_some("xsi");
        let prefix = self.new_prefix(namespace, preferred);
        self.printer.attribute(&format!("xmlns:{}", prefix), namespace)?;
        if let Some(scope) = self.scopes.last_mut() {
            scope.declared.push(namespace.to_string());
        }
        Ok(format!("{}:{}", prefix, local_name))
    }

    fn qname_text(&mut self, qname: &QName) -> Result<String> {
        let default = self.scopes.last().map(|s| s.default.as_str()).unwrap_or("");
        if qname.namespace_str() == default {
            return Ok(qname.local_name.clone());
        }
        self.attribute_name(qname.namespace.as_deref(), &qname.local_name)
    }

    fn element(
        &mut self,
        schema: &Arc<Schema>,
        element: &Element,
        value: &Value,
        depth: usize,
    ) -> Result<()> {
        self.writer.options.limits.check_xml_depth(depth)?;
        let resolver = self.writer.resolver(schema);
        let namespace = if element.qualified {
            element.namespace.as_deref()
        } else {
            None
        };

        if value.is_null() {
            if !element.nillable {
                return Err(invalid(element, "element is not nillable"));
            }
            self.open(namespace, &element.name)?;
            let nil = self.attribute_name(Some(XSI_NAMESPACE), "nil")?;
            self.printer.attribute(&nil, "true")?;
            return self.close();
        }

        let declared = resolver.element_type(element)?;
        let (type_def, xsi_type) = match value {
            Value::Record(Record {
                type_name: Some(type_name),
                ..
            }) if declared.qname().as_ref() != Some(type_name) => {
                (resolver.named_type(type_name)?, Some(type_name.clone()))
            }
            _ => (declared, None),
        };

        self.open(namespace, &element.name)?;
        if let Some(type_name) = xsi_type {
            let attribute = self.attribute_name(Some(XSI_NAMESPACE), "type")?;
            let text = self.qname_text(&type_name)?;
            self.printer.attribute(&attribute, &text)?;
        }

        match &type_def {
            ResolvedType::Complex(ct) => self.complex(&resolver, element, ct, value, depth)?,
            ResolvedType::Builtin(BuiltinType::AnyType) => {
                self.untyped_body(namespace, value, depth)?
            }
            simple => {
                let content = match value {
                    Value::Record(record) => record
                        .content
                        .as_deref()
                        .ok_or_else(|| invalid(element, "missing simple content"))?,
                    other => other,
                };
                let text = resolver
                    .to_lexical(simple, content)
                    .map_err(|e| value_error(element, e))?;
                self.printer.text(&text)?;
            }
        }
        self.close()
    }

    fn complex(
        &mut self,
        resolver: &Resolver<'_>,
        element: &Element,
        ct: &ComplexType,
        value: &Value,
        depth: usize,
    ) -> Result<()> {
        let simple_content = resolver.simple_content_type(ct)?;
        let wrapped;
        let record = match value {
            Value::Record(record) => record,
            other if simple_content.is_some() => {
                wrapped = Record::new().with_content(other.clone());
                &wrapped
            }
            other => {
                return Err(invalid(
                    element,
                    format!("a {} value cannot encode complex content", other.kind()),
                ))
            }
        };

        self.attributes(resolver, element, ct, record)?;

        if let Some(content_type) = simple_content {
            let content = record
                .content
                .as_deref()
                .ok_or_else(|| invalid(element, "missing simple content"))?;
            let text = resolver
                .to_lexical(&content_type, content)
                .map_err(|e| value_error(element, e))?;
            return self.printer.text(&text);
        }

        if let Some(text) = record.content.as_deref() {
            let mixed = ct.mixed || ct.derivation.as_ref().and_then(|d| d.mixed).unwrap_or(false);
            if !mixed {
                return Err(invalid(element, "text content in element-only content"));
            }
            self.printer.text(&lexical(text).map_err(|e| value_error(element, e))?)?;
        }

        let content = resolver.effective_content(ct)?;
        let mut declared = Vec::new();
        if let Some(ref content) = content {
            resolver.content_names(content, &mut declared, 0)?;
        }
        let mut walk = ContentWalk::new(record, &declared, depth);
        if let Some(ref content) = content {
            self.grouping(resolver, element, content, &mut walk, 0)?;
        }
        for name in record.fields.keys() {
            if !walk.consumed.contains(name.as_str()) {
                return Err(invalid(
                    element,
                    format!("field '{}' is not part of the content model", name),
                ));
            }
            let left = walk.remaining(name);
            if left > 0 {
                return Err(invalid(
                    element,
                    format!("{} values of '{}' do not fit the content model", left, name),
                ));
            }
        }
        Ok(())
    }

    fn attributes(
        &mut self,
        resolver: &Resolver<'_>,
        element: &Element,
        ct: &ComplexType,
        record: &Record,
    ) -> Result<()> {
        let set = resolver.effective_attributes(ct)?;
        for a in &set.attributes {
            let value = record.attributes.get(&a.name).filter(|v| !v.is_null());
            match value {
                Some(_) if a.use_ == AttributeUse::Prohibited => {
                    return Err(invalid(element, format!("attribute '{}' is prohibited", a.name)));
                }
                Some(value) => {
                    let simple_type = match &a.type_ref {
                        Some(type_ref) => resolver.resolve_type(type_ref)?,
                        None => ResolvedType::Builtin(BuiltinType::AnySimpleType),
                    };
                    let text = resolver
                        .to_lexical(&simple_type, value)
                        .map_err(|e| value_error(element, e))?;
                    let namespace = if a.qualified { a.namespace.as_deref() } else { None };
                    let name = self.attribute_name(namespace, &a.name)?;
                    self.printer.attribute(&name, &text)?;
                }
                None if a.use_ == AttributeUse::Required => {
                    return Err(invalid(
                        element,
                        format!("missing required attribute '{}'", a.name),
                    ));
                }
                None => {}
            }
        }

        for (name, value) in &record.attributes {
            if set.get(name).is_some() || value.is_null() {
                continue;
            }
            if set.any_attribute.is_none() {
                return Err(invalid(element, format!("undeclared attribute '{}'", name)));
            }
            let text = lexical(value).map_err(|e| value_error(element, e))?;
            self.printer.attribute(name, &text)?;
        }
        Ok(())
    }

    fn grouping(
        &mut self,
        resolver: &Resolver<'_>,
        parent: &Element,
        grouping: &ElementGrouping,
        walk: &mut ContentWalk<'_>,
        level: usize,
    ) -> Result<()> {
        self.writer.options.limits.check_schema_depth(level)?;
        match grouping {
            ElementGrouping::Element(particle) => self.particle(resolver, parent, particle, walk),
            ElementGrouping::Any(any) => self.wildcard(parent, any, walk),
            ElementGrouping::Group(group_ref) => match resolver.group_content(group_ref)? {
                Some(ElementGrouping::Compositor(mut c)) => {
                    c.occurs = group_ref.occurs;
                    let content = ElementGrouping::Compositor(c);
                    self.grouping(resolver, parent, &content, walk, level + 1)
                }
                Some(content) => self.grouping(resolver, parent, &content, walk, level + 1),
                None => Ok(()),
            },
            ElementGrouping::Compositor(c) if c.occurs.is_multiple() => {
                self.repeated(resolver, parent, grouping, c, walk, level)
            }
            ElementGrouping::Compositor(c) => {
                if c.occurs.min == 0 && !walk.present(resolver, grouping)? {
                    return Ok(());
                }
                self.compositor_pass(resolver, parent, c, walk, level)
            }
        }
    }

    /// Walk a compositor with `maxOccurs > 1` once per occurrence. Each pass
    /// takes the next items of the list fields its particles name.
    fn repeated(
        &mut self,
        resolver: &Resolver<'_>,
        parent: &Element,
        grouping: &ElementGrouping,
        c: &Compositor,
        walk: &mut ContentWalk<'_>,
        level: usize,
    ) -> Result<()> {
        let outer = std::mem::replace(&mut walk.repeating, true);
        let mut passes = 0u32;
        while !c.occurs.is_exceeded(passes + 1) && walk.present(resolver, grouping)? {
            let before = walk.progress();
            self.compositor_pass(resolver, parent, c, walk, level)?;
            passes += 1;
            if walk.progress() == before {
                break;
            }
        }
        walk.repeating = outer;

        if c.occurs.is_missing(passes) && !compositor_emptiable(resolver, c, level)? {
            return Err(invalid(
                parent,
                format!(
                    "{} occurs {} times, at least {} required",
                    c.model, passes, c.occurs.min
                ),
            ));
        }
        Ok(())
    }

    fn compositor_pass(
        &mut self,
        resolver: &Resolver<'_>,
        parent: &Element,
        c: &Compositor,
        walk: &mut ContentWalk<'_>,
        level: usize,
    ) -> Result<()> {
        if c.model != ModelType::Choice {
            for child in &c.children {
                self.grouping(resolver, parent, child, walk, level + 1)?;
            }
            return Ok(());
        }
        for child in &c.children {
            if walk.present(resolver, child)? {
                return self.grouping(resolver, parent, child, walk, level + 1);
            }
        }
        if c.occurs.min == 0 || compositor_emptiable(resolver, c, level)? {
            Ok(())
        } else {
            Err(invalid(parent, "no alternative of a required choice is present"))
        }
    }

    fn particle(
        &mut self,
        resolver: &Resolver<'_>,
        parent: &Element,
        particle: &ElementParticle,
        walk: &mut ContentWalk<'_>,
    ) -> Result<()> {
        let (schema, element) = match &particle.term {
            ElementTerm::Declared(element) => (resolver.schema().clone(), element.clone()),
            ElementTerm::Reference(qname) => {
                let schema = resolver
                    .find_schema(qname.namespace_str())
                    .ok_or_else(|| {
                        let namespace = qname.namespace_str();
                        invalid(parent, format!("no schema for namespace '{}'", namespace))
                    })?;
                (schema, resolver.global_element(qname)?)
            }
        };

        let (schema, element) = match walk.remaining(&element.name) {
            0 => self.substitute(&element, walk).unwrap_or((schema, element)),
            _ => (schema, element),
        };
        let split = particle.occurs.is_multiple() || walk.repeating;
        let mut values: Vec<&Value> = match walk.record.fields.get(&element.name) {
            None => Vec::new(),
            Some(value @ Value::List(_)) if split => occurrences(value),
            Some(value) => vec![value],
        };
        let taken = walk.taken.get(&element.name).copied().unwrap_or(0);
        let skip = taken.min(values.len());
        values.drain(..skip);
        if walk.repeating {
            if let Some(max) = particle.occurs.max {
                values.truncate(max as usize);
            }
        }

        let count = values.len() as u32;
        if particle.occurs.is_missing(count) {
            return Err(invalid(
                parent,
                format!(
                    "{} occurs {} times, at least {} required",
                    element.name, count, particle.occurs.min
                ),
            ));
        }
        if particle.occurs.is_exceeded(count) {
            return Err(invalid(
                parent,
                format!(
                    "{} occurs {} times, at most {} allowed",
                    element.name,
                    count,
                    particle.occurs.max_str()
                ),
            ));
        }
        for value in &values {
            self.element(&schema, &element, value, walk.depth + 1)?;
        }
        let used = if split {
            taken + values.len()
        } else {
            walk.record.fields.get(&element.name).map_or(0, |v| occurrences(v).len())
        };
        walk.taken.insert(element.name.clone(), used);
        walk.consumed.insert(element.name.clone());
        Ok(())
    }

    /// A record field naming a member of the head element's substitution
    /// group
    fn substitute(&self, head: &Element, walk: &ContentWalk<'_>) -> Option<(Arc<Schema>, Element)> {
        let head_name = head.qname();
        for name in walk.record.fields.keys() {
            if walk.remaining(name) == 0 {
                continue;
            }
            for schema in &self.writer.order {
                let candidate = match schema.element(name) {
                    Some(candidate) => candidate,
                    None => continue,
                };
                let resolver = self.writer.resolver(schema);
                let mut current = candidate.substitution_group.clone();
                let mut depth = 0;
                while let Some(group) = current {
                    if group == head_name {
                        return Some((schema.clone(), candidate.clone()));
                    }
                    if self.writer.options.limits.check_schema_depth(depth).is_err() {
                        break;
                    }
                    current = resolver
                        .global_element(&group)
                        .ok()
                        .and_then(|e| e.substitution_group);
                    depth += 1;
                }
            }
        }
        None
    }

    fn wildcard(
        &mut self,
        parent: &Element,
        any: &AnyWildcard,
        walk: &mut ContentWalk<'_>,
    ) -> Result<()> {
        let mut count = 0u32;
        for (name, value) in &walk.record.fields {
            if walk.consumed.contains(name.as_str()) || walk.declared.iter().any(|d| d == name) {
                continue;
            }
            if any.occurs.is_exceeded(count + 1) {
                break;
            }
            for item in occurrences(value) {
                match self.writer.find_named_element(name, item) {
                    Some((schema, element)) if any.namespace.admits(element.namespace_str()) => {
                        self.element(&schema, &element, item, walk.depth + 1)?;
                    }
                    _ if any.process_contents == ProcessContents::Strict => {
                        return Err(invalid(
                            parent,
                            format!("no declaration for wildcard content '{}'", name),
                        ));
                    }
                    _ => self.untyped(None, name, item, walk.depth + 1)?,
                }
            }
            walk.taken.insert(name.clone(), occurrences(value).len());
            walk.consumed.insert(name.clone());
            count += 1;
        }
        if any.occurs.is_missing(count) {
            return Err(invalid(parent, "missing wildcard content"));
        }
        Ok(())
    }

    fn untyped(
        &mut self,
        namespace: Option<&str>,
        local_name: &str,
        value: &Value,
        depth: usize,
    ) -> Result<()> {
        if let Value::List(items) = value {
            for item in items {
                self.untyped(namespace, local_name, item, depth)?;
            }
            return Ok(());
        }
        self.open(namespace, local_name)?;
        self.untyped_body(namespace, value, depth)?;
        self.close()
    }

    /// Attributes, text and children of an element no type describes
    fn untyped_body(&mut self, namespace: Option<&str>, value: &Value, depth: usize) -> Result<()> {
        self.writer.options.limits.check_xml_depth(depth)?;
        let record = match value {
            Value::Null => {
                let nil = self.attribute_name(Some(XSI_NAMESPACE), "nil")?;
                return self.printer.attribute(&nil, "true");
            }
            Value::Record(record) => record,
            other => return self.printer.text(&lexical(other)?),
        };
        for (name, value) in &record.attributes {
            self.printer.attribute(name, &lexical(value)?)?;
        }
        if let Some(content) = record.content.as_deref() {
            self.printer.text(&lexical(content)?)?;
        }
        for (name, value) in &record.fields {
            for item in occurrences(value) {
                match self.writer.find_named_element(name, item) {
                    Some((schema, element)) => self.element(&schema, &element, item, depth + 1)?,
                    None => self.untyped(namespace, name, item, depth + 1)?,
                }
            }
        }
        Ok(())
    }
}

/// Progress through one record while walking its content model
struct ContentWalk<'a> {
    record: &'a Record,
    declared: &'a [String],
    /// Fields a particle or wildcard has claimed
    consumed: IndexSet<String>,
    /// Items already written per field
    taken: IndexMap<String, usize>,
    /// Inside a compositor with `maxOccurs > 1`
    repeating: bool,
    depth: usize,
}

impl<'a> ContentWalk<'a> {
    fn new(record: &'a Record, declared: &'a [String], depth: usize) -> Self {
        Self {
            record,
            declared,
            consumed: IndexSet::new(),
            taken: IndexMap::new(),
            repeating: false,
            depth,
        }
    }

    /// Items of a field not yet written
    fn remaining(&self, name: &str) -> usize {
        let total = self.record.fields.get(name).map_or(0, |v| occurrences(v).len());
        total.saturating_sub(self.taken.get(name).copied().unwrap_or(0))
    }

    fn progress(&self) -> usize {
        self.taken.values().sum::<usize>() + self.consumed.len()
    }

    /// True if the record has unwritten items for some particle of the
    /// grouping
    fn present(&self, resolver: &Resolver<'_>, grouping: &ElementGrouping) -> Result<bool> {
        let mut names = Vec::new();
        let wildcard = resolver.content_names(grouping, &mut names, 0)?;
        let named = names.iter().any(|n| self.remaining(n) > 0);
        let open = wildcard
            && self
                .record
                .fields
                .keys()
                .any(|k| {
                    !self.declared.iter().any(|d| d == k) && !self.consumed.contains(k.as_str())
                });
        Ok(named || open)
    }
}

/// True if a grouping may produce no elements
fn emptiable(resolver: &Resolver<'_>, grouping: &ElementGrouping, level: usize) -> Result<bool> {
    if grouping.occurs().min == 0 {
        return Ok(true);
    }
    match grouping {
        ElementGrouping::Element(_) | ElementGrouping::Any(_) => Ok(false),
        ElementGrouping::Group(group_ref) => match resolver.group_content(group_ref)? {
            Some(content) => emptiable(resolver, &content, level + 1),
            None => Ok(true),
        },
        ElementGrouping::Compositor(c) => compositor_emptiable(resolver, c, level),
    }
}

/// True if one occurrence of the compositor may produce no elements
fn compositor_emptiable(resolver: &Resolver<'_>, c: &Compositor, level: usize) -> Result<bool> {
    let mut results = Vec::with_capacity(c.children.len());
    for child in &c.children {
        results.push(emptiable(resolver, child, level + 1)?);
    }
    Ok(if c.model == ModelType::Choice {
        results.iter().any(|e| *e)
    } else {
        results.iter().all(|e| *e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SchemaSource;
    use pretty_assertions::assert_eq;

    const INTS: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        xmlns:a="urn:a" targetNamespace="urn:a">
      <xs:simpleType name="Int">
        <xs:restriction base="xs:integer"/>
      </xs:simpleType>
      <xs:element name="Foo" type="a:Int"/>
      <xs:element name="Bar" type="xs:long"/>
    </xs:schema>"#;

    const PEOPLE: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        xmlns:p="urn:people" targetNamespace="urn:people"
        elementFormDefault="qualified">
      <xs:element name="person">
        <xs:complexType>
          <xs:sequence>
            <xs:element name="name" type="xs:string"/>
            <xs:choice>
              <xs:element name="email" type="xs:string"/>
              <xs:element name="phone" type="xs:string"/>
            </xs:choice>
            <xs:element name="nick" type="xs:string" minOccurs="0" maxOccurs="unbounded"/>
            <xs:element name="age" type="xs:int" nillable="true" minOccurs="0"/>
          </xs:sequence>
          <xs:attribute name="id" type="xs:int" use="required"/>
        </xs:complexType>
      </xs:element>
    </xs:schema>"#;

    fn registry_with(namespace: &str, xsd: &str) -> (SchemaRegistry, Arc<Schema>) {
        let registry = SchemaRegistry::new();
        let schema = registry.resolve(namespace, SchemaSource::bytes(xsd)).unwrap();
        (registry, schema)
    }

    fn person() -> Record {
        Record::new()
            .with_attribute("id", 3)
            .with_field("name", "Ada")
            .with_field("phone", "555")
    }

    #[test]
    fn test_integer_value() {
        let (registry, schema) = registry_with("urn:a", INTS);
        let out = DocumentWriter::new(&registry, schema)
            .write_string(&Value::Integer(42))
            .unwrap();
        assert_eq!(
            out,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Foo xmlns=\"urn:a\">42</Foo>\n"
        );
    }

    #[test]
    fn test_no_element_for_string() {
        let (registry, schema) = registry_with("urn:a", INTS);
        let err = DocumentWriter::new(&registry, schema)
            .write_string(&Value::String("x".into()))
            .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_first_matching_element_wins() {
        let (registry, schema) = registry_with("urn:a", INTS);
        let writer = DocumentWriter::new(&registry, schema);
        for _ in 0..3 {
            let (_, element) = writer.find_element(&Value::Integer(1)).unwrap();
            assert_eq!(element.name, "Foo");
        }
    }

    #[test]
    fn test_base_element_is_tried_first() {
        let (registry, schema) = registry_with("urn:a", INTS);
        let bar = schema.element("Bar").unwrap().clone();
        let options = EncodeOptions::new().with_base_element(bar);
        let out = DocumentWriter::with_options(&registry, schema, options)
            .write_string(&Value::Integer(5))
            .unwrap();
        assert!(out.contains("<Bar xmlns=\"urn:a\">5</Bar>"));
    }

    #[test]
    fn test_sequence_and_choice() {
        let (registry, schema) = registry_with("urn:people", PEOPLE);
        let mut record = person();
        record.push_field("nick", "A");
        record.push_field("nick", "Countess");
        let out = DocumentWriter::new(&registry, schema)
            .write_string(&Value::Record(record))
            .unwrap();
        assert!(out.contains(concat!(
            "<person xmlns=\"urn:people\" id=\"3\"><name>Ada</name><phone>555</phone>",
            "<nick>A</nick><nick>Countess</nick></person>"
        )));
    }

    #[test]
    fn test_nil_child() {
        let (registry, schema) = registry_with("urn:people", PEOPLE);
        let record = person().with_field("age", Value::Null);
        let out = DocumentWriter::new(&registry, schema)
            .write_string(&Value::Record(record))
            .unwrap();
        assert!(out.contains(
            "<age xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:nil=\"true\"/>"
        ));
    }

    #[test]
    fn test_missing_choice_is_an_error() {
        let (registry, schema) = registry_with("urn:people", PEOPLE);
        let record = Record::named(QName::namespaced("urn:people", "person"))
            .with_attribute("id", 1)
            .with_field("name", "Ada");
        let writer = DocumentWriter::new(&registry, schema.clone());
        let element = schema.element("person").unwrap().clone();
        let options = EncodeOptions::new().with_base_element(element);
        let err = DocumentWriter::with_options(&registry, schema, options)
            .write_string(&Value::Record(record.clone()))
            .unwrap_err();
        assert!(err.is_structural());
        assert!(writer.find_element(&Value::Record(record)).is_some());
    }

    const PAIRS: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        targetNamespace="urn:pairs" elementFormDefault="qualified">
      <xs:element name="pairs">
        <xs:complexType>
          <xs:sequence maxOccurs="2">
            <xs:element name="k" type="xs:string"/>
            <xs:element name="v" type="xs:int" minOccurs="0"/>
          </xs:sequence>
        </xs:complexType>
      </xs:element>
    </xs:schema>"#;

    #[test]
    fn test_repeated_sequence_interleaves_items() {
        let (registry, schema) = registry_with("urn:pairs", PAIRS);
        let record = Record::named(QName::namespaced("urn:pairs", "pairs"))
            .with_field("k", Value::List(vec!["one".into(), "two".into()]))
            .with_field("v", 1);
        let out = DocumentWriter::new(&registry, schema)
            .write_string(&Value::Record(record))
            .unwrap();
        assert!(out.contains("<pairs xmlns=\"urn:pairs\"><k>one</k><v>1</v><k>two</k></pairs>"));
    }

    #[test]
    fn test_repeated_sequence_leftover_is_an_error() {
        let (registry, schema) = registry_with("urn:pairs", PAIRS);
        let keys = Value::List(vec!["a".into(), "b".into(), "c".into()]);
        let record = Record::named(QName::namespaced("urn:pairs", "pairs")).with_field("k", keys);
        let err = DocumentWriter::new(&registry, schema)
            .write_string(&Value::Record(record))
            .unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("do not fit"), "{}", err);
    }

    #[test]
    fn test_schema_location_hint() {
        let (registry, schema) = registry_with("urn:a", INTS);
        let options =
            EncodeOptions::new().with_schema_location("urn:a", "http://example.com/a.xsd");
        let out = DocumentWriter::with_options(&registry, schema, options)
            .write_string(&Value::Integer(1))
            .unwrap();
        assert!(out.contains("xsi:schemaLocation=\"urn:a http://example.com/a.xsd\""));
        assert!(out.contains("xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\""));
    }

    #[test]
    fn test_search_order_by_namespace() {
        let registry = SchemaRegistry::new();
        let ints = registry.resolve("urn:a", SchemaSource::bytes(INTS)).unwrap();
        let people = registry.resolve("urn:people", SchemaSource::bytes(PEOPLE)).unwrap();
        let options = EncodeOptions::new().with_schema("urn:a");
        let writer = DocumentWriter::with_options(&registry, people, options);
        assert_eq!(writer.search_order().len(), 2);
        assert!(Arc::ptr_eq(&writer.search_order()[0], &ints));
        assert_eq!(writer.prefixes().get("urn:people").map(String::as_str), Some(""));
        let prefix = writer.prefixes().get("urn:a").cloned().unwrap();
        assert!(!prefix.is_empty());

        let out = writer.write_string(&Value::Integer(9)).unwrap();
        let expected = format!(
            "<{p}:Foo xmlns=\"urn:people\" xmlns:{p}=\"urn:a\">9</{p}:Foo>",
            p = prefix
        );
        assert!(out.contains(&expected));
    }

    #[test]
    fn test_document_with_schema() {
        let (registry, schema) = registry_with("urn:a", INTS);
        let (doc, xsd) = DocumentWriter::new(&registry, schema)
            .write_document_with_schema(&Value::Integer(1), Vec::new(), Vec::new())
            .unwrap();
        let xsd = String::from_utf8(xsd).unwrap();
        assert!(xsd.contains("targetNamespace=\"urn:a\""));
        assert!(String::from_utf8(doc).unwrap().ends_with("</Foo>\n"));
    }

    #[test]
    fn test_fragment_has_no_declaration() {
        let (registry, schema) = registry_with("urn:a", INTS);
        let out = DocumentWriter::new(&registry, schema)
            .write_fragment(&Value::Integer(1), Vec::new())
            .unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("<Foo"));
    }
}
