//! Element handlers of the instance parser
//!
//! Each open element of an instance document has one handler. The parser
//! asks the handler on top of the stack for the handler of every child;
//! `None` means nobody handles it and the child is skipped. Completed
//! children are handed back to their parent as [`Value`]s.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};
use url::Url;

use super::config::FilterStrictness;
use crate::error::{Error, Position, Result, StructuralError};
use crate::events::StartElement;
use crate::limits::Limits;
use crate::namespaces::{NamespaceContext, QName, XSI_NAMESPACE};
use crate::registry::{SchemaRegistry, SchemaSource};
use crate::schema::attributes::{Attribute, AttributeUse};
use crate::schema::builtins::BuiltinType;
use crate::schema::elements::Element;
use crate::schema::groups::{ElementGrouping, ElementParticle, ElementTerm, ModelType};
use crate::schema::particles::Occurs;
use crate::schema::resolve::{AttributeSet, ResolvedType, Resolver};
use crate::schema::schemas::Schema;
use crate::schema::wildcards::ProcessContents;
use crate::value::{Record, Value};

/// Parse state visible to handlers
pub struct HandlerContext<'r> {
    registry: &'r SchemaRegistry,
    pub(crate) namespaces: NamespaceContext,
    pub(crate) locations: IndexMap<String, Url>,
    pub(crate) prefixes: IndexMap<String, String>,
    pub(crate) position: Position,
    strictness: FilterStrictness,
    limits: Limits,
    failed: RefCell<HashSet<String>>,
}

impl<'r> HandlerContext<'r> {
    pub(crate) fn new(
        registry: &'r SchemaRegistry,
        strictness: FilterStrictness,
        limits: Limits,
    ) -> Self {
        Self {
            registry,
            namespaces: NamespaceContext::new(),
            locations: IndexMap::new(),
            prefixes: IndexMap::new(),
            position: Position::new(1, 1),
            strictness,
            limits,
            failed: RefCell::new(HashSet::new()),
        }
    }

    /// The registry schemas are looked up in
    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    /// Namespace bindings in scope
    pub fn namespaces(&self) -> &NamespaceContext {
        &self.namespaces
    }

    /// Prefix to namespace bindings of the document element
    pub fn prefixes(&self) -> &IndexMap<String, String> {
        &self.prefixes
    }

    /// Schema location known for a namespace
    pub fn location(&self, namespace: &str) -> Option<&Url> {
        self.locations.get(namespace)
    }

    /// Position of the current element event
    pub fn position(&self) -> Position {
        self.position
    }

    /// Content model strictness
    pub fn strictness(&self) -> FilterStrictness {
        self.strictness
    }

    /// Limits of this parse
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Schema for a namespace; a known location is loaded on first use
    ///
    /// Namespaces without a location in the document fall back to the
    /// registry cache, then to a location some cached schema imports them
    /// from.
    pub fn schema(&self, namespace: &str) -> Option<Arc<Schema>> {
        if let Some(url) = self.locations.get(namespace) {
            if let Some(schema) = self.load(namespace, url) {
                return Some(schema);
            }
        }
        if let Some(schema) = self.registry.get(namespace) {
            return Some(schema);
        }
        let url = self
            .registry
            .find_import(namespace)
            .and_then(|import| import.location)
            .and_then(|location| Url::parse(&location).ok())?;
        self.load(namespace, &url)
    }

    fn load(&self, namespace: &str, url: &Url) -> Option<Arc<Schema>> {
        if self.failed.borrow().contains(namespace) {
            return None;
        }
        match self.registry.resolve(namespace, SchemaSource::Uri(url.clone())) {
            Ok(schema) => Some(schema),
            Err(e) => {
                warn!(namespace, location = %url, error = %e, "cannot load schema");
                self.failed.borrow_mut().insert(namespace.to_string());
                None
            }
        }
    }

    /// Resolver relative to a schema
    pub fn resolver(&self, schema: Arc<Schema>) -> Resolver<'r> {
        Resolver::new(self.registry, schema).with_limits(self.limits.clone())
    }

    /// Global element declaration with the schema declaring it
    pub fn global_element(
        &self,
        namespace: &str,
        local_name: &str,
    ) -> Option<(Arc<Schema>, Element)> {
        let schema = self.schema(namespace)?;
        let element = schema.element(local_name)?.clone();
        Some((schema, element))
    }

    /// Resolve a QName-valued text against the bindings in scope
    pub fn resolve_qname(&self, text: &str) -> Result<QName> {
        self.namespaces.resolve(text.trim(), None)
    }
}

/// Turns one element of an instance document into a value
pub trait ElementHandler {
    /// Called once with the element's start tag
    fn start(&mut self, _ctx: &HandlerContext<'_>, _element: &StartElement) -> Result<()> {
        Ok(())
    }

    /// Handler for a child element, `None` to skip it
    fn child(
        &mut self,
        ctx: &HandlerContext<'_>,
        namespace: &str,
        local_name: &str,
    ) -> Result<Option<Box<dyn ElementHandler>>>;

    /// A complete run of character data
    fn characters(&mut self, _ctx: &HandlerContext<'_>, _text: &str) -> Result<()> {
        Ok(())
    }

    /// Value of a completed child
    fn child_value(
        &mut self,
        ctx: &HandlerContext<'_>,
        namespace: &str,
        local_name: &str,
        value: Value,
    ) -> Result<()>;

    /// Value of this element once its end tag is seen
    fn finish(self: Box<Self>, ctx: &HandlerContext<'_>) -> Result<Value>;

    /// True for handlers whose value is discarded
    fn is_ignored(&self) -> bool {
        false
    }
}

/// Creates the handler of the document element
pub trait HandlerFactory: Send + Sync {
    /// Handler for the document element, `None` if unknown
    fn create(
        &self,
        ctx: &HandlerContext<'_>,
        namespace: &str,
        local_name: &str,
    ) -> Result<Option<Box<dyn ElementHandler>>>;
}

/// Looks the document element up as a global element of its namespace
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaHandlerFactory;

impl HandlerFactory for SchemaHandlerFactory {
    fn create(
        &self,
        ctx: &HandlerContext<'_>,
        namespace: &str,
        local_name: &str,
    ) -> Result<Option<Box<dyn ElementHandler>>> {
        match ctx.global_element(namespace, local_name) {
            Some((schema, element)) => {
                Ok(Some(Box::new(SchemaElementHandler::new(ctx, schema, element)?)))
            }
            None => {
                debug!(
                    namespace,
                    element = local_name,
                    "no global declaration for document element"
                );
                Ok(None)
            }
        }
    }
}

/// Skips an element and everything inside it
#[derive(Debug, Default)]
pub struct IgnoreHandler;

impl ElementHandler for IgnoreHandler {
    fn child(
        &mut self,
        _: &HandlerContext<'_>,
        _: &str,
        _: &str,
    ) -> Result<Option<Box<dyn ElementHandler>>> {
        Ok(None)
    }

    fn child_value(&mut self, _: &HandlerContext<'_>, _: &str, _: &str, _: Value) -> Result<()> {
        Ok(())
    }

    fn finish(self: Box<Self>, _: &HandlerContext<'_>) -> Result<Value> {
        Ok(Value::Null)
    }

    fn is_ignored(&self) -> bool {
        true
    }
}

/// Builds an untyped record from content no schema describes
///
/// Text-only elements become strings.
#[derive(Debug, Default)]
pub struct AnyHandler {
    record: Record,
    text: String,
}

impl AnyHandler {
    /// Create a handler
    pub fn new() -> Self {
        Self::default()
    }
}

impl ElementHandler for AnyHandler {
    fn start(&mut self, _ctx: &HandlerContext<'_>, element: &StartElement) -> Result<()> {
        let name = QName::namespaced(element.namespace.clone(), element.local_name.clone());
        self.record.name = Some(name);
        for attribute in element.attributes.iter() {
            if attribute.namespace != XSI_NAMESPACE {
                self.record
                    .attributes
                    .insert(attribute.local_name.clone(), Value::String(attribute.value.clone()));
            }
        }
        Ok(())
    }

    fn child(
        &mut self,
        ctx: &HandlerContext<'_>,
        namespace: &str,
        local_name: &str,
    ) -> Result<Option<Box<dyn ElementHandler>>> {
        match ctx.global_element(namespace, local_name) {
            Some((schema, element)) => {
                Ok(Some(Box::new(SchemaElementHandler::new(ctx, schema, element)?)))
            }
            None => Ok(Some(Box::new(AnyHandler::new()))),
        }
    }

    fn characters(&mut self, _ctx: &HandlerContext<'_>, text: &str) -> Result<()> {
        self.text.push_str(text);
        Ok(())
    }

    fn child_value(
        &mut self,
        _ctx: &HandlerContext<'_>,
        _namespace: &str,
        local_name: &str,
        value: Value,
    ) -> Result<()> {
        self.record.push_field(local_name, value);
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &HandlerContext<'_>) -> Result<Value> {
        let AnyHandler { mut record, text } = *self;
        if record.attributes.is_empty() && record.fields.is_empty() {
            return Ok(Value::String(text));
        }
        if !text.trim().is_empty() {
            record.content = Some(Box::new(Value::String(text)));
        }
        Ok(Value::Record(record))
    }
}

/// A child element matched against a content model
enum ChildMatch {
    Element {
        schema: Arc<Schema>,
        element: Element,
        particle: QName,
        occurs: Occurs,
    },
    Wildcard(ProcessContents),
}

/// Handles an element through its schema declaration
pub struct SchemaElementHandler {
    schema: Arc<Schema>,
    element: Element,
    type_def: ResolvedType,
    content: Option<ElementGrouping>,
    attributes: AttributeSet,
    record: Record,
    text: String,
    nil: bool,
    counts: IndexMap<QName, (u32, Occurs)>,
}

impl SchemaElementHandler {
    /// Create a handler for an element declared in `schema`
    pub fn new(ctx: &HandlerContext<'_>, schema: Arc<Schema>, element: Element) -> Result<Self> {
        let resolver = ctx.resolver(schema.clone());
        let type_def = resolver.element_type(&element)?;
        let mut handler = Self {
            record: Record::named(element.qname()),
            schema,
            element,
            type_def: ResolvedType::Builtin(BuiltinType::AnyType),
            content: None,
            attributes: AttributeSet::default(),
            text: String::new(),
            nil: false,
            counts: IndexMap::new(),
        };
        handler.set_type(&resolver, type_def)?;
        Ok(handler)
    }

    /// The element being handled
    pub fn element(&self) -> &Element {
        &self.element
    }

    fn set_type(&mut self, resolver: &Resolver<'_>, type_def: ResolvedType) -> Result<()> {
        match &type_def {
            ResolvedType::Complex(ct) => {
                self.content = resolver.effective_content(ct)?;
                self.attributes = resolver.effective_attributes(ct)?;
            }
            _ => {
                self.content = None;
                self.attributes = AttributeSet::default();
            }
        }
        self.type_def = type_def;
        Ok(())
    }

    fn invalid(&self, message: impl Into<String>) -> Error {
        Error::Structural(StructuralError::new(message).with_element(self.element.name.clone()))
    }

    /// Parse text as a simple type; at low strictness bad text stays a string
    fn typed(
        &self,
        ctx: &HandlerContext<'_>,
        resolver: &Resolver<'_>,
        simple_type: &ResolvedType,
        text: &str,
    ) -> Result<Value> {
        match resolver.parse_simple(simple_type, text) {
            Ok(value) => Ok(value),
            Err(Error::Value(reason)) if ctx.strictness() == FilterStrictness::Low => {
                debug!(element = %self.element.name, reason = %reason, "keeping untyped text");
                Ok(Value::String(text.to_string()))
            }
            Err(Error::Value(reason)) => Err(Error::Structural(
                StructuralError::new(format!("invalid value '{}'", text.trim()))
                    .with_element(self.element.name.clone())
                    .with_reason(reason),
            )),
            Err(other) => Err(other),
        }
    }

    fn attribute_type(
        &self,
        resolver: &Resolver<'_>,
        attribute: &Attribute,
    ) -> Result<ResolvedType> {
        match &attribute.type_ref {
            Some(type_ref) => resolver.resolve_type(type_ref),
            None => Ok(ResolvedType::Builtin(BuiltinType::AnySimpleType)),
        }
    }

    fn read_attributes(
        &mut self,
        ctx: &HandlerContext<'_>,
        resolver: &Resolver<'_>,
        start: &StartElement,
    ) -> Result<()> {
        let mut values = Vec::new();
        for attribute in start.attributes.iter() {
            if attribute.namespace == XSI_NAMESPACE {
                continue;
            }
            let declared = self
                .attributes
                .attributes
                .iter()
                .find(|a| {
                    a.name == attribute.local_name
                        && a.namespace.as_deref().unwrap_or("") == attribute.namespace
                });
            match declared {
                Some(a)
                    if a.use_ == AttributeUse::Prohibited
                        && ctx.strictness() == FilterStrictness::High =>
                {
                    return Err(self.invalid(format!("attribute '{}' is prohibited", a.name)));
                }
                Some(a) => {
                    let simple_type = self.attribute_type(resolver, a)?;
                    let value = self.typed(ctx, resolver, &simple_type, &attribute.value)?;
                    values.push((a.name.clone(), value));
                }
                None => {
                    let admitted = self
                        .attributes
                        .any_attribute
                        .as_ref()
                        .map_or(false, |any| any.namespace.admits(&attribute.namespace));
                    if admitted || ctx.strictness() == FilterStrictness::Low {
                        let value = Value::String(attribute.value.clone());
                        values.push((attribute.local_name.clone(), value));
                    } else if ctx.strictness() == FilterStrictness::High {
                        return Err(self.invalid(format!(
                            "undeclared attribute '{}'",
                            attribute.local_name
                        )));
                    } else {
                        debug!(
                            element = %self.element.name,
                            attribute = %attribute.local_name,
                            "skipping undeclared attribute"
                        );
                    }
                }
            }
        }

        for a in &self.attributes.attributes {
            if values.iter().any(|(name, _)| name == &a.name) {
                continue;
            }
            if let Some(default) = a.value_constraint.as_ref() {
                let simple_type = self.attribute_type(resolver, a)?;
                let value = self.typed(ctx, resolver, &simple_type, default.value())?;
                values.push((a.name.clone(), value));
            } else if a.use_ == AttributeUse::Required
                && ctx.strictness() == FilterStrictness::High
            {
                return Err(self.invalid(format!("missing required attribute '{}'", a.name)));
            }
        }

        for (name, value) in values {
            self.record.attributes.insert(name, value);
        }
        Ok(())
    }

    /// Find the particle of the content model a child matches
    ///
    /// Element particles are preferred over wildcards anywhere in the model.
    fn find_child(
        &self,
        ctx: &HandlerContext<'_>,
        resolver: &Resolver<'_>,
        name: &QName,
    ) -> Result<Option<ChildMatch>> {
        let content = match &self.content {
            Some(content) => content,
            None => return Ok(None),
        };
        if let Some(found) = self.find_in(ctx, resolver, content, name, false, Some(1), 0)? {
            return Ok(Some(found));
        }
        self.find_in(ctx, resolver, content, name, true, Some(1), 0)
    }

    fn find_in(
        &self,
        ctx: &HandlerContext<'_>,
        resolver: &Resolver<'_>,
        grouping: &ElementGrouping,
        name: &QName,
        wildcards: bool,
        times: Option<u32>,
        depth: usize,
    ) -> Result<Option<ChildMatch>> {
        ctx.limits().check_schema_depth(depth)?;
        match grouping {
            ElementGrouping::Compositor(c) => {
                let times = c.occurs.repeated(times).max;
                for child in &c.children {
                    let found =
                        self.find_in(ctx, resolver, child, name, wildcards, times, depth + 1)?;
                    if let Some(found) = found {
                        return Ok(Some(found));
                    }
                }
                Ok(None)
            }
            ElementGrouping::Group(group_ref) => match resolver.group_content(group_ref)? {
                Some(content) => {
                    let times = group_ref.occurs.repeated(times).max;
                    self.find_in(ctx, resolver, &content, name, wildcards, times, depth + 1)
                }
                None => Ok(None),
            },
            ElementGrouping::Any(any) => {
                let admitted = wildcards && any.namespace.admits(name.namespace_str());
                Ok(admitted.then_some(ChildMatch::Wildcard(any.process_contents)))
            }
            ElementGrouping::Element(_) if wildcards => Ok(None),
            ElementGrouping::Element(particle) => {
                self.match_particle(ctx, resolver, particle, name, times)
            }
        }
    }

    fn match_particle(
        &self,
        ctx: &HandlerContext<'_>,
        resolver: &Resolver<'_>,
        particle: &ElementParticle,
        name: &QName,
        times: Option<u32>,
    ) -> Result<Option<ChildMatch>> {
        let head = particle.qname();
        let occurs = particle.occurs.repeated(times);
        if head == *name {
            let (schema, element) = match &particle.term {
                ElementTerm::Declared(element) => (self.schema.clone(), element.clone()),
                ElementTerm::Reference(qname) => {
                    let schema = resolver
                        .find_schema(qname.namespace_str())
                        .ok_or_else(|| {
                            self.invalid(format!(
                                "no schema for namespace '{}'",
                                qname.namespace_str()
                            ))
                        })?;
                    (schema, resolver.global_element(qname)?)
                }
            };
            return Ok(Some(ChildMatch::Element {
                schema,
                element,
                particle: head,
                occurs,
            }));
        }

        // A member of the head's substitution group may stand in for it.
        let (schema, element) = match ctx.global_element(name.namespace_str(), &name.local_name) {
            Some(found) => found,
            None => return Ok(None),
        };
        let mut current = element.substitution_group.clone();
        let mut depth = 0;
        while let Some(group) = current {
            ctx.limits().check_schema_depth(depth)?;
            if group == head {
                return Ok(Some(ChildMatch::Element {
                    schema,
                    element,
                    particle: head,
                    occurs,
                }));
            }
            current = resolver
                .global_element(&group)
                .ok()
                .and_then(|e| e.substitution_group);
            depth += 1;
        }
        Ok(None)
    }

    fn unknown_child(
        &self,
        ctx: &HandlerContext<'_>,
        name: &QName,
    ) -> Result<Option<Box<dyn ElementHandler>>> {
        match ctx.strictness() {
            FilterStrictness::Low => Ok(Some(Box::new(AnyHandler::new()))),
            FilterStrictness::Medium => {
                debug!(element = %self.element.name, child = %name, "skipping undeclared child");
                Ok(None)
            }
            FilterStrictness::High => {
                Err(self.invalid(format!("undeclared child element {}", name)))
            }
        }
    }

    fn check_occurrences(&self) -> Result<()> {
        for (name, (count, occurs)) in &self.counts {
            if occurs.is_exceeded(*count) {
                return Err(self.invalid(format!(
                    "{} occurs {} times, at most {} allowed",
                    name,
                    count,
                    occurs.max_str()
                )));
            }
        }
        let sequence = match &self.content {
            Some(ElementGrouping::Compositor(c)) if c.model != ModelType::Choice => c,
            _ => return Ok(()),
        };
        for child in &sequence.children {
            if let ElementGrouping::Element(particle) = child {
                let count = self.counts.get(&particle.qname()).map_or(0, |(count, _)| *count);
                if particle.occurs.is_missing(count) {
                    return Err(self.invalid(format!(
                        "{} occurs {} times, at least {} required",
                        particle.qname(),
                        count,
                        particle.occurs.min
                    )));
                }
            }
        }
        Ok(())
    }
}

impl ElementHandler for SchemaElementHandler {
    fn start(&mut self, ctx: &HandlerContext<'_>, start: &StartElement) -> Result<()> {
        let resolver = ctx.resolver(self.schema.clone());

        if let Some(type_name) = start.attributes.get_ns(XSI_NAMESPACE, "type") {
            let qname = ctx.resolve_qname(type_name)?;
            let type_def = resolver.named_type(&qname)?;
            self.set_type(&resolver, type_def)?;
            self.record.type_name = Some(qname);
        }

        if let Some(nil) = start.attributes.get_ns(XSI_NAMESPACE, "nil") {
            if matches!(nil.trim(), "true" | "1") {
                if !self.element.nillable {
                    return Err(self.invalid("element is not nillable"));
                }
                self.nil = true;
            }
        }

        self.read_attributes(ctx, &resolver, start)
    }

    fn child(
        &mut self,
        ctx: &HandlerContext<'_>,
        namespace: &str,
        local_name: &str,
    ) -> Result<Option<Box<dyn ElementHandler>>> {
        let name = QName::namespaced(namespace, local_name);
        if self.type_def == ResolvedType::Builtin(BuiltinType::AnyType) {
            return AnyHandler::new().child(ctx, namespace, local_name);
        }
        if !self.type_def.is_complex() {
            return self.unknown_child(ctx, &name);
        }

        let resolver = ctx.resolver(self.schema.clone());
        match self.find_child(ctx, &resolver, &name)? {
            Some(ChildMatch::Element {
                schema,
                element,
                particle,
                occurs,
            }) => {
                self.counts.entry(particle).or_insert((0, occurs)).0 += 1;
                Ok(Some(Box::new(SchemaElementHandler::new(ctx, schema, element)?)))
            }
            Some(ChildMatch::Wildcard(ProcessContents::Skip)) => {
                Ok(Some(Box::new(AnyHandler::new())))
            }
            Some(ChildMatch::Wildcard(process_contents)) => {
                match ctx.global_element(namespace, local_name) {
                    Some((schema, element)) => {
                        Ok(Some(Box::new(SchemaElementHandler::new(ctx, schema, element)?)))
                    }
                    None if process_contents == ProcessContents::Strict
                        && ctx.strictness() == FilterStrictness::High =>
                    {
                        Err(self.invalid(format!("no declaration for wildcard element {}", name)))
                    }
                    None => Ok(Some(Box::new(AnyHandler::new()))),
                }
            }
            None => self.unknown_child(ctx, &name),
        }
    }

    fn characters(&mut self, _ctx: &HandlerContext<'_>, text: &str) -> Result<()> {
        self.text.push_str(text);
        Ok(())
    }

    fn child_value(
        &mut self,
        _ctx: &HandlerContext<'_>,
        _namespace: &str,
        local_name: &str,
        value: Value,
    ) -> Result<()> {
        self.record.push_field(local_name, value);
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &HandlerContext<'_>) -> Result<Value> {
        if self.nil {
            return Ok(Value::Null);
        }
        if ctx.strictness() == FilterStrictness::High {
            self.check_occurrences()?;
        }
        let resolver = ctx.resolver(self.schema.clone());

        let text = if self.text.is_empty() {
            self.element.default_value().unwrap_or("").to_string()
        } else {
            self.text.clone()
        };
        if let Some(fixed) = self.element.fixed_value() {
            if !self.text.is_empty()
                && self.text.trim() != fixed.trim()
                && ctx.strictness() == FilterStrictness::High
            {
                return Err(self.invalid(format!("value must be '{}'", fixed)));
            }
        }

        match &self.type_def {
            ResolvedType::Builtin(BuiltinType::AnyType) => {
                let handler = AnyHandler {
                    record: self.record.clone(),
                    text: self.text.clone(),
                };
                Box::new(handler).finish(ctx)
            }
            ResolvedType::Builtin(_) | ResolvedType::Simple(_) => {
                let value = self.typed(ctx, &resolver, &self.type_def, &text)?;
                if self.record.attributes.is_empty() && self.record.type_name.is_none() {
                    Ok(value)
                } else {
                    let mut record = self.record.clone();
                    record.content = Some(Box::new(value));
                    Ok(Value::Record(record))
                }
            }
            ResolvedType::Complex(ct) => {
                let mut record = self.record.clone();
                if let Some(content_type) = resolver.simple_content_type(ct)? {
                    let content = self.typed(ctx, &resolver, &content_type, &text)?;
                    record.content = Some(Box::new(content));
                } else if !self.text.trim().is_empty() {
                    if ct.mixed || ctx.strictness() == FilterStrictness::Low {
                        record.content = Some(Box::new(Value::String(self.text.clone())));
                    } else if ctx.strictness() == FilterStrictness::High {
                        return Err(self.invalid("character data in element-only content"));
                    } else {
                        debug!(
                            element = %self.element.name,
                            "skipping text in element-only content"
                        );
                    }
                }
                Ok(Value::Record(record))
            }
        }
    }
}
