//! XSD Document Parsing
//!
//! Builds a [`Schema`] from the event stream of one schema document. The
//! parser keeps a stack of handlers, one per open element. On element start
//! the handler on top is asked which handler takes the child; unknown
//! children get an ignoring handler so extension content is tolerated. On
//! element end the handler is popped, finished into a fragment of the model
//! and handed to its parent.
//!
//! References to other declarations are stored as qualified names and
//! resolved later, so declaration order and import order do not matter.

use tracing::{debug, warn};
use url::Url;

use super::attributes::{Attribute, AttributeGroup, AttributeParticle, AttributeUse};
use super::complex_types::{ComplexType, ContentKind, Derivation, DerivationMethod};
use super::elements::{Element, ValueConstraint};
use super::facets::{Facet, FacetKind};
use super::groups::{Compositor, ElementGrouping, ElementParticle, Group, GroupRef, ModelType};
use super::particles::Occurs;
use super::schemas::{DerivationSet, Import, Schema};
use super::simple_types::{SimpleType, SimpleVariety};
use super::types::TypeRef;
use super::wildcards::{AnyAttribute, AnyWildcard, NamespaceConstraint, ProcessContents};
use crate::error::{Error, Result};
use crate::events::{Attributes, EventReader, XmlEvent};
use crate::limits::Limits;
use crate::locations::resolve_location;
use crate::names::validate_ncname;
use crate::namespaces::{NamespaceContext, QName, XSD_NAMESPACE};

/// XSD element local names
pub(crate) mod xsd_elements {
    pub const SCHEMA: &str = "schema";
    pub const ELEMENT: &str = "element";
    pub const COMPLEX_TYPE: &str = "complexType";
    pub const SIMPLE_TYPE: &str = "simpleType";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const GROUP: &str = "group";
    pub const IMPORT: &str = "import";
    pub const INCLUDE: &str = "include";
    pub const REDEFINE: &str = "redefine";
    pub const RESTRICTION: &str = "restriction";
    pub const EXTENSION: &str = "extension";
    pub const LIST: &str = "list";
    pub const UNION: &str = "union";
    pub const COMPLEX_CONTENT: &str = "complexContent";
    pub const SIMPLE_CONTENT: &str = "simpleContent";
    pub const ANY: &str = "any";
    pub const ANY_ATTRIBUTE: &str = "anyAttribute";
}

/// XSD attribute names
pub(crate) mod xsd_attrs {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const REF: &str = "ref";
    pub const ID: &str = "id";
    pub const VERSION: &str = "version";
    pub const TARGET_NAMESPACE: &str = "targetNamespace";
    pub const ELEMENT_FORM_DEFAULT: &str = "elementFormDefault";
    pub const ATTRIBUTE_FORM_DEFAULT: &str = "attributeFormDefault";
    pub const BLOCK_DEFAULT: &str = "blockDefault";
    pub const FINAL_DEFAULT: &str = "finalDefault";
    pub const BLOCK: &str = "block";
    pub const FINAL: &str = "final";
    pub const NILLABLE: &str = "nillable";
    pub const ABSTRACT: &str = "abstract";
    pub const MIXED: &str = "mixed";
    pub const DEFAULT: &str = "default";
    pub const FIXED: &str = "fixed";
    pub const FORM: &str = "form";
    pub const USE: &str = "use";
    pub const SUBSTITUTION_GROUP: &str = "substitutionGroup";
    pub const MIN_OCCURS: &str = "minOccurs";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const BASE: &str = "base";
    pub const ITEM_TYPE: &str = "itemType";
    pub const MEMBER_TYPES: &str = "memberTypes";
    pub const NAMESPACE: &str = "namespace";
    pub const PROCESS_CONTENTS: &str = "processContents";
    pub const SCHEMA_LOCATION: &str = "schemaLocation";
    pub const VALUE: &str = "value";
}

use xsd_attrs as attr;
use xsd_elements as elem;

/// Parser configuration for one schema document
#[derive(Debug, Clone, Default)]
pub struct SchemaParser {
    base_uri: Option<Url>,
    limits: Limits,
}

impl SchemaParser {
    /// Create a parser with default limits and no base URI
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the URI of the document, used to resolve relative locations
    pub fn with_base_uri(mut self, base_uri: Url) -> Self {
        self.base_uri = Some(base_uri);
        self
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Parse a complete schema document
    pub fn parse(&self, input: &[u8]) -> Result<Schema> {
        self.limits.check_xml_size(input.len())?;
        let mut reader = EventReader::new(input).with_limits(self.limits.clone());
        if let Some(ref base) = self.base_uri {
            reader = reader.with_source(base.to_string());
        }
        let mut builder =
            SchemaBuilder::new(self.base_uri.clone()).with_limits(self.limits.clone());
        while let Some(event) = reader.next_event()? {
            builder.handle(event)?;
        }
        builder.finish()
    }

    /// Build a schema from an already produced event stream
    pub fn parse_events(&self, events: impl IntoIterator<Item = XmlEvent>) -> Result<Schema> {
        let mut builder =
            SchemaBuilder::new(self.base_uri.clone()).with_limits(self.limits.clone());
        for event in events {
            builder.handle(event)?;
        }
        builder.finish()
    }
}

/// Document-wide state shared by the handlers
struct ParseContext {
    namespaces: NamespaceContext,
    target_namespace: String,
    element_form_default: bool,
    attribute_form_default: bool,
    block_default: DerivationSet,
    final_default: DerivationSet,
    base_uri: Option<Url>,
}

impl ParseContext {
    fn tns(&self) -> Option<&str> {
        Some(self.target_namespace.as_str()).filter(|ns| !ns.is_empty())
    }

    /// Resolve a QName-valued attribute
    fn qname(&self, value: &str) -> Result<QName> {
        let value = value.trim();
        self.namespaces
            .resolve(value, self.tns())
            .map_err(|e| Error::structural(format!("cannot resolve '{}': {}", value, e)))
    }

    fn location(&self, reference: &str) -> Option<String> {
        match resolve_location(self.base_uri.as_ref(), reference) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                warn!(location = reference, error = %e, "cannot resolve schema location");
                None
            }
        }
    }
}

/// Which handler a child element gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Schema,
    Element { top_level: bool },
    ComplexType { top_level: bool },
    Content(ContentKind),
    Derivation(ContentKind, DerivationMethod),
    Compositor(ModelType),
    Group { top_level: bool },
    Any,
    Attribute { top_level: bool },
    AttributeGroup { top_level: bool },
    AnyAttribute,
    SimpleType { top_level: bool },
    Restriction,
    List,
    Union,
    Facet(FacetKind),
    Import,
    Include,
    Redefine,
    Ignore,
}

/// Derived content of a complex type
#[derive(Debug)]
struct DerivedContent {
    derivation: Derivation,
    content: Option<ElementGrouping>,
    attributes: Vec<AttributeParticle>,
    any_attribute: Option<AnyAttribute>,
}

/// A finished piece of the model handed to the parent handler
#[derive(Debug)]
enum Fragment {
    Schema(Schema),
    Element {
        element: Element,
        reference: Option<QName>,
        occurs: Occurs,
    },
    ComplexType(ComplexType),
    SimpleType(SimpleType),
    Grouping(ElementGrouping),
    GroupDef(Group),
    Attribute(Attribute),
    AttributeGroupDef(AttributeGroup),
    AttributeGroupRef(QName),
    AnyAttribute(AnyAttribute),
    Content(DerivedContent),
    Variety(SimpleVariety, Vec<Facet>),
    Facet(Facet),
    Import(Import),
    Include(String),
    Nothing,
}

impl Fragment {
    fn describe(&self) -> &'static str {
        match self {
            Fragment::Schema(_) => "schema",
            Fragment::Element { .. } => "element",
            Fragment::ComplexType(_) => "complexType",
            Fragment::SimpleType(_) => "simpleType",
            Fragment::Grouping(g) => g.kind(),
            Fragment::GroupDef(_) => "group",
            Fragment::Attribute(_) => "attribute",
            Fragment::AttributeGroupDef(_) | Fragment::AttributeGroupRef(_) => "attributeGroup",
            Fragment::AnyAttribute(_) => "anyAttribute",
            Fragment::Content(_) => "content",
            Fragment::Variety(v, _) => v.as_str(),
            Fragment::Facet(_) => "facet",
            Fragment::Import(_) => "import",
            Fragment::Include(_) => "include",
            Fragment::Nothing => "nothing",
        }
    }
}

struct ElementState {
    element: Element,
    reference: Option<QName>,
    occurs: Occurs,
}

struct ComplexTypeState {
    complex_type: ComplexType,
    has_model: bool,
}

struct ContentState {
    kind: ContentKind,
    mixed: Option<bool>,
    derived: Option<DerivedContent>,
}

struct DerivationState {
    derived: DerivedContent,
}

struct GroupState {
    definition: Option<Group>,
    reference: Option<GroupRef>,
}

struct AttributeState {
    attribute: Attribute,
    has_type: bool,
}

enum AttributeGroupState {
    Definition(AttributeGroup),
    Reference(QName),
}

struct SimpleTypeState {
    simple_type_name: Option<String>,
    namespace: Option<String>,
    id: Option<String>,
    final_set: DerivationSet,
    variety: Option<(SimpleVariety, Vec<Facet>)>,
}

/// One open element of the schema document
enum Handler {
    Schema(Box<Schema>),
    Element(ElementState),
    ComplexType(ComplexTypeState),
    Content(ContentState),
    Derivation(DerivationState),
    Compositor(Compositor),
    Group(GroupState),
    Any(AnyWildcard),
    Attribute(AttributeState),
    AttributeGroup(AttributeGroupState),
    AnyAttribute(AnyAttribute),
    SimpleType(SimpleTypeState),
    Restriction {
        base: Option<TypeRef>,
        facets: Vec<Facet>,
    },
    List {
        item: Option<TypeRef>,
    },
    Union {
        members: Vec<TypeRef>,
    },
    Facet {
        facet: Facet,
        has_value: bool,
    },
    Import(Import),
    Include(Option<String>),
    Ignore,
}

impl Handler {
    /// Which handler takes a child element
    fn child(&self, namespace: &str, local_name: &str) -> Option<Kind> {
        if namespace != XSD_NAMESPACE {
            return None;
        }
        if let Some(model) = ModelType::from_local_name(local_name) {
            let allowed = match self {
                Handler::ComplexType(_) | Handler::Group(_) => true,
                Handler::Derivation(d) => d.derived.derivation.content == ContentKind::Complex,
                Handler::Compositor(_) => model != ModelType::All,
                _ => false,
            };
            return allowed.then_some(Kind::Compositor(model));
        }

        match (self, local_name) {
            (Handler::Schema(_), elem::ELEMENT) => Some(Kind::Element { top_level: true }),
            (Handler::Schema(_), elem::COMPLEX_TYPE) => Some(Kind::ComplexType { top_level: true }),
            (Handler::Schema(_), elem::SIMPLE_TYPE) => Some(Kind::SimpleType { top_level: true }),
            (Handler::Schema(_), elem::GROUP) => Some(Kind::Group { top_level: true }),
            (Handler::Schema(_), elem::ATTRIBUTE) => Some(Kind::Attribute { top_level: true }),
            (Handler::Schema(_), elem::ATTRIBUTE_GROUP) => {
                Some(Kind::AttributeGroup { top_level: true })
            }
            (Handler::Schema(_), elem::IMPORT) => Some(Kind::Import),
            (Handler::Schema(_), elem::INCLUDE) => Some(Kind::Include),
            (Handler::Schema(_), elem::REDEFINE) => Some(Kind::Redefine),

            (Handler::Element(_), elem::COMPLEX_TYPE) => {
                Some(Kind::ComplexType { top_level: false })
            }
            (Handler::Element(_), elem::SIMPLE_TYPE)
            | (Handler::Attribute(_), elem::SIMPLE_TYPE)
            | (Handler::Restriction { .. }, elem::SIMPLE_TYPE)
            | (Handler::List { .. }, elem::SIMPLE_TYPE)
            | (Handler::Union { .. }, elem::SIMPLE_TYPE) => {
                Some(Kind::SimpleType { top_level: false })
            }

            (Handler::ComplexType(_), elem::SIMPLE_CONTENT) => {
                Some(Kind::Content(ContentKind::Simple))
            }
            (Handler::ComplexType(_), elem::COMPLEX_CONTENT) => {
                Some(Kind::Content(ContentKind::Complex))
            }
            (Handler::ComplexType(_), elem::GROUP)
            | (Handler::Compositor(_), elem::GROUP) => Some(Kind::Group { top_level: false }),
            (Handler::Derivation(d), elem::GROUP)
                if d.derived.derivation.content == ContentKind::Complex =>
            {
                Some(Kind::Group { top_level: false })
            }
            (Handler::ComplexType(_), elem::ATTRIBUTE)
            | (Handler::Derivation(_), elem::ATTRIBUTE)
            | (Handler::AttributeGroup(_), elem::ATTRIBUTE) => {
                Some(Kind::Attribute { top_level: false })
            }
            (Handler::ComplexType(_), elem::ATTRIBUTE_GROUP)
            | (Handler::Derivation(_), elem::ATTRIBUTE_GROUP)
            | (Handler::AttributeGroup(_), elem::ATTRIBUTE_GROUP) => {
                Some(Kind::AttributeGroup { top_level: false })
            }
            (Handler::ComplexType(_), elem::ANY_ATTRIBUTE)
            | (Handler::Derivation(_), elem::ANY_ATTRIBUTE)
            | (Handler::AttributeGroup(_), elem::ANY_ATTRIBUTE) => Some(Kind::AnyAttribute),

            (Handler::Content(c), elem::EXTENSION) => {
                Some(Kind::Derivation(c.kind, DerivationMethod::Extension))
            }
            (Handler::Content(c), elem::RESTRICTION) => {
                Some(Kind::Derivation(c.kind, DerivationMethod::Restriction))
            }

            (Handler::Compositor(_), elem::ELEMENT) => Some(Kind::Element { top_level: false }),
            (Handler::Compositor(_), elem::ANY) => Some(Kind::Any),

            (Handler::SimpleType(_), elem::RESTRICTION) => Some(Kind::Restriction),
            (Handler::SimpleType(_), elem::LIST) => Some(Kind::List),
            (Handler::SimpleType(_), elem::UNION) => Some(Kind::Union),

            (Handler::Restriction { .. }, name) => {
                FacetKind::from_local_name(name).map(Kind::Facet)
            }
            (Handler::Derivation(d), name)
                if d.derived.derivation.content == ContentKind::Simple
                    && d.derived.derivation.method == DerivationMethod::Restriction =>
            {
                FacetKind::from_local_name(name).map(Kind::Facet)
            }

            _ => None,
        }
    }

    /// Create the handler for an element start
    fn start(kind: Kind, attrs: &Attributes, ctx: &mut ParseContext) -> Result<Handler> {
        let id = attrs.get(attr::ID).map(str::to_string);
        let handler = match kind {
            Kind::Schema => Handler::Schema(Box::new(start_schema(attrs, ctx)?)),
            Kind::Element { top_level } => Handler::Element(start_element(attrs, ctx, top_level)?),
            Kind::ComplexType { top_level } => {
                let mut complex_type = if top_level {
                    ComplexType::named(required_name(attrs)?, ctx.tns())
                } else {
                    ComplexType::anonymous()
                };
                complex_type.mixed = parse_bool(attrs, attr::MIXED)?.unwrap_or(false);
                complex_type.is_abstract = parse_bool(attrs, attr::ABSTRACT)?.unwrap_or(false);
                complex_type.block = derivation_set(attrs.get(attr::BLOCK), ctx.block_default)?;
                complex_type.final_set = derivation_set(attrs.get(attr::FINAL), ctx.final_default)?;
                complex_type.id = id;
                Handler::ComplexType(ComplexTypeState {
                    complex_type,
                    has_model: false,
                })
            }
            Kind::Content(kind) => Handler::Content(ContentState {
                kind,
                mixed: parse_bool(attrs, attr::MIXED)?,
                derived: None,
            }),
            Kind::Derivation(content, method) => {
                let base = attrs
                    .get(attr::BASE)
                    .ok_or_else(|| Error::structural("missing required attribute 'base'"))?;
                Handler::Derivation(DerivationState {
                    derived: DerivedContent {
                        derivation: Derivation {
                            content,
                            method,
                            base: ctx.qname(base)?,
                            facets: Vec::new(),
                            mixed: None,
                        },
                        content: None,
                        attributes: Vec::new(),
                        any_attribute: None,
                    },
                })
            }
            Kind::Compositor(model) => {
                let mut compositor = Compositor::new(model);
                compositor.occurs = occurs(attrs)?;
                compositor.id = id;
                Handler::Compositor(compositor)
            }
            Kind::Group { top_level: true } => {
                let mut group = Group::new(required_name(attrs)?, ctx.tns());
                group.id = id;
                Handler::Group(GroupState {
                    definition: Some(group),
                    reference: None,
                })
            }
            Kind::Group { top_level: false } => {
                let name = attrs
                    .get(attr::REF)
                    .ok_or_else(|| Error::structural("local group must have a 'ref' attribute"))?;
                Handler::Group(GroupState {
                    definition: None,
                    reference: Some(GroupRef {
                        name: ctx.qname(name)?,
                        occurs: occurs(attrs)?,
                    }),
                })
            }
            Kind::Any => Handler::Any(AnyWildcard {
                namespace: NamespaceConstraint::parse(
                    attrs.get(attr::NAMESPACE),
                    &ctx.target_namespace,
                )?,
                process_contents: ProcessContents::parse(attrs.get(attr::PROCESS_CONTENTS))?,
                occurs: occurs(attrs)?,
                id,
            }),
            Kind::Attribute { top_level } => {
                Handler::Attribute(start_attribute(attrs, ctx, top_level)?)
            }
            Kind::AttributeGroup { top_level: true } => {
                let mut group = AttributeGroup::new(required_name(attrs)?, ctx.tns());
                group.id = id;
                Handler::AttributeGroup(AttributeGroupState::Definition(group))
            }
            Kind::AttributeGroup { top_level: false } => {
                let name = attrs.get(attr::REF).ok_or_else(|| {
                    Error::structural("local attributeGroup must have a 'ref' attribute")
                })?;
                Handler::AttributeGroup(AttributeGroupState::Reference(ctx.qname(name)?))
            }
            Kind::AnyAttribute => Handler::AnyAttribute(AnyAttribute {
                namespace: NamespaceConstraint::parse(
                    attrs.get(attr::NAMESPACE),
                    &ctx.target_namespace,
                )?,
                process_contents: ProcessContents::parse(attrs.get(attr::PROCESS_CONTENTS))?,
                id,
            }),
            Kind::SimpleType { top_level } => Handler::SimpleType(SimpleTypeState {
                simple_type_name: if top_level {
                    Some(required_name(attrs)?)
                } else {
                    None
                },
                namespace: if top_level { ctx.tns().map(str::to_string) } else { None },
                id,
                final_set: derivation_set(attrs.get(attr::FINAL), ctx.final_default)?,
                variety: None,
            }),
            Kind::Restriction => Handler::Restriction {
                base: attrs
                    .get(attr::BASE)
                    .map(|b| ctx.qname(b))
                    .transpose()?
                    .map(TypeRef::Named),
                facets: Vec::new(),
            },
            Kind::List => Handler::List {
                item: attrs
                    .get(attr::ITEM_TYPE)
                    .map(|t| ctx.qname(t))
                    .transpose()?
                    .map(TypeRef::Named),
            },
            Kind::Union => Handler::Union {
                members: attrs
                    .get(attr::MEMBER_TYPES)
                    .unwrap_or("")
                    .split_whitespace()
                    .map(|m| ctx.qname(m).map(TypeRef::Named))
                    .collect::<Result<Vec<_>>>()?,
            },
            Kind::Facet(kind) => Handler::Facet {
                facet: Facet {
                    kind,
                    value: attrs.get(attr::VALUE).unwrap_or("").to_string(),
                    fixed: parse_bool(attrs, attr::FIXED)?.unwrap_or(false),
                },
                has_value: attrs.get(attr::VALUE).is_some(),
            },
            Kind::Import => {
                let namespace = attrs.get(attr::NAMESPACE).unwrap_or("").to_string();
                let prefix = ctx
                    .namespaces
                    .prefix_for(&namespace)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string);
                Handler::Import(Import {
                    location: attrs.get(attr::SCHEMA_LOCATION).and_then(|l| ctx.location(l)),
                    namespace,
                    prefix,
                })
            }
            Kind::Include => Handler::Include(include_location(attrs, ctx)?),
            Kind::Redefine => {
                let location = include_location(attrs, ctx)?;
                warn!(
                    location = location.as_deref().unwrap_or(""),
                    "redefine is treated as include; redefinitions are not applied"
                );
                Handler::Include(location)
            }
            Kind::Ignore => Handler::Ignore,
        };
        Ok(handler)
    }

    fn characters(&mut self, text: &str) {
        if let Handler::Facet { facet, has_value: false } = self {
            facet.value.push_str(text);
        }
    }

    /// Wire a finished child into this handler
    fn accept(&mut self, fragment: Fragment) -> Result<()> {
        match (self, fragment) {
            (_, Fragment::Nothing) => {}

            (Handler::Schema(schema), fragment) => accept_top_level(schema, fragment)?,

            (Handler::Element(state), Fragment::ComplexType(ct)) => {
                let inline = TypeRef::inline_complex(ct);
                set_inline_type(&mut state.element.type_ref, inline, &state.element.name)?
            }
            (Handler::Element(state), Fragment::SimpleType(st)) => {
                let inline = TypeRef::inline_simple(st);
                set_inline_type(&mut state.element.type_ref, inline, &state.element.name)?
            }
            (Handler::Attribute(state), Fragment::SimpleType(st)) => {
                if state.has_type {
                    return Err(Error::structural(format!(
                        "attribute '{}' has both a type attribute and an inline type",
                        state.attribute.name
                    )));
                }
                state.has_type = true;
                state.attribute.type_ref = Some(TypeRef::inline_simple(st));
            }

            (Handler::ComplexType(state), Fragment::Grouping(grouping)) => {
                state.take_model()?;
                state.complex_type.content = Some(grouping);
            }
            (Handler::ComplexType(state), Fragment::Content(derived)) => {
                state.take_model()?;
                let ct = &mut state.complex_type;
                if let Some(mixed) = derived.derivation.mixed {
                    ct.mixed = ct.mixed || mixed;
                }
                ct.content = derived.content;
                ct.attributes.extend(derived.attributes);
                if derived.any_attribute.is_some() {
                    ct.any_attribute = derived.any_attribute;
                }
                ct.derivation = Some(derived.derivation);
            }
            (Handler::ComplexType(state), Fragment::Attribute(a)) => {
                state.complex_type.attributes.push(AttributeParticle::Attribute(a))
            }
            (Handler::ComplexType(state), Fragment::AttributeGroupRef(q)) => {
                state.complex_type.attributes.push(AttributeParticle::GroupRef(q))
            }
            (Handler::ComplexType(state), Fragment::AnyAttribute(a)) => {
                state.complex_type.any_attribute = Some(a)
            }

            (Handler::Content(state), Fragment::Content(mut derived)) => {
                if state.derived.is_some() {
                    return Err(Error::structural(format!(
                        "{} may contain only one derivation",
                        state.kind.as_str()
                    )));
                }
                derived.derivation.mixed = state.mixed;
                state.derived = Some(derived);
            }

            (Handler::Derivation(state), Fragment::Grouping(grouping)) => {
                if state.derived.content.is_some() {
                    return Err(Error::structural("derivation may contain only one content model"));
                }
                state.derived.content = Some(grouping);
            }
            (Handler::Derivation(state), Fragment::Attribute(a)) => {
                state.derived.attributes.push(AttributeParticle::Attribute(a))
            }
            (Handler::Derivation(state), Fragment::AttributeGroupRef(q)) => {
                state.derived.attributes.push(AttributeParticle::GroupRef(q))
            }
            (Handler::Derivation(state), Fragment::AnyAttribute(a)) => {
                state.derived.any_attribute = Some(a)
            }
            (Handler::Derivation(state), Fragment::Facet(f)) => {
                state.derived.derivation.facets.push(f)
            }

            (Handler::Compositor(compositor), Fragment::Grouping(grouping)) => {
                compositor.children.push(grouping)
            }
            (Handler::Compositor(compositor), Fragment::Element { element, reference, occurs }) => {
                let particle = match reference {
                    Some(name) => ElementParticle::reference(name),
                    None => ElementParticle::declared(element),
                };
                compositor
                    .children
                    .push(ElementGrouping::Element(particle.with_occurs(occurs)));
            }

            (Handler::Group(state), Fragment::Grouping(grouping)) => {
                match state.definition.as_mut() {
                    Some(group) if group.grouping.is_none() => group.grouping = Some(grouping),
                    Some(group) => {
                        return Err(Error::structural(format!(
                            "group '{}' may contain only one compositor",
                            group.name
                        )))
                    }
                    None => return Err(Error::structural("group reference cannot have content")),
                }
            }

            (
                Handler::AttributeGroup(AttributeGroupState::Definition(group)),
                Fragment::Attribute(a),
            ) => {
                group.attributes.push(AttributeParticle::Attribute(a))
            }
            (
                Handler::AttributeGroup(AttributeGroupState::Definition(group)),
                Fragment::AttributeGroupRef(q),
            ) => group.attributes.push(AttributeParticle::GroupRef(q)),
            (
                Handler::AttributeGroup(AttributeGroupState::Definition(group)),
                Fragment::AnyAttribute(a),
            ) => group.any_attribute = Some(a),

            (Handler::SimpleType(state), Fragment::Variety(variety, facets)) => {
                if state.variety.is_some() {
                    return Err(Error::structural("simpleType may contain only one derivation"));
                }
                state.variety = Some((variety, facets));
            }
            (Handler::Restriction { base, .. }, Fragment::SimpleType(st)) => {
                if base.is_some() {
                    return Err(Error::structural(
                        "restriction has both a base attribute and an inline base type",
                    ));
                }
                *base = Some(TypeRef::inline_simple(st));
            }
            (Handler::Restriction { facets, .. }, Fragment::Facet(f)) => facets.push(f),
            (Handler::List { item }, Fragment::SimpleType(st)) => {
                if item.is_some() {
                    return Err(Error::structural(
                        "list has both an itemType attribute and an inline item type",
                    ));
                }
                *item = Some(TypeRef::inline_simple(st));
            }
            (Handler::Union { members }, Fragment::SimpleType(st)) => {
                members.push(TypeRef::inline_simple(st))
            }

            (_, fragment) => {
                return Err(Error::structural(format!(
                    "unexpected {} in this context",
                    fragment.describe()
                )))
            }
        }
        Ok(())
    }

    /// Complete this handler into a fragment for its parent
    fn finish(self) -> Result<Fragment> {
        let fragment = match self {
            Handler::Schema(schema) => Fragment::Schema(*schema),
            Handler::Element(state) => Fragment::Element {
                element: state.element,
                reference: state.reference,
                occurs: state.occurs,
            },
            Handler::ComplexType(state) => Fragment::ComplexType(state.complex_type),
            Handler::Content(state) => match state.derived {
                Some(derived) => Fragment::Content(derived),
                None => {
                    return Err(Error::structural(format!(
                        "{} requires an extension or restriction",
                        state.kind.as_str()
                    )))
                }
            },
            Handler::Derivation(state) => {
                if let Some(ref content) = state.derived.content {
                    content.check()?;
                }
                Fragment::Content(state.derived)
            }
            Handler::Compositor(compositor) => {
                let grouping = ElementGrouping::Compositor(compositor);
                grouping.check()?;
                Fragment::Grouping(grouping)
            }
            Handler::Group(GroupState {
                definition: Some(group),
                ..
            }) => Fragment::GroupDef(group),
            Handler::Group(GroupState {
                reference: Some(reference),
                ..
            }) => Fragment::Grouping(ElementGrouping::Group(reference)),
            Handler::Group(_) => Fragment::Nothing,
            Handler::Any(any) => Fragment::Grouping(ElementGrouping::Any(any)),
            Handler::Attribute(state) => Fragment::Attribute(state.attribute),
            Handler::AttributeGroup(AttributeGroupState::Definition(group)) => {
                Fragment::AttributeGroupDef(group)
            }
            Handler::AttributeGroup(AttributeGroupState::Reference(name)) => {
                Fragment::AttributeGroupRef(name)
            }
            Handler::AnyAttribute(any) => Fragment::AnyAttribute(any),
            Handler::SimpleType(state) => {
                let (variety, facets) = state.variety.ok_or_else(|| {
                    Error::structural("simpleType requires a restriction, list or union")
                })?;
                Fragment::SimpleType(SimpleType {
                    name: state.simple_type_name,
                    namespace: state.namespace,
                    id: state.id,
                    final_set: state.final_set,
                    variety,
                    facets,
                })
            }
            Handler::Restriction { base, facets } => {
                let base = base.ok_or_else(|| {
                    Error::structural(
                        "restriction requires a base attribute or an inline base type",
                    )
                })?;
                Fragment::Variety(SimpleVariety::Restriction(base), facets)
            }
            Handler::List { item } => {
                let item = item.ok_or_else(|| {
                    Error::structural("list requires an itemType attribute or an inline item type")
                })?;
                Fragment::Variety(SimpleVariety::List(item), Vec::new())
            }
            Handler::Union { members } => {
                if members.is_empty() {
                    return Err(Error::structural("union requires at least one member type"));
                }
                Fragment::Variety(SimpleVariety::Union(members), Vec::new())
            }
            Handler::Facet { mut facet, .. } => {
                if facet.kind != FacetKind::Pattern {
                    facet.value = facet.value.trim().to_string();
                }
                Fragment::Facet(facet)
            }
            Handler::Import(import) => Fragment::Import(import),
            Handler::Include(Some(location)) => Fragment::Include(location),
            Handler::Include(None) | Handler::Ignore => Fragment::Nothing,
        };
        Ok(fragment)
    }
}

impl ComplexTypeState {
    fn take_model(&mut self) -> Result<()> {
        if self.has_model {
            return Err(Error::structural(format!(
                "complexType '{}' may contain only one content model",
                self.complex_type.name.as_deref().unwrap_or("(anonymous)")
            )));
        }
        self.has_model = true;
        Ok(())
    }
}

fn accept_top_level(schema: &mut Schema, fragment: Fragment) -> Result<()> {
    let namespace = schema.target_namespace.clone();
    let (kind, name, added) = match fragment {
        Fragment::Element { element, .. } => {
            let name = element.name.clone();
            ("element", name, schema.add_element(element))
        }
        Fragment::ComplexType(ct) => {
            let name = ct.name.clone().unwrap_or_default();
            ("complexType", name, schema.add_complex_type(ct))
        }
        Fragment::SimpleType(st) => {
            let name = st.name.clone().unwrap_or_default();
            ("simpleType", name, schema.add_simple_type(st))
        }
        Fragment::GroupDef(group) => {
            let name = group.name.clone();
            ("group", name, schema.add_group(group))
        }
        Fragment::Attribute(a) => {
            let name = a.name.clone();
            ("attribute", name, schema.add_attribute(a))
        }
        Fragment::AttributeGroupDef(group) => {
            let name = group.name.clone();
            ("attributeGroup", name, schema.add_attribute_group(group))
        }
        Fragment::Import(import) => {
            let name = import.namespace.clone();
            ("import", name, schema.add_import(import))
        }
        Fragment::Include(location) => {
            if !schema.includes.contains(&location) {
                schema.includes.push(location);
            }
            return Ok(());
        }
        other => {
            return Err(Error::structural(format!(
                "unexpected top-level {}",
                other.describe()
            )))
        }
    };
    if !added {
        warn!(
            namespace = %namespace,
            kind,
            name = %name,
            "duplicate declaration; keeping the first"
        );
    }
    Ok(())
}

fn set_inline_type(slot: &mut Option<TypeRef>, type_ref: TypeRef, name: &str) -> Result<()> {
    if slot.is_some() {
        return Err(Error::structural(format!(
            "element '{}' has both a type attribute and an inline type",
            name
        )));
    }
    *slot = Some(type_ref);
    Ok(())
}

fn start_schema(attrs: &Attributes, ctx: &mut ParseContext) -> Result<Schema> {
    ctx.target_namespace = attrs.get(attr::TARGET_NAMESPACE).unwrap_or("").trim().to_string();
    ctx.element_form_default = is_qualified(attrs.get(attr::ELEMENT_FORM_DEFAULT));
    ctx.attribute_form_default = is_qualified(attrs.get(attr::ATTRIBUTE_FORM_DEFAULT));
    ctx.block_default = DerivationSet::parse(attrs.get(attr::BLOCK_DEFAULT))?;
    ctx.final_default = DerivationSet::parse(attrs.get(attr::FINAL_DEFAULT))?;

    let mut schema = Schema::new(ctx.target_namespace.clone());
    schema.id = attrs.get(attr::ID).map(str::to_string);
    schema.version = attrs.get(attr::VERSION).map(str::to_string);
    schema.element_form_default = ctx.element_form_default;
    schema.attribute_form_default = ctx.attribute_form_default;
    schema.block_default = ctx.block_default;
    schema.final_default = ctx.final_default;
    if !ctx.target_namespace.is_empty() {
        schema.prefix = ctx
            .namespaces
            .prefix_for(&ctx.target_namespace)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
    }
    if let Some(ref uri) = ctx.base_uri {
        schema = schema.with_uri(uri.clone());
    }
    Ok(schema)
}

fn start_element(attrs: &Attributes, ctx: &ParseContext, top_level: bool) -> Result<ElementState> {
    let reference = match (top_level, attrs.get(attr::REF)) {
        (false, Some(r)) => Some(ctx.qname(r)?),
        (true, Some(_)) => {
            return Err(Error::structural("global element cannot have a 'ref' attribute"))
        }
        (_, None) => None,
    };

    let mut element = match &reference {
        Some(r) => Element::new(r.local_name.clone(), r.namespace.as_deref()),
        None => {
            let name = required_name(attrs)?;
            let qualified = top_level
                || match attrs.get(attr::FORM) {
                    Some(form) => is_qualified(Some(form)),
                    None => ctx.element_form_default,
                };
            Element::new(name, if qualified { ctx.tns() } else { None })
        }
    };

    if let Some(type_name) = attrs.get(attr::TYPE) {
        element.type_ref = Some(TypeRef::Named(ctx.qname(type_name)?));
    }
    element.nillable = parse_bool(attrs, attr::NILLABLE)?.unwrap_or(false);
    element.is_abstract = parse_bool(attrs, attr::ABSTRACT)?.unwrap_or(false);
    element.value_constraint = value_constraint(attrs)?;
    element.substitution_group = attrs
        .get(attr::SUBSTITUTION_GROUP)
        .map(|s| ctx.qname(s))
        .transpose()?;
    element.block = derivation_set(attrs.get(attr::BLOCK), ctx.block_default)?;
    element.final_set = derivation_set(attrs.get(attr::FINAL), ctx.final_default)?;
    element.id = attrs.get(attr::ID).map(str::to_string);

    Ok(ElementState {
        element,
        reference,
        occurs: if top_level { Occurs::once() } else { occurs(attrs)? },
    })
}

fn start_attribute(
    attrs: &Attributes,
    ctx: &ParseContext,
    top_level: bool,
) -> Result<AttributeState> {
    let mut attribute = match (top_level, attrs.get(attr::REF)) {
        (false, Some(r)) => {
            let reference = ctx.qname(r)?;
            let mut attribute =
                Attribute::new(reference.local_name.clone(), reference.namespace.as_deref());
            attribute.reference = Some(reference);
            attribute
        }
        (true, Some(_)) => {
            return Err(Error::structural("global attribute cannot have a 'ref' attribute"))
        }
        (_, None) => {
            let name = required_name(attrs)?;
            let qualified = match attrs.get(attr::FORM) {
                Some(form) => is_qualified(Some(form)),
                None => {
                    (top_level && !ctx.target_namespace.is_empty()) || ctx.attribute_form_default
                }
            };
            Attribute::new(name, if qualified { ctx.tns() } else { None })
        }
    };

    let has_type = match attrs.get(attr::TYPE) {
        Some(type_name) => {
            attribute.type_ref = Some(TypeRef::Named(ctx.qname(type_name)?));
            true
        }
        None => false,
    };
    attribute.use_ = AttributeUse::parse(attrs.get(attr::USE))?;
    attribute.value_constraint = value_constraint(attrs)?;
    attribute.id = attrs.get(attr::ID).map(str::to_string);
    Ok(AttributeState { attribute, has_type })
}

fn include_location(attrs: &Attributes, ctx: &ParseContext) -> Result<Option<String>> {
    let location = attrs
        .get(attr::SCHEMA_LOCATION)
        .ok_or_else(|| Error::structural("missing required attribute 'schemaLocation'"))?;
    Ok(ctx.location(location))
}

fn required_name(attrs: &Attributes) -> Result<String> {
    let name = attrs
        .get(attr::NAME)
        .map(str::trim)
        .ok_or_else(|| Error::structural("missing required attribute 'name'"))?;
    validate_ncname(name).map_err(|e| Error::structural(e.to_string()))?;
    Ok(name.to_string())
}

fn occurs(attrs: &Attributes) -> Result<Occurs> {
    Occurs::parse(attrs.get(attr::MIN_OCCURS), attrs.get(attr::MAX_OCCURS))
}

fn value_constraint(attrs: &Attributes) -> Result<Option<ValueConstraint>> {
    let (default, fixed) = (attrs.get(attr::DEFAULT), attrs.get(attr::FIXED));
    if default.is_some() && fixed.is_some() {
        return Err(Error::structural(
            "'default' and 'fixed' attributes are mutually exclusive",
        ));
    }
    Ok(ValueConstraint::from_attributes(default, fixed))
}

fn derivation_set(value: Option<&str>, default: DerivationSet) -> Result<DerivationSet> {
    match value {
        Some(v) => DerivationSet::parse(Some(v)),
        None => Ok(default),
    }
}

fn parse_bool(attrs: &Attributes, name: &str) -> Result<Option<bool>> {
    match attrs.get(name).map(str::trim) {
        None => Ok(None),
        Some("true") | Some("1") => Ok(Some(true)),
        Some("false") | Some("0") => Ok(Some(false)),
        Some(other) => Err(Error::structural(format!(
            "invalid boolean '{}' for attribute '{}'",
            other, name
        ))),
    }
}

fn is_qualified(value: Option<&str>) -> bool {
    value.map_or(false, |v| v.trim().eq_ignore_ascii_case("qualified"))
}

/// Drives the handler stack from document events
struct SchemaBuilder {
    stack: Vec<Handler>,
    ctx: ParseContext,
    limits: Limits,
    scope_open: bool,
    result: Option<Schema>,
}

impl SchemaBuilder {
    fn new(base_uri: Option<Url>) -> Self {
        Self {
            stack: Vec::new(),
            ctx: ParseContext {
                namespaces: NamespaceContext::new(),
                target_namespace: String::new(),
                element_form_default: false,
                attribute_form_default: false,
                block_default: DerivationSet::EMPTY,
                final_default: DerivationSet::EMPTY,
                base_uri,
            },
            limits: Limits::default(),
            scope_open: false,
            result: None,
        }
    }

    fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    fn handle(&mut self, event: XmlEvent) -> Result<()> {
        match event {
            XmlEvent::StartPrefixMapping { prefix, uri } => {
                if !self.scope_open {
                    self.ctx.namespaces.push_scope();
                    self.scope_open = true;
                }
                self.ctx.namespaces.add_prefix(prefix, uri);
                self.limits.check_namespaces(self.ctx.namespaces.len())?;
            }
            XmlEvent::StartElement(start) => {
                if !self.scope_open {
                    self.ctx.namespaces.push_scope();
                }
                self.scope_open = false;
                self.limits.check_xml_depth(self.stack.len() + 1)?;

                let kind = match self.stack.last() {
                    None if self.result.is_some() => {
                        return Err(Error::malformed("content after the schema element")
                            .at(start.position))
                    }
                    None if start.namespace == XSD_NAMESPACE
                        && start.local_name == elem::SCHEMA =>
                    {
                        Kind::Schema
                    }
                    None => {
                        return Err(Error::structural(format!(
                            "document root {{{}}}{} is not an XML Schema",
                            start.namespace, start.local_name
                        ))
                        .at(start.position))
                    }
                    Some(parent) => match parent.child(&start.namespace, &start.local_name) {
                        Some(kind) => kind,
                        None => {
                            debug!(
                                namespace = %start.namespace,
                                element = %start.local_name,
                                "ignoring schema element"
                            );
                            Kind::Ignore
                        }
                    },
                };
                let handler = Handler::start(kind, &start.attributes, &mut self.ctx)
                    .map_err(|e| e.located(&start.local_name, start.position))?;
                self.stack.push(handler);
            }
            XmlEvent::Characters(text) => {
                if let Some(top) = self.stack.last_mut() {
                    top.characters(&text);
                }
            }
            XmlEvent::EndElement {
                local_name,
                position,
                ..
            } => {
                let handler = self
                    .stack
                    .pop()
                    .ok_or_else(|| Error::malformed("unbalanced end element").at(position))?;
                let fragment = handler
                    .finish()
                    .map_err(|e| e.located(&local_name, position))?;
                match self.stack.last_mut() {
                    Some(parent) => parent
                        .accept(fragment)
                        .map_err(|e| e.located(&local_name, position))?,
                    None => {
                        if let Fragment::Schema(schema) = fragment {
                            self.result = Some(schema);
                        }
                    }
                }
                self.ctx.namespaces.pop_scope();
            }
            XmlEvent::EndPrefixMapping { .. } => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<Schema> {
        if !self.stack.is_empty() {
            return Err(Error::malformed("unexpected end of schema document"));
        }
        self.result
            .ok_or_else(|| Error::malformed("document has no schema element"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::groups::ElementTerm;

    fn parse(xsd: &str) -> Result<Schema> {
        SchemaParser::new().parse(xsd.as_bytes())
    }

    const PURCHASE: &str = r###"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:po="urn:po" targetNamespace="urn:po"
           elementFormDefault="Qualified" version="1.1">
  <xs:annotation><xs:documentation>Purchase orders</xs:documentation></xs:annotation>
  <xs:element name="order" type="po:Order"/>
  <xs:element name="comment" type="xs:string"/>
  <xs:complexType name="Order">
    <xs:sequence>
      <xs:element name="item" type="po:Item" maxOccurs="unbounded"/>
      <xs:element ref="po:comment" minOccurs="0"/>
      <xs:choice>
        <xs:element name="ship" type="xs:string"/>
        <xs:element name="pickup" type="xs:boolean"/>
      </xs:choice>
      <xs:any namespace="##other" processContents="lax" minOccurs="0"/>
    </xs:sequence>
    <xs:attribute name="id" type="xs:ID" use="required"/>
    <xs:attributeGroup ref="po:audit"/>
  </xs:complexType>
  <xs:complexType name="Item">
    <xs:simpleContent>
      <xs:extension base="po:Sku">
        <xs:attribute name="qty" type="xs:positiveInteger" default="1"/>
      </xs:extension>
    </xs:simpleContent>
  </xs:complexType>
  <xs:simpleType name="Sku">
    <xs:restriction base="xs:string">
      <xs:pattern value="\d{3}-[A-Z]{2}"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:attributeGroup name="audit">
    <xs:attribute name="created" type="xs:dateTime"/>
  </xs:attributeGroup>
  <xs:group name="extras">
    <xs:sequence><xs:element name="note" type="xs:string"/></xs:sequence>
  </xs:group>
</xs:schema>"###;

    #[test]
    fn test_parse_top_level_declarations() {
        let schema = parse(PURCHASE).unwrap();
        assert_eq!(schema.target_namespace, "urn:po");
        assert_eq!(schema.prefix.as_deref(), Some("po"));
        assert_eq!(schema.version.as_deref(), Some("1.1"));
        assert!(schema.element_form_default);
        assert_eq!(schema.elements.keys().collect::<Vec<_>>(), vec!["order", "comment"]);
        assert_eq!(schema.complex_types.len(), 2);
        assert!(schema.simple_type("Sku").is_some());
        assert!(schema.attribute_group("audit").is_some());
        assert!(schema.group("extras").is_some());
    }

    #[test]
    fn test_parse_content_model() {
        let schema = parse(PURCHASE).unwrap();
        let order = schema.complex_type("Order").unwrap();
        let sequence = match order.content.as_ref().unwrap() {
            ElementGrouping::Compositor(c) => c,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(sequence.model, ModelType::Sequence);
        assert_eq!(sequence.children.len(), 4);

        match &sequence.children[0] {
            ElementGrouping::Element(p) => {
                assert_eq!(p.local_name(), "item");
                assert_eq!(p.occurs, Occurs::one_or_more());
                assert_eq!(p.qname(), QName::namespaced("urn:po", "item"));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &sequence.children[1] {
            ElementGrouping::Element(p) => {
                assert!(matches!(&p.term, ElementTerm::Reference(q) if q.local_name == "comment"));
                assert_eq!(p.occurs, Occurs::optional());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(sequence.children[2].kind(), "choice");
        match &sequence.children[3] {
            ElementGrouping::Any(any) => {
                assert_eq!(any.process_contents, ProcessContents::Lax);
                assert!(any.namespace.admits("urn:other"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(order.attributes.len(), 2);
    }

    #[test]
    fn test_parse_simple_content() {
        let schema = parse(PURCHASE).unwrap();
        let item = schema.complex_type("Item").unwrap();
        assert!(item.has_simple_content());
        let derivation = item.derivation.as_ref().unwrap();
        assert_eq!(derivation.method, DerivationMethod::Extension);
        assert_eq!(derivation.base, QName::namespaced("urn:po", "Sku"));
        assert_eq!(item.attributes.len(), 1);
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let schema = parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:element name="a" type="xs:int"/>
                 <xs:element name="a" type="xs:string"/>
               </xs:schema>"#,
        )
        .unwrap();
        assert_eq!(schema.elements.len(), 1);
        assert_eq!(
            schema.element("a").unwrap().type_ref,
            Some(TypeRef::Named(QName::namespaced(XSD_NAMESPACE, "int")))
        );
    }

    #[test]
    fn test_default_and_fixed_rejected() {
        let err = parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:element name="a" type="xs:int" default="1" fixed="1"/>
               </xs:schema>"#,
        )
        .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_bad_occurs_rejected_with_position() {
        let err = parse(
            "<xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\">\n\
             <xs:complexType name=\"T\"><xs:sequence>\n\
             <xs:element name=\"a\" minOccurs=\"3\" maxOccurs=\"2\"/>\n\
             </xs:sequence></xs:complexType></xs:schema>",
        )
        .unwrap_err();
        match err {
            Error::Structural(e) => {
                assert_eq!(e.element.as_deref(), Some("element"));
                assert_eq!(e.position.map(|p| p.line), Some(3));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_two_content_models_rejected() {
        let err = parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:complexType name="T">
                   <xs:sequence><xs:element name="a"/></xs:sequence>
                   <xs:choice><xs:element name="b"/></xs:choice>
                 </xs:complexType>
               </xs:schema>"#,
        )
        .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_empty_compositor_rejected() {
        let err = parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:complexType name="T"><xs:sequence/></xs:complexType>
               </xs:schema>"#,
        )
        .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_unknown_content_is_ignored() {
        let schema = parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:ext="urn:ext">
                 <ext:metadata><ext:owner>someone</ext:owner></ext:metadata>
                 <xs:notation name="gif" public="image/gif"/>
                 <xs:element name="a" type="xs:int"/>
               </xs:schema>"#,
        )
        .unwrap();
        assert_eq!(schema.elements.len(), 1);
    }

    #[test]
    fn test_non_schema_root_rejected() {
        assert!(parse("<root/>").unwrap_err().is_structural());
        assert!(parse("<xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\">")
            .unwrap_err()
            .is_malformed());
    }

    #[test]
    fn test_imports_and_includes_are_recorded() {
        let base = Url::parse("file:///schemas/main.xsd").unwrap();
        let schema = SchemaParser::new()
            .with_base_uri(base.clone())
            .parse(
                br#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                               xmlns:gml="http://www.opengis.net/gml"
                               targetNamespace="urn:main">
                      <xs:import namespace="http://www.opengis.net/gml" schemaLocation="gml/base.xsd"/>
                      <xs:include schemaLocation="part.xsd"/>
                    </xs:schema>"#,
            )
            .unwrap();
        let import = schema.import("http://www.opengis.net/gml").unwrap();
        assert_eq!(import.prefix.as_deref(), Some("gml"));
        assert_eq!(import.location.as_deref(), Some("file:///schemas/gml/base.xsd"));
        assert_eq!(schema.includes, vec!["file:///schemas/part.xsd".to_string()]);
        assert_eq!(schema.uri.as_ref(), Some(&base));
    }

    #[test]
    fn test_local_element_form() {
        let schema = parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t">
                 <xs:complexType name="T">
                   <xs:sequence>
                     <xs:element name="plain" type="xs:string"/>
                     <xs:element name="qual" type="xs:string" form="qualified"/>
                   </xs:sequence>
                 </xs:complexType>
               </xs:schema>"#,
        )
        .unwrap();
        let content = schema.complex_type("T").unwrap().content.clone().unwrap();
        let particles = content.element_particles();
        assert_eq!(particles[0].qname(), QName::local("plain"));
        assert_eq!(particles[1].qname(), QName::namespaced("urn:t", "qual"));
    }

    #[test]
    fn test_simple_type_varieties() {
        let schema = parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:simpleType name="Ints"><xs:list itemType="xs:int"/></xs:simpleType>
                 <xs:simpleType name="IntOrDate">
                   <xs:union memberTypes="xs:int">
                     <xs:simpleType><xs:restriction base="xs:date"/></xs:simpleType>
                   </xs:union>
                 </xs:simpleType>
                 <xs:simpleType name="Colour">
                   <xs:restriction base="xs:token">
                     <xs:enumeration value="red"/>
                     <xs:enumeration value="green"/>
                   </xs:restriction>
                 </xs:simpleType>
               </xs:schema>"#,
        )
        .unwrap();
        assert!(matches!(schema.simple_type("Ints").unwrap().variety, SimpleVariety::List(_)));
        match &schema.simple_type("IntOrDate").unwrap().variety {
            SimpleVariety::Union(members) => assert_eq!(members.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(schema.simple_type("Colour").unwrap().facets.len(), 2);
    }
}
