//! Instance document parser
//!
//! Drives a stack of [`ElementHandler`]s over the event stream of one
//! instance document and returns the value of the document element.

use tracing::{debug, warn};

use super::config::{FilterStrictness, ParserConfig};
use super::handlers::{AnyHandler, ElementHandler, HandlerContext, IgnoreHandler};
use crate::error::{Error, Result};
use crate::events::{EventReader, StartElement, XmlEvent};
use crate::locations::resolve_location;
use crate::namespaces::{QName, XSI_NAMESPACE};
use crate::registry::SchemaRegistry;
use crate::value::Value;

/// Result of parsing one instance document
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// Name of the document element
    pub name: QName,
    /// Value of the document element
    pub value: Value,
    /// Streamed children of the document element, when streaming without a
    /// sink
    pub items: Vec<(QName, Value)>,
}

/// Parses instance documents into [`Value`]s
pub struct InstanceParser<'r> {
    registry: &'r SchemaRegistry,
    config: ParserConfig,
}

impl<'r> InstanceParser<'r> {
    /// Create a parser with the default configuration
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            config: ParserConfig::default(),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// The configuration in use
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a document
    ///
    /// In streaming mode the children of the document element are collected
    /// in [`ParsedDocument::items`].
    pub fn parse(&self, input: &[u8]) -> Result<ParsedDocument> {
        let mut items = Vec::new();
        let mut document = self.parse_streaming(input, |name, value| {
            items.push((name, value));
            Ok(())
        })?;
        document.items = items;
        Ok(document)
    }

    /// Parse a document, passing the completed children of the document
    /// element to `sink` when streaming is enabled
    pub fn parse_streaming<F>(&self, input: &[u8], mut sink: F) -> Result<ParsedDocument>
    where
        F: FnMut(QName, Value) -> Result<()>,
    {
        let mut reader = EventReader::new(input).with_limits(self.config.limits.clone());
        if let Some(base) = &self.config.base_uri {
            reader = reader.with_source(base.as_str());
        }
        let events = std::iter::from_fn(move || reader.next_event().transpose());
        self.run(events, &mut sink)
    }

    /// Parse an already produced event stream
    pub fn parse_events(
        &self,
        events: impl IntoIterator<Item = XmlEvent>,
    ) -> Result<ParsedDocument> {
        let mut items = Vec::new();
        let mut sink = |name: QName, value: Value| -> Result<()> {
            items.push((name, value));
            Ok(())
        };
        let mut document = self.run(events.into_iter().map(Ok), &mut sink)?;
        document.items = items;
        Ok(document)
    }

    fn run(
        &self,
        events: impl Iterator<Item = Result<XmlEvent>>,
        sink: &mut dyn FnMut(QName, Value) -> Result<()>,
    ) -> Result<ParsedDocument> {
        let mut builder = DocumentBuilder {
            config: &self.config,
            ctx: HandlerContext::new(
                self.registry,
                self.config.strictness,
                self.config.limits.clone(),
            ),
            stack: Vec::new(),
            scope_open: false,
            root_prefixes: Vec::new(),
            result: None,
            sink,
        };
        for event in events {
            builder.handle(event?)?;
        }
        builder.finish()
    }
}

struct Frame {
    handler: Box<dyn ElementHandler>,
    name: QName,
    text: String,
}

struct DocumentBuilder<'c, 'r, 's> {
    config: &'c ParserConfig,
    ctx: HandlerContext<'r>,
    stack: Vec<Frame>,
    scope_open: bool,
    root_prefixes: Vec<(String, String)>,
    result: Option<(QName, Value)>,
    sink: &'s mut dyn FnMut(QName, Value) -> Result<()>,
}

impl DocumentBuilder<'_, '_, '_> {
    fn handle(&mut self, event: XmlEvent) -> Result<()> {
        match event {
            XmlEvent::StartPrefixMapping { prefix, uri } => {
                if !self.scope_open {
                    self.ctx.namespaces.push_scope();
                    self.scope_open = true;
                }
                if self.stack.is_empty() && self.result.is_none() {
                    self.root_prefixes.push((prefix.clone(), uri.clone()));
                }
                self.ctx.namespaces.add_prefix(prefix, uri);
                self.config.limits.check_namespaces(self.ctx.namespaces.len())?;
            }
            XmlEvent::StartElement(start) => {
                if self.config.should_stop() {
                    return Err(Error::Stopped);
                }
                if !self.scope_open {
                    self.ctx.namespaces.push_scope();
                }
                self.scope_open = false;
                self.ctx.position = start.position;
                self.config.limits.check_xml_depth(self.stack.len() + 1)?;
                self.config.limits.check_attributes(start.attributes.len())?;
                self.start_element(&start)
                    .map_err(|e| e.located(&start.local_name, start.position))?;
            }
            XmlEvent::Characters(text) => {
                if let Some(top) = self.stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            XmlEvent::EndElement {
                local_name,
                position,
                ..
            } => {
                if self.config.should_stop() {
                    return Err(Error::Stopped);
                }
                self.ctx.position = position;
                self.end_element().map_err(|e| e.located(&local_name, position))?;
                self.ctx.namespaces.pop_scope();
            }
            XmlEvent::EndPrefixMapping { .. } => {}
        }
        Ok(())
    }

    fn start_element(&mut self, start: &StartElement) -> Result<()> {
        let name = QName::namespaced(start.namespace.clone(), start.local_name.clone());
        let handler = if self.stack.is_empty() {
            self.root_handler(start, &name)?
        } else {
            self.child_handler(start, &name)?
        };

        let mut frame = Frame {
            handler,
            name,
            text: String::new(),
        };
        frame.handler.start(&self.ctx, start)?;
        self.stack.push(frame);
        Ok(())
    }

    fn root_handler(
        &mut self,
        start: &StartElement,
        name: &QName,
    ) -> Result<Box<dyn ElementHandler>> {
        if self.result.is_some() {
            return Err(Error::malformed("content after the document element"));
        }
        self.bind_document(start);
        let created = self
            .config
            .handler_factory
            .create(&self.ctx, &start.namespace, &start.local_name)?;
        match created {
            Some(handler) => Ok(handler),
            None if self.ctx.strictness() == FilterStrictness::High => {
                Err(Error::structural(format!(
                    "no declaration for document element {}",
                    name
                )))
            }
            None => Ok(Box::new(AnyHandler::new())),
        }
    }

    fn child_handler(
        &mut self,
        start: &StartElement,
        name: &QName,
    ) -> Result<Box<dyn ElementHandler>> {
        let parent = self
            .stack
            .last_mut()
            .ok_or_else(|| Error::malformed("unbalanced start element"))?;
        flush(&self.ctx, parent)?;
        match parent.handler.child(&self.ctx, &start.namespace, &start.local_name)? {
            Some(handler) => Ok(handler),
            None => {
                debug!(element = %name, "ignoring element");
                Ok(Box::new(IgnoreHandler))
            }
        }
    }

    fn end_element(&mut self) -> Result<()> {
        let mut frame = self
            .stack
            .pop()
            .ok_or_else(|| Error::malformed("unbalanced end element"))?;
        flush(&self.ctx, &mut frame)?;
        if frame.handler.is_ignored() {
            if self.stack.is_empty() {
                self.result = Some((frame.name, Value::Null));
            }
            return Ok(());
        }
        let Frame { handler, name, .. } = frame;
        let value = handler.finish(&self.ctx)?;

        let streaming = self.config.streaming && self.stack.len() == 1;
        match self.stack.last_mut() {
            Some(_) if streaming => (self.sink)(name, value),
            Some(parent) => parent
                .handler
                .child_value(&self.ctx, name.namespace_str(), &name.local_name, value),
            None => {
                self.result = Some((name, value));
                Ok(())
            }
        }
    }

    /// Bind prefixes and schema locations declared on the document element
    fn bind_document(&mut self, start: &StartElement) {
        for (prefix, namespace) in self.root_prefixes.drain(..) {
            self.ctx.prefixes.insert(prefix, namespace);
        }

        let config = self.config;
        let base = config.base_uri.as_ref();
        let bind = |ctx: &mut HandlerContext<'_>, namespace: &str, location: &str| {
            if ctx.locations.contains_key(namespace) {
                return;
            }
            match resolve_location(base, location) {
                Ok(url) => {
                    ctx.locations.insert(namespace.to_string(), url);
                }
                Err(e) => warn!(namespace, location, error = %e, "cannot resolve schema location"),
            }
        };

        for (namespace, location) in &config.schema_locations {
            bind(&mut self.ctx, namespace, location);
        }
        if let Some(pairs) = start.attributes.get_ns(XSI_NAMESPACE, "schemaLocation") {
            let tokens: Vec<&str> = pairs.split_whitespace().collect();
            if tokens.len() % 2 != 0 {
                warn!(value = pairs, "odd number of tokens in xsi:schemaLocation");
            }
            for pair in tokens.chunks_exact(2) {
                bind(&mut self.ctx, pair[0], pair[1]);
            }
        }
        let no_namespace = start.attributes.get_ns(XSI_NAMESPACE, "noNamespaceSchemaLocation");
        if let Some(location) = no_namespace {
            bind(&mut self.ctx, "", location.trim());
        }
    }

    fn finish(self) -> Result<ParsedDocument> {
        if !self.stack.is_empty() {
            return Err(Error::malformed("unexpected end of document"));
        }
        let (name, value) = self
            .result
            .ok_or_else(|| Error::malformed("document has no element"))?;
        Ok(ParsedDocument {
            name,
            value,
            items: Vec::new(),
        })
    }
}

/// Hand buffered text to the frame's handler as one run
fn flush(ctx: &HandlerContext<'_>, frame: &mut Frame) -> Result<()> {
    if frame.text.is_empty() {
        return Ok(());
    }
    let text = std::mem::take(&mut frame.text);
    frame.handler.characters(ctx, &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SchemaSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const ORDER_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        xmlns="urn:order" targetNamespace="urn:order" elementFormDefault="qualified">
      <xs:element name="order">
        <xs:complexType>
          <xs:sequence>
            <xs:element name="item" type="Item" maxOccurs="unbounded"/>
            <xs:element name="note" type="xs:string" minOccurs="0"/>
          </xs:sequence>
          <xs:attribute name="id" type="xs:int" use="required"/>
          <xs:attribute name="status" type="xs:string" default="open"/>
        </xs:complexType>
      </xs:element>
      <xs:complexType name="Item">
        <xs:sequence>
          <xs:element name="sku" type="xs:string"/>
          <xs:element name="qty" type="xs:positiveInteger"/>
        </xs:sequence>
      </xs:complexType>
    </xs:schema>"#;

    const ORDER: &str = r#"<order xmlns="urn:order" id="7">
  <item><sku>A-1</sku><qty>2</qty></item>
  <item><sku>B-2</sku><qty>1</qty></item>
  <note>leave at door</note>
</order>"#;

    fn registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        registry.resolve("urn:order", SchemaSource::bytes(ORDER_XSD)).unwrap();
        registry
    }

    #[test]
    fn test_parse_typed_record() {
        let registry = registry();
        let doc = InstanceParser::new(&registry).parse(ORDER.as_bytes()).unwrap();
        assert_eq!(doc.name, QName::namespaced("urn:order", "order"));

        let order = doc.value.as_record().unwrap();
        assert_eq!(order.attribute("id"), Some(&Value::Integer(7)));
        assert_eq!(order.attribute("status"), Some(&Value::String("open".into())));
        assert_eq!(order.field("note"), Some(&Value::String("leave at door".into())));

        let items = order.field("item").and_then(Value::as_list).unwrap();
        assert_eq!(items.len(), 2);
        let first = items[0].as_record().unwrap();
        assert_eq!(first.field("qty"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_unknown_child_is_ignored() {
        let registry = registry();
        let input = r#"<order xmlns="urn:order" id="1"><ext:x xmlns:ext="urn:ext"><y/></ext:x>
            <item><sku>A</sku><qty>1</qty></item></order>"#;
        let doc = InstanceParser::new(&registry).parse(input.as_bytes()).unwrap();
        let order = doc.value.as_record().unwrap();
        assert!(order.field("x").is_none());
        assert!(order.field("item").is_some());
    }

    #[test]
    fn test_low_strictness_keeps_unknown_child() {
        let registry = registry();
        let config = ParserConfig::new().with_strictness(FilterStrictness::Low);
        let input = r#"<order xmlns="urn:order" id="1"><extra>kept</extra></order>"#;
        let doc = InstanceParser::new(&registry)
            .with_config(config)
            .parse(input.as_bytes())
            .unwrap();
        let order = doc.value.as_record().unwrap();
        assert_eq!(order.field("extra"), Some(&Value::String("kept".into())));
    }

    #[test]
    fn test_high_strictness_rejects_missing_attribute() {
        let registry = registry();
        let config = ParserConfig::new().with_strictness(FilterStrictness::High);
        let input = r#"<order xmlns="urn:order"><item><sku>A</sku><qty>1</qty></item></order>"#;
        let err = InstanceParser::new(&registry)
            .with_config(config)
            .parse(input.as_bytes())
            .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_invalid_value_reports_position() {
        let registry = registry();
        let input = concat!(
            "<order xmlns=\"urn:order\" id=\"1\">\n",
            "  <item><sku>A</sku><qty>zero</qty></item>\n</order>"
        );
        let err = InstanceParser::new(&registry).parse(input.as_bytes()).unwrap_err();
        match err {
            Error::Structural(e) => {
                assert_eq!(e.element.as_deref(), Some("qty"));
                assert_eq!(e.position.map(|p| p.line), Some(2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_stop_before_first_element() {
        let registry = registry();
        let config = ParserConfig::new().with_stop(|| true);
        let err = InstanceParser::new(&registry)
            .with_config(config)
            .parse(ORDER.as_bytes())
            .unwrap_err();
        assert!(err.is_stop());
    }

    #[test]
    fn test_stop_midway() {
        let registry = registry();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let config =
            ParserConfig::new().with_stop(move || counter.fetch_add(1, Ordering::SeqCst) >= 3);
        let err = InstanceParser::new(&registry)
            .with_config(config)
            .parse(ORDER.as_bytes())
            .unwrap_err();
        assert!(err.is_stop());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_streaming_sink() {
        let registry = registry();
        let config = ParserConfig::new().with_streaming(true);
        let mut seen = Vec::new();
        let doc = InstanceParser::new(&registry)
            .with_config(config)
            .parse_streaming(ORDER.as_bytes(), |name, _| {
                seen.push(name.local_name);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec!["item", "item", "note"]);
        let order = doc.value.as_record().unwrap();
        assert!(order.fields.is_empty());
        assert_eq!(order.attribute("id"), Some(&Value::Integer(7)));
    }

    #[test]
    fn test_undeclared_root_is_untyped() {
        let registry = SchemaRegistry::new();
        let doc = InstanceParser::new(&registry)
            .parse(b"<a x=\"1\"><b>text</b><b>more</b></a>")
            .unwrap();
        let record = doc.value.as_record().unwrap();
        assert_eq!(record.attribute("x"), Some(&Value::String("1".into())));
        assert_eq!(record.field("b").and_then(Value::as_list).map(|l| l.len()), Some(2));
    }

    #[test]
    fn test_malformed_document() {
        let registry = SchemaRegistry::new();
        let err = InstanceParser::new(&registry).parse(b"<a><b></a>").unwrap_err();
        assert!(err.is_malformed());
    }
}
