//! Document event stream
//!
//! Both the schema parser and the instance parser consume the same shape of
//! events: prefix-mapping start/end, element start/end and character data.
//! [`EventReader`] produces them from quick-xml's namespace-aware reader and
//! annotates element events with a line/column [`Position`].

use std::collections::VecDeque;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::error::{Error, ParseError, Position, Result};
use crate::limits::Limits;

/// One attribute of an element start event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Resolved namespace, empty for unprefixed attributes
    pub namespace: String,
    /// Local name
    pub local_name: String,
    /// Unescaped value
    pub value: String,
}

/// Attributes of an element start event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    /// Create an attribute list
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self(attributes)
    }

    /// Value of an unqualified attribute
    pub fn get(&self, local_name: &str) -> Option<&str> {
        self.get_ns("", local_name)
    }

    /// Value of an attribute in the given namespace
    pub fn get_ns(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|a| a.namespace == namespace && a.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    /// Iterate over all attributes
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no attributes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Element start event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartElement {
    /// Resolved element namespace, empty when none
    pub namespace: String,
    /// Element local name
    pub local_name: String,
    /// Attributes, excluding namespace declarations
    pub attributes: Attributes,
    /// Where the start tag ends
    pub position: Position,
}

/// Document event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// A prefix binding comes into scope (emitted before its element start)
    StartPrefixMapping {
        /// Bound prefix, empty for the default namespace
        prefix: String,
        /// Namespace URI
        uri: String,
    },
    /// Element start
    StartElement(StartElement),
    /// Character data (text or CDATA)
    Characters(String),
    /// Element end
    EndElement {
        /// Element namespace
        namespace: String,
        /// Element local name
        local_name: String,
        /// Where the end tag ends
        position: Position,
    },
    /// A prefix binding goes out of scope (emitted after its element end)
    EndPrefixMapping {
        /// Prefix leaving scope
        prefix: String,
    },
}

/// Tracks byte offset to line/column conversion; offsets only move forward.
#[derive(Debug)]
struct LineIndex {
    offset: usize,
    line: usize,
    column: usize,
}

impl LineIndex {
    fn new() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn advance(&mut self, input: &[u8], target: usize) -> Position {
        let target = target.min(input.len());
        if target > self.offset {
            for &b in &input[self.offset..target] {
                if b == b'\n' {
                    self.line += 1;
                    self.column = 1;
                } else if b & 0xC0 != 0x80 {
                    self.column += 1;
                }
            }
            self.offset = target;
        }
        Position::new(self.line, self.column)
    }
}

enum Raw {
    Start(StartParts, bool),
    End(String, String),
    Text(String),
    Eof,
    Skip,
}

struct StartParts {
    namespace: String,
    local_name: String,
    attributes: Vec<Attribute>,
    bindings: Vec<(String, String)>,
}

/// Pull reader producing [`XmlEvent`]s from an in-memory document
pub struct EventReader<'a> {
    reader: NsReader<&'a [u8]>,
    input: &'a [u8],
    buf: Vec<u8>,
    pending: VecDeque<XmlEvent>,
    /// Prefixes declared by each open element
    open: Vec<Vec<String>>,
    lines: LineIndex,
    limits: Limits,
    source: Option<String>,
    position: Position,
    seen_root: bool,
    finished: bool,
}

impl<'a> EventReader<'a> {
    /// Create a reader over a complete document
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            reader: NsReader::from_reader(input),
            input,
            buf: Vec::new(),
            pending: VecDeque::new(),
            open: Vec::new(),
            lines: LineIndex::new(),
            limits: Limits::default(),
            source: None,
            position: Position::new(1, 1),
            seen_root: false,
            finished: false,
        }
    }

    /// Set the limits checked while reading
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the source URI reported in errors
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Position of the most recently returned element event
    pub fn position(&self) -> Position {
        self.position
    }

    /// Current element nesting depth
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Read the next event, `None` at the end of the document
    pub fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if self.finished {
                return Ok(None);
            }

            let raw = match self.read_raw() {
                Ok(raw) => raw,
                Err(e) => return Err(self.locate(e)),
            };
            let position = self
                .lines
                .advance(self.input, self.reader.buffer_position() as usize);

            match raw {
                Raw::Start(parts, empty) => {
                    if self.open.is_empty() && self.seen_root {
                        return Err(self.malformed("content after the root element", position));
                    }
                    self.seen_root = true;
                    self.position = position;
                    self.limits.check_xml_depth(self.open.len() + 1)?;
                    self.limits.check_attributes(parts.attributes.len())?;

                    let mut prefixes = Vec::with_capacity(parts.bindings.len());
                    for (prefix, uri) in parts.bindings {
                        prefixes.push(prefix.clone());
                        self.pending
                            .push_back(XmlEvent::StartPrefixMapping { prefix, uri });
                    }
                    self.pending.push_back(XmlEvent::StartElement(StartElement {
                        namespace: parts.namespace.clone(),
                        local_name: parts.local_name.clone(),
                        attributes: Attributes::new(parts.attributes),
                        position,
                    }));
                    self.open.push(prefixes);
                    if empty {
                        self.close(parts.namespace, parts.local_name, position);
                    }
                }
                Raw::End(namespace, local_name) => {
                    self.position = position;
                    self.close(namespace, local_name, position);
                }
                Raw::Text(text) => {
                    if self.open.is_empty() {
                        if !text.trim().is_empty() {
                            return Err(self.malformed("text outside the root element", position));
                        }
                    } else if !text.is_empty() {
                        self.pending.push_back(XmlEvent::Characters(text));
                    }
                }
                Raw::Eof => {
                    self.finished = true;
                    if !self.open.is_empty() {
                        return Err(self.malformed("unexpected end of document", position));
                    }
                    if !self.seen_root {
                        return Err(self.malformed("document has no root element", position));
                    }
                }
                Raw::Skip => {}
            }
        }
    }

    fn close(&mut self, namespace: String, local_name: String, position: Position) {
        self.pending.push_back(XmlEvent::EndElement {
            namespace,
            local_name,
            position,
        });
        if let Some(prefixes) = self.open.pop() {
            for prefix in prefixes.into_iter().rev() {
                self.pending.push_back(XmlEvent::EndPrefixMapping { prefix });
            }
        }
    }

    fn read_raw(&mut self) -> Result<Raw> {
        self.buf.clear();
        let (resolved, event) = self.reader.read_resolved_event_into(&mut self.buf)?;
        let namespace = namespace_string(resolved)?;

        let raw = match event {
            Event::Start(e) => Raw::Start(start_parts(&self.reader, namespace, &e)?, false),
            Event::Empty(e) => Raw::Start(start_parts(&self.reader, namespace, &e)?, true),
            Event::End(e) => Raw::End(namespace, utf8(e.local_name().as_ref())?),
            Event::Text(e) => Raw::Text(e.unescape()?.into_owned()),
            Event::CData(e) => Raw::Text(utf8(&e.into_inner())?),
            Event::Eof => Raw::Eof,
            _ => Raw::Skip,
        };
        Ok(raw)
    }

    fn malformed(&self, message: &str, position: Position) -> Error {
        let mut err = ParseError::new(message).with_position(position);
        if let Some(ref source) = self.source {
            err = err.with_source(source.clone());
        }
        Error::Malformed(err)
    }

    fn locate(&mut self, err: Error) -> Error {
        let position = self
            .lines
            .advance(self.input, self.reader.buffer_position() as usize);
        match err {
            Error::Malformed(mut e) => {
                if e.source.is_none() {
                    e.source = self.source.clone();
                }
                Error::Malformed(e).at(position)
            }
            other => other.at(position),
        }
    }
}

fn namespace_string(resolved: ResolveResult<'_>) -> Result<String> {
    match resolved {
        ResolveResult::Bound(ns) => utf8(ns.as_ref()),
        ResolveResult::Unbound => Ok(String::new()),
        ResolveResult::Unknown(prefix) => Err(Error::malformed(format!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn start_parts(
    reader: &NsReader<&[u8]>,
    namespace: String,
    e: &BytesStart<'_>,
) -> Result<StartParts> {
    let local_name = utf8(e.local_name().as_ref())?;
    let mut attributes = Vec::new();
    let mut bindings = Vec::new();

    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::malformed(format!("bad attribute: {}", err)))?;
        let key = attr.key.as_ref();
        let value = attr.unescape_value()?.into_owned();

        if key == b"xmlns" {
            bindings.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix(b"xmlns:") {
            bindings.push((utf8(prefix)?, value));
        } else {
            let (resolved, local) = reader.resolve_attribute(attr.key);
            attributes.push(Attribute {
                namespace: namespace_string(resolved)?,
                local_name: utf8(local.as_ref())?,
                value,
            });
        }
    }

    Ok(StartParts {
        namespace,
        local_name,
        attributes,
        bindings,
    })
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(|s| s.to_string())
        .map_err(|e| Error::malformed(format!("invalid UTF-8: {}", e)))
}

/// Read every event of a document into a vector
pub fn read_all(input: &[u8]) -> Result<Vec<XmlEvent>> {
    let mut reader = EventReader::new(input);
    let mut events = Vec::new();
    while let Some(event) = reader.next_event()? {
        events.push(event);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_mappings_surround_element() {
        let events = read_all(br#"<a:root xmlns:a="urn:a" x="1"/>"#).unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(
            &events[0],
            XmlEvent::StartPrefixMapping { prefix, uri } if prefix == "a" && uri == "urn:a"
        ));
        match &events[1] {
            XmlEvent::StartElement(start) => {
                assert_eq!(start.namespace, "urn:a");
                assert_eq!(start.local_name, "root");
                assert_eq!(start.attributes.get("x"), Some("1"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            &events[2],
            XmlEvent::EndElement { local_name, .. } if local_name == "root"
        ));
        assert!(matches!(&events[3], XmlEvent::EndPrefixMapping { prefix } if prefix == "a"));
    }

    #[test]
    fn test_default_namespace_and_text() {
        let events = read_all(b"<r xmlns=\"urn:d\"><c>hi &amp; bye</c></r>").unwrap();
        let texts: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                XmlEvent::Characters(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["hi & bye"]);
        match &events[2] {
            XmlEvent::StartElement(start) => assert_eq!(start.namespace, "urn:d"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_namespaced_attribute() {
        let xml = br#"<r xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:nil="true"/>"#;
        let events = read_all(xml).unwrap();
        let start = events
            .iter()
            .find_map(|e| match e {
                XmlEvent::StartElement(s) => Some(s),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            start
                .attributes
                .get_ns("http://www.w3.org/2001/XMLSchema-instance", "nil"),
            Some("true")
        );
    }

    #[test]
    fn test_positions_are_reported() {
        let mut reader = EventReader::new(b"<r>\n  <c/>\n</r>");
        let mut positions = Vec::new();
        while let Some(event) = reader.next_event().unwrap() {
            if let XmlEvent::StartElement(s) = event {
                positions.push(s.position);
            }
        }
        assert_eq!(positions[0].line, 1);
        assert_eq!(positions[1].line, 2);
    }

    #[test]
    fn test_unclosed_root_is_malformed() {
        let err = read_all(b"<r><c></c>").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_mismatched_end_is_malformed() {
        let err = read_all(b"<r><c></d></r>").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_empty_document_is_malformed() {
        assert!(read_all(b"   ").unwrap_err().is_malformed());
    }
}
