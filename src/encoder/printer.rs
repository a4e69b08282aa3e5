//! Streaming XML printer over quick-xml's writer
//!
//! Start tags are held open until the first child, text or end arrives, so
//! elements without content come out as empty-element tags and attributes
//! can be added after `start`.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{Error, Result};

/// Writes one XML document
pub struct Printer<W: Write> {
    writer: Writer<W>,
    pending: Option<BytesStart<'static>>,
    open: Vec<String>,
}

impl<W: Write> Printer<W> {
    /// Create a printer; `indent` is the number of spaces per level
    pub fn new(inner: W, indent: Option<usize>) -> Self {
        let writer = match indent {
            Some(size) if size > 0 => Writer::new_with_indent(inner, b' ', size),
            _ => Writer::new(inner),
        };
        Self {
            writer,
            pending: None,
            open: Vec::new(),
        }
    }

    /// Write the XML declaration
    pub fn declaration(&mut self, encoding: &str) -> Result<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some(encoding), None)))?;
        Ok(())
    }

    /// Open an element
    pub fn start(&mut self, name: &str) -> Result<()> {
        self.flush()?;
        self.pending = Some(BytesStart::new(name.to_string()));
        self.open.push(name.to_string());
        Ok(())
    }

    /// Add an attribute to the element just opened
    pub fn attribute(&mut self, name: &str, value: &str) -> Result<()> {
        match self.pending.as_mut() {
            Some(start) => {
                start.push_attribute((name, value));
                Ok(())
            }
            None => Err(Error::structural(format!(
                "attribute '{}' written outside a start tag",
                name
            ))),
        }
    }

    /// Write escaped character data
    pub fn text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.flush()?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    /// Close the innermost open element
    pub fn end(&mut self) -> Result<()> {
        let name = self
            .open
            .pop()
            .ok_or_else(|| Error::structural("end tag without an open element"))?;
        match self.pending.take() {
            Some(start) => self.writer.write_event(Event::Empty(start))?,
            None => self.writer.write_event(Event::End(BytesEnd::new(name)))?,
        }
        Ok(())
    }

    /// Number of open elements
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Close remaining elements, write the final newline and return the sink
    pub fn finish(mut self) -> Result<W> {
        while !self.open.is_empty() {
            self.end()?;
        }
        let mut inner = self.writer.into_inner();
        inner.write_all(b"\n")?;
        Ok(inner)
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(start) = self.pending.take() {
            self.writer.write_event(Event::Start(start))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn print(f: impl FnOnce(&mut Printer<Vec<u8>>) -> Result<()>) -> String {
        let mut printer = Printer::new(Vec::new(), None);
        f(&mut printer).unwrap();
        String::from_utf8(printer.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_empty_and_text_elements() {
        let out = print(|p| {
            p.declaration("UTF-8")?;
            p.start("a")?;
            p.attribute("x", "1 < 2")?;
            p.start("b")?;
            p.end()?;
            p.start("c")?;
            p.text("t & u")?;
            p.end()
        });
        assert_eq!(
            out,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><a x=\"1 &lt; 2\"><b/><c>t &amp; u</c></a>\n"
        );
    }

    #[test]
    fn test_attribute_after_content_fails() {
        let mut printer = Printer::new(Vec::new(), None);
        printer.start("a").unwrap();
        printer.text("x").unwrap();
        assert!(printer.attribute("late", "1").is_err());
    }
}
