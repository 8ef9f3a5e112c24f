//! Streaming encode on top of the quick-xml writer.
//!
//! Start tags are held back until the first child or text arrives so an
//! element that ends up with no content is written self-closing (`<x/>`).

use std::fmt::Display;
use std::io::Write;

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::attr::UintFormat;
use crate::error::Result;

const INDENT: &[u8] = b"  ";

/// Types encodable as an element named by the caller.
pub trait ToXml {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()>;
}

/// Start tag under construction. Attributes are written in call order.
#[derive(Debug, Clone)]
pub struct Tag {
    name: String,
    start: BytesStart<'static>,
}

impl Tag {
    pub fn new(name: &str) -> Self {
        Tag {
            name: name.to_string(),
            start: BytesStart::new(name.to_string()),
        }
    }

    pub fn attr(&mut self, key: &str, value: &str) -> &mut Self {
        self.start.push_attribute((key, value));
        self
    }

    /// Write `key` only when `value` is present.
    pub fn opt(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.attr(key, value);
        }
        self
    }

    pub fn uint<T: Into<u64>>(&mut self, key: &str, value: Option<T>, format: UintFormat) -> &mut Self {
        if let Some(value) = value {
            self.attr(key, &format.render(value.into()));
        }
        self
    }

    /// Whether no attribute has been added yet.
    pub fn is_bare(&self) -> bool {
        self.start.attributes().next().is_none()
    }

    /// Write `key` using the value's [`Display`] form.
    pub fn display<T: Display>(&mut self, key: &str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.attr(key, &value.to_string());
        }
        self
    }
}

/// Indenting XML writer (two spaces per level).
pub struct XmlWriter<W: Write> {
    inner: Writer<W>,
    pending: Option<BytesStart<'static>>,
    open: Vec<String>,
    line_break: bool,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(sink: W) -> Self {
        XmlWriter {
            inner: Writer::new(sink),
            pending: None,
            open: Vec::new(),
            line_break: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }

    fn newline(&mut self) -> Result<()> {
        let sink = self.inner.get_mut();
        sink.write_all(b"\n")?;
        for _ in 0..self.open.len() {
            sink.write_all(INDENT)?;
        }
        Ok(())
    }

    fn markup(&mut self, event: Event<'_>) -> Result<()> {
        if self.line_break {
            self.newline()?;
        }
        self.inner.write_event(event)?;
        self.line_break = true;
        Ok(())
    }

    fn flush_pending(&mut self) -> Result<()> {
        if let Some(start) = self.pending.take() {
            // the tag was pushed on `open` already; indent at the parent level
            let name = self.open.pop();
            self.markup(Event::Start(start))?;
            self.open.extend(name);
        }
        Ok(())
    }

    /// Open `tag`; it is closed by the matching [`XmlWriter::end`].
    pub fn start(&mut self, tag: Tag) -> Result<()> {
        self.flush_pending()?;
        self.open.push(tag.name);
        self.pending = Some(tag.start);
        Ok(())
    }

    /// Close the innermost open element.
    pub fn end(&mut self) -> Result<()> {
        let Some(name) = self.open.pop() else {
            return Ok(());
        };
        match self.pending.take() {
            Some(start) => self.markup(Event::Empty(start)),
            None => self.markup(Event::End(BytesEnd::new(name))),
        }
    }

    /// Write `tag`, its content produced by `body`, and its end tag.
    pub fn element<F>(&mut self, tag: Tag, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.start(tag)?;
        body(self)?;
        self.end()
    }

    /// Write `tag` with no content.
    pub fn empty(&mut self, tag: Tag) -> Result<()> {
        self.start(tag)?;
        self.end()
    }

    /// Escaped character data inside the current element.
    pub fn text(&mut self, text: &str) -> Result<()> {
        self.flush_pending()?;
        self.inner
            .write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
        self.line_break = false;
        Ok(())
    }

    /// Markup written exactly as given.
    pub fn raw(&mut self, xml: &str) -> Result<()> {
        self.flush_pending()?;
        self.inner.get_mut().write_all(xml.as_bytes())?;
        self.line_break = false;
        Ok(())
    }

    /// A complete element written exactly as given, on its own line.
    pub fn raw_element(&mut self, xml: &str) -> Result<()> {
        self.flush_pending()?;
        self.newline()?;
        self.inner.get_mut().write_all(xml.as_bytes())?;
        self.line_break = true;
        Ok(())
    }

    /// `<name>text</name>`
    pub fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(Tag::new(name))?;
        self.text(text)?;
        self.end()
    }

    pub fn opt_text(&mut self, name: &str, text: Option<&str>) -> Result<()> {
        match text {
            Some(text) => self.text_element(name, text),
            None => Ok(()),
        }
    }

    pub fn uint_text<T: Into<u64>>(&mut self, name: &str, value: Option<T>, format: UintFormat) -> Result<()> {
        match value {
            Some(value) => self.text_element(name, &format.render(value.into())),
            None => Ok(()),
        }
    }

    pub fn display_text<T: Display>(&mut self, name: &str, value: Option<T>) -> Result<()> {
        match value {
            Some(value) => self.text_element(name, &value.to_string()),
            None => Ok(()),
        }
    }

    /// Single-attribute empty element such as `<format type="qcow2"/>`.
    pub fn attr_element(&mut self, name: &str, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => {
                let mut tag = Tag::new(name);
                tag.attr(key, value);
                self.empty(tag)
            }
            None => Ok(()),
        }
    }

    /// Presence-only element such as `<readonly/>`.
    pub fn flag(&mut self, name: &str, present: bool) -> Result<()> {
        if present {
            self.empty(Tag::new(name))?;
        }
        Ok(())
    }

    pub fn child<T: ToXml>(&mut self, name: &str, value: Option<&T>) -> Result<()> {
        match value {
            Some(value) => value.to_xml(name, self),
            None => Ok(()),
        }
    }

    pub fn children<T: ToXml>(&mut self, name: &str, values: &[T]) -> Result<()> {
        for value in values {
            value.to_xml(name, self)?;
        }
        Ok(())
    }
}

impl ToXml for String {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.text_element(name, self)
    }
}

impl<T: ToXml> ToXml for Box<T> {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        (**self).to_xml(name, w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render<F>(body: F) -> String
    where
        F: FnOnce(&mut XmlWriter<Vec<u8>>) -> Result<()>,
    {
        let mut w = XmlWriter::new(Vec::new());
        body(&mut w).expect("write");
        String::from_utf8(w.into_inner()).expect("utf8")
    }

    #[test]
    fn empty_elements_self_close() {
        let out = render(|w| {
            let mut tag = Tag::new("address");
            tag.attr("type", "pci")
                .uint("bus", Some(1u32), UintFormat::Hex { width: 2 })
                .uint("slot", None::<u32>, UintFormat::Hex { width: 2 });
            w.empty(tag)
        });
        assert_eq!(out, r#"<address type="pci" bus="0x01"/>"#);
    }

    #[test]
    fn nested_elements_indent_two_spaces() {
        let out = render(|w| {
            w.element(Tag::new("domain"), |w| {
                w.text_element("name", "a<b")?;
                w.element(Tag::new("devices"), |w| w.flag("readonly", true))?;
                w.flag("shareable", false)
            })
        });
        assert_eq!(
            out,
            "<domain>\n  <name>a&lt;b</name>\n  <devices>\n    <readonly/>\n  </devices>\n</domain>"
        );
    }

    #[test]
    fn element_without_children_collapses() {
        let out = render(|w| w.element(Tag::new("features"), |_| Ok(())));
        assert_eq!(out, "<features/>");
    }

    #[test]
    fn raw_content_is_not_escaped() {
        let out = render(|w| {
            w.start(Tag::new("metadata"))?;
            w.raw("<app:x xmlns:app=\"urn:a\">&amp;</app:x>")?;
            w.end()
        });
        assert_eq!(
            out,
            "<metadata><app:x xmlns:app=\"urn:a\">&amp;</app:x></metadata>"
        );
    }

    #[test]
    fn raw_element_keeps_sibling_layout() {
        let out = render(|w| {
            w.element(Tag::new("domain"), |w| {
                w.text_element("name", "vm")?;
                w.raw_element("<qemu:commandline>\n    <qemu:arg value='-s'/>\n  </qemu:commandline>")?;
                w.flag("on_crash", true)
            })
        });
        assert_eq!(
            out,
            "<domain>\n  <name>vm</name>\n  <qemu:commandline>\n    <qemu:arg value='-s'/>\n  </qemu:commandline>\n  <on_crash/>\n</domain>"
        );
    }
}
