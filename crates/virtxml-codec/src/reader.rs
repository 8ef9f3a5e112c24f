//! Streaming decode on top of the quick-xml pull parser.

use std::str::FromStr;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::trace;

use crate::attr::{parse_uint, Base};
use crate::error::{Result, XmlError};

/// Types decodable from an element.
///
/// Implementations must consume `el` completely (its children and its end
/// tag) before returning. Returning `Ok(None)` declines the element: the
/// subtree has been skipped and the caller leaves its slot empty.
pub trait FromXml: Sized {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>>;
}

/// An opened element whose start tag has been read but whose content has not.
#[derive(Debug, Clone)]
pub struct Element<'a> {
    start: BytesStart<'a>,
    name: String,
    empty: bool,
    offset: usize,
}

impl<'a> Element<'a> {
    fn new(start: BytesStart<'a>, empty: bool, offset: usize) -> Self {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        Element {
            start,
            name,
            empty,
            offset,
        }
    }

    /// Qualified element name, including any namespace prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the element was written self-closing and has no content.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Unescaped value of attribute `key`.
    pub fn attr(&self, key: &str) -> Result<Option<String>> {
        for attr in self.start.attributes() {
            let attr = attr?;
            if attr.key.as_ref() == key.as_bytes() {
                return Ok(Some(attr.unescape_value()?.into_owned()));
            }
        }
        Ok(None)
    }

    /// Whether attribute `key` is present, whatever its value.
    pub fn has_attr(&self, key: &str) -> Result<bool> {
        Ok(self.attr(key)?.is_some())
    }

    /// Parse attribute `key` as an unsigned number in `base`.
    pub fn uint<T: TryFrom<u64>>(&self, key: &str, base: Base) -> Result<Option<T>> {
        match self.attr(key)? {
            Some(raw) => parse_number(&self.name, key, &raw, base).map(Some),
            None => Ok(None),
        }
    }

    /// Parse attribute `key` through [`FromStr`], for signed or other scalar values.
    pub fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.attr(key)? {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| XmlError::malformed(&self.name, key, &raw)),
            None => Ok(None),
        }
    }

    /// All attributes in document order.
    pub fn attributes(&self) -> Result<Vec<(String, String)>> {
        let mut out = Vec::new();
        for attr in self.start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            out.push((key, attr.unescape_value()?.into_owned()));
        }
        Ok(out)
    }
}

pub(crate) fn parse_number<T: TryFrom<u64>>(
    element: &str,
    field: &str,
    raw: &str,
    base: Base,
) -> Result<T> {
    let value = parse_uint(raw, base).map_err(|_| XmlError::malformed(element, field, raw))?;
    T::try_from(value).map_err(|_| XmlError::malformed(element, field, raw))
}

/// Pull reader over a borrowed document.
pub struct XmlReader<'a> {
    src: &'a str,
    reader: Reader<&'a [u8]>,
}

impl<'a> XmlReader<'a> {
    pub fn new(src: &'a str) -> Self {
        // whitespace is kept: text leaves and passthrough spans are verbatim
        XmlReader {
            src,
            reader: Reader::from_str(src),
        }
    }

    /// Skip the prolog and return the root element.
    pub fn root(&mut self) -> Result<Element<'a>> {
        loop {
            let offset = self.reader.buffer_position() as usize;
            match self.reader.read_event()? {
                Event::Start(start) => return Ok(Element::new(start, false, offset)),
                Event::Empty(start) => return Ok(Element::new(start, true, offset)),
                Event::Eof => return Err(XmlError::Empty),
                _ => {}
            }
        }
    }

    /// Next child element of `parent`, or `None` once its end tag is consumed.
    ///
    /// Text (including indentation), comments and processing instructions
    /// between children are dropped. Each returned child must be consumed before the next call.
    pub fn next_child(&mut self, parent: &Element<'a>) -> Result<Option<Element<'a>>> {
        if parent.empty {
            return Ok(None);
        }
        loop {
            let offset = self.reader.buffer_position() as usize;
            match self.reader.read_event()? {
                Event::Start(start) => return Ok(Some(Element::new(start, false, offset))),
                Event::Empty(start) => return Ok(Some(Element::new(start, true, offset))),
                Event::End(_) => return Ok(None),
                Event::Eof => {
                    return Err(XmlError::UnexpectedEof {
                        element: parent.name.clone(),
                    })
                }
                _ => {}
            }
        }
    }

    /// Feed every child of `el` to `visit`; children it declines are skipped.
    pub fn each_child<F>(&mut self, el: &Element<'a>, mut visit: F) -> Result<()>
    where
        F: FnMut(&mut Self, &Element<'a>) -> Result<bool>,
    {
        while let Some(child) = self.next_child(el)? {
            if !visit(self, &child)? {
                self.skip(&child)?;
            }
        }
        Ok(())
    }

    /// Decode `el` as `T`.
    pub fn read<T: FromXml>(&mut self, el: &Element<'a>) -> Result<Option<T>> {
        T::from_xml(el, self)
    }

    /// Discard `el` and everything below it.
    pub fn skip(&mut self, el: &Element<'a>) -> Result<()> {
        trace!(element = %el.name, "skipping element");
        if !el.empty {
            self.reader.read_to_end(el.start.name())?;
        }
        Ok(())
    }

    /// Concatenated text content of `el`, untrimmed; nested elements are skipped.
    pub fn text(&mut self, el: &Element<'a>) -> Result<String> {
        let mut text = String::new();
        if el.empty {
            return Ok(text);
        }
        loop {
            match self.reader.read_event()? {
                Event::Text(chunk) => text.push_str(&chunk.unescape()?),
                Event::CData(chunk) => text.push_str(&String::from_utf8_lossy(&chunk)),
                Event::Start(nested) => {
                    self.reader.read_to_end(nested.name())?;
                }
                Event::End(_) => return Ok(text),
                Event::Eof => {
                    return Err(XmlError::UnexpectedEof {
                        element: el.name.clone(),
                    })
                }
                _ => {}
            }
        }
    }

    /// Text content of `el` parsed as an unsigned number in `base`.
    pub fn uint_text<T: TryFrom<u64>>(&mut self, el: &Element<'a>, base: Base) -> Result<T> {
        let raw = self.text(el)?;
        parse_number(&el.name, &el.name, &raw, base)
    }

    /// Text content of `el` parsed through [`FromStr`].
    pub fn parse_text<T: FromStr>(&mut self, el: &Element<'a>) -> Result<T> {
        let raw = self.text(el)?;
        raw.trim()
            .parse()
            .map_err(|_| XmlError::malformed(&el.name, &el.name, &raw))
    }

    /// Raw markup between the start and end tags of `el`, byte for byte.
    pub fn inner_xml(&mut self, el: &Element<'a>) -> Result<&'a str> {
        if el.empty {
            return Ok("");
        }
        let span = self.reader.read_to_end(el.start.name())?;
        Ok(self
            .src
            .get(span.start as usize..span.end as usize)
            .unwrap_or(""))
    }

    /// Raw markup of `el` including its own start and end tags.
    pub fn outer_xml(&mut self, el: &Element<'a>) -> Result<&'a str> {
        if !el.empty {
            self.reader.read_to_end(el.start.name())?;
        }
        let end = self.reader.buffer_position() as usize;
        Ok(self.src.get(el.offset..end).unwrap_or("").trim_start())
    }
}

impl FromXml for String {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        r.text(el).map(Some)
    }
}

impl<T: FromXml> FromXml for Box<T> {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        Ok(T::from_xml(el, r)?.map(Box::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"<?xml version="1.0"?>
<!-- leading comment -->
<domain type="kvm">
  <name>guest</name>
  <unknown><deep a="1"/></unknown>
  <metadata>
    <app:info xmlns:app="urn:app">x &amp; y</app:info>
  </metadata>
  <address type="pci" bus="0x1z"/>
</domain>"#;

    #[test]
    fn walk_children_and_skip() {
        let mut r = XmlReader::new(FIXTURE);
        let root = r.root().expect("root");
        assert_eq!(root.name(), "domain");
        assert_eq!(root.attr("type").expect("attr").as_deref(), Some("kvm"));

        let mut seen = Vec::new();
        while let Some(child) = r.next_child(&root).expect("child") {
            seen.push(child.name().to_string());
            match child.name() {
                "name" => assert_eq!(r.text(&child).expect("text"), "guest"),
                "metadata" => {
                    let inner = r.inner_xml(&child).expect("inner");
                    assert!(inner.contains(r#"<app:info xmlns:app="urn:app">x &amp; y</app:info>"#));
                }
                _ => r.skip(&child).expect("skip"),
            }
        }
        assert_eq!(seen, ["name", "unknown", "metadata", "address"]);
    }

    #[test]
    fn malformed_number_names_field() {
        let mut r = XmlReader::new(FIXTURE);
        let root = r.root().expect("root");
        let mut found = None;
        while let Some(child) = r.next_child(&root).expect("child") {
            if child.name() == "address" {
                found = Some(child.uint::<u32>("bus", Base::Hex).unwrap_err());
            }
            r.skip(&child).expect("skip");
        }
        match found.expect("address visited") {
            XmlError::MalformedAttribute {
                element,
                field,
                raw,
            } => {
                assert_eq!(element, "address");
                assert_eq!(field, "bus");
                assert_eq!(raw, "0x1z");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn overflow_is_malformed() {
        let mut r = XmlReader::new(r#"<address bus="0x1ff"/>"#);
        let root = r.root().expect("root");
        assert!(root.uint::<u8>("bus", Base::Hex).is_err());
        assert_eq!(root.uint::<u16>("bus", Base::Hex).expect("u16"), Some(0x1ff));
    }

    #[test]
    fn outer_xml_is_verbatim() {
        let xml = "<domain>\n  <qemu:commandline xmlns:qemu=\"urn:q\">\n    <qemu:arg value='-s'/>\n  </qemu:commandline>\n</domain>";
        let mut r = XmlReader::new(xml);
        let root = r.root().expect("root");
        let child = r.next_child(&root).expect("read").expect("child");
        let outer = r.outer_xml(&child).expect("outer");
        assert_eq!(
            outer,
            "<qemu:commandline xmlns:qemu=\"urn:q\">\n    <qemu:arg value='-s'/>\n  </qemu:commandline>"
        );
        assert!(r.next_child(&root).expect("end").is_none());
    }

    #[test]
    fn truncated_input_fails() {
        let mut r = XmlReader::new("<domain><name>x</name>");
        let root = r.root().expect("root");
        let child = r.next_child(&root).expect("read").expect("name");
        r.skip(&child).expect("skip");
        let err = r.next_child(&root).unwrap_err();
        assert!(matches!(err, XmlError::UnexpectedEof { .. } | XmlError::Xml(_)));
    }

    #[test]
    fn text_keeps_surrounding_whitespace() {
        let mut r = XmlReader::new("<domain>\n  <description>  a  </description>\n</domain>");
        let root = r.root().expect("root");
        let child = r.next_child(&root).expect("read").expect("description");
        assert_eq!(r.text(&child).expect("text"), "  a  ");
        assert!(r.next_child(&root).expect("end").is_none());
    }

    #[test]
    fn inner_xml_keeps_trailing_indent() {
        let mut r = XmlReader::new("<m>\n  <a>x</a>\n</m>");
        let root = r.root().expect("root");
        assert_eq!(r.inner_xml(&root).expect("inner"), "\n  <a>x</a>\n");
    }

    #[test]
    fn empty_input_has_no_root() {
        let mut r = XmlReader::new("  <!-- nothing -->  ");
        assert!(matches!(r.root(), Err(XmlError::Empty)));
    }
}
