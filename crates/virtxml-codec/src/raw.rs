//! Opaque passthrough for markup the schema does not own.

use std::io::Write;

use crate::error::Result;
use crate::reader::{Element, FromXml, XmlReader};
use crate::writer::{Tag, ToXml, XmlWriter};

/// Inner content of a free-form element such as `<metadata>`, kept byte for byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawXml(pub String);

impl ToXml for RawXml {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.start(Tag::new(name))?;
        if !self.0.is_empty() {
            w.raw(&self.0)?;
        }
        w.end()
    }
}

impl FromXml for RawXml {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        Ok(Some(RawXml(r.inner_xml(el)?.to_string())))
    }
}

/// A whole element outside the schema (e.g. `<qemu:commandline>`), kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawElement {
    pub name: String,
    pub xml: String,
}

impl RawElement {
    /// Elements carrying a namespace prefix belong to an extension vocabulary.
    pub fn is_extension(el: &Element<'_>) -> bool {
        el.name().contains(':')
    }
}

impl ToXml for RawElement {
    fn to_xml<W: Write>(&self, _name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.raw_element(&self.xml)
    }
}

impl FromXml for RawElement {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        Ok(Some(RawElement {
            name: el.name().to_string(),
            xml: r.outer_xml(el)?.to_string(),
        }))
    }
}

/// An `xmlns:prefix="uri"` declaration on a document root.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Namespace {
    pub prefix: String,
    pub uri: String,
}

impl Namespace {
    pub fn new(prefix: &str, uri: &str) -> Self {
        Namespace {
            prefix: prefix.to_string(),
            uri: uri.to_string(),
        }
    }

    /// Prefixed declarations on `el`, in document order.
    pub fn collect(el: &Element<'_>) -> Result<Vec<Namespace>> {
        Ok(el
            .attributes()?
            .into_iter()
            .filter_map(|(key, uri)| {
                key.strip_prefix("xmlns:")
                    .map(|prefix| Namespace::new(prefix, &uri))
            })
            .collect())
    }

    pub fn apply(namespaces: &[Namespace], tag: &mut Tag) {
        for ns in namespaces {
            tag.attr(&format!("xmlns:{}", ns.prefix), &ns.uri);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "<domain xmlns:qemu=\"http://libvirt.org/schemas/domain/qemu/1.0\" type=\"kvm\">\n  <metadata>\n    <app:data xmlns:app=\"urn:app\"><![CDATA[a < b]]></app:data>\n  </metadata>\n  <qemu:commandline>\n    <qemu:arg value=\"-S\"/>\n  </qemu:commandline>\n</domain>";

    #[test]
    fn passthrough_is_verbatim() {
        let mut r = XmlReader::new(FIXTURE);
        let root = r.root().expect("root");
        let namespaces = Namespace::collect(&root).expect("namespaces");
        assert_eq!(
            namespaces,
            vec![Namespace::new("qemu", "http://libvirt.org/schemas/domain/qemu/1.0")]
        );

        let mut metadata = None;
        let mut extensions = Vec::new();
        while let Some(child) = r.next_child(&root).expect("child") {
            if child.name() == "metadata" {
                metadata = r.read::<RawXml>(&child).expect("metadata");
            } else if RawElement::is_extension(&child) {
                extensions.extend(r.read::<RawElement>(&child).expect("extension"));
            } else {
                r.skip(&child).expect("skip");
            }
        }
        let metadata = metadata.expect("metadata present");
        assert!(metadata.0.contains("<![CDATA[a < b]]>"));
        assert_eq!(extensions.len(), 1);
        assert_eq!(extensions[0].name, "qemu:commandline");

        let mut w = XmlWriter::new(Vec::new());
        let mut tag = Tag::new("domain");
        Namespace::apply(&namespaces, &mut tag);
        tag.attr("type", "kvm");
        w.element(tag, |w| {
            metadata.to_xml("metadata", w)?;
            w.children("", &extensions)
        })
        .expect("encode");
        let out = String::from_utf8(w.into_inner()).expect("utf8");
        assert_eq!(out, FIXTURE);
    }

    #[test]
    fn metadata_ending_in_element_roundtrips() {
        let xml = "<metadata>\n  <a>x</a>\n</metadata>";
        let mut r = XmlReader::new(xml);
        let root = r.root().expect("root");
        let raw = r.read::<RawXml>(&root).expect("decode").expect("raw");
        assert_eq!(raw.0, "\n  <a>x</a>\n");

        let mut w = XmlWriter::new(Vec::new());
        raw.to_xml("metadata", &mut w).expect("encode");
        assert_eq!(String::from_utf8(w.into_inner()).expect("utf8"), xml);
    }

    #[test]
    fn empty_metadata_self_closes() {
        let mut w = XmlWriter::new(Vec::new());
        RawXml::default().to_xml("metadata", &mut w).expect("encode");
        assert_eq!(String::from_utf8(w.into_inner()).expect("utf8"), "<metadata/>");
    }
}
