//! Streaming XML codec for the libvirt schema family.
//!
//! The crate provides the pieces every document crate is built from:
//!
//! * [`attr`]: per-field numeric spellings (`0x%04x`, `0x%x`, decimal...).
//! * [`reader`] / [`writer`]: a pull decoder and an indenting encoder over
//!   quick-xml, with the [`FromXml`] / [`ToXml`] traits.
//! * [`registry`] and [`union`]: closed discriminator tables and the one
//!   generic dispatcher that encodes and decodes every discriminated union.
//! * [`raw`]: verbatim passthrough for metadata and vendor extensions.
//!
//! Document roots implement [`Document`], which adds `marshal`/`unmarshal`.

use std::io::{self, Write};

use tracing::debug;

pub mod attr;
pub mod error;
pub mod raw;
pub mod reader;
pub mod registry;
pub mod union;
pub mod writer;

pub use attr::{format_uint, is_blank, is_hex_spelling, parse_uint, Base, UintFormat};
pub use error::{Result, XmlError};
pub use raw::{Namespace, RawElement, RawXml};
pub use reader::{Element, FromXml, XmlReader};
pub use registry::{Absent, Carrier, Registry, Unknown};
pub use union::Union;
pub use writer::{Tag, ToXml, XmlWriter};

/// A top-level document with a fixed root element.
pub trait Document: ToXml + FromXml {
    /// Name of the root element.
    const ROOT: &'static str;

    /// Encode to a string with two-space indentation and no XML declaration.
    fn marshal(&self) -> Result<String> {
        let bytes = self.marshal_to(Vec::new())?;
        String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err).into())
    }

    /// Encode into `sink` and hand it back.
    fn marshal_to<W: Write>(&self, sink: W) -> Result<W> {
        debug!(root = Self::ROOT, "encoding document");
        let mut w = XmlWriter::new(sink);
        self.to_xml(Self::ROOT, &mut w)?;
        Ok(w.into_inner())
    }

    /// Decode a complete document.
    fn unmarshal(xml: &str) -> Result<Self> {
        debug!(root = Self::ROOT, len = xml.len(), "decoding document");
        let mut r = XmlReader::new(xml);
        let root = r.root()?;
        if root.name() != Self::ROOT {
            return Err(XmlError::UnexpectedRoot {
                expected: Self::ROOT,
                found: root.name().to_string(),
            });
        }
        Self::from_xml(&root, &mut r)?.ok_or_else(|| XmlError::UnknownVariant {
            entity: Self::ROOT,
            raw: root.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Secret {
        ephemeral: Option<String>,
        usage: Option<String>,
    }

    impl ToXml for Secret {
        fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
            let mut tag = Tag::new(name);
            tag.opt("ephemeral", self.ephemeral.as_deref());
            w.element(tag, |w| w.opt_text("usage", self.usage.as_deref()))
        }
    }

    impl FromXml for Secret {
        fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
            let mut out = Secret {
                ephemeral: el.attr("ephemeral")?,
                ..Secret::default()
            };
            r.each_child(el, |r, child| {
                match child.name() {
                    "usage" => out.usage = Some(r.text(child)?),
                    _ => return Ok(false),
                }
                Ok(true)
            })?;
            Ok(Some(out))
        }
    }

    impl Document for Secret {
        const ROOT: &'static str = "secret";
    }

    #[test]
    fn document_roundtrip() {
        let xml = "<?xml version=\"1.0\"?>\n<secret ephemeral=\"no\">\n  <description>ignored</description>\n  <usage>vm1</usage>\n</secret>\n";
        let secret = Secret::unmarshal(xml).expect("decode");
        assert_eq!(
            secret,
            Secret {
                ephemeral: Some("no".into()),
                usage: Some("vm1".into()),
            }
        );
        assert_eq!(
            secret.marshal().expect("encode"),
            "<secret ephemeral=\"no\">\n  <usage>vm1</usage>\n</secret>"
        );
    }

    #[test]
    fn wrong_root_is_rejected() {
        match Secret::unmarshal("<domain/>") {
            Err(XmlError::UnexpectedRoot { expected, found }) => {
                assert_eq!(expected, "secret");
                assert_eq!(found, "domain");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn sink_errors_propagate() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let err = Secret::default().marshal_to(Broken).err().expect("write fails");
        assert!(matches!(err, XmlError::Io(_)));
    }
}
