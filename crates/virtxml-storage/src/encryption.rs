//! `<encryption>` blocks shared by storage volumes and domain disks.

use std::io::Write;

use virtxml_codec::{Base, Element, FromXml, Result, Tag, ToXml, UintFormat, XmlReader, XmlWriter};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Encryption {
    pub format: Option<String>,
    pub engine: Option<String>,
    pub secrets: Vec<EncryptionSecret>,
    pub cipher: Option<Cipher>,
    pub ivgen: Option<IvGen>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncryptionSecret {
    pub kind: Option<String>,
    pub uuid: Option<String>,
    pub usage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cipher {
    pub name: Option<String>,
    pub size: Option<u32>,
    pub mode: Option<String>,
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IvGen {
    pub name: Option<String>,
    pub hash: Option<String>,
}

impl ToXml for Encryption {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("format", self.format.as_deref())
            .opt("engine", self.engine.as_deref());
        w.element(tag, |w| {
            w.children("secret", &self.secrets)?;
            w.child("cipher", self.cipher.as_ref())?;
            w.child("ivgen", self.ivgen.as_ref())
        })
    }
}

impl FromXml for Encryption {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Encryption {
            format: el.attr("format")?,
            engine: el.attr("engine")?,
            ..Encryption::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "secret" => out.secrets.extend(r.read::<EncryptionSecret>(child)?),
                "cipher" => out.cipher = r.read(child)?,
                "ivgen" => out.ivgen = r.read(child)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl ToXml for EncryptionSecret {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("type", self.kind.as_deref())
            .opt("uuid", self.uuid.as_deref())
            .opt("usage", self.usage.as_deref());
        w.empty(tag)
    }
}

impl FromXml for EncryptionSecret {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let out = EncryptionSecret {
            kind: el.attr("type")?,
            uuid: el.attr("uuid")?,
            usage: el.attr("usage")?,
        };
        r.skip(el)?;
        Ok(Some(out))
    }
}

impl ToXml for Cipher {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("name", self.name.as_deref())
            .uint("size", self.size, UintFormat::Decimal)
            .opt("mode", self.mode.as_deref())
            .opt("hash", self.hash.as_deref());
        w.empty(tag)
    }
}

impl FromXml for Cipher {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let out = Cipher {
            name: el.attr("name")?,
            size: el.uint("size", Base::Decimal)?,
            mode: el.attr("mode")?,
            hash: el.attr("hash")?,
        };
        r.skip(el)?;
        Ok(Some(out))
    }
}

impl ToXml for IvGen {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("name", self.name.as_deref())
            .opt("hash", self.hash.as_deref());
        w.empty(tag)
    }
}

impl FromXml for IvGen {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let out = IvGen {
            name: el.attr("name")?,
            hash: el.attr("hash")?,
        };
        r.skip(el)?;
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LUKS: &str = r#"<encryption format="luks">
  <secret type="passphrase" uuid="0a81f5b2-8403-7b23-c8d6-21ccc2f80d6f"/>
  <cipher name="aes" size="256" mode="xts" hash="sha256"/>
  <ivgen name="plain64" hash="sha256"/>
</encryption>"#;

    #[test]
    fn luks_roundtrip() {
        let mut r = XmlReader::new(LUKS);
        let root = r.root().expect("root");
        let enc = Encryption::from_xml(&root, &mut r)
            .expect("decode")
            .expect("present");
        assert_eq!(enc.format.as_deref(), Some("luks"));
        assert_eq!(enc.secrets.len(), 1);
        assert_eq!(enc.cipher.as_ref().and_then(|c| c.size), Some(256));

        let mut w = XmlWriter::new(Vec::new());
        enc.to_xml("encryption", &mut w).expect("encode");
        assert_eq!(String::from_utf8(w.into_inner()).expect("utf8"), LUKS);
    }

    #[test]
    fn cipher_size_must_be_decimal() {
        let mut r = XmlReader::new(r#"<cipher name="aes" size="0x100"/>"#);
        let root = r.root().expect("root");
        assert!(Cipher::from_xml(&root, &mut r).is_err());
    }
}
