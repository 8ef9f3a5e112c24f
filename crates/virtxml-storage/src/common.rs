use std::io::Write;

use virtxml_codec::{Base, Element, FromXml, Result, Tag, ToXml, XmlReader, XmlWriter};

/// A byte quantity such as `<capacity unit="bytes">1073741824</capacity>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    pub unit: Option<String>,
    pub value: u64,
}

impl Size {
    pub fn bytes(value: u64) -> Self {
        Size {
            unit: Some("bytes".into()),
            value,
        }
    }
}

impl ToXml for Size {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("unit", self.unit.as_deref());
        w.element(tag, |w| w.text(&self.value.to_string()))
    }
}

impl FromXml for Size {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let unit = el.attr("unit")?;
        let value = r.uint_text(el, Base::Decimal)?;
        Ok(Some(Size { unit, value }))
    }
}

/// Ownership of a pool or volume target. Values are kept as written
/// (`mode` is octal text, `owner`/`group` may be `-1`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permissions {
    pub mode: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub label: Option<String>,
}

impl ToXml for Permissions {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            w.opt_text("mode", self.mode.as_deref())?;
            w.opt_text("owner", self.owner.as_deref())?;
            w.opt_text("group", self.group.as_deref())?;
            w.opt_text("label", self.label.as_deref())
        })
    }
}

impl FromXml for Permissions {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Permissions::default();
        r.each_child(el, |r, child| {
            let slot = match child.name() {
                "mode" => &mut out.mode,
                "owner" => &mut out.owner,
                "group" => &mut out.group,
                "label" => &mut out.label,
                _ => return Ok(false),
            };
            *slot = Some(r.text(child)?);
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_keeps_unit() {
        let mut w = XmlWriter::new(Vec::new());
        Size::bytes(4096).to_xml("capacity", &mut w).expect("encode");
        let xml = String::from_utf8(w.into_inner()).expect("utf8");
        assert_eq!(xml, "<capacity unit=\"bytes\">4096</capacity>");

        let mut r = XmlReader::new(&xml);
        let root = r.root().expect("root");
        assert_eq!(Size::from_xml(&root, &mut r).expect("decode"), Some(Size::bytes(4096)));
    }

    #[test]
    fn size_rejects_negative_text() {
        let mut r = XmlReader::new("<capacity>-1</capacity>");
        let root = r.root().expect("root");
        assert!(Size::from_xml(&root, &mut r).is_err());
    }
}
