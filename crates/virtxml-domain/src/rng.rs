//! `<rng>` entropy devices.

use std::io::Write;

use virtxml_codec::union::{self, read_into};
use virtxml_codec::{
    registry, Base, Element, FromXml, Result, Tag, ToXml, UintFormat, Union, XmlReader, XmlWriter,
};

use crate::address::DomainAddress;
use crate::chardev::ChardevSource;

registry! {
    pub enum RngBackendKind for "rng backend" {
        carrier: Attribute("model"),
        absent: Unset,
        unknown: Skip,
        Random = "random",
        Egd = "egd",
        Builtin = "builtin",
    }
}

/// `<backend model=...>`. The egd backend is itself a character device
/// whose kind is the `type` attribute of the same element.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RngBackend {
    Random { device: Option<String> },
    Egd(Option<ChardevSource>),
    Builtin,
}

impl Union for RngBackend {
    type Kind = RngBackendKind;

    fn kind(&self) -> RngBackendKind {
        match self {
            RngBackend::Random { .. } => RngBackendKind::Random,
            RngBackend::Egd(_) => RngBackendKind::Egd,
            RngBackend::Builtin => RngBackendKind::Builtin,
        }
    }

    fn allocate(kind: RngBackendKind) -> Self {
        match kind {
            RngBackendKind::Random => RngBackend::Random { device: None },
            RngBackendKind::Egd => RngBackend::Egd(None),
            RngBackendKind::Builtin => RngBackend::Builtin,
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        if let RngBackend::Egd(source) = self {
            union::write_carried(tag, source.as_ref());
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            RngBackend::Random { device: Some(device) } => w.text(device),
            RngBackend::Egd(Some(source)) => source.write_body(w),
            _ => Ok(()),
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        if let RngBackend::Egd(source) = self {
            *source = union::allocate(el)?;
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match self {
            RngBackend::Egd(source) => read_into(source, child, r),
            _ => Ok(false),
        }
    }
}

impl ToXml for RngBackend {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        union::write_union(name, self, w)
    }
}

impl FromXml for RngBackend {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        match union::allocate::<RngBackend>(el)? {
            // the random device path is the element's text
            Some(RngBackend::Random { .. }) => {
                let device = r.text(el)?;
                Ok(Some(RngBackend::Random {
                    device: (!device.is_empty()).then_some(device),
                }))
            }
            Some(mut backend) => {
                union::read_children(&mut backend, el, r)?;
                Ok(Some(backend))
            }
            None => {
                r.skip(el)?;
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RngRate {
    pub bytes: Option<u32>,
    pub period: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rng {
    pub model: Option<String>,
    pub rate: Option<RngRate>,
    pub backend: Option<RngBackend>,
    pub alias: Option<String>,
    pub address: Option<DomainAddress>,
}

impl ToXml for Rng {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("model", self.model.as_deref());
        w.element(tag, |w| {
            if let Some(rate) = &self.rate {
                let mut tag = Tag::new("rate");
                tag.uint("bytes", rate.bytes, UintFormat::Decimal)
                    .uint("period", rate.period, UintFormat::Decimal);
                w.empty(tag)?;
            }
            w.child("backend", self.backend.as_ref())?;
            w.attr_element("alias", "name", self.alias.as_deref())?;
            w.child("address", self.address.as_ref())
        })
    }
}

impl FromXml for Rng {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Rng {
            model: el.attr("model")?,
            ..Rng::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "backend" => out.backend = r.read(child)?,
                "address" => out.address = r.read(child)?,
                "rate" => {
                    out.rate = Some(RngRate {
                        bytes: child.uint("bytes", Base::Decimal)?,
                        period: child.uint("period", Base::Decimal)?,
                    });
                    return Ok(false);
                }
                "alias" => {
                    out.alias = child.attr("name")?;
                    return Ok(false);
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chardev::ChardevUdp;

    fn encode(rng: &Rng) -> String {
        let mut w = XmlWriter::new(Vec::new());
        rng.to_xml("rng", &mut w).expect("encode");
        String::from_utf8(w.into_inner()).expect("utf8")
    }

    fn decode(xml: &str) -> Rng {
        let mut r = XmlReader::new(xml);
        let root = r.root().expect("root");
        Rng::from_xml(&root, &mut r).expect("decode").expect("rng")
    }

    #[test]
    fn random_backend_text() {
        let xml = r#"<rng model="virtio">
  <rate bytes="1234" period="2000"/>
  <backend model="random">/dev/urandom</backend>
  <address type="pci" domain="0x0000" bus="0x00" slot="0x06" function="0x0"/>
</rng>"#;
        let rng = decode(xml);
        assert_eq!(
            rng.backend,
            Some(RngBackend::Random {
                device: Some("/dev/urandom".into())
            })
        );
        assert_eq!(encode(&rng), xml);
    }

    #[test]
    fn egd_backend_nests_chardev() {
        let xml = r#"<rng model="virtio">
  <backend model="egd" type="udp">
    <source mode="bind" service="1234"/>
    <source mode="connect" host="1.2.3.4" service="1234"/>
  </backend>
</rng>"#;
        let rng = decode(xml);
        assert_eq!(
            rng.backend,
            Some(RngBackend::Egd(Some(ChardevSource::Udp(ChardevUdp {
                bind_host: None,
                bind_service: Some("1234".into()),
                connect_host: Some("1.2.3.4".into()),
                connect_service: Some("1234".into()),
            }))))
        );
        assert_eq!(encode(&rng), xml);
    }

    #[test]
    fn builtin_and_unknown_backends() {
        let xml = "<rng model=\"virtio\">\n  <backend model=\"builtin\"/>\n</rng>";
        assert_eq!(encode(&decode(xml)), xml);

        let rng = decode(r#"<rng model="virtio"><backend model="lava-lamp">x</backend></rng>"#);
        assert_eq!(rng.backend, None);
    }
}
