//! `<controller>` devices.

use std::io::Write;

use virtxml_codec::union::{self, read_into};
use virtxml_codec::{
    registry, Base, Element, FromXml, Result, Tag, ToXml, UintFormat, Union, XmlReader, XmlWriter,
};

use crate::address::DomainAddress;

registry! {
    pub enum ControllerKind for "controller" {
        carrier: Attribute("type"),
        absent: Required,
        unknown: Skip,
        Ide = "ide",
        Fdc = "fdc",
        Scsi = "scsi",
        Sata = "sata",
        Usb = "usb",
        Ccid = "ccid",
        VirtioSerial = "virtio-serial",
        Xenbus = "xenbus",
        Pci = "pci",
        Isa = "isa",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControllerVariant {
    Ide,
    Fdc,
    Scsi,
    Sata,
    Usb {
        ports: Option<u32>,
        master_startport: Option<u32>,
    },
    Ccid,
    VirtioSerial {
        ports: Option<u32>,
        vectors: Option<u32>,
    },
    Xenbus {
        max_grant_frames: Option<u32>,
        max_event_channels: Option<u32>,
    },
    Pci {
        model_name: Option<String>,
        target: Option<PciControllerTarget>,
    },
    Isa,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PciControllerTarget {
    pub chassis_nr: Option<u32>,
    pub chassis: Option<u32>,
    /// Written as hex, e.g. `port="0x10"`.
    pub port: Option<u32>,
    pub bus_nr: Option<u32>,
    pub index: Option<u32>,
    pub hotplug: Option<String>,
    pub node: Option<u32>,
}

impl ToXml for PciControllerTarget {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.uint("chassisNr", self.chassis_nr, UintFormat::Decimal)
            .uint("chassis", self.chassis, UintFormat::Decimal)
            .uint("port", self.port, UintFormat::HEX)
            .uint("busNr", self.bus_nr, UintFormat::Decimal)
            .uint("index", self.index, UintFormat::Decimal)
            .opt("hotplug", self.hotplug.as_deref());
        w.element(tag, |w| {
            w.uint_text("node", self.node, UintFormat::Decimal)
        })
    }
}

impl FromXml for PciControllerTarget {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = PciControllerTarget {
            chassis_nr: el.uint("chassisNr", Base::Decimal)?,
            chassis: el.uint("chassis", Base::Decimal)?,
            port: el.uint("port", Base::Auto)?,
            bus_nr: el.uint("busNr", Base::Decimal)?,
            index: el.uint("index", Base::Decimal)?,
            hotplug: el.attr("hotplug")?,
            node: None,
        };
        r.each_child(el, |r, child| {
            if child.name() != "node" {
                return Ok(false);
            }
            out.node = Some(r.uint_text(child, Base::Decimal)?);
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl Union for ControllerVariant {
    type Kind = ControllerKind;

    fn kind(&self) -> ControllerKind {
        match self {
            ControllerVariant::Ide => ControllerKind::Ide,
            ControllerVariant::Fdc => ControllerKind::Fdc,
            ControllerVariant::Scsi => ControllerKind::Scsi,
            ControllerVariant::Sata => ControllerKind::Sata,
            ControllerVariant::Usb { .. } => ControllerKind::Usb,
            ControllerVariant::Ccid => ControllerKind::Ccid,
            ControllerVariant::VirtioSerial { .. } => ControllerKind::VirtioSerial,
            ControllerVariant::Xenbus { .. } => ControllerKind::Xenbus,
            ControllerVariant::Pci { .. } => ControllerKind::Pci,
            ControllerVariant::Isa => ControllerKind::Isa,
        }
    }

    fn allocate(kind: ControllerKind) -> Self {
        match kind {
            ControllerKind::Ide => ControllerVariant::Ide,
            ControllerKind::Fdc => ControllerVariant::Fdc,
            ControllerKind::Scsi => ControllerVariant::Scsi,
            ControllerKind::Sata => ControllerVariant::Sata,
            ControllerKind::Usb => ControllerVariant::Usb {
                ports: None,
                master_startport: None,
            },
            ControllerKind::Ccid => ControllerVariant::Ccid,
            ControllerKind::VirtioSerial => ControllerVariant::VirtioSerial {
                ports: None,
                vectors: None,
            },
            ControllerKind::Xenbus => ControllerVariant::Xenbus {
                max_grant_frames: None,
                max_event_channels: None,
            },
            ControllerKind::Pci => ControllerVariant::Pci {
                model_name: None,
                target: None,
            },
            ControllerKind::Isa => ControllerVariant::Isa,
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        match self {
            ControllerVariant::Usb { ports, .. } => {
                tag.uint("ports", *ports, UintFormat::Decimal);
            }
            ControllerVariant::VirtioSerial { ports, vectors } => {
                tag.uint("ports", *ports, UintFormat::Decimal)
                    .uint("vectors", *vectors, UintFormat::Decimal);
            }
            ControllerVariant::Xenbus {
                max_grant_frames,
                max_event_channels,
            } => {
                tag.uint("maxGrantFrames", *max_grant_frames, UintFormat::Decimal)
                    .uint("maxEventChannels", *max_event_channels, UintFormat::Decimal);
            }
            _ => {}
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            ControllerVariant::Usb {
                master_startport: Some(port),
                ..
            } => w.attr_element("master", "startport", Some(&port.to_string())),
            ControllerVariant::Pci { model_name, target } => {
                w.attr_element("model", "name", model_name.as_deref())?;
                w.child("target", target.as_ref())
            }
            _ => Ok(()),
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        match self {
            ControllerVariant::Usb { ports, .. } => *ports = el.uint("ports", Base::Decimal)?,
            ControllerVariant::VirtioSerial { ports, vectors } => {
                *ports = el.uint("ports", Base::Decimal)?;
                *vectors = el.uint("vectors", Base::Decimal)?;
            }
            ControllerVariant::Xenbus {
                max_grant_frames,
                max_event_channels,
            } => {
                *max_grant_frames = el.uint("maxGrantFrames", Base::Decimal)?;
                *max_event_channels = el.uint("maxEventChannels", Base::Decimal)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match (self, child.name()) {
            (ControllerVariant::Usb { master_startport, .. }, "master") => {
                *master_startport = child.uint("startport", Base::Decimal)?;
            }
            (ControllerVariant::Pci { model_name, .. }, "model") => {
                *model_name = child.attr("name")?;
            }
            (ControllerVariant::Pci { target, .. }, "target") => {
                *target = r.read(child)?;
                return Ok(true);
            }
            _ => return Ok(false),
        }
        r.skip(child)?;
        Ok(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerDriver {
    pub queues: Option<u32>,
    pub iothread: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Controller {
    pub variant: Option<ControllerVariant>,
    pub index: Option<u32>,
    pub model: Option<String>,
    pub driver: Option<ControllerDriver>,
    pub alias: Option<String>,
    pub address: Option<DomainAddress>,
}

impl ToXml for Controller {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        if let Some(variant) = &self.variant {
            union::write_discriminator(&mut tag, variant);
        }
        tag.uint("index", self.index, UintFormat::Decimal)
            .opt("model", self.model.as_deref());
        if let Some(variant) = &self.variant {
            variant.write_attrs(&mut tag);
        }
        w.element(tag, |w| {
            if let Some(driver) = &self.driver {
                let mut tag = Tag::new("driver");
                tag.uint("queues", driver.queues, UintFormat::Decimal)
                    .uint("iothread", driver.iothread, UintFormat::Decimal);
                w.empty(tag)?;
            }
            if let Some(variant) = &self.variant {
                variant.write_body(w)?;
            }
            w.attr_element("alias", "name", self.alias.as_deref())?;
            w.child("address", self.address.as_ref())
        })
    }
}

impl FromXml for Controller {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Controller {
            variant: union::allocate(el)?,
            index: el.uint("index", Base::Decimal)?,
            model: el.attr("model")?,
            ..Controller::default()
        };
        r.each_child(el, |r, child| {
            if read_into(&mut out.variant, child, r)? {
                return Ok(true);
            }
            match child.name() {
                "driver" => {
                    out.driver = Some(ControllerDriver {
                        queues: child.uint("queues", Base::Decimal)?,
                        iothread: child.uint("iothread", Base::Decimal)?,
                    })
                }
                "alias" => out.alias = child.attr("name")?,
                "address" => {
                    out.address = r.read(child)?;
                    return Ok(true);
                }
                _ => {}
            }
            Ok(false)
        })?;
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use virtxml_codec::{Registry, XmlError};

    fn encode(c: &Controller) -> String {
        let mut w = XmlWriter::new(Vec::new());
        c.to_xml("controller", &mut w).expect("encode");
        String::from_utf8(w.into_inner()).expect("utf8")
    }

    fn decode(xml: &str) -> Result<Controller> {
        let mut r = XmlReader::new(xml);
        let root = r.root()?;
        Ok(Controller::from_xml(&root, &mut r)?.expect("controller"))
    }

    #[test]
    fn pcie_root_port_roundtrip() {
        let xml = r#"<controller type="pci" index="1" model="pcie-root-port">
  <model name="pcie-root-port"/>
  <target chassis="1" port="0x10"/>
  <alias name="pci.1"/>
  <address type="pci" domain="0x0000" bus="0x00" slot="0x02" function="0x0" multifunction="on"/>
</controller>"#;
        let c = decode(xml).expect("decode");
        match &c.variant {
            Some(ControllerVariant::Pci { target, .. }) => {
                assert_eq!(target.as_ref().and_then(|t| t.port), Some(0x10));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(encode(&c), xml);
    }

    #[test]
    fn variant_attributes_follow_index_and_model() {
        let xml = r#"<controller type="virtio-serial" index="0" ports="16" vectors="4"/>"#;
        assert_eq!(encode(&decode(xml).expect("decode")), xml);

        let xml = "<controller type=\"usb\" index=\"0\" model=\"ich9-uhci1\">\n  <master startport=\"0\"/>\n</controller>";
        assert_eq!(encode(&decode(xml).expect("decode")), xml);

        let xml = r#"<controller type="xenbus" index="0" maxGrantFrames="64"/>"#;
        assert_eq!(encode(&decode(xml).expect("decode")), xml);
    }

    #[test]
    fn every_kind_roundtrips() {
        for (wire, kind) in <ControllerKind as Registry>::TABLE {
            let c = Controller {
                variant: Some(ControllerVariant::allocate(*kind)),
                index: Some(0),
                ..Controller::default()
            };
            let xml = encode(&c);
            assert_eq!(xml, format!("<controller type=\"{wire}\" index=\"0\"/>"));
            assert_eq!(decode(&xml).expect("decode"), c);
        }
    }

    #[test]
    fn type_is_required() {
        assert!(matches!(
            decode(r#"<controller index="0"/>"#),
            Err(XmlError::MissingDiscriminator { .. })
        ));
    }
}
