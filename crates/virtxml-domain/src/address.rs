//! Device addresses: `<address type="...">` with attribute-only variants.
//!
//! Every variant is a composite identifier whose whole state lives in
//! attributes, each with its own wire spelling:
//!
//! | variant       | attributes                                              |
//! |---------------|---------------------------------------------------------|
//! | pci           | domain `0x%04x`, bus/slot `0x%02x`, function `0x%x`     |
//! | zpci (child)  | uid `0x%04x`, fid `0x%08x`                              |
//! | ccw           | cssid/ssid `0x%x`, devno `0x%04x`                       |
//! | isa           | iobase/irq `0x%x`                                       |
//! | dimm          | slot decimal, base `0x%x`                               |
//! | spapr-vio     | reg `0x%x`                                              |
//! | drive, virtio-serial, ccid, usb | decimal                               |

use std::io::Write;

use virtxml_codec::{
    registry, Base, Element, FromXml, Result, Tag, ToXml, UintFormat, Union, XmlReader, XmlWriter,
};

registry! {
    pub enum AddressKind for "domain address" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        Pci = "pci",
        Drive = "drive",
        VirtioSerial = "virtio-serial",
        Ccid = "ccid",
        Usb = "usb",
        SpaprVio = "spapr-vio",
        VirtioS390 = "virtio-s390",
        Ccw = "ccw",
        VirtioMmio = "virtio-mmio",
        Isa = "isa",
        Dimm = "dimm",
        Unassigned = "unassigned",
    }
}

/// Guest-side location of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DomainAddress {
    Pci(PciAddress),
    Drive(DriveAddress),
    VirtioSerial(VirtioSerialAddress),
    Ccid(CcidAddress),
    Usb(UsbAddress),
    SpaprVio(SpaprVioAddress),
    VirtioS390,
    Ccw(CcwAddress),
    VirtioMmio,
    Isa(IsaAddress),
    Dimm(DimmAddress),
    Unassigned,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PciAddress {
    pub domain: Option<u32>,
    pub bus: Option<u32>,
    pub slot: Option<u32>,
    pub function: Option<u32>,
    pub multifunction: Option<String>,
    pub zpci: Option<ZpciAddress>,
}

/// s390 PCI identifiers nested under a PCI address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZpciAddress {
    pub uid: Option<u32>,
    pub fid: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriveAddress {
    pub controller: Option<u32>,
    pub bus: Option<u32>,
    pub target: Option<u32>,
    pub unit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtioSerialAddress {
    pub controller: Option<u32>,
    pub bus: Option<u32>,
    pub port: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CcidAddress {
    pub controller: Option<u32>,
    pub slot: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UsbAddress {
    pub bus: Option<u32>,
    /// Dotted hub path such as `1.2`.
    pub port: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpaprVioAddress {
    pub reg: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CcwAddress {
    pub cssid: Option<u32>,
    pub ssid: Option<u32>,
    pub devno: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IsaAddress {
    pub iobase: Option<u32>,
    pub irq: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DimmAddress {
    pub slot: Option<u32>,
    pub base: Option<u64>,
}

const HEX2: UintFormat = UintFormat::Hex { width: 2 };
const HEX4: UintFormat = UintFormat::Hex { width: 4 };
const HEX8: UintFormat = UintFormat::Hex { width: 8 };

impl PciAddress {
    pub fn new(domain: u32, bus: u32, slot: u32, function: u32) -> Self {
        PciAddress {
            domain: Some(domain),
            bus: Some(bus),
            slot: Some(slot),
            function: Some(function),
            ..PciAddress::default()
        }
    }

    pub fn write_attrs(&self, tag: &mut Tag) {
        tag.uint("domain", self.domain, HEX4)
            .uint("bus", self.bus, HEX2)
            .uint("slot", self.slot, HEX2)
            .uint("function", self.function, UintFormat::HEX)
            .opt("multifunction", self.multifunction.as_deref());
    }

    pub fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        if let Some(zpci) = &self.zpci {
            let mut tag = Tag::new("zpci");
            tag.uint("uid", zpci.uid, HEX4).uint("fid", zpci.fid, HEX8);
            w.empty(tag)?;
        }
        Ok(())
    }

    pub fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        self.domain = el.uint("domain", Base::Hex)?;
        self.bus = el.uint("bus", Base::Hex)?;
        self.slot = el.uint("slot", Base::Hex)?;
        self.function = el.uint("function", Base::Hex)?;
        self.multifunction = el.attr("multifunction")?;
        Ok(())
    }

    pub fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        if child.name() != "zpci" {
            return Ok(false);
        }
        self.zpci = Some(ZpciAddress {
            uid: child.uint("uid", Base::Hex)?,
            fid: child.uint("fid", Base::Hex)?,
        });
        r.skip(child)?;
        Ok(true)
    }
}

/// Untyped form, as found inside hostdev and nvme `<source>` elements.
impl ToXml for PciAddress {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        self.write_attrs(&mut tag);
        w.element(tag, |w| self.write_body(w))
    }
}

impl FromXml for PciAddress {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = PciAddress::default();
        out.read_attrs(el)?;
        r.each_child(el, |r, child| out.read_child(child, r))?;
        Ok(Some(out))
    }
}

impl Union for DomainAddress {
    type Kind = AddressKind;

    fn kind(&self) -> AddressKind {
        match self {
            DomainAddress::Pci(_) => AddressKind::Pci,
            DomainAddress::Drive(_) => AddressKind::Drive,
            DomainAddress::VirtioSerial(_) => AddressKind::VirtioSerial,
            DomainAddress::Ccid(_) => AddressKind::Ccid,
            DomainAddress::Usb(_) => AddressKind::Usb,
            DomainAddress::SpaprVio(_) => AddressKind::SpaprVio,
            DomainAddress::VirtioS390 => AddressKind::VirtioS390,
            DomainAddress::Ccw(_) => AddressKind::Ccw,
            DomainAddress::VirtioMmio => AddressKind::VirtioMmio,
            DomainAddress::Isa(_) => AddressKind::Isa,
            DomainAddress::Dimm(_) => AddressKind::Dimm,
            DomainAddress::Unassigned => AddressKind::Unassigned,
        }
    }

    fn allocate(kind: AddressKind) -> Self {
        match kind {
            AddressKind::Pci => DomainAddress::Pci(PciAddress::default()),
            AddressKind::Drive => DomainAddress::Drive(DriveAddress::default()),
            AddressKind::VirtioSerial => DomainAddress::VirtioSerial(VirtioSerialAddress::default()),
            AddressKind::Ccid => DomainAddress::Ccid(CcidAddress::default()),
            AddressKind::Usb => DomainAddress::Usb(UsbAddress::default()),
            AddressKind::SpaprVio => DomainAddress::SpaprVio(SpaprVioAddress::default()),
            AddressKind::VirtioS390 => DomainAddress::VirtioS390,
            AddressKind::Ccw => DomainAddress::Ccw(CcwAddress::default()),
            AddressKind::VirtioMmio => DomainAddress::VirtioMmio,
            AddressKind::Isa => DomainAddress::Isa(IsaAddress::default()),
            AddressKind::Dimm => DomainAddress::Dimm(DimmAddress::default()),
            AddressKind::Unassigned => DomainAddress::Unassigned,
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        match self {
            DomainAddress::Pci(pci) => pci.write_attrs(tag),
            DomainAddress::Drive(a) => {
                tag.uint("controller", a.controller, UintFormat::Decimal)
                    .uint("bus", a.bus, UintFormat::Decimal)
                    .uint("target", a.target, UintFormat::Decimal)
                    .uint("unit", a.unit, UintFormat::Decimal);
            }
            DomainAddress::VirtioSerial(a) => {
                tag.uint("controller", a.controller, UintFormat::Decimal)
                    .uint("bus", a.bus, UintFormat::Decimal)
                    .uint("port", a.port, UintFormat::Decimal);
            }
            DomainAddress::Ccid(a) => {
                tag.uint("controller", a.controller, UintFormat::Decimal)
                    .uint("slot", a.slot, UintFormat::Decimal);
            }
            DomainAddress::Usb(a) => {
                tag.uint("bus", a.bus, UintFormat::Decimal)
                    .opt("port", a.port.as_deref());
            }
            DomainAddress::SpaprVio(a) => {
                tag.uint("reg", a.reg, UintFormat::HEX);
            }
            DomainAddress::Ccw(a) => {
                tag.uint("cssid", a.cssid, UintFormat::HEX)
                    .uint("ssid", a.ssid, UintFormat::HEX)
                    .uint("devno", a.devno, HEX4);
            }
            DomainAddress::Isa(a) => {
                tag.uint("iobase", a.iobase, UintFormat::HEX)
                    .uint("irq", a.irq, UintFormat::HEX);
            }
            DomainAddress::Dimm(a) => {
                tag.uint("slot", a.slot, UintFormat::Decimal)
                    .uint("base", a.base, UintFormat::HEX);
            }
            DomainAddress::VirtioS390 | DomainAddress::VirtioMmio | DomainAddress::Unassigned => {}
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            DomainAddress::Pci(pci) => pci.write_body(w),
            _ => Ok(()),
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        match self {
            DomainAddress::Pci(pci) => pci.read_attrs(el)?,
            DomainAddress::Drive(a) => {
                a.controller = el.uint("controller", Base::Decimal)?;
                a.bus = el.uint("bus", Base::Decimal)?;
                a.target = el.uint("target", Base::Decimal)?;
                a.unit = el.uint("unit", Base::Decimal)?;
            }
            DomainAddress::VirtioSerial(a) => {
                a.controller = el.uint("controller", Base::Decimal)?;
                a.bus = el.uint("bus", Base::Decimal)?;
                a.port = el.uint("port", Base::Decimal)?;
            }
            DomainAddress::Ccid(a) => {
                a.controller = el.uint("controller", Base::Decimal)?;
                a.slot = el.uint("slot", Base::Decimal)?;
            }
            DomainAddress::Usb(a) => {
                a.bus = el.uint("bus", Base::Decimal)?;
                a.port = el.attr("port")?;
            }
            DomainAddress::SpaprVio(a) => a.reg = el.uint("reg", Base::Hex)?,
            DomainAddress::Ccw(a) => {
                a.cssid = el.uint("cssid", Base::Hex)?;
                a.ssid = el.uint("ssid", Base::Hex)?;
                a.devno = el.uint("devno", Base::Hex)?;
            }
            DomainAddress::Isa(a) => {
                a.iobase = el.uint("iobase", Base::Hex)?;
                a.irq = el.uint("irq", Base::Hex)?;
            }
            DomainAddress::Dimm(a) => {
                a.slot = el.uint("slot", Base::Decimal)?;
                a.base = el.uint("base", Base::Hex)?;
            }
            DomainAddress::VirtioS390 | DomainAddress::VirtioMmio | DomainAddress::Unassigned => {}
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match self {
            DomainAddress::Pci(pci) => pci.read_child(child, r),
            _ => Ok(false),
        }
    }
}

virtxml_codec::union_xml!(DomainAddress);

#[cfg(test)]
mod tests {
    use super::*;
    use virtxml_codec::XmlError;

    fn encode(addr: &DomainAddress) -> String {
        let mut w = XmlWriter::new(Vec::new());
        addr.to_xml("address", &mut w).expect("encode");
        String::from_utf8(w.into_inner()).expect("utf8")
    }

    fn decode(xml: &str) -> Result<Option<DomainAddress>> {
        let mut r = XmlReader::new(xml);
        let root = r.root()?;
        DomainAddress::from_xml(&root, &mut r)
    }

    #[test]
    fn pci_attribute_format() {
        let addr = DomainAddress::Pci(PciAddress {
            multifunction: Some("on".into()),
            ..PciAddress::new(0, 1, 2, 0)
        });
        let xml = encode(&addr);
        assert_eq!(
            xml,
            r#"<address type="pci" domain="0x0000" bus="0x01" slot="0x02" function="0x0" multifunction="on"/>"#
        );
        assert_eq!(decode(&xml).expect("decode"), Some(addr));
    }

    #[test]
    fn zpci_child_roundtrip() {
        let xml = "<address type=\"pci\" domain=\"0x0000\" bus=\"0x00\" slot=\"0x01\" function=\"0x0\">\n  <zpci uid=\"0x0001\" fid=\"0x00000000\"/>\n</address>";
        let addr = decode(xml).expect("decode").expect("pci");
        match &addr {
            DomainAddress::Pci(pci) => {
                assert_eq!(pci.zpci, Some(ZpciAddress { uid: Some(1), fid: Some(0) }));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(encode(&addr), xml);
    }

    #[test]
    fn every_variant_roundtrips() {
        let cases = [
            r#"<address type="drive" controller="0" bus="0" target="0" unit="1"/>"#,
            r#"<address type="virtio-serial" controller="0" bus="0" port="2"/>"#,
            r#"<address type="ccid" controller="0" slot="0"/>"#,
            r#"<address type="usb" bus="0" port="1.2"/>"#,
            r#"<address type="spapr-vio" reg="0x2000"/>"#,
            r#"<address type="virtio-s390"/>"#,
            r#"<address type="ccw" cssid="0xfe" ssid="0x0" devno="0x0001"/>"#,
            r#"<address type="virtio-mmio"/>"#,
            r#"<address type="isa" iobase="0x505" irq="0x4"/>"#,
            r#"<address type="dimm" slot="0" base="0x100000000"/>"#,
            r#"<address type="unassigned"/>"#,
        ];
        for xml in cases {
            let addr = decode(xml).expect("decode").expect("known variant");
            assert_eq!(encode(&addr), xml);
        }
    }

    #[test]
    fn hex_fields_accept_missing_prefix() {
        let addr = decode(r#"<address type="pci" domain="0000" bus="1f" slot="0x02" function="7"/>"#)
            .expect("decode");
        assert_eq!(addr, Some(DomainAddress::Pci(PciAddress::new(0, 0x1f, 2, 7))));
    }

    #[test]
    fn decimal_fields_reject_hex() {
        let err = decode(r#"<address type="drive" controller="0x1"/>"#).unwrap_err();
        match err {
            XmlError::MalformedAttribute { field, raw, .. } => {
                assert_eq!(field, "controller");
                assert_eq!(raw, "0x1");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn untyped_and_unknown_addresses_are_skipped() {
        assert_eq!(decode(r#"<address bus="1"/>"#).expect("decode"), None);
        assert_eq!(decode(r#"<address type="s390-future" id="1"/>"#).expect("decode"), None);
    }
}
