//! `<hostdev>` passthrough devices.
//!
//! Two unions share the element: `mode` picks subsystem or capabilities,
//! then `type` picks the variant inside that mode.

use std::io::Write;

use virtxml_codec::union::{self, read_into};
use virtxml_codec::{
    registry, Base, Element, FromXml, Result, Tag, ToXml, UintFormat, Union, XmlReader, XmlWriter,
};

use crate::address::{DomainAddress, PciAddress};

const HEX4: UintFormat = UintFormat::Hex { width: 4 };

registry! {
    pub enum HostdevModeKind for "hostdev mode" {
        carrier: Attribute("mode"),
        absent: Default(Subsystem),
        unknown: Skip,
        Subsystem = "subsystem",
        Capabilities = "capabilities",
    }
}

registry! {
    pub enum HostdevSubsysKind for "hostdev subsystem" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        Usb = "usb",
        Scsi = "scsi",
        ScsiHost = "scsi_host",
        Pci = "pci",
        Mdev = "mdev",
    }
}

registry! {
    pub enum HostdevCapsKind for "hostdev capability" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        Storage = "storage",
        Misc = "misc",
        Net = "net",
    }
}

registry! {
    pub enum ScsiSourceKind for "scsi hostdev source" {
        carrier: Attribute("protocol"),
        absent: Implicit(Host),
        unknown: Skip,
        Host = "host",
        Iscsi = "iscsi",
    }
}

/// The inner union stays `None` when `type` is missing or unrecognized.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HostdevMode {
    Subsystem(Option<HostdevSubsys>),
    Capabilities(Option<HostdevCaps>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HostdevSubsys {
    Usb(UsbHostdev),
    Scsi(ScsiHostdev),
    ScsiHost(ScsiHostHostdev),
    Pci(PciHostdev),
    Mdev(MdevHostdev),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UsbHostdev {
    pub startup_policy: Option<String>,
    pub vendor: Option<u16>,
    pub product: Option<u16>,
    pub bus: Option<u32>,
    pub device: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScsiHostdev {
    pub sgio: Option<String>,
    pub rawio: Option<String>,
    pub source: Option<ScsiSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScsiHostHostdev {
    pub model: Option<String>,
    pub protocol: Option<String>,
    pub wwpn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PciHostdev {
    pub address: Option<PciAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MdevHostdev {
    pub model: Option<String>,
    pub display: Option<String>,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HostdevCaps {
    Storage { block: Option<String> },
    Misc { chardev: Option<String> },
    Net { interface: Option<String> },
}

/// `<source>` of a SCSI hostdev, keyed by its `protocol` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScsiSource {
    Host(ScsiHostSource),
    Iscsi(IscsiSource),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScsiHostSource {
    pub adapter: Option<String>,
    pub bus: Option<u32>,
    pub target: Option<u32>,
    pub unit: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IscsiSource {
    pub name: Option<String>,
    pub hosts: Vec<IscsiHost>,
    pub auth: Option<IscsiAuth>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IscsiHost {
    pub name: Option<String>,
    pub port: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IscsiAuth {
    pub username: Option<String>,
    pub secret_type: Option<String>,
    pub secret_usage: Option<String>,
}

impl Union for ScsiSource {
    type Kind = ScsiSourceKind;

    fn kind(&self) -> ScsiSourceKind {
        match self {
            ScsiSource::Host(_) => ScsiSourceKind::Host,
            ScsiSource::Iscsi(_) => ScsiSourceKind::Iscsi,
        }
    }

    fn allocate(kind: ScsiSourceKind) -> Self {
        match kind {
            ScsiSourceKind::Host => ScsiSource::Host(ScsiHostSource::default()),
            ScsiSourceKind::Iscsi => ScsiSource::Iscsi(IscsiSource::default()),
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        if let ScsiSource::Iscsi(iscsi) = self {
            tag.opt("name", iscsi.name.as_deref());
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            ScsiSource::Host(host) => {
                w.attr_element("adapter", "name", host.adapter.as_deref())?;
                let mut tag = Tag::new("address");
                tag.uint("bus", host.bus, UintFormat::Decimal)
                    .uint("target", host.target, UintFormat::Decimal)
                    .uint("unit", host.unit, UintFormat::Decimal);
                if !tag.is_bare() {
                    w.empty(tag)?;
                }
            }
            ScsiSource::Iscsi(iscsi) => {
                for host in &iscsi.hosts {
                    let mut tag = Tag::new("host");
                    tag.opt("name", host.name.as_deref())
                        .uint("port", host.port, UintFormat::Decimal);
                    w.empty(tag)?;
                }
                if let Some(auth) = &iscsi.auth {
                    let mut tag = Tag::new("auth");
                    tag.opt("username", auth.username.as_deref());
                    w.element(tag, |w| {
                        let mut tag = Tag::new("secret");
                        tag.opt("type", auth.secret_type.as_deref())
                            .opt("usage", auth.secret_usage.as_deref());
                        if tag.is_bare() {
                            return Ok(());
                        }
                        w.empty(tag)
                    })?;
                }
            }
        }
        Ok(())
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        if let ScsiSource::Iscsi(iscsi) = self {
            iscsi.name = el.attr("name")?;
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match (self, child.name()) {
            (ScsiSource::Host(host), "adapter") => host.adapter = child.attr("name")?,
            (ScsiSource::Host(host), "address") => {
                host.bus = child.uint("bus", Base::Decimal)?;
                host.target = child.uint("target", Base::Decimal)?;
                host.unit = child.uint("unit", Base::Decimal)?;
            }
            (ScsiSource::Iscsi(iscsi), "host") => iscsi.hosts.push(IscsiHost {
                name: child.attr("name")?,
                port: child.uint("port", Base::Decimal)?,
            }),
            (ScsiSource::Iscsi(iscsi), "auth") => {
                let mut auth = IscsiAuth {
                    username: child.attr("username")?,
                    ..IscsiAuth::default()
                };
                r.each_child(child, |_, secret| {
                    if secret.name() == "secret" {
                        auth.secret_type = secret.attr("type")?;
                        auth.secret_usage = secret.attr("usage")?;
                    }
                    Ok(false)
                })?;
                iscsi.auth = Some(auth);
                return Ok(true);
            }
            _ => return Ok(false),
        }
        r.skip(child)?;
        Ok(true)
    }
}

virtxml_codec::union_xml!(ScsiSource);

impl Union for HostdevSubsys {
    type Kind = HostdevSubsysKind;

    fn kind(&self) -> HostdevSubsysKind {
        match self {
            HostdevSubsys::Usb(_) => HostdevSubsysKind::Usb,
            HostdevSubsys::Scsi(_) => HostdevSubsysKind::Scsi,
            HostdevSubsys::ScsiHost(_) => HostdevSubsysKind::ScsiHost,
            HostdevSubsys::Pci(_) => HostdevSubsysKind::Pci,
            HostdevSubsys::Mdev(_) => HostdevSubsysKind::Mdev,
        }
    }

    fn allocate(kind: HostdevSubsysKind) -> Self {
        match kind {
            HostdevSubsysKind::Usb => HostdevSubsys::Usb(UsbHostdev::default()),
            HostdevSubsysKind::Scsi => HostdevSubsys::Scsi(ScsiHostdev::default()),
            HostdevSubsysKind::ScsiHost => HostdevSubsys::ScsiHost(ScsiHostHostdev::default()),
            HostdevSubsysKind::Pci => HostdevSubsys::Pci(PciHostdev::default()),
            HostdevSubsysKind::Mdev => HostdevSubsys::Mdev(MdevHostdev::default()),
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        match self {
            HostdevSubsys::Scsi(scsi) => {
                tag.opt("sgio", scsi.sgio.as_deref())
                    .opt("rawio", scsi.rawio.as_deref());
            }
            HostdevSubsys::ScsiHost(host) => {
                tag.opt("model", host.model.as_deref());
            }
            HostdevSubsys::Mdev(mdev) => {
                tag.opt("model", mdev.model.as_deref())
                    .opt("display", mdev.display.as_deref());
            }
            HostdevSubsys::Usb(_) | HostdevSubsys::Pci(_) => {}
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            HostdevSubsys::Usb(usb) => {
                let mut tag = Tag::new("source");
                tag.opt("startupPolicy", usb.startup_policy.as_deref());
                w.element(tag, |w| {
                    if let Some(vendor) = usb.vendor {
                        w.attr_element("vendor", "id", Some(&HEX4.render(vendor.into())))?;
                    }
                    if let Some(product) = usb.product {
                        w.attr_element("product", "id", Some(&HEX4.render(product.into())))?;
                    }
                    let mut tag = Tag::new("address");
                    tag.uint("bus", usb.bus, UintFormat::Decimal)
                        .uint("device", usb.device, UintFormat::Decimal);
                    if tag.is_bare() {
                        return Ok(());
                    }
                    w.empty(tag)
                })
            }
            HostdevSubsys::Scsi(scsi) => w.child("source", scsi.source.as_ref()),
            HostdevSubsys::ScsiHost(host) => {
                let mut tag = Tag::new("source");
                tag.opt("protocol", host.protocol.as_deref())
                    .opt("wwpn", host.wwpn.as_deref());
                w.empty(tag)
            }
            HostdevSubsys::Pci(pci) => w.element(Tag::new("source"), |w| {
                w.child("address", pci.address.as_ref())
            }),
            HostdevSubsys::Mdev(mdev) => w.element(Tag::new("source"), |w| {
                w.attr_element("address", "uuid", mdev.uuid.as_deref())
            }),
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        match self {
            HostdevSubsys::Scsi(scsi) => {
                scsi.sgio = el.attr("sgio")?;
                scsi.rawio = el.attr("rawio")?;
            }
            HostdevSubsys::ScsiHost(host) => host.model = el.attr("model")?,
            HostdevSubsys::Mdev(mdev) => {
                mdev.model = el.attr("model")?;
                mdev.display = el.attr("display")?;
            }
            HostdevSubsys::Usb(_) | HostdevSubsys::Pci(_) => {}
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        if child.name() != "source" {
            return Ok(false);
        }
        match self {
            HostdevSubsys::Usb(usb) => {
                usb.startup_policy = child.attr("startupPolicy")?;
                r.each_child(child, |_, part| {
                    match part.name() {
                        "vendor" => usb.vendor = part.uint("id", Base::Hex)?,
                        "product" => usb.product = part.uint("id", Base::Hex)?,
                        "address" => {
                            usb.bus = part.uint("bus", Base::Decimal)?;
                            usb.device = part.uint("device", Base::Decimal)?;
                        }
                        _ => {}
                    }
                    Ok(false)
                })?;
            }
            HostdevSubsys::Scsi(scsi) => scsi.source = r.read(child)?,
            HostdevSubsys::ScsiHost(host) => {
                host.protocol = child.attr("protocol")?;
                host.wwpn = child.attr("wwpn")?;
                r.skip(child)?;
            }
            HostdevSubsys::Pci(pci) => r.each_child(child, |r, address| {
                if address.name() != "address" {
                    return Ok(false);
                }
                pci.address = r.read(address)?;
                Ok(true)
            })?,
            HostdevSubsys::Mdev(mdev) => r.each_child(child, |_, address| {
                if address.name() == "address" {
                    mdev.uuid = address.attr("uuid")?;
                }
                Ok(false)
            })?,
        }
        Ok(true)
    }
}

impl Union for HostdevCaps {
    type Kind = HostdevCapsKind;

    fn kind(&self) -> HostdevCapsKind {
        match self {
            HostdevCaps::Storage { .. } => HostdevCapsKind::Storage,
            HostdevCaps::Misc { .. } => HostdevCapsKind::Misc,
            HostdevCaps::Net { .. } => HostdevCapsKind::Net,
        }
    }

    fn allocate(kind: HostdevCapsKind) -> Self {
        match kind {
            HostdevCapsKind::Storage => HostdevCaps::Storage { block: None },
            HostdevCapsKind::Misc => HostdevCaps::Misc { chardev: None },
            HostdevCapsKind::Net => HostdevCaps::Net { interface: None },
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        let (name, value) = self.leaf();
        w.element(Tag::new("source"), |w| w.opt_text(name, value))
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        if child.name() != "source" {
            return Ok(false);
        }
        let (name, slot) = match self {
            HostdevCaps::Storage { block } => ("block", block),
            HostdevCaps::Misc { chardev } => ("char", chardev),
            HostdevCaps::Net { interface } => ("interface", interface),
        };
        r.each_child(child, |r, leaf| {
            if leaf.name() != name {
                return Ok(false);
            }
            *slot = Some(r.text(leaf)?);
            Ok(true)
        })?;
        Ok(true)
    }
}

impl HostdevCaps {
    fn leaf(&self) -> (&'static str, Option<&str>) {
        match self {
            HostdevCaps::Storage { block } => ("block", block.as_deref()),
            HostdevCaps::Misc { chardev } => ("char", chardev.as_deref()),
            HostdevCaps::Net { interface } => ("interface", interface.as_deref()),
        }
    }
}

impl HostdevMode {
    /// Attributes of the inner variant, written after `managed`.
    fn write_variant_attrs(&self, tag: &mut Tag) {
        match self {
            HostdevMode::Subsystem(Some(subsys)) => subsys.write_attrs(tag),
            HostdevMode::Capabilities(Some(caps)) => caps.write_attrs(tag),
            _ => {}
        }
    }
}

impl Union for HostdevMode {
    type Kind = HostdevModeKind;

    fn kind(&self) -> HostdevModeKind {
        match self {
            HostdevMode::Subsystem(_) => HostdevModeKind::Subsystem,
            HostdevMode::Capabilities(_) => HostdevModeKind::Capabilities,
        }
    }

    fn allocate(kind: HostdevModeKind) -> Self {
        match kind {
            HostdevModeKind::Subsystem => HostdevMode::Subsystem(None),
            HostdevModeKind::Capabilities => HostdevMode::Capabilities(None),
        }
    }

    /// Only the inner discriminator; see [`HostdevMode::write_variant_attrs`].
    fn write_attrs(&self, tag: &mut Tag) {
        match self {
            HostdevMode::Subsystem(Some(subsys)) => union::write_discriminator(tag, subsys),
            HostdevMode::Capabilities(Some(caps)) => union::write_discriminator(tag, caps),
            _ => {}
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            HostdevMode::Subsystem(Some(subsys)) => subsys.write_body(w),
            HostdevMode::Capabilities(Some(caps)) => caps.write_body(w),
            _ => Ok(()),
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        match self {
            HostdevMode::Subsystem(subsys) => *subsys = union::allocate(el)?,
            HostdevMode::Capabilities(caps) => *caps = union::allocate(el)?,
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match self {
            HostdevMode::Subsystem(subsys) => read_into(subsys, child, r),
            HostdevMode::Capabilities(caps) => read_into(caps, child, r),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hostdev {
    pub mode: Option<HostdevMode>,
    pub managed: Option<String>,
    pub driver: Option<String>,
    pub boot_order: Option<u32>,
    pub alias: Option<String>,
    pub address: Option<DomainAddress>,
}

impl ToXml for Hostdev {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        union::write_carried(&mut tag, self.mode.as_ref());
        tag.opt("managed", self.managed.as_deref());
        if let Some(mode) = &self.mode {
            mode.write_variant_attrs(&mut tag);
        }
        w.element(tag, |w| {
            w.attr_element("driver", "name", self.driver.as_deref())?;
            if let Some(mode) = &self.mode {
                mode.write_body(w)?;
            }
            if let Some(order) = self.boot_order {
                w.attr_element("boot", "order", Some(&order.to_string()))?;
            }
            w.attr_element("alias", "name", self.alias.as_deref())?;
            w.child("address", self.address.as_ref())
        })
    }
}

impl FromXml for Hostdev {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Hostdev {
            mode: union::allocate(el)?,
            managed: el.attr("managed")?,
            ..Hostdev::default()
        };
        r.each_child(el, |r, child| {
            if read_into(&mut out.mode, child, r)? {
                return Ok(true);
            }
            match child.name() {
                "driver" => out.driver = child.attr("name")?,
                "boot" => out.boot_order = child.uint("order", Base::Decimal)?,
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

    fn encode(dev: &Hostdev) -> String {
        let mut w = XmlWriter::new(Vec::new());
        dev.to_xml("hostdev", &mut w).expect("encode");
        String::from_utf8(w.into_inner()).expect("utf8")
    }

    fn decode(xml: &str) -> Hostdev {
        let mut r = XmlReader::new(xml);
        let root = r.root().expect("root");
        Hostdev::from_xml(&root, &mut r).expect("decode").expect("hostdev")
    }

    #[test]
    fn pci_passthrough_roundtrip() {
        let xml = r#"<hostdev mode="subsystem" type="pci" managed="yes">
  <driver name="vfio"/>
  <source>
    <address domain="0x0000" bus="0x06" slot="0x12" function="0x5"/>
  </source>
  <boot order="1"/>
  <address type="pci" domain="0x0000" bus="0x00" slot="0x09" function="0x0"/>
</hostdev>"#;
        let dev = decode(xml);
        match &dev.mode {
            Some(HostdevMode::Subsystem(Some(HostdevSubsys::Pci(pci)))) => {
                assert_eq!(pci.address, Some(PciAddress::new(0, 6, 0x12, 5)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(encode(&dev), xml);
    }

    #[test]
    fn usb_ids_are_four_digit_hex() {
        let xml = r#"<hostdev mode="subsystem" type="usb" managed="no">
  <source startupPolicy="optional">
    <vendor id="0x046d"/>
    <product id="0xc52b"/>
    <address bus="1" device="4"/>
  </source>
</hostdev>"#;
        let dev = decode(xml);
        match &dev.mode {
            Some(HostdevMode::Subsystem(Some(HostdevSubsys::Usb(usb)))) => {
                assert_eq!(usb.vendor, Some(0x046d));
                assert_eq!(usb.product, Some(0xc52b));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(encode(&dev), xml);
    }

    #[test]
    fn scsi_host_source_omits_implicit_protocol() {
        let xml = r#"<hostdev mode="subsystem" type="scsi" managed="no" sgio="unfiltered" rawio="yes">
  <source>
    <adapter name="scsi_host0"/>
    <address bus="0" target="0" unit="0"/>
  </source>
</hostdev>"#;
        let dev = decode(xml);
        match &dev.mode {
            Some(HostdevMode::Subsystem(Some(HostdevSubsys::Scsi(scsi)))) => {
                assert!(matches!(scsi.source, Some(ScsiSource::Host(_))));
                assert_eq!(scsi.sgio.as_deref(), Some("unfiltered"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(encode(&dev), xml);
    }

    #[test]
    fn scsi_iscsi_source() {
        let xml = r#"<hostdev mode="subsystem" type="scsi">
  <source protocol="iscsi" name="iqn.2014-08.com.example:iscsi-nopool/1">
    <host name="example.com" port="3260"/>
    <auth username="myuser">
      <secret type="iscsi" usage="libvirtiscsi"/>
    </auth>
  </source>
</hostdev>"#;
        assert_eq!(encode(&decode(xml)), xml);
    }

    #[test]
    fn mdev_and_capabilities() {
        let xml = r#"<hostdev mode="subsystem" type="mdev" model="vfio-pci" display="on">
  <source>
    <address uuid="c2177883-f1bb-47f0-914d-32a22e3a8804"/>
  </source>
</hostdev>"#;
        assert_eq!(encode(&decode(xml)), xml);

        let xml = r#"<hostdev mode="capabilities" type="storage">
  <source>
    <block>/dev/sdf1</block>
  </source>
</hostdev>"#;
        let dev = decode(xml);
        assert_eq!(
            dev.mode,
            Some(HostdevMode::Capabilities(Some(HostdevCaps::Storage {
                block: Some("/dev/sdf1".into())
            })))
        );
        assert_eq!(encode(&dev), xml);
    }

    #[test]
    fn unknown_capability_keeps_siblings() {
        let dev = decode(
            r#"<hostdev mode="capabilities" type="quantum"><source><qubit/></source><alias name="hostdev3"/></hostdev>"#,
        );
        assert_eq!(dev.mode, Some(HostdevMode::Capabilities(None)));
        assert_eq!(dev.alias.as_deref(), Some("hostdev3"));
    }

    #[test]
    fn missing_mode_defaults_to_subsystem() {
        let dev = decode(r#"<hostdev type="scsi_host"><source protocol="vhost" wwpn="naa.5123456789abcde0"/></hostdev>"#);
        assert!(matches!(
            dev.mode,
            Some(HostdevMode::Subsystem(Some(HostdevSubsys::ScsiHost(_))))
        ));
        assert_eq!(
            encode(&dev),
            "<hostdev mode=\"subsystem\" type=\"scsi_host\">\n  <source protocol=\"vhost\" wwpn=\"naa.5123456789abcde0\"/>\n</hostdev>"
        );
    }
}
