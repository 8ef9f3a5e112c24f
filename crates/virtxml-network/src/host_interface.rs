//! Physical host interface definitions (`<interface>` as seen by the host,
//! not a guest NIC). Bridges and bonds contain further interfaces.

use std::io::Write;

use virtxml_codec::union;
use virtxml_codec::{
    registry, Base, Document, Element, FromXml, Registry, Result, Tag, ToXml, UintFormat, Union,
    XmlReader, XmlWriter,
};

registry! {
    pub enum HostInterfaceKind for "host interface" {
        carrier: Attribute("type"),
        absent: Required,
        unknown: Reject,
        Ethernet = "ethernet",
        Bridge = "bridge",
        Bond = "bond",
        Vlan = "vlan",
    }
}

registry! {
    pub enum LinkMonitorKind for "bond link monitor" {
        carrier: Structural,
        absent: Unset,
        unknown: Skip,
        Miimon = "miimon",
        Arpmon = "arpmon",
    }
}

/// How a bond detects link failure: `<miimon/>` or `<arpmon/>`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkMonitor {
    Miimon {
        freq: Option<u32>,
        updelay: Option<u32>,
        carrier: Option<String>,
    },
    Arpmon {
        interval: Option<u32>,
        target: Option<String>,
        validate: Option<String>,
    },
}

impl Union for LinkMonitor {
    type Kind = LinkMonitorKind;

    fn kind(&self) -> LinkMonitorKind {
        match self {
            LinkMonitor::Miimon { .. } => LinkMonitorKind::Miimon,
            LinkMonitor::Arpmon { .. } => LinkMonitorKind::Arpmon,
        }
    }

    fn allocate(kind: LinkMonitorKind) -> Self {
        match kind {
            LinkMonitorKind::Miimon => LinkMonitor::Miimon {
                freq: None,
                updelay: None,
                carrier: None,
            },
            LinkMonitorKind::Arpmon => LinkMonitor::Arpmon {
                interval: None,
                target: None,
                validate: None,
            },
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        match self {
            LinkMonitor::Miimon {
                freq,
                updelay,
                carrier,
            } => {
                tag.uint("freq", *freq, UintFormat::Decimal)
                    .uint("updelay", *updelay, UintFormat::Decimal)
                    .opt("carrier", carrier.as_deref());
            }
            LinkMonitor::Arpmon {
                interval,
                target,
                validate,
            } => {
                tag.uint("interval", *interval, UintFormat::Decimal)
                    .opt("target", target.as_deref())
                    .opt("validate", validate.as_deref());
            }
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        match self {
            LinkMonitor::Miimon {
                freq,
                updelay,
                carrier,
            } => {
                *freq = el.uint("freq", Base::Decimal)?;
                *updelay = el.uint("updelay", Base::Decimal)?;
                *carrier = el.attr("carrier")?;
            }
            LinkMonitor::Arpmon {
                interval,
                target,
                validate,
            } => {
                *interval = el.uint("interval", Base::Decimal)?;
                *target = el.attr("target")?;
                *validate = el.attr("validate")?;
            }
        }
        Ok(())
    }
}

virtxml_codec::union_xml!(LinkMonitor);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BridgeInterface {
    pub stp: Option<String>,
    /// Forward delay in seconds, fractional.
    pub delay: Option<String>,
    pub members: Vec<HostInterface>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BondInterface {
    pub mode: Option<String>,
    pub monitor: Option<LinkMonitor>,
    pub members: Vec<HostInterface>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VlanInterface {
    pub tag: Option<u32>,
    /// Underlying device, `<interface name="..."/>` inside `<vlan>`.
    pub dev: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterfaceVariant {
    Ethernet,
    Bridge(BridgeInterface),
    Bond(BondInterface),
    Vlan(VlanInterface),
}

fn write_members<W: Write>(members: &[HostInterface], w: &mut XmlWriter<W>) -> Result<()> {
    w.children("interface", members)
}

fn read_member<'a>(
    members: &mut Vec<HostInterface>,
    child: &Element<'a>,
    r: &mut XmlReader<'a>,
) -> Result<bool> {
    if child.name() != "interface" {
        return Ok(false);
    }
    members.extend(r.read::<HostInterface>(child)?);
    Ok(true)
}

impl Union for InterfaceVariant {
    type Kind = HostInterfaceKind;

    fn kind(&self) -> HostInterfaceKind {
        match self {
            InterfaceVariant::Ethernet => HostInterfaceKind::Ethernet,
            InterfaceVariant::Bridge(_) => HostInterfaceKind::Bridge,
            InterfaceVariant::Bond(_) => HostInterfaceKind::Bond,
            InterfaceVariant::Vlan(_) => HostInterfaceKind::Vlan,
        }
    }

    fn allocate(kind: HostInterfaceKind) -> Self {
        match kind {
            HostInterfaceKind::Ethernet => InterfaceVariant::Ethernet,
            HostInterfaceKind::Bridge => InterfaceVariant::Bridge(BridgeInterface::default()),
            HostInterfaceKind::Bond => InterfaceVariant::Bond(BondInterface::default()),
            HostInterfaceKind::Vlan => InterfaceVariant::Vlan(VlanInterface::default()),
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            InterfaceVariant::Ethernet => Ok(()),
            InterfaceVariant::Bridge(bridge) => {
                let mut tag = Tag::new("bridge");
                tag.opt("stp", bridge.stp.as_deref())
                    .opt("delay", bridge.delay.as_deref());
                w.element(tag, |w| write_members(&bridge.members, w))
            }
            InterfaceVariant::Bond(bond) => {
                let mut tag = Tag::new("bond");
                tag.opt("mode", bond.mode.as_deref());
                w.element(tag, |w| {
                    if let Some(monitor) = &bond.monitor {
                        monitor.to_xml(monitor.kind().as_str(), w)?;
                    }
                    write_members(&bond.members, w)
                })
            }
            InterfaceVariant::Vlan(vlan) => {
                let mut tag = Tag::new("vlan");
                tag.uint("tag", vlan.tag, UintFormat::Decimal);
                w.element(tag, |w| w.attr_element("interface", "name", vlan.dev.as_deref()))
            }
        }
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match (self, child.name()) {
            (InterfaceVariant::Bridge(bridge), "bridge") => {
                bridge.stp = child.attr("stp")?;
                bridge.delay = child.attr("delay")?;
                r.each_child(child, |r, grand| read_member(&mut bridge.members, grand, r))?;
                Ok(true)
            }
            (InterfaceVariant::Bond(bond), "bond") => {
                bond.mode = child.attr("mode")?;
                r.each_child(child, |r, grand| match grand.name() {
                    "miimon" | "arpmon" => {
                        bond.monitor = r.read(grand)?;
                        Ok(true)
                    }
                    _ => read_member(&mut bond.members, grand, r),
                })?;
                Ok(true)
            }
            (InterfaceVariant::Vlan(vlan), "vlan") => {
                vlan.tag = child.uint("tag", Base::Decimal)?;
                r.each_child(child, |_, grand| {
                    if grand.name() == "interface" {
                        vlan.dev = grand.attr("name")?;
                    }
                    Ok(false)
                })?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterfaceLink {
    pub speed: Option<u32>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterfaceIp {
    pub address: Option<String>,
    pub prefix: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterfaceProtocol {
    pub family: Option<String>,
    pub autoconf: bool,
    /// `<dhcp/>` present; the inner value is its `peerdns` setting.
    pub dhcp: Option<Option<String>>,
    pub ips: Vec<InterfaceIp>,
    pub route_gateway: Option<String>,
}

impl ToXml for InterfaceProtocol {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("family", self.family.as_deref());
        w.element(tag, |w| {
            w.flag("autoconf", self.autoconf)?;
            if let Some(peerdns) = &self.dhcp {
                let mut tag = Tag::new("dhcp");
                tag.opt("peerdns", peerdns.as_deref());
                w.empty(tag)?;
            }
            for ip in &self.ips {
                let mut tag = Tag::new("ip");
                tag.opt("address", ip.address.as_deref())
                    .uint("prefix", ip.prefix, UintFormat::Decimal);
                w.empty(tag)?;
            }
            w.attr_element("route", "gateway", self.route_gateway.as_deref())
        })
    }
}

impl FromXml for InterfaceProtocol {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = InterfaceProtocol {
            family: el.attr("family")?,
            ..InterfaceProtocol::default()
        };
        r.each_child(el, |_, child| {
            match child.name() {
                "autoconf" => out.autoconf = true,
                "dhcp" => out.dhcp = Some(child.attr("peerdns")?),
                "ip" => out.ips.push(InterfaceIp {
                    address: child.attr("address")?,
                    prefix: child.uint("prefix", Base::Decimal)?,
                }),
                "route" => out.route_gateway = child.attr("gateway")?,
                _ => {}
            }
            Ok(false)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostInterface {
    pub name: Option<String>,
    pub start_mode: Option<String>,
    pub mac: Option<String>,
    pub mtu: Option<u32>,
    pub link: Option<InterfaceLink>,
    pub protocols: Vec<InterfaceProtocol>,
    pub variant: InterfaceVariant,
}

impl HostInterface {
    pub fn new(name: &str, variant: InterfaceVariant) -> Self {
        HostInterface {
            name: Some(name.to_string()),
            start_mode: None,
            mac: None,
            mtu: None,
            link: None,
            protocols: Vec::new(),
            variant,
        }
    }
}

impl ToXml for HostInterface {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        union::write_discriminator(&mut tag, &self.variant);
        tag.opt("name", self.name.as_deref());
        w.element(tag, |w| {
            w.attr_element("start", "mode", self.start_mode.as_deref())?;
            w.attr_element("mac", "address", self.mac.as_deref())?;
            if let Some(mtu) = self.mtu {
                w.attr_element("mtu", "size", Some(&mtu.to_string()))?;
            }
            if let Some(link) = &self.link {
                let mut tag = Tag::new("link");
                tag.uint("speed", link.speed, UintFormat::Decimal)
                    .opt("state", link.state.as_deref());
                w.empty(tag)?;
            }
            w.children("protocol", &self.protocols)?;
            self.variant.write_body(w)
        })
    }
}

impl FromXml for HostInterface {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let Some(variant) = union::allocate::<InterfaceVariant>(el)? else {
            r.skip(el)?;
            return Ok(None);
        };
        let mut out = HostInterface {
            name: el.attr("name")?,
            start_mode: None,
            mac: None,
            mtu: None,
            link: None,
            protocols: Vec::new(),
            variant,
        };
        r.each_child(el, |r, child| {
            if out.variant.read_child(child, r)? {
                return Ok(true);
            }
            match child.name() {
                "start" => out.start_mode = child.attr("mode")?,
                "mac" => out.mac = child.attr("address")?,
                "mtu" => out.mtu = child.uint("size", Base::Decimal)?,
                "link" => {
                    out.link = Some(InterfaceLink {
                        speed: child.uint("speed", Base::Decimal)?,
                        state: child.attr("state")?,
                    })
                }
                "protocol" => {
                    out.protocols.extend(r.read::<InterfaceProtocol>(child)?);
                    return Ok(true);
                }
                _ => {}
            }
            Ok(false)
        })?;
        Ok(Some(out))
    }
}

impl Document for HostInterface {
    const ROOT: &'static str = "interface";
}

#[cfg(test)]
mod tests {
    use super::*;
    use virtxml_codec::XmlError;

    #[test]
    fn ethernet_with_protocols() {
        let xml = r#"<interface type="ethernet" name="eth0">
  <start mode="onboot"/>
  <mac address="aa:bb:cc:dd:ee:ff"/>
  <mtu size="1492"/>
  <link speed="1000" state="up"/>
  <protocol family="ipv4">
    <dhcp peerdns="yes"/>
  </protocol>
  <protocol family="ipv6">
    <autoconf/>
    <ip address="3ffe:ffff:0:5::1" prefix="128"/>
    <route gateway="3ffe:ffff:0:5::"/>
  </protocol>
</interface>"#;
        let iface = HostInterface::unmarshal(xml).expect("decode");
        assert_eq!(iface.variant, InterfaceVariant::Ethernet);
        assert_eq!(iface.protocols.len(), 2);
        assert!(iface.protocols[1].autoconf);
        assert_eq!(iface.marshal().expect("encode"), xml);
    }

    #[test]
    fn bridge_contains_members() {
        let xml = r#"<interface type="bridge" name="br0">
  <start mode="onboot"/>
  <bridge stp="off" delay="0.01">
    <interface type="ethernet" name="eth0">
      <mac address="ab:bb:cc:dd:ee:ff"/>
    </interface>
    <interface type="vlan" name="eth1.42">
      <vlan tag="42">
        <interface name="eth1"/>
      </vlan>
    </interface>
  </bridge>
</interface>"#;
        let iface = HostInterface::unmarshal(xml).expect("decode");
        match &iface.variant {
            InterfaceVariant::Bridge(bridge) => {
                assert_eq!(bridge.members.len(), 2);
                assert_eq!(
                    bridge.members[1].variant,
                    InterfaceVariant::Vlan(VlanInterface {
                        tag: Some(42),
                        dev: Some("eth1".into()),
                    })
                );
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(iface.marshal().expect("encode"), xml);
    }

    #[test]
    fn bond_with_link_monitor() {
        let xml = r#"<interface type="bond" name="bond0">
  <bond mode="active-backup">
    <arpmon interval="100" target="192.168.50.1" validate="active"/>
    <interface type="ethernet" name="eth1"/>
    <interface type="ethernet" name="eth2"/>
  </bond>
</interface>"#;
        let iface = HostInterface::unmarshal(xml).expect("decode");
        match &iface.variant {
            InterfaceVariant::Bond(bond) => {
                assert!(matches!(bond.monitor, Some(LinkMonitor::Arpmon { interval: Some(100), .. })));
                assert_eq!(bond.members.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(iface.marshal().expect("encode"), xml);

        let bond = HostInterface::new(
            "bond1",
            InterfaceVariant::Bond(BondInterface {
                mode: Some("balance-rr".into()),
                monitor: Some(LinkMonitor::Miimon {
                    freq: Some(100),
                    updelay: Some(10),
                    carrier: Some("ioctl".into()),
                }),
                members: vec![HostInterface::new("eth3", InterfaceVariant::Ethernet)],
            }),
        );
        assert_eq!(
            bond.marshal().expect("encode"),
            "<interface type=\"bond\" name=\"bond1\">\n  <bond mode=\"balance-rr\">\n    <miimon freq=\"100\" updelay=\"10\" carrier=\"ioctl\"/>\n    <interface type=\"ethernet\" name=\"eth3\"/>\n  </bond>\n</interface>"
        );
    }

    #[test]
    fn type_is_mandatory_and_closed() {
        assert!(matches!(
            HostInterface::unmarshal(r#"<interface name="eth0"/>"#),
            Err(XmlError::MissingDiscriminator { entity: "host interface" })
        ));
        // strict at every depth
        match HostInterface::unmarshal(
            r#"<interface type="bridge" name="br0"><bridge><interface type="team" name="t0"/></bridge></interface>"#,
        ) {
            Err(XmlError::UnknownVariant { raw, .. }) => assert_eq!(raw, "team"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
