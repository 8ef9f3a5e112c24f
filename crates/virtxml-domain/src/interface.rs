//! `<interface>` devices, plus the virtual port, filter reference,
//! bandwidth and VLAN blocks that network definitions share.

use std::io::Write;

use virtxml_codec::union::{self, read_into};
use virtxml_codec::{
    is_blank, registry, Base, Element, FromXml, Result, Tag, ToXml, UintFormat, Union, XmlReader,
    XmlWriter,
};

use crate::address::DomainAddress;

registry! {
    pub enum InterfaceSourceKind for "interface source" {
        carrier: Attribute("type"),
        absent: Required,
        unknown: Skip,
        User = "user",
        Ethernet = "ethernet",
        VhostUser = "vhostuser",
        Server = "server",
        Client = "client",
        Mcast = "mcast",
        Network = "network",
        Bridge = "bridge",
        Internal = "internal",
        Direct = "direct",
        Hostdev = "hostdev",
        Udp = "udp",
        Vdpa = "vdpa",
        Null = "null",
        Vds = "vds",
    }
}

/// How the guest NIC is connected on the host side.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterfaceSource {
    User,
    Ethernet,
    VhostUser(VhostUserSource),
    Server(SocketSource),
    Client(SocketSource),
    Mcast(SocketSource),
    Network(NetworkSource),
    Bridge { bridge: Option<String> },
    Internal { name: Option<String> },
    Direct { dev: Option<String>, mode: Option<String> },
    Hostdev(HostdevSource),
    Udp(SocketSource),
    Vdpa { dev: Option<String> },
    Null,
    Vds(VdsSource),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VhostUserSource {
    pub kind: Option<String>,
    pub path: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SocketSource {
    pub address: Option<String>,
    pub port: Option<u32>,
    pub local: Option<SocketLocal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SocketLocal {
    pub address: Option<String>,
    pub port: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkSource {
    pub network: Option<String>,
    pub portgroup: Option<String>,
    pub bridge: Option<String>,
    pub portid: Option<String>,
}

/// SR-IOV passthrough; `managed` lives on the `<interface>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostdevSource {
    pub managed: Option<String>,
    pub address: Option<DomainAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VdsSource {
    pub switchid: Option<String>,
    pub portid: Option<String>,
    pub portgroupid: Option<String>,
    pub connectionid: Option<String>,
}

impl SocketSource {
    fn is_blank(&self) -> bool {
        is_blank(self.address.as_deref()) && self.port.is_none() && self.local.is_none()
    }
}

impl Union for InterfaceSource {
    type Kind = InterfaceSourceKind;

    fn kind(&self) -> InterfaceSourceKind {
        match self {
            InterfaceSource::User => InterfaceSourceKind::User,
            InterfaceSource::Ethernet => InterfaceSourceKind::Ethernet,
            InterfaceSource::VhostUser(_) => InterfaceSourceKind::VhostUser,
            InterfaceSource::Server(_) => InterfaceSourceKind::Server,
            InterfaceSource::Client(_) => InterfaceSourceKind::Client,
            InterfaceSource::Mcast(_) => InterfaceSourceKind::Mcast,
            InterfaceSource::Network(_) => InterfaceSourceKind::Network,
            InterfaceSource::Bridge { .. } => InterfaceSourceKind::Bridge,
            InterfaceSource::Internal { .. } => InterfaceSourceKind::Internal,
            InterfaceSource::Direct { .. } => InterfaceSourceKind::Direct,
            InterfaceSource::Hostdev(_) => InterfaceSourceKind::Hostdev,
            InterfaceSource::Udp(_) => InterfaceSourceKind::Udp,
            InterfaceSource::Vdpa { .. } => InterfaceSourceKind::Vdpa,
            InterfaceSource::Null => InterfaceSourceKind::Null,
            InterfaceSource::Vds(_) => InterfaceSourceKind::Vds,
        }
    }

    fn allocate(kind: InterfaceSourceKind) -> Self {
        match kind {
            InterfaceSourceKind::User => InterfaceSource::User,
            InterfaceSourceKind::Ethernet => InterfaceSource::Ethernet,
            InterfaceSourceKind::VhostUser => InterfaceSource::VhostUser(VhostUserSource::default()),
            InterfaceSourceKind::Server => InterfaceSource::Server(SocketSource::default()),
            InterfaceSourceKind::Client => InterfaceSource::Client(SocketSource::default()),
            InterfaceSourceKind::Mcast => InterfaceSource::Mcast(SocketSource::default()),
            InterfaceSourceKind::Network => InterfaceSource::Network(NetworkSource::default()),
            InterfaceSourceKind::Bridge => InterfaceSource::Bridge { bridge: None },
            InterfaceSourceKind::Internal => InterfaceSource::Internal { name: None },
            InterfaceSourceKind::Direct => InterfaceSource::Direct { dev: None, mode: None },
            InterfaceSourceKind::Hostdev => InterfaceSource::Hostdev(HostdevSource::default()),
            InterfaceSourceKind::Udp => InterfaceSource::Udp(SocketSource::default()),
            InterfaceSourceKind::Vdpa => InterfaceSource::Vdpa { dev: None },
            InterfaceSourceKind::Null => InterfaceSource::Null,
            InterfaceSourceKind::Vds => InterfaceSource::Vds(VdsSource::default()),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            InterfaceSource::User | InterfaceSource::Ethernet | InterfaceSource::Null => true,
            InterfaceSource::VhostUser(s) => {
                is_blank(s.kind.as_deref()) && is_blank(s.path.as_deref()) && is_blank(s.mode.as_deref())
            }
            InterfaceSource::Server(s)
            | InterfaceSource::Client(s)
            | InterfaceSource::Mcast(s)
            | InterfaceSource::Udp(s) => s.is_blank(),
            InterfaceSource::Network(s) => {
                is_blank(s.network.as_deref())
                    && is_blank(s.portgroup.as_deref())
                    && is_blank(s.bridge.as_deref())
                    && is_blank(s.portid.as_deref())
            }
            InterfaceSource::Bridge { bridge } => is_blank(bridge.as_deref()),
            InterfaceSource::Internal { name } => is_blank(name.as_deref()),
            InterfaceSource::Direct { dev, mode } => is_blank(dev.as_deref()) && is_blank(mode.as_deref()),
            InterfaceSource::Hostdev(s) => s.address.is_none(),
            InterfaceSource::Vdpa { dev } => is_blank(dev.as_deref()),
            InterfaceSource::Vds(s) => {
                is_blank(s.switchid.as_deref())
                    && is_blank(s.portid.as_deref())
                    && is_blank(s.portgroupid.as_deref())
                    && is_blank(s.connectionid.as_deref())
            }
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        if let InterfaceSource::Hostdev(s) = self {
            tag.opt("managed", s.managed.as_deref());
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        if self.is_blank() {
            return Ok(());
        }
        let mut tag = Tag::new("source");
        match self {
            InterfaceSource::VhostUser(s) => {
                tag.opt("type", s.kind.as_deref())
                    .opt("path", s.path.as_deref())
                    .opt("mode", s.mode.as_deref());
            }
            InterfaceSource::Server(s)
            | InterfaceSource::Client(s)
            | InterfaceSource::Mcast(s)
            | InterfaceSource::Udp(s) => {
                tag.opt("address", s.address.as_deref())
                    .uint("port", s.port, UintFormat::Decimal);
                return w.element(tag, |w| match &s.local {
                    Some(local) => {
                        let mut tag = Tag::new("local");
                        tag.opt("address", local.address.as_deref())
                            .uint("port", local.port, UintFormat::Decimal);
                        w.empty(tag)
                    }
                    None => Ok(()),
                });
            }
            InterfaceSource::Network(s) => {
                tag.opt("network", s.network.as_deref())
                    .opt("portgroup", s.portgroup.as_deref())
                    .opt("bridge", s.bridge.as_deref())
                    .opt("portid", s.portid.as_deref());
            }
            InterfaceSource::Bridge { bridge } => {
                tag.opt("bridge", bridge.as_deref());
            }
            InterfaceSource::Internal { name } => {
                tag.opt("name", name.as_deref());
            }
            InterfaceSource::Direct { dev, mode } => {
                tag.opt("dev", dev.as_deref()).opt("mode", mode.as_deref());
            }
            InterfaceSource::Hostdev(s) => {
                return w.element(tag, |w| w.child("address", s.address.as_ref()));
            }
            InterfaceSource::Vdpa { dev } => {
                tag.opt("dev", dev.as_deref());
            }
            InterfaceSource::Vds(s) => {
                tag.opt("switchid", s.switchid.as_deref())
                    .opt("portid", s.portid.as_deref())
                    .opt("portgroupid", s.portgroupid.as_deref())
                    .opt("connectionid", s.connectionid.as_deref());
            }
            InterfaceSource::User | InterfaceSource::Ethernet | InterfaceSource::Null => {}
        }
        w.empty(tag)
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        if let InterfaceSource::Hostdev(s) = self {
            s.managed = el.attr("managed")?;
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        if child.name() != "source" {
            return Ok(false);
        }
        match self {
            InterfaceSource::VhostUser(s) => {
                s.kind = child.attr("type")?;
                s.path = child.attr("path")?;
                s.mode = child.attr("mode")?;
            }
            InterfaceSource::Server(s)
            | InterfaceSource::Client(s)
            | InterfaceSource::Mcast(s)
            | InterfaceSource::Udp(s) => {
                s.address = child.attr("address")?;
                s.port = child.uint("port", Base::Decimal)?;
                r.each_child(child, |_, local| {
                    if local.name() == "local" {
                        s.local = Some(SocketLocal {
                            address: local.attr("address")?,
                            port: local.uint("port", Base::Decimal)?,
                        });
                    }
                    Ok(false)
                })?;
                return Ok(true);
            }
            InterfaceSource::Network(s) => {
                s.network = child.attr("network")?;
                s.portgroup = child.attr("portgroup")?;
                s.bridge = child.attr("bridge")?;
                s.portid = child.attr("portid")?;
            }
            InterfaceSource::Bridge { bridge } => *bridge = child.attr("bridge")?,
            InterfaceSource::Internal { name } => *name = child.attr("name")?,
            InterfaceSource::Direct { dev, mode } => {
                *dev = child.attr("dev")?;
                *mode = child.attr("mode")?;
            }
            InterfaceSource::Hostdev(s) => {
                r.each_child(child, |r, address| {
                    if address.name() != "address" {
                        return Ok(false);
                    }
                    s.address = r.read(address)?;
                    Ok(true)
                })?;
                return Ok(true);
            }
            InterfaceSource::Vdpa { dev } => *dev = child.attr("dev")?,
            InterfaceSource::Vds(s) => {
                s.switchid = child.attr("switchid")?;
                s.portid = child.attr("portid")?;
                s.portgroupid = child.attr("portgroupid")?;
                s.connectionid = child.attr("connectionid")?;
            }
            InterfaceSource::User | InterfaceSource::Ethernet | InterfaceSource::Null => {}
        }
        r.skip(child)?;
        Ok(true)
    }
}

registry! {
    pub enum VirtualPortKind for "virtual port" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        Qbg = "802.1Qbg",
        Qbh = "802.1Qbh",
        OpenVSwitch = "openvswitch",
        Midonet = "midonet",
    }
}

/// `<virtualport>`; the settings sit in a `<parameters>` child.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VirtualPort {
    Qbg {
        managerid: Option<u32>,
        typeid: Option<u32>,
        typeidversion: Option<u32>,
        instanceid: Option<String>,
    },
    Qbh { profileid: Option<String> },
    OpenVSwitch { interfaceid: Option<String>, profileid: Option<String> },
    Midonet { interfaceid: Option<String> },
}

impl Union for VirtualPort {
    type Kind = VirtualPortKind;

    fn kind(&self) -> VirtualPortKind {
        match self {
            VirtualPort::Qbg { .. } => VirtualPortKind::Qbg,
            VirtualPort::Qbh { .. } => VirtualPortKind::Qbh,
            VirtualPort::OpenVSwitch { .. } => VirtualPortKind::OpenVSwitch,
            VirtualPort::Midonet { .. } => VirtualPortKind::Midonet,
        }
    }

    fn allocate(kind: VirtualPortKind) -> Self {
        match kind {
            VirtualPortKind::Qbg => VirtualPort::Qbg {
                managerid: None,
                typeid: None,
                typeidversion: None,
                instanceid: None,
            },
            VirtualPortKind::Qbh => VirtualPort::Qbh { profileid: None },
            VirtualPortKind::OpenVSwitch => VirtualPort::OpenVSwitch {
                interfaceid: None,
                profileid: None,
            },
            VirtualPortKind::Midonet => VirtualPort::Midonet { interfaceid: None },
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new("parameters");
        match self {
            VirtualPort::Qbg {
                managerid,
                typeid,
                typeidversion,
                instanceid,
            } => {
                tag.uint("managerid", *managerid, UintFormat::Decimal)
                    .uint("typeid", *typeid, UintFormat::Decimal)
                    .uint("typeidversion", *typeidversion, UintFormat::Decimal)
                    .opt("instanceid", instanceid.as_deref());
            }
            VirtualPort::Qbh { profileid } => {
                tag.opt("profileid", profileid.as_deref());
            }
            VirtualPort::OpenVSwitch {
                interfaceid,
                profileid,
            } => {
                tag.opt("interfaceid", interfaceid.as_deref())
                    .opt("profileid", profileid.as_deref());
            }
            VirtualPort::Midonet { interfaceid } => {
                tag.opt("interfaceid", interfaceid.as_deref());
            }
        }
        if tag.is_bare() {
            return Ok(());
        }
        w.empty(tag)
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        if child.name() != "parameters" {
            return Ok(false);
        }
        match self {
            VirtualPort::Qbg {
                managerid,
                typeid,
                typeidversion,
                instanceid,
            } => {
                *managerid = child.uint("managerid", Base::Decimal)?;
                *typeid = child.uint("typeid", Base::Decimal)?;
                *typeidversion = child.uint("typeidversion", Base::Decimal)?;
                *instanceid = child.attr("instanceid")?;
            }
            VirtualPort::Qbh { profileid } => *profileid = child.attr("profileid")?,
            VirtualPort::OpenVSwitch {
                interfaceid,
                profileid,
            } => {
                *interfaceid = child.attr("interfaceid")?;
                *profileid = child.attr("profileid")?;
            }
            VirtualPort::Midonet { interfaceid } => *interfaceid = child.attr("interfaceid")?,
        }
        r.skip(child)?;
        Ok(true)
    }
}

virtxml_codec::union_xml!(VirtualPort);

/// `<filterref filter="...">` with `<parameter name value/>` children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterRef {
    pub filter: Option<String>,
    pub parameters: Vec<FilterParameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterParameter {
    pub name: Option<String>,
    pub value: Option<String>,
}

impl ToXml for FilterRef {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("filter", self.filter.as_deref());
        w.element(tag, |w| {
            for param in &self.parameters {
                let mut tag = Tag::new("parameter");
                tag.opt("name", param.name.as_deref())
                    .opt("value", param.value.as_deref());
                w.empty(tag)?;
            }
            Ok(())
        })
    }
}

impl FromXml for FilterRef {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = FilterRef {
            filter: el.attr("filter")?,
            ..FilterRef::default()
        };
        r.each_child(el, |_, child| {
            if child.name() == "parameter" {
                out.parameters.push(FilterParameter {
                    name: child.attr("name")?,
                    value: child.attr("value")?,
                });
            }
            Ok(false)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bandwidth {
    pub inbound: Option<BandwidthParams>,
    pub outbound: Option<BandwidthParams>,
}

/// Rates in KiB/s, burst in KiB.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BandwidthParams {
    pub average: Option<u64>,
    pub peak: Option<u64>,
    pub burst: Option<u64>,
    pub floor: Option<u64>,
}

impl ToXml for BandwidthParams {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.uint("average", self.average, UintFormat::Decimal)
            .uint("peak", self.peak, UintFormat::Decimal)
            .uint("burst", self.burst, UintFormat::Decimal)
            .uint("floor", self.floor, UintFormat::Decimal);
        w.empty(tag)
    }
}

impl FromXml for BandwidthParams {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let out = BandwidthParams {
            average: el.uint("average", Base::Decimal)?,
            peak: el.uint("peak", Base::Decimal)?,
            burst: el.uint("burst", Base::Decimal)?,
            floor: el.uint("floor", Base::Decimal)?,
        };
        r.skip(el)?;
        Ok(Some(out))
    }
}

impl ToXml for Bandwidth {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            w.child("inbound", self.inbound.as_ref())?;
            w.child("outbound", self.outbound.as_ref())
        })
    }
}

impl FromXml for Bandwidth {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Bandwidth::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "inbound" => out.inbound = r.read(child)?,
                "outbound" => out.outbound = r.read(child)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vlan {
    pub trunk: Option<String>,
    pub tags: Vec<VlanTag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VlanTag {
    pub id: Option<u32>,
    pub native_mode: Option<String>,
}

impl ToXml for Vlan {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("trunk", self.trunk.as_deref());
        w.element(tag, |w| {
            for vlan in &self.tags {
                let mut tag = Tag::new("tag");
                tag.uint("id", vlan.id, UintFormat::Decimal)
                    .opt("nativeMode", vlan.native_mode.as_deref());
                w.empty(tag)?;
            }
            Ok(())
        })
    }
}

impl FromXml for Vlan {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Vlan {
            trunk: el.attr("trunk")?,
            ..Vlan::default()
        };
        r.each_child(el, |_, child| {
            if child.name() == "tag" {
                out.tags.push(VlanTag {
                    id: child.uint("id", Base::Decimal)?,
                    native_mode: child.attr("nativeMode")?,
                });
            }
            Ok(false)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterfaceDriver {
    pub name: Option<String>,
    pub queues: Option<u32>,
    pub rx_queue_size: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interface {
    pub source: Option<InterfaceSource>,
    pub mac: Option<String>,
    pub virtualport: Option<VirtualPort>,
    pub bandwidth: Option<Bandwidth>,
    pub vlan: Option<Vlan>,
    pub target: Option<String>,
    pub model: Option<String>,
    pub driver: Option<InterfaceDriver>,
    pub filterref: Option<FilterRef>,
    pub link_state: Option<String>,
    pub mtu: Option<u32>,
    pub boot_order: Option<u32>,
    pub alias: Option<String>,
    pub address: Option<DomainAddress>,
}

impl ToXml for Interface {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        union::write_carried(&mut tag, self.source.as_ref());
        w.element(tag, |w| {
            w.attr_element("mac", "address", self.mac.as_deref())?;
            if let Some(source) = &self.source {
                source.write_body(w)?;
            }
            w.child("virtualport", self.virtualport.as_ref())?;
            w.child("bandwidth", self.bandwidth.as_ref())?;
            w.child("vlan", self.vlan.as_ref())?;
            w.attr_element("target", "dev", self.target.as_deref())?;
            w.attr_element("model", "type", self.model.as_deref())?;
            if let Some(driver) = &self.driver {
                let mut tag = Tag::new("driver");
                tag.opt("name", driver.name.as_deref())
                    .uint("queues", driver.queues, UintFormat::Decimal)
                    .uint("rx_queue_size", driver.rx_queue_size, UintFormat::Decimal);
                w.empty(tag)?;
            }
            w.child("filterref", self.filterref.as_ref())?;
            w.attr_element("link", "state", self.link_state.as_deref())?;
            if let Some(mtu) = self.mtu {
                w.attr_element("mtu", "size", Some(&mtu.to_string()))?;
            }
            if let Some(order) = self.boot_order {
                w.attr_element("boot", "order", Some(&order.to_string()))?;
            }
            w.attr_element("alias", "name", self.alias.as_deref())?;
            w.child("address", self.address.as_ref())
        })
    }
}

impl FromXml for Interface {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Interface {
            source: union::allocate(el)?,
            ..Interface::default()
        };
        r.each_child(el, |r, child| {
            if read_into(&mut out.source, child, r)? {
                return Ok(true);
            }
            match child.name() {
                "virtualport" => out.virtualport = r.read(child)?,
                "bandwidth" => out.bandwidth = r.read(child)?,
                "vlan" => out.vlan = r.read(child)?,
                "filterref" => out.filterref = r.read(child)?,
                "address" => out.address = r.read(child)?,
                "driver" => {
                    out.driver = Some(InterfaceDriver {
                        name: child.attr("name")?,
                        queues: child.uint("queues", Base::Decimal)?,
                        rx_queue_size: child.uint("rx_queue_size", Base::Decimal)?,
                    });
                    return Ok(false);
                }
                name => {
                    match name {
                        "mac" => out.mac = child.attr("address")?,
                        "target" => out.target = child.attr("dev")?,
                        "model" => out.model = child.attr("type")?,
                        "link" => out.link_state = child.attr("state")?,
                        "mtu" => out.mtu = child.uint("size", Base::Decimal)?,
                        "boot" => out.boot_order = child.uint("order", Base::Decimal)?,
                        "alias" => out.alias = child.attr("name")?,
                        _ => {}
                    }
                    return Ok(false);
                }
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use virtxml_codec::{Registry, XmlError};

    use crate::address::PciAddress;

    fn encode(iface: &Interface) -> String {
        let mut w = XmlWriter::new(Vec::new());
        iface.to_xml("interface", &mut w).expect("encode");
        String::from_utf8(w.into_inner()).expect("utf8")
    }

    fn decode(xml: &str) -> Result<Interface> {
        let mut r = XmlReader::new(xml);
        let root = r.root()?;
        Ok(Interface::from_xml(&root, &mut r)?.expect("interface"))
    }

    const BRIDGED: &str = r#"<interface type="bridge">
  <mac address="52:54:00:6d:90:02"/>
  <source bridge="br0"/>
  <virtualport type="openvswitch">
    <parameters interfaceid="09b11c53-8b5c-4eeb-8f00-d84eaa0aaa4f"/>
  </virtualport>
  <bandwidth>
    <inbound average="1000" peak="5000" burst="1024"/>
    <outbound average="128"/>
  </bandwidth>
  <vlan trunk="yes">
    <tag id="42"/>
    <tag id="47" nativeMode="untagged"/>
  </vlan>
  <target dev="vnet0"/>
  <model type="virtio"/>
  <driver name="vhost" queues="4"/>
  <filterref filter="clean-traffic">
    <parameter name="IP" value="10.0.0.1"/>
  </filterref>
  <link state="up"/>
  <mtu size="9000"/>
  <boot order="1"/>
  <alias name="net0"/>
  <address type="pci" domain="0x0000" bus="0x00" slot="0x03" function="0x0"/>
</interface>"#;

    #[test]
    fn bridged_interface_roundtrip() {
        let iface = decode(BRIDGED).expect("decode");
        assert_eq!(
            iface.source,
            Some(InterfaceSource::Bridge {
                bridge: Some("br0".into())
            })
        );
        assert!(matches!(iface.virtualport, Some(VirtualPort::OpenVSwitch { .. })));
        assert_eq!(iface.vlan.as_ref().map(|v| v.tags.len()), Some(2));
        assert_eq!(encode(&iface), BRIDGED);
    }

    #[test]
    fn missing_type_is_an_error() {
        let err = decode(r#"<interface><source bridge="br0"/></interface>"#).unwrap_err();
        assert!(matches!(err, XmlError::MissingDiscriminator { .. }));
    }

    #[test]
    fn every_kind_roundtrips_bare() {
        for (wire, kind) in <InterfaceSourceKind as Registry>::TABLE {
            let iface = Interface {
                source: Some(InterfaceSource::allocate(*kind)),
                ..Interface::default()
            };
            let xml = encode(&iface);
            assert_eq!(xml, format!("<interface type=\"{wire}\"/>"));
            assert_eq!(decode(&xml).expect("decode"), iface);
        }
    }

    #[test]
    fn hostdev_interface_carries_managed_and_address() {
        let xml = r#"<interface type="hostdev" managed="yes">
  <mac address="52:54:00:6d:90:03"/>
  <source>
    <address type="pci" domain="0x0000" bus="0x03" slot="0x10" function="0x1"/>
  </source>
</interface>"#;
        let iface = decode(xml).expect("decode");
        match &iface.source {
            Some(InterfaceSource::Hostdev(s)) => {
                assert_eq!(s.managed.as_deref(), Some("yes"));
                let pci = PciAddress::new(0, 3, 0x10, 1);
                assert_eq!(s.address, Some(DomainAddress::Pci(pci)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(encode(&iface), xml);
    }

    #[test]
    fn socket_sources_keep_local_endpoint() {
        let xml = r#"<interface type="udp">
  <source address="192.168.0.1" port="5558">
    <local address="127.0.0.1" port="5555"/>
  </source>
</interface>"#;
        assert_eq!(encode(&decode(xml).expect("decode")), xml);
    }

    #[test]
    fn unknown_type_keeps_other_fields() {
        let iface = decode(r#"<interface type="carrier-pigeon"><source coop="1"/><mac address="aa"/></interface>"#)
            .expect("decode");
        assert_eq!(iface.source, None);
        assert_eq!(iface.mac.as_deref(), Some("aa"));
        assert_eq!(encode(&iface), "<interface>\n  <mac address=\"aa\"/>\n</interface>");
    }

    #[test]
    fn qbg_parameters_are_decimal() {
        let xml = r#"<virtualport type="802.1Qbg">
  <parameters managerid="11" typeid="1193047" typeidversion="2" instanceid="09b11c53-8b5c-4eeb-8f00-d84eaa0aaa4f"/>
</virtualport>"#;
        let mut r = XmlReader::new(xml);
        let root = r.root().expect("root");
        let port = VirtualPort::from_xml(&root, &mut r).expect("decode").expect("port");
        let mut w = XmlWriter::new(Vec::new());
        port.to_xml("virtualport", &mut w).expect("encode");
        assert_eq!(String::from_utf8(w.into_inner()).expect("utf8"), xml);
    }
}
