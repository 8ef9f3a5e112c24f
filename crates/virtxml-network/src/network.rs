//! `<network>` documents.

use std::io::Write;

use tracing::trace;
use virtxml_codec::union::{self, read_into};
use virtxml_codec::{
    registry, Base, Document, Element, FromXml, Namespace, RawElement, RawXml, Result, Tag, ToXml,
    UintFormat, Union, XmlReader, XmlWriter,
};
use virtxml_domain::{Bandwidth, PciAddress, VirtualPort, Vlan};

registry! {
    pub enum ForwardModeKind for "network forward" {
        carrier: Attribute("mode"),
        absent: Default(Nat),
        unknown: Skip,
        Nat = "nat",
        Route = "route",
        Open = "open",
        Bridge = "bridge",
        Private = "private",
        Vepa = "vepa",
        Passthrough = "passthrough",
        Hostdev = "hostdev",
    }
}

registry! {
    pub enum ForwardAddressKind for "forward address" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        Pci = "pci",
    }
}

/// A virtual function handed out by a `hostdev` forward pool.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ForwardAddress {
    Pci(PciAddress),
}

impl Union for ForwardAddress {
    type Kind = ForwardAddressKind;

    fn kind(&self) -> ForwardAddressKind {
        match self {
            ForwardAddress::Pci(_) => ForwardAddressKind::Pci,
        }
    }

    fn allocate(kind: ForwardAddressKind) -> Self {
        match kind {
            ForwardAddressKind::Pci => ForwardAddress::Pci(PciAddress::default()),
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        match self {
            ForwardAddress::Pci(pci) => pci.write_attrs(tag),
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            ForwardAddress::Pci(pci) => pci.write_body(w),
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        match self {
            ForwardAddress::Pci(pci) => pci.read_attrs(el),
        }
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match self {
            ForwardAddress::Pci(pci) => pci.read_child(child, r),
        }
    }
}

virtxml_codec::union_xml!(ForwardAddress);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NatRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NatPorts {
    pub start: Option<u16>,
    pub end: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForwardNat {
    pub ipv6: Option<String>,
    pub addresses: Vec<NatRange>,
    pub ports: Option<NatPorts>,
}

impl ForwardNat {
    fn is_blank(&self) -> bool {
        self.ipv6.is_none() && self.addresses.is_empty() && self.ports.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostdevForward {
    pub managed: Option<String>,
    pub driver: Option<String>,
    pub addresses: Vec<ForwardAddress>,
}

/// Forwarding mode, carried by `mode` on `<forward>`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ForwardMode {
    Nat(ForwardNat),
    Route,
    Open,
    Bridge,
    Private,
    Vepa,
    Passthrough,
    Hostdev(HostdevForward),
}

impl Union for ForwardMode {
    type Kind = ForwardModeKind;

    fn kind(&self) -> ForwardModeKind {
        match self {
            ForwardMode::Nat(_) => ForwardModeKind::Nat,
            ForwardMode::Route => ForwardModeKind::Route,
            ForwardMode::Open => ForwardModeKind::Open,
            ForwardMode::Bridge => ForwardModeKind::Bridge,
            ForwardMode::Private => ForwardModeKind::Private,
            ForwardMode::Vepa => ForwardModeKind::Vepa,
            ForwardMode::Passthrough => ForwardModeKind::Passthrough,
            ForwardMode::Hostdev(_) => ForwardModeKind::Hostdev,
        }
    }

    fn allocate(kind: ForwardModeKind) -> Self {
        match kind {
            ForwardModeKind::Nat => ForwardMode::Nat(ForwardNat::default()),
            ForwardModeKind::Route => ForwardMode::Route,
            ForwardModeKind::Open => ForwardMode::Open,
            ForwardModeKind::Bridge => ForwardMode::Bridge,
            ForwardModeKind::Private => ForwardMode::Private,
            ForwardModeKind::Vepa => ForwardMode::Vepa,
            ForwardModeKind::Passthrough => ForwardMode::Passthrough,
            ForwardModeKind::Hostdev => ForwardMode::Hostdev(HostdevForward::default()),
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        if let ForwardMode::Hostdev(hostdev) = self {
            tag.opt("managed", hostdev.managed.as_deref());
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            ForwardMode::Nat(nat) if !nat.is_blank() => {
                let mut tag = Tag::new("nat");
                tag.opt("ipv6", nat.ipv6.as_deref());
                w.element(tag, |w| {
                    for range in &nat.addresses {
                        let mut tag = Tag::new("address");
                        tag.opt("start", range.start.as_deref())
                            .opt("end", range.end.as_deref());
                        w.empty(tag)?;
                    }
                    if let Some(ports) = &nat.ports {
                        let mut tag = Tag::new("port");
                        tag.uint("start", ports.start, UintFormat::Decimal)
                            .uint("end", ports.end, UintFormat::Decimal);
                        w.empty(tag)?;
                    }
                    Ok(())
                })
            }
            ForwardMode::Hostdev(hostdev) => {
                w.attr_element("driver", "name", hostdev.driver.as_deref())?;
                w.children("address", &hostdev.addresses)
            }
            _ => Ok(()),
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        if let ForwardMode::Hostdev(hostdev) = self {
            hostdev.managed = el.attr("managed")?;
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match (self, child.name()) {
            (ForwardMode::Nat(nat), "nat") => {
                nat.ipv6 = child.attr("ipv6")?;
                r.each_child(child, |_, grand| {
                    match grand.name() {
                        "address" => nat.addresses.push(NatRange {
                            start: grand.attr("start")?,
                            end: grand.attr("end")?,
                        }),
                        "port" => {
                            nat.ports = Some(NatPorts {
                                start: grand.uint("start", Base::Decimal)?,
                                end: grand.uint("end", Base::Decimal)?,
                            })
                        }
                        _ => {}
                    }
                    Ok(false)
                })?;
                Ok(true)
            }
            (ForwardMode::Hostdev(hostdev), "driver") => {
                hostdev.driver = child.attr("name")?;
                Ok(false)
            }
            (ForwardMode::Hostdev(hostdev), "address") => {
                hostdev.addresses.extend(r.read::<ForwardAddress>(child)?);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Forward {
    pub mode: Option<ForwardMode>,
    pub dev: Option<String>,
    pub pf: Option<String>,
    /// Pool of host interfaces, `<interface dev="..."/>`.
    pub interfaces: Vec<String>,
}

impl ToXml for Forward {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        if let Some(mode) = &self.mode {
            union::write_discriminator(&mut tag, mode);
        }
        tag.opt("dev", self.dev.as_deref());
        if let Some(mode) = &self.mode {
            mode.write_attrs(&mut tag);
        }
        w.element(tag, |w| {
            w.attr_element("pf", "dev", self.pf.as_deref())?;
            if let Some(mode) = &self.mode {
                mode.write_body(w)?;
            }
            for dev in &self.interfaces {
                w.attr_element("interface", "dev", Some(dev))?;
            }
            Ok(())
        })
    }
}

impl FromXml for Forward {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Forward {
            mode: union::allocate(el)?,
            dev: el.attr("dev")?,
            ..Forward::default()
        };
        r.each_child(el, |r, child| {
            if read_into(&mut out.mode, child, r)? {
                return Ok(true);
            }
            match child.name() {
                "pf" => out.pf = child.attr("dev")?,
                "interface" => out.interfaces.extend(child.attr("dev")?),
                _ => {}
            }
            Ok(false)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkBridge {
    pub name: Option<String>,
    pub stp: Option<String>,
    pub delay: Option<u32>,
    pub mac_table_manager: Option<String>,
    pub zone: Option<String>,
}

impl ToXml for NetworkBridge {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("name", self.name.as_deref())
            .opt("stp", self.stp.as_deref())
            .uint("delay", self.delay, UintFormat::Decimal)
            .opt("macTableManager", self.mac_table_manager.as_deref())
            .opt("zone", self.zone.as_deref());
        w.empty(tag)
    }
}

impl FromXml for NetworkBridge {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let out = NetworkBridge {
            name: el.attr("name")?,
            stp: el.attr("stp")?,
            delay: el.uint("delay", Base::Decimal)?,
            mac_table_manager: el.attr("macTableManager")?,
            zone: el.attr("zone")?,
        };
        r.skip(el)?;
        Ok(Some(out))
    }
}

/// DNS domain served to guests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkDomain {
    pub name: Option<String>,
    pub local_only: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DnsForwarder {
    pub domain: Option<String>,
    pub addr: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DnsTxt {
    pub name: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DnsHost {
    pub ip: Option<String>,
    pub hostnames: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DnsSrv {
    pub service: Option<String>,
    pub protocol: Option<String>,
    pub domain: Option<String>,
    pub target: Option<String>,
    pub port: Option<u16>,
    pub priority: Option<u16>,
    pub weight: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dns {
    pub enable: Option<String>,
    pub forward_plain_names: Option<String>,
    pub forwarders: Vec<DnsForwarder>,
    pub txts: Vec<DnsTxt>,
    pub hosts: Vec<DnsHost>,
    pub srvs: Vec<DnsSrv>,
}

impl ToXml for Dns {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("enable", self.enable.as_deref())
            .opt("forwardPlainNames", self.forward_plain_names.as_deref());
        w.element(tag, |w| {
            for fwd in &self.forwarders {
                let mut tag = Tag::new("forwarder");
                tag.opt("domain", fwd.domain.as_deref())
                    .opt("addr", fwd.addr.as_deref());
                w.empty(tag)?;
            }
            for txt in &self.txts {
                let mut tag = Tag::new("txt");
                tag.opt("name", txt.name.as_deref())
                    .opt("value", txt.value.as_deref());
                w.empty(tag)?;
            }
            for host in &self.hosts {
                let mut tag = Tag::new("host");
                tag.opt("ip", host.ip.as_deref());
                w.element(tag, |w| {
                    for hostname in &host.hostnames {
                        w.text_element("hostname", hostname)?;
                    }
                    Ok(())
                })?;
            }
            for srv in &self.srvs {
                let mut tag = Tag::new("srv");
                tag.opt("service", srv.service.as_deref())
                    .opt("protocol", srv.protocol.as_deref())
                    .opt("domain", srv.domain.as_deref())
                    .opt("target", srv.target.as_deref())
                    .uint("port", srv.port, UintFormat::Decimal)
                    .uint("priority", srv.priority, UintFormat::Decimal)
                    .uint("weight", srv.weight, UintFormat::Decimal);
                w.empty(tag)?;
            }
            Ok(())
        })
    }
}

impl FromXml for Dns {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Dns {
            enable: el.attr("enable")?,
            forward_plain_names: el.attr("forwardPlainNames")?,
            ..Dns::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "forwarder" => out.forwarders.push(DnsForwarder {
                    domain: child.attr("domain")?,
                    addr: child.attr("addr")?,
                }),
                "txt" => out.txts.push(DnsTxt {
                    name: child.attr("name")?,
                    value: child.attr("value")?,
                }),
                "host" => {
                    let mut host = DnsHost {
                        ip: child.attr("ip")?,
                        hostnames: Vec::new(),
                    };
                    r.each_child(child, |r, grand| {
                        if grand.name() != "hostname" {
                            return Ok(false);
                        }
                        host.hostnames.push(r.text(grand)?);
                        Ok(true)
                    })?;
                    out.hosts.push(host);
                    return Ok(true);
                }
                "srv" => out.srvs.push(DnsSrv {
                    service: child.attr("service")?,
                    protocol: child.attr("protocol")?,
                    domain: child.attr("domain")?,
                    target: child.attr("target")?,
                    port: child.uint("port", Base::Decimal)?,
                    priority: child.uint("priority", Base::Decimal)?,
                    weight: child.uint("weight", Base::Decimal)?,
                }),
                _ => {}
            }
            Ok(false)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DhcpRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DhcpHost {
    pub mac: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dhcp {
    pub ranges: Vec<DhcpRange>,
    pub hosts: Vec<DhcpHost>,
    pub bootp_file: Option<String>,
    pub bootp_server: Option<String>,
}

impl ToXml for Dhcp {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            for range in &self.ranges {
                let mut tag = Tag::new("range");
                tag.opt("start", range.start.as_deref())
                    .opt("end", range.end.as_deref());
                w.empty(tag)?;
            }
            for host in &self.hosts {
                let mut tag = Tag::new("host");
                tag.opt("mac", host.mac.as_deref())
                    .opt("id", host.id.as_deref())
                    .opt("name", host.name.as_deref())
                    .opt("ip", host.ip.as_deref());
                w.empty(tag)?;
            }
            if self.bootp_file.is_some() {
                let mut tag = Tag::new("bootp");
                tag.opt("file", self.bootp_file.as_deref())
                    .opt("server", self.bootp_server.as_deref());
                w.empty(tag)?;
            }
            Ok(())
        })
    }
}

impl FromXml for Dhcp {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Dhcp::default();
        r.each_child(el, |_, child| {
            match child.name() {
                "range" => out.ranges.push(DhcpRange {
                    start: child.attr("start")?,
                    end: child.attr("end")?,
                }),
                "host" => out.hosts.push(DhcpHost {
                    mac: child.attr("mac")?,
                    id: child.attr("id")?,
                    name: child.attr("name")?,
                    ip: child.attr("ip")?,
                }),
                "bootp" => {
                    out.bootp_file = child.attr("file")?;
                    out.bootp_server = child.attr("server")?;
                }
                _ => {}
            }
            Ok(false)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkIp {
    pub address: Option<String>,
    pub netmask: Option<String>,
    pub prefix: Option<u32>,
    pub family: Option<String>,
    pub localptr: Option<String>,
    pub tftp_root: Option<String>,
    pub dhcp: Option<Dhcp>,
}

impl ToXml for NetworkIp {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("family", self.family.as_deref())
            .opt("address", self.address.as_deref())
            .opt("netmask", self.netmask.as_deref())
            .uint("prefix", self.prefix, UintFormat::Decimal)
            .opt("localPtr", self.localptr.as_deref());
        w.element(tag, |w| {
            w.attr_element("tftp", "root", self.tftp_root.as_deref())?;
            w.child("dhcp", self.dhcp.as_ref())
        })
    }
}

impl FromXml for NetworkIp {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = NetworkIp {
            family: el.attr("family")?,
            address: el.attr("address")?,
            netmask: el.attr("netmask")?,
            prefix: el.uint("prefix", Base::Decimal)?,
            localptr: el.attr("localPtr")?,
            ..NetworkIp::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "tftp" => out.tftp_root = child.attr("root")?,
                "dhcp" => {
                    out.dhcp = r.read(child)?;
                    return Ok(true);
                }
                _ => {}
            }
            Ok(false)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    pub family: Option<String>,
    pub address: Option<String>,
    pub prefix: Option<u32>,
    pub gateway: Option<String>,
    pub metric: Option<u32>,
}

impl ToXml for Route {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("family", self.family.as_deref())
            .opt("address", self.address.as_deref())
            .uint("prefix", self.prefix, UintFormat::Decimal)
            .opt("gateway", self.gateway.as_deref())
            .uint("metric", self.metric, UintFormat::Decimal);
        w.empty(tag)
    }
}

impl FromXml for Route {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let out = Route {
            family: el.attr("family")?,
            address: el.attr("address")?,
            prefix: el.uint("prefix", Base::Decimal)?,
            gateway: el.attr("gateway")?,
            metric: el.uint("metric", Base::Decimal)?,
        };
        r.skip(el)?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortGroup {
    pub name: Option<String>,
    pub default: Option<String>,
    pub virtualport: Option<VirtualPort>,
    pub bandwidth: Option<Bandwidth>,
    pub vlan: Option<Vlan>,
}

impl ToXml for PortGroup {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("name", self.name.as_deref())
            .opt("default", self.default.as_deref());
        w.element(tag, |w| {
            w.child("vlan", self.vlan.as_ref())?;
            w.child("virtualport", self.virtualport.as_ref())?;
            w.child("bandwidth", self.bandwidth.as_ref())
        })
    }
}

impl FromXml for PortGroup {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = PortGroup {
            name: el.attr("name")?,
            default: el.attr("default")?,
            ..PortGroup::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "vlan" => out.vlan = r.read(child)?,
                "virtualport" => out.virtualport = r.read(child)?,
                "bandwidth" => out.bandwidth = r.read(child)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Network {
    pub namespaces: Vec<Namespace>,
    pub ipv6: Option<String>,
    pub trust_guest_rx_filters: Option<String>,
    pub name: Option<String>,
    pub uuid: Option<String>,
    pub metadata: Option<RawXml>,
    pub forward: Option<Forward>,
    pub bridge: Option<NetworkBridge>,
    pub mtu: Option<u32>,
    pub mac: Option<String>,
    pub domain: Option<NetworkDomain>,
    pub dns: Option<Dns>,
    pub ips: Vec<NetworkIp>,
    pub routes: Vec<Route>,
    pub bandwidth: Option<Bandwidth>,
    pub vlan: Option<Vlan>,
    pub virtualport: Option<VirtualPort>,
    pub portgroups: Vec<PortGroup>,
    /// Vendor elements such as `<dnsmasq:options>`.
    pub extensions: Vec<RawElement>,
}

impl ToXml for Network {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        Namespace::apply(&self.namespaces, &mut tag);
        tag.opt("ipv6", self.ipv6.as_deref())
            .opt("trustGuestRxFilters", self.trust_guest_rx_filters.as_deref());
        w.element(tag, |w| {
            w.opt_text("name", self.name.as_deref())?;
            w.opt_text("uuid", self.uuid.as_deref())?;
            w.child("metadata", self.metadata.as_ref())?;
            w.child("forward", self.forward.as_ref())?;
            w.child("bridge", self.bridge.as_ref())?;
            if let Some(mtu) = self.mtu {
                w.attr_element("mtu", "size", Some(&mtu.to_string()))?;
            }
            w.attr_element("mac", "address", self.mac.as_deref())?;
            if let Some(domain) = &self.domain {
                let mut tag = Tag::new("domain");
                tag.opt("name", domain.name.as_deref())
                    .opt("localOnly", domain.local_only.as_deref());
                w.empty(tag)?;
            }
            w.child("dns", self.dns.as_ref())?;
            w.children("ip", &self.ips)?;
            w.children("route", &self.routes)?;
            w.child("bandwidth", self.bandwidth.as_ref())?;
            w.child("vlan", self.vlan.as_ref())?;
            w.child("virtualport", self.virtualport.as_ref())?;
            w.children("portgroup", &self.portgroups)?;
            for ext in &self.extensions {
                ext.to_xml(&ext.name, w)?;
            }
            Ok(())
        })
    }
}

impl FromXml for Network {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Network {
            namespaces: Namespace::collect(el)?,
            ipv6: el.attr("ipv6")?,
            trust_guest_rx_filters: el.attr("trustGuestRxFilters")?,
            ..Network::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "name" => out.name = Some(r.text(child)?),
                "uuid" => out.uuid = Some(r.text(child)?),
                "metadata" => out.metadata = r.read(child)?,
                "forward" => out.forward = r.read(child)?,
                "bridge" => out.bridge = r.read(child)?,
                "mtu" => {
                    out.mtu = child.uint("size", Base::Decimal)?;
                    return Ok(false);
                }
                "mac" => {
                    out.mac = child.attr("address")?;
                    return Ok(false);
                }
                "domain" => {
                    out.domain = Some(NetworkDomain {
                        name: child.attr("name")?,
                        local_only: child.attr("localOnly")?,
                    });
                    return Ok(false);
                }
                "dns" => out.dns = r.read(child)?,
                "ip" => out.ips.extend(r.read::<NetworkIp>(child)?),
                "route" => out.routes.extend(r.read::<Route>(child)?),
                "bandwidth" => out.bandwidth = r.read(child)?,
                "vlan" => out.vlan = r.read(child)?,
                "virtualport" => out.virtualport = r.read(child)?,
                "portgroup" => out.portgroups.extend(r.read::<PortGroup>(child)?),
                _ if RawElement::is_extension(child) => {
                    trace!(element = child.name(), "keeping extension element");
                    out.extensions.extend(r.read::<RawElement>(child)?);
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl Document for Network {
    const ROOT: &'static str = "network";
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAT: &str = r#"<network>
  <name>default</name>
  <uuid>9a05da11-e96b-47f3-8253-a3a482e445f5</uuid>
  <forward mode="nat">
    <nat>
      <port start="1024" end="65535"/>
    </nat>
  </forward>
  <bridge name="virbr0" stp="on" delay="0"/>
  <mac address="52:54:00:0a:cd:21"/>
  <domain name="example.lan" localOnly="yes"/>
  <dns>
    <forwarder addr="8.8.8.8"/>
    <host ip="192.168.122.2">
      <hostname>myhost</hostname>
      <hostname>myhostalias</hostname>
    </host>
    <srv service="name" protocol="tcp" domain="test-domain-name" target="." port="1024" priority="10" weight="10"/>
  </dns>
  <ip address="192.168.122.1" netmask="255.255.255.0">
    <tftp root="/var/lib/tftp"/>
    <dhcp>
      <range start="192.168.122.2" end="192.168.122.254"/>
      <host mac="00:16:3e:77:e2:ed" name="foo.example.com" ip="192.168.122.10"/>
      <bootp file="pxelinux.0"/>
    </dhcp>
  </ip>
  <ip family="ipv6" address="2001:db8:ca2:2::1" prefix="64"/>
  <route address="192.168.222.0" prefix="24" gateway="192.168.122.2"/>
</network>"#;

    #[test]
    fn nat_network_roundtrip() {
        let net = Network::unmarshal(NAT).expect("decode");
        let forward = net.forward.as_ref().expect("forward");
        match &forward.mode {
            Some(ForwardMode::Nat(nat)) => {
                assert_eq!(nat.ports.as_ref().and_then(|p| p.end), Some(65535))
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(net.ips.len(), 2);
        assert_eq!(net.dns.as_ref().map(|d| d.hosts[0].hostnames.len()), Some(2));
        assert_eq!(net.marshal().expect("encode"), NAT);
    }

    #[test]
    fn bare_forward_is_nat() {
        let net = Network::unmarshal("<network><forward/></network>").expect("decode");
        assert_eq!(
            net.forward.as_ref().and_then(|f| f.mode.clone()),
            Some(ForwardMode::Nat(ForwardNat::default()))
        );
        assert_eq!(
            net.marshal().expect("encode"),
            "<network>\n  <forward mode=\"nat\"/>\n</network>"
        );
    }

    #[test]
    fn hostdev_pool_keeps_pci_spelling() {
        let xml = r#"<network>
  <name>passthrough</name>
  <forward mode="hostdev" managed="yes">
    <driver name="vfio"/>
    <address type="pci" domain="0x0000" bus="0x02" slot="0x10" function="0x1"/>
    <address type="pci" domain="0x0000" bus="0x02" slot="0x10" function="0x3"/>
  </forward>
</network>"#;
        let net = Network::unmarshal(xml).expect("decode");
        match net.forward.as_ref().and_then(|f| f.mode.as_ref()) {
            Some(ForwardMode::Hostdev(pool)) => {
                assert_eq!(pool.addresses.len(), 2);
                assert_eq!(
                    pool.addresses[1],
                    ForwardAddress::Pci(PciAddress::new(0, 2, 0x10, 3))
                );
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(net.marshal().expect("encode"), xml);
    }

    #[test]
    fn unknown_forward_mode_keeps_siblings() {
        let net = Network::unmarshal(
            r#"<network><forward mode="teleport" dev="eth0"><pf dev="eth2"/></forward><bridge name="br0"/></network>"#,
        )
        .expect("decode");
        let forward = net.forward.expect("forward");
        assert_eq!(forward.mode, None);
        assert_eq!(forward.dev.as_deref(), Some("eth0"));
        assert_eq!(forward.pf.as_deref(), Some("eth2"));
        assert!(net.bridge.is_some());
    }

    #[test]
    fn bridge_pool_with_portgroups() {
        let xml = r#"<network>
  <name>ovs-net</name>
  <forward mode="bridge" dev="eth0">
    <interface dev="eth0"/>
    <interface dev="eth1"/>
  </forward>
  <bridge name="ovsbr0"/>
  <virtualport type="openvswitch"/>
  <portgroup name="engineering" default="yes">
    <vlan>
      <tag id="42"/>
    </vlan>
    <virtualport type="openvswitch">
      <parameters profileid="engineering"/>
    </virtualport>
    <bandwidth>
      <inbound average="1000" peak="5000" burst="5120"/>
    </bandwidth>
  </portgroup>
</network>"#;
        let net = Network::unmarshal(xml).expect("decode");
        assert_eq!(net.portgroups.len(), 1);
        assert_eq!(net.forward.as_ref().map(|f| f.interfaces.len()), Some(2));
        assert_eq!(net.marshal().expect("encode"), xml);
    }

    #[test]
    fn dnsmasq_options_pass_through() {
        let xml = r#"<network xmlns:dnsmasq="http://libvirt.org/schemas/network/dnsmasq/1.0">
  <name>isolated</name>
  <dnsmasq:options>
    <dnsmasq:option value="dhcp-option=3"/>
  </dnsmasq:options>
</network>"#;
        let net = Network::unmarshal(xml).expect("decode");
        assert_eq!(net.namespaces.len(), 1);
        assert_eq!(net.extensions.len(), 1);
        assert_eq!(net.marshal().expect("encode"), xml);
    }
}
