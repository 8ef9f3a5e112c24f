//! Character devices: serial, console, parallel and channel.
//!
//! The backend kind is the `type` attribute of the device element itself;
//! the backend's settings live in one or more `<source>` children. The
//! same source union also backs RNG `egd`, smartcard `passthrough` and
//! `redirdev` devices.

use std::io::Write;

use virtxml_codec::union::{self, read_into};
use virtxml_codec::{
    is_blank, registry, Base, Element, FromXml, Result, Tag, ToXml, UintFormat, Union, XmlReader,
    XmlWriter,
};

use crate::address::DomainAddress;

registry! {
    pub enum ChardevKind for "chardev source" {
        carrier: Attribute("type"),
        absent: Default(Pty),
        unknown: Skip,
        Null = "null",
        Vc = "vc",
        Pty = "pty",
        Dev = "dev",
        File = "file",
        Pipe = "pipe",
        Stdio = "stdio",
        Udp = "udp",
        Tcp = "tcp",
        Unix = "unix",
        SpiceVmc = "spicevmc",
        SpicePort = "spiceport",
        Nmdm = "nmdm",
    }
}

/// Host side of a character device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChardevSource {
    Null,
    Vc,
    Pty(ChardevPath),
    Dev(ChardevPath),
    File(ChardevFile),
    Pipe(ChardevPath),
    Stdio,
    Udp(ChardevUdp),
    Tcp(ChardevTcp),
    Unix(ChardevUnix),
    SpiceVmc,
    SpicePort(ChardevSpicePort),
    Nmdm(ChardevNmdm),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChardevPath {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChardevFile {
    pub path: Option<String>,
    pub append: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChardevUdp {
    pub bind_host: Option<String>,
    pub bind_service: Option<String>,
    pub connect_host: Option<String>,
    pub connect_service: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChardevTcp {
    pub mode: Option<String>,
    pub host: Option<String>,
    pub service: Option<String>,
    pub tls: Option<String>,
    pub reconnect: Option<Reconnect>,
    /// Wire protocol from the sibling `<protocol type="..."/>`.
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChardevUnix {
    pub mode: Option<String>,
    pub path: Option<String>,
    pub reconnect: Option<Reconnect>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChardevSpicePort {
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChardevNmdm {
    pub master: Option<String>,
    pub slave: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reconnect {
    pub enabled: Option<String>,
    pub timeout: Option<u32>,
}

impl Reconnect {
    pub(crate) fn write<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new("reconnect");
        tag.opt("enabled", self.enabled.as_deref())
            .uint("timeout", self.timeout, UintFormat::Decimal);
        w.empty(tag)
    }

    pub(crate) fn read(el: &Element<'_>) -> Result<Self> {
        Ok(Reconnect {
            enabled: el.attr("enabled")?,
            timeout: el.uint("timeout", Base::Decimal)?,
        })
    }
}

/// `<source>` whose only content is `<reconnect>`, shared by tcp and unix.
fn read_reconnect<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Reconnect>> {
    let mut out = None;
    r.each_child(el, |_, child| {
        if child.name() == "reconnect" {
            out = Some(Reconnect::read(child)?);
        }
        Ok(false)
    })?;
    Ok(out)
}

fn write_path_source<W: Write>(path: Option<&str>, w: &mut XmlWriter<W>) -> Result<()> {
    if is_blank(path) {
        return Ok(());
    }
    w.attr_element("source", "path", path)
}

impl ChardevSource {
    /// Write the `<source>` children (and tcp `<protocol>`), honoring omission.
    fn write_sources<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            ChardevSource::Null | ChardevSource::Vc | ChardevSource::Stdio | ChardevSource::SpiceVmc => Ok(()),
            ChardevSource::Pty(s) | ChardevSource::Dev(s) | ChardevSource::Pipe(s) => {
                write_path_source(s.path.as_deref(), w)
            }
            ChardevSource::File(s) => {
                if is_blank(s.path.as_deref()) && s.append.is_none() {
                    return Ok(());
                }
                let mut tag = Tag::new("source");
                tag.opt("path", s.path.as_deref())
                    .opt("append", s.append.as_deref());
                w.empty(tag)
            }
            ChardevSource::Udp(s) => {
                for (mode, host, service) in [
                    ("bind", &s.bind_host, &s.bind_service),
                    ("connect", &s.connect_host, &s.connect_service),
                ] {
                    if is_blank(host.as_deref()) && is_blank(service.as_deref()) {
                        continue;
                    }
                    let mut tag = Tag::new("source");
                    tag.attr("mode", mode)
                        .opt("host", host.as_deref())
                        .opt("service", service.as_deref());
                    w.empty(tag)?;
                }
                Ok(())
            }
            ChardevSource::Tcp(s) => {
                let blank = is_blank(s.mode.as_deref())
                    && is_blank(s.host.as_deref())
                    && is_blank(s.service.as_deref())
                    && s.tls.is_none()
                    && s.reconnect.is_none();
                if !blank {
                    let mut tag = Tag::new("source");
                    tag.opt("mode", s.mode.as_deref())
                        .opt("host", s.host.as_deref())
                        .opt("service", s.service.as_deref())
                        .opt("tls", s.tls.as_deref());
                    w.element(tag, |w| match &s.reconnect {
                        Some(reconnect) => reconnect.write(w),
                        None => Ok(()),
                    })?;
                }
                w.attr_element("protocol", "type", s.protocol.as_deref())
            }
            ChardevSource::Unix(s) => {
                if is_blank(s.mode.as_deref()) && is_blank(s.path.as_deref()) && s.reconnect.is_none() {
                    return Ok(());
                }
                let mut tag = Tag::new("source");
                tag.opt("mode", s.mode.as_deref())
                    .opt("path", s.path.as_deref());
                w.element(tag, |w| match &s.reconnect {
                    Some(reconnect) => reconnect.write(w),
                    None => Ok(()),
                })
            }
            ChardevSource::SpicePort(s) => {
                if is_blank(s.channel.as_deref()) {
                    return Ok(());
                }
                w.attr_element("source", "channel", s.channel.as_deref())
            }
            ChardevSource::Nmdm(s) => {
                if is_blank(s.master.as_deref()) && is_blank(s.slave.as_deref()) {
                    return Ok(());
                }
                let mut tag = Tag::new("source");
                tag.opt("master", s.master.as_deref())
                    .opt("slave", s.slave.as_deref());
                w.empty(tag)
            }
        }
    }

    fn read_source<'a>(&mut self, el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<()> {
        match self {
            ChardevSource::Pty(s) | ChardevSource::Dev(s) | ChardevSource::Pipe(s) => {
                s.path = el.attr("path")?;
            }
            ChardevSource::File(s) => {
                s.path = el.attr("path")?;
                s.append = el.attr("append")?;
            }
            ChardevSource::Udp(s) => {
                let host = el.attr("host")?;
                let service = el.attr("service")?;
                if el.attr("mode")?.as_deref() == Some("bind") {
                    s.bind_host = host;
                    s.bind_service = service;
                } else {
                    s.connect_host = host;
                    s.connect_service = service;
                }
            }
            ChardevSource::Tcp(s) => {
                s.mode = el.attr("mode")?;
                s.host = el.attr("host")?;
                s.service = el.attr("service")?;
                s.tls = el.attr("tls")?;
                s.reconnect = read_reconnect(el, r)?;
                return Ok(());
            }
            ChardevSource::Unix(s) => {
                s.mode = el.attr("mode")?;
                s.path = el.attr("path")?;
                s.reconnect = read_reconnect(el, r)?;
                return Ok(());
            }
            ChardevSource::SpicePort(s) => s.channel = el.attr("channel")?,
            ChardevSource::Nmdm(s) => {
                s.master = el.attr("master")?;
                s.slave = el.attr("slave")?;
            }
            ChardevSource::Null | ChardevSource::Vc | ChardevSource::Stdio | ChardevSource::SpiceVmc => {}
        }
        r.skip(el)
    }
}

impl Union for ChardevSource {
    type Kind = ChardevKind;

    fn kind(&self) -> ChardevKind {
        match self {
            ChardevSource::Null => ChardevKind::Null,
            ChardevSource::Vc => ChardevKind::Vc,
            ChardevSource::Pty(_) => ChardevKind::Pty,
            ChardevSource::Dev(_) => ChardevKind::Dev,
            ChardevSource::File(_) => ChardevKind::File,
            ChardevSource::Pipe(_) => ChardevKind::Pipe,
            ChardevSource::Stdio => ChardevKind::Stdio,
            ChardevSource::Udp(_) => ChardevKind::Udp,
            ChardevSource::Tcp(_) => ChardevKind::Tcp,
            ChardevSource::Unix(_) => ChardevKind::Unix,
            ChardevSource::SpiceVmc => ChardevKind::SpiceVmc,
            ChardevSource::SpicePort(_) => ChardevKind::SpicePort,
            ChardevSource::Nmdm(_) => ChardevKind::Nmdm,
        }
    }

    fn allocate(kind: ChardevKind) -> Self {
        match kind {
            ChardevKind::Null => ChardevSource::Null,
            ChardevKind::Vc => ChardevSource::Vc,
            ChardevKind::Pty => ChardevSource::Pty(ChardevPath::default()),
            ChardevKind::Dev => ChardevSource::Dev(ChardevPath::default()),
            ChardevKind::File => ChardevSource::File(ChardevFile::default()),
            ChardevKind::Pipe => ChardevSource::Pipe(ChardevPath::default()),
            ChardevKind::Stdio => ChardevSource::Stdio,
            ChardevKind::Udp => ChardevSource::Udp(ChardevUdp::default()),
            ChardevKind::Tcp => ChardevSource::Tcp(ChardevTcp::default()),
            ChardevKind::Unix => ChardevSource::Unix(ChardevUnix::default()),
            ChardevKind::SpiceVmc => ChardevSource::SpiceVmc,
            ChardevKind::SpicePort => ChardevSource::SpicePort(ChardevSpicePort::default()),
            ChardevKind::Nmdm => ChardevSource::Nmdm(ChardevNmdm::default()),
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        self.write_sources(w)
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match (self, child.name()) {
            (ChardevSource::Tcp(tcp), "protocol") => {
                tcp.protocol = child.attr("type")?;
                r.skip(child)?;
            }
            (source, "source") => source.read_source(child, r)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// `<log file="..." append="..."/>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChardevLog {
    pub file: Option<String>,
    pub append: Option<String>,
}

impl ToXml for ChardevLog {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("file", self.file.as_deref())
            .opt("append", self.append.as_deref());
        w.empty(tag)
    }
}

impl FromXml for ChardevLog {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let out = ChardevLog {
            file: el.attr("file")?,
            append: el.attr("append")?,
        };
        r.skip(el)?;
        Ok(Some(out))
    }
}

/// A character device; `T` is the guest-side `<target>` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chardev<T> {
    pub source: Option<ChardevSource>,
    pub log: Option<ChardevLog>,
    pub target: Option<T>,
    pub alias: Option<String>,
    pub address: Option<DomainAddress>,
}

impl<T> Default for Chardev<T> {
    fn default() -> Self {
        Chardev {
            source: None,
            log: None,
            target: None,
            alias: None,
            address: None,
        }
    }
}

impl<T> Chardev<T> {
    pub fn new(source: ChardevSource) -> Self {
        Chardev {
            source: Some(source),
            ..Chardev::default()
        }
    }
}

impl<T: ToXml> ToXml for Chardev<T> {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        union::write_carried(&mut tag, self.source.as_ref());
        w.element(tag, |w| {
            if let Some(source) = &self.source {
                source.write_body(w)?;
            }
            w.child("log", self.log.as_ref())?;
            w.child("target", self.target.as_ref())?;
            w.attr_element("alias", "name", self.alias.as_deref())?;
            w.child("address", self.address.as_ref())
        })
    }
}

impl<T: FromXml> FromXml for Chardev<T> {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Chardev {
            source: union::allocate(el)?,
            ..Chardev::default()
        };
        r.each_child(el, |r, child| {
            if read_into(&mut out.source, child, r)? {
                return Ok(true);
            }
            match child.name() {
                "log" => out.log = r.read(child)?,
                "target" => out.target = r.read(child)?,
                "alias" => {
                    out.alias = child.attr("name")?;
                    r.skip(child)?;
                }
                "address" => out.address = r.read(child)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

/// `<target type="isa-serial" port="0"><model name="..."/></target>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SerialTarget {
    pub kind: Option<String>,
    pub port: Option<u32>,
    pub model: Option<String>,
}

impl ToXml for SerialTarget {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("type", self.kind.as_deref())
            .uint("port", self.port, UintFormat::Decimal);
        w.element(tag, |w| w.attr_element("model", "name", self.model.as_deref()))
    }
}

impl FromXml for SerialTarget {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = SerialTarget {
            kind: el.attr("type")?,
            port: el.uint("port", Base::Decimal)?,
            model: None,
        };
        r.each_child(el, |_, child| {
            if child.name() == "model" {
                out.model = child.attr("name")?;
            }
            Ok(false)
        })?;
        Ok(Some(out))
    }
}

/// `<target type="serial" port="0"/>`; parallel ports use it without `type`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortTarget {
    pub kind: Option<String>,
    pub port: Option<u32>,
}

impl ToXml for PortTarget {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("type", self.kind.as_deref())
            .uint("port", self.port, UintFormat::Decimal);
        w.empty(tag)
    }
}

impl FromXml for PortTarget {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let out = PortTarget {
            kind: el.attr("type")?,
            port: el.uint("port", Base::Decimal)?,
        };
        r.skip(el)?;
        Ok(Some(out))
    }
}

registry! {
    pub enum ChannelTargetKind for "channel target" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        Virtio = "virtio",
        Xen = "xen",
        Guestfwd = "guestfwd",
    }
}

/// Guest end of a `<channel>`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelTarget {
    Virtio { name: Option<String>, state: Option<String> },
    Xen { name: Option<String>, state: Option<String> },
    Guestfwd { address: Option<String>, port: Option<String> },
}

impl Union for ChannelTarget {
    type Kind = ChannelTargetKind;

    fn kind(&self) -> ChannelTargetKind {
        match self {
            ChannelTarget::Virtio { .. } => ChannelTargetKind::Virtio,
            ChannelTarget::Xen { .. } => ChannelTargetKind::Xen,
            ChannelTarget::Guestfwd { .. } => ChannelTargetKind::Guestfwd,
        }
    }

    fn allocate(kind: ChannelTargetKind) -> Self {
        match kind {
            ChannelTargetKind::Virtio => ChannelTarget::Virtio { name: None, state: None },
            ChannelTargetKind::Xen => ChannelTarget::Xen { name: None, state: None },
            ChannelTargetKind::Guestfwd => ChannelTarget::Guestfwd { address: None, port: None },
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        match self {
            ChannelTarget::Virtio { name, state } | ChannelTarget::Xen { name, state } => {
                tag.opt("name", name.as_deref()).opt("state", state.as_deref());
            }
            ChannelTarget::Guestfwd { address, port } => {
                tag.opt("address", address.as_deref()).opt("port", port.as_deref());
            }
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        match self {
            ChannelTarget::Virtio { name, state } | ChannelTarget::Xen { name, state } => {
                *name = el.attr("name")?;
                *state = el.attr("state")?;
            }
            ChannelTarget::Guestfwd { address, port } => {
                *address = el.attr("address")?;
                *port = el.attr("port")?;
            }
        }
        Ok(())
    }
}

virtxml_codec::union_xml!(ChannelTarget);

pub type Serial = Chardev<SerialTarget>;
pub type Console = Chardev<PortTarget>;
pub type Parallel = Chardev<PortTarget>;
pub type Channel = Chardev<ChannelTarget>;

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: ToXml>(name: &str, dev: &Chardev<T>) -> String {
        let mut w = XmlWriter::new(Vec::new());
        dev.to_xml(name, &mut w).expect("encode");
        String::from_utf8(w.into_inner()).expect("utf8")
    }

    fn decode<T: FromXml>(xml: &str) -> Chardev<T> {
        let mut r = XmlReader::new(xml);
        let root = r.root().expect("root");
        Chardev::from_xml(&root, &mut r)
            .expect("decode")
            .expect("chardev")
    }

    #[test]
    fn console_without_type_is_pty() {
        let console: Console = decode("<console/>");
        assert_eq!(console.source, Some(ChardevSource::Pty(ChardevPath::default())));
        assert_eq!(encode("console", &console), r#"<console type="pty"/>"#);
    }

    #[test]
    fn blank_path_suppresses_source() {
        let serial = Serial::new(ChardevSource::Pty(ChardevPath {
            path: Some(String::new()),
        }));
        assert_eq!(encode("serial", &serial), r#"<serial type="pty"/>"#);

        let decoded: Serial = decode(r#"<serial type="pty"/>"#);
        assert_eq!(decoded.source, Some(ChardevSource::Pty(ChardevPath { path: None })));
    }

    #[test]
    fn pty_serial_roundtrip() {
        let xml = r#"<serial type="pty">
  <source path="/dev/pts/4"/>
  <target type="isa-serial" port="0">
    <model name="isa-serial"/>
  </target>
  <alias name="serial0"/>
</serial>"#;
        let serial: Serial = decode(xml);
        assert_eq!(serial.target.as_ref().and_then(|t| t.port), Some(0));
        assert_eq!(encode("serial", &serial), xml);
    }

    #[test]
    fn tcp_source_with_protocol_and_reconnect() {
        let xml = r#"<serial type="tcp">
  <source mode="connect" host="0.0.0.0" service="2445">
    <reconnect enabled="yes" timeout="10"/>
  </source>
  <protocol type="telnet"/>
  <target port="1"/>
</serial>"#;
        let serial: Chardev<PortTarget> = decode(xml);
        match &serial.source {
            Some(ChardevSource::Tcp(tcp)) => {
                assert_eq!(tcp.protocol.as_deref(), Some("telnet"));
                assert_eq!(tcp.reconnect.as_ref().and_then(|r| r.timeout), Some(10));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(encode("serial", &serial), xml);
    }

    #[test]
    fn udp_bind_and_connect_sources() {
        let xml = r#"<serial type="udp">
  <source mode="bind" host="0.0.0.0" service="2445"/>
  <source mode="connect" host="10.0.0.1" service="2445"/>
  <target port="0"/>
</serial>"#;
        let serial: Chardev<PortTarget> = decode(xml);
        match &serial.source {
            Some(ChardevSource::Udp(udp)) => {
                assert_eq!(udp.bind_host.as_deref(), Some("0.0.0.0"));
                assert_eq!(udp.connect_host.as_deref(), Some("10.0.0.1"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(encode("serial", &serial), xml);
    }

    #[test]
    fn every_kind_survives_roundtrip() {
        for (wire, kind) in <ChardevKind as virtxml_codec::Registry>::TABLE {
            let dev: Console = Chardev::new(ChardevSource::allocate(*kind));
            let xml = encode("console", &dev);
            assert_eq!(xml, format!("<console type=\"{wire}\"/>"));
            let back: Console = decode(&xml);
            assert_eq!(back, dev);
        }
    }

    #[test]
    fn guest_agent_channel() {
        let xml = r#"<channel type="unix">
  <source mode="bind" path="/run/qemu/ga.sock"/>
  <target type="virtio" name="org.qemu.guest_agent.0" state="connected"/>
  <address type="virtio-serial" controller="0" bus="0" port="1"/>
</channel>"#;
        let channel: Channel = decode(xml);
        assert_eq!(
            channel.target,
            Some(ChannelTarget::Virtio {
                name: Some("org.qemu.guest_agent.0".into()),
                state: Some("connected".into()),
            })
        );
        assert_eq!(encode("channel", &channel), xml);
    }

    #[test]
    fn unknown_backend_keeps_rest_of_device() {
        let channel: Channel = decode(
            r#"<channel type="qemu-vdagent"><source clipboard="on"/><target type="virtio" name="com.redhat.spice.0"/></channel>"#,
        );
        assert_eq!(channel.source, None);
        assert!(matches!(channel.target, Some(ChannelTarget::Virtio { .. })));
    }
}
