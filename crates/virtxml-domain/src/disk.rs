//! `<disk>` devices and their backing chains.

use std::io::Write;

use virtxml_codec::union::{self, read_into};
use virtxml_codec::{
    is_blank, registry, Base, Element, FromXml, Registry, Result, Tag, ToXml, UintFormat, Union,
    XmlReader, XmlWriter,
};
use virtxml_storage::Encryption;

use crate::address::{DomainAddress, PciAddress};
use crate::chardev::Reconnect;

registry! {
    pub enum DiskSourceKind for "disk source" {
        carrier: Attribute("type"),
        absent: Default(File),
        unknown: Skip,
        File = "file",
        Block = "block",
        Dir = "dir",
        Network = "network",
        Volume = "volume",
        Nvme = "nvme",
        VhostUser = "vhostuser",
    }
}

/// Where a disk's data lives. The kind is carried by the enclosing
/// `<disk>` (or `<backingStore>`) element's `type` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiskSource {
    pub backend: DiskBackend,
    pub startup_policy: Option<String>,
    pub index: Option<u32>,
    pub encryption: Option<Encryption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiskBackend {
    File { file: Option<String> },
    Block { dev: Option<String> },
    Dir { dir: Option<String> },
    Network(NetworkDisk),
    Volume { pool: Option<String>, volume: Option<String>, mode: Option<String> },
    Nvme(NvmeDisk),
    VhostUser(VhostUserDisk),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkDisk {
    pub protocol: Option<String>,
    pub name: Option<String>,
    pub tls: Option<String>,
    pub hosts: Vec<DiskHost>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiskHost {
    pub transport: Option<String>,
    pub name: Option<String>,
    pub port: Option<String>,
    pub socket: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NvmeDisk {
    pub managed: Option<String>,
    pub namespace: Option<u32>,
    pub address: Option<PciAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VhostUserDisk {
    pub path: Option<String>,
    pub reconnect: Option<Reconnect>,
}

impl DiskSource {
    pub fn new(backend: DiskBackend) -> Self {
        DiskSource {
            backend,
            startup_policy: None,
            index: None,
            encryption: None,
        }
    }

    pub fn file(path: &str) -> Self {
        DiskSource::new(DiskBackend::File {
            file: Some(path.to_string()),
        })
    }

    fn backend_is_blank(&self) -> bool {
        match &self.backend {
            DiskBackend::File { file } => is_blank(file.as_deref()),
            DiskBackend::Block { dev } => is_blank(dev.as_deref()),
            DiskBackend::Dir { dir } => is_blank(dir.as_deref()),
            DiskBackend::Network(net) => {
                is_blank(net.protocol.as_deref()) && is_blank(net.name.as_deref()) && net.hosts.is_empty()
            }
            DiskBackend::Volume { pool, volume, .. } => {
                is_blank(pool.as_deref()) && is_blank(volume.as_deref())
            }
            DiskBackend::Nvme(nvme) => nvme.address.is_none() && nvme.namespace.is_none(),
            DiskBackend::VhostUser(vhost) => is_blank(vhost.path.as_deref()),
        }
    }

    fn write_source<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new("source");
        match &self.backend {
            DiskBackend::File { file } => {
                tag.opt("file", file.as_deref());
            }
            DiskBackend::Block { dev } => {
                tag.opt("dev", dev.as_deref());
            }
            DiskBackend::Dir { dir } => {
                tag.opt("dir", dir.as_deref());
            }
            DiskBackend::Network(net) => {
                tag.opt("protocol", net.protocol.as_deref())
                    .opt("name", net.name.as_deref())
                    .opt("tls", net.tls.as_deref());
            }
            DiskBackend::Volume { pool, volume, mode } => {
                tag.opt("pool", pool.as_deref())
                    .opt("volume", volume.as_deref())
                    .opt("mode", mode.as_deref());
            }
            DiskBackend::Nvme(nvme) => {
                tag.attr("type", "pci")
                    .opt("managed", nvme.managed.as_deref())
                    .uint("namespace", nvme.namespace, UintFormat::Decimal);
            }
            DiskBackend::VhostUser(vhost) => {
                tag.attr("type", "unix").opt("path", vhost.path.as_deref());
            }
        }
        tag.opt("startupPolicy", self.startup_policy.as_deref())
            .uint("index", self.index, UintFormat::Decimal);
        w.element(tag, |w| {
            match &self.backend {
                DiskBackend::Network(net) => {
                    for host in &net.hosts {
                        let mut tag = Tag::new("host");
                        tag.opt("transport", host.transport.as_deref())
                            .opt("name", host.name.as_deref())
                            .opt("port", host.port.as_deref())
                            .opt("socket", host.socket.as_deref());
                        w.empty(tag)?;
                    }
                }
                DiskBackend::Nvme(nvme) => w.child("address", nvme.address.as_ref())?,
                DiskBackend::VhostUser(VhostUserDisk {
                    reconnect: Some(reconnect),
                    ..
                }) => reconnect.write(w)?,
                _ => {}
            }
            w.child("encryption", self.encryption.as_ref())
        })
    }

    fn read_source<'a>(&mut self, el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<()> {
        self.startup_policy = el.attr("startupPolicy")?;
        self.index = el.uint("index", Base::Decimal)?;
        match &mut self.backend {
            DiskBackend::File { file } => *file = el.attr("file")?,
            DiskBackend::Block { dev } => *dev = el.attr("dev")?,
            DiskBackend::Dir { dir } => *dir = el.attr("dir")?,
            DiskBackend::Network(net) => {
                net.protocol = el.attr("protocol")?;
                net.name = el.attr("name")?;
                net.tls = el.attr("tls")?;
            }
            DiskBackend::Volume { pool, volume, mode } => {
                *pool = el.attr("pool")?;
                *volume = el.attr("volume")?;
                *mode = el.attr("mode")?;
            }
            DiskBackend::Nvme(nvme) => {
                nvme.managed = el.attr("managed")?;
                nvme.namespace = el.uint("namespace", Base::Decimal)?;
            }
            DiskBackend::VhostUser(vhost) => vhost.path = el.attr("path")?,
        }
        let (backend, encryption) = (&mut self.backend, &mut self.encryption);
        r.each_child(el, |r, child| {
            match (&mut *backend, child.name()) {
                (_, "encryption") => {
                    *encryption = r.read(child)?;
                    return Ok(true);
                }
                (DiskBackend::Network(net), "host") => net.hosts.push(DiskHost {
                    transport: child.attr("transport")?,
                    name: child.attr("name")?,
                    port: child.attr("port")?,
                    socket: child.attr("socket")?,
                }),
                (DiskBackend::Nvme(nvme), "address") => {
                    nvme.address = r.read(child)?;
                    return Ok(true);
                }
                (DiskBackend::VhostUser(vhost), "reconnect") => {
                    vhost.reconnect = Some(Reconnect::read(child)?);
                }
                _ => {}
            }
            Ok(false)
        })
    }
}

impl Union for DiskSource {
    type Kind = DiskSourceKind;

    fn kind(&self) -> DiskSourceKind {
        match self.backend {
            DiskBackend::File { .. } => DiskSourceKind::File,
            DiskBackend::Block { .. } => DiskSourceKind::Block,
            DiskBackend::Dir { .. } => DiskSourceKind::Dir,
            DiskBackend::Network(_) => DiskSourceKind::Network,
            DiskBackend::Volume { .. } => DiskSourceKind::Volume,
            DiskBackend::Nvme(_) => DiskSourceKind::Nvme,
            DiskBackend::VhostUser(_) => DiskSourceKind::VhostUser,
        }
    }

    fn allocate(kind: DiskSourceKind) -> Self {
        DiskSource::new(match kind {
            DiskSourceKind::File => DiskBackend::File { file: None },
            DiskSourceKind::Block => DiskBackend::Block { dev: None },
            DiskSourceKind::Dir => DiskBackend::Dir { dir: None },
            DiskSourceKind::Network => DiskBackend::Network(NetworkDisk::default()),
            DiskSourceKind::Volume => DiskBackend::Volume {
                pool: None,
                volume: None,
                mode: None,
            },
            DiskSourceKind::Nvme => DiskBackend::Nvme(NvmeDisk::default()),
            DiskSourceKind::VhostUser => DiskBackend::VhostUser(VhostUserDisk::default()),
        })
    }

    /// No `<source>` when the key field is blank and nothing else is configured.
    fn is_blank(&self) -> bool {
        self.backend_is_blank()
            && self.startup_policy.is_none()
            && self.index.is_none()
            && self.encryption.is_none()
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        if self.is_blank() {
            return Ok(());
        }
        self.write_source(w)
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        if child.name() != "source" {
            return Ok(false);
        }
        self.read_source(child, r)?;
        Ok(true)
    }
}

/// One layer of a disk's backing chain. A layer without a source marks the
/// end of the chain (`<backingStore/>`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackingStore {
    pub index: Option<u32>,
    pub format: Option<String>,
    pub source: Option<DiskSource>,
    pub backing_store: Option<Box<BackingStore>>,
}

impl ToXml for BackingStore {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        union::write_carried(&mut tag, self.source.as_ref());
        tag.uint("index", self.index, UintFormat::Decimal);
        w.element(tag, |w| {
            w.attr_element("format", "type", self.format.as_deref())?;
            if let Some(source) = &self.source {
                source.write_body(w)?;
            }
            w.child("backingStore", self.backing_store.as_ref())
        })
    }
}

impl FromXml for BackingStore {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = BackingStore {
            index: el.uint("index", Base::Decimal)?,
            source: if el.has_attr("type")? {
                union::allocate(el)?
            } else {
                None
            },
            ..BackingStore::default()
        };
        r.each_child(el, |r, child| {
            if read_into(&mut out.source, child, r)? {
                return Ok(true);
            }
            match child.name() {
                "format" => out.format = child.attr("type")?,
                "backingStore" => {
                    out.backing_store = r.read(child)?;
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
pub struct DiskDriver {
    pub name: Option<String>,
    pub format: Option<String>,
    pub cache: Option<String>,
    pub io: Option<String>,
    pub discard: Option<String>,
    pub iothread: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiskTarget {
    pub dev: Option<String>,
    pub bus: Option<String>,
    pub tray: Option<String>,
    pub removable: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Disk {
    pub device: Option<String>,
    pub driver: Option<DiskDriver>,
    pub source: Option<DiskSource>,
    pub backing_store: Option<BackingStore>,
    pub target: Option<DiskTarget>,
    pub readonly: bool,
    pub shareable: bool,
    pub transient: bool,
    pub serial: Option<String>,
    pub wwn: Option<String>,
    pub boot_order: Option<u32>,
    pub alias: Option<String>,
    pub address: Option<DomainAddress>,
}

impl ToXml for Disk {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        union::write_carried(&mut tag, self.source.as_ref());
        tag.opt("device", self.device.as_deref());
        w.element(tag, |w| {
            if let Some(driver) = &self.driver {
                let mut tag = Tag::new("driver");
                tag.opt("name", driver.name.as_deref())
                    .opt("type", driver.format.as_deref())
                    .opt("cache", driver.cache.as_deref())
                    .opt("io", driver.io.as_deref())
                    .opt("discard", driver.discard.as_deref())
                    .uint("iothread", driver.iothread, UintFormat::Decimal);
                w.empty(tag)?;
            }
            if let Some(source) = &self.source {
                source.write_body(w)?;
            }
            w.child("backingStore", self.backing_store.as_ref())?;
            if let Some(target) = &self.target {
                let mut tag = Tag::new("target");
                tag.opt("dev", target.dev.as_deref())
                    .opt("bus", target.bus.as_deref())
                    .opt("tray", target.tray.as_deref())
                    .opt("removable", target.removable.as_deref());
                w.empty(tag)?;
            }
            w.flag("readonly", self.readonly)?;
            w.flag("shareable", self.shareable)?;
            w.flag("transient", self.transient)?;
            w.opt_text("serial", self.serial.as_deref())?;
            w.opt_text("wwn", self.wwn.as_deref())?;
            if let Some(order) = self.boot_order {
                w.attr_element("boot", "order", Some(&order.to_string()))?;
            }
            w.attr_element("alias", "name", self.alias.as_deref())?;
            w.child("address", self.address.as_ref())
        })
    }
}

impl FromXml for Disk {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Disk {
            device: el.attr("device")?,
            source: union::allocate(el)?,
            ..Disk::default()
        };
        r.each_child(el, |r, child| {
            if read_into(&mut out.source, child, r)? {
                return Ok(true);
            }
            match child.name() {
                "driver" => {
                    out.driver = Some(DiskDriver {
                        name: child.attr("name")?,
                        format: child.attr("type")?,
                        cache: child.attr("cache")?,
                        io: child.attr("io")?,
                        discard: child.attr("discard")?,
                        iothread: child.uint("iothread", Base::Decimal)?,
                    })
                }
                "backingStore" => {
                    out.backing_store = r.read(child)?;
                    return Ok(true);
                }
                "target" => {
                    out.target = Some(DiskTarget {
                        dev: child.attr("dev")?,
                        bus: child.attr("bus")?,
                        tray: child.attr("tray")?,
                        removable: child.attr("removable")?,
                    })
                }
                "readonly" => out.readonly = true,
                "shareable" => out.shareable = true,
                "transient" => out.transient = true,
                "serial" => {
                    out.serial = Some(r.text(child)?);
                    return Ok(true);
                }
                "wwn" => {
                    out.wwn = Some(r.text(child)?);
                    return Ok(true);
                }
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

/// Source for a snapshot `<disk>` that has a `<source>` child but no
/// `type` attribute: the same default backend a domain disk gets.
pub(crate) fn untyped_snapshot_source() -> Result<Option<DiskSource>> {
    Ok(DiskSourceKind::resolve(None)?.map(DiskSource::allocate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(disk: &Disk) -> String {
        let mut w = XmlWriter::new(Vec::new());
        disk.to_xml("disk", &mut w).expect("encode");
        String::from_utf8(w.into_inner()).expect("utf8")
    }

    fn decode(xml: &str) -> Disk {
        let mut r = XmlReader::new(xml);
        let root = r.root().expect("root");
        Disk::from_xml(&root, &mut r).expect("decode").expect("disk")
    }

    #[test]
    fn file_source_scenario() {
        let disk = Disk {
            source: Some(DiskSource::file("/var/lib/images/disk.qcow2")),
            ..Disk::default()
        };
        let xml = encode(&disk);
        assert_eq!(
            xml,
            "<disk type=\"file\">\n  <source file=\"/var/lib/images/disk.qcow2\"/>\n</disk>"
        );
        let back = decode(&xml);
        assert_eq!(back, disk);
        match back.source.map(|s| s.backend) {
            Some(DiskBackend::File { file }) => {
                assert_eq!(file.as_deref(), Some("/var/lib/images/disk.qcow2"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_type_defaults_to_file() {
        let disk = decode(r#"<disk device="cdrom"><target dev="hdc" bus="ide"/><readonly/></disk>"#);
        assert_eq!(disk.source, Some(DiskSource::allocate(DiskSourceKind::File)));
        assert!(disk.readonly);
        assert_eq!(
            encode(&disk),
            "<disk type=\"file\" device=\"cdrom\">\n  <target dev=\"hdc\" bus=\"ide\"/>\n  <readonly/>\n</disk>"
        );
    }

    #[test]
    fn empty_file_source_is_omitted() {
        let disk = Disk {
            source: Some(DiskSource::new(DiskBackend::File {
                file: Some(String::new()),
            })),
            device: Some("cdrom".into()),
            ..Disk::default()
        };
        assert_eq!(encode(&disk), r#"<disk type="file" device="cdrom"/>"#);
        let back = decode(&encode(&disk));
        assert_eq!(back.source, Some(DiskSource::allocate(DiskSourceKind::File)));
    }

    const NETWORK_DISK: &str = r#"<disk type="network" device="disk">
  <driver name="qemu" type="raw" cache="none" io="native"/>
  <source protocol="rbd" name="pool/image" index="2">
    <host name="mon1.example.org" port="6789"/>
    <host name="mon2.example.org" port="6789"/>
    <encryption format="luks">
      <secret type="passphrase" uuid="0a81f5b2-8403-7b23-c8d6-21ccc2f80d6f"/>
    </encryption>
  </source>
  <target dev="vdb" bus="virtio"/>
  <boot order="2"/>
  <alias name="virtio-disk1"/>
  <address type="pci" domain="0x0000" bus="0x00" slot="0x07" function="0x0"/>
</disk>"#;

    #[test]
    fn network_source_with_hosts() {
        let disk = decode(NETWORK_DISK);
        let source = disk.source.as_ref().expect("source");
        assert_eq!(source.index, Some(2));
        match &source.backend {
            DiskBackend::Network(net) => {
                assert_eq!(net.protocol.as_deref(), Some("rbd"));
                assert_eq!(net.hosts.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(disk.boot_order, Some(2));
        assert_eq!(encode(&disk), NETWORK_DISK);
    }

    #[test]
    fn backing_chain_roundtrip() {
        let xml = r#"<disk type="file" device="disk">
  <source file="/images/top.qcow2"/>
  <backingStore type="block" index="1">
    <format type="qcow2"/>
    <source dev="/dev/vg/base"/>
    <backingStore/>
  </backingStore>
  <target dev="vda" bus="virtio"/>
</disk>"#;
        let disk = decode(xml);
        let layer = disk.backing_store.as_ref().expect("layer");
        assert_eq!(layer.index, Some(1));
        assert!(matches!(
            layer.source.as_ref().map(|s| &s.backend),
            Some(DiskBackend::Block { .. })
        ));
        let end = layer.backing_store.as_deref().expect("terminator");
        assert_eq!(end, &BackingStore::default());
        assert_eq!(encode(&disk), xml);
    }

    #[test]
    fn nvme_and_vhostuser_sources() {
        let xml = r#"<disk type="nvme" device="disk">
  <source type="pci" managed="yes" namespace="1">
    <address domain="0x0000" bus="0x01" slot="0x00" function="0x0"/>
  </source>
  <target dev="vde" bus="virtio"/>
</disk>"#;
        assert_eq!(encode(&decode(xml)), xml);

        let xml = r#"<disk type="vhostuser" device="disk">
  <source type="unix" path="/tmp/vhost-blk.sock">
    <reconnect enabled="yes" timeout="10"/>
  </source>
  <target dev="vdf" bus="virtio"/>
</disk>"#;
        assert_eq!(encode(&decode(xml)), xml);
    }

    #[test]
    fn unknown_source_type_is_dropped() {
        let disk = decode(r#"<disk type="quantum"><source qbit="1"/><target dev="vda"/></disk>"#);
        assert_eq!(disk.source, None);
        assert_eq!(disk.target.and_then(|t| t.dev).as_deref(), Some("vda"));
    }
}
