//! `<pool>` documents.

use std::io::Write;

use tracing::trace;
use virtxml_codec::union::{read_union, write_union};
use virtxml_codec::{
    registry, Base, Document, Element, FromXml, Result, Tag, ToXml, UintFormat, Union, XmlReader,
    XmlWriter,
};

use crate::common::{Permissions, Size};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoragePool {
    /// Backend kind (`dir`, `logical`, `iscsi`...), kept verbatim.
    pub pool_type: Option<String>,
    pub name: Option<String>,
    pub uuid: Option<String>,
    pub capacity: Option<Size>,
    pub allocation: Option<Size>,
    pub available: Option<Size>,
    pub source: Option<PoolSource>,
    pub target: Option<PoolTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolSource {
    pub hosts: Vec<SourceHost>,
    pub devices: Vec<String>,
    pub dir: Option<String>,
    pub adapter: Option<PoolAdapter>,
    pub name: Option<String>,
    pub format: Option<String>,
    pub auth: Option<SourceAuth>,
    pub vendor: Option<String>,
    pub product: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceHost {
    pub name: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceAuth {
    pub kind: Option<String>,
    pub username: Option<String>,
    pub secret_usage: Option<String>,
    pub secret_uuid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolTarget {
    pub path: Option<String>,
    pub permissions: Option<Permissions>,
}

registry! {
    /// Host adapter kinds of SCSI pools.
    pub enum PoolAdapterKind for "pool adapter" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        ScsiHost = "scsi_host",
        FcHost = "fc_host",
    }
}

/// SCSI host adapter behind a `scsi` pool.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PoolAdapter {
    ScsiHost(ScsiHostAdapter),
    FcHost(FcHostAdapter),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScsiHostAdapter {
    pub name: Option<String>,
    pub parent_addr: Option<AdapterParent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdapterParent {
    pub unique_id: Option<u64>,
    pub address: Option<AdapterPciAddress>,
}

/// PCI location of an adapter's parent HBA.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdapterPciAddress {
    pub domain: Option<u32>,
    pub bus: Option<u32>,
    pub slot: Option<u32>,
    pub function: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FcHostAdapter {
    pub parent: Option<String>,
    pub parent_wwnn: Option<String>,
    pub parent_wwpn: Option<String>,
    pub parent_fabric_wwn: Option<String>,
    pub managed: Option<String>,
    pub wwnn: Option<String>,
    pub wwpn: Option<String>,
}

impl Union for PoolAdapter {
    type Kind = PoolAdapterKind;

    fn kind(&self) -> PoolAdapterKind {
        match self {
            PoolAdapter::ScsiHost(_) => PoolAdapterKind::ScsiHost,
            PoolAdapter::FcHost(_) => PoolAdapterKind::FcHost,
        }
    }

    fn allocate(kind: PoolAdapterKind) -> Self {
        match kind {
            PoolAdapterKind::ScsiHost => PoolAdapter::ScsiHost(ScsiHostAdapter::default()),
            PoolAdapterKind::FcHost => PoolAdapter::FcHost(FcHostAdapter::default()),
        }
    }

    /// Older documents omit `type`; the addressing attributes imply it.
    fn infer(el: &Element<'_>) -> Result<Option<PoolAdapterKind>> {
        let kind = if el.has_attr("name")? {
            Some(PoolAdapterKind::ScsiHost)
        } else if el.has_attr("wwnn")? || el.has_attr("wwpn")? {
            Some(PoolAdapterKind::FcHost)
        } else {
            None
        };
        if let Some(kind) = kind {
            trace!(?kind, "inferred legacy adapter type");
        }
        Ok(kind)
    }

    fn write_attrs(&self, tag: &mut Tag) {
        match self {
            PoolAdapter::ScsiHost(scsi) => {
                tag.opt("name", scsi.name.as_deref());
            }
            PoolAdapter::FcHost(fc) => {
                tag.opt("managed", fc.managed.as_deref())
                    .opt("parent", fc.parent.as_deref())
                    .opt("parent_wwnn", fc.parent_wwnn.as_deref())
                    .opt("parent_wwpn", fc.parent_wwpn.as_deref())
                    .opt("parent_fabric_wwn", fc.parent_fabric_wwn.as_deref())
                    .opt("wwnn", fc.wwnn.as_deref())
                    .opt("wwpn", fc.wwpn.as_deref());
            }
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            PoolAdapter::ScsiHost(scsi) => w.child("parentaddr", scsi.parent_addr.as_ref()),
            PoolAdapter::FcHost(_) => Ok(()),
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        match self {
            PoolAdapter::ScsiHost(scsi) => scsi.name = el.attr("name")?,
            PoolAdapter::FcHost(fc) => {
                fc.managed = el.attr("managed")?;
                fc.parent = el.attr("parent")?;
                fc.parent_wwnn = el.attr("parent_wwnn")?;
                fc.parent_wwpn = el.attr("parent_wwpn")?;
                fc.parent_fabric_wwn = el.attr("parent_fabric_wwn")?;
                fc.wwnn = el.attr("wwnn")?;
                fc.wwpn = el.attr("wwpn")?;
            }
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match (self, child.name()) {
            (PoolAdapter::ScsiHost(scsi), "parentaddr") => scsi.parent_addr = r.read(child)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

virtxml_codec::union_xml!(PoolAdapter);

impl ToXml for AdapterParent {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.uint("unique_id", self.unique_id, UintFormat::Decimal);
        w.element(tag, |w| w.child("address", self.address.as_ref()))
    }
}

impl FromXml for AdapterParent {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = AdapterParent {
            unique_id: el.uint("unique_id", Base::Decimal)?,
            address: None,
        };
        r.each_child(el, |r, child| {
            if child.name() != "address" {
                return Ok(false);
            }
            out.address = r.read(child)?;
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl ToXml for AdapterPciAddress {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.uint("domain", self.domain, UintFormat::Hex { width: 4 })
            .uint("bus", self.bus, UintFormat::Hex { width: 2 })
            .uint("slot", self.slot, UintFormat::Hex { width: 2 })
            .uint("function", self.function, UintFormat::HEX);
        w.empty(tag)
    }
}

impl FromXml for AdapterPciAddress {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let out = AdapterPciAddress {
            domain: el.uint("domain", Base::Hex)?,
            bus: el.uint("bus", Base::Hex)?,
            slot: el.uint("slot", Base::Hex)?,
            function: el.uint("function", Base::Hex)?,
        };
        r.skip(el)?;
        Ok(Some(out))
    }
}

impl ToXml for PoolSource {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            for host in &self.hosts {
                let mut tag = Tag::new("host");
                tag.opt("name", host.name.as_deref())
                    .uint("port", host.port, UintFormat::Decimal);
                w.empty(tag)?;
            }
            for device in &self.devices {
                w.attr_element("device", "path", Some(device))?;
            }
            w.attr_element("dir", "path", self.dir.as_deref())?;
            if let Some(adapter) = &self.adapter {
                write_union("adapter", adapter, w)?;
            }
            w.opt_text("name", self.name.as_deref())?;
            w.attr_element("format", "type", self.format.as_deref())?;
            if let Some(auth) = &self.auth {
                let mut tag = Tag::new("auth");
                tag.opt("type", auth.kind.as_deref())
                    .opt("username", auth.username.as_deref());
                w.element(tag, |w| {
                    if auth.secret_usage.is_none() && auth.secret_uuid.is_none() {
                        return Ok(());
                    }
                    let mut secret = Tag::new("secret");
                    secret
                        .opt("usage", auth.secret_usage.as_deref())
                        .opt("uuid", auth.secret_uuid.as_deref());
                    w.empty(secret)
                })?;
            }
            w.attr_element("vendor", "name", self.vendor.as_deref())?;
            w.attr_element("product", "name", self.product.as_deref())
        })
    }
}

impl FromXml for PoolSource {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = PoolSource::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "host" => out.hosts.push(SourceHost {
                    name: child.attr("name")?,
                    port: child.uint("port", Base::Decimal)?,
                }),
                "device" => out.devices.extend(child.attr("path")?),
                "dir" => out.dir = child.attr("path")?,
                "adapter" => {
                    out.adapter = read_union(child, r)?;
                    return Ok(true);
                }
                "name" => {
                    out.name = Some(r.text(child)?);
                    return Ok(true);
                }
                "format" => out.format = child.attr("type")?,
                "auth" => {
                    let mut auth = SourceAuth {
                        kind: child.attr("type")?,
                        username: child.attr("username")?,
                        ..SourceAuth::default()
                    };
                    r.each_child(child, |_, secret| {
                        if secret.name() == "secret" {
                            auth.secret_usage = secret.attr("usage")?;
                            auth.secret_uuid = secret.attr("uuid")?;
                        }
                        Ok(false)
                    })?;
                    out.auth = Some(auth);
                    return Ok(true);
                }
                "vendor" => out.vendor = child.attr("name")?,
                "product" => out.product = child.attr("name")?,
                _ => return Ok(false),
            }
            r.skip(child)?;
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl ToXml for PoolTarget {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            w.opt_text("path", self.path.as_deref())?;
            w.child("permissions", self.permissions.as_ref())
        })
    }
}

impl FromXml for PoolTarget {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = PoolTarget::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "path" => out.path = Some(r.text(child)?),
                "permissions" => out.permissions = r.read(child)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl ToXml for StoragePool {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("type", self.pool_type.as_deref());
        w.element(tag, |w| {
            w.opt_text("name", self.name.as_deref())?;
            w.opt_text("uuid", self.uuid.as_deref())?;
            w.child("capacity", self.capacity.as_ref())?;
            w.child("allocation", self.allocation.as_ref())?;
            w.child("available", self.available.as_ref())?;
            w.child("source", self.source.as_ref())?;
            w.child("target", self.target.as_ref())
        })
    }
}

impl FromXml for StoragePool {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = StoragePool {
            pool_type: el.attr("type")?,
            ..StoragePool::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "name" => out.name = Some(r.text(child)?),
                "uuid" => out.uuid = Some(r.text(child)?),
                "capacity" => out.capacity = r.read(child)?,
                "allocation" => out.allocation = r.read(child)?,
                "available" => out.available = r.read(child)?,
                "source" => out.source = r.read(child)?,
                "target" => out.target = r.read(child)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl Document for StoragePool {
    const ROOT: &'static str = "pool";
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIR_POOL: &str = r#"<pool type="dir">
  <name>default</name>
  <uuid>4a8f6b3c-1f0e-4a53-9b83-0c5d0e7e2a11</uuid>
  <capacity unit="bytes">105089261568</capacity>
  <allocation unit="bytes">40534757376</allocation>
  <available unit="bytes">64554504192</available>
  <source/>
  <target>
    <path>/var/lib/libvirt/images</path>
    <permissions>
      <mode>0711</mode>
      <owner>0</owner>
      <group>0</group>
    </permissions>
  </target>
</pool>"#;

    #[test]
    fn dir_pool_roundtrip() {
        let pool = StoragePool::unmarshal(DIR_POOL).expect("decode");
        assert_eq!(pool.pool_type.as_deref(), Some("dir"));
        assert_eq!(pool.capacity.as_ref().map(|s| s.value), Some(105089261568));
        assert_eq!(pool.source, Some(PoolSource::default()));
        assert_eq!(pool.marshal().expect("encode"), DIR_POOL);
    }

    #[test]
    fn legacy_adapter_infers_scsi_host() {
        let xml = r#"<pool type="scsi">
  <name>hba</name>
  <source>
    <adapter name="host0"/>
  </source>
</pool>"#;
        let pool = StoragePool::unmarshal(xml).expect("decode");
        let adapter = pool.source.as_ref().and_then(|s| s.adapter.clone());
        assert_eq!(
            adapter,
            Some(PoolAdapter::ScsiHost(ScsiHostAdapter {
                name: Some("host0".into()),
                parent_addr: None,
            }))
        );
        let out = pool.marshal().expect("encode");
        assert!(out.contains(r#"<adapter type="scsi_host" name="host0"/>"#), "{out}");
    }

    #[test]
    fn fc_adapter_inferred_from_wwn() {
        let xml = r#"<pool type="scsi"><source><adapter parent="scsi_host3" wwnn="20000000c9831b4b" wwpn="10000000c9831b4b"/></source></pool>"#;
        let pool = StoragePool::unmarshal(xml).expect("decode");
        match pool.source.and_then(|s| s.adapter) {
            Some(PoolAdapter::FcHost(fc)) => {
                assert_eq!(fc.parent.as_deref(), Some("scsi_host3"));
                assert_eq!(fc.wwpn.as_deref(), Some("10000000c9831b4b"));
            }
            other => panic!("unexpected adapter {other:?}"),
        }
    }

    #[test]
    fn adapter_without_clues_stays_unset() {
        let xml = r#"<pool type="scsi"><source><adapter/><name>x</name></source></pool>"#;
        let pool = StoragePool::unmarshal(xml).expect("decode");
        let source = pool.source.expect("source");
        assert_eq!(source.adapter, None);
        assert_eq!(source.name.as_deref(), Some("x"));
    }

    #[test]
    fn scsi_host_parent_address_uses_pci_widths() {
        let xml = r#"<pool type="scsi">
  <source>
    <adapter type="scsi_host">
      <parentaddr unique_id="1">
        <address domain="0x0000" bus="0x00" slot="0x1f" function="0x2"/>
      </parentaddr>
    </adapter>
  </source>
</pool>"#;
        let pool = StoragePool::unmarshal(xml).expect("decode");
        assert_eq!(pool.marshal().expect("encode"), xml);
    }

    #[test]
    fn iscsi_source_with_auth() {
        let xml = r#"<pool type="iscsi">
  <name>iscsi</name>
  <source>
    <host name="10.0.0.5" port="3260"/>
    <device path="iqn.2013-06.com.example:iscsi-pool"/>
    <auth type="chap" username="admin">
      <secret usage="libvirtiscsi"/>
    </auth>
  </source>
  <target>
    <path>/dev/disk/by-path</path>
  </target>
</pool>"#;
        let pool = StoragePool::unmarshal(xml).expect("decode");
        let source = pool.source.as_ref().expect("source");
        assert_eq!(source.hosts[0].port, Some(3260));
        assert_eq!(
            source.auth.as_ref().and_then(|a| a.secret_usage.as_deref()),
            Some("libvirtiscsi")
        );
        assert_eq!(pool.marshal().expect("encode"), xml);
    }
}
