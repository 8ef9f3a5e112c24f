//! `<domainsnapshot>` documents.

use std::io::Write;

use virtxml_codec::union::{self, read_into};
use virtxml_codec::{
    Document, Element, FromXml, RawXml, Result, Tag, ToXml, Union, XmlReader, XmlWriter,
};

use crate::disk::{self, DiskSource};
use crate::domain::Domain;

/// Per-disk snapshot policy.
///
/// The source is optional: internal snapshots have none, and a `<source>`
/// child without a `type` on the disk is a plain file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnapshotDisk {
    pub name: Option<String>,
    pub snapshot: Option<String>,
    pub driver_type: Option<String>,
    pub source: Option<DiskSource>,
}

impl ToXml for SnapshotDisk {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("name", self.name.as_deref())
            .opt("snapshot", self.snapshot.as_deref());
        union::write_carried(&mut tag, self.source.as_ref());
        w.element(tag, |w| {
            w.attr_element("driver", "type", self.driver_type.as_deref())?;
            match &self.source {
                Some(source) => source.write_body(w),
                None => Ok(()),
            }
        })
    }
}

impl FromXml for SnapshotDisk {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = SnapshotDisk {
            name: el.attr("name")?,
            snapshot: el.attr("snapshot")?,
            driver_type: None,
            source: if el.has_attr("type")? {
                union::allocate(el)?
            } else {
                None
            },
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "driver" => {
                    out.driver_type = child.attr("type")?;
                    Ok(false)
                }
                "source" => {
                    if out.source.is_none() {
                        out.source = disk::untyped_snapshot_source()?;
                    }
                    read_into(&mut out.source, child, r)
                }
                _ => Ok(false),
            }
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnapshotMemory {
    pub snapshot: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DomainSnapshot {
    pub name: Option<String>,
    pub description: Option<String>,
    pub state: Option<String>,
    pub creation_time: Option<String>,
    pub parent: Option<String>,
    pub memory: Option<SnapshotMemory>,
    /// `None` keeps `<disks>` out of the output; an empty list writes `<disks/>`.
    pub disks: Option<Vec<SnapshotDisk>>,
    pub active: Option<u32>,
    pub domain: Option<Domain>,
    /// Hypervisor-private `<cookie>` content.
    pub cookie: Option<RawXml>,
}

impl ToXml for DomainSnapshot {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            w.opt_text("name", self.name.as_deref())?;
            w.opt_text("description", self.description.as_deref())?;
            w.opt_text("state", self.state.as_deref())?;
            w.opt_text("creationTime", self.creation_time.as_deref())?;
            if let Some(parent) = &self.parent {
                w.element(Tag::new("parent"), |w| w.text_element("name", parent))?;
            }
            if let Some(memory) = &self.memory {
                let mut tag = Tag::new("memory");
                tag.opt("snapshot", memory.snapshot.as_deref())
                    .opt("file", memory.file.as_deref());
                w.empty(tag)?;
            }
            if let Some(disks) = &self.disks {
                w.element(Tag::new("disks"), |w| w.children("disk", disks))?;
            }
            w.display_text("active", self.active)?;
            w.child("domain", self.domain.as_ref())?;
            w.child("cookie", self.cookie.as_ref())
        })
    }
}

impl FromXml for DomainSnapshot {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = DomainSnapshot::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "name" => out.name = Some(r.text(child)?),
                "description" => out.description = Some(r.text(child)?),
                "state" => out.state = Some(r.text(child)?),
                "creationTime" => out.creation_time = Some(r.text(child)?),
                "parent" => {
                    r.each_child(child, |r, grand| {
                        if grand.name() != "name" {
                            return Ok(false);
                        }
                        out.parent = Some(r.text(grand)?);
                        Ok(true)
                    })?;
                }
                "memory" => {
                    out.memory = Some(SnapshotMemory {
                        snapshot: child.attr("snapshot")?,
                        file: child.attr("file")?,
                    });
                    return Ok(false);
                }
                "disks" => {
                    let mut disks = Vec::new();
                    r.each_child(child, |r, grand| {
                        if grand.name() != "disk" {
                            return Ok(false);
                        }
                        disks.extend(r.read::<SnapshotDisk>(grand)?);
                        Ok(true)
                    })?;
                    out.disks = Some(disks);
                }
                "active" => out.active = Some(r.parse_text(child)?),
                "domain" => out.domain = r.read(child)?,
                "cookie" => out.cookie = r.read(child)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl Document for DomainSnapshot {
    const ROOT: &'static str = "domainsnapshot";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::DiskBackend;
    use virtxml_codec::Registry;

    const SNAPSHOT: &str = r#"<domainsnapshot>
  <name>before-upgrade</name>
  <description>Pre 2.0 state</description>
  <state>running</state>
  <creationTime>1700000000</creationTime>
  <parent>
    <name>base</name>
  </parent>
  <memory snapshot="external" file="/var/lib/snap/mem.save"/>
  <disks>
    <disk name="vda" snapshot="external" type="file">
      <driver type="qcow2"/>
      <source file="/var/lib/snap/vda.qcow2"/>
    </disk>
    <disk name="vdb" snapshot="no"/>
  </disks>
  <active>1</active>
  <domain type="kvm">
    <name>guest</name>
  </domain>
  <cookie>
    <cpu mode="custom"/>
  </cookie>
</domainsnapshot>"#;

    #[test]
    fn snapshot_roundtrip() {
        let snap = DomainSnapshot::unmarshal(SNAPSHOT).expect("decode");
        assert_eq!(snap.parent.as_deref(), Some("base"));
        let disks = snap.disks.as_ref().expect("disks");
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[1].source, None);
        assert_eq!(
            snap.domain.as_ref().and_then(|d| d.name.as_deref()),
            Some("guest")
        );
        assert_eq!(snap.marshal().expect("encode"), SNAPSHOT);
    }

    #[test]
    fn untyped_source_is_a_file() {
        let snap = DomainSnapshot::unmarshal(
            r#"<domainsnapshot><disks><disk name="sda" snapshot="external"><source file="/tmp/sda.snap"/></disk></disks></domainsnapshot>"#,
        )
        .expect("decode");
        let disk = &snap.disks.expect("disks")[0];
        match disk.source.as_ref().map(|s| &s.backend) {
            Some(DiskBackend::File { file }) => assert_eq!(file.as_deref(), Some("/tmp/sda.snap")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            disk.source.as_ref().map(|s| s.kind().as_str()),
            Some("file")
        );
    }
}
