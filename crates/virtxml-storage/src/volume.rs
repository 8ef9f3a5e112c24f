//! `<volume>` documents.

use std::io::Write;

use virtxml_codec::{Document, Element, FromXml, Result, Tag, ToXml, XmlReader, XmlWriter};

use crate::common::{Permissions, Size};
use crate::encryption::Encryption;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StorageVolume {
    pub vol_type: Option<String>,
    pub name: Option<String>,
    pub key: Option<String>,
    pub allocation: Option<Size>,
    pub capacity: Option<Size>,
    pub physical: Option<Size>,
    pub target: Option<VolumeTarget>,
    pub backing_store: Option<VolumeBackingStore>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolumeTarget {
    pub path: Option<String>,
    pub format: Option<String>,
    pub permissions: Option<Permissions>,
    pub timestamps: Option<Timestamps>,
    pub compat: Option<String>,
    pub nocow: bool,
    /// Names of the empty feature flags under `<features>`, e.g. `lazy_refcounts`.
    pub features: Vec<String>,
    pub encryption: Option<Encryption>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamps {
    pub atime: Option<String>,
    pub btime: Option<String>,
    pub ctime: Option<String>,
    pub mtime: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolumeBackingStore {
    pub path: Option<String>,
    pub format: Option<String>,
    pub permissions: Option<Permissions>,
}

impl ToXml for StorageVolume {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("type", self.vol_type.as_deref());
        w.element(tag, |w| {
            w.opt_text("name", self.name.as_deref())?;
            w.opt_text("key", self.key.as_deref())?;
            w.child("allocation", self.allocation.as_ref())?;
            w.child("capacity", self.capacity.as_ref())?;
            w.child("physical", self.physical.as_ref())?;
            w.child("target", self.target.as_ref())?;
            w.child("backingStore", self.backing_store.as_ref())
        })
    }
}

impl FromXml for StorageVolume {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = StorageVolume {
            vol_type: el.attr("type")?,
            ..StorageVolume::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "name" => out.name = Some(r.text(child)?),
                "key" => out.key = Some(r.text(child)?),
                "allocation" => out.allocation = r.read(child)?,
                "capacity" => out.capacity = r.read(child)?,
                "physical" => out.physical = r.read(child)?,
                "target" => out.target = r.read(child)?,
                "backingStore" => out.backing_store = r.read(child)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl Document for StorageVolume {
    const ROOT: &'static str = "volume";
}

impl ToXml for VolumeTarget {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            w.opt_text("path", self.path.as_deref())?;
            w.attr_element("format", "type", self.format.as_deref())?;
            w.child("permissions", self.permissions.as_ref())?;
            w.child("timestamps", self.timestamps.as_ref())?;
            w.opt_text("compat", self.compat.as_deref())?;
            w.flag("nocow", self.nocow)?;
            if !self.features.is_empty() {
                w.element(Tag::new("features"), |w| {
                    for feature in &self.features {
                        w.flag(feature, true)?;
                    }
                    Ok(())
                })?;
            }
            w.child("encryption", self.encryption.as_ref())
        })
    }
}

impl FromXml for VolumeTarget {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = VolumeTarget::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "path" => out.path = Some(r.text(child)?),
                "format" => {
                    out.format = child.attr("type")?;
                    return Ok(false);
                }
                "permissions" => out.permissions = r.read(child)?,
                "timestamps" => out.timestamps = r.read(child)?,
                "compat" => out.compat = Some(r.text(child)?),
                "nocow" => {
                    out.nocow = true;
                    return Ok(false);
                }
                "features" => r.each_child(child, |_, feature| {
                    out.features.push(feature.name().to_string());
                    Ok(false)
                })?,
                "encryption" => out.encryption = r.read(child)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl ToXml for Timestamps {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            w.opt_text("atime", self.atime.as_deref())?;
            w.opt_text("btime", self.btime.as_deref())?;
            w.opt_text("ctime", self.ctime.as_deref())?;
            w.opt_text("mtime", self.mtime.as_deref())
        })
    }
}

impl FromXml for Timestamps {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Timestamps::default();
        r.each_child(el, |r, child| {
            let slot = match child.name() {
                "atime" => &mut out.atime,
                "btime" => &mut out.btime,
                "ctime" => &mut out.ctime,
                "mtime" => &mut out.mtime,
                _ => return Ok(false),
            };
            *slot = Some(r.text(child)?);
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl ToXml for VolumeBackingStore {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            w.opt_text("path", self.path.as_deref())?;
            w.attr_element("format", "type", self.format.as_deref())?;
            w.child("permissions", self.permissions.as_ref())
        })
    }
}

impl FromXml for VolumeBackingStore {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = VolumeBackingStore::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "path" => out.path = Some(r.text(child)?),
                "format" => {
                    out.format = child.attr("type")?;
                    return Ok(false);
                }
                "permissions" => out.permissions = r.read(child)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QCOW2: &str = r#"<volume type="file">
  <name>guest.qcow2</name>
  <key>/var/lib/libvirt/images/guest.qcow2</key>
  <allocation unit="bytes">196608</allocation>
  <capacity unit="bytes">10737418240</capacity>
  <target>
    <path>/var/lib/libvirt/images/guest.qcow2</path>
    <format type="qcow2"/>
    <permissions>
      <mode>0600</mode>
      <owner>107</owner>
      <group>107</group>
      <label>system_u:object_r:svirt_image_t:s0</label>
    </permissions>
    <timestamps>
      <atime>1700000000.123456789</atime>
      <mtime>1700000000.123456789</mtime>
    </timestamps>
    <compat>1.1</compat>
    <nocow/>
    <features>
      <lazy_refcounts/>
    </features>
    <encryption format="luks">
      <secret type="passphrase" uuid="f52a81b2-424e-490c-823d-6bd4235bc572"/>
    </encryption>
  </target>
  <backingStore>
    <path>/var/lib/libvirt/images/base.qcow2</path>
    <format type="qcow2"/>
  </backingStore>
</volume>"#;

    #[test]
    fn qcow2_volume_roundtrip() {
        let vol = StorageVolume::unmarshal(QCOW2).expect("decode");
        let target = vol.target.as_ref().expect("target");
        assert_eq!(target.format.as_deref(), Some("qcow2"));
        assert!(target.nocow);
        assert_eq!(target.features, ["lazy_refcounts"]);
        assert_eq!(
            target.encryption.as_ref().and_then(|e| e.format.as_deref()),
            Some("luks")
        );
        assert_eq!(
            vol.backing_store.as_ref().and_then(|b| b.path.as_deref()),
            Some("/var/lib/libvirt/images/base.qcow2")
        );
        assert_eq!(vol.marshal().expect("encode"), QCOW2);
    }

    #[test]
    fn sibling_order_is_normalized() {
        let shuffled = r#"<volume><capacity unit="G">1</capacity><name>a</name></volume>"#;
        let vol = StorageVolume::unmarshal(shuffled).expect("decode");
        assert_eq!(
            vol.marshal().expect("encode"),
            "<volume>\n  <name>a</name>\n  <capacity unit=\"G\">1</capacity>\n</volume>"
        );
    }
}
