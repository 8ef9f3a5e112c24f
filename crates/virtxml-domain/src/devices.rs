//! The `<devices>` list and the small devices that carry no union.

use std::io::Write;

use virtxml_codec::{Base, Element, FromXml, Result, Tag, ToXml, UintFormat, XmlReader, XmlWriter};

use crate::address::DomainAddress;
use crate::chardev::{Channel, Console, Parallel, Serial};
use crate::controller::Controller;
use crate::disk::Disk;
use crate::filesystem::Filesystem;
use crate::graphics::Graphics;
use crate::hostdev::Hostdev;
use crate::interface::Interface;
use crate::rng::Rng;
use crate::smartcard::{Redirdev, Smartcard};
use crate::tpm::Tpm;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Input {
    pub kind: Option<String>,
    pub bus: Option<String>,
    pub alias: Option<String>,
    pub address: Option<DomainAddress>,
}

impl ToXml for Input {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("type", self.kind.as_deref())
            .opt("bus", self.bus.as_deref());
        w.element(tag, |w| {
            w.attr_element("alias", "name", self.alias.as_deref())?;
            w.child("address", self.address.as_ref())
        })
    }
}

impl FromXml for Input {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Input {
            kind: el.attr("type")?,
            bus: el.attr("bus")?,
            ..Input::default()
        };
        read_alias_address(el, r, &mut out.alias, &mut out.address)?;
        Ok(Some(out))
    }
}

/// Shared tail of the simple devices: `<alias>` and `<address>`.
fn read_alias_address<'a>(
    el: &Element<'a>,
    r: &mut XmlReader<'a>,
    alias: &mut Option<String>,
    address: &mut Option<DomainAddress>,
) -> Result<()> {
    r.each_child(el, |r, child| match child.name() {
        "alias" => {
            *alias = child.attr("name")?;
            Ok(false)
        }
        "address" => {
            *address = r.read(child)?;
            Ok(true)
        }
        _ => Ok(false),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoModel {
    pub kind: Option<String>,
    pub vram: Option<u32>,
    pub heads: Option<u32>,
    pub primary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Video {
    pub model: Option<VideoModel>,
    pub alias: Option<String>,
    pub address: Option<DomainAddress>,
}

impl ToXml for Video {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            if let Some(model) = &self.model {
                let mut tag = Tag::new("model");
                tag.opt("type", model.kind.as_deref())
                    .uint("vram", model.vram, UintFormat::Decimal)
                    .uint("heads", model.heads, UintFormat::Decimal)
                    .opt("primary", model.primary.as_deref());
                w.empty(tag)?;
            }
            w.attr_element("alias", "name", self.alias.as_deref())?;
            w.child("address", self.address.as_ref())
        })
    }
}

impl FromXml for Video {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Video::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "model" => {
                    out.model = Some(VideoModel {
                        kind: child.attr("type")?,
                        vram: child.uint("vram", Base::Decimal)?,
                        heads: child.uint("heads", Base::Decimal)?,
                        primary: child.attr("primary")?,
                    })
                }
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

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Watchdog {
    pub model: Option<String>,
    pub action: Option<String>,
    pub alias: Option<String>,
    pub address: Option<DomainAddress>,
}

impl ToXml for Watchdog {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("model", self.model.as_deref())
            .opt("action", self.action.as_deref());
        w.element(tag, |w| {
            w.attr_element("alias", "name", self.alias.as_deref())?;
            w.child("address", self.address.as_ref())
        })
    }
}

impl FromXml for Watchdog {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Watchdog {
            model: el.attr("model")?,
            action: el.attr("action")?,
            ..Watchdog::default()
        };
        read_alias_address(el, r, &mut out.alias, &mut out.address)?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemBalloon {
    pub model: Option<String>,
    pub autodeflate: Option<String>,
    pub stats_period: Option<u32>,
    pub alias: Option<String>,
    pub address: Option<DomainAddress>,
}

impl ToXml for MemBalloon {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("model", self.model.as_deref())
            .opt("autodeflate", self.autodeflate.as_deref());
        w.element(tag, |w| {
            if let Some(period) = self.stats_period {
                w.attr_element("stats", "period", Some(&period.to_string()))?;
            }
            w.attr_element("alias", "name", self.alias.as_deref())?;
            w.child("address", self.address.as_ref())
        })
    }
}

impl FromXml for MemBalloon {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = MemBalloon {
            model: el.attr("model")?,
            autodeflate: el.attr("autodeflate")?,
            ..MemBalloon::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "stats" => out.stats_period = child.uint("period", Base::Decimal)?,
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

/// Device lists in the fixed order they are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Devices {
    pub emulator: Option<String>,
    pub disks: Vec<Disk>,
    pub controllers: Vec<Controller>,
    pub filesystems: Vec<Filesystem>,
    pub interfaces: Vec<Interface>,
    pub smartcards: Vec<Smartcard>,
    pub serials: Vec<Serial>,
    pub parallels: Vec<Parallel>,
    pub consoles: Vec<Console>,
    pub channels: Vec<Channel>,
    pub inputs: Vec<Input>,
    pub tpms: Vec<Tpm>,
    pub graphics: Vec<Graphics>,
    pub videos: Vec<Video>,
    pub hostdevs: Vec<Hostdev>,
    pub redirdevs: Vec<Redirdev>,
    pub watchdog: Option<Watchdog>,
    pub memballoon: Option<MemBalloon>,
    pub rngs: Vec<Rng>,
}

impl ToXml for Devices {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            w.opt_text("emulator", self.emulator.as_deref())?;
            w.children("disk", &self.disks)?;
            w.children("controller", &self.controllers)?;
            w.children("filesystem", &self.filesystems)?;
            w.children("interface", &self.interfaces)?;
            w.children("smartcard", &self.smartcards)?;
            w.children("serial", &self.serials)?;
            w.children("parallel", &self.parallels)?;
            w.children("console", &self.consoles)?;
            w.children("channel", &self.channels)?;
            w.children("input", &self.inputs)?;
            w.children("tpm", &self.tpms)?;
            w.children("graphics", &self.graphics)?;
            w.children("video", &self.videos)?;
            w.children("hostdev", &self.hostdevs)?;
            w.children("redirdev", &self.redirdevs)?;
            w.child("watchdog", self.watchdog.as_ref())?;
            w.child("memballoon", self.memballoon.as_ref())?;
            w.children("rng", &self.rngs)
        })
    }
}

impl FromXml for Devices {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Devices::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "emulator" => out.emulator = Some(r.text(child)?),
                "disk" => out.disks.extend(r.read::<Disk>(child)?),
                "controller" => out.controllers.extend(r.read::<Controller>(child)?),
                "filesystem" => out.filesystems.extend(r.read::<Filesystem>(child)?),
                "interface" => out.interfaces.extend(r.read::<Interface>(child)?),
                "smartcard" => out.smartcards.extend(r.read::<Smartcard>(child)?),
                "serial" => out.serials.extend(r.read::<Serial>(child)?),
                "parallel" => out.parallels.extend(r.read::<Parallel>(child)?),
                "console" => out.consoles.extend(r.read::<Console>(child)?),
                "channel" => out.channels.extend(r.read::<Channel>(child)?),
                "input" => out.inputs.extend(r.read::<Input>(child)?),
                "tpm" => out.tpms.extend(r.read::<Tpm>(child)?),
                "graphics" => out.graphics.extend(r.read::<Graphics>(child)?),
                "video" => out.videos.extend(r.read::<Video>(child)?),
                "hostdev" => out.hostdevs.extend(r.read::<Hostdev>(child)?),
                "redirdev" => out.redirdevs.extend(r.read::<Redirdev>(child)?),
                "watchdog" => out.watchdog = r.read(child)?,
                "memballoon" => out.memballoon = r.read(child)?,
                "rng" => out.rngs.extend(r.read::<Rng>(child)?),
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
    use crate::chardev::ChardevSource;

    fn decode(xml: &str) -> Devices {
        let mut r = XmlReader::new(xml);
        let root = r.root().expect("root");
        Devices::from_xml(&root, &mut r).expect("decode").expect("devices")
    }

    fn encode(devices: &Devices) -> String {
        let mut w = XmlWriter::new(Vec::new());
        devices.to_xml("devices", &mut w).expect("encode");
        String::from_utf8(w.into_inner()).expect("utf8")
    }

    #[test]
    fn bare_console_is_pty() {
        let devices = decode("<devices><console/></devices>");
        assert_eq!(devices.consoles.len(), 1);
        assert!(matches!(devices.consoles[0].source, Some(ChardevSource::Pty(_))));
        assert_eq!(
            encode(&devices),
            "<devices>\n  <console type=\"pty\"/>\n</devices>"
        );
    }

    #[test]
    fn lists_are_regrouped_in_fixed_order() {
        let devices = decode(
            r#"<devices>
  <memballoon model="virtio"><stats period="10"/></memballoon>
  <input type="tablet" bus="usb"/>
  <emulator>/usr/bin/qemu-system-x86_64</emulator>
  <video><model type="qxl" vram="65536" heads="1" primary="yes"/></video>
  <input type="keyboard" bus="ps2"/>
  <watchdog model="i6300esb" action="reset"/>
  <sound model="ich6"/>
</devices>"#,
        );
        assert_eq!(devices.inputs.len(), 2);
        assert_eq!(
            encode(&devices),
            r#"<devices>
  <emulator>/usr/bin/qemu-system-x86_64</emulator>
  <input type="tablet" bus="usb"/>
  <input type="keyboard" bus="ps2"/>
  <video>
    <model type="qxl" vram="65536" heads="1" primary="yes"/>
  </video>
  <watchdog model="i6300esb" action="reset"/>
  <memballoon model="virtio">
    <stats period="10"/>
  </memballoon>
</devices>"#
        );
    }

    #[test]
    fn unknown_graphics_drops_only_itself() {
        let devices = decode(
            r#"<devices><graphics type="hologram"/><graphics type="vnc" port="5900"/><input type="mouse"/></devices>"#,
        );
        assert_eq!(devices.graphics.len(), 1);
        assert_eq!(devices.inputs.len(), 1);
    }
}
