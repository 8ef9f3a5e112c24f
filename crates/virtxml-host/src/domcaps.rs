//! `<domainCapabilities>`: what one emulator/machine/arch combination can
//! run. Most of the document is a catalog of `<enum name=...>` value lists
//! gated by a `supported` attribute.

use std::io::Write;

use tracing::debug;
use virtxml_codec::{
    registry, Base, Document, Element, FromXml, Result, Tag, ToXml, UintFormat, Union, XmlReader,
    XmlWriter,
};

registry! {
    pub enum CpuModeKind for "domain capabilities cpu mode" {
        carrier: Attribute("name"),
        absent: Unset,
        unknown: Skip,
        HostPassthrough = "host-passthrough",
        Maximum = "maximum",
        HostModel = "host-model",
        Custom = "custom",
    }
}

/// `<enum name="diskDevice"><value>disk</value>...</enum>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CapsEnum {
    pub name: String,
    pub values: Vec<String>,
}

impl ToXml for CapsEnum {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.attr("name", &self.name);
        w.element(tag, |w| w.children("value", &self.values))
    }
}

impl FromXml for CapsEnum {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = CapsEnum {
            name: el.attr("name")?.unwrap_or_default(),
            values: Vec::new(),
        };
        r.each_child(el, |r, child| {
            if child.name() != "value" {
                return Ok(false);
            }
            out.values.push(r.text(child)?);
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

/// A `supported="yes|no"` element carrying enum lists, e.g. `<disk>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumCaps {
    pub supported: Option<String>,
    pub enums: Vec<CapsEnum>,
}

impl EnumCaps {
    pub fn lookup(&self, name: &str) -> Option<&[String]> {
        self.enums
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.values.as_slice())
    }
}

impl ToXml for EnumCaps {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("supported", self.supported.as_deref());
        w.element(tag, |w| w.children("enum", &self.enums))
    }
}

impl FromXml for EnumCaps {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = EnumCaps {
            supported: el.attr("supported")?,
            enums: Vec::new(),
        };
        r.each_child(el, |r, child| {
            if child.name() != "enum" {
                return Ok(false);
            }
            out.enums.extend(r.read::<CapsEnum>(child)?);
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoaderCaps {
    pub supported: Option<String>,
    pub values: Vec<String>,
    pub enums: Vec<CapsEnum>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OsCaps {
    pub supported: Option<String>,
    pub enums: Vec<CapsEnum>,
    pub loader: Option<LoaderCaps>,
}

impl ToXml for OsCaps {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("supported", self.supported.as_deref());
        w.element(tag, |w| {
            w.children("enum", &self.enums)?;
            if let Some(loader) = &self.loader {
                let mut tag = Tag::new("loader");
                tag.opt("supported", loader.supported.as_deref());
                w.element(tag, |w| {
                    w.children("value", &loader.values)?;
                    w.children("enum", &loader.enums)
                })?;
            }
            Ok(())
        })
    }
}

impl FromXml for OsCaps {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = OsCaps {
            supported: el.attr("supported")?,
            ..OsCaps::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "enum" => out.enums.extend(r.read::<CapsEnum>(child)?),
                "loader" => {
                    let mut loader = LoaderCaps {
                        supported: child.attr("supported")?,
                        ..LoaderCaps::default()
                    };
                    r.each_child(child, |r, grand| {
                        match grand.name() {
                            "value" => loader.values.push(r.text(grand)?),
                            "enum" => loader.enums.extend(r.read::<CapsEnum>(grand)?),
                            _ => return Ok(false),
                        }
                        Ok(true)
                    })?;
                    out.loader = Some(loader);
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostModelCaps {
    pub supported: Option<String>,
    pub model: Option<virtxml_domain::CpuModel>,
    pub vendor: Option<String>,
    pub features: Vec<virtxml_domain::CpuFeature>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CustomModel {
    pub name: String,
    pub usable: Option<String>,
    pub vendor: Option<String>,
    pub deprecated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CustomCaps {
    pub supported: Option<String>,
    pub models: Vec<CustomModel>,
}

/// One `<mode name=...>` under `<cpu>`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CpuModeCaps {
    HostPassthrough(EnumCaps),
    Maximum(EnumCaps),
    HostModel(HostModelCaps),
    Custom(CustomCaps),
}

impl Union for CpuModeCaps {
    type Kind = CpuModeKind;

    fn kind(&self) -> CpuModeKind {
        match self {
            CpuModeCaps::HostPassthrough(_) => CpuModeKind::HostPassthrough,
            CpuModeCaps::Maximum(_) => CpuModeKind::Maximum,
            CpuModeCaps::HostModel(_) => CpuModeKind::HostModel,
            CpuModeCaps::Custom(_) => CpuModeKind::Custom,
        }
    }

    fn allocate(kind: CpuModeKind) -> Self {
        match kind {
            CpuModeKind::HostPassthrough => CpuModeCaps::HostPassthrough(EnumCaps::default()),
            CpuModeKind::Maximum => CpuModeCaps::Maximum(EnumCaps::default()),
            CpuModeKind::HostModel => CpuModeCaps::HostModel(HostModelCaps::default()),
            CpuModeKind::Custom => CpuModeCaps::Custom(CustomCaps::default()),
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        let supported = match self {
            CpuModeCaps::HostPassthrough(caps) | CpuModeCaps::Maximum(caps) => &caps.supported,
            CpuModeCaps::HostModel(caps) => &caps.supported,
            CpuModeCaps::Custom(caps) => &caps.supported,
        };
        tag.opt("supported", supported.as_deref());
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            CpuModeCaps::HostPassthrough(caps) | CpuModeCaps::Maximum(caps) => {
                w.children("enum", &caps.enums)
            }
            CpuModeCaps::HostModel(caps) => {
                w.child("model", caps.model.as_ref())?;
                w.opt_text("vendor", caps.vendor.as_deref())?;
                w.children("feature", &caps.features)
            }
            CpuModeCaps::Custom(caps) => {
                for model in &caps.models {
                    let mut tag = Tag::new("model");
                    tag.opt("usable", model.usable.as_deref())
                        .opt("deprecated", model.deprecated.as_deref())
                        .opt("vendor", model.vendor.as_deref());
                    w.element(tag, |w| w.text(&model.name))?;
                }
                Ok(())
            }
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        let supported = el.attr("supported")?;
        match self {
            CpuModeCaps::HostPassthrough(caps) | CpuModeCaps::Maximum(caps) => {
                caps.supported = supported
            }
            CpuModeCaps::HostModel(caps) => caps.supported = supported,
            CpuModeCaps::Custom(caps) => caps.supported = supported,
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match (self, child.name()) {
            (CpuModeCaps::HostPassthrough(caps) | CpuModeCaps::Maximum(caps), "enum") => {
                caps.enums.extend(r.read::<CapsEnum>(child)?)
            }
            (CpuModeCaps::HostModel(caps), "model") => caps.model = r.read(child)?,
            (CpuModeCaps::HostModel(caps), "vendor") => caps.vendor = Some(r.text(child)?),
            (CpuModeCaps::HostModel(caps), "feature") => caps.features.extend(r.read::<virtxml_domain::CpuFeature>(child)?),
            (CpuModeCaps::Custom(caps), "model") => {
                let usable = child.attr("usable")?;
                let deprecated = child.attr("deprecated")?;
                let vendor = child.attr("vendor")?;
                caps.models.push(CustomModel {
                    name: r.text(child)?,
                    usable,
                    vendor,
                    deprecated,
                });
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

virtxml_codec::union_xml!(CpuModeCaps);

/// Device catalogs in the order they are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceCaps {
    pub disk: Option<EnumCaps>,
    pub graphics: Option<EnumCaps>,
    pub video: Option<EnumCaps>,
    pub hostdev: Option<EnumCaps>,
    pub rng: Option<EnumCaps>,
    pub filesystem: Option<EnumCaps>,
    pub tpm: Option<EnumCaps>,
    pub redirdev: Option<EnumCaps>,
    pub channel: Option<EnumCaps>,
    pub crypto: Option<EnumCaps>,
}

impl DeviceCaps {
    fn slots(&self) -> [(&'static str, Option<&EnumCaps>); 10] {
        [
            ("disk", self.disk.as_ref()),
            ("graphics", self.graphics.as_ref()),
            ("video", self.video.as_ref()),
            ("hostdev", self.hostdev.as_ref()),
            ("rng", self.rng.as_ref()),
            ("filesystem", self.filesystem.as_ref()),
            ("tpm", self.tpm.as_ref()),
            ("redirdev", self.redirdev.as_ref()),
            ("channel", self.channel.as_ref()),
            ("crypto", self.crypto.as_ref()),
        ]
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut Option<EnumCaps>> {
        Some(match name {
            "disk" => &mut self.disk,
            "graphics" => &mut self.graphics,
            "video" => &mut self.video,
            "hostdev" => &mut self.hostdev,
            "rng" => &mut self.rng,
            "filesystem" => &mut self.filesystem,
            "tpm" => &mut self.tpm,
            "redirdev" => &mut self.redirdev,
            "channel" => &mut self.channel,
            "crypto" => &mut self.crypto,
            _ => return None,
        })
    }
}

impl ToXml for DeviceCaps {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            for (name, caps) in self.slots() {
                w.child(name, caps)?;
            }
            Ok(())
        })
    }
}

impl FromXml for DeviceCaps {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = DeviceCaps::default();
        r.each_child(el, |r, child| {
            let Some(slot) = out.slot_mut(child.name()) else {
                debug!(device = child.name(), "skipping unknown device catalog");
                return Ok(false);
            };
            *slot = r.read(child)?;
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

/// AMD SEV parameters reported under `<features>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SevCaps {
    pub supported: Option<String>,
    pub cbitpos: Option<u32>,
    pub reduced_phys_bits: Option<u32>,
    pub max_guests: Option<u32>,
    pub max_es_guests: Option<u32>,
}

impl ToXml for SevCaps {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("supported", self.supported.as_deref());
        w.element(tag, |w| {
            w.uint_text("cbitpos", self.cbitpos, UintFormat::Decimal)?;
            w.uint_text("reducedPhysBits", self.reduced_phys_bits, UintFormat::Decimal)?;
            w.uint_text("maxGuests", self.max_guests, UintFormat::Decimal)?;
            w.uint_text("maxESGuests", self.max_es_guests, UintFormat::Decimal)
        })
    }
}

impl FromXml for SevCaps {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = SevCaps {
            supported: el.attr("supported")?,
            ..SevCaps::default()
        };
        r.each_child(el, |r, child| {
            let slot = match child.name() {
                "cbitpos" => &mut out.cbitpos,
                "reducedPhysBits" => &mut out.reduced_phys_bits,
                "maxGuests" => &mut out.max_guests,
                "maxESGuests" => &mut out.max_es_guests,
                _ => return Ok(false),
            };
            *slot = Some(r.uint_text(child, Base::Decimal)?);
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

/// `<features>`: `sev` is typed, everything else is a named support flag
/// with optional enums (`gic`, `vmcoreinfo`, `genid`, `backup`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureCaps {
    pub flags: Vec<(String, EnumCaps)>,
    pub sev: Option<SevCaps>,
}

impl FeatureCaps {
    pub fn supports(&self, name: &str) -> bool {
        if name == "sev" {
            return self
                .sev
                .as_ref()
                .is_some_and(|sev| sev.supported.as_deref() == Some("yes"));
        }
        self.flags
            .iter()
            .any(|(flag, caps)| flag == name && caps.supported.as_deref() == Some("yes"))
    }
}

impl ToXml for FeatureCaps {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            for (flag, caps) in &self.flags {
                caps.to_xml(flag, w)?;
            }
            w.child("sev", self.sev.as_ref())
        })
    }
}

impl FromXml for FeatureCaps {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = FeatureCaps::default();
        r.each_child(el, |r, child| {
            if child.name() == "sev" {
                out.sev = r.read(child)?;
            } else if let Some(caps) = r.read::<EnumCaps>(child)? {
                out.flags.push((child.name().to_owned(), caps));
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DomainCaps {
    pub path: Option<String>,
    pub domain: Option<String>,
    pub machine: Option<String>,
    pub arch: Option<String>,
    pub vcpu_max: Option<u32>,
    pub iothreads: Option<String>,
    pub os: Option<OsCaps>,
    /// `None` when the document has no `<cpu>`; modes keep document order.
    pub cpu: Option<Vec<CpuModeCaps>>,
    pub memory_backing: Option<EnumCaps>,
    pub devices: Option<DeviceCaps>,
    pub features: Option<FeatureCaps>,
}

impl DomainCaps {
    pub fn cpu_mode(&self, kind: CpuModeKind) -> Option<&CpuModeCaps> {
        self.cpu.as_deref()?.iter().find(|mode| mode.kind() == kind)
    }
}

impl ToXml for DomainCaps {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            w.opt_text("path", self.path.as_deref())?;
            w.opt_text("domain", self.domain.as_deref())?;
            w.opt_text("machine", self.machine.as_deref())?;
            w.opt_text("arch", self.arch.as_deref())?;
            if let Some(max) = self.vcpu_max {
                let mut tag = Tag::new("vcpu");
                tag.uint("max", Some(max), UintFormat::Decimal);
                w.empty(tag)?;
            }
            w.attr_element("iothreads", "supported", self.iothreads.as_deref())?;
            w.child("os", self.os.as_ref())?;
            if let Some(modes) = &self.cpu {
                w.element(Tag::new("cpu"), |w| w.children("mode", modes))?;
            }
            w.child("memoryBacking", self.memory_backing.as_ref())?;
            w.child("devices", self.devices.as_ref())?;
            w.child("features", self.features.as_ref())
        })
    }
}

impl FromXml for DomainCaps {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = DomainCaps::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "path" => out.path = Some(r.text(child)?),
                "domain" => out.domain = Some(r.text(child)?),
                "machine" => out.machine = Some(r.text(child)?),
                "arch" => out.arch = Some(r.text(child)?),
                "vcpu" => {
                    out.vcpu_max = child.uint("max", Base::Decimal)?;
                    return Ok(false);
                }
                "iothreads" => {
                    out.iothreads = child.attr("supported")?;
                    return Ok(false);
                }
                "os" => out.os = r.read(child)?,
                "cpu" => {
                    let modes = out.cpu.get_or_insert_with(Vec::new);
                    r.each_child(child, |r, mode| {
                        if mode.name() != "mode" {
                            return Ok(false);
                        }
                        modes.extend(r.read::<CpuModeCaps>(mode)?);
                        Ok(true)
                    })?;
                }
                "memoryBacking" => out.memory_backing = r.read(child)?,
                "devices" => out.devices = r.read(child)?,
                "features" => out.features = r.read(child)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl Document for DomainCaps {
    const ROOT: &'static str = "domainCapabilities";
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q35: &str = r#"<domainCapabilities>
  <path>/usr/bin/qemu-system-x86_64</path>
  <domain>kvm</domain>
  <machine>pc-q35-8.0</machine>
  <arch>x86_64</arch>
  <vcpu max="288"/>
  <iothreads supported="yes"/>
  <os supported="yes">
    <enum name="firmware">
      <value>efi</value>
    </enum>
    <loader supported="yes">
      <value>/usr/share/OVMF/OVMF_CODE.fd</value>
      <enum name="type">
        <value>rom</value>
        <value>pflash</value>
      </enum>
    </loader>
  </os>
  <cpu>
    <mode name="host-passthrough" supported="yes">
      <enum name="hostPassthroughMigratable">
        <value>on</value>
        <value>off</value>
      </enum>
    </mode>
    <mode name="host-model" supported="yes">
      <model fallback="forbid">Skylake-Client-IBRS</model>
      <vendor>Intel</vendor>
      <feature policy="require" name="ss"/>
    </mode>
    <mode name="custom" supported="yes">
      <model usable="yes" vendor="Intel">Skylake-Client</model>
      <model usable="no" deprecated="yes" vendor="AMD">Opteron_G1</model>
    </mode>
  </cpu>
  <devices>
    <disk supported="yes">
      <enum name="diskDevice">
        <value>disk</value>
        <value>cdrom</value>
      </enum>
    </disk>
    <tpm supported="no"/>
  </devices>
  <features>
    <gic supported="no"/>
    <vmcoreinfo supported="yes"/>
    <sev supported="yes">
      <cbitpos>47</cbitpos>
      <reducedPhysBits>1</reducedPhysBits>
      <maxGuests>15</maxGuests>
      <maxESGuests>0</maxESGuests>
    </sev>
  </features>
</domainCapabilities>"#;

    #[test]
    fn q35_roundtrip() {
        let caps = DomainCaps::unmarshal(Q35).expect("decode");
        assert_eq!(caps.vcpu_max, Some(288));
        assert_eq!(caps.cpu.as_ref().map(Vec::len), Some(3));
        match caps.cpu_mode(CpuModeKind::HostModel) {
            Some(CpuModeCaps::HostModel(host)) => {
                assert_eq!(host.model.as_ref().map(|m| m.name.as_str()), Some("Skylake-Client-IBRS"));
            }
            other => panic!("unexpected {other:?}"),
        }
        let devices = caps.devices.as_ref().expect("devices");
        assert_eq!(
            devices.disk.as_ref().and_then(|d| d.lookup("diskDevice")),
            Some(&["disk".to_string(), "cdrom".to_string()][..])
        );
        let features = caps.features.as_ref().expect("features");
        assert!(features.supports("sev"));
        assert!(features.supports("vmcoreinfo"));
        assert!(!features.supports("gic"));
        assert_eq!(features.sev.as_ref().and_then(|s| s.cbitpos), Some(47));
        assert_eq!(caps.marshal().expect("encode"), Q35);
    }

    #[test]
    fn unknown_cpu_mode_is_skipped() {
        let caps = DomainCaps::unmarshal(
            r#"<domainCapabilities><cpu><mode name="future" supported="yes"><x/></mode><mode name="maximum" supported="no"/></cpu></domainCapabilities>"#,
        )
        .expect("decode");
        assert_eq!(
            caps.cpu,
            Some(vec![CpuModeCaps::Maximum(EnumCaps {
                supported: Some("no".into()),
                enums: Vec::new(),
            })])
        );
    }

    #[test]
    fn malformed_sev_field_fails() {
        let err = DomainCaps::unmarshal(
            "<domainCapabilities><features><sev supported=\"yes\"><cbitpos>high</cbitpos></sev></features></domainCapabilities>",
        )
        .expect_err("cbitpos must be numeric");
        assert!(err.to_string().contains("cbitpos"), "{err}");
    }
}
