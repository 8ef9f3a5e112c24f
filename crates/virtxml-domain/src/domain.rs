//! The `<domain>` document root.

use std::io::Write;

use tracing::trace;
use virtxml_codec::{
    Base, Document, Element, FromXml, Namespace, RawElement, RawXml, Result, Tag, ToXml,
    UintFormat, XmlReader, XmlWriter,
};
use virtxml_storage::Size;

use crate::devices::Devices;
use crate::launch_security::LaunchSecurity;
use crate::sysinfo::Sysinfo;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Domain {
    /// Hypervisor driver, e.g. `kvm`.
    pub hypervisor: Option<String>,
    pub id: Option<i32>,
    pub namespaces: Vec<Namespace>,
    pub name: Option<String>,
    pub uuid: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<RawXml>,
    pub memory: Option<Size>,
    pub current_memory: Option<Size>,
    pub vcpu: Option<Vcpu>,
    pub sysinfo: Vec<Sysinfo>,
    pub os: Option<Os>,
    pub features: Option<Vec<Feature>>,
    pub cpu: Option<Cpu>,
    pub clock: Option<Clock>,
    pub on_poweroff: Option<String>,
    pub on_reboot: Option<String>,
    pub on_crash: Option<String>,
    pub devices: Option<Devices>,
    pub launch_security: Option<LaunchSecurity>,
    /// Vendor elements such as `<qemu:commandline>`, replayed verbatim.
    pub extensions: Vec<RawElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vcpu {
    pub placement: Option<String>,
    pub current: Option<u32>,
    pub count: u32,
}

impl ToXml for Vcpu {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("placement", self.placement.as_deref())
            .uint("current", self.current, UintFormat::Decimal);
        w.element(tag, |w| w.text(&self.count.to_string()))
    }
}

impl FromXml for Vcpu {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        Ok(Some(Vcpu {
            placement: el.attr("placement")?,
            current: el.uint("current", Base::Decimal)?,
            count: r.uint_text(el, Base::Decimal)?,
        }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OsType {
    pub arch: Option<String>,
    pub machine: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Loader {
    pub readonly: Option<String>,
    pub secure: Option<String>,
    pub kind: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Os {
    pub firmware: Option<String>,
    pub os_type: Option<OsType>,
    pub loader: Option<Loader>,
    pub nvram: Option<String>,
    pub kernel: Option<String>,
    pub initrd: Option<String>,
    pub cmdline: Option<String>,
    pub boot_devices: Vec<String>,
    pub bootmenu: Option<String>,
    pub smbios_mode: Option<String>,
}

impl ToXml for Os {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("firmware", self.firmware.as_deref());
        w.element(tag, |w| {
            if let Some(os_type) = &self.os_type {
                let mut tag = Tag::new("type");
                tag.opt("arch", os_type.arch.as_deref())
                    .opt("machine", os_type.machine.as_deref());
                w.element(tag, |w| w.text(&os_type.value))?;
            }
            if let Some(loader) = &self.loader {
                let mut tag = Tag::new("loader");
                tag.opt("readonly", loader.readonly.as_deref())
                    .opt("secure", loader.secure.as_deref())
                    .opt("type", loader.kind.as_deref());
                w.element(tag, |w| match &loader.path {
                    Some(path) => w.text(path),
                    None => Ok(()),
                })?;
            }
            w.opt_text("nvram", self.nvram.as_deref())?;
            w.opt_text("kernel", self.kernel.as_deref())?;
            w.opt_text("initrd", self.initrd.as_deref())?;
            w.opt_text("cmdline", self.cmdline.as_deref())?;
            for dev in &self.boot_devices {
                w.attr_element("boot", "dev", Some(dev))?;
            }
            w.attr_element("bootmenu", "enable", self.bootmenu.as_deref())?;
            w.attr_element("smbios", "mode", self.smbios_mode.as_deref())
        })
    }
}

impl FromXml for Os {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Os {
            firmware: el.attr("firmware")?,
            ..Os::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "type" => {
                    out.os_type = Some(OsType {
                        arch: child.attr("arch")?,
                        machine: child.attr("machine")?,
                        value: r.text(child)?,
                    })
                }
                "loader" => {
                    let mut loader = Loader {
                        readonly: child.attr("readonly")?,
                        secure: child.attr("secure")?,
                        kind: child.attr("type")?,
                        path: None,
                    };
                    let path = r.text(child)?;
                    loader.path = (!path.is_empty()).then_some(path);
                    out.loader = Some(loader);
                }
                "nvram" => out.nvram = Some(r.text(child)?),
                "kernel" => out.kernel = Some(r.text(child)?),
                "initrd" => out.initrd = Some(r.text(child)?),
                "cmdline" => out.cmdline = Some(r.text(child)?),
                "boot" => {
                    out.boot_devices.extend(child.attr("dev")?);
                    return Ok(false);
                }
                "bootmenu" => {
                    out.bootmenu = child.attr("enable")?;
                    return Ok(false);
                }
                "smbios" => {
                    out.smbios_mode = child.attr("mode")?;
                    return Ok(false);
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

/// One child of `<features>`: a bare switch like `<acpi/>`, or anything
/// with settings, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Feature {
    Flag(String),
    Raw(RawElement),
}

fn write_features<W: Write>(features: &[Feature], w: &mut XmlWriter<W>) -> Result<()> {
    w.element(Tag::new("features"), |w| {
        for feature in features {
            match feature {
                Feature::Flag(name) => w.flag(name, true)?,
                Feature::Raw(raw) => raw.to_xml(&raw.name, w)?,
            }
        }
        Ok(())
    })
}

fn read_features<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Vec<Feature>> {
    let mut out = Vec::new();
    r.each_child(el, |r, child| {
        if child.is_empty() && child.attributes()?.is_empty() {
            out.push(Feature::Flag(child.name().to_string()));
            return Ok(false);
        }
        out.extend(r.read::<RawElement>(child)?.map(Feature::Raw));
        Ok(true)
    })?;
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuModel {
    pub fallback: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuTopology {
    pub sockets: Option<u32>,
    pub dies: Option<u32>,
    pub cores: Option<u32>,
    pub threads: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuFeature {
    pub policy: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cpu {
    pub mode: Option<String>,
    pub match_: Option<String>,
    pub check: Option<String>,
    pub model: Option<CpuModel>,
    pub vendor: Option<String>,
    pub topology: Option<CpuTopology>,
    pub features: Vec<CpuFeature>,
}

impl ToXml for CpuModel {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("fallback", self.fallback.as_deref());
        w.element(tag, |w| w.text(&self.name))
    }
}

impl FromXml for CpuModel {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        Ok(Some(CpuModel {
            fallback: el.attr("fallback")?,
            name: r.text(el)?,
        }))
    }
}

impl ToXml for CpuTopology {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.uint("sockets", self.sockets, UintFormat::Decimal)
            .uint("dies", self.dies, UintFormat::Decimal)
            .uint("cores", self.cores, UintFormat::Decimal)
            .uint("threads", self.threads, UintFormat::Decimal);
        w.empty(tag)
    }
}

impl FromXml for CpuTopology {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let topology = CpuTopology {
            sockets: el.uint("sockets", Base::Decimal)?,
            dies: el.uint("dies", Base::Decimal)?,
            cores: el.uint("cores", Base::Decimal)?,
            threads: el.uint("threads", Base::Decimal)?,
        };
        r.skip(el)?;
        Ok(Some(topology))
    }
}

impl ToXml for CpuFeature {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("policy", self.policy.as_deref())
            .opt("name", self.name.as_deref());
        w.empty(tag)
    }
}

impl FromXml for CpuFeature {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let feature = CpuFeature {
            policy: el.attr("policy")?,
            name: el.attr("name")?,
        };
        r.skip(el)?;
        Ok(Some(feature))
    }
}

impl ToXml for Cpu {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("mode", self.mode.as_deref())
            .opt("match", self.match_.as_deref())
            .opt("check", self.check.as_deref());
        w.element(tag, |w| {
            w.child("model", self.model.as_ref())?;
            w.opt_text("vendor", self.vendor.as_deref())?;
            w.child("topology", self.topology.as_ref())?;
            w.children("feature", &self.features)
        })
    }
}

impl FromXml for Cpu {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Cpu {
            mode: el.attr("mode")?,
            match_: el.attr("match")?,
            check: el.attr("check")?,
            ..Cpu::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "model" => out.model = r.read(child)?,
                "vendor" => out.vendor = Some(r.text(child)?),
                "topology" => out.topology = r.read(child)?,
                "feature" => out.features.extend(r.read::<CpuFeature>(child)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timer {
    pub name: Option<String>,
    pub tickpolicy: Option<String>,
    pub present: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Clock {
    pub offset: Option<String>,
    pub timers: Vec<Timer>,
}

impl ToXml for Clock {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("offset", self.offset.as_deref());
        w.element(tag, |w| {
            for timer in &self.timers {
                let mut tag = Tag::new("timer");
                tag.opt("name", timer.name.as_deref())
                    .opt("tickpolicy", timer.tickpolicy.as_deref())
                    .opt("present", timer.present.as_deref());
                w.empty(tag)?;
            }
            Ok(())
        })
    }
}

impl FromXml for Clock {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Clock {
            offset: el.attr("offset")?,
            ..Clock::default()
        };
        r.each_child(el, |_, child| {
            if child.name() == "timer" {
                out.timers.push(Timer {
                    name: child.attr("name")?,
                    tickpolicy: child.attr("tickpolicy")?,
                    present: child.attr("present")?,
                });
            }
            Ok(false)
        })?;
        Ok(Some(out))
    }
}

impl ToXml for Domain {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("type", self.hypervisor.as_deref())
            .display("id", self.id);
        Namespace::apply(&self.namespaces, &mut tag);
        w.element(tag, |w| {
            w.opt_text("name", self.name.as_deref())?;
            w.opt_text("uuid", self.uuid.as_deref())?;
            w.opt_text("title", self.title.as_deref())?;
            w.opt_text("description", self.description.as_deref())?;
            w.child("metadata", self.metadata.as_ref())?;
            w.child("memory", self.memory.as_ref())?;
            w.child("currentMemory", self.current_memory.as_ref())?;
            w.child("vcpu", self.vcpu.as_ref())?;
            w.children("sysinfo", &self.sysinfo)?;
            w.child("os", self.os.as_ref())?;
            if let Some(features) = &self.features {
                write_features(features, w)?;
            }
            w.child("cpu", self.cpu.as_ref())?;
            w.child("clock", self.clock.as_ref())?;
            w.opt_text("on_poweroff", self.on_poweroff.as_deref())?;
            w.opt_text("on_reboot", self.on_reboot.as_deref())?;
            w.opt_text("on_crash", self.on_crash.as_deref())?;
            w.child("devices", self.devices.as_ref())?;
            w.child("launchSecurity", self.launch_security.as_ref())?;
            for ext in &self.extensions {
                ext.to_xml(&ext.name, w)?;
            }
            Ok(())
        })
    }
}

impl FromXml for Domain {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Domain {
            hypervisor: el.attr("type")?,
            id: el.parse("id")?,
            namespaces: Namespace::collect(el)?,
            ..Domain::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "name" => out.name = Some(r.text(child)?),
                "uuid" => out.uuid = Some(r.text(child)?),
                "title" => out.title = Some(r.text(child)?),
                "description" => out.description = Some(r.text(child)?),
                "metadata" => out.metadata = r.read(child)?,
                "memory" => out.memory = r.read(child)?,
                "currentMemory" => out.current_memory = r.read(child)?,
                "vcpu" => out.vcpu = r.read(child)?,
                "sysinfo" => out.sysinfo.extend(r.read::<Sysinfo>(child)?),
                "os" => out.os = r.read(child)?,
                "features" => out.features = Some(read_features(child, r)?),
                "cpu" => out.cpu = r.read(child)?,
                "clock" => out.clock = r.read(child)?,
                "on_poweroff" => out.on_poweroff = Some(r.text(child)?),
                "on_reboot" => out.on_reboot = Some(r.text(child)?),
                "on_crash" => out.on_crash = Some(r.text(child)?),
                "devices" => out.devices = r.read(child)?,
                "launchSecurity" => out.launch_security = r.read(child)?,
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

impl Document for Domain {
    const ROOT: &'static str = "domain";
}
