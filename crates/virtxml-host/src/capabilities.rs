//! `<capabilities>`: what the hypervisor connection offers.

use std::io::Write;

use tracing::trace;
use virtxml_codec::{
    Base, Document, Element, FromXml, Result, Tag, ToXml, UintFormat, XmlReader, XmlWriter,
};
use virtxml_domain::CpuTopology;
use virtxml_storage::Size;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageSize {
    pub unit: Option<String>,
    pub size: Option<u64>,
}

impl PageSize {
    fn tag(&self, name: &str) -> Tag {
        let mut tag = Tag::new(name);
        tag.opt("unit", self.unit.as_deref())
            .uint("size", self.size, UintFormat::Decimal);
        tag
    }

    fn read(el: &Element<'_>) -> Result<Self> {
        Ok(PageSize {
            unit: el.attr("unit")?,
            size: el.uint("size", Base::Decimal)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostCpu {
    pub arch: Option<String>,
    pub model: Option<String>,
    pub vendor: Option<String>,
    pub microcode: Option<String>,
    pub topology: Option<CpuTopology>,
    /// `<feature name=...>` flags in document order.
    pub features: Vec<String>,
    pub pages: Vec<PageSize>,
}

impl ToXml for HostCpu {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            w.opt_text("arch", self.arch.as_deref())?;
            w.opt_text("model", self.model.as_deref())?;
            w.opt_text("vendor", self.vendor.as_deref())?;
            w.attr_element("microcode", "version", self.microcode.as_deref())?;
            w.child("topology", self.topology.as_ref())?;
            for feature in &self.features {
                w.attr_element("feature", "name", Some(feature))?;
            }
            for page in &self.pages {
                w.empty(page.tag("pages"))?;
            }
            Ok(())
        })
    }
}

impl FromXml for HostCpu {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = HostCpu::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "arch" => out.arch = Some(r.text(child)?),
                "model" => out.model = Some(r.text(child)?),
                "vendor" => out.vendor = Some(r.text(child)?),
                "topology" => out.topology = r.read(child)?,
                "microcode" => out.microcode = child.attr("version")?,
                "feature" => out.features.extend(child.attr("name")?),
                "pages" => out.pages.push(PageSize::read(child)?),
                _ => {}
            }
            Ok(matches!(child.name(), "arch" | "model" | "vendor" | "topology"))
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellCpu {
    pub id: u32,
    pub socket_id: Option<u32>,
    pub die_id: Option<u32>,
    pub core_id: Option<u32>,
    pub siblings: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellDistance {
    pub id: u32,
    pub value: u32,
}

/// One NUMA cell. The `num` counters on `<cells>` and `<cpus>` are derived
/// from the vectors on encode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumaCell {
    pub id: u32,
    pub memory: Option<Size>,
    pub pages: Vec<(PageSize, u64)>,
    pub distances: Vec<CellDistance>,
    pub cpus: Vec<CellCpu>,
}

impl ToXml for NumaCell {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.uint("id", Some(self.id), UintFormat::Decimal);
        w.element(tag, |w| {
            w.child("memory", self.memory.as_ref())?;
            for (page, count) in &self.pages {
                w.element(page.tag("pages"), |w| w.text(&count.to_string()))?;
            }
            if !self.distances.is_empty() {
                w.element(Tag::new("distances"), |w| {
                    for sibling in &self.distances {
                        let mut tag = Tag::new("sibling");
                        tag.uint("id", Some(sibling.id), UintFormat::Decimal)
                            .uint("value", Some(sibling.value), UintFormat::Decimal);
                        w.empty(tag)?;
                    }
                    Ok(())
                })?;
            }
            if !self.cpus.is_empty() {
                let mut tag = Tag::new("cpus");
                tag.uint("num", Some(self.cpus.len() as u64), UintFormat::Decimal);
                w.element(tag, |w| {
                    for cpu in &self.cpus {
                        let mut tag = Tag::new("cpu");
                        tag.uint("id", Some(cpu.id), UintFormat::Decimal)
                            .uint("socket_id", cpu.socket_id, UintFormat::Decimal)
                            .uint("die_id", cpu.die_id, UintFormat::Decimal)
                            .uint("core_id", cpu.core_id, UintFormat::Decimal)
                            .opt("siblings", cpu.siblings.as_deref());
                        w.empty(tag)?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
    }
}

impl FromXml for NumaCell {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = NumaCell {
            id: el.uint("id", Base::Decimal)?.unwrap_or_default(),
            ..NumaCell::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "memory" => out.memory = r.read(child)?,
                "pages" => {
                    let page = PageSize::read(child)?;
                    out.pages.push((page, r.uint_text(child, Base::Decimal)?));
                }
                "distances" => r.each_child(child, |_, sibling| {
                    if sibling.name() == "sibling" {
                        out.distances.push(CellDistance {
                            id: sibling.uint("id", Base::Decimal)?.unwrap_or_default(),
                            value: sibling.uint("value", Base::Decimal)?.unwrap_or_default(),
                        });
                    }
                    Ok(false)
                })?,
                "cpus" => r.each_child(child, |_, cpu| {
                    if cpu.name() == "cpu" {
                        out.cpus.push(CellCpu {
                            id: cpu.uint("id", Base::Decimal)?.unwrap_or_default(),
                            socket_id: cpu.uint("socket_id", Base::Decimal)?,
                            die_id: cpu.uint("die_id", Base::Decimal)?,
                            core_id: cpu.uint("core_id", Base::Decimal)?,
                            siblings: cpu.attr("siblings")?,
                        });
                    }
                    Ok(false)
                })?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheBank {
    pub id: u32,
    pub level: u32,
    pub kind: Option<String>,
    pub size: Option<u64>,
    pub unit: Option<String>,
    pub cpus: Option<String>,
}

impl ToXml for CacheBank {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.uint("id", Some(self.id), UintFormat::Decimal)
            .uint("level", Some(self.level), UintFormat::Decimal)
            .opt("type", self.kind.as_deref())
            .uint("size", self.size, UintFormat::Decimal)
            .opt("unit", self.unit.as_deref())
            .opt("cpus", self.cpus.as_deref());
        w.empty(tag)
    }
}

impl FromXml for CacheBank {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let bank = CacheBank {
            id: el.uint("id", Base::Decimal)?.unwrap_or_default(),
            level: el.uint("level", Base::Decimal)?.unwrap_or_default(),
            kind: el.attr("type")?,
            size: el.uint("size", Base::Decimal)?,
            unit: el.attr("unit")?,
            cpus: el.attr("cpus")?,
        };
        r.skip(el)?;
        Ok(Some(bank))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BaseLabel {
    pub kind: Option<String>,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SecModel {
    pub model: Option<String>,
    pub doi: Option<String>,
    pub base_labels: Vec<BaseLabel>,
}

impl ToXml for SecModel {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            w.opt_text("model", self.model.as_deref())?;
            w.opt_text("doi", self.doi.as_deref())?;
            for label in &self.base_labels {
                let mut tag = Tag::new("baselabel");
                tag.opt("type", label.kind.as_deref());
                w.element(tag, |w| w.text(&label.label))?;
            }
            Ok(())
        })
    }
}

impl FromXml for SecModel {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = SecModel::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "model" => out.model = Some(r.text(child)?),
                "doi" => out.doi = Some(r.text(child)?),
                "baselabel" => {
                    let kind = child.attr("type")?;
                    out.base_labels.push(BaseLabel {
                        kind,
                        label: r.text(child)?,
                    });
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
pub struct MigrationFeatures {
    pub live: bool,
    pub uri_transports: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Host {
    pub uuid: Option<String>,
    pub cpu: Option<HostCpu>,
    /// Element names under `<power_management>`, e.g. `suspend_mem`.
    pub power_management: Option<Vec<String>>,
    pub iommu: Option<String>,
    pub migration: Option<MigrationFeatures>,
    /// NUMA cells; `None` when the host reports no `<topology>`.
    pub cells: Option<Vec<NumaCell>>,
    pub cache: Option<Vec<CacheBank>>,
    pub secmodels: Vec<SecModel>,
}

impl ToXml for Host {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            w.opt_text("uuid", self.uuid.as_deref())?;
            w.child("cpu", self.cpu.as_ref())?;
            if let Some(states) = &self.power_management {
                w.element(Tag::new("power_management"), |w| {
                    for state in states {
                        w.flag(state, true)?;
                    }
                    Ok(())
                })?;
            }
            w.attr_element("iommu", "support", self.iommu.as_deref())?;
            if let Some(migration) = &self.migration {
                w.element(Tag::new("migration_features"), |w| {
                    w.flag("live", migration.live)?;
                    if !migration.uri_transports.is_empty() {
                        w.element(Tag::new("uri_transports"), |w| {
                            w.children("uri_transport", &migration.uri_transports)
                        })?;
                    }
                    Ok(())
                })?;
            }
            if let Some(cells) = &self.cells {
                w.element(Tag::new("topology"), |w| {
                    let mut tag = Tag::new("cells");
                    tag.uint("num", Some(cells.len() as u64), UintFormat::Decimal);
                    w.element(tag, |w| w.children("cell", cells))
                })?;
            }
            if let Some(banks) = &self.cache {
                w.element(Tag::new("cache"), |w| w.children("bank", banks))?;
            }
            w.children("secmodel", &self.secmodels)
        })
    }
}

impl FromXml for Host {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Host::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "uuid" => out.uuid = Some(r.text(child)?),
                "cpu" => out.cpu = r.read(child)?,
                "power_management" => {
                    let states = out.power_management.get_or_insert_with(Vec::new);
                    r.each_child(child, |_, state| {
                        states.push(state.name().to_owned());
                        Ok(false)
                    })?;
                }
                "iommu" => {
                    out.iommu = child.attr("support")?;
                    return Ok(false);
                }
                "migration_features" => {
                    let migration = out.migration.get_or_insert_with(MigrationFeatures::default);
                    r.each_child(child, |r, feature| {
                        match feature.name() {
                            "live" => migration.live = true,
                            "uri_transports" => r.each_child(feature, |r, uri| {
                                if uri.name() != "uri_transport" {
                                    return Ok(false);
                                }
                                migration.uri_transports.push(r.text(uri)?);
                                Ok(true)
                            })?,
                            _ => return Ok(false),
                        }
                        Ok(feature.name() == "uri_transports")
                    })?;
                }
                "topology" => {
                    let cells = out.cells.get_or_insert_with(Vec::new);
                    r.each_child(child, |r, group| {
                        if group.name() != "cells" {
                            return Ok(false);
                        }
                        r.each_child(group, |r, cell| {
                            if cell.name() != "cell" {
                                return Ok(false);
                            }
                            cells.extend(r.read::<NumaCell>(cell)?);
                            Ok(true)
                        })?;
                        Ok(true)
                    })?;
                }
                "cache" => {
                    let banks = out.cache.get_or_insert_with(Vec::new);
                    r.each_child(child, |r, bank| {
                        if bank.name() != "bank" {
                            return Ok(false);
                        }
                        banks.extend(r.read::<CacheBank>(bank)?);
                        Ok(true)
                    })?;
                }
                "secmodel" => out.secmodels.extend(r.read::<SecModel>(child)?),
                other => {
                    trace!(element = other, "ignoring host element");
                    return Ok(false);
                }
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Machine {
    pub name: String,
    pub canonical: Option<String>,
    pub max_cpus: Option<u32>,
}

impl ToXml for Machine {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("canonical", self.canonical.as_deref())
            .uint("maxCpus", self.max_cpus, UintFormat::Decimal);
        w.element(tag, |w| w.text(&self.name))
    }
}

impl FromXml for Machine {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        Ok(Some(Machine {
            canonical: el.attr("canonical")?,
            max_cpus: el.uint("maxCpus", Base::Decimal)?,
            name: r.text(el)?,
        }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GuestDomain {
    pub kind: String,
    pub emulator: Option<String>,
    pub machines: Vec<Machine>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GuestArch {
    pub name: String,
    pub wordsize: Option<u32>,
    pub emulator: Option<String>,
    pub loader: Option<String>,
    pub machines: Vec<Machine>,
    pub domains: Vec<GuestDomain>,
}

impl ToXml for GuestArch {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.attr("name", &self.name);
        w.element(tag, |w| {
            w.uint_text("wordsize", self.wordsize, UintFormat::Decimal)?;
            w.opt_text("emulator", self.emulator.as_deref())?;
            w.opt_text("loader", self.loader.as_deref())?;
            w.children("machine", &self.machines)?;
            for domain in &self.domains {
                let mut tag = Tag::new("domain");
                tag.attr("type", &domain.kind);
                w.element(tag, |w| {
                    w.opt_text("emulator", domain.emulator.as_deref())?;
                    w.children("machine", &domain.machines)
                })?;
            }
            Ok(())
        })
    }
}

impl FromXml for GuestArch {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = GuestArch {
            name: el.attr("name")?.unwrap_or_default(),
            ..GuestArch::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "wordsize" => out.wordsize = Some(r.uint_text(child, Base::Decimal)?),
                "emulator" => out.emulator = Some(r.text(child)?),
                "loader" => out.loader = Some(r.text(child)?),
                "machine" => out.machines.extend(r.read::<Machine>(child)?),
                "domain" => {
                    let mut domain = GuestDomain {
                        kind: child.attr("type")?.unwrap_or_default(),
                        ..GuestDomain::default()
                    };
                    r.each_child(child, |r, grand| {
                        match grand.name() {
                            "emulator" => domain.emulator = Some(r.text(grand)?),
                            "machine" => domain.machines.extend(r.read::<Machine>(grand)?),
                            _ => return Ok(false),
                        }
                        Ok(true)
                    })?;
                    out.domains.push(domain);
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

/// Guest feature such as `<acpi default="on" toggle="yes"/>` or `<pae/>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GuestFeature {
    pub name: String,
    pub default: Option<String>,
    pub toggle: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Guest {
    pub os_type: Option<String>,
    pub arch: Option<GuestArch>,
    pub features: Option<Vec<GuestFeature>>,
}

impl ToXml for Guest {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            w.opt_text("os_type", self.os_type.as_deref())?;
            w.child("arch", self.arch.as_ref())?;
            if let Some(features) = &self.features {
                w.element(Tag::new("features"), |w| {
                    for feature in features {
                        let mut tag = Tag::new(&feature.name);
                        tag.opt("default", feature.default.as_deref())
                            .opt("toggle", feature.toggle.as_deref());
                        w.empty(tag)?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
    }
}

impl FromXml for Guest {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Guest::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "os_type" => out.os_type = Some(r.text(child)?),
                "arch" => out.arch = r.read(child)?,
                "features" => {
                    let features = out.features.get_or_insert_with(Vec::new);
                    r.each_child(child, |_, feature| {
                        features.push(GuestFeature {
                            name: feature.name().to_owned(),
                            default: feature.attr("default")?,
                            toggle: feature.attr("toggle")?,
                        });
                        Ok(false)
                    })?;
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
pub struct Capabilities {
    pub host: Host,
    pub guests: Vec<Guest>,
}

impl ToXml for Capabilities {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            self.host.to_xml("host", w)?;
            w.children("guest", &self.guests)
        })
    }
}

impl FromXml for Capabilities {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Capabilities::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "host" => out.host = r.read(child)?.unwrap_or_default(),
                "guest" => out.guests.extend(r.read::<Guest>(child)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl Document for Capabilities {
    const ROOT: &'static str = "capabilities";
}

#[cfg(test)]
mod tests {
    use super::*;

    const KVM_HOST: &str = r#"<capabilities>
  <host>
    <uuid>4c4c4544-0053-4810-8034-b4c04f4d3132</uuid>
    <cpu>
      <arch>x86_64</arch>
      <model>Skylake-Client-IBRS</model>
      <vendor>Intel</vendor>
      <microcode version="236"/>
      <topology sockets="1" dies="1" cores="4" threads="2"/>
      <feature name="ds"/>
      <feature name="vmx"/>
      <pages unit="KiB" size="4"/>
      <pages unit="KiB" size="2048"/>
    </cpu>
    <power_management>
      <suspend_mem/>
      <suspend_disk/>
    </power_management>
    <iommu support="yes"/>
    <migration_features>
      <live/>
      <uri_transports>
        <uri_transport>tcp</uri_transport>
        <uri_transport>rdma</uri_transport>
      </uri_transports>
    </migration_features>
    <topology>
      <cells num="1">
        <cell id="0">
          <memory unit="KiB">16314240</memory>
          <pages unit="KiB" size="4">4078560</pages>
          <distances>
            <sibling id="0" value="10"/>
          </distances>
          <cpus num="2">
            <cpu id="0" socket_id="0" die_id="0" core_id="0" siblings="0,4"/>
            <cpu id="1" socket_id="0" die_id="0" core_id="1" siblings="1,5"/>
          </cpus>
        </cell>
      </cells>
    </topology>
    <cache>
      <bank id="0" level="3" type="both" size="8" unit="MiB" cpus="0-7"/>
    </cache>
    <secmodel>
      <model>dac</model>
      <doi>0</doi>
      <baselabel type="kvm">+107:+107</baselabel>
    </secmodel>
  </host>
  <guest>
    <os_type>hvm</os_type>
    <arch name="x86_64">
      <wordsize>64</wordsize>
      <emulator>/usr/bin/qemu-system-x86_64</emulator>
      <machine maxCpus="255">pc-i440fx-8.0</machine>
      <machine canonical="pc-i440fx-8.0" maxCpus="255">pc</machine>
      <domain type="qemu"/>
      <domain type="kvm"/>
    </arch>
    <features>
      <acpi default="on" toggle="yes"/>
      <apic default="on" toggle="no"/>
      <cpuselection/>
    </features>
  </guest>
</capabilities>"#;

    #[test]
    fn kvm_host_roundtrip() {
        let caps = Capabilities::unmarshal(KVM_HOST).expect("decode");
        let cpu = caps.host.cpu.as_ref().expect("cpu");
        assert_eq!(cpu.features, ["ds", "vmx"]);
        assert_eq!(cpu.topology.as_ref().and_then(|t| t.threads), Some(2));
        let cells = caps.host.cells.as_ref().expect("cells");
        assert_eq!(cells[0].cpus[1].siblings.as_deref(), Some("1,5"));
        assert_eq!(cells[0].memory.as_ref().map(|m| m.value), Some(16314240));
        let arch = caps.guests[0].arch.as_ref().expect("arch");
        assert_eq!(arch.machines[1].canonical.as_deref(), Some("pc-i440fx-8.0"));
        assert_eq!(arch.domains.len(), 2);
        assert_eq!(caps.marshal().expect("encode"), KVM_HOST);
    }

    #[test]
    fn empty_host_is_written() {
        let caps = Capabilities::default();
        assert_eq!(
            caps.marshal().expect("encode"),
            "<capabilities>\n  <host/>\n</capabilities>"
        );
    }
}
