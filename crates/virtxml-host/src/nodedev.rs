//! `<device>` documents describing host hardware.
//!
//! Each `<capability type="...">` is a union; PCI, network and SCSI host
//! capabilities nest a second level of `<capability>` unions of their own.

use std::io::Write;

use virtxml_codec::{
    registry, Base, Document, Element, FromXml, Result, Tag, ToXml, UintFormat, Union, XmlReader,
    XmlWriter,
};
use virtxml_domain::PciAddress;

const HEX2: UintFormat = UintFormat::Hex { width: 2 };
const HEX4: UintFormat = UintFormat::Hex { width: 4 };
const HEX6: UintFormat = UintFormat::Hex { width: 6 };

registry! {
    pub enum NodeDevCapKind for "nodedev capability" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        System = "system",
        Pci = "pci",
        UsbDevice = "usb_device",
        Usb = "usb",
        Net = "net",
        ScsiHost = "scsi_host",
        ScsiTarget = "scsi_target",
        Scsi = "scsi",
        Storage = "storage",
        Drm = "drm",
        Ccw = "ccw",
        Css = "css",
        Mdev = "mdev",
        ApQueue = "ap_queue",
        ApCard = "ap_card",
        ApMatrix = "ap_matrix",
        Vdpa = "vdpa",
    }
}

registry! {
    pub enum PciSubCapKind for "pci sub-capability" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        PhysFunction = "phys_function",
        VirtFunctions = "virt_functions",
        PciBridge = "pci-bridge",
        Cardbus = "cardbus",
        MdevTypes = "mdev_types",
    }
}

registry! {
    pub enum NetSubCapKind for "net sub-capability" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        Ieee80203 = "80203",
        Ieee80211 = "80211",
    }
}

registry! {
    pub enum ScsiHostSubCapKind for "scsi_host sub-capability" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        FcHost = "fc_host",
        VportOps = "vport_ops",
    }
}

/// `<vendor id="0x8086">Intel Corporation</vendor>` and the like.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdName {
    pub id: Option<u32>,
    pub name: Option<String>,
}

impl ToXml for IdName {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.uint("id", self.id, HEX4);
        w.element(tag, |w| match &self.name {
            Some(text) => w.text(text),
            None => Ok(()),
        })
    }
}

impl FromXml for IdName {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let id = el.uint("id", Base::Hex)?;
        let name = r.text(el)?;
        Ok(Some(IdName {
            id,
            name: (!name.is_empty()).then_some(name),
        }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MdevType {
    pub id: Option<String>,
    pub name: Option<String>,
    pub device_api: Option<String>,
    pub available_instances: Option<u32>,
}

impl ToXml for MdevType {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("id", self.id.as_deref());
        w.element(tag, |w| {
            w.opt_text("name", self.name.as_deref())?;
            w.opt_text("deviceAPI", self.device_api.as_deref())?;
            w.uint_text("availableInstances", self.available_instances, UintFormat::Decimal)
        })
    }
}

impl FromXml for MdevType {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = MdevType {
            id: el.attr("id")?,
            ..MdevType::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "name" => out.name = Some(r.text(child)?),
                "deviceAPI" => out.device_api = Some(r.text(child)?),
                "availableInstances" => {
                    out.available_instances = Some(r.uint_text(child, Base::Decimal)?)
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PciSubCapability {
    PhysFunction(Option<PciAddress>),
    VirtFunctions {
        max_count: Option<u32>,
        addresses: Vec<PciAddress>,
    },
    PciBridge,
    Cardbus,
    MdevTypes(Vec<MdevType>),
}

impl Union for PciSubCapability {
    type Kind = PciSubCapKind;

    fn kind(&self) -> PciSubCapKind {
        match self {
            PciSubCapability::PhysFunction(_) => PciSubCapKind::PhysFunction,
            PciSubCapability::VirtFunctions { .. } => PciSubCapKind::VirtFunctions,
            PciSubCapability::PciBridge => PciSubCapKind::PciBridge,
            PciSubCapability::Cardbus => PciSubCapKind::Cardbus,
            PciSubCapability::MdevTypes(_) => PciSubCapKind::MdevTypes,
        }
    }

    fn allocate(kind: PciSubCapKind) -> Self {
        match kind {
            PciSubCapKind::PhysFunction => PciSubCapability::PhysFunction(None),
            PciSubCapKind::VirtFunctions => PciSubCapability::VirtFunctions {
                max_count: None,
                addresses: Vec::new(),
            },
            PciSubCapKind::PciBridge => PciSubCapability::PciBridge,
            PciSubCapKind::Cardbus => PciSubCapability::Cardbus,
            PciSubCapKind::MdevTypes => PciSubCapability::MdevTypes(Vec::new()),
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        if let PciSubCapability::VirtFunctions { max_count, .. } = self {
            tag.uint("maxCount", *max_count, UintFormat::Decimal);
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            PciSubCapability::PhysFunction(address) => w.child("address", address.as_ref()),
            PciSubCapability::VirtFunctions { addresses, .. } => w.children("address", addresses),
            PciSubCapability::MdevTypes(types) => w.children("type", types),
            PciSubCapability::PciBridge | PciSubCapability::Cardbus => Ok(()),
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        if let PciSubCapability::VirtFunctions { max_count, .. } = self {
            *max_count = el.uint("maxCount", Base::Decimal)?;
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match (self, child.name()) {
            (PciSubCapability::PhysFunction(address), "address") => *address = r.read(child)?,
            (PciSubCapability::VirtFunctions { addresses, .. }, "address") => {
                addresses.extend(r.read::<PciAddress>(child)?)
            }
            (PciSubCapability::MdevTypes(types), "type") => types.extend(r.read::<MdevType>(child)?),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

virtxml_codec::union_xml!(PciSubCapability);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NetSubCapability {
    Ieee80203,
    Ieee80211,
}

impl Union for NetSubCapability {
    type Kind = NetSubCapKind;

    fn kind(&self) -> NetSubCapKind {
        match self {
            NetSubCapability::Ieee80203 => NetSubCapKind::Ieee80203,
            NetSubCapability::Ieee80211 => NetSubCapKind::Ieee80211,
        }
    }

    fn allocate(kind: NetSubCapKind) -> Self {
        match kind {
            NetSubCapKind::Ieee80203 => NetSubCapability::Ieee80203,
            NetSubCapKind::Ieee80211 => NetSubCapability::Ieee80211,
        }
    }
}

virtxml_codec::union_xml!(NetSubCapability);

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScsiHostSubCapability {
    FcHost {
        wwnn: Option<String>,
        wwpn: Option<String>,
        fabric_wwn: Option<String>,
    },
    VportOps {
        max_vports: Option<u32>,
        vports: Option<u32>,
    },
}

impl Union for ScsiHostSubCapability {
    type Kind = ScsiHostSubCapKind;

    fn kind(&self) -> ScsiHostSubCapKind {
        match self {
            ScsiHostSubCapability::FcHost { .. } => ScsiHostSubCapKind::FcHost,
            ScsiHostSubCapability::VportOps { .. } => ScsiHostSubCapKind::VportOps,
        }
    }

    fn allocate(kind: ScsiHostSubCapKind) -> Self {
        match kind {
            ScsiHostSubCapKind::FcHost => ScsiHostSubCapability::FcHost {
                wwnn: None,
                wwpn: None,
                fabric_wwn: None,
            },
            ScsiHostSubCapKind::VportOps => ScsiHostSubCapability::VportOps {
                max_vports: None,
                vports: None,
            },
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            ScsiHostSubCapability::FcHost {
                wwnn,
                wwpn,
                fabric_wwn,
            } => {
                w.opt_text("wwnn", wwnn.as_deref())?;
                w.opt_text("wwpn", wwpn.as_deref())?;
                w.opt_text("fabric_wwn", fabric_wwn.as_deref())
            }
            ScsiHostSubCapability::VportOps { max_vports, vports } => {
                w.uint_text("max_vports", *max_vports, UintFormat::Decimal)?;
                w.uint_text("vports", *vports, UintFormat::Decimal)
            }
        }
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match (self, child.name()) {
            (ScsiHostSubCapability::FcHost { wwnn, .. }, "wwnn") => *wwnn = Some(r.text(child)?),
            (ScsiHostSubCapability::FcHost { wwpn, .. }, "wwpn") => *wwpn = Some(r.text(child)?),
            (ScsiHostSubCapability::FcHost { fabric_wwn, .. }, "fabric_wwn") => {
                *fabric_wwn = Some(r.text(child)?)
            }
            (ScsiHostSubCapability::VportOps { max_vports, .. }, "max_vports") => {
                *max_vports = Some(r.uint_text(child, Base::Decimal)?)
            }
            (ScsiHostSubCapability::VportOps { vports, .. }, "vports") => {
                *vports = Some(r.uint_text(child, Base::Decimal)?)
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

virtxml_codec::union_xml!(ScsiHostSubCapability);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SystemHardware {
    pub vendor: Option<String>,
    pub version: Option<String>,
    pub serial: Option<String>,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SystemFirmware {
    pub vendor: Option<String>,
    pub version: Option<String>,
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SystemCap {
    pub product: Option<String>,
    pub hardware: Option<SystemHardware>,
    pub firmware: Option<SystemFirmware>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IommuGroup {
    pub number: Option<u32>,
    pub addresses: Vec<PciAddress>,
}

/// PCI function. `class` is written as six hex digits; the location fields
/// are plain decimal text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PciCap {
    pub class: Option<u32>,
    pub domain: Option<u32>,
    pub bus: Option<u32>,
    pub slot: Option<u32>,
    pub function: Option<u32>,
    pub product: Option<IdName>,
    pub vendor: Option<IdName>,
    pub capabilities: Vec<PciSubCapability>,
    pub iommu_group: Option<IommuGroup>,
    pub numa_node: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UsbDeviceCap {
    pub bus: Option<u32>,
    pub device: Option<u32>,
    pub product: Option<IdName>,
    pub vendor: Option<IdName>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UsbInterfaceCap {
    pub number: Option<u32>,
    pub class: Option<u32>,
    pub subclass: Option<u32>,
    pub protocol: Option<u32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetCap {
    pub interface: Option<String>,
    pub address: Option<String>,
    pub link_speed: Option<u32>,
    pub link_state: Option<String>,
    pub features: Vec<String>,
    pub capabilities: Vec<NetSubCapability>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScsiHostCap {
    pub host: Option<u32>,
    pub unique_id: Option<u32>,
    pub capabilities: Vec<ScsiHostSubCapability>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScsiCap {
    pub host: Option<u32>,
    pub bus: Option<u32>,
    pub target: Option<u32>,
    pub lun: Option<u32>,
    pub scsi_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StorageCap {
    pub block: Option<String>,
    pub bus: Option<String>,
    pub drive_type: Option<String>,
    pub model: Option<String>,
    pub vendor: Option<String>,
    pub serial: Option<String>,
    pub size: Option<u64>,
}

/// Channel subsystem identifiers, shared by `ccw` and `css`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CcwCap {
    pub cssid: Option<u32>,
    pub ssid: Option<u32>,
    pub devno: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MdevCap {
    pub type_id: Option<String>,
    pub iommu_group: Option<u32>,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeDevCapability {
    System(SystemCap),
    Pci(PciCap),
    UsbDevice(UsbDeviceCap),
    Usb(UsbInterfaceCap),
    Net(NetCap),
    ScsiHost(ScsiHostCap),
    ScsiTarget { target: Option<String> },
    Scsi(ScsiCap),
    Storage(StorageCap),
    Drm { drm_type: Option<String> },
    Ccw(CcwCap),
    Css(CcwCap),
    Mdev(MdevCap),
    ApQueue { adapter: Option<u32>, domain: Option<u32> },
    ApCard { adapter: Option<u32> },
    ApMatrix,
    Vdpa { chardev: Option<String> },
}

fn text_into<'a>(slot: &mut Option<String>, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<()> {
    *slot = Some(r.text(child)?);
    Ok(())
}

fn uint_into<'a, T: TryFrom<u64>>(
    slot: &mut Option<T>,
    child: &Element<'a>,
    r: &mut XmlReader<'a>,
    base: Base,
) -> Result<()> {
    *slot = Some(r.uint_text(child, base)?);
    Ok(())
}

impl Union for NodeDevCapability {
    type Kind = NodeDevCapKind;

    fn kind(&self) -> NodeDevCapKind {
        match self {
            NodeDevCapability::System(_) => NodeDevCapKind::System,
            NodeDevCapability::Pci(_) => NodeDevCapKind::Pci,
            NodeDevCapability::UsbDevice(_) => NodeDevCapKind::UsbDevice,
            NodeDevCapability::Usb(_) => NodeDevCapKind::Usb,
            NodeDevCapability::Net(_) => NodeDevCapKind::Net,
            NodeDevCapability::ScsiHost(_) => NodeDevCapKind::ScsiHost,
            NodeDevCapability::ScsiTarget { .. } => NodeDevCapKind::ScsiTarget,
            NodeDevCapability::Scsi(_) => NodeDevCapKind::Scsi,
            NodeDevCapability::Storage(_) => NodeDevCapKind::Storage,
            NodeDevCapability::Drm { .. } => NodeDevCapKind::Drm,
            NodeDevCapability::Ccw(_) => NodeDevCapKind::Ccw,
            NodeDevCapability::Css(_) => NodeDevCapKind::Css,
            NodeDevCapability::Mdev(_) => NodeDevCapKind::Mdev,
            NodeDevCapability::ApQueue { .. } => NodeDevCapKind::ApQueue,
            NodeDevCapability::ApCard { .. } => NodeDevCapKind::ApCard,
            NodeDevCapability::ApMatrix => NodeDevCapKind::ApMatrix,
            NodeDevCapability::Vdpa { .. } => NodeDevCapKind::Vdpa,
        }
    }

    fn allocate(kind: NodeDevCapKind) -> Self {
        match kind {
            NodeDevCapKind::System => NodeDevCapability::System(SystemCap::default()),
            NodeDevCapKind::Pci => NodeDevCapability::Pci(PciCap::default()),
            NodeDevCapKind::UsbDevice => NodeDevCapability::UsbDevice(UsbDeviceCap::default()),
            NodeDevCapKind::Usb => NodeDevCapability::Usb(UsbInterfaceCap::default()),
            NodeDevCapKind::Net => NodeDevCapability::Net(NetCap::default()),
            NodeDevCapKind::ScsiHost => NodeDevCapability::ScsiHost(ScsiHostCap::default()),
            NodeDevCapKind::ScsiTarget => NodeDevCapability::ScsiTarget { target: None },
            NodeDevCapKind::Scsi => NodeDevCapability::Scsi(ScsiCap::default()),
            NodeDevCapKind::Storage => NodeDevCapability::Storage(StorageCap::default()),
            NodeDevCapKind::Drm => NodeDevCapability::Drm { drm_type: None },
            NodeDevCapKind::Ccw => NodeDevCapability::Ccw(CcwCap::default()),
            NodeDevCapKind::Css => NodeDevCapability::Css(CcwCap::default()),
            NodeDevCapKind::Mdev => NodeDevCapability::Mdev(MdevCap::default()),
            NodeDevCapKind::ApQueue => NodeDevCapability::ApQueue {
                adapter: None,
                domain: None,
            },
            NodeDevCapKind::ApCard => NodeDevCapability::ApCard { adapter: None },
            NodeDevCapKind::ApMatrix => NodeDevCapability::ApMatrix,
            NodeDevCapKind::Vdpa => NodeDevCapability::Vdpa { chardev: None },
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            NodeDevCapability::System(sys) => {
                w.opt_text("product", sys.product.as_deref())?;
                if let Some(hw) = &sys.hardware {
                    w.element(Tag::new("hardware"), |w| {
                        w.opt_text("vendor", hw.vendor.as_deref())?;
                        w.opt_text("version", hw.version.as_deref())?;
                        w.opt_text("serial", hw.serial.as_deref())?;
                        w.opt_text("uuid", hw.uuid.as_deref())
                    })?;
                }
                if let Some(fw) = &sys.firmware {
                    w.element(Tag::new("firmware"), |w| {
                        w.opt_text("vendor", fw.vendor.as_deref())?;
                        w.opt_text("version", fw.version.as_deref())?;
                        w.opt_text("release_date", fw.release_date.as_deref())
                    })?;
                }
                Ok(())
            }
            NodeDevCapability::Pci(pci) => {
                w.uint_text("class", pci.class, HEX6)?;
                w.uint_text("domain", pci.domain, UintFormat::Decimal)?;
                w.uint_text("bus", pci.bus, UintFormat::Decimal)?;
                w.uint_text("slot", pci.slot, UintFormat::Decimal)?;
                w.uint_text("function", pci.function, UintFormat::Decimal)?;
                w.child("product", pci.product.as_ref())?;
                w.child("vendor", pci.vendor.as_ref())?;
                w.children("capability", &pci.capabilities)?;
                if let Some(group) = &pci.iommu_group {
                    let mut tag = Tag::new("iommuGroup");
                    tag.uint("number", group.number, UintFormat::Decimal);
                    w.element(tag, |w| w.children("address", &group.addresses))?;
                }
                if let Some(node) = pci.numa_node {
                    w.attr_element("numa", "node", Some(&node.to_string()))?;
                }
                Ok(())
            }
            NodeDevCapability::UsbDevice(usb) => {
                w.uint_text("bus", usb.bus, UintFormat::Decimal)?;
                w.uint_text("device", usb.device, UintFormat::Decimal)?;
                w.child("product", usb.product.as_ref())?;
                w.child("vendor", usb.vendor.as_ref())
            }
            NodeDevCapability::Usb(usb) => {
                w.uint_text("number", usb.number, UintFormat::Decimal)?;
                w.uint_text("class", usb.class, UintFormat::Decimal)?;
                w.uint_text("subclass", usb.subclass, UintFormat::Decimal)?;
                w.uint_text("protocol", usb.protocol, UintFormat::Decimal)?;
                w.opt_text("description", usb.description.as_deref())
            }
            NodeDevCapability::Net(net) => {
                w.opt_text("interface", net.interface.as_deref())?;
                w.opt_text("address", net.address.as_deref())?;
                if net.link_speed.is_some() || net.link_state.is_some() {
                    let mut tag = Tag::new("link");
                    tag.uint("speed", net.link_speed, UintFormat::Decimal)
                        .opt("state", net.link_state.as_deref());
                    w.empty(tag)?;
                }
                for feature in &net.features {
                    w.attr_element("feature", "name", Some(feature))?;
                }
                w.children("capability", &net.capabilities)
            }
            NodeDevCapability::ScsiHost(host) => {
                w.uint_text("host", host.host, UintFormat::Decimal)?;
                w.uint_text("unique_id", host.unique_id, UintFormat::Decimal)?;
                w.children("capability", &host.capabilities)
            }
            NodeDevCapability::ScsiTarget { target } => w.opt_text("target", target.as_deref()),
            NodeDevCapability::Scsi(scsi) => {
                w.uint_text("host", scsi.host, UintFormat::Decimal)?;
                w.uint_text("bus", scsi.bus, UintFormat::Decimal)?;
                w.uint_text("target", scsi.target, UintFormat::Decimal)?;
                w.uint_text("lun", scsi.lun, UintFormat::Decimal)?;
                w.opt_text("type", scsi.scsi_type.as_deref())
            }
            NodeDevCapability::Storage(storage) => {
                w.opt_text("block", storage.block.as_deref())?;
                w.opt_text("bus", storage.bus.as_deref())?;
                w.opt_text("drive_type", storage.drive_type.as_deref())?;
                w.opt_text("model", storage.model.as_deref())?;
                w.opt_text("vendor", storage.vendor.as_deref())?;
                w.opt_text("serial", storage.serial.as_deref())?;
                w.uint_text("size", storage.size, UintFormat::Decimal)
            }
            NodeDevCapability::Drm { drm_type } => w.opt_text("type", drm_type.as_deref()),
            NodeDevCapability::Ccw(ccw) | NodeDevCapability::Css(ccw) => {
                w.uint_text("cssid", ccw.cssid, UintFormat::HEX)?;
                w.uint_text("ssid", ccw.ssid, UintFormat::HEX)?;
                w.uint_text("devno", ccw.devno, HEX4)
            }
            NodeDevCapability::Mdev(mdev) => {
                w.attr_element("type", "id", mdev.type_id.as_deref())?;
                if let Some(group) = mdev.iommu_group {
                    w.attr_element("iommuGroup", "number", Some(&group.to_string()))?;
                }
                w.opt_text("uuid", mdev.uuid.as_deref())
            }
            NodeDevCapability::ApQueue { adapter, domain } => {
                w.uint_text("ap-adapter", *adapter, HEX2)?;
                w.uint_text("ap-domain", *domain, HEX4)
            }
            NodeDevCapability::ApCard { adapter } => w.uint_text("ap-adapter", *adapter, HEX2),
            NodeDevCapability::ApMatrix => Ok(()),
            NodeDevCapability::Vdpa { chardev } => w.opt_text("chardev", chardev.as_deref()),
        }
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        let name = child.name();
        match self {
            NodeDevCapability::System(sys) => match name {
                "product" => text_into(&mut sys.product, child, r)?,
                "hardware" => {
                    let hw = sys.hardware.get_or_insert_with(SystemHardware::default);
                    r.each_child(child, |r, grand| {
                        let slot = match grand.name() {
                            "vendor" => &mut hw.vendor,
                            "version" => &mut hw.version,
                            "serial" => &mut hw.serial,
                            "uuid" => &mut hw.uuid,
                            _ => return Ok(false),
                        };
                        text_into(slot, grand, r)?;
                        Ok(true)
                    })?;
                }
                "firmware" => {
                    let fw = sys.firmware.get_or_insert_with(SystemFirmware::default);
                    r.each_child(child, |r, grand| {
                        let slot = match grand.name() {
                            "vendor" => &mut fw.vendor,
                            "version" => &mut fw.version,
                            "release_date" => &mut fw.release_date,
                            _ => return Ok(false),
                        };
                        text_into(slot, grand, r)?;
                        Ok(true)
                    })?;
                }
                _ => return Ok(false),
            },
            NodeDevCapability::Pci(pci) => match name {
                "class" => uint_into(&mut pci.class, child, r, Base::Hex)?,
                "domain" => uint_into(&mut pci.domain, child, r, Base::Decimal)?,
                "bus" => uint_into(&mut pci.bus, child, r, Base::Decimal)?,
                "slot" => uint_into(&mut pci.slot, child, r, Base::Decimal)?,
                "function" => uint_into(&mut pci.function, child, r, Base::Decimal)?,
                "product" => pci.product = r.read(child)?,
                "vendor" => pci.vendor = r.read(child)?,
                "capability" => pci.capabilities.extend(r.read::<PciSubCapability>(child)?),
                "iommuGroup" => {
                    let mut group = IommuGroup {
                        number: child.uint("number", Base::Decimal)?,
                        addresses: Vec::new(),
                    };
                    r.each_child(child, |r, grand| {
                        if grand.name() != "address" {
                            return Ok(false);
                        }
                        group.addresses.extend(r.read::<PciAddress>(grand)?);
                        Ok(true)
                    })?;
                    pci.iommu_group = Some(group);
                }
                "numa" => {
                    pci.numa_node = child.parse("node")?;
                    return Ok(false);
                }
                _ => return Ok(false),
            },
            NodeDevCapability::UsbDevice(usb) => match name {
                "bus" => uint_into(&mut usb.bus, child, r, Base::Decimal)?,
                "device" => uint_into(&mut usb.device, child, r, Base::Decimal)?,
                "product" => usb.product = r.read(child)?,
                "vendor" => usb.vendor = r.read(child)?,
                _ => return Ok(false),
            },
            NodeDevCapability::Usb(usb) => match name {
                "number" => uint_into(&mut usb.number, child, r, Base::Decimal)?,
                "class" => uint_into(&mut usb.class, child, r, Base::Decimal)?,
                "subclass" => uint_into(&mut usb.subclass, child, r, Base::Decimal)?,
                "protocol" => uint_into(&mut usb.protocol, child, r, Base::Decimal)?,
                "description" => text_into(&mut usb.description, child, r)?,
                _ => return Ok(false),
            },
            NodeDevCapability::Net(net) => match name {
                "interface" => text_into(&mut net.interface, child, r)?,
                "address" => text_into(&mut net.address, child, r)?,
                "link" => {
                    net.link_speed = child.uint("speed", Base::Decimal)?;
                    net.link_state = child.attr("state")?;
                    return Ok(false);
                }
                "feature" => {
                    net.features.extend(child.attr("name")?);
                    return Ok(false);
                }
                "capability" => net.capabilities.extend(r.read::<NetSubCapability>(child)?),
                _ => return Ok(false),
            },
            NodeDevCapability::ScsiHost(host) => match name {
                "host" => uint_into(&mut host.host, child, r, Base::Decimal)?,
                "unique_id" => uint_into(&mut host.unique_id, child, r, Base::Decimal)?,
                "capability" => host
                    .capabilities
                    .extend(r.read::<ScsiHostSubCapability>(child)?),
                _ => return Ok(false),
            },
            NodeDevCapability::ScsiTarget { target } if name == "target" => {
                text_into(target, child, r)?
            }
            NodeDevCapability::Scsi(scsi) => match name {
                "host" => uint_into(&mut scsi.host, child, r, Base::Decimal)?,
                "bus" => uint_into(&mut scsi.bus, child, r, Base::Decimal)?,
                "target" => uint_into(&mut scsi.target, child, r, Base::Decimal)?,
                "lun" => uint_into(&mut scsi.lun, child, r, Base::Decimal)?,
                "type" => text_into(&mut scsi.scsi_type, child, r)?,
                _ => return Ok(false),
            },
            NodeDevCapability::Storage(storage) => match name {
                "block" => text_into(&mut storage.block, child, r)?,
                "bus" => text_into(&mut storage.bus, child, r)?,
                "drive_type" => text_into(&mut storage.drive_type, child, r)?,
                "model" => text_into(&mut storage.model, child, r)?,
                "vendor" => text_into(&mut storage.vendor, child, r)?,
                "serial" => text_into(&mut storage.serial, child, r)?,
                "size" => uint_into(&mut storage.size, child, r, Base::Decimal)?,
                _ => return Ok(false),
            },
            NodeDevCapability::Drm { drm_type } if name == "type" => text_into(drm_type, child, r)?,
            NodeDevCapability::Ccw(ccw) | NodeDevCapability::Css(ccw) => match name {
                "cssid" => uint_into(&mut ccw.cssid, child, r, Base::Hex)?,
                "ssid" => uint_into(&mut ccw.ssid, child, r, Base::Hex)?,
                "devno" => uint_into(&mut ccw.devno, child, r, Base::Hex)?,
                _ => return Ok(false),
            },
            NodeDevCapability::Mdev(mdev) => match name {
                "type" => {
                    mdev.type_id = child.attr("id")?;
                    return Ok(false);
                }
                "iommuGroup" => {
                    mdev.iommu_group = child.uint("number", Base::Decimal)?;
                    return Ok(false);
                }
                "uuid" => text_into(&mut mdev.uuid, child, r)?,
                _ => return Ok(false),
            },
            NodeDevCapability::ApQueue { adapter, domain } => match name {
                "ap-adapter" => uint_into(adapter, child, r, Base::Hex)?,
                "ap-domain" => uint_into(domain, child, r, Base::Hex)?,
                _ => return Ok(false),
            },
            NodeDevCapability::ApCard { adapter } if name == "ap-adapter" => {
                uint_into(adapter, child, r, Base::Hex)?
            }
            NodeDevCapability::Vdpa { chardev } if name == "chardev" => {
                text_into(chardev, child, r)?
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

virtxml_codec::union_xml!(NodeDevCapability);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Devnode {
    pub kind: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeDevice {
    pub name: Option<String>,
    pub path: Option<String>,
    pub devnodes: Vec<Devnode>,
    pub parent: Option<String>,
    pub driver: Option<String>,
    pub capabilities: Vec<NodeDevCapability>,
}

impl ToXml for NodeDevice {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        w.element(Tag::new(name), |w| {
            w.opt_text("name", self.name.as_deref())?;
            w.opt_text("path", self.path.as_deref())?;
            for node in &self.devnodes {
                let mut tag = Tag::new("devnode");
                tag.opt("type", node.kind.as_deref());
                w.element(tag, |w| w.text(&node.path))?;
            }
            w.opt_text("parent", self.parent.as_deref())?;
            if let Some(driver) = &self.driver {
                w.element(Tag::new("driver"), |w| w.text_element("name", driver))?;
            }
            w.children("capability", &self.capabilities)
        })
    }
}

impl FromXml for NodeDevice {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = NodeDevice::default();
        r.each_child(el, |r, child| {
            match child.name() {
                "name" => out.name = Some(r.text(child)?),
                "path" => out.path = Some(r.text(child)?),
                "devnode" => {
                    let kind = child.attr("type")?;
                    out.devnodes.push(Devnode {
                        kind,
                        path: r.text(child)?,
                    });
                }
                "parent" => out.parent = Some(r.text(child)?),
                "driver" => {
                    r.each_child(child, |r, grand| {
                        if grand.name() != "name" {
                            return Ok(false);
                        }
                        out.driver = Some(r.text(grand)?);
                        Ok(true)
                    })?;
                }
                "capability" => out
                    .capabilities
                    .extend(r.read::<NodeDevCapability>(child)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl Document for NodeDevice {
    const ROOT: &'static str = "device";
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRIOV_PF: &str = r#"<device>
  <name>pci_0000_03_00_0</name>
  <path>/sys/devices/pci0000:00/0000:00:01.0/0000:03:00.0</path>
  <parent>pci_0000_00_01_0</parent>
  <driver>
    <name>igb</name>
  </driver>
  <capability type="pci">
    <class>0x020000</class>
    <domain>0</domain>
    <bus>3</bus>
    <slot>0</slot>
    <function>0</function>
    <product id="0x10c9">82576 Gigabit Network Connection</product>
    <vendor id="0x8086">Intel Corporation</vendor>
    <capability type="virt_functions" maxCount="7">
      <address domain="0x0000" bus="0x03" slot="0x10" function="0x0"/>
      <address domain="0x0000" bus="0x03" slot="0x10" function="0x2"/>
    </capability>
    <iommuGroup number="15">
      <address domain="0x0000" bus="0x03" slot="0x00" function="0x0"/>
    </iommuGroup>
    <numa node="0"/>
  </capability>
</device>"#;

    #[test]
    fn pci_physical_function() {
        let dev = NodeDevice::unmarshal(SRIOV_PF).expect("decode");
        match &dev.capabilities[0] {
            NodeDevCapability::Pci(pci) => {
                assert_eq!(pci.class, Some(0x020000));
                assert_eq!(pci.vendor.as_ref().and_then(|v| v.id), Some(0x8086));
                match &pci.capabilities[0] {
                    PciSubCapability::VirtFunctions { max_count, addresses } => {
                        assert_eq!(*max_count, Some(7));
                        assert_eq!(addresses[1], PciAddress::new(0, 3, 0x10, 2));
                    }
                    other => panic!("unexpected {other:?}"),
                }
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(dev.marshal().expect("encode"), SRIOV_PF);
    }

    #[test]
    fn net_and_scsi_host_sub_capabilities() {
        let net = r#"<device>
  <name>net_eth0_52_54_00_12_34_56</name>
  <parent>pci_0000_00_03_0</parent>
  <capability type="net">
    <interface>eth0</interface>
    <address>52:54:00:12:34:56</address>
    <link speed="1000" state="up"/>
    <feature name="rx"/>
    <feature name="tx"/>
    <capability type="80203"/>
  </capability>
</device>"#;
        let dev = NodeDevice::unmarshal(net).expect("decode");
        assert_eq!(dev.marshal().expect("encode"), net);

        let hba = r#"<device>
  <name>scsi_host5</name>
  <capability type="scsi_host">
    <host>5</host>
    <unique_id>2</unique_id>
    <capability type="fc_host">
      <wwnn>20000000c9831b4b</wwnn>
      <wwpn>10000000c9831b4b</wwpn>
    </capability>
    <capability type="vport_ops">
      <max_vports>127</max_vports>
      <vports>0</vports>
    </capability>
  </capability>
</device>"#;
        let dev = NodeDevice::unmarshal(hba).expect("decode");
        match &dev.capabilities[0] {
            NodeDevCapability::ScsiHost(host) => assert_eq!(host.capabilities.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(dev.marshal().expect("encode"), hba);
    }

    #[test]
    fn ccw_ids_are_hex() {
        let xml = r#"<device>
  <name>ccw_0_0_ff00</name>
  <parent>computer</parent>
  <capability type="ccw">
    <cssid>0xfe</cssid>
    <ssid>0x0</ssid>
    <devno>0xff00</devno>
  </capability>
</device>"#;
        let dev = NodeDevice::unmarshal(xml).expect("decode");
        assert_eq!(
            dev.capabilities,
            vec![NodeDevCapability::Ccw(CcwCap {
                cssid: Some(0xfe),
                ssid: Some(0),
                devno: Some(0xff00),
            })]
        );
        assert_eq!(dev.marshal().expect("encode"), xml);
    }

    #[test]
    fn unknown_capability_is_dropped() {
        let dev = NodeDevice::unmarshal(
            r#"<device><name>x</name><capability type="quantum"><qubits>5</qubits></capability><capability type="drm"><type>render</type></capability></device>"#,
        )
        .expect("decode");
        assert_eq!(
            dev.capabilities,
            vec![NodeDevCapability::Drm {
                drm_type: Some("render".into())
            }]
        );
    }
}
