//! Domain and domain snapshot documents.
//!
//! Every device element whose shape depends on a `type`-like attribute is
//! modelled as an enum implementing [`virtxml_codec::Union`]; the parent
//! struct holds it as `Option<_>` so unknown kinds decode to `None` without
//! disturbing sibling devices.

pub mod address;
pub mod chardev;
pub mod controller;
pub mod devices;
pub mod disk;
pub mod domain;
pub mod filesystem;
pub mod graphics;
pub mod hostdev;
pub mod interface;
pub mod launch_security;
pub mod rng;
pub mod smartcard;
pub mod snapshot;
pub mod sysinfo;
pub mod tpm;

pub use address::{AddressKind, DomainAddress, PciAddress};
pub use chardev::{
    Channel, ChannelTarget, Chardev, ChardevKind, ChardevSource, Console, Parallel, Serial,
};
pub use controller::{Controller, ControllerKind, ControllerVariant};
pub use devices::{Devices, Input, MemBalloon, Video, Watchdog};
pub use disk::{BackingStore, Disk, DiskBackend, DiskSource, DiskSourceKind};
pub use domain::{Clock, Cpu, CpuFeature, CpuModel, CpuTopology, Domain, Feature, Os, Vcpu};
pub use filesystem::{Filesystem, FsSource, FsSourceKind};
pub use graphics::{Graphics, GraphicsKind, GraphicsListen};
pub use hostdev::{Hostdev, HostdevCaps, HostdevMode, HostdevSubsys, ScsiSource};
pub use interface::{
    Bandwidth, BandwidthParams, FilterParameter, FilterRef, Interface, InterfaceSource,
    InterfaceSourceKind, VirtualPort, VirtualPortKind, Vlan, VlanTag,
};
pub use launch_security::{LaunchSecurity, LaunchSecurityKind, Sev, SevSnp};
pub use rng::{Rng, RngBackend};
pub use smartcard::{Redirdev, Smartcard, SmartcardMode};
pub use snapshot::{DomainSnapshot, SnapshotDisk, SnapshotMemory};
pub use sysinfo::{Sysinfo, SysinfoEntry};
pub use tpm::{Tpm, TpmBackend};
