//! Host-side documents: node devices, connection capabilities and domain
//! capabilities.

pub mod capabilities;
pub mod domcaps;
pub mod nodedev;

pub use capabilities::{
    CacheBank, Capabilities, Guest, GuestArch, GuestDomain, GuestFeature, Host, HostCpu, Machine,
    NumaCell, SecModel,
};
pub use domcaps::{
    CapsEnum, CpuModeCaps, CpuModeKind, DeviceCaps, DomainCaps, EnumCaps, FeatureCaps, OsCaps,
    SevCaps,
};
pub use nodedev::{
    CcwCap, IdName, NetSubCapability, NodeDevCapKind, NodeDevCapability, NodeDevice, PciCap,
    PciSubCapability, ScsiHostSubCapability,
};
