//! Virtual network, network filter and host interface documents.

pub mod host_interface;
pub mod network;
pub mod nwfilter;

pub use host_interface::{
    BondInterface, BridgeInterface, HostInterface, HostInterfaceKind, InterfaceProtocol,
    InterfaceVariant, LinkMonitor, VlanInterface,
};
pub use network::{
    Dhcp, Dns, Forward, ForwardAddress, ForwardMode, ForwardModeKind, ForwardNat, Network,
    NetworkBridge, NetworkDomain, NetworkIp, PortGroup, Route,
};
pub use nwfilter::{
    FilterEntry, FilterRule, FilterValue, NwFilter, ProtocolKind, RuleProtocol,
};
