#![cfg_attr(docsrs, feature(doc_cfg))]
//! Typed codec for libvirt XML documents. Re-exports the workspace crates
//! under short module names.
//!
//! ```rust
//! use virtxml::domain::Domain;
//! use virtxml::Document;
//!
//! let dom = Domain::unmarshal(r#"<domain type="kvm"><name>demo</name></domain>"#)?;
//! assert_eq!(dom.name.as_deref(), Some("demo"));
//! assert_eq!(
//!     dom.marshal()?,
//!     "<domain type=\"kvm\">\n  <name>demo</name>\n</domain>"
//! );
//! # Ok::<(), virtxml::XmlError>(())
//! ```

pub use virtxml_codec as codec;
pub use virtxml_domain as domain;
pub use virtxml_host as host;
pub use virtxml_network as network;
pub use virtxml_storage as storage;

pub use virtxml_codec::{Document, Result, XmlError};

/// Every root element this crate can decode, keyed by its element name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyDocument {
    Domain(Box<domain::Domain>),
    Snapshot(Box<domain::DomainSnapshot>),
    Network(network::Network),
    NwFilter(network::NwFilter),
    Interface(network::HostInterface),
    Pool(storage::StoragePool),
    Volume(storage::StorageVolume),
    NodeDevice(host::NodeDevice),
    Capabilities(host::Capabilities),
    DomainCaps(host::DomainCaps),
}

impl AnyDocument {
    /// Decode `xml`, dispatching on its root element.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = codec::XmlReader::new(xml);
        let root = reader.root()?;
        let name = root.name().to_string();
        tracing::debug!(root = %name, "dispatching document");
        Ok(match name.as_str() {
            <domain::Domain as Document>::ROOT => {
                AnyDocument::Domain(Box::new(domain::Domain::unmarshal(xml)?))
            }
            <domain::DomainSnapshot as Document>::ROOT => {
                AnyDocument::Snapshot(Box::new(domain::DomainSnapshot::unmarshal(xml)?))
            }
            <network::Network as Document>::ROOT => {
                AnyDocument::Network(network::Network::unmarshal(xml)?)
            }
            <network::NwFilter as Document>::ROOT => {
                AnyDocument::NwFilter(network::NwFilter::unmarshal(xml)?)
            }
            <network::HostInterface as Document>::ROOT => {
                AnyDocument::Interface(network::HostInterface::unmarshal(xml)?)
            }
            <storage::StoragePool as Document>::ROOT => {
                AnyDocument::Pool(storage::StoragePool::unmarshal(xml)?)
            }
            <storage::StorageVolume as Document>::ROOT => {
                AnyDocument::Volume(storage::StorageVolume::unmarshal(xml)?)
            }
            <host::NodeDevice as Document>::ROOT => {
                AnyDocument::NodeDevice(host::NodeDevice::unmarshal(xml)?)
            }
            <host::Capabilities as Document>::ROOT => {
                AnyDocument::Capabilities(host::Capabilities::unmarshal(xml)?)
            }
            <host::DomainCaps as Document>::ROOT => {
                AnyDocument::DomainCaps(host::DomainCaps::unmarshal(xml)?)
            }
            _ => return Err(XmlError::UnknownVariant { entity: "document", raw: name }),
        })
    }

    /// Encode back to XML.
    pub fn marshal(&self) -> Result<String> {
        match self {
            AnyDocument::Domain(doc) => doc.marshal(),
            AnyDocument::Snapshot(doc) => doc.marshal(),
            AnyDocument::Network(doc) => doc.marshal(),
            AnyDocument::NwFilter(doc) => doc.marshal(),
            AnyDocument::Interface(doc) => doc.marshal(),
            AnyDocument::Pool(doc) => doc.marshal(),
            AnyDocument::Volume(doc) => doc.marshal(),
            AnyDocument::NodeDevice(doc) => doc.marshal(),
            AnyDocument::Capabilities(doc) => doc.marshal(),
            AnyDocument::DomainCaps(doc) => doc.marshal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Chardev, ChardevSource, Console, Devices, Disk, DiskBackend, DiskSource, Domain,
        DomainAddress, Hostdev, HostdevCaps, HostdevMode, PciAddress,
    };
    use crate::domain::chardev::ChardevPath;
    use crate::domain::disk::DiskTarget;
    use crate::storage::Size;

    fn sample_domain() -> Domain {
        let disk = Disk {
            device: Some("disk".into()),
            source: Some(DiskSource::file("/var/lib/libvirt/images/demo.qcow2")),
            target: Some(DiskTarget {
                dev: Some("vda".into()),
                bus: Some("virtio".into()),
                ..DiskTarget::default()
            }),
            ..Disk::default()
        };
        let console: Console = Chardev::new(ChardevSource::Pty(ChardevPath::default()));
        Domain {
            hypervisor: Some("kvm".into()),
            name: Some("demo".into()),
            memory: Some(Size {
                unit: Some("KiB".into()),
                value: 1048576,
            }),
            devices: Some(Devices {
                disks: vec![disk],
                consoles: vec![console],
                ..Devices::default()
            }),
            ..Domain::default()
        }
    }

    #[test]
    fn encoding_is_byte_stable() {
        let dom = sample_domain();
        let first = dom.marshal().expect("encode");
        let second = dom.marshal().expect("encode again");
        assert_eq!(first, second);
        let back = Domain::unmarshal(&first).expect("decode");
        assert_eq!(back, dom);
        assert_eq!(back.marshal().expect("re-encode"), first);
    }

    #[test]
    fn file_disk_scenario() {
        let xml = sample_domain().marshal().expect("encode");
        assert!(
            xml.contains(
                "    <disk type=\"file\" device=\"disk\">\n      <source file=\"/var/lib/libvirt/images/demo.qcow2\"/>\n      <target dev=\"vda\" bus=\"virtio\"/>\n    </disk>"
            ),
            "{xml}"
        );
    }

    #[test]
    fn bare_console_is_a_pty() {
        let dom = Domain::unmarshal("<domain type=\"qemu\"><devices><console/></devices></domain>")
            .expect("decode");
        let devices = dom.devices.expect("devices");
        assert!(matches!(
            devices.consoles[0].source,
            Some(ChardevSource::Pty(_))
        ));
    }

    #[test]
    fn pci_address_spelling_survives() {
        let xml = r#"<domain type="kvm">
  <devices>
    <hostdev mode="subsystem" type="pci" managed="yes">
      <source>
        <address domain="0x0000" bus="0x06" slot="0x12" function="0x5"/>
      </source>
      <address type="pci" domain="0x0000" bus="0x01" slot="0x02" function="0x0" multifunction="on"/>
    </hostdev>
  </devices>
</domain>"#;
        let dom = Domain::unmarshal(xml).expect("decode");
        let hostdev = &dom.devices.as_ref().expect("devices").hostdevs[0];
        let mut expected = PciAddress::new(0, 1, 2, 0);
        expected.multifunction = Some("on".into());
        assert_eq!(hostdev.address, Some(DomainAddress::Pci(expected)));
        assert_eq!(dom.marshal().expect("encode"), xml);
    }

    #[test]
    fn unknown_hostdev_capability_keeps_siblings() {
        let dom = Domain::unmarshal(
            r#"<domain type="kvm"><devices>
                <hostdev mode="capabilities" type="gpu"><source><card>0</card></source></hostdev>
                <hostdev mode="capabilities" type="storage"><source><block>/dev/sdf1</block></source></hostdev>
            </devices></domain>"#,
        )
        .expect("decode");
        let hostdevs: Vec<Hostdev> = dom.devices.expect("devices").hostdevs;
        assert_eq!(hostdevs.len(), 2);
        assert_eq!(hostdevs[0].mode, Some(HostdevMode::Capabilities(None)));
        assert_eq!(
            hostdevs[1].mode,
            Some(HostdevMode::Capabilities(Some(HostdevCaps::Storage {
                block: Some("/dev/sdf1".into())
            })))
        );
    }

    #[test]
    fn nested_errors_abort_the_document() {
        let err = Domain::unmarshal(
            r#"<domain type="kvm"><devices><disk type="file"><source file="/a"/></disk><interface type="network"><address type="pci" bus="0xzz"/></interface></devices></domain>"#,
        )
        .expect_err("bad bus");
        match err {
            XmlError::MalformedAttribute { field, raw, .. } => {
                assert_eq!(field, "bus");
                assert_eq!(raw, "0xzz");
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = AnyDocument::parse("<interface name=\"eth0\"/>").expect_err("type is required");
        assert!(matches!(err, XmlError::MissingDiscriminator { .. }), "{err:?}");
    }

    #[test]
    fn dispatch_by_root() {
        let pool = r#"<pool type="dir">
  <name>default</name>
  <target>
    <path>/var/lib/libvirt/images</path>
  </target>
</pool>"#;
        let doc = AnyDocument::parse(pool).expect("decode");
        assert!(matches!(doc, AnyDocument::Pool(_)));
        assert_eq!(doc.marshal().expect("encode"), pool);

        let net = AnyDocument::parse("<network><name>default</name></network>").expect("decode");
        assert!(matches!(net, AnyDocument::Network(_)));

        match AnyDocument::parse("<secret/>") {
            Err(XmlError::UnknownVariant { raw, .. }) => assert_eq!(raw, "secret"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(AnyDocument::parse("  "), Err(XmlError::Empty)));
    }

    #[test]
    fn disk_backend_defaults_to_file() {
        let dom = Domain::unmarshal(
            r#"<domain type="kvm"><devices><disk device="cdrom"><source file="/iso/boot.iso"/></disk></devices></domain>"#,
        )
        .expect("decode");
        let disk = &dom.devices.as_ref().expect("devices").disks[0];
        assert_eq!(
            disk.source.as_ref().map(|s| &s.backend),
            Some(&DiskBackend::File {
                file: Some("/iso/boot.iso".into())
            })
        );
        let xml = dom.marshal().expect("encode");
        assert!(xml.contains("<disk type=\"file\" device=\"cdrom\">"), "{xml}");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_projection_roundtrip() {
        let dom = sample_domain();
        let json = serde_json::to_string(&dom).expect("to json");
        let back: Domain = serde_json::from_str(&json).expect("from json");
        assert_eq!(back, dom);
        assert_eq!(back.marshal().expect("encode"), dom.marshal().expect("encode"));
    }
}
