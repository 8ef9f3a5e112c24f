//! `<smartcard>` and `<redirdev>` devices. Both can forward a guest USB
//! endpoint through a character device.

use std::io::Write;

use virtxml_codec::union::{self, read_into};
use virtxml_codec::{registry, Base, Element, FromXml, Result, Tag, ToXml, Union, XmlReader, XmlWriter};

use crate::address::DomainAddress;
use crate::chardev::ChardevSource;

registry! {
    pub enum SmartcardModeKind for "smartcard" {
        carrier: Attribute("mode"),
        absent: Unset,
        unknown: Skip,
        Host = "host",
        HostCertificates = "host-certificates",
        Passthrough = "passthrough",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SmartcardMode {
    Host,
    HostCertificates {
        certificates: Vec<String>,
        database: Option<String>,
    },
    /// The character device kind is the `type` attribute next to `mode`.
    Passthrough(Option<ChardevSource>),
}

impl Union for SmartcardMode {
    type Kind = SmartcardModeKind;

    fn kind(&self) -> SmartcardModeKind {
        match self {
            SmartcardMode::Host => SmartcardModeKind::Host,
            SmartcardMode::HostCertificates { .. } => SmartcardModeKind::HostCertificates,
            SmartcardMode::Passthrough(_) => SmartcardModeKind::Passthrough,
        }
    }

    fn allocate(kind: SmartcardModeKind) -> Self {
        match kind {
            SmartcardModeKind::Host => SmartcardMode::Host,
            SmartcardModeKind::HostCertificates => SmartcardMode::HostCertificates {
                certificates: Vec::new(),
                database: None,
            },
            SmartcardModeKind::Passthrough => SmartcardMode::Passthrough(None),
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        if let SmartcardMode::Passthrough(source) = self {
            union::write_carried(tag, source.as_ref());
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            SmartcardMode::Host => Ok(()),
            SmartcardMode::HostCertificates {
                certificates,
                database,
            } => {
                for cert in certificates {
                    w.text_element("certificate", cert)?;
                }
                w.opt_text("database", database.as_deref())
            }
            SmartcardMode::Passthrough(source) => match source {
                Some(source) => source.write_body(w),
                None => Ok(()),
            },
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        if let SmartcardMode::Passthrough(source) = self {
            *source = union::allocate(el)?;
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match self {
            SmartcardMode::HostCertificates {
                certificates,
                database,
            } => {
                match child.name() {
                    "certificate" => certificates.push(r.text(child)?),
                    "database" => *database = Some(r.text(child)?),
                    _ => return Ok(false),
                }
                Ok(true)
            }
            SmartcardMode::Passthrough(source) => read_into(source, child, r),
            SmartcardMode::Host => Ok(false),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Smartcard {
    pub mode: Option<SmartcardMode>,
    pub alias: Option<String>,
    pub address: Option<DomainAddress>,
}

impl ToXml for Smartcard {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        union::write_carried(&mut tag, self.mode.as_ref());
        w.element(tag, |w| {
            if let Some(mode) = &self.mode {
                mode.write_body(w)?;
            }
            w.attr_element("alias", "name", self.alias.as_deref())?;
            w.child("address", self.address.as_ref())
        })
    }
}

impl FromXml for Smartcard {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Smartcard {
            mode: union::allocate(el)?,
            ..Smartcard::default()
        };
        r.each_child(el, |r, child| {
            if read_into(&mut out.mode, child, r)? {
                return Ok(true);
            }
            match child.name() {
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

/// USB redirection over a character device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Redirdev {
    pub bus: Option<String>,
    pub source: Option<ChardevSource>,
    pub boot_order: Option<u32>,
    pub alias: Option<String>,
    pub address: Option<DomainAddress>,
}

impl ToXml for Redirdev {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("bus", self.bus.as_deref());
        union::write_carried(&mut tag, self.source.as_ref());
        w.element(tag, |w| {
            if let Some(source) = &self.source {
                source.write_body(w)?;
            }
            if let Some(order) = self.boot_order {
                w.attr_element("boot", "order", Some(&order.to_string()))?;
            }
            w.attr_element("alias", "name", self.alias.as_deref())?;
            w.child("address", self.address.as_ref())
        })
    }
}

impl FromXml for Redirdev {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Redirdev {
            bus: el.attr("bus")?,
            source: union::allocate(el)?,
            ..Redirdev::default()
        };
        r.each_child(el, |r, child| {
            if read_into(&mut out.source, child, r)? {
                return Ok(true);
            }
            match child.name() {
                "boot" => out.boot_order = child.uint("order", Base::Decimal)?,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chardev::ChardevTcp;

    fn roundtrip<T: ToXml + FromXml>(name: &str, xml: &str) -> T {
        let mut r = XmlReader::new(xml);
        let root = r.root().expect("root");
        let value = T::from_xml(&root, &mut r).expect("decode").expect("value");
        let mut w = XmlWriter::new(Vec::new());
        value.to_xml(name, &mut w).expect("encode");
        assert_eq!(String::from_utf8(w.into_inner()).expect("utf8"), xml);
        value
    }

    #[test]
    fn host_certificates() {
        let card: Smartcard = roundtrip(
            "smartcard",
            r#"<smartcard mode="host-certificates">
  <certificate>cert1</certificate>
  <certificate>cert2</certificate>
  <certificate>cert3</certificate>
  <database>/etc/pki/nssdb/</database>
  <address type="ccid" controller="0" slot="0"/>
</smartcard>"#,
        );
        match card.mode {
            Some(SmartcardMode::HostCertificates { certificates, .. }) => assert_eq!(certificates.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn passthrough_carries_chardev_type() {
        let card: Smartcard = roundtrip(
            "smartcard",
            r#"<smartcard mode="passthrough" type="tcp">
  <source mode="connect" host="127.0.0.1" service="2001"/>
  <protocol type="raw"/>
</smartcard>"#,
        );
        match card.mode {
            Some(SmartcardMode::Passthrough(Some(ChardevSource::Tcp(ChardevTcp { protocol, .. })))) => {
                assert_eq!(protocol.as_deref(), Some("raw"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn host_mode_is_bare() {
        let _: Smartcard = roundtrip("smartcard", r#"<smartcard mode="host"/>"#);
    }

    #[test]
    fn redirdev_spicevmc() {
        let dev: Redirdev = roundtrip(
            "redirdev",
            r#"<redirdev bus="usb" type="spicevmc">
  <boot order="3"/>
  <alias name="redir0"/>
  <address type="usb" bus="0" port="3"/>
</redirdev>"#,
        );
        assert_eq!(dev.source, Some(ChardevSource::SpiceVmc));
    }
}
