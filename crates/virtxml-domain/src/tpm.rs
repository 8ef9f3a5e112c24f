//! `<tpm>` devices.

use std::io::Write;

use virtxml_codec::{registry, Element, FromXml, Result, Tag, ToXml, Union, XmlReader, XmlWriter};

use crate::address::DomainAddress;

registry! {
    pub enum TpmBackendKind for "tpm backend" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        Passthrough = "passthrough",
        Emulator = "emulator",
        External = "external",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TpmBackend {
    Passthrough { device: Option<String> },
    Emulator(TpmEmulator),
    External { source_type: Option<String>, mode: Option<String>, path: Option<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TpmEmulator {
    pub version: Option<String>,
    pub persistent_state: Option<String>,
    pub encryption_secret: Option<String>,
    /// Hash names under `<active_pcr_banks>`, e.g. `sha256`.
    pub active_pcr_banks: Vec<String>,
}

impl Union for TpmBackend {
    type Kind = TpmBackendKind;

    fn kind(&self) -> TpmBackendKind {
        match self {
            TpmBackend::Passthrough { .. } => TpmBackendKind::Passthrough,
            TpmBackend::Emulator(_) => TpmBackendKind::Emulator,
            TpmBackend::External { .. } => TpmBackendKind::External,
        }
    }

    fn allocate(kind: TpmBackendKind) -> Self {
        match kind {
            TpmBackendKind::Passthrough => TpmBackend::Passthrough { device: None },
            TpmBackendKind::Emulator => TpmBackend::Emulator(TpmEmulator::default()),
            TpmBackendKind::External => TpmBackend::External {
                source_type: None,
                mode: None,
                path: None,
            },
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        if let TpmBackend::Emulator(emu) = self {
            tag.opt("version", emu.version.as_deref())
                .opt("persistent_state", emu.persistent_state.as_deref());
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            TpmBackend::Passthrough { device } => w.attr_element("device", "path", device.as_deref()),
            TpmBackend::Emulator(emu) => {
                w.attr_element("encryption", "secret", emu.encryption_secret.as_deref())?;
                if emu.active_pcr_banks.is_empty() {
                    return Ok(());
                }
                w.element(Tag::new("active_pcr_banks"), |w| {
                    for bank in &emu.active_pcr_banks {
                        w.flag(bank, true)?;
                    }
                    Ok(())
                })
            }
            TpmBackend::External {
                source_type,
                mode,
                path,
            } => {
                let mut tag = Tag::new("source");
                tag.opt("type", source_type.as_deref())
                    .opt("mode", mode.as_deref())
                    .opt("path", path.as_deref());
                if tag.is_bare() {
                    return Ok(());
                }
                w.empty(tag)
            }
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        if let TpmBackend::Emulator(emu) = self {
            emu.version = el.attr("version")?;
            emu.persistent_state = el.attr("persistent_state")?;
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match (self, child.name()) {
            (TpmBackend::Passthrough { device }, "device") => *device = child.attr("path")?,
            (TpmBackend::Emulator(emu), "encryption") => {
                emu.encryption_secret = child.attr("secret")?
            }
            (TpmBackend::Emulator(emu), "active_pcr_banks") => {
                r.each_child(child, |_, bank| {
                    emu.active_pcr_banks.push(bank.name().to_string());
                    Ok(false)
                })?;
                return Ok(true);
            }
            (
                TpmBackend::External {
                    source_type,
                    mode,
                    path,
                },
                "source",
            ) => {
                *source_type = child.attr("type")?;
                *mode = child.attr("mode")?;
                *path = child.attr("path")?;
            }
            _ => return Ok(false),
        }
        r.skip(child)?;
        Ok(true)
    }
}

virtxml_codec::union_xml!(TpmBackend);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tpm {
    pub model: Option<String>,
    pub backend: Option<TpmBackend>,
    pub alias: Option<String>,
    pub address: Option<DomainAddress>,
}

impl ToXml for Tpm {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("model", self.model.as_deref());
        w.element(tag, |w| {
            w.child("backend", self.backend.as_ref())?;
            w.attr_element("alias", "name", self.alias.as_deref())?;
            w.child("address", self.address.as_ref())
        })
    }
}

impl FromXml for Tpm {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Tpm {
            model: el.attr("model")?,
            ..Tpm::default()
        };
        r.each_child(el, |r, child| {
            match child.name() {
                "backend" => out.backend = r.read(child)?,
                "address" => out.address = r.read(child)?,
                "alias" => {
                    out.alias = child.attr("name")?;
                    return Ok(false);
                }
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

    fn roundtrip(xml: &str) -> Tpm {
        let mut r = XmlReader::new(xml);
        let root = r.root().expect("root");
        let tpm = Tpm::from_xml(&root, &mut r).expect("decode").expect("tpm");
        let mut w = XmlWriter::new(Vec::new());
        tpm.to_xml("tpm", &mut w).expect("encode");
        assert_eq!(String::from_utf8(w.into_inner()).expect("utf8"), xml);
        tpm
    }

    #[test]
    fn emulator_with_pcr_banks() {
        let tpm = roundtrip(
            r#"<tpm model="tpm-crb">
  <backend type="emulator" version="2.0" persistent_state="yes">
    <encryption secret="6dd3e4a5-1d76-44ce-961f-f119f5aad935"/>
    <active_pcr_banks>
      <sha256/>
      <sha384/>
    </active_pcr_banks>
  </backend>
</tpm>"#,
        );
        match tpm.backend {
            Some(TpmBackend::Emulator(emu)) => assert_eq!(emu.active_pcr_banks, ["sha256", "sha384"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn passthrough_and_external() {
        roundtrip(
            r#"<tpm model="tpm-tis">
  <backend type="passthrough">
    <device path="/dev/tpm0"/>
  </backend>
</tpm>"#,
        );
        roundtrip(
            r#"<tpm model="tpm-tis">
  <backend type="external">
    <source type="unix" mode="connect" path="/tmp/swtpm.sock"/>
  </backend>
</tpm>"#,
        );
    }
}
