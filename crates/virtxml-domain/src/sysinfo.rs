//! `<sysinfo>` blocks exposed to the guest firmware.

use std::io::Write;

use virtxml_codec::{
    registry, Element, FromXml, Result, Tag, ToXml, Union, XmlReader, XmlWriter,
};

registry! {
    pub enum SysinfoKind for "sysinfo" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        Smbios = "smbios",
        Fwcfg = "fwcfg",
    }
}

/// `<entry name="...">value</entry>`; fw_cfg entries may point at a file instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SysinfoEntry {
    pub name: Option<String>,
    pub file: Option<String>,
    pub value: Option<String>,
}

impl ToXml for SysinfoEntry {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("name", self.name.as_deref())
            .opt("file", self.file.as_deref());
        w.element(tag, |w| match &self.value {
            Some(value) => w.text(value),
            None => Ok(()),
        })
    }
}

impl FromXml for SysinfoEntry {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let name = el.attr("name")?;
        let file = el.attr("file")?;
        let value = r.text(el)?;
        Ok(Some(SysinfoEntry {
            name,
            file,
            value: (!value.is_empty()).then_some(value),
        }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Smbios {
    pub bios: Vec<SysinfoEntry>,
    pub system: Vec<SysinfoEntry>,
    pub base_boards: Vec<Vec<SysinfoEntry>>,
    pub chassis: Vec<SysinfoEntry>,
    pub oem_strings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sysinfo {
    Smbios(Smbios),
    Fwcfg(Vec<SysinfoEntry>),
}

fn write_group<W: Write>(name: &str, entries: &[SysinfoEntry], w: &mut XmlWriter<W>) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    w.element(Tag::new(name), |w| w.children("entry", entries))
}

fn read_group<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Vec<SysinfoEntry>> {
    let mut out = Vec::new();
    r.each_child(el, |r, child| {
        if child.name() != "entry" {
            return Ok(false);
        }
        out.extend(r.read::<SysinfoEntry>(child)?);
        Ok(true)
    })?;
    Ok(out)
}

impl Union for Sysinfo {
    type Kind = SysinfoKind;

    fn kind(&self) -> SysinfoKind {
        match self {
            Sysinfo::Smbios(_) => SysinfoKind::Smbios,
            Sysinfo::Fwcfg(_) => SysinfoKind::Fwcfg,
        }
    }

    fn allocate(kind: SysinfoKind) -> Self {
        match kind {
            SysinfoKind::Smbios => Sysinfo::Smbios(Smbios::default()),
            SysinfoKind::Fwcfg => Sysinfo::Fwcfg(Vec::new()),
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            Sysinfo::Smbios(smbios) => {
                write_group("bios", &smbios.bios, w)?;
                write_group("system", &smbios.system, w)?;
                for board in &smbios.base_boards {
                    write_group("baseBoard", board, w)?;
                }
                write_group("chassis", &smbios.chassis, w)?;
                if smbios.oem_strings.is_empty() {
                    return Ok(());
                }
                w.element(Tag::new("oemStrings"), |w| {
                    for value in &smbios.oem_strings {
                        w.text_element("entry", value)?;
                    }
                    Ok(())
                })
            }
            Sysinfo::Fwcfg(entries) => w.children("entry", entries),
        }
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match self {
            Sysinfo::Smbios(smbios) => match child.name() {
                "bios" => smbios.bios = read_group(child, r)?,
                "system" => smbios.system = read_group(child, r)?,
                "baseBoard" => smbios.base_boards.push(read_group(child, r)?),
                "chassis" => smbios.chassis = read_group(child, r)?,
                "oemStrings" => {
                    let values = read_group(child, r)?;
                    smbios.oem_strings = values.into_iter().filter_map(|e| e.value).collect();
                }
                _ => return Ok(false),
            },
            Sysinfo::Fwcfg(entries) => {
                if child.name() != "entry" {
                    return Ok(false);
                }
                entries.extend(r.read::<SysinfoEntry>(child)?);
            }
        }
        Ok(true)
    }
}

virtxml_codec::union_xml!(Sysinfo);

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(xml: &str) -> Sysinfo {
        let mut r = XmlReader::new(xml);
        let root = r.root().expect("root");
        let value = Sysinfo::from_xml(&root, &mut r).expect("decode").expect("sysinfo");
        let mut w = XmlWriter::new(Vec::new());
        value.to_xml("sysinfo", &mut w).expect("encode");
        assert_eq!(String::from_utf8(w.into_inner()).expect("utf8"), xml);
        value
    }

    #[test]
    fn smbios_groups() {
        let value = roundtrip(
            r#"<sysinfo type="smbios">
  <bios>
    <entry name="vendor">LENOVO</entry>
  </bios>
  <system>
    <entry name="manufacturer">Fedora</entry>
    <entry name="uuid">c7a5fdbd-edaf-9455-926a-d65c16db1809</entry>
  </system>
  <baseBoard>
    <entry name="product">20BE0061MC</entry>
  </baseBoard>
  <oemStrings>
    <entry>myappname:some arbitrary data</entry>
  </oemStrings>
</sysinfo>"#,
        );
        match value {
            Sysinfo::Smbios(smbios) => {
                assert_eq!(smbios.system.len(), 2);
                assert_eq!(smbios.oem_strings, ["myappname:some arbitrary data"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fwcfg_entries() {
        roundtrip(
            r#"<sysinfo type="fwcfg">
  <entry name="opt/com.example/name">example value</entry>
  <entry name="opt/com.coreos/config" file="/tmp/provision.ign"/>
</sysinfo>"#,
        );
    }
}
