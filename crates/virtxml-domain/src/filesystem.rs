//! `<filesystem>` devices.

use std::io::Write;

use virtxml_codec::union::{self, read_into};
use virtxml_codec::{
    is_blank, registry, Base, Element, FromXml, Result, Tag, ToXml, UintFormat, Union, XmlReader,
    XmlWriter,
};

use crate::address::DomainAddress;

registry! {
    pub enum FsSourceKind for "filesystem source" {
        carrier: Attribute("type"),
        absent: Default(Mount),
        unknown: Skip,
        Mount = "mount",
        Block = "block",
        File = "file",
        Template = "template",
        Ram = "ram",
        Bind = "bind",
        Volume = "volume",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FsSource {
    Mount { dir: Option<String>, socket: Option<String> },
    Block { dev: Option<String> },
    File { file: Option<String> },
    Template { name: Option<String> },
    Ram { usage: Option<u64>, units: Option<String> },
    Bind { dir: Option<String> },
    Volume { pool: Option<String>, volume: Option<String> },
}

impl Union for FsSource {
    type Kind = FsSourceKind;

    fn kind(&self) -> FsSourceKind {
        match self {
            FsSource::Mount { .. } => FsSourceKind::Mount,
            FsSource::Block { .. } => FsSourceKind::Block,
            FsSource::File { .. } => FsSourceKind::File,
            FsSource::Template { .. } => FsSourceKind::Template,
            FsSource::Ram { .. } => FsSourceKind::Ram,
            FsSource::Bind { .. } => FsSourceKind::Bind,
            FsSource::Volume { .. } => FsSourceKind::Volume,
        }
    }

    fn allocate(kind: FsSourceKind) -> Self {
        match kind {
            FsSourceKind::Mount => FsSource::Mount { dir: None, socket: None },
            FsSourceKind::Block => FsSource::Block { dev: None },
            FsSourceKind::File => FsSource::File { file: None },
            FsSourceKind::Template => FsSource::Template { name: None },
            FsSourceKind::Ram => FsSource::Ram { usage: None, units: None },
            FsSourceKind::Bind => FsSource::Bind { dir: None },
            FsSourceKind::Volume => FsSource::Volume { pool: None, volume: None },
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            FsSource::Mount { dir, socket } => is_blank(dir.as_deref()) && is_blank(socket.as_deref()),
            FsSource::Block { dev } => is_blank(dev.as_deref()),
            FsSource::File { file } => is_blank(file.as_deref()),
            FsSource::Template { name } => is_blank(name.as_deref()),
            FsSource::Ram { usage, .. } => usage.is_none(),
            FsSource::Bind { dir } => is_blank(dir.as_deref()),
            FsSource::Volume { pool, volume } => is_blank(pool.as_deref()) && is_blank(volume.as_deref()),
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        if self.is_blank() {
            return Ok(());
        }
        let mut tag = Tag::new("source");
        match self {
            FsSource::Mount { dir, socket } => {
                tag.opt("dir", dir.as_deref()).opt("socket", socket.as_deref());
            }
            FsSource::Block { dev } => {
                tag.opt("dev", dev.as_deref());
            }
            FsSource::File { file } => {
                tag.opt("file", file.as_deref());
            }
            FsSource::Template { name } => {
                tag.opt("name", name.as_deref());
            }
            FsSource::Ram { usage, units } => {
                tag.uint("usage", *usage, UintFormat::Decimal)
                    .opt("units", units.as_deref());
            }
            FsSource::Bind { dir } => {
                tag.opt("dir", dir.as_deref());
            }
            FsSource::Volume { pool, volume } => {
                tag.opt("pool", pool.as_deref()).opt("volume", volume.as_deref());
            }
        }
        w.empty(tag)
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        if child.name() != "source" {
            return Ok(false);
        }
        match self {
            FsSource::Mount { dir, socket } => {
                *dir = child.attr("dir")?;
                *socket = child.attr("socket")?;
            }
            FsSource::Block { dev } => *dev = child.attr("dev")?,
            FsSource::File { file } => *file = child.attr("file")?,
            FsSource::Template { name } => *name = child.attr("name")?,
            FsSource::Ram { usage, units } => {
                *usage = child.uint("usage", Base::Decimal)?;
                *units = child.attr("units")?;
            }
            FsSource::Bind { dir } => *dir = child.attr("dir")?,
            FsSource::Volume { pool, volume } => {
                *pool = child.attr("pool")?;
                *volume = child.attr("volume")?;
            }
        }
        r.skip(child)?;
        Ok(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FsDriver {
    pub kind: Option<String>,
    pub format: Option<String>,
    pub wrpolicy: Option<String>,
    pub queue: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Filesystem {
    pub accessmode: Option<String>,
    pub multidevs: Option<String>,
    pub driver: Option<FsDriver>,
    pub source: Option<FsSource>,
    pub target: Option<String>,
    pub readonly: bool,
    pub alias: Option<String>,
    pub address: Option<DomainAddress>,
}

impl ToXml for Filesystem {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        union::write_carried(&mut tag, self.source.as_ref());
        tag.opt("accessmode", self.accessmode.as_deref())
            .opt("multidevs", self.multidevs.as_deref());
        w.element(tag, |w| {
            if let Some(driver) = &self.driver {
                let mut tag = Tag::new("driver");
                tag.opt("type", driver.kind.as_deref())
                    .opt("format", driver.format.as_deref())
                    .opt("wrpolicy", driver.wrpolicy.as_deref())
                    .uint("queue", driver.queue, UintFormat::Decimal);
                w.empty(tag)?;
            }
            if let Some(source) = &self.source {
                source.write_body(w)?;
            }
            w.attr_element("target", "dir", self.target.as_deref())?;
            w.flag("readonly", self.readonly)?;
            w.attr_element("alias", "name", self.alias.as_deref())?;
            w.child("address", self.address.as_ref())
        })
    }
}

impl FromXml for Filesystem {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = Filesystem {
            accessmode: el.attr("accessmode")?,
            multidevs: el.attr("multidevs")?,
            source: union::allocate(el)?,
            ..Filesystem::default()
        };
        r.each_child(el, |r, child| {
            if child.name() == "source" {
                return read_into(&mut out.source, child, r);
            }
            match child.name() {
                "driver" => {
                    out.driver = Some(FsDriver {
                        kind: child.attr("type")?,
                        format: child.attr("format")?,
                        wrpolicy: child.attr("wrpolicy")?,
                        queue: child.uint("queue", Base::Decimal)?,
                    })
                }
                "target" => out.target = child.attr("dir")?,
                "readonly" => out.readonly = true,
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

    fn encode(fs: &Filesystem) -> String {
        let mut w = XmlWriter::new(Vec::new());
        fs.to_xml("filesystem", &mut w).expect("encode");
        String::from_utf8(w.into_inner()).expect("utf8")
    }

    fn decode(xml: &str) -> Filesystem {
        let mut r = XmlReader::new(xml);
        let root = r.root().expect("root");
        Filesystem::from_xml(&root, &mut r).expect("decode").expect("filesystem")
    }

    #[test]
    fn virtiofs_mount_roundtrip() {
        let xml = r#"<filesystem type="mount" accessmode="passthrough">
  <driver type="virtiofs" queue="1024"/>
  <source dir="/srv/share"/>
  <target dir="share"/>
  <address type="pci" domain="0x0000" bus="0x00" slot="0x08" function="0x0"/>
</filesystem>"#;
        let fs = decode(xml);
        assert_eq!(
            fs.source,
            Some(FsSource::Mount {
                dir: Some("/srv/share".into()),
                socket: None
            })
        );
        assert_eq!(encode(&fs), xml);
    }

    #[test]
    fn missing_type_is_mount() {
        let fs = decode(r#"<filesystem><source dir="/a"/><target dir="a"/></filesystem>"#);
        assert!(matches!(fs.source, Some(FsSource::Mount { .. })));
        assert!(encode(&fs).starts_with(r#"<filesystem type="mount">"#));
    }

    #[test]
    fn ram_usage_and_blank_source() {
        let xml = r#"<filesystem type="ram">
  <source usage="1024" units="KiB"/>
  <target dir="/tmp"/>
</filesystem>"#;
        assert_eq!(encode(&decode(xml)), xml);

        let fs = Filesystem {
            source: Some(FsSource::allocate(FsSourceKind::Template)),
            target: Some("/".into()),
            ..Filesystem::default()
        };
        assert_eq!(
            encode(&fs),
            "<filesystem type=\"template\">\n  <target dir=\"/\"/>\n</filesystem>"
        );
    }
}
