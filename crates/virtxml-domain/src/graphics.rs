//! `<graphics>` framebuffers and their `<listen>` endpoints.

use std::io::Write;

use virtxml_codec::{registry, Element, Result, Tag, Union, XmlReader, XmlWriter};

registry! {
    pub enum GraphicsKind for "graphics" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        Sdl = "sdl",
        Vnc = "vnc",
        Rdp = "rdp",
        Desktop = "desktop",
        Spice = "spice",
        EglHeadless = "egl-headless",
        Dbus = "dbus",
    }
}

registry! {
    pub enum ListenKind for "graphics listen" {
        carrier: Attribute("type"),
        absent: Unset,
        unknown: Skip,
        Address = "address",
        Network = "network",
        Socket = "socket",
        None = "none",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GraphicsListen {
    Address { address: Option<String> },
    Network { network: Option<String>, address: Option<String> },
    Socket { socket: Option<String> },
    None,
}

impl Union for GraphicsListen {
    type Kind = ListenKind;

    fn kind(&self) -> ListenKind {
        match self {
            GraphicsListen::Address { .. } => ListenKind::Address,
            GraphicsListen::Network { .. } => ListenKind::Network,
            GraphicsListen::Socket { .. } => ListenKind::Socket,
            GraphicsListen::None => ListenKind::None,
        }
    }

    fn allocate(kind: ListenKind) -> Self {
        match kind {
            ListenKind::Address => GraphicsListen::Address { address: None },
            ListenKind::Network => GraphicsListen::Network {
                network: None,
                address: None,
            },
            ListenKind::Socket => GraphicsListen::Socket { socket: None },
            ListenKind::None => GraphicsListen::None,
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        match self {
            GraphicsListen::Address { address } => {
                tag.opt("address", address.as_deref());
            }
            GraphicsListen::Network { network, address } => {
                tag.opt("network", network.as_deref())
                    .opt("address", address.as_deref());
            }
            GraphicsListen::Socket { socket } => {
                tag.opt("socket", socket.as_deref());
            }
            GraphicsListen::None => {}
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        match self {
            GraphicsListen::Address { address } => *address = el.attr("address")?,
            GraphicsListen::Network { network, address } => {
                *network = el.attr("network")?;
                *address = el.attr("address")?;
            }
            GraphicsListen::Socket { socket } => *socket = el.attr("socket")?,
            GraphicsListen::None => {}
        }
        Ok(())
    }
}

virtxml_codec::union_xml!(GraphicsListen);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphicsGl {
    pub enable: Option<String>,
    pub rendernode: Option<String>,
}

impl GraphicsGl {
    fn write<W: Write>(gl: Option<&GraphicsGl>, w: &mut XmlWriter<W>) -> Result<()> {
        match gl {
            Some(gl) => {
                let mut tag = Tag::new("gl");
                tag.opt("enable", gl.enable.as_deref())
                    .opt("rendernode", gl.rendernode.as_deref());
                w.empty(tag)
            }
            None => Ok(()),
        }
    }

    fn read(el: &Element<'_>) -> Result<Self> {
        Ok(GraphicsGl {
            enable: el.attr("enable")?,
            rendernode: el.attr("rendernode")?,
        })
    }
}

/// Remote display protocols that listen on a TCP port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RemoteDisplay {
    /// `-1` asks for automatic allocation.
    pub port: Option<i32>,
    pub tls_port: Option<i32>,
    pub websocket: Option<i32>,
    pub autoport: Option<String>,
    pub keymap: Option<String>,
    pub passwd: Option<String>,
    /// Legacy single-address form of the first `<listen>`.
    pub listen: Option<String>,
    pub default_mode: Option<String>,
    pub multi_user: Option<String>,
    pub listens: Vec<GraphicsListen>,
    pub channels: Vec<SpiceChannel>,
    pub gl: Option<GraphicsGl>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpiceChannel {
    pub name: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalDisplay {
    pub display: Option<String>,
    pub xauth: Option<String>,
    pub fullscreen: Option<String>,
    pub gl: Option<GraphicsGl>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DbusDisplay {
    pub address: Option<String>,
    pub p2p: Option<String>,
    pub gl: Option<GraphicsGl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Graphics {
    Sdl(LocalDisplay),
    Vnc(RemoteDisplay),
    Rdp(RemoteDisplay),
    Desktop(LocalDisplay),
    Spice(RemoteDisplay),
    EglHeadless(GraphicsGl),
    Dbus(DbusDisplay),
}

impl RemoteDisplay {
    fn write_attrs(&self, tag: &mut Tag) {
        tag.display("port", self.port)
            .display("tlsPort", self.tls_port)
            .display("websocket", self.websocket)
            .opt("autoport", self.autoport.as_deref())
            .opt("defaultMode", self.default_mode.as_deref())
            .opt("multiUser", self.multi_user.as_deref())
            .opt("keymap", self.keymap.as_deref())
            .opt("passwd", self.passwd.as_deref())
            .opt("listen", self.listen.as_deref());
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        self.port = el.parse("port")?;
        self.tls_port = el.parse("tlsPort")?;
        self.websocket = el.parse("websocket")?;
        self.autoport = el.attr("autoport")?;
        self.default_mode = el.attr("defaultMode")?;
        self.multi_user = el.attr("multiUser")?;
        self.keymap = el.attr("keymap")?;
        self.passwd = el.attr("passwd")?;
        self.listen = el.attr("listen")?;
        Ok(())
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        w.children("listen", &self.listens)?;
        for channel in &self.channels {
            let mut tag = Tag::new("channel");
            tag.opt("name", channel.name.as_deref())
                .opt("mode", channel.mode.as_deref());
            w.empty(tag)?;
        }
        GraphicsGl::write(self.gl.as_ref(), w)
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match child.name() {
            "listen" => {
                self.listens.extend(r.read::<GraphicsListen>(child)?);
                return Ok(true);
            }
            "channel" => self.channels.push(SpiceChannel {
                name: child.attr("name")?,
                mode: child.attr("mode")?,
            }),
            "gl" => self.gl = Some(GraphicsGl::read(child)?),
            _ => return Ok(false),
        }
        r.skip(child)?;
        Ok(true)
    }
}

impl LocalDisplay {
    fn write_attrs(&self, tag: &mut Tag) {
        tag.opt("display", self.display.as_deref())
            .opt("xauth", self.xauth.as_deref())
            .opt("fullscreen", self.fullscreen.as_deref());
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        self.display = el.attr("display")?;
        self.xauth = el.attr("xauth")?;
        self.fullscreen = el.attr("fullscreen")?;
        Ok(())
    }
}

impl Union for Graphics {
    type Kind = GraphicsKind;

    fn kind(&self) -> GraphicsKind {
        match self {
            Graphics::Sdl(_) => GraphicsKind::Sdl,
            Graphics::Vnc(_) => GraphicsKind::Vnc,
            Graphics::Rdp(_) => GraphicsKind::Rdp,
            Graphics::Desktop(_) => GraphicsKind::Desktop,
            Graphics::Spice(_) => GraphicsKind::Spice,
            Graphics::EglHeadless(_) => GraphicsKind::EglHeadless,
            Graphics::Dbus(_) => GraphicsKind::Dbus,
        }
    }

    fn allocate(kind: GraphicsKind) -> Self {
        match kind {
            GraphicsKind::Sdl => Graphics::Sdl(LocalDisplay::default()),
            GraphicsKind::Vnc => Graphics::Vnc(RemoteDisplay::default()),
            GraphicsKind::Rdp => Graphics::Rdp(RemoteDisplay::default()),
            GraphicsKind::Desktop => Graphics::Desktop(LocalDisplay::default()),
            GraphicsKind::Spice => Graphics::Spice(RemoteDisplay::default()),
            GraphicsKind::EglHeadless => Graphics::EglHeadless(GraphicsGl::default()),
            GraphicsKind::Dbus => Graphics::Dbus(DbusDisplay::default()),
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        match self {
            Graphics::Sdl(local) | Graphics::Desktop(local) => local.write_attrs(tag),
            Graphics::Vnc(remote) | Graphics::Rdp(remote) | Graphics::Spice(remote) => {
                remote.write_attrs(tag)
            }
            Graphics::EglHeadless(_) => {}
            Graphics::Dbus(dbus) => {
                tag.opt("address", dbus.address.as_deref())
                    .opt("p2p", dbus.p2p.as_deref());
            }
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            Graphics::Sdl(local) | Graphics::Desktop(local) => GraphicsGl::write(local.gl.as_ref(), w),
            Graphics::Vnc(remote) | Graphics::Rdp(remote) | Graphics::Spice(remote) => {
                remote.write_body(w)
            }
            Graphics::EglHeadless(gl) => {
                if gl.enable.is_none() && gl.rendernode.is_none() {
                    return Ok(());
                }
                GraphicsGl::write(Some(gl), w)
            }
            Graphics::Dbus(dbus) => GraphicsGl::write(dbus.gl.as_ref(), w),
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        match self {
            Graphics::Sdl(local) | Graphics::Desktop(local) => local.read_attrs(el),
            Graphics::Vnc(remote) | Graphics::Rdp(remote) | Graphics::Spice(remote) => {
                remote.read_attrs(el)
            }
            Graphics::EglHeadless(_) => Ok(()),
            Graphics::Dbus(dbus) => {
                dbus.address = el.attr("address")?;
                dbus.p2p = el.attr("p2p")?;
                Ok(())
            }
        }
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        if let Graphics::Vnc(remote) | Graphics::Rdp(remote) | Graphics::Spice(remote) = self {
            return remote.read_child(child, r);
        }
        if child.name() != "gl" {
            return Ok(false);
        }
        let gl = GraphicsGl::read(child)?;
        match self {
            Graphics::Sdl(local) | Graphics::Desktop(local) => local.gl = Some(gl),
            Graphics::EglHeadless(slot) => *slot = gl,
            Graphics::Dbus(dbus) => dbus.gl = Some(gl),
            _ => {}
        }
        r.skip(child)?;
        Ok(true)
    }
}

virtxml_codec::union_xml!(Graphics);

#[cfg(test)]
mod tests {
    use super::*;
    use virtxml_codec::{FromXml, Registry, ToXml};

    fn encode(g: &Graphics) -> String {
        let mut w = XmlWriter::new(Vec::new());
        g.to_xml("graphics", &mut w).expect("encode");
        String::from_utf8(w.into_inner()).expect("utf8")
    }

    fn decode(xml: &str) -> Option<Graphics> {
        let mut r = XmlReader::new(xml);
        let root = r.root().expect("root");
        Graphics::from_xml(&root, &mut r).expect("decode")
    }

    #[test]
    fn vnc_with_autoport() {
        let xml = r#"<graphics type="vnc" port="-1" autoport="yes" keymap="en-us" listen="0.0.0.0">
  <listen type="address" address="0.0.0.0"/>
</graphics>"#;
        let g = decode(xml).expect("graphics");
        match &g {
            Graphics::Vnc(vnc) => {
                assert_eq!(vnc.port, Some(-1));
                assert_eq!(vnc.listens.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(encode(&g), xml);
    }

    #[test]
    fn spice_channels_and_gl() {
        let xml = r#"<graphics type="spice" port="5900" tlsPort="5901" autoport="no" defaultMode="secure">
  <listen type="network" network="default" address="192.168.122.1"/>
  <channel name="main" mode="secure"/>
  <channel name="inputs" mode="insecure"/>
  <gl enable="no"/>
</graphics>"#;
        assert_eq!(encode(&decode(xml).expect("graphics")), xml);
    }

    #[test]
    fn listen_socket_and_none() {
        let xml = r#"<graphics type="vnc">
  <listen type="socket" socket="/run/vnc.sock"/>
  <listen type="none"/>
</graphics>"#;
        assert_eq!(encode(&decode(xml).expect("graphics")), xml);
    }

    #[test]
    fn every_kind_roundtrips_bare() {
        for (wire, kind) in <GraphicsKind as Registry>::TABLE {
            let g = Graphics::allocate(*kind);
            let xml = encode(&g);
            assert_eq!(xml, format!("<graphics type=\"{wire}\"/>"));
            assert_eq!(decode(&xml), Some(g));
        }
    }

    #[test]
    fn missing_or_unknown_type_is_skipped() {
        assert_eq!(decode(r#"<graphics port="5900"/>"#), None);
        assert_eq!(decode(r#"<graphics type="hologram"><gl/></graphics>"#), None);
    }

    #[test]
    fn egl_headless_rendernode() {
        let xml = "<graphics type=\"egl-headless\">\n  <gl rendernode=\"/dev/dri/renderD128\"/>\n</graphics>";
        assert_eq!(encode(&decode(xml).expect("graphics")), xml);
    }
}
