//! `<filter>` documents: ordered rules and references to other filters.
//!
//! Rule match attributes may hold a parameter reference (`$IP`), a plain
//! string, or a number in decimal or hex. [`FilterValue`] keeps whichever
//! spelling was read so a rule re-encodes the way it was written.

use std::fmt;
use std::io::Write;

use virtxml_codec::{
    is_hex_spelling, parse_uint, registry, Base, Document, Element, FromXml, Registry, Result,
    Tag, ToXml, UintFormat, Union, XmlError, XmlReader, XmlWriter,
};
use virtxml_domain::{FilterParameter, FilterRef};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterValue {
    /// Parameter reference, stored without the leading `$`.
    Var(String),
    Str(String),
    Uint(u64),
    /// Decimal written with leading zeros (`"010"` is ten); `digits` is the
    /// width it was written with.
    PaddedUint { value: u64, digits: usize },
    /// Hex spelling; `digits` is the width it was written with.
    HexUint { value: u64, digits: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Spelling {
    Str,
    Uint,
    /// Numeric when it parses, a symbolic name otherwise (`protocolid="ipv4"`).
    Mixed,
}

impl FilterValue {
    fn read(el: &Element<'_>, key: &str, spelling: Spelling) -> Result<Option<Self>> {
        let Some(raw) = el.attr(key)? else {
            return Ok(None);
        };
        if let Some(var) = raw.strip_prefix('$') {
            return Ok(Some(FilterValue::Var(var.to_string())));
        }
        if spelling == Spelling::Str {
            return Ok(Some(FilterValue::Str(raw)));
        }
        let hex = is_hex_spelling(&raw);
        let base = if hex { Base::Hex } else { Base::Decimal };
        let digits = raw.trim().len();
        match parse_uint(&raw, base) {
            Ok(value) if hex => Ok(Some(FilterValue::HexUint {
                value,
                digits: digits - 2,
            })),
            Ok(value) if digits > 1 && raw.trim().starts_with('0') => {
                Ok(Some(FilterValue::PaddedUint { value, digits }))
            }
            Ok(value) => Ok(Some(FilterValue::Uint(value))),
            Err(_) if spelling == Spelling::Mixed => Ok(Some(FilterValue::Str(raw))),
            Err(_) => Err(XmlError::MalformedAttribute {
                element: el.name().to_string(),
                field: key.to_string(),
                raw,
            }),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Var(name) => write!(f, "${name}"),
            FilterValue::Str(text) => f.write_str(text),
            FilterValue::Uint(value) => write!(f, "{value}"),
            FilterValue::PaddedUint { value, digits } => {
                write!(f, "{value:0width$}", width = *digits)
            }
            FilterValue::HexUint { value, digits } => {
                f.write_str(&UintFormat::Hex { width: *digits }.render(*value))
            }
        }
    }
}

macro_rules! match_attrs {
    (
        $(#[$meta:meta])*
        $name:ident { $( $field:ident: $spelling:ident = $wire:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name {
            $( pub $field: Option<FilterValue>, )+
        }

        impl $name {
            fn write_attrs(&self, tag: &mut Tag) {
                $( tag.display($wire, self.$field.as_ref()); )+
            }

            fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
                $( self.$field = FilterValue::read(el, $wire, Spelling::$spelling)?; )+
                Ok(())
            }
        }
    };
}

match_attrs! {
    /// Ethernet header match.
    MacMatch {
        srcmacaddr: Str = "srcmacaddr",
        srcmacmask: Str = "srcmacmask",
        dstmacaddr: Str = "dstmacaddr",
        dstmacmask: Str = "dstmacmask",
        protocolid: Mixed = "protocolid",
        comment: Str = "comment",
    }
}

match_attrs! {
    VlanMatch {
        srcmacaddr: Str = "srcmacaddr",
        srcmacmask: Str = "srcmacmask",
        dstmacaddr: Str = "dstmacaddr",
        dstmacmask: Str = "dstmacmask",
        vlanid: Uint = "vlanid",
        encap_protocol: Mixed = "encap-protocol",
        comment: Str = "comment",
    }
}

match_attrs! {
    StpMatch {
        srcmacaddr: Str = "srcmacaddr",
        srcmacmask: Str = "srcmacmask",
        stp_type: Uint = "type",
        flags: Uint = "flags",
        root_priority: Uint = "root-priority",
        root_address: Str = "root-address",
        comment: Str = "comment",
    }
}

match_attrs! {
    /// ARP and RARP payload match.
    ArpMatch {
        srcmacaddr: Str = "srcmacaddr",
        srcmacmask: Str = "srcmacmask",
        dstmacaddr: Str = "dstmacaddr",
        dstmacmask: Str = "dstmacmask",
        hwtype: Uint = "hwtype",
        protocoltype: Uint = "protocoltype",
        opcode: Mixed = "opcode",
        arpsrcmacaddr: Str = "arpsrcmacaddr",
        arpdstmacaddr: Str = "arpdstmacaddr",
        arpsrcipaddr: Str = "arpsrcipaddr",
        arpsrcipmask: Str = "arpsrcipmask",
        arpdstipaddr: Str = "arpdstipaddr",
        arpdstipmask: Str = "arpdstipmask",
        gratuitous: Str = "gratuitous",
        comment: Str = "comment",
    }
}

match_attrs! {
    /// IPv4 / IPv6 header match at the ethernet layer.
    IpMatch {
        srcmacaddr: Str = "srcmacaddr",
        srcmacmask: Str = "srcmacmask",
        dstmacaddr: Str = "dstmacaddr",
        dstmacmask: Str = "dstmacmask",
        srcipaddr: Str = "srcipaddr",
        srcipmask: Str = "srcipmask",
        dstipaddr: Str = "dstipaddr",
        dstipmask: Str = "dstipmask",
        protocol: Mixed = "protocol",
        srcportstart: Uint = "srcportstart",
        srcportend: Uint = "srcportend",
        dstportstart: Uint = "dstportstart",
        dstportend: Uint = "dstportend",
        dscp: Uint = "dscp",
        comment: Str = "comment",
    }
}

match_attrs! {
    /// Transport and ICMP matches, shared by the IPv4 and IPv6 families.
    L4Match {
        srcmacaddr: Str = "srcmacaddr",
        srcipaddr: Str = "srcipaddr",
        srcipmask: Str = "srcipmask",
        dstipaddr: Str = "dstipaddr",
        dstipmask: Str = "dstipmask",
        srcipfrom: Str = "srcipfrom",
        srcipto: Str = "srcipto",
        dstipfrom: Str = "dstipfrom",
        dstipto: Str = "dstipto",
        srcportstart: Uint = "srcportstart",
        srcportend: Uint = "srcportend",
        dstportstart: Uint = "dstportstart",
        dstportend: Uint = "dstportend",
        dscp: Uint = "dscp",
        icmp_type: Uint = "type",
        code: Uint = "code",
        flags: Str = "flags",
        connlimit_above: Uint = "connlimit-above",
        state: Str = "state",
        ipset: Str = "ipset",
        ipsetflags: Str = "ipsetflags",
        comment: Str = "comment",
    }
}

registry! {
    pub enum ProtocolKind for "nwfilter rule protocol" {
        carrier: Structural,
        absent: Unset,
        unknown: Skip,
        Mac = "mac",
        Vlan = "vlan",
        Stp = "stp",
        Arp = "arp",
        Rarp = "rarp",
        Ip = "ip",
        Ipv6 = "ipv6",
        Tcp = "tcp",
        Udp = "udp",
        Sctp = "sctp",
        Udplite = "udplite",
        Esp = "esp",
        Ah = "ah",
        Icmp = "icmp",
        Igmp = "igmp",
        All = "all",
        TcpIpv6 = "tcp-ipv6",
        UdpIpv6 = "udp-ipv6",
        SctpIpv6 = "sctp-ipv6",
        UdpliteIpv6 = "udplite-ipv6",
        EspIpv6 = "esp-ipv6",
        AhIpv6 = "ah-ipv6",
        Icmpv6 = "icmpv6",
        AllIpv6 = "all-ipv6",
    }
}

/// The single match element of a rule; its element name is the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RuleProtocol {
    Mac(MacMatch),
    Vlan(VlanMatch),
    Stp(StpMatch),
    Arp(ArpMatch),
    Rarp(ArpMatch),
    Ip(IpMatch),
    Ipv6(IpMatch),
    Tcp(L4Match),
    Udp(L4Match),
    Sctp(L4Match),
    Udplite(L4Match),
    Esp(L4Match),
    Ah(L4Match),
    Icmp(L4Match),
    Igmp(L4Match),
    All(L4Match),
    TcpIpv6(L4Match),
    UdpIpv6(L4Match),
    SctpIpv6(L4Match),
    UdpliteIpv6(L4Match),
    EspIpv6(L4Match),
    AhIpv6(L4Match),
    Icmpv6(L4Match),
    AllIpv6(L4Match),
}

impl RuleProtocol {
    fn l4_mut(&mut self) -> Option<&mut L4Match> {
        use RuleProtocol::*;
        match self {
            Tcp(m) | Udp(m) | Sctp(m) | Udplite(m) | Esp(m) | Ah(m) | Icmp(m) | Igmp(m) | All(m)
            | TcpIpv6(m) | UdpIpv6(m) | SctpIpv6(m) | UdpliteIpv6(m) | EspIpv6(m) | AhIpv6(m)
            | Icmpv6(m) | AllIpv6(m) => Some(m),
            _ => None,
        }
    }

    fn l4(&self) -> Option<&L4Match> {
        use RuleProtocol::*;
        match self {
            Tcp(m) | Udp(m) | Sctp(m) | Udplite(m) | Esp(m) | Ah(m) | Icmp(m) | Igmp(m) | All(m)
            | TcpIpv6(m) | UdpIpv6(m) | SctpIpv6(m) | UdpliteIpv6(m) | EspIpv6(m) | AhIpv6(m)
            | Icmpv6(m) | AllIpv6(m) => Some(m),
            _ => None,
        }
    }
}

impl Union for RuleProtocol {
    type Kind = ProtocolKind;

    fn kind(&self) -> ProtocolKind {
        match self {
            RuleProtocol::Mac(_) => ProtocolKind::Mac,
            RuleProtocol::Vlan(_) => ProtocolKind::Vlan,
            RuleProtocol::Stp(_) => ProtocolKind::Stp,
            RuleProtocol::Arp(_) => ProtocolKind::Arp,
            RuleProtocol::Rarp(_) => ProtocolKind::Rarp,
            RuleProtocol::Ip(_) => ProtocolKind::Ip,
            RuleProtocol::Ipv6(_) => ProtocolKind::Ipv6,
            RuleProtocol::Tcp(_) => ProtocolKind::Tcp,
            RuleProtocol::Udp(_) => ProtocolKind::Udp,
            RuleProtocol::Sctp(_) => ProtocolKind::Sctp,
            RuleProtocol::Udplite(_) => ProtocolKind::Udplite,
            RuleProtocol::Esp(_) => ProtocolKind::Esp,
            RuleProtocol::Ah(_) => ProtocolKind::Ah,
            RuleProtocol::Icmp(_) => ProtocolKind::Icmp,
            RuleProtocol::Igmp(_) => ProtocolKind::Igmp,
            RuleProtocol::All(_) => ProtocolKind::All,
            RuleProtocol::TcpIpv6(_) => ProtocolKind::TcpIpv6,
            RuleProtocol::UdpIpv6(_) => ProtocolKind::UdpIpv6,
            RuleProtocol::SctpIpv6(_) => ProtocolKind::SctpIpv6,
            RuleProtocol::UdpliteIpv6(_) => ProtocolKind::UdpliteIpv6,
            RuleProtocol::EspIpv6(_) => ProtocolKind::EspIpv6,
            RuleProtocol::AhIpv6(_) => ProtocolKind::AhIpv6,
            RuleProtocol::Icmpv6(_) => ProtocolKind::Icmpv6,
            RuleProtocol::AllIpv6(_) => ProtocolKind::AllIpv6,
        }
    }

    fn allocate(kind: ProtocolKind) -> Self {
        let l4 = L4Match::default();
        match kind {
            ProtocolKind::Mac => RuleProtocol::Mac(MacMatch::default()),
            ProtocolKind::Vlan => RuleProtocol::Vlan(VlanMatch::default()),
            ProtocolKind::Stp => RuleProtocol::Stp(StpMatch::default()),
            ProtocolKind::Arp => RuleProtocol::Arp(ArpMatch::default()),
            ProtocolKind::Rarp => RuleProtocol::Rarp(ArpMatch::default()),
            ProtocolKind::Ip => RuleProtocol::Ip(IpMatch::default()),
            ProtocolKind::Ipv6 => RuleProtocol::Ipv6(IpMatch::default()),
            ProtocolKind::Tcp => RuleProtocol::Tcp(l4),
            ProtocolKind::Udp => RuleProtocol::Udp(l4),
            ProtocolKind::Sctp => RuleProtocol::Sctp(l4),
            ProtocolKind::Udplite => RuleProtocol::Udplite(l4),
            ProtocolKind::Esp => RuleProtocol::Esp(l4),
            ProtocolKind::Ah => RuleProtocol::Ah(l4),
            ProtocolKind::Icmp => RuleProtocol::Icmp(l4),
            ProtocolKind::Igmp => RuleProtocol::Igmp(l4),
            ProtocolKind::All => RuleProtocol::All(l4),
            ProtocolKind::TcpIpv6 => RuleProtocol::TcpIpv6(l4),
            ProtocolKind::UdpIpv6 => RuleProtocol::UdpIpv6(l4),
            ProtocolKind::SctpIpv6 => RuleProtocol::SctpIpv6(l4),
            ProtocolKind::UdpliteIpv6 => RuleProtocol::UdpliteIpv6(l4),
            ProtocolKind::EspIpv6 => RuleProtocol::EspIpv6(l4),
            ProtocolKind::AhIpv6 => RuleProtocol::AhIpv6(l4),
            ProtocolKind::Icmpv6 => RuleProtocol::Icmpv6(l4),
            ProtocolKind::AllIpv6 => RuleProtocol::AllIpv6(l4),
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        match self {
            RuleProtocol::Mac(m) => m.write_attrs(tag),
            RuleProtocol::Vlan(m) => m.write_attrs(tag),
            RuleProtocol::Stp(m) => m.write_attrs(tag),
            RuleProtocol::Arp(m) | RuleProtocol::Rarp(m) => m.write_attrs(tag),
            RuleProtocol::Ip(m) | RuleProtocol::Ipv6(m) => m.write_attrs(tag),
            other => {
                if let Some(m) = other.l4() {
                    m.write_attrs(tag);
                }
            }
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        match self {
            RuleProtocol::Mac(m) => m.read_attrs(el),
            RuleProtocol::Vlan(m) => m.read_attrs(el),
            RuleProtocol::Stp(m) => m.read_attrs(el),
            RuleProtocol::Arp(m) | RuleProtocol::Rarp(m) => m.read_attrs(el),
            RuleProtocol::Ip(m) | RuleProtocol::Ipv6(m) => m.read_attrs(el),
            other => match other.l4_mut() {
                Some(m) => m.read_attrs(el),
                None => Ok(()),
            },
        }
    }
}

virtxml_codec::union_xml!(RuleProtocol);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterRule {
    pub action: Option<String>,
    pub direction: Option<String>,
    pub priority: Option<i32>,
    pub statematch: Option<String>,
    pub protocol: Option<RuleProtocol>,
}

registry! {
    pub enum FilterEntryKind for "nwfilter entry" {
        carrier: Structural,
        absent: Unset,
        unknown: Skip,
        Rule = "rule",
        FilterRef = "filterref",
    }
}

/// One ordered child of `<filter>`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterEntry {
    Rule(FilterRule),
    FilterRef(FilterRef),
}

impl Union for FilterEntry {
    type Kind = FilterEntryKind;

    fn kind(&self) -> FilterEntryKind {
        match self {
            FilterEntry::Rule(_) => FilterEntryKind::Rule,
            FilterEntry::FilterRef(_) => FilterEntryKind::FilterRef,
        }
    }

    fn allocate(kind: FilterEntryKind) -> Self {
        match kind {
            FilterEntryKind::Rule => FilterEntry::Rule(FilterRule::default()),
            FilterEntryKind::FilterRef => FilterEntry::FilterRef(FilterRef::default()),
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        match self {
            FilterEntry::Rule(rule) => {
                tag.opt("action", rule.action.as_deref())
                    .opt("direction", rule.direction.as_deref())
                    .display("priority", rule.priority)
                    .opt("statematch", rule.statematch.as_deref());
            }
            FilterEntry::FilterRef(fref) => {
                tag.opt("filter", fref.filter.as_deref());
            }
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            FilterEntry::Rule(rule) => match &rule.protocol {
                Some(protocol) => protocol.to_xml(protocol.kind().as_str(), w),
                None => Ok(()),
            },
            FilterEntry::FilterRef(fref) => {
                for param in &fref.parameters {
                    let mut tag = Tag::new("parameter");
                    tag.opt("name", param.name.as_deref())
                        .opt("value", param.value.as_deref());
                    w.empty(tag)?;
                }
                Ok(())
            }
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        match self {
            FilterEntry::Rule(rule) => {
                rule.action = el.attr("action")?;
                rule.direction = el.attr("direction")?;
                rule.priority = el.parse("priority")?;
                rule.statematch = el.attr("statematch")?;
            }
            FilterEntry::FilterRef(fref) => fref.filter = el.attr("filter")?,
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match self {
            FilterEntry::Rule(rule) => {
                if let Some(protocol) = r.read::<RuleProtocol>(child)? {
                    rule.protocol = Some(protocol);
                }
                Ok(true)
            }
            FilterEntry::FilterRef(fref) => {
                if child.name() == "parameter" {
                    fref.parameters.push(FilterParameter {
                        name: child.attr("name")?,
                        value: child.attr("value")?,
                    });
                }
                Ok(false)
            }
        }
    }
}

virtxml_codec::union_xml!(FilterEntry);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NwFilter {
    pub name: Option<String>,
    pub chain: Option<String>,
    pub priority: Option<i32>,
    pub uuid: Option<String>,
    pub entries: Vec<FilterEntry>,
}

impl ToXml for NwFilter {
    fn to_xml<W: Write>(&self, name: &str, w: &mut XmlWriter<W>) -> Result<()> {
        let mut tag = Tag::new(name);
        tag.opt("name", self.name.as_deref())
            .opt("chain", self.chain.as_deref())
            .display("priority", self.priority);
        w.element(tag, |w| {
            w.opt_text("uuid", self.uuid.as_deref())?;
            for entry in &self.entries {
                entry.to_xml(entry.kind().as_str(), w)?;
            }
            Ok(())
        })
    }
}

impl FromXml for NwFilter {
    fn from_xml<'a>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<Self>> {
        let mut out = NwFilter {
            name: el.attr("name")?,
            chain: el.attr("chain")?,
            priority: el.parse("priority")?,
            ..NwFilter::default()
        };
        r.each_child(el, |r, child| {
            if child.name() == "uuid" {
                out.uuid = Some(r.text(child)?);
            } else {
                out.entries.extend(r.read::<FilterEntry>(child)?);
            }
            Ok(true)
        })?;
        Ok(Some(out))
    }
}

impl Document for NwFilter {
    const ROOT: &'static str = "filter";
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"<filter name="clean-traffic" chain="root" priority="-500">
  <uuid>6ef53069-ba34-94a0-d33d-17751b9b8cb1</uuid>
  <filterref filter="no-mac-spoofing"/>
  <rule action="accept" direction="out" priority="-650">
    <mac protocolid="ipv4"/>
  </rule>
  <rule action="accept" direction="inout" priority="-500">
    <mac protocolid="0x0806"/>
  </rule>
  <rule action="drop" direction="in" statematch="false">
    <tcp srcipaddr="$IP" dstportstart="22" dstportend="0x16" comment="ssh"/>
  </rule>
  <filterref filter="allow-incoming-ipv4">
    <parameter name="IP" value="10.0.0.1"/>
  </filterref>
</filter>"#;

    #[test]
    fn entries_keep_order_and_spelling() {
        let filter = NwFilter::unmarshal(CLEAN).expect("decode");
        assert_eq!(filter.priority, Some(-500));
        assert_eq!(filter.entries.len(), 5);
        assert!(matches!(filter.entries[0], FilterEntry::FilterRef(_)));
        match &filter.entries[2] {
            FilterEntry::Rule(FilterRule {
                protocol: Some(RuleProtocol::Mac(m)),
                ..
            }) => assert_eq!(
                m.protocolid,
                Some(FilterValue::HexUint {
                    value: 0x806,
                    digits: 4
                })
            ),
            other => panic!("unexpected {other:?}"),
        }
        match &filter.entries[3] {
            FilterEntry::Rule(FilterRule {
                protocol: Some(RuleProtocol::Tcp(m)),
                ..
            }) => {
                assert_eq!(m.srcipaddr, Some(FilterValue::Var("IP".into())));
                assert_eq!(m.dstportstart, Some(FilterValue::Uint(22)));
                assert_eq!(
                    m.dstportend,
                    Some(FilterValue::HexUint {
                        value: 22,
                        digits: 2
                    })
                );
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(filter.marshal().expect("encode"), CLEAN);
    }

    #[test]
    fn leading_zero_ports_are_decimal() {
        let xml = "<filter name=\"f\">\n  <rule action=\"accept\" direction=\"in\">\n    <tcp dstportstart=\"010\" dstportend=\"08\"/>\n  </rule>\n</filter>";
        let filter = NwFilter::unmarshal(xml).expect("decode");
        match &filter.entries[0] {
            FilterEntry::Rule(FilterRule {
                protocol: Some(RuleProtocol::Tcp(m)),
                ..
            }) => {
                assert_eq!(
                    m.dstportstart,
                    Some(FilterValue::PaddedUint {
                        value: 10,
                        digits: 3
                    })
                );
                assert_eq!(
                    m.dstportend,
                    Some(FilterValue::PaddedUint {
                        value: 8,
                        digits: 2
                    })
                );
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(filter.marshal().expect("encode"), xml);
    }

    #[test]
    fn symbolic_protocolid_stays_a_string() {
        let filter = NwFilter::unmarshal(
            r#"<filter name="f"><rule action="drop" direction="in"><mac protocolid="arp"/></rule></filter>"#,
        )
        .expect("decode");
        match &filter.entries[0] {
            FilterEntry::Rule(FilterRule {
                protocol: Some(RuleProtocol::Mac(m)),
                ..
            }) => assert_eq!(m.protocolid, Some(FilterValue::Str("arp".into()))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_port_fails() {
        let err = NwFilter::unmarshal(
            r#"<filter name="f"><rule action="drop" direction="in"><udp dstportstart="http"/></rule></filter>"#,
        )
        .unwrap_err();
        match err {
            XmlError::MalformedAttribute { element, field, raw } => {
                assert_eq!(element, "udp");
                assert_eq!(field, "dstportstart");
                assert_eq!(raw, "http");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_protocol_and_entry_are_skipped() {
        let filter = NwFilter::unmarshal(
            r#"<filter name="f"><future/><rule action="accept" direction="out"><quic port="1"/></rule><rule action="drop" direction="in"><all-ipv6/></rule></filter>"#,
        )
        .expect("decode");
        assert_eq!(filter.entries.len(), 2);
        match &filter.entries[0] {
            FilterEntry::Rule(rule) => assert_eq!(rule.protocol, None),
            other => panic!("unexpected {other:?}"),
        }
        match &filter.entries[1] {
            FilterEntry::Rule(rule) => assert_eq!(
                rule.protocol,
                Some(RuleProtocol::AllIpv6(L4Match::default()))
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ipv6_layer4_elements_use_hyphenated_names() {
        let filter = NwFilter {
            name: Some("v6".into()),
            entries: vec![FilterEntry::Rule(FilterRule {
                action: Some("accept".into()),
                direction: Some("in".into()),
                protocol: Some(RuleProtocol::TcpIpv6(L4Match {
                    dstportstart: Some(FilterValue::Var("PORT".into())),
                    ..L4Match::default()
                })),
                ..FilterRule::default()
            })],
            ..NwFilter::default()
        };
        assert_eq!(
            filter.marshal().expect("encode"),
            "<filter name=\"v6\">\n  <rule action=\"accept\" direction=\"in\">\n    <tcp-ipv6 dstportstart=\"$PORT\"/>\n  </rule>\n</filter>"
        );
    }
}
