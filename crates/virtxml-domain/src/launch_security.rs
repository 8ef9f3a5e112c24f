//! `<launchSecurity>`: confidential guest settings.
//!
//! Unlike device unions this one is strict; a missing or unknown `type`
//! fails the whole decode.

use std::io::Write;

use virtxml_codec::{registry, Base, Element, Result, Tag, UintFormat, Union, XmlReader, XmlWriter};

const POLICY_SEV: UintFormat = UintFormat::Hex { width: 4 };
const POLICY_SNP: UintFormat = UintFormat::Hex { width: 8 };

registry! {
    pub enum LaunchSecurityKind for "launch security" {
        carrier: Attribute("type"),
        absent: Required,
        unknown: Reject,
        Sev = "sev",
        SevSnp = "sev-snp",
        S390Pv = "s390-pv",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LaunchSecurity {
    Sev(Sev),
    SevSnp(SevSnp),
    S390Pv,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sev {
    pub kernel_hashes: Option<String>,
    pub cbitpos: Option<u32>,
    pub reduced_phys_bits: Option<u32>,
    pub policy: Option<u32>,
    pub dh_cert: Option<String>,
    pub session: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SevSnp {
    pub kernel_hashes: Option<String>,
    pub author_key: Option<String>,
    pub vcek: Option<String>,
    pub cbitpos: Option<u32>,
    pub reduced_phys_bits: Option<u32>,
    pub policy: Option<u64>,
    pub guest_visible_workarounds: Option<String>,
    pub id_block: Option<String>,
    pub id_auth: Option<String>,
    pub host_data: Option<String>,
}

impl Union for LaunchSecurity {
    type Kind = LaunchSecurityKind;

    fn kind(&self) -> LaunchSecurityKind {
        match self {
            LaunchSecurity::Sev(_) => LaunchSecurityKind::Sev,
            LaunchSecurity::SevSnp(_) => LaunchSecurityKind::SevSnp,
            LaunchSecurity::S390Pv => LaunchSecurityKind::S390Pv,
        }
    }

    fn allocate(kind: LaunchSecurityKind) -> Self {
        match kind {
            LaunchSecurityKind::Sev => LaunchSecurity::Sev(Sev::default()),
            LaunchSecurityKind::SevSnp => LaunchSecurity::SevSnp(SevSnp::default()),
            LaunchSecurityKind::S390Pv => LaunchSecurity::S390Pv,
        }
    }

    fn write_attrs(&self, tag: &mut Tag) {
        match self {
            LaunchSecurity::Sev(sev) => {
                tag.opt("kernelHashes", sev.kernel_hashes.as_deref());
            }
            LaunchSecurity::SevSnp(snp) => {
                tag.opt("kernelHashes", snp.kernel_hashes.as_deref())
                    .opt("authorKey", snp.author_key.as_deref())
                    .opt("vcek", snp.vcek.as_deref());
            }
            LaunchSecurity::S390Pv => {}
        }
    }

    fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        match self {
            LaunchSecurity::Sev(sev) => {
                w.uint_text("cbitpos", sev.cbitpos, UintFormat::Decimal)?;
                w.uint_text("reducedPhysBits", sev.reduced_phys_bits, UintFormat::Decimal)?;
                w.uint_text("policy", sev.policy, POLICY_SEV)?;
                w.opt_text("dhCert", sev.dh_cert.as_deref())?;
                w.opt_text("sesion", sev.session.as_deref())
            }
            LaunchSecurity::SevSnp(snp) => {
                w.uint_text("cbitpos", snp.cbitpos, UintFormat::Decimal)?;
                w.uint_text("reducedPhysBits", snp.reduced_phys_bits, UintFormat::Decimal)?;
                w.uint_text("policy", snp.policy, POLICY_SNP)?;
                w.opt_text("guestVisibleWorkarounds", snp.guest_visible_workarounds.as_deref())?;
                w.opt_text("idBlock", snp.id_block.as_deref())?;
                w.opt_text("idAuth", snp.id_auth.as_deref())?;
                w.opt_text("hostData", snp.host_data.as_deref())
            }
            LaunchSecurity::S390Pv => Ok(()),
        }
    }

    fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
        match self {
            LaunchSecurity::Sev(sev) => sev.kernel_hashes = el.attr("kernelHashes")?,
            LaunchSecurity::SevSnp(snp) => {
                snp.kernel_hashes = el.attr("kernelHashes")?;
                snp.author_key = el.attr("authorKey")?;
                snp.vcek = el.attr("vcek")?;
            }
            LaunchSecurity::S390Pv => {}
        }
        Ok(())
    }

    fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
        match (self, child.name()) {
            (LaunchSecurity::Sev(sev), name) => match name {
                "cbitpos" => sev.cbitpos = Some(r.uint_text(child, Base::Decimal)?),
                "reducedPhysBits" => sev.reduced_phys_bits = Some(r.uint_text(child, Base::Decimal)?),
                "policy" => sev.policy = Some(r.uint_text(child, Base::Hex)?),
                "dhCert" => sev.dh_cert = Some(r.text(child)?),
                "sesion" => sev.session = Some(r.text(child)?),
                _ => return Ok(false),
            },
            (LaunchSecurity::SevSnp(snp), name) => match name {
                "cbitpos" => snp.cbitpos = Some(r.uint_text(child, Base::Decimal)?),
                "reducedPhysBits" => snp.reduced_phys_bits = Some(r.uint_text(child, Base::Decimal)?),
                "policy" => snp.policy = Some(r.uint_text(child, Base::Hex)?),
                "guestVisibleWorkarounds" => snp.guest_visible_workarounds = Some(r.text(child)?),
                "idBlock" => snp.id_block = Some(r.text(child)?),
                "idAuth" => snp.id_auth = Some(r.text(child)?),
                "hostData" => snp.host_data = Some(r.text(child)?),
                _ => return Ok(false),
            },
            (LaunchSecurity::S390Pv, _) => return Ok(false),
        }
        Ok(true)
    }
}

virtxml_codec::union_xml!(LaunchSecurity);

#[cfg(test)]
mod tests {
    use super::*;
    use virtxml_codec::{FromXml, ToXml, XmlError};

    fn decode(xml: &str) -> Result<Option<LaunchSecurity>> {
        let mut r = XmlReader::new(xml);
        let root = r.root()?;
        LaunchSecurity::from_xml(&root, &mut r)
    }

    fn encode(value: &LaunchSecurity) -> String {
        let mut w = XmlWriter::new(Vec::new());
        value.to_xml("launchSecurity", &mut w).expect("encode");
        String::from_utf8(w.into_inner()).expect("utf8")
    }

    #[test]
    fn sev_policy_and_session_quirk() {
        let xml = r#"<launchSecurity type="sev" kernelHashes="yes">
  <cbitpos>47</cbitpos>
  <reducedPhysBits>1</reducedPhysBits>
  <policy>0x0001</policy>
  <dhCert>RBBBSDDD</dhCert>
  <sesion>AAACCCDD</sesion>
</launchSecurity>"#;
        let value = decode(xml).expect("decode").expect("sev");
        match &value {
            LaunchSecurity::Sev(sev) => {
                assert_eq!(sev.policy, Some(1));
                assert_eq!(sev.session.as_deref(), Some("AAACCCDD"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(encode(&value), xml);
    }

    #[test]
    fn snp_policy_is_eight_digits() {
        let value = LaunchSecurity::SevSnp(SevSnp {
            policy: Some(0x30000),
            cbitpos: Some(51),
            ..SevSnp::default()
        });
        assert_eq!(
            encode(&value),
            "<launchSecurity type=\"sev-snp\">\n  <cbitpos>51</cbitpos>\n  <policy>0x00030000</policy>\n</launchSecurity>"
        );
    }

    #[test]
    fn s390_pv_is_bare() {
        let xml = r#"<launchSecurity type="s390-pv"/>"#;
        assert_eq!(decode(xml).expect("decode"), Some(LaunchSecurity::S390Pv));
        assert_eq!(encode(&LaunchSecurity::S390Pv), xml);
    }

    #[test]
    fn strict_discriminator() {
        assert!(matches!(
            decode("<launchSecurity><policy>0x1</policy></launchSecurity>"),
            Err(XmlError::MissingDiscriminator { .. })
        ));
        match decode(r#"<launchSecurity type="tdx"/>"#) {
            Err(XmlError::UnknownVariant { entity, raw }) => {
                assert_eq!(entity, "launch security");
                assert_eq!(raw, "tdx");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
