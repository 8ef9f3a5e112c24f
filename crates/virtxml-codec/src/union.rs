//! Generic encode/decode for discriminated unions.
//!
//! A union is an element (or part of one) whose shape is selected by a
//! discriminator resolved through its [`Registry`]. Two layouts occur:
//!
//! * self-carried: the discriminator sits on the union's own element, e.g.
//!   `<address type="pci" .../>`; use [`write_union`] / [`read_union`]
//!   (or the [`crate::union_xml!`] macro).
//! * parent-carried: the discriminator sits on an enclosing element and the
//!   variant body lives in children of it, e.g. `<disk type="file">` with a
//!   `<source file=.../>` child; the enclosing element calls [`allocate`],
//!   [`read_into`], [`write_carried`] and [`Union::write_body`] itself.

use std::io::Write;

use crate::error::Result;
use crate::reader::{Element, XmlReader};
use crate::registry::{Carrier, Registry};
use crate::writer::{Tag, XmlWriter};

/// One union entity together with its variant table.
pub trait Union: Sized {
    type Kind: Registry;

    fn kind(&self) -> Self::Kind;

    /// A fresh variant of `kind` with every field unset.
    fn allocate(kind: Self::Kind) -> Self;

    /// Variant implied by other attributes when the discriminator is absent.
    fn infer(_el: &Element<'_>) -> Result<Option<Self::Kind>> {
        Ok(None)
    }

    /// Omission rule: a blank union writes no body element.
    fn is_blank(&self) -> bool {
        false
    }

    /// Variant attributes on the carrier element, after the discriminator.
    fn write_attrs(&self, _tag: &mut Tag) {}

    /// Variant children in their fixed order.
    fn write_body<W: Write>(&self, _w: &mut XmlWriter<W>) -> Result<()> {
        Ok(())
    }

    fn read_attrs(&mut self, _el: &Element<'_>) -> Result<()> {
        Ok(())
    }

    /// Decode one child into the variant; `false` leaves it to the caller.
    fn read_child<'a>(&mut self, _child: &Element<'a>, _r: &mut XmlReader<'a>) -> Result<bool> {
        Ok(false)
    }
}

/// Resolve the variant kind for `el` following the registry policies.
pub fn resolve<U: Union>(el: &Element<'_>) -> Result<Option<U::Kind>> {
    let raw = U::Kind::discriminator(el)?;
    if raw.is_none() {
        if let Some(kind) = U::infer(el)? {
            return Ok(Some(kind));
        }
    }
    U::Kind::resolve(raw.as_deref())
}

/// Resolve, allocate and read the variant attributes carried by `el`.
pub fn allocate<U: Union>(el: &Element<'_>) -> Result<Option<U>> {
    match resolve::<U>(el)? {
        Some(kind) => {
            let mut value = U::allocate(kind);
            value.read_attrs(el)?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Offer `child` to a parent-carried union, if one was allocated.
pub fn read_into<'a, U: Union>(
    value: &mut Option<U>,
    child: &Element<'a>,
    r: &mut XmlReader<'a>,
) -> Result<bool> {
    match value {
        Some(value) => value.read_child(child, r),
        None => Ok(false),
    }
}

/// Write the discriminator and variant attributes of a parent-carried union.
pub fn write_carried<U: Union>(tag: &mut Tag, value: Option<&U>) {
    if let Some(value) = value {
        write_discriminator(tag, value);
        value.write_attrs(tag);
    }
}

/// Write only the discriminator, for parents that interleave their own
/// attributes before the variant's.
pub fn write_discriminator<U: Union>(tag: &mut Tag, value: &U) {
    push_discriminator(tag, value.kind());
}

fn push_discriminator<K: Registry>(tag: &mut Tag, kind: K) {
    if let Carrier::Attribute(key) = K::CARRIER {
        if !kind.is_implicit() {
            tag.attr(key, kind.as_str());
        }
    }
}

/// Encode a self-carried union as element `name`.
///
/// Structural unions ignore `name` and use the variant's own element name.
pub fn write_union<U: Union, W: Write>(name: &str, value: &U, w: &mut XmlWriter<W>) -> Result<()> {
    if value.is_blank() {
        return Ok(());
    }
    let kind = value.kind();
    let mut tag = match U::Kind::CARRIER {
        Carrier::Structural => Tag::new(kind.as_str()),
        Carrier::Attribute(_) => Tag::new(name),
    };
    push_discriminator(&mut tag, kind);
    value.write_attrs(&mut tag);
    w.element(tag, |w| value.write_body(w))
}

/// Decode a self-carried union from `el`, skipping it when unresolved.
pub fn read_union<'a, U: Union>(el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<Option<U>> {
    let Some(mut value) = allocate::<U>(el)? else {
        r.skip(el)?;
        return Ok(None);
    };
    read_children(&mut value, el, r)?;
    Ok(Some(value))
}

/// Stream every child of `el` into `value`, skipping the ones it declines.
pub fn read_children<'a, U: Union>(value: &mut U, el: &Element<'a>, r: &mut XmlReader<'a>) -> Result<()> {
    while let Some(child) = r.next_child(el)? {
        if !value.read_child(&child, r)? {
            r.skip(&child)?;
        }
    }
    Ok(())
}

/// Implement [`crate::ToXml`] and [`crate::FromXml`] for self-carried unions.
#[macro_export]
macro_rules! union_xml {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::ToXml for $ty {
            fn to_xml<W: ::std::io::Write>(
                &self,
                name: &str,
                w: &mut $crate::XmlWriter<W>,
            ) -> $crate::Result<()> {
                $crate::union::write_union(name, self, w)
            }
        }

        impl $crate::FromXml for $ty {
            fn from_xml<'a>(
                el: &$crate::Element<'a>,
                r: &mut $crate::XmlReader<'a>,
            ) -> $crate::Result<::std::option::Option<Self>> {
                $crate::union::read_union(el, r)
            }
        }
    )+};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{Base, UintFormat};
    use crate::{FromXml, ToXml, XmlError};

    crate::registry! {
        enum BackendKind for "backend" {
            carrier: Attribute("type"),
            absent: Default(File),
            unknown: Skip,
            File = "file",
            Memory = "memory",
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Backend {
        File { path: Option<String> },
        Memory { size: Option<u64> },
    }

    impl Union for Backend {
        type Kind = BackendKind;

        fn kind(&self) -> BackendKind {
            match self {
                Backend::File { .. } => BackendKind::File,
                Backend::Memory { .. } => BackendKind::Memory,
            }
        }

        fn allocate(kind: BackendKind) -> Self {
            match kind {
                BackendKind::File => Backend::File { path: None },
                BackendKind::Memory => Backend::Memory { size: None },
            }
        }

        fn is_blank(&self) -> bool {
            matches!(self, Backend::File { path: None })
        }

        fn write_attrs(&self, tag: &mut Tag) {
            if let Backend::Memory { size } = self {
                tag.uint("size", *size, UintFormat::HEX);
            }
        }

        fn write_body<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
            if let Backend::File { path } = self {
                w.opt_text("path", path.as_deref())?;
            }
            Ok(())
        }

        fn read_attrs(&mut self, el: &Element<'_>) -> Result<()> {
            if let Backend::Memory { size } = self {
                *size = el.uint("size", Base::Hex)?;
            }
            Ok(())
        }

        fn read_child<'a>(&mut self, child: &Element<'a>, r: &mut XmlReader<'a>) -> Result<bool> {
            match (self, child.name()) {
                (Backend::File { path }, "path") => *path = Some(r.text(child)?),
                _ => return Ok(false),
            }
            Ok(true)
        }
    }

    crate::union_xml!(Backend);

    fn encode(value: &Backend) -> String {
        let mut w = XmlWriter::new(Vec::new());
        value.to_xml("backend", &mut w).expect("encode");
        String::from_utf8(w.into_inner()).expect("utf8")
    }

    fn decode(xml: &str) -> Result<Option<Backend>> {
        let mut r = XmlReader::new(xml);
        let root = r.root()?;
        Backend::from_xml(&root, &mut r)
    }

    #[test]
    fn self_carried_roundtrip() {
        let value = Backend::Memory { size: Some(4096) };
        let xml = encode(&value);
        assert_eq!(xml, r#"<backend type="memory" size="0x1000"/>"#);
        assert_eq!(decode(&xml).expect("decode"), Some(value));

        let value = Backend::File {
            path: Some("/dev/urandom".into()),
        };
        let xml = encode(&value);
        assert_eq!(xml, "<backend type=\"file\">\n  <path>/dev/urandom</path>\n</backend>");
        assert_eq!(decode(&xml).expect("decode"), Some(value));
    }

    #[test]
    fn blank_variant_is_omitted() {
        assert_eq!(encode(&Backend::File { path: None }), "");
    }

    #[test]
    fn missing_discriminator_uses_default() {
        let value = decode("<backend><path>/x</path><junk/></backend>").expect("decode");
        assert_eq!(
            value,
            Some(Backend::File {
                path: Some("/x".into())
            })
        );
    }

    #[test]
    fn unknown_discriminator_is_skipped() {
        let xml = "<backends><backend type=\"tape\"><path>/x</path></backend><backend type=\"memory\"/></backends>";
        let mut r = XmlReader::new(xml);
        let root = r.root().expect("root");
        let mut found = Vec::new();
        while let Some(child) = r.next_child(&root).expect("child") {
            found.push(Backend::from_xml(&child, &mut r).expect("lenient"));
        }
        assert_eq!(found, vec![None, Some(Backend::Memory { size: None })]);
    }

    #[test]
    fn malformed_variant_attribute_fails() {
        let err = decode(r#"<backend type="memory" size="0xgg"/>"#).unwrap_err();
        assert!(matches!(err, XmlError::MalformedAttribute { .. }));
    }
}
