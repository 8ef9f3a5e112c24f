//! Closed per-union tables mapping discriminator strings to variant kinds.

use std::fmt;

use tracing::debug;

use crate::error::{Result, XmlError};
use crate::reader::Element;

/// Where a union carries its discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Carrier {
    /// An attribute with this name on the element holding the union.
    Attribute(&'static str),
    /// No attribute; the element name itself selects the variant.
    Structural,
}

/// What decode does when the discriminator is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absent<K> {
    /// Assume this variant; encode writes the discriminator explicitly.
    Default(K),
    /// Assume this variant; encode never writes a discriminator for it.
    Implicit(K),
    /// Fail with [`XmlError::MissingDiscriminator`].
    Required,
    /// Leave the union empty.
    Unset,
}

/// What decode does when the discriminator is not in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unknown {
    /// Skip the subtree and leave the union empty.
    Skip,
    /// Fail with [`XmlError::UnknownVariant`].
    Reject,
}

/// Variant kinds of one union entity. Usually declared with [`crate::registry!`].
pub trait Registry: Copy + Eq + fmt::Debug + 'static {
    /// Entity name used in diagnostics.
    const ENTITY: &'static str;
    const CARRIER: Carrier;
    const ABSENT: Absent<Self>;
    const UNKNOWN: Unknown;
    /// Discriminator strings in declaration order.
    const TABLE: &'static [(&'static str, Self)];

    /// Wire spelling of this kind.
    fn as_str(self) -> &'static str;

    fn lookup(raw: &str) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(wire, _)| *wire == raw)
            .map(|(_, kind)| *kind)
    }

    /// Whether encode omits the discriminator for this kind.
    fn is_implicit(self) -> bool {
        matches!(Self::ABSENT, Absent::Implicit(kind) if kind == self)
    }

    /// Apply the absent and unknown policies to a raw discriminator.
    fn resolve(raw: Option<&str>) -> Result<Option<Self>> {
        match raw {
            Some(raw) => match Self::lookup(raw) {
                Some(kind) => Ok(Some(kind)),
                None => match Self::UNKNOWN {
                    Unknown::Skip => {
                        debug!(entity = Self::ENTITY, raw, "skipping unrecognized variant");
                        Ok(None)
                    }
                    Unknown::Reject => Err(XmlError::UnknownVariant {
                        entity: Self::ENTITY,
                        raw: raw.to_string(),
                    }),
                },
            },
            None => match Self::ABSENT {
                Absent::Default(kind) | Absent::Implicit(kind) => Ok(Some(kind)),
                Absent::Required => Err(XmlError::MissingDiscriminator {
                    entity: Self::ENTITY,
                }),
                Absent::Unset => Ok(None),
            },
        }
    }

    /// Raw discriminator as carried by `el`.
    fn discriminator(el: &Element<'_>) -> Result<Option<String>> {
        match Self::CARRIER {
            Carrier::Attribute(key) => el.attr(key),
            Carrier::Structural => Ok(Some(el.name().to_string())),
        }
    }
}

/// Declare a variant-kind enum together with its registry table.
///
/// ```ignore
/// registry! {
///     /// Character device backends.
///     pub enum ChardevKind for "chardev source" {
///         carrier: Attribute("type"),
///         absent: Default(Pty),
///         unknown: Skip,
///         Null = "null",
///         Pty = "pty",
///     }
/// }
/// ```
#[macro_export]
macro_rules! registry {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident for $entity:literal {
            carrier: $carrier:ident $(($key:literal))?,
            absent: $absent:ident $(($default:ident))?,
            unknown: $unknown:ident,
            $( $(#[$vmeta:meta])* $variant:ident = $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $crate::Registry for $name {
            const ENTITY: &'static str = $entity;
            const CARRIER: $crate::Carrier = $crate::Carrier::$carrier $(($key))?;
            const ABSENT: $crate::Absent<Self> = $crate::Absent::$absent $(($name::$default))?;
            const UNKNOWN: $crate::Unknown = $crate::Unknown::$unknown;
            const TABLE: &'static [(&'static str, Self)] = &[ $( ($wire, $name::$variant), )+ ];

            fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $wire, )+
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{Registry, XmlError};

    crate::registry! {
        enum Lenient for "lenient" {
            carrier: Attribute("type"),
            absent: Default(Pty),
            unknown: Skip,
            Null = "null",
            Pty = "pty",
        }
    }

    crate::registry! {
        enum Strict for "strict" {
            carrier: Attribute("type"),
            absent: Required,
            unknown: Reject,
            Sev = "sev",
        }
    }

    crate::registry! {
        enum Quiet for "quiet" {
            carrier: Attribute("protocol"),
            absent: Implicit(Host),
            unknown: Skip,
            Host = "host",
            Iscsi = "iscsi",
        }
    }

    #[test]
    fn table_and_names_agree() {
        for (wire, kind) in Lenient::TABLE {
            assert_eq!(kind.as_str(), *wire);
            assert_eq!(Lenient::lookup(wire), Some(*kind));
        }
        assert_eq!(Lenient::lookup("PTY"), None, "lookup is case sensitive");
    }

    #[test]
    fn absent_policies() {
        assert_eq!(Lenient::resolve(None).expect("default"), Some(Lenient::Pty));
        assert_eq!(Quiet::resolve(None).expect("implicit"), Some(Quiet::Host));
        assert!(Quiet::Host.is_implicit());
        assert!(!Quiet::Iscsi.is_implicit());
        assert!(!Lenient::Pty.is_implicit());
        assert!(matches!(
            Strict::resolve(None),
            Err(XmlError::MissingDiscriminator { entity: "strict" })
        ));
    }

    #[test]
    fn unknown_policies() {
        assert_eq!(Lenient::resolve(Some("future")).expect("skip"), None);
        match Strict::resolve(Some("tdx")) {
            Err(XmlError::UnknownVariant { entity, raw }) => {
                assert_eq!(entity, "strict");
                assert_eq!(raw, "tdx");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
