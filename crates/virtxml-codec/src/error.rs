use std::io;
use std::sync::Arc;

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

/// Errors produced while encoding or decoding a document.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The input is not well-formed XML.
    #[error("xml: {0}")]
    Xml(quick_xml::Error),
    /// The underlying reader or writer failed.
    #[error("io: {0}")]
    Io(#[source] Arc<io::Error>),
    /// Numeric text failed to parse under the field's declared base.
    #[error("malformed attribute {field}={raw:?} on <{element}>")]
    MalformedAttribute {
        element: String,
        field: String,
        raw: String,
    },
    /// A strict union lacked its required discriminator.
    #[error("missing discriminator for {entity}")]
    MissingDiscriminator { entity: &'static str },
    /// The discriminator value is not part of the union's vocabulary.
    #[error("unknown {entity} variant {raw:?}")]
    UnknownVariant { entity: &'static str, raw: String },
    /// The document root is not the element the target type expects.
    #[error("expected <{expected}> document, found <{found}>")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },
    /// Input ended before the element was closed.
    #[error("unexpected end of input inside <{element}>")]
    UnexpectedEof { element: String },
    /// Input contained no root element at all.
    #[error("document has no root element")]
    Empty,
}

impl XmlError {
    pub(crate) fn malformed(element: &str, field: &str, raw: &str) -> Self {
        XmlError::MalformedAttribute {
            element: element.to_string(),
            field: field.to_string(),
            raw: raw.to_string(),
        }
    }
}

impl From<quick_xml::Error> for XmlError {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(err) => XmlError::Io(err),
            other => XmlError::Xml(other),
        }
    }
}

impl From<AttrError> for XmlError {
    fn from(err: AttrError) -> Self {
        XmlError::Xml(err.into())
    }
}

impl From<io::Error> for XmlError {
    fn from(err: io::Error) -> Self {
        XmlError::Io(Arc::new(err))
    }
}

/// Result alias used throughout the codec.
pub type Result<T, E = XmlError> = std::result::Result<T, E>;
