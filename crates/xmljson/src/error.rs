//! Error types for XML ↔ JSON conversion.
//!
//! Every error is raised at the point of detection. Nothing is salvaged from a
//! failed call: the partially built tree or JSON value is dropped with it.

use thiserror::Error;

use crate::xml::XmlNodeKind;

/// Errors produced while converting between XML node trees and JSON.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The encoder met a node kind it cannot map to a JSON property.
    #[error("unexpected XML node kind {kind:?} when {context}")]
    UnsupportedNodeKind {
        kind: XmlNodeKind,
        context: &'static str,
    },

    /// A node is missing a field it cannot be represented without.
    #[error("malformed {kind:?} node: {reason}")]
    MalformedNode {
        kind: XmlNodeKind,
        reason: &'static str,
    },

    /// The decoder saw a token that is not valid in its current state.
    #[error("unexpected JSON token {token} when {context}")]
    UnexpectedToken {
        token: &'static str,
        context: &'static str,
    },

    /// The root JSON object has several properties and no root element name was configured.
    #[error(
        "JSON root object has multiple properties; the root object must have a single property \
         in order to create a valid XML document, consider specifying a root element name"
    )]
    AmbiguousRoot,

    /// An `xmlns` or `xmlns:prefix` attribute has no value.
    #[error("namespace attribute '{name}' must have a value")]
    NamespaceAttributeMissingValue { name: String },

    /// A JSON property name that would become an element is empty.
    #[error("cannot convert JSON with an empty property name to XML")]
    EmptyPropertyName,

    /// A property of the root JSON object would become an attribute of the document.
    #[error(
        "JSON root object has property '{property}' that will be converted to an attribute; \
         a root object cannot have attribute properties, consider specifying a root element name"
    )]
    AttributeOnDocument { property: String },

    /// An unknown key inside an `?xml` or `!DOCTYPE` object.
    #[error("unexpected property '{property}' when {context}")]
    UnexpectedProperty {
        property: String,
        context: &'static str,
    },

    /// An element was requested but the JSON produced no root element.
    #[error("JSON did not produce a root element")]
    MissingRoot,

    /// A JSON writer was driven out of order.
    #[error("invalid JSON writer state: {0}")]
    WriterState(&'static str),

    /// JSON text could not be parsed or printed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// quick-xml failed to read or write an event.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML text contained something quick-xml accepted but the tree cannot hold.
    #[error("XML syntax error: {0}")]
    XmlSyntax(String),

    /// IO error while reading or writing text.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    pub(crate) fn syntax(err: impl std::fmt::Display) -> Self {
        ConvertError::XmlSyntax(err.to_string())
    }
}

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;
