//! The XML ↔ JSON converter.
//!
//! [`XmlNodeConverter`] holds the conversion options. It is plain data and
//! every entry point takes `&self`, so one converter can be shared across
//! threads; all per-call state lives in the encoder or decoder it spins up.
//!
//! # Mapping
//!
//! - Elements become properties named after the element. Repeated siblings
//!   become arrays.
//! - Attributes become `@name` properties.
//! - Text, CDATA and whitespace become `#text`, `#cdata-section`,
//!   `#whitespace` and `#significant-whitespace`.
//! - Processing instructions become `?target`, the XML declaration `?xml`
//!   and the document type `!DOCTYPE`.
//! - Attributes in the json namespace become `$name`.

mod decode;
mod encode;
pub mod grouping;
pub mod metadata;
pub mod names;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::json::{JsonTokenSource, JsonWriter, ValueTokens, ValueWriter};
use crate::xml::{NodeId, XmlDocument};

use decode::Decoder;
use encode::Encoder;

/// What a decode call must produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecodeTarget {
    /// A document. `null` input yields a document with no root element.
    #[default]
    Document,
    /// A document holding exactly one root element and nothing else.
    Element,
}

/// Options for converting between XML trees and JSON.
///
/// # Examples
///
/// ```
/// use xmljson::XmlNodeConverter;
///
/// let converter = XmlNodeConverter::new()
///     .with_root_element_name("root")
///     .with_write_array_attribute(true);
/// assert_eq!(converter.deserialize_root_element_name.as_deref(), Some("root"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct XmlNodeConverter {
    /// Name of an element to wrap the whole JSON object in when decoding.
    ///
    /// Needed when the object has more than one property.
    pub deserialize_root_element_name: Option<String>,

    /// Mark elements decoded from one-element arrays with `json:Array="true"`
    /// so they encode back to arrays.
    pub write_array_attribute: bool,

    /// Write the root node's value without the enclosing object and property name.
    pub omit_root_object: bool,

    /// Treat every property name as an element name, escaping `:` and
    /// disabling the `@`, `#`, `?`, `$` and `!` conventions.
    pub encode_special_characters: bool,
}

impl XmlNodeConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root_element_name(mut self, name: impl Into<String>) -> Self {
        self.deserialize_root_element_name = Some(name.into());
        self
    }

    pub fn with_write_array_attribute(mut self, enabled: bool) -> Self {
        self.write_array_attribute = enabled;
        self
    }

    pub fn with_omit_root_object(mut self, enabled: bool) -> Self {
        self.omit_root_object = enabled;
        self
    }

    pub fn with_encode_special_characters(mut self, enabled: bool) -> Self {
        self.encode_special_characters = enabled;
        self
    }

    /// Writes `node` and its subtree as JSON tokens.
    pub fn write_json<W: JsonWriter + ?Sized>(
        &self,
        doc: &XmlDocument,
        node: NodeId,
        writer: &mut W,
    ) -> Result<()> {
        Encoder::new(self, doc, writer).encode(node)
    }

    /// Converts `node` and its subtree to a JSON value.
    ///
    /// Comments are dropped since a [`Value`] cannot hold them; write to a
    /// [`TokenBuffer`](crate::json::TokenBuffer) to keep them.
    pub fn to_json_value(&self, doc: &XmlDocument, node: NodeId) -> Result<Value> {
        let mut writer = ValueWriter::new();
        self.write_json(doc, node, &mut writer)?;
        writer.into_value()
    }

    /// Builds an XML document from a token stream.
    pub fn read_json<S: JsonTokenSource>(
        &self,
        source: S,
        target: DecodeTarget,
    ) -> Result<XmlDocument> {
        Decoder::new(self, source).decode(target)
    }

    /// Builds an XML document from a JSON value.
    pub fn from_json_value(&self, value: &Value, target: DecodeTarget) -> Result<XmlDocument> {
        self.read_json(ValueTokens::new(value), target)
    }
}
