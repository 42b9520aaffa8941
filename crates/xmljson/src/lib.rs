//! # xmljson
//!
//! Structural conversion between XML documents and JSON.
//!
//! ## Features
//!
//! - **Lossless where it can be**: element order, repeated siblings,
//!   namespace prefixes, comments, processing instructions, the XML
//!   declaration and the document type all have a JSON form.
//! - **Array hints**: with `write_array_attribute`, an element decoded from a
//!   one-element JSON array is marked `json:Array="true"` so it encodes back
//!   to an array.
//! - **Shareable configuration**: [`XmlNodeConverter`] is plain data; all
//!   conversion state is per call.
//!
//! ## Architecture
//!
//! - **XML Layer** ([`xml`]): an arena node tree with quick-xml based text
//!   reader and writer.
//! - **JSON Layer** ([`json`]): a token model with adapters for
//!   `serde_json::Value` and an in-memory token buffer.
//! - **Converter** ([`convert`]): the encoder (tree → tokens) and decoder
//!   (tokens → tree).
//!
//! ## XML ↔ JSON Mapping
//!
//! | XML | JSON |
//! |-----|------|
//! | `<a>text</a>` | `{"a": "text"}` |
//! | `<a id="1"/>` | `{"a": {"@id": "1"}}` |
//! | `<r><a>1</a><a>2</a></r>` | `{"r": {"a": ["1", "2"]}}` |
//! | `<a/>` / `<a></a>` | `{"a": null}` / `{"a": ""}` |
//! | `<p>x<b>y</b></p>` | `{"p": {"#text": "x", "b": "y"}}` |
//! | `<?xml version="1.0"?>` | `{"?xml": {"@version": "1.0"}}` |
//!
//! ## Examples
//!
//! ```
//! use xmljson::{json_to_xml_string, xml_to_json_string};
//!
//! let json = xml_to_json_string(r#"<root id="1"><item>a</item><item>b</item></root>"#)?;
//! assert_eq!(json, r#"{"root":{"@id":"1","item":["a","b"]}}"#);
//!
//! let xml = json_to_xml_string(&json)?;
//! assert_eq!(xml, r#"<root id="1"><item>a</item><item>b</item></root>"#);
//! # Ok::<(), xmljson::ConvertError>(())
//! ```

pub mod convert;
pub mod error;
pub mod json;
pub mod xml;

pub use convert::{DecodeTarget, XmlNodeConverter};
pub use error::{ConvertError, Result};
pub use xml::{NodeId, XmlDocument};

use serde_json::Value;

/// Output layout of the string helpers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Formatting {
    #[default]
    None,
    Indented,
}

/// Converts an XML string to a compact JSON string.
pub fn xml_to_json_string(xml: &str) -> Result<String> {
    let doc = xml::parse_str(xml)?;
    serialize_xml_node(&doc, doc.root(), Formatting::None, false)
}

/// Converts an XML string to a pretty-printed JSON string.
pub fn xml_to_json_string_pretty(xml: &str) -> Result<String> {
    let doc = xml::parse_str(xml)?;
    serialize_xml_node(&doc, doc.root(), Formatting::Indented, false)
}

/// Serializes an XML node to a JSON string.
///
/// # Examples
///
/// ```
/// use xmljson::{Formatting, serialize_xml_node, xml::parse_str};
///
/// let doc = parse_str("<root><a>1</a></root>")?;
/// let json = serialize_xml_node(&doc, doc.root(), Formatting::None, true)?;
/// assert_eq!(json, r#"{"a":"1"}"#);
/// # Ok::<(), xmljson::ConvertError>(())
/// ```
pub fn serialize_xml_node(
    doc: &XmlDocument,
    node: NodeId,
    formatting: Formatting,
    omit_root_object: bool,
) -> Result<String> {
    let converter = XmlNodeConverter::new().with_omit_root_object(omit_root_object);
    let value = converter.to_json_value(doc, node)?;
    let json = match formatting {
        Formatting::None => serde_json::to_string(&value)?,
        Formatting::Indented => serde_json::to_string_pretty(&value)?,
    };
    Ok(json)
}

/// Converts a JSON string to an XML string.
pub fn json_to_xml_string(json: &str) -> Result<String> {
    let doc = deserialize_xml_node(json, None, false)?;
    xml::to_xml_string(&doc)
}

/// Deserializes an XML document from a JSON string.
///
/// `root_element_name` wraps the whole JSON object in an element, which is
/// needed when the object has more than one property.
///
/// # Examples
///
/// ```
/// use xmljson::{deserialize_xml_node, xml::to_xml_string};
///
/// let doc = deserialize_xml_node(r#"{"a": 1, "b": 2}"#, Some("root"), false)?;
/// assert_eq!(to_xml_string(&doc)?, "<root><a>1</a><b>2</b></root>");
/// # Ok::<(), xmljson::ConvertError>(())
/// ```
pub fn deserialize_xml_node(
    json: &str,
    root_element_name: Option<&str>,
    write_array_attribute: bool,
) -> Result<XmlDocument> {
    let value: Value = serde_json::from_str(json)?;
    let mut converter = XmlNodeConverter::new().with_write_array_attribute(write_array_attribute);
    converter.deserialize_root_element_name = root_element_name.map(str::to_string);
    converter.from_json_value(&value, DecodeTarget::Document)
}
