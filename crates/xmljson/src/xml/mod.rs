//! XML node tree and its text form.
//!
//! The converter works on [`XmlDocument`], an arena of typed nodes. The
//! [`reader`] and [`writer`] modules move between that tree and XML text
//! using quick-xml.

pub mod names;
pub mod namespace;
pub mod reader;
mod tree;
pub mod writer;

pub use namespace::{NamespaceScope, XML_NAMESPACE, XMLNS_NAMESPACE};
pub use reader::{XmlReadOptions, parse_reader, parse_str, parse_str_with};
pub use tree::{Ancestors, NodeData, NodeId, NodeKind, QName, XmlDocument, XmlNodeKind};
pub use writer::{XmlWriteOptions, node_to_xml_string, to_xml_string, write_node};
