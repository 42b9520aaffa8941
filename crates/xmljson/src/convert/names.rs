//! JSON property names for XML nodes.

use crate::convert::metadata::JSON_NAMESPACE;
use crate::error::{ConvertError, Result};
use crate::xml::{NamespaceScope, NodeId, XmlDocument, XmlNodeKind};

pub const TEXT_NAME: &str = "#text";
pub const COMMENT_NAME: &str = "#comment";
pub const CDATA_NAME: &str = "#cdata-section";
pub const WHITESPACE_NAME: &str = "#whitespace";
pub const SIGNIFICANT_WHITESPACE_NAME: &str = "#significant-whitespace";
pub const DECLARATION_NAME: &str = "?xml";
pub const DOCTYPE_NAME: &str = "!DOCTYPE";

/// The property name `node` is written under.
///
/// | node | name |
/// |---|---|
/// | attribute | `@name`, or `$name` in the json namespace |
/// | element | `name`, or `$name` in the json namespace |
/// | text, CDATA, comment | `#text`, `#cdata-section`, `#comment` |
/// | whitespace | `#whitespace`, `#significant-whitespace` |
/// | processing instruction | `?target` |
/// | XML declaration | `?xml` |
/// | document type | `!DOCTYPE` |
///
/// Names are prefixed when a prefix for their namespace is in scope.
pub fn property_name(doc: &XmlDocument, scope: &NamespaceScope, node: NodeId) -> Result<String> {
    let name = match doc.kind(node) {
        XmlNodeKind::Attribute | XmlNodeKind::Element
            if doc.namespace_uri(node) == Some(JSON_NAMESPACE) =>
        {
            format!("${}", doc.local_name(node).unwrap_or_default())
        }
        XmlNodeKind::Attribute => format!("@{}", scope.resolve_full_name(doc, node)),
        XmlNodeKind::Element => scope.resolve_full_name(doc, node),
        XmlNodeKind::CData => CDATA_NAME.to_string(),
        XmlNodeKind::Comment => COMMENT_NAME.to_string(),
        XmlNodeKind::ProcessingInstruction | XmlNodeKind::DocumentType => {
            let sigil = if doc.kind(node) == XmlNodeKind::DocumentType {
                '!'
            } else {
                '?'
            };
            format!("{}{}", sigil, scope.resolve_full_name(doc, node))
        }
        XmlNodeKind::XmlDeclaration => DECLARATION_NAME.to_string(),
        XmlNodeKind::SignificantWhitespace => SIGNIFICANT_WHITESPACE_NAME.to_string(),
        XmlNodeKind::Text => TEXT_NAME.to_string(),
        XmlNodeKind::Whitespace => WHITESPACE_NAME.to_string(),
        kind @ (XmlNodeKind::Document | XmlNodeKind::DocumentFragment) => {
            return Err(ConvertError::UnsupportedNodeKind {
                kind,
                context: "getting node name",
            });
        }
    };
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{QName, XMLNS_NAMESPACE, parse_str};

    #[test]
    fn test_special_node_names() {
        let doc = parse_str(
            r#"<?xml version="1.0"?><!DOCTYPE r><?pi data?><r><!--c--><![CDATA[x]]>t</r>"#,
        )
        .unwrap();
        let scope = NamespaceScope::new();
        let top = doc.children(doc.root());
        let names: Vec<_> = top
            .iter()
            .map(|&n| property_name(&doc, &scope, n).unwrap())
            .collect();
        assert_eq!(names, vec!["?xml", "!DOCTYPE", "?pi", "r"]);

        let r = doc.root_element().unwrap();
        let inner: Vec<_> = doc
            .children(r)
            .iter()
            .map(|&n| property_name(&doc, &scope, n).unwrap())
            .collect();
        assert_eq!(inner, vec!["#comment", "#cdata-section", "#text"]);
    }

    #[test]
    fn test_attribute_and_metadata_names() {
        let mut doc = XmlDocument::new();
        let plain = doc.create_attribute(QName::local("id"), Some("1".into()));
        let meta = doc.create_attribute(
            QName::namespaced(Some("json"), "Array", JSON_NAMESPACE),
            Some("true".into()),
        );
        let decl = doc.create_attribute(
            QName::namespaced(Some("xmlns"), "ns", XMLNS_NAMESPACE),
            Some("urn:x".into()),
        );
        let scope = NamespaceScope::new();
        assert_eq!(property_name(&doc, &scope, plain).unwrap(), "@id");
        assert_eq!(property_name(&doc, &scope, meta).unwrap(), "$Array");
        assert_eq!(property_name(&doc, &scope, decl).unwrap(), "@xmlns:ns");
    }

    #[test]
    fn test_prefixed_element_name() {
        let doc = parse_str(r#"<ns:Foo xmlns:ns="urn:x"/>"#).unwrap();
        let mut scope = NamespaceScope::new();
        scope.add_namespace("ns", "urn:x");
        let root = doc.root_element().unwrap();
        assert_eq!(property_name(&doc, &scope, root).unwrap(), "ns:Foo");
    }

    #[test]
    fn test_document_has_no_property_name() {
        let doc = XmlDocument::new();
        let err = property_name(&doc, &NamespaceScope::new(), doc.root()).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::UnsupportedNodeKind {
                kind: XmlNodeKind::Document,
                ..
            }
        ));
    }
}
