//! Serializes an [`XmlDocument`] (or any node in it) to XML text.
//!
//! Namespace declarations are emitted where the tree needs them: an element or
//! attribute whose prefix is not bound in scope gets an `xmlns` declaration
//! added to its element.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};

use crate::error::{ConvertError, Result};
use crate::xml::namespace::NamespaceScope;
use crate::xml::{NodeId, NodeKind, QName, XmlDocument, XmlNodeKind};

/// Options for writing XML text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmlWriteOptions {
    /// Indent nested elements by this many spaces. `None` writes everything on one line.
    pub indent: Option<usize>,
}

impl XmlWriteOptions {
    pub fn indented(spaces: usize) -> Self {
        Self {
            indent: Some(spaces),
        }
    }
}

/// Serializes the whole document without indentation.
pub fn to_xml_string(doc: &XmlDocument) -> Result<String> {
    node_to_xml_string(doc, doc.root(), &XmlWriteOptions::default())
}

/// Serializes `node` and its descendants.
pub fn node_to_xml_string(
    doc: &XmlDocument,
    node: NodeId,
    options: &XmlWriteOptions,
) -> Result<String> {
    let mut buffer = Vec::new();
    write_node(doc, node, &mut buffer, options)?;
    String::from_utf8(buffer).map_err(ConvertError::syntax)
}

/// Writes `node` and its descendants to `out`.
pub fn write_node<W: Write>(
    doc: &XmlDocument,
    node: NodeId,
    out: W,
    options: &XmlWriteOptions,
) -> Result<()> {
    let writer = match options.indent {
        Some(spaces) => Writer::new_with_indent(out, b' ', spaces),
        None => Writer::new(out),
    };
    let mut serializer = TreeWriter {
        doc,
        writer,
        scope: NamespaceScope::new(),
    };
    serializer.scope.push_parent_namespaces(doc, node);
    serializer.write(node)
}

struct TreeWriter<'a, W: Write> {
    doc: &'a XmlDocument,
    writer: Writer<W>,
    scope: NamespaceScope,
}

impl<W: Write> TreeWriter<'_, W> {
    fn write(&mut self, node: NodeId) -> Result<()> {
        let doc = self.doc;
        match &doc.node(node).kind {
            NodeKind::Document | NodeKind::DocumentFragment => {
                for &child in doc.children(node) {
                    self.write(child)?;
                }
            }
            NodeKind::Element { name, is_empty } => self.write_element(node, name, *is_empty)?,
            NodeKind::Attribute { .. } => {
                return Err(ConvertError::UnsupportedNodeKind {
                    kind: XmlNodeKind::Attribute,
                    context: "writing XML",
                });
            }
            NodeKind::Text(text)
            | NodeKind::Whitespace(text)
            | NodeKind::SignificantWhitespace(text) => {
                self.writer.write_event(Event::Text(BytesText::new(text)))?;
            }
            NodeKind::CData(text) => {
                self.writer
                    .write_event(Event::CData(BytesCData::new(text.as_str())))?;
            }
            NodeKind::Comment(text) => {
                self.writer
                    .write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
            }
            NodeKind::ProcessingInstruction { target, data } => {
                let content = if data.is_empty() {
                    target.clone()
                } else {
                    format!("{} {}", target, data)
                };
                self.writer.write_event(Event::PI(BytesPI::new(content)))?;
            }
            NodeKind::XmlDeclaration {
                version,
                encoding,
                standalone,
            } => {
                let decl = BytesDecl::new(version, encoding.as_deref(), standalone.as_deref());
                self.writer.write_event(Event::Decl(decl))?;
            }
            NodeKind::DocumentType {
                name,
                public_id,
                system_id,
                internal_subset,
            } => {
                let content = doctype_content(
                    name,
                    public_id.as_deref(),
                    system_id.as_deref(),
                    internal_subset.as_deref(),
                );
                self.writer
                    .write_event(Event::DocType(BytesText::from_escaped(content)))?;
            }
        }
        Ok(())
    }

    fn write_element(&mut self, node: NodeId, name: &QName, is_empty: bool) -> Result<()> {
        let doc = self.doc;
        self.scope.push_scope();

        for &attr in doc.attributes(node) {
            let Some(attr_name) = doc.name(attr) else {
                continue;
            };
            if attr_name.is_namespace_declaration() {
                let prefix = match attr_name.prefix {
                    Some(_) => attr_name.local_name.as_str(),
                    None => "",
                };
                self.scope
                    .add_namespace(prefix, doc.value(attr).unwrap_or_default());
            }
        }

        let mut declarations = Vec::new();
        self.declare(name, true, &mut declarations);
        for &attr in doc.attributes(node) {
            if let Some(attr_name) = doc.name(attr) {
                if !attr_name.is_namespace_declaration() {
                    self.declare(attr_name, false, &mut declarations);
                }
            }
        }

        let qualified = name.qualified();
        let mut start = BytesStart::new(qualified.as_str());
        for &attr in doc.attributes(node) {
            if let Some(attr_name) = doc.name(attr) {
                let key = attr_name.qualified();
                start.push_attribute((key.as_str(), doc.value(attr).unwrap_or_default()));
            }
        }
        for (key, value) in &declarations {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        let children = doc.children(node);
        if children.is_empty() && is_empty {
            self.writer.write_event(Event::Empty(start))?;
        } else {
            self.writer.write_event(Event::Start(start))?;
            for &child in children {
                self.write(child)?;
            }
            self.writer
                .write_event(Event::End(BytesEnd::new(qualified.as_str())))?;
        }

        self.scope.pop_scope();
        Ok(())
    }

    /// Adds an `xmlns` declaration when `name`'s prefix is not bound to its namespace.
    fn declare(&mut self, name: &QName, is_element: bool, out: &mut Vec<(String, String)>) {
        match (name.prefix.as_deref(), name.namespace_uri.as_deref()) {
            (Some("xml" | "xmlns"), _) => {}
            (Some(prefix), Some(uri)) => {
                if self.scope.lookup_namespace(prefix) != Some(uri) {
                    self.scope.add_namespace(prefix, uri);
                    out.push((format!("xmlns:{}", prefix), uri.to_string()));
                }
            }
            (None, Some(uri)) if is_element => {
                if self.scope.default_namespace() != Some(uri) {
                    self.scope.add_namespace("", uri);
                    out.push(("xmlns".to_string(), uri.to_string()));
                }
            }
            (None, None) if is_element => {
                if self.scope.default_namespace().is_some() {
                    self.scope.add_namespace("", "");
                    out.push(("xmlns".to_string(), String::new()));
                }
            }
            _ => {}
        }
    }
}

fn doctype_content(
    name: &str,
    public_id: Option<&str>,
    system_id: Option<&str>,
    internal_subset: Option<&str>,
) -> String {
    let mut content = name.to_string();
    match (public_id, system_id) {
        (Some(public_id), Some(system_id)) => {
            content.push_str(&format!(" PUBLIC \"{}\" \"{}\"", public_id, system_id));
        }
        (Some(public_id), None) => content.push_str(&format!(" PUBLIC \"{}\"", public_id)),
        (None, Some(system_id)) => content.push_str(&format!(" SYSTEM \"{}\"", system_id)),
        (None, None) => {}
    }
    if let Some(subset) = internal_subset {
        content.push_str(&format!(" [{}]", subset));
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::namespace::XMLNS_NAMESPACE;
    use crate::xml::parse_str;

    #[test]
    fn test_write_parsed_document_back() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?><root a="1 &amp; 2"><child>text &lt;here&gt;</child><empty/><open></open><!--note--><![CDATA[raw]]></root>"#;
        let doc = parse_str(xml).unwrap();
        assert_eq!(to_xml_string(&doc).unwrap(), xml);
    }

    #[test]
    fn test_write_doctype_and_pi() {
        let xml = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0//EN" "x.dtd"><?xml-stylesheet href="a.css"?><html/>"#;
        let doc = parse_str(xml).unwrap();
        assert_eq!(to_xml_string(&doc).unwrap(), xml);
    }

    #[test]
    fn test_missing_namespace_declaration_is_added() {
        let mut doc = XmlDocument::new();
        let root = doc.create_element(QName::namespaced(Some("ns"), "Foo", "urn:x"));
        doc.append_child(doc.root(), root);
        let child = doc.create_element(QName::namespaced(Some("ns"), "Bar", "urn:x"));
        doc.append_child(root, child);

        assert_eq!(
            to_xml_string(&doc).unwrap(),
            r#"<ns:Foo xmlns:ns="urn:x"><ns:Bar/></ns:Foo>"#
        );
    }

    #[test]
    fn test_existing_declaration_is_not_duplicated() {
        let mut doc = XmlDocument::new();
        let root = doc.create_element(QName::namespaced(None, "Foo", "urn:d"));
        doc.append_child(doc.root(), root);
        let decl = doc.create_attribute(
            QName::namespaced(None, "xmlns", XMLNS_NAMESPACE),
            Some("urn:d".into()),
        );
        doc.set_attribute(root, decl);

        assert_eq!(to_xml_string(&doc).unwrap(), r#"<Foo xmlns="urn:d"/>"#);
    }

    #[test]
    fn test_sub_tree_uses_ancestor_declarations() {
        let doc = parse_str(r#"<a xmlns:ns="urn:x"><ns:b/></a>"#).unwrap();
        let a = doc.root_element().unwrap();
        let b = doc.children(a)[0];
        let xml = node_to_xml_string(&doc, b, &XmlWriteOptions::default()).unwrap();
        assert_eq!(xml, "<ns:b/>");
    }

    #[test]
    fn test_attribute_at_top_level_is_rejected() {
        let mut doc = XmlDocument::new();
        let attr = doc.create_attribute(QName::local("a"), Some("1".into()));
        let err = node_to_xml_string(&doc, attr, &XmlWriteOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedNodeKind { .. }));
    }

    #[test]
    fn test_indented_output() {
        let doc = parse_str("<root><a/></root>").unwrap();
        let xml = node_to_xml_string(&doc, doc.root(), &XmlWriteOptions::indented(2)).unwrap();
        assert!(xml.contains("\n  <a/>\n</root>"));
    }
}
