//! XML tree → JSON.

use crate::convert::XmlNodeConverter;
use crate::convert::grouping::{group_children, is_forced_array};
use crate::convert::metadata::{has_value_attributes, is_suppressed_sentinel};
use crate::convert::names::property_name;
use crate::error::{ConvertError, Result};
use crate::json::JsonWriter;
use crate::xml::names::decode_name;
use crate::xml::{NamespaceScope, NodeId, NodeKind, XMLNS_NAMESPACE, XmlDocument, XmlNodeKind};

/// Writes one XML node, and everything below it, to a [`JsonWriter`].
///
/// The tree is only read. Namespace state lives in the encoder and is dropped
/// with it.
pub(crate) struct Encoder<'a, W: JsonWriter + ?Sized> {
    converter: &'a XmlNodeConverter,
    doc: &'a XmlDocument,
    writer: &'a mut W,
    scope: NamespaceScope,
}

impl<'a, W: JsonWriter + ?Sized> Encoder<'a, W> {
    pub(crate) fn new(
        converter: &'a XmlNodeConverter,
        doc: &'a XmlDocument,
        writer: &'a mut W,
    ) -> Self {
        Self {
            converter,
            doc,
            writer,
            scope: NamespaceScope::new(),
        }
    }

    pub(crate) fn encode(mut self, node: NodeId) -> Result<()> {
        let omit_root_object = self.converter.omit_root_object;
        tracing::debug!(
            kind = ?self.doc.kind(node),
            omit_root_object,
            "encoding XML node to JSON"
        );

        self.scope.push_parent_namespaces(self.doc, node);
        if !omit_root_object {
            self.writer.write_start_object()?;
        }
        self.serialize_node(node, !omit_root_object)?;
        if !omit_root_object {
            self.writer.write_end_object()?;
        }
        Ok(())
    }

    fn serialize_grouped_nodes(&mut self, parent: NodeId, write_property_name: bool) -> Result<()> {
        let doc = self.doc;
        for group in group_children(doc, &self.scope, parent)? {
            if !group.is_array(doc) {
                self.serialize_node(group.nodes[0], write_property_name)?;
                continue;
            }
            if write_property_name {
                self.writer.write_property_name(&group.name)?;
            }
            self.writer.write_start_array()?;
            for &node in group.nodes.iter() {
                self.serialize_node(node, false)?;
            }
            self.writer.write_end_array()?;
        }
        Ok(())
    }

    fn serialize_node(&mut self, node: NodeId, write_property_name: bool) -> Result<()> {
        let doc = self.doc;
        match &doc.node(node).kind {
            NodeKind::Document | NodeKind::DocumentFragment => {
                self.serialize_grouped_nodes(node, write_property_name)
            }
            NodeKind::Element { .. } => self.serialize_element(node, write_property_name),
            NodeKind::Comment(text) => {
                // Comments only survive where a property could stand.
                if write_property_name {
                    self.writer.write_comment(text)?;
                }
                Ok(())
            }
            NodeKind::Attribute { .. }
            | NodeKind::Text(_)
            | NodeKind::CData(_)
            | NodeKind::ProcessingInstruction { .. }
            | NodeKind::Whitespace(_)
            | NodeKind::SignificantWhitespace(_) => {
                if is_suppressed_sentinel(doc, node) {
                    return Ok(());
                }
                if write_property_name {
                    let name = property_name(doc, &self.scope, node)?;
                    self.writer.write_property_name(&name)?;
                }
                match doc.value(node) {
                    Some(value) => self.writer.write_string(value),
                    None => self.writer.write_null(),
                }
            }
            NodeKind::XmlDeclaration {
                version,
                encoding,
                standalone,
            } => {
                if version.is_empty() {
                    return Err(ConvertError::MalformedNode {
                        kind: XmlNodeKind::XmlDeclaration,
                        reason: "version is missing",
                    });
                }
                self.start_node_object(node, write_property_name)?;
                self.write_field("@version", Some(version.as_str()))?;
                self.write_field("@encoding", encoding.as_deref())?;
                self.write_field("@standalone", standalone.as_deref())?;
                self.writer.write_end_object()
            }
            NodeKind::DocumentType {
                name,
                public_id,
                system_id,
                internal_subset,
            } => {
                if name.is_empty() {
                    return Err(ConvertError::MalformedNode {
                        kind: XmlNodeKind::DocumentType,
                        reason: "name is missing",
                    });
                }
                self.start_node_object(node, write_property_name)?;
                self.write_field("@name", Some(name.as_str()))?;
                self.write_field("@public", public_id.as_deref())?;
                self.write_field("@system", system_id.as_deref())?;
                self.write_field("@internalSubset", internal_subset.as_deref())?;
                self.writer.write_end_object()
            }
        }
    }

    fn serialize_element(&mut self, element: NodeId, write_property_name: bool) -> Result<()> {
        let doc = self.doc;

        if is_forced_array(doc, element) {
            tracing::trace!("writing array-marked element as a nested array");
            if write_property_name {
                let name = property_name(doc, &self.scope, element)?;
                self.writer.write_property_name(&name)?;
            }
            return self.serialize_grouped_nodes(element, false);
        }

        self.scope.push_scope();
        for &attr in doc.attributes(element) {
            if doc.namespace_uri(attr) != Some(XMLNS_NAMESPACE) {
                continue;
            }
            let local = doc.local_name(attr).unwrap_or_default();
            let prefix = if local == "xmlns" {
                String::new()
            } else {
                decode_name(local).into_owned()
            };
            let uri = doc
                .value(attr)
                .ok_or_else(|| ConvertError::NamespaceAttributeMissingValue {
                    name: doc.name(attr).map(|n| n.qualified()).unwrap_or_default(),
                })?;
            self.scope.add_namespace(&prefix, uri);
        }

        if write_property_name {
            let name = property_name(doc, &self.scope, element)?;
            self.writer.write_property_name(&name)?;
        }

        let children = doc.children(element);
        let attributes = doc.attributes(element);
        match children {
            [only]
                if doc.kind(*only) == XmlNodeKind::Text && !has_value_attributes(doc, element) =>
            {
                self.writer.write_string(doc.value(*only).unwrap_or_default())?;
            }
            [] if attributes.is_empty() => {
                if doc.is_empty_element(element) {
                    self.writer.write_null()?;
                } else {
                    self.writer.write_string("")?;
                }
            }
            _ => {
                self.writer.write_start_object()?;
                for &attr in attributes {
                    self.serialize_node(attr, true)?;
                }
                self.serialize_grouped_nodes(element, true)?;
                self.writer.write_end_object()?;
            }
        }

        self.scope.pop_scope();
        Ok(())
    }

    fn start_node_object(&mut self, node: NodeId, write_property_name: bool) -> Result<()> {
        if write_property_name {
            let name = property_name(self.doc, &self.scope, node)?;
            self.writer.write_property_name(&name)?;
        }
        self.writer.write_start_object()
    }

    /// Writes `name: value` unless the value is absent or empty.
    fn write_field(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.writer.write_property_name(name)?;
            self.writer.write_string(value)?;
        }
        Ok(())
    }
}
