//! JSON → XML tree.

use crate::convert::metadata::{
    JSON_NAMESPACE, PendingAttribute, VALUES_PROPERTY, add_array_attribute, is_metadata_property,
    metadata_prefix, read_attribute_elements,
};
use crate::convert::names::{
    CDATA_NAME, DECLARATION_NAME, DOCTYPE_NAME, SIGNIFICANT_WHITESPACE_NAME, TEXT_NAME,
    WHITESPACE_NAME,
};
use crate::convert::{DecodeTarget, XmlNodeConverter};
use crate::error::{ConvertError, Result};
use crate::json::{JsonToken, JsonTokenSource, TokenCursor};
use crate::xml::names::{encode_local_name, encode_name, prefix_of, split_qname};
use crate::xml::{NamespaceScope, NodeId, QName, XMLNS_NAMESPACE, XmlDocument, XmlNodeKind};

/// Builds an XML document from a JSON token stream.
///
/// Tokens are consumed strictly in order. Every handler leaves the cursor on
/// the last token of the value it read.
pub(crate) struct Decoder<'a, S> {
    converter: &'a XmlNodeConverter,
    cursor: TokenCursor<S>,
    doc: XmlDocument,
    scope: NamespaceScope,
}

impl<'a, S: JsonTokenSource> Decoder<'a, S> {
    pub(crate) fn new(converter: &'a XmlNodeConverter, source: S) -> Self {
        Self {
            converter,
            cursor: TokenCursor::new(source),
            doc: XmlDocument::new(),
            scope: NamespaceScope::new(),
        }
    }

    pub(crate) fn decode(mut self, target: DecodeTarget) -> Result<XmlDocument> {
        let converter = self.converter;
        tracing::debug!(
            ?target,
            root_element = ?converter.deserialize_root_element_name,
            write_array_attribute = converter.write_array_attribute,
            encode_special_characters = converter.encode_special_characters,
            "decoding JSON to XML"
        );

        let document = self.doc.root();
        match self.cursor.read_and_assert("reading JSON root")? {
            JsonToken::Null => {}
            JsonToken::StartObject => {
                let root_name = converter
                    .deserialize_root_element_name
                    .as_deref()
                    .filter(|name| !name.is_empty());
                match root_name {
                    Some(root_name) => {
                        tracing::trace!(root = %root_name, "wrapping JSON object in root element");
                        self.read_element(document, root_name)?;
                    }
                    None => {
                        self.cursor.read_and_assert("reading JSON root object")?;
                        self.deserialize_node(document)?;
                    }
                }
            }
            other => return Err(other.unexpected("reading JSON root; it must be an object")),
        }

        let mut doc = self.doc;
        if target == DecodeTarget::Element {
            let root = doc.root_element().ok_or(ConvertError::MissingRoot)?;
            let others: Vec<NodeId> = doc
                .children(doc.root())
                .iter()
                .copied()
                .filter(|&node| node != root)
                .collect();
            for node in others {
                doc.detach(node);
            }
        }
        Ok(doc)
    }

    fn token(&self, context: &'static str) -> Result<&JsonToken> {
        self.cursor.token(context)
    }

    /// Advances to the next item of a container. `false` at `end` or at end of input.
    fn read_next_item(&mut self, end: &JsonToken) -> Result<bool> {
        Ok(self.cursor.read()? && self.cursor.current() != Some(end))
    }

    fn deserialize_node(&mut self, current: NodeId) -> Result<()> {
        loop {
            match self.token("deserializing node")? {
                JsonToken::PropertyName(name) => {
                    let name = name.clone();
                    self.read_property(current, &name)?;
                }
                JsonToken::StartConstructor(_) => self.read_constructor(current)?,
                JsonToken::Comment(text) => {
                    let text = text.clone();
                    let comment = self.doc.create_comment(text);
                    self.doc.append_child(current, comment);
                }
                JsonToken::EndObject | JsonToken::EndArray => return Ok(()),
                other => return Err(other.unexpected("deserializing node")),
            }
            if !self.cursor.read()? {
                return Ok(());
            }
        }
    }

    fn read_property(&mut self, current: NodeId, name: &str) -> Result<()> {
        self.ensure_single_root(current)?;

        self.cursor.read_and_assert("reading property value")?;
        if self.token("reading property value")? != &JsonToken::StartArray {
            return self.deserialize_value(current, name);
        }

        let mut count = 0usize;
        while self.read_next_item(&JsonToken::EndArray)? {
            self.deserialize_value(current, name)?;
            count += 1;
        }
        tracing::trace!(property = %name, items = count, "unrolled JSON array into siblings");

        if count == 1 && self.converter.write_array_attribute {
            if let Some(element) = self.last_element_named(current, name) {
                add_array_attribute(&mut self.doc, element);
            }
        }
        Ok(())
    }

    fn deserialize_value(&mut self, current: NodeId, name: &str) -> Result<()> {
        if !self.converter.encode_special_characters {
            let leaf = match name {
                TEXT_NAME => Some(XmlNodeKind::Text),
                CDATA_NAME => Some(XmlNodeKind::CData),
                WHITESPACE_NAME => Some(XmlNodeKind::Whitespace),
                SIGNIFICANT_WHITESPACE_NAME => Some(XmlNodeKind::SignificantWhitespace),
                _ => None,
            };
            if let Some(kind) = leaf {
                let text = self
                    .token("reading character data")?
                    .to_xml_value()?
                    .unwrap_or_default();
                let node = match kind {
                    XmlNodeKind::CData => self.doc.create_cdata(text),
                    XmlNodeKind::Whitespace => self.doc.create_whitespace(text),
                    XmlNodeKind::SignificantWhitespace => {
                        self.doc.create_significant_whitespace(text)
                    }
                    _ => self.doc.create_text(text),
                };
                self.doc.append_child(current, node);
                return Ok(());
            }
            if name.starts_with('?') {
                return self.create_instruction(current, name);
            }
            if name.eq_ignore_ascii_case(DOCTYPE_NAME) {
                return self.create_document_type(current);
            }
        }

        if self.token("reading value")? == &JsonToken::StartArray {
            self.read_array_elements(current, name)
        } else {
            self.read_element(current, name)
        }
    }

    fn read_element(&mut self, current: NodeId, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(ConvertError::EmptyPropertyName);
        }

        let mut attributes = Vec::new();
        let mut prefix = None;
        if !self.converter.encode_special_characters {
            if should_read_into(self.token("reading element")?) {
                attributes = read_attribute_elements(&mut self.cursor, &mut self.scope)?;
            }
            prefix = prefix_of(name);

            if let Some(attribute) = name.strip_prefix('@') {
                return self.add_attribute(current, name, attribute.to_string());
            }
            if name == VALUES_PROPERTY {
                let prefix = self
                    .scope
                    .lookup_prefix(JSON_NAMESPACE)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string);
                return self.create_element(current, "values", prefix.as_deref(), attributes);
            }
            if is_metadata_property(name) {
                let attribute = self.metadata_attribute_name(current, &name[1..]);
                return self.add_attribute(current, name, attribute);
            }
        } else if should_read_into(self.token("reading element")?) {
            self.cursor.read_and_assert("reading element content")?;
        }

        self.create_element(current, name, prefix, attributes)
    }

    /// `prefix:local` for a metadata attribute, binding the json prefix on `current` if needed.
    fn metadata_attribute_name(&mut self, current: NodeId, local: &str) -> String {
        let mut declarations = Vec::new();
        let prefix = metadata_prefix(&mut self.scope, &mut declarations);
        if self.doc.kind(current) == XmlNodeKind::Element {
            self.attach_attributes(current, declarations);
        }
        format!("{}:{}", prefix, local)
    }

    fn create_element(
        &mut self,
        current: NodeId,
        name: &str,
        prefix: Option<&str>,
        attributes: Vec<PendingAttribute>,
    ) -> Result<()> {
        self.ensure_single_root(current)?;
        let element = self.new_element(name, prefix);
        self.doc.append_child(current, element);
        self.attach_attributes(element, attributes);

        match self.token("creating element")? {
            token if token.is_scalar() => {
                if let Some(text) = token.to_xml_value()? {
                    if text.is_empty() {
                        self.doc.set_empty_element(element, false);
                    } else {
                        let text = self.doc.create_text(text);
                        self.doc.append_child(element, text);
                    }
                }
            }
            JsonToken::EndObject => self.remove_default_namespace(),
            JsonToken::StartConstructor(_) => {
                self.scope.push_scope();
                self.read_constructor(element)?;
                self.scope.pop_scope();
                self.remove_default_namespace();
            }
            _ => {
                self.scope.push_scope();
                self.deserialize_node(element)?;
                self.scope.pop_scope();
                self.remove_default_namespace();
            }
        }
        Ok(())
    }

    /// Reads `new Name(a, b)` as sibling `Name` elements under `current`.
    ///
    /// The cursor is left on the closing `EndConstructor`.
    fn read_constructor(&mut self, current: NodeId) -> Result<()> {
        let name = match self.token("reading constructor")? {
            JsonToken::StartConstructor(name) => name.clone(),
            other => return Err(other.unexpected("reading constructor")),
        };
        while self.read_next_item(&JsonToken::EndConstructor)? {
            self.deserialize_value(current, &name)?;
        }
        Ok(())
    }

    /// A document takes one element; a second one would make it ill-formed.
    fn ensure_single_root(&self, current: NodeId) -> Result<()> {
        if self.doc.kind(current) == XmlNodeKind::Document && self.doc.root_element().is_some() {
            return Err(ConvertError::AmbiguousRoot);
        }
        Ok(())
    }

    fn new_element(&mut self, name: &str, prefix: Option<&str>) -> NodeId {
        let encoded = if self.converter.encode_special_characters {
            encode_local_name(name)
        } else {
            encode_name(name)
        };
        let namespace_uri = match prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => self.scope.lookup_namespace(prefix),
            None => self.scope.default_namespace(),
        }
        .map(str::to_string);

        let (written_prefix, local) = split_qname(&encoded);
        let prefix = written_prefix.or(prefix).filter(|p| !p.is_empty());
        self.doc.create_element(QName {
            prefix: prefix.map(str::to_string),
            local_name: local.to_string(),
            namespace_uri,
        })
    }

    fn attach_attributes(&mut self, element: NodeId, attributes: Vec<PendingAttribute>) {
        for (name, value) in attributes {
            let qname = self.attribute_qname(&encode_name(&name));
            let attribute = self.doc.create_attribute(qname, value);
            self.doc.set_attribute(element, attribute);
        }
    }

    fn attribute_qname(&self, qualified: &str) -> QName {
        if qualified == "xmlns" {
            return QName::namespaced(None, "xmlns", XMLNS_NAMESPACE);
        }
        match split_qname(qualified) {
            (Some(prefix), local) if !prefix.is_empty() => QName {
                prefix: Some(prefix.to_string()),
                local_name: local.to_string(),
                namespace_uri: self.scope.lookup_namespace(prefix).map(str::to_string),
            },
            _ => QName::local(qualified),
        }
    }

    /// Attaches an `@name` or metadata property that is read outside the attribute pre-scan.
    fn add_attribute(&mut self, current: NodeId, property: &str, attribute: String) -> Result<()> {
        if self.doc.kind(current) == XmlNodeKind::Document {
            return Err(ConvertError::AttributeOnDocument {
                property: property.to_string(),
            });
        }
        let value = self.token("reading attribute value")?.to_xml_value()?;
        let qname = self.attribute_qname(&encode_name(&attribute));
        let node = self.doc.create_attribute(qname, value);
        self.doc.set_attribute(current, node);
        Ok(())
    }

    fn remove_default_namespace(&mut self) {
        if let Some(uri) = self.scope.default_namespace().map(str::to_string) {
            self.scope.remove_namespace("", &uri);
        }
    }

    /// An array directly inside an array becomes a wrapper element holding the items.
    fn read_array_elements(&mut self, current: NodeId, name: &str) -> Result<()> {
        self.ensure_single_root(current)?;
        let wrapper = self.new_element(name, prefix_of(name));
        self.doc.append_child(current, wrapper);
        tracing::trace!(property = %name, "nested JSON array becomes a wrapper element");

        let mut count = 0usize;
        while self.read_next_item(&JsonToken::EndArray)? {
            self.deserialize_value(wrapper, name)?;
            count += 1;
        }

        if self.converter.write_array_attribute {
            add_array_attribute(&mut self.doc, wrapper);
            if count == 1 {
                if let Some(item) = self.last_element_named(wrapper, name) {
                    add_array_attribute(&mut self.doc, item);
                }
            }
        }
        Ok(())
    }

    /// The last child element of `parent` created for property `name`.
    fn last_element_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        let encoded = if self.converter.encode_special_characters {
            encode_local_name(name)
        } else {
            encode_name(name)
        };
        let local = split_qname(&encoded).1.to_string();
        self.doc
            .children(parent)
            .iter()
            .rev()
            .copied()
            .find(|&child| {
                self.doc.kind(child) == XmlNodeKind::Element
                    && self.doc.local_name(child) == Some(local.as_str())
            })
    }

    fn create_instruction(&mut self, current: NodeId, name: &str) -> Result<()> {
        if name != DECLARATION_NAME {
            let data = self
                .token("reading processing instruction")?
                .to_xml_value()?
                .unwrap_or_default();
            let node = self.doc.create_processing_instruction(&name[1..], data);
            self.doc.append_child(current, node);
            return Ok(());
        }

        const CONTEXT: &str = "reading XML declaration";
        let (mut version, mut encoding, mut standalone) = (None, None, None);
        self.expect_start_object(CONTEXT)?;
        while self.read_next_item(&JsonToken::EndObject)? {
            let slot = match self.property_name(CONTEXT)?.as_str() {
                "@version" => &mut version,
                "@encoding" => &mut encoding,
                "@standalone" => &mut standalone,
                other => {
                    return Err(ConvertError::UnexpectedProperty {
                        property: other.to_string(),
                        context: CONTEXT,
                    });
                }
            };
            *slot = self.cursor.read_and_assert(CONTEXT)?.to_xml_value()?;
        }

        let version = version.ok_or(ConvertError::MalformedNode {
            kind: XmlNodeKind::XmlDeclaration,
            reason: "version is missing",
        })?;
        let node = self.doc.create_xml_declaration(version, encoding, standalone);
        self.doc.append_child(current, node);
        Ok(())
    }

    fn create_document_type(&mut self, current: NodeId) -> Result<()> {
        const CONTEXT: &str = "reading document type";
        let (mut name, mut public_id, mut system_id, mut internal_subset) =
            (None, None, None, None);
        self.expect_start_object(CONTEXT)?;
        while self.read_next_item(&JsonToken::EndObject)? {
            let slot = match self.property_name(CONTEXT)?.as_str() {
                "@name" => &mut name,
                "@public" => &mut public_id,
                "@system" => &mut system_id,
                "@internalSubset" => &mut internal_subset,
                other => {
                    return Err(ConvertError::UnexpectedProperty {
                        property: other.to_string(),
                        context: CONTEXT,
                    });
                }
            };
            *slot = self.cursor.read_and_assert(CONTEXT)?.to_xml_value()?;
        }

        let name = name.ok_or(ConvertError::MalformedNode {
            kind: XmlNodeKind::DocumentType,
            reason: "name is missing",
        })?;
        let node = self
            .doc
            .create_document_type(name, public_id, system_id, internal_subset);
        self.doc.append_child(current, node);
        Ok(())
    }

    fn expect_start_object(&self, context: &'static str) -> Result<()> {
        match self.token(context)? {
            JsonToken::StartObject => Ok(()),
            other => Err(other.unexpected(context)),
        }
    }

    fn property_name(&self, context: &'static str) -> Result<String> {
        match self.token(context)? {
            JsonToken::PropertyName(name) => Ok(name.clone()),
            other => Err(other.unexpected(context)),
        }
    }
}

/// Whether the attribute pre-scan should look inside the current value.
fn should_read_into(token: &JsonToken) -> bool {
    !(token.is_scalar() || matches!(token, JsonToken::StartConstructor(_)))
}
