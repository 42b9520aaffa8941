//! Arena-based XML node tree.
//!
//! All nodes live in a `Vec<NodeData>` owned by the [`XmlDocument`] and are
//! referenced by [`NodeId`]. Parent links are plain indices, so a child never
//! owns its parent and dropping the document frees the whole tree.

use crate::xml::namespace::XMLNS_NAMESPACE;

/// A typed index into the document's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    fn index(self) -> usize {
        self.0
    }
}

/// The kind tag of a node, independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XmlNodeKind {
    Document,
    DocumentFragment,
    Element,
    Attribute,
    Text,
    CData,
    Comment,
    Whitespace,
    SignificantWhitespace,
    ProcessingInstruction,
    XmlDeclaration,
    DocumentType,
}

/// A namespace-qualified XML name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QName {
    /// Prefix as written (`ns` in `ns:Foo`).
    pub prefix: Option<String>,
    /// Local part of the name.
    pub local_name: String,
    /// Namespace URI the name resolved to, if any.
    pub namespace_uri: Option<String>,
}

impl QName {
    /// A name with no prefix and no namespace.
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local_name: local_name.into(),
            namespace_uri: None,
        }
    }

    /// A name bound to a namespace, optionally through a prefix.
    pub fn namespaced(
        prefix: Option<&str>,
        local_name: impl Into<String>,
        namespace_uri: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            local_name: local_name.into(),
            namespace_uri: Some(namespace_uri.into()),
        }
    }

    /// The name as it appears in markup: `prefix:local` or `local`.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.clone(),
        }
    }

    /// Whether two attribute names address the same attribute.
    ///
    /// Names in a namespace match on local name and URI. Names without one
    /// also have to agree on their prefix, so unbound `p:a` and `q:a` differ.
    pub fn same_attribute(&self, other: &QName) -> bool {
        self.local_name == other.local_name
            && self.namespace_uri == other.namespace_uri
            && (self.namespace_uri.is_some() || self.prefix == other.prefix)
    }

    /// Whether this is an `xmlns` or `xmlns:prefix` declaration name.
    pub fn is_namespace_declaration(&self) -> bool {
        self.namespace_uri.as_deref() == Some(XMLNS_NAMESPACE)
    }
}

/// The payload of a node.
///
/// Navigation links (parent, children, attributes) live in [`NodeData`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,
    DocumentFragment,
    Element {
        name: QName,
        /// `true` for `<a/>`, `false` once the element is known to have an explicit end tag.
        is_empty: bool,
    },
    Attribute {
        name: QName,
        value: Option<String>,
    },
    Text(String),
    CData(String),
    Comment(String),
    Whitespace(String),
    SignificantWhitespace(String),
    ProcessingInstruction {
        target: String,
        data: String,
    },
    XmlDeclaration {
        version: String,
        encoding: Option<String>,
        standalone: Option<String>,
    },
    DocumentType {
        name: String,
        public_id: Option<String>,
        system_id: Option<String>,
        internal_subset: Option<String>,
    },
}

impl NodeKind {
    /// The kind tag for this payload.
    pub fn tag(&self) -> XmlNodeKind {
        match self {
            NodeKind::Document => XmlNodeKind::Document,
            NodeKind::DocumentFragment => XmlNodeKind::DocumentFragment,
            NodeKind::Element { .. } => XmlNodeKind::Element,
            NodeKind::Attribute { .. } => XmlNodeKind::Attribute,
            NodeKind::Text(_) => XmlNodeKind::Text,
            NodeKind::CData(_) => XmlNodeKind::CData,
            NodeKind::Comment(_) => XmlNodeKind::Comment,
            NodeKind::Whitespace(_) => XmlNodeKind::Whitespace,
            NodeKind::SignificantWhitespace(_) => XmlNodeKind::SignificantWhitespace,
            NodeKind::ProcessingInstruction { .. } => XmlNodeKind::ProcessingInstruction,
            NodeKind::XmlDeclaration { .. } => XmlNodeKind::XmlDeclaration,
            NodeKind::DocumentType { .. } => XmlNodeKind::DocumentType,
        }
    }

    fn is_container(&self) -> bool {
        matches!(
            self,
            NodeKind::Document | NodeKind::DocumentFragment | NodeKind::Element { .. }
        )
    }
}

/// Storage for a single node in the arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Owning node; `None` for the document node and for detached nodes.
    pub parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }
}

/// An XML document: a node arena plus the id of its document node.
///
/// # Examples
///
/// ```
/// use xmljson::xml::{QName, XmlDocument};
///
/// let mut doc = XmlDocument::new();
/// let root = doc.create_element(QName::local("root"));
/// doc.append_child(doc.root(), root);
/// assert_eq!(doc.root_element(), Some(root));
/// ```
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<NodeData>,
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlDocument {
    /// Creates a document holding only its document node.
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(32);
        nodes.push(NodeData::new(NodeKind::Document));
        Self { nodes }
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The first element child of the document node.
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&child| self.kind(child) == XmlNodeKind::Element)
    }

    /// Returns the node data for `id`.
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    /// The kind tag of `id`.
    pub fn kind(&self, id: NodeId) -> XmlNodeKind {
        self.node(id).kind.tag()
    }

    /// The name of an element or attribute.
    pub fn name(&self, id: NodeId) -> Option<&QName> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. } | NodeKind::Attribute { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Local name of the node.
    ///
    /// Processing instructions answer with their target, document types with
    /// `DOCTYPE` and XML declarations with `xml`. Character data has no name.
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. } | NodeKind::Attribute { name, .. } => {
                Some(&name.local_name)
            }
            NodeKind::ProcessingInstruction { target, .. } => Some(target),
            NodeKind::DocumentType { .. } => Some("DOCTYPE"),
            NodeKind::XmlDeclaration { .. } => Some("xml"),
            _ => None,
        }
    }

    /// Namespace URI of an element or attribute.
    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        self.name(id).and_then(|name| name.namespace_uri.as_deref())
    }

    /// The character value of attributes, text-like nodes, comments and processing instructions.
    pub fn value(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Attribute { value, .. } => value.as_deref(),
            NodeKind::Text(text)
            | NodeKind::CData(text)
            | NodeKind::Comment(text)
            | NodeKind::Whitespace(text)
            | NodeKind::SignificantWhitespace(text) => Some(text),
            NodeKind::ProcessingInstruction { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Whether an element was written (or created) as `<a/>`.
    pub fn is_empty_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Element { is_empty: true, .. })
    }

    /// Marks an element as self-closing or as having an explicit end tag.
    pub fn set_empty_element(&mut self, id: NodeId, empty: bool) {
        if let NodeKind::Element { is_empty, .. } = &mut self.node_mut(id).kind {
            *is_empty = empty;
        }
    }

    /// Child nodes of `id` in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Attribute nodes of `id` in document order.
    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).attributes
    }

    /// Value of the attribute with the given local name and namespace.
    pub fn attribute_value(
        &self,
        element: NodeId,
        local_name: &str,
        namespace_uri: Option<&str>,
    ) -> Option<&str> {
        self.attributes(element)
            .iter()
            .copied()
            .find(|&attr| {
                self.local_name(attr) == Some(local_name)
                    && self.namespace_uri(attr) == namespace_uri
            })
            .and_then(|attr| self.value(attr))
    }

    /// Parent of `id`, if attached.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Finds the prefix declared for `namespace_uri` on `id` or its ancestors.
    pub fn lookup_prefix(&self, id: NodeId, namespace_uri: &str) -> Option<&str> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .filter(|&node| self.kind(node) == XmlNodeKind::Element)
            .flat_map(|node| self.attributes(node).iter().copied())
            .find(|&attr| {
                self.name(attr).is_some_and(QName::is_namespace_declaration)
                    && self.value(attr) == Some(namespace_uri)
            })
            .and_then(|attr| self.name(attr))
            .map(|name| match name.prefix {
                Some(_) => name.local_name.as_str(),
                None => "",
            })
    }

    /// Finds the namespace `prefix` is declared for on `id` or its ancestors.
    ///
    /// The empty prefix looks up the default namespace.
    pub fn lookup_namespace(&self, id: NodeId, prefix: &str) -> Option<&str> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .filter(|&node| self.kind(node) == XmlNodeKind::Element)
            .flat_map(|node| self.attributes(node).iter().copied())
            .find(|&attr| {
                self.name(attr).is_some_and(|name| {
                    name.is_namespace_declaration()
                        && match name.prefix {
                            Some(_) => name.local_name == prefix,
                            None => prefix.is_empty(),
                        }
                })
            })
            .and_then(|attr| self.value(attr))
    }

    // --- Creation ---

    fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(kind));
        id
    }

    /// Creates a detached document fragment.
    pub fn create_document_fragment(&mut self) -> NodeId {
        self.create_node(NodeKind::DocumentFragment)
    }

    /// Creates a detached, self-closing element.
    pub fn create_element(&mut self, name: QName) -> NodeId {
        self.create_node(NodeKind::Element {
            name,
            is_empty: true,
        })
    }

    /// Creates a detached attribute.
    pub fn create_attribute(&mut self, name: QName, value: Option<String>) -> NodeId {
        self.create_node(NodeKind::Attribute { name, value })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.create_node(NodeKind::Text(text.into()))
    }

    pub fn create_cdata(&mut self, text: impl Into<String>) -> NodeId {
        self.create_node(NodeKind::CData(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.create_node(NodeKind::Comment(text.into()))
    }

    pub fn create_whitespace(&mut self, text: impl Into<String>) -> NodeId {
        self.create_node(NodeKind::Whitespace(text.into()))
    }

    pub fn create_significant_whitespace(&mut self, text: impl Into<String>) -> NodeId {
        self.create_node(NodeKind::SignificantWhitespace(text.into()))
    }

    pub fn create_processing_instruction(
        &mut self,
        target: impl Into<String>,
        data: impl Into<String>,
    ) -> NodeId {
        self.create_node(NodeKind::ProcessingInstruction {
            target: target.into(),
            data: data.into(),
        })
    }

    pub fn create_xml_declaration(
        &mut self,
        version: impl Into<String>,
        encoding: Option<String>,
        standalone: Option<String>,
    ) -> NodeId {
        self.create_node(NodeKind::XmlDeclaration {
            version: version.into(),
            encoding,
            standalone,
        })
    }

    pub fn create_document_type(
        &mut self,
        name: impl Into<String>,
        public_id: Option<String>,
        system_id: Option<String>,
        internal_subset: Option<String>,
    ) -> NodeId {
        self.create_node(NodeKind::DocumentType {
            name: name.into(),
            public_id,
            system_id,
            internal_subset,
        })
    }

    // --- Mutation ---

    /// Appends `child` to the end of `parent`'s child list.
    ///
    /// Appending to an element clears its self-closing flag.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.node(parent).kind.is_container(),
            "only documents, fragments and elements own children"
        );
        debug_assert!(
            self.node(child).parent.is_none(),
            "child already has a parent; detach it first"
        );

        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
        self.set_empty_element(parent, false);
    }

    /// Attaches `attribute` to `element`, replacing an attribute with the same name.
    pub fn set_attribute(&mut self, element: NodeId, attribute: NodeId) {
        debug_assert_eq!(self.kind(element), XmlNodeKind::Element);
        debug_assert_eq!(self.kind(attribute), XmlNodeKind::Attribute);

        let Some(key) = self.name(attribute).cloned() else {
            return;
        };
        let existing = self
            .attributes(element)
            .iter()
            .position(|&attr| self.name(attr).is_some_and(|name| name.same_attribute(&key)));

        self.node_mut(attribute).parent = Some(element);
        match existing {
            Some(index) => {
                let replaced = self.node(element).attributes[index];
                self.node_mut(replaced).parent = None;
                self.node_mut(element).attributes[index] = attribute;
            }
            None => self.node_mut(element).attributes.push(attribute),
        }
    }

    /// Detaches a node from its parent. The node stays allocated but unreachable.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let data = self.node_mut(parent);
        data.children.retain(|&child| child != id);
        data.attributes.retain(|&attr| attr != id);
        self.node_mut(id).parent = None;
    }
}

/// Iterator over a node's ancestors, nearest first.
pub struct Ancestors<'a> {
    doc: &'a XmlDocument,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}
