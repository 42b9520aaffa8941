//! Namespace scope stack.
//!
//! Tracks prefix → URI bindings while a traversal enters and leaves elements.
//! Inner scopes shadow outer ones; the base scope permanently binds the `xml`
//! and `xmlns` prefixes.

use crate::xml::names::decode_name;
use crate::xml::{NodeId, XmlDocument, XmlNodeKind};

/// Namespace bound to the `xmlns` prefix.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Namespace bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A stack of prefix → URI scopes. The empty prefix is the default namespace.
#[derive(Debug, Clone)]
pub struct NamespaceScope {
    scopes: Vec<Vec<(String, String)>>,
}

impl Default for NamespaceScope {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceScope {
    /// Creates a scope stack holding only the built-in `xml`/`xmlns` bindings.
    pub fn new() -> Self {
        Self {
            scopes: vec![vec![
                ("xml".to_string(), XML_NAMESPACE.to_string()),
                ("xmlns".to_string(), XMLNS_NAMESPACE.to_string()),
            ]],
        }
    }

    /// Opens a new scope that shadows the current one.
    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Discards the innermost scope. The built-in scope is never popped.
    pub fn pop_scope(&mut self) -> bool {
        if self.scopes.len() > 1 {
            self.scopes.pop();
            true
        } else {
            false
        }
    }

    /// Number of scopes above the built-in one.
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Binds `prefix` to `uri` in the innermost scope, replacing an earlier binding there.
    pub fn add_namespace(&mut self, prefix: &str, uri: &str) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        match scope.iter_mut().find(|(bound, _)| bound == prefix) {
            Some(binding) => binding.1 = uri.to_string(),
            None => scope.push((prefix.to_string(), uri.to_string())),
        }
    }

    /// Removes the binding of `prefix` to `uri` from the innermost scope.
    ///
    /// The built-in `xml` and `xmlns` bindings cannot be removed.
    pub fn remove_namespace(&mut self, prefix: &str, uri: &str) {
        if prefix == "xml" || prefix == "xmlns" {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.retain(|(bound, bound_uri)| !(bound == prefix && bound_uri == uri));
        }
    }

    /// The URI bound to `prefix`, innermost binding first.
    ///
    /// A default namespace explicitly undeclared with `xmlns=""` resolves to `None`.
    pub fn lookup_namespace(&self, prefix: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(bound, _)| bound == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    /// The default namespace in effect.
    pub fn default_namespace(&self) -> Option<&str> {
        self.lookup_namespace("")
    }

    /// A prefix bound to `uri` that is not shadowed by an inner binding.
    pub fn lookup_prefix(&self, uri: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .filter(|(_, bound_uri)| bound_uri == uri)
            .map(|(prefix, _)| prefix.as_str())
            .find(|prefix| self.lookup_namespace(prefix) == Some(uri))
    }

    /// Seeds the stack from the `xmlns:*` declarations on `node`'s ancestor elements.
    ///
    /// This makes name resolution correct when a sub-tree is converted on its own.
    pub fn push_parent_namespaces(&mut self, doc: &XmlDocument, node: NodeId) {
        let mut ancestors: Vec<NodeId> = doc
            .ancestors(node)
            .filter(|&ancestor| doc.kind(ancestor) == XmlNodeKind::Element)
            .collect();
        ancestors.reverse();

        for element in ancestors {
            self.push_scope();
            for &attr in doc.attributes(element) {
                if doc.namespace_uri(attr) == Some(XMLNS_NAMESPACE)
                    && doc.local_name(attr) != Some("xmlns")
                {
                    if let (Some(prefix), Some(uri)) = (doc.local_name(attr), doc.value(attr)) {
                        self.add_namespace(prefix, uri);
                    }
                }
            }
        }
    }

    /// The name of `node` as it should appear in JSON: `prefix:local` when a
    /// prefix is bound to its namespace, otherwise the bare local name.
    pub fn resolve_full_name(&self, doc: &XmlDocument, node: NodeId) -> String {
        let local = decode_name(doc.local_name(node).unwrap_or_default());
        let uri = doc.namespace_uri(node);
        let is_default_declaration =
            doc.local_name(node) == Some("xmlns") && uri == Some(XMLNS_NAMESPACE);

        let prefix = match uri {
            Some(uri) if !is_default_declaration => self.lookup_prefix(uri),
            _ => None,
        };
        match prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
            _ => local.into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::QName;

    #[test]
    fn test_builtin_bindings() {
        let scope = NamespaceScope::new();
        assert_eq!(scope.lookup_namespace("xml"), Some(XML_NAMESPACE));
        assert_eq!(scope.lookup_prefix(XMLNS_NAMESPACE), Some("xmlns"));
        assert_eq!(scope.default_namespace(), None);
    }

    #[test]
    fn test_inner_scope_shadows_and_pops() {
        let mut scope = NamespaceScope::new();
        scope.push_scope();
        scope.add_namespace("a", "urn:outer");
        scope.push_scope();
        scope.add_namespace("a", "urn:inner");
        assert_eq!(scope.lookup_namespace("a"), Some("urn:inner"));
        assert_eq!(scope.lookup_prefix("urn:outer"), None);
        assert!(scope.pop_scope());
        assert_eq!(scope.lookup_namespace("a"), Some("urn:outer"));
        assert_eq!(scope.lookup_prefix("urn:outer"), Some("a"));
    }

    #[test]
    fn test_builtin_scope_is_never_popped() {
        let mut scope = NamespaceScope::new();
        assert!(!scope.pop_scope());
        assert_eq!(scope.depth(), 0);
        assert_eq!(scope.lookup_namespace("xmlns"), Some(XMLNS_NAMESPACE));
    }

    #[test]
    fn test_remove_default_namespace() {
        let mut scope = NamespaceScope::new();
        scope.push_scope();
        scope.add_namespace("", "urn:default");
        assert_eq!(scope.default_namespace(), Some("urn:default"));
        scope.remove_namespace("", "urn:default");
        assert_eq!(scope.default_namespace(), None);
    }

    #[test]
    fn test_undeclared_default_namespace() {
        let mut scope = NamespaceScope::new();
        scope.push_scope();
        scope.add_namespace("", "urn:default");
        scope.push_scope();
        scope.add_namespace("", "");
        assert_eq!(scope.default_namespace(), None);
    }

    #[test]
    fn test_resolve_full_name_with_seeded_ancestors() {
        let mut doc = XmlDocument::new();
        let outer = doc.create_element(QName::local("outer"));
        doc.append_child(doc.root(), outer);
        let decl = doc.create_attribute(
            QName::namespaced(Some("xmlns"), "ns", XMLNS_NAMESPACE),
            Some("urn:x".into()),
        );
        doc.set_attribute(outer, decl);
        let inner = doc.create_element(QName::namespaced(Some("ns"), "Foo", "urn:x"));
        doc.append_child(outer, inner);
        let plain = doc.create_element(QName::namespaced(None, "Bar", "urn:unbound"));
        doc.append_child(outer, plain);

        let mut scope = NamespaceScope::new();
        assert_eq!(scope.resolve_full_name(&doc, inner), "Foo");

        scope.push_parent_namespaces(&doc, inner);
        assert_eq!(scope.resolve_full_name(&doc, inner), "ns:Foo");
        assert_eq!(scope.resolve_full_name(&doc, plain), "Bar");
        assert_eq!(scope.resolve_full_name(&doc, decl), "xmlns:ns");
    }

    #[test]
    fn test_resolve_full_name_decodes_local_name() {
        let mut doc = XmlDocument::new();
        let element = doc.create_element(QName::local("_x0031_abc"));
        let scope = NamespaceScope::new();
        assert_eq!(scope.resolve_full_name(&doc, element), "1abc");
    }
}
