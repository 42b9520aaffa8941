//! The json metadata namespace.
//!
//! Attributes and elements in [`JSON_NAMESPACE`] carry structural hints
//! rather than data: `$id`, `$ref`, `$type`, `$value`, `$values` and the
//! `Array` marker that keeps a one-element array an array after a trip
//! through XML.

use crate::error::{ConvertError, Result};
use crate::json::{JsonToken, JsonTokenSource, TokenCursor};
use crate::xml::{NamespaceScope, NodeId, QName, XMLNS_NAMESPACE, XmlDocument, XmlNodeKind};

/// Namespace of the metadata attributes and elements.
pub const JSON_NAMESPACE: &str = "http://james.newtonking.com/projects/json";

/// Local name of the array marker attribute.
pub const ARRAY_ATTRIBUTE: &str = "Array";

/// Property holding the items of a metadata-wrapped array.
pub const VALUES_PROPERTY: &str = "$values";

const METADATA_PROPERTIES: [&str; 4] = ["$id", "$ref", "$type", "$value"];

/// Attribute name and value collected before the element that carries it exists.
pub type PendingAttribute = (String, Option<String>);

/// Whether `element` carries `json:Array="true"`.
pub fn is_array(doc: &XmlDocument, element: NodeId) -> bool {
    doc.kind(element) == XmlNodeKind::Element
        && doc.attribute_value(element, ARRAY_ATTRIBUTE, Some(JSON_NAMESPACE)) == Some("true")
}

/// Whether `node` is the array marker or the `xmlns` declaration of the json namespace.
///
/// Both only exist to steer the converter and are never written to JSON.
pub fn is_suppressed_sentinel(doc: &XmlDocument, node: NodeId) -> bool {
    match doc.namespace_uri(node) {
        Some(XMLNS_NAMESPACE) => doc.value(node) == Some(JSON_NAMESPACE),
        Some(JSON_NAMESPACE) => doc.local_name(node) == Some(ARRAY_ATTRIBUTE),
        _ => false,
    }
}

/// Whether any attribute of `element` holds data rather than json metadata.
pub fn has_value_attributes(doc: &XmlDocument, element: NodeId) -> bool {
    doc.attributes(element).iter().any(|&attr| {
        let uri = doc.namespace_uri(attr);
        uri != Some(JSON_NAMESPACE)
            && !(uri == Some(XMLNS_NAMESPACE) && doc.value(attr) == Some(JSON_NAMESPACE))
    })
}

/// The prefix declared by an `xmlns` or `xmlns:prefix` attribute name.
///
/// ```
/// use xmljson::convert::metadata::namespace_attribute_prefix;
///
/// assert_eq!(namespace_attribute_prefix("xmlns"), Some(""));
/// assert_eq!(namespace_attribute_prefix("xmlns:ns"), Some("ns"));
/// assert_eq!(namespace_attribute_prefix("xmlnsfoo"), None);
/// ```
pub fn namespace_attribute_prefix(name: &str) -> Option<&str> {
    match name.strip_prefix("xmlns")? {
        "" => Some(""),
        rest => rest.strip_prefix(':'),
    }
}

/// Whether a property name is one of the `$` metadata names.
pub fn is_metadata_property(name: &str) -> bool {
    name == VALUES_PROPERTY || METADATA_PROPERTIES.contains(&name)
}

/// Picks the first of `json`, `json0`, `json1`, ... that is not bound in `scope`.
pub fn allocate_prefix(scope: &NamespaceScope) -> String {
    first_free_prefix(|prefix| scope.lookup_namespace(prefix).is_some())
}

fn first_free_prefix(is_bound: impl Fn(&str) -> bool) -> String {
    let mut candidate = "json".to_string();
    let mut suffix = 0;
    while is_bound(&candidate) {
        candidate = format!("json{}", suffix);
        suffix += 1;
    }
    candidate
}

/// The prefix bound to the json namespace, binding a fresh one if there is none.
///
/// A fresh binding also yields the `xmlns:prefix` declaration to attach to the element.
pub(crate) fn metadata_prefix(
    scope: &mut NamespaceScope,
    attributes: &mut Vec<PendingAttribute>,
) -> String {
    if let Some(prefix) = scope.lookup_prefix(JSON_NAMESPACE).filter(|p| !p.is_empty()) {
        return prefix.to_string();
    }
    let prefix = allocate_prefix(scope);
    tracing::trace!(prefix = %prefix, "allocated json metadata prefix");
    attributes.push((format!("xmlns:{}", prefix), Some(JSON_NAMESPACE.to_string())));
    scope.add_namespace(&prefix, JSON_NAMESPACE);
    prefix
}

/// Reads the attribute properties at the start of a JSON object.
///
/// The cursor sits on the token before the first property. `@name` properties
/// are consumed with their values, and `xmlns` ones bind their namespace in
/// `scope` right away so the element about to be created can use it. `$id`,
/// `$ref`, `$type` and `$value` become attributes in the json namespace. The
/// scan stops, leaving the cursor on it, at `$values`, at any other property,
/// at a comment or at the end of the object.
pub fn read_attribute_elements<S: JsonTokenSource>(
    cursor: &mut TokenCursor<S>,
    scope: &mut NamespaceScope,
) -> Result<Vec<PendingAttribute>> {
    let mut attributes = Vec::new();
    while cursor.read()? {
        let name = match cursor.token("reading attributes")? {
            JsonToken::PropertyName(name) => name.clone(),
            JsonToken::Comment(_) | JsonToken::EndObject => break,
            other => return Err(other.unexpected("reading attributes")),
        };

        if let Some(attribute) = name.strip_prefix('@') {
            let value = cursor
                .read_and_assert("reading attribute value")?
                .to_xml_value()?;
            if let Some(prefix) = namespace_attribute_prefix(attribute) {
                let uri = value.as_deref().ok_or_else(|| {
                    ConvertError::NamespaceAttributeMissingValue {
                        name: attribute.to_string(),
                    }
                })?;
                scope.add_namespace(prefix, uri);
            }
            attributes.push((attribute.to_string(), value));
        } else if is_metadata_property(&name) {
            let prefix = metadata_prefix(scope, &mut attributes);
            if name == VALUES_PROPERTY {
                break;
            }
            let token = cursor.read_and_assert("reading metadata property")?;
            if !token.is_scalar() {
                return Err(token.unexpected("reading metadata property"));
            }
            let value = token.to_xml_value()?;
            attributes.push((format!("{}:{}", prefix, &name[1..]), value));
        } else {
            break;
        }
    }
    Ok(attributes)
}

/// Marks `element` with `json:Array="true"`.
///
/// When no prefix for the json namespace is in scope, a free one is declared
/// on the element, skipping prefixes an ancestor binds to another namespace.
pub fn add_array_attribute(doc: &mut XmlDocument, element: NodeId) {
    let bound = doc
        .lookup_prefix(element, JSON_NAMESPACE)
        .filter(|prefix| !prefix.is_empty())
        .map(str::to_string);
    let prefix = match &bound {
        Some(prefix) => prefix.clone(),
        None => first_free_prefix(|prefix| doc.lookup_namespace(element, prefix).is_some()),
    };

    let marker = doc.create_attribute(
        QName::namespaced(Some(&prefix), ARRAY_ATTRIBUTE, JSON_NAMESPACE),
        Some("true".to_string()),
    );
    doc.set_attribute(element, marker);

    if bound.is_none() {
        let declaration = doc.create_attribute(
            QName::namespaced(Some("xmlns"), prefix, XMLNS_NAMESPACE),
            Some(JSON_NAMESPACE.to_string()),
        );
        doc.set_attribute(element, declaration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::TokenBuffer;
    use serde_json::json;

    fn cursor_at_start(value: serde_json::Value) -> TokenCursor<TokenBuffer> {
        let mut cursor = TokenCursor::new(TokenBuffer::from_value(&value).unwrap());
        cursor.read().unwrap();
        cursor
    }

    #[test]
    fn test_allocate_prefix_skips_bound_names() {
        let mut scope = NamespaceScope::new();
        assert_eq!(allocate_prefix(&scope), "json");
        scope.add_namespace("json", "urn:other");
        assert_eq!(allocate_prefix(&scope), "json0");
        scope.add_namespace("json0", "urn:other");
        assert_eq!(allocate_prefix(&scope), "json1");
    }

    #[test]
    fn test_read_attribute_elements_collects_until_child() {
        let mut cursor = cursor_at_start(json!({
            "@a": 1,
            "@xmlns:ns": "urn:x",
            "$id": "5",
            "child": "x"
        }));
        let mut scope = NamespaceScope::new();
        let attributes = read_attribute_elements(&mut cursor, &mut scope).unwrap();

        assert_eq!(
            attributes,
            vec![
                ("a".to_string(), Some("1".to_string())),
                ("xmlns:ns".to_string(), Some("urn:x".to_string())),
                ("xmlns:json".to_string(), Some(JSON_NAMESPACE.to_string())),
                ("json:id".to_string(), Some("5".to_string())),
            ]
        );
        assert_eq!(scope.lookup_namespace("ns"), Some("urn:x"));
        assert_eq!(scope.lookup_prefix(JSON_NAMESPACE), Some("json"));
        assert_eq!(
            cursor.current(),
            Some(&JsonToken::PropertyName("child".into()))
        );
    }

    #[test]
    fn test_read_attribute_elements_stops_at_values() {
        let mut cursor = cursor_at_start(json!({"$type": "T", "$values": [1]}));
        let mut scope = NamespaceScope::new();
        let attributes = read_attribute_elements(&mut cursor, &mut scope).unwrap();
        assert_eq!(attributes.len(), 2);
        assert_eq!(
            cursor.current(),
            Some(&JsonToken::PropertyName("$values".into()))
        );
    }

    #[test]
    fn test_namespace_attribute_without_value_is_an_error() {
        let mut cursor = cursor_at_start(json!({"@xmlns:ns": null}));
        let err = read_attribute_elements(&mut cursor, &mut NamespaceScope::new()).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::NamespaceAttributeMissingValue { .. }
        ));
    }

    #[test]
    fn test_array_marker_and_sentinels() {
        let mut doc = XmlDocument::new();
        let element = doc.create_element(QName::local("item"));
        doc.append_child(doc.root(), element);
        assert!(!is_array(&doc, element));

        add_array_attribute(&mut doc, element);
        assert!(is_array(&doc, element));
        assert_eq!(doc.lookup_prefix(element, JSON_NAMESPACE), Some("json"));
        assert!(!has_value_attributes(&doc, element));
        assert!(
            doc.attributes(element)
                .iter()
                .all(|&attr| is_suppressed_sentinel(&doc, attr))
        );

        add_array_attribute(&mut doc, element);
        assert_eq!(doc.attributes(element).len(), 2);
    }

    #[test]
    fn test_array_marker_skips_prefix_bound_elsewhere() {
        let mut doc = XmlDocument::new();
        let root = doc.create_element(QName::local("root"));
        doc.append_child(doc.root(), root);
        let taken = doc.create_attribute(
            QName::namespaced(Some("xmlns"), "json", XMLNS_NAMESPACE),
            Some("urn:other".into()),
        );
        doc.set_attribute(root, taken);
        let item = doc.create_element(QName::local("item"));
        doc.append_child(root, item);

        add_array_attribute(&mut doc, item);
        assert!(is_array(&doc, item));
        assert_eq!(doc.lookup_prefix(item, JSON_NAMESPACE), Some("json0"));
        assert_eq!(doc.lookup_namespace(item, "json"), Some("urn:other"));
        assert_eq!(doc.lookup_namespace(item, "json0"), Some(JSON_NAMESPACE));
    }

    #[test]
    fn test_array_marker_must_be_exactly_true() {
        let mut doc = XmlDocument::new();
        let element = doc.create_element(QName::local("item"));
        let marker = doc.create_attribute(
            QName::namespaced(Some("json"), ARRAY_ATTRIBUTE, JSON_NAMESPACE),
            Some("false".into()),
        );
        doc.set_attribute(element, marker);
        assert!(!is_array(&doc, element));
    }
}
