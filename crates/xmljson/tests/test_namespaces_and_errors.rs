use serde_json::{Value, json};
use xmljson::json::{JsonToken, TokenBuffer};
use xmljson::xml::{QName, XmlDocument, XmlNodeKind, parse_str, to_xml_string};
use xmljson::{ConvertError, DecodeTarget, Result, XmlNodeConverter, deserialize_xml_node};

fn encode(xml: &str) -> Result<Value> {
    let doc = parse_str(xml)?;
    XmlNodeConverter::new().to_json_value(&doc, doc.root())
}

fn decode_err(value: Value) -> ConvertError {
    match XmlNodeConverter::new().from_json_value(&value, DecodeTarget::Document) {
        Ok(doc) => panic!("expected an error, got {:?}", to_xml_string(&doc)),
        Err(err) => err,
    }
}

#[test]
fn test_prefixed_namespace_round_trip() -> Result<()> {
    let xml = r#"<ns:Foo xmlns:ns="urn:x"><ns:Bar>1</ns:Bar></ns:Foo>"#;
    let value = encode(xml)?;
    assert_eq!(value, json!({"ns:Foo": {"@xmlns:ns": "urn:x", "ns:Bar": "1"}}));

    let doc = XmlNodeConverter::new().from_json_value(&value, DecodeTarget::Document)?;
    let root = doc.root_element().ok_or(ConvertError::MissingRoot)?;
    assert_eq!(doc.namespace_uri(root), Some("urn:x"));
    assert_eq!(to_xml_string(&doc)?, xml);
    Ok(())
}

#[test]
fn test_default_namespace_round_trip() -> Result<()> {
    let xml = r#"<root xmlns="urn:d"><child>1</child></root>"#;
    let value = encode(xml)?;
    assert_eq!(value, json!({"root": {"@xmlns": "urn:d", "child": "1"}}));

    let doc = XmlNodeConverter::new().from_json_value(&value, DecodeTarget::Document)?;
    let root = doc.root_element().ok_or(ConvertError::MissingRoot)?;
    let child = doc.children(root)[0];
    assert_eq!(doc.namespace_uri(child), Some("urn:d"));
    assert_eq!(to_xml_string(&doc)?, xml);
    Ok(())
}

#[test]
fn test_ambiguous_root_needs_root_name() -> Result<()> {
    let err = deserialize_xml_node(r#"{"a": 1, "b": 2}"#, None, false).unwrap_err();
    assert!(matches!(err, ConvertError::AmbiguousRoot));

    let doc = deserialize_xml_node(r#"{"a": 1, "b": 2}"#, Some("root"), false)?;
    let root = doc.root_element().ok_or(ConvertError::MissingRoot)?;
    let names: Vec<_> = doc
        .children(root)
        .iter()
        .filter_map(|&child| doc.local_name(child))
        .collect();
    assert_eq!(names, vec!["a", "b"]);
    Ok(())
}

#[test]
fn test_top_level_array_needs_root_name() -> Result<()> {
    let err = deserialize_xml_node(r#"{"a": [1, 2]}"#, None, false).unwrap_err();
    assert!(matches!(err, ConvertError::AmbiguousRoot));

    let err = deserialize_xml_node(r#"{"a": [[1], [2]]}"#, None, false).unwrap_err();
    assert!(matches!(err, ConvertError::AmbiguousRoot));

    let doc = deserialize_xml_node(r#"{"a": [1]}"#, None, false)?;
    assert_eq!(to_xml_string(&doc)?, "<a>1</a>");

    let doc = deserialize_xml_node(r#"{"a": [1, 2]}"#, Some("root"), false)?;
    assert_eq!(doc.children(doc.root()).len(), 1);
    assert_eq!(to_xml_string(&doc)?, "<root><a>1</a><a>2</a></root>");
    Ok(())
}

#[test]
fn test_unbound_prefixed_attributes_are_kept_apart() -> Result<()> {
    let doc = XmlNodeConverter::new().from_json_value(
        &json!({"r": {"@p:a": "1", "@q:a": "2"}}),
        DecodeTarget::Document,
    )?;
    let root = doc.root_element().ok_or(ConvertError::MissingRoot)?;
    assert_eq!(doc.attributes(root).len(), 2);
    assert_eq!(to_xml_string(&doc)?, r#"<r p:a="1" q:a="2"/>"#);
    Ok(())
}

#[test]
fn test_constructor_items_become_sibling_elements() -> Result<()> {
    let buffer = TokenBuffer::from(vec![
        JsonToken::StartObject,
        JsonToken::PropertyName("r".into()),
        JsonToken::StartObject,
        JsonToken::PropertyName("d".into()),
        JsonToken::StartConstructor("Date".into()),
        JsonToken::Integer(1),
        JsonToken::Integer(2),
        JsonToken::EndConstructor,
        JsonToken::PropertyName("e".into()),
        JsonToken::Integer(3),
        JsonToken::EndObject,
        JsonToken::EndObject,
    ]);

    let doc = XmlNodeConverter::new().read_json(buffer, DecodeTarget::Document)?;
    assert_eq!(
        to_xml_string(&doc)?,
        "<r><d><Date>1</Date><Date>2</Date></d><e>3</e></r>"
    );
    Ok(())
}

#[test]
fn test_encode_rejects_nameless_declaration_and_doctype() -> Result<()> {
    let mut doc = XmlDocument::new();
    let decl = doc.create_xml_declaration("", None, None);
    doc.append_child(doc.root(), decl);
    let err = XmlNodeConverter::new()
        .to_json_value(&doc, doc.root())
        .unwrap_err();
    assert!(matches!(
        err,
        ConvertError::MalformedNode {
            kind: XmlNodeKind::XmlDeclaration,
            ..
        }
    ));

    let mut doc = XmlDocument::new();
    let doctype = doc.create_document_type("", Some("-//x".into()), None, None);
    doc.append_child(doc.root(), doctype);
    let root = doc.create_element(QName::local("r"));
    doc.append_child(doc.root(), root);
    let err = XmlNodeConverter::new()
        .to_json_value(&doc, doc.root())
        .unwrap_err();
    assert!(matches!(
        err,
        ConvertError::MalformedNode {
            kind: XmlNodeKind::DocumentType,
            ..
        }
    ));
    Ok(())
}

#[test]
fn test_decode_errors() -> Result<()> {
    assert!(matches!(
        decode_err(json!({"@a": "1"})),
        ConvertError::AttributeOnDocument { .. }
    ));
    assert!(matches!(
        decode_err(json!({"r": {"@xmlns:ns": null}})),
        ConvertError::NamespaceAttributeMissingValue { .. }
    ));
    assert!(matches!(
        decode_err(json!({"?xml": {"@version": "1.0", "@bogus": "x"}})),
        ConvertError::UnexpectedProperty { .. }
    ));
    assert!(matches!(
        decode_err(json!({"?xml": {}})),
        ConvertError::MalformedNode {
            kind: XmlNodeKind::XmlDeclaration,
            ..
        }
    ));
    assert!(matches!(
        decode_err(json!({"!DOCTYPE": {"@system": "x"}})),
        ConvertError::MalformedNode {
            kind: XmlNodeKind::DocumentType,
            ..
        }
    ));
    assert!(matches!(
        decode_err(json!({"!DOCTYPE": "html"})),
        ConvertError::UnexpectedToken { .. }
    ));
    assert!(matches!(
        decode_err(json!("text")),
        ConvertError::UnexpectedToken { .. }
    ));
    Ok(())
}

#[test]
fn test_invalid_json_text_is_reported() {
    let err = deserialize_xml_node("{not json", None, false).unwrap_err();
    assert!(matches!(err, ConvertError::Json(_)));
}

#[test]
fn test_element_target() -> Result<()> {
    let value = json!({"?xml": {"@version": "1.0"}, "root": {"a": "1"}});
    let doc = XmlNodeConverter::new().from_json_value(&value, DecodeTarget::Element)?;
    assert_eq!(to_xml_string(&doc)?, "<root><a>1</a></root>");

    let err = XmlNodeConverter::new()
        .from_json_value(&json!({"?xml": {"@version": "1.0"}}), DecodeTarget::Element)
        .unwrap_err();
    assert!(matches!(err, ConvertError::MissingRoot));
    Ok(())
}

#[test]
fn test_token_buffer_keeps_comments_and_dates() -> Result<()> {
    let date = chrono::DateTime::parse_from_rfc3339("2024-05-01T10:30:00+02:00")
        .map_err(|e| ConvertError::XmlSyntax(e.to_string()))?;
    let buffer = TokenBuffer::from(vec![
        JsonToken::StartObject,
        JsonToken::PropertyName("r".into()),
        JsonToken::StartObject,
        JsonToken::Comment("kept".into()),
        JsonToken::PropertyName("at".into()),
        JsonToken::Date(date),
        JsonToken::EndObject,
        JsonToken::EndObject,
    ]);

    let doc = XmlNodeConverter::new().read_json(buffer, DecodeTarget::Document)?;
    assert_eq!(
        to_xml_string(&doc)?,
        "<r><!--kept--><at>2024-05-01T10:30:00+02:00</at></r>"
    );
    Ok(())
}
