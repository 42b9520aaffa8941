//! Builds an [`XmlDocument`] from XML text.
//!
//! Tokenizing is left to quick-xml; this module maps its events onto tree
//! nodes and resolves element and attribute namespaces with a
//! [`NamespaceScope`] as it goes.

use std::borrow::Cow;
use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};

use crate::error::{ConvertError, Result};
use crate::xml::names::split_qname;
use crate::xml::namespace::{NamespaceScope, XMLNS_NAMESPACE};
use crate::xml::{NodeId, QName, XmlDocument};

/// Options for building a tree from XML text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlReadOptions {
    /// Keep whitespace-only text as `Whitespace` nodes instead of dropping it.
    ///
    /// Whitespace inside `xml:space="preserve"` is always kept, as
    /// `SignificantWhitespace`.
    pub preserve_whitespace: bool,
}

/// Parses an XML string with default options.
///
/// # Examples
///
/// ```
/// use xmljson::xml::parse_str;
///
/// let doc = parse_str("<root><child/></root>")?;
/// assert!(doc.root_element().is_some());
/// # Ok::<(), xmljson::ConvertError>(())
/// ```
pub fn parse_str(xml: &str) -> Result<XmlDocument> {
    parse_reader(xml.as_bytes(), &XmlReadOptions::default())
}

/// Parses an XML string.
pub fn parse_str_with(xml: &str, options: &XmlReadOptions) -> Result<XmlDocument> {
    parse_reader(xml.as_bytes(), options)
}

/// Parses XML from a buffered reader.
pub fn parse_reader<R: BufRead>(reader: R, options: &XmlReadOptions) -> Result<XmlDocument> {
    let mut reader = Reader::from_reader(reader);
    reader.config_mut().trim_text(false);

    let mut builder = TreeBuilder::new(options);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            event => builder.handle(event)?,
        }
    }
    builder.finish()
}

struct TreeBuilder<'o> {
    options: &'o XmlReadOptions,
    doc: XmlDocument,
    /// Elements whose end tag has not been seen yet.
    open: Vec<NodeId>,
    scope: NamespaceScope,
    /// `xml:space="preserve"` state per open element.
    preserve_space: Vec<bool>,
    /// Character data is buffered so text split around entity references becomes one node.
    pending_text: String,
}

impl<'o> TreeBuilder<'o> {
    fn new(options: &'o XmlReadOptions) -> Self {
        Self {
            options,
            doc: XmlDocument::new(),
            open: Vec::new(),
            scope: NamespaceScope::new(),
            preserve_space: Vec::new(),
            pending_text: String::new(),
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.doc.root())
    }

    fn append(&mut self, node: NodeId) {
        let parent = self.current();
        self.doc.append_child(parent, node);
    }

    fn handle(&mut self, event: Event<'_>) -> Result<()> {
        match event {
            Event::Text(text) => {
                let raw = String::from_utf8_lossy(&text);
                let unescaped = unescape(&raw).map_err(ConvertError::syntax)?;
                self.pending_text.push_str(&unescaped);
            }
            Event::GeneralRef(reference) => {
                let name = String::from_utf8_lossy(&reference);
                let resolved = resolve_reference(&name)?;
                self.pending_text.push_str(&resolved);
            }
            Event::Start(start) => {
                self.flush_text();
                let element = self.open_element(&start, false)?;
                self.open.push(element);
            }
            Event::Empty(start) => {
                self.flush_text();
                self.open_element(&start, true)?;
                self.close_scope();
            }
            Event::End(_) => {
                self.flush_text();
                self.open.pop();
                self.close_scope();
            }
            Event::CData(cdata) => {
                self.flush_text();
                let node = self
                    .doc
                    .create_cdata(String::from_utf8_lossy(&cdata).into_owned());
                self.append(node);
            }
            Event::Comment(comment) => {
                self.flush_text();
                let node = self
                    .doc
                    .create_comment(String::from_utf8_lossy(&comment).into_owned());
                self.append(node);
            }
            Event::PI(pi) => {
                self.flush_text();
                let target = String::from_utf8_lossy(pi.target()).into_owned();
                let data = String::from_utf8_lossy(pi.content()).trim().to_string();
                let node = self.doc.create_processing_instruction(target, data);
                self.append(node);
            }
            Event::Decl(decl) => {
                self.flush_text();
                let version = decl.version().map_err(ConvertError::syntax)?;
                let encoding = decl.encoding().transpose().map_err(ConvertError::syntax)?;
                let standalone = decl.standalone().transpose().map_err(ConvertError::syntax)?;
                let node = self.doc.create_xml_declaration(
                    String::from_utf8_lossy(&version).into_owned(),
                    encoding.map(|e| String::from_utf8_lossy(&e).into_owned()),
                    standalone.map(|s| String::from_utf8_lossy(&s).into_owned()),
                );
                self.append(node);
            }
            Event::DocType(doctype) => {
                self.flush_text();
                let content = String::from_utf8_lossy(&doctype);
                let parts = parse_doctype(&content)?;
                let node = self.doc.create_document_type(
                    parts.name,
                    parts.public_id,
                    parts.system_id,
                    parts.internal_subset,
                );
                self.append(node);
            }
            Event::Eof => {}
        }
        Ok(())
    }

    /// Creates an element for a start (or empty) tag and opens its namespace scope.
    fn open_element(&mut self, start: &BytesStart<'_>, is_empty: bool) -> Result<NodeId> {
        let qualified = String::from_utf8_lossy(start.name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(ConvertError::syntax)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let raw = String::from_utf8_lossy(&attr.value);
            let value = unescape(&raw).map_err(ConvertError::syntax)?.into_owned();
            attributes.push((key, value));
        }

        self.scope.push_scope();
        let mut preserve = self.preserve_space.last().copied().unwrap_or(false);
        for (key, value) in &attributes {
            if key == "xmlns" {
                self.scope.add_namespace("", value);
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                self.scope.add_namespace(prefix, value);
            } else if key == "xml:space" {
                preserve = value == "preserve";
            }
        }
        self.preserve_space.push(preserve);

        let name = self.element_name(&qualified);
        let element = self.doc.create_element(name);
        self.doc.set_empty_element(element, is_empty);
        self.append(element);

        for (key, value) in attributes {
            let name = self.attribute_name(&key);
            let attr = self.doc.create_attribute(name, Some(value));
            self.doc.set_attribute(element, attr);
        }
        Ok(element)
    }

    fn close_scope(&mut self) {
        self.scope.pop_scope();
        self.preserve_space.pop();
    }

    fn element_name(&self, qualified: &str) -> QName {
        let (prefix, local) = split_qname(qualified);
        let namespace_uri = match prefix {
            Some(prefix) => self.scope.lookup_namespace(prefix),
            None => self.scope.default_namespace(),
        };
        QName {
            prefix: prefix.map(str::to_string),
            local_name: local.to_string(),
            namespace_uri: namespace_uri.map(str::to_string),
        }
    }

    fn attribute_name(&self, qualified: &str) -> QName {
        if qualified == "xmlns" {
            return QName::namespaced(None, "xmlns", XMLNS_NAMESPACE);
        }
        match split_qname(qualified) {
            (Some(prefix), local) => QName {
                prefix: Some(prefix.to_string()),
                local_name: local.to_string(),
                namespace_uri: self.scope.lookup_namespace(prefix).map(str::to_string),
            },
            (None, local) => QName::local(local),
        }
    }

    fn flush_text(&mut self) {
        if self.pending_text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending_text);
        let whitespace_only = text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));

        let node = if !whitespace_only {
            self.doc.create_text(text)
        } else if self.preserve_space.last().copied().unwrap_or(false) {
            self.doc.create_significant_whitespace(text)
        } else if self.options.preserve_whitespace {
            self.doc.create_whitespace(text)
        } else {
            return;
        };
        self.append(node);
    }

    fn finish(mut self) -> Result<XmlDocument> {
        self.flush_text();
        if let Some(&unclosed) = self.open.last() {
            let name = self
                .doc
                .name(unclosed)
                .map(QName::qualified)
                .unwrap_or_default();
            return Err(ConvertError::XmlSyntax(format!(
                "element <{}> is not closed",
                name
            )));
        }
        Ok(self.doc)
    }
}

/// Resolves `&name;` references that quick-xml reports separately from text.
fn resolve_reference(name: &str) -> Result<Cow<'static, str>> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => number.parse::<u32>().ok(),
        };
        return code
            .and_then(char::from_u32)
            .map(|c| Cow::Owned(c.to_string()))
            .ok_or_else(|| {
                ConvertError::XmlSyntax(format!("invalid character reference &{};", name))
            });
    }
    resolve_predefined_entity(name)
        .map(Cow::Borrowed)
        .ok_or_else(|| ConvertError::XmlSyntax(format!("unknown entity reference &{};", name)))
}

#[derive(Debug, Default, PartialEq)]
struct DocTypeParts {
    name: String,
    public_id: Option<String>,
    system_id: Option<String>,
    internal_subset: Option<String>,
}

/// Splits the body of `<!DOCTYPE ...>` into name, external ids and internal subset.
fn parse_doctype(content: &str) -> Result<DocTypeParts> {
    let content = content.trim();
    let name_end = content
        .find(|c: char| c.is_whitespace() || c == '[')
        .unwrap_or(content.len());
    let name = &content[..name_end];
    if name.is_empty() {
        return Err(ConvertError::XmlSyntax("DOCTYPE without a name".to_string()));
    }

    let mut parts = DocTypeParts {
        name: name.to_string(),
        ..Default::default()
    };
    let mut rest = content[name_end..].trim_start();

    if let Some(after) = rest.strip_prefix("PUBLIC") {
        let (public_id, after) = take_quoted(after)?;
        parts.public_id = Some(public_id.to_string());
        rest = after.trim_start();
        if rest.starts_with(['"', '\'']) {
            let (system_id, after) = take_quoted(rest)?;
            parts.system_id = Some(system_id.to_string());
            rest = after;
        }
    } else if let Some(after) = rest.strip_prefix("SYSTEM") {
        let (system_id, after) = take_quoted(after)?;
        parts.system_id = Some(system_id.to_string());
        rest = after;
    }

    let rest = rest.trim();
    if let (Some(open), Some(close)) = (rest.find('['), rest.rfind(']')) {
        if close > open {
            parts.internal_subset = Some(rest[open + 1..close].to_string());
        }
    }
    Ok(parts)
}

fn take_quoted(s: &str) -> Result<(&str, &str)> {
    let s = s.trim_start();
    let quote = s
        .chars()
        .next()
        .filter(|c| *c == '"' || *c == '\'')
        .ok_or_else(|| ConvertError::XmlSyntax("expected a quoted DOCTYPE literal".to_string()))?;
    let body = &s[1..];
    let end = body.find(quote).ok_or_else(|| {
        ConvertError::XmlSyntax("unterminated DOCTYPE literal".to_string())
    })?;
    Ok((&body[..end], &body[end + 1..]))
}
