//! XML name handling.
//!
//! JSON property names can contain characters that are not legal in XML names.
//! They are escaped as `_xHHHH_` (or `_xHHHHHHHH_` outside the BMP) on the way
//! to XML and unescaped on the way back. A literal `_` that would otherwise be
//! read as the start of an escape is itself escaped as `_x005F_`.

use std::borrow::Cow;

/// Splits a qualified name into its prefix and local name parts.
///
/// Only the first colon separates the prefix.
///
/// ```
/// use xmljson::xml::names::split_qname;
///
/// assert_eq!(split_qname("svg:rect"), (Some("svg"), "rect"));
/// assert_eq!(split_qname("div"), (None, "div"));
/// ```
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.find(':') {
        Some(pos) => (Some(&qname[..pos]), &qname[pos + 1..]),
        None => (None, qname),
    }
}

/// The prefix of a qualified name, if it has a non-empty one.
pub fn prefix_of(qname: &str) -> Option<&str> {
    split_qname(qname).0.filter(|prefix| !prefix.is_empty())
}

/// Escapes characters that may not appear in an XML name. Colons are kept.
pub fn encode_name(name: &str) -> Cow<'_, str> {
    encode(name, false)
}

/// Escapes characters that may not appear in an XML local name, including colons.
pub fn encode_local_name(name: &str) -> Cow<'_, str> {
    encode(name, true)
}

/// Reverses [`encode_name`]/[`encode_local_name`].
pub fn decode_name(name: &str) -> Cow<'_, str> {
    if !name.contains("_x") {
        return Cow::Borrowed(name);
    }

    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(pos) = rest.find("_x") {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        match decode_escape(candidate) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &candidate[consumed..];
            }
            None => {
                out.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn encode(name: &str, local: bool) -> Cow<'_, str> {
    let needs_escape = name.char_indices().any(|(index, ch)| {
        !is_allowed(ch, index == 0, local) || (ch == '_' && looks_like_escape(&name[index..]))
    });
    if !needs_escape {
        return Cow::Borrowed(name);
    }

    let mut out = String::with_capacity(name.len() + 8);
    for (index, ch) in name.char_indices() {
        if ch == '_' && looks_like_escape(&name[index..]) {
            out.push_str("_x005F_");
        } else if is_allowed(ch, index == 0, local) {
            out.push(ch);
        } else if (ch as u32) > 0xFFFF {
            out.push_str(&format!("_x{:08X}_", ch as u32));
        } else {
            out.push_str(&format!("_x{:04X}_", ch as u32));
        }
    }
    Cow::Owned(out)
}

fn is_allowed(ch: char, first: bool, local: bool) -> bool {
    if local && ch == ':' {
        return false;
    }
    if first {
        is_name_start_char(ch)
    } else {
        is_name_char(ch)
    }
}

fn looks_like_escape(s: &str) -> bool {
    decode_escape(s).is_some()
}

/// Parses `_xHHHH_` or `_xHHHHHHHH_` at the start of `s`.
fn decode_escape(s: &str) -> Option<(char, usize)> {
    let body = s.strip_prefix("_x")?;
    for width in [4usize, 8] {
        let Some(hex) = body.get(..width) else {
            continue;
        };
        if body.as_bytes().get(width) != Some(&b'_') || !hex.bytes().all(|b| b.is_ascii_hexdigit())
        {
            continue;
        }
        if let Some(ch) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
            return Some((ch, width + 3));
        }
    }
    None
}

/// `NameStartChar` from XML 1.0 (fifth edition), production \[4\].
pub fn is_name_start_char(ch: char) -> bool {
    matches!(ch,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

/// `NameChar` from XML 1.0 (fifth edition), production \[4a\].
pub fn is_name_char(ch: char) -> bool {
    is_name_start_char(ch)
        || matches!(ch,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}
