//! Attribute Parsing
//!
//! Parses attributes from the raw content of a start tag.

use super::entities::{decode_text, decode_text_strict, EntitySet};
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use memchr::memchr;
use std::borrow::Cow;

/// A parsed attribute
#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: Cow<'a, [u8]>,
    /// Attribute value (entities decoded)
    pub value: Cow<'a, [u8]>,
}

impl<'a> Attribute<'a> {
    pub fn new(name: Cow<'a, [u8]>, value: Cow<'a, [u8]>) -> Self {
        Attribute { name, value }
    }

    /// Get the name as a string
    pub fn name_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name.as_ref())
    }

    /// Get the value as a string
    pub fn value_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.value.as_ref())
    }

    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&[u8]> {
        split_name(self.name.as_ref()).0
    }

    /// Local name (after colon, if namespaced)
    pub fn local_name(&self) -> &[u8] {
        split_name(self.name.as_ref()).1
    }

    /// True for `xmlns` and `xmlns:*` namespace declarations
    pub fn is_namespace_decl(&self) -> bool {
        let name = self.name.as_ref();
        name == b"xmlns" || name.starts_with(b"xmlns:")
    }
}

/// Split a name into prefix and local name at the colon
pub fn split_name(name: &[u8]) -> (Option<&[u8]>, &[u8]) {
    match memchr(b':', name) {
        Some(colon_pos) if colon_pos > 0 && colon_pos + 1 < name.len() => {
            (Some(&name[..colon_pos]), &name[colon_pos + 1..])
        }
        _ => (None, name),
    }
}

/// How attribute content is interpreted
#[derive(Debug, Clone, Copy)]
pub struct AttributeMode {
    /// Reject anything that is not well-formed XML
    pub strict: bool,
    /// HTML: lower-case names and decode HTML entities
    pub html: bool,
}

/// Parse attributes from raw tag content (after the element name).
///
/// Lenient modes accept valueless (`<input disabled>`) and unquoted
/// (`width=100`) attributes. Strict mode returns the first violation.
pub fn parse_attributes(input: &[u8], mode: AttributeMode) -> Result<Vec<Attribute<'_>>, String> {
    let set = if mode.html { EntitySet::Html } else { EntitySet::Xml };
    let mut attrs = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let ws_start = pos;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() {
            break;
        }
        if input[pos] == b'/' {
            if mode.strict && pos + 1 != input.len() {
                return Err("Unexpected '/' in start tag".to_string());
            }
            pos += 1;
            continue;
        }
        if mode.strict && pos == ws_start && !attrs.is_empty() {
            return Err("Attributes must be separated by whitespace".to_string());
        }

        let name_start = pos;
        if !is_name_start_char(input[pos]) {
            if mode.strict {
                return Err(format!("Invalid attribute name starting with '{}'", input[pos] as char));
            }
            pos += 1;
            continue;
        }
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let raw_name = &input[name_start..pos];
        let name = if mode.html && raw_name.iter().any(u8::is_ascii_uppercase) {
            Cow::Owned(raw_name.to_ascii_lowercase())
        } else {
            Cow::Borrowed(raw_name)
        };

        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        if pos >= input.len() || input[pos] != b'=' {
            if mode.strict {
                return Err(format!("Attribute '{}' has no value", String::from_utf8_lossy(raw_name)));
            }
            // Valueless attribute, HTML boolean style
            attrs.push(Attribute::new(name, Cow::Borrowed(b"")));
            continue;
        }
        pos += 1;

        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        let quote = input.get(pos).copied();
        if !matches!(quote, Some(b'"' | b'\'')) {
            if mode.strict {
                return Err(format!(
                    "Value of attribute '{}' must be quoted",
                    String::from_utf8_lossy(raw_name)
                ));
            }
            let value_start = pos;
            while pos < input.len() && !is_whitespace(input[pos]) && input[pos] != b'>' {
                pos += 1;
            }
            let value = decode_text(&input[value_start..pos], set);
            attrs.push(Attribute::new(name, value));
            continue;
        }
        let quote = input[pos];
        pos += 1;
        let value_start = pos;
        let value_end = match memchr(quote, &input[pos..]) {
            Some(off) => pos + off,
            None if mode.strict => return Err("Unterminated attribute value".to_string()),
            None => input.len(),
        };
        let raw_value = &input[value_start..value_end];
        pos = (value_end + 1).min(input.len());

        let value = if mode.strict {
            if memchr(b'<', raw_value).is_some() {
                return Err("Attribute value cannot contain '<'".to_string());
            }
            decode_text_strict(raw_value)?
        } else {
            decode_text(raw_value, set)
        };
        attrs.push(Attribute::new(name, normalize_whitespace(value)));
    }

    Ok(attrs)
}

/// Attribute-value normalization: literal tab/newline/CR become spaces
fn normalize_whitespace(value: Cow<'_, [u8]>) -> Cow<'_, [u8]> {
    if !value.iter().any(|&b| matches!(b, b'\t' | b'\n' | b'\r')) {
        return value;
    }
    let mut owned = value.into_owned();
    for b in owned.iter_mut() {
        if matches!(*b, b'\t' | b'\n' | b'\r') {
            *b = b' ';
        }
    }
    Cow::Owned(owned)
}
