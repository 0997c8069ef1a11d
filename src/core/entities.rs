//! Entity Decoding and Escaping
//!
//! Handles decoding of:
//! - Built-in XML entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//! - HTML named entities (Latin-1 block plus common punctuation and symbols)
//!
//! Uses Cow for zero-copy when no entities are present.

use memchr::memchr;
use std::borrow::Cow;

/// Named references for U+00A0..=U+00FF, indexed by `codepoint - 0xA0`
const LATIN1_NAMES: [&str; 96] = [
    "nbsp", "iexcl", "cent", "pound", "curren", "yen", "brvbar", "sect", "uml", "copy", "ordf",
    "laquo", "not", "shy", "reg", "macr", "deg", "plusmn", "sup2", "sup3", "acute", "micro",
    "para", "middot", "cedil", "sup1", "ordm", "raquo", "frac14", "frac12", "frac34", "iquest",
    "Agrave", "Aacute", "Acirc", "Atilde", "Auml", "Aring", "AElig", "Ccedil", "Egrave",
    "Eacute", "Ecirc", "Euml", "Igrave", "Iacute", "Icirc", "Iuml", "ETH", "Ntilde", "Ograve",
    "Oacute", "Ocirc", "Otilde", "Ouml", "times", "Oslash", "Ugrave", "Uacute", "Ucirc", "Uuml",
    "Yacute", "THORN", "szlig", "agrave", "aacute", "acirc", "atilde", "auml", "aring", "aelig",
    "ccedil", "egrave", "eacute", "ecirc", "euml", "igrave", "iacute", "icirc", "iuml", "eth",
    "ntilde", "ograve", "oacute", "ocirc", "otilde", "ouml", "divide", "oslash", "ugrave",
    "uacute", "ucirc", "uuml", "yacute", "thorn", "yuml",
];

/// HTML named references outside the Latin-1 block
const HTML_EXTRA: &[(&str, char)] = &[
    ("OElig", '\u{0152}'),
    ("oelig", '\u{0153}'),
    ("Scaron", '\u{0160}'),
    ("scaron", '\u{0161}'),
    ("Yuml", '\u{0178}'),
    ("fnof", '\u{0192}'),
    ("circ", '\u{02C6}'),
    ("tilde", '\u{02DC}'),
    ("Alpha", '\u{0391}'),
    ("Beta", '\u{0392}'),
    ("Gamma", '\u{0393}'),
    ("Delta", '\u{0394}'),
    ("Omega", '\u{03A9}'),
    ("alpha", '\u{03B1}'),
    ("beta", '\u{03B2}'),
    ("gamma", '\u{03B3}'),
    ("delta", '\u{03B4}'),
    ("epsilon", '\u{03B5}'),
    ("lambda", '\u{03BB}'),
    ("mu", '\u{03BC}'),
    ("pi", '\u{03C0}'),
    ("sigma", '\u{03C3}'),
    ("omega", '\u{03C9}'),
    ("ensp", '\u{2002}'),
    ("emsp", '\u{2003}'),
    ("thinsp", '\u{2009}'),
    ("zwnj", '\u{200C}'),
    ("zwj", '\u{200D}'),
    ("lrm", '\u{200E}'),
    ("rlm", '\u{200F}'),
    ("ndash", '\u{2013}'),
    ("mdash", '\u{2014}'),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("sbquo", '\u{201A}'),
    ("ldquo", '\u{201C}'),
    ("rdquo", '\u{201D}'),
    ("bdquo", '\u{201E}'),
    ("dagger", '\u{2020}'),
    ("Dagger", '\u{2021}'),
    ("bull", '\u{2022}'),
    ("hellip", '\u{2026}'),
    ("permil", '\u{2030}'),
    ("prime", '\u{2032}'),
    ("Prime", '\u{2033}'),
    ("lsaquo", '\u{2039}'),
    ("rsaquo", '\u{203A}'),
    ("oline", '\u{203E}'),
    ("frasl", '\u{2044}'),
    ("euro", '\u{20AC}'),
    ("trade", '\u{2122}'),
    ("larr", '\u{2190}'),
    ("uarr", '\u{2191}'),
    ("rarr", '\u{2192}'),
    ("darr", '\u{2193}'),
    ("harr", '\u{2194}'),
    ("minus", '\u{2212}'),
    ("infin", '\u{221E}'),
    ("ne", '\u{2260}'),
    ("le", '\u{2264}'),
    ("ge", '\u{2265}'),
    ("spades", '\u{2660}'),
    ("clubs", '\u{2663}'),
    ("hearts", '\u{2665}'),
    ("diams", '\u{2666}'),
];

/// Which named entities are recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitySet {
    /// The five predefined XML entities
    Xml,
    /// XML entities plus HTML named references
    Html,
}

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded. Unknown references are kept as-is.
#[inline]
pub fn decode_text(input: &[u8], set: EntitySet) -> Cow<'_, [u8]> {
    // Fast path: check if there are any entities using SIMD
    if memchr(b'&', input).is_none() {
        return Cow::Borrowed(input);
    }
    match decode_entities(input, set, false) {
        Ok(decoded) => Cow::Owned(decoded),
        // Lenient decoding never fails
        Err(_) => Cow::Borrowed(input),
    }
}

/// Decode text content in strict XML mode
///
/// Fails on undeclared entities, invalid character references and bare `&`.
pub fn decode_text_strict(input: &[u8]) -> Result<Cow<'_, [u8]>, String> {
    if memchr(b'&', input).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    decode_entities(input, EntitySet::Xml, true).map(Cow::Owned)
}

fn decode_entities(input: &[u8], set: EntitySet, strict: bool) -> Result<Vec<u8>, String> {
    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;

    while pos < input.len() {
        let Some(amp_pos) = memchr(b'&', &input[pos..]) else {
            result.extend_from_slice(&input[pos..]);
            break;
        };
        result.extend_from_slice(&input[pos..pos + amp_pos]);
        pos += amp_pos;

        let semi = memchr(b';', &input[pos..]).filter(|&off| off <= 33);
        let Some(semi_offset) = semi else {
            if strict {
                return Err("Bare '&' must be escaped as &amp;".to_string());
            }
            result.push(b'&');
            pos += 1;
            continue;
        };

        let entity = &input[pos + 1..pos + semi_offset];
        match decode_entity(entity, set) {
            Some(c) => {
                if strict && !is_valid_xml_char(c as u32) {
                    return Err(format!("Invalid character reference &{};", String::from_utf8_lossy(entity)));
                }
                let mut buf = [0u8; 4];
                result.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                pos += semi_offset + 1;
            }
            None if strict => {
                let name = String::from_utf8_lossy(entity);
                return Err(if entity.first() == Some(&b'#') {
                    format!("Invalid character reference &{};", name)
                } else {
                    format!("Undeclared entity &{};", name)
                });
            }
            None => {
                // Unknown entity, keep as-is
                result.push(b'&');
                pos += 1;
            }
        }
    }

    Ok(result)
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &[u8], set: EntitySet) -> Option<char> {
    match entity {
        [] => None,
        [b'#', rest @ ..] => decode_numeric_entity(rest),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"amp" => Some('&'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        _ if set == EntitySet::Html => lookup_html(entity),
        _ => None,
    }
}

fn lookup_html(name: &[u8]) -> Option<char> {
    let name = std::str::from_utf8(name).ok()?;
    if let Some(idx) = LATIN1_NAMES.iter().position(|&n| n == name) {
        return char::from_u32(0xA0 + idx as u32);
    }
    HTML_EXTRA.iter().find(|(n, _)| *n == name).map(|&(_, c)| c)
}

/// Decode a numeric character reference (after the `#`)
fn decode_numeric_entity(entity: &[u8]) -> Option<char> {
    let codepoint = match entity {
        [b'x' | b'X', hex @ ..] if !hex.is_empty() => {
            u32::from_str_radix(std::str::from_utf8(hex).ok()?, 16).ok()?
        }
        [] => return None,
        dec => std::str::from_utf8(dec).ok()?.parse::<u32>().ok()?,
    };
    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Escape text content for XML output
pub fn encode_text(input: &str) -> Cow<'_, str> {
    if !input.bytes().any(|b| matches!(b, b'<' | b'>' | b'&')) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Escape text for use in a double-quoted attribute value
pub fn encode_attribute(input: &str) -> Cow<'_, str> {
    if !input.bytes().any(|b| matches!(b, b'<' | b'&' | b'"' | b'\n' | b'\t')) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\n' => result.push_str("&#10;"),
            '\t' => result.push_str("&#9;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities() {
        let result = decode_text(b"Hello, World!", EntitySet::Xml);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result.as_ref(), b"Hello, World!");
    }

    #[test]
    fn test_basic_entities() {
        let result = decode_text(b"&lt;hello&gt; &amp; &quot;world&quot;", EntitySet::Xml);
        assert_eq!(result.as_ref(), b"<hello> & \"world\"");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(decode_text(b"&#65;&#66;&#67;", EntitySet::Xml).as_ref(), b"ABC");
        assert_eq!(decode_text(b"&#x41;&#x42;&#x43;", EntitySet::Xml).as_ref(), b"ABC");
        let emoji = decode_text(b"&#x1F600;", EntitySet::Xml);
        assert_eq!(std::str::from_utf8(emoji.as_ref()).unwrap(), "😀");
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(decode_text(b"&unknown;", EntitySet::Xml).as_ref(), b"&unknown;");
        assert_eq!(decode_text(b"a & b", EntitySet::Xml).as_ref(), b"a & b");
    }

    #[test]
    fn test_html_named_entities() {
        let out = decode_text(b"caf&eacute; &copy; &mdash; &nbsp;", EntitySet::Html);
        assert_eq!(std::str::from_utf8(out.as_ref()).unwrap(), "café © — \u{a0}");
        // Not recognised outside HTML
        assert_eq!(decode_text(b"&eacute;", EntitySet::Xml).as_ref(), b"&eacute;");
    }

    #[test]
    fn test_strict_rejects_undeclared_and_bare_ampersand() {
        assert!(decode_text_strict(b"&nbsp;").is_err());
        assert!(decode_text_strict(b"fish & chips").is_err());
        assert!(decode_text_strict(b"&#0;").is_err());
        assert_eq!(decode_text_strict(b"&amp;&#x20;").unwrap().as_ref(), b"& ");
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode_text("<hello> & \"world\""), "&lt;hello&gt; &amp; \"world\"");
        assert_eq!(encode_attribute("say \"hi\" & <go>"), "say &quot;hi&quot; &amp; &lt;go>");
        assert!(matches!(encode_text("plain"), Cow::Borrowed(_)));
    }
}
