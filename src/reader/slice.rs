//! Zero-Copy Slice Reader
//!
//! Reads events from a UTF-8 byte slice with zero-copy semantics.
//! Input references are maintained directly in the output.

use super::events::{EndElement, StartElement, XmlEvent};
use crate::core::attributes::{parse_attributes, Attribute, AttributeMode};
use crate::core::tokenizer::{SyntaxError, Token, TokenKind, Tokenizer};
use std::borrow::Cow;

/// Zero-copy event reader over a byte slice
pub struct SliceReader<'a> {
    tokenizer: Tokenizer<'a>,
    mode: AttributeMode,
    /// Attribute errors are found here rather than in the tokenizer
    attr_error: Option<SyntaxError>,
    /// Line of the most recently returned event
    line: u32,
}

impl<'a> SliceReader<'a> {
    /// Create a new slice reader (lenient XML)
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_tokenizer(Tokenizer::new(input))
    }

    /// Create a new slice reader in strict XML mode
    pub fn new_strict(input: &'a [u8]) -> Self {
        Self::with_tokenizer(Tokenizer::new_strict(input))
    }

    /// Create a new slice reader in HTML mode
    pub fn new_html(input: &'a [u8]) -> Self {
        Self::with_tokenizer(Tokenizer::new_html(input))
    }

    fn with_tokenizer(tokenizer: Tokenizer<'a>) -> Self {
        let mode = AttributeMode {
            strict: tokenizer.is_strict(),
            html: tokenizer.is_html(),
        };
        SliceReader {
            tokenizer,
            mode,
            attr_error: None,
            line: 1,
        }
    }

    /// Get parse error (strict mode only)
    pub fn error(&self) -> Option<&SyntaxError> {
        self.attr_error.as_ref().or_else(|| self.tokenizer.error())
    }

    /// Take the parse error, leaving `None`
    pub fn take_error(&mut self) -> Option<SyntaxError> {
        self.attr_error.take().or_else(|| self.tokenizer.take_error())
    }

    /// 1-based line of the most recently returned event
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Get the next event. Returns `None` after `EndDocument` or on a
    /// strict-mode error (see [`SliceReader::error`]).
    pub fn next_event(&mut self) -> Option<XmlEvent<'a>> {
        if self.attr_error.is_some() {
            return None;
        }
        loop {
            let token = self.tokenizer.next_token()?;
            self.line = token.line;

            match token.kind {
                TokenKind::Eof => return Some(XmlEvent::EndDocument),

                TokenKind::StartTag | TokenKind::EmptyTag => {
                    let attrs = self.parse_tag_attributes(&token)?;
                    let name = token.name?;
                    let element = StartElement::new(name, attrs);
                    return Some(if token.kind == TokenKind::StartTag {
                        XmlEvent::StartElement(element)
                    } else {
                        XmlEvent::EmptyElement(element)
                    });
                }

                TokenKind::EndTag => {
                    let name = token.name?;
                    return Some(XmlEvent::EndElement(EndElement::new(name)));
                }

                TokenKind::Text => {
                    if let Some(content) = token.content {
                        if !content.is_empty() {
                            return Some(XmlEvent::Text(content));
                        }
                    }
                }

                TokenKind::CData => {
                    if let Some(content) = token.content {
                        return Some(XmlEvent::CData(content));
                    }
                }

                TokenKind::Comment => {
                    if let Some(content) = token.content {
                        return Some(XmlEvent::Comment(content));
                    }
                }

                TokenKind::ProcessingInstruction => {
                    if let Some(name) = token.name {
                        let data = token.content.filter(|d| !d.is_empty());
                        return Some(XmlEvent::ProcessingInstruction { target: name, data });
                    }
                }

                TokenKind::XmlDeclaration => {
                    let attrs = self.parse_tag_attributes(&token)?;
                    let find = |name: &[u8]| {
                        attrs
                            .iter()
                            .find(|a| a.name.as_ref() == name)
                            .map(|a| a.value.clone())
                    };
                    let version = find(&b"version"[..]).unwrap_or(Cow::Borrowed(b"1.0" as &[u8]));
                    let encoding = find(&b"encoding"[..]);
                    let standalone = find(&b"standalone"[..]).map(|v| v.as_ref() == b"yes");
                    return Some(XmlEvent::XmlDeclaration {
                        version,
                        encoding,
                        standalone,
                    });
                }

                TokenKind::DocType => {
                    return Some(XmlEvent::DocType(token.content.unwrap_or(Cow::Borrowed(b"" as &[u8]))));
                }
            }
        }
    }

    /// Parse the raw attribute region carried by a tag token
    fn parse_tag_attributes(&mut self, token: &Token<'a>) -> Option<Vec<Attribute<'a>>> {
        let raw: &'a [u8] = match &token.content {
            Some(Cow::Borrowed(raw)) => *raw,
            _ => return Some(Vec::new()),
        };
        match parse_attributes(raw, self.mode) {
            Ok(attrs) => Some(attrs),
            Err(message) => {
                self.attr_error = Some(SyntaxError {
                    message,
                    line: token.line,
                });
                None
            }
        }
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = XmlEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_event()? {
            XmlEvent::EndDocument => None,
            event => Some(event),
        }
    }
}

/// Parse a byte slice and return all events (lenient XML)
pub fn parse_events(input: &[u8]) -> Vec<XmlEvent<'_>> {
    SliceReader::new(input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_element() {
        let events = parse_events(b"<root>hello</root>");
        assert_eq!(events.len(), 3);

        assert!(matches!(&events[0], XmlEvent::StartElement(e) if e.name_str() == "root"));
        assert!(matches!(&events[1], XmlEvent::Text(t) if t.as_ref() == b"hello"));
        assert!(matches!(&events[2], XmlEvent::EndElement(e) if e.name_str() == "root"));
    }

    #[test]
    fn test_attributes() {
        let events = parse_events(b"<div id=\"main\" class=\"container\"/>");
        assert_eq!(events.len(), 1);

        let XmlEvent::EmptyElement(e) = &events[0] else {
            panic!("Expected EmptyElement");
        };
        assert_eq!(e.get_attribute_value("id").as_deref(), Some("main"));
        assert_eq!(e.get_attribute_value("class").as_deref(), Some("container"));
    }

    #[test]
    fn test_declaration_and_pi() {
        let events = parse_events(b"<?xml version=\"1.1\" encoding=\"UTF-8\" standalone=\"yes\"?><r><?go now?></r>");
        match &events[0] {
            XmlEvent::XmlDeclaration { version, encoding, standalone } => {
                assert_eq!(version.as_ref(), b"1.1");
                assert_eq!(encoding.as_deref(), Some(b"UTF-8" as &[u8]));
                assert_eq!(*standalone, Some(true));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            &events[2],
            XmlEvent::ProcessingInstruction { target, data: Some(d) } if target.as_ref() == b"go" && d.as_ref() == b"now"
        ));
    }

    #[test]
    fn test_lines_follow_events() {
        let mut reader = SliceReader::new(b"<a>\n\n<b/></a>");
        reader.next_event();
        assert_eq!(reader.line(), 1);
        reader.next_event(); // whitespace text
        reader.next_event();
        assert_eq!(reader.line(), 3);
    }

    #[test]
    fn test_strict_attribute_error_stops_reading() {
        let mut reader = SliceReader::new_strict(b"<r>\n<a x=1/></r>");
        while reader.next_event().is_some() {}
        let err = reader.error().unwrap();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("quoted"));
    }
}
