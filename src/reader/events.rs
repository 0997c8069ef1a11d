//! Event Types
//!
//! Event types for pull-parser style processing.

use crate::core::attributes::{split_name, Attribute};
use std::borrow::Cow;

/// Parsing event
#[derive(Debug, Clone)]
pub enum XmlEvent<'a> {
    /// Start of an element: <name attrs...>
    StartElement(StartElement<'a>),
    /// End of an element: </name>
    EndElement(EndElement<'a>),
    /// Empty element: <name attrs.../>
    EmptyElement(StartElement<'a>),
    /// Text content between tags
    Text(Cow<'a, [u8]>),
    /// CDATA section content
    CData(Cow<'a, [u8]>),
    /// Comment content
    Comment(Cow<'a, [u8]>),
    /// Processing instruction: <?target data?>
    ProcessingInstruction {
        target: Cow<'a, [u8]>,
        data: Option<Cow<'a, [u8]>>,
    },
    /// XML declaration: <?xml version="1.0"?>
    XmlDeclaration {
        version: Cow<'a, [u8]>,
        encoding: Option<Cow<'a, [u8]>>,
        standalone: Option<bool>,
    },
    /// DOCTYPE declaration (content after the keyword)
    DocType(Cow<'a, [u8]>),
    /// End of document
    EndDocument,
}

/// Start element event data
#[derive(Debug, Clone)]
pub struct StartElement<'a> {
    /// Full element name (may include prefix)
    pub name: Cow<'a, [u8]>,
    /// Element attributes, namespace declarations included
    pub attributes: Vec<Attribute<'a>>,
}

impl<'a> StartElement<'a> {
    pub fn new(name: Cow<'a, [u8]>, attributes: Vec<Attribute<'a>>) -> Self {
        StartElement { name, attributes }
    }

    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&[u8]> {
        split_name(self.name.as_ref()).0
    }

    /// Local name (after colon)
    pub fn local_name(&self) -> &[u8] {
        split_name(self.name.as_ref()).1
    }

    /// Get the name as a string
    pub fn name_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name.as_ref())
    }

    /// Get an attribute value by name as string
    pub fn get_attribute_value(&self, name: &str) -> Option<Cow<'_, str>> {
        self.attributes
            .iter()
            .find(|a| a.name.as_ref() == name.as_bytes())
            .map(|a| a.value_str())
    }
}

/// End element event data
#[derive(Debug, Clone)]
pub struct EndElement<'a> {
    /// Full element name
    pub name: Cow<'a, [u8]>,
}

impl<'a> EndElement<'a> {
    pub fn new(name: Cow<'a, [u8]>) -> Self {
        EndElement { name }
    }

    /// Get the name as a string
    pub fn name_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name.as_ref())
    }
}

impl<'a> XmlEvent<'a> {
    /// Check if this is a start element event
    pub fn is_start_element(&self) -> bool {
        matches!(self, XmlEvent::StartElement(_) | XmlEvent::EmptyElement(_))
    }

    /// Get text content if applicable
    pub fn as_text(&self) -> Option<&[u8]> {
        match self {
            XmlEvent::Text(t) | XmlEvent::CData(t) => Some(t.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_element() {
        let elem = StartElement::new(Cow::Borrowed(b"svg:rect"), vec![]);
        assert_eq!(elem.name_str(), "svg:rect");
        assert_eq!(elem.local_name(), b"rect");
        assert_eq!(elem.prefix(), Some(b"svg" as &[u8]));
        assert!(XmlEvent::EmptyElement(elem).is_start_element());
    }

    #[test]
    fn test_text_access() {
        assert_eq!(XmlEvent::CData(Cow::Borrowed(b"x")).as_text(), Some(b"x" as &[u8]));
        assert_eq!(XmlEvent::Comment(Cow::Borrowed(b"x")).as_text(), None);
    }
}
