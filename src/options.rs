//! Parse-time configuration.

use crate::core::encoding::Encoding;

/// Markup dialect of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DocumentKind {
    #[default]
    Xml,
    Html,
}

impl DocumentKind {
    pub fn is_html(self) -> bool {
        self == DocumentKind::Html
    }
}

/// Number of compiled XPath expressions cached per document by default
pub const DEFAULT_EXPRESSION_CACHE: usize = 64;

/// How a document is parsed and queried.
///
/// ```
/// use xmlvault::{Document, ParseOptions};
///
/// let doc = Document::with_options(b"<r><a/></r>", ParseOptions::xml().strict(true)).unwrap();
/// assert_eq!(doc.xpath("//a").len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub kind: DocumentKind,
    /// Reject malformed input instead of recovering (XML only)
    pub strict: bool,
    /// Capacity of the compiled-expression cache; 0 disables caching
    pub expression_cache: usize,
    /// Override encoding detection
    pub encoding: Option<Encoding>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            kind: DocumentKind::Xml,
            strict: false,
            expression_cache: DEFAULT_EXPRESSION_CACHE,
            encoding: None,
        }
    }
}

impl ParseOptions {
    /// Lenient XML
    pub fn xml() -> Self {
        Self::default()
    }

    /// HTML (always lenient)
    pub fn html() -> Self {
        ParseOptions {
            kind: DocumentKind::Html,
            ..Self::default()
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn expression_cache(mut self, capacity: usize) -> Self {
        self.expression_cache = capacity;
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Strictness actually applied; HTML is never parsed strictly
    pub(crate) fn is_strict(&self) -> bool {
        self.strict && self.kind == DocumentKind::Xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_compose() {
        let opts = ParseOptions::html().strict(true).expression_cache(8).encoding(Encoding::Latin1);
        assert_eq!(opts.kind, DocumentKind::Html);
        assert_eq!(opts.expression_cache, 8);
        assert_eq!(opts.encoding, Some(Encoding::Latin1));
        assert!(!opts.is_strict());
        assert!(ParseOptions::xml().strict(true).is_strict());
        assert_eq!(ParseOptions::default().expression_cache, DEFAULT_EXPRESSION_CACHE);
    }
}
