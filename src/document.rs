//! Thread-safe Document Handle
//!
//! `Document` is the only way in: it owns the parsed tree behind a lock and
//! answers every query with owned snapshots. Clones share the same tree, and
//! operations on one document are totally ordered.
//!
//! ```
//! use xmlvault::Document;
//!
//! let doc = Document::from_str("<shop><item>a</item><item>b</item></shop>").unwrap();
//! let items = doc.xpath("//item");
//! assert_eq!(items.len(), 2);
//! assert_eq!(items[1].text(), "b");
//! ```

use std::ffi::CStr;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::core::encoding::Encoding;
use crate::css;
use crate::dom::{serialize, DocumentAccess, NodeId, NodeRef, OwnedXmlDocument};
use crate::error::{ParseError, QueryError};
use crate::options::ParseOptions;
use crate::resource::DocumentResource;
use crate::snapshot::{capture, capture_document, DocumentSnapshot, ElementSnapshot, NodeHandle, QueryResult};
use crate::strategy::parallel;
use crate::xpath::XPathValue;

/// Shared handle to one parsed document
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentResource>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document").field("id", &self.inner.id()).finish()
    }
}

impl Document {
    // ======================================================================
    // Construction
    // ======================================================================

    /// Parse XML bytes, sniffing the encoding
    pub fn parse(input: &[u8]) -> Result<Self, ParseError> {
        Self::with_options(input, ParseOptions::xml())
    }

    /// Parse HTML bytes
    pub fn parse_html(input: &[u8]) -> Result<Self, ParseError> {
        Self::with_options(input, ParseOptions::html())
    }

    /// Parse UTF-8 XML text
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Result<Self, ParseError> {
        Self::from_text(text, Encoding::Utf8, ParseOptions::xml())
    }

    /// Parse text that the document should report as `label`.
    ///
    /// Fails with `ParseError::Encoding` when the label is unknown or the
    /// text holds characters the encoding cannot represent.
    pub fn from_str_with_encoding(text: &str, label: &str) -> Result<Self, ParseError> {
        let encoding = Encoding::from_label(label)
            .ok_or_else(|| ParseError::Encoding(format!("Unknown encoding label '{}'", label)))?;
        if !encoding.can_represent(text) {
            return Err(ParseError::Encoding(format!(
                "Text contains characters not representable in {}",
                encoding
            )));
        }
        Self::from_text(text, encoding, ParseOptions::xml())
    }

    /// Parse a NUL-terminated buffer
    pub fn from_cstr(input: &CStr) -> Result<Self, ParseError> {
        Self::parse(input.to_bytes())
    }

    /// Parse bytes with explicit options
    pub fn with_options(input: &[u8], options: ParseOptions) -> Result<Self, ParseError> {
        let doc = OwnedXmlDocument::parse(input, &options)?;
        Ok(Self::from_owned(doc, &options))
    }

    fn from_text(text: &str, encoding: Encoding, options: ParseOptions) -> Result<Self, ParseError> {
        let doc = OwnedXmlDocument::parse_str(text, encoding, &options)?;
        Ok(Self::from_owned(doc, &options))
    }

    fn from_owned(doc: OwnedXmlDocument, options: &ParseOptions) -> Self {
        Document {
            inner: Arc::new(DocumentResource::new(doc, options)),
        }
    }

    // ======================================================================
    // Properties
    // ======================================================================

    /// Bind `prefix` to `uri` for all later queries; rebinding overwrites
    pub fn define_prefix(&self, prefix: &str, uri: &str) {
        debug!(prefix, uri, "define prefix");
        self.inner.with_state(|state| state.define_prefix(prefix, uri));
    }

    /// The first root-level element
    pub fn root(&self) -> Option<ElementSnapshot> {
        let id = self.inner.id();
        self.inner.with_view(|view| {
            let root = view.root_element_id()?;
            NodeRef::new(view, root).map(|node| capture(id, node))
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.inner.with_view(|view| view.encoding())
    }

    /// Version from the XML declaration
    pub fn version(&self) -> Option<String> {
        self.inner.with_view(|view| view.version().map(str::to_string))
    }

    /// Document-level properties and the root element
    pub fn snapshot(&self) -> DocumentSnapshot {
        let id = self.inner.id();
        self.inner.with_view(|view| capture_document(id, view))
    }

    /// Number of nodes in the arena, the document node and attributes included
    pub fn node_count(&self) -> usize {
        self.inner.with_view(|view| view.node_count())
    }

    /// Serialize the whole document
    pub fn to_xml(&self) -> String {
        self.inner.with_view(serialize::document_to_string)
    }

    /// Text of the first `<title>`
    pub fn title(&self) -> Option<String> {
        self.first_xpath("//*[local-name() = 'title']")
            .map(|title| title.text().trim().to_string())
    }

    pub fn head(&self) -> Option<ElementSnapshot> {
        self.first_xpath("//*[local-name() = 'head']")
    }

    pub fn body(&self) -> Option<ElementSnapshot> {
        self.first_xpath("//*[local-name() = 'body']")
    }

    // ======================================================================
    // XPath
    // ======================================================================

    /// Nodes selected by `expr`, in document order.
    ///
    /// Empty when nothing matches and when the expression is invalid; use
    /// [`try_xpath`](Self::try_xpath) to tell the two apart.
    pub fn xpath(&self, expr: &str) -> Vec<ElementSnapshot> {
        self.try_xpath(expr).unwrap_or_else(|err| {
            debug!(expr, %err, "xpath query failed");
            Vec::new()
        })
    }

    /// Like [`xpath`](Self::xpath) but reports invalid expressions, including
    /// ones that evaluate to a scalar
    pub fn try_xpath(&self, expr: &str) -> Result<Vec<ElementSnapshot>, QueryError> {
        self.select(expr, 0)
            .map_err(|reason| QueryError::expression(expr, reason))
    }

    pub fn first_xpath(&self, expr: &str) -> Option<ElementSnapshot> {
        self.xpath(expr).into_iter().next()
    }

    /// Scalar views of any expression; `None` when it fails
    pub fn eval(&self, expr: &str) -> Option<QueryResult> {
        let result = self.inner.with_state(|state| {
            let value = state.evaluate(expr, 0)?;
            Ok::<_, String>(QueryResult::from_value(&state.view(), &value))
        });
        match result {
            Ok(result) => Some(result),
            Err(err) => {
                debug!(expr, %err, "eval failed");
                None
            }
        }
    }

    /// Evaluate `expr` with a previously captured node as context.
    /// A node from another document yields nothing.
    pub fn xpath_from(&self, context: &ElementSnapshot, expr: &str) -> Vec<ElementSnapshot> {
        self.try_xpath_from(context, expr).unwrap_or_else(|err| {
            debug!(expr, %err, "relative xpath query failed");
            Vec::new()
        })
    }

    pub fn try_xpath_from(&self, context: &ElementSnapshot, expr: &str) -> Result<Vec<ElementSnapshot>, QueryError> {
        let node = self.context_node(context.handle())?;
        self.select(expr, node)
            .map_err(|reason| QueryError::expression(expr, reason))
    }

    /// Evaluate several expressions in one locked operation, in parallel.
    /// Results are in input order.
    pub fn xpath_batch(&self, exprs: &[&str]) -> Vec<Result<Vec<ElementSnapshot>, QueryError>> {
        let id = self.inner.id();
        self.inner.with_state(|state| {
            let compiled: Vec<_> = exprs.iter().map(|expr| state.compile(expr)).collect();
            let (doc, prefixes) = state.parts();
            let values = parallel::evaluate_parallel(doc, prefixes, &compiled);

            exprs
                .iter()
                .zip(values)
                .map(|(expr, value)| -> Result<Vec<ElementSnapshot>, QueryError> {
                    let nodes = value
                        .and_then(require_nodeset)
                        .map_err(|reason| QueryError::expression(expr, reason))?;
                    trace!(expr, matches = nodes.len(), "batch query");
                    Ok(parallel::capture_nodes(id, doc.view(), &nodes))
                })
                .collect()
        })
    }

    // ======================================================================
    // CSS
    // ======================================================================

    /// Elements matching a CSS selector, in document order; empty on error
    pub fn css(&self, selector: &str) -> Vec<ElementSnapshot> {
        self.try_css(selector).unwrap_or_else(|err| {
            debug!(selector, %err, "css query failed");
            Vec::new()
        })
    }

    pub fn try_css(&self, selector: &str) -> Result<Vec<ElementSnapshot>, QueryError> {
        let xpath = css::to_xpath(selector).map_err(|reason| QueryError::selector(selector, reason))?;
        self.select(&xpath, 0)
            .map_err(|reason| QueryError::selector(selector, reason))
    }

    pub fn first_css(&self, selector: &str) -> Option<ElementSnapshot> {
        self.css(selector).into_iter().next()
    }

    /// CSS query scoped to a previously captured node, which may match itself
    pub fn css_from(&self, context: &ElementSnapshot, selector: &str) -> Vec<ElementSnapshot> {
        self.try_css_from(context, selector).unwrap_or_else(|err| {
            debug!(selector, %err, "relative css query failed");
            Vec::new()
        })
    }

    pub fn try_css_from(&self, context: &ElementSnapshot, selector: &str) -> Result<Vec<ElementSnapshot>, QueryError> {
        let node = self.context_node(context.handle())?;
        let xpath = css::to_xpath(selector).map_err(|reason| QueryError::selector(selector, reason))?;
        self.select(&xpath, node)
            .map_err(|reason| QueryError::selector(selector, reason))
    }

    // ======================================================================
    // Internals
    // ======================================================================

    /// Evaluate and capture a node-set in one critical section
    fn select(&self, xpath: &str, context: NodeId) -> Result<Vec<ElementSnapshot>, String> {
        let id = self.inner.id();
        self.inner.with_state(|state| {
            let nodes = require_nodeset(state.evaluate(xpath, context)?)?;
            trace!(xpath, context, matches = nodes.len(), "query");
            Ok(parallel::capture_nodes(id, state.view(), &nodes))
        })
    }

    /// Node id behind a handle minted by this document
    fn context_node(&self, handle: NodeHandle) -> Result<NodeId, QueryError> {
        if handle.document() != self.inner.id() {
            return Err(QueryError::ForeignNode);
        }
        Ok(handle.node())
    }
}

impl FromStr for Document {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Document::from_str(text)
    }
}

fn require_nodeset(value: XPathValue) -> Result<Vec<NodeId>, String> {
    match value {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(format!("Expression evaluates to a {}, not a node-set", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeKind;
    use crate::options::DocumentKind;

    const SHOP: &str = r#"<?xml version="1.0"?>
<shop xmlns:p="urn:price">
  <item id="1" class="fresh sale"><name>apple</name><p:cost>3</p:cost></item>
  <item id="2"><name>pear</name><p:cost>5</p:cost></item>
</shop>"#;

    #[test]
    fn test_construction_errors() {
        assert_eq!(Document::parse(b"").unwrap_err(), ParseError::EmptyInput);
        assert_eq!(Document::from_str("  \n ").unwrap_err(), ParseError::EmptyInput);
        assert!(matches!(
            Document::from_str_with_encoding("<a/>", "klingon"),
            Err(ParseError::Encoding(_))
        ));
        assert!(matches!(
            Document::from_str_with_encoding("<a>é</a>", "US-ASCII"),
            Err(ParseError::Encoding(_))
        ));
        assert!(matches!(
            Document::with_options(b"<a><b></a>", ParseOptions::xml().strict(true)),
            Err(ParseError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn test_construction_variants() {
        let doc = Document::from_str_with_encoding("<a>é</a>", "iso-8859-1").unwrap();
        assert_eq!(doc.encoding(), Encoding::Latin1);

        let c = CStr::from_bytes_with_nul(b"<r><x/></r>\0").unwrap();
        assert_eq!(Document::from_cstr(c).unwrap().xpath("//x").len(), 1);

        let parsed: Document = "<r/>".parse().unwrap();
        assert_eq!(parsed.root().and_then(|r| r.tag().map(str::to_string)), Some("r".to_string()));
    }

    #[test]
    fn test_properties() {
        let doc = Document::from_str(SHOP).unwrap();
        assert_eq!(doc.version().as_deref(), Some("1.0"));
        assert_eq!(doc.encoding(), Encoding::Utf8);
        let snap = doc.snapshot();
        assert_eq!(snap.kind(), DocumentKind::Xml);
        assert_eq!(snap.root(), doc.root().as_ref());
        assert!(doc.to_xml().contains("<p:cost>3</p:cost>"));
        assert!(doc.node_count() > 10);
    }

    #[test]
    fn test_xpath_queries() {
        let doc = Document::from_str(SHOP).unwrap();
        let names: Vec<_> = doc.xpath("//item/name").iter().map(|n| n.text().to_string()).collect();
        assert_eq!(names, vec!["apple", "pear"]);

        let item = doc.first_xpath("//item[@id='1']").unwrap();
        assert!(item.has_class("sale"));
        assert_eq!(item.attr("id"), Some("1"));

        assert!(doc.xpath("//[").is_empty());
        assert!(matches!(doc.try_xpath("//["), Err(QueryError::InvalidExpression { .. })));
        assert!(matches!(doc.try_xpath("count(//item)"), Err(QueryError::InvalidExpression { .. })));
        assert_eq!(doc.try_xpath("//missing").unwrap(), Vec::new());

        let attrs = doc.xpath("//item/@id");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].kind(), NodeKind::Attribute);
        assert_eq!(attrs[0].tag(), Some("id"));
        assert_eq!(attrs[0].text(), "1");
    }

    #[test]
    fn test_registered_prefixes() {
        let doc = Document::from_str(SHOP).unwrap();
        assert!(doc.xpath("//price:cost").is_empty());
        doc.define_prefix("price", "urn:price");
        assert_eq!(doc.xpath("//price:cost").len(), 2);
        doc.define_prefix("price", "urn:other");
        assert!(doc.xpath("//price:cost").is_empty());
    }

    #[test]
    fn test_empty_prefix_is_inert() {
        let doc = Document::from_str(r#"<r><child/><x:child xmlns:x="urn:x"/></r>"#).unwrap();
        let before = (doc.xpath("//child"), doc.try_xpath("//undefined:child"));
        doc.define_prefix("", "urn:x");
        assert_eq!(doc.xpath("//child"), before.0);
        assert_eq!(doc.xpath("//child").len(), 1);
        assert_eq!(doc.try_xpath("//undefined:child"), before.1);
        assert!(doc.xpath("//undefined:child").is_empty());
    }

    #[test]
    fn test_deep_input_is_an_error() {
        let doc = Document::from_str(SHOP).unwrap();
        let parens = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        assert!(doc.eval(&parens).is_none());
        assert!(matches!(doc.try_xpath(&parens), Err(QueryError::InvalidExpression { .. })));

        let nots = format!("item{}name{}", ":not(".repeat(20_000), ")".repeat(20_000));
        assert!(doc.css(&nots).is_empty());
        assert!(matches!(doc.try_css(&nots), Err(QueryError::InvalidSelector { .. })));

        assert!(doc.css("item:nth-child(n-9223372036854775807)").is_empty());
        assert!(doc.try_css("item:nth-child(n-9223372036854775807)").is_err());
        assert!(doc.try_css("item:not(:not(name))").is_ok());
    }

    #[test]
    fn test_eval_scalars() {
        let doc = Document::from_str(SHOP).unwrap();
        doc.define_prefix("c", "urn:price");
        let total = doc.eval("sum(//c:cost)").unwrap();
        assert_eq!(total.number, 8.0);
        assert_eq!(total.string, "8");
        assert!(total.boolean);

        let name = doc.eval("//name").unwrap();
        assert_eq!(name.string, "apple");
        assert!(name.number.is_nan());
        assert!(doc.eval("1 +").is_none());
        assert!(doc.eval("$x").is_none());
    }

    #[test]
    fn test_relative_queries() {
        let doc = Document::from_str(SHOP).unwrap();
        let second = doc.xpath("//item")[1].clone();
        let names = doc.xpath_from(&second, "name");
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].text(), "pear");
        assert_eq!(doc.xpath_from(&second, "..")[0].tag(), Some("shop"));
        assert_eq!(doc.css_from(&second, "name")[0].text(), "pear");

        let other = Document::from_str(SHOP).unwrap();
        assert!(other.xpath_from(&second, "name").is_empty());
        assert_eq!(other.try_xpath_from(&second, "name"), Err(QueryError::ForeignNode));
        assert_eq!(other.try_css_from(&second, "name"), Err(QueryError::ForeignNode));
    }

    #[test]
    fn test_css_queries() {
        let doc = Document::from_str(SHOP).unwrap();
        assert_eq!(doc.css("item.sale > name").len(), 1);
        assert_eq!(doc.first_css("item:last-child name").map(|n| n.text().to_string()), Some("pear".into()));
        assert!(doc.css("item:hover").is_empty());
        assert!(matches!(doc.try_css("item:hover"), Err(QueryError::InvalidSelector { .. })));
    }

    #[test]
    fn test_batch_preserves_input_order() {
        let doc = Document::from_str(SHOP).unwrap();
        let results = doc.xpath_batch(&["//name", "//[", "//item", "count(//item)"]);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().map(Vec::len), Ok(2));
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().map(Vec::len), Ok(2));
        assert!(results[3].is_err());
    }

    #[test]
    fn test_html_helpers() {
        let doc = Document::parse_html(
            b"<html><head><title> Shop </title></head><body><p>hi<p>there</body></html>",
        )
        .unwrap();
        assert_eq!(doc.title().as_deref(), Some("Shop"));
        assert_eq!(doc.head().and_then(|h| h.tag().map(str::to_string)).as_deref(), Some("head"));
        assert_eq!(doc.body().map(|b| b.text().to_string()).as_deref(), Some("hithere"));
        assert_eq!(doc.css("p").len(), 2);
        assert_eq!(doc.snapshot().kind(), DocumentKind::Html);
    }

    #[test]
    fn test_clones_share_state() {
        let doc = Document::from_str(SHOP).unwrap();
        let clone = doc.clone();
        clone.define_prefix("q", "urn:price");
        assert_eq!(doc.xpath("//q:cost").len(), 2);
        assert_eq!(doc.xpath("//item")[0], clone.xpath("//item")[0]);
    }

    #[test]
    fn test_document_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Document>();
    }
}
