//! Immutable Snapshots
//!
//! Owned copies of what a query observed. Snapshots hold no borrow of the
//! tree, so they are `Send + Sync` and outlive the lock that produced them.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::encoding::Encoding;
use crate::dom::{serialize, DocumentAccess, NodeId, NodeKind, NodeRef, XmlDocumentView};
use crate::options::DocumentKind;
use crate::xpath::XPathValue;

/// Identity of one parsed document, unique for the life of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

impl DocumentId {
    pub(crate) fn next() -> Self {
        DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Position of a node inside the document that captured it.
///
/// Only the minting document honors a handle; any other document treats it
/// as foreign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub(crate) document: DocumentId,
    pub(crate) node: NodeId,
}

impl NodeHandle {
    pub fn document(&self) -> DocumentId {
        self.document
    }

    pub fn node(&self) -> NodeId {
        self.node
    }
}

/// Owned copy of a node's observable state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementSnapshot {
    handle: NodeHandle,
    kind: NodeKind,
    tag: Option<String>,
    prefix: Option<String>,
    namespace: Option<String>,
    attributes: BTreeMap<String, String>,
    line: u32,
    raw: String,
    text: String,
}

impl ElementSnapshot {
    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Qualified name; attribute name for attributes, target for processing
    /// instructions, `None` for character data
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Name without its prefix
    pub fn local_name(&self) -> Option<&str> {
        let tag = self.tag.as_deref()?;
        Some(tag.split_once(':').map_or(tag, |(_, local)| local))
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Namespace URI
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the whitespace-separated `class` attribute contains `class`
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    /// 1-based line of the node's markup
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Serialized markup of the subtree
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// XPath string-value
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Owned copy of document-level properties
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentSnapshot {
    encoding: Encoding,
    version: Option<String>,
    kind: DocumentKind,
    root: Option<ElementSnapshot>,
    raw: String,
}

impl DocumentSnapshot {
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn root(&self) -> Option<&ElementSnapshot> {
        self.root.as_ref()
    }

    /// Whole document serialized
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Scalar views of an XPath result under the 1.0 conversion rules
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub boolean: bool,
    pub number: f64,
    pub string: String,
}

impl QueryResult {
    pub(crate) fn from_value<D: DocumentAccess>(doc: &D, value: &XPathValue) -> Self {
        QueryResult {
            boolean: value.to_boolean(),
            number: value.to_number(doc),
            string: value.to_string_value(doc),
        }
    }
}

// Numbers compare by bit pattern so NaN results stay equal to themselves.
impl PartialEq for QueryResult {
    fn eq(&self, other: &Self) -> bool {
        self.boolean == other.boolean
            && self.number.to_bits() == other.number.to_bits()
            && self.string == other.string
    }
}

impl Eq for QueryResult {}

impl Hash for QueryResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.boolean.hash(state);
        self.number.to_bits().hash(state);
        self.string.hash(state);
    }
}

/// Copy every observable field of `node`
pub fn capture(document: DocumentId, node: NodeRef<'_>) -> ElementSnapshot {
    let attributes = if node.is_element() {
        node.attributes()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    } else {
        BTreeMap::new()
    };

    ElementSnapshot {
        handle: NodeHandle {
            document,
            node: node.id(),
        },
        kind: node.kind(),
        tag: node.name().map(str::to_string),
        prefix: node.prefix().map(str::to_string),
        namespace: node.namespace_uri().map(str::to_string),
        attributes,
        line: node.line(),
        raw: node.raw(),
        text: node.string_value(),
    }
}

/// Copy document-level properties and the root element
pub fn capture_document(document: DocumentId, view: XmlDocumentView<'_>) -> DocumentSnapshot {
    let root = view
        .root_element_id()
        .and_then(|id| NodeRef::new(view, id))
        .map(|node| capture(document, node));

    DocumentSnapshot {
        encoding: view.encoding(),
        version: view.version().map(str::to_string),
        kind: view.kind(),
        root,
        raw: serialize::document_to_string(view),
    }
}
