//! Borrowed accessor for a single node
//!
//! A `NodeRef` is only valid while the document it borrows is locked, which
//! the lifetime enforces: it cannot escape the operation that produced it.

use super::document::{OwnedXmlDocument, XmlDocumentView};
use super::node::{NodeId, NodeKind};
use super::serialize;
use super::DocumentAccess;

/// Read-only view of one node in a document
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a OwnedXmlDocument,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    /// Accessor for `id`, or `None` when the id is not in the document
    pub fn new(view: XmlDocumentView<'a>, id: NodeId) -> Option<Self> {
        let doc = view.document();
        doc.get_node(id)?;
        Some(NodeRef { doc, id })
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn view(&self) -> XmlDocumentView<'a> {
        self.doc.view()
    }

    pub fn kind(&self) -> NodeKind {
        self.doc.node_kind(self.id).unwrap_or(NodeKind::Document)
    }

    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    /// Qualified name (elements, attributes) or target (PIs)
    pub fn name(&self) -> Option<&'a str> {
        self.doc.node_name(self.id)
    }

    pub fn local_name(&self) -> Option<&'a str> {
        self.doc.node_local_name(self.id)
    }

    pub fn prefix(&self) -> Option<&'a str> {
        self.doc.node_prefix(self.id)
    }

    pub fn namespace_uri(&self) -> Option<&'a str> {
        self.doc.node_namespace(self.id)
    }

    /// Attribute (name, value) pairs in document order; `xmlns` declarations
    /// are not attributes
    pub fn attributes(&self) -> Vec<(&'a str, &'a str)> {
        self.doc.get_attribute_values(self.id)
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.doc.get_attribute(self.id, name)
    }

    /// XPath string-value
    pub fn string_value(&self) -> String {
        self.doc.string_value(self.id)
    }

    /// Serialized markup of the node and its subtree
    pub fn raw(&self) -> String {
        serialize::node_to_string(self.doc, self.id)
    }

    /// 1-based line where the node's markup starts
    pub fn line(&self) -> u32 {
        self.doc.get_node(self.id).map_or(0, |n| n.line)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        let id = self.doc.parent_of(self.id)?;
        Some(NodeRef { doc: self.doc, id })
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let doc = self.doc;
        doc.children(self.id).map(move |id| NodeRef { doc, id })
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}
