//! DOM Module - Arena-based Document
//!
//! Implements an efficient DOM representation using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for names, values and text
//! - Namespace resolution stack
//!
//! Nodes are allocated in document order and attribute nodes directly follow
//! their owner element, so comparing two `NodeId`s compares document
//! positions and every subtree occupies a contiguous id range.

pub mod document;
pub mod html;
pub mod namespace;
pub mod node;
pub mod node_ref;
pub mod serialize;
pub mod strings;

pub use document::{NamespaceDecl, OwnedXmlDocument, XmlDocumentView};
pub use namespace::PrefixRegistry;
pub use node::{NodeId, NodeKind, XmlNode};
pub use node_ref::NodeRef;
pub use strings::StringPool;

use crate::options::DocumentKind;

/// Read access to a built document.
///
/// Implementors supply the arena, the string pool and a few document-level
/// facts; everything the XPath engine and the serializer need is derived
/// from those.
pub trait DocumentAccess {
    /// All nodes, indexed by `NodeId`; node 0 is the document node
    fn nodes(&self) -> &[XmlNode];

    /// The string pool for direct access
    fn strings(&self) -> &StringPool;

    /// Get root element ID
    fn root_element_id(&self) -> Option<NodeId>;

    /// Markup dialect the document was parsed as
    fn kind(&self) -> DocumentKind;

    /// `xmlns` declarations written on an element
    fn namespace_decls(&self, id: NodeId) -> &[NamespaceDecl];

    #[inline]
    fn is_html(&self) -> bool {
        self.kind().is_html()
    }

    #[inline]
    fn node_count(&self) -> usize {
        self.nodes().len()
    }

    /// Get a node by ID
    #[inline]
    fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes().get(id as usize)
    }

    #[inline]
    fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    #[inline]
    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|n| n.parent)
    }

    /// Qualified name of an element or attribute, or the target of a PI
    fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::Attribute | NodeKind::ProcessingInstruction => {
                self.strings().get_opt(node.name_id)
            }
            _ => None,
        }
    }

    /// Name without its prefix
    fn node_local_name(&self, id: NodeId) -> Option<&str> {
        let name = self.node_name(id)?;
        let node = self.get_node(id)?;
        if node.prefix_id == 0 {
            return Some(name);
        }
        Some(name.split_once(':').map_or(name, |(_, local)| local))
    }

    /// Namespace prefix as written in the markup
    fn node_prefix(&self, id: NodeId) -> Option<&str> {
        self.get_node(id).and_then(|n| self.strings().get_opt(n.prefix_id))
    }

    /// Resolved namespace URI
    fn node_namespace(&self, id: NodeId) -> Option<&str> {
        self.get_node(id).and_then(|n| self.strings().get_opt(n.namespace_id))
    }

    /// Attribute value, character data, comment text or PI data
    fn node_value(&self, id: NodeId) -> Option<&str> {
        self.get_node(id).map(|n| self.strings().get(n.value_id))
    }

    /// Direct children, in order
    fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            nodes: self.nodes(),
            next: self.get_node(id).and_then(|n| n.first_child),
        }
    }

    fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    /// Attribute node ids of an element
    fn attribute_ids(&self, id: NodeId) -> std::ops::Range<NodeId> {
        match self.get_node(id) {
            Some(node) if node.kind == NodeKind::Element => node.attribute_ids(),
            _ => 0..0,
        }
    }

    /// Get attribute value by qualified name
    fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str> {
        let html = self.is_html();
        self.attribute_ids(node_id)
            .find(|&attr| {
                self.node_name(attr).is_some_and(|n| {
                    if html {
                        n.eq_ignore_ascii_case(name)
                    } else {
                        n == name
                    }
                })
            })
            .and_then(|attr| self.node_value(attr))
    }

    /// Get all attribute names and values
    fn get_attribute_values(&self, node_id: NodeId) -> Vec<(&str, &str)> {
        self.attribute_ids(node_id)
            .filter_map(|attr| Some((self.node_name(attr)?, self.node_value(attr)?)))
            .collect()
    }

    /// First id after the subtree rooted at `id`
    fn subtree_end(&self, id: NodeId) -> NodeId {
        if self.node_kind(id) == Some(NodeKind::Attribute) {
            return id + 1;
        }
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.get_node(node_id) else { break };
            if let Some(next) = node.next_sibling {
                return next;
            }
            current = node.parent;
        }
        self.node_count() as NodeId
    }

    /// Descendants in document order, attributes excluded
    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId> {
        let nodes = self.nodes();
        (id + 1..self.subtree_end(id))
            .filter(|&d| nodes[d as usize].kind != NodeKind::Attribute)
            .collect()
    }

    /// XPath string-value of a node
    fn string_value(&self, id: NodeId) -> String {
        let Some(node) = self.get_node(id) else {
            return String::new();
        };
        match node.kind {
            NodeKind::Document | NodeKind::Element => {
                let nodes = self.nodes();
                let mut out = String::new();
                for d in id + 1..self.subtree_end(id) {
                    let n = &nodes[d as usize];
                    if n.kind.is_text_like() {
                        out.push_str(self.strings().get(n.value_id));
                    }
                }
                out
            }
            _ => self.strings().get(node.value_id).to_string(),
        }
    }

    /// Element carrying the given ID (`xml:id`, or `id` in HTML)
    fn element_by_id(&self, value: &str) -> Option<NodeId> {
        let html = self.is_html();
        self.nodes()
            .iter()
            .enumerate()
            .filter(|(_, n)| n.kind == NodeKind::Attribute)
            .find(|(i, n)| {
                let name = self.strings().get(n.name_id);
                (name == "xml:id" || (html && name == "id")) && self.node_value(*i as NodeId) == Some(value)
            })
            .and_then(|(_, n)| n.parent)
    }
}

/// Iterator over the children of a node
pub struct Children<'a> {
    nodes: &'a [XmlNode],
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.nodes.get(current as usize).and_then(|n| n.next_sibling);
        Some(current)
    }
}
