//! Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Attribute, stored directly after its owner element
    Attribute,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
}

impl NodeKind {
    /// Lower-case kind name
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Element => "element",
            NodeKind::Attribute => "attribute",
            NodeKind::Text => "text",
            NodeKind::CData => "cdata",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing-instruction",
        }
    }

    /// Text and CDATA both count as XPath text nodes
    #[inline]
    pub fn is_text_like(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::CData)
    }
}

/// A node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (owner element for attributes, None for the document)
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// Qualified name (elements, attributes) or target (PIs)
    pub name_id: u32,
    /// Namespace prefix, or 0
    pub prefix_id: u32,
    /// Namespace URI, or 0
    pub namespace_id: u32,
    /// Attribute value, character data, comment text or PI data
    pub value_id: u32,
    /// First attribute node (elements with attributes)
    pub attr_start: NodeId,
    /// Number of attribute nodes following the element
    pub attr_count: u16,
    /// Depth in document tree
    pub depth: u16,
    /// 1-based line where the node's markup starts
    pub line: u32,
}

impl XmlNode {
    fn blank(kind: NodeKind, parent: Option<NodeId>, depth: u16, line: u32) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            prefix_id: 0,
            namespace_id: 0,
            value_id: 0,
            attr_start: 0,
            attr_count: 0,
            depth,
            line,
        }
    }

    /// Create a new document root node
    pub fn document() -> Self {
        Self::blank(NodeKind::Document, None, 0, 1)
    }

    /// Create a new element node
    pub fn element(name_id: u32, parent: Option<NodeId>, depth: u16, line: u32) -> Self {
        XmlNode {
            name_id,
            ..Self::blank(NodeKind::Element, parent, depth, line)
        }
    }

    /// Create an attribute node owned by `owner`
    pub fn attribute(name_id: u32, value_id: u32, owner: NodeId, depth: u16, line: u32) -> Self {
        XmlNode {
            name_id,
            value_id,
            ..Self::blank(NodeKind::Attribute, Some(owner), depth, line)
        }
    }

    /// Create a character data node (text, CDATA or comment)
    pub fn character_data(kind: NodeKind, value_id: u32, parent: Option<NodeId>, depth: u16, line: u32) -> Self {
        XmlNode {
            value_id,
            ..Self::blank(kind, parent, depth, line)
        }
    }

    /// Create a processing instruction node
    pub fn processing_instruction(
        target_id: u32,
        data_id: u32,
        parent: Option<NodeId>,
        depth: u16,
        line: u32,
    ) -> Self {
        XmlNode {
            name_id: target_id,
            value_id: data_id,
            ..Self::blank(NodeKind::ProcessingInstruction, parent, depth, line)
        }
    }

    /// Check if this is an element node
    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Ids of this element's attribute nodes
    #[inline]
    pub fn attribute_ids(&self) -> std::ops::Range<NodeId> {
        self.attr_start..self.attr_start + self.attr_count as NodeId
    }
}
