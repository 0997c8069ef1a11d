//! Markup serialization of nodes and documents
//!
//! Iterative with an explicit stack so deep documents cannot overflow the
//! call stack.

use super::document::XmlDocumentView;
use super::html;
use super::node::{NodeId, NodeKind};
use super::DocumentAccess;
use crate::core::entities::{encode_attribute, encode_text};

/// Serialize a node and its subtree.
///
/// Namespace declarations inherited from ancestors are written on the
/// subtree root so the fragment stands alone.
pub fn node_to_string<D: DocumentAccess>(doc: &D, node_id: NodeId) -> String {
    let mut buf = String::with_capacity(256);
    write_node(doc, node_id, &mut buf);
    buf
}

/// Serialize a whole document: declaration, DOCTYPE, then every top-level node
pub fn document_to_string(view: XmlDocumentView<'_>) -> String {
    let mut buf = String::with_capacity(1024);

    if !view.is_html() {
        if let Some(version) = view.version() {
            buf.push_str("<?xml version=\"");
            buf.push_str(version);
            buf.push_str("\" encoding=\"");
            buf.push_str(view.encoding().label());
            buf.push_str("\"?>\n");
        }
    }
    if let Some(doctype) = view.doctype() {
        buf.push_str("<!DOCTYPE ");
        buf.push_str(doctype);
        buf.push_str(">\n");
    }

    for child in view.children(0) {
        write_node(&view, child, &mut buf);
    }
    buf
}

enum StackEntry {
    Enter(NodeId),
    Close(NodeId),
}

fn write_node<D: DocumentAccess>(doc: &D, node_id: NodeId, buf: &mut String) {
    let html_mode = doc.is_html();
    let mut stack: Vec<StackEntry> = Vec::with_capacity(64);
    stack.push(StackEntry::Enter(node_id));

    while let Some(entry) = stack.pop() {
        let current_id = match entry {
            StackEntry::Close(id) => {
                buf.push_str("</");
                buf.push_str(doc.node_name(id).unwrap_or(""));
                buf.push('>');
                continue;
            }
            StackEntry::Enter(id) => id,
        };
        let Some(node) = doc.get_node(current_id) else {
            continue;
        };

        match node.kind {
            NodeKind::Element => {
                let name = doc.node_name(current_id).unwrap_or("");
                buf.push('<');
                buf.push_str(name);

                if current_id == node_id {
                    write_in_scope_namespaces(doc, current_id, buf);
                } else {
                    for decl in doc.namespace_decls(current_id) {
                        write_namespace(doc, decl.prefix_id, decl.uri_id, buf);
                    }
                }

                for attr in doc.attribute_ids(current_id) {
                    buf.push(' ');
                    write_attribute(doc, attr, buf);
                }

                if node.first_child.is_none() {
                    if !html_mode {
                        buf.push_str("/>");
                    } else if html::is_void(name) {
                        buf.push('>');
                    } else {
                        buf.push_str("></");
                        buf.push_str(name);
                        buf.push('>');
                    }
                    continue;
                }

                buf.push('>');
                stack.push(StackEntry::Close(current_id));
                let mut child_id = node.last_child;
                while let Some(cid) = child_id {
                    stack.push(StackEntry::Enter(cid));
                    child_id = doc.get_node(cid).and_then(|n| n.prev_sibling);
                }
            }
            NodeKind::Text => {
                let content = doc.node_value(current_id).unwrap_or("");
                let raw = html_mode
                    && node
                        .parent
                        .and_then(|p| doc.node_name(p))
                        .is_some_and(html::is_raw_text);
                if raw {
                    buf.push_str(content);
                } else {
                    buf.push_str(&encode_text(content));
                }
            }
            NodeKind::CData => {
                buf.push_str("<![CDATA[");
                buf.push_str(doc.node_value(current_id).unwrap_or(""));
                buf.push_str("]]>");
            }
            NodeKind::Comment => {
                buf.push_str("<!--");
                buf.push_str(doc.node_value(current_id).unwrap_or(""));
                buf.push_str("-->");
            }
            NodeKind::ProcessingInstruction => {
                buf.push_str("<?");
                buf.push_str(doc.node_name(current_id).unwrap_or(""));
                if let Some(data) = doc.node_value(current_id).filter(|d| !d.is_empty()) {
                    buf.push(' ');
                    buf.push_str(data);
                }
                buf.push_str("?>");
            }
            NodeKind::Attribute => write_attribute(doc, current_id, buf),
            NodeKind::Document => {
                let mut child_id = node.last_child;
                while let Some(cid) = child_id {
                    stack.push(StackEntry::Enter(cid));
                    child_id = doc.get_node(cid).and_then(|n| n.prev_sibling);
                }
            }
        }
    }
}

fn write_attribute<D: DocumentAccess>(doc: &D, attr: NodeId, buf: &mut String) {
    buf.push_str(doc.node_name(attr).unwrap_or(""));
    buf.push_str("=\"");
    buf.push_str(&encode_attribute(doc.node_value(attr).unwrap_or("")));
    buf.push('"');
}

fn write_namespace<D: DocumentAccess>(doc: &D, prefix_id: u32, uri_id: u32, buf: &mut String) {
    match doc.strings().get_opt(prefix_id) {
        Some(prefix) => {
            buf.push_str(" xmlns:");
            buf.push_str(prefix);
        }
        None => buf.push_str(" xmlns"),
    }
    buf.push_str("=\"");
    buf.push_str(&encode_attribute(doc.strings().get(uri_id)));
    buf.push('"');
}

/// Write every declaration in scope at `id`, nearest first wins
fn write_in_scope_namespaces<D: DocumentAccess>(doc: &D, id: NodeId, buf: &mut String) {
    let mut seen: Vec<u32> = Vec::new();
    let mut current = Some(id);
    while let Some(element) = current {
        for decl in doc.namespace_decls(element) {
            if seen.contains(&decl.prefix_id) {
                continue;
            }
            seen.push(decl.prefix_id);
            // An inherited undeclaration has nothing to cancel at the fragment root
            if element != id && decl.uri_id == 0 {
                continue;
            }
            write_namespace(doc, decl.prefix_id, decl.uri_id, buf);
        }
        current = doc.parent_of(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::OwnedXmlDocument;
    use crate::options::ParseOptions;

    fn xml(input: &str) -> OwnedXmlDocument {
        OwnedXmlDocument::parse(input.as_bytes(), &ParseOptions::xml()).unwrap()
    }

    fn html(input: &str) -> OwnedXmlDocument {
        OwnedXmlDocument::parse(input.as_bytes(), &ParseOptions::html()).unwrap()
    }

    #[test]
    fn test_element_round_trip() {
        let input = "<root a=\"1 &amp; 2\"><b>x &lt; y</b><c/><!--note--><![CDATA[<raw>]]><?pi data?></root>";
        let doc = xml(input);
        let root = doc.root_element_id().unwrap();
        assert_eq!(node_to_string(&doc, root), input);
    }

    #[test]
    fn test_fragment_carries_inherited_namespaces() {
        let doc = xml("<r xmlns=\"urn:d\" xmlns:p=\"urn:p\"><p:a><b/></p:a></r>");
        let a = doc.children_vec(doc.root_element_id().unwrap())[0];
        assert_eq!(
            node_to_string(&doc, a),
            "<p:a xmlns=\"urn:d\" xmlns:p=\"urn:p\"><b/></p:a>"
        );
    }

    #[test]
    fn test_nearest_declaration_wins() {
        let doc = xml("<r xmlns:p=\"urn:outer\"><m xmlns:p=\"urn:inner\"><p:a/></m></r>");
        let a = doc.descendants_vec(0).into_iter().find(|&id| doc.node_name(id) == Some("p:a")).unwrap();
        assert_eq!(node_to_string(&doc, a), "<p:a xmlns:p=\"urn:inner\"/>");
    }

    #[test]
    fn test_html_void_and_script() {
        let doc = html("<div><br><script>if (a < b) {}</script><span></span></div>");
        let div = doc.root_element_id().unwrap();
        assert_eq!(
            node_to_string(&doc, div),
            "<div><br><script>if (a < b) {}</script><span></span></div>"
        );
    }

    #[test]
    fn test_document_with_declaration() {
        let doc = xml("<?xml version=\"1.0\"?>\n<!DOCTYPE r>\n<r>t</r>");
        assert_eq!(
            document_to_string(doc.view()),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE r>\n<r>t</r>"
        );
    }

    #[test]
    fn test_attribute_node() {
        let doc = xml("<r k=\"a&quot;b\"/>");
        let attr = doc.attribute_ids(1).start;
        assert_eq!(node_to_string(&doc, attr), "k=\"a&quot;b\"");
    }
}
