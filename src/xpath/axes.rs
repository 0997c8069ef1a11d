//! XPath Axes Implementation
//!
//! All 13 XPath 1.0 axes:
//! - child, parent, self
//! - descendant, descendant-or-self
//! - ancestor, ancestor-or-self
//! - following, following-sibling
//! - preceding, preceding-sibling
//! - attribute, namespace
//!
//! Forward axes return nodes in document order, reverse axes nearest
//! first, so the index in the result is the proximity position.

use super::compiler::CompiledNodeTest;
use super::parser::Axis;
use crate::dom::{DocumentAccess, NodeId, NodeKind, PrefixRegistry};

/// Navigate along an axis from a context node
pub fn navigate<D: DocumentAccess>(doc: &D, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children_vec(context),
        Axis::Descendant => doc.descendants_vec(context),
        Axis::DescendantOrSelf => {
            let mut result = vec![context];
            result.extend(doc.descendants_vec(context));
            result
        }
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => ancestors(doc, context),
        Axis::AncestorOrSelf => {
            let mut result = vec![context];
            result.extend(ancestors(doc, context));
            result
        }
        Axis::FollowingSibling => siblings(doc, context, |n| n.next_sibling),
        Axis::PrecedingSibling => siblings(doc, context, |n| n.prev_sibling),
        Axis::Following => following(doc, context),
        Axis::Preceding => preceding(doc, context),
        Axis::Self_ => vec![context],
        Axis::Attribute => doc.attribute_ids(context).collect(),
        // Namespace nodes are not materialized
        Axis::Namespace => Vec::new(),
    }
}

/// Parent, grandparent, ... up to the document node
fn ancestors<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = context;
    while let Some(parent) = doc.parent_of(current) {
        result.push(parent);
        current = parent;
    }
    result
}

fn siblings<D: DocumentAccess>(
    doc: &D,
    context: NodeId,
    next: impl Fn(&crate::dom::XmlNode) -> Option<NodeId>,
) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut sibling = doc.get_node(context).and_then(&next);
    while let Some(id) = sibling {
        result.push(id);
        sibling = doc.get_node(id).and_then(&next);
    }
    result
}

/// Everything after the context's subtree, attributes excluded
fn following<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let nodes = doc.nodes();
    (doc.subtree_end(context)..nodes.len() as NodeId)
        .filter(|&id| nodes[id as usize].kind != NodeKind::Attribute)
        .collect()
}

/// Everything before the context that is not an ancestor, nearest first
fn preceding<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let nodes = doc.nodes();
    let ancestors = ancestors(doc, context);
    (1..context.min(nodes.len() as NodeId))
        .rev()
        .filter(|&id| nodes[id as usize].kind != NodeKind::Attribute && !ancestors.contains(&id))
        .collect()
}

/// Check if a node matches a node test on the given axis
pub fn matches_node_test<D: DocumentAccess>(
    doc: &D,
    node_id: NodeId,
    axis: Axis,
    node_test: &CompiledNodeTest,
    prefixes: &PrefixRegistry,
) -> bool {
    let Some(kind) = doc.node_kind(node_id) else {
        return false;
    };
    let principal = if axis == Axis::Attribute {
        NodeKind::Attribute
    } else {
        NodeKind::Element
    };

    match node_test {
        CompiledNodeTest::Any => kind == principal,
        CompiledNodeTest::Name(name) => {
            if kind != principal {
                return false;
            }
            let Some(node_name) = doc.node_name(node_id) else {
                return false;
            };
            if doc.is_html() {
                node_name.eq_ignore_ascii_case(name)
            } else {
                // Unprefixed name tests only select nodes in no namespace
                doc.node_namespace(node_id).is_none() && node_name == name
            }
        }
        CompiledNodeTest::QName(prefix, local) => {
            if kind != principal {
                return false;
            }
            let Some(uri) = prefixes.resolve(prefix) else {
                return false;
            };
            doc.node_namespace(node_id) == Some(uri) && doc.node_local_name(node_id) == Some(local.as_str())
        }
        CompiledNodeTest::NamespaceWildcard(prefix) => {
            if kind != principal {
                return false;
            }
            match prefixes.resolve(prefix) {
                Some(uri) => doc.node_namespace(node_id) == Some(uri),
                None => false,
            }
        }
        CompiledNodeTest::Node => true,
        CompiledNodeTest::Text => kind.is_text_like(),
        CompiledNodeTest::Comment => kind == NodeKind::Comment,
        CompiledNodeTest::ProcessingInstruction(target) => {
            if kind != NodeKind::ProcessingInstruction {
                return false;
            }
            match target {
                Some(expected) => doc.node_name(node_id) == Some(expected.as_str()),
                None => true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::OwnedXmlDocument;
    use crate::options::ParseOptions;

    // 0 doc, 1 root, 2 @id, 3 a, 4 b, 5 text, 6 c, 7 d
    const SAMPLE: &[u8] = b"<root id=\"r\"><a><b>t</b></a><c/><d/></root>";

    fn sample() -> OwnedXmlDocument {
        OwnedXmlDocument::parse(SAMPLE, &ParseOptions::xml()).unwrap()
    }

    #[test]
    fn test_forward_axes() {
        let doc = sample();
        assert_eq!(navigate(&doc, 1, Axis::Child), vec![3, 6, 7]);
        assert_eq!(navigate(&doc, 1, Axis::Descendant), vec![3, 4, 5, 6, 7]);
        assert_eq!(navigate(&doc, 3, Axis::DescendantOrSelf), vec![3, 4, 5]);
        assert_eq!(navigate(&doc, 3, Axis::FollowingSibling), vec![6, 7]);
        assert_eq!(navigate(&doc, 4, Axis::Following), vec![6, 7]);
        assert_eq!(navigate(&doc, 1, Axis::Attribute), vec![2]);
    }

    #[test]
    fn test_reverse_axes_are_nearest_first() {
        let doc = sample();
        assert_eq!(navigate(&doc, 5, Axis::Ancestor), vec![4, 3, 1, 0]);
        assert_eq!(navigate(&doc, 7, Axis::PrecedingSibling), vec![6, 3]);
        assert_eq!(navigate(&doc, 6, Axis::Preceding), vec![5, 4, 3]);
        assert_eq!(navigate(&doc, 2, Axis::Parent), vec![1]);
    }

    #[test]
    fn test_attribute_context() {
        let doc = sample();
        assert!(navigate(&doc, 2, Axis::FollowingSibling).is_empty());
        assert_eq!(navigate(&doc, 2, Axis::Following), vec![3, 4, 5, 6, 7]);
        assert!(navigate(&doc, 2, Axis::Preceding).is_empty());
    }

    #[test]
    fn test_name_tests() {
        let doc = OwnedXmlDocument::parse(
            b"<r xmlns:p=\"urn:p\"><p:a/><a/><b xmlns=\"urn:d\"/></r>",
            &ParseOptions::xml(),
        )
        .unwrap();
        let mut prefixes = PrefixRegistry::new();
        let kids = doc.children_vec(1);
        let by_name = |test: &CompiledNodeTest, prefixes: &PrefixRegistry| -> Vec<NodeId> {
            kids.iter()
                .copied()
                .filter(|&k| matches_node_test(&doc, k, Axis::Child, test, prefixes))
                .collect()
        };

        assert_eq!(by_name(&CompiledNodeTest::Name("a".into()), &prefixes), vec![kids[1]]);
        assert!(by_name(&CompiledNodeTest::Name("b".into()), &prefixes).is_empty());
        assert!(by_name(&CompiledNodeTest::QName("p".into(), "a".into()), &prefixes).is_empty());

        prefixes.define("q", "urn:p");
        assert_eq!(by_name(&CompiledNodeTest::QName("q".into(), "a".into()), &prefixes), vec![kids[0]]);
        assert_eq!(by_name(&CompiledNodeTest::NamespaceWildcard("q".into()), &prefixes), vec![kids[0]]);
        assert_eq!(by_name(&CompiledNodeTest::Any, &prefixes).len(), 3);
    }
}
