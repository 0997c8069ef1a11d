//! Document - arena tree built from reader events
//!
//! `OwnedXmlDocument` owns the node arena and string pool of one parsed
//! document. It is read-only once built; `XmlDocumentView` is the borrowed
//! handle the query engine and snapshot conversion work through.

use super::html;
use super::namespace::NamespaceResolver;
use super::node::{NodeId, NodeKind, XmlNode};
use super::strings::StringPool;
use super::DocumentAccess;
use crate::core::attributes::split_name;
use crate::core::encoding::{self, Encoding};
use crate::error::ParseError;
use crate::options::{DocumentKind, ParseOptions};
use crate::reader::events::{StartElement, XmlEvent};
use crate::reader::slice::SliceReader;
use std::borrow::Cow;
use tracing::{debug, warn};

/// An `xmlns` / `xmlns:prefix` declaration written on an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceDecl {
    pub element: NodeId,
    /// 0 for the default namespace
    pub prefix_id: u32,
    /// 0 when the default namespace is undeclared (`xmlns=""`)
    pub uri_id: u32,
}

/// A parsed document that owns all of its data
#[derive(Debug)]
pub struct OwnedXmlDocument {
    nodes: Vec<XmlNode>,
    strings: StringPool,
    /// Sorted by element id
    namespace_decls: Vec<NamespaceDecl>,
    root: Option<NodeId>,
    kind: DocumentKind,
    encoding: Encoding,
    version: Option<String>,
    standalone: Option<bool>,
    doctype: Option<String>,
}

impl OwnedXmlDocument {
    /// Decode and parse raw bytes
    pub fn parse(input: &[u8], options: &ParseOptions) -> Result<Self, ParseError> {
        if input.is_empty() {
            return Err(ParseError::EmptyInput);
        }
        let decoded = encoding::decode(input, options.encoding, !options.is_strict())
            .map_err(ParseError::Encoding)?;
        Self::parse_str(&decoded.text, decoded.encoding, options)
    }

    /// Parse text that is already decoded; `encoding` is what the document reports
    pub fn parse_str(text: &str, encoding: Encoding, options: &ParseOptions) -> Result<Self, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::EmptyInput);
        }

        let bytes = text.as_bytes();
        let reader = match options.kind {
            DocumentKind::Html => SliceReader::new_html(bytes),
            DocumentKind::Xml if options.is_strict() => SliceReader::new_strict(bytes),
            DocumentKind::Xml => SliceReader::new(bytes),
        };

        let builder = TreeBuilder::new(options.kind, options.is_strict(), encoding, text.len());
        let doc = builder.run(reader)?;

        debug!(
            kind = ?doc.kind,
            strict = options.is_strict(),
            bytes = text.len(),
            nodes = doc.nodes.len(),
            encoding = %doc.encoding,
            "parsed document"
        );
        Ok(doc)
    }

    /// Borrowed view for querying
    #[inline]
    pub fn view(&self) -> XmlDocumentView<'_> {
        XmlDocumentView { doc: self }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Version from the XML declaration
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Standalone flag from the XML declaration
    pub fn standalone(&self) -> Option<bool> {
        self.standalone
    }

    /// DOCTYPE content after the keyword, e.g. `html` or `note SYSTEM "note.dtd"`
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }
}

impl DocumentAccess for OwnedXmlDocument {
    #[inline]
    fn nodes(&self) -> &[XmlNode] {
        &self.nodes
    }

    #[inline]
    fn strings(&self) -> &StringPool {
        &self.strings
    }

    #[inline]
    fn root_element_id(&self) -> Option<NodeId> {
        self.root
    }

    #[inline]
    fn kind(&self) -> DocumentKind {
        self.kind
    }

    fn namespace_decls(&self, id: NodeId) -> &[NamespaceDecl] {
        let start = self.namespace_decls.partition_point(|d| d.element < id);
        let end = self.namespace_decls.partition_point(|d| d.element <= id);
        &self.namespace_decls[start..end]
    }
}

/// Borrowed, copyable view of a document
#[derive(Debug, Clone, Copy)]
pub struct XmlDocumentView<'a> {
    doc: &'a OwnedXmlDocument,
}

impl<'a> XmlDocumentView<'a> {
    /// The document this view borrows
    pub fn document(&self) -> &'a OwnedXmlDocument {
        self.doc
    }

    pub fn encoding(&self) -> Encoding {
        self.doc.encoding
    }

    pub fn version(&self) -> Option<&'a str> {
        self.doc.version.as_deref()
    }

    pub fn doctype(&self) -> Option<&'a str> {
        self.doc.doctype.as_deref()
    }
}

impl DocumentAccess for XmlDocumentView<'_> {
    #[inline]
    fn nodes(&self) -> &[XmlNode] {
        &self.doc.nodes
    }

    #[inline]
    fn strings(&self) -> &StringPool {
        &self.doc.strings
    }

    #[inline]
    fn root_element_id(&self) -> Option<NodeId> {
        self.doc.root
    }

    #[inline]
    fn kind(&self) -> DocumentKind {
        self.doc.kind
    }

    fn namespace_decls(&self, id: NodeId) -> &[NamespaceDecl] {
        self.doc.namespace_decls(id)
    }
}

/// Builds the arena from reader events
struct TreeBuilder {
    doc: OwnedXmlDocument,
    /// Open elements, outermost first
    open: Vec<NodeId>,
    resolver: NamespaceResolver,
    html: bool,
    strict: bool,
}

impl TreeBuilder {
    fn new(kind: DocumentKind, strict: bool, encoding: Encoding, input_len: usize) -> Self {
        let mut strings = StringPool::with_capacity(input_len / 2);
        let resolver = NamespaceResolver::new(&mut strings);
        // Rough estimate: one node per 16 bytes of markup
        let mut nodes = Vec::with_capacity(input_len / 16 + 1);
        nodes.push(XmlNode::document());

        TreeBuilder {
            doc: OwnedXmlDocument {
                nodes,
                strings,
                namespace_decls: Vec::new(),
                root: None,
                kind,
                encoding,
                version: None,
                standalone: None,
                doctype: None,
            },
            open: Vec::with_capacity(32),
            resolver,
            html: kind.is_html(),
            strict,
        }
    }

    fn run(mut self, mut reader: SliceReader<'_>) -> Result<OwnedXmlDocument, ParseError> {
        loop {
            let Some(event) = reader.next_event() else {
                return match reader.take_error() {
                    Some(err) => Err(ParseError::malformed(err.message, err.line)),
                    None => self.finish(reader.line()),
                };
            };
            let line = reader.line();

            match event {
                XmlEvent::StartElement(elem) => self.start_element(elem, line, false)?,
                XmlEvent::EmptyElement(elem) => self.start_element(elem, line, true)?,
                XmlEvent::EndElement(elem) => self.end_element(&elem.name_str(), line)?,
                XmlEvent::Text(text) => self.character_data(NodeKind::Text, &text, line)?,
                XmlEvent::CData(text) => self.character_data(NodeKind::CData, &text, line)?,
                XmlEvent::Comment(text) => {
                    let value_id = self.doc.strings.intern(&utf8(&text));
                    self.append(XmlNode::character_data(NodeKind::Comment, value_id, None, 0, line));
                }
                XmlEvent::ProcessingInstruction { target, data } => {
                    let target_id = self.doc.strings.intern(&utf8(&target));
                    let data_id = data.map_or(0, |d| self.doc.strings.intern(&utf8(&d)));
                    self.append(XmlNode::processing_instruction(target_id, data_id, None, 0, line));
                }
                XmlEvent::XmlDeclaration { version, standalone, .. } => {
                    self.doc.version = Some(utf8(&version).into_owned());
                    self.doc.standalone = standalone;
                }
                XmlEvent::DocType(content) => {
                    if self.strict && (self.doc.root.is_some() || self.doc.doctype.is_some()) {
                        return Err(ParseError::malformed("DOCTYPE must precede the root element", line));
                    }
                    self.doc.doctype = Some(utf8(&content).into_owned());
                }
                XmlEvent::EndDocument => return self.finish(line),
            }
        }
    }

    #[inline]
    fn current_parent(&self) -> NodeId {
        self.open.last().copied().unwrap_or(0)
    }

    /// Append a node as the last child of the current element
    fn append(&mut self, mut node: XmlNode) -> NodeId {
        let parent = self.current_parent();
        let id = self.doc.nodes.len() as NodeId;
        node.parent = Some(parent);
        node.depth = (self.open.len() + 1).min(u16::MAX as usize) as u16;

        let prev = self.doc.nodes[parent as usize].last_child;
        node.prev_sibling = prev;
        self.doc.nodes.push(node);

        match prev {
            Some(prev) => self.doc.nodes[prev as usize].next_sibling = Some(id),
            None => self.doc.nodes[parent as usize].first_child = Some(id),
        }
        self.doc.nodes[parent as usize].last_child = Some(id);
        id
    }

    fn name_of(&self, id: NodeId) -> &str {
        self.doc.strings.get(self.doc.nodes[id as usize].name_id)
    }

    /// Pop open elements until only `depth` remain
    fn close_to(&mut self, depth: usize) {
        while self.open.len() > depth {
            self.open.pop();
            self.resolver.pop_scope();
        }
    }

    fn start_element(&mut self, elem: StartElement<'_>, line: u32, self_closing: bool) -> Result<(), ParseError> {
        let name = utf8(&elem.name);

        if self.html {
            let implied = {
                let open: Vec<&str> = self.open.iter().map(|&id| self.name_of(id)).collect();
                html::implied_close(&open, &name)
            };
            if let Some(depth) = implied {
                self.close_to(depth);
            }
        }

        if self.strict && self.open.is_empty() && self.doc.root.is_some() {
            return Err(ParseError::malformed(
                format!("Extra content at the end of the document: second root element <{}>", name),
                line,
            ));
        }

        let id = self.doc.nodes.len() as NodeId;
        self.resolver.push_scope();

        let mut attributes = Vec::with_capacity(elem.attributes.len());
        for attr in &elem.attributes {
            if self.html || !attr.is_namespace_decl() {
                attributes.push(attr);
                continue;
            }
            let prefix_id = match attr.prefix() {
                Some(_) => self.doc.strings.intern(&utf8(attr.local_name())),
                None => 0,
            };
            let uri_id = self.doc.strings.intern(&utf8(&attr.value));
            if self.strict && prefix_id != 0 && uri_id == 0 {
                return Err(ParseError::malformed(
                    format!("Namespace prefix '{}' cannot be undeclared", utf8(attr.local_name())),
                    line,
                ));
            }
            self.resolver.declare(prefix_id, uri_id);
            self.doc.namespace_decls.push(NamespaceDecl {
                element: id,
                prefix_id,
                uri_id,
            });
        }

        let mut node = XmlNode::element(self.doc.strings.intern(&name), None, 0, line);
        if !self.html {
            let (prefix_id, namespace_id) = self.resolve_name(&elem.name, true, line)?;
            node.prefix_id = prefix_id;
            node.namespace_id = namespace_id;
        }
        let id = self.append(node);
        if self.open.is_empty() && self.doc.root.is_none() {
            self.doc.root = Some(id);
        }

        let depth = self.doc.nodes[id as usize].depth;
        let mut seen: Vec<u32> = Vec::with_capacity(attributes.len());
        for attr in attributes {
            let attr_name = utf8(&attr.name);
            let name_id = self.doc.strings.intern(&attr_name);
            if seen.contains(&name_id) {
                if self.strict {
                    return Err(ParseError::malformed(format!("Duplicate attribute '{}'", attr_name), line));
                }
                continue;
            }
            seen.push(name_id);

            let value_id = self.doc.strings.intern(&utf8(&attr.value));
            let mut attr_node = XmlNode::attribute(name_id, value_id, id, depth.saturating_add(1), line);
            if !self.html {
                let (prefix_id, namespace_id) = self.resolve_name(&attr.name, false, line)?;
                attr_node.prefix_id = prefix_id;
                attr_node.namespace_id = namespace_id;
            }
            self.doc.nodes.push(attr_node);
        }

        let attr_count = seen.len().min(u16::MAX as usize) as u16;
        let element = &mut self.doc.nodes[id as usize];
        element.attr_start = id + 1;
        element.attr_count = attr_count;

        if self_closing || (self.html && html::is_void(&name)) {
            self.resolver.pop_scope();
        } else {
            self.open.push(id);
        }
        Ok(())
    }

    /// (prefix id, namespace uri id) of an element or attribute name
    fn resolve_name(&mut self, name: &[u8], is_element: bool, line: u32) -> Result<(u32, u32), ParseError> {
        match split_name(name) {
            (Some(prefix), _) => {
                let prefix = utf8(prefix);
                let prefix_id = self.doc.strings.intern(&prefix);
                match self.resolver.resolve(prefix_id) {
                    Some(uri) => Ok((prefix_id, uri)),
                    None if self.strict => Err(ParseError::malformed(
                        format!("Namespace prefix '{}' is not bound", prefix),
                        line,
                    )),
                    None => Ok((prefix_id, 0)),
                }
            }
            // Unprefixed attributes are never in a namespace
            (None, _) if is_element => Ok((0, self.resolver.resolve_default().unwrap_or(0))),
            (None, _) => Ok((0, 0)),
        }
    }

    fn end_element(&mut self, name: &str, line: u32) -> Result<(), ParseError> {
        if self.html && html::is_void(name) {
            return Ok(());
        }

        let name_id = self.doc.strings.lookup(name);
        let position = name_id.and_then(|name_id| {
            self.open
                .iter()
                .rposition(|&id| self.doc.nodes[id as usize].name_id == name_id)
        });

        if self.strict {
            return match (self.open.last(), position) {
                (None, _) => Err(ParseError::malformed(format!("Unexpected closing tag </{}>", name), line)),
                (Some(_), Some(idx)) if idx + 1 == self.open.len() => {
                    self.close_to(idx);
                    Ok(())
                }
                (Some(&top), _) => Err(ParseError::malformed(
                    format!("Mismatched closing tag: expected </{}>, found </{}>", self.name_of(top), name),
                    line,
                )),
            };
        }

        match position {
            Some(idx) => {
                let unclosed = self.open.len() - idx - 1;
                if unclosed > 0 && !self.html {
                    warn!(line, element = name, unclosed, "end tag closes unclosed elements");
                }
                self.close_to(idx);
            }
            None if self.html => debug!(line, element = name, "ignoring stray end tag"),
            None => warn!(line, element = name, "ignoring stray end tag"),
        }
        Ok(())
    }

    fn character_data(&mut self, kind: NodeKind, text: &[u8], line: u32) -> Result<(), ParseError> {
        if self.open.is_empty() {
            if text.iter().all(u8::is_ascii_whitespace) {
                return Ok(());
            }
            if self.strict {
                return Err(ParseError::malformed("Text content outside the root element", line));
            }
        }
        let value_id = self.doc.strings.intern(&utf8(text));
        self.append(XmlNode::character_data(kind, value_id, None, 0, line));
        Ok(())
    }

    fn finish(mut self, line: u32) -> Result<OwnedXmlDocument, ParseError> {
        if let Some(&innermost) = self.open.last() {
            if self.strict {
                let elem_line = self.doc.nodes[innermost as usize].line;
                return Err(ParseError::malformed(
                    format!("Unclosed element <{}>", self.name_of(innermost)),
                    elem_line,
                ));
            }
            if self.html {
                debug!(unclosed = self.open.len(), "closing open elements at end of input");
            } else {
                warn!(line, unclosed = self.open.len(), "closing unclosed elements at end of input");
            }
            self.close_to(0);
        }

        if self.doc.root.is_none() && !self.html {
            return Err(ParseError::malformed("Start tag expected, no root element found", line));
        }

        Ok(self.doc)
    }
}

/// Input was decoded to UTF-8 before tokenizing, so this only borrows
#[inline]
fn utf8(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> OwnedXmlDocument {
        OwnedXmlDocument::parse(input.as_bytes(), &ParseOptions::xml()).unwrap()
    }

    fn parse_strict(input: &str) -> Result<OwnedXmlDocument, ParseError> {
        OwnedXmlDocument::parse(input.as_bytes(), &ParseOptions::xml().strict(true))
    }

    fn parse_html(input: &str) -> OwnedXmlDocument {
        OwnedXmlDocument::parse(input.as_bytes(), &ParseOptions::html()).unwrap()
    }

    fn element_names(doc: &OwnedXmlDocument, parent: NodeId) -> Vec<String> {
        doc.children(parent)
            .filter(|&c| doc.node_kind(c) == Some(NodeKind::Element))
            .filter_map(|c| doc.node_name(c).map(str::to_string))
            .collect()
    }

    #[test]
    fn test_builds_tree_in_document_order() {
        let doc = parse("<root a=\"1\" b=\"2\"><x>hi</x><y/></root>");
        let root = doc.root_element_id().unwrap();
        assert_eq!(root, 1);
        assert_eq!(doc.attribute_ids(root), 2..4);
        assert_eq!(doc.get_attribute(root, "b"), Some("2"));
        assert_eq!(element_names(&doc, root), vec!["x", "y"]);
        assert_eq!(doc.string_value(root), "hi");
        assert_eq!(doc.subtree_end(root), doc.node_count() as NodeId);
    }

    #[test]
    fn test_xml_declaration_and_doctype() {
        let doc = parse("<?xml version=\"1.0\" standalone=\"yes\"?>\n<!DOCTYPE note SYSTEM \"n.dtd\">\n<note/>");
        assert_eq!(doc.version(), Some("1.0"));
        assert_eq!(doc.standalone(), Some(true));
        assert_eq!(doc.doctype(), Some("note SYSTEM \"n.dtd\""));
        assert_eq!(doc.encoding(), Encoding::Utf8);
    }

    #[test]
    fn test_namespaces_resolve() {
        let doc = parse(
            "<r xmlns=\"urn:d\" xmlns:p=\"urn:p\"><p:a p:x=\"1\" y=\"2\"/><b xmlns=\"\"/></r>",
        );
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.node_namespace(root), Some("urn:d"));
        assert_eq!(doc.namespace_decls(root).len(), 2);
        // Namespace declarations are not attribute nodes
        assert!(doc.attribute_ids(root).is_empty());

        let kids = doc.children_vec(root);
        let a = kids[0];
        assert_eq!(doc.node_prefix(a), Some("p"));
        assert_eq!(doc.node_local_name(a), Some("a"));
        assert_eq!(doc.node_namespace(a), Some("urn:p"));
        let attrs: Vec<_> = doc.attribute_ids(a).collect();
        assert_eq!(doc.node_namespace(attrs[0]), Some("urn:p"));
        assert_eq!(doc.node_namespace(attrs[1]), None);

        assert_eq!(doc.node_namespace(kids[1]), None);
    }

    #[test]
    fn test_lines_are_recorded() {
        let doc = parse("<r>\n  <a/>\n  <b>\n    <c/>\n  </b>\n</r>");
        let names: Vec<(String, u32)> = doc
            .descendants_vec(0)
            .into_iter()
            .filter(|&id| doc.node_kind(id) == Some(NodeKind::Element))
            .map(|id| (doc.node_name(id).unwrap().to_string(), doc.get_node(id).unwrap().line))
            .collect();
        assert_eq!(
            names,
            vec![("r".into(), 1), ("a".into(), 2), ("b".into(), 3), ("c".into(), 4)]
        );
    }

    #[test]
    fn test_lenient_recovers_mismatched_and_unclosed() {
        let doc = parse("<r><a><b></a><c>text");
        let root = doc.root_element_id().unwrap();
        assert_eq!(element_names(&doc, root), vec!["a", "c"]);
        let doc = parse("<r></x><a/></r>");
        assert_eq!(element_names(&doc, doc.root_element_id().unwrap()), vec!["a"]);
    }

    #[test]
    fn test_lenient_keeps_every_root() {
        let doc = parse("<a/><b/>");
        assert_eq!(doc.node_name(doc.root_element_id().unwrap()), Some("a"));
        assert_eq!(element_names(&doc, 0), vec!["a", "b"]);
    }

    #[test]
    fn test_lenient_without_elements_is_malformed() {
        let err = OwnedXmlDocument::parse(b"just text", &ParseOptions::xml()).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
        let err = OwnedXmlDocument::parse(b"  \n ", &ParseOptions::xml()).unwrap_err();
        assert_eq!(err, ParseError::EmptyInput);
    }

    #[test]
    fn test_strict_errors_report_lines() {
        let cases = [
            ("<r>\n<a>\n</b></r>", 3, "Mismatched"),
            ("<r/>\n<s/>", 2, "second root"),
            ("<r a=\"1\"\n a=\"2\"/>", 1, "Duplicate"),
            ("<r>\n  <a>", 2, "Unclosed element <a>"),
            ("<r><p:a/></r>", 1, "not bound"),
            ("text<r/>", 1, "outside the root"),
        ];
        for (input, line, needle) in cases {
            match parse_strict(input) {
                Err(ParseError::Malformed { message, line: got }) => {
                    assert!(message.contains(needle), "{input:?}: {message}");
                    assert_eq!(got, line, "{input:?}");
                }
                other => panic!("{input:?}: expected Malformed, got {other:?}"),
            }
        }
        assert!(parse_strict("<?xml version=\"1.0\"?>\n<r><a/></r>\n<!-- end -->").is_ok());
    }

    #[test]
    fn test_html_void_and_implied_end_tags() {
        let doc = parse_html("<UL><li>one<li>two</ul><p>a<p>b<br>c</p><img src=x>");
        let top = element_names(&doc, 0);
        assert_eq!(top, vec!["ul", "p", "p", "img"]);
        let ul = doc.root_element_id().unwrap();
        assert_eq!(element_names(&doc, ul), vec!["li", "li"]);
        assert_eq!(doc.kind(), DocumentKind::Html);
    }

    #[test]
    fn test_html_text_only_is_rootless() {
        let doc = parse_html("hello");
        assert!(doc.root_element_id().is_none());
        assert_eq!(doc.string_value(0), "hello");
    }

    #[test]
    fn test_element_by_xml_id() {
        let doc = parse("<r><a xml:id=\"k1\"/><b xml:id=\"k2\"/></r>");
        let b = doc.element_by_id("k2").unwrap();
        assert_eq!(doc.node_name(b), Some("b"));
        assert!(doc.element_by_id("nope").is_none());
    }
}
