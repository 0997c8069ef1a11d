//! Namespace Resolution
//!
//! Two resolvers live here:
//! - `NamespaceResolver`: stack-based scoping of `xmlns` declarations while
//!   the tree is built.
//! - `PrefixRegistry`: caller-defined prefix bindings consulted by XPath
//!   name tests at query time.

use super::strings::StringPool;
use std::collections::HashMap;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Namespace binding (prefix -> URI)
#[derive(Debug, Clone)]
struct NsBinding {
    prefix_id: u32,
    uri_id: u32,
    depth: u16,
}

/// Stack-based namespace resolver
#[derive(Debug)]
pub struct NamespaceResolver {
    /// Stack of namespace bindings
    bindings: Vec<NsBinding>,
    /// Current element depth
    depth: u16,
    /// Pre-interned prefix IDs
    xml_prefix_id: u32,
    xmlns_prefix_id: u32,
}

impl NamespaceResolver {
    /// Create a new namespace resolver with pre-declared xml and xmlns namespaces
    pub fn new(strings: &mut StringPool) -> Self {
        let xml_prefix_id = strings.intern("xml");
        let xmlns_prefix_id = strings.intern("xmlns");
        let xml_uri_id = strings.intern(ns::XML);
        let xmlns_uri_id = strings.intern(ns::XMLNS);

        NamespaceResolver {
            bindings: vec![
                NsBinding {
                    prefix_id: xml_prefix_id,
                    uri_id: xml_uri_id,
                    depth: 0,
                },
                NsBinding {
                    prefix_id: xmlns_prefix_id,
                    uri_id: xmlns_uri_id,
                    depth: 0,
                },
            ],
            depth: 0,
            xml_prefix_id,
            xmlns_prefix_id,
        }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth = self.depth.saturating_add(1);
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth || binding.depth == 0 {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a namespace binding for the current scope.
    /// Prefix id 0 is the default namespace; uri id 0 undeclares it.
    pub fn declare(&mut self, prefix_id: u32, uri_id: u32) {
        // Don't allow redeclaring xml or xmlns
        if prefix_id == self.xml_prefix_id || prefix_id == self.xmlns_prefix_id {
            return;
        }

        self.bindings.push(NsBinding {
            prefix_id,
            uri_id,
            depth: self.depth,
        });
    }

    /// Resolve a prefix to a namespace URI ID
    pub fn resolve(&self, prefix_id: u32) -> Option<u32> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix_id == prefix_id)
            .map(|b| b.uri_id)
            .filter(|&uri| uri != 0)
    }

    /// Resolve the default namespace
    pub fn resolve_default(&self) -> Option<u32> {
        self.resolve(0)
    }

    /// Get current depth
    pub fn depth(&self) -> u16 {
        self.depth
    }
}

/// Prefix bindings used to resolve prefixed XPath name tests.
///
/// Last definition of a prefix wins. The `xml` prefix is always bound.
#[derive(Debug, Clone, Default)]
pub struct PrefixRegistry {
    bindings: HashMap<String, String>,
}

impl PrefixRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `prefix` to `uri`, replacing any earlier binding
    pub fn define(&mut self, prefix: &str, uri: &str) {
        self.bindings.insert(prefix.to_string(), uri.to_string());
    }

    /// Namespace URI bound to `prefix`
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        match self.bindings.get(prefix) {
            Some(uri) => Some(uri.as_str()),
            None if prefix == "xml" => Some(ns::XML),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
