//! Shared Document State
//!
//! The parsed tree, its prefix registry and its compiled-expression cache
//! live behind one mutex. Every public operation is a single critical
//! section over this state.

use crate::dom::{NodeId, OwnedXmlDocument, PrefixRegistry, XmlDocumentView};
use crate::options::ParseOptions;
use crate::snapshot::DocumentId;
use crate::xpath::{evaluate_at, CompiledExpr, ExpressionCache, XPathValue};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// Everything guarded by the document lock
pub struct DocumentState {
    doc: OwnedXmlDocument,
    prefixes: PrefixRegistry,
    cache: ExpressionCache,
}

impl DocumentState {
    /// View for evaluation and snapshot capture
    #[inline]
    pub fn view(&self) -> XmlDocumentView<'_> {
        self.doc.view()
    }

    /// Register or overwrite a prefix binding
    pub fn define_prefix(&mut self, prefix: &str, uri: &str) {
        self.prefixes.define(prefix, uri);
    }

    /// Compile through the cache
    pub fn compile(&mut self, xpath: &str) -> Result<Arc<CompiledExpr>, String> {
        self.cache.get_or_compile(xpath)
    }

    /// Compile (cached) and evaluate from `context`
    pub fn evaluate(&mut self, xpath: &str, context: NodeId) -> Result<XPathValue, String> {
        let compiled = self.cache.get_or_compile(xpath)?;
        let value = evaluate_at(&self.doc, &self.prefixes, &compiled, context)?;
        trace!(xpath, context, result = value.type_name(), "evaluated");
        Ok(value)
    }

    /// Split borrow for evaluating many expressions at once
    pub fn parts(&self) -> (&OwnedXmlDocument, &PrefixRegistry) {
        (&self.doc, &self.prefixes)
    }
}

/// Owner of one parsed document
pub struct DocumentResource {
    id: DocumentId,
    state: Mutex<DocumentState>,
}

impl DocumentResource {
    pub fn new(doc: OwnedXmlDocument, options: &ParseOptions) -> Self {
        DocumentResource {
            id: DocumentId::next(),
            state: Mutex::new(DocumentState {
                doc,
                prefixes: PrefixRegistry::new(),
                cache: ExpressionCache::new(options.expression_cache),
            }),
        }
    }

    /// Identity stamped into every handle this document mints
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Run `f` with exclusive access to the state
    pub fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut DocumentState) -> R,
    {
        let mut guard = self.state.lock();
        f(&mut guard)
    }

    /// Run `f` with a read-only view; still exclusive
    pub fn with_view<F, R>(&self, f: F) -> R
    where
        F: FnOnce(XmlDocumentView<'_>) -> R,
    {
        let guard = self.state.lock();
        f(guard.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DocumentAccess;

    fn resource(input: &str) -> DocumentResource {
        let options = ParseOptions::xml();
        let doc = OwnedXmlDocument::parse(input.as_bytes(), &options).unwrap();
        DocumentResource::new(doc, &options)
    }

    #[test]
    fn test_ids_are_unique() {
        let a = resource("<a/>");
        let b = resource("<a/>");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_prefixes_persist_across_operations() {
        let res = resource("<r xmlns:x=\"urn:x\"><x:a/></r>");
        let before = res.with_state(|s| s.evaluate("count(//q:a)", 0)).unwrap();
        assert_eq!(before, XPathValue::Number(0.0));

        res.with_state(|s| s.define_prefix("q", "urn:x"));
        let after = res.with_state(|s| s.evaluate("count(//q:a)", 0)).unwrap();
        assert_eq!(after, XPathValue::Number(1.0));
    }

    #[test]
    fn test_view_reads_the_tree() {
        let res = resource("<r><a/><b/></r>");
        assert_eq!(res.with_view(|v| v.children_vec(1).len()), 2);
    }
}
