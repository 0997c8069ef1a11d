//! Parallel Evaluation
//!
//! Uses Rayon to evaluate several compiled expressions, or capture a large
//! node-set, over one shared read-only document.
//!
//! Callers hold the document lock, so the work runs on a private pool whose
//! workers only ever run these closures. The global pool may be full of
//! threads waiting on that same lock.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{Arc, OnceLock};
use tracing::warn;

use crate::dom::{DocumentAccess, NodeId, NodeRef, PrefixRegistry, XmlDocumentView};
use crate::snapshot::{capture, DocumentId, ElementSnapshot};
use crate::xpath::{evaluate_at, CompiledExpr, XPathValue};

/// Node-sets at least this large are captured in parallel
pub const PARALLEL_CAPTURE_THRESHOLD: usize = 256;

static POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

/// The pool for in-lock work; `None` if it could not be started
fn pool() -> Option<&'static ThreadPool> {
    POOL.get_or_init(|| {
        ThreadPoolBuilder::new()
            .thread_name(|i| format!("xmlvault-query-{}", i))
            .build()
            .map_err(|err| warn!(%err, "query pool unavailable, running sequentially"))
            .ok()
    })
    .as_ref()
}

/// Pool to fork onto, or `None` to stay on the calling thread.
///
/// A rayon worker blocked in `install` keeps stealing from its own pool and
/// may pick up a job that locks the same document, so workers never fork.
fn fork_pool() -> Option<&'static ThreadPool> {
    if rayon::current_thread_index().is_some() {
        return None;
    }
    pool()
}

/// Evaluate compiled expressions in parallel from the document node.
/// Compile failures pass through unchanged, in input order.
pub fn evaluate_parallel<D: DocumentAccess + Sync>(
    doc: &D,
    prefixes: &PrefixRegistry,
    compiled: &[Result<Arc<CompiledExpr>, String>],
) -> Vec<Result<XPathValue, String>> {
    let one = |expr: &Result<Arc<CompiledExpr>, String>| match expr {
        Ok(expr) => evaluate_at(doc, prefixes, expr, 0),
        Err(reason) => Err(reason.clone()),
    };
    match fork_pool() {
        Some(pool) if compiled.len() > 1 => pool.install(|| compiled.par_iter().map(one).collect()),
        _ => compiled.iter().map(one).collect(),
    }
}

/// Capture a node-set, keeping its order
pub fn capture_nodes(document: DocumentId, view: XmlDocumentView<'_>, nodes: &[NodeId]) -> Vec<ElementSnapshot> {
    let one = |&id: &NodeId| NodeRef::new(view, id).map(|node| capture(document, node));
    match fork_pool() {
        Some(pool) if nodes.len() >= PARALLEL_CAPTURE_THRESHOLD => {
            pool.install(|| nodes.par_iter().filter_map(one).collect())
        }
        _ => nodes.iter().filter_map(one).collect(),
    }
}
