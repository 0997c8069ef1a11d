//! Compiled expression cache
//!
//! Each document keeps the most recently used compiled expressions so a
//! query repeated against it skips lexing and parsing.

use super::compiler::{self, CompiledExpr};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::trace;

/// LRU map from expression text to its compiled form
#[derive(Debug)]
pub struct ExpressionCache {
    /// `None` when caching is disabled (capacity 0)
    entries: Option<LruCache<String, Arc<CompiledExpr>>>,
}

impl ExpressionCache {
    pub fn new(capacity: usize) -> Self {
        ExpressionCache {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    /// Compiled form of `expression`, compiling and caching on a miss.
    /// Compile errors are not cached.
    pub fn get_or_compile(&mut self, expression: &str) -> Result<Arc<CompiledExpr>, String> {
        let Some(entries) = self.entries.as_mut() else {
            return compiler::compile(expression).map(Arc::new);
        };

        if let Some(hit) = entries.get(expression) {
            trace!(expression, "expression cache hit");
            return Ok(Arc::clone(hit));
        }

        let compiled = Arc::new(compiler::compile(expression)?);
        entries.put(expression.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_share_the_compiled_expression() {
        let mut cache = ExpressionCache::new(4);
        let first = cache.get_or_compile("//a").unwrap();
        let second = cache.get_or_compile("//a").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = ExpressionCache::new(2);
        let a = cache.get_or_compile("a").unwrap();
        cache.get_or_compile("b").unwrap();
        cache.get_or_compile("a").unwrap();
        cache.get_or_compile("c").unwrap();
        assert_eq!(cache.len(), 2);
        // "a" was touched after "b", so it survived
        assert!(Arc::ptr_eq(&a, &cache.get_or_compile("a").unwrap()));
    }

    #[test]
    fn test_errors_and_disabled_cache() {
        let mut cache = ExpressionCache::new(2);
        assert!(cache.get_or_compile("a[").is_err());
        assert!(cache.is_empty());

        let mut disabled = ExpressionCache::new(0);
        assert!(disabled.get_or_compile("//a").is_ok());
        assert!(disabled.is_empty());
    }
}
