//! Async Facade
//!
//! Runs each document operation on Tokio's blocking pool. Dropping a
//! returned future abandons the result only: the operation still finishes
//! and releases the lock, so the document stays usable.

use tokio::task::{self, JoinError};

use crate::document::Document;
use crate::error::QueryError;
use crate::snapshot::{DocumentSnapshot, ElementSnapshot, QueryResult};

/// Async wrapper sharing its tree with the [`Document`] it came from
#[derive(Debug, Clone)]
pub struct AsyncDocument {
    inner: Document,
}

impl From<Document> for AsyncDocument {
    fn from(inner: Document) -> Self {
        AsyncDocument { inner }
    }
}

impl AsyncDocument {
    pub fn new(inner: Document) -> Self {
        AsyncDocument { inner }
    }

    /// The synchronous handle behind this wrapper
    pub fn document(&self) -> &Document {
        &self.inner
    }

    async fn run<F, R>(&self, f: F) -> Result<R, JoinError>
    where
        F: FnOnce(&Document) -> R + Send + 'static,
        R: Send + 'static,
    {
        let doc = self.inner.clone();
        task::spawn_blocking(move || f(&doc)).await
    }

    pub async fn define_prefix(&self, prefix: &str, uri: &str) -> Result<(), JoinError> {
        let (prefix, uri) = (prefix.to_string(), uri.to_string());
        self.run(move |doc| doc.define_prefix(&prefix, &uri)).await
    }

    pub async fn root(&self) -> Result<Option<ElementSnapshot>, JoinError> {
        self.run(Document::root).await
    }

    pub async fn snapshot(&self) -> Result<DocumentSnapshot, JoinError> {
        self.run(Document::snapshot).await
    }

    pub async fn xpath(&self, expr: &str) -> Result<Vec<ElementSnapshot>, JoinError> {
        let expr = expr.to_string();
        self.run(move |doc| doc.xpath(&expr)).await
    }

    pub async fn try_xpath(&self, expr: &str) -> Result<Result<Vec<ElementSnapshot>, QueryError>, JoinError> {
        let expr = expr.to_string();
        self.run(move |doc| doc.try_xpath(&expr)).await
    }

    pub async fn first_xpath(&self, expr: &str) -> Result<Option<ElementSnapshot>, JoinError> {
        let expr = expr.to_string();
        self.run(move |doc| doc.first_xpath(&expr)).await
    }

    pub async fn css(&self, selector: &str) -> Result<Vec<ElementSnapshot>, JoinError> {
        let selector = selector.to_string();
        self.run(move |doc| doc.css(&selector)).await
    }

    pub async fn first_css(&self, selector: &str) -> Result<Option<ElementSnapshot>, JoinError> {
        let selector = selector.to_string();
        self.run(move |doc| doc.first_css(&selector)).await
    }

    pub async fn eval(&self, expr: &str) -> Result<Option<QueryResult>, JoinError> {
        let expr = expr.to_string();
        self.run(move |doc| doc.eval(&expr)).await
    }

    pub async fn xpath_batch(
        &self,
        exprs: Vec<String>,
    ) -> Result<Vec<Result<Vec<ElementSnapshot>, QueryError>>, JoinError> {
        self.run(move |doc| {
            let refs: Vec<&str> = exprs.iter().map(String::as_str).collect();
            doc.xpath_batch(&refs)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queries_run_off_the_runtime() {
        let doc = AsyncDocument::from(Document::from_str("<r><a>1</a><a>2</a></r>").unwrap());
        assert_eq!(doc.xpath("//a").await.unwrap().len(), 2);
        assert_eq!(doc.eval("sum(//a)").await.unwrap().map(|r| r.number), Some(3.0));
        assert!(doc.try_xpath("//[").await.unwrap().is_err());
        assert_eq!(doc.root().await.unwrap().and_then(|r| r.tag().map(str::to_string)), Some("r".into()));
    }
}
