//! Async facade

use std::time::Duration;
use xmlvault::{AsyncDocument, Document};

fn large() -> Document {
    let body: String = (0..5000).map(|i| format!("<item n=\"{}\"/>", i)).collect();
    Document::from_str(&format!("<r>{}</r>", body)).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_async_queries() {
    let doc = AsyncDocument::from(large());
    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let doc = doc.clone();
            tokio::spawn(async move { doc.xpath("//item").await.map(|v| v.len()) })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 5000);
    }
}

#[tokio::test]
async fn cancelled_query_leaves_document_usable() {
    let doc = AsyncDocument::from(large());

    // Drop the future before it can finish
    let abandoned = tokio::time::timeout(Duration::from_nanos(1), doc.xpath("//item[@n > 10]")).await;
    drop(abandoned);

    assert_eq!(doc.xpath("//item").await.unwrap().len(), 5000);
    assert_eq!(doc.document().xpath("//item[1]").len(), 1);
}

#[tokio::test]
async fn async_and_sync_share_state() {
    let sync = Document::from_str(r#"<r xmlns:q="urn:q"><q:a/></r>"#).unwrap();
    let doc = AsyncDocument::new(sync.clone());
    doc.define_prefix("q", "urn:q").await.unwrap();
    assert_eq!(sync.xpath("//q:a").len(), 1);
    assert_eq!(doc.first_css("q|a").await.unwrap().and_then(|a| a.local_name().map(str::to_string)).as_deref(), Some("a"));

    let batch = doc.xpath_batch(vec!["//q:a".into(), "//[".into()]).await.unwrap();
    assert_eq!(batch[0].as_ref().map(Vec::len), Ok(1));
    assert!(batch[1].is_err());
    assert!(doc.snapshot().await.unwrap().root().is_some());
}
