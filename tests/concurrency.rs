//! Concurrent access to one document
//!
//! Operations on a shared document never interleave, so every concurrent
//! reader observes the same complete result.

use rayon::prelude::*;
use std::thread;
use xmlvault::Document;

const ITEMS: usize = 1000;
const QUERIES: usize = 1000;

fn catalog() -> Document {
    let mut xml = String::from("<catalog>");
    for i in 0..ITEMS {
        xml.push_str(&format!("<item n=\"{}\">value {}</item>", i, i));
    }
    xml.push_str("</catalog>");
    Document::from_str(&xml).unwrap()
}

#[test]
fn scoped_threads_see_every_item() {
    let doc = catalog();
    let counts: Vec<usize> = thread::scope(|scope| {
        let handles: Vec<_> = (0..QUERIES)
            .map(|_| scope.spawn(|| doc.xpath("//item").len()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(counts.len(), QUERIES);
    assert!(counts.iter().all(|&c| c == ITEMS));
    assert_eq!(doc.xpath("//item").len(), ITEMS);
}

#[test]
fn rayon_queries_on_cloned_handles() {
    let doc = catalog();
    let counts: Vec<usize> = (0..QUERIES)
        .into_par_iter()
        .map_with(doc.clone(), |doc, _| doc.xpath("//item").len())
        .collect();

    assert!(counts.iter().all(|&c| c == ITEMS));
    assert_eq!(doc.eval("count(//item)").map(|r| r.number), Some(ITEMS as f64));
}

#[test]
fn prefix_writes_interleave_with_reads() {
    let doc = Document::from_str(r#"<r xmlns:a="urn:a"><a:x/><a:x/></r>"#).unwrap();
    thread::scope(|scope| {
        for i in 0..8 {
            let doc = &doc;
            scope.spawn(move || {
                for _ in 0..50 {
                    let uri = if i % 2 == 0 { "urn:a" } else { "urn:none" };
                    doc.define_prefix(&format!("p{}", i), uri);
                    let count = doc.xpath(&format!("//p{}:x", i)).len();
                    // Each thread owns its prefix, so its own binding is what it sees
                    assert_eq!(count, if i % 2 == 0 { 2 } else { 0 });
                }
            });
        }
    });
}

#[test]
fn independent_documents_in_parallel() {
    let docs: Vec<Document> = (0..16)
        .map(|i| Document::from_str(&format!("<r>{}</r>", "<x/>".repeat(i + 1))).unwrap())
        .collect();
    let counts: Vec<usize> = docs.par_iter().map(|d| d.xpath("//x").len()).collect();
    assert_eq!(counts, (1..=16).collect::<Vec<_>>());
}

#[test]
fn batch_under_contention() {
    let doc = catalog();
    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let results = doc.xpath_batch(&["//item[1]", "//item[last()]", "//item"]);
                assert_eq!(results[0].as_ref().map(Vec::len), Ok(1));
                assert_eq!(results[1].as_ref().map(|v| v[0].attr("n").map(str::to_string)), Ok(Some("999".into())));
                assert_eq!(results[2].as_ref().map(Vec::len), Ok(ITEMS));
            });
        }
    });
}

#[test]
fn plain_threads_alongside_rayon_callers() {
    let doc = catalog();
    let plain: Vec<_> = (0..4)
        .map(|_| {
            let doc = doc.clone();
            thread::spawn(move || (0..200).map(|_| doc.xpath("//item").len()).collect::<Vec<_>>())
        })
        .collect();

    let from_rayon: Vec<usize> = (0..2000)
        .into_par_iter()
        .map(|_| doc.xpath("//item").len())
        .collect();

    assert!(from_rayon.iter().all(|&c| c == ITEMS));
    for handle in plain {
        assert!(handle.join().unwrap().iter().all(|&c| c == ITEMS));
    }
}
