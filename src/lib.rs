//! xmlvault - Thread-safe XML/HTML documents
//!
//! A parsed document lives behind one lock; queries hand back immutable
//! snapshots that can be shared across threads freely.
//!
//! Layers:
//! - core / reader: byte scanning, tokenizing, pull events
//! - dom: arena tree, namespaces, serialization
//! - xpath / css: XPath 1.0 engine and the CSS-to-XPath translator
//! - snapshot: owned results
//! - document: the locked handle (`Document`), plus `AsyncDocument`
//!
//! ```
//! use xmlvault::Document;
//!
//! let doc = Document::from_str(r#"<feed xmlns:m="urn:media"><m:clip id="a"/><m:clip id="b"/></feed>"#).unwrap();
//! doc.define_prefix("media", "urn:media");
//! let clips = doc.xpath("//media:clip");
//! assert_eq!(clips.len(), 2);
//! assert_eq!(clips[0].attr("id"), Some("a"));
//! ```

pub mod core;
pub mod css;
pub mod dom;
pub mod reader;
pub mod snapshot;
pub mod xpath;

mod document;
mod error;
mod options;
mod resource;
mod strategy;

#[cfg(feature = "tokio")]
mod asynchronous;

pub use crate::core::encoding::Encoding;
pub use crate::document::Document;
pub use crate::dom::NodeKind;
pub use crate::error::{ParseError, QueryError};
pub use crate::options::{DocumentKind, ParseOptions, DEFAULT_EXPRESSION_CACHE};
pub use crate::snapshot::{DocumentId, DocumentSnapshot, ElementSnapshot, NodeHandle, QueryResult};

#[cfg(feature = "tokio")]
pub use crate::asynchronous::AsyncDocument;

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "memory_tracking")]
mod tracking {
    use std::alloc::{GlobalAlloc, Layout};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
    pub static PEAK_ALLOCATED: AtomicUsize = AtomicUsize::new(0);

    pub struct TrackingAllocator;

    #[cfg(feature = "mimalloc")]
    static UNDERLYING: mimalloc::MiMalloc = mimalloc::MiMalloc;

    #[cfg(not(feature = "mimalloc"))]
    static UNDERLYING: std::alloc::System = std::alloc::System;

    // SAFETY: every call is forwarded unchanged to the underlying allocator;
    // only the byte counters are updated around it.
    unsafe impl GlobalAlloc for TrackingAllocator {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let ptr = UNDERLYING.alloc(layout);
            if !ptr.is_null() {
                let current = ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
                PEAK_ALLOCATED.fetch_max(current, Ordering::Relaxed);
            }
            ptr
        }

        unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
            ALLOCATED.fetch_sub(layout.size(), Ordering::Relaxed);
            UNDERLYING.dealloc(ptr, layout)
        }
    }
}

#[cfg(feature = "memory_tracking")]
#[global_allocator]
static GLOBAL: tracking::TrackingAllocator = tracking::TrackingAllocator;

#[cfg(all(feature = "mimalloc", not(feature = "memory_tracking")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Memory Statistics
// ============================================================================

/// Heap statistics; all zero unless built with `memory_tracking`
pub mod memory {
    #[cfg(feature = "memory_tracking")]
    use std::sync::atomic::Ordering;

    /// Bytes currently allocated
    #[cfg(feature = "memory_tracking")]
    pub fn allocated() -> usize {
        super::tracking::ALLOCATED.load(Ordering::SeqCst)
    }

    /// Highest allocation seen since start or the last reset
    #[cfg(feature = "memory_tracking")]
    pub fn peak() -> usize {
        super::tracking::PEAK_ALLOCATED.load(Ordering::SeqCst)
    }

    /// Reset the peak to the current allocation; returns (current, old peak)
    #[cfg(feature = "memory_tracking")]
    pub fn reset_peak() -> (usize, usize) {
        let current = super::tracking::ALLOCATED.load(Ordering::SeqCst);
        let peak = super::tracking::PEAK_ALLOCATED.swap(current, Ordering::SeqCst);
        (current, peak)
    }

    #[cfg(not(feature = "memory_tracking"))]
    pub fn allocated() -> usize {
        0
    }

    #[cfg(not(feature = "memory_tracking"))]
    pub fn peak() -> usize {
        0
    }

    #[cfg(not(feature = "memory_tracking"))]
    pub fn reset_peak() -> (usize, usize) {
        (0, 0)
    }
}
