//! Progress-callback trait for extraction and description events.
//!
//! Inject an [`Arc<dyn DissectProgressCallback>`] via
//! [`crate::config::DissectConfigBuilder::progress_callback`] to receive
//! events as pages are extracted and images described. Callers forward them
//! to whatever they use for feedback (a terminal bar, a channel, a log).
//!
//! # Example
//!
//! ```rust
//! use pdf_dissect::{DissectConfig, DissectProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl DissectProgressCallback for PageCounter {
//!     fn on_page_extracted(&self, page_num: usize, total_pages: usize, image_count: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}: {image_count} images");
//!     }
//! }
//!
//! let config = DissectConfig::builder()
//!     .progress_callback(Arc::new(PageCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it works through a document.
///
/// Extraction events arrive in page order from a single blocking thread.
/// Description events may arrive from several tasks at once, so
/// implementations must be `Send + Sync` and synchronise shared state.
/// All methods default to no-ops.
pub trait DissectProgressCallback: Send + Sync {
    /// Called once the page selection is known, before any page is read.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page's text, images and screenshot were extracted.
    ///
    /// `image_count` includes failed slots.
    fn on_page_extracted(&self, page_num: usize, total_pages: usize, image_count: usize) {
        let _ = (page_num, total_pages, image_count);
    }

    /// Called when a page, or part of it, could not be extracted.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called after each description attempt finishes, successful or not.
    fn on_image_described(&self, done: usize, total: usize) {
        let _ = (done, total);
    }

    /// Called once after the report files were written.
    ///
    /// `success_count` is the number of pages extracted without a page-level
    /// failure.
    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DissectProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DissectConfig`].
pub type ProgressCallback = Arc<dyn DissectProgressCallback>;
