//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the split pages. The binary uses it
//! to drive an `indicatif` progress bar; library callers can forward the
//! events anywhere.
//!
//! # Example
//!
//! ```rust
//! use pdf2notebook::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, page_bytes: u64) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} rendered ({} bytes)", page_num, total_pages, page_bytes);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { rendered: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive in page order from a single task.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after splitting, before the first page is rendered.
    ///
    /// # Arguments
    /// * `total_pages` — pages across all input files
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is handed to the renderer.
    ///
    /// # Arguments
    /// * `page_num`    — global 1-indexed page number
    /// * `total_pages` — pages across all input files
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page file has been written to the bundle.
    ///
    /// # Arguments
    /// * `page_num`   — global 1-indexed page number
    /// * `total_pages` — pages across all input files
    /// * `page_bytes` — size of the rendered page file
    fn on_page_complete(&self, page_num: usize, total_pages: usize, page_bytes: u64) {
        let _ = (page_num, total_pages, page_bytes);
    }

    /// Called when a page fails to render (fatal or skipped) or its
    /// thumbnail could not be produced.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once the archive has been written.
    fn on_archive_written(&self, path: &Path, bytes: u64) {
        let _ = (path, bytes);
    }

    /// Called once after the run succeeded.
    ///
    /// # Arguments
    /// * `total_pages`    — pages across all input files
    /// * `rendered_count` — pages that made it into the bundle
    fn on_conversion_complete(&self, total_pages: usize, rendered_count: usize) {
        let _ = (total_pages, rendered_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
