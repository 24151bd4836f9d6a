//! Progress-callback trait for per-page and per-image pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the crawl and download phases make progress.
//!
//! Both phases run their tasks concurrently, so every method may be called
//! from several tokio worker threads at once and in completion order.
//!
//! # Example
//!
//! ```rust
//! use imgcrawl::{PipelineConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Written(AtomicUsize);
//!
//! impl PipelineProgressCallback for Written {
//!     fn on_image_written(&self, _url: &str, _filename: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(Written(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it crawls pages and processes images.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` and protect
/// shared mutable state themselves (`Mutex`, atomics).
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once before any page is fetched.
    fn on_crawl_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// A page was fetched with status 200 and `found` image URLs extracted.
    fn on_page_complete(&self, url: &str, found: usize) {
        let _ = (url, found);
    }

    /// A page answered with a non-200 status and contributed nothing.
    fn on_page_skipped(&self, url: &str, status: u16) {
        let _ = (url, status);
    }

    /// A page fetch failed at the transport level.
    fn on_page_error(&self, url: &str, error: &str) {
        let _ = (url, error);
    }

    /// Called once after every page task finished.
    fn on_crawl_complete(&self, total_pages: usize, images_found: usize) {
        let _ = (total_pages, images_found);
    }

    /// Called once before any image is fetched.
    fn on_download_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// An image was transformed and written as `filename`.
    fn on_image_written(&self, url: &str, filename: &str) {
        let _ = (url, filename);
    }

    /// An image answered with a non-200 status and was skipped.
    fn on_image_skipped(&self, url: &str, status: u16) {
        let _ = (url, status);
    }

    /// An image failed (fetch, decode, encode or write).
    fn on_image_error(&self, url: &str, error: &str) {
        let _ = (url, error);
    }

    /// Called once after every image task finished.
    fn on_download_complete(&self, total_images: usize, written: usize) {
        let _ = (total_images, written);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
