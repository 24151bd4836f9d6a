//! # imgcrawl
//!
//! Crawl a bounded set of gallery pages, collect every image URL they
//! reference, then download each image and write a 120×120 grayscale copy.
//!
//! ## Pipeline Overview
//!
//! ```text
//! pages 1..=99
//!  │
//!  ├─ 1. Crawl     concurrent GETs (no redirects) + regex extraction
//!  ├─ 2. Union     one deduplicated HashSet<ImageUrl>
//!  ├─ 3. Download  concurrent GETs, bodies handed to a rayon pool
//!  ├─ 4. Transform decode → resize_exact → luma8 → encode (CPU-bound)
//!  └─ 5. Store     images/<last path segment>, written whole
//! ```
//!
//! Network work runs on tokio; CPU work runs on a fixed-size rayon pool, and
//! the two meet through a `oneshot` channel so neither starves the other.
//! A failed page or image is counted and logged, never fatal.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgcrawl::{run, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let report = run(&config).await?;
//!     eprintln!(
//!         "{} images found, {} written, {} failed",
//!         report.crawl.images_found,
//!         report.download.written,
//!         report.download.failed,
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `imgcrawl` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod run;
pub mod types;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageSource, PipelineConfig, PipelineConfigBuilder, ResizeFilter};
pub use error::{FetchError, ImgCrawlError, ItemError, TransformError};
pub use output::{CrawlReport, CrawlStats, DownloadReport, DownloadStats, RunReport};
pub use pipeline::crawl::Crawler;
pub use pipeline::download::Downloader;
pub use pipeline::extract::ImageUrlExtractor;
pub use pipeline::fetch::{FetchOutcome, PageFetcher};
pub use pipeline::store::ImageStore;
pub use pipeline::transform::{ImageTransformer, TransformPool};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use run::{run, run_sync, run_with_cancel};
pub use tokio_util::sync::CancellationToken;
pub use types::{ImageUrl, PageUrl, TransformedImage};
