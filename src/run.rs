//! Top-level orchestration: crawl every page, then download every image.
//!
//! The only ordering guarantee between tasks is at the phase boundary: the
//! download set is the crawl result, so every page task finishes before the
//! first image request goes out. Each phase opens its own shared HTTP client
//! and drops it when the phase ends. The transform pool lives for the whole
//! run and is released when [`run_with_cancel`] returns.

use crate::config::PipelineConfig;
use crate::error::{ImgCrawlError, ItemError};
use crate::output::RunReport;
use crate::pipeline::crawl::Crawler;
use crate::pipeline::download::Downloader;
use crate::pipeline::fetch;
use crate::pipeline::store::ImageStore;
use crate::pipeline::transform::TransformPool;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Crawl the configured pages and write every discovered image.
///
/// # Returns
/// `Ok(RunReport)` once both phases finish, however many individual pages
/// or images failed (see `report.failures`).
///
/// # Errors
/// Only fatal errors: invalid pattern, unusable output directory, HTTP
/// client or worker pool construction failure.
pub async fn run(config: &PipelineConfig) -> Result<RunReport, ImgCrawlError> {
    run_with_cancel(config, CancellationToken::new()).await
}

/// As [`run`], aborting in-flight work with [`ImgCrawlError::Cancelled`]
/// once `cancel` fires. Images already written stay on disk.
pub async fn run_with_cancel(
    config: &PipelineConfig,
    cancel: CancellationToken,
) -> Result<RunReport, ImgCrawlError> {
    let total_start = Instant::now();
    let pages = config.pages.to_urls();
    info!(
        "Starting run: {} pages → {}",
        pages.len(),
        config.output_dir.display()
    );

    // ── Step 1: Run-scoped resources ─────────────────────────────────────
    let pool = Arc::new(TransformPool::from_config(config)?);
    ImageStore::new(&config.output_dir).prepare().await?;

    // ── Step 2: Crawl ────────────────────────────────────────────────────
    let crawl = {
        let client = fetch::page_client(config)?;
        let crawler = Crawler::from_config(config, client)?;
        crawler.discover_with_cancel(&pages, &cancel).await?
    };
    info!("Crawl phase done: {} distinct images", crawl.images.len());

    // ── Step 3: Download + transform ─────────────────────────────────────
    let download = {
        let client = fetch::image_client(config)?;
        let downloader = Downloader::from_config(config, client, Arc::clone(&pool));
        downloader
            .download_all_with_cancel(&crawl.images, &cancel)
            .await?
    };
    info!(
        "Download phase done: {}/{} images written",
        download.stats.written,
        crawl.images.len()
    );

    drop(pool);

    let failures: Vec<ItemError> = crawl
        .failures
        .into_iter()
        .map(ItemError::from)
        .chain(download.failures)
        .collect();

    Ok(RunReport {
        crawl: crawl.stats,
        download: download.stats,
        failures,
        output_dir: config.output_dir.clone(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    })
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(config: &PipelineConfig) -> Result<RunReport, ImgCrawlError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ImgCrawlError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(config))
}
