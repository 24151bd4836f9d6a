//! Download phase: fetch → transform → write, one task per image URL.
//!
//! Fetches run concurrently on the tokio runtime, capped by
//! `download_concurrency`. Each fetched body is handed to the shared
//! [`TransformPool`] and the task suspends until the CPU work is done, so a
//! slow decode never holds up an in-flight fetch. Any failure ends only the
//! task that hit it; the phase returns once every task has finished.

use crate::config::PipelineConfig;
use crate::error::{ImgCrawlError, ItemError};
use crate::output::{DownloadReport, DownloadStats};
use crate::pipeline::fetch::{fetch_image, FetchOutcome};
use crate::pipeline::store::ImageStore;
use crate::pipeline::transform::TransformPool;
use crate::progress::ProgressCallback;
use crate::types::ImageUrl;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What one image task produced.
enum ImageOutcome {
    Written(PathBuf),
    Skipped,
    Failed(ItemError),
}

pub struct Downloader {
    client: reqwest::Client,
    pool: Arc<TransformPool>,
    store: ImageStore,
    concurrency: usize,
    timeout_secs: u64,
    progress: Option<ProgressCallback>,
}

impl Downloader {
    pub fn new(
        client: reqwest::Client,
        pool: Arc<TransformPool>,
        store: ImageStore,
        concurrency: usize,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            pool,
            store,
            concurrency: concurrency.max(1),
            timeout_secs,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Build a downloader from `config` around an image client and the
    /// run's transform pool.
    pub fn from_config(
        config: &PipelineConfig,
        client: reqwest::Client,
        pool: Arc<TransformPool>,
    ) -> Self {
        Self::new(
            client,
            pool,
            ImageStore::new(&config.output_dir),
            config.download_concurrency,
            config.request_timeout_secs,
        )
        .with_progress(config.progress_callback.clone())
    }

    /// Download, transform and write every URL in `urls`.
    ///
    /// `report.stats.written` is the number of files written.
    pub async fn download_all(
        &self,
        urls: &HashSet<ImageUrl>,
    ) -> Result<DownloadReport, ImgCrawlError> {
        self.download_all_with_cancel(urls, &CancellationToken::new())
            .await
    }

    /// As [`Downloader::download_all`], stopping early with
    /// [`ImgCrawlError::Cancelled`] once `cancel` fires. Files already
    /// written stay on disk.
    pub async fn download_all_with_cancel(
        &self,
        urls: &HashSet<ImageUrl>,
        cancel: &CancellationToken,
    ) -> Result<DownloadReport, ImgCrawlError> {
        let start = Instant::now();
        info!(
            "Downloading {} images (concurrency {}, {} transform workers)",
            urls.len(),
            self.concurrency,
            self.pool.workers()
        );
        if let Some(ref cb) = self.progress {
            cb.on_download_start(urls.len());
        }

        let outcomes: Vec<ImageOutcome> = stream::iter(urls.iter().map(|url| self.process_image(url)))
            .buffer_unordered(self.concurrency)
            .take_until(cancel.cancelled())
            .collect()
            .await;

        if outcomes.len() < urls.len() {
            warn!(
                "Download cancelled after {}/{} images",
                outcomes.len(),
                urls.len()
            );
            return Err(ImgCrawlError::Cancelled { phase: "download" });
        }

        let mut report = DownloadReport {
            stats: DownloadStats {
                images: urls.len(),
                ..DownloadStats::default()
            },
            ..DownloadReport::default()
        };

        for outcome in outcomes {
            match outcome {
                ImageOutcome::Written(path) => {
                    report.stats.written += 1;
                    report.written.push(path);
                }
                ImageOutcome::Skipped => report.stats.skipped += 1,
                ImageOutcome::Failed(e) => {
                    report.stats.failed += 1;
                    report.failures.push(e);
                }
            }
        }
        report.stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Processed all {} images: {} written, {} skipped, {} failed in {}ms",
            report.stats.images,
            report.stats.written,
            report.stats.skipped,
            report.stats.failed,
            report.stats.duration_ms
        );
        if let Some(ref cb) = self.progress {
            cb.on_download_complete(urls.len(), report.stats.written);
        }

        Ok(report)
    }

    async fn process_image(&self, url: &ImageUrl) -> ImageOutcome {
        match self.try_process_image(url).await {
            Ok(path) => {
                if let Some(ref cb) = self.progress {
                    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                    cb.on_image_written(url.as_str(), name);
                }
                ImageOutcome::Written(path)
            }
            Err(Skip::Status(status)) => {
                debug!("{}: skipped (HTTP {})", url, status);
                if let Some(ref cb) = self.progress {
                    cb.on_image_skipped(url.as_str(), status);
                }
                ImageOutcome::Skipped
            }
            Err(Skip::Failed(e)) => {
                warn!("Image failed: {}", e);
                if let Some(ref cb) = self.progress {
                    cb.on_image_error(url.as_str(), &e.to_string());
                }
                ImageOutcome::Failed(e)
            }
        }
    }

    async fn try_process_image(&self, url: &ImageUrl) -> Result<PathBuf, Skip> {
        let filename = ImageStore::filename_for(url)?;

        let bytes = match fetch_image(&self.client, url, self.timeout_secs)
            .await
            .map_err(ItemError::from)?
        {
            FetchOutcome::Body(bytes) => bytes,
            FetchOutcome::Status(status) => return Err(Skip::Status(status)),
        };

        let transformed = self.pool.submit(url, bytes, filename).await?;
        Ok(self.store.write(&transformed).await?)
    }
}

/// Early exits from [`Downloader::try_process_image`].
enum Skip {
    Status(u16),
    Failed(ItemError),
}

impl From<ItemError> for Skip {
    fn from(e: ItemError) -> Self {
        Skip::Failed(e)
    }
}
