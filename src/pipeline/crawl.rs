//! Crawl phase: fetch every page concurrently and union their image URLs.
//!
//! Each page is an independent fetch → extract task. A page that answers
//! non-200, or whose fetch fails outright, contributes the empty set; the
//! failure is counted and logged but never aborts its siblings. The phase
//! either returns the full union or, if cancelled, nothing at all.

use crate::config::PipelineConfig;
use crate::error::{FetchError, ImgCrawlError};
use crate::output::{CrawlReport, CrawlStats};
use crate::pipeline::extract::ImageUrlExtractor;
use crate::pipeline::fetch::{FetchOutcome, PageFetcher};
use crate::progress::ProgressCallback;
use crate::types::{ImageUrl, PageUrl};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What one page task produced.
enum PageOutcome {
    Found(HashSet<ImageUrl>),
    Skipped,
    Failed(FetchError),
}

pub struct Crawler {
    fetcher: PageFetcher,
    extractor: ImageUrlExtractor,
    concurrency: usize,
    progress: Option<ProgressCallback>,
}

impl Crawler {
    /// `concurrency` caps page fetches in flight; use the page count or more
    /// for unbounded fan-out.
    pub fn new(fetcher: PageFetcher, extractor: ImageUrlExtractor, concurrency: usize) -> Self {
        Self {
            fetcher,
            extractor,
            concurrency: concurrency.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Build a crawler from `config` around an already-built page client.
    pub fn from_config(
        config: &PipelineConfig,
        client: reqwest::Client,
    ) -> Result<Self, ImgCrawlError> {
        let extractor = ImageUrlExtractor::new(&config.image_pattern, config.image_scheme.as_str())?;
        let fetcher = PageFetcher::new(client, config.request_timeout_secs);
        Ok(Self::new(fetcher, extractor, config.crawl_concurrency)
            .with_progress(config.progress_callback.clone()))
    }

    /// Crawl `pages` and return the deduplicated union of their image URLs.
    pub async fn discover(&self, pages: &[PageUrl]) -> Result<CrawlReport, ImgCrawlError> {
        self.discover_with_cancel(pages, &CancellationToken::new())
            .await
    }

    /// As [`Crawler::discover`], stopping early with
    /// [`ImgCrawlError::Cancelled`] once `cancel` fires.
    pub async fn discover_with_cancel(
        &self,
        pages: &[PageUrl],
        cancel: &CancellationToken,
    ) -> Result<CrawlReport, ImgCrawlError> {
        let start = Instant::now();
        info!(
            "Crawling {} pages (concurrency {})",
            pages.len(),
            self.concurrency
        );
        if let Some(ref cb) = self.progress {
            cb.on_crawl_start(pages.len());
        }

        let outcomes: Vec<PageOutcome> = stream::iter(pages.iter().map(|url| self.crawl_page(url)))
            .buffer_unordered(self.concurrency)
            .take_until(cancel.cancelled())
            .collect()
            .await;

        if outcomes.len() < pages.len() {
            warn!(
                "Crawl cancelled after {}/{} pages",
                outcomes.len(),
                pages.len()
            );
            return Err(ImgCrawlError::Cancelled { phase: "crawl" });
        }

        let mut report = CrawlReport {
            stats: CrawlStats {
                pages: pages.len(),
                ..CrawlStats::default()
            },
            ..CrawlReport::default()
        };

        for outcome in outcomes {
            match outcome {
                PageOutcome::Found(urls) => {
                    report.stats.pages_ok += 1;
                    report.images.extend(urls);
                }
                PageOutcome::Skipped => report.stats.pages_skipped += 1,
                PageOutcome::Failed(e) => {
                    report.stats.pages_failed += 1;
                    report.failures.push(e);
                }
            }
        }

        report.stats.images_found = report.images.len();
        report.stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Found {} images on {} pages ({} ok, {} skipped, {} failed) in {}ms",
            report.stats.images_found,
            report.stats.pages,
            report.stats.pages_ok,
            report.stats.pages_skipped,
            report.stats.pages_failed,
            report.stats.duration_ms
        );
        if let Some(ref cb) = self.progress {
            cb.on_crawl_complete(pages.len(), report.stats.images_found);
        }

        Ok(report)
    }

    async fn crawl_page(&self, url: &PageUrl) -> PageOutcome {
        match self.fetcher.fetch(url).await {
            Ok(FetchOutcome::Body(text)) => {
                let urls = self.extractor.extract(&text);
                debug!("{}: {} image URLs", url, urls.len());
                if let Some(ref cb) = self.progress {
                    cb.on_page_complete(url.as_str(), urls.len());
                }
                PageOutcome::Found(urls)
            }
            Ok(FetchOutcome::Status(status)) => {
                debug!("{}: skipped (HTTP {})", url, status);
                if let Some(ref cb) = self.progress {
                    cb.on_page_skipped(url.as_str(), status);
                }
                PageOutcome::Skipped
            }
            Err(e) => {
                warn!("Page fetch failed: {}", e);
                if let Some(ref cb) = self.progress {
                    cb.on_page_error(url.as_str(), &e.to_string());
                }
                PageOutcome::Failed(e)
            }
        }
    }
}
