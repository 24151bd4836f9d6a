//! Reports returned by each phase and by a whole run.

use crate::error::{FetchError, ItemError};
use crate::types::ImageUrl;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Counters for the crawl phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Pages attempted.
    pub pages: usize,
    /// Pages answered with 200.
    pub pages_ok: usize,
    /// Pages answered with any other status.
    pub pages_skipped: usize,
    /// Pages whose fetch failed at the transport level.
    pub pages_failed: usize,
    /// Distinct image URLs across all pages.
    pub images_found: usize,
    pub duration_ms: u64,
}

/// Result of [`crate::pipeline::crawl::Crawler::discover`].
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Union of every page's extraction result.
    pub images: HashSet<ImageUrl>,
    pub stats: CrawlStats,
    pub failures: Vec<FetchError>,
}

/// Counters for the download phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStats {
    /// Images attempted.
    pub images: usize,
    /// Images transformed and written.
    pub written: usize,
    /// Images answered with a non-200 status.
    pub skipped: usize,
    /// Images that failed to fetch, decode, encode or write.
    pub failed: usize,
    pub duration_ms: u64,
}

/// Result of [`crate::pipeline::download::Downloader::download_all`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadReport {
    /// Paths written, in completion order.
    pub written: Vec<PathBuf>,
    pub stats: DownloadStats,
    pub failures: Vec<ItemError>,
}

/// Result of a full [`crate::run::run`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub crawl: CrawlStats,
    pub download: DownloadStats,
    /// Every non-fatal failure from both phases.
    pub failures: Vec<ItemError>,
    pub output_dir: PathBuf,
    pub total_duration_ms: u64,
}

impl RunReport {
    /// Number of image files written.
    pub fn written(&self) -> usize {
        self.download.written
    }
}
