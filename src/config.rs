//! Configuration types for a crawl-and-transform run.
//!
//! Every knob lives in [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. The defaults reproduce the reference job:
//! pages 1–99 of one Flickr photostream, `live.staticflickr.com` JPEGs,
//! 120×120 grayscale thumbnails written to `./images`.
//!
//! There is no configuration file format; the CLI maps flags and
//! `IMGCRAWL_*` environment variables onto the builder.

use crate::error::ImgCrawlError;
use crate::progress::ProgressCallback;
use crate::types::PageUrl;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default page template; `{n}` is replaced by the page number.
pub const DEFAULT_PAGE_TEMPLATE: &str = "https://www.flickr.com/photos/confoo/page{n}";

/// Matches `url(//live.staticflickr.com/….jpg)` and captures host + path.
pub const DEFAULT_IMAGE_PATTERN: &str = r"url\(//(live\.staticflickr\.com/[^)\s]+?\.jpg)\)";

/// Configuration for a pipeline run.
///
/// # Example
/// ```rust
/// use imgcrawl::{PageSource, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .pages(PageSource::range("https://example.com/gallery/page{n}", 1, 5))
///     .output_dir("thumbs")
///     .download_concurrency(16)
///     .build()
///     .unwrap();
/// assert_eq!(config.target_width, 120);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Pages to crawl. Default: pages 1–99 of [`DEFAULT_PAGE_TEMPLATE`].
    pub pages: PageSource,

    /// Directory that receives the transformed images. Default: `images`.
    pub output_dir: PathBuf,

    /// Maximum page fetches in flight. Default: 100.
    ///
    /// Set at or above the page count to get the unbounded fan-out of the
    /// reference job.
    pub crawl_concurrency: usize,

    /// Maximum image downloads in flight. Default: 64.
    pub download_concurrency: usize,

    /// Threads in the CPU transform pool. Default: number of logical CPUs.
    pub transform_workers: usize,

    /// Output width in pixels. Default: 120.
    pub target_width: u32,

    /// Output height in pixels. Default: 120.
    pub target_height: u32,

    /// Resampling filter used for the resize. Default: [`ResizeFilter::CatmullRom`].
    pub filter: ResizeFilter,

    /// JPEG quality (1–100) for `.jpg`/`.jpeg` outputs. Default: 75.
    pub jpeg_quality: u8,

    /// Extraction regex; capture group 1 is the host + path fragment.
    /// Default: [`DEFAULT_IMAGE_PATTERN`].
    pub image_pattern: String,

    /// Scheme prefixed to every extracted fragment. Default: `https`.
    pub image_scheme: String,

    /// Per-request timeout in seconds for both phases. Default: 30.
    pub request_timeout_secs: u64,

    /// `User-Agent` header sent by both clients. Default: `imgcrawl/<version>`.
    pub user_agent: String,

    /// Optional per-page / per-image event sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pages: PageSource::default(),
            output_dir: PathBuf::from("images"),
            crawl_concurrency: 100,
            download_concurrency: 64,
            transform_workers: num_cpus::get().max(1),
            target_width: 120,
            target_height: 120,
            filter: ResizeFilter::default(),
            jpeg_quality: 75,
            image_pattern: DEFAULT_IMAGE_PATTERN.to_string(),
            image_scheme: "https".to_string(),
            request_timeout_secs: 30,
            user_agent: concat!("imgcrawl/", env!("CARGO_PKG_VERSION")).to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("pages", &self.pages)
            .field("output_dir", &self.output_dir)
            .field("crawl_concurrency", &self.crawl_concurrency)
            .field("download_concurrency", &self.download_concurrency)
            .field("transform_workers", &self.transform_workers)
            .field("target_width", &self.target_width)
            .field("target_height", &self.target_height)
            .field("filter", &self.filter)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("image_pattern", &self.image_pattern)
            .field("image_scheme", &self.image_scheme)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn pages(mut self, pages: PageSource) -> Self {
        self.config.pages = pages;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn crawl_concurrency(mut self, n: usize) -> Self {
        self.config.crawl_concurrency = n.max(1);
        self
    }

    pub fn download_concurrency(mut self, n: usize) -> Self {
        self.config.download_concurrency = n.max(1);
        self
    }

    pub fn transform_workers(mut self, n: usize) -> Self {
        self.config.transform_workers = n.max(1);
        self
    }

    /// Set both output dimensions.
    pub fn target_size(mut self, width: u32, height: u32) -> Self {
        self.config.target_width = width;
        self.config.target_height = height;
        self
    }

    pub fn filter(mut self, filter: ResizeFilter) -> Self {
        self.config.filter = filter;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn image_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.image_pattern = pattern.into();
        self
    }

    pub fn image_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.image_scheme = scheme.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ImgCrawlError> {
        let c = &self.config;
        if c.target_width == 0 || c.target_height == 0 {
            return Err(ImgCrawlError::InvalidConfig(format!(
                "Target size must be at least 1x1, got {}x{}",
                c.target_width, c.target_height
            )));
        }
        if c.crawl_concurrency == 0 || c.download_concurrency == 0 {
            return Err(ImgCrawlError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.transform_workers == 0 {
            return Err(ImgCrawlError::InvalidConfig(
                "Transform workers must be ≥ 1".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(ImgCrawlError::InvalidConfig(
                "Request timeout must be ≥ 1s".into(),
            ));
        }
        if c.image_scheme.is_empty() || c.image_scheme.contains("://") {
            return Err(ImgCrawlError::InvalidConfig(format!(
                "Image scheme must be a bare scheme like 'https', got '{}'",
                c.image_scheme
            )));
        }
        c.pages.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Where the crawl's page URLs come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PageSource {
    /// `template` with `{n}` replaced by every number in `start..=end`.
    Range {
        template: String,
        start: u32,
        end: u32,
    },
    /// An explicit list of page URLs.
    List(Vec<String>),
}

impl Default for PageSource {
    fn default() -> Self {
        PageSource::Range {
            template: DEFAULT_PAGE_TEMPLATE.to_string(),
            start: 1,
            end: 99,
        }
    }
}

impl PageSource {
    pub fn range(template: impl Into<String>, start: u32, end: u32) -> Self {
        PageSource::Range {
            template: template.into(),
            start,
            end,
        }
    }

    pub fn list<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PageSource::List(urls.into_iter().map(Into::into).collect())
    }

    /// Expand into the page URLs to crawl, in enumeration order.
    pub fn to_urls(&self) -> Vec<PageUrl> {
        match self {
            PageSource::Range {
                template,
                start,
                end,
            } => (*start..=*end)
                .map(|n| PageUrl::new(template.replace("{n}", &n.to_string())))
                .collect(),
            PageSource::List(urls) => urls.iter().map(|u| PageUrl::new(u.as_str())).collect(),
        }
    }

    fn validate(&self) -> Result<(), ImgCrawlError> {
        match self {
            PageSource::Range {
                template,
                start,
                end,
            } => {
                if !template.contains("{n}") {
                    return Err(ImgCrawlError::InvalidConfig(format!(
                        "Page template '{}' has no {{n}} placeholder",
                        template
                    )));
                }
                if start > end {
                    return Err(ImgCrawlError::InvalidConfig(format!(
                        "Invalid page range {}-{}: start must be <= end",
                        start, end
                    )));
                }
            }
            PageSource::List(urls) => {
                if urls.is_empty() {
                    return Err(ImgCrawlError::InvalidConfig(
                        "Page list is empty".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Resampling filter for the resize step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResizeFilter {
    /// Nearest neighbour. Fastest, blocky.
    Nearest,
    /// Bilinear.
    Triangle,
    /// Bicubic. (default)
    #[default]
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with window 3. Sharpest, slowest.
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(f: ResizeFilter) -> Self {
        match f {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}
