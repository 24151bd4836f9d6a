//! CLI binary for imgcrawl.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig`, draws progress and prints the summary.

use anyhow::{Context, Result};
use clap::Parser;
use imgcrawl::{
    run_with_cancel, CancellationToken, PageSource, PipelineConfig, PipelineProgressCallback,
    ProgressCallback, ResizeFilter,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One progress bar reused for both phases; events arrive out of order
/// because tasks complete concurrently.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, prefix: &'static str, unit: &str, total: usize) {
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  \
             [{{bar:42.green/238}}] {{pos:>4}}/{{len}} {unit}  \
             ⏱ {{elapsed_precise}}  {{msg}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix(prefix);
        self.bar.set_message("");
    }

    fn report_error(&self, url: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), dim(url), red(&msg)));
        self.bar.inc(1);
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_crawl_start(&self, total_pages: usize) {
        self.activate_bar("Crawling", "pages", total_pages);
    }

    fn on_page_complete(&self, _url: &str, found: usize) {
        self.bar.set_message(format!("+{found} images"));
        self.bar.inc(1);
    }

    fn on_page_skipped(&self, _url: &str, _status: u16) {
        self.bar.inc(1);
    }

    fn on_page_error(&self, url: &str, error: &str) {
        self.report_error(url, error);
    }

    fn on_crawl_complete(&self, _total_pages: usize, images_found: usize) {
        self.bar.println(format!(
            "{} Found {} images.",
            cyan("◆"),
            bold(&images_found.to_string())
        ));
    }

    fn on_download_start(&self, total_images: usize) {
        self.activate_bar("Processing", "images", total_images);
    }

    fn on_image_written(&self, _url: &str, filename: &str) {
        self.bar.set_message(filename.to_string());
        self.bar.inc(1);
    }

    fn on_image_skipped(&self, _url: &str, _status: u16) {
        self.bar.inc(1);
    }

    fn on_image_error(&self, url: &str, error: &str) {
        self.report_error(url, error);
    }

    fn on_download_complete(&self, total_images: usize, written: usize) {
        self.bar.finish_and_clear();
        let errors = self.errors.load(Ordering::SeqCst);
        eprintln!(
            "{} Processed all {} images  ({} written{})",
            if errors == 0 { green("✔") } else { cyan("⚠") },
            bold(&total_images.to_string()),
            written,
            if errors == 0 {
                String::new()
            } else {
                format!(", {} errors", red(&errors.to_string()))
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Reference job: pages 1-99 of the default gallery into ./images
  imgcrawl

  # Another photostream, first 10 pages, custom output directory
  imgcrawl --template 'https://www.flickr.com/photos/someone/page{n}' --end 10 -o thumbs

  # Explicit page list
  imgcrawl --page https://example.com/a --page https://example.com/b

  # 64x64 thumbnails, at most 8 CPU workers
  imgcrawl --width 64 --height 64 --workers 8

  # Machine-readable summary
  imgcrawl --json > report.json

ENVIRONMENT VARIABLES:
  RUST_LOG               Override the log filter (e.g. imgcrawl=debug)
  IMGCRAWL_*             Every flag has an IMGCRAWL_<FLAG> equivalent
"#;

/// Crawl gallery pages and save every image as a small grayscale thumbnail.
#[derive(Parser, Debug)]
#[command(
    name = "imgcrawl",
    version,
    about = "Crawl gallery pages and save every image as a small grayscale thumbnail",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Page URL template; `{n}` is replaced by the page number.
    #[arg(long, env = "IMGCRAWL_TEMPLATE", default_value = imgcrawl::config::DEFAULT_PAGE_TEMPLATE)]
    template: String,

    /// First page number.
    #[arg(long, env = "IMGCRAWL_START", default_value_t = 1)]
    start: u32,

    /// Last page number (inclusive).
    #[arg(long, env = "IMGCRAWL_END", default_value_t = 99)]
    end: u32,

    /// Crawl these page URLs instead of the template range (repeatable).
    #[arg(long = "page", value_name = "URL")]
    pages: Vec<String>,

    /// Directory the thumbnails are written to.
    #[arg(short, long, env = "IMGCRAWL_OUTPUT", default_value = "images")]
    output: PathBuf,

    /// Page fetches in flight.
    #[arg(long, env = "IMGCRAWL_CRAWL_CONCURRENCY", default_value_t = 100)]
    crawl_concurrency: usize,

    /// Image downloads in flight.
    #[arg(short, long, env = "IMGCRAWL_CONCURRENCY", default_value_t = 64)]
    concurrency: usize,

    /// CPU threads for decoding and resizing (default: logical CPUs).
    #[arg(short, long, env = "IMGCRAWL_WORKERS")]
    workers: Option<usize>,

    /// Output width in pixels.
    #[arg(long, env = "IMGCRAWL_WIDTH", default_value_t = 120)]
    width: u32,

    /// Output height in pixels.
    #[arg(long, env = "IMGCRAWL_HEIGHT", default_value_t = 120)]
    height: u32,

    /// Resampling filter.
    #[arg(long, env = "IMGCRAWL_FILTER", value_enum, default_value = "catmull-rom")]
    filter: FilterArg,

    /// JPEG quality (1–100).
    #[arg(long, env = "IMGCRAWL_JPEG_QUALITY", default_value_t = 75,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Image URL regex; capture group 1 is host + path.
    #[arg(long, env = "IMGCRAWL_PATTERN", default_value = imgcrawl::config::DEFAULT_IMAGE_PATTERN)]
    pattern: String,

    /// Scheme prefixed to extracted URLs.
    #[arg(long, env = "IMGCRAWL_SCHEME", default_value = "https")]
    scheme: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "IMGCRAWL_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Output the run report as JSON on stdout.
    #[arg(long, env = "IMGCRAWL_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "IMGCRAWL_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMGCRAWL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMGCRAWL_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum FilterArg {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<FilterArg> for ResizeFilter {
    fn from(v: FilterArg) -> Self {
        match v {
            FilterArg::Nearest => ResizeFilter::Nearest,
            FilterArg::Triangle => ResizeFilter::Triangle,
            FilterArg::CatmullRom => ResizeFilter::CatmullRom,
            FilterArg::Gaussian => ResizeFilter::Gaussian,
            FilterArg::Lanczos3 => ResizeFilter::Lanczos3,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let started = Instant::now();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose mode always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Ctrl-C → cancel in-flight work ───────────────────────────────────
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{} interrupted, cancelling…", red("✘"));
                cancel.cancel();
            }
        });
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let report = run_with_cancel(&config, cancel)
        .await
        .context("Run failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        if !show_progress {
            eprintln!("[+] Found {} images.", report.crawl.images_found);
            eprintln!("[+] Processed all {} images.", report.download.images);
        }
        eprintln!(
            "   {} pages ok / {} skipped / {} failed  —  {} written / {} skipped / {} failed  →  {}",
            report.crawl.pages_ok,
            report.crawl.pages_skipped,
            report.crawl.pages_failed,
            report.written(),
            report.download.skipped,
            report.download.failed,
            bold(&report.output_dir.display().to_string()),
        );
        eprintln!(
            "\n[+] Script executed in {} seconds.",
            dim(&format!("{:.2}", started.elapsed().as_secs_f64()))
        );
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let pages = if cli.pages.is_empty() {
        PageSource::range(cli.template.clone(), cli.start, cli.end)
    } else {
        PageSource::list(cli.pages.iter().cloned())
    };

    let mut builder = PipelineConfig::builder()
        .pages(pages)
        .output_dir(cli.output.clone())
        .crawl_concurrency(cli.crawl_concurrency)
        .download_concurrency(cli.concurrency)
        .target_size(cli.width, cli.height)
        .filter(cli.filter.clone().into())
        .jpeg_quality(cli.jpeg_quality)
        .image_pattern(cli.pattern.clone())
        .image_scheme(cli.scheme.clone())
        .request_timeout_secs(cli.timeout);

    if let Some(workers) = cli.workers {
        builder = builder.transform_workers(workers);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
