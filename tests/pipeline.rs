//! Integration tests for imgcrawl.
//!
//! Every test runs against a local `mockito` server, so no network access is
//! needed. Output goes to a `tempfile` directory per test.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use imgcrawl::pipeline::fetch::{image_client, page_client};
use imgcrawl::{
    run, run_with_cancel, CancellationToken, Crawler, Downloader, FetchError, FetchOutcome,
    ImageStore, ImageTransformer, ImageUrl, ImageUrlExtractor, ImgCrawlError, ItemError,
    PageFetcher, PageSource, PageUrl, PipelineConfig, TransformPool,
};
use mockito::{Server, ServerGuard};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route pipeline logs through the test harness; `RUST_LOG=imgcrawl=debug`
/// shows them with `--nocapture`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn jpeg_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(w, h, |x, y| Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 90]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .expect("encode test jpeg");
    buf
}

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(w, h, Rgb([10, 200, 30]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode test png");
    buf
}

/// A gallery page that embeds each `path` as a scheme-relative CSS background.
fn gallery_page(host: &str, paths: &[&str]) -> String {
    let mut html = String::from("<html><body>\n");
    for p in paths {
        html.push_str(&format!(
            "<div class=\"photo\" style=\"background-image: url(//{host}/{p})\"></div>\n"
        ));
    }
    html.push_str("<a href=\"/page2\">next</a></body></html>");
    html
}

fn test_config() -> PipelineConfig {
    PipelineConfig::builder()
        .request_timeout_secs(5)
        .transform_workers(2)
        .build()
        .expect("valid config")
}

fn crawler(config: &PipelineConfig) -> Crawler {
    let fetcher = PageFetcher::new(page_client(config).expect("client"), 5);
    Crawler::new(fetcher, ImageUrlExtractor::default(), 8)
}

fn downloader(config: &PipelineConfig, out: &Path) -> Downloader {
    let pool = Arc::new(TransformPool::new(2, ImageTransformer::default()).expect("pool"));
    Downloader::new(
        image_client(config).expect("client"),
        pool,
        ImageStore::new(out),
        8,
        5,
    )
}

/// Extraction pattern that matches images served by the mock server.
fn local_pattern(server: &ServerGuard) -> String {
    format!(
        r"url\(//({}/[^)\s]+?\.(?:jpg|png))\)",
        regex::escape(&server.host_with_port())
    )
}

fn assert_thumbnail(path: &Path) {
    let bytes = std::fs::read(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()));
    let img = image::load_from_memory(&bytes).expect("written file decodes");
    assert_eq!(img.dimensions(), (120, 120), "{}", path.display());
    assert_eq!(img.color(), image::ColorType::L8, "{}", path.display());
}

// ── PageFetcher ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetcher_returns_body_on_200() {
    init_tracing();
    let mut server = Server::new_async().await;
    let _page = server
        .mock("GET", "/page1")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body("<html>hello</html>")
        .create_async()
        .await;

    let fetcher = PageFetcher::new(page_client(&test_config()).unwrap(), 5);
    let body = fetcher
        .fetch_text(&PageUrl::new(format!("{}/page1", server.url())))
        .await
        .expect("fetch ok");
    assert_eq!(body, "<html>hello</html>");
}

#[tokio::test]
async fn fetcher_treats_404_as_empty_content() {
    init_tracing();
    let mut server = Server::new_async().await;
    let _missing = server
        .mock("GET", "/page7")
        .with_status(404)
        .with_body("Not Found")
        .create_async()
        .await;

    let fetcher = PageFetcher::new(page_client(&test_config()).unwrap(), 5);
    let url = PageUrl::new(format!("{}/page7", server.url()));

    assert_eq!(fetcher.fetch_text(&url).await.expect("not an error"), "");
    assert_eq!(fetcher.fetch(&url).await.unwrap(), FetchOutcome::Status(404));
}

#[tokio::test]
async fn fetcher_does_not_follow_redirects() {
    init_tracing();
    let mut server = Server::new_async().await;
    let _redirect = server
        .mock("GET", "/page100")
        .with_status(301)
        .with_header("location", "/page1")
        .create_async()
        .await;
    let target = server
        .mock("GET", "/page1")
        .with_status(200)
        .with_body("should not be fetched")
        .expect(0)
        .create_async()
        .await;

    let fetcher = PageFetcher::new(page_client(&test_config()).unwrap(), 5);
    let url = PageUrl::new(format!("{}/page100", server.url()));

    assert_eq!(fetcher.fetch(&url).await.unwrap(), FetchOutcome::Status(301));
    assert_eq!(fetcher.fetch_text(&url).await.unwrap(), "");
    target.assert_async().await;
}

#[tokio::test]
async fn fetcher_reports_transport_failure() {
    init_tracing();
    let fetcher = PageFetcher::new(page_client(&test_config()).unwrap(), 5);
    // Port 1 is reserved and closed on any sane test host.
    let err = fetcher
        .fetch(&PageUrl::new("http://127.0.0.1:1/page1"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }), "got: {err:?}");
}

// ── Crawler ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn discover_unions_and_deduplicates() {
    init_tracing();
    let mut server = Server::new_async().await;
    let flickr = "live.staticflickr.com";
    let _a = server
        .mock("GET", "/page1")
        .with_status(200)
        .with_body(gallery_page(flickr, &["1/x.jpg", "1/y.jpg"]))
        .create_async()
        .await;
    let _b = server
        .mock("GET", "/page2")
        .with_status(200)
        .with_body(gallery_page(flickr, &["1/y.jpg", "1/z.jpg"]))
        .create_async()
        .await;

    let config = test_config();
    let pages = PageSource::range(format!("{}/page{{n}}", server.url()), 1, 2).to_urls();
    let report = crawler(&config).discover(&pages).await.expect("discover");

    let expected: HashSet<ImageUrl> = ["x", "y", "z"]
        .iter()
        .map(|n| ImageUrl::new(format!("https://live.staticflickr.com/1/{n}.jpg")))
        .collect();
    assert_eq!(report.images, expected);
    assert_eq!(report.stats.images_found, 3);
    assert_eq!(report.stats.pages_ok, 2);
}

#[tokio::test]
async fn discover_tolerates_missing_and_failing_pages() {
    init_tracing();
    let mut server = Server::new_async().await;
    let _ok = server
        .mock("GET", "/page1")
        .with_status(200)
        .with_body(gallery_page("live.staticflickr.com", &["9/only.jpg"]))
        .create_async()
        .await;
    let _gone = server
        .mock("GET", "/page2")
        .with_status(404)
        .create_async()
        .await;
    let _moved = server
        .mock("GET", "/page3")
        .with_status(302)
        .with_header("location", "/page1")
        .create_async()
        .await;

    let config = test_config();
    let pages = vec![
        PageUrl::new(format!("{}/page1", server.url())),
        PageUrl::new(format!("{}/page2", server.url())),
        PageUrl::new(format!("{}/page3", server.url())),
        PageUrl::new("http://127.0.0.1:1/page4"),
    ];
    let report = crawler(&config).discover(&pages).await.expect("discover");

    assert_eq!(report.images.len(), 1);
    assert_eq!(report.stats.pages, 4);
    assert_eq!(report.stats.pages_ok, 1);
    assert_eq!(report.stats.pages_skipped, 2);
    assert_eq!(report.stats.pages_failed, 1);
    assert_eq!(report.failures.len(), 1);
}

#[tokio::test]
async fn discover_of_no_pages_is_empty() {
    init_tracing();
    let report = crawler(&test_config()).discover(&[]).await.unwrap();
    assert!(report.images.is_empty());
    assert_eq!(report.stats.pages, 0);
}

// ── Downloader ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn download_isolates_failures() {
    init_tracing();
    let mut server = Server::new_async().await;
    let _good1 = server
        .mock("GET", "/img/good1.jpg")
        .with_status(200)
        .with_body(jpeg_bytes(320, 240))
        .create_async()
        .await;
    let _good2 = server
        .mock("GET", "/img/good2.png")
        .with_status(200)
        .with_body(png_bytes(50, 500))
        .create_async()
        .await;
    let _bad = server
        .mock("GET", "/img/bad.jpg")
        .with_status(200)
        .with_body("<html>this is not a jpeg</html>")
        .create_async()
        .await;
    let _gone = server
        .mock("GET", "/img/gone.jpg")
        .with_status(404)
        .create_async()
        .await;

    let out = tempfile::tempdir().unwrap();
    let urls: HashSet<ImageUrl> = ["good1.jpg", "good2.png", "bad.jpg", "gone.jpg"]
        .iter()
        .map(|n| ImageUrl::new(format!("{}/img/{n}", server.url())))
        .collect();

    let report = downloader(&test_config(), out.path())
        .download_all(&urls)
        .await
        .expect("download_all completes");

    assert_eq!(report.stats.images, 4);
    assert_eq!(report.stats.written, 2);
    assert_eq!(report.stats.skipped, 1);
    assert_eq!(report.stats.failed, 1);
    assert!(matches!(report.failures[0], ItemError::Decode { .. }));

    assert_thumbnail(&out.path().join("good1.jpg"));
    assert_thumbnail(&out.path().join("good2.png"));
    assert!(!out.path().join("bad.jpg").exists());
    assert!(!out.path().join("gone.jpg").exists());
}

#[tokio::test]
async fn download_records_fetch_failure() {
    init_tracing();
    let out = tempfile::tempdir().unwrap();
    let urls: HashSet<ImageUrl> = [ImageUrl::from("http://127.0.0.1:1/img/a.jpg")]
        .into_iter()
        .collect();

    let report = downloader(&test_config(), out.path())
        .download_all(&urls)
        .await
        .unwrap();

    assert_eq!(report.stats.failed, 1);
    assert!(matches!(report.failures[0], ItemError::Fetch(_)));
}

#[tokio::test]
async fn filenames_are_stable_across_runs() {
    init_tracing();
    let mut server = Server::new_async().await;
    let _img = server
        .mock("GET", "/65535/photo_b.jpg")
        .with_status(200)
        .with_body(jpeg_bytes(90, 60))
        .expect(2)
        .create_async()
        .await;

    let urls: HashSet<ImageUrl> = [ImageUrl::new(format!("{}/65535/photo_b.jpg", server.url()))]
        .into_iter()
        .collect();
    let config = test_config();

    let mut names = Vec::new();
    for _ in 0..2 {
        let out = tempfile::tempdir().unwrap();
        let report = downloader(&config, out.path()).download_all(&urls).await.unwrap();
        assert_eq!(report.written.len(), 1);
        names.push(report.written[0].file_name().unwrap().to_os_string());
    }
    assert_eq!(names[0], names[1]);
    assert_eq!(names[0], "photo_b.jpg");
}

#[tokio::test]
async fn download_cancel_stops_hung_fetches() {
    init_tracing();
    // Accepts connections and never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hold = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((sock, _)) = listener.accept().await {
            open.push(sock);
        }
    });

    let out = tempfile::tempdir().unwrap();
    let urls: HashSet<ImageUrl> = ["a.jpg", "b.jpg"]
        .iter()
        .map(|f| ImageUrl::new(format!("http://{addr}/img/{f}")))
        .collect();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = downloader(&test_config(), out.path())
        .download_all_with_cancel(&urls, &cancel)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ImgCrawlError::Cancelled { phase: "download" }),
        "got: {err:?}"
    );
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    hold.abort();
}

// ── Full pipeline ────────────────────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_two_pages_two_images() {
    init_tracing();
    let mut server = Server::new_async().await;
    let host = server.host_with_port();

    let _p1 = server
        .mock("GET", "/photos/page1")
        .with_status(200)
        .with_body(gallery_page(&host, &["c/1/a.jpg"]))
        .create_async()
        .await;
    let _p2 = server
        .mock("GET", "/photos/page2")
        .with_status(200)
        .with_body(gallery_page(&host, &["c/2/b.jpg"]))
        .create_async()
        .await;
    let _a = server
        .mock("GET", "/c/1/a.jpg")
        .with_status(200)
        .with_body(jpeg_bytes(500, 375))
        .create_async()
        .await;
    let _b = server
        .mock("GET", "/c/2/b.jpg")
        .with_status(200)
        .with_body(jpeg_bytes(240, 320))
        .create_async()
        .await;

    let out = tempfile::tempdir().unwrap();
    let config = PipelineConfig::builder()
        .pages(PageSource::range(format!("{}/photos/page{{n}}", server.url()), 1, 2))
        .image_pattern(local_pattern(&server))
        .image_scheme("http")
        .output_dir(out.path().join("images"))
        .transform_workers(2)
        .request_timeout_secs(5)
        .build()
        .unwrap();

    let report = run(&config).await.expect("run completes");

    assert_eq!(report.crawl.images_found, 2);
    assert_eq!(report.download.written, 2);
    assert!(report.failures.is_empty(), "{:?}", report.failures);

    let mut files: Vec<String> = std::fs::read_dir(out.path().join("images"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    files.sort();
    assert_eq!(files, vec!["a.jpg", "b.jpg"]);
    for f in &files {
        assert_thumbnail(&out.path().join("images").join(f));
    }
}

#[tokio::test]
async fn run_rejects_invalid_pattern_before_crawling() {
    init_tracing();
    let out = tempfile::tempdir().unwrap();
    let config = PipelineConfig::builder()
        .pages(PageSource::list(["http://127.0.0.1:1/page1"]))
        .image_pattern(r"url\((")
        .output_dir(out.path())
        .build()
        .unwrap();

    let err = run(&config).await.unwrap_err();
    assert!(matches!(err, ImgCrawlError::InvalidPattern { .. }), "got: {err:?}");
}

#[tokio::test]
async fn cancelled_run_stops_in_crawl_phase() {
    init_tracing();
    let out = tempfile::tempdir().unwrap();
    let config = PipelineConfig::builder()
        .pages(PageSource::list(["http://127.0.0.1:1/page1", "http://127.0.0.1:1/page2"]))
        .output_dir(out.path())
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = run_with_cancel(&config, cancel).await.unwrap_err();
    assert!(
        matches!(err, ImgCrawlError::Cancelled { phase: "crawl" }),
        "got: {err:?}"
    );
}
