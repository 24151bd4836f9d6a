//! Error types for the imgcrawl library.
//!
//! Two tiers mirror the two ways a run can go wrong:
//!
//! * [`ImgCrawlError`] — **Fatal**: the run cannot proceed at all (the shared
//!   HTTP client or the worker pool could not be built, the output directory
//!   is unusable, the configuration is invalid, or the run was cancelled).
//!   Returned as `Err(ImgCrawlError)` from [`crate::run::run`] and friends.
//!
//! * [`ItemError`] — **Non-fatal**: one page or one image failed. Recorded in
//!   [`crate::output::CrawlReport`] / [`crate::output::DownloadReport`] and
//!   logged, while every sibling task carries on.
//!
//! A non-200 status is neither: it is ordinary crawl traffic and is modelled
//! as [`crate::pipeline::fetch::FetchOutcome::Status`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the imgcrawl library.
#[derive(Debug, Error)]
pub enum ImgCrawlError {
    // ── Startup errors ────────────────────────────────────────────────────
    /// The shared `reqwest::Client` for a phase could not be constructed.
    #[error("Failed to build HTTP client: {reason}")]
    ClientBuild { reason: String },

    /// The CPU worker pool could not be started.
    #[error("Failed to start transform worker pool: {reason}")]
    WorkerPool { reason: String },

    /// The output directory could not be created.
    #[error("Cannot create output directory '{path}': {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The image URL pattern does not compile or has no capture group.
    #[error("Invalid image URL pattern '{pattern}': {detail}")]
    InvalidPattern { pattern: String, detail: String },

    // ── Run control ───────────────────────────────────────────────────────
    /// The cancellation token fired while a phase was in flight.
    #[error("Run cancelled during {phase} phase")]
    Cancelled { phase: &'static str },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Transport-level failure of a single GET.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FetchError {
    /// The request exceeded the client timeout.
    #[error("{url}: timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// DNS, connect, TLS or body-read failure.
    #[error("{url}: {reason}")]
    Transport { url: String, reason: String },
}

impl FetchError {
    /// Classify a `reqwest` error for `url`.
    pub fn from_reqwest(url: &str, err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Timeout { url, .. } | FetchError::Transport { url, .. } => url,
        }
    }
}

/// Failure inside the CPU-bound transform step.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Bytes are not a recognised or valid image encoding.
    #[error("decode failed: {0}")]
    Decode(#[source] image::ImageError),

    /// The transformed image could not be re-encoded.
    #[error("encode failed: {0}")]
    Encode(#[source] image::ImageError),
}

/// A non-fatal error for a single page or image.
///
/// The task that hit it ends without output; siblings are unaffected.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The GET itself failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The downloaded body is not a decodable image.
    #[error("{url}: not a decodable image: {detail}")]
    Decode { url: String, detail: String },

    /// The transformed image could not be encoded for its extension.
    #[error("{url}: re-encode failed: {detail}")]
    Encode { url: String, detail: String },

    /// The final file could not be written.
    #[error("write to '{path}' failed: {detail}")]
    Write { path: PathBuf, detail: String },

    /// The URL has no usable final path segment to name the file after.
    #[error("{url}: no file name in URL path")]
    NoFilename { url: String },

    /// The worker running the transform panicked or the pool shut down.
    #[error("{url}: transform worker lost")]
    WorkerLost { url: String },
}

impl ItemError {
    pub(crate) fn from_transform(url: &str, err: TransformError) -> Self {
        match err {
            TransformError::Decode(e) => ItemError::Decode {
                url: url.to_string(),
                detail: e.to_string(),
            },
            TransformError::Encode(e) => ItemError::Encode {
                url: url.to_string(),
                detail: e.to_string(),
            },
        }
    }
}
