//! HTTP fetching for both phases.
//!
//! Each phase builds one `reqwest::Client` at start, shares it across all of
//! its concurrent tasks (the client is internally reference-counted and
//! pools connections), and drops it when the phase ends.
//!
//! The page client never follows redirects: on a paginated gallery a 301/302
//! usually means "past the last page" and bounces back to page 1, which would
//! only re-discover the same images. The image client follows redirects
//! because CDNs routinely redirect to a regional edge.
//!
//! A non-200 status is not an error here. It comes back as
//! [`FetchOutcome::Status`] and the caller treats it as "no content".

use crate::config::PipelineConfig;
use crate::error::{FetchError, ImgCrawlError};
use crate::types::{ImageUrl, PageUrl};
use reqwest::{redirect, Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Result of a GET that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    /// Status was exactly 200; the full body.
    Body(T),
    /// Any other status, including redirects when they are not followed.
    Status(u16),
}

impl<T> FetchOutcome<T> {
    pub fn into_body(self) -> Option<T> {
        match self {
            FetchOutcome::Body(b) => Some(b),
            FetchOutcome::Status(_) => None,
        }
    }
}

/// Build the shared client for the crawl phase (no redirects).
pub fn page_client(config: &PipelineConfig) -> Result<Client, ImgCrawlError> {
    build_client(config, redirect::Policy::none())
}

/// Build the shared client for the download phase (default redirect policy).
pub fn image_client(config: &PipelineConfig) -> Result<Client, ImgCrawlError> {
    build_client(config, redirect::Policy::default())
}

fn build_client(config: &PipelineConfig, policy: redirect::Policy) -> Result<Client, ImgCrawlError> {
    Client::builder()
        .redirect(policy)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| ImgCrawlError::ClientBuild {
            reason: e.to_string(),
        })
}

/// Fetches page bodies as text.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    timeout_secs: u64,
}

impl PageFetcher {
    /// Wrap a client built by [`page_client`].
    pub fn new(client: Client, timeout_secs: u64) -> Self {
        Self {
            client,
            timeout_secs,
        }
    }

    /// GET `url`, distinguishing a 200 body from any other status.
    pub async fn fetch(&self, url: &PageUrl) -> Result<FetchOutcome<String>, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), &e, self.timeout_secs))?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!("{} → HTTP {}", url, status.as_u16());
            return Ok(FetchOutcome::Status(status.as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), &e, self.timeout_secs))?;
        debug!("{} → {} bytes", url, text.len());
        Ok(FetchOutcome::Body(text))
    }

    /// GET `url` and return its body, or an empty string for any non-200 status.
    pub async fn fetch_text(&self, url: &PageUrl) -> Result<String, FetchError> {
        Ok(self.fetch(url).await?.into_body().unwrap_or_default())
    }
}

/// GET an image and read the whole body when the status is 200.
pub async fn fetch_image(
    client: &Client,
    url: &ImageUrl,
    timeout_secs: u64,
) -> Result<FetchOutcome<Vec<u8>>, FetchError> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url.as_str(), &e, timeout_secs))?;

    let status = response.status();
    if status != StatusCode::OK {
        debug!("{} → HTTP {}", url, status.as_u16());
        return Ok(FetchOutcome::Status(status.as_u16()));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::from_reqwest(url.as_str(), &e, timeout_secs))?;
    debug!("{} → {} bytes", url, bytes.len());
    Ok(FetchOutcome::Body(bytes.to_vec()))
}
