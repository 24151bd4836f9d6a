//! Value types that flow between the pipeline stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A page to crawl. Built once by the orchestrator and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageUrl(String);

impl PageUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageUrl {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PageUrl {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A fully-qualified image URL discovered on some page.
///
/// Equality is plain string equality, so the same reference found on two
/// pages collapses to one entry in a `HashSet<ImageUrl>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageUrl(String);

impl ImageUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final non-empty path segment, used as the output file name.
    ///
    /// Query string and fragment are ignored so the name depends only on the
    /// path. Returns `None` when there is no usable segment (`.`/`..` included).
    pub fn file_name(&self) -> Option<String> {
        let last = match reqwest::Url::parse(&self.0) {
            Ok(parsed) => parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .map(str::to_string),
            Err(_) => {
                let path = self.0.split(['?', '#']).next().unwrap_or("");
                path.rsplit('/').next().map(str::to_string)
            }
        }?;

        if last.is_empty() || last == "." || last == ".." || last.contains('\\') {
            None
        } else {
            Some(last)
        }
    }
}

impl fmt::Display for ImageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageUrl {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Output of the transform step, ready to be written once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedImage {
    /// File name derived from the source URL.
    pub filename: String,
    /// Encoded 8-bit grayscale image.
    pub bytes: Vec<u8>,
}
