//! Image URL extraction from page markup.
//!
//! Galleries embed thumbnails as CSS backgrounds,
//! `style="background-image: url(//live.staticflickr.com/…/x_z.jpg)"`,
//! not as `<img src>`, so a regex over the raw text finds them where an HTML
//! parser would not. References are scheme-relative (`//host/path`); the
//! extractor drops the `//` and prefixes the configured scheme.

use crate::config::DEFAULT_IMAGE_PATTERN;
use crate::error::ImgCrawlError;
use crate::types::ImageUrl;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static RE_DEFAULT: Lazy<Regex> = Lazy::new(|| Regex::new(DEFAULT_IMAGE_PATTERN).unwrap());

/// Pure text → set-of-URLs extractor.
#[derive(Debug, Clone)]
pub struct ImageUrlExtractor {
    re: Regex,
    scheme: String,
}

impl Default for ImageUrlExtractor {
    fn default() -> Self {
        Self {
            re: RE_DEFAULT.clone(),
            scheme: "https".to_string(),
        }
    }
}

impl ImageUrlExtractor {
    /// Compile `pattern`; its first capture group must hold the host + path.
    pub fn new(pattern: &str, scheme: impl Into<String>) -> Result<Self, ImgCrawlError> {
        let re = Regex::new(pattern).map_err(|e| ImgCrawlError::InvalidPattern {
            pattern: pattern.to_string(),
            detail: e.to_string(),
        })?;
        if re.captures_len() < 2 {
            return Err(ImgCrawlError::InvalidPattern {
                pattern: pattern.to_string(),
                detail: "pattern needs a capture group for the host and path".into(),
            });
        }
        Ok(Self {
            re,
            scheme: scheme.into(),
        })
    }

    /// All distinct image URLs referenced in `content`. Empty input → empty set.
    pub fn extract(&self, content: &str) -> HashSet<ImageUrl> {
        self.re
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|m| ImageUrl::new(format!("{}://{}", self.scheme, m.as_str())))
            .collect()
    }
}
