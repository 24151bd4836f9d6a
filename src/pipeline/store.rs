//! Output storage: one file per transformed image.
//!
//! Writes go to a uniquely named temporary sibling first and are then renamed
//! over the final name, so a crash or cancellation never leaves a truncated
//! image behind. Two source URLs with the same final path segment map to the
//! same file; whichever rename lands last wins.

use crate::error::{ImgCrawlError, ItemError};
use crate::types::{ImageUrl, TransformedImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[derive(Debug)]
pub struct ImageStore {
    dir: PathBuf,
    tmp_seq: AtomicU64,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tmp_seq: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory. Nothing can be written without it, so
    /// this failure is fatal.
    pub async fn prepare(&self) -> Result<(), ImgCrawlError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ImgCrawlError::OutputDir {
                path: self.dir.clone(),
                source: e,
            })
    }

    /// File name for `url`: its final path segment.
    pub fn filename_for(url: &ImageUrl) -> Result<String, ItemError> {
        url.file_name().ok_or_else(|| ItemError::NoFilename {
            url: url.to_string(),
        })
    }

    /// Final path `filename` is written to.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Write `image` whole under its file name and return the final path.
    pub async fn write(&self, image: &TransformedImage) -> Result<PathBuf, ItemError> {
        let path = self.path_for(&image.filename);
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        // Fixed-width name so a final name near NAME_MAX still has a temp.
        let tmp_path = self
            .dir
            .join(format!(".imgcrawl.{}.{}.part", std::process::id(), seq));

        let write_err = |e: std::io::Error| ItemError::Write {
            path: path.clone(),
            detail: e.to_string(),
        };

        if let Err(e) = tokio::fs::write(&tmp_path, &image.bytes).await {
            return Err(write_err(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(write_err(e));
        }

        debug!("Wrote {} ({} bytes)", path.display(), image.bytes.len());
        Ok(path)
    }
}
