//! Image transform: decode → exact resize → grayscale → re-encode.
//!
//! ## Why a separate rayon pool?
//!
//! Decoding a 1 MB JPEG and resampling it takes tens of milliseconds of pure
//! CPU. Run on a tokio worker, that stalls every fetch future scheduled on the
//! same thread. [`TransformPool`] owns a fixed-size `rayon::ThreadPool`; a
//! download task hands its bytes over, then awaits a `oneshot` receiver, so it
//! suspends like any other I/O wait while the transform runs elsewhere.
//!
//! The pool is sized once, bounding CPU parallelism independently of how many
//! downloads are in flight. Jobs beyond the worker count wait in rayon's own
//! queue. Dropping the pool does not block: rayon lets queued jobs finish and
//! then stops its threads in the background. [`crate::run::run_with_cancel`]
//! awaits every submitted result before it drops the pool on success, so a
//! completed run leaves no queued job behind.

use crate::config::PipelineConfig;
use crate::error::{ImgCrawlError, ItemError, TransformError};
use crate::types::{ImageUrl, TransformedImage};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error};

/// Stateless, deterministic image transform.
#[derive(Debug, Clone, Copy)]
pub struct ImageTransformer {
    pub width: u32,
    pub height: u32,
    pub filter: FilterType,
    pub jpeg_quality: u8,
}

impl Default for ImageTransformer {
    fn default() -> Self {
        Self {
            width: 120,
            height: 120,
            filter: FilterType::CatmullRom,
            jpeg_quality: 75,
        }
    }
}

impl ImageTransformer {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            width: config.target_width,
            height: config.target_height,
            filter: config.filter.into(),
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Transform `bytes` and encode for `filename`'s extension.
    ///
    /// The output format follows the extension when the `image` crate knows
    /// it, otherwise the detected input format is kept. Aspect ratio is not
    /// preserved: the image is stretched to exactly `width × height`.
    pub fn transform(&self, bytes: &[u8], filename: &str) -> Result<Vec<u8>, TransformError> {
        let input_format = image::guess_format(bytes).map_err(TransformError::Decode)?;
        let img = image::load_from_memory_with_format(bytes, input_format)
            .map_err(TransformError::Decode)?;

        let gray = DynamicImage::ImageLuma8(
            img.resize_exact(self.width, self.height, self.filter).to_luma8(),
        );

        let format = ImageFormat::from_path(Path::new(filename))
            .ok()
            .filter(ImageFormat::writing_enabled)
            .unwrap_or(input_format);
        let out = self.encode(&gray, format)?;
        debug!(
            "Transformed {} ({:?} {}x{}) → {}x{} L8 {:?}, {} bytes",
            filename,
            input_format,
            img.width(),
            img.height(),
            self.width,
            self.height,
            format,
            out.len()
        );
        Ok(out)
    }

    fn encode(&self, img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, TransformError> {
        let mut buf = Vec::new();
        if format == ImageFormat::Jpeg {
            let encoder = JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality);
            img.write_with_encoder(encoder)
                .map_err(TransformError::Encode)?;
        } else {
            img.write_to(&mut Cursor::new(&mut buf), format)
                .map_err(TransformError::Encode)?;
        }
        Ok(buf)
    }
}

/// Fixed-size CPU pool that runs [`ImageTransformer::transform`] off the
/// tokio workers.
pub struct TransformPool {
    pool: rayon::ThreadPool,
    transformer: Arc<ImageTransformer>,
}

impl TransformPool {
    /// Start `workers` threads. Failing to spawn them is fatal for the run.
    pub fn new(workers: usize, transformer: ImageTransformer) -> Result<Self, ImgCrawlError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("imgcrawl-transform-{i}"))
            // Without a handler rayon aborts the process on a job panic.
            .panic_handler(|_| error!("Transform worker panicked; image abandoned"))
            .build()
            .map_err(|e| ImgCrawlError::WorkerPool {
                reason: e.to_string(),
            })?;

        Ok(Self {
            pool,
            transformer: Arc::new(transformer),
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, ImgCrawlError> {
        Self::new(config.transform_workers, ImageTransformer::from_config(config))
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue one transform and await its result without blocking the caller's
    /// tokio worker.
    pub async fn submit<B>(
        &self,
        url: &ImageUrl,
        bytes: B,
        filename: String,
    ) -> Result<TransformedImage, ItemError>
    where
        B: AsRef<[u8]> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let transformer = Arc::clone(&self.transformer);

        self.pool.spawn(move || {
            let result = transformer
                .transform(bytes.as_ref(), &filename)
                .map(|out| TransformedImage {
                    filename,
                    bytes: out,
                });
            // The receiver is gone only if the download task was cancelled.
            let _ = tx.send(result);
        });

        match rx.await {
            Ok(result) => result.map_err(|e| ItemError::from_transform(url.as_str(), e)),
            Err(_) => Err(ItemError::WorkerLost {
                url: url.to_string(),
            }),
        }
    }
}
