//! Adaptive image compression: fit user-supplied photos within a hard byte
//! budget and maximum pixel dimensions while keeping quality as high as the
//! budget allows.
//!
//! The pipeline is decode → downscale (never upscale) → alpha flatten →
//! quality descent. The descent re-encodes as JPEG at decreasing quality —
//! coarse steps above 50%, fine steps below — until the output fits or the
//! quality floor is hit, so the iteration count is bounded regardless of
//! image content.
//!
//! # Example
//!
//! ```no_run
//! use photofit::ImageCompressor;
//!
//! let raw_bytes = std::fs::read("photo.jpg").unwrap();
//! let result = ImageCompressor::new(raw_bytes)
//!     .unwrap()
//!     .max_bytes(3 * 1024 * 1024)
//!     .max_dimensions(1280, 720)
//!     .compress()
//!     .unwrap();
//! println!(
//!     "Compressed to {} bytes at quality {:.2} ({:.0}% of original)",
//!     result.size(),
//!     result.quality,
//!     result.compression_ratio() * 100.0
//! );
//! ```
#![warn(missing_docs)]

mod compress;
mod error;
mod search;

pub use error::{CompressionError, DecodeError};

/// Size and quality limits for one compression request.
///
/// Immutable configuration, supplied once per call. The defaults mirror a
/// typical photo-upload form: 3 MiB budget, 1280×720 bounds, quality search
/// from 0.7 down to 0.1 in 0.2/0.1 steps.
#[derive(Debug, Clone)]
pub struct CompressionBudget {
    /// Hard byte-size ceiling for the encoded output (> 0).
    pub max_bytes: usize,

    /// Maximum output width in pixels (> 0).
    pub max_width: u32,

    /// Maximum output height in pixels (> 0).
    pub max_height: u32,

    /// Quality the search starts from, in (0, 1].
    pub initial_quality: f32,

    /// Quality the search will not go below, in [0, initial_quality).
    pub min_quality: f32,

    /// Step size while quality is at or above 0.5 (> 0).
    pub quality_step_large: f32,

    /// Step size while quality is below 0.5 (> 0).
    pub quality_step_small: f32,
}

impl Default for CompressionBudget {
    fn default() -> Self {
        Self {
            max_bytes: 3 * 1024 * 1024,
            max_width: 1280,
            max_height: 720,
            initial_quality: 0.7,
            min_quality: 0.1,
            quality_step_large: 0.2,
            quality_step_small: 0.1,
        }
    }
}

impl CompressionBudget {
    /// Whether an input of `size_bytes` is worth compressing at all.
    ///
    /// Inputs already at or under the byte budget can be passed through
    /// unmodified by the caller; the pipeline accepts them either way.
    pub fn needs_compression(&self, size_bytes: usize) -> bool {
        size_bytes > self.max_bytes
    }

    fn validate(&self) -> Result<(), CompressionError> {
        if self.max_bytes == 0 {
            return Err(CompressionError::InvalidBudget("max_bytes must be > 0"));
        }
        if self.max_width == 0 || self.max_height == 0 {
            return Err(CompressionError::InvalidBudget(
                "max_width and max_height must be > 0",
            ));
        }
        if !(self.initial_quality > 0.0 && self.initial_quality <= 1.0) {
            return Err(CompressionError::InvalidQuality(self.initial_quality));
        }
        if !(self.min_quality >= 0.0 && self.min_quality < self.initial_quality) {
            return Err(CompressionError::InvalidQuality(self.min_quality));
        }
        if self.quality_step_large <= 0.0 || self.quality_step_small <= 0.0 {
            return Err(CompressionError::InvalidBudget(
                "quality steps must be > 0",
            ));
        }
        Ok(())
    }
}

/// Result of a successful compression.
#[derive(Debug, Clone)]
pub struct CompressedImage {
    /// The encoded JPEG bytes, guaranteed within the byte budget.
    pub data: Vec<u8>,

    /// The quality the search settled on (0.0–1.0).
    pub quality: f32,

    /// Width of the output image in pixels.
    pub width: u32,

    /// Height of the output image in pixels.
    pub height: u32,

    /// Size of the original input in bytes, before any transformation.
    pub original_size: usize,
}

impl CompressedImage {
    /// Size of the encoded output in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Output size as a fraction of the input size.
    pub fn compression_ratio(&self) -> f64 {
        self.data.len() as f64 / self.original_size as f64
    }
}

/// Builder for compressing an image within a [`CompressionBudget`].
///
/// Decoding is validated up front (format sniffing), then `compress` runs the
/// full pipeline. Each call operates only on its own buffers, so compressors
/// may run concurrently from independent threads or tasks.
pub struct ImageCompressor {
    input: Vec<u8>,
    budget: CompressionBudget,
}

impl ImageCompressor {
    /// Create a compressor from raw image bytes (JPEG, PNG, WebP, ...).
    ///
    /// Fails with [`DecodeError::UnsupportedFormat`] if the byte signature is
    /// not a recognized raster format.
    pub fn new(input: Vec<u8>) -> Result<Self, CompressionError> {
        compress::sniff_format(&input)?;

        Ok(Self {
            input,
            budget: CompressionBudget::default(),
        })
    }

    /// Replace the whole budget configuration.
    pub fn budget(mut self, budget: CompressionBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Set the byte-size ceiling (default: 3 MiB).
    pub fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.budget.max_bytes = max_bytes;
        self
    }

    /// Set the maximum output dimensions in pixels (default: 1280×720).
    pub fn max_dimensions(mut self, max_width: u32, max_height: u32) -> Self {
        self.budget.max_width = max_width;
        self.budget.max_height = max_height;
        self
    }

    /// Set the quality the search starts from (default: 0.7).
    pub fn initial_quality(mut self, quality: f32) -> Self {
        self.budget.initial_quality = quality;
        self
    }

    /// Set the quality floor the search will not go below (default: 0.1).
    pub fn min_quality(mut self, quality: f32) -> Self {
        self.budget.min_quality = quality;
        self
    }

    /// Run the pipeline: decode, downscale, flatten, quality descent.
    ///
    /// Exactly one resize pass is performed; if the quality search alone
    /// cannot reach the budget the call fails with
    /// [`CompressionError::BudgetUnreachable`] and re-invoking with smaller
    /// dimensions is the caller's decision.
    pub fn compress(self) -> Result<CompressedImage, CompressionError> {
        self.budget.validate()?;

        let original_size = self.input.len();
        let decoded = compress::decode_image(&self.input)?;
        let resized =
            compress::resize_to_fit(decoded, self.budget.max_width, self.budget.max_height);
        let rgb = compress::flatten_alpha(&resized);
        let outcome = search::fit_to_budget(&rgb, &self.budget)?;

        Ok(CompressedImage {
            data: outcome.data,
            quality: outcome.quality as f32 / 100.0,
            width: rgb.width(),
            height: rgb.height(),
            original_size,
        })
    }
}
