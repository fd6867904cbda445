use thiserror::Error;

/// Failure while parsing raw input bytes into a pixel buffer.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The byte signature does not match any supported raster format.
    #[error("unrecognized image format")]
    UnsupportedFormat,

    /// The data ends before the image is complete.
    #[error("image data is truncated")]
    Truncated,

    /// Recognized format, but the contents could not be parsed.
    #[error("failed to decode image: {0}")]
    Corrupt(String),
}

/// Error type returned by photofit operations.
#[derive(Debug, Error)]
pub enum CompressionError {
    /// The input could not be decoded; resize and search were not attempted.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The JPEG encoder rejected the pixel buffer.
    #[error("failed to encode image: {0}")]
    Encode(String),

    /// A quality value outside the valid 0.0–1.0 range.
    #[error("quality must be between 0.0 and 1.0, got {0}")]
    InvalidQuality(f32),

    /// A structurally invalid budget (zero sizes, non-positive steps).
    #[error("invalid compression budget: {0}")]
    InvalidBudget(&'static str),

    /// Even the minimum-quality encode exceeds the byte budget. The caller
    /// decides whether to prompt for a smaller image; the pipeline never
    /// silently returns an oversized result.
    #[error("cannot fit within {max_bytes} bytes: {achieved_bytes} bytes at quality {quality}")]
    BudgetUnreachable {
        /// The byte budget that could not be met.
        max_bytes: usize,
        /// Size of the smallest encode produced.
        achieved_bytes: usize,
        /// The quality floor the search bottomed out at.
        quality: f32,
    },
}
