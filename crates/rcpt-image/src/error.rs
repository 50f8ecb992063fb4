use std::path::PathBuf;

use crate::transform::TargetSize;

/// Errors from image transform and resize orchestration.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The source file is unreadable or not a supported image.
    #[error("cannot decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Uploaded bytes are not a supported image.
    #[error("not a valid image: {0}")]
    InvalidImage(String),

    #[error("cannot encode image: {0}")]
    Encode(String),

    /// A transform was requested with both dimensions zero.
    #[error("no resize requested")]
    NoResizeRequested,

    /// The resolved output size exceeds the per-side limit.
    #[error("resize to {target} would produce {width}x{height}")]
    OutputTooLarge { target: TargetSize, width: u32, height: u32 },

    /// The worker did not finish before the request deadline.
    #[error("resize to {target} timed out")]
    Timeout { target: TargetSize },

    /// The worker task panicked or its result was lost.
    #[error("resize worker failed: {0}")]
    Worker(String),
}

/// Convenience alias used throughout the image crate.
pub type ImageResult<T> = Result<T, ImageError>;
