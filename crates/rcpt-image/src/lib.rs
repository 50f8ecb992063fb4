//! Image transform and concurrent resize orchestration for receipt images.
//!
//! [`transform`] is the leaf: decode a file, resize it to a target box with a
//! Lanczos filter, encode JPEG. [`orchestrator`] runs transforms on the
//! blocking pool, either one at a time (single-result mode) or as a tagged
//! batch whose outcomes arrive in completion order (fan-out mode).

pub mod error;
pub mod orchestrator;
pub mod transform;

pub use error::{ImageError, ImageResult};
pub use orchestrator::{ResizeOrchestrator, ResizeOutcome};
pub use transform::{
    encode_jpeg, fit_dimensions, mime_type, probe, resize, resize_image, resolve_dimensions,
    TargetSize, DEFAULT_JPEG_QUALITY, MAX_DIMENSION,
};

pub use image::{DynamicImage, GenericImageView, ImageFormat};
