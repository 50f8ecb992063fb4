//! Decode, resize, and encode a single image.
//!
//! All functions here are blocking and CPU-bound. Async callers go through
//! [`crate::ResizeOrchestrator`], which runs them on the blocking pool.

use std::fmt;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::debug;

use crate::error::{ImageError, ImageResult};

/// JPEG quality used when none is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Largest width or height a resize may produce, requested or computed.
pub const MAX_DIMENSION: u32 = 10_000;

/// Requested output size. Zero in a dimension means "unconstrained".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Square box of side `side`.
    pub const fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Returns `true` if neither dimension is constrained, i.e. the original
    /// image should be served as-is.
    pub const fn is_unconstrained(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Largest size with the source aspect ratio that fits inside
/// `max_width` x `max_height`. A source that already fits is returned
/// unchanged; nothing is upscaled.
pub fn fit_dimensions(src_width: u32, src_height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if src_width <= max_width && src_height <= max_height {
        return (src_width, src_height);
    }

    let src_aspect = f64::from(src_width) / f64::from(src_height);
    let max_aspect = f64::from(max_width) / f64::from(max_height);

    if src_aspect > max_aspect {
        let height = (f64::from(max_width) / src_aspect).round() as u32;
        (max_width, height.max(1))
    } else {
        let width = (f64::from(max_height) * src_aspect).round() as u32;
        (width.max(1), max_height)
    }
}

/// Output dimensions for `target` applied to a `(width, height)` source.
///
/// - both constrained: [`fit_dimensions`]
/// - one constrained: that dimension exactly, the other proportional
/// - neither: the source size
pub fn resolve_dimensions(source: (u32, u32), target: TargetSize) -> (u32, u32) {
    let (src_width, src_height) = source;
    match (target.width, target.height) {
        (0, 0) => source,
        (width, 0) => (width, proportional(src_height, width, src_width)),
        (0, height) => (proportional(src_width, height, src_height), height),
        (width, height) => fit_dimensions(src_width, src_height, width, height),
    }
}

fn proportional(len: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = f64::from(len) * f64::from(numerator) / f64::from(denominator.max(1));
    (scaled.round() as u32).max(1)
}

/// Resize an already decoded image to `target` with a Lanczos3 filter.
///
/// A single-dimension target scales the other side freely, so the resolved
/// size is checked against [`MAX_DIMENSION`] before any pixel buffer is
/// allocated.
pub fn resize_image(image: DynamicImage, target: TargetSize) -> ImageResult<DynamicImage> {
    let source = image.dimensions();
    let (width, height) = resolve_dimensions(source, target);
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ImageError::OutputTooLarge { target, width, height });
    }
    if (width, height) == source {
        return Ok(image);
    }
    Ok(image.resize_exact(width, height, FilterType::Lanczos3))
}

/// Open and decode the file at `path`, then resize it to `target`.
///
/// Both dimensions zero means no resize was requested; callers serve the
/// original bytes instead and must not reach this function.
pub fn resize(path: &Path, target: TargetSize) -> ImageResult<DynamicImage> {
    if target.is_unconstrained() {
        return Err(ImageError::NoResizeRequested);
    }

    let decoded = image::open(path).map_err(|e| ImageError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let (src_width, src_height) = decoded.dimensions();
    let resized = resize_image(decoded, target)?;
    let (width, height) = resized.dimensions();
    debug!(
        path = %path.display(),
        src_width,
        src_height,
        %target,
        width,
        height,
        "image resized"
    );
    Ok(resized)
}

/// Encode as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder
        .encode_image(&rgb)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Check that `data` is a complete, decodable image and return its format.
pub fn probe(data: &[u8]) -> ImageResult<ImageFormat> {
    let format = image::guess_format(data).map_err(|e| ImageError::InvalidImage(e.to_string()))?;
    image::load_from_memory_with_format(data, format)
        .map_err(|e| ImageError::InvalidImage(e.to_string()))?;
    Ok(format)
}

/// MIME type sniffed from the image header.
pub fn mime_type(data: &[u8]) -> &'static str {
    image::guess_format(data)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}
