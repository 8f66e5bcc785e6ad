//! Image backend trait and shared types.
//!
//! The [`ImageBackend`] trait covers the three things the converter needs
//! from an image library: decode a file into upright pixels, encode pixels to
//! AVIF, and report whether AVIF encoding is available at all.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the
//! [`MockBackend`](tests::MockBackend) below, which records every call.

use super::params::EncodeParams;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    DecodeFailed(String),
    #[error("Encode failed: {0}")]
    EncodeFailed(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A decoded image with EXIF orientation already applied.
///
/// `source` holds the dimensions as stored in the file, before any
/// rotation, so a 90° rotated photo reports its on-disk width and height.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub pixels: DynamicImage,
    pub source: Dimensions,
}

pub trait ImageBackend {
    /// Decode `path` and bake its orientation into the pixel data.
    fn load(&self, path: &Path) -> Result<LoadedImage, BackendError>;

    /// Encode `image` as AVIF and write it to `params.output`, replacing any existing file.
    fn encode_avif(&self, image: &DynamicImage, params: &EncodeParams)
    -> Result<(), BackendError>;

    /// Whether this backend was built with a working AVIF encoder.
    fn can_encode_avif(&self) -> bool;
}
