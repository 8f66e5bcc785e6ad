//! Pure Rust image backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Format sniffing | `image::ImageReader::with_guessed_format` (magic bytes, then extension) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Decode (AVIF) | [`avif_decode`](super::avif_decode): `avif-parse` + `rav1d` |
//! | EXIF orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e) |

use super::avif_decode;
use super::backend::{BackendError, Dimensions, ImageBackend, LoadedImage};
use super::params::EncodeParams;
use image::codecs::avif::AvifEncoder;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn has_avif_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("avif"))
}

fn decode_error(path: &Path, err: impl std::fmt::Display) -> BackendError {
    BackendError::DecodeFailed(format!("Failed to decode {}: {}", path.display(), err))
}

/// Decode any supported raster file and apply its EXIF orientation.
fn load_oriented(path: &Path) -> Result<LoadedImage, BackendError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;

    let sniffed_avif = match reader.format() {
        Some(format) => format == ImageFormat::Avif,
        None => has_avif_extension(path),
    };
    if sniffed_avif {
        let pixels = avif_decode::decode(path)?;
        let source = Dimensions {
            width: pixels.width(),
            height: pixels.height(),
        };
        return Ok(LoadedImage { pixels, source });
    }

    let mut decoder = reader.into_decoder().map_err(|e| decode_error(path, e))?;
    // Unreadable EXIF is treated the same as missing EXIF.
    let orientation = decoder
        .orientation()
        .unwrap_or(Orientation::NoTransforms);
    let (width, height) = decoder.dimensions();

    let mut pixels = DynamicImage::from_decoder(decoder).map_err(|e| decode_error(path, e))?;
    pixels.apply_orientation(orientation);

    Ok(LoadedImage {
        pixels,
        source: Dimensions { width, height },
    })
}

/// Encode as AVIF, removing the partial file if anything fails.
fn save_avif(image: &DynamicImage, params: &EncodeParams) -> Result<(), BackendError> {
    let result = write_avif_file(image, params);
    if result.is_err() {
        let _ = std::fs::remove_file(&params.output);
    }
    result
}

fn write_avif_file(image: &DynamicImage, params: &EncodeParams) -> Result<(), BackendError> {
    // rav1e only takes 8-bit RGB(A); wider or grey buffers are converted first.
    let normalized = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };

    let file = std::fs::File::create(&params.output)?;
    let mut writer = BufWriter::new(file);
    let encoder = AvifEncoder::new_with_speed_quality(
        &mut writer,
        params.speed.value(),
        params.quality.value(),
    );
    normalized
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::EncodeFailed(format!("AVIF encode failed: {}", e)))?;
    writer.flush()?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn load(&self, path: &Path) -> Result<LoadedImage, BackendError> {
        load_oriented(path)
    }

    fn encode_avif(
        &self,
        image: &DynamicImage,
        params: &EncodeParams,
    ) -> Result<(), BackendError> {
        save_avif(image, params)
    }

    fn can_encode_avif(&self) -> bool {
        ImageFormat::Avif.writing_enabled()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::{Quality, Speed};
    use image::{ImageEncoder, RgbImage};

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        })
    }

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = gradient(width, height);
        let mut bytes = Vec::new();
        image::codecs::jpeg::JpegEncoder::new(&mut bytes)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        bytes
    }

    /// Write a small valid JPEG file with the given dimensions.
    pub fn write_jpeg(path: &Path, width: u32, height: u32) {
        std::fs::write(path, jpeg_bytes(width, height)).unwrap();
    }

    /// Write a JPEG carrying an EXIF APP1 segment with the given orientation tag.
    pub fn write_jpeg_with_orientation(path: &Path, width: u32, height: u32, orientation: u16) {
        let mut payload = b"Exif\0\0".to_vec();
        // Little-endian TIFF header, IFD0 at offset 8.
        payload.extend_from_slice(&[0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00]);
        payload.extend_from_slice(&1u16.to_le_bytes());
        // Tag 0x0112 (Orientation), type SHORT, count 1.
        payload.extend_from_slice(&[0x12, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00]);
        payload.extend_from_slice(&orientation.to_le_bytes());
        payload.extend_from_slice(&[0x00, 0x00]);
        payload.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let jpeg = jpeg_bytes(width, height);
        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        std::fs::write(path, out).unwrap();
    }

    /// Write PNG bytes regardless of the file extension.
    pub fn write_png(path: &Path, width: u32, height: u32) {
        gradient(width, height)
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    /// Write a small valid AVIF file through the production encoder.
    pub fn write_avif(path: &Path, width: u32, height: u32) {
        let image = DynamicImage::ImageRgb8(gradient(width, height));
        save_avif(
            &image,
            &EncodeParams {
                output: path.to_path_buf(),
                quality: Quality::new(85).unwrap(),
                speed: Speed::new(10).unwrap(),
            },
        )
        .unwrap();
    }

    #[test]
    fn load_jpeg_reports_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        write_jpeg(&path, 200, 150);

        let loaded = RustBackend::new().load(&path).unwrap();
        assert_eq!(
            loaded.source,
            Dimensions {
                width: 200,
                height: 150
            }
        );
        assert_eq!((loaded.pixels.width(), loaded.pixels.height()), (200, 150));
    }

    #[test]
    fn load_applies_exif_rotation_but_keeps_source_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("rotated.jpg");
        // 6 = rotate 90° clockwise
        write_jpeg_with_orientation(&path, 40, 20, 6);

        let loaded = RustBackend::new().load(&path).unwrap();
        assert_eq!(
            loaded.source,
            Dimensions {
                width: 40,
                height: 20
            }
        );
        assert_eq!((loaded.pixels.width(), loaded.pixels.height()), (20, 40));
    }

    #[test]
    fn load_sniffs_format_from_content() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("actually-a-png.jpg");
        write_png(&path, 30, 10);

        let loaded = RustBackend::new().load(&path).unwrap();
        assert_eq!(loaded.source.width, 30);
    }

    #[test]
    fn load_avif_input() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("photo.avif");
        write_avif(&path, 64, 48);

        let loaded = RustBackend::new().load(&path).unwrap();
        assert_eq!((loaded.source.width, loaded.source.height), (64, 48));
    }

    #[test]
    fn load_nonexistent_file_errors() {
        let result = RustBackend::new().load(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn load_garbage_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"not an image at all").unwrap();

        assert!(RustBackend::new().load(&path).is_err());
    }

    #[test]
    fn encode_writes_avif_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("out.avif");

        RustBackend::new()
            .encode_avif(
                &DynamicImage::ImageRgb8(gradient(32, 24)),
                &EncodeParams {
                    output: output.clone(),
                    quality: Quality::new(50).unwrap(),
                    speed: Speed::new(10).unwrap(),
                },
            )
            .unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(&bytes[4..12], b"ftypavif");
    }

    #[test]
    fn encode_into_missing_directory_fails_cleanly() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("missing/out.avif");

        let result = RustBackend::new().encode_avif(
            &DynamicImage::new_rgb8(4, 4),
            &EncodeParams {
                output: output.clone(),
                quality: Quality::default(),
                speed: Speed::default(),
            },
        );
        assert!(matches!(result, Err(BackendError::Io(_))));
        assert!(!output.exists());
    }

    #[test]
    fn avif_encoding_is_compiled_in() {
        assert!(RustBackend::new().can_encode_avif());
    }
}
