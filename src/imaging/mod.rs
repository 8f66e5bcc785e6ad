//! Image decoding and AVIF encoding in pure Rust with no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image` decoders; AVIF via `avif-parse` + `rav1d` |
//! | **Orient** | EXIF orientation baked into pixels |
//! | **Encode → AVIF** | `image::codecs::avif::AvifEncoder` (rav1e) |
//!
//! The module is split into:
//! - **Parameters**: [`Quality`], [`Speed`], [`EncodeParams`]
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **AVIF decoding**: the rav1d bridge used for `.avif` inputs

mod avif_decode;
pub mod backend;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, LoadedImage};
pub use params::{EncodeParams, Quality, Speed};
pub use rust_backend::RustBackend;
