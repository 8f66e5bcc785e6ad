//! # avif-compress
//!
//! Batch-converts a manifest of raster images to AVIF at a fixed quality and
//! records what happened to each entry in a JSON mapping report.
//!
//! # Pipeline
//!
//! ```text
//! image-files.json ─▶ manifest ─▶ (per entry) paths ─▶ convert ─▶ report ─▶ image-map.json
//! ```
//!
//! The run is strictly sequential. Every manifest entry yields exactly one
//! report record, in manifest order. Bad entries (no path, missing file,
//! undecodable image) are recorded as skipped and the run carries on; only
//! configuration and manifest problems abort a run, and they are detected
//! before any image is touched.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Layered settings (defaults → `avif-compress.toml` → CLI) resolved into [`config::RunConfig`] |
//! | [`manifest`] | Parses the manifest's two accepted shapes into [`manifest::ManifestEntry`] values |
//! | [`paths`] | Lexical input/output path resolution with escape, collision and duplicate guards |
//! | [`imaging`] | Decoding with EXIF orientation, AVIF encoding, behind the [`imaging::ImageBackend`] trait |
//! | [`convert`] | The per-entry pipeline and the fatal [`convert::RunError`] conditions |
//! | [`report`] | [`report::ResultRecord`] / [`report::MappingReport`] and their JSON form |
//! | [`output`] | Console summary lines |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Imaging
//!
//! Decoding uses the `image` crate (plus `rav1d` for AVIF inputs) and encoding
//! uses `rav1e` through `image`'s AVIF encoder. No system libraries are
//! needed, so the binary runs anywhere it is copied.
//!
//! ## Outputs Never Clobber Inputs
//!
//! Re-encoding an AVIF in place writes `<name>-compressed.avif`, and two
//! inputs that would land on the same output get numbered names rather than
//! silently overwriting each other.

pub mod config;
pub mod convert;
pub mod imaging;
pub mod manifest;
pub mod output;
pub mod paths;
pub mod report;
