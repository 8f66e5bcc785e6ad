//! Parameter types for image operations.
//!
//! These structs describe *what* to encode, not *how*. They sit between the
//! [`convert`](crate::convert) pipeline, which decides where each image goes,
//! and the [`backend`](super::backend), which does the pixel work. Keeping
//! them plain data lets tests drive a mock backend with the exact same values.
//!
//! ## Types
//!
//! - [`Quality`]: AVIF encoding quality (1–100, default 75). Rejected, not clamped, when out of range.
//! - [`Speed`]: rav1e encoder speed (1–10, default 6).
//! - [`EncodeParams`]: Output path plus the quality and speed to encode at.

use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy AVIF encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;

    /// Returns `None` when `value` is outside `1..=100`.
    pub fn new(value: u32) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then(|| Self(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// rav1e speed preset: 1 is slowest/smallest, 10 is fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Speed(u8);

impl Speed {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 10;

    pub fn new(value: u32) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then(|| Self(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self(6)
    }
}

/// Parameters for writing one AVIF file.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub output: PathBuf,
    pub quality: Quality,
    pub speed: Speed,
}
