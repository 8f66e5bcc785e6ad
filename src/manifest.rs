//! Manifest loading.
//!
//! The manifest is a JSON document listing the images to convert. Two
//! top-level shapes are accepted:
//!
//! ```json
//! ["photos/a.jpg", {"path": "photos/b.png"}]
//! ```
//!
//! ```json
//! {"images": ["photos/a.jpg", {"file": "photos/b.png"}]}
//! ```
//!
//! Any other top-level shape is read as an empty list, which the loader
//! rejects. Object entries name their path under the first of
//! [`PATH_KEYS`] that holds a non-empty string.

use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Keys checked, in order, for the path of an object entry.
pub const PATH_KEYS: [&str; 3] = ["path", "file", "input"];

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Image list not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read image list {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse JSON: {}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("No image entries found in image list.")]
    Empty,
}

/// One element of the manifest's image list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawEntry")]
pub enum ManifestEntry {
    /// A bare string, used verbatim as the path.
    PlainPath(String),
    /// An object; `None` when none of [`PATH_KEYS`] holds a usable string.
    KeyedPath(Option<String>),
    /// Anything else (numbers, booleans, nested arrays, null).
    Unrecognized,
}

impl ManifestEntry {
    /// The raw path this entry names, if any. Empty strings count as missing.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::PlainPath(p) => Some(p.as_str()).filter(|p| !p.is_empty()),
            Self::KeyedPath(p) => p.as_deref(),
            Self::Unrecognized => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Plain(String),
    Keyed(Map<String, Value>),
    Other(IgnoredAny),
}

impl From<RawEntry> for ManifestEntry {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Plain(path) => Self::PlainPath(path),
            RawEntry::Keyed(fields) => Self::KeyedPath(
                PATH_KEYS.iter().find_map(|key| {
                    fields
                        .get(*key)
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                }),
            ),
            RawEntry::Other(_) => Self::Unrecognized,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    List(Vec<ManifestEntry>),
    Wrapped { images: Vec<ManifestEntry> },
    Other(IgnoredAny),
}

impl Document {
    fn into_entries(self) -> Vec<ManifestEntry> {
        match self {
            Self::List(entries) | Self::Wrapped { images: entries } => entries,
            Self::Other(_) => Vec::new(),
        }
    }
}

/// Parse manifest JSON text. Unsupported shapes yield an empty list.
pub fn parse_manifest(json: &str) -> Result<Vec<ManifestEntry>, serde_json::Error> {
    serde_json::from_str::<Document>(json).map(Document::into_entries)
}

/// Read and parse the manifest at `path`, rejecting missing files, invalid
/// JSON and empty entry lists.
pub fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = parse_manifest(&content).map_err(|source| ManifestError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if entries.is_empty() {
        return Err(ManifestError::Empty);
    }
    Ok(entries)
}
