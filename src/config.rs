//! Run configuration.
//!
//! Settings come from three layers, each overriding the one before:
//!
//! 1. Built-in defaults (quality 75, speed 6, `image-files.json`, no output dir)
//! 2. An optional `avif-compress.toml` in the root directory, or the file named by `--config`
//! 3. Command-line flags
//!
//! The result is an immutable [`RunConfig`] with every path made absolute
//! against the root directory. It is built once in `main` and passed down to
//! each pipeline stage.
//!
//! ## Config File
//!
//! ```toml
//! # All keys are optional
//! images = "image-files.json"   # Manifest path
//! output_dir = "public/avif"    # Output root (omit to write beside inputs)
//! mapping_file = "image-map.json"
//! quality = 75                  # 1-100
//! speed = 6                     # rav1e speed, 1 (slow) - 10 (fast)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Quality, Speed};
use crate::paths::normalize;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MANIFEST: &str = "image-files.json";
pub const DEFAULT_MAPPING_FILE: &str = "image-map.json";
pub const CONFIG_FILE_NAME: &str = "avif-compress.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("{0}")]
    Validation(String),
}

/// Values read from the optional TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub images: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub mapping_file: Option<PathBuf>,
    pub quality: Option<i64>,
    pub speed: Option<i64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Options as given on the command line; `None` means the flag was absent.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub images: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub root_dir: Option<PathBuf>,
    pub quality: Option<i64>,
    pub speed: Option<i64>,
    pub mapping_file: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub dry_run: bool,
}

/// Fully resolved, validated settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub root_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub mapping_file: PathBuf,
    pub quality: Quality,
    pub speed: Speed,
    pub dry_run: bool,
}

fn validate_quality(value: i64) -> Result<Quality, ConfigError> {
    u32::try_from(value)
        .ok()
        .and_then(Quality::new)
        .ok_or_else(|| {
            ConfigError::Validation("Quality must be an integer between 1 and 100.".into())
        })
}

fn validate_speed(value: i64) -> Result<Speed, ConfigError> {
    u32::try_from(value)
        .ok()
        .and_then(Speed::new)
        .ok_or_else(|| ConfigError::Validation("Speed must be an integer between 1 and 10.".into()))
}

impl RunConfig {
    /// Merge CLI options over the config file over defaults.
    ///
    /// `cwd` is the base for `--root-dir`; every other relative path is
    /// resolved against the root directory.
    pub fn resolve(cli: CliOptions, cwd: &Path) -> Result<Self, ConfigError> {
        let root_dir = normalize(&cwd.join(cli.root_dir.unwrap_or_default()));
        let under_root = |p: &Path| normalize(&root_dir.join(p));

        let file = match &cli.config {
            Some(explicit) => {
                let path = under_root(explicit);
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path));
                }
                FileConfig::load(&path)?
            }
            None => {
                let path = root_dir.join(CONFIG_FILE_NAME);
                if path.is_file() {
                    FileConfig::load(&path)?
                } else {
                    FileConfig::default()
                }
            }
        };

        let quality = match cli.quality.or(file.quality) {
            Some(q) => validate_quality(q)?,
            None => Quality::default(),
        };
        let speed = match cli.speed.or(file.speed) {
            Some(s) => validate_speed(s)?,
            None => Speed::default(),
        };

        let images = cli
            .images
            .or(file.images)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST));
        let output_dir = cli.output_dir.or(file.output_dir);
        let mapping_file = cli
            .mapping_file
            .or(file.mapping_file)
            .unwrap_or_else(|| match &output_dir {
                Some(dir) => dir.join(DEFAULT_MAPPING_FILE),
                None => PathBuf::from(DEFAULT_MAPPING_FILE),
            });

        Ok(Self {
            manifest_path: under_root(&images),
            output_dir: output_dir.as_deref().map(under_root),
            mapping_file: under_root(&mapping_file),
            root_dir,
            quality,
            speed,
            dry_run: cli.dry_run,
        })
    }
}
