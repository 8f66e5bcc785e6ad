//! The conversion pipeline.
//!
//! One pass over the manifest, strictly in order:
//!
//! ```text
//! entry ─▶ path? ─▶ exists? ─▶ decode + orient ─▶ resolve output ─▶ encode (unless dry run)
//!            │          │             │                                  │
//!       missing_path  file_not_found  read_failed                   read_failed
//! ```
//!
//! Each entry yields exactly one [`ResultRecord`]. Per-entry failures are
//! recorded and the run moves on; only the fatal conditions in [`RunError`]
//! stop a run, and all of those are checked before any image is opened.

use crate::config::{ConfigError, RunConfig};
use crate::imaging::{
    BackendError, Dimensions, EncodeParams, ImageBackend, LoadedImage, RustBackend,
};
use crate::manifest::{ManifestEntry, ManifestError, load_manifest};
use crate::paths::{self, OutputClaims, ResolvedPaths};
use crate::report::{MappingReport, ResultRecord, SkipReason};
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("AVIF support is not available in this build.")]
    AvifUnavailable,
    #[error("Failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write mapping file {}: {source}", .path.display())]
    WriteReport {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub report: MappingReport,
    /// Where the report was written; `None` for dry runs.
    pub mapping_file: Option<PathBuf>,
}

/// An entry that made it through decoding.
#[derive(Debug)]
struct Processed {
    paths: ResolvedPaths,
    source: Dimensions,
}

/// An entry that was skipped, with the input as the manifest spelled it.
#[derive(Debug)]
struct Skipped {
    input: Option<String>,
    reason: SkipReason,
}

impl Skipped {
    fn new(input: &str, reason: SkipReason) -> Self {
        Self {
            input: Some(input.to_string()),
            reason,
        }
    }
}

/// Run the whole pipeline with the pure Rust backend.
pub fn run(config: &RunConfig) -> Result<RunSummary, RunError> {
    run_with_backend(&RustBackend::new(), config)
}

/// Run the pipeline using a specific backend (allows testing with mock).
pub fn run_with_backend(
    backend: &impl ImageBackend,
    config: &RunConfig,
) -> Result<RunSummary, RunError> {
    let entries = load_manifest(&config.manifest_path)?;

    if !config.dry_run {
        if !backend.can_encode_avif() {
            return Err(RunError::AvifUnavailable);
        }
        if let Some(output_dir) = &config.output_dir {
            std::fs::create_dir_all(output_dir).map_err(|source| RunError::OutputDir {
                path: output_dir.clone(),
                source,
            })?;
        }
    }

    info!(
        entries = entries.len(),
        quality = config.quality.value(),
        dry_run = config.dry_run,
        "converting images"
    );
    let items = convert_entries(backend, config, &entries);

    let report = MappingReport::new(
        Utc::now(),
        config.root_dir.clone(),
        config
            .output_dir
            .as_deref()
            .map(|dir| paths::display_relative(dir, &config.root_dir)),
        config.quality.value(),
        items,
    );

    if config.dry_run {
        return Ok(RunSummary {
            report,
            mapping_file: None,
        });
    }

    report
        .write(&config.mapping_file)
        .map_err(|source| RunError::WriteReport {
            path: config.mapping_file.clone(),
            source,
        })?;
    Ok(RunSummary {
        report,
        mapping_file: Some(config.mapping_file.clone()),
    })
}

/// Convert every entry in order, producing one record each.
pub fn convert_entries(
    backend: &impl ImageBackend,
    config: &RunConfig,
    entries: &[ManifestEntry],
) -> Vec<ResultRecord> {
    let sources = entries
        .iter()
        .filter_map(ManifestEntry::path)
        .map(|raw| paths::resolve_input(&config.root_dir, raw));
    let mut claims = OutputClaims::with_sources(sources);
    entries
        .iter()
        .map(|entry| match convert_entry(backend, config, entry, &mut claims) {
            Ok(done) => record_processed(config, done),
            Err(skipped) => {
                warn!(
                    input = skipped.input.as_deref().unwrap_or("<none>"),
                    reason = skipped.reason.as_str(),
                    "skipped"
                );
                ResultRecord::skipped(skipped.input, skipped.reason)
            }
        })
        .collect()
}

fn record_processed(config: &RunConfig, done: Processed) -> ResultRecord {
    let input = paths::display_relative(&done.paths.absolute_input, &config.root_dir);
    let output = paths::display_relative(&done.paths.absolute_output, &config.root_dir);
    info!(%input, %output, "{}", if config.dry_run { "would convert" } else { "converted" });
    ResultRecord::processed(
        input,
        output,
        config.dry_run,
        (done.source.width, done.source.height),
        config.quality.value(),
    )
}

fn convert_entry(
    backend: &impl ImageBackend,
    config: &RunConfig,
    entry: &ManifestEntry,
    claims: &mut OutputClaims,
) -> Result<Processed, Skipped> {
    let raw = entry.path().ok_or(Skipped {
        input: None,
        reason: SkipReason::MissingPath,
    })?;

    let absolute_input = paths::resolve_input(&config.root_dir, raw);
    if !absolute_input.exists() {
        debug!(path = %absolute_input.display(), "input does not exist");
        return Err(Skipped::new(raw, SkipReason::FileNotFound));
    }

    let LoadedImage { pixels, source } = backend
        .load(&absolute_input)
        .map_err(|e| read_failed(raw, &e))?;

    let output_dir = config.output_dir.as_deref();
    let resolved = paths::resolve_output(&config.root_dir, output_dir, absolute_input, claims);
    debug!(
        input = %resolved.absolute_input.display(),
        output = %resolved.absolute_output.display(),
        "resolved paths"
    );
    if resolved.renumbered {
        warn!(
            input = raw,
            output = %resolved.absolute_output.display(),
            "output already claimed or listed as an input, using a numbered name"
        );
    }

    if !config.dry_run {
        write_output(backend, config, &pixels, &resolved.absolute_output)
            .map_err(|e| read_failed(raw, &e))?;
    }

    Ok(Processed {
        paths: resolved,
        source,
    })
}

fn write_output(
    backend: &impl ImageBackend,
    config: &RunConfig,
    pixels: &image::DynamicImage,
    output: &Path,
) -> Result<(), BackendError> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    backend.encode_avif(
        pixels,
        &EncodeParams {
            output: output.to_path_buf(),
            quality: config.quality,
            speed: config.speed,
        },
    )
}

fn read_failed(raw: &str, err: &BackendError) -> Skipped {
    warn!(input = raw, error = %err, "image could not be converted");
    Skipped::new(raw, SkipReason::ReadFailed)
}
