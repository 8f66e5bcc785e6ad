//! CLI output formatting.
//!
//! Stdout carries only the run summary, so scripts can parse it:
//!
//! ```text
//! Processed: 12, skipped: 1
//! Mapping written to: /srv/site/public/avif/image-map.json
//! ```
//!
//! or, for a dry run:
//!
//! ```text
//! Processed: 12, skipped: 1
//! Dry run: no files were written.
//! ```
//!
//! Per-entry progress goes through `tracing` on stderr instead. As in the
//! rest of the crate, `format_*` functions are pure and return lines;
//! `print_*` wrappers write them.

use crate::convert::RunSummary;

/// Format the end-of-run summary.
pub fn format_summary(summary: &RunSummary) -> Vec<String> {
    let report = &summary.report;
    let mut lines = vec![format!(
        "Processed: {}, skipped: {}",
        report.processed(),
        report.skipped()
    )];
    lines.push(match &summary.mapping_file {
        Some(path) => format!("Mapping written to: {}", path.display()),
        None => "Dry run: no files were written.".to_string(),
    });
    lines
}

pub fn print_summary(summary: &RunSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}
