//! The mapping report: one record per manifest entry, written as JSON.
//!
//! ```json
//! {
//!   "generatedAt": "2026-01-01T12:00:00.000000+00:00",
//!   "rootDir": "/srv/site",
//!   "outputDir": "public/avif",
//!   "quality": 75,
//!   "items": [
//!     {"input": "img/a.jpg", "output": "public/avif/img/a.avif", "status": "converted",
//!      "sourceWidth": 1600, "sourceHeight": 1200, "quality": 75},
//!     {"input": "img/b.png", "status": "skipped", "reason": "file_not_found"}
//!   ]
//! }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemStatus {
    Converted,
    DryRun,
    Skipped,
}

/// Why an entry produced no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The entry names no path.
    MissingPath,
    /// The resolved input does not exist.
    FileNotFound,
    /// Decoding, encoding, or writing the output failed.
    ReadFailed,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingPath => "missing_path",
            Self::FileNotFound => "file_not_found",
            Self::ReadFailed => "read_failed",
        }
    }
}

/// Outcome of one manifest entry. Never mutated once pushed to the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
}

impl ResultRecord {
    pub fn processed(
        input: String,
        output: String,
        dry_run: bool,
        (width, height): (u32, u32),
        quality: u8,
    ) -> Self {
        Self {
            input: Some(input),
            output: Some(output),
            status: if dry_run {
                ItemStatus::DryRun
            } else {
                ItemStatus::Converted
            },
            reason: None,
            source_width: Some(width),
            source_height: Some(height),
            quality: Some(quality),
        }
    }

    pub fn skipped(input: Option<String>, reason: SkipReason) -> Self {
        Self {
            input,
            output: None,
            status: ItemStatus::Skipped,
            reason: Some(reason),
            source_width: None,
            source_height: None,
            quality: None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.status == ItemStatus::Skipped
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingReport {
    pub generated_at: String,
    pub root_dir: PathBuf,
    pub output_dir: Option<String>,
    pub quality: u8,
    pub items: Vec<ResultRecord>,
}

impl MappingReport {
    pub fn new(
        generated_at: DateTime<Utc>,
        root_dir: PathBuf,
        output_dir: Option<String>,
        quality: u8,
        items: Vec<ResultRecord>,
    ) -> Self {
        Self {
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Micros, false),
            root_dir,
            output_dir,
            quality,
            items,
        }
    }

    pub fn processed(&self) -> usize {
        self.items.iter().filter(|r| !r.is_skipped()).count()
    }

    pub fn skipped(&self) -> usize {
        self.items.iter().filter(|r| r.is_skipped()).count()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Write the report to `path`, creating parent directories as needed.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> MappingReport {
        MappingReport::new(
            Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
            PathBuf::from("/srv/site"),
            Some("out".to_string()),
            75,
            vec![
                ResultRecord::processed(
                    "img/a.jpg".into(),
                    "out/img/a.avif".into(),
                    false,
                    (640, 480),
                    75,
                ),
                ResultRecord::skipped(Some("img/b.png".into()), SkipReason::FileNotFound),
                ResultRecord::skipped(None, SkipReason::MissingPath),
            ],
        )
    }

    #[test]
    fn serializes_expected_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "generatedAt": "2026-01-02T03:04:05.000000+00:00",
                "rootDir": "/srv/site",
                "outputDir": "out",
                "quality": 75,
                "items": [
                    {"input": "img/a.jpg", "output": "out/img/a.avif", "status": "converted",
                     "sourceWidth": 640, "sourceHeight": 480, "quality": 75},
                    {"input": "img/b.png", "status": "skipped", "reason": "file_not_found"},
                    {"input": null, "status": "skipped", "reason": "missing_path"}
                ]
            })
        );
    }

    #[test]
    fn dry_run_status_is_kebab_case() {
        let record = ResultRecord::processed("a.jpg".into(), "a.avif".into(), true, (1, 1), 50);
        let value = serde_json::to_value(record).unwrap();
        assert_eq!(value["status"], "dry-run");
    }

    #[test]
    fn reason_strings_match_serialization() {
        for reason in [
            SkipReason::MissingPath,
            SkipReason::FileNotFound,
            SkipReason::ReadFailed,
        ] {
            assert_eq!(
                serde_json::to_value(reason).unwrap(),
                json!(reason.as_str())
            );
        }
    }

    #[test]
    fn counts_processed_and_skipped() {
        let report = sample();
        assert_eq!(report.processed(), 1);
        assert_eq!(report.skipped(), 2);
    }

    #[test]
    fn null_output_dir_is_kept() {
        let mut report = sample();
        report.output_dir = None;
        let value = serde_json::to_value(report).unwrap();
        assert!(value["outputDir"].is_null());
    }

    #[test]
    fn write_creates_parents_and_ends_with_newline() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/image-map.json");
        sample().write(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("}\n"));
        assert!(content.contains("\n  \"items\": ["));
    }
}
