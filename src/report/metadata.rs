//! JSON sidecar stored next to every report.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::MetadataError, filter::DateRange};

const SUFFIX: &str = "_metadata.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataCounts {
    pub logins: usize,
    pub file_shares: usize,
    pub app_usage: usize,
}

impl DataCounts {
    pub fn total(&self) -> usize {
        self.logins + self.file_shares + self.app_usage
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetadataRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl From<Option<DateRange>> for MetadataRange {
    fn from(value: Option<DateRange>) -> Self {
        Self {
            start: value.map(|r| r.start()),
            end: value.map(|r| r.end()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub data_counts: DataCounts,
    pub date_range: MetadataRange,
}

/// `reports/q1.pdf` maps to `reports/q1_metadata.json`.
pub fn metadata_path(report_path: &Path) -> PathBuf {
    let stem = report_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    report_path.with_file_name(format!("{stem}{SUFFIX}"))
}

pub fn write_metadata(
    report_path: &Path,
    metadata: &ReportMetadata,
) -> Result<PathBuf, MetadataError> {
    let path = metadata_path(report_path);
    let json = serde_json::to_string_pretty(metadata)?;
    fs::write(&path, json).map_err(|source| MetadataError::Write {
        path: path.clone(),
        source,
    })?;
    debug!("Wrote metadata to {path:?}");
    Ok(path)
}

/// Returns [None] when the report has no sidecar.
pub fn read_metadata(report_path: &Path) -> Result<Option<ReportMetadata>, MetadataError> {
    let path = metadata_path(report_path);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(MetadataError::Read { path, source }),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| MetadataError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, TimeZone};

    use super::*;

    fn metadata() -> ReportMetadata {
        let generated_at = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
        ReportMetadata {
            title: "Quarterly Footprint".into(),
            generated_at,
            data_counts: DataCounts {
                logins: 3,
                file_shares: 0,
                app_usage: 12,
            },
            date_range: DateRange::new(generated_at - Duration::days(2), generated_at).into(),
        }
    }

    #[test]
    fn test_metadata_path() {
        assert_eq!(
            metadata_path(Path::new("reports/q1.pdf")),
            PathBuf::from("reports/q1_metadata.json")
        );
        assert_eq!(
            metadata_path(Path::new("archive.v2.pdf")),
            PathBuf::from("archive.v2_metadata.json")
        );
    }

    #[test]
    fn test_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let report = dir.path().join("report.pdf");

        let written = write_metadata(&report, &metadata())?;

        assert_eq!(written, dir.path().join("report_metadata.json"));
        assert_eq!(read_metadata(&report)?, Some(metadata()));
        Ok(())
    }

    #[test]
    fn test_json_shape() -> Result<()> {
        let value = serde_json::to_value(ReportMetadata {
            date_range: MetadataRange::default(),
            ..metadata()
        })?;
        assert_eq!(value["data_counts"]["app_usage"], 12);
        assert_eq!(value["generated_at"], "2024-06-15T09:30:00Z");
        assert!(value["date_range"]["start"].is_null());
        Ok(())
    }

    #[test]
    fn test_missing_sidecar() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert_eq!(read_metadata(&dir.path().join("absent.pdf"))?, None);
        Ok(())
    }

    #[test]
    fn test_partial_sidecar_fails_to_parse() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let report = dir.path().join("report.pdf");
        let json = serde_json::to_string_pretty(&metadata())?;
        fs::write(metadata_path(&report), &json[..json.len() / 2])?;

        assert!(matches!(
            read_metadata(&report),
            Err(MetadataError::Parse { .. })
        ));
        Ok(())
    }
}
