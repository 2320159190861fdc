//! Filter, render and describe a collection run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::{
    collection::worker::CollectedData,
    error::{MetadataError, RenderError},
    filter::DateRange,
    report::{
        metadata::{write_metadata, DataCounts, ReportMetadata},
        ReportInput, ReportRenderer, UserInfo,
    },
};

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub output_path: PathBuf,
    pub title: String,
    pub user: UserInfo,
    pub date_range: Option<DateRange>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ReportOutcome {
    pub report_path: PathBuf,
    /// Data that made it into the report, after filtering.
    pub data: CollectedData,
    pub counts: DataCounts,
    /// A failed sidecar doesn't invalidate the report.
    pub metadata: Result<PathBuf, MetadataError>,
}

#[instrument(skip_all, fields(path = ?request.output_path))]
pub fn generate_report(
    data: CollectedData,
    request: &ReportRequest,
) -> Result<ReportOutcome, RenderError> {
    let data = match request.date_range {
        Some(range) => {
            info!(
                "Filtering data from {} to {}",
                range.start(),
                range.end()
            );
            CollectedData {
                logins: range.apply(&data.logins),
                file_shares: range.apply(&data.file_shares),
                app_usage: range.apply(&data.app_usage),
            }
        }
        None => data,
    };

    let report_path = ReportRenderer::new(&request.output_path).render(&ReportInput {
        title: &request.title,
        logins: &data.logins,
        file_shares: &data.file_shares,
        app_usage: &data.app_usage,
        user: &request.user,
        date_range: request.date_range,
        generated_at: request.generated_at,
    })?;

    let counts = DataCounts {
        logins: data.logins.len(),
        file_shares: data.file_shares.len(),
        app_usage: data.app_usage.len(),
    };
    let metadata = write_metadata(
        &report_path,
        &ReportMetadata {
            title: request.title.clone(),
            generated_at: request.generated_at,
            data_counts: counts,
            date_range: request.date_range.into(),
        },
    )
    .inspect_err(|e| warn!("Failed to save report metadata {e:?}"));

    Ok(ReportOutcome {
        report_path,
        data,
        counts,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, TimeZone};
    use lopdf::Document;

    use crate::{
        record::{Record, RecordKind},
        report::{metadata::read_metadata, DEFAULT_TITLE},
        utils::logging::TEST_LOGGING,
    };

    use super::*;

    fn words(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn test_end_to_end_with_date_range() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempfile::tempdir()?;
        let t = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
        let data = CollectedData {
            logins: vec![
                Record::current("alice", "localhost", t, "environment"),
                Record::session("alice", "localhost", t - Duration::days(1), "utmpx"),
                Record::session("bob", "localhost", t - Duration::days(2), "utmpx"),
            ],
            file_shares: vec![Record::file(
                RecordKind::RecentFile,
                "/home/alice/old.txt",
                t - Duration::days(3),
                "recently_used",
            )],
            app_usage: vec![],
        };
        let request = ReportRequest {
            output_path: dir.path().join("footprint.pdf"),
            title: DEFAULT_TITLE.into(),
            user: UserInfo {
                name: "alice".into(),
            },
            date_range: DateRange::new(t - Duration::days(2), t),
            generated_at: t,
        };

        let outcome = generate_report(data, &request)?;

        assert_eq!(
            outcome.counts,
            DataCounts {
                logins: 3,
                file_shares: 0,
                app_usage: 0
            }
        );
        assert!(outcome.data.file_shares.is_empty());
        assert!(outcome.report_path.exists());
        let sidecar = outcome.metadata?;
        assert_eq!(sidecar, dir.path().join("footprint_metadata.json"));

        let document = Document::load(&outcome.report_path)?;
        let page_text = document.extract_text(&[2])?;
        let summary = words(&page_text);
        assert!(summary.windows(3).any(|w| w == ["Login", "Events", "3"]));
        assert!(summary.windows(3).any(|w| w == ["File", "Shares", "0"]));
        assert!(summary.windows(2).any(|w| w == ["Applications", "0"]));
        let file_section = document.extract_text(&[4])?;
        assert!(file_section.contains("File Shares & Recent Files"));
        assert!(file_section.contains("No file shares or recent files found."));

        let metadata = read_metadata(&outcome.report_path)?.expect("sidecar was written");
        assert_eq!(metadata.data_counts, outcome.counts);
        assert_eq!(metadata.date_range.start, Some(t - Duration::days(2)));
        assert_eq!(metadata.generated_at, t);
        Ok(())
    }

    #[test]
    fn test_without_range_nothing_is_filtered() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let t = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
        let data = CollectedData {
            file_shares: vec![Record::file(
                RecordKind::MountedShare,
                "smb://nas/share",
                t - Duration::days(400),
                "gtk_bookmarks",
            )],
            ..Default::default()
        };
        let request = ReportRequest {
            output_path: dir.path().join("all.pdf"),
            title: "Everything".into(),
            user: UserInfo {
                name: "alice".into(),
            },
            date_range: None,
            generated_at: t,
        };

        let outcome = generate_report(data, &request)?;

        assert_eq!(outcome.counts.file_shares, 1);
        assert_eq!(outcome.counts.total(), 1);
        Ok(())
    }
}
