//! PDF summary of collected activity.
//!
//! Rendering happens in two steps. [story] decides what goes on the pages (sections, tables, row
//! limits, truncation) and [pdf] decides where it goes. The renderer never collects or filters.

pub mod metadata;
pub mod paths;
mod pdf;
mod story;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::{error::RenderError, filter::DateRange, record::Record};

pub const DEFAULT_TITLE: &str = "Employee Digital Footprint Report";
pub const DEFAULT_REPORT_NAME: &str = "digital_footprint_report";
pub const REPORT_EXTENSION: &str = "pdf";

pub const LOGIN_ROW_LIMIT: usize = 20;
pub const FILE_ROW_LIMIT: usize = 20;
pub const PROCESS_ROW_LIMIT: usize = 15;
pub const INSTALLED_ROW_LIMIT: usize = 20;

pub const PATH_WIDTH: usize = 50;
pub const PROCESS_NAME_WIDTH: usize = 30;
pub const APP_NAME_WIDTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
}

/// Everything that ends up in a report. Record slices are expected to be sorted already.
#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    pub title: &'a str,
    pub logins: &'a [Record],
    pub file_shares: &'a [Record],
    pub app_usage: &'a [Record],
    pub user: &'a UserInfo,
    pub date_range: Option<DateRange>,
    pub generated_at: DateTime<Utc>,
}

pub struct ReportRenderer {
    output_path: PathBuf,
}

impl ReportRenderer {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    /// Writes the report and returns the path it was written to.
    #[instrument(skip_all, fields(path = ?self.output_path))]
    pub fn render(&self, input: &ReportInput<'_>) -> Result<PathBuf, RenderError> {
        let story = story::build_story(input);
        pdf::write_document(&story, input.title, &self.output_path)?;
        info!("Report written to {:?}", self.output_path);
        Ok(self.output_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, TimeZone};
    use lopdf::Document;

    use crate::record::RecordKind;

    use super::*;

    #[test]
    fn test_rendered_report_loads_back() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("report.pdf");
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
        let logins = (0..45)
            .map(|i| Record::session(format!("user{i}"), "localhost", now - Duration::hours(i), "utmpx"))
            .collect::<Vec<_>>();
        let files = vec![Record::file(
            RecordKind::RecentFile,
            "/home/alice/Документы/отчёт.odt",
            now,
            "recently_used",
        )];
        let user = UserInfo {
            name: "alice".into(),
        };

        let written = ReportRenderer::new(&path).render(&ReportInput {
            title: DEFAULT_TITLE,
            logins: &logins,
            file_shares: &files,
            app_usage: &[],
            user: &user,
            date_range: None,
            generated_at: now,
        })?;

        assert_eq!(written, path);
        let document = Document::load(&path)?;
        assert!(document.get_pages().len() >= 5);
        Ok(())
    }

    #[test]
    fn test_unwritable_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.pdf");
        let user = UserInfo {
            name: "alice".into(),
        };

        let result = ReportRenderer::new(&path).render(&ReportInput {
            title: DEFAULT_TITLE,
            logins: &[],
            file_shares: &[],
            app_usage: &[],
            user: &user,
            date_range: None,
            generated_at: Utc::now(),
        });

        assert!(matches!(result, Err(RenderError::Write { .. })));
    }
}
