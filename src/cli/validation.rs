use chrono::NaiveDate;

use crate::{collection::worker::Selection, error::ValidationError, filter::DateRange};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Default, clap::Args)]
pub struct CollectionFlags {
    #[arg(long, help = "Collect only login data")]
    pub logins_only: bool,
    #[arg(long, help = "Collect only file shares data")]
    pub files_only: bool,
    #[arg(long, help = "Collect only application usage data")]
    pub apps_only: bool,
    #[arg(long, help = "Skip login data collection")]
    pub no_logins: bool,
    #[arg(long, help = "Skip file shares data collection")]
    pub no_files: bool,
    #[arg(long, help = "Skip application usage data collection")]
    pub no_apps: bool,
}

impl CollectionFlags {
    /// A category is collected unless it's excluded or another category was requested exclusively.
    pub fn selection(&self) -> Result<Selection, ValidationError> {
        let selection = Selection {
            logins: !self.no_logins && !self.files_only && !self.apps_only,
            file_shares: !self.no_files && !self.logins_only && !self.apps_only,
            app_usage: !self.no_apps && !self.logins_only && !self.files_only,
        };
        if selection.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        Ok(selection)
    }
}

pub fn parse_date(flag: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| ValidationError::InvalidDate {
        flag,
        value: value.to_string(),
    })
}

/// Both dates are validated when present, but a range is only produced when both are given.
pub fn resolve_date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Option<DateRange>, ValidationError> {
    let start = start.map(|v| parse_date("start date", v)).transpose()?;
    let end = end.map(|v| parse_date("end date", v)).transpose()?;

    let (Some(start), Some(end)) = (start, end) else {
        return Ok(None);
    };
    if start > end {
        return Err(ValidationError::StartAfterEnd);
    }
    DateRange::from_days(start, end)
        .map(Some)
        .ok_or(ValidationError::StartAfterEnd)
}
