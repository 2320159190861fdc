use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use now::DateTimeNow;

pub const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const SECOND_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const CLOCK_FORMAT: &str = "%H:%M";

const MISSING: &str = "N/A";

/// Formats an instant in local time, `N/A` when it is absent.
pub fn format_local(timestamp: Option<DateTime<Utc>>, format: &str) -> String {
    timestamp
        .map(|t| t.with_timezone(&Local).format(format).to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

/// Local midnight of `date`. Midday is used as the anchor so days starting inside a DST gap still
/// resolve.
pub fn local_day_start(date: NaiveDate) -> Option<DateTime<Utc>> {
    local_midday(date).map(|d| d.beginning_of_day().with_timezone(&Utc))
}

/// Last representable instant of `date` in local time.
pub fn local_day_end(date: NaiveDate) -> Option<DateTime<Utc>> {
    local_midday(date).map(|d| d.end_of_day().with_timezone(&Utc))
}

fn local_midday(date: NaiveDate) -> Option<DateTime<Local>> {
    let midday = NaiveTime::from_hms_opt(12, 0, 0)?;
    Local.from_local_datetime(&date.and_time(midday)).earliest()
}
