//! Date-range filtering of record sequences.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    record::{FieldValue, Record},
    utils::time::{local_day_end, local_day_start},
};

pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Inclusive range of instants. Construction guarantees `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// From the local start of `first` to the local end of `last`.
    pub fn from_days(first: NaiveDate, last: NaiveDate) -> Option<Self> {
        Self::new(local_day_start(first)?, local_day_end(last)?)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        filter_by_range(records, Some(self.start), Some(self.end), TIMESTAMP_FIELD)
    }
}

/// Keeps records whose `field` falls within `[start, end]`.
///
/// Unless both bounds are given the input is returned unchanged. Records where the field is
/// missing or can't be read as an instant are dropped.
pub fn filter_by_range(
    records: &[Record],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    field: &str,
) -> Vec<Record> {
    let (Some(start), Some(end)) = (start, end) else {
        return records.to_vec();
    };

    records
        .iter()
        .filter(|record| {
            record
                .field(field)
                .and_then(coerce_timestamp)
                .is_some_and(|t| start <= t && t <= end)
        })
        .cloned()
        .collect()
}

fn coerce_timestamp(value: FieldValue<'_>) -> Option<DateTime<Utc>> {
    match value {
        FieldValue::Timestamp(timestamp) => Some(timestamp),
        FieldValue::Text(text) => parse_iso_timestamp(text),
        FieldValue::Integer(_) | FieldValue::Float(_) => None,
    }
}

/// Reads ISO-8601 text. A trailing `Z` means UTC, text without an offset is local time.
pub fn parse_iso_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let normalized = match text.strip_suffix('Z') {
        Some(rest) => format!("{rest}+00:00"),
        None => text.to_string(),
    };

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(timestamp.with_timezone(&Utc));
    }
    if let Ok(timestamp) = DateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(timestamp.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M"))
        .or_else(|_| {
            NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
                .map(|date| date.and_time(chrono::NaiveTime::MIN))
        })
        .ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}
