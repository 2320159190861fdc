//! Turns raw [ActivitySource] entries into normalized [Record] sequences.
//!
//! Every category is collected best-effort: each sub-source is attempted on its own, failures are
//! logged and remembered as [SourceFailure], and whatever was gathered is returned sorted most
//! recent first.

mod apps;
mod files;
mod logins;
pub mod worker;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    activity_api::{ActivitySource, GenericActivitySource},
    error::{CollectError, SourceFailure},
    platform::{resolve_username, Platform},
    record::{sort_most_recent_first, Category, Record},
};

/// Records of one category together with the sub-sources that failed while gathering them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Gathered {
    pub records: Vec<Record>,
    pub suppressed: Vec<SourceFailure>,
}

pub struct Collector<S: ActivitySource = GenericActivitySource> {
    source: S,
    /// Collection time. Read once per run so every record created "now" shares the same instant.
    now: DateTime<Utc>,
    username: Arc<str>,
}

impl Collector {
    /// Picks the activity backend for `platform`.
    pub fn for_platform(
        platform: &Platform,
        now: DateTime<Utc>,
        username: impl Into<Arc<str>>,
    ) -> Result<Self, CollectError> {
        Ok(Self::new(GenericActivitySource::new(platform)?, now, username))
    }
}

impl<S: ActivitySource> Collector<S> {
    pub fn new(source: S, now: DateTime<Utc>, username: impl Into<Arc<str>>) -> Self {
        Self {
            source,
            now,
            username: username.into(),
        }
    }

    pub fn gather(&self, category: Category) -> Gathered {
        match category {
            Category::Login => self.gather_logins(),
            Category::FileAccess => self.gather_file_shares(),
            Category::AppUsage => self.gather_app_usage(),
        }
    }
}

/// Collects login records on `platform` using the environment username.
pub fn collect_logins(platform: &Platform, now: DateTime<Utc>) -> Result<Vec<Record>, CollectError> {
    Ok(Collector::for_platform(platform, now, resolve_username())?.collect_logins())
}

pub fn collect_file_shares(
    platform: &Platform,
    now: DateTime<Utc>,
) -> Result<Vec<Record>, CollectError> {
    Ok(Collector::for_platform(platform, now, resolve_username())?.collect_file_shares())
}

pub fn collect_app_usage(
    platform: &Platform,
    now: DateTime<Utc>,
) -> Result<Vec<Record>, CollectError> {
    Ok(Collector::for_platform(platform, now, resolve_username())?.collect_app_usage())
}

/// Accumulates records from independent sub-sources of one category.
struct BestEffort {
    category: Category,
    records: Vec<Record>,
    suppressed: Vec<SourceFailure>,
}

impl BestEffort {
    fn new(category: Category) -> Self {
        Self {
            category,
            records: vec![],
            suppressed: vec![],
        }
    }

    /// Maps every entry of a successful sub-source, a failed one only leaves a trace in the logs.
    fn attempt<T>(
        &mut self,
        sub_source: &'static str,
        result: anyhow::Result<Vec<T>>,
        map: impl FnMut(T) -> Record,
    ) {
        match result {
            Ok(entries) => {
                let before = self.records.len();
                self.records.extend(entries.into_iter().map(map));
                debug!(
                    "{sub_source} contributed {} {} records",
                    self.records.len() - before,
                    self.category
                );
            }
            Err(e) => {
                warn!("Failed to read {sub_source} for {} data: {e:?}", self.category);
                self.suppressed.push(SourceFailure {
                    category: self.category,
                    sub_source,
                    message: format!("{e:#}"),
                });
            }
        }
    }

    fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    fn finish(mut self) -> Gathered {
        sort_most_recent_first(&mut self.records);
        Gathered {
            records: self.records,
            suppressed: self.suppressed,
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_unsupported_platform_errors() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let result = collect_logins(&Platform::Other("haiku".into()), now);
        assert!(matches!(result, Err(CollectError::UnsupportedPlatform(_))));
        assert!(collect_file_shares(&Platform::Other("haiku".into()), now).is_err());
        assert!(collect_app_usage(&Platform::Other("haiku".into()), now).is_err());
    }

    #[test]
    fn test_best_effort_records_failures_and_keeps_going() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut effort = BestEffort::new(Category::Login);
        effort.attempt::<u32>("broken", Err(anyhow!("permission denied")), |_| unreachable!());
        effort.attempt("working", Ok(vec![1, 2]), |i| {
            Record::session(format!("user{i}"), "localhost", now, "test")
        });

        let gathered = effort.finish();

        assert_eq!(gathered.records.len(), 2);
        assert_eq!(gathered.suppressed.len(), 1);
        assert_eq!(gathered.suppressed[0].sub_source, "broken");
        assert_eq!(gathered.suppressed[0].message, "permission denied");
    }
}
