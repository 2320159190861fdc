//! The record model every collector produces.
//!
//!  - A [Record] is a timestamped, typed, sourced unit of activity data.
//!  - Category specific fields live in [Details], so a record can never carry fields of another
//!    category.
//!  - Sequences are kept most recent first, see [sort_most_recent_first].

use std::{collections::BTreeMap, fmt::Display, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Login,
    FileAccess,
    AppUsage,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Login, Category::FileAccess, Category::AppUsage];

    /// Noun used in progress messages, e.g. "Collecting login data".
    pub fn noun(&self) -> &'static str {
        match self {
            Category::Login => "login",
            Category::FileAccess => "file shares",
            Category::AppUsage => "application usage",
        }
    }

    /// Plural used when counting records of the category.
    pub fn plural(&self) -> &'static str {
        match self {
            Category::Login => "login events",
            Category::FileAccess => "file shares",
            Category::AppUsage => "application events",
        }
    }

    /// Key used in metadata and summaries.
    pub fn key(&self) -> &'static str {
        match self {
            Category::Login => "logins",
            Category::FileAccess => "file_shares",
            Category::AppUsage => "app_usage",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Login => write!(f, "login"),
            Category::FileAccess => write!(f, "file access"),
            Category::AppUsage => write!(f, "application usage"),
        }
    }
}

/// Sub-kind of a record inside its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Session,
    Current,
    RecentFile,
    NetworkDrive,
    MountedShare,
    RunningProcess,
    InstalledApp,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Session => "session",
            RecordKind::Current => "current",
            RecordKind::RecentFile => "recent_file",
            RecordKind::NetworkDrive => "network_drive",
            RecordKind::MountedShare => "mounted_share",
            RecordKind::RunningProcess => "running_process",
            RecordKind::InstalledApp => "installed_app",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            RecordKind::Session | RecordKind::Current => Category::Login,
            RecordKind::RecentFile | RecordKind::NetworkDrive | RecordKind::MountedShare => {
                Category::FileAccess
            }
            RecordKind::RunningProcess | RecordKind::InstalledApp => Category::AppUsage,
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginDetails {
    pub username: Arc<str>,
    pub host: Arc<str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDetails {
    pub path: Arc<str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessDetails {
    pub name: Arc<str>,
    /// Full path to an executable.
    pub path: Arc<str>,
    pub pid: u32,
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstalledAppDetails {
    pub name: Arc<str>,
    /// Registry key or package name. Used as an identifier when there is no real path.
    pub path: Arc<str>,
    pub install_date: Option<Arc<str>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Details {
    Login(LoginDetails),
    File(FileDetails),
    Process(ProcessDetails),
    InstalledApp(InstalledAppDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Missing only for records without a natural point in time, like installed applications.
    /// For running processes this is the process start time.
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    /// OS mechanism the record came from.
    pub source: Arc<str>,
    #[serde(flatten)]
    pub details: Details,
}

/// Dynamically typed view of a single record field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Timestamp(DateTime<Utc>),
    Text(&'a str),
    Integer(i64),
    Float(f64),
}

impl Record {
    pub fn session(
        username: impl Into<Arc<str>>,
        host: impl Into<Arc<str>>,
        started: DateTime<Utc>,
        source: impl Into<Arc<str>>,
    ) -> Self {
        Self::login(RecordKind::Session, username, host, started, source)
    }

    pub fn current(
        username: impl Into<Arc<str>>,
        host: impl Into<Arc<str>>,
        now: DateTime<Utc>,
        source: impl Into<Arc<str>>,
    ) -> Self {
        Self::login(RecordKind::Current, username, host, now, source)
    }

    fn login(
        kind: RecordKind,
        username: impl Into<Arc<str>>,
        host: impl Into<Arc<str>>,
        timestamp: DateTime<Utc>,
        source: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            timestamp: Some(timestamp),
            kind,
            source: source.into(),
            details: Details::Login(LoginDetails {
                username: username.into(),
                host: host.into(),
            }),
        }
    }

    /// Creates a file access record. `kind` must belong to [Category::FileAccess].
    pub fn file(
        kind: RecordKind,
        path: impl Into<Arc<str>>,
        timestamp: DateTime<Utc>,
        source: impl Into<Arc<str>>,
    ) -> Self {
        debug_assert_eq!(kind.category(), Category::FileAccess);
        Self {
            timestamp: Some(timestamp),
            kind,
            source: source.into(),
            details: Details::File(FileDetails { path: path.into() }),
        }
    }

    pub fn running_process(
        details: ProcessDetails,
        start_time: Option<DateTime<Utc>>,
        source: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            timestamp: start_time,
            kind: RecordKind::RunningProcess,
            source: source.into(),
            details: Details::Process(details),
        }
    }

    pub fn installed_app(details: InstalledAppDetails, source: impl Into<Arc<str>>) -> Self {
        Self {
            timestamp: None,
            kind: RecordKind::InstalledApp,
            source: source.into(),
            details: Details::InstalledApp(details),
        }
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Looks up a field by its name. Returns [None] for fields that are absent or don't belong to
    /// the record's category.
    pub fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match (name, &self.details) {
            ("timestamp", _) => self.timestamp.map(FieldValue::Timestamp),
            ("type", _) => Some(FieldValue::Text(self.kind.as_str())),
            ("source", _) => Some(FieldValue::Text(&self.source)),
            ("username", Details::Login(login)) => Some(FieldValue::Text(&login.username)),
            ("host", Details::Login(login)) => Some(FieldValue::Text(&login.host)),
            ("path", Details::File(file)) => Some(FieldValue::Text(&file.path)),
            ("path", Details::Process(process)) => Some(FieldValue::Text(&process.path)),
            ("path", Details::InstalledApp(app)) => Some(FieldValue::Text(&app.path)),
            ("name", Details::Process(process)) => Some(FieldValue::Text(&process.name)),
            ("name", Details::InstalledApp(app)) => Some(FieldValue::Text(&app.name)),
            ("pid", Details::Process(process)) => Some(FieldValue::Integer(process.pid.into())),
            ("cpu_percent", Details::Process(process)) => {
                Some(FieldValue::Float(process.cpu_percent.into()))
            }
            ("memory_percent", Details::Process(process)) => {
                Some(FieldValue::Float(process.memory_percent.into()))
            }
            ("start_time", Details::Process(_)) => self.timestamp.map(FieldValue::Timestamp),
            ("install_date", Details::InstalledApp(app)) => {
                app.install_date.as_deref().map(FieldValue::Text)
            }
            _ => None,
        }
    }
}

/// Orders records most recent first. The sort is stable, so records with equal timestamps keep
/// the order they were collected in, and records without a timestamp go last.
pub fn sort_most_recent_first(records: &mut [Record]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Counts records per [RecordKind].
pub fn summarize_by_type<'a>(
    records: impl IntoIterator<Item = &'a Record>,
) -> BTreeMap<RecordKind, usize> {
    let mut summary = BTreeMap::new();
    for record in records {
        *summary.entry(record.kind).or_insert(0) += 1;
    }
    summary
}
