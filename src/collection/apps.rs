use tracing::{info, instrument};

use crate::{
    activity_api::ActivitySource,
    record::{Category, InstalledAppDetails, ProcessDetails, Record},
};

use super::{BestEffort, Collector, Gathered};

impl<S: ActivitySource> Collector<S> {
    /// Running processes, stamped with their start time, and installed applications, which have
    /// no timestamp and therefore end up last.
    #[instrument(skip(self))]
    pub fn gather_app_usage(&self) -> Gathered {
        let mut effort = BestEffort::new(Category::AppUsage);

        effort.attempt("running_processes", self.source.running_processes(), |entry| {
            Record::running_process(
                ProcessDetails {
                    name: entry.name.into(),
                    path: entry.exe.to_string_lossy().into(),
                    pid: entry.pid,
                    cpu_percent: entry.cpu_percent,
                    memory_percent: entry.memory_percent,
                },
                entry.started,
                entry.source,
            )
        });
        effort.attempt("installed_apps", self.source.installed_apps(), |entry| {
            Record::installed_app(
                InstalledAppDetails {
                    name: entry.display_name.into(),
                    path: entry.key.into(),
                    install_date: entry.install_date.map(Into::into),
                },
                entry.source,
            )
        });

        let gathered = effort.finish();
        info!("Collected {} application events", gathered.records.len());
        gathered
    }

    pub fn collect_app_usage(&self) -> Vec<Record> {
        self.gather_app_usage().records
    }
}
