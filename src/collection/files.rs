use tracing::{info, instrument};

use crate::{
    activity_api::ActivitySource,
    record::{Category, Record, RecordKind},
};

use super::{BestEffort, Collector, Gathered};

impl<S: ActivitySource> Collector<S> {
    /// Recent files, attached network volumes and previously mounted shares.
    ///
    /// Mounted shares have no timestamp of their own and are stamped with the collection time.
    #[instrument(skip(self))]
    pub fn gather_file_shares(&self) -> Gathered {
        let mut effort = BestEffort::new(Category::FileAccess);

        effort.attempt("recent_files", self.source.recent_files(), |entry| {
            Record::file(RecordKind::RecentFile, entry.path, entry.accessed, entry.source)
        });
        effort.attempt("network_volumes", self.source.network_volumes(), |entry| {
            Record::file(RecordKind::NetworkDrive, entry.path, entry.modified, entry.source)
        });
        effort.attempt("share_history", self.source.share_history(), |entry| {
            Record::file(RecordKind::MountedShare, entry.path, self.now, entry.source)
        });

        let gathered = effort.finish();
        info!("Collected {} file shares", gathered.records.len());
        gathered
    }

    pub fn collect_file_shares(&self) -> Vec<Record> {
        self.gather_file_shares().records
    }
}
