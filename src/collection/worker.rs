//! Runs collection off the async thread and reports progress through a channel.

use tokio::sync::mpsc;
use tracing::{error, instrument};

use crate::{
    activity_api::ActivitySource,
    record::{Category, Record},
};

use super::Collector;

/// Which categories to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub logins: bool,
    pub file_shares: bool,
    pub app_usage: bool,
}

impl Selection {
    pub fn all() -> Self {
        Self {
            logins: true,
            file_shares: true,
            app_usage: true,
        }
    }

    pub fn contains(&self, category: Category) -> bool {
        match category {
            Category::Login => self.logins,
            Category::FileAccess => self.file_shares,
            Category::AppUsage => self.app_usage,
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL.into_iter().filter(|c| self.contains(*c))
    }

    pub fn is_empty(&self) -> bool {
        self.categories().next().is_none()
    }
}

/// Output of a collection run. Unselected categories stay empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollectedData {
    pub logins: Vec<Record>,
    pub file_shares: Vec<Record>,
    pub app_usage: Vec<Record>,
}

impl CollectedData {
    pub fn get(&self, category: Category) -> &[Record] {
        match category {
            Category::Login => &self.logins,
            Category::FileAccess => &self.file_shares,
            Category::AppUsage => &self.app_usage,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut Vec<Record> {
        match category {
            Category::Login => &mut self.logins,
            Category::FileAccess => &mut self.file_shares,
            Category::AppUsage => &mut self.app_usage,
        }
    }

    pub fn total(&self) -> usize {
        self.logins.len() + self.file_shares.len() + self.app_usage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.logins
            .iter()
            .chain(self.file_shares.iter())
            .chain(self.app_usage.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectionEvent {
    Started(Category),
    Collected {
        category: Category,
        count: usize,
        /// Number of sub-sources that failed and contributed nothing.
        suppressed: usize,
    },
    Finished(CollectedData),
    Failed(String),
}

const CHANNEL_CAPACITY: usize = 16;

/// Collects every selected category on the blocking pool. The receiver always ends with either
/// [CollectionEvent::Finished] or [CollectionEvent::Failed], unless it is dropped early, in which
/// case the remaining work is still done but nobody hears about it.
pub fn spawn_collection<S>(
    collector: Collector<S>,
    selection: Selection,
) -> mpsc::Receiver<CollectionEvent>
where
    S: ActivitySource + 'static,
{
    let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
    let failure_sender = sender.clone();

    tokio::spawn(async move {
        let result =
            tokio::task::spawn_blocking(move || run_collection(&collector, selection, &sender))
                .await;
        if let Err(e) = result {
            error!("Collection worker stopped unexpectedly {e:?}");
            let _ = failure_sender
                .send(CollectionEvent::Failed(format!("Collection failed: {e}")))
                .await;
        }
    });

    receiver
}

#[instrument(skip_all)]
fn run_collection<S: ActivitySource>(
    collector: &Collector<S>,
    selection: Selection,
    sender: &mpsc::Sender<CollectionEvent>,
) {
    let mut data = CollectedData::default();
    for category in selection.categories() {
        // A closed channel only means nobody is listening anymore.
        let _ = sender.blocking_send(CollectionEvent::Started(category));
        let gathered = collector.gather(category);
        let _ = sender.blocking_send(CollectionEvent::Collected {
            category,
            count: gathered.records.len(),
            suppressed: gathered.suppressed.len(),
        });
        *data.get_mut(category) = gathered.records;
    }
    let _ = sender.blocking_send(CollectionEvent::Finished(data));
}
