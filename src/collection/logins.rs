use tracing::{info, instrument};

use crate::{activity_api::ActivitySource, record::{Category, Record}};

use super::{BestEffort, Collector, Gathered};

const DEFAULT_HOST: &str = "localhost";

impl<S: ActivitySource> Collector<S> {
    /// Active sessions plus one `current` record for the user running the tool.
    #[instrument(skip(self))]
    pub fn gather_logins(&self) -> Gathered {
        let mut effort = BestEffort::new(Category::Login);

        let sessions = self.source.sessions();
        let current_host = sessions
            .as_ref()
            .ok()
            .and_then(|sessions| {
                sessions
                    .iter()
                    .find(|session| *session.username == *self.username)
                    .and_then(|session| session.host.clone())
            })
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        effort.attempt("sessions", sessions, |session| {
            Record::session(
                session.username,
                session.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                session.started,
                session.source,
            )
        });
        effort.push(Record::current(
            self.username.clone(),
            current_host,
            self.now,
            "environment",
        ));

        let gathered = effort.finish();
        info!("Collected {} login events", gathered.records.len());
        gathered
    }

    pub fn collect_logins(&self) -> Vec<Record> {
        self.gather_logins().records
    }
}
