use chrono::{DateTime, Utc};

/// Represents an entity responsible for providing dates across application. A run reads it once,
/// so tests can pin "now" by substituting their own implementation.
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
