use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;

/// Source of the current time for visibility decisions.
///
/// Handlers receive this through `web::Data<Arc<dyn Clock>>` so tests can pin time.
pub trait Clock: Send + Sync {
    /// Current UTC time without offset, matching how timestamps are stored.
    fn now(&self) -> NaiveDateTime;
}

/// Shared handle registered as app data.
pub type ClockRef = Arc<dyn Clock>;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub fn system() -> ClockRef {
    Arc::new(SystemClock)
}
