use chrono::{DateTime, Utc};

/// Source of "now" for the publication rule.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
