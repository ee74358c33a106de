//! Wall clock.

use chrono::{DateTime, Utc};

use blogicum_core::ports::Clock;

/// The system clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
