//! Wall-clock source used for prefixes and slot names

use chrono::{DateTime, Local};

/// Supplies the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
