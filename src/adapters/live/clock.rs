//! Live clock using the system clock.

use chrono::{DateTime, FixedOffset, Local};

use crate::ports::clock::Clock;

/// Live clock that returns the real current time in the local offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveClock;

impl Clock for LiveClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}
