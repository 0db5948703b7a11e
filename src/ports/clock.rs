//! Clock port for obtaining the current time.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Provides the current time.
///
/// Abstracting time access allows deterministic tests by substituting a
/// frozen clock. Only [`Clock::now`] is required; every other reader is
/// derived from it so a frozen `now` freezes them all.
pub trait Clock: Send + Sync {
    /// Returns the current instant with its UTC offset.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Returns the current instant in UTC.
    fn utc_now(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }

    /// Returns today's date in the offset of [`Clock::now`].
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Returns seconds since the Unix epoch, with sub-second precision.
    #[allow(clippy::cast_precision_loss)]
    fn timestamp(&self) -> f64 {
        let now = self.now();
        now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9
    }

    /// Returns nanoseconds since the Unix epoch.
    fn timestamp_nanos(&self) -> i128 {
        let now = self.now();
        i128::from(now.timestamp()) * 1_000_000_000 + i128::from(now.timestamp_subsec_nanos())
    }
}
