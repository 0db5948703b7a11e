//! Clock virtualizer.
//!
//! Every "what time is it" reader in this crate goes through a process-wide
//! stack of frozen instants. While a [`FreezeGuard`] is alive all readers
//! report its instant; dropping the guard restores whatever was live
//! before, which may itself be frozen. Code under test gets frozen time by
//! reading through [`VirtualClock`] (or the free functions here) instead of
//! `chrono::Utc::now()`.
//!
//! The stack is shared by the whole process. At most one test should hold
//! frozen scopes at a time; concurrent tests in one process must serialize
//! themselves.

mod instant;
mod stack;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

pub use instant::{parse, ClockParseError, FreezeAt, TimeFormat};
pub(crate) use stack::FrameKind;

use crate::adapters::live::clock::LiveClock;
use crate::ports::clock::Clock;

/// Freeze every clock reader at `at` until the returned guard is dropped.
///
/// Strings are parsed as ISO-8601.
///
/// # Errors
///
/// Returns [`ClockParseError`] if `at` is malformed text.
pub fn freeze(at: impl Into<FreezeAt>) -> Result<FreezeGuard, ClockParseError> {
    freeze_with(at, TimeFormat::Iso8601)
}

/// Like [`freeze`], parsing text with the given format.
///
/// # Errors
///
/// Returns [`ClockParseError`] if `at` does not match `format`.
pub fn freeze_with(
    at: impl Into<FreezeAt>,
    format: TimeFormat,
) -> Result<FreezeGuard, ClockParseError> {
    let instant = at.into().resolve(format)?;
    Ok(FreezeGuard::push(instant, FrameKind::Scope))
}

/// Keeps the clock frozen while alive. Dropping it, including during a
/// panic unwind, restores the previous instant.
#[must_use = "the clock unfreezes as soon as the guard is dropped"]
#[derive(Debug)]
pub struct FreezeGuard {
    id: u64,
    instant: DateTime<FixedOffset>,
}

impl FreezeGuard {
    pub(crate) fn push(instant: DateTime<FixedOffset>, kind: FrameKind) -> Self {
        let id = stack::push(instant, kind);
        Self { id, instant }
    }

    /// The instant this guard froze the clock at.
    #[must_use]
    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }
}

impl Drop for FreezeGuard {
    fn drop(&mut self) {
        stack::pop(self.id);
    }
}

/// Whether any freeze is currently active.
#[must_use]
pub fn is_frozen() -> bool {
    stack::depth() > 0
}

/// The instant of the innermost active scoped block, if any.
#[must_use]
pub fn enclosing_scope() -> Option<DateTime<FixedOffset>> {
    stack::enclosing_scope()
}

/// Clock that follows the process-wide frozen stack, falling back to the
/// system clock when nothing is frozen.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualClock;

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        stack::current().unwrap_or_else(|| LiveClock.now())
    }
}

/// Clock pinned to one instant, independent of the frozen stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    instant: DateTime<FixedOffset>,
}

impl FixedClock {
    /// Create a clock that always reports `instant`.
    #[must_use]
    pub fn new(instant: DateTime<FixedOffset>) -> Self {
        Self { instant }
    }

    /// Parse `at` as ISO-8601 and pin the clock there.
    ///
    /// # Errors
    ///
    /// Returns [`ClockParseError`] if `at` is malformed text.
    pub fn at(at: impl Into<FreezeAt>) -> Result<Self, ClockParseError> {
        Ok(Self::new(at.into().resolve(TimeFormat::Iso8601)?))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.instant
    }
}

/// Current instant, in the frozen instant's offset when frozen.
#[must_use]
pub fn now() -> DateTime<FixedOffset> {
    VirtualClock.now()
}

/// Current instant in UTC.
#[must_use]
pub fn utc_now() -> DateTime<Utc> {
    VirtualClock.utc_now()
}

/// Today's date in the current instant's offset.
#[must_use]
pub fn today() -> NaiveDate {
    VirtualClock.today()
}

/// Seconds since the Unix epoch.
#[must_use]
pub fn timestamp() -> f64 {
    VirtualClock.timestamp()
}

/// Nanoseconds since the Unix epoch.
#[must_use]
pub fn timestamp_nanos() -> i128 {
    VirtualClock.timestamp_nanos()
}
