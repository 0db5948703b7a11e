//! Test-facing entry point.
//!
//! [`Replay`] hands out controls for frozen time and HTTP cassettes. Every
//! control works as a scope (`enter`, returning a guard) or as a one-shot
//! wrapper around a closure or future (`run`, `run_async`, `wrap`).
//!
//! ```
//! use rewind::replay::Replay;
//!
//! let replay = Replay::default();
//! let _frozen = replay.time("2024-01-01T00:00:00Z").enter()?;
//! let stamp = replay.time("2030-06-01T00:00:00Z").run(rewind::clock::now)?;
//! // The wrapper defers to the enclosing scope.
//! assert_eq!(stamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");
//! # Ok::<(), rewind::ReplayError>(())
//! ```

pub mod plugin;

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::clock::{self, FrameKind, FreezeAt, FreezeGuard, TimeFormat};
use crate::config::ReplayConfig;
use crate::error::Result;

#[cfg(feature = "yaml")]
use crate::cassette::{HttpSession, RecordMode};

/// Factory for time and HTTP controls sharing one configuration.
#[derive(Debug, Clone, Default)]
pub struct Replay {
    config: Arc<ReplayConfig>,
}

impl Replay {
    /// Controls built from `config`.
    #[must_use]
    pub fn new(config: ReplayConfig) -> Self {
        Self { config: Arc::new(config) }
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Freeze the clock at `at`.
    pub fn time(&self, at: impl Into<FreezeAt>) -> TimeControl {
        TimeControl { at: at.into(), format: self.config.time_format }
    }

    /// Record or replay HTTP calls against the cassette `name`, in the
    /// configured default mode unless [`HttpControl::mode`] overrides it.
    #[cfg(feature = "yaml")]
    pub fn http(&self, name: impl Into<String>) -> HttpControl {
        HttpControl {
            config: Arc::clone(&self.config),
            cassette: name.into(),
            mode: self.config.default_http_mode,
        }
    }

    /// Frozen time and a cassette together; either may be omitted.
    #[cfg(feature = "yaml")]
    pub fn with(&self, options: ReplayOptions) -> ReplayControl {
        let http = options.http.map(|name| {
            let control = self.http(name);
            match options.mode {
                Some(mode) => control.mode(mode),
                None => control,
            }
        });
        ReplayControl { time: options.time.map(|at| self.time(at)), http }
    }
}

/// Freezes the clock at one instant.
#[derive(Debug, Clone)]
pub struct TimeControl {
    at: FreezeAt,
    format: TimeFormat,
}

impl TimeControl {
    /// Freeze until the guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplayError::ClockParse`] for a malformed instant.
    pub fn enter(&self) -> Result<FreezeGuard> {
        Ok(clock::freeze_with(self.at.clone(), self.format)?)
    }

    /// Run `f` with the clock frozen.
    ///
    /// Inside an active scope (`enter`) the scope's instant is used
    /// instead of this control's own.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplayError::ClockParse`] for a malformed instant;
    /// `f` is not called.
    pub fn run<T>(&self, f: impl FnOnce() -> T) -> Result<T> {
        let _guard = self.wrapper_guard()?;
        Ok(f())
    }

    /// Await `fut` with the clock frozen, with the same precedence as
    /// [`TimeControl::run`].
    ///
    /// # Errors
    ///
    /// Same as [`TimeControl::run`].
    pub async fn run_async<F: Future>(&self, fut: F) -> Result<F::Output> {
        let _guard = self.wrapper_guard()?;
        Ok(fut.await)
    }

    /// Turn `f` into a closure that runs frozen on every call.
    pub fn wrap<F, T>(self, f: F) -> impl Fn() -> Result<T>
    where
        F: Fn() -> T,
    {
        move || self.run(&f)
    }

    /// The instant a wrapper would freeze at right now.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplayError::ClockParse`] for a malformed instant
    /// when no scope is active.
    pub fn effective_instant(&self) -> Result<DateTime<FixedOffset>> {
        match clock::enclosing_scope() {
            Some(instant) => Ok(instant),
            None => Ok(self.at.resolve(self.format)?),
        }
    }

    fn wrapper_guard(&self) -> Result<FreezeGuard> {
        Ok(FreezeGuard::push(self.effective_instant()?, FrameKind::Wrapper))
    }
}

/// Records or replays HTTP calls against one cassette.
#[cfg(feature = "yaml")]
#[derive(Debug, Clone)]
pub struct HttpControl {
    config: Arc<ReplayConfig>,
    cassette: String,
    mode: RecordMode,
}

#[cfg(feature = "yaml")]
impl HttpControl {
    /// Use `mode` instead of the configured default.
    #[must_use]
    pub fn mode(mut self, mode: RecordMode) -> Self {
        self.mode = mode;
        self
    }

    /// The mode sessions will run in.
    #[must_use]
    pub fn record_mode(&self) -> RecordMode {
        self.mode
    }

    /// Intercept until the session is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplayError::CassetteIo`] if the cassette cannot be
    /// loaded.
    pub fn enter(&self) -> Result<HttpSession> {
        HttpSession::start(&self.config, &self.cassette, self.mode)
    }

    /// Run `f` inside a session.
    ///
    /// # Errors
    ///
    /// Same as [`HttpControl::enter`]; `f` is not called on error.
    pub fn run<T>(&self, f: impl FnOnce() -> T) -> Result<T> {
        let _session = self.enter()?;
        Ok(f())
    }

    /// Await `fut` inside a session.
    ///
    /// # Errors
    ///
    /// Same as [`HttpControl::enter`].
    pub async fn run_async<F: Future>(&self, fut: F) -> Result<F::Output> {
        let _session = self.enter()?;
        Ok(fut.await)
    }

    /// Turn `f` into a closure that runs in a fresh session on every call.
    pub fn wrap<F, T>(self, f: F) -> impl Fn() -> Result<T>
    where
        F: Fn() -> T,
    {
        move || self.run(&f)
    }
}

/// Arguments to [`Replay::with`].
#[cfg(feature = "yaml")]
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Instant to freeze at.
    pub time: Option<FreezeAt>,
    /// Cassette name.
    pub http: Option<String>,
    /// Record mode, defaulting to the configured one.
    pub mode: Option<RecordMode>,
}

/// Frozen time and a cassette applied together.
#[cfg(feature = "yaml")]
#[derive(Debug, Clone)]
pub struct ReplayControl {
    time: Option<TimeControl>,
    http: Option<HttpControl>,
}

/// Guards held by [`ReplayControl::enter`]. The cassette session is
/// released before the clock is unfrozen.
#[cfg(feature = "yaml")]
#[must_use = "replay stops as soon as the scope is dropped"]
pub struct ReplayScope {
    // Field order is drop order.
    http: Option<HttpSession>,
    time: Option<FreezeGuard>,
}

#[cfg(feature = "yaml")]
impl ReplayScope {
    /// The active cassette session, if one was requested.
    #[must_use]
    pub fn http(&self) -> Option<&HttpSession> {
        self.http.as_ref()
    }

    /// The active freeze, if one was requested.
    #[must_use]
    pub fn time(&self) -> Option<&FreezeGuard> {
        self.time.as_ref()
    }
}

#[cfg(feature = "yaml")]
impl ReplayControl {
    /// Freeze the clock, then start the session.
    ///
    /// # Errors
    ///
    /// Returns the first failure; anything already entered is released.
    pub fn enter(&self) -> Result<ReplayScope> {
        let time = self.time.as_ref().map(TimeControl::enter).transpose()?;
        let http = self.http.as_ref().map(HttpControl::enter).transpose()?;
        Ok(ReplayScope { http, time })
    }

    /// Run `f` frozen and inside a session. The freeze follows the
    /// one-shot precedence of [`TimeControl::run`].
    ///
    /// # Errors
    ///
    /// Same as [`ReplayControl::enter`]; `f` is not called on error.
    pub fn run<T>(&self, f: impl FnOnce() -> T) -> Result<T> {
        let _scope = self.wrapper_scope()?;
        Ok(f())
    }

    /// Await `fut` frozen and inside a session.
    ///
    /// # Errors
    ///
    /// Same as [`ReplayControl::enter`].
    pub async fn run_async<F: Future>(&self, fut: F) -> Result<F::Output> {
        let _scope = self.wrapper_scope()?;
        Ok(fut.await)
    }

    /// Turn `f` into a closure that runs under both controls on every call.
    pub fn wrap<F, T>(self, f: F) -> impl Fn() -> Result<T>
    where
        F: Fn() -> T,
    {
        move || self.run(&f)
    }

    fn wrapper_scope(&self) -> Result<ReplayScope> {
        let time = self.time.as_ref().map(TimeControl::wrapper_guard).transpose()?;
        let http = self.http.as_ref().map(HttpControl::enter).transpose()?;
        Ok(ReplayScope { http, time })
    }
}
