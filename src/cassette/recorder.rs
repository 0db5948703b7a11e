//! Decides, per request, between replaying a stored interaction and
//! performing the call live and recording it.

use std::borrow::Cow;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::format::{Interaction, RecordMode, Request, Response};
use super::matcher;
use super::store::CassetteStore;
use crate::client::intercept::{Interceptor, Resolution};
use crate::error::{ReplayError, Result};
use crate::sanitize::Sanitizer;

/// Counters for one recorder's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Requests answered from the cassette.
    pub replayed: usize,
    /// Live interactions appended to the cassette.
    pub recorded: usize,
}

#[derive(Debug, Default)]
struct State {
    interactions: Vec<Interaction>,
    stats: SessionStats,
}

/// Interceptor backed by one cassette.
#[derive(Debug)]
pub struct Recorder {
    store: CassetteStore,
    mode: RecordMode,
    sanitizer: Option<Sanitizer>,
    state: Mutex<State>,
}

impl Recorder {
    /// Load the cassette behind `store`.
    ///
    /// With a sanitizer, live requests are sanitized before matching so
    /// they compare equal to the redacted requests on disk, and new
    /// interactions are sanitized before they are written.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::CassetteIo`] if the cassette cannot be read.
    pub fn load(store: CassetteStore, mode: RecordMode, sanitizer: Option<Sanitizer>) -> Result<Self> {
        let interactions = store.load()?;
        Ok(Self {
            store,
            mode,
            sanitizer,
            state: Mutex::new(State { interactions, stats: SessionStats::default() }),
        })
    }

    /// The mode this recorder was created with.
    #[must_use]
    pub fn mode(&self) -> RecordMode {
        self.mode
    }

    /// Replay and record counts so far.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.state().stats
    }

    /// Every interaction currently in the cassette, including new ones.
    #[must_use]
    pub fn interactions(&self) -> Vec<Interaction> {
        self.state().interactions.clone()
    }

    /// The cassette file this recorder reads and writes.
    #[must_use]
    pub fn store(&self) -> &CassetteStore {
        &self.store
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn match_key<'a>(&self, request: &'a Request) -> Cow<'a, Request> {
        match &self.sanitizer {
            Some(sanitizer) => Cow::Owned(sanitizer.sanitize_request(request)),
            None => Cow::Borrowed(request),
        }
    }
}

impl Interceptor for Recorder {
    fn resolve(&self, request: &Request) -> Result<Resolution> {
        if self.mode == RecordMode::Record {
            return Ok(Resolution::Perform);
        }
        let key = self.match_key(request);
        let mut state = self.state();
        if let Some(found) = matcher::find_match(&state.interactions, &key) {
            let response = found.response.clone();
            state.stats.replayed += 1;
            tracing::debug!(method = %key.method, url = %key.url, "replaying recorded interaction");
            return Ok(Resolution::Replay(response));
        }
        match self.mode {
            RecordMode::ReplayOnly => Err(ReplayError::NoRecordingFound {
                method: key.method.clone(),
                url: key.url.clone(),
            }),
            RecordMode::Once | RecordMode::Record => Ok(Resolution::Perform),
        }
    }

    fn complete(&self, request: &Request, response: &Response) -> Result<()> {
        let captured = Interaction { request: request.clone(), response: response.clone() };
        let interaction = match &self.sanitizer {
            Some(sanitizer) => sanitizer.sanitize(&captured),
            None => captured,
        };
        let mut state = self.state();
        state.interactions.push(interaction);
        if let Err(e) = self.store.save(&state.interactions) {
            state.interactions.pop();
            return Err(e);
        }
        state.stats.recorded += 1;
        tracing::debug!(
            method = %request.method,
            status = response.status,
            total = state.interactions.len(),
            "recorded interaction"
        );
        Ok(())
    }
}
