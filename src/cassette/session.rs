//! Scoped HTTP record/replay session.

use std::path::Path;
use std::sync::Arc;

use super::format::RecordMode;
use super::recorder::{Recorder, SessionStats};
use super::store::CassetteStore;
use crate::client::{self, intercept};
use crate::config::ReplayConfig;
use crate::error::Result;
use crate::sanitize::Sanitizer;

/// Routes every configured client through one cassette while alive.
///
/// Dropping the session, including during a panic unwind, removes every
/// interceptor it installed.
#[must_use = "interception stops as soon as the session is dropped"]
pub struct HttpSession {
    cassette: String,
    recorder: Arc<Recorder>,
    handles: Vec<intercept::InstallHandle>,
}

impl HttpSession {
    /// Load `cassette` and intercept the clients named in
    /// `config.http_clients`.
    ///
    /// Adapters that are unknown or not compiled in are skipped with a
    /// warning; calls through them go to the network untouched.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplayError::CassetteIo`] if the cassette exists
    /// but cannot be loaded.
    pub fn start(config: &ReplayConfig, cassette: &str, mode: RecordMode) -> Result<Self> {
        let store = CassetteStore::for_cassette(config, cassette);
        let sanitizer = config.sanitize.then(Sanitizer::new);
        let recorder = Arc::new(Recorder::load(store, mode, sanitizer)?);

        let mut handles = Vec::new();
        for adapter in &config.http_clients {
            match client::adapter_targets(adapter) {
                Ok(targets) => {
                    for target in targets.into_values() {
                        handles.push(intercept::install(target, recorder.clone()));
                    }
                }
                Err(e) => tracing::warn!(adapter = %adapter, error = %e, "HTTP client not intercepted"),
            }
        }
        tracing::debug!(cassette, %mode, targets = handles.len(), "http session started");
        Ok(Self { cassette: cassette.to_string(), recorder, handles })
    }

    /// Cassette name this session was started with.
    #[must_use]
    pub fn cassette(&self) -> &str {
        &self.cassette
    }

    /// File the session reads and writes.
    #[must_use]
    pub fn cassette_path(&self) -> &Path {
        self.recorder.store().path()
    }

    /// Mode the session runs in.
    #[must_use]
    pub fn mode(&self) -> RecordMode {
        self.recorder.mode()
    }

    /// Replay and record counts so far.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.recorder.stats()
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        while let Some(handle) = self.handles.pop() {
            intercept::uninstall(handle);
        }
        let stats = self.recorder.stats();
        tracing::debug!(
            cassette = %self.cassette,
            replayed = stats.replayed,
            recorded = stats.recorded,
            "http session finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::SEND_TARGET;
    use crate::test_support::serial;

    fn config(dir: &tempfile::TempDir, clients: &[&str]) -> ReplayConfig {
        ReplayConfig {
            http_clients: clients.iter().map(|c| (*c).to_string()).collect(),
            ..ReplayConfig::default().recordings_dir(dir.path())
        }
    }

    #[test]
    fn installs_and_removes_interceptors() {
        let _lock = serial();
        let dir = tempfile::tempdir().unwrap();
        let session =
            HttpSession::start(&config(&dir, &["transport"]), "plain", RecordMode::Once).unwrap();

        assert!(intercept::installed_targets().contains(&SEND_TARGET));
        assert_eq!(session.cassette(), "plain");
        assert_eq!(session.cassette_path(), dir.path().join("plain.yaml"));

        drop(session);
        assert!(intercept::installed_targets().is_empty());
    }

    #[test]
    fn unavailable_adapter_is_skipped() {
        let _lock = serial();
        let dir = tempfile::tempdir().unwrap();
        let session =
            HttpSession::start(&config(&dir, &["httpx", "transport"]), "mixed", RecordMode::Record)
                .unwrap();
        assert_eq!(intercept::installed_targets(), vec![SEND_TARGET]);
        assert_eq!(session.mode(), RecordMode::Record);
    }

    #[test]
    fn session_is_removed_on_panic() {
        let _lock = serial();
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir, &["transport"]);
        let result = std::panic::catch_unwind(|| {
            let _session = HttpSession::start(&config, "boom", RecordMode::Once).unwrap();
            panic!("test body failed");
        });
        assert!(result.is_err());
        assert!(intercept::installed_targets().is_empty());
    }

    #[test]
    fn corrupt_cassette_fails_to_start() {
        let _lock = serial();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.yaml"), "version: 99\n").unwrap();
        let result = HttpSession::start(&config(&dir, &["transport"]), "bad", RecordMode::Once);
        assert!(result.is_err());
        assert!(intercept::installed_targets().is_empty());
    }
}
