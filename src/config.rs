//! Replay configuration supplied by the plugin registry or the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cassette::format::RecordMode;
use crate::clock::TimeFormat;
use crate::error::{ReplayError, Result};

/// Environment variable overriding [`ReplayConfig::recordings_dir`].
pub const RECORDINGS_DIR_ENV: &str = "REWIND_RECORDINGS_DIR";
/// Environment variable overriding [`ReplayConfig::default_http_mode`].
pub const HTTP_MODE_ENV: &str = "REWIND_HTTP_MODE";

/// Options read once at initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Directory holding `<cassette>.yaml` files.
    pub recordings_dir: PathBuf,
    /// Mode used when `http(..)` is called without an explicit mode.
    pub default_http_mode: RecordMode,
    /// How instant strings passed to `time(..)` are parsed.
    pub time_format: TimeFormat,
    /// Timeout for clients this crate constructs itself, in seconds.
    #[serde(with = "seconds")]
    pub http_timeout: Duration,
    /// Whether interactions are sanitized before they are persisted.
    pub sanitize: bool,
    /// Client adapters to intercept, by adapter name.
    pub http_clients: Vec<String>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            recordings_dir: PathBuf::from("tests/recordings"),
            default_http_mode: RecordMode::Once,
            time_format: TimeFormat::Iso8601,
            http_timeout: Duration::from_secs(30),
            sanitize: true,
            http_clients: crate::client::available_adapters()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl ReplayConfig {
    /// Build a config from a registry-supplied option map. Missing keys
    /// take their defaults; unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Config`] when a recognized option has the
    /// wrong shape (e.g. an unknown mode name).
    pub fn from_map(options: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        serde_json::from_value(serde_json::Value::Object(options.clone()))
            .map_err(|e| ReplayError::Config(e.to_string()))
    }

    /// Apply `REWIND_RECORDINGS_DIR` and `REWIND_HTTP_MODE` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Config`] if `REWIND_HTTP_MODE` is not a mode name.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup(RECORDINGS_DIR_ENV).filter(|d| !d.is_empty()) {
            self.recordings_dir = PathBuf::from(dir);
        }
        if let Some(mode) = lookup(HTTP_MODE_ENV).filter(|m| !m.is_empty()) {
            self.default_http_mode =
                mode.parse().map_err(|e| ReplayError::Config(format!("{HTTP_MODE_ENV}: {e}")))?;
        }
        Ok(self)
    }

    /// Use a different recordings directory.
    #[must_use]
    pub fn recordings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recordings_dir = dir.into();
        self
    }

    /// Resolve a cassette name to its file path.
    #[must_use]
    pub fn cassette_path(&self, name: &str) -> PathBuf {
        cassette_path_in(&self.recordings_dir, name)
    }
}

/// Resolve a cassette name to `<dir>/<name>.yaml`.
#[must_use]
pub fn cassette_path_in(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.yaml"))
}

mod seconds {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(D::Error::custom("http_timeout must be a non-negative number of seconds"));
        }
        Duration::try_from_secs_f64(secs)
            .map_err(|e| D::Error::custom(format!("http_timeout out of range: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_map_yields_defaults() {
        let config = ReplayConfig::from_map(&serde_json::Map::new()).unwrap();
        assert_eq!(config.recordings_dir, PathBuf::from("tests/recordings"));
        assert_eq!(config.default_http_mode, RecordMode::Once);
        assert_eq!(config.time_format, TimeFormat::Iso8601);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.sanitize);
        assert!(config.http_clients.iter().any(|c| c == "transport"));
    }

    #[test]
    fn recognized_options_are_read() {
        let config = ReplayConfig::from_map(&map(json!({
            "recordings_dir": "fixtures/http",
            "default_http_mode": "replay_only",
            "time_format": "rfc2822",
            "http_timeout": 5,
            "unrelated_option": true,
        })))
        .unwrap();
        assert_eq!(config.recordings_dir, PathBuf::from("fixtures/http"));
        assert_eq!(config.default_http_mode, RecordMode::ReplayOnly);
        assert_eq!(config.time_format, TimeFormat::Rfc2822);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn bad_mode_is_a_config_error() {
        let err = ReplayConfig::from_map(&map(json!({"default_http_mode": "sometimes"})))
            .unwrap_err();
        assert!(matches!(err, ReplayError::Config(_)));
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let err = ReplayConfig::from_map(&map(json!({"http_timeout": -1}))).unwrap_err();
        assert!(err.to_string().contains("http_timeout"));
    }

    #[test]
    fn oversized_timeout_is_rejected() {
        let err = ReplayConfig::from_map(&map(json!({"http_timeout": 1e20}))).unwrap_err();
        assert!(matches!(err, ReplayError::Config(_)));
        assert!(err.to_string().contains("http_timeout"));
    }

    #[test]
    fn env_overrides_apply() {
        let config = ReplayConfig::default()
            .apply_overrides(|key| match key {
                RECORDINGS_DIR_ENV => Some("/tmp/cassettes".into()),
                HTTP_MODE_ENV => Some("record".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.recordings_dir, PathBuf::from("/tmp/cassettes"));
        assert_eq!(config.default_http_mode, RecordMode::Record);
    }

    #[test]
    fn invalid_env_mode_is_reported() {
        let err = ReplayConfig::default()
            .apply_overrides(|key| (key == HTTP_MODE_ENV).then(|| "never".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(HTTP_MODE_ENV));
    }

    #[test]
    fn cassette_path_appends_yaml_extension() {
        let config = ReplayConfig::default().recordings_dir("rec");
        assert_eq!(config.cassette_path("user_fetch"), PathBuf::from("rec/user_fetch.yaml"));
    }
}
