//! Error taxonomy for the replay engine.

use std::path::PathBuf;

use thiserror::Error;

pub use crate::clock::ClockParseError;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Errors surfaced by clock freezing and HTTP record/replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// A frozen instant could not be parsed.
    #[error(transparent)]
    ClockParse(#[from] ClockParseError),

    /// Replay-only mode found no stored interaction for a request.
    #[error("no recorded interaction found for {method} {url} (replay_only mode)")]
    NoRecordingFound {
        /// Request method.
        method: String,
        /// Request URL (sanitized form when sanitizing is enabled).
        url: String,
    },

    /// A cassette file could not be read, decoded, or written.
    #[error("cassette {}: {source}", .path.display())]
    CassetteIo {
        /// Cassette file path.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: CassetteIoSource,
    },

    /// The named HTTP client adapter is not compiled in or unknown.
    #[error("HTTP client adapter {adapter:?} is unavailable")]
    AdapterUnavailable {
        /// Adapter name as requested.
        adapter: String,
    },

    /// A stored response cannot be turned back into a client response.
    #[error("recorded response cannot be rebuilt: {0}")]
    InvalidRecording(String),

    /// The configuration map contained an unusable value.
    #[error("invalid replay configuration: {0}")]
    Config(String),
}

/// Underlying cause of a [`ReplayError::CassetteIo`].
#[derive(Debug, Error)]
pub enum CassetteIoSource {
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML encode/decode failure.
    #[cfg(feature = "yaml")]
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// The file declares a format version this crate does not read.
    #[error("unsupported cassette version {0}")]
    Version(u32),
}

impl ReplayError {
    /// Wrap a cassette failure with the cassette path.
    pub(crate) fn cassette(path: impl Into<PathBuf>, source: impl Into<CassetteIoSource>) -> Self {
        Self::CassetteIo { path: path.into(), source: source.into() }
    }
}
