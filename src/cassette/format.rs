//! Cassette data structures for recording and replaying HTTP interactions.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::ReplayError;

/// Cassette file format version written by this crate.
pub const FORMAT_VERSION: u32 = 1;

/// Header map with a deterministic order.
pub type Headers = BTreeMap<String, String>;

/// Outbound request as seen by every client adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Request {
    /// HTTP method, upper case.
    pub method: String,
    /// Absolute URL including the query string.
    pub url: String,
    /// Request headers.
    #[serde(default)]
    pub headers: Headers,
    /// Request body, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Request {
    /// Create a request with no headers and no body.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            url: url.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Response returned by a live call or rebuilt from a cassette.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: Headers,
    /// Body text, or base64 when `is_binary` is set.
    #[serde(default)]
    pub body: String,
    /// Whether `body` holds base64-encoded bytes.
    #[serde(default)]
    pub is_binary: bool,
}

impl Response {
    /// Create a text response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, headers: Headers::new(), body: body.into(), is_binary: false }
    }

    /// Build a response from raw bytes. UTF-8 bodies are kept as text;
    /// anything else is stored base64 with `is_binary` set.
    #[must_use]
    pub fn from_bytes(status: u16, headers: Headers, bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(body) => Self { status, headers, body, is_binary: false },
            Err(err) => Self {
                status,
                headers,
                body: STANDARD.encode(err.into_bytes()),
                is_binary: true,
            },
        }
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The body as raw bytes, decoding base64 for binary bodies.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::InvalidRecording`] if a binary body is not
    /// valid base64.
    pub fn body_bytes(&self) -> Result<Vec<u8>, ReplayError> {
        if self.is_binary {
            STANDARD
                .decode(&self.body)
                .map_err(|e| ReplayError::InvalidRecording(format!("binary body: {e}")))
        } else {
            Ok(self.body.clone().into_bytes())
        }
    }
}

/// One captured request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interaction {
    /// What was sent.
    pub request: Request,
    /// What came back.
    pub response: Response,
}

/// On-disk cassette document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CassetteFile {
    /// Format version, currently [`FORMAT_VERSION`].
    pub version: u32,
    /// Interactions in recording order.
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

impl CassetteFile {
    /// Wrap interactions in a document of the current version.
    #[must_use]
    pub fn new(interactions: Vec<Interaction>) -> Self {
        Self { version: FORMAT_VERSION, interactions }
    }
}

/// How a session treats requests with and without a recorded match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordMode {
    /// Replay on match, otherwise perform live and record.
    #[default]
    Once,
    /// Always perform live and append the result.
    Record,
    /// Never perform live calls; a miss is an error.
    ReplayOnly,
}

impl RecordMode {
    /// The name used in configuration and cassette tooling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Record => "record",
            Self::ReplayOnly => "replay_only",
        }
    }
}

impl fmt::Display for RecordMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown record mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown record mode {0:?} (expected once, record or replay_only)")]
pub struct ParseRecordModeError(pub String);

impl FromStr for RecordMode {
    type Err = ParseRecordModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "once" => Ok(Self::Once),
            "record" => Ok(Self::Record),
            "replay_only" => Ok(Self::ReplayOnly),
            _ => Err(ParseRecordModeError(s.to_string())),
        }
    }
}
