//! Capability registration for a host test framework.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use super::{Replay, TimeControl};
use crate::clock::FreezeAt;
use crate::config::ReplayConfig;
use crate::error::Result;

#[cfg(feature = "yaml")]
use super::HttpControl;

/// Name of the frozen-time capability.
pub const TIME: &str = "time";
/// Name of the HTTP record/replay capability.
pub const HTTP: &str = "http";

/// Descriptive metadata shown by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    /// Registry name.
    pub name: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// One-line summary.
    pub description: &'static str,
    /// Cargo features that enable optional capabilities.
    pub optional_features: &'static [&'static str],
}

/// Builds a time control from an instant.
pub type TimeFactory = Box<dyn Fn(FreezeAt) -> TimeControl + Send + Sync>;

/// Builds an HTTP control from a cassette name.
#[cfg(feature = "yaml")]
pub type HttpFactory = Box<dyn Fn(&str) -> HttpControl + Send + Sync>;

/// One capability handed to the host.
pub enum Capability {
    /// `time(instant)`.
    Time(TimeFactory),
    /// `http(cassette_name)`.
    #[cfg(feature = "yaml")]
    Http(HttpFactory),
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time(_) => f.write_str("Capability::Time"),
            #[cfg(feature = "yaml")]
            Self::Http(_) => f.write_str("Capability::Http"),
        }
    }
}

/// Where capabilities are registered.
pub trait CapabilityRegistry {
    /// Record `capability` under `name`, replacing any previous entry.
    fn register(&mut self, name: &'static str, capability: Capability);
}

impl CapabilityRegistry for BTreeMap<&'static str, Capability> {
    fn register(&mut self, name: &'static str, capability: Capability) {
        self.insert(name, capability);
    }
}

/// Exposes `time` and, when cassettes and an HTTP client are compiled in,
/// `http`.
#[derive(Debug, Clone, Default)]
pub struct ReplayPlugin {
    replay: Replay,
}

impl ReplayPlugin {
    /// Plugin with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry metadata.
    #[must_use]
    pub fn info() -> PluginInfo {
        PluginInfo {
            name: "replay",
            version: env!("CARGO_PKG_VERSION"),
            description: "Time freezing and HTTP recording/replay for deterministic testing",
            optional_features: &["yaml", "reqwest", "blocking"],
        }
    }

    /// Read the host's option map. Missing options keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplayError::Config`] if an option is malformed;
    /// the previous configuration stays in effect.
    pub fn initialize(&mut self, options: &Map<String, Value>) -> Result<()> {
        let config = ReplayConfig::from_map(options)?;
        tracing::debug!(recordings_dir = %config.recordings_dir.display(), "replay plugin initialized");
        self.replay = Replay::new(config);
        Ok(())
    }

    /// The facade configured by [`ReplayPlugin::initialize`].
    #[must_use]
    pub fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Whether `http` is offered by this build.
    #[must_use]
    pub fn http_available() -> bool {
        cfg!(all(feature = "yaml", feature = "reqwest"))
    }

    /// The capabilities this build offers, by name.
    #[must_use]
    pub fn capabilities(&self) -> BTreeMap<&'static str, Capability> {
        let mut registry: BTreeMap<&'static str, Capability> = BTreeMap::new();
        self.register(&mut registry);
        registry
    }

    /// Register every capability with `registry`.
    pub fn register(&self, registry: &mut dyn CapabilityRegistry) {
        let replay = self.replay.clone();
        registry.register(TIME, Capability::Time(Box::new(move |at| replay.time(at))));

        #[cfg(all(feature = "yaml", feature = "reqwest"))]
        {
            let replay = self.replay.clone();
            registry.register(HTTP, Capability::Http(Box::new(move |name: &str| replay.http(name))));
        }
    }
}
