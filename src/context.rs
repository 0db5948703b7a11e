//! Service context bundling the port trait objects.

use crate::clock::VirtualClock;
use crate::ports::clock::Clock;
use crate::ports::http::HttpTransport;

/// Bundles the nondeterministic boundaries code under test depends on.
///
/// Code that reads time and performs HTTP through a context instead of
/// calling chrono or a client directly can be frozen and replayed by
/// swapping the context, or by running inside a replay scope when built
/// with [`ServiceContext::live`].
pub struct ServiceContext {
    /// Clock for obtaining the current time.
    pub clock: Box<dyn Clock>,
    /// Transport for outbound HTTP.
    pub http: Box<dyn HttpTransport>,
}

impl ServiceContext {
    /// Assemble a context from explicit adapters.
    #[must_use]
    pub fn new(clock: Box<dyn Clock>, http: Box<dyn HttpTransport>) -> Self {
        Self { clock, http }
    }

    /// Real time and real network, both following active replay scopes:
    /// the clock reads the frozen stack and the transport is intercepted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplayError::Config`] if the HTTP client cannot be
    /// built with the configured timeout.
    #[cfg(feature = "blocking")]
    pub fn live(config: &crate::config::ReplayConfig) -> crate::error::Result<Self> {
        use crate::adapters::live::http::LiveTransport;
        use crate::client::transport::InterceptedTransport;

        let transport = LiveTransport::with_timeout(config.http_timeout)
            .map_err(|e| crate::error::ReplayError::Config(format!("http client: {e}")))?;
        Ok(Self::new(Box::new(VirtualClock), Box::new(InterceptedTransport::new(transport))))
    }

    /// A context whose clock follows replay scopes and whose transport is
    /// `http` wrapped for interception.
    #[must_use]
    pub fn virtualized<T: HttpTransport + 'static>(http: T) -> Self {
        Self::new(
            Box::new(VirtualClock),
            Box::new(crate::client::transport::InterceptedTransport::new(http)),
        )
    }
}
