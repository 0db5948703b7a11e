//! HTTP transport port for outbound requests.

use crate::cassette::format::{Request, Response};

/// Error type returned by transports.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Sends one HTTP request and returns the full response.
///
/// Code that takes a `&dyn HttpTransport` instead of building its own
/// client can be recorded and replayed by wrapping the transport in
/// [`crate::client::transport::InterceptedTransport`].
pub trait HttpTransport: Send + Sync {
    /// Perform `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the response
    /// cannot be read. Replay failures surface as a boxed
    /// [`crate::error::ReplayError`].
    fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for Box<T> {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}
