//! Live adapter for the `HttpTransport` port using blocking reqwest.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::cassette::format::{Request, Response};
use crate::ports::http::{HttpTransport, TransportError};

/// Transport that performs real network requests.
pub struct LiveTransport {
    client: Client,
}

impl LiveTransport {
    /// Creates a transport around reqwest's default blocking client.
    #[must_use]
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self { client: Client::builder().timeout(timeout).build()? })
    }

    /// Wraps an existing blocking client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for LiveTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for LiveTransport {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        crate::client::blocking::perform(&self.client, request).map_err(Into::into)
    }
}
