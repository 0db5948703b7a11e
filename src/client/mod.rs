//! HTTP client adapters.
//!
//! Each supported client surface gets an adapter naming the call paths that
//! issue requests and rebuilding its native response type from a recorded
//! [`Response`]. Every call path routes through [`intercept::dispatch`], so
//! a cassette session only has to install an interceptor on the adapter's
//! targets.

pub mod intercept;
pub mod transport;

#[cfg(feature = "blocking")]
pub mod blocking;
#[cfg(feature = "reqwest")]
pub mod nonblocking;

use std::collections::BTreeMap;

use crate::cassette::format::Response;
use crate::error::ReplayError;

#[cfg(feature = "reqwest")]
use crate::cassette::format::{Headers, Request};

/// Adapter over the crate's own [`crate::ports::HttpTransport`] port.
pub const TRANSPORT: &str = "transport";
/// Adapter over `reqwest::blocking`.
pub const REQWEST_BLOCKING: &str = "reqwest-blocking";
/// Adapter over async `reqwest`.
pub const REQWEST: &str = "reqwest";

/// Uniform contract every client surface implements.
pub trait ClientAdapter {
    /// The client library's own response type.
    type Native;

    /// Adapter name as used in `http_clients`.
    fn name(&self) -> &'static str;

    /// Every call path that issues a request, keyed by short name and
    /// valued by the full path an interceptor is installed on.
    fn patch_targets(&self) -> BTreeMap<&'static str, &'static str>;

    /// Rebuild the library-native response from a stored one.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::InvalidRecording`] when the stored status,
    /// headers, or body cannot be represented natively.
    fn build_mock_response(&self, response: &Response) -> Result<Self::Native, ReplayError>;
}

/// Names of the adapters compiled into this build.
#[must_use]
pub fn available_adapters() -> Vec<&'static str> {
    [
        (TRANSPORT, true),
        (REQWEST_BLOCKING, cfg!(feature = "blocking")),
        (REQWEST, cfg!(feature = "reqwest")),
    ]
    .into_iter()
    .filter_map(|(name, enabled)| enabled.then_some(name))
    .collect()
}

/// Patch targets of the adapter called `name`.
///
/// # Errors
///
/// Returns [`ReplayError::AdapterUnavailable`] for unknown names and for
/// adapters whose feature is not enabled.
pub fn adapter_targets(name: &str) -> Result<BTreeMap<&'static str, &'static str>, ReplayError> {
    match name {
        TRANSPORT => Ok(transport::TransportAdapter.patch_targets()),
        #[cfg(feature = "blocking")]
        REQWEST_BLOCKING => Ok(blocking::BlockingAdapter.patch_targets()),
        #[cfg(feature = "reqwest")]
        REQWEST => Ok(nonblocking::AsyncAdapter.patch_targets()),
        _ => Err(ReplayError::AdapterUnavailable { adapter: name.to_string() }),
    }
}

/// Errors from the reqwest adapters.
#[cfg(feature = "reqwest")]
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Interception failed, e.g. no recording in replay-only mode.
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// The live call failed.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The request could not be assembled.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// A request being assembled by one of the reqwest builders.
#[cfg(feature = "reqwest")]
#[derive(Debug, Clone)]
pub(crate) struct PendingRequest {
    pub(crate) target: &'static str,
    pub(crate) request: Request,
    error: Option<String>,
}

#[cfg(feature = "reqwest")]
impl PendingRequest {
    pub(crate) fn new(target: &'static str, method: &reqwest::Method, url: &str) -> Self {
        Self { target, request: Request::new(method.as_str(), url), error: None }
    }

    pub(crate) fn header(&mut self, name: &str, value: &str) {
        self.request.headers.insert(name.to_string(), value.to_string());
    }

    pub(crate) fn body(&mut self, body: String) {
        self.request.body = Some(body);
    }

    pub(crate) fn json<T: serde::Serialize + ?Sized>(&mut self, value: &T) {
        match serde_json::to_string(value) {
            Ok(body) => {
                self.request
                    .headers
                    .entry("content-type".to_string())
                    .or_insert_with(|| "application/json".to_string());
                self.request.body = Some(body);
            }
            Err(e) => self.fail(format!("json body: {e}")),
        }
    }

    pub(crate) fn query(&mut self, pairs: &[(&str, &str)]) {
        match url::Url::parse(&self.request.url) {
            Ok(mut url) => {
                url.query_pairs_mut().extend_pairs(pairs);
                self.request.url = url.into();
            }
            Err(e) => self.fail(format!("url {:?}: {e}", self.request.url)),
        }
    }

    fn fail(&mut self, reason: String) {
        self.error.get_or_insert(reason);
    }

    /// The assembled request, or the first error hit while building it.
    pub(crate) fn finish(self) -> Result<(&'static str, Request), ClientError> {
        match self.error {
            Some(reason) => Err(ClientError::InvalidRequest(reason)),
            None => Ok((self.target, self.request)),
        }
    }
}

/// Parse a stored method name.
#[cfg(feature = "reqwest")]
pub(crate) fn method(request: &Request) -> Result<reqwest::Method, ClientError> {
    reqwest::Method::from_bytes(request.method.as_bytes())
        .map_err(|e| ClientError::InvalidRequest(format!("method {:?}: {e}", request.method)))
}

/// Turn stored headers into a reqwest header map.
#[cfg(feature = "reqwest")]
pub(crate) fn header_map(headers: &Headers) -> Result<reqwest::header::HeaderMap, ClientError> {
    use reqwest::header::{HeaderName, HeaderValue};

    let mut map = reqwest::header::HeaderMap::new();
    for (name, value) in headers {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::InvalidRequest(format!("header name {name:?}: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::InvalidRequest(format!("header {name}: {e}")))?;
        map.append(header, header_value);
    }
    Ok(map)
}

/// Flatten a header map, joining repeated headers with `", "`.
#[cfg(feature = "reqwest")]
pub(crate) fn flatten_headers(map: &reqwest::header::HeaderMap) -> Headers {
    map.keys()
        .map(|name| {
            let joined = map
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_string(), joined)
        })
        .collect()
}

/// Rebuild an `http::Response` carrying the stored status, headers and body.
#[cfg(feature = "reqwest")]
pub(crate) fn http_response(response: &Response) -> Result<http::Response<Vec<u8>>, ReplayError> {
    let mut builder = http::Response::builder().status(response.status);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(response.body_bytes()?)
        .map_err(|e| ReplayError::InvalidRecording(format!("status {}: {e}", response.status)))
}
