//! Adapter for `reqwest::blocking`.
//!
//! Mirrors the subset of reqwest's blocking API that issues requests. Use
//! these entry points instead of calling reqwest directly and the calls
//! become recordable.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;

use super::{intercept, ClientAdapter, ClientError, PendingRequest, REQWEST_BLOCKING};
use crate::cassette::format::{Request, Response};
use crate::error::ReplayError;

mod targets {
    pub const REQUEST: &str = "rewind::client::blocking::request";
    pub const GET: &str = "rewind::client::blocking::get";
    pub const POST: &str = "rewind::client::blocking::post";
    pub const PUT: &str = "rewind::client::blocking::put";
    pub const DELETE: &str = "rewind::client::blocking::delete";
    pub const CLIENT_REQUEST: &str = "rewind::client::blocking::Client::request";
    pub const CLIENT_GET: &str = "rewind::client::blocking::Client::get";
    pub const CLIENT_POST: &str = "rewind::client::blocking::Client::post";
    pub const CLIENT_PUT: &str = "rewind::client::blocking::Client::put";
    pub const CLIENT_DELETE: &str = "rewind::client::blocking::Client::delete";
}

/// Adapter producing `reqwest::blocking::Response`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingAdapter;

impl ClientAdapter for BlockingAdapter {
    type Native = reqwest::blocking::Response;

    fn name(&self) -> &'static str {
        REQWEST_BLOCKING
    }

    fn patch_targets(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("request", targets::REQUEST),
            ("get", targets::GET),
            ("post", targets::POST),
            ("put", targets::PUT),
            ("delete", targets::DELETE),
            ("Client.request", targets::CLIENT_REQUEST),
            ("Client.get", targets::CLIENT_GET),
            ("Client.post", targets::CLIENT_POST),
            ("Client.put", targets::CLIENT_PUT),
            ("Client.delete", targets::CLIENT_DELETE),
        ])
    }

    fn build_mock_response(
        &self,
        response: &Response,
    ) -> Result<reqwest::blocking::Response, ReplayError> {
        Ok(reqwest::blocking::Response::from(super::http_response(response)?))
    }
}

/// Start a request with a default client.
pub fn request(method: Method, url: &str) -> RequestBuilder {
    RequestBuilder::new(None, targets::REQUEST, &method, url)
}

/// Start a GET with a default client.
pub fn get(url: &str) -> RequestBuilder {
    RequestBuilder::new(None, targets::GET, &Method::GET, url)
}

/// Start a POST with a default client.
pub fn post(url: &str) -> RequestBuilder {
    RequestBuilder::new(None, targets::POST, &Method::POST, url)
}

/// Start a PUT with a default client.
pub fn put(url: &str) -> RequestBuilder {
    RequestBuilder::new(None, targets::PUT, &Method::PUT, url)
}

/// Start a DELETE with a default client.
pub fn delete(url: &str) -> RequestBuilder {
    RequestBuilder::new(None, targets::DELETE, &Method::DELETE, url)
}

/// Blocking client whose requests are recordable.
#[derive(Debug, Clone, Default)]
pub struct Client {
    inner: reqwest::blocking::Client,
}

impl Client {
    /// A client with reqwest's defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose live requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ClientError> {
        let inner = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }

    /// Wrap an already configured reqwest client.
    #[must_use]
    pub fn from_reqwest(inner: reqwest::blocking::Client) -> Self {
        Self { inner }
    }

    /// Start a request.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.builder(targets::CLIENT_REQUEST, &method, url)
    }

    /// Start a GET.
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.builder(targets::CLIENT_GET, &Method::GET, url)
    }

    /// Start a POST.
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.builder(targets::CLIENT_POST, &Method::POST, url)
    }

    /// Start a PUT.
    pub fn put(&self, url: &str) -> RequestBuilder {
        self.builder(targets::CLIENT_PUT, &Method::PUT, url)
    }

    /// Start a DELETE.
    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.builder(targets::CLIENT_DELETE, &Method::DELETE, url)
    }

    fn builder(&self, target: &'static str, method: &Method, url: &str) -> RequestBuilder {
        RequestBuilder::new(Some(self.inner.clone()), target, method, url)
    }
}

/// Request under construction. Nothing is sent until [`RequestBuilder::send`].
#[derive(Debug)]
#[must_use = "requests are only sent by calling `send`"]
pub struct RequestBuilder {
    client: Option<reqwest::blocking::Client>,
    pending: PendingRequest,
}

impl RequestBuilder {
    fn new(
        client: Option<reqwest::blocking::Client>,
        target: &'static str,
        method: &Method,
        url: &str,
    ) -> Self {
        Self { client, pending: PendingRequest::new(target, method, url) }
    }

    /// Add a header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.pending.header(name, value);
        self
    }

    /// Set `Authorization: Bearer <token>`.
    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", &format!("Bearer {token}"))
    }

    /// Append query parameters to the URL.
    pub fn query(mut self, pairs: &[(&str, &str)]) -> Self {
        self.pending.query(pairs);
        self
    }

    /// Set a text body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.pending.body(body.into());
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.pending.json(value);
        self
    }

    /// Send the request, or replay it when a cassette session matches it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Replay`] for replay failures (including a
    /// replay-only miss), [`ClientError::Http`] for live failures, and
    /// [`ClientError::InvalidRequest`] if the request could not be built.
    pub fn send(self) -> Result<reqwest::blocking::Response, ClientError> {
        let (target, request) = self.pending.finish()?;
        let client = self.client;
        let response = intercept::dispatch(target, &request, |req| {
            perform(&client.unwrap_or_default(), req)
        })?;
        Ok(BlockingAdapter.build_mock_response(&response)?)
    }
}

/// Perform `request` live and capture the full response.
///
/// # Errors
///
/// Returns an error if the request cannot be built or sent, or the body
/// cannot be read.
pub fn perform(
    client: &reqwest::blocking::Client,
    request: &Request,
) -> Result<Response, ClientError> {
    let mut builder = client
        .request(super::method(request)?, request.url.as_str())
        .headers(super::header_map(&request.headers)?);
    if let Some(body) = &request.body {
        builder = builder.body(body.clone());
    }
    let live = builder.send()?;
    let status = live.status().as_u16();
    let headers = super::flatten_headers(live.headers());
    let bytes = live.bytes()?;
    tracing::debug!(method = %request.method, url = %request.url, status, "live request");
    Ok(Response::from_bytes(status, headers, bytes.to_vec()))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::cassette::format::Headers;
    use crate::client::intercept::{install, uninstall, Interceptor, Resolution};
    use crate::test_support::serial;

    struct Stored {
        response: Response,
        seen: Mutex<Vec<Request>>,
    }

    impl Interceptor for Stored {
        fn resolve(&self, request: &Request) -> Result<Resolution, ReplayError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(Resolution::Replay(self.response.clone()))
        }

        fn complete(&self, _: &Request, _: &Response) -> Result<(), ReplayError> {
            Ok(())
        }
    }

    fn stored(response: Response) -> Arc<Stored> {
        Arc::new(Stored { response, seen: Mutex::new(Vec::new()) })
    }

    #[test]
    fn targets_cover_free_functions_and_client_methods() {
        let targets = BlockingAdapter.patch_targets();
        for key in ["request", "get", "post", "put", "delete", "Client.get", "Client.delete"] {
            assert!(targets.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn mock_response_supports_json() {
        let stored = Response::new(200, r#"{"id":1,"name":"ada"}"#)
            .header("content-type", "application/json");
        let native = BlockingAdapter.build_mock_response(&stored).unwrap();
        assert_eq!(native.status().as_u16(), 200);
        assert_eq!(native.headers()["content-type"], "application/json");
        let body: serde_json::Value = native.json().unwrap();
        assert_eq!(body["name"], "ada");
    }

    #[test]
    fn json_on_binary_body_fails_to_decode() {
        let stored = Response::from_bytes(200, Headers::new(), vec![0xff, 0xfe, 0x00]);
        let native = BlockingAdapter.build_mock_response(&stored).unwrap();
        assert!(native.json::<serde_json::Value>().is_err());
    }

    #[test]
    fn free_function_is_replayed() {
        let _lock = serial();
        let interceptor = stored(Response::new(200, "pong"));
        let handle = install(targets::GET, interceptor.clone());

        let response = get("https://api.example.com/ping")
            .bearer_auth("xyz")
            .query(&[("verbose", "1")])
            .send();
        uninstall(handle);

        assert_eq!(response.unwrap().text().unwrap(), "pong");
        let seen = interceptor.seen.lock().unwrap();
        assert_eq!(seen[0].url, "https://api.example.com/ping?verbose=1");
        assert_eq!(seen[0].headers["Authorization"], "Bearer xyz");
    }

    #[test]
    fn client_method_uses_its_own_target() {
        let _lock = serial();
        let handle = install(targets::CLIENT_POST, stored(Response::new(201, "created")));

        let response = Client::new().post("https://api.example.com/users").json(&[1, 2]).send();
        uninstall(handle);

        assert_eq!(response.unwrap().status().as_u16(), 201);
    }
}
