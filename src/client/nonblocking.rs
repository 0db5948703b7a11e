//! Adapter for async `reqwest`.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;

use super::{intercept, ClientAdapter, ClientError, PendingRequest, REQWEST};
use crate::cassette::format::{Request, Response};
use crate::error::ReplayError;

mod targets {
    pub const REQUEST: &str = "rewind::client::nonblocking::request";
    pub const GET: &str = "rewind::client::nonblocking::get";
    pub const POST: &str = "rewind::client::nonblocking::post";
    pub const PUT: &str = "rewind::client::nonblocking::put";
    pub const DELETE: &str = "rewind::client::nonblocking::delete";
    pub const CLIENT_REQUEST: &str = "rewind::client::nonblocking::AsyncClient::request";
    pub const CLIENT_GET: &str = "rewind::client::nonblocking::AsyncClient::get";
    pub const CLIENT_POST: &str = "rewind::client::nonblocking::AsyncClient::post";
    pub const CLIENT_PUT: &str = "rewind::client::nonblocking::AsyncClient::put";
    pub const CLIENT_DELETE: &str = "rewind::client::nonblocking::AsyncClient::delete";
}

/// Adapter producing `reqwest::Response`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncAdapter;

impl ClientAdapter for AsyncAdapter {
    type Native = reqwest::Response;

    fn name(&self) -> &'static str {
        REQWEST
    }

    fn patch_targets(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("request", targets::REQUEST),
            ("get", targets::GET),
            ("post", targets::POST),
            ("put", targets::PUT),
            ("delete", targets::DELETE),
            ("AsyncClient.request", targets::CLIENT_REQUEST),
            ("AsyncClient.get", targets::CLIENT_GET),
            ("AsyncClient.post", targets::CLIENT_POST),
            ("AsyncClient.put", targets::CLIENT_PUT),
            ("AsyncClient.delete", targets::CLIENT_DELETE),
        ])
    }

    fn build_mock_response(&self, response: &Response) -> Result<reqwest::Response, ReplayError> {
        Ok(reqwest::Response::from(super::http_response(response)?))
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

/// Async client whose requests are recordable.
#[derive(Debug, Clone, Default)]
pub struct AsyncClient {
    inner: reqwest::Client,
}

impl AsyncClient {
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
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }

    /// Wrap an already configured reqwest client.
    #[must_use]
    pub fn from_reqwest(inner: reqwest::Client) -> Self {
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
#[must_use = "requests are only sent by awaiting `send`"]
pub struct RequestBuilder {
    client: Option<reqwest::Client>,
    pending: PendingRequest,
}

impl RequestBuilder {
    fn new(client: Option<reqwest::Client>, target: &'static str, method: &Method, url: &str) -> Self {
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
    /// Same as [`crate::client::blocking::RequestBuilder::send`].
    pub async fn send(self) -> Result<reqwest::Response, ClientError> {
        let (target, request) = self.pending.finish()?;
        let client = self.client.unwrap_or_default();
        let response =
            intercept::dispatch_async(target, &request, || perform(&client, &request)).await?;
        Ok(AsyncAdapter.build_mock_response(&response)?)
    }
}

/// Perform `request` live and capture the full response.
///
/// # Errors
///
/// Returns an error if the request cannot be built or sent, or the body
/// cannot be read.
pub async fn perform(client: &reqwest::Client, request: &Request) -> Result<Response, ClientError> {
    let mut builder = client
        .request(super::method(request)?, request.url.as_str())
        .headers(super::header_map(&request.headers)?);
    if let Some(body) = &request.body {
        builder = builder.body(body.clone());
    }
    let live = builder.send().await?;
    let status = live.status().as_u16();
    let headers = super::flatten_headers(live.headers());
    let bytes = live.bytes().await?;
    tracing::debug!(method = %request.method, url = %request.url, status, "live request");
    Ok(Response::from_bytes(status, headers, bytes.to_vec()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::intercept::{install, uninstall, Interceptor, Resolution};
    use crate::test_support::serial;

    struct Always(Response);

    impl Interceptor for Always {
        fn resolve(&self, _: &Request) -> Result<Resolution, ReplayError> {
            Ok(Resolution::Replay(self.0.clone()))
        }

        fn complete(&self, _: &Request, _: &Response) -> Result<(), ReplayError> {
            Ok(())
        }
    }

    #[test]
    fn targets_include_async_client_methods() {
        let targets = AsyncAdapter.patch_targets();
        assert_eq!(targets.len(), 10);
        assert_eq!(targets["AsyncClient.put"], targets::CLIENT_PUT);
    }

    #[tokio::test]
    async fn mock_response_json_is_awaited() {
        let stored = Response::new(200, r#"{"items":[1,2,3]}"#);
        let native = AsyncAdapter.build_mock_response(&stored).unwrap();
        let body: serde_json::Value = native.json().await.unwrap();
        assert_eq!(body["items"][2], 3);
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let native = AsyncAdapter.build_mock_response(&Response::new(200, "<html>")).unwrap();
        let err = native.json::<serde_json::Value>().await.unwrap_err();
        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn free_function_is_replayed() {
        let _lock = serial();
        let handle = install(targets::DELETE, Arc::new(Always(Response::new(204, ""))));
        let response = delete("https://api.example.com/users/7").send().await;
        uninstall(handle);
        assert_eq!(response.unwrap().status().as_u16(), 204);
    }
}
