//! Adapter for code written against the [`HttpTransport`] port.

use std::collections::BTreeMap;

use super::{intercept, ClientAdapter, TRANSPORT};
use crate::cassette::format::{Request, Response};
use crate::error::ReplayError;
use crate::ports::http::{HttpTransport, TransportError};

/// Interception target for [`InterceptedTransport::send`].
pub const SEND_TARGET: &str = "rewind::client::transport::InterceptedTransport::send";

/// Adapter whose native response is the uniform [`Response`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportAdapter;

impl ClientAdapter for TransportAdapter {
    type Native = Response;

    fn name(&self) -> &'static str {
        TRANSPORT
    }

    fn patch_targets(&self) -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([("send", SEND_TARGET)])
    }

    fn build_mock_response(&self, response: &Response) -> Result<Response, ReplayError> {
        if response.is_binary {
            response.body_bytes()?;
        }
        Ok(response.clone())
    }
}

/// Wraps a transport so its calls can be recorded and replayed.
///
/// Outside a cassette session every call goes straight to `inner`.
#[derive(Debug, Clone, Default)]
pub struct InterceptedTransport<T> {
    inner: T,
}

impl<T: HttpTransport> InterceptedTransport<T> {
    /// Wrap `inner`.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: HttpTransport> HttpTransport for InterceptedTransport<T> {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let response = intercept::dispatch(SEND_TARGET, request, |req| self.inner.send(req))?;
        Ok(TransportAdapter.build_mock_response(&response)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::client::intercept::{install, uninstall, Interceptor, Resolution};
    use crate::test_support::serial;

    #[derive(Default)]
    struct Echo {
        calls: AtomicUsize,
    }

    impl HttpTransport for Echo {
        fn send(&self, request: &Request) -> Result<Response, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Response::new(200, request.url.clone()))
        }
    }

    struct Miss;

    impl Interceptor for Miss {
        fn resolve(&self, request: &Request) -> Result<Resolution, ReplayError> {
            Err(ReplayError::NoRecordingFound {
                method: request.method.clone(),
                url: request.url.clone(),
            })
        }

        fn complete(&self, _: &Request, _: &Response) -> Result<(), ReplayError> {
            Ok(())
        }
    }

    #[test]
    fn passes_through_without_session() {
        let _lock = serial();
        let transport = InterceptedTransport::new(Echo::default());
        let response = transport.send(&Request::new("GET", "https://a.example/")).unwrap();
        assert_eq!(response.body, "https://a.example/");
        assert_eq!(transport.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn replay_errors_can_be_downcast() {
        let _lock = serial();
        let handle = install(SEND_TARGET, Arc::new(Miss));
        let transport = InterceptedTransport::new(Echo::default());

        let err = transport.send(&Request::new("GET", "https://a.example/")).unwrap_err();
        uninstall(handle);

        let replay = err.downcast_ref::<ReplayError>().unwrap();
        assert!(matches!(replay, ReplayError::NoRecordingFound { .. }));
        assert_eq!(transport.inner().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn corrupt_binary_body_is_rejected() {
        let stored = Response { is_binary: true, ..Response::new(200, "***") };
        assert!(TransportAdapter.build_mock_response(&stored).is_err());
    }
}
