//! Process-wide interception slot.
//!
//! Every adapter call site funnels through [`dispatch`] (or
//! [`dispatch_async`]) with its patch target. When an interceptor is
//! installed on that target it decides whether the call is replayed or
//! performed; otherwise the call goes straight to the network.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cassette::format::{Request, Response};
use crate::error::ReplayError;

/// What an interceptor wants done with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Return this stored response without touching the network.
    Replay(Response),
    /// Perform the call live, then hand the result to [`Interceptor::complete`].
    Perform,
}

/// Decides the fate of intercepted requests.
pub trait Interceptor: Send + Sync {
    /// Called before the request is sent.
    ///
    /// # Errors
    ///
    /// Returns an error to abort the call, e.g. a replay-only miss.
    fn resolve(&self, request: &Request) -> Result<Resolution, ReplayError>;

    /// Called with the live response after a [`Resolution::Perform`].
    ///
    /// # Errors
    ///
    /// Returns an error if the interaction cannot be persisted.
    fn complete(&self, request: &Request, response: &Response) -> Result<(), ReplayError>;
}

/// Identifies one installation for [`uninstall`].
#[derive(Debug, PartialEq, Eq)]
pub struct InstallHandle {
    id: u64,
    target: &'static str,
}

impl InstallHandle {
    /// The patch target this handle was installed on.
    #[must_use]
    pub fn target(&self) -> &'static str {
        self.target
    }
}

struct Installed {
    id: u64,
    target: &'static str,
    interceptor: Arc<dyn Interceptor>,
}

static INSTALLED: Mutex<Vec<Installed>> = Mutex::new(Vec::new());
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn installed() -> MutexGuard<'static, Vec<Installed>> {
    INSTALLED.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Route calls made through `target` to `interceptor` until uninstalled.
pub fn install(target: &'static str, interceptor: Arc<dyn Interceptor>) -> InstallHandle {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    installed().push(Installed { id, target, interceptor });
    tracing::debug!(target_path = target, "interceptor installed");
    InstallHandle { id, target }
}

/// Remove one installation. Other installations on the same target stay.
pub fn uninstall(handle: InstallHandle) {
    let mut entries = installed();
    if let Some(index) = entries.iter().rposition(|e| e.id == handle.id) {
        entries.remove(index);
        tracing::debug!(target_path = handle.target, "interceptor removed");
    }
}

/// The most recently installed interceptor for `target`.
#[must_use]
pub fn lookup(target: &str) -> Option<Arc<dyn Interceptor>> {
    installed().iter().rev().find(|e| e.target == target).map(|e| Arc::clone(&e.interceptor))
}

/// Every target that currently has an interceptor, in installation order.
#[must_use]
pub fn installed_targets() -> Vec<&'static str> {
    installed().iter().map(|e| e.target).collect()
}

/// Run `live` for `request` unless an interceptor on `target` replays it.
///
/// # Errors
///
/// Propagates the interceptor's errors and those of `live`.
pub fn dispatch<E, F>(target: &str, request: &Request, live: F) -> Result<Response, E>
where
    E: From<ReplayError>,
    F: FnOnce(&Request) -> Result<Response, E>,
{
    let Some(interceptor) = lookup(target) else {
        return live(request);
    };
    match interceptor.resolve(request)? {
        Resolution::Replay(response) => Ok(response),
        Resolution::Perform => {
            let response = live(request)?;
            interceptor.complete(request, &response)?;
            Ok(response)
        }
    }
}

/// Async form of [`dispatch`]. No lock is held while `live` is awaited.
///
/// # Errors
///
/// Propagates the interceptor's errors and those of `live`.
pub async fn dispatch_async<E, F, Fut>(target: &str, request: &Request, live: F) -> Result<Response, E>
where
    E: From<ReplayError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Response, E>>,
{
    let Some(interceptor) = lookup(target) else {
        return live().await;
    };
    match interceptor.resolve(request)? {
        Resolution::Replay(response) => Ok(response),
        Resolution::Perform => {
            let response = live().await?;
            interceptor.complete(request, &response)?;
            Ok(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serial;

    const TARGET: &str = "tests::intercept::send";

    #[derive(Default)]
    struct Canned {
        replay: Option<Response>,
        completed: Mutex<Vec<Response>>,
    }

    impl Interceptor for Canned {
        fn resolve(&self, _request: &Request) -> Result<Resolution, ReplayError> {
            Ok(self.replay.clone().map_or(Resolution::Perform, Resolution::Replay))
        }

        fn complete(&self, _request: &Request, response: &Response) -> Result<(), ReplayError> {
            self.completed.lock().unwrap().push(response.clone());
            Ok(())
        }
    }

    fn request() -> Request {
        Request::new("GET", "https://api.example.com/ping")
    }

    fn live(_: &Request) -> Result<Response, ReplayError> {
        Ok(Response::new(200, "live"))
    }

    #[test]
    fn no_interceptor_goes_live() {
        let _lock = serial();
        let response = dispatch(TARGET, &request(), live).unwrap();
        assert_eq!(response.body, "live");
    }

    #[test]
    fn replay_skips_live_call() {
        let _lock = serial();
        let canned = Arc::new(Canned { replay: Some(Response::new(200, "stored")), ..Canned::default() });
        let handle = install(TARGET, canned.clone());

        let response = dispatch(TARGET, &request(), |_| -> Result<Response, ReplayError> {
            panic!("live call made while replaying")
        })
        .unwrap();
        assert_eq!(response.body, "stored");
        assert!(canned.completed.lock().unwrap().is_empty());
        uninstall(handle);
    }

    #[test]
    fn perform_reports_live_response() {
        let _lock = serial();
        let canned = Arc::new(Canned::default());
        let handle = install(TARGET, canned.clone());

        dispatch(TARGET, &request(), live).unwrap();
        assert_eq!(canned.completed.lock().unwrap().len(), 1);
        uninstall(handle);
    }

    #[test]
    fn latest_install_wins_and_uninstall_restores() {
        let _lock = serial();
        let first = install(TARGET, Arc::new(Canned { replay: Some(Response::new(200, "first")), ..Canned::default() }));
        let second = install(TARGET, Arc::new(Canned { replay: Some(Response::new(200, "second")), ..Canned::default() }));
        assert_eq!(dispatch(TARGET, &request(), live).unwrap().body, "second");

        uninstall(second);
        assert_eq!(dispatch(TARGET, &request(), live).unwrap().body, "first");

        uninstall(first);
        assert!(lookup(TARGET).is_none());
        assert!(!installed_targets().contains(&TARGET));
    }

    #[test]
    fn interceptor_errors_abort_the_call() {
        struct Refuse;
        impl Interceptor for Refuse {
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

        let _lock = serial();
        let handle = install(TARGET, Arc::new(Refuse));
        let err = dispatch(TARGET, &request(), live).unwrap_err();
        assert!(matches!(err, ReplayError::NoRecordingFound { .. }));
        uninstall(handle);
    }

    #[tokio::test]
    async fn async_dispatch_replays() {
        let _lock = serial();
        let handle = install(TARGET, Arc::new(Canned { replay: Some(Response::new(204, "")), ..Canned::default() }));
        let response = dispatch_async(TARGET, &request(), || async {
            Ok::<_, ReplayError>(Response::new(200, "live"))
        })
        .await
        .unwrap();
        assert_eq!(response.status, 204);
        uninstall(handle);
    }
}
