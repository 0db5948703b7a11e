//! Finds the stored interaction that answers a live request.

use std::collections::BTreeMap;

use super::format::{Headers, Interaction, Request};

/// Headers that change between otherwise identical requests and are
/// ignored when matching.
pub const VOLATILE_HEADERS: &[&str] = &[
    "authorization",
    "x-api-key",
    "date",
    "timestamp",
    "user-agent",
    "x-request-id",
    "x-correlation-id",
];

/// Whether a stored request answers `live`.
///
/// Method, URL and body must be identical. Every recorded header outside
/// [`VOLATILE_HEADERS`] must be present on `live` with the same value,
/// names compared case-insensitively; extra live headers are ignored.
#[must_use]
pub fn matches(recorded: &Request, live: &Request) -> bool {
    if recorded.method != live.method || recorded.url != live.url || recorded.body != live.body {
        return false;
    }
    let live_headers = stable_headers(&live.headers);
    stable_headers(&recorded.headers)
        .into_iter()
        .all(|(name, value)| live_headers.get(&name) == Some(&value))
}

/// The first interaction in file order whose request matches.
#[must_use]
pub fn find_match<'a>(interactions: &'a [Interaction], request: &Request) -> Option<&'a Interaction> {
    interactions.iter().find(|i| matches(&i.request, request))
}

fn stable_headers(headers: &Headers) -> BTreeMap<String, &str> {
    headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.as_str()))
        .filter(|(name, _)| !VOLATILE_HEADERS.contains(&name.as_str()))
        .collect()
}
