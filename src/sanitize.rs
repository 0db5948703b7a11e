//! Credential scrubbing for interactions before they reach disk.
//!
//! Sanitizing never fails. Anything that cannot be parsed (a malformed URL,
//! a body that is not JSON) falls back to the weaker text rules or is left
//! as is, so a recording is never lost to a sanitizer error.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::cassette::format::{Headers, Interaction, Request, Response};

/// Replacement for every redacted value.
pub const REDACTED: &str = "***REDACTED***";

/// Header names whose values are always redacted (compared lower case).
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-api-key",
    "cookie",
    "set-cookie",
    "x-auth-token",
    "x-access-token",
    "x-csrf-token",
    "proxy-authorization",
    "www-authenticate",
    "x-api-secret",
    "x-session-id",
    "x-user-token",
];

/// Query parameter and body keys whose values are redacted.
pub const SENSITIVE_PARAMS: &[&str] = &[
    "password",
    "token",
    "api_key",
    "apikey",
    "secret",
    "auth",
    "authorization",
    "session",
    "sid",
    "key",
    "access_token",
    "refresh_token",
    "client_secret",
];

/// Keys caught by the key/value pattern in bodies that are not valid JSON.
const TEXT_BODY_KEYS: &[&str] = &["password", "token", "api_key", "secret", "auth", "email"];

static TEXT_KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    let keys = TEXT_BODY_KEYS.join("|");
    Regex::new(&format!(r#"(?i)("(?:{keys})"\s*:\s*)"[^"]*""#)).expect("invalid key/value pattern")
});

static DIGIT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Card numbers
        r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b",
        // Social security numbers
        r"\b\d{3}-?\d{2}-?\d{4}\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid digit pattern"))
    .collect()
});

/// Redacts sensitive headers, query parameters and body content.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    headers: BTreeSet<String>,
    params: BTreeSet<String>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            headers: SENSITIVE_HEADERS.iter().map(|h| (*h).to_string()).collect(),
            params: SENSITIVE_PARAMS.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

impl Sanitizer {
    /// A sanitizer with the built-in rule sets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also redact these header names.
    #[must_use]
    pub fn with_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.headers.extend(names.into_iter().map(|n| n.as_ref().to_ascii_lowercase()));
        self
    }

    /// Also redact these query parameter and body keys.
    #[must_use]
    pub fn with_params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.params.extend(names.into_iter().map(|n| n.as_ref().to_ascii_lowercase()));
        self
    }

    /// Sanitize both halves of an interaction.
    #[must_use]
    pub fn sanitize(&self, interaction: &Interaction) -> Interaction {
        Interaction {
            request: self.sanitize_request(&interaction.request),
            response: self.sanitize_response(&interaction.response),
        }
    }

    /// Sanitize the URL, headers and body of a request.
    #[must_use]
    pub fn sanitize_request(&self, request: &Request) -> Request {
        Request {
            method: request.method.clone(),
            url: self.sanitize_url(&request.url).into_owned(),
            headers: self.sanitize_headers(&request.headers),
            body: request.body.as_deref().map(|b| self.sanitize_body(b).into_owned()),
        }
    }

    /// Sanitize the headers and, for text responses, the body.
    #[must_use]
    pub fn sanitize_response(&self, response: &Response) -> Response {
        let body = if response.is_binary {
            response.body.clone()
        } else {
            self.sanitize_body(&response.body).into_owned()
        };
        Response {
            status: response.status,
            headers: self.sanitize_headers(&response.headers),
            body,
            is_binary: response.is_binary,
        }
    }

    /// Replace the values of sensitive headers. Names keep their case.
    #[must_use]
    pub fn sanitize_headers(&self, headers: &Headers) -> Headers {
        headers
            .iter()
            .map(|(name, value)| {
                let value = if self.headers.contains(&name.to_ascii_lowercase()) {
                    REDACTED.to_string()
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect()
    }

    /// Redact sensitive query parameters, preserving pair order.
    ///
    /// URLs without sensitive parameters come back unchanged. A URL that
    /// does not parse is also returned unchanged, so its query may leak.
    #[must_use]
    pub fn sanitize_url<'a>(&self, url: &'a str) -> Cow<'a, str> {
        let mut parsed = match url::Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(url, error = %e, "URL not sanitized: unparseable");
                return Cow::Borrowed(url);
            }
        };
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        let Some(pairs) = self.redact_pairs(pairs) else {
            return Cow::Borrowed(url);
        };
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
        Cow::Owned(parsed.into())
    }

    /// Redact sensitive content in a text body.
    #[must_use]
    pub fn sanitize_body<'a>(&self, body: &'a str) -> Cow<'a, str> {
        if body.is_empty() {
            return Cow::Borrowed(body);
        }
        if let Ok(mut value) = serde_json::from_str::<Value>(body) {
            if value.is_object() || value.is_array() {
                if !self.redact_json(&mut value) {
                    return Cow::Borrowed(body);
                }
                return serde_json::to_string(&value).map_or(Cow::Borrowed(body), Cow::Owned);
            }
        }
        if let Some(form) = self.sanitize_form(body) {
            return Cow::Owned(redact_digits(&form).into_owned());
        }
        let keyed = TEXT_KEY_VALUE.replace_all(body, format!("${{1}}\"{REDACTED}\""));
        let digits = match redact_digits(&keyed) {
            Cow::Owned(text) => Some(text),
            Cow::Borrowed(_) => None,
        };
        digits.map_or(keyed, Cow::Owned)
    }

    fn is_sensitive_param(&self, key: &str) -> bool {
        self.params.contains(&key.to_ascii_lowercase())
    }

    /// Returns the redacted pairs, or `None` when nothing is sensitive.
    fn redact_pairs(&self, pairs: Vec<(String, String)>) -> Option<Vec<(String, String)>> {
        if !pairs.iter().any(|(k, _)| self.is_sensitive_param(k)) {
            return None;
        }
        Some(
            pairs
                .into_iter()
                .map(|(k, v)| if self.is_sensitive_param(&k) { (k, REDACTED.to_string()) } else { (k, v) })
                .collect(),
        )
    }

    /// Returns true if anything was changed.
    fn redact_json(&self, value: &mut Value) -> bool {
        match value {
            Value::Object(map) => {
                let mut changed = false;
                for (key, entry) in map.iter_mut() {
                    if self.is_sensitive_param(key) || is_text_body_key(key) {
                        if entry.as_str() != Some(REDACTED) {
                            *entry = Value::String(REDACTED.to_string());
                            changed = true;
                        }
                    } else {
                        changed |= self.redact_json(entry);
                    }
                }
                changed
            }
            Value::Array(items) => {
                items.iter_mut().fold(false, |changed, item| self.redact_json(item) | changed)
            }
            Value::String(text) => {
                let redacted = match redact_digits(text) {
                    Cow::Owned(redacted) => redacted,
                    Cow::Borrowed(_) => return false,
                };
                *text = redacted;
                true
            }
            _ => false,
        }
    }

    /// Redact sensitive keys in an `a=1&b=2` body. `None` when the body
    /// does not look form-encoded or has nothing to redact.
    fn sanitize_form(&self, body: &str) -> Option<String> {
        let looks_like_form = !body.contains(char::is_whitespace)
            && !body.contains('"')
            && body.split('&').all(|pair| pair.contains('='));
        if !looks_like_form {
            return None;
        }
        let pairs: Vec<(String, String)> =
            url::form_urlencoded::parse(body.as_bytes()).into_owned().collect();
        let pairs = self.redact_pairs(pairs)?;
        Some(url::form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish())
    }
}

fn is_text_body_key(key: &str) -> bool {
    TEXT_BODY_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_digits(text: &str) -> Cow<'_, str> {
    let mut current = Cow::Borrowed(text);
    for pattern in DIGIT_PATTERNS.iter() {
        let replaced = match pattern.replace_all(&current, REDACTED) {
            Cow::Owned(replaced) => replaced,
            Cow::Borrowed(_) => continue,
        };
        current = Cow::Owned(replaced);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> Sanitizer {
        Sanitizer::new()
    }

    #[test]
    fn sensitive_headers_are_redacted_case_insensitively() {
        let headers = Headers::from([
            ("Authorization".to_string(), "Bearer xyz".to_string()),
            ("X-Api-Key".to_string(), "k".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ]);
        let clean = sanitizer().sanitize_headers(&headers);
        assert_eq!(clean["Authorization"], REDACTED);
        assert_eq!(clean["X-Api-Key"], REDACTED);
        assert_eq!(clean["Accept"], "application/json");
    }

    #[test]
    fn query_params_are_redacted_in_order() {
        let url = "https://api.example.com/v1/items?page=2&api_key=abc123&sort=asc&Token=t";
        assert_eq!(
            sanitizer().sanitize_url(url),
            "https://api.example.com/v1/items?page=2&api_key=***REDACTED***&sort=asc&Token=***REDACTED***"
        );
    }

    #[test]
    fn clean_url_is_returned_verbatim() {
        let url = "https://API.example.com/v1/items?q=a%20b";
        assert!(matches!(sanitizer().sanitize_url(url), Cow::Borrowed(u) if u == url));
    }

    #[test]
    fn unparseable_url_is_returned_verbatim() {
        let url = "not a url?password=hunter2";
        assert_eq!(sanitizer().sanitize_url(url), url);
    }

    #[test]
    fn json_keys_are_redacted_recursively() {
        let body = r#"{"user":{"name":"ada","password":"hunter2"},"items":[{"token":"t1"},{"id":3}]}"#;
        let clean: Value = serde_json::from_str(&sanitizer().sanitize_body(body)).unwrap();
        assert_eq!(clean["user"]["password"], REDACTED);
        assert_eq!(clean["user"]["name"], "ada");
        assert_eq!(clean["items"][0]["token"], REDACTED);
        assert_eq!(clean["items"][1]["id"], 3);
    }

    #[test]
    fn json_string_values_lose_card_and_ssn_numbers() {
        let body = r#"{"note":"card 4111-1111-1111-1111, ssn 123-45-6789"}"#;
        let clean: Value = serde_json::from_str(&sanitizer().sanitize_body(body)).unwrap();
        assert_eq!(clean["note"], format!("card {REDACTED}, ssn {REDACTED}"));
    }

    #[test]
    fn clean_json_body_is_untouched() {
        let body = r#"{ "b": 1, "a": [true, null] }"#;
        assert!(matches!(sanitizer().sanitize_body(body), Cow::Borrowed(_)));
    }

    #[test]
    fn text_body_uses_key_value_patterns() {
        let body = r#"broken json {"password": "hunter2", "email":"a@b.c" ..."#;
        assert_eq!(
            sanitizer().sanitize_body(body),
            r#"broken json {"password": "***REDACTED***", "email":"***REDACTED***" ..."#
        );
    }

    #[test]
    fn form_body_keys_are_redacted() {
        let body = "username=ada&password=hunter2&remember=1";
        assert_eq!(
            sanitizer().sanitize_body(body),
            "username=ada&password=***REDACTED***&remember=1"
        );
    }

    #[test]
    fn binary_response_body_is_skipped() {
        let response = Response { is_binary: true, ..Response::new(200, "MTIzLTQ1LTY3ODk=") }
            .header("Set-Cookie", "sid=1");
        let clean = sanitizer().sanitize_response(&response);
        assert_eq!(clean.body, response.body);
        assert_eq!(clean.headers["Set-Cookie"], REDACTED);
    }

    #[test]
    fn custom_rules_extend_defaults() {
        let custom = sanitizer().with_headers(["X-Tenant"]).with_params(["pin"]);
        let request = Request::new("POST", "https://a.example/login?pin=1234")
            .header("x-tenant", "acme")
            .body(r#"{"pin":"0000","password":"p"}"#);
        let clean = custom.sanitize_request(&request);
        assert_eq!(clean.headers["x-tenant"], REDACTED);
        assert_eq!(clean.url, "https://a.example/login?pin=***REDACTED***");
        let body: Value = serde_json::from_str(&clean.body.unwrap()).unwrap();
        assert_eq!(body["pin"], REDACTED);
        assert_eq!(body["password"], REDACTED);
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let interaction = Interaction {
            request: Request::new("POST", "https://a.example/x?token=abc&q=1")
                .header("Authorization", "Bearer xyz")
                .body("password=p&card=4111111111111111"),
            response: Response::new(200, r#"{"secret":"s","ssn":"123-45-6789"}"#),
        };
        let once = sanitizer().sanitize(&interaction);
        let twice = sanitizer().sanitize(&once);
        assert_eq!(once, twice);
        assert!(!serde_json::to_string(&once).unwrap().contains("xyz"));
    }
}
