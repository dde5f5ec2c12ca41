//! Connection identity and accumulated server-issued state.
//!
//! A session is the single source of truth for one pod connection: the
//! pod address and protocol, the scraped CSRF token, the cookie
//! snapshot, credentials, and the cached aspect and service lists. It
//! performs no network I/O of its own.

use std::collections::BTreeMap;

use podlink_core::PodError;

use crate::scrape;
use crate::transport::Exchange;

/// Mutable state for one pod connection.
///
/// Owned by exactly one client; not safe for concurrent mutation. A
/// caller needing parallel connections creates one session per pod.
#[derive(Debug, Clone)]
pub struct Session {
    pod: String,
    secure: bool,
    token: String,
    cookies: BTreeMap<String, String>,
    is_logged_in: bool,
    username: String,
    password: String,
    aspects: BTreeMap<String, String>,
    services: BTreeMap<String, String>,
    last_error: Option<PodError>,
    last_exchange: Option<Exchange>,
}

impl Session {
    /// Creates a fresh unauthenticated session for `pod`.
    pub fn new(pod: impl Into<String>, secure: bool) -> Self {
        Self {
            pod: pod.into(),
            secure,
            token: String::new(),
            cookies: BTreeMap::new(),
            is_logged_in: false,
            username: String::new(),
            password: String::new(),
            aspects: BTreeMap::new(),
            services: BTreeMap::new(),
            last_error: None,
            last_exchange: None,
        }
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// The pod's domain, without scheme.
    pub fn pod(&self) -> &str {
        &self.pod
    }

    /// Whether URLs are built with `https`.
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Re-targets the session at a different pod or protocol.
    ///
    /// The token and cookie snapshot belong to the old identity and are
    /// discarded; the next init fetches fresh ones.
    pub fn reconnect(&mut self, pod: impl Into<String>, secure: bool) {
        self.pod = pod.into();
        self.secure = secure;
        self.token.clear();
        self.cookies.clear();
    }

    /// Builds an absolute URL on the pod for `path`.
    ///
    /// Leading and trailing slashes in `path` are normalized away, so
    /// `"a"`, `"/a"`, `"a/"`, and `"a//"` all yield the same URL.
    pub fn pod_url(&self, path: &str) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            format!("{scheme}://{}", self.pod)
        } else {
            format!("{scheme}://{}/{trimmed}", self.pod)
        }
    }

    // ------------------------------------------------------------------
    // Server-issued artifacts
    // ------------------------------------------------------------------

    /// The current CSRF token, empty until the first successful fetch.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The current cookie snapshot.
    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    /// The most recent HTTP exchange, kept for enriching errors.
    pub fn last_exchange(&self) -> Option<&Exchange> {
        self.last_exchange.as_ref()
    }

    /// Folds one completed exchange into the session.
    ///
    /// Called after every round trip regardless of the operation's own
    /// outcome: cookies and a freshly issued token must survive a
    /// logically failed call, so later calls are not penalized.
    pub fn absorb(&mut self, exchange: &Exchange) {
        for (name, value) in &exchange.cookies {
            self.cookies.insert(name.clone(), value.clone());
        }
        if let Some(token) = scrape::extract_token(&exchange.body) {
            self.token = token;
        }
        self.last_exchange = Some(exchange.clone());
    }

    // ------------------------------------------------------------------
    // Credentials and login state
    // ------------------------------------------------------------------

    /// Whether a login handshake has succeeded for this session.
    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    /// Marks the session as logged in or out.
    pub fn set_logged_in(&mut self, logged_in: bool) {
        self.is_logged_in = logged_in;
    }

    /// Stores the credentials for the next handshake.
    pub fn set_credentials(&mut self, username: &str, password: &str) {
        self.username = username.to_string();
        self.password = password.to_string();
    }

    /// Returns true when the stored credentials equal the given pair.
    pub fn credentials_match(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }

    /// The stored username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The stored password.
    pub fn password(&self) -> &str {
        &self.password
    }

    // ------------------------------------------------------------------
    // Cached lists
    // ------------------------------------------------------------------

    /// The cached aspect list, empty until the first successful fetch.
    pub fn aspects(&self) -> &BTreeMap<String, String> {
        &self.aspects
    }

    /// Replaces the aspect cache wholesale.
    pub fn set_aspects(&mut self, aspects: BTreeMap<String, String>) {
        self.aspects = aspects;
    }

    /// The cached service list, empty until the first successful fetch.
    pub fn services(&self) -> &BTreeMap<String, String> {
        &self.services
    }

    /// Replaces the service cache wholesale.
    pub fn set_services(&mut self, services: BTreeMap<String, String>) {
        self.services = services;
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    /// Stores `error` as the sticky last error, enriched with the most
    /// recent HTTP status line and the kind's help tag, and returns the
    /// enriched error.
    pub fn record_error(&mut self, error: PodError) -> PodError {
        let tag = error.kind().tag();
        let mut error = error.with_aux("help_tag", tag);
        if let Some(exchange) = &self.last_exchange {
            error = error
                .with_aux("http_status", exchange.status.to_string())
                .with_aux("http_reason", exchange.reason.clone());
        }
        self.last_error = Some(error.clone());
        error
    }

    /// Whether an operation has failed since the error was last cleared.
    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }

    /// The sticky last error, if any.
    pub fn error(&self) -> Option<&PodError> {
        self.last_error.as_ref()
    }

    /// Removes and returns the sticky last error.
    pub fn take_error(&mut self) -> Option<PodError> {
        self.last_error.take()
    }

    /// Clears the sticky last error.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    // ------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------

    /// Logs out: clears the login flag, credentials, and cached lists.
    ///
    /// The token and cookies are untouched. Logging out ends the
    /// authenticated session without disconnecting from the pod.
    pub fn logout(&mut self) {
        self.is_logged_in = false;
        self.username.clear();
        self.password.clear();
        self.aspects.clear();
        self.services.clear();
    }

    /// Disconnects entirely: logs out and also discards the token, the
    /// cookie snapshot, and any recorded error or exchange. Equivalent
    /// to a fresh unauthenticated session.
    pub fn deinit(&mut self) {
        self.logout();
        self.token.clear();
        self.cookies.clear();
        self.last_error = None;
        self.last_exchange = None;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use podlink_core::ErrorKind;

    fn exchange(status: u16, body: &str) -> Exchange {
        Exchange {
            status,
            reason: "OK".to_string(),
            headers: Vec::new(),
            body: body.to_string(),
            cookies: BTreeMap::new(),
        }
    }

    #[test]
    fn test_pod_url_normalization() {
        let session = Session::new("pod.example.org", true);
        assert_eq!(session.pod_url(""), "https://pod.example.org");
        assert_eq!(session.pod_url("/"), "https://pod.example.org");
        assert_eq!(session.pod_url("a"), "https://pod.example.org/a");
        assert_eq!(session.pod_url("/a"), "https://pod.example.org/a");
        assert_eq!(session.pod_url("a/"), "https://pod.example.org/a");
        assert_eq!(session.pod_url("a//"), "https://pod.example.org/a");
    }

    #[test]
    fn test_pod_url_insecure_scheme() {
        let session = Session::new("pod.example.org", false);
        assert_eq!(session.pod_url("a"), "http://pod.example.org/a");
    }

    #[test]
    fn test_absorb_merges_cookies_and_token() {
        let mut session = Session::new("pod", true);
        let mut first = exchange(200, r#"<meta name="csrf-token" content="tok1" />"#);
        first.cookies.insert("_session".to_string(), "a".to_string());
        session.absorb(&first);
        assert_eq!(session.token(), "tok1");
        assert_eq!(session.cookies().get("_session").map(String::as_str), Some("a"));

        // A later response without a token keeps the old one but
        // overwrites the cookie.
        let mut second = exchange(302, "");
        second.cookies.insert("_session".to_string(), "b".to_string());
        session.absorb(&second);
        assert_eq!(session.token(), "tok1");
        assert_eq!(session.cookies().get("_session").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_logout_preserves_token_and_cookies() {
        let mut session = Session::new("pod", true);
        let mut ex = exchange(200, r#"<meta name="csrf-token" content="tok" />"#);
        ex.cookies.insert("_session".to_string(), "x".to_string());
        session.absorb(&ex);
        session.set_credentials("alice", "secret");
        session.set_logged_in(true);
        session.set_aspects(BTreeMap::from([("1".to_string(), "Family".to_string())]));

        session.logout();
        assert!(!session.is_logged_in());
        assert!(session.username().is_empty());
        assert!(session.password().is_empty());
        assert!(session.aspects().is_empty());
        assert_eq!(session.token(), "tok");
        assert!(!session.cookies().is_empty());
    }

    #[test]
    fn test_deinit_resets_everything() {
        let mut session = Session::new("pod", true);
        session.absorb(&exchange(200, r#"<meta name="csrf-token" content="tok" />"#));
        session.record_error(PodError::new(ErrorKind::PostFailed, "boom"));

        session.deinit();
        assert!(session.token().is_empty());
        assert!(session.cookies().is_empty());
        assert!(!session.has_error());
        assert!(session.last_exchange().is_none());
    }

    #[test]
    fn test_reconnect_discards_token_and_cookies() {
        let mut session = Session::new("pod-a", true);
        session.absorb(&exchange(200, r#"<meta name="csrf-token" content="tok" />"#));
        session.reconnect("pod-b", false);
        assert_eq!(session.pod(), "pod-b");
        assert!(!session.secure());
        assert!(session.token().is_empty());
        assert!(session.cookies().is_empty());
    }

    #[test]
    fn test_record_error_merges_last_status() {
        let mut session = Session::new("pod", true);
        session.absorb(&Exchange {
            status: 500,
            reason: "Internal Server Error".to_string(),
            headers: Vec::new(),
            body: String::new(),
            cookies: BTreeMap::new(),
        });

        let error = session.record_error(PodError::new(ErrorKind::PostFailed, "boom"));
        assert_eq!(error.aux_value("http_status"), Some("500"));
        assert_eq!(error.aux_value("http_reason"), Some("Internal Server Error"));
        assert_eq!(error.aux_value("help_tag"), Some("post-failed"));
        assert!(session.has_error());
    }

    #[test]
    fn test_take_error_clears_stickiness() {
        let mut session = Session::new("pod", true);
        session.record_error(PodError::new(ErrorKind::InitFailed, "no token"));
        assert!(session.take_error().is_some());
        assert!(!session.has_error());
        assert!(session.take_error().is_none());
    }
}
