//! Pod API client: the init/login handshake, publishing, deletion, and
//! the aspect/service lists.
//!
//! The client composes the transport, the scraper, and the session into
//! the operations a caller sees. Each operation runs to completion
//! before the next is issued; there is no internal retry, and a failed
//! request surfaces immediately as a structured [`PodError`] that is
//! also recorded on the session as the sticky last error.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info, instrument};
use url::Url;

use podlink_core::{
    seed_aspects, seed_services, AspectSelection, ErrorKind, PodError, PostPayload, PostRef,
};

use crate::error::TransportError;
use crate::scrape;
use crate::session::Session;
use crate::transport::{Exchange, Transport, TransportOptions};

// ============================================================================
// Endpoints
// ============================================================================

/// Sign-in page; serves the CSRF token and accepts the login form.
const SIGN_IN_PATH: &str = "users/sign_in";

/// Authenticated-only resource; confirms a login took hold and embeds
/// the aspect and service lists.
const BOOKMARKLET_PATH: &str = "bookmarklet";

/// Publishing endpoint.
const STATUS_MESSAGES_PATH: &str = "status_messages";

// ============================================================================
// Options
// ============================================================================

/// Configuration for a pod client.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Timeout and TLS settings for the transport.
    pub transport: TransportOptions,
    /// Name reported to the pod as the posting application. Defaults to
    /// the crate name.
    pub provider_name: Option<String>,
}

// ============================================================================
// Delete Target
// ============================================================================

/// What a delete call may address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    /// A status message.
    Post,
    /// A comment on a status message.
    Comment,
}

impl DeleteTarget {
    /// URL path segment for this target.
    fn path(self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Comment => "comments",
        }
    }

    /// Noun used in error messages.
    fn noun(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }
}

impl FromStr for DeleteTarget {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(Self::Post),
            "comment" => Ok(Self::Comment),
            _ => Err(()),
        }
    }
}

// ============================================================================
// Pod Client
// ============================================================================

/// Session-authenticated client for one pod connection.
///
/// Calls are issued one at a time; the client holds no locks and is not
/// meant to be shared across tasks. Use one client per pod connection
/// when concurrency is needed.
#[derive(Debug)]
pub struct PodClient {
    session: Session,
    transport: Transport,
    provider_name: String,
}

impl PodClient {
    /// Creates a client for `pod` with default options.
    pub fn new(pod: &str, secure: bool) -> Result<Self, TransportError> {
        Self::with_options(pod, secure, ClientOptions::default())
    }

    /// Creates a client for `pod` with explicit transport and naming
    /// options.
    pub fn with_options(
        pod: &str,
        secure: bool,
        options: ClientOptions,
    ) -> Result<Self, TransportError> {
        validate_pod(pod)?;
        let transport = Transport::with_options(&options.transport)?;
        Ok(Self {
            session: Session::new(pod, secure),
            transport,
            provider_name: options
                .provider_name
                .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string()),
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Fetches and caches the CSRF token from the sign-in page.
    ///
    /// A cached token is reused; re-target the client with [`set_pod`]
    /// to force a fresh fetch. Clears any sticky error from a previous
    /// operation.
    ///
    /// [`set_pod`]: PodClient::set_pod
    #[instrument(skip(self))]
    pub async fn init(&mut self) -> Result<(), PodError> {
        self.session.clear_error();
        if !self.session.token().is_empty() {
            debug!("Reusing cached token");
            return Ok(());
        }
        self.fetch_token(ErrorKind::InitFailed).await?;
        info!(pod = self.session.pod(), "Initialized");
        Ok(())
    }

    /// Points the client at a different pod or protocol.
    ///
    /// A changed identity invalidates the token and cookie snapshot, so
    /// the next [`init`] performs a fresh fetch. A matching identity is
    /// a no-op.
    ///
    /// [`init`]: PodClient::init
    pub fn set_pod(&mut self, pod: &str, secure: bool) -> Result<(), TransportError> {
        if pod == self.session.pod() && secure == self.session.secure() {
            return Ok(());
        }
        validate_pod(pod)?;
        self.session.reconnect(pod, secure);
        Ok(())
    }

    /// Performs the sign-in handshake and confirms the session took.
    ///
    /// A redirect from the sign-in POST is not proof of success - pods
    /// redirect on failed logins too - so the session is confirmed by a
    /// follow-up GET of an authenticated-only resource, which must
    /// return 200. With `force` unset, a repeat login with identical
    /// credentials short-circuits without touching the network.
    #[instrument(skip(self, username, password))]
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        force: bool,
    ) -> Result<(), PodError> {
        self.session.clear_error();

        if self.session.token().is_empty() {
            self.session.logout();
            return Err(self.failure(
                ErrorKind::NotInitialized,
                "the connection has not been initialized",
            ));
        }

        if username.is_empty() || password.is_empty() {
            self.session.logout();
            return Err(self.failure(
                ErrorKind::InvalidCredentials,
                "username and password must not be empty",
            ));
        }

        if self.session.is_logged_in()
            && !force
            && self.session.credentials_match(username, password)
        {
            debug!("Already logged in, skipping handshake");
            return Ok(());
        }

        self.session.set_credentials(username, password);
        self.session.set_logged_in(false);

        // The sign-in form must carry a freshly issued token.
        if let Err(error) = self.fetch_token(ErrorKind::LoginFailed).await {
            self.session.logout();
            return Err(error);
        }

        let form = vec![
            ("user[username]".to_string(), username.to_string()),
            ("user[password]".to_string(), password.to_string()),
            (
                "authenticity_token".to_string(),
                self.session.token().to_string(),
            ),
        ];
        let url = self.session.pod_url(SIGN_IN_PATH);
        let cookies = self.session.cookies().clone();
        let result = self.transport.post_form(&url, &form, &cookies).await;
        match result {
            Ok(exchange) => self.session.absorb(&exchange),
            Err(error) => {
                let error = self.transport_failure(ErrorKind::LoginFailed, &error);
                self.session.logout();
                return Err(error);
            }
        }

        // Confirmation probe: only authenticated sessions are served
        // the bookmarklet resource.
        let url = self.session.pod_url(BOOKMARKLET_PATH);
        let confirmed = match self.send_get(&url, ErrorKind::LoginFailed).await {
            Ok(exchange) => exchange.status == 200,
            Err(error) => {
                self.session.logout();
                return Err(error);
            }
        };

        if !confirmed {
            let error = self.failure(
                ErrorKind::LoginFailed,
                "login failed, check username and password",
            );
            self.session.logout();
            return Err(error);
        }

        self.session.set_logged_in(true);
        info!(pod = self.session.pod(), "Logged in");
        Ok(())
    }

    /// Logs out: clears the login flag, credentials, and cached lists.
    /// The token and cookie snapshot survive; no request is made.
    pub fn logout(&mut self) {
        self.session.logout();
    }

    /// Disconnects entirely, resetting the session to its fresh
    /// unauthenticated state. No request is made.
    pub fn deinit(&mut self) {
        self.session.deinit();
    }

    // ------------------------------------------------------------------
    // Publishing
    // ------------------------------------------------------------------

    /// Publishes `text` to the selected aspects.
    ///
    /// An empty selection, or one containing `"public"`, publishes to
    /// everyone. `extra` keys are shallow-merged into the payload's top
    /// level (e.g. the target services). Success is a 201; the returned
    /// [`PostRef`] carries the computed permalink.
    #[instrument(skip(self, text, extra))]
    pub async fn post(
        &mut self,
        text: &str,
        aspects: &[&str],
        extra: Map<String, Value>,
    ) -> Result<PostRef, PodError> {
        self.session.clear_error();
        if !self.session.is_logged_in() {
            return Err(self.failure(ErrorKind::NotLoggedIn, "not logged in"));
        }

        let selection = AspectSelection::from_ids(aspects.iter().copied());

        // A token used for a write must be freshly issued; the one
        // cached at init time is not trusted for mutation.
        self.fetch_token(ErrorKind::PostFailed).await?;

        let payload = PostPayload::new(text, self.provider_name.clone(), selection, extra);
        let headers = [
            ("Accept", "application/json".to_string()),
            ("X-CSRF-Token", self.session.token().to_string()),
        ];
        let url = self.session.pod_url(STATUS_MESSAGES_PATH);
        let cookies = self.session.cookies().clone();
        let result = self
            .transport
            .post_json(&url, &payload, &headers, &cookies)
            .await;

        let exchange = match result {
            Ok(exchange) => {
                self.session.absorb(&exchange);
                exchange
            }
            Err(error) => return Err(self.transport_failure(ErrorKind::PostFailed, &error)),
        };

        if exchange.status != 201 {
            let message = server_error_message(&exchange.body)
                .unwrap_or_else(|| "an unknown error occurred while posting".to_string());
            return Err(self.failure(ErrorKind::PostFailed, message));
        }

        let raw: Value = serde_json::from_str(&exchange.body).unwrap_or(Value::Null);
        let pod_url = self.session.pod_url("");
        match PostRef::from_response(&pod_url, raw) {
            Some(post) => {
                info!(guid = %post.guid, "Published");
                Ok(post)
            }
            None => Err(self.failure(
                ErrorKind::PostFailed,
                "the pod returned an unreadable post",
            )),
        }
    }

    /// Deletes a post or comment by id.
    ///
    /// `kind` must be `"post"` or `"comment"`; anything else fails
    /// without a request. Success is a 204.
    #[instrument(skip(self))]
    pub async fn delete(&mut self, kind: &str, id: &str) -> Result<(), PodError> {
        self.session.clear_error();

        let Ok(target) = kind.parse::<DeleteTarget>() else {
            return Err(self.failure(
                ErrorKind::DeleteFailed,
                "only posts and comments can be deleted",
            ));
        };

        if !self.session.is_logged_in() {
            return Err(self.failure(ErrorKind::NotLoggedIn, "not logged in"));
        }

        self.fetch_token(ErrorKind::DeleteFailed).await?;

        let headers = [
            ("Accept", "application/json".to_string()),
            ("X-CSRF-Token", self.session.token().to_string()),
        ];
        let url = self.session.pod_url(&format!("{}/{id}", target.path()));
        let cookies = self.session.cookies().clone();
        let result = self.transport.delete(&url, &headers, &cookies).await;

        let exchange = match result {
            Ok(exchange) => {
                self.session.absorb(&exchange);
                exchange
            }
            Err(error) => return Err(self.transport_failure(ErrorKind::DeleteFailed, &error)),
        };

        match exchange.status {
            204 => {
                info!(kind, id, "Deleted");
                Ok(())
            }
            404 => Err(self.failure(
                ErrorKind::DeleteFailed,
                format!("the {} does not exist", target.noun()),
            )),
            403 => Err(self.failure(
                ErrorKind::DeleteFailed,
                format!("the {} does not belong to you", target.noun()),
            )),
            _ => Err(self.failure(
                ErrorKind::DeleteFailed,
                "an unknown error occurred while deleting",
            )),
        }
    }

    // ------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------

    /// Returns the aspect list, fetching it when the cache is empty or
    /// `force` is set. The public aspect is always present in a
    /// populated list. A failed fetch leaves the previous cache intact.
    #[instrument(skip(self))]
    pub async fn aspects(&mut self, force: bool) -> Result<BTreeMap<String, String>, PodError> {
        self.session.clear_error();
        if !self.session.is_logged_in() {
            return Err(self.failure(ErrorKind::NotLoggedIn, "not logged in"));
        }

        if !force && !self.session.aspects().is_empty() {
            return Ok(self.session.aspects().clone());
        }

        let url = self.session.pod_url(BOOKMARKLET_PATH);
        let exchange = self.send_get(&url, ErrorKind::AspectsFetchFailed).await?;
        if exchange.status != 200 {
            return Err(self.failure(
                ErrorKind::AspectsFetchFailed,
                "the pod would not serve the aspect list",
            ));
        }

        let parsed = scrape::extract_aspects(&exchange.body).unwrap_or_default();
        let aspects = seed_aspects(&parsed);
        self.session.set_aspects(aspects.clone());
        Ok(aspects)
    }

    /// Returns the connected service list, fetching it when the cache
    /// is empty or `force` is set. An account with no services yields an
    /// empty map. A failed fetch leaves the previous cache intact.
    #[instrument(skip(self))]
    pub async fn services(&mut self, force: bool) -> Result<BTreeMap<String, String>, PodError> {
        self.session.clear_error();
        if !self.session.is_logged_in() {
            return Err(self.failure(ErrorKind::NotLoggedIn, "not logged in"));
        }

        if !force && !self.session.services().is_empty() {
            return Ok(self.session.services().clone());
        }

        let url = self.session.pod_url(BOOKMARKLET_PATH);
        let exchange = self.send_get(&url, ErrorKind::ServicesFetchFailed).await?;
        if exchange.status != 200 {
            return Err(self.failure(
                ErrorKind::ServicesFetchFailed,
                "the pod would not serve the service list",
            ));
        }

        let parsed = scrape::extract_services(&exchange.body).unwrap_or_default();
        let services = seed_services(&parsed);
        self.session.set_services(services.clone());
        Ok(services)
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Whether a login handshake has succeeded for this session.
    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    /// The current CSRF token, empty before a successful init.
    pub fn token(&self) -> &str {
        self.session.token()
    }

    /// Builds an absolute URL on the pod, normalizing slashes in `path`.
    pub fn pod_url(&self, path: &str) -> String {
        self.session.pod_url(path)
    }

    /// Whether an operation has failed since the error was last taken.
    pub fn has_last_error(&self) -> bool {
        self.session.has_error()
    }

    /// The sticky last error, if any, without clearing it.
    pub fn last_error(&self) -> Option<&PodError> {
        self.session.error()
    }

    /// Removes and returns the sticky last error.
    pub fn take_last_error(&mut self) -> Option<PodError> {
        self.session.take_error()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// GETs the sign-in page so the pod issues a token and session
    /// cookies; fails under `failure` when no token results.
    async fn fetch_token(&mut self, failure: ErrorKind) -> Result<(), PodError> {
        let url = self.session.pod_url(SIGN_IN_PATH);
        self.send_get(&url, failure).await?;
        if self.session.token().is_empty() {
            return Err(self.failure(
                failure,
                "could not fetch a token from the sign-in page",
            ));
        }
        Ok(())
    }

    /// Runs one GET and folds the exchange into the session regardless
    /// of the operation's eventual outcome.
    async fn send_get(&mut self, url: &str, failure: ErrorKind) -> Result<Exchange, PodError> {
        let cookies = self.session.cookies().clone();
        let result = self.transport.get(url, &cookies).await;
        match result {
            Ok(exchange) => {
                self.session.absorb(&exchange);
                Ok(exchange)
            }
            Err(error) => Err(self.transport_failure(failure, &error)),
        }
    }

    /// Builds, records, and returns an operation failure.
    fn failure(&mut self, kind: ErrorKind, message: impl Into<String>) -> PodError {
        self.session.record_error(PodError::new(kind, message))
    }

    /// Records a transport-level failure under the operation's error
    /// kind, keeping the transport detail in the aux data.
    fn transport_failure(&mut self, kind: ErrorKind, error: &TransportError) -> PodError {
        self.session.record_error(
            PodError::new(kind, "could not reach the pod")
                .with_aux("transport", error.to_string()),
        )
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Checks that `pod` is a bare host, optionally with a port - no scheme,
/// no path.
fn validate_pod(pod: &str) -> Result<(), TransportError> {
    if pod.is_empty() || pod.contains("://") || pod.contains('/') || pod.contains(char::is_whitespace)
    {
        return Err(TransportError::InvalidPod(pod.to_string()));
    }
    let parsed = Url::parse(&format!("https://{pod}"))
        .map_err(|e| TransportError::InvalidPod(format!("{pod}: {e}")))?;
    if parsed.host_str().is_none() {
        return Err(TransportError::InvalidPod(pod.to_string()));
    }
    Ok(())
}

/// Pulls the server-supplied error text out of a JSON error body.
fn server_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}

// ============================================================================
// Tests
// ============================================================================
