//! One-shot HTTP transport with explicit redirect surfacing.
//!
//! Each call performs exactly one request and reports the raw outcome.
//! Redirects are never followed: the login flow judges success by the
//! first hop's status code, so automatic redirect chasing would destroy
//! the signal. Non-2xx statuses are valid, representable outcomes; only
//! failures below the HTTP layer (DNS, connection, TLS, timeout) are
//! errors.

use reqwest::header::{HeaderValue, COOKIE, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::TransportError;

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// User agent presented to pods.
const USER_AGENT: &str = concat!("podlink/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Options
// ============================================================================

/// Timeout and TLS configuration for a transport.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Verify the pod's TLS certificate.
    pub verify_tls: bool,
    /// Optional custom CA bundle (PEM), read once when the transport is
    /// built and shared by all requests.
    pub ca_bundle: Option<PathBuf>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verify_tls: true,
            ca_bundle: None,
        }
    }
}

// ============================================================================
// Exchange
// ============================================================================

/// One completed HTTP round trip.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Response status code.
    pub status: u16,
    /// Canonical reason phrase for the status, empty if unknown.
    pub reason: String,
    /// Response headers as readable name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: String,
    /// Cookies the server set on this response, name to value.
    pub cookies: BTreeMap<String, String>,
}

impl Exchange {
    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Status code and reason phrase, e.g. `"404 Not Found"`.
    pub fn status_line(&self) -> String {
        format!("{} {}", self.status, self.reason)
    }
}

// ============================================================================
// Transport
// ============================================================================

/// HTTP transport performing exactly one request per call.
#[derive(Debug, Clone)]
pub struct Transport {
    inner: Client,
}

impl Transport {
    /// Creates a transport with default options.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_options(&TransportOptions::default())
    }

    /// Creates a transport with the given timeout and TLS options.
    pub fn with_options(options: &TransportOptions) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .timeout(options.timeout)
            .user_agent(USER_AGENT)
            .redirect(Policy::none());

        if !options.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(path) = &options.ca_bundle {
            let pem = std::fs::read(path)?;
            let cert =
                reqwest::Certificate::from_pem(&pem).map_err(TransportError::ClientBuild)?;
            builder = builder.add_root_certificate(cert);
        }

        let inner = builder.build().map_err(TransportError::ClientBuild)?;
        Ok(Self { inner })
    }

    /// Performs a GET request.
    #[instrument(skip(self, cookies), fields(url = %url))]
    pub async fn get(
        &self,
        url: &str,
        cookies: &BTreeMap<String, String>,
    ) -> Result<Exchange, TransportError> {
        debug!("GET request");
        self.execute(self.inner.get(url), &[], cookies).await
    }

    /// Performs a POST request with a form-encoded body.
    #[instrument(skip(self, form, cookies), fields(url = %url))]
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        cookies: &BTreeMap<String, String>,
    ) -> Result<Exchange, TransportError> {
        debug!("POST request with form data");
        self.execute(self.inner.post(url).form(form), &[], cookies)
            .await
    }

    /// Performs a POST request with a JSON body and extra headers.
    #[instrument(skip(self, body, headers, cookies), fields(url = %url))]
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        headers: &[(&'static str, String)],
        cookies: &BTreeMap<String, String>,
    ) -> Result<Exchange, TransportError> {
        debug!("POST request with JSON");
        self.execute(self.inner.post(url).json(body), headers, cookies)
            .await
    }

    /// Performs a DELETE request with extra headers.
    #[instrument(skip(self, headers, cookies), fields(url = %url))]
    pub async fn delete(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        cookies: &BTreeMap<String, String>,
    ) -> Result<Exchange, TransportError> {
        debug!("DELETE request");
        self.execute(self.inner.delete(url), headers, cookies).await
    }

    /// Sends one request and captures the raw exchange.
    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        headers: &[(&'static str, String)],
        cookies: &BTreeMap<String, String>,
    ) -> Result<Exchange, TransportError> {
        let mut request = request;

        for (name, value) in headers {
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidHeader(e.to_string()))?;
            request = request.header(*name, value);
        }

        if !cookies.is_empty() {
            let value = HeaderValue::from_str(&cookie_header(cookies))
                .map_err(|e| TransportError::InvalidHeader(e.to_string()))?;
            request = request.header(COOKIE, value);
        }

        let response = request.send().await?;

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or_default().to_string();

        let mut set_cookies = BTreeMap::new();
        for value in response.headers().get_all(SET_COOKIE) {
            if let Some((name, value)) = value.to_str().ok().and_then(parse_set_cookie) {
                set_cookies.insert(name, value);
            }
        }

        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response.text().await?;
        debug!(status = status.as_u16(), "Response received");

        Ok(Exchange {
            status: status.as_u16(),
            reason,
            headers: response_headers,
            body,
            cookies: set_cookies,
        })
    }
}

// ============================================================================
// Cookie Helpers
// ============================================================================

/// Builds a `Cookie` header value from the current cookie snapshot.
pub fn cookie_header(cookies: &BTreeMap<String, String>) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Extracts the name/value pair from one `Set-Cookie` header, dropping
/// attributes such as `Path` and `Expires`.
fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
    let pair = raw.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

// ============================================================================
// Tests
// ============================================================================
