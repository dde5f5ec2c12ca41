//! Client error types.

use thiserror::Error;

/// Failure below the HTTP layer, before a status code was available.
///
/// Distinguished from non-2xx responses on purpose: those are completed
/// exchanges the transport represents as data, never as this error, so
/// the orchestrator can read the first hop of a redirect or map a 404 to
/// a domain message.
#[derive(Debug, Error)]
pub enum TransportError {
    /// DNS, connection, TLS, or timeout failure from the HTTP stack.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The pod address did not form a valid URL.
    #[error("Invalid pod address: {0}")]
    InvalidPod(String),

    /// A header value could not be encoded.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    /// The custom CA bundle could not be read.
    #[error("CA bundle error: {0}")]
    CaBundle(#[from] std::io::Error),

    /// The underlying HTTP client could not be built.
    #[error("Client build error: {0}")]
    ClientBuild(reqwest::Error),
}
