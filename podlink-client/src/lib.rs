// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Podlink Client
//!
//! Session-authenticated HTTP client for diaspora* pods.
//!
//! Pods expose no token API: the client emulates a browser session by
//! scraping the CSRF token out of HTML, carrying cookies from response
//! to response, and confirming the login handshake with a probe of an
//! authenticated-only resource.
//!
//! ## Layers
//!
//! - [`transport`] - one request per call, redirects surfaced rather
//!   than followed, non-2xx statuses returned as data
//! - [`scrape`] - token/aspect/service extraction from response bodies
//! - [`session`] - pod identity, token, cookie snapshot, cached lists,
//!   and the sticky last error
//! - [`client`] - the [`PodClient`] orchestrator tying them together
//!
//! ## Example
//!
//! ```ignore
//! use podlink_client::PodClient;
//!
//! let mut client = PodClient::new("pod.example.org", true)?;
//! client.init().await?;
//! client.login("alice", "hunter2", false).await?;
//! let post = client.post("Hello from Rust", &[], Default::default()).await?;
//! println!("published at {}", post.permalink);
//! ```

pub mod client;
pub mod error;
pub mod scrape;
pub mod session;
pub mod transport;

// Re-export key types at crate root

pub use client::{ClientOptions, DeleteTarget, PodClient};
pub use error::TransportError;
pub use session::Session;
pub use transport::{cookie_header, Exchange, Transport, TransportOptions};
