// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Podlink Core
//!
//! Domain models and the error taxonomy for the podlink client.
//!
//! This crate holds everything the client crates agree on without doing
//! any I/O of its own:
//!
//! - [`PodError`] / [`ErrorKind`] - the structured failure taxonomy every
//!   pod operation reports through
//! - [`Aspect`] / [`AspectSelection`] - recipient groups and their wire
//!   encoding (the literal `"public"` or an id array)
//! - [`PostPayload`] / [`PostRef`] - the publish request body and the
//!   parsed response, permalink included
//! - Service list helpers ([`seed_services`], [`service_display_name`])

pub mod error;
pub mod models;

// Re-export error types
pub use error::{ErrorKind, PodError};

// Re-export all model types
pub use models::{
    seed_aspects, seed_services, service_display_name, Aspect, AspectSelection, PostPayload,
    PostRef, StatusMessage, PUBLIC_ASPECT_ID, PUBLIC_ASPECT_NAME,
};
