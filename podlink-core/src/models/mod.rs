//! Domain models for podlink.
//!
//! ## Submodules
//!
//! - [`aspect`] - Recipient groups and the `aspect_ids` wire encoding
//! - [`service`] - Connected third-party services
//! - [`post`] - Publish payloads and the parsed publish response

pub mod aspect;
pub mod post;
pub mod service;

// Re-export everything at the models level
pub use aspect::{
    seed_aspects, Aspect, AspectSelection, PUBLIC_ASPECT_ID, PUBLIC_ASPECT_NAME,
};
pub use post::{PostPayload, PostRef, StatusMessage};
pub use service::{seed_services, service_display_name};
