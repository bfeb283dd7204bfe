//! The narrow boundary between this workspace and "the LLM".
//!
//! Nothing outside this crate knows which vendor, model, or transport
//! answers a [`TextCollaborator::complete`] call — prompt in, text out,
//! bounded by a time and retry budget. The conversion pipeline is the
//! only consumer; it never sees an HTTP client, an API key, or a
//! vendor-specific response shape.

pub mod contract;
pub mod error;
pub mod http;
pub mod mock;

pub use contract::{CollaboratorBudget, RetryingCollaborator, TextCollaborator};
pub use error::LlmError;
pub use http::HttpCollaborator;
pub use mock::MockCollaborator;
