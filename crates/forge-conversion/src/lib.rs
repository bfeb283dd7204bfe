//! Orchestrates the Conversion Pipeline: analysis, adaptive prompt
//! construction, the collaborator call, document instrumentation,
//! validator synthesis, and publication — the steps that take a
//! `pending` room from a source document to a `complete` multiplayer
//! pair of artifacts, or to a `failed` status with a structured,
//! retry-friendly reason.
//!
//! [`pipeline::ConversionPipeline`] is the entry point; everything
//! else in this crate is a pure or independently-testable step it
//! composes.

pub mod error;
pub mod instrument;
pub mod pipeline;
pub mod prompt;
pub mod synth;

pub use error::ConversionError;
pub use instrument::{inject_bridge, inject_markers, RoomConfigPayload};
pub use pipeline::{ConversionConfig, ConversionPipeline, ConversionStatusReport};
pub use prompt::build_prompt;
pub use synth::synthesize_validator;
