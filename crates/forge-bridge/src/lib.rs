//! Event Bridge: protocol and host-side logic for the channel between a
//! sandboxed game document and its host.
//!
//! The bridge's DOM-facing half — auto-interception via markers, and
//! posting to an enclosing iframe — is inherently JavaScript and is out
//! of scope for this crate (reimplementing a DOM event listener in Rust
//! would not be idiomatic Rust). What this crate implements is the part
//! that is testable and server-side:
//!
//! - [`envelope`] — the wire shapes of the bridge↔host channel.
//! - [`client`] — [`BridgeClient`], the batching/sequencing/backoff
//!   state machine the in-document library runs on every `emit`.
//! - [`router`] — [`BridgeRouter`], the host-side counterpart that
//!   receives envelopes, validates them, and dispatches to subscribers.
//! - [`markers`] — the marker attribute name constants the Analyzer and
//!   Conversion Pipeline inject into instrumented documents.

pub mod client;
pub mod envelope;
pub mod markers;
pub mod router;

pub use client::{BatchConfig, BridgeClient, EmitOptions, InvalidKind, SendBackoff};
pub use envelope::{BridgeEnvelope, HostMessage, HostMessageKind, BRIDGE_SOURCE, BRIDGE_TARGET};
pub use markers::{ACTION_MARKER, ALL_MARKERS, STATE_MARKER, TOUCH_MARKER};
pub use router::{BridgeRouter, RouterError};
