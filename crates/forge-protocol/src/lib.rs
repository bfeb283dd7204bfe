//! Wire protocol for the conversion & runtime platform.
//!
//! This crate defines the "language" every other crate speaks:
//!
//! - **Types** ([`Action`], [`Event`], [`Broadcast`], [`RoomId`], etc.) —
//!   the message structures that travel on the wire, between the
//!   sandboxed game document, its host, and the Session Runtime.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ErrorKind`], [`ActionError`], [`ProtocolError`]) — the
//!   shared taxonomy every crate's own error type maps into, and what
//!   can go wrong at the codec boundary specifically.
//!
//! # Architecture
//!
//! ```text
//! Client action  → Transport → Protocol (Action)   → Session Runtime
//! Bridge event    → Transport → Protocol (Event)    → Event Bridge router
//! Committed state → Session Runtime → Protocol (Broadcast) → Transport → subscribers
//! ```
//!
//! None of these types know about rooms, validators, or sockets — they
//! only know how to serialize and deserialize messages and describe the
//! shared error vocabulary.

mod codec;
mod error;
mod request;
mod types;

pub use codec::Codec;
pub use codec::JsonCodec;
pub use error::{ActionError, ErrorKind, ProtocolError};
pub use request::ClientRequest;
pub use types::{
    Action, ActionErrorView, ActionKind, Broadcast, BroadcastKind, ConversionStatus, Event,
    EventKind, EventMetadata, EventPriority, PlayerId, PlayerView, RoomId, RoomListEntry,
    RoomPhase, RoomSnapshot, SnapshotTag, SubmitResponse, SubscriptionEvent, UpdateScope,
};
