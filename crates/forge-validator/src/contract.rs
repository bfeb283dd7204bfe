//! The validator module contract.
//!
//! A validator is a pure function over `(action, state)`. It is the sole
//! admission authority for a room: nothing downstream trusts a client's
//! reported state, only what a validator accepts and returns.
//!
//! Validators MUST be deterministic modulo the supplied `timestamp` and
//! MUST NOT perform I/O, read the wall clock, or touch any random
//! source — any nondeterminism a game needs (dice rolls, shuffles) has
//! to be derived from `state` or from the action's own payload. The
//! sandbox (`forge-sandbox`) is what actually polices this; this trait
//! just documents the contract implementations must uphold.

use forge_protocol::{ActionKind, BroadcastKind, PlayerId, RoomId};
use serde::{Deserialize, Serialize};

/// Everything a validator needs to decide one action. Mirrors the
/// `{action, state, playerId, data, roomId}` signature.
#[derive(Debug, Clone)]
pub struct ValidatorInput {
    pub action: ActionKind,
    pub state: serde_json::Value,
    pub player_id: PlayerId,
    pub data: serde_json::Value,
    pub room_id: RoomId,
    /// Monotonic-ish wall clock supplied by the runtime. The only
    /// admissible source of "now" inside a validator.
    pub timestamp: u64,
}

/// What a validator hands back, packaged for a change description the
/// Session Runtime can turn into a [`forge_protocol::Broadcast`] once it
/// has assigned a version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorBroadcast {
    pub kind: Option<BroadcastKind>,
    pub change: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<serde_json::Value>,
}

/// The validator's verdict on an action.
#[derive(Debug, Clone)]
pub struct ValidatorOutput {
    pub valid: bool,
    pub reason: Option<String>,
    pub updated_state: Option<serde_json::Value>,
    pub broadcast: Option<ValidatorBroadcast>,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: u64,
}

impl ValidatorOutput {
    pub fn accept(updated_state: serde_json::Value, broadcast: ValidatorBroadcast, timestamp: u64) -> Self {
        Self {
            valid: true,
            reason: None,
            updated_state: Some(updated_state),
            broadcast: Some(broadcast),
            metadata: None,
            timestamp,
        }
    }

    pub fn reject(reason: impl Into<String>, timestamp: u64) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
            updated_state: None,
            broadcast: None,
            metadata: None,
            timestamp,
        }
    }
}

/// The sole admission authority for a room. Implementations are
/// synchronous and side-effect free by contract; `forge-sandbox` is
/// responsible for actually enforcing that at runtime.
///
/// Kept object-safe (no generics, no `async fn`) because a room's
/// validator is resolved dynamically at runtime by content hash — it is
/// not known at compile time the way a framework-level generic game
/// type would be.
pub trait Validator: Send + Sync {
    /// Decide one action against the current state.
    fn invoke(&self, input: ValidatorInput) -> ValidatorOutput;

    /// Synthesizes the empty initial state for a fresh room, including
    /// `phase = lobby`, empty players, and any kind-specific scaffolding.
    fn initial_state(&self) -> serde_json::Value;

    /// Declared minimum players; overrides the Session Runtime's
    /// generic default when present.
    fn min_players(&self) -> usize {
        1
    }

    /// Declared maximum players; overrides the Session Runtime's
    /// generic default when present.
    fn max_players(&self) -> usize {
        8
    }
}
