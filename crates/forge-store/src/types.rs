//! The persisted room record — the logical row the store adapter reads
//! and writes. `state`, `players`, and `metadata` are opaque JSON; their
//! schema is whatever the room's validator and the Session Runtime's
//! generic player bookkeeping decide it to be.

use forge_protocol::{ConversionStatus, PlayerId, RoomId, RoomPhase};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub player_id: PlayerId,
    pub joined_at: u64,
    #[serde(default)]
    pub profile: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lives: Option<i64>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub eliminated: bool,
    /// Wall-clock timestamp at which this player's connection last went
    /// inactive. `None` while connected (or once reconnected); read by
    /// the reconnection grace sweep, never by validators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disconnected_since: Option<u64>,
    /// Set by the sweep once `disconnected_since` has aged past the
    /// configured grace window. The player stays in the room's mapping
    /// either way — a room's players never shrink implicitly — this
    /// only marks that the connection itself is no longer eligible to
    /// resume; a later JOIN with the same player id still works the way
    /// any reconnection does.
    #[serde(default)]
    pub connection_expired: bool,
}

fn default_true() -> bool {
    true
}

impl PlayerRecord {
    pub fn new(player_id: PlayerId, joined_at: u64) -> Self {
        Self {
            player_id,
            joined_at,
            profile: serde_json::Value::Null,
            score: None,
            lives: None,
            active: true,
            eliminated: false,
            disconnected_since: None,
            connection_expired: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRoom {
    pub room_id: RoomId,
    pub kind: String,
    /// The original single-player document, recorded durably the moment
    /// conversion is requested so a crash before the conversion task
    /// runs (or before it publishes `document_ref`) can still recover or
    /// retry from the persisted record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_ref: Option<String>,
    pub state: serde_json::Value,
    pub players: HashMap<PlayerId, PlayerRecord>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub version: u64,
    pub phase: RoomPhase,
    pub conversion_status: ConversionStatus,
    pub created_at: u64,
    pub updated_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_error: Option<String>,
}

impl PersistedRoom {
    /// A brand-new room, registered the moment a conversion is
    /// requested: `pending` status, the source document attached, no
    /// validator or published document yet.
    pub fn pending(room_id: RoomId, kind: impl Into<String>, source_document: impl Into<String>, created_at: u64) -> Self {
        Self {
            room_id,
            kind: kind.into(),
            source_document: Some(source_document.into()),
            document_ref: None,
            validator_ref: None,
            state: serde_json::Value::Null,
            players: HashMap::new(),
            metadata: serde_json::Value::Null,
            version: 0,
            phase: RoomPhase::Lobby,
            conversion_status: ConversionStatus::Pending,
            created_at,
            updated_at: created_at,
            conversion_error: None,
        }
    }
}

/// The next version for a commit: a strictly increasing counter with a
/// monotonic wall-clock fallback, resolving the open question over
/// which ordering scheme to use (counter is primary; wall-clock only
/// ever pushes the value higher, never lower).
pub fn next_version(current: u64, monotonic_clock_ms: u64) -> u64 {
    std::cmp::max(current + 1, monotonic_clock_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_version_uses_counter_when_ahead_of_clock() {
        assert_eq!(next_version(100, 5), 101);
    }

    #[test]
    fn next_version_uses_clock_when_ahead_of_counter() {
        assert_eq!(next_version(1, 5_000), 5_000);
    }
}
