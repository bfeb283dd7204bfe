//! Wire shapes for the two directions of the bridge↔host channel (§6).

use forge_protocol::{Event, PlayerId, RoomId};
use serde::{Deserialize, Serialize};

/// The tag every bridge→host envelope carries so the host can tell it
/// apart from other `postMessage` traffic sharing the same frame.
pub const BRIDGE_SOURCE: &str = "GameEventBridge";

/// The tag every host→bridge message carries, mirroring `BRIDGE_SOURCE`.
pub const BRIDGE_TARGET: &str = "GameEventBridge";

/// `{source:"GameEventBridge", roomId, playerId, events[]}` — what the
/// in-document library posts to its enclosing host frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeEnvelope {
    pub source: String,
    pub room_id: RoomId,
    pub player_id: PlayerId,
    pub events: Vec<Event>,
}

impl BridgeEnvelope {
    pub fn new(room_id: RoomId, player_id: PlayerId, events: Vec<Event>) -> Self {
        Self {
            source: BRIDGE_SOURCE.to_string(),
            room_id,
            player_id,
            events,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.source == BRIDGE_SOURCE
    }
}

/// The four kinds the host may push down to a bridge instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessageKind {
    StateUpdate,
    PlayerAction,
    GameEvent,
    ConfigUpdate,
}

/// `{target:"GameEventBridge", roomId, type, ...}` — what the host
/// pushes down to a bridge instance, routed by `room_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostMessage {
    pub target: String,
    pub room_id: RoomId,
    #[serde(rename = "type")]
    pub kind: HostMessageKind,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl HostMessage {
    pub fn new(room_id: RoomId, kind: HostMessageKind, data: serde_json::Value) -> Self {
        Self {
            target: BRIDGE_TARGET.to_string(),
            room_id,
            kind,
            data,
        }
    }
}
