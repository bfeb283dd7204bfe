//! Core protocol types for the platform's wire format.
//!
//! This module defines every type that travels "on the wire": the room
//! identity types, the client→server Action envelope, the client-side
//! bridge Event envelope, and the server→client Broadcast envelope. These
//! three message families are the entire vocabulary the rest of the
//! system speaks.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Player identity is authenticated upstream of this system (see the
/// platform's auth boundary); this type is an opaque newtype over that
/// already-authenticated string, not a value the server mints itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A unique identifier for a room (one converted game instance).
///
/// Unlike a server-assigned counter, a `RoomId` must be globally unique
/// and shareable (a player pastes it into a URL to invite a friend), so
/// it wraps a `String` rather than an integer. [`RoomId::generate`] mints
/// a fresh one from a UUIDv4; [`RoomId::new`] accepts an externally
/// provisioned identifier verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mints a fresh, globally unique room identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// RoomPhase / ConversionStatus — lifecycle enums
// ---------------------------------------------------------------------------

/// Where a Room sits in its lobby → active → ended lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    Lobby,
    Active,
    Ended,
}

/// Where a Room sits in its conversion lifecycle.
///
/// Only `Complete` rooms ever reach [`RoomPhase::Lobby`]; a room requested
/// but not yet converted has no validator to admit actions through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

// ---------------------------------------------------------------------------
// ActionKind — JOIN/START/MOVE/UPDATE/END or a game-defined custom tag
// ---------------------------------------------------------------------------

/// The kind of a client action.
///
/// Five kinds are standard and get generic preconditions and generic
/// fallback handlers from the Session Runtime (see `forge-room`); any
/// other tag is a game-defined custom kind that skips those generic
/// preconditions entirely and is handled solely by the room's validator.
///
/// Wire representation is a plain JSON string — `"MOVE"`, `"JOIN"`, or
/// whatever custom tag a validator declares — not a tagged enum, because
/// the set of custom tags isn't known to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Join,
    Start,
    Move,
    Update,
    End,
    Custom(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Join => "JOIN",
            ActionKind::Start => "START",
            ActionKind::Move => "MOVE",
            ActionKind::Update => "UPDATE",
            ActionKind::End => "END",
            ActionKind::Custom(tag) => tag.as_str(),
        }
    }

    /// Whether the Session Runtime has generic preconditions and a
    /// fallback handler for this kind. Custom kinds have neither.
    pub fn is_standard(&self) -> bool {
        !matches!(self, ActionKind::Custom(_))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for ActionKind {
    fn from(s: &str) -> Self {
        match s {
            "JOIN" => ActionKind::Join,
            "START" => ActionKind::Start,
            "MOVE" => ActionKind::Move,
            "UPDATE" => ActionKind::Update,
            "END" => ActionKind::End,
            other => ActionKind::Custom(other.to_string()),
        }
    }
}

impl Serialize for ActionKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(ActionKind::from(s.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Action — a client-initiated request to mutate a room
// ---------------------------------------------------------------------------

/// A message sent by a client, to be admitted (or rejected) by a room's
/// validator. `player_id` is carried here but MUST be treated as
/// untrusted input by nothing downstream of the transport layer — the
/// transport is the boundary that stamps the authenticated identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub player_id: PlayerId,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_seq: Option<u64>,
}

impl Action {
    pub fn new(kind: ActionKind, player_id: PlayerId, data: serde_json::Value) -> Self {
        Self {
            kind,
            player_id,
            data,
            client_seq: None,
        }
    }

    pub fn with_client_seq(mut self, seq: u64) -> Self {
        self.client_seq = Some(seq);
        self
    }
}

// ---------------------------------------------------------------------------
// BroadcastKind / Broadcast — server-authored change notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BroadcastKind {
    PlayerJoined,
    GameStarted,
    MoveMade,
    StateUpdate,
    GameEnded,
    CustomAction,
}

/// Fanned out by the Session Runtime after a committed mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Broadcast {
    pub kind: BroadcastKind,
    pub change: String,
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<serde_json::Value>,
}

impl Broadcast {
    pub fn new(kind: BroadcastKind, change: impl Into<String>, version: u64) -> Self {
        Self {
            kind,
            change: change.into(),
            version,
            snapshot: None,
            delta: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: serde_json::Value) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn with_delta(mut self, delta: serde_json::Value) -> Self {
        self.delta = Some(delta);
        self
    }
}

// ---------------------------------------------------------------------------
// Event — emitted by the client-side bridge, observational only
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Transition,
    Interaction,
    /// Resolved per the Open Question in the design notes: rather than
    /// splitting into two kinds, `Update` carries a `scope` on its
    /// metadata (see [`UpdateScope`]) distinguishing a state display
    /// mutated locally by the game from state pushed by the host.
    Update,
    Error,
}

/// Disambiguates the two things that used to both be called "state
/// update": a marker element the game itself changed, versus a state
/// push the bridge relayed from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateScope {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPriority {
    Normal,
    High,
}

impl Default for EventPriority {
    fn default() -> Self {
        EventPriority::Normal
    }
}

/// Metadata stamped on every bridge event at `emit` time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    pub room_id: RoomId,
    pub player_id: PlayerId,
    pub session_id: String,
    pub timestamp: u64,
    pub sequence_number: u64,
    #[serde(default)]
    pub priority: EventPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<UpdateScope>,
}

/// An observation emitted by the game document to its host. Events never
/// mutate server state directly; they are metadata about intent, not
/// commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub data: serde_json::Value,
    pub metadata: EventMetadata,
}

// ---------------------------------------------------------------------------
// Action submission response / subscription stream (§6 External Interfaces)
// ---------------------------------------------------------------------------

/// Wire-friendly projection of a player record, used in snapshots and
/// submit responses. `forge_store::PlayerRecord` is the canonical,
/// owning-crate representation; this is its serialized shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub player_id: PlayerId,
    pub joined_at: u64,
    #[serde(default)]
    pub profile: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lives: Option<i64>,
    pub active: bool,
    pub eliminated: bool,
}

/// The response to `submit(roomId, action)`: `{success, state?, players?,
/// stateVersion?, broadcast?, error?, timestamp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<PlayerView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_version: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcast: Option<Broadcast>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionErrorView>,
    pub timestamp: u64,
}

/// The error shape embedded in a failed [`SubmitResponse`]: a taxonomy
/// tag plus whether the client may reasonably retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionErrorView {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

/// The always-`"SNAPSHOT"` tag on the first message of a subscription
/// stream (see [`RoomSnapshot`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotTag {
    Snapshot,
}

/// The first message `subscribe` MUST deliver: `{kind:"SNAPSHOT", state,
/// players, version}`. Every subsequent message on the stream is a
/// [`Broadcast`], in version order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub kind: SnapshotTag,
    pub state: serde_json::Value,
    pub players: Vec<PlayerView>,
    pub version: u64,
}

impl RoomSnapshot {
    pub fn new(state: serde_json::Value, players: Vec<PlayerView>, version: u64) -> Self {
        Self {
            kind: SnapshotTag::Snapshot,
            state,
            players,
            version,
        }
    }
}

/// One message on a subscription stream: the leading snapshot, or any
/// of the ordered broadcasts that follow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubscriptionEvent {
    Snapshot(RoomSnapshot),
    Broadcast(Broadcast),
}

// ---------------------------------------------------------------------------
// RoomListEntry — summary used by listRooms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListEntry {
    pub room_id: RoomId,
    pub kind: String,
    pub player_count: usize,
    pub max_players: usize,
    pub phase: RoomPhase,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerId::new("p1")).unwrap();
        assert_eq!(json, "\"p1\"");
    }

    #[test]
    fn room_id_generate_is_unique() {
        assert_ne!(RoomId::generate(), RoomId::generate());
    }

    #[test]
    fn action_kind_round_trips_standard_tags() {
        for tag in ["JOIN", "START", "MOVE", "UPDATE", "END"] {
            let kind = ActionKind::from(tag);
            assert!(kind.is_standard());
            let json = serde_json::to_string(&kind).unwrap();
            let decoded: ActionKind = serde_json::from_str(&json).unwrap();
            assert_eq!(decoded.as_str(), tag);
        }
    }

    #[test]
    fn action_kind_custom_tag_preserved() {
        let kind = ActionKind::from("FIRE_WEAPON");
        assert!(!kind.is_standard());
        assert_eq!(kind.as_str(), "FIRE_WEAPON");
    }

    #[test]
    fn action_round_trip_with_client_seq() {
        let action = Action::new(
            ActionKind::Move,
            PlayerId::new("p1"),
            serde_json::json!({"row": 0, "col": 0}),
        )
        .with_client_seq(7);
        let bytes = serde_json::to_vec(&action).unwrap();
        let decoded: Action = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.client_seq, Some(7));
        assert_eq!(decoded.kind.as_str(), "MOVE");
    }

    #[test]
    fn action_client_seq_omitted_when_absent() {
        let action = Action::new(ActionKind::Join, PlayerId::new("p1"), serde_json::Value::Null);
        let json: serde_json::Value = serde_json::to_value(&action).unwrap();
        assert!(json.get("playerId").is_some(), "fields must serialize as camelCase");
        assert!(json.get("client_seq").is_none(), "snake_case key must not leak onto the wire");
        assert!(json.get("clientSeq").is_none(), "clientSeq should be omitted entirely when absent");
    }

    #[test]
    fn broadcast_kind_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&BroadcastKind::GameEnded).unwrap();
        assert_eq!(json, "\"GAME_ENDED\"");
    }

    #[test]
    fn event_kind_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&EventKind::Interaction).unwrap();
        assert_eq!(json, "\"INTERACTION\"");
    }

    #[test]
    fn event_round_trip_with_scope() {
        let event = Event {
            kind: EventKind::Update,
            data: serde_json::json!({"value": 3}),
            metadata: EventMetadata {
                room_id: RoomId::new("r1"),
                player_id: PlayerId::new("p1"),
                session_id: "s1".into(),
                timestamp: 1000,
                sequence_number: 1,
                priority: EventPriority::Normal,
                scope: Some(UpdateScope::Local),
            },
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: Event = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.metadata.scope, Some(UpdateScope::Local));
    }

    #[test]
    fn conversion_status_serializes_snake_case() {
        let json = serde_json::to_string(&ConversionStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }

    #[test]
    fn room_phase_serializes_snake_case() {
        let json = serde_json::to_string(&RoomPhase::Lobby).unwrap();
        assert_eq!(json, "\"lobby\"");
    }

    #[test]
    fn decode_garbage_returns_error() {
        let garbage = b"not json at all";
        let result: Result<Action, _> = serde_json::from_slice(garbage);
        assert!(result.is_err());
    }
}
