//! The external-facing mutation surface (spec.md §6, "Mutation
//! surface"): `createRoom`/`requestConversion`/`submit`/`getRoom`/
//! `listRooms`, expressed as one tagged request/response pair so a
//! transport only has to decode/encode a single envelope type. The
//! operations themselves are implemented by their owning crates
//! (`forge-room`, `forge-conversion`) and wired together by the `forge`
//! meta-crate; this module only defines the wire shape.

use serde::{Deserialize, Serialize};

use crate::types::{Action, PlayerId, RoomId};

/// One request a connected client can make of the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ClientRequest {
    /// `createRoom(roomId, kind, initialState, players?, metadata?)`. The
    /// room identifier is assigned by the server and returned in the
    /// response — clients never mint their own.
    CreateRoom {
        kind: String,
        #[serde(default)]
        initial_state: Option<serde_json::Value>,
        #[serde(default)]
        players: Option<Vec<PlayerId>>,
        #[serde(default)]
        metadata: Option<serde_json::Value>,
    },

    /// `requestConversion(roomId, sourceDocument)`.
    RequestConversion {
        room_id: RoomId,
        source_document: String,
    },

    /// `submit(roomId, action)`.
    Submit { room_id: RoomId, action: Action },

    /// `getRoom(roomId)`.
    GetRoom { room_id: RoomId },

    /// `listRooms(kindFilter?)`.
    ListRooms {
        #[serde(default)]
        kind_filter: Option<String>,
    },

    /// Opens the `subscribe` stream for a room: a leading `SNAPSHOT`
    /// followed by ordered [`crate::Broadcast`]s
    /// ([`crate::SubscriptionEvent`]).
    Subscribe { room_id: RoomId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_room_round_trips_as_camel_case() {
        let req = ClientRequest::CreateRoom {
            kind: "counter-turn-based".to_string(),
            initial_state: None,
            players: None,
            metadata: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["op"], "createRoom");
        assert_eq!(json["kind"], "counter-turn-based");
        let round_tripped: ClientRequest = serde_json::from_value(json).unwrap();
        matches!(round_tripped, ClientRequest::CreateRoom { .. });
    }

    #[test]
    fn submit_carries_room_id_and_action() {
        let req = ClientRequest::Submit {
            room_id: RoomId::new("r1"),
            action: Action::new(
                crate::types::ActionKind::Join,
                PlayerId::new("p1"),
                serde_json::Value::Null,
            ),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["op"], "submit");
        assert_eq!(json["roomId"], "r1");
    }
}
