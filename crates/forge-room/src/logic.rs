//! Generic preconditions for standard action kinds (spec.md §4.4 step 4).
//!
//! These run *before* the validator is ever invoked, and only for
//! standard kinds — custom kinds skip them entirely and are judged
//! solely by the room's validator.

use forge_protocol::{ActionKind, ErrorKind, PlayerId, RoomPhase};
use std::collections::HashMap;

use crate::error::RoomError;

/// Checks the generic precondition for `kind`, given the room's current
/// phase and player membership. Returns `Ok(())` when the action may
/// proceed to validator invocation.
pub fn check_preconditions(
    kind: &ActionKind,
    phase: RoomPhase,
    players: &HashMap<PlayerId, forge_store::PlayerRecord>,
    player_id: &PlayerId,
) -> Result<(), RoomError> {
    if !kind.is_standard() {
        return Ok(());
    }

    let present = players.contains_key(player_id);

    match kind {
        ActionKind::Join => {
            if present {
                return Err(RoomError::rejected(
                    ErrorKind::DuplicatePlayer,
                    format!("{player_id} already joined"),
                ));
            }
        }
        ActionKind::Start => {
            if phase != RoomPhase::Lobby {
                return Err(RoomError::rejected(
                    ErrorKind::GameAlreadyActive,
                    "room is not in lobby phase",
                ));
            }
        }
        ActionKind::Move | ActionKind::End => {
            if !present {
                return Err(RoomError::rejected(
                    ErrorKind::NotYourTurn,
                    format!("{player_id} is not a member of this room"),
                ));
            }
            if phase != RoomPhase::Active {
                return Err(RoomError::rejected(
                    ErrorKind::GameNotActive,
                    "room is not active",
                ));
            }
        }
        ActionKind::Update => {
            if !present {
                return Err(RoomError::rejected(
                    ErrorKind::NotYourTurn,
                    format!("{player_id} is not a member of this room"),
                ));
            }
        }
        ActionKind::Custom(_) => unreachable!("custom kinds return early above"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_protocol::RoomId;

    fn empty_players() -> HashMap<PlayerId, forge_store::PlayerRecord> {
        HashMap::new()
    }

    #[test]
    fn custom_kind_always_passes() {
        let players = empty_players();
        let result = check_preconditions(
            &ActionKind::Custom("FIRE".into()),
            RoomPhase::Lobby,
            &players,
            &PlayerId::new("p1"),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn join_rejects_duplicate() {
        let mut players = empty_players();
        let pid = PlayerId::new("p1");
        players.insert(pid.clone(), forge_store::PlayerRecord::new(pid.clone(), 0));
        let err = check_preconditions(&ActionKind::Join, RoomPhase::Lobby, &players, &pid)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicatePlayer);
    }

    #[test]
    fn start_requires_lobby_phase() {
        let players = empty_players();
        let err = check_preconditions(
            &ActionKind::Start,
            RoomPhase::Active,
            &players,
            &PlayerId::new("p1"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GameAlreadyActive);
    }

    #[test]
    fn move_requires_active_phase_and_membership() {
        let players = empty_players();
        let err = check_preconditions(
            &ActionKind::Move,
            RoomPhase::Lobby,
            &players,
            &PlayerId::new("p1"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotYourTurn);
    }

    #[test]
    fn move_by_member_in_active_phase_passes() {
        let mut players = empty_players();
        let pid = PlayerId::new("p1");
        players.insert(pid.clone(), forge_store::PlayerRecord::new(pid.clone(), 0));
        let _ = RoomId::new("r1");
        assert!(check_preconditions(&ActionKind::Move, RoomPhase::Active, &players, &pid).is_ok());
    }
}
