//! A worked example: converting a tiny turn-based counter game and
//! playing it to completion over a real WebSocket connection.
//!
//! Unlike a hand-authored validator deployed straight into the
//! sandbox, this demo drives the whole Conversion Pipeline: the
//! `sourceDocument` below is plain, unremarkable HTML/JS containing no
//! board markup at all, just a turn pointer and a score variable. The
//! analyzer picks that up as a turn-based, scored game with no board
//! dimensions, and `forge-conversion`'s synthesis step resolves that to
//! the `counter-turn-based` [`forge_validator::GenericValidator`]
//! template with a target of 10 (see `forge-analyzer`'s and
//! `forge-conversion`'s signal catalogs for exactly which tokens this
//! depends on).
//!
//! Run it with `cargo run -p counter-demo`, then connect a WebSocket
//! client and send `{"token": "<playerId>"}` as the first frame.

use std::sync::Arc;

use forge::{AllowAllAuthenticator, ForgeServerBuilder};
use forge_sandbox::InMemorySandbox;
use forge_store::{ArtifactStore, InMemoryArtifactStore, InMemoryStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("starting counter demo server on 0.0.0.0:8080");

    let store = Arc::new(InMemoryStore::new());
    let sandbox = Arc::new(InMemorySandbox::new());
    let artifacts: Arc<dyn ArtifactStore> = Arc::new(InMemoryArtifactStore::new());
    let collaborator = forge_llm::MockCollaborator::new();

    let server = ForgeServerBuilder::new()
        .bind("0.0.0.0:8080")
        .build(store, sandbox, artifacts, collaborator, AllowAllAuthenticator)
        .await?;

    server.run().await?;
    Ok(())
}

/// Source document fed to `requestConversion`. No board/cell/grid
/// markup anywhere in it — just a turn pointer and a score variable —
/// so the analyzer's mechanics flags come back `turns = true, score =
/// true, board_dims = None`, which is exactly the signal combination
/// `forge_conversion::synth::synthesize_validator` maps onto the
/// `counter_turn_based` template.
#[cfg(test)]
const SOURCE_DOCUMENT: &str = r#"
<!DOCTYPE html>
<html>
<body>
  <p>Whoever reaches 10 points first wins.</p>
  <button id="add-point">Add a point</button>
  <script>
    let currentPlayer = 0;
    let score = 0;
    function nextTurn() {
      currentPlayer = 1 - currentPlayer;
    }
    document.getElementById('add-point').onclick = function () {
      score += 1;
      nextTurn();
    };
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use forge::ServerResponse;
    use forge_protocol::{Action, ActionKind, ClientRequest, ConversionStatus, PlayerId, RoomId};
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::Message;

    type Ws = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn start() -> String {
        let store = Arc::new(InMemoryStore::new());
        let sandbox = Arc::new(InMemorySandbox::new());
        let artifacts: Arc<dyn ArtifactStore> = Arc::new(InMemoryArtifactStore::new());
        let collaborator = forge_llm::MockCollaborator::new();

        let server = ForgeServerBuilder::new()
            .bind("127.0.0.1:0")
            .build(store, sandbox, artifacts, collaborator, AllowAllAuthenticator)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        addr
    }

    /// Connects and completes the handshake as `token`. The server
    /// never acks a handshake explicitly — the next frame is read as
    /// the first [`ClientRequest`], so nothing is awaited here beyond
    /// the TCP/WS connect itself.
    async fn connect_as(addr: &str, token: &str) -> Ws {
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        let handshake = serde_json::json!({ "token": token });
        ws.send(Message::Binary(serde_json::to_vec(&handshake).unwrap().into()))
            .await
            .unwrap();
        ws
    }

    async fn request(ws: &mut Ws, req: &ClientRequest) -> ServerResponse {
        ws.send(Message::Binary(serde_json::to_vec(req).unwrap().into()))
            .await
            .unwrap();
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for response")
            .unwrap()
            .unwrap();
        serde_json::from_slice(&msg.into_data()).unwrap()
    }

    async fn submit(ws: &mut Ws, room_id: &RoomId, kind: ActionKind, data: serde_json::Value) -> ServerResponse {
        let action = Action::new(kind, PlayerId::new("ignored-by-server"), data);
        request(ws, &ClientRequest::Submit { room_id: room_id.clone(), action }).await
    }

    async fn await_conversion_complete(ws: &mut Ws, room_id: &RoomId) {
        for _ in 0..200 {
            let resp = request(ws, &ClientRequest::GetRoom { room_id: room_id.clone() }).await;
            match resp {
                ServerResponse::Room(room) => {
                    if room.conversion_status == ConversionStatus::Complete {
                        return;
                    }
                    assert_ne!(
                        room.conversion_status,
                        ConversionStatus::Failed,
                        "conversion failed: {:?}",
                        room.conversion_error
                    );
                }
                other => panic!("expected Room response, got {other:?}"),
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("conversion never reached Complete");
    }

    /// Scenario 1 end to end: a single-player page with no obvious
    /// multiplayer structure, converted and then actually played to a
    /// win by two players racing to a target score of 10.
    #[tokio::test]
    async fn counter_race_to_ten_over_the_wire() {
        let addr = start().await;

        let mut admin = connect_as(&addr, "p1").await;
        let room_id = match request(
            &mut admin,
            &ClientRequest::CreateRoom {
                kind: "counter-turn-based".to_string(),
                initial_state: None,
                players: None,
                metadata: None,
            },
        )
        .await
        {
            ServerResponse::RoomCreated { room_id } => room_id,
            other => panic!("expected RoomCreated, got {other:?}"),
        };

        match request(
            &mut admin,
            &ClientRequest::RequestConversion {
                room_id: room_id.clone(),
                source_document: SOURCE_DOCUMENT.to_string(),
            },
        )
        .await
        {
            ServerResponse::ConversionRequested(_) => {}
            other => panic!("expected ConversionRequested, got {other:?}"),
        }

        await_conversion_complete(&mut admin, &room_id).await;

        let mut p1 = connect_as(&addr, "p1").await;
        let mut p2 = connect_as(&addr, "p2").await;

        let resp = submit(&mut p1, &room_id, ActionKind::Join, serde_json::Value::Null).await;
        assert!(matches!(resp, ServerResponse::Submitted(r) if r.success));

        let resp = submit(&mut p2, &room_id, ActionKind::Join, serde_json::Value::Null).await;
        assert!(matches!(resp, ServerResponse::Submitted(r) if r.success));

        let resp = submit(&mut p1, &room_id, ActionKind::Start, serde_json::Value::Null).await;
        assert!(matches!(resp, ServerResponse::Submitted(r) if r.success));

        let mut mover = &mut p1;
        let mut other = &mut p2;
        let mut last = None;
        for i in 0..10 {
            let resp = submit(&mut *mover, &room_id, ActionKind::Move, serde_json::json!({ "delta": 1 })).await;
            let ServerResponse::Submitted(submitted) = resp else {
                panic!("move {i} rejected");
            };
            assert!(submitted.success, "move {i} should be accepted");
            last = Some(submitted);
            std::mem::swap(&mut mover, &mut other);
        }

        let last = last.unwrap();
        let state = last.state.unwrap();
        assert_eq!(state["counter"], 10);
        assert_eq!(state["phase"], "ended");
        assert_eq!(state["winner"], "p2");
    }

    /// A move submitted before either player has joined is rejected by
    /// the Session Runtime's generic preconditions, not the validator —
    /// proving the pipeline wired a real turn-based validator in and
    /// not the bare multiplayer-everyone-acts fallback.
    #[tokio::test]
    async fn move_before_join_is_rejected() {
        let addr = start().await;
        let mut admin = connect_as(&addr, "p1").await;
        let room_id = match request(
            &mut admin,
            &ClientRequest::CreateRoom {
                kind: "counter-turn-based".to_string(),
                initial_state: None,
                players: None,
                metadata: None,
            },
        )
        .await
        {
            ServerResponse::RoomCreated { room_id } => room_id,
            other => panic!("expected RoomCreated, got {other:?}"),
        };
        request(
            &mut admin,
            &ClientRequest::RequestConversion {
                room_id: room_id.clone(),
                source_document: SOURCE_DOCUMENT.to_string(),
            },
        )
        .await;
        await_conversion_complete(&mut admin, &room_id).await;

        let mut p1 = connect_as(&addr, "p1").await;
        let resp = submit(&mut p1, &room_id, ActionKind::Move, serde_json::json!({ "delta": 1 })).await;
        match resp {
            ServerResponse::Submitted(r) => assert!(!r.success),
            other => panic!("expected Submitted, got {other:?}"),
        }
    }
}
