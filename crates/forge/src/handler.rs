//! Per-connection handler: handshake, auth, and request/response
//! dispatch.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler. The flow is:
//!   1. Receive a handshake token, authenticate it → `PlayerId`.
//!   2. Loop: decode a [`ClientRequest`], dispatch it, send the
//!      [`ServerResponse`]. A `Subscribe` request instead opens a
//!      standing stream: a leading snapshot followed by ordered
//!      broadcasts, interleaved with any further requests on the same
//!      connection via `tokio::select!`.

use std::sync::Arc;
use std::time::Duration;

use forge_protocol::{ClientRequest, Codec, SubscriptionEvent};
use forge_room::RoomManager;
use forge_sandbox::Sandbox;
use forge_store::StoreAdapter;
use forge_transport::{Connection, WebSocketConnection};
use serde::Deserialize;

use crate::auth::Authenticator;
use crate::error::ForgeError;
use crate::response::ServerResponse;
use crate::server::ServerState;

/// The only message a connection sends before it's authenticated. Not
/// part of `forge-protocol`'s mutation surface — it's a connection-level
/// concern, not a wire type shared with the conversion pipeline or the
/// room runtime.
#[derive(Debug, Deserialize)]
struct HandshakeMessage {
    token: String,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, B, C, A>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, B, C, A>>,
) -> Result<(), ForgeError>
where
    S: StoreAdapter + Send + Sync + 'static,
    B: Sandbox + Send + Sync + 'static,
    A: Authenticator,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let player_id = authenticate(&conn, &state).await?;
    tracing::info!(%conn_id, %player_id, "player authenticated");

    let mut subscription: Option<(
        forge_protocol::RoomId,
        tokio::sync::broadcast::Receiver<forge_protocol::Broadcast>,
    )> = None;

    // `interval_at` rather than `interval`: the latter's first tick fires
    // immediately, which would ping every connection right after accept.
    let mut heartbeat = tokio::time::interval_at(
        tokio::time::Instant::now() + state.config.heartbeat_interval,
        state.config.heartbeat_interval,
    );
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        if let Some((room_id, rx)) = subscription.as_mut() {
            tokio::select! {
                biased;
                broadcast = rx.recv() => {
                    match broadcast {
                        Ok(b) => {
                            send_event(&conn, &state.codec, SubscriptionEvent::Broadcast(b)).await?;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(%room_id, skipped, "subscriber lagged, dropping missed broadcasts");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            subscription = None;
                        }
                    }
                }
                _ = heartbeat.tick() => {
                    check_heartbeat(&conn, &state).await?;
                }
                data = conn.recv() => {
                    match data? {
                        Some(bytes) => {
                            if let Some(req) = decode_request(&state.codec, &bytes) {
                                if let ClientRequest::Subscribe { room_id } = &req {
                                    subscription = start_subscription(&state, &conn, room_id).await?;
                                    continue;
                                }
                                let resp = dispatch(&state, player_id.clone(), req).await;
                                send_response(&conn, &state.codec, resp).await?;
                            }
                        }
                        None => {
                            tracing::info!(%conn_id, "connection closed cleanly");
                            return Ok(());
                        }
                    }
                }
            }
            continue;
        }

        tokio::select! {
            biased;
            _ = heartbeat.tick() => {
                check_heartbeat(&conn, &state).await?;
                continue;
            }
            data = conn.recv() => {
                let data = match data? {
                    Some(bytes) => bytes,
                    None => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        return Ok(());
                    }
                };

                let Some(req) = decode_request(&state.codec, &data) else {
                    continue;
                };

                if let ClientRequest::Subscribe { room_id } = &req {
                    subscription = start_subscription(&state, &conn, room_id).await?;
                    continue;
                }

                let resp = dispatch(&state, player_id.clone(), req).await;
                send_response(&conn, &state.codec, resp).await?;
            }
        }
    }
}

/// Sends a heartbeat ping and closes the connection if the peer has
/// gone quiet past `heartbeat_timeout`.
async fn check_heartbeat<S, B, C, A>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<S, B, C, A>>,
) -> Result<(), ForgeError> {
    if conn.is_stale(state.config.heartbeat_timeout) {
        tracing::info!(conn_id = %conn.id(), "connection timed out, no heartbeat activity");
        let _ = conn.close().await;
        return Err(ForgeError::Transport(forge_transport::TransportError::ConnectionClosed(
            "heartbeat timeout".into(),
        )));
    }
    conn.send_ping().await.map_err(ForgeError::Transport)
}

async fn authenticate<S, B, C, A>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<S, B, C, A>>,
) -> Result<forge_protocol::PlayerId, ForgeError>
where
    A: Authenticator,
{
    let data = tokio::time::timeout(state.config.handshake_timeout, conn.recv())
        .await
        .map_err(|_| {
            ForgeError::Protocol(forge_protocol::ProtocolError::InvalidMessage(
                "handshake timed out".into(),
            ))
        })??
        .ok_or_else(|| {
            ForgeError::Protocol(forge_protocol::ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            ))
        })?;

    let handshake: HandshakeMessage = state.codec.decode(&data)?;
    let player_id = state.auth.authenticate(&handshake.token).await?;
    Ok(player_id)
}

fn decode_request(codec: &forge_protocol::JsonCodec, data: &[u8]) -> Option<ClientRequest> {
    match codec.decode(data) {
        Ok(req) => Some(req),
        Err(e) => {
            tracing::debug!(error = %e, "failed to decode client request, ignoring frame");
            None
        }
    }
}

/// Opens a subscription: registers the broadcast receiver *before*
/// fetching the snapshot, so any commit that lands in the gap between
/// the two is still observed as a broadcast rather than silently
/// missed. The snapshot is sent immediately so the stream always opens
/// `SNAPSHOT` then ordered broadcasts, per the subscribe contract.
async fn start_subscription<S, B, C, A>(
    state: &Arc<ServerState<S, B, C, A>>,
    conn: &WebSocketConnection,
    room_id: &forge_protocol::RoomId,
) -> Result<
    Option<(
        forge_protocol::RoomId,
        tokio::sync::broadcast::Receiver<forge_protocol::Broadcast>,
    )>,
    ForgeError,
>
where
    S: StoreAdapter + Send + Sync + 'static,
    B: Sandbox + Send + Sync + 'static,
{
    let rx = match state.rooms.subscribe(room_id).await {
        Ok(rx) => rx,
        Err(e) => {
            tracing::debug!(%room_id, error = %e, "subscribe failed");
            return Ok(None);
        }
    };

    let snapshot = match state.rooms.snapshot(room_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::debug!(%room_id, error = %e, "snapshot failed after subscribe");
            return Ok(None);
        }
    };

    send_event(conn, &state.codec, SubscriptionEvent::Snapshot(snapshot)).await?;

    Ok(Some((room_id.clone(), rx)))
}

/// Dispatches one decoded request to the right subsystem and builds the
/// response. `Subscribe` never reaches here — the caller intercepts it
/// before dispatch.
async fn dispatch<S, B, C, A>(
    state: &Arc<ServerState<S, B, C, A>>,
    authenticated_player: forge_protocol::PlayerId,
    request: ClientRequest,
) -> ServerResponse
where
    S: StoreAdapter + Send + Sync + 'static,
    B: Sandbox + Send + Sync + 'static,
    C: forge_llm::TextCollaborator,
{
    match request {
        ClientRequest::CreateRoom {
            kind,
            initial_state,
            players,
            metadata,
        } => match state.rooms.create_room(kind).await {
            Ok(room_id) => {
                if initial_state.is_some() || players.is_some() || metadata.is_some() {
                    if let Ok(Some(room)) = state.store.get(&room_id).await {
                        let version = room.version;
                        let _ = state
                            .store
                            .update_fields(&room_id, version, move |r| {
                                if let Some(state) = initial_state {
                                    r.state = state;
                                }
                                if let Some(players) = players {
                                    let now = r.created_at;
                                    for player_id in players {
                                        r.players.insert(
                                            player_id.clone(),
                                            forge_store::PlayerRecord::new(player_id, now),
                                        );
                                    }
                                }
                                if let Some(metadata) = metadata {
                                    r.metadata = metadata;
                                }
                            })
                            .await;
                    }
                }
                ServerResponse::RoomCreated { room_id }
            }
            Err(e) => ServerResponse::error(e.kind().as_str(), e.to_string(), e.retryable()),
        },

        ClientRequest::RequestConversion {
            room_id,
            source_document,
        } => match state
            .conversion
            .request_conversion(room_id, source_document)
            .await
        {
            Ok(report) => ServerResponse::ConversionRequested(report.into()),
            Err(e) => ServerResponse::error(e.reason_code(), e.to_string(), false),
        },

        ClientRequest::Submit {
            room_id,
            mut action,
        } => {
            // The transport boundary stamps the authenticated identity;
            // whatever player_id the client sent in the payload is
            // untrusted and discarded here.
            action.player_id = authenticated_player;
            match state
                .rooms
                .submit(&room_id, action, state.config.runtime.submit_deadline)
                .await
            {
                Ok(resp) => ServerResponse::Submitted(resp),
                Err(e) => ServerResponse::error(e.kind().as_str(), e.to_string(), e.retryable()),
            }
        }

        ClientRequest::GetRoom { room_id } => match state.store.get(&room_id).await {
            Ok(Some(room)) => ServerResponse::Room(room),
            Ok(None) => ServerResponse::error("ROOM_NOT_FOUND", "no such room", false),
            Err(e) => ServerResponse::error("STORE_FAILURE", e.to_string(), true),
        },

        ClientRequest::ListRooms { kind_filter } => {
            let mut rooms = state.rooms.list_rooms().await;
            if let Some(kind) = kind_filter {
                rooms.retain(|r| r.kind == kind);
            }
            ServerResponse::RoomList { rooms }
        }

        ClientRequest::Subscribe { .. } => {
            unreachable!("Subscribe is intercepted before dispatch")
        }
    }
}

async fn send_response(
    conn: &WebSocketConnection,
    codec: &forge_protocol::JsonCodec,
    response: ServerResponse,
) -> Result<(), ForgeError> {
    let bytes = codec.encode(&response)?;
    conn.send(&bytes).await.map_err(ForgeError::Transport)
}

async fn send_event(
    conn: &WebSocketConnection,
    codec: &forge_protocol::JsonCodec,
    event: SubscriptionEvent,
) -> Result<(), ForgeError> {
    let bytes = codec.encode(&event)?;
    conn.send(&bytes).await.map_err(ForgeError::Transport)
}
