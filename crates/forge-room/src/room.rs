//! Room actor: an isolated Tokio task that owns one room's authoritative
//! state and is the sole writer of its store record.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel — the same actor-model shape the platform
//! has always used, now carrying `submit`/`snapshot`/`subscribe`
//! instead of a compile-time-generic game's join/leave/message
//! commands. The validator itself is erased behind `Arc<dyn Validator>`
//! and resolved at runtime (see `forge-sandbox`), so the actor is
//! generic only over the store and sandbox implementations, not over a
//! game type.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use forge_protocol::{
    Action, ActionErrorView, ActionKind, Broadcast, BroadcastKind, ConversionStatus, ErrorKind,
    PlayerId, PlayerView, RoomId, RoomPhase, RoomSnapshot, SubmitResponse,
};
use forge_sandbox::{Sandbox, SandboxHandle};
use forge_store::{PersistedRoom, PlayerRecord, StoreAdapter};
use forge_validator::{GenericValidator, Validator, ValidatorInput};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::RuntimeConfig;
use crate::error::RoomError;
use crate::logic;

/// Commands sent to a room actor through its mailbox.
pub(crate) enum RoomCommand {
    Submit {
        action: Action,
        received_at: Instant,
        deadline: Duration,
        reply: oneshot::Sender<Result<SubmitResponse, RoomError>>,
    },
    Snapshot {
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    Subscribe {
        reply: oneshot::Sender<broadcast::Receiver<Broadcast>>,
    },
    MarkDisconnected {
        player_id: PlayerId,
    },
    MarkReconnected {
        player_id: PlayerId,
    },
    Shutdown,
}

/// Handle to a running room actor. Cheap to clone — just an
/// `mpsc::Sender` wrapper plus the room's id for error context.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Submits an action for this room to admit or reject. `deadline` is
    /// measured from `received_at`, the instant the caller accepted the
    /// request — not from when the actor happens to dequeue it, so a
    /// slow mailbox counts against the same budget a slow validator
    /// would.
    pub async fn submit(
        &self,
        action: Action,
        received_at: Instant,
        deadline: Duration,
    ) -> Result<SubmitResponse, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Submit {
                action,
                received_at,
                deadline,
                reply,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Snapshot { reply })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id.clone()))?
    }

    /// Subscribes to this room's broadcast stream. The caller is
    /// responsible for fetching a [`RoomSnapshot`] first (via
    /// [`RoomHandle::snapshot`]) so the combined stream opens with a
    /// snapshot followed only by broadcasts at or after its version —
    /// the actor does not stitch the two together itself, to avoid
    /// holding the mailbox open across a slow subscriber's first read.
    pub async fn subscribe(&self) -> Result<broadcast::Receiver<Broadcast>, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Subscribe { reply })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    pub async fn mark_disconnected(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::MarkDisconnected { player_id })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    pub async fn mark_reconnected(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::MarkReconnected { player_id })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }
}

pub(crate) fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn default_broadcast_kind(kind: &ActionKind) -> BroadcastKind {
    match kind {
        ActionKind::Join => BroadcastKind::PlayerJoined,
        ActionKind::Start => BroadcastKind::GameStarted,
        ActionKind::Move => BroadcastKind::MoveMade,
        ActionKind::Update => BroadcastKind::StateUpdate,
        ActionKind::End => BroadcastKind::GameEnded,
        ActionKind::Custom(_) => BroadcastKind::CustomAction,
    }
}

/// Maps a validator's free-text rejection reason back onto the shared
/// taxonomy. Validators built from the generic template emit the tags
/// below verbatim; a synthesized or hand-authored validator is free to
/// return anything else, which is classified as a generic illegal move.
fn error_kind_from_reason(reason: &str) -> ErrorKind {
    match reason {
        "DUPLICATE_PLAYER" => ErrorKind::DuplicatePlayer,
        "GAME_FULL" => ErrorKind::GameFull,
        "NOT_YOUR_TURN" => ErrorKind::NotYourTurn,
        "GAME_NOT_ACTIVE" => ErrorKind::GameNotActive,
        "GAME_ALREADY_ACTIVE" => ErrorKind::GameAlreadyActive,
        "NOT_ENOUGH_PLAYERS" => ErrorKind::NotEnoughPlayers,
        _ => ErrorKind::IllegalMove,
    }
}

fn player_views(players: &std::collections::HashMap<PlayerId, PlayerRecord>) -> Vec<PlayerView> {
    let mut views: Vec<PlayerView> = players
        .values()
        .map(|p| PlayerView {
            player_id: p.player_id.clone(),
            joined_at: p.joined_at,
            profile: p.profile.clone(),
            score: p.score,
            lives: p.lives,
            active: p.active,
            eliminated: p.eliminated,
        })
        .collect();
    views.sort_by_key(|p| p.joined_at);
    views
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<S: StoreAdapter, B: Sandbox> {
    room_id: RoomId,
    store: Arc<S>,
    sandbox: Arc<B>,
    config: RuntimeConfig,
    validator_handle: Option<SandboxHandle>,
    fallback: Arc<GenericValidator>,
    broadcast_tx: broadcast::Sender<Broadcast>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<S: StoreAdapter, B: Sandbox> RoomActor<S, B> {
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Submit {
                    action,
                    received_at,
                    deadline,
                    reply,
                } => {
                    let result = self.handle_submit(action, received_at, deadline).await;
                    let _ = reply.send(result);
                }
                RoomCommand::Snapshot { reply } => {
                    let result = self.handle_snapshot().await;
                    let _ = reply.send(result);
                }
                RoomCommand::Subscribe { reply } => {
                    let _ = reply.send(self.broadcast_tx.subscribe());
                }
                RoomCommand::MarkDisconnected { player_id } => {
                    self.mark_connection(player_id, false).await;
                }
                RoomCommand::MarkReconnected { player_id } => {
                    self.mark_connection(player_id, true).await;
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room_id = %self.room_id, "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    fn error_response(kind: ErrorKind, message: impl Into<String>, timestamp: u64) -> SubmitResponse {
        SubmitResponse {
            success: false,
            state: None,
            players: None,
            state_version: None,
            broadcast: None,
            error: Some(ActionErrorView {
                code: kind.as_str().to_string(),
                message: message.into(),
                retryable: kind.is_retryable(),
            }),
            timestamp,
        }
    }

    async fn handle_submit(
        &mut self,
        action: Action,
        received_at: Instant,
        deadline: Duration,
    ) -> Result<SubmitResponse, RoomError> {
        let now_ms = wall_clock_ms();

        if received_at.elapsed() > deadline {
            return Ok(Self::error_response(
                ErrorKind::TimeoutRetry,
                "submit deadline exceeded before processing began",
                now_ms,
            ));
        }

        let room = self
            .store
            .get(&self.room_id)
            .await?
            .ok_or_else(|| RoomError::NotFound(self.room_id.clone()))?;

        if room.conversion_status != ConversionStatus::Complete {
            return Ok(Self::error_response(
                ErrorKind::RoomNotReady,
                "room conversion is not complete",
                now_ms,
            ));
        }
        if room.phase == RoomPhase::Ended {
            return Ok(Self::error_response(
                ErrorKind::RoomTerminated,
                "room has ended",
                now_ms,
            ));
        }

        if let Err(err) =
            logic::check_preconditions(&action.kind, room.phase, &room.players, &action.player_id)
        {
            return Ok(Self::error_response(err.kind(), err.to_string(), now_ms));
        }

        let input = ValidatorInput {
            action: action.kind.clone(),
            state: room.state.clone(),
            player_id: action.player_id.clone(),
            data: action.data.clone(),
            room_id: self.room_id.clone(),
            timestamp: now_ms,
        };

        let output = match &self.validator_handle {
            Some(handle) => match self
                .sandbox
                .invoke(handle, input.clone(), self.config.validator_deadline)
                .await
            {
                Ok(output) => output,
                Err(err) if action.kind.is_standard() => {
                    tracing::warn!(
                        room_id = %self.room_id,
                        error = %err,
                        "deployed validator unavailable, falling back to generic handler"
                    );
                    self.fallback.invoke(input)
                }
                Err(err) => {
                    let mapped = RoomError::from(err);
                    return Ok(Self::error_response(mapped.kind(), mapped.to_string(), now_ms));
                }
            },
            None => self.fallback.invoke(input),
        };

        if !output.valid {
            let reason = output.reason.unwrap_or_else(|| "rejected".to_string());
            let kind = error_kind_from_reason(&reason);
            return Ok(Self::error_response(kind, reason, now_ms));
        }

        if received_at.elapsed() > deadline {
            return Ok(Self::error_response(
                ErrorKind::TimeoutRetry,
                "submit deadline exceeded before commit",
                now_ms,
            ));
        }

        let updated_state = output.updated_state.unwrap_or_else(|| room.state.clone());
        let broadcast_info = output.broadcast.unwrap_or_default();
        let expected_version = room.version;
        let player_id = action.player_id.clone();
        let action_kind = action.kind.clone();

        let committed = self
            .store
            .update_fields(&self.room_id, expected_version, move |r| {
                r.state = updated_state.clone();
                r.version = forge_store::next_version(r.version, now_ms);
                r.updated_at = now_ms;
                match &action_kind {
                    ActionKind::Join => {
                        r.players
                            .entry(player_id.clone())
                            .or_insert_with(|| PlayerRecord::new(player_id.clone(), now_ms));
                    }
                    ActionKind::Start => r.phase = RoomPhase::Active,
                    ActionKind::End => r.phase = RoomPhase::Ended,
                    _ => {}
                }
            })
            .await?;

        let broadcast_kind = broadcast_info
            .kind
            .unwrap_or_else(|| default_broadcast_kind(&action.kind));
        let mut broadcast =
            Broadcast::new(broadcast_kind, broadcast_info.change, committed.version)
                .with_snapshot(committed.state.clone());
        if let Some(delta) = broadcast_info.delta {
            broadcast = broadcast.with_delta(delta);
        }

        let _ = self.broadcast_tx.send(broadcast.clone());

        Ok(SubmitResponse {
            success: true,
            state: Some(committed.state.clone()),
            players: Some(player_views(&committed.players)),
            state_version: Some(committed.version),
            broadcast: Some(broadcast),
            error: None,
            timestamp: now_ms,
        })
    }

    async fn handle_snapshot(&mut self) -> Result<RoomSnapshot, RoomError> {
        let room = self
            .store
            .get(&self.room_id)
            .await?
            .ok_or_else(|| RoomError::NotFound(self.room_id.clone()))?;
        Ok(RoomSnapshot::new(
            room.state.clone(),
            player_views(&room.players),
            room.version,
        ))
    }

    async fn mark_connection(&mut self, player_id: PlayerId, active: bool) {
        let room_id = self.room_id.clone();
        let result = match self.store.get(&room_id).await {
            Ok(Some(room)) => {
                self.store
                    .update_fields(&room_id, room.version, |r| {
                        if let Some(record) = r.players.get_mut(&player_id) {
                            record.active = active;
                            if active {
                                record.disconnected_since = None;
                                record.connection_expired = false;
                            } else {
                                record.disconnected_since = Some(wall_clock_ms());
                            }
                        }
                    })
                    .await
            }
            Ok(None) => return,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            tracing::warn!(room_id = %self.room_id, %player_id, error = %err, "failed to update connection state");
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate
/// with it. `validator_handle` is `None` when no validator has been
/// deployed yet (conversion still pending) or the room's kind never
/// gets one, in which case every action is judged by `fallback`.
pub(crate) fn spawn_room<S, B>(
    room_id: RoomId,
    store: Arc<S>,
    sandbox: Arc<B>,
    config: RuntimeConfig,
    validator_handle: Option<SandboxHandle>,
    fallback: Arc<GenericValidator>,
) -> RoomHandle
where
    S: StoreAdapter + Send + Sync + 'static,
    B: Sandbox + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel(config.mailbox_size);
    let (broadcast_tx, _) = broadcast::channel(config.broadcast_capacity);

    let actor = RoomActor {
        room_id: room_id.clone(),
        store,
        sandbox,
        config,
        validator_handle,
        fallback,
        broadcast_tx,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
