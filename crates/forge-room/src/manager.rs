//! Room manager: creates rooms, binds synthesized validators to them,
//! and routes `submit`/`snapshot`/`subscribe` to the right actor.
//!
//! Unlike the original per-game manager, this one is generic only over
//! the store and sandbox implementations — not over a compile-time game
//! type — because a room's validator is resolved dynamically (see
//! `forge-validator`/`forge-sandbox`) rather than known at compile time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use forge_protocol::{
    Action, Broadcast, ConversionStatus, PlayerId, RoomId, RoomListEntry, RoomPhase, RoomSnapshot,
    SubmitResponse,
};
use forge_sandbox::{ArtifactAddress, Sandbox};
use forge_store::{PersistedRoom, StoreAdapter};
use forge_validator::{GenericValidator, GenericValidatorConfig, Validator};
use tokio::sync::broadcast;

use crate::config::RuntimeConfig;
use crate::error::RoomError;
use crate::room::{spawn_room, wall_clock_ms, RoomHandle};

struct RoomEntry {
    handle: RoomHandle,
    kind: String,
    max_players: usize,
}

/// Owns every live room actor plus the shared store/sandbox they read
/// and write through.
pub struct RoomManager<S, B> {
    store: Arc<S>,
    sandbox: Arc<B>,
    config: RuntimeConfig,
    rooms: Mutex<HashMap<RoomId, RoomEntry>>,
}

impl<S, B> RoomManager<S, B>
where
    S: StoreAdapter + Send + Sync + 'static,
    B: Sandbox + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, sandbox: Arc<B>, config: RuntimeConfig) -> Self {
        Self {
            store,
            sandbox,
            config,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    fn default_fallback(&self, min_players: usize, max_players: usize) -> Arc<GenericValidator> {
        Arc::new(GenericValidator::new(GenericValidatorConfig {
            min_players,
            max_players,
            ..Default::default()
        }))
    }

    /// Registers a brand-new room the moment a conversion is requested:
    /// `pending` status, no validator yet. The actor spawns immediately
    /// so `submit`/`snapshot` have somewhere to route to even before
    /// conversion completes — every submit against it is rejected with
    /// `ROOM_NOT_READY` until [`RoomManager::deploy_validator`] runs.
    pub async fn create_room(&self, kind: impl Into<String>) -> Result<RoomId, RoomError> {
        self.create_room_with_document(kind, String::new()).await
    }

    /// Registers a brand-new room with its source document attached up
    /// front, so a crash before `ConversionPipeline::request_conversion`
    /// ever runs still leaves a recoverable record. `create_room` is the
    /// thin wrapper callers that don't yet have a document in hand (or
    /// attach it later via `request_conversion`) should use instead.
    pub async fn create_room_with_document(
        &self,
        kind: impl Into<String>,
        source_document: impl Into<String>,
    ) -> Result<RoomId, RoomError> {
        let kind = kind.into();
        let room_id = RoomId::generate();
        let room = PersistedRoom::pending(room_id.clone(), kind.clone(), source_document.into(), wall_clock_ms());
        self.store.put(room).await?;

        let fallback =
            self.default_fallback(self.config.default_min_players, self.config.default_max_players);
        let handle = spawn_room(
            room_id.clone(),
            self.store.clone(),
            self.sandbox.clone(),
            self.config.clone(),
            None,
            fallback,
        );

        let mut rooms = self.rooms.lock().expect("room registry poisoned");
        rooms.insert(
            room_id.clone(),
            RoomEntry {
                handle,
                kind,
                max_players: self.config.default_max_players,
            },
        );
        tracing::info!(%room_id, "room registered, awaiting conversion");
        Ok(room_id)
    }

    pub async fn mark_processing(&self, room_id: &RoomId) -> Result<(), RoomError> {
        let room = self
            .store
            .get(room_id)
            .await?
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        self.store
            .update_fields(room_id, room.version, |r| {
                r.conversion_status = ConversionStatus::Processing;
            })
            .await?;
        Ok(())
    }

    pub async fn mark_conversion_failed(
        &self,
        room_id: &RoomId,
        reason: impl Into<String>,
    ) -> Result<(), RoomError> {
        let room = self
            .store
            .get(room_id)
            .await?
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        let reason = reason.into();
        self.store
            .update_fields(room_id, room.version, move |r| {
                r.conversion_status = ConversionStatus::Failed;
                r.conversion_error = Some(reason.clone());
            })
            .await?;
        Ok(())
    }

    /// Binds a synthesized validator to a room once conversion
    /// completes and replaces its actor, so subsequent submits resolve
    /// through the sandbox instead of the bare generic fallback. The
    /// old actor is shut down only after the new one is registered, so
    /// there is no window where the room has no handle at all.
    pub async fn deploy_validator(
        &self,
        room_id: &RoomId,
        content_hash: impl Into<String>,
        validator: Arc<dyn Validator>,
    ) -> Result<(), RoomError> {
        let content_hash = content_hash.into();
        let min_players = validator.min_players();
        let max_players = validator.max_players();
        let initial_state = validator.initial_state();

        let address = ArtifactAddress::new(content_hash.clone(), room_id.as_str());
        let sandbox_handle = self.sandbox.deploy(address, validator)?;

        let room = self
            .store
            .get(room_id)
            .await?
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        let kind = room.kind.clone();
        let stored_hash = content_hash.clone();
        self.store
            .update_fields(room_id, room.version, move |r| {
                if r.state.is_null() {
                    r.state = initial_state.clone();
                }
                r.validator_ref = Some(stored_hash.clone());
                r.conversion_status = ConversionStatus::Complete;
            })
            .await?;

        let fallback = self.default_fallback(min_players, max_players);
        let new_handle = spawn_room(
            room_id.clone(),
            self.store.clone(),
            self.sandbox.clone(),
            self.config.clone(),
            Some(sandbox_handle),
            fallback,
        );

        let old_handle = {
            let rooms = self.rooms.lock().expect("room registry poisoned");
            rooms.get(room_id).map(|e| e.handle.clone())
        };

        {
            let mut rooms = self.rooms.lock().expect("room registry poisoned");
            rooms.insert(
                room_id.clone(),
                RoomEntry {
                    handle: new_handle,
                    kind,
                    max_players,
                },
            );
        }

        if let Some(old) = old_handle {
            let _ = old.shutdown().await;
        }

        tracing::info!(%room_id, %content_hash, "validator deployed");
        Ok(())
    }

    pub async fn submit(
        &self,
        room_id: &RoomId,
        action: Action,
        deadline: Duration,
    ) -> Result<SubmitResponse, RoomError> {
        let handle = self.handle_for(room_id)?;
        handle.submit(action, Instant::now(), deadline).await
    }

    pub async fn snapshot(&self, room_id: &RoomId) -> Result<RoomSnapshot, RoomError> {
        self.handle_for(room_id)?.snapshot().await
    }

    pub async fn subscribe(&self, room_id: &RoomId) -> Result<broadcast::Receiver<Broadcast>, RoomError> {
        self.handle_for(room_id)?.subscribe().await
    }

    pub async fn mark_disconnected(&self, room_id: &RoomId, player_id: PlayerId) -> Result<(), RoomError> {
        self.handle_for(room_id)?.mark_disconnected(player_id).await
    }

    pub async fn mark_reconnected(&self, room_id: &RoomId, player_id: PlayerId) -> Result<(), RoomError> {
        self.handle_for(room_id)?.mark_reconnected(player_id).await
    }

    fn handle_for(&self, room_id: &RoomId) -> Result<RoomHandle, RoomError> {
        let rooms = self.rooms.lock().expect("room registry poisoned");
        rooms
            .get(room_id)
            .map(|e| e.handle.clone())
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Shuts down a room's actor and drops it from the registry. The
    /// store record itself is left in place (still `Ended`/`Failed`)
    /// for as long as `RuntimeConfig::ended_room_grace` dictates —
    /// garbage-collecting it is the caller's job, not the manager's.
    pub async fn destroy_room(&self, room_id: &RoomId) -> Result<(), RoomError> {
        let entry = {
            let mut rooms = self.rooms.lock().expect("room registry poisoned");
            rooms.remove(room_id)
        };
        match entry {
            Some(entry) => {
                let _ = entry.handle.shutdown().await;
                Ok(())
            }
            None => Err(RoomError::NotFound(room_id.clone())),
        }
    }

    /// Lists every room that hasn't ended, queried fresh from the store
    /// each call (the registry only tracks which rooms have an actor).
    pub async fn list_rooms(&self) -> Vec<RoomListEntry> {
        let candidates: Vec<(RoomId, String, usize)> = {
            let rooms = self.rooms.lock().expect("room registry poisoned");
            rooms
                .iter()
                .map(|(id, e)| (id.clone(), e.kind.clone(), e.max_players))
                .collect()
        };

        let mut entries = Vec::with_capacity(candidates.len());
        for (room_id, kind, max_players) in candidates {
            if let Ok(Some(room)) = self.store.get(&room_id).await {
                if room.phase != RoomPhase::Ended {
                    entries.push(RoomListEntry {
                        room_id,
                        kind,
                        player_count: room.players.len(),
                        max_players,
                        phase: room.phase,
                    });
                }
            }
        }
        entries
    }

    pub fn room_count(&self) -> usize {
        self.rooms.lock().expect("room registry poisoned").len()
    }

    /// One sweep pass: for every live room, expires any player whose
    /// connection has been down longer than `RuntimeConfig::reconnect_grace`.
    /// Expiry only flips `PlayerRecord::connection_expired` — the players
    /// mapping itself never shrinks here, since a room's players mapping
    /// must never shrink implicitly.
    pub async fn sweep_expired_connections(&self) {
        let room_ids: Vec<RoomId> = {
            let rooms = self.rooms.lock().expect("room registry poisoned");
            rooms.keys().cloned().collect()
        };

        let grace_ms = self.config.reconnect_grace.as_millis() as u64;
        let now = wall_clock_ms();

        for room_id in room_ids {
            let Ok(Some(room)) = self.store.get(&room_id).await else {
                continue;
            };
            let expired: Vec<PlayerId> = room
                .players
                .iter()
                .filter(|(_, record)| {
                    !record.connection_expired
                        && record
                            .disconnected_since
                            .is_some_and(|since| now.saturating_sub(since) >= grace_ms)
                })
                .map(|(id, _)| id.clone())
                .collect();

            if expired.is_empty() {
                continue;
            }

            let expired_for_update = expired.clone();
            if let Err(err) = self
                .store
                .update_fields(&room_id, room.version, move |r| {
                    for player_id in &expired_for_update {
                        if let Some(record) = r.players.get_mut(player_id) {
                            record.connection_expired = true;
                        }
                    }
                })
                .await
            {
                tracing::warn!(%room_id, error = %err, "reconnect sweep failed to persist expiry");
                continue;
            }

            for player_id in expired {
                tracing::info!(%room_id, %player_id, "player connection expired past reconnect grace");
            }
        }
    }

    /// Spawns a background task that calls `sweep_expired_connections` on
    /// `interval` until every `Arc<RoomManager>` clone is dropped.
    pub fn spawn_reconnect_sweep(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.sweep_expired_connections().await;
            }
        })
    }
}
