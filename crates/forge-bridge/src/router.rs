//! `BridgeRouter`: the host-side counterpart to `BridgeClient`. Receives
//! envelopes posted by a bridge instance, validates them, and dispatches
//! each event to subscribers — mirroring the channel-based subscriber
//! pattern the Session Runtime uses for broadcasts (`forge_room::room`),
//! generalized from one `Broadcast` stream per room to one `Event`
//! stream per room.

use std::collections::HashMap;
use std::sync::Mutex;

use forge_protocol::{Event, EventKind, RoomId};
use tokio::sync::broadcast;

use crate::envelope::BridgeEnvelope;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RouterError {
    #[error("envelope missing or malformed source tag")]
    MalformedEnvelope,

    #[error("envelope room {envelope} does not match router room {router}")]
    RoomMismatch { envelope: String, router: String },
}

/// Host-side router bound to a single room. One instance per room,
/// created alongside the room's `RoomHandle` (see `forge_room`).
pub struct BridgeRouter {
    room_id: RoomId,
    capacity: usize,
    channels: Mutex<HashMap<EventKind, broadcast::Sender<Event>>>,
}

impl BridgeRouter {
    pub fn new(room_id: RoomId, capacity: usize) -> Self {
        Self {
            room_id,
            capacity,
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Subscribes to one event kind. Call once per `kind` of interest;
    /// there is no wildcard channel object here (the wildcard case in
    /// the spec's `on(kind, handler)` is expressed as subscribing to
    /// all four kinds individually, since `tokio::sync::broadcast`
    /// has no type-erased multi-kind receiver).
    pub fn subscribe(&self, kind: EventKind) -> broadcast::Receiver<Event> {
        let mut channels = self.channels.lock().expect("router lock poisoned");
        channels
            .entry(kind)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Validates and dispatches an incoming envelope. Rejects an
    /// envelope whose `room_id` doesn't match this router (a transport
    /// bug or a malicious client targeting the wrong room) and drops —
    /// with a log line — any event whose kind this router has never
    /// been asked to route (spec: "Unknown kinds are logged and
    /// dropped").
    pub fn route(&self, envelope: BridgeEnvelope) -> Result<usize, RouterError> {
        if !envelope.is_well_formed() {
            return Err(RouterError::MalformedEnvelope);
        }
        if envelope.room_id != self.room_id {
            return Err(RouterError::RoomMismatch {
                envelope: envelope.room_id.to_string(),
                router: self.room_id.to_string(),
            });
        }

        let mut delivered = 0;
        let channels = self.channels.lock().expect("router lock poisoned");
        for event in envelope.events {
            match channels.get(&event.kind) {
                Some(sender) if sender.receiver_count() > 0 => {
                    if sender.send(event).is_ok() {
                        delivered += 1;
                    }
                }
                _ => {
                    tracing::debug!(
                        room_id = %self.room_id,
                        kind = ?event.kind,
                        "bridge event has no subscriber, dropping"
                    );
                }
            }
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_protocol::{EventMetadata, EventPriority, PlayerId};

    fn event(kind: EventKind, seq: u64) -> Event {
        Event {
            kind,
            data: serde_json::json!({}),
            metadata: EventMetadata {
                room_id: RoomId::new("r1"),
                player_id: PlayerId::new("p1"),
                session_id: "s1".into(),
                timestamp: seq,
                sequence_number: seq,
                priority: EventPriority::Normal,
                scope: None,
            },
        }
    }

    #[test]
    fn route_rejects_room_mismatch() {
        let router = BridgeRouter::new(RoomId::new("r1"), 8);
        let envelope = BridgeEnvelope::new(RoomId::new("r2"), PlayerId::new("p1"), vec![]);
        let err = router.route(envelope).unwrap_err();
        assert!(matches!(err, RouterError::RoomMismatch { .. }));
    }

    #[test]
    fn route_rejects_malformed_source() {
        let router = BridgeRouter::new(RoomId::new("r1"), 8);
        let mut envelope = BridgeEnvelope::new(RoomId::new("r1"), PlayerId::new("p1"), vec![]);
        envelope.source = "not-the-bridge".into();
        let err = router.route(envelope).unwrap_err();
        assert!(matches!(err, RouterError::MalformedEnvelope));
    }

    #[tokio::test]
    async fn subscribed_kind_receives_in_order() {
        let router = BridgeRouter::new(RoomId::new("r1"), 8);
        let mut rx = router.subscribe(EventKind::Interaction);

        let envelope = BridgeEnvelope::new(
            RoomId::new("r1"),
            PlayerId::new("p1"),
            vec![event(EventKind::Interaction, 1), event(EventKind::Interaction, 2)],
        );
        let delivered = router.route(envelope).unwrap();
        assert_eq!(delivered, 2);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.metadata.sequence_number, 1);
        assert_eq!(second.metadata.sequence_number, 2);
    }

    #[tokio::test]
    async fn unknown_kind_without_subscriber_is_dropped_not_errored() {
        let router = BridgeRouter::new(RoomId::new("r1"), 8);
        let envelope = BridgeEnvelope::new(RoomId::new("r1"), PlayerId::new("p1"), vec![event(EventKind::Update, 1)]);
        let delivered = router.route(envelope).unwrap();
        assert_eq!(delivered, 0);
    }
}
