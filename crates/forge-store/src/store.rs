//! The store adapter contract: authoritative persistence for rooms.
//!
//! Only the contract is specified here — the concrete backend
//! technology is explicitly out of scope. [`InMemoryStore`] is the one
//! implementation every deployment is guaranteed to have; a production
//! deployment swaps in a real database behind the same trait.

use std::collections::HashMap;
use std::sync::RwLock;

use forge_protocol::RoomId;

use crate::error::StoreError;
use crate::types::PersistedRoom;

/// A function applied to a room's fields as part of an atomic
/// read-modify-write. Mirrors the "update-expression with atomic
/// multi-field updates" the contract calls for: the adapter guarantees
/// the whole closure runs against a single consistent snapshot and the
/// result is the only thing ever written back.
pub trait StoreAdapter: Send + Sync {
    async fn get(&self, room_id: &RoomId) -> Result<Option<PersistedRoom>, StoreError>;

    async fn put(&self, room: PersistedRoom) -> Result<(), StoreError>;

    /// Applies `update` to the current record and writes the result
    /// back, failing with [`StoreError::VersionConflict`] if the room's
    /// version has moved since `expected_version` was observed.
    async fn update_fields(
        &self,
        room_id: &RoomId,
        expected_version: u64,
        update: impl FnOnce(&mut PersistedRoom) + Send,
    ) -> Result<PersistedRoom, StoreError>;
}

#[derive(Default)]
pub struct InMemoryStore {
    rooms: RwLock<HashMap<RoomId, PersistedRoom>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreAdapter for InMemoryStore {
    async fn get(&self, room_id: &RoomId) -> Result<Option<PersistedRoom>, StoreError> {
        let rooms = self.rooms.read().expect("store lock poisoned");
        Ok(rooms.get(room_id).cloned())
    }

    async fn put(&self, room: PersistedRoom) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().expect("store lock poisoned");
        rooms.insert(room.room_id.clone(), room);
        Ok(())
    }

    async fn update_fields(
        &self,
        room_id: &RoomId,
        expected_version: u64,
        update: impl FnOnce(&mut PersistedRoom) + Send,
    ) -> Result<PersistedRoom, StoreError> {
        let mut rooms = self.rooms.write().expect("store lock poisoned");
        let room = rooms.get_mut(room_id).ok_or(StoreError::NotFound)?;
        if room.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                found: room.version,
            });
        }
        update(room);
        Ok(room.clone())
    }
}
