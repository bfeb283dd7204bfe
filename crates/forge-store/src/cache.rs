//! A bounded, time-limited in-process cache for hot rooms.
//!
//! Cache coherence is per-process; correctness never depends on a hit.
//! Writes invalidate the entry immediately; reads past the freshness
//! window bypass the cache and go straight to the store.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use forge_protocol::RoomId;

use crate::error::StoreError;
use crate::store::StoreAdapter;
use crate::types::PersistedRoom;

struct CacheEntry {
    room: PersistedRoom,
    cached_at: Instant,
}

/// Wraps any [`StoreAdapter`] with a freshness-windowed read cache.
pub struct CachedStore<S> {
    inner: S,
    freshness_window: Duration,
    cache: RwLock<HashMap<RoomId, CacheEntry>>,
}

impl<S: StoreAdapter> CachedStore<S> {
    pub fn new(inner: S, freshness_window: Duration) -> Self {
        Self {
            inner,
            freshness_window,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Nominal 5 second freshness window, matching the store contract's
    /// documented default.
    pub fn with_default_window(inner: S) -> Self {
        Self::new(inner, Duration::from_secs(5))
    }

    fn cached_fresh(&self, room_id: &RoomId) -> Option<PersistedRoom> {
        let cache = self.cache.read().expect("cache lock poisoned");
        let entry = cache.get(room_id)?;
        if entry.cached_at.elapsed() <= self.freshness_window {
            Some(entry.room.clone())
        } else {
            None
        }
    }

    fn store_in_cache(&self, room: PersistedRoom) {
        let mut cache = self.cache.write().expect("cache lock poisoned");
        cache.insert(
            room.room_id.clone(),
            CacheEntry {
                room,
                cached_at: Instant::now(),
            },
        );
    }

    fn invalidate(&self, room_id: &RoomId) {
        self.cache.write().expect("cache lock poisoned").remove(room_id);
    }
}

impl<S: StoreAdapter> StoreAdapter for CachedStore<S> {
    async fn get(&self, room_id: &RoomId) -> Result<Option<PersistedRoom>, StoreError> {
        if let Some(room) = self.cached_fresh(room_id) {
            return Ok(Some(room));
        }
        let room = self.inner.get(room_id).await?;
        if let Some(room) = &room {
            self.store_in_cache(room.clone());
        }
        Ok(room)
    }

    async fn put(&self, room: PersistedRoom) -> Result<(), StoreError> {
        self.invalidate(&room.room_id);
        self.inner.put(room).await
    }

    async fn update_fields(
        &self,
        room_id: &RoomId,
        expected_version: u64,
        update: impl FnOnce(&mut PersistedRoom) + Send,
    ) -> Result<PersistedRoom, StoreError> {
        self.invalidate(room_id);
        let updated = self.inner.update_fields(room_id, expected_version, update).await?;
        self.store_in_cache(updated.clone());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn read_after_write_is_fresh_and_invalidated_correctly() {
        let store = CachedStore::with_default_window(InMemoryStore::new());
        let room = PersistedRoom::pending(RoomId::new("r1"), "custom-game", String::new(), 1000);
        store.put(room.clone()).await.unwrap();

        let fetched = store.get(&RoomId::new("r1")).await.unwrap().unwrap();
        assert_eq!(fetched.version, 0);

        store
            .update_fields(&RoomId::new("r1"), 0, |r| r.version = 1)
            .await
            .unwrap();
        let fetched = store.get(&RoomId::new("r1")).await.unwrap().unwrap();
        assert_eq!(fetched.version, 1);
    }

    #[tokio::test]
    async fn stale_reads_bypass_cache() {
        let store = CachedStore::new(InMemoryStore::new(), Duration::from_millis(1));
        let room = PersistedRoom::pending(RoomId::new("r1"), "custom-game", String::new(), 1000);
        store.put(room).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        // still resolves correctly even once the cache entry has aged out
        let fetched = store.get(&RoomId::new("r1")).await.unwrap();
        assert!(fetched.is_some());
    }
}
