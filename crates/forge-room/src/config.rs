//! Session Runtime configuration.

use std::time::Duration;

/// Tunables for the Session Runtime. Game developers don't implement
/// this directly — it governs the generic machinery every room shares
/// regardless of which validator is deployed.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Nominal per-submit deadline: the upstream budget a caller has
    /// for `submit` to either commit or fail. Exceeding it returns
    /// `TIMEOUT_RETRY` without any state mutation.
    pub submit_deadline: Duration,

    /// Per-validator invocation deadline, enforced by the sandbox.
    /// Always smaller than `submit_deadline` so a validator timeout
    /// still leaves room for the generic fallback to run.
    pub validator_deadline: Duration,

    /// Generic default minimum players, used only when no validator is
    /// deployed and the kind-derived default doesn't apply. A room's
    /// validator declaring its own `min_players`/`max_players` always
    /// takes precedence.
    pub default_min_players: usize,

    /// Generic default maximum players: 2 for turn-based/board kinds
    /// (mirrored on room creation by the caller), 8 otherwise.
    pub default_max_players: usize,

    /// Room command mailbox size. Bounds how many in-flight submits a
    /// single room can queue before backpressuring the caller.
    pub mailbox_size: usize,

    /// Broadcast channel capacity per room. Slow subscribers that fall
    /// this many messages behind are dropped rather than stalling
    /// commits (see `tokio::sync::broadcast`'s lagged-receiver
    /// semantics).
    pub broadcast_capacity: usize,

    /// Grace period a disconnected player is given before their
    /// connection state is swept to fully expired. Read by
    /// `RoomManager::sweep_expired_connections` against each player's
    /// `disconnected_since`; the player record itself is never removed
    /// implicitly — only the connection-state bookkeeping used for
    /// reconnection.
    pub reconnect_grace: Duration,

    /// How long an ended room is retained before it becomes eligible
    /// for garbage collection.
    pub ended_room_grace: Duration,

    /// Store cache freshness window, passed through to
    /// `forge_store::CachedStore`.
    pub cache_freshness_window: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            submit_deadline: Duration::from_secs(24),
            validator_deadline: Duration::from_millis(500),
            default_min_players: 1,
            default_max_players: 8,
            mailbox_size: 256,
            broadcast_capacity: 256,
            reconnect_grace: Duration::from_secs(30),
            ended_room_grace: Duration::from_secs(300),
            cache_freshness_window: Duration::from_secs(5),
        }
    }
}
