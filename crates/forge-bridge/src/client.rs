//! `BridgeClient`: a pure, synchronous-plus-batched state machine
//! modeling what the in-document library does on `emit`. No DOM, no
//! timers of its own — callers drive it with `emit` and poll
//! `take_ready_batch`/`flush` on whatever schedule they like (a real
//! client would drive it from a `setInterval`; tests drive it directly).

use std::collections::VecDeque;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use forge_protocol::{Event, EventKind, EventMetadata, EventPriority, PlayerId, RoomId};
use serde::{Deserialize, Serialize};

/// Per-`emit` overrides. `high_priority` bypasses batching the same way
/// `ERROR` does, for a game that wants a specific interaction flushed
/// immediately (e.g. a shot fired in a realtime game).
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    pub high_priority: bool,
}

/// Batching and queue tunables.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Events may be held this long before a batch is considered ready.
    pub interval: Duration,
    /// Or flushed once this many events have queued, whichever is first.
    pub max_batch_size: usize,
    /// Total queued-but-unflushed events before overflow drops begin.
    pub max_queue_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            max_batch_size: 20,
            max_queue_size: 256,
        }
    }
}

/// Returned by [`BridgeClient::emit`] when `kind` isn't one of the four
/// well-known event kinds. The four-kind set is closed at the type
/// level (`forge_protocol::EventKind`), so in practice this only fires
/// when a caller constructs a kind value out of band; kept because the
/// spec names it as an explicit failure mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("INVALID_KIND")]
pub struct InvalidKind;

/// Tracks repeated host-send failures for the linear backoff the spec
/// requires (`4.1 Failure modes`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendBackoff {
    consecutive_failures: u32,
}

impl SendBackoff {
    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Linear backoff: one interval unit per consecutive failure.
    pub fn delay(&self, unit: Duration) -> Duration {
        unit * self.consecutive_failures
    }
}

/// Wall-clock milliseconds since the Unix epoch, for `EventMetadata.timestamp`.
/// Distinct from `sequence_number`, which is the monotonic emit order and
/// carries no real-time meaning on its own.
fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// The in-document bridge's batching state machine.
pub struct BridgeClient {
    room_id: RoomId,
    player_id: PlayerId,
    session_id: String,
    config: BatchConfig,
    next_seq: u64,
    queue: VecDeque<Event>,
    immediate: Vec<Event>,
    last_flush: Instant,
    backoff: SendBackoff,
}

impl BridgeClient {
    pub fn new(room_id: RoomId, player_id: PlayerId, session_id: impl Into<String>, config: BatchConfig) -> Self {
        Self {
            room_id,
            player_id,
            session_id: session_id.into(),
            config,
            next_seq: 1,
            queue: VecDeque::new(),
            immediate: Vec::new(),
            last_flush: Instant::now(),
            backoff: SendBackoff::default(),
        }
    }

    /// Records an event, stamping it with the next monotonic sequence
    /// number. `ERROR` and any `high_priority` event bypass batching
    /// (they land in the immediate lane, drained on the next
    /// `take_ready_batch`/`flush` regardless of the interval/size
    /// thresholds); everything else queues.
    pub fn emit(&mut self, kind: EventKind, data: serde_json::Value, options: EmitOptions) -> Event {
        let seq = self.next_seq;
        self.next_seq += 1;

        let bypass = kind == EventKind::Error || options.high_priority;
        let priority = if bypass { EventPriority::High } else { EventPriority::Normal };

        let event = Event {
            kind,
            data,
            metadata: EventMetadata {
                room_id: self.room_id.clone(),
                player_id: self.player_id.clone(),
                session_id: self.session_id.clone(),
                timestamp: wall_clock_ms(),
                sequence_number: seq,
                priority,
                scope: None,
            },
        };

        if bypass {
            self.immediate.push(event.clone());
        } else {
            self.enqueue(event.clone());
        }
        event
    }

    /// Enqueues a normal-priority event, applying the documented
    /// overflow drop order when the bounded queue is full: `Update`
    /// first, then `Interaction`, then `Transition`. `Error` never
    /// reaches this path (it bypasses the queue entirely above), so it
    /// is never dropped.
    fn enqueue(&mut self, event: Event) {
        if self.queue.len() >= self.config.max_queue_size {
            self.drop_one_for_overflow();
        }
        self.queue.push_back(event);
    }

    fn drop_one_for_overflow(&mut self) {
        for victim in [EventKind::Update, EventKind::Interaction, EventKind::Transition] {
            if let Some(pos) = self.queue.iter().position(|e| e.kind == victim) {
                self.queue.remove(pos);
                return;
            }
        }
        // Only Error-kind events remain, which should be impossible
        // since Error always bypasses the queue; drop the oldest as a
        // last resort rather than growing unbounded.
        self.queue.pop_front();
    }

    /// Whether a batch is ready to flush: the interval elapsed, the
    /// queue hit the size threshold, or an immediate-lane event is
    /// waiting.
    pub fn batch_ready(&self) -> bool {
        !self.immediate.is_empty()
            || self.queue.len() >= self.config.max_batch_size
            || (!self.queue.is_empty() && self.last_flush.elapsed() >= self.config.interval)
    }

    /// Drains a ready batch merged by sequence number: the immediate
    /// lane and the queue are each already in emit order internally, so
    /// a two-pointer merge of the two gives the true emit order across
    /// both, which is what keeps `ERROR` from trailing the events it
    /// reports on within the same batch (it only leads when it really
    /// was emitted first).
    pub fn take_ready_batch(&mut self) -> Option<Vec<Event>> {
        if !self.batch_ready() {
            return None;
        }
        Some(self.drain_batch())
    }

    /// Unconditionally flushes everything queued, immediate or not —
    /// used by `destroy()`.
    pub fn flush(&mut self) -> Vec<Event> {
        self.drain_batch()
    }

    fn drain_batch(&mut self) -> Vec<Event> {
        let take = self.queue.len().min(self.config.max_batch_size.max(1));
        let immediate: Vec<Event> = self.immediate.drain(..).collect();
        let queued: Vec<Event> = self.queue.drain(..take).collect();

        let mut batch = Vec::with_capacity(immediate.len() + queued.len());
        let mut i = immediate.into_iter().peekable();
        let mut q = queued.into_iter().peekable();
        loop {
            match (i.peek(), q.peek()) {
                (Some(a), Some(b)) => {
                    if a.metadata.sequence_number <= b.metadata.sequence_number {
                        batch.push(i.next().unwrap());
                    } else {
                        batch.push(q.next().unwrap());
                    }
                }
                (Some(_), None) => batch.push(i.next().unwrap()),
                (None, Some(_)) => batch.push(q.next().unwrap()),
                (None, None) => break,
            }
        }

        self.last_flush = Instant::now();
        batch
    }

    pub fn record_send_failure(&mut self) {
        self.backoff.record_failure();
    }

    pub fn record_send_success(&mut self) {
        self.backoff.record_success();
    }

    pub fn backoff_delay(&self, unit: Duration) -> Duration {
        self.backoff.delay(unit)
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len() + self.immediate.len()
    }

    /// Flushes any remaining queued events and terminates
    /// auto-interception (the DOM half, out of scope here — this just
    /// returns the final drain so a caller can ship it before tearing
    /// down).
    pub fn destroy(&mut self) -> Vec<Event> {
        self.flush()
    }
}
