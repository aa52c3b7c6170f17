use std::collections::BTreeMap;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::debug;

use crate::error::{BufferError, Result};
use crate::key::FrameKey;
use crate::slot::{Slot, SlotId, SlotStore};

/// Outcome of [`ReorderBuffer::add`].
///
/// `TooLate` and `Duplicate` are expected, high-frequency outcomes on a
/// fan-out feed — callers count them and move on; the frame is permanently
/// unusable and there is nothing to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The frame was buffered and will be released in key order.
    Added,
    /// A frame at or before this key has already been released.
    TooLate,
    /// A live frame with this key is already buffered.
    Duplicate,
}

/// When the head entry becomes eligible for release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleasePolicy {
    /// Release the head once its reveal time (arrival + delay) passes.
    /// Missing earlier keys are not waited for; latency is bounded by the
    /// delay.
    #[default]
    BoundedDelay,
    /// Release the head immediately when it is the direct successor of the
    /// last released frame, otherwise at its reveal time.
    Successor,
    /// Release the head as soon as the buffer is non-empty. Reordering
    /// protection comes only from the too-late cutoff.
    Immediate,
}

/// Configuration for a [`ReorderBuffer`].
#[derive(Debug, Clone, Copy)]
pub struct BufferConfig {
    /// How long a frame is held before it may be released. Tuning knob
    /// trading latency against reordering completeness.
    pub delay: Duration,
    /// Head release policy.
    pub policy: ReleasePolicy,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            policy: ReleasePolicy::default(),
        }
    }
}

/// Drop and throughput counters, taken as a consistent snapshot.
///
/// Every frame handed to [`ReorderBuffer::add`] ends up in exactly one of
/// `added`, `duplicate`, or `too_late` — nothing vanishes uncounted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub added: u64,
    pub duplicate: u64,
    pub too_late: u64,
    pub released: u64,
}

/// A frame handed to the consumer, bytes exactly as they were added.
#[derive(Debug, Clone)]
pub struct ReleasedFrame {
    pub key: FrameKey,
    pub payload: Bytes,
}

struct State {
    /// Frame key -> slot id, ordered by key. The first entry is always the
    /// next frame to release.
    index: BTreeMap<FrameKey, SlotId>,
    store: SlotStore,
    /// Key of the last released frame; the too-late cutoff once set.
    last_released: Option<FrameKey>,
    closed: bool,
    stats: BufferStats,
}

enum HeadWait {
    Empty,
    Ready,
    Until(Instant),
}

/// Bounded-delay reordering/deduplication buffer.
///
/// Any number of producer threads call [`add`](Self::add) concurrently;
/// exactly one consumer thread loops on [`next_frame`](Self::next_frame).
/// All shared state sits behind a single mutex with one condition variable;
/// `add` never blocks beyond the lock, and `next_frame` is the only
/// suspending operation.
///
/// Arrival order between producers is irrelevant — frames drain in key
/// order regardless — except that once any frame has been released, frames
/// at or before it are rejected as [`AddOutcome::TooLate`].
pub struct ReorderBuffer {
    state: Mutex<State>,
    available: Condvar,
    config: BufferConfig,
}

impl ReorderBuffer {
    pub fn new(config: BufferConfig) -> Self {
        Self {
            state: Mutex::new(State {
                index: BTreeMap::new(),
                store: SlotStore::new(),
                last_released: None,
                closed: false,
                stats: BufferStats::default(),
            }),
            available: Condvar::new(),
            config,
        }
    }

    /// A buffer with the given release delay and the default policy.
    pub fn with_delay(delay: Duration) -> Self {
        Self::new(BufferConfig {
            delay,
            ..BufferConfig::default()
        })
    }

    pub fn config(&self) -> BufferConfig {
        self.config
    }

    /// Add a frame.
    ///
    /// Non-blocking apart from the lock; safe to call from any number of
    /// threads. The bytes are copied into a fixed-capacity slot, so a frame
    /// larger than [`SLOT_CAPACITY`](crate::SLOT_CAPACITY) is a fatal
    /// [`BufferError::FrameTooLarge`], and adding to a closed buffer is
    /// [`BufferError::Closed`].
    pub fn add(&self, key: FrameKey, data: &[u8]) -> Result<AddOutcome> {
        // The copy is the expensive part; do it outside the lock.
        let slot = Slot::new(data, Instant::now() + self.config.delay)?;

        let mut state = self.lock();
        if state.closed {
            return Err(BufferError::Closed);
        }

        if let Some(last) = state.last_released {
            if key <= last {
                state.stats.too_late += 1;
                debug!(%key, last_released = %last, "frame too late; raise the release delay?");
                return Ok(AddOutcome::TooLate);
            }
        }

        if state.index.contains_key(&key) {
            state.stats.duplicate += 1;
            return Ok(AddOutcome::Duplicate);
        }

        let id = state.store.insert(slot);
        state.index.insert(key, id);
        state.stats.added += 1;
        self.available.notify_one();
        Ok(AddOutcome::Added)
    }

    /// Remove and return the oldest buffered frame (blocking).
    ///
    /// Suspends until the buffer is non-empty and the minimum-key entry is
    /// eligible under the release policy, then returns it unconditionally —
    /// gaps before it are skipped, never waited for. The returned key
    /// becomes the too-late cutoff for all future [`add`](Self::add) calls.
    ///
    /// Returns `None` once the buffer has been closed and drained. After
    /// [`close`](Self::close), remaining frames are released without
    /// waiting out their delay: the producers are gone, so nothing can
    /// reorder ahead of them anymore.
    pub fn next_frame(&self) -> Option<ReleasedFrame> {
        let mut state = self.lock();

        loop {
            if state.closed {
                break;
            }
            match self.head_wait(&state) {
                HeadWait::Ready => break,
                HeadWait::Empty => {
                    state = self
                        .available
                        .wait(state)
                        .expect("reorder buffer mutex poisoned");
                }
                HeadWait::Until(deadline) => {
                    let now = Instant::now();
                    if deadline <= now {
                        break;
                    }
                    // Re-checked on wake: a notification may have inserted a
                    // new head, and spurious wakes happen.
                    (state, _) = self
                        .available
                        .wait_timeout(state, deadline - now)
                        .expect("reorder buffer mutex poisoned");
                }
            }
        }

        let (key, id) = state.index.pop_first()?;
        let slot = state
            .store
            .take(id)
            .expect("index and slot store out of sync");
        let payload = Bytes::copy_from_slice(slot.bytes());

        state.last_released = Some(key);
        state.stats.released += 1;

        Some(ReleasedFrame { key, payload })
    }

    /// Number of buffered, undelivered frames.
    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the drop/throughput counters.
    pub fn stats(&self) -> BufferStats {
        self.lock().stats
    }

    /// Close the buffer: further `add` calls fail, and the consumer drains
    /// the remaining frames immediately, then gets `None`.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        self.available.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock means a thread panicked mid-update and the
        // index/store invariants can no longer be trusted.
        self.state.lock().expect("reorder buffer mutex poisoned")
    }

    fn head_wait(&self, state: &State) -> HeadWait {
        let Some((key, &id)) = state.index.first_key_value() else {
            return HeadWait::Empty;
        };
        let slot = state.store.get(id).expect("index and slot store out of sync");

        match self.config.policy {
            ReleasePolicy::Immediate => HeadWait::Ready,
            ReleasePolicy::Successor => {
                if let Some(last) = state.last_released {
                    if key.follows(&last) {
                        return HeadWait::Ready;
                    }
                }
                reveal_wait(slot.reveal_at())
            }
            ReleasePolicy::BoundedDelay => reveal_wait(slot.reveal_at()),
        }
    }
}

fn reveal_wait(reveal_at: Instant) -> HeadWait {
    if Instant::now() >= reveal_at {
        HeadWait::Ready
    } else {
        HeadWait::Until(reveal_at)
    }
}
