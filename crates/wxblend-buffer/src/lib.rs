//! Bounded-delay reordering and deduplication buffer for broadcast feed
//! frames.
//!
//! This is the core value-add layer of wxblend. Fan-out connections deliver
//! the same logical stream out of order and with duplicates; any number of
//! producer threads [`add`](ReorderBuffer::add) frames as they arrive, and a
//! single consumer thread drains them with
//! [`next_frame`](ReorderBuffer::next_frame) in frame-key order. Each frame
//! is held for a configurable delay so stragglers can slot in ahead of it;
//! once a frame has been released, anything at or before it is rejected as
//! too late.
//!
//! The buffer guarantees order and uniqueness of whatever it is given — it
//! never requests retransmission and does not guarantee completeness.

pub mod buffer;
pub mod error;
pub mod key;
pub mod slot;

pub use buffer::{
    AddOutcome, BufferConfig, BufferStats, ReleasePolicy, ReleasedFrame, ReorderBuffer,
};
pub use error::{BufferError, Result};
pub use key::{FrameKey, UplinkMap};
pub use slot::SLOT_CAPACITY;
