//! Facade crate for the wxblend feed blender.
//!
//! Re-exports the frame codec, the reorder buffer, and the ingest layer so
//! applications embedding the blender need a single dependency. The
//! `wxblend` binary in this crate is the standalone blender process.

pub use wxblend_buffer::{
    AddOutcome, BufferConfig, BufferError, BufferStats, FrameKey, ReleasePolicy, ReleasedFrame,
    ReorderBuffer, UplinkMap, SLOT_CAPACITY,
};
pub use wxblend_frame::{
    decode_frame, encode_frame, FeedReader, FeedWriter, FrameError, FrameHeader, ProductHeader,
    WireFrame, FH_SIZE, MAX_FRAME_SIZE, PDH_SIZE, SYNC,
};
pub use wxblend_ingest::{drain, open_sink, spawn_readers, FanoutClient, FanoutConfig, IngestError};
