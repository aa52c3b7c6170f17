//! Wire codec and blocking frame I/O for the weather broadcast feed.
//!
//! Every feed frame carries:
//! - A 16-byte frame header: sync byte, uplink source, sequence/run numbers,
//!   and an additive checksum over the header itself
//! - A 10-byte product header: block number plus the offsets that locate the
//!   data block inside the frame
//! - The data block
//!
//! Readers resynchronize on the sync byte, so a torn or corrupted stream
//! costs frames, never the connection.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, FrameHeader, ProductHeader, WireFrame, FH_SIZE, MAX_FRAME_SIZE,
    PDH_SIZE, SYNC,
};
pub use error::{FrameError, Result};
pub use reader::FeedReader;
pub use writer::FeedWriter;
