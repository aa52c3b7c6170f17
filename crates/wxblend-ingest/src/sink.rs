use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, info};
use wxblend_buffer::ReorderBuffer;
use wxblend_frame::FeedWriter;

use crate::error::Result;

/// Drain the buffer into `writer` until the buffer is closed and empty.
///
/// This is the single consumer loop: each released frame's bytes go to the
/// sink verbatim, in key order. A write failure is fatal — the downstream
/// consumer is gone and frames can no longer be delivered anywhere.
///
/// Returns the number of frames written.
pub fn drain<W: Write>(buffer: &ReorderBuffer, writer: &mut FeedWriter<W>) -> Result<u64> {
    let mut frames = 0u64;
    while let Some(frame) = buffer.next_frame() {
        writer.write_frame(&frame.payload)?;
        frames += 1;
        debug!(key = %frame.key, bytes = frame.payload.len(), "frame written");
    }
    info!(frames, "drain finished");
    Ok(frames)
}

/// Open the output sink: the named pipe or file at `path`, or stdout.
///
/// Opening a FIFO blocks until a reader attaches, which is the behavior the
/// downstream queue writer expects.
pub fn open_sink(path: Option<&Path>) -> io::Result<Box<dyn Write + Send>> {
    match path {
        None => Ok(Box::new(io::stdout())),
        Some(path) => {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            info!(?path, "writing frames to sink");
            Ok(Box::new(file))
        }
    }
}
