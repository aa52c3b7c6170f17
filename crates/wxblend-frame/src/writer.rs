use std::io::{ErrorKind, Write};

use crate::error::{FrameError, Result};

/// Writes released frames to any `Write` sink.
///
/// Frames go out verbatim — same bytes, same length — so whatever drains the
/// sink sees exactly what the feed delivered. Short writes and retryable
/// errors are handled internally.
pub struct FeedWriter<W> {
    inner: W,
}

impl<W: Write> FeedWriter<W> {
    /// Create a new feed writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write a complete frame (blocking) and flush.
    pub fn write_frame(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        self.flush()
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
