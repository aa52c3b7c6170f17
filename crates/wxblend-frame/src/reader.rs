use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::debug;

use crate::codec::{decode_frame, WireFrame, SYNC};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 16 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete feed frames from any `Read` stream.
///
/// Handles partial reads internally — callers always get complete frames.
/// Garbage between frames and frames with a bad header checksum are skipped
/// by rescanning for the sync byte, the way the feed is meant to be read:
/// corruption costs frames, not the connection.
pub struct FeedReader<T> {
    inner: T,
    buf: BytesMut,
    resync_bytes: u64,
    checksum_failures: u64,
}

impl<T: Read> FeedReader<T> {
    /// Create a new feed reader.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            resync_bytes: 0,
            checksum_failures: 0,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<WireFrame> {
        loop {
            match decode_frame(&mut self.buf) {
                Ok(Some(frame)) => return Ok(frame),
                Ok(None) => {} // need more data
                Err(FrameError::BadSync { .. }) => {
                    // Drop everything up to the next candidate sync byte.
                    let skip = self
                        .buf
                        .iter()
                        .position(|&b| b == SYNC)
                        .unwrap_or(self.buf.len());
                    self.resync_bytes += skip as u64;
                    self.buf.advance(skip);
                    continue;
                }
                Err(FrameError::ChecksumMismatch { wire, computed }) => {
                    debug!(wire, computed, "frame checksum mismatch, rescanning");
                    self.checksum_failures += 1;
                    self.buf.advance(1);
                    continue;
                }
                Err(err) => return Err(err),
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Bytes discarded while scanning for a sync byte.
    pub fn resync_bytes(&self) -> u64 {
        self.resync_bytes
    }

    /// Frames dropped because their header checksum did not verify.
    pub fn checksum_failures(&self) -> u64 {
        self.checksum_failures
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, FrameHeader, ProductHeader, PDH_SIZE};

    fn wire_frame(source: u8, run: u16, seq: u32, block: u16, data: &[u8]) -> BytesMut {
        let header = FrameHeader {
            version: 1,
            datastream: 5,
            source,
            seq,
            run,
            checksum: 0,
        };
        let product = ProductHeader {
            version: 1,
            transfer_type: 0x01,
            header_len: PDH_SIZE as u16,
            block,
            data_offset: 0,
            data_size: data.len() as u16,
        };
        let mut buf = BytesMut::new();
        encode_frame(&header, &product, data, &mut buf).unwrap();
        buf
    }

    #[test]
    fn read_single_frame() {
        let wire = wire_frame(2, 1, 5, 0, b"metar");
        let mut reader = FeedReader::new(Cursor::new(wire.to_vec()));

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.header.seq, 5);
        assert_eq!(frame.data(), b"metar");
    }

    #[test]
    fn read_multiple_frames() {
        let mut wire = wire_frame(1, 1, 1, 0, b"one");
        wire.extend_from_slice(&wire_frame(1, 1, 2, 0, b"two"));
        wire.extend_from_slice(&wire_frame(1, 1, 3, 0, b"three"));

        let mut reader = FeedReader::new(Cursor::new(wire.to_vec()));

        for (seq, data) in [(1u32, b"one".as_ref()), (2, b"two"), (3, b"three")] {
            let frame = reader.read_frame().unwrap();
            assert_eq!(frame.header.seq, seq);
            assert_eq!(frame.data(), data);
        }
    }

    #[test]
    fn resyncs_past_leading_garbage() {
        let mut wire = BytesMut::from(&b"noise before the feed"[..]);
        wire.extend_from_slice(&wire_frame(1, 1, 9, 0, b"payload"));

        let mut reader = FeedReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.header.seq, 9);
        assert!(reader.resync_bytes() > 0);
    }

    #[test]
    fn skips_frame_with_bad_checksum() {
        let mut bad = wire_frame(1, 1, 7, 0, b"corrupt");
        bad[10] ^= 0x20; // break the sequence field, checksum now stale
        let mut wire = bad;
        wire.extend_from_slice(&wire_frame(1, 1, 8, 0, b"good"));

        let mut reader = FeedReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.header.seq, 8);
        assert_eq!(frame.data(), b"good");
        assert_eq!(reader.checksum_failures(), 1);
    }

    #[test]
    fn partial_read_handling() {
        let wire = wire_frame(4, 2, 100, 1, b"slow link");
        let byte_reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = FeedReader::new(byte_reader);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.header.seq, 100);
        assert_eq!(frame.data(), b"slow link");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FeedReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let wire = wire_frame(1, 1, 1, 0, b"cut short");
        let mut reader = FeedReader::new(Cursor::new(wire[..wire.len() - 4].to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn interrupted_read_retries() {
        let wire = wire_frame(1, 1, 6, 0, b"retry");
        let reader = InterruptedThenData {
            state: 0,
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut framed = FeedReader::new(reader);

        let frame = framed.read_frame().unwrap();
        assert_eq!(frame.header.seq, 6);
    }

    #[test]
    fn io_error_propagates() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(ErrorKind::ConnectionReset))
            }
        }

        let mut reader = FeedReader::new(FailingReader);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::ConnectionReset));
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = FeedReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
