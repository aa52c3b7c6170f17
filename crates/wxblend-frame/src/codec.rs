use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header size in bytes.
pub const FH_SIZE: usize = 16;

/// Product header size in bytes (options excluded).
pub const PDH_SIZE: usize = 10;

/// Sync byte marking the start of every frame header.
pub const SYNC: u8 = 0xFF;

/// Maximum total frame size on the feed, headers included.
pub const MAX_FRAME_SIZE: usize = 5000;

/// Decoded frame header.
///
/// Wire format (big-endian):
/// ```text
/// ┌──────┬─────────┬────────────┬────────┬──────────┬──────────┬───────┬──────────┐
/// │ Sync │ Version │ Datastream │ Source │ Reserved │ Sequence │ Run   │ Checksum │
/// │ 0xFF │ (1B)    │ (1B)       │ (1B)   │ (4B)     │ (4B)     │ (2B)  │ (2B)     │
/// └──────┴─────────┴────────────┴────────┴──────────┴──────────┴───────┴──────────┘
/// ```
/// The checksum is the unsigned sum of the first 14 header bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Feed protocol version.
    pub version: u8,
    /// Datastream the frame belongs to.
    pub datastream: u8,
    /// Raw uplink transmitter id. Changes when the uplink site changes.
    pub source: u8,
    /// Frame sequence number. Wraps at `u32::MAX`.
    pub seq: u32,
    /// Run number. Bumped when the uplink restarts its numbering.
    pub run: u16,
    /// Checksum as read off the wire (recomputed on encode).
    pub checksum: u16,
}

impl FrameHeader {
    /// Decode a frame header from the first [`FH_SIZE`] bytes of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < FH_SIZE {
            return Err(FrameError::Truncated {
                len: buf.len(),
                need: FH_SIZE,
            });
        }
        if buf[0] != SYNC {
            return Err(FrameError::BadSync { found: buf[0] });
        }

        let wire = u16::from_be_bytes([buf[14], buf[15]]);
        let computed = header_sum(&buf[..14]);
        if wire != computed {
            return Err(FrameError::ChecksumMismatch { wire, computed });
        }

        Ok(Self {
            version: buf[1],
            datastream: buf[2],
            source: buf[3],
            seq: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            run: u16::from_be_bytes([buf[12], buf[13]]),
            checksum: wire,
        })
    }

    /// Encode this header into `dst`, computing the checksum.
    pub fn encode(&self, dst: &mut BytesMut) {
        let start = dst.len();
        dst.put_u8(SYNC);
        dst.put_u8(self.version);
        dst.put_u8(self.datastream);
        dst.put_u8(self.source);
        dst.put_slice(&[0u8; 4]);
        dst.put_u32(self.seq);
        dst.put_u16(self.run);
        let checksum = header_sum(&dst[start..start + 14]);
        dst.put_u16(checksum);
    }
}

fn header_sum(bytes: &[u8]) -> u16 {
    // 14 bytes of at most 0xFF each; the sum always fits in a u16.
    bytes.iter().map(|&b| u16::from(b)).sum()
}

/// Decoded product header.
///
/// Follows the frame header on the wire (big-endian):
/// ```text
/// ┌─────────┬──────────┬────────────┬───────┬─────────────┬───────────┐
/// │ Version │ Transfer │ Header len │ Block │ Data offset │ Data size │
/// │ (1B)    │ (1B)     │ (2B)       │ (2B)  │ (2B)        │ (2B)      │
/// └─────────┴──────────┴────────────┴───────┴─────────────┴───────────┘
/// ```
/// `header_len` covers the product header and any option bytes that follow
/// it; the data block starts `header_len + data_offset` bytes after the
/// frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductHeader {
    pub version: u8,
    /// Transfer-type flags (start/continuation/end of product).
    pub transfer_type: u8,
    /// Total product-header length, option bytes included.
    pub header_len: u16,
    /// Data block number within the sequence. Wraps at `u16::MAX`.
    pub block: u16,
    /// Offset of the data block relative to the end of the product header.
    pub data_offset: u16,
    /// Size of the data block in bytes.
    pub data_size: u16,
}

impl ProductHeader {
    /// Decode a product header from the first [`PDH_SIZE`] bytes of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < PDH_SIZE {
            return Err(FrameError::Truncated {
                len: buf.len(),
                need: PDH_SIZE,
            });
        }
        Ok(Self {
            version: buf[0],
            transfer_type: buf[1],
            header_len: u16::from_be_bytes([buf[2], buf[3]]),
            block: u16::from_be_bytes([buf[4], buf[5]]),
            data_offset: u16::from_be_bytes([buf[6], buf[7]]),
            data_size: u16::from_be_bytes([buf[8], buf[9]]),
        })
    }

    /// Encode this header into `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(self.version);
        dst.put_u8(self.transfer_type);
        dst.put_u16(self.header_len);
        dst.put_u16(self.block);
        dst.put_u16(self.data_offset);
        dst.put_u16(self.data_size);
    }

    /// Offset of the data block from the start of the frame.
    pub fn data_start(&self) -> usize {
        FH_SIZE + self.header_len as usize + self.data_offset as usize
    }

    /// Total frame length implied by this header.
    pub fn frame_len(&self) -> usize {
        self.data_start() + self.data_size as usize
    }
}

/// A complete frame as received off the feed.
///
/// `bytes` holds the entire frame, headers included — the feed contract is
/// to forward frames verbatim, so the raw bytes are the payload of record.
#[derive(Debug, Clone)]
pub struct WireFrame {
    pub header: FrameHeader,
    pub product: ProductHeader,
    pub bytes: Bytes,
}

impl WireFrame {
    /// The data block carried by this frame.
    pub fn data(&self) -> &[u8] {
        &self.bytes[self.product.data_start()..]
    }

    /// Total frame length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. On
/// `BadSync`/`ChecksumMismatch`/`FrameTooLarge` nothing is consumed — the
/// caller decides how far to skip before rescanning.
pub fn decode_frame(src: &mut BytesMut) -> Result<Option<WireFrame>> {
    if src.is_empty() {
        return Ok(None);
    }
    if src[0] != SYNC {
        return Err(FrameError::BadSync { found: src[0] });
    }
    if src.len() < FH_SIZE {
        return Ok(None); // Need more data
    }

    let header = FrameHeader::decode(&src[..FH_SIZE])?;

    if src.len() < FH_SIZE + PDH_SIZE {
        return Ok(None); // Need more data
    }

    let product = ProductHeader::decode(&src[FH_SIZE..FH_SIZE + PDH_SIZE])?;

    let total = product.frame_len();
    if total > MAX_FRAME_SIZE {
        return Err(FrameError::FrameTooLarge {
            size: total,
            max: MAX_FRAME_SIZE,
        });
    }

    if src.len() < total {
        return Ok(None); // Need more data
    }

    let bytes = src.split_to(total).freeze();

    Ok(Some(WireFrame {
        header,
        product,
        bytes,
    }))
}

/// Encode a complete frame into `dst`.
///
/// The frame checksum and the product header's size fields are derived from
/// the arguments: `header.checksum` is recomputed, `product.header_len`
/// option bytes beyond [`PDH_SIZE`] and `product.data_offset` pad bytes are
/// zero-filled, and `product.data_size` must equal `data.len()`.
pub fn encode_frame(
    header: &FrameHeader,
    product: &ProductHeader,
    data: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    if (product.header_len as usize) < PDH_SIZE {
        return Err(FrameError::Truncated {
            len: product.header_len as usize,
            need: PDH_SIZE,
        });
    }
    let total = product.frame_len();
    if total > MAX_FRAME_SIZE {
        return Err(FrameError::FrameTooLarge {
            size: total,
            max: MAX_FRAME_SIZE,
        });
    }
    debug_assert_eq!(data.len(), product.data_size as usize);

    dst.reserve(total);
    header.encode(dst);
    product.encode(dst);
    // Option and pad bytes between the product header and the data block.
    let fill = product.header_len as usize - PDH_SIZE + product.data_offset as usize;
    dst.put_bytes(0, fill);
    dst.put_slice(data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame(source: u8, run: u16, seq: u32, block: u16, data: &[u8]) -> BytesMut {
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
    fn encode_decode_roundtrip() {
        let mut buf = test_frame(3, 7, 42, 2, b"surface observations");

        let frame = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(frame.header.source, 3);
        assert_eq!(frame.header.run, 7);
        assert_eq!(frame.header.seq, 42);
        assert_eq!(frame.product.block, 2);
        assert_eq!(frame.data(), b"surface observations");
        assert_eq!(frame.len(), FH_SIZE + PDH_SIZE + 20);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_incomplete_header() {
        let mut buf = BytesMut::from(&[SYNC, 0x01, 0x05][..]);
        assert!(decode_frame(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn decode_incomplete_data_block() {
        let mut full = test_frame(1, 1, 1, 0, b"hello");
        let mut buf = full.split_to(full.len() - 2);
        assert!(decode_frame(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_bad_sync() {
        let mut buf = BytesMut::from(&[0x00u8; FH_SIZE][..]);
        let err = decode_frame(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::BadSync { found: 0 }));
        // Nothing consumed; the caller owns the resync policy.
        assert_eq!(buf.len(), FH_SIZE);
    }

    #[test]
    fn decode_checksum_mismatch() {
        let mut buf = test_frame(1, 1, 1, 0, b"x");
        buf[9] ^= 0x40; // corrupt a sequence byte, checksum now stale
        let err = decode_frame(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
    }

    #[test]
    fn decode_oversized_frame() {
        let header = FrameHeader {
            version: 1,
            datastream: 0,
            source: 0,
            seq: 0,
            run: 0,
            checksum: 0,
        };
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        ProductHeader {
            version: 1,
            transfer_type: 0,
            header_len: PDH_SIZE as u16,
            block: 0,
            data_offset: 0,
            data_size: u16::MAX,
        }
        .encode(&mut buf);

        let err = decode_frame(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { .. }));
    }

    #[test]
    fn decode_multiple_frames() {
        let mut buf = test_frame(1, 1, 10, 0, b"first");
        buf.extend_from_slice(&test_frame(1, 1, 11, 0, b"second"));

        let f1 = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(f1.header.seq, 10);
        assert_eq!(f1.data(), b"first");

        let f2 = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(f2.header.seq, 11);
        assert_eq!(f2.data(), b"second");

        assert!(buf.is_empty());
    }

    #[test]
    fn decode_header_with_options_and_offset() {
        let header = FrameHeader {
            version: 1,
            datastream: 2,
            source: 9,
            seq: 1000,
            run: 4,
            checksum: 0,
        };
        let product = ProductHeader {
            version: 1,
            transfer_type: 0x03,
            header_len: PDH_SIZE as u16 + 6, // six option bytes
            block: 1,
            data_offset: 4,
            data_size: 3,
        };
        let mut buf = BytesMut::new();
        encode_frame(&header, &product, b"abc", &mut buf).unwrap();
        assert_eq!(buf.len(), FH_SIZE + PDH_SIZE + 6 + 4 + 3);

        let frame = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(frame.product.data_start(), FH_SIZE + PDH_SIZE + 6 + 4);
        assert_eq!(frame.data(), b"abc");
    }

    #[test]
    fn encode_rejects_undersized_header_len() {
        let header = FrameHeader {
            version: 1,
            datastream: 0,
            source: 0,
            seq: 0,
            run: 0,
            checksum: 0,
        };
        let product = ProductHeader {
            version: 1,
            transfer_type: 0,
            header_len: 4,
            block: 0,
            data_offset: 0,
            data_size: 0,
        };
        let mut buf = BytesMut::new();
        let err = encode_frame(&header, &product, b"", &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::Truncated { .. }));
    }

    #[test]
    fn empty_data_block() {
        let mut buf = test_frame(0, 0, 1, 0, b"");
        let frame = decode_frame(&mut buf).unwrap().unwrap();
        assert!(frame.data().is_empty());
        assert_eq!(frame.len(), FH_SIZE + PDH_SIZE);
    }

    #[test]
    fn checksum_covers_all_fourteen_bytes() {
        let mut buf = test_frame(0xAB, 0xCDEF, 0x01020304, 0, b"");
        let wire = u16::from_be_bytes([buf[14], buf[15]]);
        let sum: u16 = buf[..14].iter().map(|&b| u16::from(b)).sum();
        assert_eq!(wire, sum);
        assert!(decode_frame(&mut buf).unwrap().is_some());
    }
}
