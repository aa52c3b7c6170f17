/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The byte where a frame header must start is not the sync byte.
    #[error("expected sync byte 0xFF, found {found:#04x}")]
    BadSync { found: u8 },

    /// The frame header checksum does not match the sum of the header bytes.
    #[error("header checksum mismatch (wire {wire}, computed {computed})")]
    ChecksumMismatch { wire: u16, computed: u16 },

    /// The headers describe a frame larger than the feed allows.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A header slice was shorter than the fixed header size.
    #[error("truncated header ({len} bytes, need {need})")]
    Truncated { len: usize, need: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
