/// Errors that can occur while ingesting or draining the feed.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Frame-level error on an inbound connection or the output sink.
    #[error("frame error: {0}")]
    Frame(#[from] wxblend_frame::FrameError),

    /// Fatal buffer error (capacity mismatch or closed buffer).
    #[error("buffer error: {0}")]
    Buffer(#[from] wxblend_buffer::BufferError),

    /// A fanout server specification could not be parsed.
    #[error("invalid fanout server spec {0:?} (expected host:port)")]
    InvalidServer(String),

    /// An I/O error outside frame handling.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;
