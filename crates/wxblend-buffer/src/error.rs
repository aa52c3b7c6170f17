/// Errors from the reorder buffer.
///
/// Ordering rejections (late or duplicate frames) are not errors — they are
/// ordinary [`AddOutcome`](crate::AddOutcome) values. The variants here are
/// fatal to the operation that hit them.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// A frame exceeded the compiled slot capacity. The transport's maximum
    /// frame size and [`SLOT_CAPACITY`](crate::SLOT_CAPACITY) disagree —
    /// a deployment misconfiguration, not a per-frame condition.
    #[error("frame too large for slot ({size} bytes, capacity {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The buffer has been closed; no further frames are accepted.
    #[error("buffer closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, BufferError>;
