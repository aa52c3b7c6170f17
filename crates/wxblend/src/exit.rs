use std::fmt;
use std::io;

use wxblend_buffer::BufferError;
use wxblend_frame::FrameError;
use wxblend_ingest::IngestError;

// Exit code constants; sysexits-compatible where a match exists.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::BadSync { .. }
        | FrameError::ChecksumMismatch { .. }
        | FrameError::FrameTooLarge { .. }
        | FrameError::Truncated { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn buffer_error(context: &str, err: BufferError) -> CliError {
    match err {
        BufferError::FrameTooLarge { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        BufferError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn ingest_error(context: &str, err: IngestError) -> CliError {
    match err {
        IngestError::Frame(err) => frame_error(context, err),
        IngestError::Buffer(err) => buffer_error(context, err),
        IngestError::InvalidServer(_) => CliError::new(USAGE, format!("{context}: {err}")),
        IngestError::Io(source) => io_error(context, source),
    }
}
