use std::ffi::c_void;
use std::sync::Mutex;

use wxblend_buffer::{ReorderBuffer, UplinkMap};

/// Result codes for the buffer API.
///
/// The non-negative codes are the normal outcomes of adding a frame;
/// negative codes are errors described by `wxb_last_error`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WxbResult {
    Ok = 0,
    TooLate = 1,
    Duplicate = 2,
    InvalidArgument = -1,
    FrameTooLarge = -2,
    Closed = -3,
    Internal = -99,
}

#[allow(dead_code)]
pub const WXB_OK: WxbResult = WxbResult::Ok;
#[allow(dead_code)]
pub const WXB_TOO_LATE: WxbResult = WxbResult::TooLate;
#[allow(dead_code)]
pub const WXB_DUPLICATE: WxbResult = WxbResult::Duplicate;
#[allow(dead_code)]
pub const WXB_ERR_INVALID_ARGUMENT: WxbResult = WxbResult::InvalidArgument;
#[allow(dead_code)]
pub const WXB_ERR_FRAME_TOO_LARGE: WxbResult = WxbResult::FrameTooLarge;
#[allow(dead_code)]
pub const WXB_ERR_CLOSED: WxbResult = WxbResult::Closed;
#[allow(dead_code)]
pub const WXB_ERR_INTERNAL: WxbResult = WxbResult::Internal;

/// A released frame handed to C callers.
///
/// `data` is allocated by this library and must be released with
/// `wxb_frame_free`.
#[repr(C)]
#[derive(Debug)]
pub struct WxbFrame {
    pub seq: u32,
    pub block: u16,
    pub data: *mut u8,
    pub len: usize,
}

impl Default for WxbFrame {
    fn default() -> Self {
        Self {
            seq: 0,
            block: 0,
            data: std::ptr::null_mut(),
            len: 0,
        }
    }
}

pub type WxbBufferHandle = *mut c_void;

pub(crate) struct BufferHandle {
    pub(crate) buffer: ReorderBuffer,
    /// C callers pass raw uplink source ids; the handle owns the remapping.
    pub(crate) uplinks: Mutex<UplinkMap>,
}
